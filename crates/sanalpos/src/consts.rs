//! Crate-wide constants.

/// Header names used by the gateway adapters.
pub mod headers {
    pub const CONTENT_TYPE: &str = "Content-Type";
    /// Akbank carries the request HMAC in this header
    pub const AUTH_HASH: &str = "auth-hash";
}

/// Length of the generated `rnd` nonce carried in 3-D form fields.
pub const RND_LENGTH: usize = 16;

/// Return code the Turkish gateways use for an approved transaction.
pub const APPROVED_PROC_CODE: &str = "00";
