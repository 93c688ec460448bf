//! Error types shared across the gateway adapters.

/// Custom Result
/// A custom datatype that wraps the error variant <E> into a report, allowing
/// error_stack::Report<E> specific extendability
///
/// Effectively, equivalent to `Result<T, error_stack::Report<E>>`
pub type CustomResult<T, E> = error_stack::Result<T, E>;

/// Errors raised while building requests for, or normalizing responses from,
/// a virtual POS gateway.
#[derive(Debug, thiserror::Error)]
pub enum PosError {
    #[error("Failed to encode gateway request")]
    RequestEncodingFailed,
    #[error("Request encoding failed : {0}")]
    RequestEncodingFailedWithReason(String),
    #[error("Failed to deserialize gateway response")]
    ResponseDeserializationFailed,
    #[error("Failed to execute a processing step: {0:?}")]
    ProcessingStepFailed(Option<bytes::Bytes>),
    #[error("Missing required field: {field_name}")]
    MissingRequiredField { field_name: &'static str },
    #[error("Failed to obtain authentication type")]
    FailedToObtainAuthType,
    #[error("{flow} flow not supported by {gateway} gateway")]
    FlowNotSupported { flow: String, gateway: String },
    #[error("{message} is not supported by {gateway}")]
    NotSupported {
        message: String,
        gateway: &'static str,
    },
    #[error("Invalid data format for field: {field_name}")]
    InvalidDataFormat { field_name: &'static str },
    #[error("Missing 3-D Secure callback payload field: {field_name}")]
    MissingCallbackPayload { field_name: &'static str },
    #[error("Missing gateway transaction reference")]
    MissingTransactionReference,
    #[error("An invalid gateway name was provided")]
    InvalidGatewayName,
}

impl PosError {
    /// Unsupported-operation constructor used by the default trait bodies.
    pub fn flow_not_supported(flow: &str, gateway: &str) -> Self {
        Self::FlowNotSupported {
            flow: flow.to_string(),
            gateway: gateway.to_string(),
        }
    }
}

/// Cryptographic algorithm errors
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    /// The cryptographic algorithm was unable to sign the message
    #[error("Failed to sign message")]
    MessageSigningFailed,
    /// The cryptographic algorithm was unable to verify the given signature
    #[error("Failed to verify signature")]
    SignatureVerificationFailed,
}
