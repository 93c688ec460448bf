#![forbid(unsafe_code)]
#![warn(missing_docs)]

//!
//! Wrapper types and traits for secret management which help ensure they
//! aren't accidentally copied, logged, or otherwise exposed (as much as
//! possible), and also ensure secrets are securely wiped from memory when
//! dropped. Secret-keeping library inspired by secrecy.
//!

pub use zeroize::{self, Zeroize as ZeroizableSecret};

mod strategy;

pub use strategy::{Strategy, WithType, WithoutType};

mod abs;
pub use abs::{ExposeInterface, PeekInterface};

mod secret;
mod strong_secret;
pub use secret::Secret;
pub use strong_secret::StrongSecret;

mod serde;
pub use crate::serde::{Deserialize, ErasedMaskSerialize, SerializableSecret, Serialize};

pub mod maskable;

pub use maskable::{Mask, Maskable};

/// This module should be included with asterisk.
///
/// `use masking::prelude::*;`
///
pub mod prelude {
    pub use super::{ExposeInterface, PeekInterface};
}
