//! Utilities for cryptographic algorithms.
//!
//! Every gateway family signs its requests with one of the digest or MAC
//! algorithms below; the per-gateway field ordering and encoding live in the
//! gateway's own crypt, not here.

use ring::hmac;

use crate::errors::{CryptoError, CustomResult};

/// Trait for cryptographically signing messages
pub trait SignMessage {
    /// Takes in a secret and a message and returns the calculated signature as bytes
    fn sign_message(&self, secret: &[u8], msg: &[u8]) -> CustomResult<Vec<u8>, CryptoError>;
}

/// Trait for cryptographically verifying a message against a signature
pub trait VerifySignature {
    /// Takes in a secret, the signature and the message and verifies the message
    /// against the signature
    fn verify_signature(
        &self,
        secret: &[u8],
        signature: &[u8],
        msg: &[u8],
    ) -> CustomResult<bool, CryptoError>;
}

/// Trait for generating a message digest
pub trait GenerateDigest {
    /// Takes a message and creates a digest for it
    fn generate_digest(&self, message: &[u8]) -> CustomResult<Vec<u8>, CryptoError>;
}

/// Secure Hash Algorithm 1, kept for the legacy gateway families that still
/// sign with it
#[derive(Debug)]
pub struct Sha1;

/// Secure Hash Algorithm 256
#[derive(Debug)]
pub struct Sha256;

/// Secure Hash Algorithm 512
#[derive(Debug)]
pub struct Sha512;

/// Represents the HMAC-SHA-512 algorithm
#[derive(Debug)]
pub struct HmacSha512;

impl GenerateDigest for Sha1 {
    fn generate_digest(&self, message: &[u8]) -> CustomResult<Vec<u8>, CryptoError> {
        let digest = ring::digest::digest(&ring::digest::SHA1_FOR_LEGACY_USE_ONLY, message);
        Ok(digest.as_ref().to_vec())
    }
}

impl GenerateDigest for Sha256 {
    fn generate_digest(&self, message: &[u8]) -> CustomResult<Vec<u8>, CryptoError> {
        let digest = ring::digest::digest(&ring::digest::SHA256, message);
        Ok(digest.as_ref().to_vec())
    }
}

impl GenerateDigest for Sha512 {
    fn generate_digest(&self, message: &[u8]) -> CustomResult<Vec<u8>, CryptoError> {
        let digest = ring::digest::digest(&ring::digest::SHA512, message);
        Ok(digest.as_ref().to_vec())
    }
}

impl SignMessage for HmacSha512 {
    fn sign_message(&self, secret: &[u8], msg: &[u8]) -> CustomResult<Vec<u8>, CryptoError> {
        let key = hmac::Key::new(hmac::HMAC_SHA512, secret);
        Ok(hmac::sign(&key, msg).as_ref().to_vec())
    }
}

impl VerifySignature for HmacSha512 {
    fn verify_signature(
        &self,
        secret: &[u8],
        signature: &[u8],
        msg: &[u8],
    ) -> CustomResult<bool, CryptoError> {
        let key = hmac::Key::new(hmac::HMAC_SHA512, secret);

        Ok(hmac::verify(&key, msg, signature).is_ok())
    }
}

/// Generate a random string using a cryptographically secure pseudo-random
/// number generator (CSPRNG). Used for the `rnd` nonce carried by the 3-D
/// Secure form fields.
#[inline]
pub fn generate_random_string(length: usize) -> String {
    use rand::distributions::DistString;

    rand::distributions::Alphanumeric.sample_string(&mut rand::rngs::OsRng, length)
}

#[cfg(test)]
mod crypto_tests {
    #![allow(clippy::expect_used)]
    use super::{GenerateDigest, SignMessage, VerifySignature};

    #[test]
    fn test_sha1_digest() {
        use base64::Engine;

        let digest = super::Sha1
            .generate_digest(b"sample-pos-payload")
            .expect("Digest");

        assert_eq!(
            base64::engine::general_purpose::STANDARD.encode(digest),
            "uWRdT6emEzSUNRqhXOCoIoj3J8k="
        );
    }

    #[test]
    fn test_sha256_digest() {
        let digest = super::Sha256
            .generate_digest(b"sample-pos-payload")
            .expect("Digest");

        assert_eq!(
            hex::encode(digest),
            "58380658af6ab5bc53289eb1de21ffda1530ac220f9d9c33d10eef37462e2884"
        );
    }

    #[test]
    fn test_sha512_digest() {
        let digest = super::Sha512
            .generate_digest(b"sample-pos-payload")
            .expect("Digest");

        assert_eq!(
            hex::encode(digest),
            "5ea508eb215fa07d77ec0b2952ba2c946bcd46a6a78abb108f50a424a3397c868e2e64eede1ca51a971f77de8c21620fa7d7b6072811133d82a15c93d6668cd2"
        );
    }

    #[test]
    fn test_hmac_sha512_sign_and_verify() {
        let secret = "3230323op0s0k0e0y07433323".as_bytes();
        let message = r#"{"txnCode":"1000"}"#.as_bytes();
        let right_signature = hex::decode(
            "0fc49d47d163ea23de013d2a7dc83e5362c2369d7a1238d0b17279b5037dafd36b7a258f8a702a114f92b14b63fcaf0b6fabafdd3236a33b1c2d349242638ef9",
        )
        .expect("signature decoding");

        let signature = super::HmacSha512
            .sign_message(secret, message)
            .expect("Signature");

        assert_eq!(signature, right_signature);

        let verified = super::HmacSha512
            .verify_signature(secret, &right_signature, message)
            .expect("Right signature verification result");
        assert!(verified);

        let tampered = super::HmacSha512
            .verify_signature(secret, &right_signature, b"{}")
            .expect("Wrong signature verification result");
        assert!(!tampered);
    }

    #[test]
    fn test_signing_is_deterministic() {
        let a = super::Sha512.generate_digest(b"77007455").expect("Digest");
        let b = super::Sha512.generate_digest(b"77007455").expect("Digest");

        assert_eq!(a, b);
    }
}
