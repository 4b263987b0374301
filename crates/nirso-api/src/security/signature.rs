// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Keyed signature verification for device-originated requests.
//!
//! Enrolled devices sign the literal decimal timestamp string of each notify
//! request with HMAC-SHA256 over a pre-shared key and send the lowercase-hex
//! digest in the `X-Hmac-Sig` header.
//!
//! Crypto is handled by the `hmac-sha256` crate - pure Rust, constant-time
//! verification.

use data_encoding::HEXLOWER;

/// Verifies claimed request signatures against the shared secret.
///
/// Constructed once at startup and shared read-only across handlers.
pub struct SignatureValidator {
    shared_key: Vec<u8>,
}

impl SignatureValidator {
    pub fn new(shared_key: impl Into<Vec<u8>>) -> Self {
        Self {
            shared_key: shared_key.into(),
        }
    }

    /// Check a claimed signature (64 lowercase hex characters) over `message`.
    ///
    /// Malformed input is rejected before the comparator ever runs; the
    /// comparison itself is constant-time, never a short-circuiting equality.
    pub fn verify(&self, claimed_hex: &str, message: &str) -> bool {
        if claimed_hex.len() != 64 {
            return false;
        }
        let Ok(claimed) = HEXLOWER.decode(claimed_hex.as_bytes()) else {
            return false;
        };
        let Ok(tag) = <[u8; 32]>::try_from(claimed) else {
            return false;
        };
        hmac_sha256::HMAC::verify(message.as_bytes(), &self.shared_key, &tag)
    }

    /// Hex-encoded HMAC over `message` - the device-side half of [`verify`],
    /// used by enrollment tooling and tests.
    ///
    /// [`verify`]: SignatureValidator::verify
    pub fn sign(&self, message: &str) -> String {
        HEXLOWER.encode(&hmac_sha256::HMAC::mac(
            message.as_bytes(),
            &self.shared_key,
        ))
    }
}
