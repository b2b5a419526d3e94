use std::collections::{BTreeMap, HashMap};

use agilestore_protocol::constants::{CHECKSUM_HEADER, SIZE_HEADER, STATUS_HEADER};

use crate::digest::Digest;

/// Read access to response headers by case-insensitive name.
pub trait AckHeaders {
    fn header(&self, name: &str) -> Option<&str>;
}

/// Maps are expected to hold lowercased header names.
impl AckHeaders for BTreeMap<String, String> {
    fn header(&self, name: &str) -> Option<&str> {
        self.get(&name.to_ascii_lowercase()).map(String::as_str)
    }
}

impl AckHeaders for HashMap<String, String> {
    fn header(&self, name: &str) -> Option<&str> {
        self.get(&name.to_ascii_lowercase()).map(String::as_str)
    }
}

/// Errors from checking an upload acknowledgment.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IntegrityError {
    #[error("missing acknowledgment header {header}")]
    MissingHeader { header: &'static str },

    #[error("{header}, got: {actual}, expected: {expected}")]
    Mismatch {
        header: &'static str,
        actual: String,
        expected: String,
    },

    #[error("short transfer: sent {sent} of {expected} bytes")]
    ShortTransfer { sent: u64, expected: u64 },
}

/// What the acknowledgment headers must say about an upload.
///
/// The status header must always read `0`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntegrityExpectation {
    pub byte_size: u64,
    pub digest_hex: String,
}

impl IntegrityExpectation {
    pub fn new(byte_size: u64, digest_hex: impl Into<String>) -> Self {
        Self {
            byte_size,
            digest_hex: digest_hex.into(),
        }
    }

    /// Expects exactly what a [`DigestReader`](crate::DigestReader) observed.
    pub fn from_digest(digest: &Digest) -> Self {
        Self::new(digest.length, digest.hex.clone())
    }

    /// Expects `length` bytes, after checking the digest covered all of them.
    pub fn for_chunk(digest: &Digest, length: u64) -> Result<Self, IntegrityError> {
        if digest.length != length {
            return Err(IntegrityError::ShortTransfer {
                sent: digest.length,
                expected: length,
            });
        }
        Ok(Self::new(length, digest.hex.clone()))
    }

    fn checks(&self) -> [(&'static str, String); 3] {
        [
            (STATUS_HEADER, "0".to_string()),
            (SIZE_HEADER, self.byte_size.to_string()),
            (CHECKSUM_HEADER, self.digest_hex.clone()),
        ]
    }
}

/// Checks status, size and checksum headers, in that order.
///
/// Values compare case-insensitively so upper-case hex digests are accepted.
pub fn verify_acknowledgment(
    headers: &impl AckHeaders,
    expectation: &IntegrityExpectation,
) -> Result<(), IntegrityError> {
    for (header, expected) in expectation.checks() {
        let actual = headers
            .header(header)
            .ok_or(IntegrityError::MissingHeader { header })?;
        if !actual.eq_ignore_ascii_case(&expected) {
            return Err(IntegrityError::Mismatch {
                header,
                actual: actual.to_string(),
                expected,
            });
        }
    }
    Ok(())
}
