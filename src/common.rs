//! Value types shared by every layer of the tree construction
use crate::errors::Error;
use std::fmt;
use std::ops::Range;

#[cfg(feature = "serde_enabled")]
use serde::{Deserialize, Serialize};

/// Output size of every supported digest algorithm.
pub const DIGEST_SIZE: usize = 32;

/// A fixed size digest. Leaves, internal nodes and the root of a tree are all
/// represented as a `Digest`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde_enabled", derive(Serialize, Deserialize))]
pub struct Digest(pub(crate) [u8; DIGEST_SIZE]);

impl Digest {
    /// Return `Self` as its byte representation.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Tries to convert a slice of `bytes` as `Self`.
    ///
    /// # Errors
    /// This function returns an error if the length of `bytes` is not equal to
    /// `DIGEST_SIZE`.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        if bytes.len() == DIGEST_SIZE {
            let mut v = [0u8; DIGEST_SIZE];
            v.copy_from_slice(bytes);
            Ok(Digest(v))
        } else {
            Err(Error::InvalidDigestSize(bytes.len()))
        }
    }

    /// Consume `self` into the inner array.
    pub fn to_bytes(self) -> [u8; DIGEST_SIZE] {
        self.0
    }
}

impl From<[u8; DIGEST_SIZE]> for Digest {
    fn from(bytes: [u8; DIGEST_SIZE]) -> Self {
        Digest(bytes)
    }
}

impl AsRef<[u8]> for Digest {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0.iter() {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", self)
    }
}

/// An opaque signature over a root digest (or over a single leaf digest, for
/// direct signatures). The bytes are produced by a [`crate::RootSigner`].
#[cfg_attr(feature = "serde_enabled", serde_with::serde_as)]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde_enabled", derive(Serialize, Deserialize))]
pub struct RootSignature(
    #[cfg_attr(feature = "serde_enabled", serde_as(as = "serde_with::Bytes"))] pub(crate) Vec<u8>,
);

impl RootSignature {
    /// Wrap raw signature bytes.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        RootSignature(bytes.to_vec())
    }

    /// Return the raw signature bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl AsRef<[u8]> for RootSignature {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Validate `offset..offset + length` against a buffer of `available` bytes.
pub(crate) fn checked_range(
    available: usize,
    offset: usize,
    length: usize,
) -> Result<Range<usize>, Error> {
    match offset.checked_add(length) {
        Some(end) if end <= available => Ok(offset..end),
        _ => Err(Error::InvalidRange {
            offset,
            length,
            available,
        }),
    }
}
