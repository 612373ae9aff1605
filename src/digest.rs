//! The hash primitive every other layer builds on.
//!
//! All supported algorithms produce [`DIGEST_SIZE`] bytes, so digests from any
//! of them fit the same [`Digest`] value. The algorithm is picked once, when the
//! engine is constructed; an unknown name is rejected there and never on a
//! per-call basis.
use crate::common::{checked_range, Digest, DIGEST_SIZE};
use crate::errors::Error;
use blake2::digest::consts::U32;
use blake2::Blake2b;
use der::asn1::ObjectIdentifier;
use sha2::{Sha256, Sha512_256};
use std::fmt;
use std::str::FromStr;

#[cfg(feature = "serde_enabled")]
use serde::{Deserialize, Serialize};

type Blake2b256 = Blake2b<U32>;

const SHA256_OID: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.2.1");
const SHA512_256_OID: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.2.6");
const BLAKE2B_256_OID: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.6.1.4.1.1722.12.2.1.8");

/// Digest algorithms a tree can be built with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde_enabled", derive(Serialize, Deserialize))]
pub enum DigestAlgorithm {
    /// SHA-256, the default.
    #[default]
    Sha256,
    /// SHA-512 truncated to 256 bits.
    Sha512_256,
    /// BLAKE2b with a 256 bit output.
    Blake2b256,
}

impl DigestAlgorithm {
    /// Canonical name of the algorithm, as accepted by `FromStr`.
    pub const fn name(self) -> &'static str {
        match self {
            DigestAlgorithm::Sha256 => "SHA-256",
            DigestAlgorithm::Sha512_256 => "SHA-512/256",
            DigestAlgorithm::Blake2b256 => "BLAKE2b-256",
        }
    }

    /// ASN.1 object identifier carried in encoded authentication paths.
    pub const fn oid(self) -> ObjectIdentifier {
        match self {
            DigestAlgorithm::Sha256 => SHA256_OID,
            DigestAlgorithm::Sha512_256 => SHA512_256_OID,
            DigestAlgorithm::Blake2b256 => BLAKE2B_256_OID,
        }
    }

    /// Look an algorithm up by its object identifier.
    pub fn from_oid(oid: &ObjectIdentifier) -> Result<Self, Error> {
        [
            DigestAlgorithm::Sha256,
            DigestAlgorithm::Sha512_256,
            DigestAlgorithm::Blake2b256,
        ]
        .into_iter()
        .find(|alg| &alg.oid() == oid)
        .ok_or_else(|| Error::UnsupportedAlgorithm(oid.to_string()))
    }
}

impl FromStr for DigestAlgorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .collect::<String>()
            .to_ascii_uppercase();
        match normalized.as_str() {
            "SHA256" => Ok(DigestAlgorithm::Sha256),
            "SHA512/256" | "SHA512256" => Ok(DigestAlgorithm::Sha512_256),
            "BLAKE2B256" => Ok(DigestAlgorithm::Blake2b256),
            _ => Err(Error::UnsupportedAlgorithm(s.to_string())),
        }
    }
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Deterministic, side effect free hashing with a fixed algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DigestEngine {
    algorithm: DigestAlgorithm,
}

impl DigestEngine {
    /// Create an engine for `algorithm`.
    pub fn new(algorithm: DigestAlgorithm) -> Self {
        Self { algorithm }
    }

    /// Create an engine from an algorithm name such as `"SHA-256"`.
    ///
    /// # Errors
    /// Fails with `UnsupportedAlgorithm` when the name is not recognised.
    pub fn for_name(name: &str) -> Result<Self, Error> {
        Ok(Self::new(name.parse()?))
    }

    /// The algorithm this engine hashes with.
    pub fn algorithm(&self) -> DigestAlgorithm {
        self.algorithm
    }

    /// Digest a whole byte sequence.
    pub fn digest(&self, bytes: &[u8]) -> Digest {
        self.digest_parts(&[bytes])
    }

    /// Digest `bytes[offset..offset + length]`, with the same result as
    /// digesting a copy of that range.
    pub fn digest_range(
        &self,
        bytes: &[u8],
        offset: usize,
        length: usize,
    ) -> Result<Digest, Error> {
        let range = checked_range(bytes.len(), offset, length)?;
        Ok(self.digest(&bytes[range]))
    }

    /// Digest the concatenation of `parts` without materialising it.
    pub fn digest_parts(&self, parts: &[&[u8]]) -> Digest {
        match self.algorithm {
            DigestAlgorithm::Sha256 => finalize::<Sha256>(parts),
            DigestAlgorithm::Sha512_256 => finalize::<Sha512_256>(parts),
            DigestAlgorithm::Blake2b256 => finalize::<Blake2b256>(parts),
        }
    }

    /// Interior node digest: `H(left || right)`.
    pub fn combine(&self, left: &Digest, right: &Digest) -> Digest {
        self.digest_parts(&[left.as_bytes(), right.as_bytes()])
    }
}

fn finalize<H: sha2::Digest>(parts: &[&[u8]]) -> Digest {
    let mut hasher = H::new();
    for part in parts {
        hasher.update(part);
    }
    let mut out = [0u8; DIGEST_SIZE];
    out.copy_from_slice(&hasher.finalize());
    Digest(out)
}
