//! Ed25519 implementation of the root signing primitives. The signature is
//! computed over the raw root digest bytes; ed25519 hashes its input
//! internally, so no further pre-hashing is applied on either side.
use crate::common::{Digest, RootSignature};
use crate::errors::Error;
use crate::traits::{RootSigner, RootVerifier};
use ed25519_dalek::{
    Signature as EdSignature, Signer, SigningKey, VerifyingKey, PUBLIC_KEY_LENGTH,
    SECRET_KEY_LENGTH,
};
use rand_core::CryptoRngCore;
use zeroize::Zeroize;

/// Ed25519 key able to sign roots.
pub struct Ed25519Signer {
    key: SigningKey,
}

impl std::fmt::Debug for Ed25519Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Ed25519Signer")
            .field(&self.verifier())
            .finish()
    }
}

impl Ed25519Signer {
    /// Size of the seed accepted by `from_seed`.
    pub const SEED_SIZE: usize = SECRET_KEY_LENGTH;

    /// Derive the key from a 32 byte seed. The seed is overwritten with zeroes.
    ///
    /// # Errors
    /// Fails with `InvalidSecretKeySize` if the seed has the wrong length; the
    /// seed is left untouched in that case.
    pub fn from_seed(seed: &mut [u8]) -> Result<Self, Error> {
        if seed.len() != Self::SEED_SIZE {
            return Err(Error::InvalidSecretKeySize(seed.len()));
        }
        let mut secret = [0u8; SECRET_KEY_LENGTH];
        secret.copy_from_slice(seed);
        seed.zeroize();
        let key = SigningKey::from_bytes(&secret);
        secret.zeroize();
        Ok(Self { key })
    }

    /// Generate a fresh key.
    pub fn generate<R: CryptoRngCore + ?Sized>(rng: &mut R) -> Self {
        Self {
            key: SigningKey::generate(rng),
        }
    }

    /// The matching public key.
    pub fn verifier(&self) -> Ed25519Verifier {
        Ed25519Verifier {
            key: self.key.verifying_key(),
        }
    }
}

impl RootSigner for Ed25519Signer {
    fn sign_root(&self, root: &Digest) -> RootSignature {
        RootSignature(self.key.sign(root.as_bytes()).to_bytes().to_vec())
    }
}

/// Ed25519 public key able to check root signatures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ed25519Verifier {
    key: VerifyingKey,
}

impl Ed25519Verifier {
    /// Size of an encoded public key.
    pub const SIZE: usize = PUBLIC_KEY_LENGTH;

    /// Parse a public key.
    ///
    /// # Errors
    /// Fails if `bytes` is not 32 bytes long or is not a valid point.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        if bytes.len() != Self::SIZE {
            return Err(Error::InvalidPublicKeySize(bytes.len()));
        }
        let mut raw = [0u8; PUBLIC_KEY_LENGTH];
        raw.copy_from_slice(bytes);
        Ok(Self {
            key: VerifyingKey::from_bytes(&raw)?,
        })
    }

    /// Encoded public key.
    pub fn to_bytes(&self) -> [u8; PUBLIC_KEY_LENGTH] {
        self.key.to_bytes()
    }
}

impl RootVerifier for Ed25519Verifier {
    fn verify_root(&self, root: &Digest, signature: &RootSignature) -> bool {
        match EdSignature::from_slice(signature.as_bytes()) {
            Ok(sig) => self.key.verify_strict(root.as_bytes(), &sig).is_ok(),
            Err(_) => false,
        }
    }
}
