//! Traits at the boundary with the wire codec and key management layers
use crate::common::{Digest, RootSignature};
use crate::errors::Error;
use crate::name::ContentName;
use crate::signed_info::SignedInfo;

/// Canonical serialization of a block's name and signed metadata.
///
/// The output is hashed into every leaf, so it must be stable across releases:
/// changing it invalidates every signature already issued. It must also be
/// self-delimiting, because the payload is appended right after it.
pub trait CanonicalEncoder: Sync {
    /// Serialize `name` and `info`.
    fn canonical_bytes(&self, name: &ContentName, info: &SignedInfo) -> Result<Vec<u8>, Error>;
}

/// Key handle able to sign a root digest.
pub trait RootSigner {
    /// Sign `root`. For direct signatures `root` is the bound leaf digest.
    fn sign_root(&self, root: &Digest) -> RootSignature;
}

/// Key handle able to check a root signature.
///
/// Verification is total: a malformed signature is simply not valid.
pub trait RootVerifier {
    /// Returns whether `signature` is a valid signature of `root`.
    fn verify_root(&self, root: &Digest, signature: &RootSignature) -> bool;
}
