//! Per-block authentication built from one signed hash tree.
//!
//! A batch moves through `bind leaves -> build tree -> sign root` exactly once
//! and is immutable afterwards. Each block is then stamped with a
//! [`TreeSignature`]: its own authentication path plus the shared root
//! signature. Single blocks do not go through a tree and carry a direct
//! signature over their bound digest instead; [`BlockSignature`] keeps the two
//! apart, since their verification procedures differ.
use crate::binder::{BindingSource, BlockBinder};
use crate::common::{Digest, RootSignature};
use crate::digest::DigestAlgorithm;
use crate::errors::Error;
use crate::name::ContentName;
use crate::path::AuthPath;
use crate::signed_info::SignedInfo;
use crate::tlv::TlvEncoder;
use crate::traits::{CanonicalEncoder, RootSigner, RootVerifier};
use crate::tree::{HashTree, LeafSet, TreeBuilder};
use der::asn1::OctetStringRef;
use der::{Decode, Encode, Sequence};
use once_cell::sync::OnceCell;
use tracing::{debug, trace};

#[cfg(feature = "parallel")]
use rayon::prelude::*;
#[cfg(feature = "serde_enabled")]
use serde::{Deserialize, Serialize};

/// Signature of one block of a tree: its path and the shared root signature.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde_enabled", derive(Serialize, Deserialize))]
pub struct TreeSignature {
    path: AuthPath,
    root_signature: RootSignature,
}

impl TreeSignature {
    /// Signature of `leaf` in `tree`, without memoization.
    ///
    /// # Errors
    /// Fails with `IndexOutOfRange` if the leaf does not exist.
    pub fn for_leaf(
        tree: &HashTree,
        leaf: usize,
        root_signature: &RootSignature,
    ) -> Result<Self, Error> {
        Ok(Self {
            path: AuthPath::extract(tree, leaf)?,
            root_signature: root_signature.clone(),
        })
    }

    /// The block's authentication path.
    pub fn path(&self) -> &AuthPath {
        &self.path
    }

    /// The shared root signature.
    pub fn root_signature(&self) -> &RootSignature {
        &self.root_signature
    }

    /// The `(DER path, root signature)` pair embedded into a block.
    pub fn to_parts(&self) -> Result<(Vec<u8>, Vec<u8>), Error> {
        Ok((self.path.encode()?, self.root_signature.0.clone()))
    }

    /// Rebuild a signature from its embedded parts.
    pub fn from_parts(path: &[u8], root_signature: &[u8]) -> Result<Self, Error> {
        Ok(Self {
            path: AuthPath::decode(path)?,
            root_signature: RootSignature::from_bytes(root_signature),
        })
    }
}

/// The signature carried by a block.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde_enabled", derive(Serialize, Deserialize))]
pub enum BlockSignature {
    /// Signature over the block's own bound digest.
    Direct(RootSignature),
    /// Signature obtained through a hash tree.
    Tree(TreeSignature),
}

impl From<TreeSignature> for BlockSignature {
    fn from(signature: TreeSignature) -> Self {
        BlockSignature::Tree(signature)
    }
}

#[derive(Sequence)]
struct SignatureField<'a> {
    #[asn1(context_specific = "0", optional = "true")]
    witness: Option<OctetStringRef<'a>>,
    signature_bits: OctetStringRef<'a>,
}

impl BlockSignature {
    /// DER encoding of the signature field:
    ///
    /// ```text
    /// SignatureField ::= SEQUENCE {
    ///     witness        [0] OCTET STRING OPTIONAL,  -- DER AuthPathInfo
    ///     signatureBits  OCTET STRING
    /// }
    /// ```
    pub fn encode(&self) -> Result<Vec<u8>, Error> {
        let (witness, bits) = match self {
            BlockSignature::Direct(sig) => (None, sig.as_bytes()),
            BlockSignature::Tree(sig) => (Some(sig.path.encode()?), sig.root_signature.as_bytes()),
        };
        let field = SignatureField {
            witness: witness.as_deref().map(OctetStringRef::new).transpose()?,
            signature_bits: OctetStringRef::new(bits)?,
        };
        Ok(field.to_der()?)
    }

    /// Parse a signature field produced by `encode`.
    pub fn decode(bytes: &[u8]) -> Result<Self, Error> {
        let field = SignatureField::from_der(bytes)?;
        let bits = RootSignature::from_bytes(field.signature_bits.as_bytes());
        Ok(match field.witness {
            Some(witness) => BlockSignature::Tree(TreeSignature {
                path: AuthPath::decode(witness.as_bytes())?,
                root_signature: bits,
            }),
            None => BlockSignature::Direct(bits),
        })
    }
}

/// A signed tree together with the per-leaf signatures derived from it.
#[derive(Debug)]
pub struct SignedBatch {
    tree: HashTree,
    root_signature: RootSignature,
    issued: Vec<OnceCell<TreeSignature>>,
}

impl SignedBatch {
    /// Sign the root of `tree`.
    pub fn sign<S: RootSigner + ?Sized>(tree: HashTree, signer: &S) -> Self {
        let root_signature = signer.sign_root(&tree.root());
        let issued = (0..tree.num_leaves()).map(|_| OnceCell::new()).collect();
        Self {
            tree,
            root_signature,
            issued,
        }
    }

    /// The tree.
    pub fn tree(&self) -> &HashTree {
        &self.tree
    }

    /// The one signature shared by every leaf.
    pub fn root_signature(&self) -> &RootSignature {
        &self.root_signature
    }

    /// Number of blocks in the batch.
    pub fn len(&self) -> usize {
        self.issued.len()
    }

    /// Always false: a batch holds at least two blocks.
    pub fn is_empty(&self) -> bool {
        self.issued.is_empty()
    }

    /// Signature of `leaf`. Each leaf's signature is derived at most once,
    /// even under concurrent callers; later calls return the same value.
    ///
    /// # Errors
    /// Fails with `IndexOutOfRange` if the leaf does not exist.
    pub fn signature_for(&self, leaf: usize) -> Result<&TreeSignature, Error> {
        let cell = self.issued.get(leaf).ok_or(Error::IndexOutOfRange {
            index: leaf,
            leaves: self.issued.len(),
        })?;
        Ok(cell.get_or_init(|| {
            trace!(leaf, "deriving leaf signature");
            TreeSignature {
                path: AuthPath::from_tree(&self.tree, leaf),
                root_signature: self.root_signature.clone(),
            }
        }))
    }

    /// Signatures of every leaf, in order.
    pub fn signatures(&self) -> impl Iterator<Item = &TreeSignature> + '_ {
        (0..self.len()).filter_map(move |leaf| self.signature_for(leaf).ok())
    }
}

/// Signs batches of blocks and verifies single blocks.
#[derive(Debug, Clone, Default)]
pub struct BlockAuthenticator<E = TlvEncoder> {
    binder: BlockBinder<E>,
}

impl BlockAuthenticator<TlvEncoder> {
    /// Authenticator hashing with `algorithm` and the default TLV binding.
    pub fn new(algorithm: DigestAlgorithm) -> Self {
        Self {
            binder: BlockBinder::new(algorithm),
        }
    }
}

impl<E: CanonicalEncoder> BlockAuthenticator<E> {
    /// Authenticator with a custom canonical encoding.
    pub fn with_encoder(algorithm: DigestAlgorithm, encoder: E) -> Self {
        Self {
            binder: BlockBinder::with_encoder(algorithm, encoder),
        }
    }

    /// The binder used for leaves.
    pub fn binder(&self) -> &BlockBinder<E> {
        &self.binder
    }

    fn algorithm(&self) -> DigestAlgorithm {
        self.binder.engine().algorithm()
    }

    /// Bound leaf digests of `blocks`.
    ///
    /// Every binding is resolved before anything is hashed, so a missing one
    /// fails the batch without side effects.
    pub fn bind_leaves<B: BindingSource + ?Sized>(
        &self,
        blocks: &LeafSet<'_>,
        bindings: &B,
    ) -> Result<Vec<Digest>, Error> {
        if blocks.len() < 2 {
            return Err(Error::TooFewLeaves(blocks.len()));
        }
        let resolved = (0..blocks.len())
            .map(|leaf| bindings.binding(leaf).ok_or(Error::MissingBindingContext(leaf)))
            .collect::<Result<Vec<_>, Error>>()?;

        #[cfg(feature = "parallel")]
        let iter = resolved.par_iter().zip(blocks.as_slice().par_iter());
        #[cfg(not(feature = "parallel"))]
        let iter = resolved.iter().zip(blocks.as_slice().iter());

        iter.map(|((name, info), payload)| self.binder.block_digest(name, info, payload))
            .collect()
    }

    /// Bind every block, build the tree and sign its root once.
    ///
    /// # Errors
    /// Fails with `TooFewLeaves` for fewer than two blocks (sign those with
    /// [`Self::sign_single`]) and with `MissingBindingContext` if a block has
    /// no name or metadata. No tree is produced in either case.
    pub fn build_batch<B, S>(
        &self,
        blocks: &LeafSet<'_>,
        bindings: &B,
        signer: &S,
    ) -> Result<SignedBatch, Error>
    where
        B: BindingSource + ?Sized,
        S: RootSigner + ?Sized,
    {
        let digests = self.bind_leaves(blocks, bindings)?;
        let mut builder =
            TreeBuilder::new(self.algorithm(), digests.len(), bindings.start_index())?;
        for (leaf, digest) in digests.into_iter().enumerate() {
            builder.set_leaf(leaf, digest)?;
        }
        let tree = builder.finish()?;
        debug!(
            leaves = tree.num_leaves(),
            start = tree.start_index(),
            root = %tree.root(),
            "signing batch root"
        );
        Ok(SignedBatch::sign(tree, signer))
    }

    /// Directly sign a block that is not part of a tree.
    pub fn sign_single<S: RootSigner + ?Sized>(
        &self,
        payload: &[u8],
        name: &ContentName,
        info: &SignedInfo,
        signer: &S,
    ) -> Result<BlockSignature, Error> {
        let digest = self.binder.block_digest(name, info, payload)?;
        Ok(BlockSignature::Direct(signer.sign_root(&digest)))
    }

    /// Verify one block against its signature.
    ///
    /// Returns `false` for any mismatch: wrong payload, name or metadata,
    /// tampered path, wrong signature or wrong key. The reason is not exposed.
    pub fn verify<V: RootVerifier + ?Sized>(
        &self,
        payload: &[u8],
        name: &ContentName,
        info: &SignedInfo,
        signature: &BlockSignature,
        verifier: &V,
    ) -> bool {
        let leaf = match self.binder.block_digest(name, info, payload) {
            Ok(leaf) => leaf,
            Err(_) => return false,
        };
        let valid = match signature {
            BlockSignature::Direct(sig) => verifier.verify_root(&leaf, sig),
            BlockSignature::Tree(sig) => {
                sig.path.algorithm() == self.algorithm()
                    && verifier.verify_root(&sig.path.recompute_root(&leaf), &sig.root_signature)
            }
        };
        if !valid {
            trace!(%name, "block signature rejected");
        }
        valid
    }

    /// Verify one block against the DER signature field it was shipped with.
    /// An undecodable field is simply invalid.
    pub fn verify_field<V: RootVerifier + ?Sized>(
        &self,
        payload: &[u8],
        name: &ContentName,
        info: &SignedInfo,
        field: &[u8],
        verifier: &V,
    ) -> bool {
        match BlockSignature::decode(field) {
            Ok(signature) => self.verify(payload, name, info, &signature, verifier),
            Err(_) => {
                trace!(%name, "undecodable signature field");
                false
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::binder::SegmentedBinding;
    use crate::signer::Ed25519Signer;
    use crate::ErrorKind;
    use std::sync::Arc;

    fn setup(sizes: &[usize]) -> (Vec<Vec<u8>>, SegmentedBinding) {
        let blocks = sizes
            .iter()
            .enumerate()
            .map(|(i, size)| vec![i as u8 + 1; *size])
            .collect();
        let info = SignedInfo::new([4u8; 32], 1_650_000_000_000);
        let bindings = SegmentedBinding::new("/ndn/unit".parse().unwrap(), 0, info);
        (blocks, bindings)
    }

    #[test]
    fn batch_round_trip() {
        let (blocks, bindings) = setup(&[10, 20, 30]);
        let signer = Ed25519Signer::from_seed(&mut [8u8; 32]).unwrap();
        let auth = BlockAuthenticator::new(DigestAlgorithm::Sha256);
        let batch = auth
            .build_batch(&LeafSet::from_blocks(&blocks), &bindings, &signer)
            .unwrap();

        let info = SignedInfo::new([4u8; 32], 1_650_000_000_000);
        for (leaf, signature) in batch.signatures().enumerate() {
            let sig = BlockSignature::Tree(signature.clone());
            let name = bindings.name_of(leaf).unwrap();
            assert!(auth.verify(&blocks[leaf], &name, &info, &sig, &signer.verifier()));
            assert!(auth.verify_field(
                &blocks[leaf],
                &name,
                &info,
                &sig.encode().unwrap(),
                &signer.verifier()
            ));
        }
    }

    #[test]
    fn rejects_small_and_unbound_batches() {
        let signer = Ed25519Signer::from_seed(&mut [8u8; 32]).unwrap();
        let auth = BlockAuthenticator::new(DigestAlgorithm::Sha256);

        let (blocks, bindings) = setup(&[10]);
        let err = auth
            .build_batch(&LeafSet::from_blocks(&blocks), &bindings, &signer)
            .unwrap_err();
        assert_eq!(err, Error::TooFewLeaves(1));
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);

        let (blocks, bindings) = setup(&[10, 10, 10]);
        let explicit = vec![
            (bindings.name_of(0).unwrap(), SignedInfo::new([0u8; 32], 0)),
            (bindings.name_of(1).unwrap(), SignedInfo::new([0u8; 32], 0)),
        ];
        assert_eq!(
            auth.build_batch(&LeafSet::from_blocks(&blocks), &explicit, &signer)
                .unwrap_err(),
            Error::MissingBindingContext(2)
        );

        let info = SignedInfo::new([4u8; 32], 1_650_000_000_000);
        let near_end = SegmentedBinding::new("/a".parse().unwrap(), u64::MAX, info);
        assert_eq!(
            auth.build_batch(&LeafSet::from_blocks(&blocks), &near_end, &signer)
                .unwrap_err(),
            Error::MissingBindingContext(1)
        );
    }

    #[test]
    fn signature_for_is_memoized() {
        let (blocks, bindings) = setup(&[1, 2, 3, 4, 5]);
        let signer = Ed25519Signer::from_seed(&mut [8u8; 32]).unwrap();
        let auth = BlockAuthenticator::new(DigestAlgorithm::Sha256);
        let batch = auth
            .build_batch(&LeafSet::from_blocks(&blocks), &bindings, &signer)
            .unwrap();

        let first = batch.signature_for(3).unwrap();
        let second = batch.signature_for(3).unwrap();
        assert!(std::ptr::eq(first, second));
        assert_eq!(
            first,
            &TreeSignature::for_leaf(batch.tree(), 3, batch.root_signature()).unwrap()
        );
        assert_eq!(
            batch.signature_for(5).unwrap_err(),
            Error::IndexOutOfRange { index: 5, leaves: 5 }
        );
    }

    #[test]
    fn concurrent_signature_derivation() {
        let (blocks, bindings) = setup(&[3; 16]);
        let signer = Ed25519Signer::from_seed(&mut [8u8; 32]).unwrap();
        let auth = BlockAuthenticator::new(DigestAlgorithm::Sha256);
        let batch = Arc::new(
            auth.build_batch(&LeafSet::from_blocks(&blocks), &bindings, &signer)
                .unwrap(),
        );

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let batch = Arc::clone(&batch);
                std::thread::spawn(move || {
                    (0..16)
                        .map(|i| batch.signature_for((i + t) % 16).unwrap() as *const _ as usize)
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        let mut seen: Vec<Vec<usize>> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        for (t, addresses) in seen.iter_mut().enumerate() {
            addresses.rotate_right(t);
        }
        assert!(seen.windows(2).all(|w| w[0] == w[1]));
    }

    #[test]
    fn direct_signatures() {
        let signer = Ed25519Signer::from_seed(&mut [8u8; 32]).unwrap();
        let auth = BlockAuthenticator::new(DigestAlgorithm::Sha256);
        let name: ContentName = "/ndn/single".parse().unwrap();
        let info = SignedInfo::new([1u8; 32], 7);

        let signature = auth.sign_single(b"lonely", &name, &info, &signer).unwrap();
        assert!(matches!(signature, BlockSignature::Direct(_)));
        assert!(auth.verify(b"lonely", &name, &info, &signature, &signer.verifier()));
        assert!(!auth.verify(b"lonely!", &name, &info, &signature, &signer.verifier()));

        let field = signature.encode().unwrap();
        assert_eq!(BlockSignature::decode(&field).unwrap(), signature);
        assert!(auth.verify_field(b"lonely", &name, &info, &field, &signer.verifier()));
    }

    #[test]
    fn tree_signature_is_not_a_direct_signature() {
        let (blocks, bindings) = setup(&[4, 4]);
        let signer = Ed25519Signer::from_seed(&mut [8u8; 32]).unwrap();
        let auth = BlockAuthenticator::new(DigestAlgorithm::Sha256);
        let batch = auth
            .build_batch(&LeafSet::from_blocks(&blocks), &bindings, &signer)
            .unwrap();
        let info = SignedInfo::new([4u8; 32], 1_650_000_000_000);

        let as_direct = BlockSignature::Direct(batch.root_signature().clone());
        let name = bindings.name_of(0).unwrap();
        assert!(!auth.verify(&blocks[0], &name, &info, &as_direct, &signer.verifier()));
    }

    #[test]
    fn algorithm_mismatch_is_rejected() {
        let (blocks, bindings) = setup(&[4, 4, 4]);
        let signer = Ed25519Signer::from_seed(&mut [8u8; 32]).unwrap();
        let blake = BlockAuthenticator::new(DigestAlgorithm::Blake2b256);
        let batch = blake
            .build_batch(&LeafSet::from_blocks(&blocks), &bindings, &signer)
            .unwrap();
        let info = SignedInfo::new([4u8; 32], 1_650_000_000_000);
        let sig = BlockSignature::Tree(batch.signature_for(0).unwrap().clone());

        let name = bindings.name_of(0).unwrap();
        assert!(blake.verify(&blocks[0], &name, &info, &sig, &signer.verifier()));
        let sha = BlockAuthenticator::new(DigestAlgorithm::Sha256);
        assert!(!sha.verify(&blocks[0], &name, &info, &sig, &signer.verifier()));
    }

    #[test]
    fn garbage_fields_do_not_verify() {
        let signer = Ed25519Signer::from_seed(&mut [8u8; 32]).unwrap();
        let auth = BlockAuthenticator::new(DigestAlgorithm::Sha256);
        let name: ContentName = "/x".parse().unwrap();
        let info = SignedInfo::new([0u8; 32], 0);
        let fields: [&[u8]; 3] = [&[], &[0x30, 0x00], &[0x30, 0x05, 0x04, 0x01]];
        for field in fields {
            assert!(!auth.verify_field(b"x", &name, &info, field, &signer.verifier()));
        }
        assert_eq!(
            BlockSignature::decode(&[0x30]).unwrap_err().kind(),
            ErrorKind::Decoding
        );
    }
}
