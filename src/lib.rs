//! Merkle hash tree authentication for named data blocks.
//!
//! A producer splits content into named blocks, binds every block's name and
//! signed metadata to its payload, builds one hash tree over the bound leaf
//! digests and signs only the root. Each block then ships with its own
//! authentication path plus the shared root signature, so a consumer holding a
//! single block can verify name, metadata and bytes without fetching anything
//! else.
//!
//! ```
//! use ndn_merkle_auth::{
//!     BlockAuthenticator, BlockSignature, ContentName, DigestAlgorithm, Ed25519Signer, LeafSet,
//!     SegmentedBinding, SignedInfo,
//! };
//!
//! let blocks: [&[u8]; 3] = [b"first", b"second", b"third"];
//! let leaves = LeafSet::from_blocks(&blocks);
//! let base: ContentName = "/ndn/demo/video".parse().unwrap();
//! let info = SignedInfo::new([7u8; 32], 1_700_000_000_000);
//! let bindings = SegmentedBinding::new(base.clone(), 0, info.clone());
//!
//! let signer = Ed25519Signer::from_seed(&mut [1u8; 32]).unwrap();
//! let verifier = signer.verifier();
//!
//! let auth = BlockAuthenticator::new(DigestAlgorithm::Sha256);
//! let batch = auth.build_batch(&leaves, &bindings, &signer).unwrap();
//!
//! let signature = BlockSignature::from(batch.signature_for(1).unwrap().clone());
//! let name = base.clone().append_segment(1);
//! assert!(auth.verify(b"second", &name, &info, &signature, &verifier));
//! assert!(!auth.verify(b"tampered", &name, &info, &signature, &verifier));
//! ```
#![warn(missing_docs, rust_2018_idioms)]

mod common;
mod errors;
mod tlv;

pub mod authenticator;
pub mod binder;
pub mod digest;
pub mod name;
pub mod path;
pub mod signed_info;
pub mod signer;
pub mod traits;
pub mod tree;

pub use authenticator::{BlockAuthenticator, BlockSignature, SignedBatch, TreeSignature};
pub use binder::{BindingSource, BlockBinder, SegmentedBinding};
pub use common::{Digest, RootSignature, DIGEST_SIZE};
pub use digest::{DigestAlgorithm, DigestEngine};
pub use errors::{Error, ErrorKind};
pub use name::{ContentName, NameComponent};
pub use path::{AuthPath, PathStep, Side};
pub use signed_info::{ContentType, SignedInfo};
pub use signer::{Ed25519Signer, Ed25519Verifier};
pub use tlv::TlvEncoder;
pub use traits::{CanonicalEncoder, RootSigner, RootVerifier};
pub use tree::{HashTree, LeafSet, TreeBuilder};
