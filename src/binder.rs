//! Binding of a block's name, signed metadata and payload into one leaf.
//!
//! The leaf digest of a block is `H(bind(name, info, payload))`. Because the
//! name and metadata are part of the hashed bytes, a valid leaf cannot be
//! replayed under another name or with other metadata.
use crate::common::{checked_range, Digest};
use crate::digest::{DigestAlgorithm, DigestEngine};
use crate::errors::Error;
use crate::name::ContentName;
use crate::signed_info::SignedInfo;
use crate::tlv::{self, TlvEncoder};
use crate::traits::CanonicalEncoder;
use std::collections::BTreeMap;

/// Resolves the name and signed metadata of each leaf of a batch.
pub trait BindingSource: Sync {
    /// Name and metadata of `leaf`, or `None` if the leaf has no context.
    fn binding(&self, leaf: usize) -> Option<(ContentName, &SignedInfo)>;

    /// Segment number of leaf 0. Trees built from this source record it as
    /// their start index.
    fn start_index(&self) -> u64 {
        0
    }
}

/// Leaf `i` is named `base/seg=(start + i)` and carries the shared metadata,
/// unless an override was registered for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentedBinding {
    base: ContentName,
    start_segment: u64,
    info: SignedInfo,
    overrides: BTreeMap<usize, SignedInfo>,
}

impl SegmentedBinding {
    /// Bindings for blocks named under `base`, numbered from `start_segment`.
    pub fn new(base: ContentName, start_segment: u64, info: SignedInfo) -> Self {
        Self {
            base,
            start_segment,
            info,
            overrides: BTreeMap::new(),
        }
    }

    /// Use `info` instead of the shared metadata for `leaf`.
    pub fn with_override(mut self, leaf: usize, info: SignedInfo) -> Self {
        self.overrides.insert(leaf, info);
        self
    }

    /// Full name of `leaf`, or `None` if its segment number does not fit in
    /// a `u64`.
    pub fn name_of(&self, leaf: usize) -> Option<ContentName> {
        let segment = u64::try_from(leaf)
            .ok()
            .and_then(|leaf| self.start_segment.checked_add(leaf))?;
        Some(self.base.clone().append_segment(segment))
    }
}

impl BindingSource for SegmentedBinding {
    fn binding(&self, leaf: usize) -> Option<(ContentName, &SignedInfo)> {
        let info = self.overrides.get(&leaf).unwrap_or(&self.info);
        Some((self.name_of(leaf)?, info))
    }

    fn start_index(&self) -> u64 {
        self.start_segment
    }
}

impl BindingSource for [(ContentName, SignedInfo)] {
    fn binding(&self, leaf: usize) -> Option<(ContentName, &SignedInfo)> {
        self.get(leaf).map(|(name, info)| (name.clone(), info))
    }
}

impl BindingSource for Vec<(ContentName, SignedInfo)> {
    fn binding(&self, leaf: usize) -> Option<(ContentName, &SignedInfo)> {
        self.as_slice().binding(leaf)
    }
}

/// Produces the canonical bytes of a block and its leaf digest.
#[derive(Debug, Clone, Default)]
pub struct BlockBinder<E = TlvEncoder> {
    engine: DigestEngine,
    encoder: E,
}

impl BlockBinder<TlvEncoder> {
    /// Binder using the default TLV encoding.
    pub fn new(algorithm: DigestAlgorithm) -> Self {
        Self::with_encoder(algorithm, TlvEncoder)
    }
}

impl<E: CanonicalEncoder> BlockBinder<E> {
    /// Binder using a custom canonical encoding.
    pub fn with_encoder(algorithm: DigestAlgorithm, encoder: E) -> Self {
        Self {
            engine: DigestEngine::new(algorithm),
            encoder,
        }
    }

    /// The engine leaves are hashed with.
    pub fn engine(&self) -> &DigestEngine {
        &self.engine
    }

    /// Canonical bytes of `name || info || payload[offset..offset + length]`.
    ///
    /// # Errors
    /// Fails with `InvalidRange` if the range does not fit in `payload`, or
    /// with whatever the encoder reports.
    pub fn bind(
        &self,
        name: &ContentName,
        info: &SignedInfo,
        payload: &[u8],
        offset: usize,
        length: usize,
    ) -> Result<Vec<u8>, Error> {
        let range = checked_range(payload.len(), offset, length)?;
        let mut inner = self.encoder.canonical_bytes(name, info)?;
        tlv::write_tlv(&mut inner, tlv::CONTENT, &payload[range]);

        let mut out = Vec::with_capacity(inner.len() + 10);
        tlv::write_tlv(&mut out, tlv::DATA, &inner);
        Ok(out)
    }

    /// Digest of the bound range; this is the value placed in the tree.
    pub fn leaf_digest(
        &self,
        name: &ContentName,
        info: &SignedInfo,
        payload: &[u8],
        offset: usize,
        length: usize,
    ) -> Result<Digest, Error> {
        Ok(self
            .engine
            .digest(&self.bind(name, info, payload, offset, length)?))
    }

    /// Leaf digest of a whole block.
    pub fn block_digest(
        &self,
        name: &ContentName,
        info: &SignedInfo,
        payload: &[u8],
    ) -> Result<Digest, Error> {
        self.leaf_digest(name, info, payload, 0, payload.len())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn fixture() -> (ContentName, SignedInfo) {
        (
            "/ndn/test/seg=0".parse().unwrap(),
            SignedInfo::new([9u8; 32], 1_000),
        )
    }

    #[test]
    fn binds_name_and_metadata() {
        let binder = BlockBinder::new(DigestAlgorithm::Sha256);
        let (name, info) = fixture();
        let payload = b"payload bytes";

        let leaf = binder.block_digest(&name, &info, payload).unwrap();
        let renamed = "/ndn/test/seg=1".parse().unwrap();
        assert_ne!(leaf, binder.block_digest(&renamed, &info, payload).unwrap());
        let restamped = SignedInfo::new([9u8; 32], 1_001);
        assert_ne!(leaf, binder.block_digest(&name, &restamped, payload).unwrap());
        assert_ne!(leaf, binder.engine().digest(payload));
    }

    #[test]
    fn range_is_equivalent_to_copy() {
        let binder = BlockBinder::new(DigestAlgorithm::Sha256);
        let (name, info) = fixture();
        let buffer = b"0123456789";
        assert_eq!(
            binder.bind(&name, &info, buffer, 3, 4).unwrap(),
            binder.bind(&name, &info, b"3456", 0, 4).unwrap()
        );
        assert!(binder.bind(&name, &info, buffer, 8, 3).is_err());
    }

    #[test]
    fn empty_payload_is_deterministic() {
        let binder = BlockBinder::new(DigestAlgorithm::Blake2b256);
        let (name, info) = fixture();
        let a = binder.block_digest(&name, &info, &[]).unwrap();
        let b = binder.leaf_digest(&name, &info, b"ignored", 7, 0).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn segmented_binding() {
        let (_, info) = fixture();
        let special = info.clone().with_freshness(30);
        let bindings = SegmentedBinding::new("/ndn/movie".parse().unwrap(), 37, info.clone())
            .with_override(2, special.clone());

        let (name, leaf_info) = bindings.binding(0).unwrap();
        assert_eq!(name.segment(), Some(37));
        assert_eq!(leaf_info, &info);
        assert_eq!(bindings.binding(2).unwrap().1, &special);
        assert_eq!(bindings.start_index(), 37);

        let explicit = vec![(name, info)];
        assert!(explicit.binding(0).is_some());
        assert!(explicit.binding(1).is_none());
    }

    #[test]
    fn segment_numbers_do_not_wrap() {
        let (_, info) = fixture();
        let bindings = SegmentedBinding::new("/a".parse().unwrap(), u64::MAX, info);
        assert_eq!(bindings.name_of(0).unwrap().segment(), Some(u64::MAX));
        assert!(bindings.name_of(1).is_none());
        assert!(bindings.binding(1).is_none());
    }
}
