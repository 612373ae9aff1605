//! Hash tree over an arbitrary number of leaves.
//!
//! Nodes live in one contiguous arena, level after level starting with the
//! leaves. Inside a level the node at position `p` has its parent at `p / 2` on
//! the next level and its sibling at `p ^ 1`. Adjacent nodes are paired left to
//! right and their parent is `H(left || right)`. When a level has an odd number
//! of nodes the last one has no sibling: it is copied unchanged into the next
//! level, neither hashed nor duplicated. The same rule drives path extraction
//! and root recomputation in [`crate::path`], and must not diverge from it.
use crate::common::{checked_range, Digest};
use crate::digest::{DigestAlgorithm, DigestEngine};
use crate::errors::Error;
use tracing::debug;

/// The ordered payloads of one signing batch.
///
/// Leaves either come from independent blocks or are ranges of one shared
/// buffer; in both cases they are borrowed, never copied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LeafSet<'a> {
    leaves: Vec<&'a [u8]>,
}

impl<'a> LeafSet<'a> {
    /// One leaf per block.
    pub fn from_blocks<B: AsRef<[u8]>>(blocks: &'a [B]) -> Self {
        Self {
            leaves: blocks.iter().map(AsRef::as_ref).collect(),
        }
    }

    /// Fragment `buffer[offset..offset + length]` into consecutive leaves of
    /// `block_width` bytes. The last leaf holds the remainder and may be
    /// shorter. An empty range yields an empty set.
    ///
    /// # Errors
    /// Fails if the range does not fit in `buffer` or `block_width` is zero.
    pub fn from_buffer(
        buffer: &'a [u8],
        offset: usize,
        length: usize,
        block_width: usize,
    ) -> Result<Self, Error> {
        if block_width == 0 {
            return Err(Error::InvalidBlockWidth);
        }
        let range = checked_range(buffer.len(), offset, length)?;
        Ok(Self {
            leaves: buffer[range].chunks(block_width).collect(),
        })
    }

    /// Number of leaves.
    pub fn len(&self) -> usize {
        self.leaves.len()
    }

    /// Whether the set has no leaves.
    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }

    /// Payload of `leaf`.
    pub fn get(&self, leaf: usize) -> Option<&'a [u8]> {
        self.leaves.get(leaf).copied()
    }

    /// Payloads in order.
    pub fn as_slice(&self) -> &[&'a [u8]] {
        &self.leaves
    }

    /// Iterate over the payloads.
    pub fn iter(&self) -> impl Iterator<Item = &'a [u8]> + '_ {
        self.leaves.iter().copied()
    }
}

/// Collects leaf digests into a tree of a declared size.
///
/// Leaves may be set in any order (for instance as they are computed by
/// several workers); `finish` refuses to build while a slot is still empty.
#[derive(Debug, Clone)]
pub struct TreeBuilder {
    engine: DigestEngine,
    start_index: u64,
    slots: Vec<Option<Digest>>,
}

impl TreeBuilder {
    /// Builder for `declared` leaves.
    ///
    /// # Errors
    /// Fails with `TooFewLeaves` when `declared < 2`.
    pub fn new(
        algorithm: DigestAlgorithm,
        declared: usize,
        start_index: u64,
    ) -> Result<Self, Error> {
        if declared < 2 {
            return Err(Error::TooFewLeaves(declared));
        }
        Ok(Self {
            engine: DigestEngine::new(algorithm),
            start_index,
            slots: vec![None; declared],
        })
    }

    /// Place the digest of `leaf`.
    pub fn set_leaf(&mut self, leaf: usize, digest: Digest) -> Result<(), Error> {
        let leaves = self.slots.len();
        let slot = self
            .slots
            .get_mut(leaf)
            .ok_or(Error::IndexOutOfRange { index: leaf, leaves })?;
        *slot = Some(digest);
        Ok(())
    }

    /// Number of slots set so far.
    pub fn populated(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    /// Hash every level and return the finished tree.
    ///
    /// # Errors
    /// Fails with `LeafCountMismatch` if any declared slot was never set.
    pub fn finish(self) -> Result<HashTree, Error> {
        let declared = self.slots.len();
        let populated = self.populated();
        if populated < declared {
            return Err(Error::LeafCountMismatch {
                declared,
                populated,
            });
        }
        let leaves = self.slots.into_iter().flatten().collect();
        Ok(HashTree::from_leaves(self.engine, leaves, self.start_index))
    }
}

/// A complete hash tree. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashTree {
    engine: DigestEngine,
    start_index: u64,
    nodes: Vec<Digest>,
    // `level_starts[k]..level_starts[k + 1]` is level `k` of `nodes`.
    level_starts: Vec<usize>,
}

impl HashTree {
    /// Build a tree over `leaves`.
    ///
    /// `start_index` is the external segment number of leaf 0. It only maps
    /// leaves to segments and does not take part in hashing.
    ///
    /// # Errors
    /// Fails with `TooFewLeaves` when fewer than two leaves are given.
    pub fn build(
        algorithm: DigestAlgorithm,
        leaves: &[Digest],
        start_index: u64,
    ) -> Result<Self, Error> {
        if leaves.len() < 2 {
            return Err(Error::TooFewLeaves(leaves.len()));
        }
        Ok(Self::from_leaves(
            DigestEngine::new(algorithm),
            leaves.to_vec(),
            start_index,
        ))
    }

    fn from_leaves(engine: DigestEngine, leaves: Vec<Digest>, start_index: u64) -> Self {
        let mut len = leaves.len();
        let mut nodes = leaves;
        nodes.reserve(len);
        let mut level_starts = vec![0];
        let mut start = 0;

        while len > 1 {
            let next = nodes.len();
            for pos in (0..len).step_by(2) {
                let left = nodes[start + pos];
                let parent = if pos + 1 < len {
                    let right = nodes[start + pos + 1];
                    engine.combine(&left, &right)
                } else {
                    left
                };
                nodes.push(parent);
            }
            level_starts.push(next);
            start = next;
            len = parent_level_len(len);
        }
        level_starts.push(nodes.len());

        let tree = Self {
            engine,
            start_index,
            nodes,
            level_starts,
        };
        debug!(
            leaves = tree.num_leaves(),
            depth = tree.max_depth(),
            algorithm = %engine.algorithm(),
            "built hash tree"
        );
        tree
    }

    /// The digest signed for the whole tree.
    pub fn root(&self) -> Digest {
        self.nodes[self.nodes.len() - 1]
    }

    /// Number of leaves.
    pub fn num_leaves(&self) -> usize {
        self.level_starts[1]
    }

    /// Number of levels above the leaves, `ceil(log2(num_leaves))`.
    pub fn max_depth(&self) -> usize {
        self.level_starts.len() - 2
    }

    /// Number of levels including leaves and root.
    pub fn levels(&self) -> usize {
        self.level_starts.len() - 1
    }

    /// Number of nodes on `level` (0 is the leaf level).
    pub fn level_len(&self, level: usize) -> usize {
        if level >= self.levels() {
            return 0;
        }
        self.level_starts[level + 1] - self.level_starts[level]
    }

    /// Digest of the node at `position` on `level`.
    pub fn node(&self, level: usize, position: usize) -> Option<&Digest> {
        if position >= self.level_len(level) {
            return None;
        }
        self.nodes.get(self.level_starts[level] + position)
    }

    /// Digest of `leaf`.
    pub fn leaf(&self, leaf: usize) -> Result<&Digest, Error> {
        self.node(0, leaf).ok_or(Error::IndexOutOfRange {
            index: leaf,
            leaves: self.num_leaves(),
        })
    }

    /// Segment number of leaf 0.
    pub fn start_index(&self) -> u64 {
        self.start_index
    }

    /// External segment number of `leaf`, or `None` if it does not fit in a
    /// `u64`.
    pub fn segment_of(&self, leaf: usize) -> Option<u64> {
        u64::try_from(leaf)
            .ok()
            .and_then(|leaf| self.start_index.checked_add(leaf))
    }

    /// Algorithm the tree was hashed with.
    pub fn algorithm(&self) -> DigestAlgorithm {
        self.engine.algorithm()
    }
}

/// Length of the level above a level of `len` nodes.
pub(crate) fn parent_level_len(len: usize) -> usize {
    len / 2 + len % 2
}
