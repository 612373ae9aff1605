//! Authentication paths: the sibling digests needed to climb from one leaf to
//! the root of a [`HashTree`].
//!
//! A path records one step per level on which the climbing node has a
//! sibling. On levels where the node is the unpaired last one it is promoted
//! unchanged and no step is recorded. Since the path also carries the leaf
//! index and the leaf count, the whole shape of the climb can be derived from
//! those two numbers, which is what decoding checks the recorded steps against.
//!
//! The interchange encoding is DER:
//!
//! ```text
//! AuthPathInfo ::= SEQUENCE {
//!     version     INTEGER (1),
//!     algorithm   OBJECT IDENTIFIER,
//!     leafIndex   INTEGER,
//!     leafCount   INTEGER,
//!     steps       OCTET STRING  -- (side || sibling digest) per step
//! }
//! ```
//!
//! where `side` is `0x00` when the sibling is the left child and `0x01` when it
//! is the right child.
use crate::common::{Digest, DIGEST_SIZE};
use crate::digest::{DigestAlgorithm, DigestEngine};
use crate::errors::Error;
use crate::tree::{parent_level_len, HashTree};
use der::asn1::{ObjectIdentifier, OctetStringRef};
use der::{Decode, Encode, Sequence};

#[cfg(feature = "serde_enabled")]
use serde::{Deserialize, Serialize};

const PATH_VERSION: u8 = 1;
const STEP_SIZE: usize = DIGEST_SIZE + 1;

/// Which child of the parent the sibling is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde_enabled", derive(Serialize, Deserialize))]
pub enum Side {
    /// The sibling is the left child, the climbing node the right one.
    Left,
    /// The sibling is the right child, the climbing node the left one.
    Right,
}

impl Side {
    fn to_byte(self) -> u8 {
        match self {
            Side::Left => 0,
            Side::Right => 1,
        }
    }

    fn from_byte(byte: u8) -> Result<Self, Error> {
        match byte {
            0 => Ok(Side::Left),
            1 => Ok(Side::Right),
            _ => Err(Error::MalformedPath("invalid side flag")),
        }
    }
}

/// One level of the climb.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde_enabled", derive(Serialize, Deserialize))]
pub struct PathStep {
    /// Where the sibling sits.
    pub side: Side,
    /// The sibling's digest.
    pub sibling: Digest,
}

/// Authentication path of one leaf.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde_enabled", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde_enabled", serde(try_from = "RawAuthPath"))]
pub struct AuthPath {
    algorithm: DigestAlgorithm,
    leaf_index: usize,
    leaf_count: usize,
    steps: Vec<PathStep>,
}

/// Unchecked form of [`AuthPath`], validated on conversion.
#[cfg(feature = "serde_enabled")]
#[derive(Deserialize)]
struct RawAuthPath {
    algorithm: DigestAlgorithm,
    leaf_index: usize,
    leaf_count: usize,
    steps: Vec<PathStep>,
}

#[cfg(feature = "serde_enabled")]
impl TryFrom<RawAuthPath> for AuthPath {
    type Error = Error;

    fn try_from(raw: RawAuthPath) -> Result<Self, Error> {
        AuthPath::checked(raw.algorithm, raw.leaf_index, raw.leaf_count, raw.steps)
    }
}

#[derive(Sequence)]
struct AuthPathInfo<'a> {
    version: u8,
    algorithm: ObjectIdentifier,
    leaf_index: u64,
    leaf_count: u64,
    steps: OctetStringRef<'a>,
}

/// Position of the climbing node on each level below the root, together with
/// the length of that level. Yields `None` for the sibling when the node is
/// promoted.
fn climb(leaf_index: usize, leaf_count: usize) -> impl Iterator<Item = (usize, Option<Side>)> {
    let mut pos = leaf_index;
    let mut len = leaf_count;
    std::iter::from_fn(move || {
        if len <= 1 {
            return None;
        }
        let sibling = if pos % 2 == 1 {
            Some(Side::Left)
        } else if pos + 1 < len {
            Some(Side::Right)
        } else {
            None
        };
        let current = pos;
        pos /= 2;
        len = parent_level_len(len);
        Some((current, sibling))
    })
}

impl AuthPath {
    /// Extract the path of `leaf_index` from `tree`.
    ///
    /// # Errors
    /// Fails with `IndexOutOfRange` if the leaf does not exist.
    pub fn extract(tree: &HashTree, leaf_index: usize) -> Result<Self, Error> {
        if leaf_index >= tree.num_leaves() {
            return Err(Error::IndexOutOfRange {
                index: leaf_index,
                leaves: tree.num_leaves(),
            });
        }
        Ok(Self::from_tree(tree, leaf_index))
    }

    /// Path extraction for an index already known to be in range.
    pub(crate) fn from_tree(tree: &HashTree, leaf_index: usize) -> Self {
        let steps = climb(leaf_index, tree.num_leaves())
            .enumerate()
            .filter_map(|(level, (pos, side))| {
                let side = side?;
                let sibling_pos = match side {
                    Side::Left => pos - 1,
                    Side::Right => pos + 1,
                };
                tree.node(level, sibling_pos).map(|sibling| PathStep {
                    side,
                    sibling: *sibling,
                })
            })
            .collect();

        Self {
            algorithm: tree.algorithm(),
            leaf_index,
            leaf_count: tree.num_leaves(),
            steps,
        }
    }

    /// Replay the path from `leaf` and return the root it leads to.
    pub fn recompute_root(&self, leaf: &Digest) -> Digest {
        let engine = DigestEngine::new(self.algorithm);
        self.steps.iter().fold(*leaf, |node, step| match step.side {
            Side::Left => engine.combine(&step.sibling, &node),
            Side::Right => engine.combine(&node, &step.sibling),
        })
    }

    /// Algorithm the tree was built with.
    pub fn algorithm(&self) -> DigestAlgorithm {
        self.algorithm
    }

    /// Index of the leaf inside its tree.
    pub fn leaf_index(&self) -> usize {
        self.leaf_index
    }

    /// Number of leaves of the tree.
    pub fn leaf_count(&self) -> usize {
        self.leaf_count
    }

    /// Recorded steps, from the leaf upwards.
    pub fn steps(&self) -> &[PathStep] {
        &self.steps
    }

    /// DER encoding of the path.
    pub fn encode(&self) -> Result<Vec<u8>, Error> {
        let mut steps = Vec::with_capacity(self.steps.len() * STEP_SIZE);
        for step in &self.steps {
            steps.push(step.side.to_byte());
            steps.extend_from_slice(step.sibling.as_bytes());
        }
        let info = AuthPathInfo {
            version: PATH_VERSION,
            algorithm: self.algorithm.oid(),
            leaf_index: self.leaf_index as u64,
            leaf_count: self.leaf_count as u64,
            steps: OctetStringRef::new(&steps)?,
        };
        Ok(info.to_der()?)
    }

    /// Parse a DER encoded path.
    ///
    /// # Errors
    /// Any truncated or trailing input, and any path whose steps disagree with
    /// the shape implied by its leaf index and leaf count, is rejected with a
    /// decoding error.
    pub fn decode(bytes: &[u8]) -> Result<Self, Error> {
        let info = AuthPathInfo::from_der(bytes)?;
        if info.version != PATH_VERSION {
            return Err(Error::MalformedPath("unsupported version"));
        }
        let algorithm = DigestAlgorithm::from_oid(&info.algorithm)
            .map_err(|_| Error::MalformedPath("unknown digest algorithm"))?;
        let leaf_index = usize::try_from(info.leaf_index)
            .map_err(|_| Error::MalformedPath("leaf index too large"))?;
        let leaf_count = usize::try_from(info.leaf_count)
            .map_err(|_| Error::MalformedPath("leaf count too large"))?;

        let raw = info.steps.as_bytes();
        if raw.len() % STEP_SIZE != 0 {
            return Err(Error::MalformedPath("truncated step"));
        }
        let steps = raw
            .chunks(STEP_SIZE)
            .map(|chunk| {
                Ok(PathStep {
                    side: Side::from_byte(chunk[0])?,
                    sibling: Digest::from_bytes(&chunk[1..])?,
                })
            })
            .collect::<Result<Vec<_>, Error>>()?;

        Self::checked(algorithm, leaf_index, leaf_count, steps)
    }

    /// Accept `steps` only if they match the climb implied by `leaf_index`
    /// and `leaf_count`.
    fn checked(
        algorithm: DigestAlgorithm,
        leaf_index: usize,
        leaf_count: usize,
        steps: Vec<PathStep>,
    ) -> Result<Self, Error> {
        if leaf_count < 2 {
            return Err(Error::MalformedPath("fewer than 2 leaves"));
        }
        if leaf_index >= leaf_count {
            return Err(Error::MalformedPath("leaf index out of range"));
        }
        let expected: Vec<Side> = climb(leaf_index, leaf_count)
            .filter_map(|(_, side)| side)
            .collect();
        if expected.len() != steps.len() {
            return Err(Error::MalformedPath("step count does not match tree shape"));
        }
        if expected.iter().zip(&steps).any(|(side, step)| *side != step.side) {
            return Err(Error::MalformedPath("side does not match leaf position"));
        }

        Ok(Self {
            algorithm,
            leaf_index,
            leaf_count,
            steps,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ErrorKind;

    fn tree(n: usize) -> HashTree {
        let engine = DigestEngine::default();
        let leaves: Vec<Digest> = (0..n)
            .map(|i| engine.digest(format!("leaf {}", i).as_bytes()))
            .collect();
        HashTree::build(DigestAlgorithm::Sha256, &leaves, 0).unwrap()
    }

    #[test]
    fn every_leaf_reaches_the_root() {
        for n in [2, 3, 4, 5, 6, 7, 9, 17, 33] {
            let tree = tree(n);
            for i in 0..n {
                let path = AuthPath::extract(&tree, i).unwrap();
                assert_eq!(
                    path.recompute_root(tree.leaf(i).unwrap()),
                    tree.root(),
                    "leaf {} of {}",
                    i,
                    n
                );
            }
        }
    }

    #[test]
    fn promoted_leaf_skips_levels() {
        let tree = tree(5);
        let path = AuthPath::extract(&tree, 4).unwrap();
        assert_eq!(path.steps().len(), 1);
        assert_eq!(path.steps()[0].side, Side::Left);
        assert_eq!(path.steps()[0].sibling, *tree.node(2, 0).unwrap());

        let path = AuthPath::extract(&tree, 2).unwrap();
        let sides: Vec<Side> = path.steps().iter().map(|s| s.side).collect();
        assert_eq!(sides, vec![Side::Right, Side::Left, Side::Right]);
    }

    #[test]
    fn out_of_range() {
        let tree = tree(4);
        assert_eq!(
            AuthPath::extract(&tree, 4),
            Err(Error::IndexOutOfRange { index: 4, leaves: 4 })
        );
    }

    #[test]
    fn der_round_trip() {
        let tree = tree(11);
        for i in 0..11 {
            let path = AuthPath::extract(&tree, i).unwrap();
            let decoded = AuthPath::decode(&path.encode().unwrap()).unwrap();
            assert_eq!(decoded, path);
            assert_eq!(decoded.recompute_root(tree.leaf(i).unwrap()), tree.root());
        }
    }

    #[test]
    fn rejects_truncated_input() {
        let tree = tree(6);
        let encoded = AuthPath::extract(&tree, 3).unwrap().encode().unwrap();
        assert_eq!(AuthPath::decode(&[]).unwrap_err().kind(), ErrorKind::Decoding);
        for cut in [1, 10, encoded.len() - 1] {
            let err = AuthPath::decode(&encoded[..cut]).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Decoding, "cut at {}", cut);
        }
        let mut trailing = encoded.clone();
        trailing.push(0);
        assert!(AuthPath::decode(&trailing).is_err());
    }

    #[test]
    fn rejects_inconsistent_paths() {
        let tree = tree(6);
        let path = AuthPath::extract(&tree, 3).unwrap();

        let mut flipped = path.clone();
        flipped.steps[0].side = Side::Right;
        assert_eq!(
            AuthPath::decode(&flipped.encode().unwrap()),
            Err(Error::MalformedPath("side does not match leaf position"))
        );

        let mut short = path.clone();
        short.steps.pop();
        assert_eq!(
            AuthPath::decode(&short.encode().unwrap()),
            Err(Error::MalformedPath("step count does not match tree shape"))
        );

        let mut moved = path;
        moved.leaf_index = 6;
        assert_eq!(
            AuthPath::decode(&moved.encode().unwrap()),
            Err(Error::MalformedPath("leaf index out of range"))
        );
    }
}
