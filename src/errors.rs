//! Errors raised while building, encoding or decoding authenticated batches
use thiserror::Error;

/// Coarse classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The caller handed in a malformed batch, range or binding.
    InvalidArgument,
    /// A leaf index outside of the tree was requested.
    IndexOutOfRange,
    /// Encoded bytes (DER or TLV) could not be parsed.
    Decoding,
    /// A digest or signature algorithm, or a key, is not usable.
    CryptoProvider,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
/// Enum of errors associated with tree authentication
pub enum Error {
    /// A tree needs at least two leaves; single blocks are signed directly.
    #[error("a hash tree needs at least 2 leaves, got {0}")]
    TooFewLeaves(usize),
    /// Fewer leaf slots were populated than the tree was declared with.
    #[error("tree declared with {declared} leaves but only {populated} were populated")]
    LeafCountMismatch {
        /// Number of leaves the builder was sized for.
        declared: usize,
        /// Number of leaves actually set.
        populated: usize,
    },
    /// No name or signed info could be resolved for the given leaf.
    #[error("no binding context for leaf {0}")]
    MissingBindingContext(usize),
    /// The leaf index does not exist in the tree.
    #[error("leaf index {index} out of range for a tree of {leaves} leaves")]
    IndexOutOfRange {
        /// Requested leaf.
        index: usize,
        /// Number of leaves in the tree.
        leaves: usize,
    },
    /// A byte range does not fit inside its buffer.
    #[error("range {offset}+{length} exceeds buffer of {available} bytes")]
    InvalidRange {
        /// Start of the range.
        offset: usize,
        /// Length of the range.
        length: usize,
        /// Size of the underlying buffer.
        available: usize,
    },
    /// Buffers cannot be fragmented into zero-width blocks.
    #[error("block width must be non zero")]
    InvalidBlockWidth,
    /// A content name could not be parsed.
    #[error("invalid content name: {0}")]
    InvalidName(String),
    /// The underlying DER reader rejected the input.
    #[error("decoding error: {0}")]
    Decoding(String),
    /// The DER structure parsed, but its content is inconsistent.
    #[error("malformed authentication path: {0}")]
    MalformedPath(&'static str),
    /// A digest must be exactly `DIGEST_SIZE` bytes.
    #[error("invalid digest size {0}")]
    InvalidDigestSize(usize),
    /// The digest algorithm name or identifier is not supported.
    #[error("unsupported digest algorithm {0}")]
    UnsupportedAlgorithm(String),
    /// Error occurs when the size of the secret key is not the expected.
    #[error("invalid secret key size {0}")]
    InvalidSecretKeySize(usize),
    /// Error occurs when the size of the public key is not the expected.
    #[error("invalid public key size {0}")]
    InvalidPublicKeySize(usize),
    /// The public key bytes do not decode to a usable key.
    #[error("invalid public key")]
    InvalidPublicKey,
}

impl Error {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::TooFewLeaves(_)
            | Error::LeafCountMismatch { .. }
            | Error::MissingBindingContext(_)
            | Error::InvalidRange { .. }
            | Error::InvalidBlockWidth
            | Error::InvalidName(_)
            | Error::InvalidDigestSize(_) => ErrorKind::InvalidArgument,
            Error::IndexOutOfRange { .. } => ErrorKind::IndexOutOfRange,
            Error::Decoding(_) | Error::MalformedPath(_) => ErrorKind::Decoding,
            Error::UnsupportedAlgorithm(_)
            | Error::InvalidSecretKeySize(_)
            | Error::InvalidPublicKeySize(_)
            | Error::InvalidPublicKey => ErrorKind::CryptoProvider,
        }
    }
}

impl From<der::Error> for Error {
    fn from(err: der::Error) -> Error {
        Error::Decoding(err.to_string())
    }
}

impl From<ed25519_dalek::SignatureError> for Error {
    fn from(_: ed25519_dalek::SignatureError) -> Error {
        Error::InvalidPublicKey
    }
}
