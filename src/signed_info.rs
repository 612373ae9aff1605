//! Publisher metadata that is signed together with every block.
use crate::common::DIGEST_SIZE;
use crate::name::ContentName;

#[cfg(feature = "serde_enabled")]
use serde::{Deserialize, Serialize};

/// Type of the content carried by a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde_enabled", derive(Serialize, Deserialize))]
pub struct ContentType(pub u32);

impl ContentType {
    /// Ordinary application data.
    pub const DATA: ContentType = ContentType(0);
    /// A link to another name.
    pub const LINK: ContentType = ContentType(1);
    /// A published public key.
    pub const KEY: ContentType = ContentType(2);
    /// Negative acknowledgement.
    pub const NACK: ContentType = ContentType(3);
}

impl Default for ContentType {
    fn default() -> Self {
        ContentType::DATA
    }
}

/// Signed metadata of a block. It is usually shared by every block of a batch.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde_enabled", derive(Serialize, Deserialize))]
pub struct SignedInfo {
    /// Digest of the publisher's public key.
    pub publisher: [u8; DIGEST_SIZE],
    /// Milliseconds since the unix epoch.
    pub timestamp: u64,
    /// Type of the content.
    pub content_type: ContentType,
    /// How long caches may consider the block fresh.
    pub freshness_seconds: Option<u32>,
    /// Segment number of the last block of the content, when known.
    pub final_segment: Option<u64>,
    /// Where the publisher's key can be fetched.
    pub key_locator: Option<ContentName>,
}

impl SignedInfo {
    /// Metadata for plain data with no optional fields.
    pub fn new(publisher: [u8; DIGEST_SIZE], timestamp: u64) -> Self {
        Self {
            publisher,
            timestamp,
            content_type: ContentType::DATA,
            freshness_seconds: None,
            final_segment: None,
            key_locator: None,
        }
    }

    /// Set the content type.
    pub fn with_content_type(mut self, content_type: ContentType) -> Self {
        self.content_type = content_type;
        self
    }

    /// Set the freshness period.
    pub fn with_freshness(mut self, seconds: u32) -> Self {
        self.freshness_seconds = Some(seconds);
        self
    }

    /// Set the final segment number.
    pub fn with_final_segment(mut self, segment: u64) -> Self {
        self.final_segment = Some(segment);
        self
    }

    /// Set the key locator.
    pub fn with_key_locator(mut self, locator: ContentName) -> Self {
        self.key_locator = Some(locator);
        self
    }
}
