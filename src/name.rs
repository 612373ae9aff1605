//! Hierarchical content names.
//!
//! A name is an ordered list of components. Blocks of one piece of content
//! share a prefix and differ in a trailing segment component, which carries the
//! block's global sequence number (not its index inside a tree).
use crate::errors::Error;
use std::fmt;
use std::str::FromStr;

#[cfg(feature = "serde_enabled")]
use serde::{Deserialize, Serialize};

const SEGMENT_PREFIX: &str = "seg=";

/// One component of a [`ContentName`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde_enabled", derive(Serialize, Deserialize))]
pub enum NameComponent {
    /// Opaque bytes.
    Generic(Vec<u8>),
    /// Segment (fragment) number.
    Segment(u64),
}

/// A content name such as `/ndn/video/seg=37`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde_enabled", derive(Serialize, Deserialize))]
pub struct ContentName {
    components: Vec<NameComponent>,
}

impl ContentName {
    /// The empty name, `/`.
    pub fn root() -> Self {
        Self::default()
    }

    /// Build a name out of components.
    pub fn from_components(components: Vec<NameComponent>) -> Self {
        Self { components }
    }

    /// Components of the name, in order.
    pub fn components(&self) -> &[NameComponent] {
        &self.components
    }

    /// Number of components.
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// Whether this is the root name.
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Append a generic component.
    pub fn append(mut self, component: impl Into<Vec<u8>>) -> Self {
        self.components
            .push(NameComponent::Generic(component.into()));
        self
    }

    /// Append a segment component.
    pub fn append_segment(mut self, segment: u64) -> Self {
        self.components.push(NameComponent::Segment(segment));
        self
    }

    /// The segment number, if the last component is a segment.
    pub fn segment(&self) -> Option<u64> {
        match self.components.last() {
            Some(NameComponent::Segment(n)) => Some(*n),
            _ => None,
        }
    }

    /// Whether `self` is a prefix of `other`.
    pub fn is_prefix_of(&self, other: &ContentName) -> bool {
        other.components.starts_with(&self.components)
    }
}

impl FromStr for ContentName {
    type Err = Error;

    /// Parse a URI of the form `/a/b/seg=3`, optionally prefixed with `ndn:`.
    /// Components may contain `%XX` escapes.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let path = s.strip_prefix("ndn:").unwrap_or(s);
        let rest = path
            .strip_prefix('/')
            .ok_or_else(|| Error::InvalidName(s.to_string()))?;

        let mut components = Vec::new();
        for part in rest.split('/').filter(|part| !part.is_empty()) {
            if let Some(number) = part.strip_prefix(SEGMENT_PREFIX) {
                let segment = number
                    .parse()
                    .map_err(|_| Error::InvalidName(s.to_string()))?;
                components.push(NameComponent::Segment(segment));
            } else {
                let mut bytes =
                    unescape(part).ok_or_else(|| Error::InvalidName(s.to_string()))?;
                if bytes.iter().all(|&b| b == b'.') {
                    // `...` is the empty component, `....` a single period, etc.
                    if bytes.len() < 3 {
                        return Err(Error::InvalidName(s.to_string()));
                    }
                    bytes.truncate(bytes.len() - 3);
                }
                components.push(NameComponent::Generic(bytes));
            }
        }
        Ok(Self { components })
    }
}

impl fmt::Display for ContentName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.components.is_empty() {
            return f.write_str("/");
        }
        for component in &self.components {
            f.write_str("/")?;
            match component {
                NameComponent::Segment(n) => write!(f, "{}{}", SEGMENT_PREFIX, n)?,
                NameComponent::Generic(bytes) => {
                    if bytes.iter().all(|&b| b == b'.') {
                        f.write_str("...")?;
                    }
                    for &b in bytes {
                        if b.is_ascii_alphanumeric() || b"-._~".contains(&b) {
                            write!(f, "{}", b as char)?;
                        } else {
                            write!(f, "%{:02X}", b)?;
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

fn unescape(part: &str) -> Option<Vec<u8>> {
    let bytes = part.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = part.get(i + 1..i + 3)?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    Some(out)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parse_and_display() {
        let name: ContentName = "ndn:/parc/videos/a%20b/seg=37".parse().unwrap();
        assert_eq!(name.len(), 4);
        assert_eq!(
            name.components()[2],
            NameComponent::Generic(b"a b".to_vec())
        );
        assert_eq!(name.segment(), Some(37));
        assert_eq!(name.to_string(), "/parc/videos/a%20b/seg=37");
        assert_eq!(name.to_string().parse::<ContentName>().unwrap(), name);
    }

    #[test]
    fn root_name() {
        let root: ContentName = "/".parse().unwrap();
        assert!(root.is_empty());
        assert_eq!(root.to_string(), "/");
    }

    #[test]
    fn rejects_bad_names() {
        assert!("relative/name".parse::<ContentName>().is_err());
        assert!("/bad/%zz".parse::<ContentName>().is_err());
        assert!("/truncated/%4".parse::<ContentName>().is_err());
        assert!("/seg=minus".parse::<ContentName>().is_err());
        assert!("/a/../b".parse::<ContentName>().is_err());
    }

    #[test]
    fn empty_and_period_components() {
        let name = ContentName::from_components(vec![
            NameComponent::Generic(vec![]),
            NameComponent::Generic(b"b".to_vec()),
            NameComponent::Generic(b".".to_vec()),
        ]);
        assert_eq!(name.to_string(), "/.../b/....");
        assert_eq!(name.to_string().parse::<ContentName>().unwrap(), name);
        assert_eq!(
            "/a/.../seg=1".parse::<ContentName>().unwrap().components()[1],
            NameComponent::Generic(vec![])
        );
    }

    #[test]
    fn prefixes() {
        let base = ContentName::root().append("ndn").append("data");
        let block = base.clone().append_segment(4);
        assert!(base.is_prefix_of(&block));
        assert!(!block.is_prefix_of(&base));
        assert_eq!(base.segment(), None);
    }
}
