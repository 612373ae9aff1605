//! Type-length-value encoding used to bind names and metadata into leaves.
//!
//! Types and lengths are NDN var-numbers: values below 253 take one byte,
//! larger ones are prefixed by 253, 254 or 255 and stored big endian on 2, 4
//! or 8 bytes. Non-negative integers are stored big endian on the shortest of
//! 1, 2, 4 or 8 bytes.
use crate::errors::Error;
use crate::name::{ContentName, NameComponent};
use crate::signed_info::SignedInfo;
use crate::traits::CanonicalEncoder;

pub(crate) const DATA: u64 = 0x06;
pub(crate) const NAME: u64 = 0x07;
pub(crate) const GENERIC_COMPONENT: u64 = 0x08;
pub(crate) const SIGNED_INFO: u64 = 0x14;
pub(crate) const CONTENT: u64 = 0x15;
pub(crate) const CONTENT_TYPE: u64 = 0x18;
pub(crate) const FRESHNESS: u64 = 0x19;
pub(crate) const FINAL_SEGMENT: u64 = 0x1a;
pub(crate) const KEY_LOCATOR: u64 = 0x1c;
pub(crate) const PUBLISHER: u64 = 0x1d;
pub(crate) const TIMESTAMP: u64 = 0x28;
pub(crate) const SEGMENT_COMPONENT: u64 = 0x32;

pub(crate) fn write_var_number(buf: &mut Vec<u8>, n: u64) {
    if n < 253 {
        buf.push(n as u8);
    } else if n <= u16::MAX as u64 {
        buf.push(253);
        buf.extend_from_slice(&(n as u16).to_be_bytes());
    } else if n <= u32::MAX as u64 {
        buf.push(254);
        buf.extend_from_slice(&(n as u32).to_be_bytes());
    } else {
        buf.push(255);
        buf.extend_from_slice(&n.to_be_bytes());
    }
}

fn non_negative(n: u64) -> Vec<u8> {
    if n <= u8::MAX as u64 {
        vec![n as u8]
    } else if n <= u16::MAX as u64 {
        (n as u16).to_be_bytes().to_vec()
    } else if n <= u32::MAX as u64 {
        (n as u32).to_be_bytes().to_vec()
    } else {
        n.to_be_bytes().to_vec()
    }
}

pub(crate) fn write_tlv(buf: &mut Vec<u8>, typ: u64, value: &[u8]) {
    write_var_number(buf, typ);
    write_var_number(buf, value.len() as u64);
    buf.extend_from_slice(value);
}

fn write_non_negative(buf: &mut Vec<u8>, typ: u64, n: u64) {
    write_tlv(buf, typ, &non_negative(n));
}

fn write_component(buf: &mut Vec<u8>, component: &NameComponent) {
    match component {
        NameComponent::Generic(bytes) => write_tlv(buf, GENERIC_COMPONENT, bytes),
        NameComponent::Segment(n) => write_non_negative(buf, SEGMENT_COMPONENT, *n),
    }
}

pub(crate) fn write_name(buf: &mut Vec<u8>, name: &ContentName) {
    let mut inner = Vec::new();
    for component in name.components() {
        write_component(&mut inner, component);
    }
    write_tlv(buf, NAME, &inner);
}

fn write_signed_info(buf: &mut Vec<u8>, info: &SignedInfo) {
    let mut inner = Vec::new();
    write_tlv(&mut inner, PUBLISHER, &info.publisher);
    write_non_negative(&mut inner, TIMESTAMP, info.timestamp);
    write_non_negative(&mut inner, CONTENT_TYPE, info.content_type.0 as u64);
    if let Some(seconds) = info.freshness_seconds {
        write_non_negative(&mut inner, FRESHNESS, seconds as u64);
    }
    if let Some(segment) = info.final_segment {
        let mut component = Vec::new();
        write_component(&mut component, &NameComponent::Segment(segment));
        write_tlv(&mut inner, FINAL_SEGMENT, &component);
    }
    if let Some(locator) = &info.key_locator {
        let mut name = Vec::new();
        write_name(&mut name, locator);
        write_tlv(&mut inner, KEY_LOCATOR, &name);
    }
    write_tlv(buf, SIGNED_INFO, &inner);
}

/// The default [`CanonicalEncoder`]: `Name` TLV followed by `SignedInfo` TLV.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TlvEncoder;

impl CanonicalEncoder for TlvEncoder {
    fn canonical_bytes(&self, name: &ContentName, info: &SignedInfo) -> Result<Vec<u8>, Error> {
        let mut buf = Vec::new();
        write_name(&mut buf, name);
        write_signed_info(&mut buf, info);
        Ok(buf)
    }
}
