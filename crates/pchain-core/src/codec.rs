//! Linear binary codec used by the P-chain.
//!
//! Everything is big-endian. Top-level objects start with a `u16` codec
//! version, slices carry a `u32` element count, strings a `u16` byte length,
//! and interface values a `u32` type id ahead of the concrete struct.

use crate::error::{DecodeError, EncodeError};
use crate::ids::{Id, NodeId, ShortId, ID_LEN, SHORT_ID_LEN};

pub const CODEC_VERSION: u16 = 0;

pub trait Encode {
    fn encode(&self, packer: &mut Packer);
}

pub trait Decode: Sized {
    fn decode(unpacker: &mut Unpacker<'_>) -> Result<Self, DecodeError>;
}

// ==============================================================================
// Unpacker
// ==============================================================================

pub struct Unpacker<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> Unpacker<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, offset: 0 }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.offset
    }

    /// Bytes consumed between `start` and the current offset.
    pub fn consumed_since(&self, start: usize) -> &'a [u8] {
        &self.bytes[start..self.offset]
    }

    fn take(&mut self, n: usize, what: &'static str) -> Result<&'a [u8], DecodeError> {
        if self.remaining() < n {
            return Err(DecodeError::UnexpectedEof {
                what,
                offset: self.offset,
                needed: n,
            });
        }
        let out = &self.bytes[self.offset..self.offset + n];
        self.offset += n;
        Ok(out)
    }

    pub fn fixed<const N: usize>(&mut self, what: &'static str) -> Result<[u8; N], DecodeError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N, what)?);
        Ok(out)
    }

    pub fn u8(&mut self, what: &'static str) -> Result<u8, DecodeError> {
        Ok(self.fixed::<1>(what)?[0])
    }

    pub fn u16(&mut self, what: &'static str) -> Result<u16, DecodeError> {
        Ok(u16::from_be_bytes(self.fixed(what)?))
    }

    pub fn u32(&mut self, what: &'static str) -> Result<u32, DecodeError> {
        Ok(u32::from_be_bytes(self.fixed(what)?))
    }

    pub fn u64(&mut self, what: &'static str) -> Result<u64, DecodeError> {
        Ok(u64::from_be_bytes(self.fixed(what)?))
    }

    pub fn i64(&mut self, what: &'static str) -> Result<i64, DecodeError> {
        Ok(i64::from_be_bytes(self.fixed(what)?))
    }

    pub fn id(&mut self, what: &'static str) -> Result<Id, DecodeError> {
        Ok(Id::new(self.fixed::<ID_LEN>(what)?))
    }

    pub fn short_id(&mut self, what: &'static str) -> Result<ShortId, DecodeError> {
        Ok(ShortId::new(self.fixed::<SHORT_ID_LEN>(what)?))
    }

    pub fn node_id(&mut self, what: &'static str) -> Result<NodeId, DecodeError> {
        Ok(NodeId::new(self.fixed::<SHORT_ID_LEN>(what)?))
    }

    /// `u32` length-prefixed byte string.
    pub fn bytes(&mut self, what: &'static str) -> Result<&'a [u8], DecodeError> {
        let len = self.u32(what)? as usize;
        self.take(len, what)
    }

    /// `u16` length-prefixed UTF-8 string.
    pub fn string(&mut self, what: &'static str) -> Result<String, DecodeError> {
        let len = self.u16(what)? as usize;
        let raw = self.take(len, what)?;
        String::from_utf8(raw.to_vec()).map_err(|_| DecodeError::InvalidString(what))
    }

    /// Reads a slice count, rejecting counts that cannot fit in the rest of
    /// the input given each element takes at least `min_elem_len` bytes.
    pub fn count(&mut self, what: &'static str, min_elem_len: usize) -> Result<usize, DecodeError> {
        let count = self.u32(what)? as usize;
        let needed = count.saturating_mul(min_elem_len.max(1));
        if needed > self.remaining() {
            return Err(DecodeError::UnexpectedEof {
                what,
                offset: self.offset,
                needed,
            });
        }
        Ok(count)
    }

    pub fn list<T: Decode>(&mut self, what: &'static str) -> Result<Vec<T>, DecodeError> {
        let count = self.count(what, 1)?;
        let mut out = Vec::with_capacity(count);
        for _ in 0..count {
            out.push(T::decode(self)?);
        }
        Ok(out)
    }

    pub fn list_with<T>(
        &mut self,
        what: &'static str,
        min_elem_len: usize,
        mut f: impl FnMut(&mut Self) -> Result<T, DecodeError>,
    ) -> Result<Vec<T>, DecodeError> {
        let count = self.count(what, min_elem_len)?;
        let mut out = Vec::with_capacity(count);
        for _ in 0..count {
            out.push(f(self)?);
        }
        Ok(out)
    }

    pub fn version(&mut self) -> Result<(), DecodeError> {
        match self.u16("codec version")? {
            CODEC_VERSION => Ok(()),
            other => Err(DecodeError::UnsupportedCodecVersion(other)),
        }
    }

    pub fn finish(&self, what: &'static str) -> Result<(), DecodeError> {
        match self.remaining() {
            0 => Ok(()),
            remaining => Err(DecodeError::TrailingBytes { what, remaining }),
        }
    }
}

/// Decodes a versioned top-level object and requires all input be consumed.
pub fn from_bytes<T: Decode>(bytes: &[u8], what: &'static str) -> Result<T, DecodeError> {
    let mut unpacker = Unpacker::new(bytes);
    unpacker.version()?;
    let value = T::decode(&mut unpacker)?;
    unpacker.finish(what)?;
    Ok(value)
}

// ==============================================================================
// Packer
// ==============================================================================

/// Length prefixes that do not fit their field are recorded rather than
/// truncated; `finish` reports the first one.
#[derive(Default)]
pub struct Packer {
    buf: Vec<u8>,
    overflow: Option<EncodeError>,
}

impl Packer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_version() -> Self {
        let mut packer = Self::new();
        packer.u16(CODEC_VERSION);
        packer
    }

    pub fn u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    pub fn u16(&mut self, v: u16) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    pub fn u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    pub fn u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    pub fn i64(&mut self, v: i64) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    pub fn raw(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    pub fn id(&mut self, id: &Id) {
        self.raw(id.as_bytes());
    }

    pub fn short_id(&mut self, id: &ShortId) {
        self.raw(id.as_bytes());
    }

    pub fn node_id(&mut self, id: &NodeId) {
        self.raw(id.as_bytes());
    }

    pub fn count(&mut self, len: usize) {
        match u32::try_from(len) {
            Ok(n) => self.u32(n),
            Err(_) => {
                self.record_overflow("count", len);
                self.u32(u32::MAX);
            }
        }
    }

    pub fn bytes(&mut self, bytes: &[u8]) {
        self.count(bytes.len());
        self.raw(bytes);
    }

    pub fn string(&mut self, s: &str) {
        match u16::try_from(s.len()) {
            Ok(n) => self.u16(n),
            Err(_) => {
                self.record_overflow("string", s.len());
                self.u16(u16::MAX);
            }
        }
        self.raw(s.as_bytes());
    }

    fn record_overflow(&mut self, what: &'static str, len: usize) {
        self.overflow
            .get_or_insert(EncodeError::LengthOverflow { what, len });
    }

    pub fn list<T: Encode>(&mut self, items: &[T]) {
        self.count(items.len());
        for item in items {
            item.encode(self);
        }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Packed bytes without the length check. Only for values whose lengths
    /// are already bounded, such as anything that was decoded.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn finish(self) -> Result<Vec<u8>, EncodeError> {
        match self.overflow {
            Some(err) => Err(err),
            None => Ok(self.buf),
        }
    }
}

/// Encodes a top-level object with its version prefix.
pub fn to_bytes<T: Encode + ?Sized>(value: &T) -> Vec<u8> {
    let mut packer = Packer::with_version();
    value.encode(&mut packer);
    packer.into_bytes()
}

/// `to_bytes` for values assembled from client input.
pub fn try_to_bytes<T: Encode + ?Sized>(value: &T) -> Result<Vec<u8>, EncodeError> {
    let mut packer = Packer::with_version();
    value.encode(&mut packer);
    packer.finish()
}

impl Encode for Id {
    fn encode(&self, packer: &mut Packer) {
        packer.id(self);
    }
}

impl Decode for Id {
    fn decode(unpacker: &mut Unpacker<'_>) -> Result<Self, DecodeError> {
        unpacker.id("id")
    }
}

impl Encode for u32 {
    fn encode(&self, packer: &mut Packer) {
        packer.u32(*self);
    }
}

impl Decode for u32 {
    fn decode(unpacker: &mut Unpacker<'_>) -> Result<Self, DecodeError> {
        unpacker.u32("u32")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oversized_string_fails_instead_of_truncating() {
        let long = "x".repeat(usize::from(u16::MAX) + 1);
        let mut packer = Packer::new();
        packer.string(&long);
        packer.string("ok");
        assert_eq!(
            packer.finish(),
            Err(EncodeError::LengthOverflow {
                what: "string",
                len: long.len(),
            })
        );

        let mut packer = Packer::new();
        packer.string(&long[..usize::from(u16::MAX)]);
        let bytes = packer.finish().expect("max length string must encode");
        assert_eq!(&bytes[..2], &[0xFF, 0xFF]);
    }

    #[test]
    fn bounded_lengths_finish_cleanly() {
        let mut packer = Packer::with_version();
        packer.bytes(&[1, 2, 3]);
        packer.list(&[Id::new([4; 32])]);
        let bytes = packer.finish().expect("small lengths must encode");
        assert_eq!(&bytes[..9], &[0, 0, 0, 0, 0, 3, 1, 2, 3]);
        assert_eq!(try_to_bytes(&Id::new([4; 32])).expect("id").len(), 34);
    }

    #[test]
    fn primitives_are_big_endian() {
        let mut packer = Packer::new();
        packer.u16(0x0102);
        packer.u32(0x03040506);
        packer.string("ab");
        packer.bytes(&[9, 9]);
        assert_eq!(
            packer.into_bytes(),
            vec![1, 2, 3, 4, 5, 6, 0, 2, b'a', b'b', 0, 0, 0, 2, 9, 9]
        );
    }

    #[test]
    fn unpacker_reports_eof_with_offset() {
        let mut unpacker = Unpacker::new(&[0, 1, 2]);
        unpacker.u16("first").expect("two bytes available");
        let err = unpacker.u32("second").expect_err("must run out");
        assert_eq!(
            err,
            DecodeError::UnexpectedEof {
                what: "second",
                offset: 2,
                needed: 4
            }
        );
    }

    #[test]
    fn oversized_count_is_rejected_before_allocating() {
        let bytes = [0xff, 0xff, 0xff, 0xff, 0, 0];
        let mut unpacker = Unpacker::new(&bytes);
        assert!(unpacker.count("items", 4).is_err());
    }

    #[test]
    fn unknown_version_is_rejected() {
        let err = from_bytes::<u32>(&[0, 1, 0, 0, 0, 1], "value").expect_err("version 1");
        assert_eq!(err, DecodeError::UnsupportedCodecVersion(1));
    }

    #[test]
    fn trailing_bytes_are_rejected() {
        let err = from_bytes::<u32>(&[0, 0, 0, 0, 0, 1, 7], "value").expect_err("one extra");
        assert_eq!(
            err,
            DecodeError::TrailingBytes {
                what: "value",
                remaining: 1
            }
        );
    }
}
