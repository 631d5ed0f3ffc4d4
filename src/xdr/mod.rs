//! XDR (RFC 4506) decode/encode primitives plus the shape codecs shared by
//! every procedure handler (file handles, attributes, WCC data, ...).
//!
//! Decoding walks a `&mut &[u8]` cursor rather than a `Read` impl: every
//! call is framed as one complete buffer (record-marked by [`crate::rpc`]),
//! so a cursor avoids the allocation and error-mapping overhead of `Read`.

pub mod shapes;

use std::convert::TryInto;

use byteorder::{BigEndian, ByteOrder};
use num_traits::{FromPrimitive, ToPrimitive};

use crate::vfs::{MAX_NAME_LEN, MAX_PATH_LEN};

pub const ALIGNMENT: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    UnexpectedEof,
    BadPadding,
    InvalidEnumDiscriminant,
    StringNotUtf8,
    LengthExceedsMax { max: usize, got: usize },
}

impl std::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(self, f)
    }
}

impl std::error::Error for DecodeError {}

pub type DecodeResult<T> = Result<T, DecodeError>;

/// A cursor over an in-flight call's argument bytes.
pub struct Decoder<'a> {
    buf: &'a [u8],
}

impl<'a> Decoder<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Decoder { buf }
    }

    pub fn remaining(&self) -> usize {
        self.buf.len()
    }

    fn take(&mut self, n: usize) -> DecodeResult<&'a [u8]> {
        if self.buf.len() < n {
            return Err(DecodeError::UnexpectedEof);
        }
        let (head, tail) = self.buf.split_at(n);
        self.buf = tail;
        Ok(head)
    }

    fn skip_padding(&mut self, n: usize) -> DecodeResult<()> {
        let pad = (ALIGNMENT - n % ALIGNMENT) % ALIGNMENT;
        let bytes = self.take(pad)?;
        if bytes.iter().any(|&b| b != 0) {
            return Err(DecodeError::BadPadding);
        }
        Ok(())
    }

    pub fn u8(&mut self) -> DecodeResult<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn u32(&mut self) -> DecodeResult<u32> {
        Ok(BigEndian::read_u32(self.take(4)?))
    }

    pub fn u64(&mut self) -> DecodeResult<u64> {
        Ok(BigEndian::read_u64(self.take(8)?))
    }

    pub fn bool(&mut self) -> DecodeResult<bool> {
        match self.u32()? {
            0 => Ok(false),
            1 => Ok(true),
            _ => Err(DecodeError::InvalidEnumDiscriminant),
        }
    }

    pub fn option<T>(
        &mut self,
        cont: impl FnOnce(&mut Self) -> DecodeResult<T>,
    ) -> DecodeResult<Option<T>> {
        if self.bool()? {
            Ok(Some(cont(self)?))
        } else {
            Ok(None)
        }
    }

    pub fn array<const N: usize>(&mut self) -> DecodeResult<[u8; N]> {
        let buf: [u8; N] = self.take(N)?.try_into().map_err(|_| DecodeError::UnexpectedEof)?;
        self.skip_padding(N)?;
        Ok(buf)
    }

    pub fn bytes_max(&mut self, max_size: usize) -> DecodeResult<Vec<u8>> {
        let len = self.u32()? as usize;
        if len > max_size {
            return Err(DecodeError::LengthExceedsMax { max: max_size, got: len });
        }
        let data = self.take(len)?.to_vec();
        self.skip_padding(len)?;
        Ok(data)
    }

    pub fn bytes(&mut self) -> DecodeResult<Vec<u8>> {
        self.bytes_max(u32::MAX as usize)
    }

    pub fn string_max(&mut self, max_size: usize) -> DecodeResult<String> {
        String::from_utf8(self.bytes_max(max_size)?).map_err(|_| DecodeError::StringNotUtf8)
    }

    /// A filename component, bounded by [`MAX_NAME_LEN`].
    pub fn name(&mut self) -> DecodeResult<String> {
        self.string_max(MAX_NAME_LEN)
    }

    /// A symlink target / path string, bounded by [`MAX_PATH_LEN`].
    pub fn path(&mut self) -> DecodeResult<String> {
        self.string_max(MAX_PATH_LEN)
    }

    pub fn variant<T: FromPrimitive>(&mut self) -> DecodeResult<T> {
        FromPrimitive::from_u32(self.u32()?).ok_or(DecodeError::InvalidEnumDiscriminant)
    }
}

/// An in-progress reply buffer. Encoding never fails on well-formed domain
/// values; the only failure mode (value too large for a `u32` length field)
/// is checked explicitly where it can occur.
#[derive(Default)]
pub struct Encoder {
    buf: Vec<u8>,
}

impl Encoder {
    pub fn new() -> Self {
        Encoder { buf: Vec::new() }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    fn padding(&mut self, n: usize) {
        let pad = (ALIGNMENT - n % ALIGNMENT) % ALIGNMENT;
        self.buf.extend(std::iter::repeat(0u8).take(pad));
    }

    pub fn u32(&mut self, n: u32) {
        let mut tmp = [0u8; 4];
        BigEndian::write_u32(&mut tmp, n);
        self.buf.extend_from_slice(&tmp);
    }

    pub fn u64(&mut self, n: u64) {
        let mut tmp = [0u8; 8];
        BigEndian::write_u64(&mut tmp, n);
        self.buf.extend_from_slice(&tmp);
    }

    pub fn bool(&mut self, b: bool) {
        self.u32(b as u32);
    }

    pub fn option<T>(&mut self, opt: &Option<T>, cont: impl FnOnce(&mut Self, &T)) {
        match opt {
            Some(val) => {
                self.bool(true);
                cont(self, val);
            }
            None => self.bool(false),
        }
    }

    pub fn array<const N: usize>(&mut self, bytes: &[u8; N]) {
        self.buf.extend_from_slice(bytes);
        self.padding(N);
    }

    pub fn bytes(&mut self, data: &[u8]) {
        self.u32(data.len() as u32);
        self.buf.extend_from_slice(data);
        self.padding(data.len());
    }

    pub fn string(&mut self, s: &str) {
        self.bytes(s.as_bytes());
    }

    pub fn variant<T: ToPrimitive>(&mut self, val: T) {
        self.u32(ToPrimitive::to_u32(&val).expect("enum discriminant fits in u32"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn u32_round_trips() {
        let mut enc = Encoder::new();
        enc.u32(0xdead_beef);
        let bytes = enc.into_bytes();
        let mut dec = Decoder::new(&bytes);
        assert_eq!(dec.u32().unwrap(), 0xdead_beef);
    }

    #[test]
    fn bytes_pad_to_four_byte_boundary() {
        let mut enc = Encoder::new();
        enc.bytes(b"abc");
        let bytes = enc.into_bytes();
        assert_eq!(bytes.len(), 4 + 4);
        assert_eq!(&bytes[4..7], b"abc");
        assert_eq!(bytes[7], 0);
    }

    #[test]
    fn bytes_max_rejects_oversize() {
        let mut enc = Encoder::new();
        enc.bytes(&[0u8; 16]);
        let bytes = enc.into_bytes();
        let mut dec = Decoder::new(&bytes);
        assert_eq!(dec.bytes_max(8), Err(DecodeError::LengthExceedsMax { max: 8, got: 16 }));
    }

    #[test]
    fn option_round_trips_both_branches() {
        let mut enc = Encoder::new();
        enc.option(&Some(7u32), |e, v| e.u32(*v));
        enc.option(&None::<u32>, |e, v| e.u32(*v));
        let bytes = enc.into_bytes();
        let mut dec = Decoder::new(&bytes);
        assert_eq!(dec.option(|d| d.u32()).unwrap(), Some(7));
        assert_eq!(dec.option(|d| d.u32()).unwrap(), None);
    }

    #[test]
    fn malformed_padding_is_rejected() {
        let mut bytes = vec![0, 0, 0, 3, b'a', b'b', b'c', 0xFF];
        let mut dec = Decoder::new(&mut bytes);
        assert_eq!(dec.bytes(), Err(DecodeError::BadPadding));
    }

    #[test]
    fn truncated_buffer_is_unexpected_eof() {
        let bytes = [0u8; 2];
        let mut dec = Decoder::new(&bytes);
        assert_eq!(dec.u32(), Err(DecodeError::UnexpectedEof));
    }
}
