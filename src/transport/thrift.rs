//! Thrift binary protocol codec.
//!
//! A minimal reader and writer for the Thrift binary encoding used by the
//! TCLIService RPC interface. All integers are big-endian. Messages are
//! written in the strict envelope; both strict and non-strict envelopes are
//! accepted when reading.

use bytes::{BufMut, Bytes, BytesMut};
use std::collections::BTreeMap;
use thiserror::Error;

/// Strict envelope version marker.
const VERSION_1: u32 = 0x8001_0000;
const VERSION_MASK: u32 = 0xffff_0000;

/// Maximum nesting depth accepted when skipping unknown fields.
const MAX_SKIP_DEPTH: usize = 64;

/// Errors raised while decoding Thrift data.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
    /// Input ended before the value was complete
    #[error("Incomplete input: needed {needed} more bytes")]
    Incomplete { needed: usize },

    /// Unknown wire type id
    #[error("Invalid Thrift type id {0}")]
    InvalidType(u8),

    /// Unknown message type
    #[error("Invalid message type {0}")]
    InvalidMessageType(u8),

    /// Strict envelope with an unsupported version
    #[error("Unsupported protocol version {0:#x}")]
    BadVersion(u32),

    /// Negative length or size prefix
    #[error("Negative length {0}")]
    NegativeLength(i32),

    /// String bytes were not UTF-8
    #[error("Invalid UTF-8 in string field")]
    InvalidUtf8,

    /// Nesting is deeper than the skip limit
    #[error("Nesting depth exceeded while skipping")]
    DepthExceeded,

    /// More than one member of a union was set
    #[error("Union {0} has more than one member set")]
    UnionConflict(&'static str),

    /// A required field was absent
    #[error("Required field {field} missing in {structure}")]
    MissingField {
        structure: &'static str,
        field: &'static str,
    },
}

impl DecodeError {
    /// Whether the error only means more input is needed.
    pub fn is_incomplete(&self) -> bool {
        matches!(self, DecodeError::Incomplete { .. })
    }
}

/// Thrift wire types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TType {
    Stop = 0,
    Bool = 2,
    Byte = 3,
    Double = 4,
    I16 = 6,
    I32 = 8,
    I64 = 10,
    String = 11,
    Struct = 12,
    Map = 13,
    Set = 14,
    List = 15,
}

impl TType {
    fn from_u8(value: u8) -> Result<Self, DecodeError> {
        Ok(match value {
            0 => TType::Stop,
            2 => TType::Bool,
            3 => TType::Byte,
            4 => TType::Double,
            6 => TType::I16,
            8 => TType::I32,
            10 => TType::I64,
            11 => TType::String,
            12 => TType::Struct,
            13 => TType::Map,
            14 => TType::Set,
            15 => TType::List,
            other => return Err(DecodeError::InvalidType(other)),
        })
    }
}

/// Thrift message types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    Call = 1,
    Reply = 2,
    Exception = 3,
    Oneway = 4,
}

impl MessageType {
    fn from_u8(value: u8) -> Result<Self, DecodeError> {
        match value {
            1 => Ok(MessageType::Call),
            2 => Ok(MessageType::Reply),
            3 => Ok(MessageType::Exception),
            4 => Ok(MessageType::Oneway),
            other => Err(DecodeError::InvalidMessageType(other)),
        }
    }
}

/// Decoded message envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageHeader {
    pub name: String,
    pub kind: MessageType,
    pub seq_id: i32,
}

/// Types that can be written as a Thrift struct body.
pub trait ThriftEncode {
    /// Write all set fields followed by the stop marker.
    fn encode(&self, writer: &mut ThriftWriter);
}

/// Types that can be read from a Thrift struct body.
pub trait ThriftDecode: Sized {
    fn decode(reader: &mut ThriftReader<'_>) -> Result<Self, DecodeError>;
}

/// Writes Thrift binary data into a growable buffer.
#[derive(Debug, Default)]
pub struct ThriftWriter {
    buf: BytesMut,
}

impl ThriftWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write a strict message envelope.
    pub fn write_message_begin(&mut self, name: &str, kind: MessageType, seq_id: i32) {
        self.buf.put_u32(VERSION_1 | kind as u32);
        self.write_string(name);
        self.buf.put_i32(seq_id);
    }

    pub fn write_field_begin(&mut self, ttype: TType, id: i16) {
        self.buf.put_u8(ttype as u8);
        self.buf.put_i16(id);
    }

    pub fn write_field_stop(&mut self) {
        self.buf.put_u8(TType::Stop as u8);
    }

    pub fn write_bool(&mut self, value: bool) {
        self.buf.put_u8(u8::from(value));
    }

    pub fn write_byte(&mut self, value: i8) {
        self.buf.put_i8(value);
    }

    pub fn write_i16(&mut self, value: i16) {
        self.buf.put_i16(value);
    }

    pub fn write_i32(&mut self, value: i32) {
        self.buf.put_i32(value);
    }

    pub fn write_i64(&mut self, value: i64) {
        self.buf.put_i64(value);
    }

    pub fn write_double(&mut self, value: f64) {
        self.buf.put_f64(value);
    }

    pub fn write_binary(&mut self, value: &[u8]) {
        self.buf.put_i32(value.len() as i32);
        self.buf.put_slice(value);
    }

    pub fn write_string(&mut self, value: &str) {
        self.write_binary(value.as_bytes());
    }

    pub fn write_list_begin(&mut self, element: TType, len: usize) {
        self.buf.put_u8(element as u8);
        self.buf.put_i32(len as i32);
    }

    pub fn write_map_begin(&mut self, key: TType, value: TType, len: usize) {
        self.buf.put_u8(key as u8);
        self.buf.put_u8(value as u8);
        self.buf.put_i32(len as i32);
    }

    pub fn write_struct<T: ThriftEncode + ?Sized>(&mut self, value: &T) {
        value.encode(self);
    }

    // Field helpers used by the message structs.

    pub fn field_bool(&mut self, id: i16, value: bool) {
        self.write_field_begin(TType::Bool, id);
        self.write_bool(value);
    }

    pub fn field_i16(&mut self, id: i16, value: i16) {
        self.write_field_begin(TType::I16, id);
        self.write_i16(value);
    }

    pub fn field_i32(&mut self, id: i16, value: i32) {
        self.write_field_begin(TType::I32, id);
        self.write_i32(value);
    }

    pub fn field_i64(&mut self, id: i16, value: i64) {
        self.write_field_begin(TType::I64, id);
        self.write_i64(value);
    }

    pub fn field_double(&mut self, id: i16, value: f64) {
        self.write_field_begin(TType::Double, id);
        self.write_double(value);
    }

    pub fn field_string(&mut self, id: i16, value: &str) {
        self.write_field_begin(TType::String, id);
        self.write_string(value);
    }

    pub fn field_binary(&mut self, id: i16, value: &[u8]) {
        self.write_field_begin(TType::String, id);
        self.write_binary(value);
    }

    pub fn field_opt_string(&mut self, id: i16, value: Option<&str>) {
        if let Some(value) = value {
            self.field_string(id, value);
        }
    }

    pub fn field_struct<T: ThriftEncode + ?Sized>(&mut self, id: i16, value: &T) {
        self.write_field_begin(TType::Struct, id);
        value.encode(self);
    }

    pub fn field_string_map(&mut self, id: i16, map: &BTreeMap<String, String>) {
        self.write_field_begin(TType::Map, id);
        self.write_map_begin(TType::String, TType::String, map.len());
        for (key, value) in map {
            self.write_string(key);
            self.write_string(value);
        }
    }

    pub fn field_string_list(&mut self, id: i16, values: &[String]) {
        self.write_field_begin(TType::List, id);
        self.write_list_begin(TType::String, values.len());
        for value in values {
            self.write_string(value);
        }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn into_bytes(self) -> Bytes {
        self.buf.freeze()
    }
}

/// Reads Thrift binary data from a byte slice.
#[derive(Debug)]
pub struct ThriftReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ThriftReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Bytes consumed so far.
    pub fn position(&self) -> usize {
        self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], DecodeError> {
        let remaining = self.buf.len() - self.pos;
        if remaining < n {
            return Err(DecodeError::Incomplete {
                needed: n - remaining,
            });
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn read_len(&mut self) -> Result<usize, DecodeError> {
        let len = self.read_i32()?;
        if len < 0 {
            return Err(DecodeError::NegativeLength(len));
        }
        Ok(len as usize)
    }

    /// Read a message envelope, strict or non-strict.
    pub fn read_message_begin(&mut self) -> Result<MessageHeader, DecodeError> {
        let first = self.read_i32()?;
        if first < 0 {
            let word = first as u32;
            if word & VERSION_MASK != VERSION_1 {
                return Err(DecodeError::BadVersion(word & VERSION_MASK));
            }
            let kind = MessageType::from_u8((word & 0xff) as u8)?;
            let name = self.read_string()?;
            let seq_id = self.read_i32()?;
            Ok(MessageHeader { name, kind, seq_id })
        } else {
            let bytes = self.take(first as usize)?;
            let name = String::from_utf8(bytes.to_vec()).map_err(|_| DecodeError::InvalidUtf8)?;
            let kind = MessageType::from_u8(self.read_byte()? as u8)?;
            let seq_id = self.read_i32()?;
            Ok(MessageHeader { name, kind, seq_id })
        }
    }

    /// Read a field header. Returns `None` at the stop marker.
    pub fn read_field_begin(&mut self) -> Result<Option<(TType, i16)>, DecodeError> {
        let ttype = TType::from_u8(self.read_byte()? as u8)?;
        if ttype == TType::Stop {
            return Ok(None);
        }
        let id = self.read_i16()?;
        Ok(Some((ttype, id)))
    }

    pub fn read_bool(&mut self) -> Result<bool, DecodeError> {
        Ok(self.read_byte()? != 0)
    }

    pub fn read_byte(&mut self) -> Result<i8, DecodeError> {
        Ok(i8::from_be_bytes(self.take_array::<1>()?))
    }

    pub fn read_i16(&mut self) -> Result<i16, DecodeError> {
        Ok(i16::from_be_bytes(self.take_array::<2>()?))
    }

    pub fn read_i32(&mut self) -> Result<i32, DecodeError> {
        Ok(i32::from_be_bytes(self.take_array::<4>()?))
    }

    pub fn read_i64(&mut self) -> Result<i64, DecodeError> {
        Ok(i64::from_be_bytes(self.take_array::<8>()?))
    }

    pub fn read_double(&mut self) -> Result<f64, DecodeError> {
        Ok(f64::from_be_bytes(self.take_array::<8>()?))
    }

    pub fn read_binary(&mut self) -> Result<Vec<u8>, DecodeError> {
        let len = self.read_len()?;
        Ok(self.take(len)?.to_vec())
    }

    pub fn read_string(&mut self) -> Result<String, DecodeError> {
        String::from_utf8(self.read_binary()?).map_err(|_| DecodeError::InvalidUtf8)
    }

    pub fn read_list_begin(&mut self) -> Result<(TType, usize), DecodeError> {
        let element = self.read_element_type()?;
        let len = self.read_len()?;
        Ok((element, len))
    }

    pub fn read_map_begin(&mut self) -> Result<(TType, TType, usize), DecodeError> {
        let key = self.read_element_type()?;
        let value = self.read_element_type()?;
        let len = self.read_len()?;
        Ok((key, value, len))
    }

    /// Element type of a collection; `Stop` is not a value type.
    fn read_element_type(&mut self) -> Result<TType, DecodeError> {
        match TType::from_u8(self.read_byte()? as u8)? {
            TType::Stop => Err(DecodeError::InvalidType(TType::Stop as u8)),
            ttype => Ok(ttype),
        }
    }

    /// Read a list, decoding each element with `read_element`.
    ///
    /// Capacity is bounded by the remaining input so a corrupt size prefix
    /// cannot force a large allocation.
    pub fn read_list<T, F>(&mut self, mut read_element: F) -> Result<Vec<T>, DecodeError>
    where
        F: FnMut(&mut Self) -> Result<T, DecodeError>,
    {
        let (_, len) = self.read_list_begin()?;
        let mut out = Vec::with_capacity(len.min(self.buf.len() - self.pos));
        for _ in 0..len {
            out.push(read_element(self)?);
        }
        Ok(out)
    }

    pub fn read_string_map(&mut self) -> Result<BTreeMap<String, String>, DecodeError> {
        let (_, _, len) = self.read_map_begin()?;
        let mut out = BTreeMap::new();
        for _ in 0..len {
            let key = self.read_string()?;
            let value = self.read_string()?;
            out.insert(key, value);
        }
        Ok(out)
    }

    /// Walk the fields of a struct body.
    ///
    /// `on_field` returns `true` when it consumed the field; unhandled fields
    /// are skipped.
    pub fn read_struct<F>(&mut self, mut on_field: F) -> Result<(), DecodeError>
    where
        F: FnMut(&mut Self, i16, TType) -> Result<bool, DecodeError>,
    {
        while let Some((ttype, id)) = self.read_field_begin()? {
            if !on_field(self, id, ttype)? {
                self.skip(ttype)?;
            }
        }
        Ok(())
    }

    pub fn read<T: ThriftDecode>(&mut self) -> Result<T, DecodeError> {
        T::decode(self)
    }

    /// Skip one value of the given type.
    pub fn skip(&mut self, ttype: TType) -> Result<(), DecodeError> {
        self.skip_depth(ttype, 0)
    }

    fn skip_depth(&mut self, ttype: TType, depth: usize) -> Result<(), DecodeError> {
        if depth > MAX_SKIP_DEPTH {
            return Err(DecodeError::DepthExceeded);
        }
        match ttype {
            TType::Stop => {}
            TType::Bool | TType::Byte => {
                self.take(1)?;
            }
            TType::I16 => {
                self.take(2)?;
            }
            TType::I32 => {
                self.take(4)?;
            }
            TType::I64 | TType::Double => {
                self.take(8)?;
            }
            TType::String => {
                let len = self.read_len()?;
                self.take(len)?;
            }
            TType::Struct => {
                while let Some((field_type, _)) = self.read_field_begin()? {
                    self.skip_depth(field_type, depth + 1)?;
                }
            }
            TType::Map => {
                let (key, value, len) = self.read_map_begin()?;
                for _ in 0..len {
                    self.skip_depth(key, depth + 1)?;
                    self.skip_depth(value, depth + 1)?;
                }
            }
            TType::Set | TType::List => {
                let (element, len) = self.read_list_begin()?;
                for _ in 0..len {
                    self.skip_depth(element, depth + 1)?;
                }
            }
        }
        Ok(())
    }
}

/// Length of the first complete message in `buf`.
///
/// Returns `Ok(None)` while the message is still incomplete.
pub fn complete_message_len(buf: &[u8]) -> Result<Option<usize>, DecodeError> {
    MessageScanner::default().scan(buf)
}

/// Finds the end of one message in a growing buffer.
///
/// Each `scan` resumes after the last value that was fully present, so a
/// reply arriving in many reads is walked once. The buffer passed in must
/// only ever grow at the end.
#[derive(Debug, Default)]
pub struct MessageScanner {
    pos: usize,
    header_done: bool,
    stack: Vec<Pending>,
}

/// Values still to walk in an open container.
#[derive(Debug, Clone, Copy)]
enum Pending {
    /// Struct body; the next byte is a field header
    Fields,
    /// Collection values; maps alternate key and value, starting with key
    Values {
        key: TType,
        value: TType,
        remaining: usize,
    },
}

impl MessageScanner {
    /// Length of the message once `buf` holds all of it.
    pub fn scan(&mut self, buf: &[u8]) -> Result<Option<usize>, DecodeError> {
        match self.advance(buf) {
            Ok(()) => Ok(Some(self.pos)),
            Err(e) if e.is_incomplete() => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn advance(&mut self, buf: &[u8]) -> Result<(), DecodeError> {
        if !self.header_done {
            let mut r = ThriftReader::new(buf);
            r.read_message_begin()?;
            self.pos = r.position();
            self.header_done = true;
            self.stack.push(Pending::Fields);
        }

        while let Some(top) = self.stack.last().copied() {
            let mut r = ThriftReader::new(&buf[self.pos..]);
            let ttype = match top {
                Pending::Fields => match r.read_field_begin()? {
                    Some((ttype, _)) => ttype,
                    None => {
                        self.pos += r.position();
                        self.stack.pop();
                        continue;
                    }
                },
                Pending::Values { remaining: 0, .. } => {
                    self.stack.pop();
                    continue;
                }
                Pending::Values {
                    key,
                    value,
                    remaining,
                } => {
                    if remaining % 2 == 0 {
                        key
                    } else {
                        value
                    }
                }
            };

            // Consume the value, or the header of a nested container, then commit.
            let nested = match ttype {
                TType::Struct => Some(Pending::Fields),
                TType::Map => {
                    let (key, value, len) = r.read_map_begin()?;
                    Some(Pending::Values {
                        key,
                        value,
                        remaining: len.saturating_mul(2),
                    })
                }
                TType::Set | TType::List => {
                    let (element, len) = r.read_list_begin()?;
                    Some(Pending::Values {
                        key: element,
                        value: element,
                        remaining: len,
                    })
                }
                other => {
                    r.skip(other)?;
                    None
                }
            };

            self.pos += r.position();
            if let Some(Pending::Values { remaining, .. }) = self.stack.last_mut() {
                *remaining -= 1;
            }
            if let Some(nested) = nested {
                if self.stack.len() > MAX_SKIP_DEPTH {
                    return Err(DecodeError::DepthExceeded);
                }
                self.stack.push(nested);
            }
        }
        Ok(())
    }
}
