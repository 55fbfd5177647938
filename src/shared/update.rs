//! Update Payload Check
//!
//! Walks a v1-encoded document update without allocating and rejects it if
//! any declared count or length cannot be backed by the bytes that follow.
//! `yrs` reserves memory from those declared sizes before reading the items,
//! so a few crafted bytes can otherwise request gigabytes and abort the
//! process. Both the client replica and the relay run every inbound update
//! through [`check_update_v1`] before handing it to `Update::decode_v1`.
//!
//! # Layout walked
//!
//! ```text
//! update     = clients:var { blocks:var client:var clock:var block* } delete_set
//! block      = info:u8 (GC len | Skip len | item)
//! item       = [origin id] [right origin id] [parent] [parent sub] content
//! delete_set = clients:var { client:var ranges:var { clock:var len:var }* }
//! ```

use crate::shared::error::SharedError;

/// Largest decoded update accepted from the network
pub const MAX_UPDATE_BYTES: usize = 8 * 1024 * 1024;

/// Deepest nesting of `Any` values accepted inside an update
pub const MAX_ANY_DEPTH: usize = 64;

const BLOCK_GC: u8 = 0;
const BLOCK_SKIP: u8 = 10;
const HAS_ORIGIN: u8 = 0b1000_0000;
const HAS_RIGHT_ORIGIN: u8 = 0b0100_0000;
const HAS_PARENT_SUB: u8 = 0b0010_0000;
const CONTENT_MASK: u8 = 0b0000_1111;

const CONTENT_DELETED: u8 = 1;
const CONTENT_JSON: u8 = 2;
const CONTENT_BINARY: u8 = 3;
const CONTENT_STRING: u8 = 4;
const CONTENT_EMBED: u8 = 5;
const CONTENT_FORMAT: u8 = 6;
const CONTENT_TYPE: u8 = 7;
const CONTENT_ANY: u8 = 8;
const CONTENT_DOC: u8 = 9;

const TYPE_XML_ELEMENT: u8 = 3;

/// Reject `bytes` unless it is a structurally sound v1 update
///
/// # Errors
/// Returns `SharedError::ProtocolError` naming the first field that is
/// truncated, oversized or of an unknown kind.
pub fn check_update_v1(bytes: &[u8]) -> Result<(), SharedError> {
    if bytes.len() > MAX_UPDATE_BYTES {
        return Err(SharedError::protocol(format!(
            "update of {} bytes exceeds the {} byte limit",
            bytes.len(),
            MAX_UPDATE_BYTES
        )));
    }
    let mut scanner = Scanner::new(bytes);
    scanner.blocks()?;
    scanner.delete_set()
}

struct Scanner<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Scanner<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn blocks(&mut self) -> Result<(), SharedError> {
        let clients = self.count("client count", 3)?;
        for _ in 0..clients {
            let blocks = self.count("block count", 1)?;
            self.var_u32("client id")?;
            let mut clock = u64::from(self.var_u32("clock")?);
            for _ in 0..blocks {
                clock += self.block()?;
                if clock > u64::from(u32::MAX) {
                    return Err(truncated("clock"));
                }
            }
        }
        Ok(())
    }

    /// Returns the clock length the block occupies
    fn block(&mut self) -> Result<u64, SharedError> {
        let info = self.u8("block info")?;
        match info {
            BLOCK_GC | BLOCK_SKIP => Ok(u64::from(self.var_u32("block length")?)),
            info => {
                if info & HAS_ORIGIN != 0 {
                    self.id("origin")?;
                }
                if info & HAS_RIGHT_ORIGIN != 0 {
                    self.id("right origin")?;
                }
                let own_parent = info & (HAS_ORIGIN | HAS_RIGHT_ORIGIN) == 0;
                if own_parent {
                    if self.var_u32("parent info")? == 1 {
                        self.string("parent name")?;
                    } else {
                        self.id("parent id")?;
                    }
                    if info & HAS_PARENT_SUB != 0 {
                        self.string("parent key")?;
                    }
                }
                self.content(info & CONTENT_MASK)
            }
        }
    }

    fn content(&mut self, kind: u8) -> Result<u64, SharedError> {
        match kind {
            CONTENT_DELETED => Ok(u64::from(self.var_u32("deleted length")?)),
            CONTENT_JSON => {
                // yrs reads one string more than the declared count
                let count = self.count("json count", 1)? + 1;
                if count > self.remaining() {
                    return Err(truncated("json count"));
                }
                for _ in 0..count {
                    self.string("json value")?;
                }
                Ok(count as u64)
            }
            CONTENT_BINARY => self.string("binary").map(|_| 1),
            CONTENT_STRING => self.string("string").map(|len| len as u64),
            CONTENT_EMBED => self.string("embed").map(|_| 1),
            CONTENT_FORMAT => {
                self.string("format key")?;
                self.string("format value")?;
                Ok(1)
            }
            CONTENT_TYPE => {
                let type_ref = self.u8("type ref")?;
                match type_ref {
                    TYPE_XML_ELEMENT => {
                        self.string("element name")?;
                    }
                    0..=6 | 9 | 15 => {}
                    other => {
                        return Err(SharedError::protocol(format!(
                            "unsupported type ref {}",
                            other
                        )))
                    }
                }
                Ok(1)
            }
            CONTENT_ANY => {
                let count = self.count("any count", 1)?;
                for _ in 0..count {
                    self.any(0)?;
                }
                Ok(count as u64)
            }
            CONTENT_DOC => {
                self.string("subdocument guid")?;
                self.any(0)?;
                Ok(1)
            }
            other => Err(SharedError::protocol(format!(
                "unsupported content kind {}",
                other
            ))),
        }
    }

    fn any(&mut self, depth: usize) -> Result<(), SharedError> {
        if depth > MAX_ANY_DEPTH {
            return Err(SharedError::protocol("value nested too deeply"));
        }
        match self.u8("value tag")? {
            127 | 126 | 121 | 120 => Ok(()),
            125 => self.skip_varint("integer"),
            124 => self.skip(4, "float32"),
            123 | 122 => self.skip(8, "float64"),
            119 | 116 => self.string("value").map(|_| ()),
            118 => {
                let len = self.count("map length", 2)?;
                for _ in 0..len {
                    self.string("map key")?;
                    self.any(depth + 1)?;
                }
                Ok(())
            }
            117 => {
                let len = self.count("array length", 1)?;
                for _ in 0..len {
                    self.any(depth + 1)?;
                }
                Ok(())
            }
            other => Err(SharedError::protocol(format!("unknown value tag {}", other))),
        }
    }

    fn delete_set(&mut self) -> Result<(), SharedError> {
        let clients = self.count("deleted client count", 2)?;
        for _ in 0..clients {
            self.var_u32("deleted client id")?;
            let ranges = self.count("deleted range count", 2)?;
            for _ in 0..ranges {
                let clock = u64::from(self.var_u32("deleted clock")?);
                let len = u64::from(self.var_u32("deleted length")?);
                if clock + len > u64::from(u32::MAX) {
                    return Err(truncated("deleted range"));
                }
            }
        }
        Ok(())
    }

    /// A declared element count whose elements take at least `min_bytes` each
    fn count(&mut self, field: &str, min_bytes: usize) -> Result<usize, SharedError> {
        let count = self.var_u32(field)? as usize;
        if count > self.remaining() / min_bytes {
            return Err(SharedError::protocol(format!(
                "{} of {} exceeds the {} bytes left",
                field,
                count,
                self.remaining()
            )));
        }
        Ok(count)
    }

    fn id(&mut self, field: &str) -> Result<(), SharedError> {
        self.var_u32(field)?;
        self.var_u32(field)?;
        Ok(())
    }

    /// Length-prefixed bytes; returns the length
    fn string(&mut self, field: &str) -> Result<usize, SharedError> {
        let len = self.var_u64(field)?;
        let len = usize::try_from(len).map_err(|_| truncated(field))?;
        self.skip(len, field)?;
        Ok(len)
    }

    fn skip(&mut self, len: usize, field: &str) -> Result<(), SharedError> {
        if len > self.remaining() {
            return Err(truncated(field));
        }
        self.pos += len;
        Ok(())
    }

    fn u8(&mut self, field: &str) -> Result<u8, SharedError> {
        let byte = *self.buf.get(self.pos).ok_or_else(|| truncated(field))?;
        self.pos += 1;
        Ok(byte)
    }

    fn var_u32(&mut self, field: &str) -> Result<u32, SharedError> {
        let value = self.var_u64(field)?;
        u32::try_from(value).map_err(|_| {
            SharedError::protocol(format!("{} of {} does not fit in 32 bits", field, value))
        })
    }

    fn var_u64(&mut self, field: &str) -> Result<u64, SharedError> {
        let mut value: u64 = 0;
        for shift in (0..64).step_by(7) {
            let byte = self.u8(field)?;
            value |= u64::from(byte & 0x7F) << shift;
            if byte & 0x80 == 0 {
                return Ok(value);
            }
        }
        Err(SharedError::protocol(format!("{} is not a valid varint", field)))
    }

    fn skip_varint(&mut self, field: &str) -> Result<(), SharedError> {
        for _ in 0..10 {
            if self.u8(field)? & 0x80 == 0 {
                return Ok(());
            }
        }
        Err(SharedError::protocol(format!("{} is not a valid varint", field)))
    }
}

fn truncated(field: &str) -> SharedError {
    SharedError::protocol(format!("update truncated or oversized at {}", field))
}
