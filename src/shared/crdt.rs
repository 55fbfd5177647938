/**
 * Shared Edit Types
 *
 * Positional edit descriptors exchanged between the editing surface and the
 * replicated document, plus the retain/insert/delete delta the document
 * reports for each transaction.
 *
 * All offsets are UTF-16 code units, the unit used by Yjs peers and by
 * browser text widgets. `utf16_len` and `byte_index` convert between that
 * unit and Rust string byte indices.
 */

use serde::{Deserialize, Serialize};

/// One contiguous edited region: remove `delete_len` units at `offset`, then
/// insert `insert` at the same offset.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct EditOp {
    /// Position in the document (UTF-16 code units)
    pub offset: usize,
    /// Number of units removed starting at `offset`
    pub delete_len: usize,
    /// Text inserted at `offset` after the removal
    pub insert: String,
}

impl EditOp {
    /// Create a pure insertion
    pub fn insert(offset: usize, text: impl Into<String>) -> Self {
        Self {
            offset,
            delete_len: 0,
            insert: text.into(),
        }
    }

    /// Create a pure deletion
    pub fn delete(offset: usize, len: usize) -> Self {
        Self {
            offset,
            delete_len: len,
            insert: String::new(),
        }
    }

    /// Create a replacement of `delete_len` units by `text`
    pub fn replace(offset: usize, delete_len: usize, text: impl Into<String>) -> Self {
        Self {
            offset,
            delete_len,
            insert: text.into(),
        }
    }

    /// Length of the inserted text in UTF-16 code units
    pub fn insert_len(&self) -> usize {
        utf16_len(&self.insert)
    }

    /// Net change in document length caused by this edit
    pub fn net_change(&self) -> i64 {
        self.insert_len() as i64 - self.delete_len as i64
    }

    /// Whether this edit changes nothing
    pub fn is_noop(&self) -> bool {
        self.delete_len == 0 && self.insert.is_empty()
    }
}

/// A single step of a document change notification, walked with a running
/// cursor: retains advance it, inserts add text at it, deletes remove text at it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum DeltaOp {
    /// Skip over unchanged text
    Retain { len: usize },
    /// Text inserted at the cursor
    Insert { text: String },
    /// Text removed at the cursor
    Delete { len: usize },
}

/// Length of `text` in UTF-16 code units
pub fn utf16_len(text: &str) -> usize {
    text.encode_utf16().count()
}

/// Byte index in `text` of the given UTF-16 offset, clamped to the end of the
/// string. An offset landing inside a surrogate pair rounds up to the next
/// character boundary.
pub fn byte_index(text: &str, utf16_offset: usize) -> usize {
    let mut units = 0;
    for (index, ch) in text.char_indices() {
        if units >= utf16_offset {
            return index;
        }
        units += ch.len_utf16();
    }
    text.len()
}
