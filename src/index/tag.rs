//! Variant Tag Encoding
//!
//! Every node header and slot starts with a 32-bit tag word: the node kind
//! in the top byte, a 24-bit element count (or key length) below it.
//!
//! ```text
//!  31      24 23                     0
//! +----------+------------------------+
//! |   kind   |          size          |
//! +----------+------------------------+
//! ```
//!
//! A zero word is the EMPTY sentinel. Zero is not a valid kind, so a
//! zero-filled allocation is a table of empty slots.

use crate::error::{CapacityLimit, Corruption, Result};

/// Bits of the tag word holding the kind
pub const KIND_MASK: u32 = 0xFF00_0000;
/// Bits of the tag word holding the size
pub const SIZE_MASK: u32 = 0x00FF_FFFF;
/// Largest element count or key length a node can record
pub const MAX_SIZE: u32 = SIZE_MASK;

const KIND_SHIFT: u32 = 24;

/// Node kinds stored in the arena
///
/// `*InSource` kinds carry a document offset in their `ref` field,
/// `*Indexed` kinds an arena offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum NodeKind {
    ScalarInSource = 0x01,
    ArrayInSource = 0x02,
    ArrayIndexed = 0x03,
    ArrayElementIndexed = 0x04,
    HashInSource = 0x05,
    HashIndexed = 0x06,
    HashElementSmallKeyIndexed = 0x07,
    HashElementSmallKeyInSource = 0x08,
    HashElementLargeKeyIndexed = 0x09,
    HashElementLargeKeyInSource = 0x0a,
}

impl NodeKind {
    /// Decode a kind byte; `None` for EMPTY and unknown bytes
    #[inline]
    pub const fn from_u8(byte: u8) -> Option<Self> {
        Some(match byte {
            0x01 => NodeKind::ScalarInSource,
            0x02 => NodeKind::ArrayInSource,
            0x03 => NodeKind::ArrayIndexed,
            0x04 => NodeKind::ArrayElementIndexed,
            0x05 => NodeKind::HashInSource,
            0x06 => NodeKind::HashIndexed,
            0x07 => NodeKind::HashElementSmallKeyIndexed,
            0x08 => NodeKind::HashElementSmallKeyInSource,
            0x09 => NodeKind::HashElementLargeKeyIndexed,
            0x0a => NodeKind::HashElementLargeKeyInSource,
            _ => return None,
        })
    }

    #[inline]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Whether `ref` is a document offset
    #[inline]
    pub const fn is_in_source(self) -> bool {
        matches!(
            self,
            NodeKind::ScalarInSource
                | NodeKind::ArrayInSource
                | NodeKind::HashInSource
                | NodeKind::HashElementSmallKeyInSource
                | NodeKind::HashElementLargeKeyInSource
        )
    }

    /// Whether this kind tags a hash slot
    #[inline]
    pub const fn is_hash_element(self) -> bool {
        matches!(
            self,
            NodeKind::HashElementSmallKeyIndexed
                | NodeKind::HashElementSmallKeyInSource
                | NodeKind::HashElementLargeKeyIndexed
                | NodeKind::HashElementLargeKeyInSource
        )
    }

    /// Short name used in diagnostics
    pub const fn name(self) -> &'static str {
        match self {
            NodeKind::ScalarInSource => "SCALAR_IN_SOURCE",
            NodeKind::ArrayInSource => "ARRAY_IN_SOURCE",
            NodeKind::ArrayIndexed => "ARRAY_INDEXED",
            NodeKind::ArrayElementIndexed => "ARRAY_ELEMENT_INDEXED",
            NodeKind::HashInSource => "HASH_IN_SOURCE",
            NodeKind::HashIndexed => "HASH_INDEXED",
            NodeKind::HashElementSmallKeyIndexed => "HASH_ELEMENT_SMALLKEY_INDEXED",
            NodeKind::HashElementSmallKeyInSource => "HASH_ELEMENT_SMALLKEY_IN_SOURCE",
            NodeKind::HashElementLargeKeyIndexed => "HASH_ELEMENT_LARGEKEY_INDEXED",
            NodeKind::HashElementLargeKeyInSource => "HASH_ELEMENT_LARGEKEY_IN_SOURCE",
        }
    }
}

/// Packed kind + size word as stored in the arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(transparent)]
pub struct TagWord(u32);

impl TagWord {
    /// The unused-slot sentinel
    pub const EMPTY: TagWord = TagWord(0);

    /// Pack a kind and size, rejecting sizes beyond 24 bits
    #[inline]
    pub fn pack(kind: NodeKind, size: u64) -> Result<Self> {
        if size > MAX_SIZE as u64 {
            return Err(CapacityLimit::SizeField { size }.into());
        }
        Ok(TagWord(((kind.as_u8() as u32) << KIND_SHIFT) | (size as u32 & SIZE_MASK)))
    }

    /// Wrap a raw word read from the arena
    #[inline]
    pub const fn from_raw(word: u32) -> Self {
        TagWord(word)
    }

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Raw kind byte
    #[inline]
    pub const fn kind_byte(self) -> u8 {
        ((self.0 & KIND_MASK) >> KIND_SHIFT) as u8
    }

    #[inline]
    pub const fn size(self) -> u32 {
        self.0 & SIZE_MASK
    }

    /// Split into kind and size; `None` for EMPTY
    ///
    /// `offset` is only used to locate the word in the error.
    pub fn unpack(self, offset: u32) -> Result<Option<(NodeKind, u32)>> {
        if self.is_empty() {
            return Ok(None);
        }
        let byte = self.kind_byte();
        match NodeKind::from_u8(byte) {
            Some(kind) => Ok(Some((kind, self.size()))),
            None => Err(Corruption::UnknownKind { kind: byte, offset }.into()),
        }
    }
}
