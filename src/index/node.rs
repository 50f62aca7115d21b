//! Index Node Layout
//!
//! Byte layout of the nodes living in an [`IndexArena`], and the decoded
//! forms every consumer matches on. All multi-byte fields are
//! little-endian `u32`.
//!
//! ```text
//! header           [tag word][ref]                      8 bytes
//! array slot       [tag word][ref -> child]             8 bytes
//! hash slot        [key payload][tag word][ref -> value] 16 bytes
//!
//! key payload      len <= 8: key bytes, zero padded
//!                  len >  8: [djb2 hash][key offset]
//! ```
//!
//! Container nodes (`ARRAY_INDEXED`, `HASH_INDEXED`) are followed directly
//! by their slot table; their header `ref` is the container's document
//! offset.

use super::arena::{ArenaOffset, IndexArena};
use super::tag::{NodeKind, TagWord};
use crate::error::{CapacityLimit, Corruption, Result};

pub const HEADER_SIZE: usize = 8;
pub const ARRAY_SLOT_SIZE: usize = 8;
pub const HASH_SLOT_SIZE: usize = 16;

/// Keys up to this many bytes are stored inside the hash slot
pub const SMALL_KEY_MAX_LEN: usize = 8;

const REF_FIELD: usize = 4;
const SLOT_TAG_FIELD: usize = 8;
const SLOT_REF_FIELD: usize = 12;

/// Narrow a cursor offset to the 32-bit `ref` field
#[inline]
pub fn source_offset(offset: u64) -> Result<u32> {
    u32::try_from(offset).map_err(|_| CapacityLimit::DocumentOffset { offset }.into())
}

/// Where a slot's value lives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueRef {
    /// Arena offset of the value node
    Indexed(ArenaOffset),
    /// Document offset of the undecoded value
    InSource(u32),
}

/// Key stored in a hash slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotKey {
    /// Small key, bytes held inline
    Inline { bytes: [u8; SMALL_KEY_MAX_LEN], len: u8 },
    /// Large key whose bytes were copied into the arena
    Indexed { hash: u32, offset: ArenaOffset, len: u32 },
    /// Large key whose bytes are left in the document
    InSource { hash: u32, offset: u32, len: u32 },
}

impl SlotKey {
    /// Inline key for `bytes`, if short enough
    pub fn inline(bytes: &[u8]) -> Option<Self> {
        if bytes.len() > SMALL_KEY_MAX_LEN {
            return None;
        }
        let mut inline = [0u8; SMALL_KEY_MAX_LEN];
        inline[..bytes.len()].copy_from_slice(bytes);
        Some(SlotKey::Inline {
            bytes: inline,
            len: bytes.len() as u8,
        })
    }

    /// Key length in bytes
    #[inline]
    pub fn len(&self) -> u32 {
        match *self {
            SlotKey::Inline { len, .. } => len as u32,
            SlotKey::Indexed { len, .. } | SlotKey::InSource { len, .. } => len,
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn payload(&self) -> [u8; SMALL_KEY_MAX_LEN] {
        match *self {
            SlotKey::Inline { bytes, .. } => bytes,
            SlotKey::Indexed { hash, offset, .. } => split_payload(hash, offset.get()),
            SlotKey::InSource { hash, offset, .. } => split_payload(hash, offset),
        }
    }
}

fn split_payload(hash: u32, offset: u32) -> [u8; SMALL_KEY_MAX_LEN] {
    let mut payload = [0u8; SMALL_KEY_MAX_LEN];
    payload[..4].copy_from_slice(&hash.to_le_bytes());
    payload[4..].copy_from_slice(&offset.to_le_bytes());
    payload
}

fn join_payload(payload: &[u8]) -> (u32, u32) {
    let mut hash = [0u8; 4];
    let mut offset = [0u8; 4];
    hash.copy_from_slice(&payload[..4]);
    offset.copy_from_slice(&payload[4..SMALL_KEY_MAX_LEN]);
    (u32::from_le_bytes(hash), u32::from_le_bytes(offset))
}

/// Decoded hash slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashSlot {
    Empty,
    Entry { key: SlotKey, value: ValueRef },
}

/// Decoded node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexNode {
    /// Leaf left in the document
    Scalar { source: u32 },
    /// Array left unindexed in the document
    ArrayInSource { source: u32, len: u32 },
    /// Array with `len` positional slots starting at `slots`
    Array {
        source: u32,
        len: u32,
        slots: ArenaOffset,
    },
    /// Hash left unindexed in the document
    HashInSource { source: u32, len: u32 },
    /// Hash with a `len`-slot open-addressing table starting at `slots`
    Hash {
        source: u32,
        len: u32,
        slots: ArenaOffset,
    },
}

impl IndexNode {
    /// Decode the node whose header is at `at`
    pub fn decode(arena: &IndexArena, at: ArenaOffset) -> Result<Self> {
        let word = TagWord::from_raw(arena.read_u32(at)?);
        let source = arena.read_u32(at.add(REF_FIELD)?)?;

        let unexpected = || Corruption::UnexpectedKind {
            kind: word.kind_byte(),
            offset: at.get(),
        };
        let (kind, len) = word.unpack(at.get())?.ok_or_else(unexpected)?;

        Ok(match kind {
            NodeKind::ScalarInSource => IndexNode::Scalar { source },
            NodeKind::ArrayInSource => IndexNode::ArrayInSource { source, len },
            NodeKind::ArrayIndexed => IndexNode::Array {
                source,
                len,
                slots: at.add(HEADER_SIZE)?,
            },
            NodeKind::HashInSource => IndexNode::HashInSource { source, len },
            NodeKind::HashIndexed => IndexNode::Hash {
                source,
                len,
                slots: at.add(HEADER_SIZE)?,
            },
            NodeKind::ArrayElementIndexed
            | NodeKind::HashElementSmallKeyIndexed
            | NodeKind::HashElementSmallKeyInSource
            | NodeKind::HashElementLargeKeyIndexed
            | NodeKind::HashElementLargeKeyInSource => return Err(unexpected().into()),
        })
    }

    /// Document offset of the value this node describes
    #[inline]
    pub fn source(&self) -> u32 {
        match *self {
            IndexNode::Scalar { source }
            | IndexNode::ArrayInSource { source, .. }
            | IndexNode::Array { source, .. }
            | IndexNode::HashInSource { source, .. }
            | IndexNode::Hash { source, .. } => source,
        }
    }

    #[inline]
    pub fn kind(&self) -> NodeKind {
        match self {
            IndexNode::Scalar { .. } => NodeKind::ScalarInSource,
            IndexNode::ArrayInSource { .. } => NodeKind::ArrayInSource,
            IndexNode::Array { .. } => NodeKind::ArrayIndexed,
            IndexNode::HashInSource { .. } => NodeKind::HashInSource,
            IndexNode::Hash { .. } => NodeKind::HashIndexed,
        }
    }
}

// ============================================================================
// Allocation
// ============================================================================

fn write_header(arena: &mut IndexArena, at: ArenaOffset, word: TagWord, r: u32) -> Result<()> {
    arena.write_u32(at, word.raw())?;
    arena.write_u32(at.add(REF_FIELD)?, r)
}

/// Allocate a `SCALAR_IN_SOURCE` leaf
pub fn alloc_scalar(arena: &mut IndexArena, source: u32) -> Result<ArenaOffset> {
    let word = TagWord::pack(NodeKind::ScalarInSource, 0)?;
    let at = arena.allocate(HEADER_SIZE)?;
    write_header(arena, at, word, source)?;
    Ok(at)
}

/// Allocate an `ARRAY_INDEXED` node with `len` empty slots
///
/// The size field is checked before anything is allocated.
pub fn alloc_array(arena: &mut IndexArena, len: u64, source: u32) -> Result<ArenaOffset> {
    let word = TagWord::pack(NodeKind::ArrayIndexed, len)?;
    let at = arena.allocate(HEADER_SIZE + len as usize * ARRAY_SLOT_SIZE)?;
    write_header(arena, at, word, source)?;
    Ok(at)
}

/// Allocate a `HASH_INDEXED` node with a `len`-slot empty table
pub fn alloc_hash(arena: &mut IndexArena, len: u64, source: u32) -> Result<ArenaOffset> {
    let word = TagWord::pack(NodeKind::HashIndexed, len)?;
    let at = arena.allocate(HEADER_SIZE + len as usize * HASH_SLOT_SIZE)?;
    write_header(arena, at, word, source)?;
    Ok(at)
}

/// Copy large key bytes into the arena
pub fn alloc_key_bytes(arena: &mut IndexArena, key: &[u8]) -> Result<ArenaOffset> {
    let at = arena.allocate(key.len())?;
    arena.write_bytes(at, key)?;
    Ok(at)
}

// ============================================================================
// Slots
// ============================================================================

/// Offset of array slot `index` in a table starting at `slots`
#[inline]
pub fn array_slot(slots: ArenaOffset, index: u32) -> Result<ArenaOffset> {
    slots.add(index as usize * ARRAY_SLOT_SIZE)
}

/// Offset of hash slot `index` in a table starting at `slots`
#[inline]
pub fn hash_slot(slots: ArenaOffset, index: u32) -> Result<ArenaOffset> {
    slots.add(index as usize * HASH_SLOT_SIZE)
}

/// Point array slot `at` to `child`
pub fn write_array_slot(arena: &mut IndexArena, at: ArenaOffset, child: ArenaOffset) -> Result<()> {
    let word = TagWord::pack(NodeKind::ArrayElementIndexed, 0)?;
    write_header(arena, at, word, child.get())
}

/// Child of the array slot at `at`; `None` while the slot is empty
pub fn read_array_slot(arena: &IndexArena, at: ArenaOffset) -> Result<Option<ArenaOffset>> {
    let word = TagWord::from_raw(arena.read_u32(at)?);
    match word.unpack(at.get())? {
        None => Ok(None),
        Some((NodeKind::ArrayElementIndexed, _)) => {
            Ok(Some(ArenaOffset::new(arena.read_u32(at.add(REF_FIELD)?)?)))
        }
        Some((kind, _)) => Err(Corruption::UnexpectedKind {
            kind: kind.as_u8(),
            offset: at.get(),
        }
        .into()),
    }
}

/// Whether the hash slot at `at` is unused
#[inline]
pub fn hash_slot_is_empty(arena: &IndexArena, at: ArenaOffset) -> Result<bool> {
    Ok(arena.read_u32(at.add(SLOT_TAG_FIELD)?)? == TagWord::EMPTY.raw())
}

/// Write an entry into the hash slot at `at`
///
/// The slot kind follows from where the key and value live; a large key
/// in the document pairs with an in-document value and vice versa.
pub fn write_hash_slot(
    arena: &mut IndexArena,
    at: ArenaOffset,
    key: &SlotKey,
    value: ValueRef,
) -> Result<()> {
    let (kind, value) = match (key, value) {
        (SlotKey::Inline { .. }, ValueRef::Indexed(node)) => {
            (NodeKind::HashElementSmallKeyIndexed, node.get())
        }
        (SlotKey::Inline { .. }, ValueRef::InSource(source)) => {
            (NodeKind::HashElementSmallKeyInSource, source)
        }
        (SlotKey::Indexed { .. }, ValueRef::Indexed(node)) => {
            (NodeKind::HashElementLargeKeyIndexed, node.get())
        }
        (SlotKey::InSource { .. }, ValueRef::InSource(source)) => {
            (NodeKind::HashElementLargeKeyInSource, source)
        }
        (SlotKey::Indexed { .. }, ValueRef::InSource(_)) => {
            return Err(Corruption::UnexpectedKind {
                kind: NodeKind::HashElementLargeKeyIndexed.as_u8(),
                offset: at.get(),
            }
            .into())
        }
        (SlotKey::InSource { .. }, ValueRef::Indexed(_)) => {
            return Err(Corruption::UnexpectedKind {
                kind: NodeKind::HashElementLargeKeyInSource.as_u8(),
                offset: at.get(),
            }
            .into())
        }
    };

    let word = TagWord::pack(kind, key.len() as u64)?;
    arena.write_bytes(at, &key.payload())?;
    arena.write_u32(at.add(SLOT_TAG_FIELD)?, word.raw())?;
    arena.write_u32(at.add(SLOT_REF_FIELD)?, value)
}

/// Decode the hash slot at `at`
pub fn read_hash_slot(arena: &IndexArena, at: ArenaOffset) -> Result<HashSlot> {
    let word = TagWord::from_raw(arena.read_u32(at.add(SLOT_TAG_FIELD)?)?);
    let Some((kind, len)) = word.unpack(at.get())? else {
        return Ok(HashSlot::Empty);
    };

    let payload = arena.bytes(at, SMALL_KEY_MAX_LEN)?;
    let r = arena.read_u32(at.add(SLOT_REF_FIELD)?)?;

    let inline = || -> Result<SlotKey> {
        if len as usize > SMALL_KEY_MAX_LEN {
            return Err(Corruption::UnexpectedKind {
                kind: kind.as_u8(),
                offset: at.get(),
            }
            .into());
        }
        let mut bytes = [0u8; SMALL_KEY_MAX_LEN];
        bytes.copy_from_slice(payload);
        Ok(SlotKey::Inline {
            bytes,
            len: len as u8,
        })
    };
    let (hash, key_offset) = join_payload(payload);

    let (key, value) = match kind {
        NodeKind::HashElementSmallKeyIndexed => (inline()?, ValueRef::Indexed(ArenaOffset::new(r))),
        NodeKind::HashElementSmallKeyInSource => (inline()?, ValueRef::InSource(r)),
        NodeKind::HashElementLargeKeyIndexed => (
            SlotKey::Indexed {
                hash,
                offset: ArenaOffset::new(key_offset),
                len,
            },
            ValueRef::Indexed(ArenaOffset::new(r)),
        ),
        NodeKind::HashElementLargeKeyInSource => (
            SlotKey::InSource {
                hash,
                offset: key_offset,
                len,
            },
            ValueRef::InSource(r),
        ),
        NodeKind::ScalarInSource
        | NodeKind::ArrayInSource
        | NodeKind::ArrayIndexed
        | NodeKind::ArrayElementIndexed
        | NodeKind::HashInSource
        | NodeKind::HashIndexed => {
            return Err(Corruption::UnexpectedKind {
                kind: kind.as_u8(),
                offset: at.get(),
            }
            .into())
        }
    };

    Ok(HashSlot::Entry { key, value })
}
