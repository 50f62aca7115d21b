//! Indexed Document View
//!
//! Read-only navigation over a [`PathIndex`] paired with the document it
//! was built from. Nothing is decoded: every node resolves to the document
//! offset of its value, and containers expose their children through the
//! slots the builder filled in.
//!
//! Hash lookup hashes the key with djb2 and walks the same
//! [`ProbeSequence`] the builder used to place it, so every key present at
//! build time is found.

use super::arena::{ArenaOffset, IndexArena};
use super::node::{array_slot, hash_slot, read_array_slot, read_hash_slot, HashSlot, IndexNode};
use super::node::{SlotKey, ValueRef};
use super::slots::{djb2, ProbeSequence};
use super::tag::NodeKind;
use super::tree::PathIndex;
use crate::error::{Corruption, Result};

/// One step of a path through nested containers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathStep<'k> {
    /// Position in an array
    Index(u32),
    /// Key in a hash
    Key(&'k [u8]),
}

/// A [`PathIndex`] together with its document
#[derive(Debug, Clone, Copy)]
pub struct IndexView<'a> {
    arena: &'a IndexArena,
    root: ArenaOffset,
    document: &'a [u8],
}

impl<'a> IndexView<'a> {
    pub fn new(index: &'a PathIndex, document: &'a [u8]) -> Self {
        Self {
            arena: index.arena(),
            root: index.root(),
            document,
        }
    }

    #[inline]
    pub fn document(&self) -> &'a [u8] {
        self.document
    }

    /// The document's top value
    pub fn root(&self) -> Result<NodeView<'a>> {
        self.node(self.root)
    }

    /// The node whose header is at `at`
    pub fn node(&self, at: ArenaOffset) -> Result<NodeView<'a>> {
        Ok(match IndexNode::decode(self.arena, at)? {
            IndexNode::Scalar { source } => NodeView::Scalar { source },
            IndexNode::ArrayInSource { source, len } => NodeView::ArrayInSource { source, len },
            IndexNode::HashInSource { source, len } => NodeView::HashInSource { source, len },
            IndexNode::Array { source, len, slots } => NodeView::Array(ArrayView {
                view: *self,
                source,
                len,
                slots,
            }),
            IndexNode::Hash { source, len, slots } => NodeView::Hash(HashView {
                view: *self,
                source,
                len,
                slots,
            }),
        })
    }

    /// Follow `path` from the root
    ///
    /// `Ok(None)` when a step names a missing position or key, or steps
    /// into something that is not an indexed container of the right kind.
    pub fn lookup(&self, path: &[PathStep<'_>]) -> Result<Option<NodeView<'a>>> {
        let mut node = self.root()?;
        for step in path {
            let next = match (step, node) {
                (PathStep::Index(i), NodeView::Array(array)) => array.get(*i)?,
                (PathStep::Key(key), NodeView::Hash(hash)) => hash.get(key)?,
                _ => None,
            };
            match next {
                Some(next) => node = next,
                None => return Ok(None),
            }
        }
        Ok(Some(node))
    }

    fn value(&self, value: ValueRef) -> Result<NodeView<'a>> {
        match value {
            ValueRef::Indexed(at) => self.node(at),
            ValueRef::InSource(source) => Ok(NodeView::InSource { source }),
        }
    }

    fn document_bytes(&self, offset: u32, len: u32) -> Result<&'a [u8]> {
        let start = offset as usize;
        start
            .checked_add(len as usize)
            .and_then(|end| self.document.get(start..end))
            .ok_or_else(|| {
                Corruption::OutOfBounds {
                    offset: offset as u64,
                    len: len as u64,
                    size: self.document.len() as u64,
                }
                .into()
            })
    }
}

/// A navigable node
#[derive(Debug, Clone, Copy)]
pub enum NodeView<'a> {
    /// Leaf value in the document
    Scalar { source: u32 },
    /// Array whose elements were not indexed
    ArrayInSource { source: u32, len: u32 },
    /// Hash whose entries were not indexed
    HashInSource { source: u32, len: u32 },
    /// Hash value left undecoded in the document
    InSource { source: u32 },
    Array(ArrayView<'a>),
    Hash(HashView<'a>),
}

impl<'a> NodeView<'a> {
    /// Document offset of the value
    #[inline]
    pub fn source_offset(&self) -> u32 {
        match self {
            NodeView::Scalar { source }
            | NodeView::ArrayInSource { source, .. }
            | NodeView::HashInSource { source, .. }
            | NodeView::InSource { source } => *source,
            NodeView::Array(array) => array.source,
            NodeView::Hash(hash) => hash.source,
        }
    }

    /// Kind of the backing node; `None` for in-document hash values
    pub fn kind(&self) -> Option<NodeKind> {
        Some(match self {
            NodeView::Scalar { .. } => NodeKind::ScalarInSource,
            NodeView::ArrayInSource { .. } => NodeKind::ArrayInSource,
            NodeView::HashInSource { .. } => NodeKind::HashInSource,
            NodeView::InSource { .. } => return None,
            NodeView::Array(_) => NodeKind::ArrayIndexed,
            NodeView::Hash(_) => NodeKind::HashIndexed,
        })
    }

    pub fn as_array(&self) -> Option<ArrayView<'a>> {
        match self {
            NodeView::Array(array) => Some(*array),
            _ => None,
        }
    }

    pub fn as_hash(&self) -> Option<HashView<'a>> {
        match self {
            NodeView::Hash(hash) => Some(*hash),
            _ => None,
        }
    }
}

/// An `ARRAY_INDEXED` node
#[derive(Debug, Clone, Copy)]
pub struct ArrayView<'a> {
    view: IndexView<'a>,
    source: u32,
    len: u32,
    slots: ArenaOffset,
}

impl<'a> ArrayView<'a> {
    #[inline]
    pub fn len(&self) -> u32 {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn source_offset(&self) -> u32 {
        self.source
    }

    /// Element at `index`, `None` past the end
    pub fn get(&self, index: u32) -> Result<Option<NodeView<'a>>> {
        if index >= self.len {
            return Ok(None);
        }
        let at = array_slot(self.slots, index)?;
        match read_array_slot(self.view.arena, at)? {
            Some(child) => self.view.node(child).map(Some),
            None => Err(Corruption::UnexpectedKind {
                kind: 0,
                offset: at.get(),
            }
            .into()),
        }
    }

    /// Elements in document order
    pub fn iter(&self) -> impl Iterator<Item = Result<NodeView<'a>>> + 'a {
        let array = *self;
        (0..array.len).filter_map(move |i| array.get(i).transpose())
    }
}

/// Key bytes of a hash entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyRef<'a> {
    /// Stored inside the slot
    Inline(&'a [u8]),
    /// Copied into the arena
    Arena(&'a [u8]),
    /// Left in the document at `offset`
    Document { offset: u32, bytes: &'a [u8] },
}

impl<'a> KeyRef<'a> {
    #[inline]
    pub fn as_bytes(&self) -> &'a [u8] {
        match *self {
            KeyRef::Inline(bytes) | KeyRef::Arena(bytes) | KeyRef::Document { bytes, .. } => bytes,
        }
    }
}

/// A `HASH_INDEXED` node
#[derive(Debug, Clone, Copy)]
pub struct HashView<'a> {
    view: IndexView<'a>,
    source: u32,
    len: u32,
    slots: ArenaOffset,
}

impl<'a> HashView<'a> {
    #[inline]
    pub fn len(&self) -> u32 {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn source_offset(&self) -> u32 {
        self.source
    }

    /// Value stored under `key`
    pub fn get(&self, key: &[u8]) -> Result<Option<NodeView<'a>>> {
        let hash = djb2(key);
        for slot in ProbeSequence::new(hash, self.len) {
            let at = hash_slot(self.slots, slot)?;
            let (stored, value) = match read_hash_slot(self.view.arena, at)? {
                HashSlot::Empty => return Ok(None),
                HashSlot::Entry { key, value } => (key, value),
            };

            let matches = match stored {
                SlotKey::Inline { bytes, len } => &bytes[..len as usize] == key,
                SlotKey::Indexed {
                    hash: h,
                    offset,
                    len,
                } => {
                    h == hash
                        && len as usize == key.len()
                        && self.view.arena.bytes(offset, len as usize)? == key
                }
                SlotKey::InSource {
                    hash: h,
                    offset,
                    len,
                } => {
                    h == hash
                        && len as usize == key.len()
                        && self.view.document_bytes(offset, len)? == key
                }
            };
            if matches {
                return self.view.value(value).map(Some);
            }
        }
        Ok(None)
    }

    pub fn contains_key(&self, key: &[u8]) -> Result<bool> {
        Ok(self.get(key)?.is_some())
    }

    /// Entries in slot order
    pub fn entries(&self) -> impl Iterator<Item = Result<(KeyRef<'a>, NodeView<'a>)>> + 'a {
        let hash = *self;
        (0..hash.len).filter_map(move |slot| hash.entry(slot).transpose())
    }

    fn entry(&self, slot: u32) -> Result<Option<(KeyRef<'a>, NodeView<'a>)>> {
        let at = hash_slot(self.slots, slot)?;
        let (key, value) = match read_hash_slot(self.view.arena, at)? {
            HashSlot::Empty => return Ok(None),
            HashSlot::Entry { key, value } => (key, value),
        };

        let key = match key {
            SlotKey::Inline { len, .. } => KeyRef::Inline(self.view.arena.bytes(at, len as usize)?),
            SlotKey::Indexed { offset, len, .. } => {
                KeyRef::Arena(self.view.arena.bytes(offset, len as usize)?)
            }
            SlotKey::InSource { offset, len, .. } => KeyRef::Document {
                offset,
                bytes: self.view.document_bytes(offset, len)?,
            },
        };
        Ok(Some((key, self.view.value(value)?)))
    }
}
