//! Finished Index
//!
//! A [`PathIndex`] owns the arena of one successful build together with
//! the root node's offset. It is immutable; navigation borrows it through
//! an [`IndexView`] paired with the document it was built from.

use super::arena::{ArenaOffset, IndexArena};
use super::builder::BuildStats;
use super::node::IndexNode;
use super::view::IndexView;
use crate::error::Result;

/// Offset index over one document
#[derive(Debug, Clone)]
pub struct PathIndex {
    arena: IndexArena,
    root: ArenaOffset,
    stats: BuildStats,
}

impl PathIndex {
    pub(crate) fn new(arena: IndexArena, root: ArenaOffset, stats: BuildStats) -> Self {
        Self { arena, root, stats }
    }

    /// Offset of the node for the document's top value
    #[inline]
    pub fn root(&self) -> ArenaOffset {
        self.root
    }

    #[inline]
    pub fn stats(&self) -> BuildStats {
        self.stats
    }

    #[inline]
    pub fn arena(&self) -> &IndexArena {
        &self.arena
    }

    /// Raw index bytes
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        self.arena.as_bytes()
    }

    /// Size of the index in bytes
    #[inline]
    pub fn len(&self) -> usize {
        self.arena.used()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.arena.used() == 0
    }

    /// Decode the node at `at`
    pub fn node(&self, at: ArenaOffset) -> Result<IndexNode> {
        IndexNode::decode(&self.arena, at)
    }

    /// Navigate the index against the document it was built from
    pub fn view<'a>(&'a self, document: &'a [u8]) -> IndexView<'a> {
        IndexView::new(self, document)
    }

    /// Give the arena back for another build
    pub fn into_arena(self) -> IndexArena {
        self.arena
    }
}
