//! Build Diagnostics
//!
//! The builder reports each allocated node and each placed hash entry to a
//! [`BuildObserver`] passed in explicitly. Observers only watch: nothing
//! they do can change the index being built.

use super::arena::ArenaOffset;
use super::tag::NodeKind;

/// A node was allocated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeEvent {
    /// Number of open containers above the node
    pub depth: usize,
    pub kind: NodeKind,
    pub node: ArenaOffset,
    /// Document offset of the value
    pub source: u32,
    /// Declared element count, 0 for scalars
    pub len: u32,
}

/// A hash entry was placed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotEvent {
    pub depth: usize,
    /// The `HASH_INDEXED` node owning the table
    pub hash: ArenaOffset,
    pub slot: u32,
    /// Occupied slots probed past before landing
    pub collisions: u32,
    pub key_len: u32,
    pub value: ArenaOffset,
}

/// Receives build diagnostics
pub trait BuildObserver {
    fn node(&mut self, _event: &NodeEvent) {}

    fn slot(&mut self, _event: &SlotEvent) {}
}

/// Discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl BuildObserver for NoopObserver {}

/// Forwards events to `tracing` at TRACE level
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl BuildObserver for TracingObserver {
    fn node(&mut self, event: &NodeEvent) {
        tracing::trace!(
            depth = event.depth,
            kind = event.kind.name(),
            node = event.node.get(),
            source = event.source,
            len = event.len,
            "indexed node"
        );
    }

    fn slot(&mut self, event: &SlotEvent) {
        tracing::trace!(
            depth = event.depth,
            hash = event.hash.get(),
            slot = event.slot,
            collisions = event.collisions,
            key_len = event.key_len,
            "placed hash entry"
        );
    }
}

impl<O: BuildObserver + ?Sized> BuildObserver for &mut O {
    fn node(&mut self, event: &NodeEvent) {
        (**self).node(event);
    }

    fn slot(&mut self, event: &SlotEvent) {
        (**self).slot(event);
    }
}
