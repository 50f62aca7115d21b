//! Index Builder
//!
//! Builds a [`PathIndex`] from a [`DocumentCursor`] in one depth-first,
//! pre-order pass in document order.
//!
//! The walk is a work-list over a [`GrowableStack`] of frames rather than
//! native recursion: each open container is one frame holding arena
//! offsets only, so nesting depth is bounded by `BuildConfig::max_depth`
//! and the arena may grow mid-build without invalidating anything.
//!
//! The only back-patching is linking a finished child into the slot its
//! parent reserved. Any failure drops the arena; there is no partial index.

use super::arena::{ArenaOffset, IndexArena};
use super::node::{
    alloc_array, alloc_hash, alloc_key_bytes, alloc_scalar, array_slot, source_offset,
    write_array_slot, SlotKey, ValueRef, HEADER_SIZE,
};
use super::observer::{BuildObserver, NodeEvent, NoopObserver, SlotEvent};
use super::slots::{assign_slot, djb2, SlotTable};
use super::tag::{NodeKind, MAX_SIZE};
use super::tree::PathIndex;
use crate::config::{BuildConfig, CancelFlag};
use crate::cursor::{DocumentCursor, ValueKind};
use crate::error::{CapacityLimit, Corruption, IndexError, Result, Shape};
use crate::stack::GrowableStack;

/// Counters gathered during a build
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildStats {
    /// Values visited (scalars and containers)
    pub values: usize,
    pub scalars: usize,
    pub arrays: usize,
    pub hashes: usize,
    /// Keys longer than the inline limit, copied into the arena
    pub large_keys: usize,
    /// Occupied slots probed past while placing hash entries
    pub collisions: u64,
    /// Deepest container nesting seen
    pub max_depth: usize,
    /// Arena bytes in use when the build finished
    pub arena_bytes: usize,
}

/// Key read from the cursor, waiting for its value to be indexed
#[derive(Debug, Clone, Copy)]
struct PendingKey {
    key: SlotKey,
    hash: u32,
    offset: u64,
}

/// One open container
#[derive(Debug, Clone, Copy)]
enum Frame {
    Array {
        node: ArenaOffset,
        slots: ArenaOffset,
        len: u32,
        pos: u32,
    },
    Hash {
        node: ArenaOffset,
        table: SlotTable,
        pos: u32,
        key: Option<PendingKey>,
    },
}

impl Frame {
    fn node(&self) -> ArenaOffset {
        match *self {
            Frame::Array { node, .. } | Frame::Hash { node, .. } => node,
        }
    }

    /// (declared, consumed)
    fn progress(&self) -> (u32, u32) {
        match *self {
            Frame::Array { len, pos, .. } => (len, pos),
            Frame::Hash { table, pos, .. } => (table.len, pos),
        }
    }
}

/// Builder state for constructing a PathIndex
pub struct IndexBuilder<O = NoopObserver> {
    config: BuildConfig,
    observer: O,
}

impl IndexBuilder<NoopObserver> {
    /// Create a builder without diagnostics
    pub fn new(config: BuildConfig) -> Self {
        Self {
            config,
            observer: NoopObserver,
        }
    }
}

impl<O: BuildObserver> IndexBuilder<O> {
    /// Replace the diagnostic observer
    pub fn with_observer<P: BuildObserver>(self, observer: P) -> IndexBuilder<P> {
        IndexBuilder {
            config: self.config,
            observer,
        }
    }

    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    pub fn observer(&self) -> &O {
        &self.observer
    }

    pub fn into_observer(self) -> O {
        self.observer
    }

    /// Index the document under `cursor` into a fresh arena
    ///
    /// The cursor must be positioned at the document's top value.
    pub fn build<C: DocumentCursor + ?Sized>(&mut self, cursor: &mut C) -> Result<PathIndex> {
        let arena = IndexArena::with_growth(self.config.arena_capacity, self.config.arena_growth)?;
        self.build_in(arena, cursor)
    }

    /// Index into an existing arena, rewinding it first
    ///
    /// Lets callers reuse the storage of a discarded index
    /// (see [`PathIndex::into_arena`]).
    pub fn build_in<C: DocumentCursor + ?Sized>(
        &mut self,
        mut arena: IndexArena,
        cursor: &mut C,
    ) -> Result<PathIndex> {
        arena.clear();
        tracing::debug!(capacity = arena.capacity(), "building index");

        let stack = GrowableStack::with_capacity(
            self.config.initial_stack_depth,
            self.config.max_depth,
        )?;
        let walk = Walk {
            cursor,
            arena,
            stack,
            observer: &mut self.observer,
            cancel: self.config.cancel.as_ref(),
            stats: BuildStats::default(),
        };

        match walk.run() {
            Ok(index) => {
                let stats = index.stats();
                tracing::debug!(
                    values = stats.values,
                    arena_bytes = stats.arena_bytes,
                    max_depth = stats.max_depth,
                    collisions = stats.collisions,
                    "index built"
                );
                Ok(index)
            }
            Err(err) => {
                tracing::warn!(error = %err, "index build failed");
                Err(err)
            }
        }
    }
}

/// Build an index with `config` and no diagnostics
pub fn build_index<C: DocumentCursor + ?Sized>(
    cursor: &mut C,
    config: &BuildConfig,
) -> Result<PathIndex> {
    IndexBuilder::new(config.clone()).build(cursor)
}

// ============================================================================
// Walk
// ============================================================================

struct Walk<'b, C: ?Sized, O> {
    cursor: &'b mut C,
    arena: IndexArena,
    stack: GrowableStack<Frame>,
    observer: &'b mut O,
    cancel: Option<&'b CancelFlag>,
    stats: BuildStats,
}

impl<'b, C: DocumentCursor + ?Sized, O: BuildObserver> Walk<'b, C, O> {
    fn run(mut self) -> Result<PathIndex> {
        if self.cursor.is_at_end() {
            return Err(Corruption::EmptyDocument.into());
        }

        let (kind, _) = self.cursor.object_info()?;
        let root = if kind == ValueKind::Root {
            self.unwrap_root()?
        } else {
            self.walk()?
        };

        self.stats.arena_bytes = self.arena.used();
        Ok(PathIndex::new(self.arena, root, self.stats))
    }

    /// The root wrapper holds exactly one value
    fn unwrap_root(&mut self) -> Result<ArenaOffset> {
        self.cursor.step_in()?;
        if self.cursor.is_at_end() {
            return Err(Corruption::RootArity.into());
        }
        let root = self.walk()?;
        self.cursor.advance()?;
        if !self.cursor.is_at_end() {
            return Err(Corruption::RootArity.into());
        }
        self.cursor.step_out()?;
        Ok(root)
    }

    /// Index the value under the cursor and everything below it
    ///
    /// Leaves the cursor on that value.
    fn walk(&mut self) -> Result<ArenaOffset> {
        let mut completed = self.visit()?;

        loop {
            match (completed.take(), self.stack.peek().copied()) {
                (Some(node), None) => return Ok(node),
                (Some(child), Some(frame)) => {
                    let frame = self.link(frame, child)?;
                    if let Some(top) = self.stack.peek_mut() {
                        *top = frame;
                    }
                    self.cursor.advance()?;
                }
                (None, Some(_)) => {}
                // visit either finishes a node or opens a frame
                (None, None) => return Err(Corruption::EmptyDocument.into()),
            }

            let Some(frame) = self.stack.peek().copied() else {
                continue;
            };
            let (declared, seen) = frame.progress();

            if seen == declared {
                if !self.cursor.is_at_end() {
                    return Err(Corruption::UndeclaredElements { declared }.into());
                }
                self.cursor.step_out()?;
                self.stack.pop();
                completed = Some(frame.node());
                continue;
            }

            if self.cursor.is_at_end() {
                return Err(Corruption::PrematureEnd { declared, seen }.into());
            }

            if let Frame::Hash { .. } = frame {
                let key = self.read_key()?;
                if let Some(Frame::Hash { key: pending, .. }) = self.stack.peek_mut() {
                    *pending = Some(key);
                }
                self.cursor.advance()?;
                if self.cursor.is_at_end() {
                    return Err(Corruption::MissingHashValue {
                        key_offset: key.offset,
                    }
                    .into());
                }
            }

            completed = self.visit()?;
        }
    }

    /// Allocate a node for the value under the cursor
    ///
    /// Returns the node for scalars. Containers get a frame pushed and the
    /// cursor stepped into them; they complete later.
    fn visit(&mut self) -> Result<Option<ArenaOffset>> {
        self.check_cancelled()?;
        self.stats.values += 1;

        let (kind, declared) = self.cursor.object_info()?;
        let offset = self.cursor.offset()?;
        let depth = self.stack.depth();

        match kind {
            ValueKind::Scalar => {
                let source = source_offset(offset)?;
                let node = alloc_scalar(&mut self.arena, source)?;
                self.stats.scalars += 1;
                self.observer.node(&NodeEvent {
                    depth,
                    kind: NodeKind::ScalarInSource,
                    node,
                    source,
                    len: 0,
                });
                Ok(Some(node))
            }
            ValueKind::Array => {
                let source = source_offset(offset)?;
                let node = alloc_array(&mut self.arena, declared, source)?;
                let len = declared as u32;
                self.open(Frame::Array {
                    node,
                    slots: node.add(HEADER_SIZE)?,
                    len,
                    pos: 0,
                })?;
                self.stats.arrays += 1;
                self.observer.node(&NodeEvent {
                    depth,
                    kind: NodeKind::ArrayIndexed,
                    node,
                    source,
                    len,
                });
                Ok(None)
            }
            ValueKind::Hash => {
                let source = source_offset(offset)?;
                let node = alloc_hash(&mut self.arena, declared, source)?;
                let len = declared as u32;
                self.open(Frame::Hash {
                    node,
                    table: SlotTable {
                        slots: node.add(HEADER_SIZE)?,
                        len,
                    },
                    pos: 0,
                    key: None,
                })?;
                self.stats.hashes += 1;
                self.observer.node(&NodeEvent {
                    depth,
                    kind: NodeKind::HashIndexed,
                    node,
                    source,
                    len,
                });
                Ok(None)
            }
            ValueKind::Root => Err(Shape::NestedRoot { offset }.into()),
            ValueKind::Other(tag) => Err(Shape::UnknownValue { tag, offset }.into()),
        }
    }

    fn open(&mut self, frame: Frame) -> Result<()> {
        self.stack.push(frame)?;
        self.stats.max_depth = self.stats.max_depth.max(self.stack.depth());
        self.cursor.step_in()?;
        Ok(())
    }

    /// Read the key under the cursor, copying large keys into the arena
    fn read_key(&mut self) -> Result<PendingKey> {
        let offset = self.cursor.offset()?;
        let bytes = self.cursor.hash_key()?;
        if bytes.len() as u64 > MAX_SIZE as u64 {
            return Err(CapacityLimit::SizeField {
                size: bytes.len() as u64,
            }
            .into());
        }

        let hash = djb2(bytes);
        let key = match SlotKey::inline(bytes) {
            Some(key) => key,
            None => {
                let at = alloc_key_bytes(&mut self.arena, bytes)?;
                self.stats.large_keys += 1;
                SlotKey::Indexed {
                    hash,
                    offset: at,
                    len: bytes.len() as u32,
                }
            }
        };

        Ok(PendingKey { key, hash, offset })
    }

    /// Store a finished child in the next slot of its parent
    fn link(&mut self, frame: Frame, child: ArenaOffset) -> Result<Frame> {
        match frame {
            Frame::Array {
                node,
                slots,
                len,
                pos,
            } => {
                let at = array_slot(slots, pos)?;
                write_array_slot(&mut self.arena, at, child)?;
                Ok(Frame::Array {
                    node,
                    slots,
                    len,
                    pos: pos + 1,
                })
            }
            Frame::Hash {
                node,
                table,
                pos,
                key,
            } => {
                let Some(pending) = key else {
                    return Err(IndexError::CorruptIndex(Corruption::MissingHashValue {
                        key_offset: self.cursor.offset()?,
                    }));
                };
                let placement = assign_slot(
                    &mut self.arena,
                    table,
                    pending.hash,
                    &pending.key,
                    ValueRef::Indexed(child),
                )?;
                self.stats.collisions += placement.collisions as u64;
                self.observer.slot(&SlotEvent {
                    depth: self.stack.depth(),
                    hash: node,
                    slot: placement.slot,
                    collisions: placement.collisions,
                    key_len: pending.key.len(),
                    value: child,
                });
                Ok(Frame::Hash {
                    node,
                    table,
                    pos: pos + 1,
                    key: None,
                })
            }
        }
    }

    fn check_cancelled(&self) -> Result<()> {
        match self.cancel {
            Some(flag) if flag.is_cancelled() => Err(IndexError::Cancelled {
                visited: self.stats.values,
            }),
            _ => Ok(()),
        }
    }
}
