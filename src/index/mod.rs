//! Offset Index Module
//!
//! A compact, randomly addressable index over a serialized document. Every
//! node records where its value starts in the document; containers also
//! record where each child's node lives in the arena, so any element or
//! hash value can be reached by following stored offsets.
//!
//! ## Architecture
//!
//! ```text
//! PathIndex
//! ├── arena: IndexArena          # one bump-allocated byte buffer
//! │   ├── SCALAR_IN_SOURCE       # 8 bytes, ref = document offset
//! │   ├── ARRAY_INDEXED          # 8 bytes + 8 per element
//! │   └── HASH_INDEXED           # 8 bytes + 16 per entry, open addressing
//! ├── root: ArenaOffset
//! └── stats: BuildStats
//! ```
//!
//! All references are offsets relative to the arena or the document, never
//! addresses, so an index stays valid wherever its arena lives.

pub mod arena;
pub mod builder;
pub mod node;
pub mod observer;
pub mod slots;
pub mod tag;
pub mod tree;
pub mod view;

// Re-export what's needed externally
pub use arena::{ArenaGrowth, ArenaOffset, IndexArena};
pub use builder::{build_index, BuildStats, IndexBuilder};
pub use node::{HashSlot, IndexNode, SlotKey, ValueRef};
pub use observer::{BuildObserver, NodeEvent, NoopObserver, SlotEvent, TracingObserver};
pub use slots::{djb2, ProbeSequence};
pub use tag::{NodeKind, TagWord};
pub use tree::PathIndex;
pub use view::{ArrayView, HashView, IndexView, KeyRef, NodeView, PathStep};
