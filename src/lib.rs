//! pathindex - Offset-addressed random-access index over binary documents
//!
//! Builds, in one depth-first pass over a [`DocumentCursor`], an index
//! whose nodes live in a single bump arena and refer to values by their
//! byte offset in the serialized document. Consumers then jump straight to
//! any array element or hash value without re-parsing.
//!
//! ```text
//! cursor ──► IndexBuilder ──► PathIndex ──► IndexView (+ document bytes)
//!                 │
//!                 ├── GrowableStack<Frame>   explicit work-list
//!                 ├── IndexArena             node storage
//!                 └── slots                  djb2 + linear probing
//! ```
//!
//! Entry points:
//! - [`build_index`]: one document, one index
//! - [`IndexBuilder`]: same, with a diagnostic observer or a reused arena
//! - [`build_parallel`]: many documents on the rayon pool

pub mod config;
pub mod cursor;
pub mod error;
pub mod index;
pub mod parallel;
pub mod stack;

pub use config::{BuildConfig, CancelFlag};
pub use cursor::{CursorError, DocumentCursor, ValueKind};
pub use error::{CapacityLimit, Corruption, IndexError, Result, Shape};
pub use index::{
    build_index, ArenaGrowth, ArenaOffset, ArrayView, BuildObserver, BuildStats, HashView,
    IndexArena, IndexBuilder, IndexView, KeyRef, NodeKind, NodeView, PathIndex, PathStep,
    TracingObserver,
};
pub use parallel::{build_parallel, build_parallel_with};
pub use stack::GrowableStack;

// ============================================================================
// Allocator Configuration
// ============================================================================

#[cfg(feature = "mimalloc")]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;
