//! Build Configuration
//!
//! Limits and policies for a single index build. Every field has a working
//! default, so `BuildConfig::default()` is enough for most documents.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::index::arena::{ArenaGrowth, DEFAULT_ARENA_CAPACITY};

/// Default number of frames before the frame stack first grows
pub const DEFAULT_INITIAL_STACK_DEPTH: usize = 32;

/// Default nesting limit
pub const DEFAULT_MAX_DEPTH: usize = 4096;

/// Shared flag that aborts in-flight builds
///
/// Builds check it once per visited value.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask every build holding this flag to stop
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Settings for one build
#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Arena size in bytes reserved up front
    pub arena_capacity: usize,
    /// What happens when the arena fills up
    pub arena_growth: ArenaGrowth,
    /// Frames reserved before the frame stack first doubles
    pub initial_stack_depth: usize,
    /// Deepest container nesting accepted
    pub max_depth: usize,
    pub cancel: Option<CancelFlag>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            arena_capacity: DEFAULT_ARENA_CAPACITY,
            arena_growth: ArenaGrowth::Fixed,
            initial_stack_depth: DEFAULT_INITIAL_STACK_DEPTH,
            max_depth: DEFAULT_MAX_DEPTH,
            cancel: None,
        }
    }
}

impl BuildConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_arena_capacity(mut self, bytes: usize) -> Self {
        self.arena_capacity = bytes;
        self
    }

    pub fn with_arena_growth(mut self, growth: ArenaGrowth) -> Self {
        self.arena_growth = growth;
        self
    }

    pub fn with_initial_stack_depth(mut self, frames: usize) -> Self {
        self.initial_stack_depth = frames;
        self
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn with_cancel(mut self, flag: CancelFlag) -> Self {
        self.cancel = Some(flag);
        self
    }
}
