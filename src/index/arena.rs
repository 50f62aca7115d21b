//! Index Arena
//!
//! Bump allocator over one contiguous byte buffer. Nodes are handed out as
//! [`ArenaOffset`]s relative to the buffer start, never as addresses, so a
//! node can be resolved again after any later allocation.
//!
//! - Allocations are zero-filled; a zero tag word reads as EMPTY.
//! - Nothing is freed individually; [`IndexArena::clear`] rewinds the write
//!   cursor and keeps the storage for the next build.
//! - Capacity is fixed by default. [`ArenaGrowth::Doubling`] opts into
//!   growth, which is safe because no caller holds an address across an
//!   allocation.

use crate::error::{CapacityLimit, Corruption, IndexError, Result};

/// Largest arena addressable by a 32-bit `ref`
pub const MAX_ARENA_CAPACITY: usize = u32::MAX as usize;

/// Arena size used when no capacity hint is given
pub const DEFAULT_ARENA_CAPACITY: usize = 1_000_000;

/// Byte offset of a node relative to the arena base
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(transparent)]
pub struct ArenaOffset(u32);

impl ArenaOffset {
    #[inline]
    pub const fn new(offset: u32) -> Self {
        ArenaOffset(offset)
    }

    #[inline]
    pub const fn get(self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn as_usize(self) -> usize {
        self.0 as usize
    }

    /// Offset `bytes` further into the arena
    #[inline]
    pub fn add(self, bytes: usize) -> Result<Self> {
        u32::try_from(bytes)
            .ok()
            .and_then(|bytes| self.0.checked_add(bytes))
            .map(ArenaOffset)
            .ok_or_else(|| {
                Corruption::OutOfBounds {
                    offset: self.0 as u64,
                    len: bytes as u64,
                    size: MAX_ARENA_CAPACITY as u64,
                }
                .into()
            })
    }
}

impl std::fmt::Display for ArenaOffset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What the arena does when an allocation does not fit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArenaGrowth {
    /// Fail with `CapacityExceeded`
    #[default]
    Fixed,
    /// Double the capacity, up to `max` bytes
    Doubling { max: usize },
}

/// Bump arena holding every node of one index
#[derive(Debug)]
pub struct IndexArena {
    /// `buf.len()` is the write cursor
    buf: Vec<u8>,
    capacity: usize,
    growth: ArenaGrowth,
}

impl IndexArena {
    /// Reserve a fixed-capacity arena
    pub fn with_capacity(capacity: usize) -> Result<Self> {
        Self::with_growth(capacity, ArenaGrowth::Fixed)
    }

    /// Reserve an arena with an explicit growth policy
    ///
    /// `capacity` is clamped to [`MAX_ARENA_CAPACITY`].
    pub fn with_growth(capacity: usize, growth: ArenaGrowth) -> Result<Self> {
        let capacity = capacity.min(MAX_ARENA_CAPACITY);
        let mut buf = Vec::new();
        buf.try_reserve_exact(capacity)
            .map_err(|_| IndexError::OutOfMemory {
                requested: capacity,
            })?;

        Ok(Self {
            buf,
            capacity,
            growth,
        })
    }

    /// Bytes handed out so far
    #[inline]
    pub fn used(&self) -> usize {
        self.buf.len()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.capacity - self.buf.len()
    }

    #[inline]
    pub fn growth(&self) -> ArenaGrowth {
        self.growth
    }

    /// Rewind the write cursor, keeping the storage
    #[inline]
    pub fn clear(&mut self) {
        self.buf.clear();
    }

    /// Allocate `size` zeroed bytes and return their offset
    pub fn allocate(&mut self, size: usize) -> Result<ArenaOffset> {
        if size > self.remaining() {
            self.grow_for(size)?;
        }

        let offset = self.buf.len();
        // within reserved capacity (clones reserve it too), so this never reallocates
        self.buf.resize(offset + size, 0);
        Ok(ArenaOffset(offset as u32))
    }

    fn grow_for(&mut self, size: usize) -> Result<()> {
        let full = || -> IndexError {
            CapacityLimit::Arena {
                requested: size,
                remaining: self.remaining(),
                capacity: self.capacity,
            }
            .into()
        };

        let max = match self.growth {
            ArenaGrowth::Fixed => return Err(full()),
            ArenaGrowth::Doubling { max } => max.min(MAX_ARENA_CAPACITY),
        };

        let needed = self.buf.len().checked_add(size).ok_or_else(full)?;
        if needed > max {
            return Err(full());
        }

        let mut new_capacity = self.capacity.max(1);
        while new_capacity < needed {
            new_capacity = new_capacity.saturating_mul(2);
        }
        let new_capacity = new_capacity.min(max);

        self.buf
            .try_reserve_exact(new_capacity - self.buf.len())
            .map_err(|_| IndexError::OutOfMemory {
                requested: new_capacity,
            })?;

        tracing::debug!(
            from = self.capacity,
            to = new_capacity,
            "grew index arena"
        );
        self.capacity = new_capacity;
        Ok(())
    }

    fn range(&self, offset: ArenaOffset, len: usize) -> Result<std::ops::Range<usize>> {
        let start = offset.as_usize();
        match start.checked_add(len) {
            Some(end) if end <= self.buf.len() => Ok(start..end),
            _ => Err(Corruption::OutOfBounds {
                offset: start as u64,
                len: len as u64,
                size: self.buf.len() as u64,
            }
            .into()),
        }
    }

    /// Allocated bytes at `offset`
    #[inline]
    pub fn bytes(&self, offset: ArenaOffset, len: usize) -> Result<&[u8]> {
        let range = self.range(offset, len)?;
        Ok(&self.buf[range])
    }

    /// Overwrite allocated bytes at `offset`
    #[inline]
    pub fn write_bytes(&mut self, offset: ArenaOffset, bytes: &[u8]) -> Result<()> {
        let range = self.range(offset, bytes.len())?;
        self.buf[range].copy_from_slice(bytes);
        Ok(())
    }

    /// Little-endian word at `offset`
    #[inline]
    pub fn read_u32(&self, offset: ArenaOffset) -> Result<u32> {
        let range = self.range(offset, 4)?;
        let mut word = [0u8; 4];
        word.copy_from_slice(&self.buf[range]);
        Ok(u32::from_le_bytes(word))
    }

    #[inline]
    pub fn write_u32(&mut self, offset: ArenaOffset, value: u32) -> Result<()> {
        self.write_bytes(offset, &value.to_le_bytes())
    }

    /// Everything allocated so far
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }
}

impl Clone for IndexArena {
    /// Copies the contents and reserves the full capacity again
    fn clone(&self) -> Self {
        let mut buf = Vec::with_capacity(self.capacity);
        buf.extend_from_slice(&self.buf);
        Self {
            buf,
            capacity: self.capacity,
            growth: self.growth,
        }
    }
}
