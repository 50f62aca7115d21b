//! Hash Slot Assignment
//!
//! Placement policy for `HASH_INDEXED` tables. The table has exactly as
//! many slots as the hash has entries, so every slot ends up used.
//!
//! - hash: djb2, `h = h * 33 + byte` from 5381, wrapping 32-bit, no finalizer
//! - home slot: `h % len`
//! - collisions: linear probing, `(slot + 1) % len`
//!
//! Lookups walk the same [`ProbeSequence`] as the builder, so a key placed
//! at build time is always reached from its home slot. The table is
//! write-once: no deletion, no resize, no rehash.

use super::arena::{ArenaOffset, IndexArena};
use super::node::{hash_slot, hash_slot_is_empty, write_hash_slot, SlotKey, ValueRef};
use crate::error::{Corruption, Result};

const DJB2_SEED: u32 = 5381;

/// djb2 hash of `key`
#[inline]
pub fn djb2(key: &[u8]) -> u32 {
    key.iter().fold(DJB2_SEED, |h, &b| {
        // h * 33 + b
        (h << 5).wrapping_add(h).wrapping_add(b as u32)
    })
}

/// Slots visited for one key, home slot first
///
/// Yields each slot of the table at most once.
#[derive(Debug, Clone)]
pub struct ProbeSequence {
    next: u32,
    len: u32,
    remaining: u32,
}

impl ProbeSequence {
    /// Probe sequence for `hash` in a table of `len` slots
    #[inline]
    pub fn new(hash: u32, len: u32) -> Self {
        Self {
            next: if len == 0 { 0 } else { hash % len },
            len,
            remaining: len,
        }
    }
}

impl Iterator for ProbeSequence {
    type Item = u32;

    #[inline]
    fn next(&mut self) -> Option<u32> {
        if self.remaining == 0 {
            return None;
        }
        let slot = self.next;
        self.remaining -= 1;
        self.next = (slot + 1) % self.len;
        Some(slot)
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.remaining as usize;
        (n, Some(n))
    }
}

impl ExactSizeIterator for ProbeSequence {}

/// A hash node's slot table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotTable {
    pub slots: ArenaOffset,
    pub len: u32,
}

/// Where an entry landed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    /// Slot index the entry was written to
    pub slot: u32,
    /// Occupied slots skipped before it
    pub collisions: u32,
}

/// Write an entry at the first empty slot of its probe sequence
///
/// A table with no empty slot left means the hash declared fewer entries
/// than it holds; that is reported as corruption.
pub fn assign_slot(
    arena: &mut IndexArena,
    table: SlotTable,
    hash: u32,
    key: &SlotKey,
    value: ValueRef,
) -> Result<Placement> {
    for (collisions, slot) in ProbeSequence::new(hash, table.len).enumerate() {
        let at = hash_slot(table.slots, slot)?;
        if hash_slot_is_empty(arena, at)? {
            write_hash_slot(arena, at, key, value)?;
            return Ok(Placement {
                slot,
                collisions: collisions as u32,
            });
        }
    }

    Err(Corruption::HashTableFull { len: table.len }.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::IndexError;
    use crate::index::node::{alloc_hash, alloc_scalar, read_hash_slot, HashSlot, HEADER_SIZE};

    #[test]
    fn test_djb2_known_values() {
        assert_eq!(djb2(b""), 5381);
        assert_eq!(djb2(b"a"), 5381 * 33 + 97);
        assert_eq!(djb2(b"ab"), (5381 * 33 + 97) * 33 + 98);
    }

    #[test]
    fn test_djb2_wraps() {
        // long input overflows 32 bits many times without panicking
        let key = vec![0xFFu8; 1024];
        let expected = key
            .iter()
            .fold(5381u32, |h, &b| h.wrapping_mul(33).wrapping_add(b as u32));
        assert_eq!(djb2(&key), expected);
    }

    #[test]
    fn test_probe_sequence_wraps_once() {
        let slots: Vec<_> = ProbeSequence::new(6, 4).collect();
        assert_eq!(slots, vec![2, 3, 0, 1]);
        assert_eq!(ProbeSequence::new(123, 0).count(), 0);
        assert_eq!(ProbeSequence::new(9, 5).len(), 5);
    }

    fn table(arena: &mut IndexArena, len: u32) -> SlotTable {
        let node = alloc_hash(arena, len as u64, 0).unwrap();
        SlotTable {
            slots: node.add(HEADER_SIZE).unwrap(),
            len,
        }
    }

    #[test]
    fn test_collisions_probe_forward() {
        let mut arena = IndexArena::with_capacity(256).unwrap();
        let table = table(&mut arena, 3);
        let value = alloc_scalar(&mut arena, 1).unwrap();

        // same hash three times: home slot 2, then wrap to 0 and 1
        let mut placed = Vec::new();
        for key in [&b"x"[..], b"y", b"z"] {
            let key = SlotKey::inline(key).unwrap();
            placed.push(assign_slot(&mut arena, table, 5, &key, ValueRef::Indexed(value)).unwrap());
        }
        assert_eq!(
            placed,
            vec![
                Placement { slot: 2, collisions: 0 },
                Placement { slot: 0, collisions: 1 },
                Placement { slot: 1, collisions: 2 },
            ]
        );

        for slot in 0..3 {
            let at = hash_slot(table.slots, slot).unwrap();
            assert!(matches!(read_hash_slot(&arena, at).unwrap(), HashSlot::Entry { .. }));
        }
    }

    #[test]
    fn test_full_table_is_corruption() {
        let mut arena = IndexArena::with_capacity(256).unwrap();
        let table = table(&mut arena, 1);
        let value = alloc_scalar(&mut arena, 1).unwrap();
        let key = SlotKey::inline(b"k").unwrap();

        assign_slot(&mut arena, table, djb2(b"k"), &key, ValueRef::Indexed(value)).unwrap();
        let err = assign_slot(&mut arena, table, djb2(b"k"), &key, ValueRef::Indexed(value))
            .unwrap_err();
        assert_eq!(
            err,
            IndexError::CorruptIndex(Corruption::HashTableFull { len: 1 })
        );
    }

    #[test]
    fn test_empty_table_is_corruption() {
        let mut arena = IndexArena::with_capacity(64).unwrap();
        let table = table(&mut arena, 0);
        let value = alloc_scalar(&mut arena, 1).unwrap();
        let key = SlotKey::inline(b"k").unwrap();
        assert!(assign_slot(&mut arena, table, 1, &key, ValueRef::Indexed(value)).is_err());
    }
}
