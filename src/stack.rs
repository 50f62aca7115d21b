//! Growable Stack
//!
//! LIFO buffer of fixed-size elements with an explicit capacity that
//! doubles on overflow, up to a hard ceiling (the final step is clamped to
//! the ceiling). The indexer uses it as its
//! call-frame stack so nesting depth is bounded by configuration instead of
//! by the native stack.
//!
//! Growth reallocates the backing storage. Elements are addressed by
//! position, never by reference held across a push, so growth can never
//! leave a dangling handle.

use crate::error::{CapacityLimit, IndexError, Result};

/// Hard upper bound on stack capacity, in elements
pub const MAX_STACK_CAPACITY: usize = 1024 * 1024;

/// Stack with doubling growth and a capacity ceiling
///
/// Single writer: all operations take `&mut self`. Use
/// [`duplicate`](Self::duplicate) to hand an independent snapshot elsewhere.
#[derive(Debug)]
pub struct GrowableStack<T> {
    items: Vec<T>,
    /// Logical capacity; doubles on overflow
    capacity: usize,
    ceiling: usize,
    grow_count: usize,
}

impl<T> GrowableStack<T> {
    /// Create a stack holding `initial` elements before its first growth
    ///
    /// `ceiling` is clamped to [`MAX_STACK_CAPACITY`] and `initial` to the
    /// range `1..=ceiling`.
    pub fn with_capacity(initial: usize, ceiling: usize) -> Result<Self> {
        let ceiling = ceiling.clamp(1, MAX_STACK_CAPACITY);
        let capacity = initial.clamp(1, ceiling);

        let mut items = Vec::new();
        items
            .try_reserve_exact(capacity)
            .map_err(|_| IndexError::OutOfMemory {
                requested: capacity.saturating_mul(std::mem::size_of::<T>()),
            })?;

        Ok(Self {
            items,
            capacity,
            ceiling,
            grow_count: 0,
        })
    }

    /// Push a value, doubling capacity first if the stack is full
    ///
    /// On failure the stack is left exactly as it was.
    pub fn push(&mut self, value: T) -> Result<()> {
        if self.items.len() >= self.capacity {
            self.grow()?;
        }
        self.items.push(value);
        Ok(())
    }

    fn grow(&mut self) -> Result<()> {
        if self.capacity >= self.ceiling {
            return Err(IndexError::CapacityExceeded(CapacityLimit::Depth {
                ceiling: self.ceiling,
            }));
        }
        // the last step may be less than a doubling so the ceiling itself is reachable
        let new_capacity = self.capacity.saturating_mul(2).min(self.ceiling);

        let additional = new_capacity - self.items.len();
        self.items
            .try_reserve_exact(additional)
            .map_err(|_| IndexError::OutOfMemory {
                requested: new_capacity.saturating_mul(std::mem::size_of::<T>()),
            })?;

        self.capacity = new_capacity;
        self.grow_count += 1;
        tracing::trace!(capacity = new_capacity, "grew stack");
        Ok(())
    }

    /// Remove and return the top value
    #[inline]
    pub fn pop(&mut self) -> Option<T> {
        self.items.pop()
    }

    /// Top value
    #[inline]
    pub fn peek(&self) -> Option<&T> {
        self.items.last()
    }

    /// Mutable top value
    #[inline]
    pub fn peek_mut(&mut self) -> Option<&mut T> {
        self.items.last_mut()
    }

    /// Number of values on the stack
    #[inline]
    pub fn depth(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.items.len() >= self.capacity
    }

    /// Current logical capacity
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn ceiling(&self) -> usize {
        self.ceiling
    }

    /// How many times the stack has doubled
    #[inline]
    pub fn grow_count(&self) -> usize {
        self.grow_count
    }

    /// Drop all values, keeping the storage
    #[inline]
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Values from bottom to top
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        &self.items
    }
}

impl<T: Clone> GrowableStack<T> {
    /// Independent deep copy of contents, position and capacity
    pub fn duplicate(&self) -> Result<Self> {
        let mut items = Vec::new();
        items
            .try_reserve_exact(self.capacity)
            .map_err(|_| IndexError::OutOfMemory {
                requested: self.capacity.saturating_mul(std::mem::size_of::<T>()),
            })?;
        items.extend_from_slice(&self.items);

        Ok(Self {
            items,
            capacity: self.capacity,
            ceiling: self.ceiling,
            grow_count: self.grow_count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_push_pop_peek() {
        let mut stack = GrowableStack::with_capacity(4, 64).unwrap();
        assert!(stack.is_empty());
        assert_eq!(stack.peek(), None);

        stack.push(1u32).unwrap();
        stack.push(2).unwrap();
        assert_eq!(stack.depth(), 2);
        assert_eq!(stack.peek(), Some(&2));

        *stack.peek_mut().unwrap() = 7;
        assert_eq!(stack.pop(), Some(7));
        assert_eq!(stack.pop(), Some(1));
        assert_eq!(stack.pop(), None);
    }

    #[test]
    fn test_single_doubling_preserves_values() {
        let mut stack = GrowableStack::with_capacity(4, 64).unwrap();
        for i in 0..4u32 {
            stack.push(i).unwrap();
        }
        assert!(stack.is_full());
        assert_eq!(stack.grow_count(), 0);

        stack.push(4).unwrap();
        assert_eq!(stack.grow_count(), 1);
        assert_eq!(stack.capacity(), 8);
        assert_eq!(stack.depth(), 5);
        assert_eq!(stack.as_slice(), &[0, 1, 2, 3, 4]);

        // keeps going without another doubling
        stack.push(5).unwrap();
        stack.push(6).unwrap();
        assert_eq!(stack.grow_count(), 1);
        assert_eq!(stack.pop(), Some(6));
        assert_eq!(stack.peek(), Some(&5));
    }

    #[test]
    fn test_ceiling_failure_keeps_state() {
        let mut stack = GrowableStack::with_capacity(2, 4).unwrap();
        for i in 0..4u8 {
            stack.push(i).unwrap();
        }

        let err = stack.push(4).unwrap_err();
        assert_eq!(
            err,
            IndexError::CapacityExceeded(CapacityLimit::Depth { ceiling: 4 })
        );
        assert_eq!(stack.depth(), 4);
        assert_eq!(stack.capacity(), 4);
        assert_eq!(stack.as_slice(), &[0, 1, 2, 3]);

        // still usable after the failure
        assert_eq!(stack.pop(), Some(3));
        stack.push(9).unwrap();
        assert_eq!(stack.peek(), Some(&9));
    }

    #[test]
    fn test_duplicate_is_independent() {
        let mut stack = GrowableStack::with_capacity(2, 16).unwrap();
        stack.push(10u64).unwrap();
        stack.push(20).unwrap();
        stack.push(30).unwrap();

        let mut copy = stack.duplicate().unwrap();
        assert_eq!(copy.as_slice(), stack.as_slice());
        assert_eq!(copy.capacity(), stack.capacity());

        copy.pop();
        copy.push(99).unwrap();
        assert_eq!(stack.as_slice(), &[10, 20, 30]);
        assert_eq!(copy.as_slice(), &[10, 20, 99]);
    }

    #[test]
    fn test_clear_keeps_capacity() {
        let mut stack = GrowableStack::with_capacity(1, 8).unwrap();
        stack.push('a').unwrap();
        stack.push('b').unwrap();
        let capacity = stack.capacity();
        stack.clear();
        assert!(stack.is_empty());
        assert_eq!(stack.capacity(), capacity);
    }

    proptest! {
        #[test]
        fn prop_behaves_like_vec(ops in proptest::collection::vec(proptest::option::of(any::<u16>()), 0..150)) {
            let mut stack = GrowableStack::with_capacity(3, 256).unwrap();
            let mut model = Vec::new();

            for op in ops {
                match op {
                    Some(value) => {
                        stack.push(value).unwrap();
                        model.push(value);
                    }
                    None => {
                        prop_assert_eq!(stack.pop(), model.pop());
                    }
                }
                prop_assert_eq!(stack.depth(), model.len());
                prop_assert_eq!(stack.peek(), model.last());
                prop_assert!(stack.capacity() >= stack.depth());
            }
        }
    }
}
