//! Document Cursor Contract
//!
//! The indexer never parses the serialized document itself. It pulls
//! values from a [`DocumentCursor`], a stateful traversal handle with
//! explicit container step-in/step-out, supplied by the decoder.
//!
//! ## Navigation protocol
//!
//! ```text
//! object_info / offset      inspect the current value
//! step_in                   enter the current container (first child)
//! advance                   move past the most recently consumed value
//! step_out                  leave the container (back on the container)
//! is_at_end                 no sibling left at the current level
//! ```
//!
//! Inside a hash, siblings alternate key, value, key, value. The indexer
//! calls these in exactly the nesting pattern of the document, so an
//! implementation may assume no other call order.

pub mod tree;

pub use tree::{DocKey, DocValue, TreeCursor};

use thiserror::Error;

/// Kind of the value under the cursor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// Leaf value, left undecoded in the document
    Scalar,
    /// Positional container
    Array,
    /// Key/value container
    Hash,
    /// Document wrapper around exactly one value
    Root,
    /// Any other tag the decoder knows but the indexer does not handle
    Other(u8),
}

/// Navigation failure reported by a cursor
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CursorError {
    #[error("no value at the current position")]
    AtEnd,

    #[error("value at offset {offset} is not a container")]
    NotAContainer { offset: u64 },

    #[error("position at offset {offset} is not a hash key")]
    NotAHashKey { offset: u64 },

    #[error("position at offset {offset} is a hash key, not a value")]
    NotAValue { offset: u64 },

    #[error("step out without a matching step in")]
    StepOutAtTop,

    #[error("decode failure at offset {offset}: {reason}")]
    Decode { offset: u64, reason: String },
}

/// Traversal handle over a serialized document
///
/// Implemented by decoders. Offsets are absolute byte offsets into the
/// serialized document.
pub trait DocumentCursor {
    /// True when no sibling remains at the current level
    fn is_at_end(&self) -> bool;

    /// Kind of the current value and, for containers, its declared element count
    fn object_info(&self) -> Result<(ValueKind, u64), CursorError>;

    /// Absolute document offset of the current value or key
    fn offset(&self) -> Result<u64, CursorError>;

    /// Bytes of the hash key under the cursor
    fn hash_key(&self) -> Result<&[u8], CursorError>;

    /// Enter the current container
    fn step_in(&mut self) -> Result<(), CursorError>;

    /// Leave the innermost entered container
    fn step_out(&mut self) -> Result<(), CursorError>;

    /// Move to the next sibling
    fn advance(&mut self) -> Result<(), CursorError>;
}

impl<C: DocumentCursor + ?Sized> DocumentCursor for &mut C {
    #[inline]
    fn is_at_end(&self) -> bool {
        (**self).is_at_end()
    }

    #[inline]
    fn object_info(&self) -> Result<(ValueKind, u64), CursorError> {
        (**self).object_info()
    }

    #[inline]
    fn offset(&self) -> Result<u64, CursorError> {
        (**self).offset()
    }

    #[inline]
    fn hash_key(&self) -> Result<&[u8], CursorError> {
        (**self).hash_key()
    }

    #[inline]
    fn step_in(&mut self) -> Result<(), CursorError> {
        (**self).step_in()
    }

    #[inline]
    fn step_out(&mut self) -> Result<(), CursorError> {
        (**self).step_out()
    }

    #[inline]
    fn advance(&mut self) -> Result<(), CursorError> {
        (**self).advance()
    }
}
