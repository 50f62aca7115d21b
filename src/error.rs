//! Build Errors
//!
//! Every failure of an index build surfaces as an [`IndexError`] at the
//! build entry point. There is no local recovery inside the walk: a failure
//! at any depth discards the whole arena.

use thiserror::Error;

use crate::cursor::CursorError;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, IndexError>;

/// Error type for index construction and navigation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IndexError {
    /// The arena could not be reserved at all; the build never started.
    #[error("out of memory: could not reserve {requested} bytes for the index arena")]
    OutOfMemory {
        /// Number of bytes requested from the allocator.
        requested: usize,
    },

    /// A fixed limit was hit mid-build. Retrying with a larger limit may succeed.
    #[error("capacity exceeded: {0}")]
    CapacityExceeded(CapacityLimit),

    /// The document's declared shape disagrees with what the cursor reports.
    #[error("corrupt index: {0}")]
    CorruptIndex(Corruption),

    /// The document contains a value the indexer does not handle.
    #[error("unsupported shape: {0}")]
    UnsupportedShape(Shape),

    /// The build observed its cancellation flag.
    #[error("build cancelled after visiting {visited} values")]
    Cancelled {
        /// Values visited before the flag was seen.
        visited: usize,
    },
}

impl IndexError {
    /// Whether retrying the build with larger limits can succeed
    #[inline]
    pub fn is_retryable(&self) -> bool {
        matches!(self, IndexError::CapacityExceeded(_))
    }
}

/// Which limit a build ran into
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapacityLimit {
    /// Arena has fewer bytes left than requested
    #[error("arena needs {requested} bytes but only {remaining} of {capacity} remain")]
    Arena {
        requested: usize,
        remaining: usize,
        capacity: usize,
    },

    /// Element count or key length does not fit the 24-bit size field
    #[error("size {size} does not fit the 24-bit size field")]
    SizeField { size: u64 },

    /// Document offset does not fit the 32-bit ref field
    #[error("document offset {offset} does not fit the 32-bit ref field")]
    DocumentOffset { offset: u64 },

    /// The frame stack reached its growth ceiling
    #[error("nesting depth limit of {ceiling} reached")]
    Depth { ceiling: usize },
}

/// Inconsistencies between declared and actual document shape
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Corruption {
    /// End of siblings before the declared number of elements was consumed
    #[error("container declared {declared} elements but ended after {seen}")]
    PrematureEnd { declared: u32, seen: u32 },

    /// More siblings than the container declared
    #[error("container declared {declared} elements but has more")]
    UndeclaredElements { declared: u32 },

    /// A hash key with no value following it
    #[error("hash key at offset {key_offset} has no value")]
    MissingHashValue { key_offset: u64 },

    /// Linear probing visited every slot without finding an empty one
    #[error("hash table of {len} slots has no empty slot left")]
    HashTableFull { len: u32 },

    /// A tag word with a kind byte outside the known vocabulary
    #[error("unknown node kind 0x{kind:02x} at arena offset {offset}")]
    UnknownKind { kind: u8, offset: u32 },

    /// A node of the wrong kind where another was expected
    #[error("unexpected node kind 0x{kind:02x} at arena offset {offset}")]
    UnexpectedKind { kind: u8, offset: u32 },

    /// An offset pointing outside its buffer
    #[error("offset {offset} (+{len}) is outside a buffer of {size} bytes")]
    OutOfBounds { offset: u64, len: u64, size: u64 },

    /// Root wrapper with other than exactly one child
    #[error("root wrapper must hold exactly one value")]
    RootArity,

    /// The cursor had nothing to index
    #[error("document is empty")]
    EmptyDocument,

    /// The cursor rejected a navigation call
    #[error("cursor protocol violation: {0}")]
    Cursor(#[from] CursorError),
}

/// Value shapes the indexer refuses
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// Root wrapper found below the outermost value
    #[error("root wrapper at document offset {offset} below the top level")]
    NestedRoot { offset: u64 },

    /// Value kind outside scalar, array, hash and root
    #[error("value kind {tag} at document offset {offset} cannot be indexed")]
    UnknownValue { tag: u8, offset: u64 },
}

impl From<CapacityLimit> for IndexError {
    fn from(limit: CapacityLimit) -> Self {
        IndexError::CapacityExceeded(limit)
    }
}

impl From<Corruption> for IndexError {
    fn from(corruption: Corruption) -> Self {
        IndexError::CorruptIndex(corruption)
    }
}

impl From<Shape> for IndexError {
    fn from(shape: Shape) -> Self {
        IndexError::UnsupportedShape(shape)
    }
}

impl From<CursorError> for IndexError {
    fn from(err: CursorError) -> Self {
        IndexError::CorruptIndex(Corruption::Cursor(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_capacity_is_retryable() {
        let full = IndexError::from(CapacityLimit::Arena {
            requested: 16,
            remaining: 8,
            capacity: 64,
        });
        assert!(full.is_retryable());

        let corrupt = IndexError::from(Corruption::RootArity);
        assert!(!corrupt.is_retryable());
        assert!(!IndexError::OutOfMemory { requested: 1 }.is_retryable());
        assert!(!IndexError::Cancelled { visited: 3 }.is_retryable());
    }

    #[test]
    fn test_cursor_error_maps_to_corrupt_index() {
        let err = IndexError::from(CursorError::StepOutAtTop);
        assert!(matches!(
            err,
            IndexError::CorruptIndex(Corruption::Cursor(CursorError::StepOutAtTop))
        ));
    }

    #[test]
    fn test_messages() {
        let err = IndexError::from(CapacityLimit::SizeField { size: 0x0100_0000 });
        assert_eq!(
            err.to_string(),
            "capacity exceeded: size 16777216 does not fit the 24-bit size field"
        );

        let err = IndexError::from(Corruption::PrematureEnd { declared: 3, seen: 2 });
        assert_eq!(
            err.to_string(),
            "corrupt index: container declared 3 elements but ended after 2"
        );
    }
}
