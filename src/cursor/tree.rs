//! In-Memory Tree Cursor
//!
//! A [`DocumentCursor`] over an already-decoded value tree whose nodes
//! remember the document offsets they were decoded from. Useful for
//! consumers that decode eagerly, and for exercising the indexer without a
//! binary decoder.

use super::{CursorError, DocumentCursor, ValueKind};

/// A hash key together with its document offset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocKey {
    pub offset: u64,
    pub bytes: Vec<u8>,
}

impl DocKey {
    /// Create a key at the given offset
    pub fn new(offset: u64, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            offset,
            bytes: bytes.into(),
        }
    }
}

/// A decoded value with the document offset of its tag
///
/// `declared` overrides the element count reported by the cursor, which
/// lets a tree mimic a document whose header disagrees with its body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocValue {
    Scalar {
        offset: u64,
    },
    Array {
        offset: u64,
        declared: Option<u64>,
        items: Vec<DocValue>,
    },
    Hash {
        offset: u64,
        declared: Option<u64>,
        entries: Vec<(DocKey, DocValue)>,
    },
    Root {
        offset: u64,
        children: Vec<DocValue>,
    },
    Other {
        offset: u64,
        tag: u8,
    },
}

impl DocValue {
    /// Scalar at `offset`
    pub fn scalar(offset: u64) -> Self {
        DocValue::Scalar { offset }
    }

    /// Array at `offset`
    pub fn array(offset: u64, items: Vec<DocValue>) -> Self {
        DocValue::Array {
            offset,
            declared: None,
            items,
        }
    }

    /// Hash at `offset`
    pub fn hash(offset: u64, entries: Vec<(DocKey, DocValue)>) -> Self {
        DocValue::Hash {
            offset,
            declared: None,
            entries,
        }
    }

    /// Root wrapper at `offset` around a single value
    pub fn root(offset: u64, child: DocValue) -> Self {
        DocValue::Root {
            offset,
            children: vec![child],
        }
    }

    /// Override the declared element count of a container
    pub fn with_declared_len(mut self, len: u64) -> Self {
        match &mut self {
            DocValue::Array { declared, .. } | DocValue::Hash { declared, .. } => {
                *declared = Some(len);
            }
            _ => {}
        }
        self
    }

    /// Document offset of this value
    pub fn offset(&self) -> u64 {
        match self {
            DocValue::Scalar { offset }
            | DocValue::Array { offset, .. }
            | DocValue::Hash { offset, .. }
            | DocValue::Root { offset, .. }
            | DocValue::Other { offset, .. } => *offset,
        }
    }

    fn info(&self) -> (ValueKind, u64) {
        match self {
            DocValue::Scalar { .. } => (ValueKind::Scalar, 0),
            DocValue::Array {
                declared, items, ..
            } => (ValueKind::Array, declared.unwrap_or(items.len() as u64)),
            DocValue::Hash {
                declared, entries, ..
            } => (ValueKind::Hash, declared.unwrap_or(entries.len() as u64)),
            DocValue::Root { children, .. } => (ValueKind::Root, children.len() as u64),
            DocValue::Other { tag, .. } => (ValueKind::Other(*tag), 0),
        }
    }
}

/// Position-level item: values in arrays and roots, alternating keys and
/// values in hashes
#[derive(Debug, Clone, Copy)]
enum Item<'t> {
    Value(&'t DocValue),
    Key(&'t DocKey),
}

#[derive(Debug, Clone)]
struct Level<'t> {
    items: Vec<Item<'t>>,
    pos: usize,
}

impl<'t> Level<'t> {
    fn current(&self) -> Option<Item<'t>> {
        self.items.get(self.pos).copied()
    }
}

/// Cursor over a [`DocValue`] tree
#[derive(Debug, Clone)]
pub struct TreeCursor<'t> {
    levels: Vec<Level<'t>>,
}

impl<'t> TreeCursor<'t> {
    /// Create a cursor positioned at the top value
    pub fn new(top: &'t DocValue) -> Self {
        Self {
            levels: vec![Level {
                items: vec![Item::Value(top)],
                pos: 0,
            }],
        }
    }

    /// Number of entered containers
    pub fn depth(&self) -> usize {
        self.levels.len() - 1
    }

    fn level(&self) -> &Level<'t> {
        // levels is never empty: step_out refuses to pop the top level
        &self.levels[self.levels.len() - 1]
    }

    fn current(&self) -> Result<Item<'t>, CursorError> {
        self.level().current().ok_or(CursorError::AtEnd)
    }
}

impl<'t> DocumentCursor for TreeCursor<'t> {
    fn is_at_end(&self) -> bool {
        self.level().current().is_none()
    }

    fn object_info(&self) -> Result<(ValueKind, u64), CursorError> {
        match self.current()? {
            Item::Value(value) => Ok(value.info()),
            Item::Key(key) => Err(CursorError::NotAValue { offset: key.offset }),
        }
    }

    fn offset(&self) -> Result<u64, CursorError> {
        Ok(match self.current()? {
            Item::Value(value) => value.offset(),
            Item::Key(key) => key.offset,
        })
    }

    fn hash_key(&self) -> Result<&[u8], CursorError> {
        match self.current()? {
            Item::Key(key) => Ok(&key.bytes),
            Item::Value(value) => Err(CursorError::NotAHashKey {
                offset: value.offset(),
            }),
        }
    }

    fn step_in(&mut self) -> Result<(), CursorError> {
        let value = match self.current()? {
            Item::Value(value) => value,
            Item::Key(key) => return Err(CursorError::NotAValue { offset: key.offset }),
        };

        let items = match value {
            DocValue::Array { items, .. } => items.iter().map(Item::Value).collect(),
            DocValue::Hash { entries, .. } => entries
                .iter()
                .flat_map(|(key, value)| [Item::Key(key), Item::Value(value)])
                .collect(),
            DocValue::Root { children, .. } => children.iter().map(Item::Value).collect(),
            DocValue::Scalar { offset } | DocValue::Other { offset, .. } => {
                return Err(CursorError::NotAContainer { offset: *offset })
            }
        };

        self.levels.push(Level { items, pos: 0 });
        Ok(())
    }

    fn step_out(&mut self) -> Result<(), CursorError> {
        if self.levels.len() <= 1 {
            return Err(CursorError::StepOutAtTop);
        }
        self.levels.pop();
        Ok(())
    }

    fn advance(&mut self) -> Result<(), CursorError> {
        let last = self.levels.len() - 1;
        let level = &mut self.levels[last];
        if level.pos >= level.items.len() {
            return Err(CursorError::AtEnd);
        }
        level.pos += 1;
        Ok(())
    }
}
