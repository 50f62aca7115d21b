use pathindex::cursor::{DocKey, DocValue, TreeCursor};
use pathindex::index::node::{alloc_array, ARRAY_SLOT_SIZE, HEADER_SIZE};
use pathindex::index::{HashSlot, IndexArena, IndexNode, TagWord};
use pathindex::{
    build_index, ArenaGrowth, BuildConfig, CancelFlag, CapacityLimit, Corruption, CursorError,
    DocumentCursor, IndexBuilder, IndexError, NodeKind, NodeView, Shape, ValueKind,
};

fn word(value: u32) -> [u8; 4] {
    value.to_le_bytes()
}

fn build(doc: &DocValue) -> pathindex::Result<pathindex::PathIndex> {
    build_index(&mut TreeCursor::new(doc), &BuildConfig::default())
}

/// root -> [scalar@10, scalar@14, {"a": scalar@25}@20], array at offset 2
fn scenario() -> DocValue {
    DocValue::root(
        0,
        DocValue::array(
            2,
            vec![
                DocValue::scalar(10),
                DocValue::scalar(14),
                DocValue::hash(20, vec![(DocKey::new(22, "a"), DocValue::scalar(25))]),
            ],
        ),
    )
}

#[test]
fn test_scenario_layout() {
    let index = build(&scenario()).unwrap();

    let mut expected = Vec::new();
    // ARRAY_INDEXED(3) and its slots
    expected.extend(word(0x0300_0003));
    expected.extend(word(2));
    for child in [32, 40, 48] {
        expected.extend(word(0x0400_0000));
        expected.extend(word(child));
    }
    // two scalars
    expected.extend(word(0x0100_0000));
    expected.extend(word(10));
    expected.extend(word(0x0100_0000));
    expected.extend(word(14));
    // HASH_INDEXED(1), inline key "a"
    expected.extend(word(0x0600_0001));
    expected.extend(word(20));
    expected.extend(b"a\0\0\0\0\0\0\0");
    expected.extend(word(0x0700_0001));
    expected.extend(word(72));
    // value of "a"
    expected.extend(word(0x0100_0000));
    expected.extend(word(25));

    assert_eq!(index.as_bytes(), &expected[..]);
    assert_eq!(index.root().get(), 0);

    let stats = index.stats();
    assert_eq!(stats.values, 5);
    assert_eq!(stats.scalars, 3);
    assert_eq!(stats.arrays, 1);
    assert_eq!(stats.hashes, 1);
    assert_eq!(stats.arena_bytes, 80);
}

#[test]
fn test_scenario_navigation() {
    let index = build(&scenario()).unwrap();
    let view = index.view(&[]);

    let array = view.root().unwrap().as_array().unwrap();
    assert_eq!(array.len(), 3);
    assert_eq!(array.source_offset(), 2);

    let kinds: Vec<_> = array.iter().map(|n| n.unwrap().kind().unwrap()).collect();
    assert_eq!(
        kinds,
        vec![NodeKind::ScalarInSource, NodeKind::ScalarInSource, NodeKind::HashIndexed]
    );

    let hash = array.get(2).unwrap().unwrap().as_hash().unwrap();
    assert_eq!(hash.source_offset(), 20);
    let value = hash.get(b"a").unwrap().unwrap();
    assert!(matches!(value, NodeView::Scalar { source: 25 }));
}

#[test]
fn test_hash_slots_all_filled() {
    let entries: Vec<_> = (0..40u64)
        .map(|i| {
            let key = format!("key-{i}");
            (DocKey::new(i * 10 + 1, key), DocValue::scalar(i * 10 + 5))
        })
        .collect();
    let doc = DocValue::hash(0, entries);
    let index = build(&doc).unwrap();

    let IndexNode::Hash { len, slots, .. } = index.node(index.root()).unwrap() else {
        panic!("expected hash");
    };
    assert_eq!(len, 40);
    for slot in 0..len {
        let at = pathindex::index::node::hash_slot(slots, slot).unwrap();
        let entry = pathindex::index::node::read_hash_slot(index.arena(), at).unwrap();
        assert!(matches!(entry, HashSlot::Entry { .. }), "slot {slot} is empty");
    }

    let hash = index.view(&[]).root().unwrap().as_hash().unwrap();
    for i in 0..40u64 {
        let key = format!("key-{i}");
        let value = hash.get(key.as_bytes()).unwrap().unwrap();
        assert_eq!(value.source_offset() as u64, i * 10 + 5);
    }
    // keys up to 8 bytes stay inline
    assert_eq!(index.stats().large_keys, 0);
}

#[test]
fn test_size_field_boundary() {
    assert!(TagWord::pack(NodeKind::ArrayIndexed, 0x00FF_FFFF).is_ok());

    // rejected before allocating, so a tiny arena reports the size field
    let inner = DocValue::array(1, vec![]).with_declared_len(0x0100_0000);
    let doc = DocValue::array(0, vec![inner]);
    let config = BuildConfig::default().with_arena_capacity(16);
    let err = build_index(&mut TreeCursor::new(&doc), &config).unwrap_err();
    assert_eq!(
        err,
        IndexError::CapacityExceeded(CapacityLimit::SizeField { size: 0x0100_0000 })
    );
    assert!(err.is_retryable());
}

#[test]
fn test_largest_container_allocates() {
    let len = 0x00FF_FFFF;
    let mut arena = IndexArena::with_capacity(HEADER_SIZE + len * ARRAY_SLOT_SIZE).unwrap();
    let node = alloc_array(&mut arena, len as u64, 0).unwrap();
    assert_eq!(arena.remaining(), 0);

    let IndexNode::Array { len: declared, .. } = IndexNode::decode(&arena, node).unwrap() else {
        panic!("expected array");
    };
    assert_eq!(declared, 0x00FF_FFFF);
}

#[test]
fn test_long_key_rejected() {
    let key = vec![b'k'; 0x0100_0000];
    let doc = DocValue::hash(0, vec![(DocKey::new(1, key), DocValue::scalar(2))]);
    let err = build(&doc).unwrap_err();
    assert_eq!(
        err,
        IndexError::CapacityExceeded(CapacityLimit::SizeField { size: 0x0100_0000 })
    );
}

#[test]
fn test_document_offset_beyond_32_bits() {
    let doc = DocValue::array(0, vec![DocValue::scalar(u32::MAX as u64 + 1)]);
    assert_eq!(
        build(&doc).unwrap_err(),
        IndexError::CapacityExceeded(CapacityLimit::DocumentOffset {
            offset: u32::MAX as u64 + 1
        })
    );
}

#[test]
fn test_arena_growth_policy() {
    let items = (0..100).map(DocValue::scalar).collect();
    let doc = DocValue::array(0, items);

    let fixed = BuildConfig::default().with_arena_capacity(64);
    assert!(matches!(
        build_index(&mut TreeCursor::new(&doc), &fixed).unwrap_err(),
        IndexError::CapacityExceeded(CapacityLimit::Arena { .. })
    ));

    let growing = fixed.with_arena_growth(ArenaGrowth::Doubling { max: 1 << 20 });
    let grown = build_index(&mut TreeCursor::new(&doc), &growing).unwrap();
    let reference = build(&doc).unwrap();
    assert_eq!(grown.as_bytes(), reference.as_bytes());
}

#[test]
fn test_shape_errors() {
    let nested = DocValue::root(3, DocValue::scalar(4));
    let doc = DocValue::hash(0, vec![(DocKey::new(1, "r"), nested)]);
    assert_eq!(
        build(&doc).unwrap_err(),
        IndexError::UnsupportedShape(Shape::NestedRoot { offset: 3 })
    );

    let doc = DocValue::root(0, DocValue::Other { offset: 1, tag: 7 });
    assert_eq!(
        build(&doc).unwrap_err(),
        IndexError::UnsupportedShape(Shape::UnknownValue { tag: 7, offset: 1 })
    );
}

#[test]
fn test_declared_length_mismatch() {
    let doc =
        DocValue::hash(0, vec![(DocKey::new(1, "a"), DocValue::scalar(2))]).with_declared_len(2);
    assert_eq!(
        build(&doc).unwrap_err(),
        IndexError::CorruptIndex(Corruption::PrematureEnd { declared: 2, seen: 1 })
    );

    let doc =
        DocValue::array(0, vec![DocValue::scalar(1), DocValue::scalar(2)]).with_declared_len(1);
    assert_eq!(
        build(&doc).unwrap_err(),
        IndexError::CorruptIndex(Corruption::UndeclaredElements { declared: 1 })
    );
}

/// A hash declaring one entry whose key is the last thing in it
struct LoneKey {
    state: u8,
}

impl DocumentCursor for LoneKey {
    fn is_at_end(&self) -> bool {
        self.state == 2
    }

    fn object_info(&self) -> Result<(ValueKind, u64), CursorError> {
        match self.state {
            0 => Ok((ValueKind::Hash, 1)),
            1 => Err(CursorError::NotAValue { offset: 1 }),
            _ => Err(CursorError::AtEnd),
        }
    }

    fn offset(&self) -> Result<u64, CursorError> {
        match self.state {
            0 => Ok(0),
            1 => Ok(1),
            _ => Err(CursorError::AtEnd),
        }
    }

    fn hash_key(&self) -> Result<&[u8], CursorError> {
        match self.state {
            1 => Ok(b"orphan"),
            _ => Err(CursorError::NotAHashKey { offset: 0 }),
        }
    }

    fn step_in(&mut self) -> Result<(), CursorError> {
        self.state = 1;
        Ok(())
    }

    fn step_out(&mut self) -> Result<(), CursorError> {
        Err(CursorError::StepOutAtTop)
    }

    fn advance(&mut self) -> Result<(), CursorError> {
        self.state += 1;
        Ok(())
    }
}

#[test]
fn test_missing_hash_value() {
    let err = build_index(&mut LoneKey { state: 0 }, &BuildConfig::default()).unwrap_err();
    assert_eq!(
        err,
        IndexError::CorruptIndex(Corruption::MissingHashValue { key_offset: 1 })
    );
}

/// Fails to decode the first element of the top array
struct BrokenDecoder {
    entered: bool,
}

impl DocumentCursor for BrokenDecoder {
    fn is_at_end(&self) -> bool {
        false
    }

    fn object_info(&self) -> Result<(ValueKind, u64), CursorError> {
        if self.entered {
            Err(CursorError::Decode {
                offset: 5,
                reason: "truncated header".to_string(),
            })
        } else {
            Ok((ValueKind::Array, 1))
        }
    }

    fn offset(&self) -> Result<u64, CursorError> {
        Ok(if self.entered { 5 } else { 0 })
    }

    fn hash_key(&self) -> Result<&[u8], CursorError> {
        Err(CursorError::NotAHashKey { offset: 0 })
    }

    fn step_in(&mut self) -> Result<(), CursorError> {
        self.entered = true;
        Ok(())
    }

    fn step_out(&mut self) -> Result<(), CursorError> {
        self.entered = false;
        Ok(())
    }

    fn advance(&mut self) -> Result<(), CursorError> {
        Ok(())
    }
}

#[test]
fn test_cursor_failure_is_corruption() {
    let err = build_index(&mut BrokenDecoder { entered: false }, &BuildConfig::default())
        .unwrap_err();
    assert_eq!(
        err,
        IndexError::CorruptIndex(Corruption::Cursor(CursorError::Decode {
            offset: 5,
            reason: "truncated header".to_string(),
        }))
    );
    assert!(!err.is_retryable());
}

#[test]
fn test_cancel_between_builds() {
    let flag = CancelFlag::new();
    let config = BuildConfig::default().with_cancel(flag.clone());
    let doc = scenario();

    assert!(build_index(&mut TreeCursor::new(&doc), &config).is_ok());
    flag.cancel();
    assert!(matches!(
        build_index(&mut TreeCursor::new(&doc), &config).unwrap_err(),
        IndexError::Cancelled { .. }
    ));
}

#[test]
fn test_deep_nesting_without_native_recursion() {
    let mut doc = DocValue::scalar(50_000);
    for offset in (0..20_000u64).rev() {
        doc = DocValue::array(offset, vec![doc]);
    }

    let config = BuildConfig::default().with_max_depth(20_000);
    let index = build_index(&mut TreeCursor::new(&doc), &config).unwrap();
    assert_eq!(index.stats().max_depth, 20_000);

    let config = config.with_max_depth(19_999);
    assert_eq!(
        build_index(&mut TreeCursor::new(&doc), &config).unwrap_err(),
        IndexError::CapacityExceeded(CapacityLimit::Depth { ceiling: 19_999 })
    );

    // iterative teardown; the recursive drop of a deep DocValue would overflow
    let mut stack = vec![doc];
    while let Some(value) = stack.pop() {
        if let DocValue::Array { items, .. } = value {
            stack.extend(items);
        }
    }
}

#[test]
fn test_reused_arena_is_deterministic() {
    let doc = scenario();
    let mut builder = IndexBuilder::new(BuildConfig::default().with_arena_capacity(4096));

    let first = builder.build(&mut TreeCursor::new(&doc)).unwrap();
    let bytes = first.as_bytes().to_vec();

    let other = DocValue::array(0, vec![DocValue::scalar(1); 50]);
    let second = builder
        .build_in(first.into_arena(), &mut TreeCursor::new(&other))
        .unwrap();
    let third = builder
        .build_in(second.into_arena(), &mut TreeCursor::new(&doc))
        .unwrap();
    assert_eq!(third.as_bytes(), &bytes[..]);
}
