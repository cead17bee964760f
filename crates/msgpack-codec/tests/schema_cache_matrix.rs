use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use msgpack_formatting_codec::{
    msgpack_record, Category, Codec, CodecError, Describer, IntKind, MsgPackType, Result,
    SchemaCache, TypeDescriptor, TypeHandle, TypeKind, Value,
};

static SLOW_DESCRIBES: AtomicUsize = AtomicUsize::new(0);

/// A type whose descriptor takes a while to build.
#[derive(Debug, PartialEq)]
struct Slow(u32);

impl MsgPackType for Slow {
    fn describe(_: &mut Describer<'_>) -> Result<TypeDescriptor> {
        SLOW_DESCRIBES.fetch_add(1, Ordering::SeqCst);
        thread::sleep(Duration::from_millis(20));
        Ok(TypeDescriptor::Int(IntKind::U32))
    }

    fn to_value(&self) -> Value {
        Value::from(self.0 as u64)
    }

    fn from_value(value: Value) -> Result<Self> {
        u32::from_value(value).map(Slow)
    }
}

/// Interface-like type with no concrete binding.
struct Shape;

impl MsgPackType for Shape {
    const KIND: TypeKind = TypeKind::Abstract;

    fn describe(_: &mut Describer<'_>) -> Result<TypeDescriptor> {
        Err(CodecError::unsupported::<Self>("no concrete binding"))
    }

    fn to_value(&self) -> Value {
        Value::Nil
    }

    fn from_value(_: Value) -> Result<Self> {
        Err(CodecError::unsupported::<Self>("no concrete binding"))
    }
}

struct Drawing {
    title: String,
    shapes: Vec<Shape>,
}

msgpack_record!(Drawing {
    title: String => "Title",
    shapes: Vec<Shape> => "Shapes",
});

#[derive(Debug, Clone, PartialEq)]
struct Node {
    value: i32,
    children: Vec<Node>,
}

msgpack_record!(Node {
    value: i32 => "Value",
    children: Vec<Node> => "Children",
});

#[derive(Debug, Clone, PartialEq)]
struct Link {
    label: String,
    next: Option<Box<Link>>,
}

msgpack_record!(Link {
    label: String => "Label",
    next: Option<Box<Link>> => "Next",
});

#[test]
fn concurrent_first_use_builds_one_plan() {
    let cache = Arc::new(SchemaCache::new());
    let barrier = Arc::new(Barrier::new(16));

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let cache = Arc::clone(&cache);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                cache.resolve::<Slow>().unwrap()
            })
        })
        .collect();
    let plans: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(SLOW_DESCRIBES.load(Ordering::SeqCst), 1);
    assert_eq!(cache.builds(), 1);
    for plan in &plans[1..] {
        assert!(Arc::ptr_eq(&plans[0], plan));
    }
    assert!(plans[0].is_complete());
}

#[test]
fn self_referential_type_resolves_to_its_own_plan() {
    let cache = SchemaCache::new();
    let node = cache.resolve::<Node>().unwrap();
    let children = match node.descriptor().unwrap() {
        TypeDescriptor::Record(fields) => Arc::clone(&fields[1].plan),
        other => panic!("unexpected descriptor {other:?}"),
    };
    match children.descriptor().unwrap() {
        TypeDescriptor::Sequence(elem) => assert!(Arc::ptr_eq(elem, &node)),
        other => panic!("unexpected descriptor {other:?}"),
    }
    assert_eq!(node.descriptor().unwrap().category(), Category::Record);
    assert!(Arc::ptr_eq(&cache.resolve::<Vec<Node>>().unwrap(), &children));
}

#[test]
fn recursive_values_roundtrip() {
    let codec = Codec::new();
    let tree = Node {
        value: 1,
        children: vec![
            Node {
                value: 2,
                children: Vec::new(),
            },
            Node {
                value: 3,
                children: vec![Node {
                    value: 4,
                    children: Vec::new(),
                }],
            },
        ],
    };
    let bytes = codec.encode(&tree).unwrap();
    assert_eq!(&bytes[..3], &[0x92, 0x01, 0x92]);
    assert_eq!(codec.decode::<Node>(&bytes).unwrap(), tree);

    let list = Link {
        label: "a".to_owned(),
        next: Some(Box::new(Link {
            label: "b".to_owned(),
            next: None,
        })),
    };
    let bytes = codec.encode(&list).unwrap();
    assert_eq!(
        bytes,
        vec![0x92, 0xa1, b'a', 0x92, 0xa1, b'b', 0xc0]
    );
    assert_eq!(codec.decode::<Link>(&bytes).unwrap(), list);
}

#[test]
fn admissibility_matrix() {
    assert!(TypeHandle::of::<u8>().is_admissible());
    assert!(TypeHandle::of::<Node>().is_admissible());
    assert!(!TypeHandle::of::<Shape>().is_admissible());
    // Sequence-like types are admissible whatever their elements are.
    assert!(TypeHandle::of::<Vec<Shape>>().is_admissible());
    assert_eq!(TypeHandle::of::<Vec<Shape>>().kind(), TypeKind::Sequence);
}

#[test]
fn element_types_fail_lazily_at_resolve_time() {
    let cache = SchemaCache::new();
    let err = cache.resolve::<Vec<Shape>>().unwrap_err();
    assert!(matches!(err, CodecError::UnsupportedType { .. }), "{err}");
    assert!(cache.is_empty());

    let err = cache.resolve::<Drawing>().unwrap_err();
    assert!(matches!(err, CodecError::UnsupportedType { .. }), "{err}");
    // Nothing from a failed build is published, not even `String`.
    assert!(!cache.contains::<String>());
    assert_eq!(cache.builds(), 0);

    let codec = Codec::with_cache(Arc::new(cache));
    let err = codec.encode(&Vec::<Shape>::new()).unwrap_err();
    assert!(matches!(err, CodecError::UnsupportedType { .. }), "{err}");
}

#[test]
fn shared_cache_across_codecs() {
    let cache = Arc::new(SchemaCache::new());
    let first = Codec::with_cache(Arc::clone(&cache));
    let second = Codec::with_cache(Arc::clone(&cache));
    first.encode(&vec![1u64]).unwrap();
    let builds = cache.builds();
    second.encode(&vec![2u64]).unwrap();
    assert_eq!(cache.builds(), builds);
    assert_eq!(cache.len(), 2);
}
