use std::collections::BTreeMap;

use msgpack_formatting_codec::{
    msgpack_record, Bytes, Codec, CodecError, CodecOptions, Describer, MsgPackType, RecordLayout,
    Result, Timestamp, TypeDescriptor, Value, DEFAULT_MAX_DEPTH,
};
use time::OffsetDateTime;

#[derive(Debug, Clone, PartialEq)]
struct Url {
    url_id: i32,
    address: String,
    title: String,
    description: Option<String>,
    created_at: OffsetDateTime,
    created_by: String,
}

msgpack_record!(Url {
    url_id: i32 => "UrlId",
    address: String => "Address",
    title: String => "Title",
    description: Option<String> => "Description",
    created_at: OffsetDateTime => "CreatedAt",
    created_by: String => "CreatedBy",
});

fn sample_url() -> Url {
    Url {
        url_id: 1,
        address: "http://x/".to_owned(),
        title: "T".to_owned(),
        description: None,
        created_at: OffsetDateTime::from_unix_timestamp_nanos(1_700_000_000_250_000_000)
            .unwrap(),
        created_by: "Me".to_owned(),
    }
}

fn map_codec() -> Codec {
    Codec::new().with_options(CodecOptions {
        record_layout: RecordLayout::Map,
        ..CodecOptions::default()
    })
}

#[test]
fn typed_encoder_wire_matrix() {
    let codec = Codec::new();

    assert_eq!(codec.encode(&()).unwrap(), vec![0xc0]);
    assert_eq!(codec.encode(&true).unwrap(), vec![0xc3]);
    assert_eq!(codec.encode(&0u8).unwrap(), vec![0x00]);
    assert_eq!(codec.encode(&127u64).unwrap(), vec![0x7f]);
    assert_eq!(codec.encode(&128u16).unwrap(), vec![0xcc, 0x80]);
    assert_eq!(codec.encode(&-32i8).unwrap(), vec![0xe0]);
    assert_eq!(codec.encode(&-33i64).unwrap(), vec![0xd0, 0xdf]);
    assert_eq!(codec.encode(&65_535u32).unwrap(), vec![0xcd, 0xff, 0xff]);
    assert_eq!(
        codec.encode(&i32::MIN).unwrap(),
        vec![0xd2, 0x80, 0x00, 0x00, 0x00]
    );
    assert_eq!(
        codec.encode(&(u32::MAX as u64 + 1)).unwrap(),
        vec![0xcf, 0, 0, 0, 1, 0, 0, 0, 0]
    );
    assert_eq!(codec.encode(&1.5f32).unwrap(), vec![0xca, 0x3f, 0xc0, 0, 0]);
    assert_eq!(
        codec.encode(&1.5f64).unwrap(),
        vec![0xcb, 0x3f, 0xf8, 0, 0, 0, 0, 0, 0]
    );

    assert_eq!(codec.encode(&String::new()).unwrap(), vec![0xa0]);
    assert_eq!(
        codec.encode(&"foo".to_owned()).unwrap(),
        vec![0xa3, b'f', b'o', b'o']
    );
    assert_eq!(codec.encode(&"x".repeat(31)).unwrap()[0], 0xbf);
    assert_eq!(&codec.encode(&"x".repeat(32)).unwrap()[..2], &[0xd9, 0x20]);
    assert_eq!(
        &codec.encode(&"x".repeat(256)).unwrap()[..3],
        &[0xda, 0x01, 0x00]
    );

    assert_eq!(
        codec.encode(&Bytes(vec![1, 2])).unwrap(),
        vec![0xc4, 0x02, 0x01, 0x02]
    );
    assert_eq!(codec.encode(&vec![1u8, 2, 3]).unwrap(), vec![0x93, 1, 2, 3]);
    assert_eq!(codec.encode(&None::<u8>).unwrap(), vec![0xc0]);

    let map: BTreeMap<String, u8> = [("a".to_owned(), 1)].into();
    assert_eq!(codec.encode(&map).unwrap(), vec![0x81, 0xa1, b'a', 0x01]);

    let seq_16: Vec<u8> = (1..=16).collect();
    let encoded = codec.encode(&seq_16).unwrap();
    assert_eq!(&encoded[..3], &[0xdc, 0x00, 0x10]);
    assert_eq!(encoded.len(), 19);

    assert_eq!(
        codec.encode(&Timestamp::from_seconds(1)).unwrap(),
        vec![0xd6, 0xff, 0, 0, 0, 1]
    );
}

#[test]
fn empty_sequence_is_fixarray_zero() {
    let codec = Codec::new();
    let bytes = codec.encode(&Vec::<String>::new()).unwrap();
    assert_eq!(bytes, vec![0x90]);
    let back: Vec<String> = codec.decode(&bytes).unwrap();
    assert!(back.is_empty());
}

#[test]
fn url_record_roundtrip() {
    let codec = Codec::new();
    let url = sample_url();
    let bytes = codec.encode(&url).unwrap();

    assert_eq!(bytes[0], 0x96, "six fields as a fixarray");
    assert_eq!(&bytes[1..3], &[0x01, 0xa9]);
    assert_eq!(codec.decode::<Url>(&bytes).unwrap(), url);

    let described = Url {
        description: Some("About".to_owned()),
        ..sample_url()
    };
    let bytes = codec.encode(&described).unwrap();
    assert_eq!(codec.decode::<Url>(&bytes).unwrap(), described);
}

#[test]
fn encoding_is_deterministic() {
    let codec = Codec::new();
    let url = sample_url();
    assert_eq!(codec.encode(&url).unwrap(), codec.encode(&url).unwrap());
    assert_eq!(
        map_codec().encode(&url).unwrap(),
        map_codec().encode(&url).unwrap()
    );
}

#[test]
fn record_field_count_must_match() {
    let codec = Codec::new();
    let bytes = codec.encode(&sample_url()).unwrap();

    let mut short = bytes.clone();
    short[0] = 0x95;
    let err = codec.decode::<Url>(&short).unwrap_err();
    assert!(matches!(err, CodecError::SchemaMismatch { .. }), "{err}");

    let mut long = bytes;
    long[0] = 0x97;
    long.push(0xc0);
    let err = codec.decode::<Url>(&long).unwrap_err();
    assert!(matches!(err, CodecError::SchemaMismatch { .. }), "{err}");
}

#[test]
fn every_truncation_is_end_of_input() {
    let codec = Codec::new();
    let bytes = codec.encode(&sample_url()).unwrap();
    for cut in 0..bytes.len() {
        let err = codec.decode::<Url>(&bytes[..cut]).unwrap_err();
        assert!(
            matches!(err, CodecError::UnexpectedEndOfInput { .. }),
            "cut at {cut}: {err}"
        );
        let err = codec.decode_from::<Url, _>(&bytes[..cut]).unwrap_err();
        assert!(
            matches!(err, CodecError::UnexpectedEndOfInput { .. }),
            "stream cut at {cut}: {err}"
        );
    }
}

#[test]
fn map_layout_uses_field_names() {
    let codec = map_codec();
    let url = sample_url();
    let bytes = codec.encode(&url).unwrap();
    assert_eq!(bytes[0], 0x86);
    assert_eq!(&bytes[1..7], &[0xa5, b'U', b'r', b'l', b'I', b'd']);
    assert_eq!(codec.decode::<Url>(&bytes).unwrap(), url);

    let err = Codec::new().decode::<Url>(&bytes).unwrap_err();
    assert!(matches!(err, CodecError::SchemaMismatch { .. }), "{err}");
}

#[test]
fn map_layout_accepts_any_field_order() {
    let codec = map_codec();
    let reordered = Value::Map(vec![
        (Value::from("CreatedBy"), Value::from("Me")),
        (Value::from("Title"), Value::from("T")),
        (Value::from("UrlId"), Value::Int(1)),
        (Value::from("Description"), Value::Nil),
        (Value::from("Address"), Value::from("http://x/")),
        (
            Value::from("CreatedAt"),
            Value::Ext(-1, Timestamp::from(sample_url().created_at).to_ext_payload()),
        ),
    ]);
    let bytes = codec.encode(&reordered).unwrap();
    assert_eq!(codec.decode::<Url>(&bytes).unwrap(), sample_url());
}

#[test]
fn map_layout_rejects_unknown_and_duplicate_names() {
    let codec = map_codec();
    let names = ["UrlId", "Address", "Title", "Description", "CreatedAt", "CreatedBy"];
    let fields = match sample_url().to_value() {
        Value::Array(items) => items,
        other => panic!("unexpected projection {other:?}"),
    };
    let mut pairs: Vec<(Value, Value)> = names
        .iter()
        .map(|name| Value::from(*name))
        .zip(fields)
        .collect();

    pairs[5] = (Value::from("Unknown"), Value::from("Me"));
    let bytes = codec.encode(&Value::Map(pairs.clone())).unwrap();
    let err = codec.decode::<Url>(&bytes).unwrap_err();
    assert!(err.to_string().contains("unknown field `Unknown`"), "{err}");

    pairs[5] = (Value::from("UrlId"), Value::Int(2));
    let bytes = codec.encode(&Value::Map(pairs)).unwrap();
    let err = codec.decode::<Url>(&bytes).unwrap_err();
    assert!(err.to_string().contains("duplicate field `UrlId`"), "{err}");
}

fn decode_u16_err(bytes: &[u8]) -> CodecError {
    Codec::new().decode::<u16>(bytes).unwrap_err()
}

#[test]
fn decoder_error_matrix() {
    assert!(matches!(
        decode_u16_err(&[0xc1]),
        CodecError::InvalidMarker(0xc1)
    ));
    assert!(matches!(
        decode_u16_err(&[0xd0, 0xff]),
        CodecError::SchemaMismatch { .. }
    ));
    assert!(matches!(
        decode_u16_err(&[0xd4, 0x05, 0x00]),
        CodecError::UnsupportedExtension(5)
    ));
    assert!(matches!(
        decode_u16_err(&[0xc0]),
        CodecError::SchemaMismatch { .. }
    ));
    assert!(matches!(
        decode_u16_err(&[0xcd, 0x01]),
        CodecError::UnexpectedEndOfInput { needed: 1 }
    ));
    assert!(matches!(
        decode_u16_err(&[0xa1, b'x']),
        CodecError::SchemaMismatch { .. }
    ));

    let codec = Codec::new();
    let err = codec.decode::<String>(&[0xa2, 0xff, 0xfe]).unwrap_err();
    assert!(matches!(err, CodecError::InvalidUtf8), "{err}");

    let err = codec
        .decode::<Timestamp>(&[0xd6, 0x07, 0, 0, 0, 0])
        .unwrap_err();
    assert!(matches!(err, CodecError::UnsupportedExtension(7)), "{err}");
}

#[test]
fn float64_accepts_float32_input() {
    let codec = Codec::new();
    let bytes = codec.encode(&1.5f32).unwrap();
    assert_eq!(codec.decode::<f64>(&bytes).unwrap(), 1.5);
    let wide = codec.encode(&1.5f64).unwrap();
    assert!(codec.decode::<f32>(&wide).is_err());
}

#[test]
fn dynamic_values_keep_unknown_extensions() {
    let codec = Codec::new();
    let value = Value::Array(vec![
        Value::Ext(42, vec![1, 2, 3]),
        Value::Map(vec![(Value::Int(1), Value::Bin(vec![9]))]),
        Value::UInt(u64::MAX),
    ]);
    let bytes = codec.encode(&value).unwrap();
    assert_eq!(codec.decode::<Value>(&bytes).unwrap(), value);
}

/// Claims to be a sequence of `u8` but projects a string in the middle.
struct Inconsistent;

impl MsgPackType for Inconsistent {
    fn describe(cx: &mut Describer<'_>) -> Result<TypeDescriptor> {
        Ok(TypeDescriptor::Sequence(cx.resolve::<u8>()?))
    }

    fn to_value(&self) -> Value {
        Value::Array(vec![Value::Int(1), Value::from("two"), Value::Int(3)])
    }

    fn from_value(_: Value) -> Result<Self> {
        Ok(Inconsistent)
    }
}

#[test]
fn encode_to_writes_whole_values_only() {
    let codec = Codec::new();
    let mut sink = Vec::new();
    let written = codec.encode_to(&sample_url(), &mut sink).unwrap();
    assert_eq!(written, sink.len());
    assert_eq!(sink, codec.encode(&sample_url()).unwrap());

    let mut untouched = vec![0xaa];
    let err = codec.encode_to(&Inconsistent, &mut untouched).unwrap_err();
    assert!(matches!(err, CodecError::TypeMismatch { .. }), "{err}");
    assert_eq!(untouched, vec![0xaa]);
}

#[derive(Debug, PartialEq)]
struct Tree {
    value: u8,
    children: Vec<Tree>,
}

msgpack_record!(Tree {
    value: u8 => "Value",
    children: Vec<Tree> => "Children",
});

/// A chain of `levels` trees. Each level nests a record and its child list,
/// so it spends two units of decoder depth.
fn tree_chain(levels: usize) -> Tree {
    let mut tree = Tree {
        value: 0,
        children: Vec::new(),
    };
    for level in 1..levels {
        tree = Tree {
            value: (level % 256) as u8,
            children: vec![tree],
        };
    }
    tree
}

/// Runs `f` on a thread with the platform's usual 2 MiB stack.
fn on_small_stack<F: FnOnce() + Send + 'static>(f: F) {
    std::thread::Builder::new()
        .stack_size(2 << 20)
        .spawn(f)
        .unwrap()
        .join()
        .unwrap();
}

#[test]
fn default_depth_limit_fits_a_small_stack() {
    on_small_stack(|| {
        let codec = Codec::new();

        let mut bytes = vec![0x91; DEFAULT_MAX_DEPTH];
        bytes.push(0x90);
        assert!(codec.decode::<Value>(&bytes).is_ok());
        assert!(codec.decode_from::<Value, _>(bytes.as_slice()).is_ok());

        let mut deeper = vec![0x91; DEFAULT_MAX_DEPTH + 1];
        deeper.push(0x90);
        let err = codec.decode::<Value>(&deeper).unwrap_err();
        assert!(matches!(err, CodecError::DepthLimitExceeded(DEFAULT_MAX_DEPTH)), "{err}");

        let tree = tree_chain(DEFAULT_MAX_DEPTH / 2);
        let body = codec.encode(&tree).unwrap();
        assert_eq!(codec.decode::<Tree>(&body).unwrap(), tree);

        let body = codec.encode(&tree_chain(DEFAULT_MAX_DEPTH / 2 + 1)).unwrap();
        let err = codec.decode::<Tree>(&body).unwrap_err();
        assert!(matches!(err, CodecError::DepthLimitExceeded(_)), "{err}");
    });
}
