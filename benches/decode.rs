use std::sync::Arc;

use bytes::Bytes;
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use protolens::leb128::LebCodec;
use protolens::{
    Decoder, DecodedMap, DescriptorCache, FieldDecl, MessageType, PrimitiveType, Schema,
    TypeReference, Value, encode_map,
};

fn decoder() -> Decoder {
    let schema = Schema::builder()
        .message(
            MessageType::new("Node")
                .field(FieldDecl::new("id", 1, PrimitiveType::Int64))
                .field(FieldDecl::new("name", 2, PrimitiveType::String))
                .field(FieldDecl::repeated("scores", 3, PrimitiveType::Fixed32).packed())
                .field(FieldDecl::repeated("children", 4, TypeReference::message("Node"))),
        )
        .build();
    Decoder::for_type(Arc::new(DescriptorCache::new(schema)), "Node").unwrap()
}

fn flat(fields: u32) -> Bytes {
    let mut map = DecodedMap::new();
    for i in 0..fields {
        map.insert_merged(1, Value::Varint(i64::from(i) * 1_000));
        map.insert_merged(2, Value::Text(format!("name-{i}")));
    }
    encode_map(&map)
}

fn nested(depth: u32) -> Bytes {
    let mut node = DecodedMap::new();
    node.insert(1, 1i64);
    for _ in 0..depth {
        let mut parent = DecodedMap::new();
        parent.insert(2, "parent");
        parent.insert(4, node);
        node = parent;
    }
    encode_map(&node)
}

fn packed(count: usize) -> Bytes {
    let mut payload = Vec::with_capacity(4 + count * 4);
    payload.push(0x1a);
    ((count * 4) as u64).encode_leb128(&mut payload);
    for i in 0..count {
        payload.extend_from_slice(&(i as u32).to_le_bytes());
    }
    Bytes::from(payload)
}

fn decoding(c: &mut Criterion) {
    let decoder = decoder();

    let mut group = c.benchmark_group("decode");
    for fields in [8, 64] {
        let input = flat(fields);
        group.bench_with_input(BenchmarkId::new("flat", fields), &input, |b, input| {
            b.iter(|| std::hint::black_box(decoder.decode(input.clone())).unwrap())
        });
    }
    for depth in [4, 32] {
        let input = nested(depth);
        group.bench_with_input(BenchmarkId::new("nested", depth), &input, |b, input| {
            b.iter(|| std::hint::black_box(decoder.decode(input.clone())).unwrap())
        });
    }
    for count in [16, 1024] {
        let input = packed(count);
        group.bench_with_input(BenchmarkId::new("packed", count), &input, |b, input| {
            b.iter(|| std::hint::black_box(decoder.decode(input.clone())).unwrap())
        });
    }
    group.finish();
}

criterion_group!(benches, decoding);

criterion_main!(benches);
