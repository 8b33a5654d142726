// 행 키 / 엔티티 매핑 벤치마크
//
// Section 1: 순서 보존 키 인코딩 (전체 키 vs 부분 키, 디코딩)
// Section 2: 엔티티 ↔ 행 변환 (map_from_entity, map_to_entity)

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use rowmap_core::{EntityMapperBuilder, GenericRecord, Row, Value};
use std::collections::BTreeMap;

const SCHEMA: &str = r#"{
    "name": "event", "type": "record",
    "fields": [
        {"name": "tenant", "type": "string", "mapping": {"type": "key", "value": "0"}},
        {"name": "ts", "type": "long", "mapping": {"type": "key", "value": "1"}},
        {"name": "seq", "type": "int", "mapping": {"type": "key", "value": "2"}},
        {"name": "kind", "type": "string", "mapping": {"type": "column", "value": "e:kind"}},
        {"name": "size", "type": "long", "mapping": {"type": "column", "value": "e:size"}},
        {"name": "attrs", "type": {"type": "map", "values": "string"}, "mapping": {"type": "keyAsColumn", "value": "a"}}
    ]
}"#;

// ═══════════════════════════════════════════════════════════════════════════
// Section 1: 키 인코딩
// ═══════════════════════════════════════════════════════════════════════════

fn bench_key_codec(c: &mut Criterion) {
    let mapper = EntityMapperBuilder::new(SCHEMA).build_generic().unwrap();
    let serde = mapper.key_serde();
    let parts = [Value::from("tenant-\0-42"), Value::Long(1_700_000_000_000), Value::Int(7)];
    let encoded = serde.serialize_parts(&parts).unwrap();

    let mut group = c.benchmark_group("key_codec");

    group.bench_function("serialize_full", |b| {
        b.iter(|| serde.serialize_parts(black_box(&parts)).unwrap())
    });

    group.bench_function("serialize_prefix_1", |b| {
        b.iter(|| serde.serialize_parts(black_box(&parts[..1])).unwrap())
    });

    group.bench_function("deserialize_full", |b| {
        b.iter(|| serde.deserialize(black_box(&encoded)).unwrap())
    });

    group.finish();
}

// ═══════════════════════════════════════════════════════════════════════════
// Section 2: 엔티티 매핑
// ═══════════════════════════════════════════════════════════════════════════

fn entity(mapper_schema: std::sync::Arc<rowmap_core::RecordSchema>) -> GenericRecord {
    let mut attrs = BTreeMap::new();
    for i in 0..8 {
        attrs.insert(format!("attr{i}"), Value::from(format!("value-{i}")));
    }
    GenericRecord::new(mapper_schema)
        .set("tenant", "acme")
        .and_then(|r| r.set("ts", 1_700_000_000_000i64))
        .and_then(|r| r.set("seq", 3))
        .and_then(|r| r.set("kind", "click"))
        .and_then(|r| r.set("size", 512i64))
        .and_then(|r| r.set("attrs", Value::Map(attrs)))
        .unwrap()
}

fn bench_entity_mapping(c: &mut Criterion) {
    let mapper = EntityMapperBuilder::new(SCHEMA).build_generic().unwrap();
    let entity = entity(mapper.entity_schema().record_schema().clone());
    let mutation = mapper.map_from_entity(&entity).unwrap();
    let row = Row::from_cells(mutation.key(), mutation.cells().to_vec());

    let mut group = c.benchmark_group("entity_mapping");

    group.bench_function("map_from_entity", |b| {
        b.iter(|| mapper.map_from_entity(black_box(&entity)).unwrap())
    });

    group.bench_function("map_to_entity", |b| {
        b.iter(|| mapper.map_to_entity(black_box(&row)).unwrap())
    });

    group.finish();
}

criterion_group!(benches, bench_key_codec, bench_entity_mapping);
criterion_main!(benches);
