//! Criterion benchmarks for the codec critical paths
//!
//! Benchmarks the operations that dominate save/load of a real project:
//! - Array literal writing and reading
//! - Whole-map serialization and parsing
//! - Storage-order permutation of large backgrounds

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use gbatile::cgen::{self, CType, SourceReader};
use gbatile::models::{Asset, BgSize, Map};
use gbatile::scan::screen_entry_order;
use gbatile::{parser, writer};

fn make_map(size: BgSize) -> Map {
    let mut map = Map::default();
    map.name = "Bench".to_string();
    map.backgrounds[0].resize(size);
    map.backgrounds[0].tileset = Some("Forest".to_string());
    for i in 0..map.backgrounds[0].tiles.len() {
        map.backgrounds[0].set_tile(i, (i % 512) as u16, i % 3 == 0, i % 7 == 0);
    }
    map
}

fn bench_array_literals(c: &mut Criterion) {
    let mut group = c.benchmark_group("array_literal");
    for count in [1024usize, 8192] {
        let values: Vec<u32> = (0..count as u32).map(|i| i & 0xffff).collect();
        group.throughput(Throughput::Elements(count as u64));

        group.bench_with_input(BenchmarkId::new("write", count), &values, |b, values| {
            b.iter(|| {
                let mut out = String::new();
                cgen::write_array(&mut out, CType::ConstUnsignedShort, "data", values.iter().copied());
                black_box(out)
            })
        });

        let mut text = String::new();
        cgen::write_array(&mut text, CType::ConstUnsignedShort, "data", values.iter().copied());
        group.bench_with_input(BenchmarkId::new("read", count), &text, |b, text| {
            b.iter(|| {
                let mut r = SourceReader::new(text);
                black_box(cgen::read_array(&mut r, CType::ConstUnsignedShort).unwrap())
            })
        });
    }
    group.finish();
}

fn bench_map_serialization(c: &mut Criterion) {
    let mut group = c.benchmark_group("map");
    for (label, size) in [("32x32", BgSize::Reg32x32), ("64x64", BgSize::Reg64x64)] {
        let asset = Asset::Map(make_map(size));

        group.bench_with_input(BenchmarkId::new("serialize", label), &asset, |b, asset| {
            b.iter(|| black_box(writer::write_source_file(asset)))
        });

        let text = writer::write_source_file(&asset);
        group.bench_with_input(BenchmarkId::new("parse", label), &text, |b, text| {
            b.iter(|| black_box(parser::parse_source_file(text, asset.kind()).unwrap()))
        });
    }
    group.finish();
}

fn bench_screen_entry_order(c: &mut Criterion) {
    c.bench_function("screen_entry_order_128x128", |b| {
        b.iter(|| black_box(screen_entry_order(128, 128, false)))
    });
}

criterion_group!(
    benches,
    bench_array_literals,
    bench_map_serialization,
    bench_screen_entry_order
);
criterion_main!(benches);
