//! Benchmarks for gputext-render geometry batching and transforms.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use gputext_render::geometry::GeometryBuffer;
use gputext_render::vertex::{model_matrix, TransformUniform};
use gputext_text::{DrawSequence, Stride};

/// `quads` glyph quads on one page, interleaved `[x, y, u, v]`.
fn make_sequence(quads: usize, page: usize) -> DrawSequence {
    let mut data = Vec::with_capacity(quads * 16);
    let mut indices = Vec::with_capacity(quads * 6);
    for q in 0..quads {
        let x = (q as f32 * 9.0) % 780.0;
        let y = (q as f32 * 9.0 / 780.0).floor() * 14.0;
        for (dx, dy) in [(0.0, 0.0), (8.0, 0.0), (8.0, 12.0), (0.0, 12.0)] {
            data.extend_from_slice(&[x + dx, y + dy, dx / 8.0, dy / 12.0]);
        }
        let base = (q * 4) as u32;
        indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }
    DrawSequence::new(data, Stride::new(0, 4), Stride::new(2, 4), quads * 4, indices, page).unwrap()
}

fn bench_append(c: &mut Criterion) {
    let mut group = c.benchmark_group("geometry_append");
    for &quads in &[10, 100, 1_000] {
        let seq = make_sequence(quads, 0);
        group.bench_with_input(BenchmarkId::from_parameter(quads), &seq, |b, seq| {
            let mut buf = GeometryBuffer::new();
            b.iter(|| {
                buf.clear();
                black_box(buf.append(black_box(seq), [1.0, 1.0, 0.0, 1.0]).unwrap());
            });
        });
    }
    group.finish();
}

fn bench_append_chain(c: &mut Criterion) {
    let chain = make_sequence(250, 0)
        .with_next(make_sequence(250, 1).with_next(make_sequence(250, 2)));

    c.bench_function("geometry_append_chain_3_pages", |b| {
        let mut buf = GeometryBuffer::new();
        b.iter(|| {
            buf.clear();
            black_box(buf.append_chain(black_box(&chain), [1.0; 4]).unwrap());
        });
    });
}

fn bench_transforms(c: &mut Criterion) {
    c.bench_function("TransformUniform::screen_with_model", |b| {
        b.iter(|| {
            black_box(
                TransformUniform::screen(black_box(800.0), black_box(600.0)).with_model(model_matrix(
                    [300.0, 150.0],
                    std::f32::consts::FRAC_PI_4,
                    [1.2, 1.2],
                )),
            );
        });
    });
}

criterion_group!(benches, bench_append, bench_append_chain, bench_transforms);
criterion_main!(benches);
