use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use gputext_text::{BitmapFormat, DrawSequence, Font, GlyphAtlas, Stride, TextEngine};

fn bench_draw_data_paragraph(c: &mut Criterion) {
    let mut engine = TextEngine::new();
    let font = Font::system("sans-serif", 14.0).unwrap();

    let paragraph = "The quick brown fox jumps over the lazy dog. \
        Lorem ipsum dolor sit amet, consectetur adipiscing elit. \
        Sed do eiusmod tempor incididunt ut labore et dolore magna aliqua.";

    c.bench_function("draw_data_paragraph_reshape", |b| {
        let mut text = engine.create_text_wrapped(&font, paragraph, 400);
        let mut flip = false;
        b.iter(|| {
            // Alternate widths so every iteration re-shapes.
            flip = !flip;
            text.set_wrap_width(if flip { 400 } else { 401 });
            black_box(text.draw_data(&mut engine).map(|s| s.num_vertices()));
        });
    });
}

fn bench_atlas_insert(c: &mut Criterion) {
    let bitmap = vec![200u8; 16 * 16];

    c.bench_function("atlas_insert_16x16", |b| {
        let mut atlas: GlyphAtlas<u32> = GlyphAtlas::new(1024, 4);
        let mut id = 0u32;
        b.iter(|| {
            id = id.wrapping_add(1);
            if atlas.insert(black_box(id), 16, 16, black_box(&bitmap), BitmapFormat::Alpha).is_none() {
                atlas.clear();
            }
        });
    });
}

fn bench_strided_reads(c: &mut Criterion) {
    let vertices = 4_000;
    let data: Vec<f32> = (0..vertices * 4).map(|i| i as f32).collect();
    let seq = DrawSequence::new(data, Stride::new(0, 4), Stride::new(2, 4), vertices, Vec::new(), 0)
        .unwrap();

    c.bench_function("strided_reads_4k", |b| {
        b.iter(|| {
            let mut sum = 0.0f32;
            for i in 0..seq.num_vertices() {
                let [x, y] = seq.xy(i);
                let [u, v] = seq.uv(i);
                sum += x + y + u + v;
            }
            black_box(sum)
        });
    });
}

criterion_group!(
    benches,
    bench_draw_data_paragraph,
    bench_atlas_insert,
    bench_strided_reads,
);
criterion_main!(benches);
