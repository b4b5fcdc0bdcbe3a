use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use textbox_layout::{EditDelta, LayoutConfig, MonospaceMetrics, TextLayoutEngine, WrapMode};

fn large_text(line_count: usize) -> String {
    let mut out = String::with_capacity(line_count * 96);
    for i in 0..line_count {
        out.push_str(&format!(
            "{i:06} the quick brown fox jumps over the lazy dog (textbox-layout benchmark line) \
             and then keeps going so that it wraps\n"
        ));
    }
    // Remove the final '\n' to avoid creating an extra trailing empty line.
    out.pop();
    out
}

fn engine(text: &str, wrap_mode: WrapMode) -> TextLayoutEngine {
    let config = LayoutConfig::default().with_wrap_mode(wrap_mode);
    let mut engine = TextLayoutEngine::with_config(MonospaceMetrics::cells(), config);
    engine.set_text(text);
    engine.layout(80.0, 60.0);
    engine
}

fn bench_large_file_open(c: &mut Criterion) {
    let text = large_text(50_000);
    c.bench_function("large_file_open/50k_lines", |b| {
        b.iter(|| {
            let engine = engine(black_box(&text), WrapMode::Word);
            black_box(engine.line_count());
        })
    });
}

fn bench_typing_in_middle(c: &mut Criterion) {
    let text = large_text(50_000);
    for wrap_mode in [WrapMode::Word, WrapMode::None] {
        c.bench_function(&format!("typing_middle/{wrap_mode:?}/100_inserts"), |b| {
            b.iter_batched(
                || engine(&text, wrap_mode),
                |mut engine| {
                    let mut offset = engine.len() / 2;
                    for _ in 0..100 {
                        let report = engine.on_edit(&EditDelta::insert(offset, "x"), String::new);
                        black_box(report);
                        black_box(engine.find_line_for_offset(offset));
                        offset += 1;
                    }
                    black_box(engine.len());
                },
                BatchSize::LargeInput,
            )
        });
    }
}

fn bench_deep_viewport_layout(c: &mut Criterion) {
    let text = large_text(50_000);
    let mut engine = engine(&text, WrapMode::Word);

    // Pick a line well into the file to avoid warming only the top-of-document paths.
    engine.scroll_to_line(60_000);

    c.bench_function("viewport_layout/deep_scroll", |b| {
        b.iter(|| {
            let result = engine.layout(80.0, 60.0);
            black_box(result);
        })
    });
}

criterion_group!(
    benches,
    bench_large_file_open,
    bench_typing_in_middle,
    bench_deep_viewport_layout
);
criterion_main!(benches);
