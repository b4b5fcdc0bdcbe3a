use std::time::Instant;
use textbox_layout::{
    EditDelta, LayoutConfig, LayoutResult, MonospaceMetrics, TextLayoutEngine, WrapMode,
};

fn large_text(line_count: usize) -> String {
    let mut out = String::with_capacity(line_count * 96);
    for i in 0..line_count {
        out.push_str(&format!(
            "{i:06} the quick brown fox jumps over the lazy dog, \
             then wanders off past the right edge (textbox-layout example)\n"
        ));
    }
    out.pop();
    out
}

fn main() {
    let text = large_text(100_000);
    let config = LayoutConfig::default().with_wrap_mode(WrapMode::Word);
    let mut engine = TextLayoutEngine::with_config(MonospaceMetrics::cells(), config);

    let start = Instant::now();
    engine.set_text(&text);
    let result = engine.layout(60.0, 40.0);
    let open_time = start.elapsed();
    if let LayoutResult::Virtualized { line_count, .. } = result {
        println!("open: {open_time:?}, lines: {line_count:?}");
    }

    // Jump deep into the document; only the window around it is realized.
    let start = Instant::now();
    engine.scroll_to_line(150_000);
    let result = engine.layout(60.0, 40.0);
    println!(
        "scroll: {:?}, first visible: {}, lines: {}, cached: {}",
        start.elapsed(),
        engine.first_visible_line(),
        result.line_count(),
        engine.cached_line_count()
    );

    // Type into the first visible line.
    let first = engine.first_visible_line();
    let mut offset = engine.get_line(first).map_or(0, |line| line.start + 7);
    let start = Instant::now();
    for _ in 0..100 {
        // Deltas always match the buffer, so the reload closure is never called.
        engine.on_edit(&EditDelta::insert(offset, "x"), String::new);
        offset += 1;
        engine.layout(60.0, 40.0);
    }
    println!("typing: {:?}, stats: {:?}", start.elapsed(), engine.stats());

    let (line, x) = engine.caret_position(offset);
    println!("caret: line {line}, x {x}");
    for index in first..first + 4 {
        if let Some(line_text) = engine.line_text(index) {
            println!("{index:>8} | {line_text}");
        }
    }
}

