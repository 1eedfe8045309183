use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use nerdalert_chat::ToolCall;
use nerdalert_chat::sse::{LineDecoder, SseLine, StreamAccumulator, classify_line};
use serde_json::json;

// Helper to build a stream body of `count` text events
fn text_stream(count: usize, text_size: usize) -> Vec<u8> {
    let text = "a".repeat(text_size);
    let mut body = String::new();
    for _ in 0..count {
        body.push_str(&format!(
            "data: {}\n\n",
            json!({"choices": [{"delta": {"content": text}}]})
        ));
    }
    body.push_str("data: [DONE]\n\n");
    body.into_bytes()
}

// Helper to build a stream that ends with tool call fragments
fn tool_stream(calls: usize) -> Vec<u8> {
    let mut body = text_stream(5, 20);
    body.truncate(body.len() - "data: [DONE]\n\n".len());
    for i in 0..calls {
        let call = ToolCall::new(
            format!("call_{}", i),
            "web_search",
            format!("{{\"query\":\"topic {}\"}}", i),
        );
        body.extend_from_slice(
            format!(
                "data: {}\n\n",
                json!({"choices": [{"delta": {"tool_calls": [call]}}]})
            )
            .as_bytes(),
        );
    }
    body.extend_from_slice(b"data: [DONE]\n\n");
    body
}

// Decodes `body` delivered in `chunk_size` pieces, the way the client reads it
fn decode(body: &[u8], chunk_size: usize) -> usize {
    let mut decoder = LineDecoder::new();
    let mut accumulator = StreamAccumulator::new();
    for chunk in body.chunks(chunk_size) {
        for line in decoder.push(chunk).expect("lines fit the buffer") {
            match classify_line(&line) {
                SseLine::Done => return accumulator.finish().text.len(),
                SseLine::Delta(Some(delta)) => {
                    accumulator.apply(delta);
                }
                _ => {}
            }
        }
    }
    accumulator.finish().text.len()
}

// Benchmark: classify_line over the kinds of lines a stream carries
fn bench_classify_line(c: &mut Criterion) {
    let mut group = c.benchmark_group("classify_line");
    let text = format!(
        "data: {}",
        json!({"choices": [{"delta": {"content": "Hello there"}}]})
    );
    let lines = [
        ("text", text.as_str()),
        ("done", "data: [DONE]"),
        ("ignored", "event: message"),
        ("malformed", "data: {not json"),
    ];

    for (name, line) in lines {
        group.bench_with_input(BenchmarkId::from_parameter(name), &line, |b, line| {
            b.iter(|| classify_line(black_box(line)));
        });
    }

    group.finish();
}

// Benchmark: full decode with varying network chunk sizes
fn bench_decode_by_chunk_size(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_by_chunk_size");
    let body = text_stream(200, 40);

    for chunk_size in [1, 16, 256, 4096].iter() {
        group.bench_with_input(
            BenchmarkId::from_parameter(chunk_size),
            chunk_size,
            |b, &size| {
                b.iter(|| decode(black_box(&body), size));
            },
        );
    }

    group.finish();
}

// Benchmark: full decode with varying event counts
fn bench_decode_by_event_count(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_by_event_count");

    for count in [1, 10, 100, 1000].iter() {
        let body = text_stream(*count, 40);
        group.bench_with_input(BenchmarkId::from_parameter(count), &body, |b, body| {
            b.iter(|| decode(black_box(body), 256));
        });
    }

    group.finish();
}

// Benchmark: streams that request tools
fn bench_decode_tool_calls(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_tool_calls");

    for calls in [1, 4, 16].iter() {
        let body = tool_stream(*calls);
        group.bench_with_input(BenchmarkId::from_parameter(calls), &body, |b, body| {
            b.iter(|| decode(black_box(body), 256));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_classify_line,
    bench_decode_by_chunk_size,
    bench_decode_by_event_count,
    bench_decode_tool_calls,
);
criterion_main!(benches);
