//! Benchmarks for SSE line classification and stream relaying
//!
//! Run with: cargo bench

use std::sync::Arc;

use async_trait::async_trait;
use criterion::{criterion_group, criterion_main, Criterion};
use futures::stream::{self, StreamExt};

use agentline::channels::{OutboundMessage, PushSender};
use agentline::config::RelayConfig;
use agentline::relay::{classify_line, StreamRelay};
use agentline::{AgentLineError, Result};

struct NullSender;

#[async_trait]
impl PushSender for NullSender {
    async fn push(&self, _message: OutboundMessage) -> Result<()> {
        Ok(())
    }

    async fn show_loading(&self, _chat_id: &str) -> Result<()> {
        Ok(())
    }
}

const DELTA: &str = r#"data: {"event":{"contentBlockDelta":{"contentBlockIndex":0,"delta":{"text":"東京は晴れ、最高気温は"}}}}"#;
const TOOL: &str = r#"data: {"event":{"contentBlockStart":{"start":{"toolUse":{"toolUseId":"t1","name":"web_search"}}}}}"#;
const STOP: &str = r#"data: {"event":{"contentBlockStop":{"contentBlockIndex":0}}}"#;

fn bench_classify(c: &mut Criterion) {
    c.bench_function("classify text delta", |b| b.iter(|| classify_line(DELTA)));
    c.bench_function("classify tool start", |b| b.iter(|| classify_line(TOOL)));
    c.bench_function("classify done", |b| b.iter(|| classify_line("data: [DONE]")));
    c.bench_function("classify malformed", |b| {
        b.iter(|| classify_line("data: {\"event\": {"))
    });
}

fn turn_lines(deltas: usize) -> Vec<String> {
    let mut lines = Vec::with_capacity(deltas + 4);
    lines.push(TOOL.to_string());
    for _ in 0..deltas {
        lines.push(DELTA.to_string());
    }
    lines.push(STOP.to_string());
    lines.push("data: [DONE]".to_string());
    lines
}

fn bench_relay_throughput(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let relay = StreamRelay::new(Arc::new(NullSender), &RelayConfig::default());

    let mut group = c.benchmark_group("relay_throughput");
    for deltas in [10, 100, 1000] {
        let lines = turn_lines(deltas);
        group.bench_function(format!("{} deltas", deltas), |b| {
            b.to_async(&rt).iter(|| async {
                let stream = stream::iter(
                    lines
                        .iter()
                        .cloned()
                        .map(Ok::<String, AgentLineError>)
                        .collect::<Vec<_>>(),
                )
                .boxed();
                relay.run("U1", stream).await
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_classify, bench_relay_throughput);
criterion_main!(benches);
