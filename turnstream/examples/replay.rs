//! Replay a captured SSE transcript through a turn session.
//!
//! The transcript is split into small chunks to mimic network delivery,
//! and every snapshot is printed as one JSON line.
//!
//! Run with:
//! ```bash
//! RUST_LOG=turnstream_streaming=debug cargo run --example replay -- transcript.sse 16
//! ```
//!
//! Without arguments a built-in transcript is replayed.

use bytes::Bytes;
use futures::{stream, StreamExt};
use std::convert::Infallible;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use turnstream::prelude::*;

const DEMO_TRANSCRIPT: &str = concat!(
    "data: {\"type\":\"thinking\",\"message\":\"Planning\"}\n\n",
    "data: {\"type\":\"text-delta\",\"text\":\"Let me create that file. \"}\n\n",
    "data: {\"type\":\"tool-call-start\",\"part\":{\"toolCallId\":\"call_1\",\"toolName\":\"create_file\",\"args\":{\"path\":\"notes.md\"}}}\n\n",
    "data: {\"type\":\"tool-status\",\"tool\":\"create_file\",\"message\":\"Writing notes.md\"}\n\n",
    "data: {\"type\":\"tool-result\",\"part\":{\"toolCallId\":\"call_1\",\"result\":{\"path\":\"notes.md\",\"bytes\":42}}}\n\n",
    "data: {\"type\":\"text-delta\",\"text\":\"Done.\"}\n\n",
    "data: {\"type\":\"completion-summary\",\"toolExecutions\":1,\"toolsUsed\":[\"create_file\"]}\n\n",
    "data: {\"type\":\"message-end\",\"status\":{\"type\":\"complete\"}}\n\n",
);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let mut args = std::env::args().skip(1);
    let transcript = match args.next() {
        Some(path) => std::fs::read(&path)?,
        None => DEMO_TRANSCRIPT.as_bytes().to_vec(),
    };
    let chunk_size: usize = match args.next() {
        Some(n) => n.parse()?,
        None => 24,
    };
    anyhow::ensure!(chunk_size > 0, "chunk size must be positive");

    let chunks: Vec<Result<Bytes, Infallible>> = transcript
        .chunks(chunk_size)
        .map(|c| Ok(Bytes::copy_from_slice(c)))
        .collect();

    let (sink, mut effects) = ChannelSink::new();
    let mut session = Box::pin(TurnSession::with_config(
        stream::iter(chunks),
        CancellationToken::new(),
        &StreamConfig::default(),
        Arc::new(sink),
    ));

    while let Some(snapshot) = session.next().await {
        println!("{}", serde_json::to_string(&snapshot)?);
    }

    while let Ok(effect) = effects.try_recv() {
        eprintln!("side effect: {}", serde_json::to_string(&effect)?);
    }

    Ok(())
}
