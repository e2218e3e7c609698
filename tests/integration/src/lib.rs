//! Integration tests for the Intake engine.
//!
//! These tests drive [`BodyParser`](intake_core::BodyParser) end to end:
//! in-process chunk streams stand in for the transport, and a per-test temp
//! directory stands in for durable storage. No server process is required.

use std::sync::Once;

use bytes::Bytes;
use futures::Stream;
use futures::stream;
use intake_core::DecodeResult;

static INIT: Once = Once::new();

/// Initialize tracing (once).
pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .init();
    });
}

/// Build request parts with an optional content type.
#[must_use]
pub fn request_parts(method: &str, uri: &str, content_type: Option<&str>) -> http::request::Parts {
    init_tracing();
    let mut builder = http::Request::builder().method(method).uri(uri);
    if let Some(ct) = content_type {
        builder = builder.header(http::header::CONTENT_TYPE, ct);
    }
    let (parts, ()) = builder
        .body(())
        .unwrap_or_else(|e| panic!("invalid test request: {e}"))
        .into_parts();
    parts
}

/// A body stream delivering the given chunks in order, then ending.
pub fn body_chunks(chunks: Vec<Bytes>) -> impl Stream<Item = DecodeResult<Bytes>> + Unpin + Send {
    let items: Vec<DecodeResult<Bytes>> = chunks.into_iter().map(Ok).collect();
    stream::iter(items)
}

/// A body stream delivering one chunk.
pub fn one_chunk(data: impl Into<Bytes>) -> impl Stream<Item = DecodeResult<Bytes>> + Unpin + Send {
    body_chunks(vec![data.into()])
}

/// An empty body stream.
pub fn no_body() -> impl Stream<Item = DecodeResult<Bytes>> + Unpin + Send {
    body_chunks(Vec::new())
}

mod test_abort;
mod test_metadata;
mod test_multipart;
mod test_urlencoded;
