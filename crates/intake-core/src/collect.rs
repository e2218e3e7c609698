//! Buffered materializer: drain a chunk stream into one contiguous buffer.

use bytes::{Bytes, BytesMut};
use futures::{Stream, StreamExt};
use intake_model::{DecodeError, DecodeResult};

/// Drain `stream` fully into one buffer, enforcing an optional byte ceiling.
///
/// The moment the accumulated length would exceed `max_size`, accumulation
/// stops, the source stream is dropped, and the call fails with
/// [`DecodeError::MaxSizeExceeded`]; a body of exactly `max_size` bytes
/// succeeds. A stream yielding no chunks produces an empty buffer; a stream
/// yielding exactly one chunk returns it without copying.
pub async fn collect_limited<S>(mut stream: S, max_size: Option<usize>) -> DecodeResult<Bytes>
where
    S: Stream<Item = DecodeResult<Bytes>> + Unpin + Send,
{
    let mut chunks: Vec<Bytes> = Vec::new();
    let mut total = 0usize;

    while let Some(next) = stream.next().await {
        let chunk = next?;
        total = total.saturating_add(chunk.len());
        if let Some(max) = max_size {
            if total > max {
                tracing::debug!(max, "buffered body exceeded ceiling, destroying stream");
                drop(stream);
                return Err(DecodeError::MaxSizeExceeded { max });
            }
        }
        chunks.push(chunk);
    }

    if chunks.is_empty() {
        return Ok(Bytes::new());
    }
    if chunks.len() == 1 {
        return Ok(chunks.remove(0));
    }

    let mut buffer = BytesMut::with_capacity(total);
    for chunk in &chunks {
        buffer.extend_from_slice(chunk);
    }
    Ok(buffer.freeze())
}
