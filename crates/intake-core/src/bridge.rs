//! Push-to-pull byte stream bridging.
//!
//! Transports in the uWebSockets style deliver body bytes by invoking a
//! registered callback with `(chunk, is_last)` and offer no back-pressure of
//! their own: they deliver the next chunk only after the consumer registers
//! interest again. [`PushBodyStream`] adapts such a [`PushSource`] into a
//! pull-based [`Stream`] the tokenizers can consume at their own pace,
//! re-arming the source exactly once per outstanding pull.
//!
//! `is_last` and a connection abort both terminate the stream through the
//! same completion path; a [`Delivery::fail`] surfaces once as a
//! [`DecodeError::Stream`] and the bridge is terminal afterwards — there is
//! no retry.

use std::fmt;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, Waker, ready};

use bytes::Bytes;
use futures::Stream;
use parking_lot::Mutex;

use intake_model::{DecodeError, DecodeResult};

/// A push-based body source in need of bridging.
///
/// The bridge calls [`request`](Self::request) when its consumer pulls and
/// no delivery is outstanding; the source must eventually invoke the given
/// [`Delivery`] exactly once. Lazy sources deliver nothing until re-armed
/// after each delivery, which is exactly the cadence the bridge provides.
pub trait PushSource {
    /// Arm the source for its next delivery.
    fn request(&mut self, delivery: Delivery);

    /// Whether the peer has aborted the connection.
    fn is_aborted(&self) -> bool;
}

/// Shared landing area for one delivery.
#[derive(Default)]
struct Slot {
    chunk: Option<(Bytes, bool)>,
    failure: Option<String>,
    waker: Option<Waker>,
}

/// A one-shot handle the source uses to deliver the next chunk.
pub struct Delivery {
    slot: Arc<Mutex<Slot>>,
}

impl Delivery {
    /// Deliver a chunk; `is_last` marks the end of the body.
    pub fn supply(self, chunk: Bytes, is_last: bool) {
        let mut slot = self.slot.lock();
        slot.chunk = Some((chunk, is_last));
        if let Some(waker) = slot.waker.take() {
            waker.wake();
        }
    }

    /// Report a terminal source failure instead of a chunk.
    pub fn fail(self, reason: impl Into<String>) {
        let mut slot = self.slot.lock();
        slot.failure = Some(reason.into());
        if let Some(waker) = slot.waker.take() {
            waker.wake();
        }
    }
}

impl fmt::Debug for Delivery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Delivery").finish_non_exhaustive()
    }
}

/// Pull-based view of a [`PushSource`].
///
/// The stream is fused: after the last chunk, an abort, or a failure, every
/// further poll reports end-of-stream.
pub struct PushBodyStream<S> {
    source: S,
    slot: Arc<Mutex<Slot>>,
    armed: bool,
    done: bool,
}

impl<S: PushSource> PushBodyStream<S> {
    /// Wrap a push source.
    pub fn new(source: S) -> Self {
        Self {
            source,
            slot: Arc::new(Mutex::new(Slot::default())),
            armed: false,
            done: false,
        }
    }

    /// Whether the underlying source reports the connection as aborted.
    pub fn is_aborted(&self) -> bool {
        self.source.is_aborted()
    }
}

impl<S> fmt::Debug for PushBodyStream<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PushBodyStream")
            .field("armed", &self.armed)
            .field("done", &self.done)
            .finish_non_exhaustive()
    }
}

impl<S: PushSource + Unpin> Stream for PushBodyStream<S> {
    type Item = DecodeResult<Bytes>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        loop {
            if this.done {
                return Poll::Ready(None);
            }
            if this.source.is_aborted() {
                this.done = true;
                return Poll::Ready(None);
            }

            let landed = {
                let mut slot = this.slot.lock();
                if let Some(reason) = slot.failure.take() {
                    this.done = true;
                    return Poll::Ready(Some(Err(DecodeError::Stream(reason))));
                }
                slot.chunk.take()
            };

            if let Some((chunk, is_last)) = landed {
                this.armed = false;
                if is_last {
                    this.done = true;
                }
                if chunk.is_empty() {
                    if is_last {
                        return Poll::Ready(None);
                    }
                    // Zero-length intermediate delivery: go around and re-arm.
                    continue;
                }
                return Poll::Ready(Some(Ok(chunk)));
            }

            // Park the consumer first so a delivery between arming and
            // returning still wakes it.
            this.slot.lock().waker = Some(cx.waker().clone());
            if this.armed {
                return Poll::Pending;
            }
            this.armed = true;
            this.source.request(Delivery {
                slot: Arc::clone(&this.slot),
            });

            // A synchronous source may have delivered already.
            let delivered = {
                let slot = this.slot.lock();
                slot.chunk.is_some() || slot.failure.is_some()
            };
            if !delivered {
                return Poll::Pending;
            }
        }
    }
}

pin_project_lite::pin_project! {
    /// Adapter from any [`http_body::Body`] into the engine's chunk stream.
    ///
    /// Trailer frames are discarded; body errors surface as
    /// [`DecodeError::Stream`].
    pub struct HttpBodyStream<B> {
        #[pin]
        body: B,
    }
}

impl<B> HttpBodyStream<B> {
    /// Wrap an HTTP body.
    pub fn new(body: B) -> Self {
        Self { body }
    }
}

impl<B> fmt::Debug for HttpBodyStream<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpBodyStream").finish_non_exhaustive()
    }
}

impl<B> Stream for HttpBodyStream<B>
where
    B: http_body::Body<Data = Bytes>,
    B::Error: fmt::Display,
{
    type Item = DecodeResult<Bytes>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();
        loop {
            match ready!(this.body.as_mut().poll_frame(cx)) {
                Some(Ok(frame)) => match frame.into_data() {
                    Ok(data) if data.is_empty() => {}
                    Ok(data) => return Poll::Ready(Some(Ok(data))),
                    // Trailers carry no body bytes.
                    Err(_) => {}
                },
                Some(Err(e)) => {
                    return Poll::Ready(Some(Err(DecodeError::Stream(e.to_string()))));
                }
                None => return Poll::Ready(None),
            }
        }
    }
}
