//! Cooperative cancellation on top of an [`XStream`].

use core::{
    fmt,
    pin::Pin,
    task::{Context, Poll},
};

use futures_core::{FusedStream, Stream};
use futures_util::StreamExt;
use tokio_util::sync::{CancellationToken, WaitForCancellationFutureOwned};

use crate::{error::XStreamResult, pipeline::XStream, transform::TextTransform};

/// Single-pass [`Stream`] that stops when its [`CancellationToken`] fires.
///
/// The token is checked at the start of every poll, before the reader is
/// asked for anything, and is raced against a read that is still pending,
/// so a stalled source is abandoned as soon as the token fires. Once the
/// token is cancelled, the reader (the owned [`XStream`] and, through it,
/// the byte source) is dropped without another read, and outputs it had
/// already queued are discarded.
///
/// The reader is released exactly once, on whichever comes first: source
/// completion, an error, cancellation, or this stream being dropped. After
/// that every poll returns `Poll::Ready(None)`.
pub struct CancellableStream<T: TextTransform> {
    reader: Option<XStream<T>>,
    token: CancellationToken,
    cancelled: Pin<Box<WaitForCancellationFutureOwned>>,
}

impl<T: TextTransform> CancellableStream<T> {
    pub(crate) fn new(reader: XStream<T>, token: CancellationToken) -> Self {
        Self {
            reader: Some(reader),
            cancelled: Box::pin(token.clone().cancelled_owned()),
            token,
        }
    }

    /// The active reader, or `None` once it has been released.
    pub fn reader(&self) -> Option<&XStream<T>> {
        self.reader.as_ref()
    }

    /// The token observed by this stream.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Cancel the token. Takes effect on the next poll.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_released(&self) -> bool {
        self.reader.is_none()
    }

    fn release(&mut self, reason: &'static str) {
        if let Some(reader) = self.reader.take() {
            tracing::debug!(
                reason,
                chunks = reader.chunks_read(),
                discarded = reader.queued(),
                "reader released"
            );
        }
    }
}

impl<T: TextTransform> fmt::Debug for CancellableStream<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancellableStream")
            .field("reader", &self.reader)
            .field("cancelled", &self.token.is_cancelled())
            .finish()
    }
}

impl<T: TextTransform> Stream for CancellableStream<T> {
    type Item = XStreamResult<T::Output>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        if this.reader.is_none() {
            return Poll::Ready(None);
        }
        if this.token.is_cancelled() {
            this.release("cancelled");
            return Poll::Ready(None);
        }

        let Some(reader) = this.reader.as_mut() else {
            return Poll::Ready(None);
        };
        match reader.poll_next_unpin(cx) {
            Poll::Ready(Some(Ok(item))) => Poll::Ready(Some(Ok(item))),
            Poll::Ready(Some(Err(e))) => {
                this.release("error");
                Poll::Ready(Some(Err(e)))
            }
            Poll::Ready(None) => {
                this.release("completed");
                Poll::Ready(None)
            }
            // Read in flight: register for cancellation so it can preempt.
            Poll::Pending => match this.cancelled.as_mut().poll(cx) {
                Poll::Ready(()) => {
                    this.release("cancelled while reading");
                    Poll::Ready(None)
                }
                Poll::Pending => Poll::Pending,
            },
        }
    }
}

impl<T: TextTransform> FusedStream for CancellableStream<T> {
    fn is_terminated(&self) -> bool {
        self.reader.is_none()
    }
}

impl<T: TextTransform> Drop for CancellableStream<T> {
    fn drop(&mut self) {
        self.release("dropped");
    }
}
