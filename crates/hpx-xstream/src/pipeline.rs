//! [`Stream`] that turns a byte source into records.
//!
//! ```text
//! byte source ──► Utf8Decoder ──► TextTransform ──► queue ──► poll_next
//!                                 (FrameSplitter
//!                                  + FieldParser
//!                                  by default)
//! ```

use core::{
    fmt,
    pin::Pin,
    task::{Context, Poll, ready},
};
use std::collections::VecDeque;

use bytes::Bytes;
use futures_core::Stream;
use futures_util::StreamExt;
use tokio_util::sync::CancellationToken;

use crate::{
    cancellable::CancellableStream,
    config::XStreamConfig,
    decode::Utf8Decoder,
    error::{BoxError, XStreamError, XStreamResult},
    transform::{SseTransform, TextTransform},
};

/// Type-erased byte source accepted by [`XStreamOptions`].
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, BoxError>> + Send>>;

// ---------------------------------------------------------------------------
// XStreamOptions
// ---------------------------------------------------------------------------

/// Inputs for building an [`XStream`].
#[derive(Default)]
pub struct XStreamOptions {
    pub(crate) readable_stream: Option<ByteStream>,
    pub(crate) config: Option<XStreamConfig>,
    pub(crate) cancellation_token: Option<CancellationToken>,
}

impl XStreamOptions {
    /// Options with no source and the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the byte source. Any chunk type convertible to [`Bytes`] and any
    /// error convertible to [`BoxError`] is accepted.
    #[must_use]
    pub fn readable_stream<S, B, E>(mut self, stream: S) -> Self
    where
        S: Stream<Item = Result<B, E>> + Send + 'static,
        B: Into<Bytes>,
        E: Into<BoxError>,
    {
        let stream = stream.map(|item| item.map(Into::into).map_err(Into::into));
        self.readable_stream = Some(Box::pin(stream));
        self
    }

    /// Set the parsing configuration. Without one, the defaults apply (or
    /// the session's configuration when started through a session).
    #[must_use]
    pub fn config(mut self, config: XStreamConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set an external cancellation token observed by the cancellable stream.
    #[must_use]
    pub fn cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancellation_token = Some(token);
        self
    }

    /// Returns `true` if a byte source has been set.
    pub fn has_source(&self) -> bool {
        self.readable_stream.is_some()
    }
}

impl fmt::Debug for XStreamOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("XStreamOptions")
            .field("has_source", &self.has_source())
            .field("config", &self.config)
            .field("cancellation_token", &self.cancellation_token)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// XStream
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum XStreamState {
    Streaming,
    Terminated,
}

pin_project_lite::pin_project! {
    /// A [`Stream`] of transform outputs read from a byte source.
    ///
    /// Every chunk is decoded and run through the transform before the next
    /// chunk is requested; outputs come out in the order they were produced.
    /// A transport or transform error is yielded once and ends the stream.
    pub struct XStream<T: TextTransform> {
        #[pin]
        source: ByteStream,
        decoder: Utf8Decoder,
        transform: T,
        queue: VecDeque<T::Output>,
        state: XStreamState,
        chunks_read: u64,
        token: Option<CancellationToken>,
    }
}

impl XStream<SseTransform> {
    /// Build a record stream with the default frame splitter and field parser.
    ///
    /// # Errors
    ///
    /// Returns [`XStreamError::InvalidSource`] if no byte source was set and
    /// [`XStreamError::Config`] if the configuration is invalid. Nothing is
    /// read from the source in either case.
    pub fn new(options: XStreamOptions) -> XStreamResult<Self> {
        if !options.has_source() {
            return Err(missing_source());
        }
        let config = options.config.clone().unwrap_or_default();
        let transform = SseTransform::new(&config)?;
        Self::with_transform(options, transform)
    }
}

fn missing_source() -> XStreamError {
    XStreamError::invalid_source("options.readable_stream must be set to a byte stream")
}

impl<T: TextTransform> XStream<T> {
    /// Build a stream that feeds decoded text to `transform` instead of the
    /// default splitter and parser. The separators in the configuration are
    /// not used.
    ///
    /// # Errors
    ///
    /// Returns [`XStreamError::InvalidSource`] if no byte source was set.
    pub fn with_transform(options: XStreamOptions, transform: T) -> XStreamResult<Self> {
        let XStreamOptions {
            readable_stream,
            config,
            cancellation_token,
        } = options;
        let source = readable_stream.ok_or_else(missing_source)?;

        Ok(Self {
            source,
            decoder: Utf8Decoder::new(config.is_none_or(|config| config.strip_bom)),
            transform,
            queue: VecDeque::new(),
            state: XStreamState::Streaming,
            chunks_read: 0,
            token: cancellation_token,
        })
    }

    /// Wrap this stream in a [`CancellableStream`].
    ///
    /// Uses the token from [`XStreamOptions::cancellation_token`], or a fresh
    /// one reachable through [`CancellableStream::token`].
    pub fn cancellable(mut self) -> CancellableStream<T> {
        let token = self.token.take().unwrap_or_else(CancellationToken::new);
        CancellableStream::new(self, token)
    }

    /// Number of chunks pulled from the byte source so far.
    pub fn chunks_read(&self) -> u64 {
        self.chunks_read
    }

    /// Outputs produced but not yet pulled.
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Returns `true` once the source has ended or failed.
    pub fn is_terminated(&self) -> bool {
        self.state == XStreamState::Terminated
    }

    /// The transform in use.
    pub fn transform(&self) -> &T {
        &self.transform
    }
}

impl<T: TextTransform> fmt::Debug for XStream<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("XStream")
            .field("state", &self.state)
            .field("chunks_read", &self.chunks_read)
            .field("queued", &self.queue.len())
            .field("pending_bytes", &self.decoder.pending_len())
            .finish_non_exhaustive()
    }
}

impl<T: TextTransform> Stream for XStream<T> {
    type Item = XStreamResult<T::Output>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();

        if let Some(item) = this.queue.pop_front() {
            return Poll::Ready(Some(Ok(item)));
        }
        if *this.state == XStreamState::Terminated {
            return Poll::Ready(None);
        }

        loop {
            let chunk = match ready!(this.source.as_mut().poll_next(cx)) {
                Some(Ok(chunk)) => chunk,
                Some(Err(e)) => {
                    *this.state = XStreamState::Terminated;
                    return Poll::Ready(Some(Err(XStreamError::Transport(e))));
                }
                None => {
                    *this.state = XStreamState::Terminated;
                    tracing::debug!(chunks = *this.chunks_read, "byte source ended");

                    let tail = this.decoder.finish();
                    let flushed = if tail.is_empty() {
                        Ok(())
                    } else {
                        this.transform.transform(&tail, this.queue)
                    }
                    .and_then(|()| this.transform.flush(this.queue));
                    if let Err(e) = flushed {
                        this.queue.clear();
                        return Poll::Ready(Some(Err(XStreamError::Transform(e))));
                    }
                    return Poll::Ready(this.queue.pop_front().map(Ok));
                }
            };

            *this.chunks_read += 1;
            if chunk.is_empty() {
                continue;
            }

            let text = this.decoder.decode(&chunk);
            if !text.is_empty()
                && let Err(e) = this.transform.transform(&text, this.queue)
            {
                *this.state = XStreamState::Terminated;
                this.queue.clear();
                return Poll::Ready(Some(Err(XStreamError::Transform(e))));
            }

            if let Some(item) = this.queue.pop_front() {
                return Poll::Ready(Some(Ok(item)));
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::io;

    use futures_util::stream;

    use super::*;
    use crate::{record::Record, transform::FnTransform};

    fn source(chunks: Vec<&'static str>) -> XStreamOptions {
        XStreamOptions::new().readable_stream(stream::iter(
            chunks.into_iter().map(|c| Ok::<_, io::Error>(c.as_bytes())),
        ))
    }

    async fn collect_ok(stream: XStream<SseTransform>) -> Vec<Record> {
        stream
            .collect::<Vec<_>>()
            .await
            .into_iter()
            .filter_map(Result::ok)
            .collect()
    }

    #[test]
    fn test_missing_source_fails_fast() {
        let err = XStream::new(XStreamOptions::new()).expect_err("no source");
        assert!(matches!(err, XStreamError::InvalidSource { .. }));

        let transform = FnTransform::new(|_: &str, _: &mut VecDeque<()>| Ok(()));
        let err = XStream::with_transform(XStreamOptions::new(), transform).expect_err("no source");
        assert!(matches!(err, XStreamError::InvalidSource { .. }));
    }

    #[test]
    fn test_invalid_config_fails_fast() {
        let options = source(vec!["data: x\n\n"]).config(XStreamConfig::new().kv_separator(""));
        let err = XStream::new(options).expect_err("bad config");
        assert!(matches!(err, XStreamError::Config { .. }));
    }

    #[tokio::test]
    async fn test_record_split_across_chunks() {
        let stream = XStream::new(source(vec!["data: hel", "lo\n\n"])).expect("stream");
        assert_eq!(collect_ok(stream).await, vec![
            [("data", " hello")].into_iter().collect::<Record>()
        ]);
    }

    #[tokio::test]
    async fn test_records_in_order() {
        let stream = XStream::new(source(vec![
            "event: ping\ndata: 1\n\nevent: ping\ndata: 2\n\n",
        ]))
        .expect("stream");
        let records = collect_ok(stream).await;
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].event(), Some(" ping"));
        assert_eq!(records[0].data(), Some(" 1"));
        assert_eq!(records[1].event(), Some(" ping"));
        assert_eq!(records[1].data(), Some(" 2"));
    }

    #[tokio::test]
    async fn test_empty_key_frame_yields_nothing() {
        let stream = XStream::new(source(vec![":\n\n"])).expect("stream");
        assert!(collect_ok(stream).await.is_empty());
    }

    #[tokio::test]
    async fn test_trailing_frame_flushed_at_end() {
        let stream = XStream::new(source(vec!["data: a\n\n", "", "data: b"])).expect("stream");
        let records = collect_ok(stream).await;
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].data(), Some(" b"));
    }

    #[tokio::test]
    async fn test_multibyte_split_and_bom() {
        let chunks: Vec<Result<Vec<u8>, io::Error>> = vec![
            Ok(b"\xEF\xBB".to_vec()),
            Ok(b"\xBFdata: caf\xC3".to_vec()),
            Ok(b"\xA9\n\n".to_vec()),
        ];
        let options = XStreamOptions::new().readable_stream(stream::iter(chunks));
        let records = collect_ok(XStream::new(options).expect("stream")).await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].data(), Some(" café"));
    }

    #[tokio::test]
    async fn test_transport_error_ends_stream() {
        let chunks: Vec<Result<&'static [u8], io::Error>> = vec![
            Ok(b"data: 1\n\n"),
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset")),
            Ok(b"data: 2\n\n"),
        ];
        let options = XStreamOptions::new().readable_stream(stream::iter(chunks));
        let mut stream = XStream::new(options).expect("stream");

        let first = stream.next().await.expect("item").expect("record");
        assert_eq!(first.data(), Some(" 1"));

        let err = stream.next().await.expect("item").expect_err("transport error");
        assert!(matches!(err, XStreamError::Transport(_)));
        assert_eq!(err.to_string(), "Transport error: reset");

        assert!(stream.is_terminated());
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn test_custom_transform_replaces_parser() {
        let lines = FnTransform::new(|chunk: &str, out: &mut VecDeque<String>| {
            out.extend(chunk.lines().map(str::to_owned));
            Ok(())
        });
        let stream = XStream::with_transform(source(vec!["a\nb\n", "c\n"]), lines).expect("stream");
        let items: Vec<String> = stream.map(|r| r.expect("item")).collect().await;
        assert_eq!(items, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_custom_transform_error() {
        let failing = FnTransform::new(|chunk: &str, out: &mut VecDeque<usize>| {
            if chunk.contains("bad") {
                return Err("unparseable chunk".into());
            }
            out.push_back(chunk.len());
            Ok(())
        });
        let mut stream =
            XStream::with_transform(source(vec!["ok", "bad", "ok"]), failing).expect("stream");
        assert_eq!(stream.next().await.expect("item").expect("len"), 2);
        let err = stream.next().await.expect("item").expect_err("transform error");
        assert!(matches!(err, XStreamError::Transform(_)));
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn test_outputs_from_one_chunk_are_queued() {
        let mut stream =
            XStream::new(source(vec!["data: 1\n\ndata: 2\n\ndata: 3\n\n"])).expect("stream");
        let first = stream.next().await.expect("item").expect("record");
        assert_eq!(first.data(), Some(" 1"));
        assert_eq!(stream.queued(), 2);
        assert_eq!(stream.chunks_read(), 1);
    }
}
