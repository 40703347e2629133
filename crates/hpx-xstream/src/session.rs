//! Session controller: runs one stream at a time and keeps its outcome as
//! observable state.
//!
//! ```text
//! XStreamSession::start(options)
//!   ├─ build XStream (validation errors are returned)
//!   ├─ reset state, install a fresh CancellationToken
//!   ├─ pull records ──► state.records
//!   │     └─ error ──► state.error (captured, not returned)
//!   └─ clear loading + token
//!
//! XStreamSession::cancel() ──► token.cancel() (seen at the next pull)
//! ```

use std::{fmt, sync::Arc};

use futures_util::StreamExt;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    config::XStreamConfig,
    error::{XStreamError, XStreamResult},
    pipeline::{XStream, XStreamOptions},
    record::Record,
    transform::TextTransform,
};

struct SessionState<O> {
    records: Vec<O>,
    error: Option<Arc<XStreamError>>,
    loading: bool,
    token: Option<CancellationToken>,
    generation: u64,
}

impl<O> Default for SessionState<O> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            error: None,
            loading: false,
            token: None,
            generation: 0,
        }
    }
}

struct SessionInner<O> {
    config: Arc<XStreamConfig>,
    state: Mutex<SessionState<O>>,
}

/// Drives one [`XStream`] at a time and records what it produced.
///
/// Clones share the same state, so one task can [`start`](Self::start) a
/// session while another observes it or calls [`cancel`](Self::cancel).
/// Starting a new session cancels the one still running; records the old
/// stream produces after that are dropped.
pub struct XStreamSession<O = Record> {
    inner: Arc<SessionInner<O>>,
}

impl<O> Clone for XStreamSession<O> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<O> Default for XStreamSession<O> {
    fn default() -> Self {
        Self::new(Arc::new(XStreamConfig::default()))
    }
}

impl<O> fmt::Debug for XStreamSession<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("XStreamSession")
            .field("records", &state.records.len())
            .field("error", &state.error)
            .field("loading", &state.loading)
            .field("generation", &state.generation)
            .finish()
    }
}

impl XStreamSession<Record> {
    /// Run a session with the default frame splitter and field parser.
    ///
    /// Resolves when the stream ends, fails or is cancelled. Options without
    /// a configuration use the session's.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the stream cannot be built; the state of
    /// the previous session is left untouched in that case. Errors raised
    /// while reading are captured in [`error`](Self::error) instead.
    pub async fn start(&self, options: XStreamOptions) -> XStreamResult<()> {
        let (options, token) = self.prepare(options);
        let stream = XStream::new(options)?;
        self.consume(stream, token).await;
        Ok(())
    }
}

impl<O> XStreamSession<O> {
    /// Create a session controller sharing the application's configuration.
    pub fn new(config: Arc<XStreamConfig>) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                config,
                state: Mutex::new(SessionState::default()),
            }),
        }
    }

    /// Run a session that feeds decoded text to `transform`.
    ///
    /// # Errors
    ///
    /// Same as [`start`](XStreamSession::start).
    pub async fn start_with_transform<T>(
        &self,
        options: XStreamOptions,
        transform: T,
    ) -> XStreamResult<()>
    where
        T: TextTransform<Output = O>,
    {
        let (options, token) = self.prepare(options);
        let stream = XStream::with_transform(options, transform)?;
        self.consume(stream, token).await;
        Ok(())
    }

    /// Cancel the running session, if any. Calling it again, or with no
    /// session running, does nothing.
    pub fn cancel(&self) {
        let state = self.inner.state.lock();
        if let Some(token) = &state.token
            && !token.is_cancelled()
        {
            debug!(generation = state.generation, "session cancel requested");
            token.cancel();
        }
    }

    /// The configuration applied to options that carry none.
    pub fn config(&self) -> &XStreamConfig {
        &self.inner.config
    }

    /// Returns `true` while a stream is being consumed.
    pub fn is_loading(&self) -> bool {
        self.inner.state.lock().loading
    }

    /// Returns `true` while a session holds a cancellation token.
    pub fn is_active(&self) -> bool {
        self.inner.state.lock().token.is_some()
    }

    /// The error that ended the latest session, if any.
    pub fn error(&self) -> Option<Arc<XStreamError>> {
        self.inner.state.lock().error.clone()
    }

    /// Number of records received by the latest session.
    pub fn record_count(&self) -> usize {
        self.inner.state.lock().records.len()
    }

    /// Run `f` over the records received so far without copying them.
    pub fn with_records<R>(&self, f: impl FnOnce(&[O]) -> R) -> R {
        f(&self.inner.state.lock().records)
    }

    /// Copy of the records received so far.
    pub fn records(&self) -> Vec<O>
    where
        O: Clone,
    {
        self.with_records(<[O]>::to_vec)
    }

    fn prepare(&self, mut options: XStreamOptions) -> (XStreamOptions, CancellationToken) {
        let token = match options.cancellation_token.take() {
            Some(parent) => parent.child_token(),
            None => CancellationToken::new(),
        };
        options.cancellation_token = Some(token.clone());
        if options.config.is_none() {
            options.config = Some(XStreamConfig::clone(&self.inner.config));
        }
        (options, token)
    }

    fn begin(&self, token: CancellationToken) -> u64 {
        let mut state = self.inner.state.lock();
        if let Some(previous) = state.token.take() {
            debug!(generation = state.generation, "superseding running session");
            previous.cancel();
        }
        state.generation += 1;
        state.records.clear();
        state.error = None;
        state.loading = true;
        state.token = Some(token);
        state.generation
    }

    async fn consume<T>(&self, stream: XStream<T>, token: CancellationToken)
    where
        T: TextTransform<Output = O>,
    {
        let generation = self.begin(token.clone());
        info!(generation, "stream session started");

        let mut stream = stream.cancellable();
        while let Some(item) = stream.next().await {
            let mut state = self.inner.state.lock();
            if state.generation != generation {
                continue;
            }
            match item {
                Ok(record) => state.records.push(record),
                Err(err) => {
                    warn!(generation, error = %err, "stream session failed");
                    state.error = Some(Arc::new(err));
                }
            }
        }
        drop(stream);

        let mut state = self.inner.state.lock();
        if state.generation == generation {
            state.loading = false;
            state.token = None;
            info!(
                generation,
                records = state.records.len(),
                cancelled = token.is_cancelled(),
                failed = state.error.is_some(),
                "stream session finished"
            );
        }
    }
}
