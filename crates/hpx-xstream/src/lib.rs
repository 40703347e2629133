//! # hpx-xstream
//!
//! Incremental Server-Sent Events parsing over an already-open byte stream,
//! exposed as a cancellable [`Stream`](futures_core::Stream) of records.
//!
//! ## Features
//!
//! - **Chunk-boundary safe**: characters, lines, separators and frames may be
//!   split anywhere between chunks; the output is the same as for one chunk.
//! - **Lenient parsing**: lines without a key/value separator or with a blank
//!   key are skipped, and frames without fields produce nothing.
//! - **Pluggable**: replace the frame splitter and field parser with any
//!   [`TextTransform`].
//! - **Cooperative cancellation**: a [`CancellationToken`] checked before
//!   every read; the source is released exactly once on every exit path.
//! - **Session state**: [`XStreamSession`] accumulates records and captures
//!   errors for callers that observe state rather than handle results.
//!
//! ## Architecture
//!
//! ```text
//! byte source ─► Utf8Decoder ─► FrameSplitter ─► FieldParser ─► Record
//!                               └──── or a custom TextTransform ────┘
//!                                          │
//!                  CancellableStream ◄─────┘ (token checked per pull)
//!                          │
//!                  XStreamSession (records / error / loading)
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use futures_util::{StreamExt, stream};
//! use hpx_xstream::{XStream, XStreamOptions};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let body = stream::iter(vec![
//!     Ok::<_, std::io::Error>("event: ping\ndata: 1\n\n"),
//!     Ok("event: ping\ndata: 2\n\n"),
//! ]);
//!
//! let mut records = XStream::new(XStreamOptions::new().readable_stream(body))?.cancellable();
//! while let Some(record) = records.next().await {
//!     let record = record?;
//!     println!("event={:?} data={:?}", record.event(), record.data());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! [`CancellationToken`]: tokio_util::sync::CancellationToken

pub mod cancellable;
pub mod config;
pub mod decode;
pub mod error;
pub mod field;
pub mod frame;
pub mod pipeline;
pub mod record;
pub mod session;
pub mod transform;

pub use cancellable::CancellableStream;
pub use config::XStreamConfig;
pub use decode::Utf8Decoder;
pub use error::{BoxError, XStreamError, XStreamResult};
pub use field::FieldParser;
pub use frame::FrameSplitter;
pub use pipeline::{ByteStream, XStream, XStreamOptions};
pub use record::{FieldName, Record};
pub use session::XStreamSession;
pub use tokio_util::sync::CancellationToken;
pub use transform::{FnTransform, SseTransform, TextTransform};
