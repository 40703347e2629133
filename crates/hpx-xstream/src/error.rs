//! Error handling for the record stream.

use thiserror::Error;

/// Boxed error raised by a byte source or a custom transform.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The main result type used throughout the crate.
pub type XStreamResult<T> = Result<T, XStreamError>;

/// Errors surfaced while building or consuming an [`XStream`](crate::XStream).
///
/// Malformed frames are never reported here: lines without a key/value
/// separator or with an empty key are dropped by the parser. Cancellation is
/// not an error either; a cancelled stream simply ends.
#[derive(Error, Debug)]
pub enum XStreamError {
    /// The options did not carry a usable byte source. Returned before any
    /// data is read.
    #[error("Invalid source: {message}")]
    InvalidSource { message: String },

    /// The stream configuration failed validation.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// The underlying byte source failed during a read.
    #[error("Transport error: {0}")]
    Transport(#[source] BoxError),

    /// A caller-supplied transform rejected its input.
    #[error("Transform error: {0}")]
    Transform(#[source] BoxError),
}

impl XStreamError {
    /// Create an invalid source error.
    pub fn invalid_source(message: impl Into<String>) -> Self {
        Self::InvalidSource {
            message: message.into(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Wrap a byte source failure.
    pub fn transport(err: impl Into<BoxError>) -> Self {
        Self::Transport(err.into())
    }

    /// Wrap a custom transform failure.
    pub fn transform(err: impl Into<BoxError>) -> Self {
        Self::Transform(err.into())
    }

    /// Returns `true` if the error was raised before any data was read.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::InvalidSource { .. } | Self::Config { .. })
    }
}
