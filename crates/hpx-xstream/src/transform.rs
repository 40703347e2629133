//! Text-to-output transforms plugged into an [`XStream`](crate::XStream).

use std::{collections::VecDeque, fmt, marker::PhantomData};

use crate::{
    config::XStreamConfig,
    error::{BoxError, XStreamError, XStreamResult},
    field::FieldParser,
    frame::FrameSplitter,
    record::Record,
};

/// Turns decoded text chunks into outputs.
///
/// [`transform`](Self::transform) is called once per decoded chunk, in order,
/// and [`flush`](Self::flush) once when the byte source ends. Outputs are
/// pushed onto `out` and handed to the consumer one pull at a time.
pub trait TextTransform {
    /// Item produced by this transform.
    type Output;

    /// Process one text chunk.
    ///
    /// # Errors
    ///
    /// An error ends the stream with [`XStreamError::Transform`](crate::XStreamError::Transform).
    fn transform(&mut self, chunk: &str, out: &mut VecDeque<Self::Output>)
    -> Result<(), BoxError>;

    /// Emit whatever is still buffered at end of input.
    ///
    /// # Errors
    ///
    /// Same as [`transform`](Self::transform).
    fn flush(&mut self, _out: &mut VecDeque<Self::Output>) -> Result<(), BoxError> {
        Ok(())
    }
}

/// Default transform: [`FrameSplitter`] followed by [`FieldParser`].
#[derive(Debug, Clone, Default)]
pub struct SseTransform {
    splitter: FrameSplitter,
    parser: FieldParser,
    frames: VecDeque<String>,
}

impl SseTransform {
    /// Build the splitter and parser from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`XStreamError::Config`] if `config` fails
    /// [`XStreamConfig::validate`].
    pub fn new(config: &XStreamConfig) -> XStreamResult<Self> {
        config.validate().map_err(XStreamError::config)?;
        Ok(Self {
            splitter: FrameSplitter::new(&config.frame_separator)?,
            parser: FieldParser::new(&config.line_separator, &config.kv_separator),
            frames: VecDeque::new(),
        })
    }

    /// The frame splitter, for inspecting buffered text.
    pub fn splitter(&self) -> &FrameSplitter {
        &self.splitter
    }

    fn parse_frames(&mut self, out: &mut VecDeque<Record>) {
        // Frames are parsed whole and in completion order.
        for frame in self.frames.drain(..) {
            if let Some(record) = self.parser.parse(&frame) {
                tracing::trace!(fields = record.len(), "record parsed");
                out.push_back(record);
            }
        }
    }
}

impl TextTransform for SseTransform {
    type Output = Record;

    fn transform(&mut self, chunk: &str, out: &mut VecDeque<Record>) -> Result<(), BoxError> {
        self.splitter.push(chunk, &mut self.frames);
        self.parse_frames(out);
        Ok(())
    }

    fn flush(&mut self, out: &mut VecDeque<Record>) -> Result<(), BoxError> {
        self.frames.extend(self.splitter.flush());
        self.parse_frames(out);
        Ok(())
    }
}

/// A [`TextTransform`] backed by a closure. It has no end-of-input step.
pub struct FnTransform<F, O> {
    f: F,
    _output: PhantomData<fn() -> O>,
}

impl<F, O> FnTransform<F, O>
where
    F: FnMut(&str, &mut VecDeque<O>) -> Result<(), BoxError>,
{
    pub fn new(f: F) -> Self {
        Self {
            f,
            _output: PhantomData,
        }
    }
}

impl<F, O> fmt::Debug for FnTransform<F, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnTransform").finish_non_exhaustive()
    }
}

impl<F, O> TextTransform for FnTransform<F, O>
where
    F: FnMut(&str, &mut VecDeque<O>) -> Result<(), BoxError>,
{
    type Output = O;

    fn transform(&mut self, chunk: &str, out: &mut VecDeque<O>) -> Result<(), BoxError> {
        (self.f)(chunk, out)
    }
}
