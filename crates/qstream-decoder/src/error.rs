use qstream_event::EventError;
use qstream_frame::FrameError;

/// Everything a caller can see while consuming a response stream.
///
/// [`Frame`](StreamError::Frame) and [`Event`](StreamError::Event) errors are
/// per-frame: the bytes of the failed frame are skipped and decoding resumes.
/// [`Undrained`](StreamError::Undrained) asks the caller to drain and finish
/// again. Every other variant ends the stream; see [`StreamError::is_fatal`].
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// Structural problem with one frame (lengths, header block, checksum).
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// A recognised event whose payload could not be decoded.
    #[error("event error: {0}")]
    Event(#[from] EventError),

    /// End of stream arrived in the middle of a frame.
    #[error("stream truncated: {missing} bytes missing from the final frame ({buffered} buffered)")]
    TruncatedStream { buffered: usize, missing: usize },

    /// `finish` was called while complete frames were still buffered.
    #[error("stream finished with undrained frames ({buffered} bytes buffered)")]
    Undrained { buffered: usize },

    /// The assembler no longer accepts input.
    #[error("stream assembler is closed")]
    Closed,

    /// The transport failed to deliver bytes.
    #[error("transport error: {0}")]
    Transport(Box<dyn std::error::Error + Send + Sync>),
}

impl StreamError {
    /// Wrap a transport-level failure.
    pub fn transport(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        StreamError::Transport(err.into())
    }

    /// True if no further events will follow this error.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            StreamError::Frame(_) | StreamError::Event(_) | StreamError::Undrained { .. }
        )
    }

    /// Short machine-friendly label used in logs and CLI output.
    pub fn label(&self) -> &'static str {
        match self {
            StreamError::Frame(err) => err.label(),
            StreamError::Event(_) => "payload_decode",
            StreamError::TruncatedStream { .. } => "truncated_stream",
            StreamError::Undrained { .. } => "undrained",
            StreamError::Closed => "closed",
            StreamError::Transport(_) => "transport",
        }
    }
}

impl From<std::io::Error> for StreamError {
    fn from(err: std::io::Error) -> Self {
        StreamError::Transport(Box::new(err))
    }
}

pub type Result<T> = std::result::Result<T, StreamError>;
