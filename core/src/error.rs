//! Error types for executing typed requests.
//!
//! # Design
//! Failures come in exactly two stages. `Transport` means the call never
//! completed normally: refused connection, bad URL, timeout, cancellation.
//! `Decode` means the server answered but the body did not match what the
//! request's decoder expects. Callers match on the variant to tell "the server
//! didn't answer" apart from "the server answered with something unexpected".

use std::fmt;

/// What went wrong below the decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// The URL could not be parsed or used for a request.
    InvalidUrl,
    /// No connection could be established, or it broke mid-call.
    Connect,
    /// The request's timeout elapsed before the response arrived.
    Timeout,
    /// The task was cancelled before it settled.
    Cancelled,
    /// The response arrived but its body could not be read.
    Body,
    Other,
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransportErrorKind::InvalidUrl => "invalid url",
            TransportErrorKind::Connect => "connection failed",
            TransportErrorKind::Timeout => "timed out",
            TransportErrorKind::Cancelled => "cancelled",
            TransportErrorKind::Body => "unreadable body",
            TransportErrorKind::Other => "transport failure",
        };
        f.write_str(name)
    }
}

/// A failed transport call, with whatever diagnostic the transport provided.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub message: String,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn invalid_url(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::InvalidUrl, message)
    }

    pub fn connect(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Connect, message)
    }

    pub fn timeout(ms: u64) -> Self {
        Self::new(TransportErrorKind::Timeout, format!("no response after {ms}ms"))
    }

    pub fn cancelled() -> Self {
        Self::new(TransportErrorKind::Cancelled, "task was cancelled")
    }

    pub fn body(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Body, message)
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Other, message)
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for TransportError {}

/// Failure value of every HTTP task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HttpError {
    /// The call did not complete; the decoder was never reached.
    Transport(TransportError),

    /// The call completed but the decoder rejected the body.
    Decode(String),
}

impl HttpError {
    pub fn is_transport(&self) -> bool {
        matches!(self, HttpError::Transport(_))
    }

    pub fn is_decode(&self) -> bool {
        matches!(self, HttpError::Decode(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(
            self,
            HttpError::Transport(TransportError {
                kind: TransportErrorKind::Cancelled,
                ..
            })
        )
    }
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HttpError::Transport(e) => write!(f, "transport error: {e}"),
            HttpError::Decode(msg) => write!(f, "decode error: {msg}"),
        }
    }
}

impl std::error::Error for HttpError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            HttpError::Transport(e) => Some(e),
            HttpError::Decode(_) => None,
        }
    }
}

impl From<TransportError> for HttpError {
    fn from(e: TransportError) -> Self {
        HttpError::Transport(e)
    }
}
