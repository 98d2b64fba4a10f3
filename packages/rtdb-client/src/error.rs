use std::io;

/// Failures raised by a [`Transport`](crate::transport::Transport) before a
/// complete response could be produced.
#[derive(thiserror::Error, Debug)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("{hops} consecutive requests (redirects)")]
    TooManyRedirects { hops: usize },
}

impl TransportError {
    /// Whether the connection or the wait for response headers ran out of time.
    pub fn is_timeout(&self) -> bool {
        match self {
            TransportError::Http(e) => e.is_timeout(),
            TransportError::Io(e) => e.kind() == io::ErrorKind::TimedOut,
            _ => false,
        }
    }

    pub(crate) fn deadline_exceeded() -> Self {
        TransportError::Io(io::Error::new(
            io::ErrorKind::TimedOut,
            "context deadline exceeded",
        ))
    }
}

/// Errors returned by [`Reference`](crate::Reference) operations.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Connecting or waiting for the response headers exceeded the configured
    /// timeout (or the caller's deadline).
    #[error("request timed out: {0}")]
    Timeout(#[source] TransportError),

    /// Any other transport failure, passed through untouched.
    #[error(transparent)]
    Transport(TransportError),

    /// The server answered with a non-2xx status. The message is the raw
    /// response body.
    #[error("{message}")]
    Application { status: u16, message: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The database URL has no host.
    #[error("invalid database URL: {url:?}")]
    InvalidUrl { url: String },

    #[error("firebase node missing")]
    ValueMissing,

    #[error("request canceled")]
    Canceled,

    #[error("reference is already being watched")]
    AlreadyWatching,
}

impl Error {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout(_))
    }

    /// HTTP status of an application error.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Application { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Timeouts are split out from every other transport failure.
impl From<TransportError> for Error {
    fn from(error: TransportError) -> Self {
        if error.is_timeout() {
            Error::Timeout(error)
        } else {
            Error::Transport(error)
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
