use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    /// No session, or the server rejected it. Halts reconciliation until a
    /// new session is installed; pending taps are kept.
    #[error("not authenticated")]
    Unauthenticated,

    /// The server could not be reached.
    #[error("server unreachable: {0}")]
    Offline(String),

    /// The server answered but failed the request.
    #[error("server error: {0}")]
    Server(String),

    /// Rejected before any I/O happened.
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),

    #[error("pending store: {0}")]
    Storage(#[from] std::io::Error),
}

impl SyncError {
    /// Failures the next scheduled attempt will retry on its own.
    pub fn is_transient(&self) -> bool {
        matches!(self, SyncError::Offline(_) | SyncError::Server(_))
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() || err.is_timeout() || err.is_request() {
            SyncError::Offline(err.to_string())
        } else {
            SyncError::Server(err.to_string())
        }
    }
}
