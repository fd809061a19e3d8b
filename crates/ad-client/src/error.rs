use thiserror::Error;

/// Errors from talking to the deployment backend.
#[derive(Debug, Clone, Error)]
pub enum ClientError {
    /// The backend could not be reached at all.
    #[error("could not connect to backend: {0}")]
    Connect(String),

    /// Any other transport-level failure.
    #[error("HTTP error: {0}")]
    Http(String),

    /// The backend answered with a non-success status.
    #[error("API error (status {status}): {body}")]
    Api { status: u16, body: String },

    /// The response body did not have the expected shape.
    #[error("parse error: {0}")]
    Parse(String),

    /// The push log feed failed after it was opened.
    #[error("stream error: {0}")]
    Stream(String),

    #[error("request timed out")]
    Timeout,
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ClientError::Timeout
        } else if err.is_connect() {
            ClientError::Connect(err.to_string())
        } else if err.is_decode() {
            ClientError::Parse(err.to_string())
        } else {
            ClientError::Http(err.to_string())
        }
    }
}

impl ClientError {
    /// `true` for failures where the backend was never reached.
    pub fn is_unreachable(&self) -> bool {
        matches!(self, ClientError::Connect(_) | ClientError::Timeout)
    }
}
