use meet_media_protocol::Status;

/// Error taxonomy surfaced to the embedder: a caller used the
/// API in an illegal state, supplied a malformed argument, or something
/// else went wrong internally. There is no "not found" or "timeout"
/// variant because nothing in this core times out or looks things up by
/// key in a way that can miss.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ClientError {
    #[error("failed precondition: {0}")]
    FailedPrecondition(String),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl ClientError {
    pub fn internal(message: impl Into<String>) -> Self {
        ClientError::Internal(message.into())
    }

    /// Maps this error onto the canonical `{code, message}` status carried
    /// through `on-disconnected` and response envelopes.
    pub fn to_status(&self) -> Status {
        let code = match self {
            ClientError::FailedPrecondition(_) => 1,
            ClientError::InvalidArgument(_) => 2,
            ClientError::Internal(_) => 3,
        };
        Status {
            code,
            message: self.to_string(),
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        ClientError::Internal(err.to_string())
    }
}

impl From<webrtc::Error> for ClientError {
    fn from(err: webrtc::Error) -> Self {
        ClientError::Internal(err.to_string())
    }
}

pub type ClientResult<T> = Result<T, ClientError>;
