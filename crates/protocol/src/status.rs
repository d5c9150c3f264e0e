use serde::{Deserialize, Serialize};

/// Canonical status carried on response envelopes and on
/// `on-disconnected`. `code == 0` is OK; any other value is a failure,
/// matching the wire convention where an absent `code` field defaults to
/// OK.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    pub code: i32,
    pub message: String,
}

impl Status {
    pub const OK_CODE: i32 = 0;

    pub fn ok() -> Self {
        Status {
            code: Self::OK_CODE,
            message: String::new(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Status {
            code: StatusCode::Internal as i32,
            message: message.into(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.code == Self::OK_CODE
    }
}

impl Default for Status {
    fn default() -> Self {
        Status::ok()
    }
}

/// Reserved error codes surfaced to the embedder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    Ok = 0,
    FailedPrecondition = 1,
    InvalidArgument = 2,
    Internal = 3,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ok_status_has_zero_code() {
        assert!(Status::ok().is_ok());
        assert_eq!(Status::ok().code, 0);
    }

    #[test]
    fn internal_status_is_not_ok() {
        let status = Status::internal("boom");
        assert!(!status.is_ok());
        assert_eq!(status.message, "boom");
    }
}
