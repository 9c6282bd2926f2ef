use serde::{Deserialize, Serialize};

/// Failure classes surfaced to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Rejected locally before any request was sent.
    Validation,
    /// Network failure or a non-2xx response.
    Transport,
    /// A 2xx response whose body did not carry the expected status.
    Contract,
    /// An identical write is still outstanding.
    Busy,
    Unauthorized,
}

/// A user-visible notification describing a failed operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}
