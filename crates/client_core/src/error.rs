use shared::error::{ApiError, ErrorCode};
use thiserror::Error;

use crate::types::Operation;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("{0}")]
    Validation(String),
    #[error("{operation} request failed: {message}")]
    Transport {
        operation: Operation,
        message: String,
    },
    #[error("{operation} request returned HTTP {status}")]
    HttpStatus { operation: Operation, status: u16 },
    #[error("{operation} response rejected: {detail}")]
    Contract {
        operation: Operation,
        detail: String,
    },
    #[error("{operation} already in progress for {target}")]
    InFlight {
        operation: Operation,
        target: String,
    },
    #[error("not signed in")]
    NoSession,
}

impl SyncError {
    pub fn transport(operation: Operation, err: impl std::fmt::Display) -> Self {
        Self::Transport {
            operation,
            message: err.to_string(),
        }
    }

    pub fn contract(operation: Operation, detail: impl Into<String>) -> Self {
        Self::Contract {
            operation,
            detail: detail.into(),
        }
    }

    /// Builds the contract error for a body whose `status` literal did not match.
    pub fn unexpected_status(
        operation: Operation,
        expected: &str,
        actual: &str,
        remote_error: Option<&str>,
    ) -> Self {
        let detail = match remote_error {
            Some(remote) => format!("expected status '{expected}', got '{actual}' ({remote})"),
            None => format!("expected status '{expected}', got '{actual}'"),
        };
        Self::contract(operation, detail)
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Validation(_) => ErrorCode::Validation,
            Self::Transport { .. } | Self::HttpStatus { .. } => ErrorCode::Transport,
            Self::Contract { .. } => ErrorCode::Contract,
            Self::InFlight { .. } => ErrorCode::Busy,
            Self::NoSession => ErrorCode::Unauthorized,
        }
    }

    pub fn operation(&self) -> Option<Operation> {
        match self {
            Self::Transport { operation, .. }
            | Self::HttpStatus { operation, .. }
            | Self::Contract { operation, .. }
            | Self::InFlight { operation, .. } => Some(*operation),
            Self::Validation(_) | Self::NoSession => None,
        }
    }

    /// User-facing notification for this failure.
    pub fn notice(&self) -> ApiError {
        let message = match self {
            Self::Validation(reason) => reason.clone(),
            Self::Transport { operation, .. } | Self::HttpStatus { operation, .. } => {
                format!("Could not reach the server to {}. Please retry.", verb(*operation))
            }
            Self::Contract { operation, .. } => {
                format!("The server did not confirm the {operation}. Nothing was changed.")
            }
            Self::InFlight { operation, .. } => {
                format!("A {operation} is already running; wait for it to finish.")
            }
            Self::NoSession => "Sign in to continue.".to_string(),
        };
        ApiError::new(self.code(), message)
    }
}

fn verb(operation: Operation) -> &'static str {
    match operation {
        Operation::Fetch => "load your memories",
        Operation::Search => "search your memories",
        Operation::Create => "save the memory",
        Operation::Update => "update the memory",
        Operation::Delete => "delete the memory",
        Operation::Reindex => "rebuild the search index",
    }
}
