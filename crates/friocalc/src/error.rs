use thiserror::Error;

use crate::types::EntryId;

/// Everything a user action can fail with.
///
/// None of these are retried; the shell prints them as a one-line alert.
#[derive(Error, Debug)]
pub enum AppError {
    /// Missing or invalid input. Nothing was changed.
    #[error("{0}")]
    Validation(String),

    /// The backend answered with a non-OK status
    #[error("{message}")]
    Rejected {
        status: reqwest::StatusCode,
        message: String,
    },

    /// Network failure or a response that could not be decoded
    #[error("Could not connect to the server.")]
    Connection(#[from] reqwest::Error),

    #[error("You must be logged in to do that.")]
    NotAuthenticated,

    #[error("No visible history entry with id {0}.")]
    UnknownEntry(EntryId),

    #[error("No entry is being edited.")]
    NoDraft,

    /// The same operation is already waiting on the server
    #[error("Request already in progress: {0}")]
    Busy(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        AppError::Validation(message.into())
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejected_displays_server_message() {
        let err = AppError::Rejected {
            status: reqwest::StatusCode::BAD_REQUEST,
            message: "Invalid action".to_string(),
        };
        assert_eq!(err.to_string(), "Invalid action");
    }

    #[test]
    fn test_validation_display() {
        let err = AppError::validation("Please fill in all fields.");
        assert_eq!(err.to_string(), "Please fill in all fields.");
    }

    #[test]
    fn test_unknown_entry_names_id() {
        let err = AppError::UnknownEntry(EntryId::Number(12));
        assert_eq!(err.to_string(), "No visible history entry with id 12.");
    }

    #[test]
    fn test_busy_names_slot() {
        let err = AppError::Busy("save".to_string());
        assert_eq!(err.to_string(), "Request already in progress: save");
    }
}
