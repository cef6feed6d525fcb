//! Error taxonomy for the dispatch client.

use shared::{
    domain::{OrderId, TripId},
    error::{server_message, ApiError, ErrorCode},
};
use thiserror::Error;

pub const GENERIC_FAILURE_MESSAGE: &str = "Unknown error";

pub type ClientResult<T> = std::result::Result<T, ClientError>;

#[derive(Debug, Error)]
pub enum ClientError {
    /// The server answered `401`. The stored token has already been cleared.
    #[error("session expired; sign in again")]
    Unauthorized,
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("server rejected request with status {status}: {body}")]
    Server {
        code: ErrorCode,
        status: u16,
        body: String,
    },
    #[error("malformed response body: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("invalid input: {0}")]
    Validation(String),
    /// A classified failure other than bad input or an expired session.
    #[error("request rejected: {0}")]
    Rejected(ApiError),
    #[error("no board loaded")]
    BoardNotLoaded,
    #[error("order {0} is not on the board")]
    UnknownOrder(OrderId),
    #[error("trip {0} is not on the board")]
    UnknownTrip(TripId),
}

impl From<ApiError> for ClientError {
    fn from(value: ApiError) -> Self {
        match value.code {
            ErrorCode::Unauthorized => Self::Unauthorized,
            ErrorCode::Validation => Self::Validation(value.message),
            _ => Self::Rejected(value),
        }
    }
}

impl ClientError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized)
    }

    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            Self::Unauthorized => Some(ErrorCode::Unauthorized),
            Self::Server { code, .. } => Some(*code),
            Self::Validation(_) => Some(ErrorCode::Validation),
            Self::Rejected(err) => Some(err.code),
            Self::UnknownOrder(_) | Self::UnknownTrip(_) => Some(ErrorCode::NotFound),
            _ => None,
        }
    }

    /// Text suitable for a transient notification: the server-provided
    /// reason when there is one, otherwise a generic message.
    pub fn user_message(&self) -> String {
        match self {
            Self::Server { body, .. } => {
                server_message(body).unwrap_or_else(|| GENERIC_FAILURE_MESSAGE.to_string())
            }
            Self::Validation(message) => message.clone(),
            Self::Rejected(err) => err.message.clone(),
            Self::Transport(err) if err.is_connect() || err.is_timeout() => {
                "Server unreachable; check the API address and network.".to_string()
            }
            Self::Transport(_) | Self::Decode(_) => GENERIC_FAILURE_MESSAGE.to_string(),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
#[path = "tests/error_tests.rs"]
mod tests;
