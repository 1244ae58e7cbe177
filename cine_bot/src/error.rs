use teloxide::RequestError;
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Everything that can go wrong in an operation, no matter which surface
/// (chat or HTTP) asked for it.
#[derive(Debug, Error)]
pub enum Error {
    /// Missing or malformed input.
    #[error("{0}")]
    Validation(String),

    /// Admin-only operation attempted by someone else.
    #[error("not authorized")]
    Unauthorized,

    /// Subscriber-only operation attempted without an active subscription.
    #[error("subscription is not active")]
    SubscriptionInactive,

    #[error("{0} not found")]
    NotFound(String),

    /// The thing was already dealt with.
    #[error("{0}")]
    Conflict(String),

    /// An HTTP body refused before it could be read, like one too large or
    /// not JSON at all.
    #[error("{message}")]
    Rejected {
        status: axum::http::StatusCode,
        message: String,
    },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("telegram error: {0}")]
    Telegram(#[from] RequestError),
}

impl Error {
    pub fn validation(message: impl Into<String>) -> Self {
        Error::Validation(message.into())
    }

    /// True if a collaborator (database, storage, Telegram) failed rather
    /// than the caller doing something wrong.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            Error::Database(_) | Error::Storage(_) | Error::Telegram(_)
        )
    }
}
