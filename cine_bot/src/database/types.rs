use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqliteRow, FromRow, Row};
use teloxide::types::{ChatId, MessageId, UserId};

use crate::types::{PaymentStatus, Plan};

fn decode_err(e: impl std::error::Error + Send + Sync + 'static) -> sqlx::Error {
    sqlx::Error::Decode(Box::new(e))
}

#[allow(clippy::cast_sign_loss)]
fn user_id(row: &SqliteRow, column: &str) -> Result<UserId, sqlx::Error> {
    Ok(UserId(row.try_get::<i64, _>(column)? as u64))
}

/// Subscription state of one user.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserRecord {
    pub user_id: UserId,
    pub plan: Plan,
    pub subscribed_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl UserRecord {
    /// Active means the expiration is strictly in the future. No expiration
    /// means not active.
    #[must_use]
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at > now)
    }

    /// Whole days left until expiration, never negative.
    #[must_use]
    pub fn days_left(&self, now: DateTime<Utc>) -> i64 {
        self.expires_at
            .map_or(0, |expires_at| (expires_at - now).num_days().max(0))
    }
}

impl FromRow<'_, SqliteRow> for UserRecord {
    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(UserRecord {
            user_id: user_id(row, "user_id")?,
            plan: row
                .try_get::<String, _>("plan")?
                .parse()
                .map_err(decode_err)?,
            subscribed_at: row.try_get("subscribed_at")?,
            expires_at: row.try_get("expires_at")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

/// A catalog entry: a post in the movie channel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Movie {
    pub movie_id: i64,
    pub title: String,
    pub channel_id: ChatId,
    pub message_id: MessageId,
    pub created_at: DateTime<Utc>,
}

impl FromRow<'_, SqliteRow> for Movie {
    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Movie {
            movie_id: row.try_get("movie_id")?,
            title: row.try_get("title")?,
            channel_id: ChatId(row.try_get("channel_id")?),
            message_id: MessageId(row.try_get("message_id")?),
            created_at: row.try_get("created_at")?,
        })
    }
}

/// A user's claim that they paid, waiting for an admin.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PaymentRequest {
    pub request_id: i64,
    pub user_id: UserId,
    pub plan: Plan,
    pub method: Option<String>,
    pub proof_url: String,
    pub status: PaymentStatus,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub decided_at: Option<DateTime<Utc>>,
    pub decided_by: Option<UserId>,
}

impl FromRow<'_, SqliteRow> for PaymentRequest {
    #[allow(clippy::cast_sign_loss)]
    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(PaymentRequest {
            request_id: row.try_get("request_id")?,
            user_id: user_id(row, "user_id")?,
            plan: row
                .try_get::<String, _>("plan")?
                .parse()
                .map_err(decode_err)?,
            method: row.try_get("method")?,
            proof_url: row.try_get("proof_url")?,
            status: row
                .try_get::<String, _>("status")?
                .parse()
                .map_err(decode_err)?,
            rejection_reason: row.try_get("rejection_reason")?,
            created_at: row.try_get("created_at")?,
            decided_at: row.try_get("decided_at")?,
            decided_by: row
                .try_get::<Option<i64>, _>("decided_by")?
                .map(|x| UserId(x as u64)),
        })
    }
}

/// How an admin decision on a payment request went.
#[derive(Clone, Debug)]
pub enum Decision<T> {
    /// Applied, with whatever the decision changed.
    Applied(T),
    /// No such request.
    NotFound,
    /// Somebody already decided on it.
    AlreadyDecided(PaymentStatus),
}
