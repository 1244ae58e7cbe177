mod types;

use std::{str::FromStr, sync::Arc, time::Duration};

use chrono::{DateTime, SubsecRound, Utc};
pub use sqlx::Error;
use sqlx::{
    migrate::MigrateDatabase,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Executor, Row, Sqlite,
};
use teloxide::types::{ChatId, MessageId, UserId};
pub use types::*;

use crate::types::{PaymentStatus, Plan};

type Pool = sqlx::Pool<Sqlite>;

/// Timestamps are stored as text, so keep them to whole seconds for text
/// order to match time order.
fn db_time(time: DateTime<Utc>) -> DateTime<Utc> {
    time.trunc_subsecs(0)
}

#[allow(clippy::cast_possible_wrap)]
fn db_user(user: UserId) -> i64 {
    user.0 as i64
}

const USER_COLUMNS: &str = "user_id, plan, subscribed_at, expires_at, created_at";
const MOVIE_COLUMNS: &str = "movie_id, title, channel_id, message_id, created_at";
const REQUEST_COLUMNS: &str = "request_id, user_id, plan, method, proof_url, status, \
    rejection_reason, created_at, decided_at, decided_by";

pub struct Database {
    pool: Pool,
}

impl Database {
    /// Open (creating if needed) the database at `url`, like
    /// `sqlite:cine_bot.sqlite`.
    pub async fn new(url: &str) -> Result<Arc<Database>, Error> {
        if !Sqlite::database_exists(url).await.unwrap_or(false) {
            Sqlite::create_database(url).await?;
        }
        let pool = SqlitePoolOptions::new()
            .max_connections(32)
            .connect_with(
                SqliteConnectOptions::from_str(url)?
                    .pragma("cache_size", "-32768")
                    .busy_timeout(Duration::from_secs(600)),
            )
            .await?;

        Self::from_pool(pool).await
    }

    /// A fresh database that lives only as long as this object does.
    pub async fn in_memory() -> Result<Arc<Database>, Error> {
        // Every connection to ":memory:" is its own database, so there must be
        // exactly one and it must never be recycled.
        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(SqliteConnectOptions::from_str("sqlite::memory:")?)
            .await?;

        Self::from_pool(pool).await
    }

    /// Close every connection. Anything after this fails.
    #[cfg(test)]
    pub async fn close(&self) {
        self.pool.close().await;
    }

    async fn from_pool(pool: Pool) -> Result<Arc<Database>, Error> {
        // USERS:
        // user_id (telegram user ID, i64 because sqlite doesn't do u64)
        // plan ("classic" or "premium")
        // subscribed_at (date+time in UTC, NULL if never approved)
        // expires_at (date+time in UTC, NULL if never approved)
        // created_at (date+time in UTC)
        pool.execute(sqlx::query(
            "CREATE TABLE IF NOT EXISTS users (
                user_id INTEGER PRIMARY KEY NOT NULL,
                plan TEXT NOT NULL,
                subscribed_at TEXT NULL,
                expires_at TEXT NULL,
                created_at TEXT NOT NULL
            ) STRICT;",
        ))
        .await?;

        // MOVIES:
        // movie_id (key, i64)
        // title (string)
        // channel_id, message_id (the channel post to forward)
        // created_at (date+time in UTC)
        pool.execute(sqlx::query(
            "CREATE TABLE IF NOT EXISTS movies (
                movie_id INTEGER PRIMARY KEY NOT NULL,
                title TEXT NOT NULL,
                channel_id INTEGER NOT NULL,
                message_id INTEGER NOT NULL,
                created_at TEXT NOT NULL
            ) STRICT;",
        ))
        .await?;

        // PAYMENT_REQUESTS:
        // request_id (key, i64)
        // user_id (who paid)
        // plan (what they paid for)
        // method (how they say they paid, may be NULL)
        // proof_url (screenshot of the payment)
        // status ("pending", "approved" or "rejected")
        // rejection_reason (may be NULL)
        // created_at, decided_at (date+time in UTC, latter NULL while pending)
        // decided_by (admin user ID, NULL while pending)
        pool.execute(sqlx::query(
            "CREATE TABLE IF NOT EXISTS payment_requests (
                request_id INTEGER PRIMARY KEY NOT NULL,
                user_id INTEGER NOT NULL,
                plan TEXT NOT NULL,
                method TEXT NULL,
                proof_url TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'pending',
                rejection_reason TEXT NULL,
                created_at TEXT NOT NULL,
                decided_at TEXT NULL,
                decided_by INTEGER NULL
            ) STRICT;",
        ))
        .await?;

        pool.execute(sqlx::query(
            "CREATE INDEX IF NOT EXISTS users_expires_at ON users(expires_at);",
        ))
        .await?;
        pool.execute(sqlx::query(
            "CREATE INDEX IF NOT EXISTS payment_requests_status ON payment_requests(status);",
        ))
        .await?;

        Ok(Arc::new(Database { pool }))
    }

    pub async fn get_user(&self, user: UserId) -> Result<Option<UserRecord>, Error> {
        sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE user_id=?;"))
            .bind(db_user(user))
            .fetch_optional(&self.pool)
            .await
    }

    /// Users whose subscription expires in `[start, end)`.
    pub async fn users_expiring_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<UserRecord>, Error> {
        sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS} FROM users
            WHERE expires_at >= ? AND expires_at < ?
            ORDER BY expires_at;"
        ))
        .bind(db_time(start))
        .bind(db_time(end))
        .fetch_all(&self.pool)
        .await
    }

    /// Page through users, newest first.
    pub async fn list_users(&self, offset: i64, limit: i64) -> Result<Vec<UserRecord>, Error> {
        sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS} FROM users
            ORDER BY created_at DESC, user_id DESC
            LIMIT ? OFFSET ?;"
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
    }

    pub async fn count_users(&self) -> Result<i64, Error> {
        Ok(sqlx::query("SELECT COUNT(*) FROM users;")
            .fetch_one(&self.pool)
            .await?
            .try_get(0)?)
    }

    pub async fn insert_movie(
        &self,
        title: &str,
        channel_id: ChatId,
        message_id: MessageId,
        now: DateTime<Utc>,
    ) -> Result<Movie, Error> {
        sqlx::query_as(&format!(
            "INSERT INTO movies (title, channel_id, message_id, created_at)
            VALUES (?, ?, ?, ?)
            RETURNING {MOVIE_COLUMNS};"
        ))
        .bind(title)
        .bind(channel_id.0)
        .bind(message_id.0)
        .bind(db_time(now))
        .fetch_one(&self.pool)
        .await
    }

    pub async fn get_movie(&self, movie_id: i64) -> Result<Option<Movie>, Error> {
        sqlx::query_as(&format!(
            "SELECT {MOVIE_COLUMNS} FROM movies WHERE movie_id=?;"
        ))
        .bind(movie_id)
        .fetch_optional(&self.pool)
        .await
    }

    /// Movies with `query` somewhere in the title, ignoring case, in the order
    /// they were added.
    pub async fn search_movies(&self, query: &str, limit: u32) -> Result<Vec<Movie>, Error> {
        // instr instead of LIKE, so that "%" and "_" in the query mean themselves.
        sqlx::query_as(&format!(
            "SELECT {MOVIE_COLUMNS} FROM movies
            WHERE instr(lower(title), lower(?)) > 0
            ORDER BY movie_id
            LIMIT ?;"
        ))
        .bind(query)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
    }

    /// How many movies [`Database::search_movies`] would find without a limit.
    pub async fn count_movies_matching(&self, query: &str) -> Result<i64, Error> {
        Ok(
            sqlx::query("SELECT COUNT(*) FROM movies WHERE instr(lower(title), lower(?)) > 0;")
                .bind(query)
                .fetch_one(&self.pool)
                .await?
                .try_get(0)?,
        )
    }

    /// Page through movies, alphabetically.
    pub async fn list_movies(&self, offset: i64, limit: i64) -> Result<Vec<Movie>, Error> {
        sqlx::query_as(&format!(
            "SELECT {MOVIE_COLUMNS} FROM movies
            ORDER BY title COLLATE NOCASE, movie_id
            LIMIT ? OFFSET ?;"
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
    }

    pub async fn count_movies(&self) -> Result<i64, Error> {
        Ok(sqlx::query("SELECT COUNT(*) FROM movies;")
            .fetch_one(&self.pool)
            .await?
            .try_get(0)?)
    }

    /// Record a new pending payment request. Returns its ID.
    pub async fn insert_payment_request(
        &self,
        user: UserId,
        plan: Plan,
        method: Option<&str>,
        proof_url: &str,
        now: DateTime<Utc>,
    ) -> Result<i64, Error> {
        Ok(sqlx::query(
            "INSERT INTO payment_requests (user_id, plan, method, proof_url, status, created_at)
            VALUES (?, ?, ?, ?, 'pending', ?)
            RETURNING request_id;",
        )
        .bind(db_user(user))
        .bind(plan.as_str())
        .bind(method)
        .bind(proof_url)
        .bind(db_time(now))
        .fetch_one(&self.pool)
        .await?
        .try_get(0)?)
    }

    pub async fn get_payment_request(
        &self,
        request_id: i64,
    ) -> Result<Option<PaymentRequest>, Error> {
        sqlx::query_as(&format!(
            "SELECT {REQUEST_COLUMNS} FROM payment_requests WHERE request_id=?;"
        ))
        .bind(request_id)
        .fetch_optional(&self.pool)
        .await
    }

    /// All pending requests, oldest first.
    pub async fn pending_payment_requests(&self) -> Result<Vec<PaymentRequest>, Error> {
        sqlx::query_as(&format!(
            "SELECT {REQUEST_COLUMNS} FROM payment_requests
            WHERE status='pending'
            ORDER BY created_at, request_id;"
        ))
        .fetch_all(&self.pool)
        .await
    }

    /// Approve a pending request and set its user's subscription to
    /// `plan` from `now` until `expires_at`, all or nothing.
    pub async fn approve_payment_request(
        &self,
        request_id: i64,
        admin: UserId,
        now: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<Decision<(PaymentRequest, UserRecord)>, Error> {
        let now = db_time(now);
        let expires_at = db_time(expires_at);
        let mut tx = self.pool.begin().await?;

        let Some(request) = Self::decide(
            &mut tx,
            request_id,
            PaymentStatus::Approved,
            None,
            admin,
            now,
        )
        .await?
        else {
            return Self::why_not_decided(&mut tx, request_id).await;
        };

        let user: UserRecord = sqlx::query_as(&format!(
            "INSERT INTO users (user_id, plan, subscribed_at, expires_at, created_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(user_id) DO
                UPDATE SET plan=excluded.plan,
                    subscribed_at=excluded.subscribed_at,
                    expires_at=excluded.expires_at
            RETURNING {USER_COLUMNS};"
        ))
        .bind(db_user(request.user_id))
        .bind(request.plan.as_str())
        .bind(now)
        .bind(expires_at)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Decision::Applied((request, user)))
    }

    /// Reject a pending request with a reason.
    pub async fn reject_payment_request(
        &self,
        request_id: i64,
        admin: UserId,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<Decision<PaymentRequest>, Error> {
        let mut tx = self.pool.begin().await?;

        let Some(request) = Self::decide(
            &mut tx,
            request_id,
            PaymentStatus::Rejected,
            Some(reason),
            admin,
            db_time(now),
        )
        .await?
        else {
            return Self::why_not_decided(&mut tx, request_id).await;
        };

        tx.commit().await?;

        Ok(Decision::Applied(request))
    }

    /// Move a request out of pending. Returns `None` if it wasn't pending,
    /// which also covers it not existing.
    async fn decide(
        tx: &mut sqlx::Transaction<'_, Sqlite>,
        request_id: i64,
        status: PaymentStatus,
        reason: Option<&str>,
        admin: UserId,
        now: DateTime<Utc>,
    ) -> Result<Option<PaymentRequest>, Error> {
        // The status condition is what makes a decision happen at most once,
        // even with two admins clicking at the same time.
        sqlx::query_as(&format!(
            "UPDATE payment_requests
            SET status=?, rejection_reason=?, decided_at=?, decided_by=?
            WHERE request_id=? AND status='pending'
            RETURNING {REQUEST_COLUMNS};"
        ))
        .bind(status.as_str())
        .bind(reason)
        .bind(now)
        .bind(db_user(admin))
        .bind(request_id)
        .fetch_optional(&mut **tx)
        .await
    }

    async fn why_not_decided<T>(
        tx: &mut sqlx::Transaction<'_, Sqlite>,
        request_id: i64,
    ) -> Result<Decision<T>, Error> {
        let status: Option<String> =
            sqlx::query_scalar("SELECT status FROM payment_requests WHERE request_id=?;")
                .bind(request_id)
                .fetch_optional(&mut **tx)
                .await?;

        Ok(match status {
            None => Decision::NotFound,
            Some(status) => Decision::AlreadyDecided(
                status
                    .parse()
                    .map_err(|e| Error::Decode(Box::new(e)))?,
            ),
        })
    }
}
