//! Everything both the chat and the web panel need, wired together once.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use teloxide::types::{ChatId, MessageId, UserId};

use crate::{
    catalog::{pagination::PAGE_SIZE, Catalog},
    config::BotSettings,
    database::{Database, Movie, UserRecord},
    error::Result,
    expiration::ExpirationNotifier,
    gate::{forward_protection, AccessGate},
    messenger::{notify, Messenger},
    payments::PaymentWorkflow,
    proofs::ProofStorage,
    types::Plan,
};

pub struct Backend {
    pub settings: BotSettings,
    pub db: Arc<Database>,
    pub gate: Arc<AccessGate>,
    pub catalog: Catalog,
    pub payments: PaymentWorkflow,
    pub messenger: Arc<dyn Messenger>,
}

/// Where a user stands, as shown to them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserStatus {
    pub exists: bool,
    pub active: bool,
    pub plan: Option<Plan>,
    pub expires_at: Option<DateTime<Utc>>,
    pub days_left: i64,
    pub is_admin: bool,
}

/// A movie that was sent to someone.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub movie: Movie,
    /// Whether the recipient is kept from forwarding or saving it.
    pub protected: bool,
}

const PROTECTED_NOTICE: &str = concat!(
    "ℹ️ This movie is <b>protected</b>: it can't be forwarded or saved.\n",
    "Upgrade to Premium to lift that."
);

impl Backend {
    pub fn new(
        db: Arc<Database>,
        proofs: ProofStorage,
        messenger: Arc<dyn Messenger>,
        settings: BotSettings,
    ) -> Arc<Backend> {
        let gate = Arc::new(AccessGate::new(db.clone(), settings.admins.iter().copied()));
        let payments = PaymentWorkflow::new(
            db.clone(),
            gate.clone(),
            proofs,
            messenger.clone(),
            settings.panel_url.clone(),
        );
        Arc::new(Backend {
            catalog: Catalog::new(db.clone()),
            payments,
            gate,
            db,
            messenger,
            settings,
        })
    }

    pub fn expiration_notifier(&self) -> ExpirationNotifier {
        ExpirationNotifier::new(self.db.clone(), self.messenger.clone())
    }

    pub async fn user_status(&self, user: UserId) -> Result<UserStatus> {
        self.user_status_at(user, Utc::now()).await
    }

    pub async fn user_status_at(&self, user: UserId, now: DateTime<Utc>) -> Result<UserStatus> {
        let record = self.db.get_user(user).await?;
        Ok(UserStatus {
            exists: record.is_some(),
            active: record.as_ref().is_some_and(|r| r.is_active_at(now)),
            plan: record.as_ref().map(|r| r.plan),
            expires_at: record.as_ref().and_then(|r| r.expires_at),
            days_left: record.as_ref().map_or(0, |r| r.days_left(now)),
            is_admin: self.gate.is_admin(user),
        })
    }

    /// Forward a movie to an active subscriber, protected according to the
    /// plan they have right now.
    pub async fn deliver_movie(&self, user: UserId, movie_id: i64) -> Result<Delivery> {
        let record = self.gate.require_active(user).await?;
        let movie = self.catalog.get(movie_id).await?;
        let protected = forward_protection(record.plan);

        let to = ChatId::from(user);
        self.messenger
            .deliver(to, movie.channel_id, movie.message_id, protected)
            .await?;
        log::debug!(
            "Delivered movie {} to {user}, protected: {protected}",
            movie.movie_id
        );

        if protected {
            notify(self.messenger.as_ref(), to, PROTECTED_NOTICE.to_string()).await;
        }

        Ok(Delivery { movie, protected })
    }

    /// Register a post of the movie channel.
    pub async fn add_movie(
        &self,
        admin: UserId,
        title: &str,
        message_id: MessageId,
    ) -> Result<Movie> {
        self.gate.require_admin(admin)?;
        self.catalog
            .add(title, self.settings.channel_id, message_id)
            .await
    }

    /// Page `index` (0-based) of all known users, newest first, along with
    /// how many there are.
    pub async fn list_users(&self, admin: UserId, index: usize) -> Result<(Vec<UserRecord>, i64)> {
        self.gate.require_admin(admin)?;
        let offset = i64::try_from(index.saturating_mul(PAGE_SIZE)).unwrap_or(i64::MAX);
        #[allow(clippy::cast_possible_wrap)]
        let users = self.db.list_users(offset, PAGE_SIZE as i64).await?;
        Ok((users, self.db.count_users().await?))
    }
}
