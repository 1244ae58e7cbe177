//! Who may do what.

use std::{collections::HashSet, sync::Arc};

use chrono::{DateTime, Utc};
use teloxide::types::UserId;

use crate::{
    database::{Database, UserRecord},
    error::{Error, Result},
    types::Plan,
};

pub struct AccessGate {
    db: Arc<Database>,
    admins: HashSet<UserId>,
}

impl AccessGate {
    pub fn new(db: Arc<Database>, admins: impl IntoIterator<Item = UserId>) -> AccessGate {
        AccessGate {
            db,
            admins: admins.into_iter().collect(),
        }
    }

    pub fn is_admin(&self, user: UserId) -> bool {
        self.admins.contains(&user)
    }

    pub fn admins(&self) -> impl Iterator<Item = UserId> + '_ {
        self.admins.iter().copied()
    }

    pub async fn is_active(&self, user: UserId) -> Result<bool> {
        self.is_active_at(user, Utc::now()).await
    }

    pub async fn is_active_at(&self, user: UserId, now: DateTime<Utc>) -> Result<bool> {
        Ok(self
            .db
            .get_user(user)
            .await?
            .is_some_and(|record| record.is_active_at(now)))
    }

    pub fn require_admin(&self, user: UserId) -> Result<()> {
        if self.is_admin(user) {
            Ok(())
        } else {
            Err(Error::Unauthorized)
        }
    }

    pub async fn require_active(&self, user: UserId) -> Result<UserRecord> {
        self.require_active_at(user, Utc::now()).await
    }

    /// The user's record, if their subscription is active at `now`.
    pub async fn require_active_at(&self, user: UserId, now: DateTime<Utc>) -> Result<UserRecord> {
        match self.db.get_user(user).await? {
            Some(record) if record.is_active_at(now) => Ok(record),
            _ => Err(Error::SubscriptionInactive),
        }
    }
}

/// Whether content delivered to a subscriber of `plan` should be protected
/// from forwarding and saving.
pub fn forward_protection(plan: Plan) -> bool {
    match plan {
        Plan::Classic => true,
        Plan::Premium => false,
    }
}
