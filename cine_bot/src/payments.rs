//! Payment requests: a user sends proof of payment, an admin approves or
//! rejects it, approval starts the subscription.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use futures::future::join_all;
use html_escape::encode_text;
use teloxide::types::{ChatId, UserId};
use url::Url;

use crate::{
    database::{Database, Decision, PaymentRequest, UserRecord},
    error::{Error, Result},
    gate::AccessGate,
    messenger::{notify, Messenger},
    proofs::ProofStorage,
    types::Plan,
};

/// An approval always grants exactly this much from the moment of approval,
/// whatever was left of a previous subscription.
pub const SUBSCRIPTION_DAYS: i64 = 30;

pub struct PaymentWorkflow {
    db: Arc<Database>,
    gate: Arc<AccessGate>,
    proofs: ProofStorage,
    messenger: Arc<dyn Messenger>,
    panel_url: Url,
}

impl PaymentWorkflow {
    pub fn new(
        db: Arc<Database>,
        gate: Arc<AccessGate>,
        proofs: ProofStorage,
        messenger: Arc<dyn Messenger>,
        panel_url: Url,
    ) -> PaymentWorkflow {
        PaymentWorkflow {
            db,
            gate,
            proofs,
            messenger,
            panel_url,
        }
    }

    /// Store the proof, record a pending request and tell the admins.
    /// Returns the request ID.
    pub async fn submit(
        &self,
        user: UserId,
        plan: Plan,
        method: Option<&str>,
        proof: &[u8],
    ) -> Result<i64> {
        if proof.is_empty() {
            return Err(Error::validation("the payment proof image is missing"));
        }
        let method = method.map(str::trim).filter(|m| !m.is_empty());

        let proof_url = self.proofs.store(user, plan, proof).await?;
        let request_id = match self
            .db
            .insert_payment_request(user, plan, method, &proof_url, Utc::now())
            .await
        {
            Ok(x) => x,
            Err(e) => {
                // Nothing refers to the proof now.
                self.proofs.discard(&proof_url).await;
                return Err(e.into());
            }
        };

        log::info!("User {user} submitted payment request {request_id} for {plan}");

        let text = format!(
            concat!(
                "💰 <b>New payment request #{}</b>\n",
                "User: <code>{}</code>\n",
                "Plan: {}\n",
                "Method: {}\n",
                "Proof: {}\n\n",
                "Review it in the panel: {}"
            ),
            request_id,
            user,
            plan,
            encode_text(method.unwrap_or("not given")),
            encode_text(&proof_url),
            encode_text(self.panel_url.as_str()),
        );

        let sent = join_all(self.gate.admins().map(|admin| {
            notify(self.messenger.as_ref(), ChatId::from(admin), text.clone())
        }))
        .await;
        if sent.iter().any(|ok| !ok) {
            log::warn!("Not every admin heard about payment request {request_id}");
        }

        Ok(request_id)
    }

    pub async fn approve(
        &self,
        admin: UserId,
        request_id: i64,
    ) -> Result<(PaymentRequest, UserRecord)> {
        self.approve_at(admin, request_id, Utc::now()).await
    }

    /// Approve a pending request as of `now`, subscribing its user until
    /// `now` plus [`SUBSCRIPTION_DAYS`].
    pub async fn approve_at(
        &self,
        admin: UserId,
        request_id: i64,
        now: DateTime<Utc>,
    ) -> Result<(PaymentRequest, UserRecord)> {
        self.gate.require_admin(admin)?;

        let expires_at = now + TimeDelta::days(SUBSCRIPTION_DAYS);
        let (request, user) = settled(
            request_id,
            self.db
                .approve_payment_request(request_id, admin, now, expires_at)
                .await?,
        )?;

        log::info!(
            "Admin {admin} approved payment request {request_id}, user {} has {} until {}",
            user.user_id,
            user.plan,
            expires_at
        );

        let until = user
            .expires_at
            .map(|x| x.format("%Y-%m-%d").to_string())
            .unwrap_or_default();
        notify(
            self.messenger.as_ref(),
            ChatId::from(user.user_id),
            format!(
                concat!(
                    "✅ <b>Your payment was approved!</b>\n\n",
                    "Plan: {}\n",
                    "Active until: {}\n\n",
                    "Send me a movie title to search for it, or use /menu."
                ),
                user.plan, until
            ),
        )
        .await;

        Ok((request, user))
    }

    pub async fn reject(
        &self,
        admin: UserId,
        request_id: i64,
        reason: &str,
    ) -> Result<PaymentRequest> {
        self.reject_at(admin, request_id, reason, Utc::now()).await
    }

    pub async fn reject_at(
        &self,
        admin: UserId,
        request_id: i64,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<PaymentRequest> {
        self.gate.require_admin(admin)?;

        let reason = reason.trim();
        if reason.is_empty() {
            return Err(Error::validation("a rejection needs a reason"));
        }

        let request = settled(
            request_id,
            self.db
                .reject_payment_request(request_id, admin, reason, now)
                .await?,
        )?;

        log::info!("Admin {admin} rejected payment request {request_id}: {reason}");

        notify(
            self.messenger.as_ref(),
            ChatId::from(request.user_id),
            format!(
                concat!(
                    "❌ <b>Your payment request #{} was rejected.</b>\n\n",
                    "Reason: {}\n\n",
                    "You can send a new proof after choosing a plan with /start."
                ),
                request.request_id,
                encode_text(reason)
            ),
        )
        .await;

        Ok(request)
    }

    /// Pending requests, oldest first.
    pub async fn pending(&self, admin: UserId) -> Result<Vec<PaymentRequest>> {
        self.gate.require_admin(admin)?;
        Ok(self.db.pending_payment_requests().await?)
    }
}

fn settled<T>(request_id: i64, decision: Decision<T>) -> Result<T> {
    match decision {
        Decision::Applied(x) => Ok(x),
        Decision::NotFound => Err(Error::NotFound(format!("payment request {request_id}"))),
        Decision::AlreadyDecided(status) => Err(Error::Conflict(format!(
            "payment request {request_id} was already {status}"
        ))),
    }
}
