//! Periodically warns subscribers whose subscription is about to run out.

use std::{panic::AssertUnwindSafe, sync::Arc, time::Duration};

use chrono::{DateTime, NaiveTime, TimeDelta, Utc};
use futures::FutureExt;
use teloxide::types::ChatId;
use tokio::{sync::watch, task::JoinHandle};

use crate::{
    database::{Database, UserRecord},
    messenger::{notify, Messenger},
};

/// How often to look for expiring subscriptions.
pub const CHECK_PERIOD: Duration = Duration::from_secs(6 * 60 * 60);

/// Days before expiration at which a user is warned.
pub const THRESHOLD_DAYS: [i64; 3] = [5, 3, 1];

/// What one check did.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CycleReport {
    /// Warnings delivered.
    pub notified: usize,
    /// Warnings that couldn't be delivered.
    pub failed_sends: usize,
    /// Thresholds skipped because the users couldn't be fetched.
    pub failed_thresholds: usize,
}

pub struct ExpirationNotifier {
    db: Arc<Database>,
    messenger: Arc<dyn Messenger>,
}

/// The UTC calendar day `days` days after `now`, as `[start, end)`.
pub fn window(now: DateTime<Utc>, days: i64) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = (now + TimeDelta::days(days))
        .date_naive()
        .and_time(NaiveTime::MIN)
        .and_utc();
    (start, start + TimeDelta::days(1))
}

fn warning_text(user: &UserRecord, days: i64) -> String {
    let date = user
        .expires_at
        .map(|x| x.format("%Y-%m-%d").to_string())
        .unwrap_or_default();
    let days = match days {
        1 => "1 day".to_string(),
        x => format!("{x} days"),
    };
    format!(
        concat!(
            "⏰ <b>Your {} subscription expires in {}</b> ({}).\n\n",
            "Renew it with /start to keep watching."
        ),
        user.plan, days, date
    )
}

impl ExpirationNotifier {
    pub fn new(db: Arc<Database>, messenger: Arc<dyn Messenger>) -> ExpirationNotifier {
        ExpirationNotifier { db, messenger }
    }

    /// Warn everyone expiring on one of the threshold days counted from
    /// `now`. Never fails, problems are logged and skipped.
    pub async fn run_cycle(&self, now: DateTime<Utc>) -> CycleReport {
        let mut report = CycleReport::default();

        for days in THRESHOLD_DAYS {
            let (start, end) = window(now, days);
            let users = match self.db.users_expiring_between(start, end).await {
                Ok(x) => x,
                Err(e) => {
                    log::error!("Failed to fetch users expiring in {days} days: {e}");
                    report.failed_thresholds += 1;
                    continue;
                }
            };

            for user in users {
                let to = ChatId::from(user.user_id);
                if notify(self.messenger.as_ref(), to, warning_text(&user, days)).await {
                    report.notified += 1;
                } else {
                    report.failed_sends += 1;
                }
            }
        }

        if report != CycleReport::default() {
            log::info!("Expiration check done: {report:?}");
        }
        report
    }

    /// Run a check right away and then every `period`, until stopped.
    pub fn spawn(self: Arc<Self>, period: Duration) -> NotifierHandle {
        let (stop, mut stopped) = watch::channel(false);

        let task = tokio::spawn(async move {
            loop {
                let cycle = AssertUnwindSafe(self.run_cycle(Utc::now()))
                    .catch_unwind()
                    .await;
                if cycle.is_err() {
                    log::error!("Expiration check panicked! Trying again next period.");
                }

                tokio::select! {
                    () = tokio::time::sleep(period) => {}
                    // Also taken if the handle got dropped.
                    _ = stopped.changed() => break,
                }
            }
            log::info!("Expiration notifier stopped.");
        });

        NotifierHandle { stop, task }
    }
}

pub struct NotifierHandle {
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl NotifierHandle {
    /// Stop the schedule, waiting for a check in progress to finish.
    pub async fn stop(self) {
        let _ = self.stop.send(true);
        if let Err(e) = self.task.await {
            log::error!("Expiration notifier task failed: {e}");
        }
    }
}
