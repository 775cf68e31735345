//! # Reminder Scheduler
//!
//! Emails clients about invoices falling due and quotes about to expire.
//!
//! ## Tick
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         ReminderScheduler::tick                         │
//! │                                                                         │
//! │  1. Take the "reminders" lease      (held elsewhere → do nothing)       │
//! │                                                                         │
//! │  2. For each kind, load SENT documents whose due date is exactly        │
//! │     today - offset for one of its reminder types, a page at a time      │
//! │                                                                         │
//! │  3. For each (document, reminder type), up to N at a time:              │
//! │       ├── successful record exists?  → skip                             │
//! │       ├── renew the lease            (lost → stop the pass)             │
//! │       ├── render + payment link + mail, each with a timeout             │
//! │       └── record success / failure   (failure retried next tick)        │
//! │                                                                         │
//! │  4. Release the lease                                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Offsets
//! ```text
//!   Invoice (SENT):  due-3 DUE_IN_3_DAYS · due DUE_TODAY
//!                    due+7 OVERDUE_7_DAYS · due+14 OVERDUE_14_DAYS
//!   Quote   (SENT):  expiry-3 EXPIRES_IN_3_DAYS
//! ```
//!
//! A failure on one document never stops the rest of the batch. Running a
//! tick twice on the same day sends nothing new.

use chrono::{DateTime, NaiveDate, Utc};
use folio_core::{Document, DocumentKind, DocumentStatus, ReminderType};
use folio_db::Database;
use futures_util::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::clock::Clock;
use crate::config::ReminderSettings;
use crate::delivery::DocumentDelivery;
use crate::error::EngineResult;
use crate::tokens::ApprovalTokenService;

/// Name of the lease row guarding the tick.
pub const REMINDER_LEASE: &str = "reminders";

/// What one tick did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// (document, reminder type) pairs due today.
    pub eligible: usize,
    pub sent: usize,
    /// Already sent successfully on an earlier tick.
    pub skipped: usize,
    pub failed: usize,
    /// Left unsent because the lease passed to another runner mid-pass.
    pub deferred: usize,
    /// False when another runner held the lease and nothing was done.
    pub lease_held: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Sent,
    Skipped,
    Failed,
    Deferred,
}

/// A delivery attempt that did not go out.
struct FailedAttempt {
    recipient: String,
    error: String,
}

#[derive(Clone)]
pub struct ReminderScheduler {
    db: Database,
    tokens: ApprovalTokenService,
    delivery: DocumentDelivery,
    settings: ReminderSettings,
    /// Identifies this process in the lease table.
    holder: String,
    clock: Arc<dyn Clock>,
}

impl ReminderScheduler {
    pub fn new(
        db: Database,
        tokens: ApprovalTokenService,
        delivery: DocumentDelivery,
        settings: ReminderSettings,
        clock: Arc<dyn Clock>,
    ) -> Self {
        ReminderScheduler {
            db,
            tokens,
            delivery,
            settings,
            holder: Uuid::new_v4().to_string(),
            clock,
        }
    }

    pub fn holder(&self) -> &str {
        &self.holder
    }

    /// Runs one reminder pass as of `now`.
    pub async fn tick(&self, now: DateTime<Utc>) -> EngineResult<TickReport> {
        let acquired = self
            .db
            .leases()
            .try_acquire(REMINDER_LEASE, &self.holder, now.timestamp(), self.settings.lease_secs as i64)
            .await?;
        if !acquired {
            debug!(holder = %self.holder, "Reminder lease held by another runner, skipping tick");
            return Ok(TickReport::default());
        }

        let result = self.run_pass(now).await;

        if let Err(e) = self.db.leases().release(REMINDER_LEASE, &self.holder).await {
            warn!(?e, "Failed to release reminder lease; it will expire on its own");
        }

        result
    }

    async fn run_pass(&self, now: DateTime<Utc>) -> EngineResult<TickReport> {
        let today = now.date_naive();
        let mut report = TickReport {
            lease_held: true,
            ..TickReport::default()
        };

        'kinds: for kind in DocumentKind::ALL {
            let dates: Vec<_> = ReminderType::trigger_dates(kind, today)
                .into_iter()
                .map(|(date, _)| date)
                .collect();

            let mut cursor: Option<(NaiveDate, String)> = None;
            loop {
                let page = self
                    .db
                    .documents()
                    .find_due_on(
                        kind,
                        DocumentStatus::sent(kind),
                        &dates,
                        cursor.as_ref().map(|(date, id)| (*date, id.as_str())),
                        self.settings.batch_size,
                    )
                    .await?;
                let exhausted = page.len() < self.settings.batch_size as usize;
                cursor = page.last().map(|d| (d.due_date, d.id.clone()));

                let due: Vec<_> = page
                    .into_iter()
                    .filter_map(|document| {
                        ReminderType::classify(kind, document.due_date, today).map(|reminder| (document, reminder))
                    })
                    .collect();
                report.eligible += due.len();

                let outcomes: Vec<Outcome> = stream::iter(due)
                    .map(|(document, reminder)| self.remind(document, reminder, now))
                    .buffer_unordered(self.settings.max_concurrent_sends)
                    .collect()
                    .await;

                for outcome in outcomes {
                    match outcome {
                        Outcome::Sent => report.sent += 1,
                        Outcome::Skipped => report.skipped += 1,
                        Outcome::Failed => report.failed += 1,
                        Outcome::Deferred => report.deferred += 1,
                    }
                }

                if report.deferred > 0 {
                    warn!(holder = %self.holder, "Reminder lease lost mid-pass, stopping");
                    break 'kinds;
                }
                if exhausted || cursor.is_none() {
                    break;
                }
            }
        }

        info!(
            eligible = report.eligible,
            sent = report.sent,
            skipped = report.skipped,
            failed = report.failed,
            deferred = report.deferred,
            "Reminder tick complete"
        );
        Ok(report)
    }

    /// Extends this runner's lease before a send. False when another runner
    /// has taken it over.
    async fn renew_lease(&self, now: DateTime<Utc>) -> bool {
        let at = self.clock.now().max(now);
        match self
            .db
            .leases()
            .try_acquire(REMINDER_LEASE, &self.holder, at.timestamp(), self.settings.lease_secs as i64)
            .await
        {
            Ok(renewed) => renewed,
            Err(e) => {
                error!(?e, "Failed to renew reminder lease");
                false
            }
        }
    }

    /// Handles one (document, reminder type). Never fails; the outcome is
    /// recorded instead.
    async fn remind(&self, document: Document, reminder: ReminderType, now: DateTime<Utc>) -> Outcome {
        match self.db.reminders().has_succeeded(&document.id, reminder).await {
            Ok(true) => {
                debug!(document_id = %document.id, reminder = %reminder, "Reminder already sent");
                return Outcome::Skipped;
            }
            Ok(false) => {}
            Err(e) => {
                error!(?e, document_id = %document.id, "Failed to read reminder record");
                return Outcome::Failed;
            }
        }

        if !self.renew_lease(now).await {
            debug!(document_id = %document.id, reminder = %reminder, "Lease lost, reminder left for next holder");
            return Outcome::Deferred;
        }

        let (recipient, failure, outcome) = match self.attempt(&document, reminder, now).await {
            Ok(recipient) => (recipient, None, Outcome::Sent),
            Err(failed) => {
                warn!(
                    document_id = %document.id,
                    reminder = %reminder,
                    error = %failed.error,
                    "Reminder delivery failed, will retry next tick"
                );
                (failed.recipient, Some(failed.error), Outcome::Failed)
            }
        };

        match self
            .db
            .reminders()
            .record(&document.id, reminder, &recipient, failure.as_deref(), now)
            .await
        {
            Ok(true) => {}
            Ok(false) => debug!(document_id = %document.id, reminder = %reminder, "Success already recorded by another attempt"),
            Err(e) => error!(?e, document_id = %document.id, reminder = %reminder, "Failed to record reminder outcome"),
        }

        if outcome == Outcome::Sent {
            info!(document_id = %document.id, reminder = %reminder, to = %recipient, "Reminder sent");
        }
        outcome
    }

    async fn attempt(
        &self,
        document: &Document,
        reminder: ReminderType,
        now: DateTime<Utc>,
    ) -> Result<String, FailedAttempt> {
        let failed = |recipient: &str, error: String| FailedAttempt {
            recipient: recipient.to_string(),
            error,
        };

        let client = self
            .db
            .clients()
            .get(&document.client_id)
            .await
            .map_err(|e| failed("", e.to_string()))?;
        let recipient = client.email.clone().unwrap_or_default();

        let company = self
            .db
            .companies()
            .get(&document.company_id)
            .await
            .map_err(|e| failed(&recipient, e.to_string()))?;

        let public_url = self
            .public_url(document, now)
            .await
            .map_err(|e| failed(&recipient, e.to_string()))?;

        let subject = reminder.subject(&document.display_number());
        self.delivery
            .deliver(&company, &client, document, &subject, Some(&public_url))
            .await
            .map_err(|e| failed(&recipient, e.to_string()))
    }

    /// The client's current link for this document, or a fresh one when the
    /// live token points elsewhere or has lapsed.
    async fn public_url(&self, document: &Document, now: DateTime<Utc>) -> EngineResult<String> {
        let token_type = document.kind.token_type();
        let existing = self
            .db
            .tokens()
            .find(&document.client_id, &document.company_id, token_type)
            .await?;

        let token = match existing {
            Some(t) if t.document_id == document.id && t.expires_at > now.timestamp() => t.token,
            _ => {
                let mut tx = self.db.begin_write().await?;
                let issued = self
                    .tokens
                    .issue_in(
                        &mut tx,
                        &document.client_id,
                        &document.company_id,
                        token_type,
                        &document.id,
                        self.tokens.ttl_for(token_type),
                        now,
                    )
                    .await?;
                tx.commit().await?;
                issued.token
            }
        };

        Ok(self.delivery.public_url(document.kind, &token))
    }

    /// A runner that ticks on `poll_interval` until its handle shuts it down.
    pub fn runner(&self) -> (ReminderRunner, ReminderRunnerHandle) {
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let runner = ReminderRunner {
            scheduler: self.clone(),
            poll_interval: self.settings.poll_interval(),
            shutdown_rx,
        };
        (runner, ReminderRunnerHandle { shutdown_tx })
    }
}

// =============================================================================
// Runner
// =============================================================================

pub struct ReminderRunner {
    scheduler: ReminderScheduler,
    poll_interval: Duration,
    shutdown_rx: mpsc::Receiver<()>,
}

#[derive(Clone)]
pub struct ReminderRunnerHandle {
    shutdown_tx: mpsc::Sender<()>,
}

impl ReminderRunnerHandle {
    /// Asks the runner to stop after the current tick.
    pub async fn shutdown(&self) {
        if self.shutdown_tx.send(()).await.is_err() {
            debug!("Reminder runner already stopped");
        }
    }
}

impl ReminderRunner {
    /// Ticks immediately, then every `poll_interval`.
    pub async fn run(mut self) {
        info!(
            holder = %self.scheduler.holder,
            interval_secs = self.poll_interval.as_secs(),
            "Reminder runner starting"
        );

        let mut interval = tokio::time::interval(self.poll_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let now = self.scheduler.clock.now();
                    if let Err(e) = self.scheduler.tick(now).await {
                        error!(?e, "Reminder tick failed");
                    }
                }

                _ = self.shutdown_rx.recv() => {
                    info!("Reminder runner shutting down");
                    break;
                }
            }
        }

        info!("Reminder runner stopped");
    }
}
