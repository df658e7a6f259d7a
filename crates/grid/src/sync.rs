//! Persistence and the remote feed.
//!
//! The grid hands due writes over as a [`SyncBatch`]. [`SyncWorker`]
//! executes it against a [`ShiftStore`] on smol without touching the grid:
//! blocking store calls go through `smol::unblock` and retryable failures
//! are retried with exponential backoff. The resulting [`SyncReport`] is fed
//! back into the grid, which marks records persisted, releases their
//! protection tokens or requeues what failed. [`RemoteFeed`] bridges store subscriptions onto a
//! channel the host drains into the grid.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use smol::channel::{Receiver, Sender};

use careshift_config::SyncSettings;
use careshift_core::{CellKey, YearMonth};
use careshift_engine::{OverlayKind, ShiftRecord};
use careshift_protocol::PayrollFieldDoc;
use careshift_store::{OverlayEntries, ShiftStore, StoreError, Subscription};

use crate::events::GridEvent;
use crate::grid::ShiftGrid;
use crate::outbox::PersistJob;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, the first one included
    pub attempts: u32,
    /// Wait before the second attempt; doubles after each retry
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn from_settings(settings: &SyncSettings) -> Self {
        Self { attempts: settings.retry_attempts.max(1), backoff: settings.retry_backoff() }
    }

    /// Wait after failed attempt number `attempt` (1-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        self.backoff.saturating_mul(1u32 << attempt.saturating_sub(1).min(16))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_settings(&SyncSettings::default())
    }
}

/// Result of running one persist job.
#[derive(Debug, Clone, PartialEq)]
pub struct PersistOutcome {
    pub job: PersistJob,
    /// Writes that were not applied, as a job ready to requeue
    pub failed: PersistJob,
    pub error: Option<String>,
}

impl PersistOutcome {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

pub struct SyncWorker {
    store: Arc<dyn ShiftStore>,
    retry: RetryPolicy,
}

impl SyncWorker {
    pub fn new(store: Arc<dyn ShiftStore>, retry: RetryPolicy) -> Self {
        Self { store, retry }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Run a store call off the calling thread, retrying retryable errors.
    async fn with_retry<F>(&self, what: &str, op: F) -> Result<(), StoreError>
    where
        F: Fn(&dyn ShiftStore) -> Result<(), StoreError> + Send + Sync + 'static,
    {
        let op = Arc::new(op);
        let mut attempt = 1;
        loop {
            let store = Arc::clone(&self.store);
            let call = Arc::clone(&op);
            match smol::unblock(move || (*call)(store.as_ref())).await {
                Ok(()) => return Ok(()),
                Err(e) if e.is_retryable() && attempt < self.retry.attempts => {
                    let delay = self.retry.delay(attempt);
                    log::warn!(
                        "{} failed (attempt {}/{}): {}, retrying in {:?}",
                        what,
                        attempt,
                        self.retry.attempts,
                        e,
                        delay
                    );
                    smol::Timer::after(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    log::error!("{} failed after {} attempt(s): {}", what, attempt, e);
                    return Err(e);
                }
            }
        }
    }

    /// Save a job's upserts in one batch, then tombstone its deletes.
    pub async fn run(&self, job: PersistJob) -> PersistOutcome {
        let mut failed = PersistJob { month: job.month, seq: job.seq, upserts: Vec::new(), deletes: Vec::new() };
        let mut error = None;

        if !job.upserts.is_empty() {
            let month = job.month;
            let records = job.upserts.clone();
            let what = format!("saving {} shift(s) for {}", records.len(), month);
            if let Err(e) = self.with_retry(&what, move |store| store.save_shifts(month, &records)).await {
                failed.upserts = job.upserts.clone();
                error = Some(e.to_string());
            }
        }
        for (id, key) in &job.deletes {
            let target = id.clone();
            let what = format!("deleting shift {}", id);
            if let Err(e) = self.with_retry(&what, move |store| store.soft_delete(&target)).await {
                failed.deletes.push((id.clone(), key.clone()));
                error = Some(e.to_string());
            }
        }

        PersistOutcome { job, failed, error }
    }

    pub async fn save_payroll(&self, doc: &PayrollFieldDoc) -> Result<(), StoreError> {
        let owned = doc.clone();
        let what = format!("saving payroll field {}/{}", doc.staff_id, doc.field);
        self.with_retry(&what, move |store| store.save_payroll_field(&owned)).await
    }

    /// Execute a batch against the store. Borrows no grid.
    pub async fn execute(&self, batch: SyncBatch) -> SyncReport {
        let SyncBatch { jobs, payroll } = batch;
        let mut report = SyncReport::default();
        for job in jobs {
            report.outcomes.push(self.run(job).await);
        }
        report.payroll_attempted = payroll.len();
        for doc in payroll {
            if let Err(e) = self.save_payroll(&doc).await {
                report.payroll_failures.push((doc, e.to_string()));
            }
        }
        report
    }

    /// Wait for the grid's next due write, then run what is due. The lock
    /// is only held while taking the batch and while applying the report.
    pub async fn tick(&self, grid: &Mutex<ShiftGrid>) -> usize {
        let due = grid.lock().next_due();
        if let Some(due) = due {
            smol::Timer::at(due).await;
        }
        let batch = grid.lock().take_due_batch();
        let report = self.execute(batch).await;
        grid.lock().apply_sync_report(report)
    }

    /// Run every job and payroll save that is due now, for callers without
    /// an executor.
    pub fn run_due_blocking(&self, grid: &mut ShiftGrid) -> usize {
        let batch = grid.take_due_batch();
        let report = smol::block_on(self.execute(batch));
        grid.apply_sync_report(report)
    }

    /// Shut the grid down and write everything still pending.
    pub fn flush_blocking(&self, grid: &mut ShiftGrid) -> usize {
        let batch = grid.shutdown();
        let report = smol::block_on(self.execute(batch));
        let count = grid.apply_sync_report(report);
        log::info!("flushed {} pending write(s)", count);
        count
    }
}

/// Writes taken from the grid in one go.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncBatch {
    pub jobs: Vec<PersistJob>,
    pub payroll: Vec<PayrollFieldDoc>,
}

impl SyncBatch {
    pub fn len(&self) -> usize {
        self.jobs.len() + self.payroll.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// What came back from executing a [`SyncBatch`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncReport {
    pub outcomes: Vec<PersistOutcome>,
    pub payroll_failures: Vec<(PayrollFieldDoc, String)>,
    /// Payroll fields attempted, failed ones included
    pub payroll_attempted: usize,
}

impl ShiftGrid {
    /// Persist jobs whose debounce has elapsed. Their records count as
    /// known to the store from here on.
    pub fn take_due_jobs(&mut self) -> Vec<PersistJob> {
        let now = self.clock.now();
        let jobs = self.outbox.take_due(now);
        self.mark_in_flight(&jobs);
        jobs
    }

    /// Due persist jobs plus due payroll fields.
    pub fn take_due_batch(&mut self) -> SyncBatch {
        let jobs = self.take_due_jobs();
        let payroll = self.take_due_payroll();
        SyncBatch { jobs, payroll }
    }

    fn mark_in_flight(&mut self, jobs: &[PersistJob]) {
        for job in jobs {
            self.store_ids.extend(job.upserts.iter().map(|r| r.id.clone()));
        }
    }

    /// Earliest instant at which a write becomes due.
    pub fn next_due(&self) -> Option<Instant> {
        match (self.outbox.next_due(), self.payroll.next_due()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Commit any open edit and hand over every pending write, due or not.
    pub fn shutdown(&mut self) -> SyncBatch {
        self.commit_open_edit();
        let jobs = self.outbox.take_all();
        self.mark_in_flight(&jobs);
        let payroll = self.payroll.take_all();
        log::info!("shutdown: {} persist job(s), {} payroll field(s) pending", jobs.len(), payroll.len());
        SyncBatch { jobs, payroll }
    }

    /// Feed an executed batch back. Returns how many writes it carried.
    pub fn apply_sync_report(&mut self, report: SyncReport) -> usize {
        let SyncReport { outcomes, payroll_failures, payroll_attempted } = report;
        let count = outcomes.len() + payroll_attempted;
        for outcome in outcomes {
            self.apply_persist_outcome(outcome);
        }
        for (doc, message) in payroll_failures {
            self.report_payroll_failure(&doc, message);
        }
        count
    }

    /// Feed a job's result back. Successful writes become persisted and
    /// unprotected; failures are requeued, stay protected and are reported.
    pub fn apply_persist_outcome(&mut self, outcome: PersistOutcome) {
        let PersistOutcome { job, failed, error } = outcome;

        for record in &job.upserts {
            if failed.upserts.iter().any(|f| f.id == record.id) {
                continue;
            }
            if let Some(local) = self.book.get_mut(&record.key) {
                if local.id == record.id && local.updated_seq <= job.seq {
                    local.persisted = true;
                }
            }
        }
        let failed_keys: Vec<CellKey> = failed.upserts.iter().map(|r| r.key.clone()).collect();
        self.reconciler.acknowledge(&job.keys(), job.seq, &failed_keys);

        if failed.is_empty() {
            return;
        }
        let ids: Vec<String> = failed
            .upserts
            .iter()
            .map(|r| r.id.clone())
            .chain(failed.deletes.iter().map(|(id, _)| id.clone()))
            .collect();
        let month = failed.month;
        let now = self.clock.now();
        self.outbox.requeue(failed, now);
        self.emit(GridEvent::PersistFailed {
            month,
            failed: ids,
            message: error.unwrap_or_else(|| "write failed".to_string()),
        });
    }

    fn report_payroll_failure(&mut self, doc: &PayrollFieldDoc, message: String) {
        self.emit(GridEvent::PayrollSaveFailed {
            staff_id: doc.staff_id.clone(),
            field: doc.field.clone(),
            message,
        });
    }

    /// Apply one message from the remote feed.
    pub fn apply_remote(&mut self, message: RemoteMessage) {
        match message {
            RemoteMessage::Shifts(month, records) => self.apply_remote_snapshot(month, records),
            RemoteMessage::Overlays(kind, month, entries) => self.apply_remote_overlays(kind, month, entries),
        }
    }
}

#[derive(Debug, Clone)]
pub enum RemoteMessage {
    Shifts(YearMonth, Vec<ShiftRecord>),
    Overlays(OverlayKind, YearMonth, OverlayEntries),
}

/// Store subscriptions funnelled into one channel.
pub struct RemoteFeed {
    tx: Sender<RemoteMessage>,
    rx: Receiver<RemoteMessage>,
    subscriptions: Vec<Subscription>,
}

impl RemoteFeed {
    pub fn new() -> Self {
        let (tx, rx) = smol::channel::unbounded();
        Self { tx, rx, subscriptions: Vec::new() }
    }

    /// Subscribe to shifts and both overlay maps for each month.
    pub fn subscribe(&mut self, store: &dyn ShiftStore, months: &[YearMonth]) -> Result<(), StoreError> {
        for &month in months {
            let tx = self.tx.clone();
            self.subscriptions.push(store.subscribe_shifts(
                month,
                Box::new(move |records| {
                    if let Err(e) = tx.try_send(RemoteMessage::Shifts(month, records)) {
                        log::warn!("dropping shift update for {}: {}", month, e);
                    }
                }),
            )?);
            for kind in [OverlayKind::DayOffRequest, OverlayKind::ScheduledDayOff] {
                let tx = self.tx.clone();
                self.subscriptions.push(store.subscribe_overlays(
                    kind,
                    month,
                    Box::new(move |entries| {
                        if let Err(e) = tx.try_send(RemoteMessage::Overlays(kind, month, entries)) {
                            log::warn!("dropping {:?} update for {}: {}", kind, month, e);
                        }
                    }),
                )?);
            }
        }
        log::debug!("subscribed to {} month(s)", months.len());
        Ok(())
    }

    /// Apply every queued message. Returns how many were applied.
    pub fn drain(&self, grid: &mut ShiftGrid) -> usize {
        let mut applied = 0;
        while let Ok(message) = self.rx.try_recv() {
            grid.apply_remote(message);
            applied += 1;
        }
        applied
    }

    /// Next message, waiting for one to arrive.
    pub async fn recv(&self) -> Option<RemoteMessage> {
        self.rx.recv().await.ok()
    }

    pub fn unsubscribe(&mut self) {
        self.subscriptions.clear();
    }
}

impl Default for RemoteFeed {
    fn default() -> Self {
        Self::new()
    }
}
