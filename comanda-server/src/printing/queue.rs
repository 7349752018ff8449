//! Print job queue
//!
//! Owns the print job state machine:
//!
//! ```text
//! PENDING --claim--> IN_PROGRESS --complete--> PRINTED
//! IN_PROGRESS --fail--> FAILED --retry--> PENDING
//! {PENDING, FAILED} --cancel--> CANCELLED
//! ```
//!
//! Every transition is a read-check-write inside one redb write transaction.
//! redb admits one writer at a time, so a transition always observes the
//! latest committed state and two claims on the same job cannot both win.

use shared::models::{
    PrintJob, PrintJobCreate, PrintJobQuery, PrintJobStatus, PrintJobSummary,
};
use shared::util::now_millis;
use redb::WriteTransaction;
use std::sync::Arc;
use tokio::sync::Notify;
use tracing::{debug, info, warn};

use super::error::{PrintingError, PrintingResult};
use super::events::{PrintEvent, PrintEventBus};
use super::storage::PrintStorage;

/// Durable print job queue
#[derive(Clone)]
pub struct PrintQueue {
    storage: PrintStorage,
    events: PrintEventBus,
    wakeup: Arc<Notify>,
    max_attempts: u32,
}

impl PrintQueue {
    pub fn new(storage: PrintStorage, events: PrintEventBus, max_attempts: u32) -> Self {
        Self {
            storage,
            events,
            wakeup: Arc::new(Notify::new()),
            max_attempts: max_attempts.max(1),
        }
    }

    /// Signal raised whenever a job becomes PENDING
    pub fn wakeup(&self) -> Arc<Notify> {
        self.wakeup.clone()
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Create a PENDING job for an order line
    ///
    /// A line may have several jobs (reprints); the newest one is authoritative.
    pub fn enqueue(&self, req: PrintJobCreate) -> PrintingResult<PrintJob> {
        self.check_pin(&req)?;
        let txn = self.storage.begin_write()?;
        let job = self.insert(&txn, req)?;
        txn.commit()?;

        self.announce(&job);
        Ok(job)
    }

    /// Create a PENDING job only if the line has no job at all
    ///
    /// The existence check and the insert share one write transaction, so
    /// overlapping reconciliation passes create at most one job per line.
    pub fn enqueue_if_absent(&self, req: PrintJobCreate) -> PrintingResult<Option<PrintJob>> {
        self.check_pin(&req)?;
        let txn = self.storage.begin_write()?;
        if self.storage.item_has_jobs(&txn, req.order_item_id)? {
            debug!(order_item_id = req.order_item_id, "Line already has a print job");
            return Ok(None);
        }
        let job = self.insert(&txn, req)?;
        txn.commit()?;

        self.announce(&job);
        Ok(Some(job))
    }

    fn check_pin(&self, req: &PrintJobCreate) -> PrintingResult<()> {
        match req.printer_id {
            Some(printer_id) if self.storage.get_printer(printer_id)?.is_none() => {
                Err(PrintingError::PrinterNotFound(printer_id))
            }
            _ => Ok(()),
        }
    }

    fn insert(&self, txn: &WriteTransaction, req: PrintJobCreate) -> PrintingResult<PrintJob> {
        let now = now_millis();
        let job = PrintJob {
            id: self.storage.next_job_id(txn)?,
            order_item_id: req.order_item_id,
            pinned_printer_id: req.printer_id,
            printer_id: req.printer_id,
            status: PrintJobStatus::Pending,
            attempts: 0,
            max_attempts: self.max_attempts,
            error_message: None,
            priority: req.priority.unwrap_or(0),
            created_at: now,
            updated_at: now,
            printed_at: None,
        };
        self.storage.store_job(txn, &job)?;
        Ok(job)
    }

    fn announce(&self, job: &PrintJob) {
        info!(
            job_id = job.id,
            order_item_id = job.order_item_id,
            priority = job.priority,
            pinned_printer_id = ?job.pinned_printer_id,
            "Print job enqueued"
        );
        self.publish(job);
        self.wakeup.notify_one();
    }

    pub fn get(&self, id: i64) -> PrintingResult<PrintJob> {
        self.storage
            .get_job(id)?
            .ok_or(PrintingError::JobNotFound(id))
    }

    /// Jobs matching the filter, newest first
    pub fn list(&self, query: &PrintJobQuery) -> PrintingResult<Vec<PrintJob>> {
        let mut jobs: Vec<PrintJob> = match query.order_item_id {
            Some(item) => self.storage.jobs_for_item(item)?,
            None => self.storage.list_jobs()?,
        };
        jobs.retain(|j| query.matches(j));
        jobs.sort_by_key(|j| std::cmp::Reverse((j.created_at, j.id)));
        Ok(jobs)
    }

    /// Most recently created job for an order line
    pub fn latest_for_item(&self, order_item_id: i64) -> PrintingResult<Option<PrintJob>> {
        Ok(self.storage.jobs_for_item(order_item_id)?.pop())
    }

    /// PENDING jobs in dispatch order: priority desc, then oldest first
    pub fn pending_queue(&self) -> PrintingResult<Vec<PrintJob>> {
        let mut jobs: Vec<PrintJob> = self
            .storage
            .list_jobs()?
            .into_iter()
            .filter(|j| j.status == PrintJobStatus::Pending)
            .collect();
        jobs.sort_by_key(|j| (std::cmp::Reverse(j.priority), j.created_at, j.id));
        Ok(jobs)
    }

    /// Atomically move PENDING -> IN_PROGRESS for one device
    ///
    /// Consumes one attempt and records the device in `printer_id`; the pin
    /// requested at enqueue is left untouched. Losing a race yields
    /// `ConcurrencyConflict`.
    pub fn claim(&self, id: i64, printer_id: i64) -> PrintingResult<PrintJob> {
        let job = self.transition(id, |job| {
            if job.status != PrintJobStatus::Pending {
                return Err(PrintingError::ConcurrencyConflict(id));
            }
            if job.attempts >= job.max_attempts {
                return Err(PrintingError::ExhaustedRetries {
                    id,
                    attempts: job.attempts,
                    max_attempts: job.max_attempts,
                });
            }
            job.status = PrintJobStatus::InProgress;
            job.attempts += 1;
            job.printer_id = Some(printer_id);
            job.error_message = None;
            Ok(())
        })?;
        debug!(job_id = id, printer_id, attempt = job.attempts, "Print job claimed");
        Ok(job)
    }

    /// IN_PROGRESS -> PRINTED
    pub fn complete(&self, id: i64) -> PrintingResult<PrintJob> {
        let job = self.transition(id, |job| {
            require(job, PrintJobStatus::InProgress, "complete")?;
            job.status = PrintJobStatus::Printed;
            job.error_message = None;
            job.printed_at = Some(now_millis());
            Ok(())
        })?;
        info!(job_id = id, attempts = job.attempts, "Print job printed");
        Ok(job)
    }

    /// IN_PROGRESS -> FAILED with a descriptive message
    pub fn fail(&self, id: i64, message: impl Into<String>) -> PrintingResult<PrintJob> {
        let mut message = message.into();
        if message.trim().is_empty() {
            message = "Unknown print failure".to_string();
        }
        let job = self.transition(id, |job| {
            require(job, PrintJobStatus::InProgress, "fail")?;
            job.status = PrintJobStatus::Failed;
            job.error_message = Some(message);
            Ok(())
        })?;
        warn!(
            job_id = id,
            attempts = job.attempts,
            max_attempts = job.max_attempts,
            error = job.error_message.as_deref().unwrap_or_default(),
            "Print job failed"
        );
        Ok(job)
    }

    /// FAILED -> PENDING, authorizing attempt `attempts + 1`
    pub fn retry(&self, id: i64) -> PrintingResult<PrintJob> {
        let job = self.transition(id, |job| {
            require(job, PrintJobStatus::Failed, "retry")?;
            if !job.has_retry_budget() {
                return Err(PrintingError::ExhaustedRetries {
                    id,
                    attempts: job.attempts,
                    max_attempts: job.max_attempts,
                });
            }
            job.status = PrintJobStatus::Pending;
            job.error_message = None;
            Ok(())
        })?;
        info!(job_id = id, next_attempt = job.attempts + 1, "Print job queued for retry");
        self.wakeup.notify_one();
        Ok(job)
    }

    /// {PENDING, FAILED} -> CANCELLED
    pub fn cancel(&self, id: i64) -> PrintingResult<PrintJob> {
        let job = self.transition(id, |job| {
            if !job.status.is_cancellable() {
                return Err(PrintingError::InvalidState {
                    id,
                    status: job.status,
                    action: "cancel",
                });
            }
            job.status = PrintJobStatus::Cancelled;
            Ok(())
        })?;
        info!(job_id = id, "Print job cancelled");
        Ok(job)
    }

    /// Delete PRINTED and CANCELLED jobs, returning how many were removed
    pub fn clear_completed(&self) -> PrintingResult<usize> {
        let completed: Vec<PrintJob> = self
            .storage
            .list_jobs()?
            .into_iter()
            .filter(|j| j.status.is_terminal())
            .collect();

        let txn = self.storage.begin_write()?;
        let mut deleted = 0;
        for job in &completed {
            // Re-read inside the write transaction; skip anything that moved
            match self.storage.load_job(&txn, job.id)? {
                Some(current) if current.status.is_terminal() => {
                    self.storage.delete_job(&txn, &current)?;
                    deleted += 1;
                }
                _ => {}
            }
        }
        txn.commit()?;

        info!(deleted, "Cleared completed print jobs");
        Ok(deleted)
    }

    /// Job counts by status
    pub fn summary(&self) -> PrintingResult<PrintJobSummary> {
        let mut summary = PrintJobSummary::default();
        for job in self.storage.list_jobs()? {
            summary.record(job.status);
        }
        Ok(summary)
    }

    /// Apply a checked mutation to one job in a single write transaction
    fn transition<F>(&self, id: i64, mutate: F) -> PrintingResult<PrintJob>
    where
        F: FnOnce(&mut PrintJob) -> PrintingResult<()>,
    {
        let txn = self.storage.begin_write()?;
        let mut job = self
            .storage
            .load_job(&txn, id)?
            .ok_or(PrintingError::JobNotFound(id))?;

        // Dropping the transaction on error aborts it
        mutate(&mut job)?;
        job.updated_at = now_millis();

        self.storage.store_job(&txn, &job)?;
        txn.commit()?;

        self.publish(&job);
        Ok(job)
    }

    fn publish(&self, job: &PrintJob) {
        self.events.publish(PrintEvent::JobUpdated { job: job.clone() });
    }
}

fn require(job: &PrintJob, expected: PrintJobStatus, action: &'static str) -> PrintingResult<()> {
    if job.status == expected {
        Ok(())
    } else {
        Err(PrintingError::InvalidState {
            id: job.id,
            status: job.status,
            action,
        })
    }
}
