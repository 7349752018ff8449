//! Print dispatcher
//!
//! Background worker that drains the PENDING queue onto printer devices.
//! Woken by the queue on enqueue/retry and by a poll interval.
//!
//! Devices are serviced concurrently; each device prints its jobs strictly
//! one after another under the registry's per-device async mutex, which
//! connection tests take as well.

use futures::future::join_all;
use shared::models::{PrintJob, PrinterDevice};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use super::error::{PrintingError, PrintingResult};
use super::executor::PrintExecutor;
use super::queue::PrintQueue;
use super::registry::PrinterRegistry;
use super::types::OrderContext;
use crate::orders::OrderGateway;

/// Counters for one dispatch pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    pub printed: usize,
    pub failed: usize,
    /// Jobs left PENDING because no usable device was found
    pub skipped: usize,
    /// Jobs claimed by someone else first
    pub conflicts: usize,
    /// Jobs whose claim failed for another reason (storage, exhausted budget)
    pub errors: usize,
}

enum JobOutcome {
    Printed,
    Failed,
    Conflict,
    ClaimError,
}

#[derive(Clone)]
pub struct PrintDispatcher {
    queue: PrintQueue,
    registry: PrinterRegistry,
    executor: PrintExecutor,
    gateway: Arc<dyn OrderGateway>,
    default_printer_id: Option<i64>,
    poll_interval: Duration,
}

impl PrintDispatcher {
    pub fn new(
        queue: PrintQueue,
        registry: PrinterRegistry,
        executor: PrintExecutor,
        gateway: Arc<dyn OrderGateway>,
    ) -> Self {
        Self {
            queue,
            registry,
            executor,
            gateway,
            default_printer_id: None,
            poll_interval: Duration::from_secs(2),
        }
    }

    /// Device used for jobs without a pinned printer
    pub fn with_default_printer(mut self, printer_id: Option<i64>) -> Self {
        self.default_printer_id = printer_id;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval.max(Duration::from_millis(10));
        self
    }

    /// Run until cancelled
    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            poll_ms = self.poll_interval.as_millis() as u64,
            default_printer_id = ?self.default_printer_id,
            "Print dispatcher started"
        );
        let wakeup = self.queue.wakeup();
        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Print dispatcher received shutdown signal");
                    break;
                }
                _ = wakeup.notified() => {}
                _ = ticker.tick() => {}
            }

            if let Err(e) = self.run_once().await {
                error!(error = %e, "Dispatch pass failed");
            }
        }
    }

    /// One pass over the current PENDING queue
    pub async fn run_once(&self) -> PrintingResult<DispatchStats> {
        let pending = self.queue.pending_queue()?;
        if pending.is_empty() {
            return Ok(DispatchStats::default());
        }

        let printers: HashMap<i64, PrinterDevice> = self
            .registry
            .list()?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();
        let fallback = printers
            .values()
            .filter(|p| p.active)
            .min_by_key(|p| p.id)
            .map(|p| p.id);

        let mut stats = DispatchStats::default();
        let mut groups: BTreeMap<i64, Vec<PrintJob>> = BTreeMap::new();
        for job in pending {
            match self.resolve_device(&job, &printers, fallback) {
                Some(printer_id) => groups.entry(printer_id).or_default().push(job),
                None => stats.skipped += 1,
            }
        }

        let passes = groups
            .into_iter()
            .map(|(printer_id, jobs)| self.service_device(printer_id, jobs));
        for device_stats in join_all(passes).await {
            stats.printed += device_stats.printed;
            stats.failed += device_stats.failed;
            stats.skipped += device_stats.skipped;
            stats.conflicts += device_stats.conflicts;
            stats.errors += device_stats.errors;
        }

        if stats.printed + stats.failed + stats.errors > 0 {
            info!(
                printed = stats.printed,
                failed = stats.failed,
                skipped = stats.skipped,
                errors = stats.errors,
                "Dispatch pass finished"
            );
        }
        Ok(stats)
    }

    /// Pinned printer, else the configured default, else the lowest-id active one
    ///
    /// Only the pin requested at enqueue counts; the device of an earlier
    /// failed attempt does not bind a retried job.
    fn resolve_device(
        &self,
        job: &PrintJob,
        printers: &HashMap<i64, PrinterDevice>,
        fallback: Option<i64>,
    ) -> Option<i64> {
        let target = job
            .pinned_printer_id
            .or(self.default_printer_id)
            .or(fallback);
        let Some(printer_id) = target else {
            warn!(job_id = job.id, "No active printer available, job stays pending");
            return None;
        };

        match printers.get(&printer_id) {
            Some(device) if device.active => Some(printer_id),
            Some(_) => {
                warn!(job_id = job.id, printer_id, "Printer is inactive, job stays pending");
                None
            }
            None => {
                warn!(job_id = job.id, printer_id, "Printer not found, job stays pending");
                None
            }
        }
    }

    async fn service_device(&self, printer_id: i64, jobs: Vec<PrintJob>) -> DispatchStats {
        let lock = self.registry.device_lock(printer_id);
        let _guard = lock.lock().await;

        let mut stats = DispatchStats::default();
        let total = jobs.len();
        for (done, job) in jobs.into_iter().enumerate() {
            // Re-read per job: the device may be deactivated or removed mid-pass
            let device = match self.registry.get(printer_id) {
                Ok(device) if device.active => device,
                Ok(_) => {
                    warn!(
                        printer_id,
                        remaining = total - done,
                        "Printer deactivated, remaining jobs stay pending"
                    );
                    stats.skipped += total - done;
                    break;
                }
                Err(e) => {
                    warn!(
                        printer_id,
                        remaining = total - done,
                        error = %e,
                        "Printer unavailable, remaining jobs stay pending"
                    );
                    stats.skipped += total - done;
                    break;
                }
            };

            match self.dispatch_job(&device, &job).await {
                JobOutcome::Printed => stats.printed += 1,
                JobOutcome::Failed => stats.failed += 1,
                JobOutcome::Conflict => stats.conflicts += 1,
                JobOutcome::ClaimError => stats.errors += 1,
            }
        }
        stats
    }

    /// Claim, render, send and settle one job. Never returns an error.
    #[instrument(skip(self, device, job), fields(job_id = job.id, printer_id = device.id))]
    async fn dispatch_job(&self, device: &PrinterDevice, job: &PrintJob) -> JobOutcome {
        let claimed = match self.queue.claim(job.id, device.id) {
            Ok(claimed) => claimed,
            Err(PrintingError::ConcurrencyConflict(_)) => {
                debug!("Job already claimed elsewhere");
                return JobOutcome::Conflict;
            }
            Err(e) => {
                warn!(error = %e, "Failed to claim print job");
                return JobOutcome::ClaimError;
            }
        };

        match self.send_ticket(device, &claimed).await {
            Ok(()) => {
                if let Err(e) = self.queue.complete(claimed.id) {
                    error!(error = %e, "Failed to mark print job as printed");
                    return JobOutcome::Failed;
                }
                if let Err(e) = self.registry.touch(device.id) {
                    warn!(error = %e, "Failed to update printer last use");
                }
                JobOutcome::Printed
            }
            Err(e) => {
                if let Err(store_err) = self.queue.fail(claimed.id, e.to_string()) {
                    error!(error = %store_err, "Failed to mark print job as failed");
                }
                JobOutcome::Failed
            }
        }
    }

    async fn send_ticket(&self, device: &PrinterDevice, job: &PrintJob) -> PrintingResult<()> {
        let line = self.gateway.get_line(job.order_item_id).await?;
        let order = self.gateway.get_order(line.order_id).await?;
        let ctx = OrderContext::from(&order);
        self.executor.print_line(device, &line, &ctx).await?;
        Ok(())
    }
}
