//! Order-state synchronizer
//!
//! Projects print outcomes onto order line and order status. A line moves
//! CREATED -> PREPARING once its newest job is PRINTED; the order follows
//! when every non-cancelled line is PREPARING. All transitions are
//! compare-and-set, so passes may overlap and repeat freely.

use futures::future::join_all;
use shared::models::{
    OrderLine, OrderLineStatus, OrderStatus, PrintJobCreate, PrintJobStatus,
};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use super::error::{PrintingError, PrintingResult};
use super::events::{PrintEvent, PrintEventBus};
use super::queue::PrintQueue;
use super::types::{LineSyncError, SyncReport};
use crate::orders::OrderGateway;

/// Synchronizer policy switches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncOptions {
    /// Send FAILED jobs with remaining budget back to PENDING
    pub retry_failed: bool,
    /// Enqueue a job for CREATED lines that have none
    pub ensure_jobs: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            retry_failed: true,
            ensure_jobs: true,
        }
    }
}

enum LineOutcome {
    Advanced,
    /// Someone else moved the line first
    Raced,
    Retried,
    InFlight,
    Exhausted,
    Missing { enqueued: bool },
}

#[derive(Clone)]
pub struct OrderSynchronizer {
    queue: PrintQueue,
    gateway: Arc<dyn OrderGateway>,
    events: PrintEventBus,
    options: SyncOptions,
}

impl OrderSynchronizer {
    pub fn new(
        queue: PrintQueue,
        gateway: Arc<dyn OrderGateway>,
        events: PrintEventBus,
        options: SyncOptions,
    ) -> Self {
        Self {
            queue,
            gateway,
            events,
            options,
        }
    }

    /// One reconciliation pass over an order
    ///
    /// Only CREATED orders are reconciled; any other status yields an empty
    /// report without enqueueing or retrying tickets.
    #[instrument(skip(self))]
    pub async fn reconcile(&self, order_id: i64) -> PrintingResult<SyncReport> {
        let order = self.gateway.get_order(order_id).await?;
        let mut report = SyncReport::new(order_id);
        if order.status != OrderStatus::Created {
            debug!(order_id, status = %order.status, "Order is past the kitchen stage, skipping");
            return Ok(report);
        }

        let pending_lines: Vec<&OrderLine> = order
            .active_lines()
            .filter(|l| l.status == OrderLineStatus::Created)
            .collect();

        let outcomes = join_all(pending_lines.iter().map(|line| self.reconcile_line(line))).await;
        for (line, outcome) in pending_lines.iter().zip(outcomes) {
            match outcome {
                Ok(LineOutcome::Advanced) => report.advanced += 1,
                Ok(LineOutcome::Raced) => {}
                Ok(LineOutcome::Retried) => report.retried += 1,
                Ok(LineOutcome::InFlight) => report.in_flight += 1,
                Ok(LineOutcome::Exhausted) => report.exhausted += 1,
                Ok(LineOutcome::Missing { enqueued }) => {
                    report.missing += 1;
                    if enqueued {
                        report.enqueued += 1;
                    }
                }
                Err(e) => {
                    warn!(line_id = line.id, error = %e, "Line reconciliation failed");
                    report.errors.push(LineSyncError {
                        line_id: line.id,
                        message: e.to_string(),
                    });
                }
            }
        }

        report.order_advanced = self.advance_order(order_id).await?;
        if report.order_advanced {
            info!(order_id, "Order is ready for the kitchen");
            self.events.publish(PrintEvent::OrderReady { order_id });
        }

        if report.changed_anything() {
            info!(
                order_id,
                advanced = report.advanced,
                retried = report.retried,
                enqueued = report.enqueued,
                order_advanced = report.order_advanced,
                "Order reconciled"
            );
        }
        Ok(report)
    }

    /// Reconcile every CREATED order known to the gateway
    pub async fn reconcile_open_orders(&self) -> PrintingResult<Vec<SyncReport>> {
        let orders = self.gateway.list_open_orders().await?;
        let mut reports = Vec::with_capacity(orders.len());
        for order in orders {
            match self.reconcile(order.id).await {
                Ok(report) => reports.push(report),
                Err(e) => warn!(order_id = order.id, error = %e, "Order reconciliation failed"),
            }
        }
        Ok(reports)
    }

    async fn reconcile_line(&self, line: &OrderLine) -> PrintingResult<LineOutcome> {
        let Some(job) = self.queue.latest_for_item(line.id)? else {
            if !self.options.ensure_jobs {
                return Ok(LineOutcome::Missing { enqueued: false });
            }
            // An overlapping pass may have created it since the read above
            let created = self.queue.enqueue_if_absent(PrintJobCreate {
                order_item_id: line.id,
                priority: None,
                printer_id: None,
            })?;
            return Ok(LineOutcome::Missing {
                enqueued: created.is_some(),
            });
        };

        match job.status {
            PrintJobStatus::Printed => {
                let moved = self
                    .gateway
                    .transition_line(line.id, OrderLineStatus::Created, OrderLineStatus::Preparing)
                    .await?;
                if moved {
                    debug!(line_id = line.id, job_id = job.id, "Line moved to preparing");
                    Ok(LineOutcome::Advanced)
                } else {
                    Ok(LineOutcome::Raced)
                }
            }
            PrintJobStatus::Failed if self.options.retry_failed && job.has_retry_budget() => {
                match self.queue.retry(job.id) {
                    Ok(_) => Ok(LineOutcome::Retried),
                    Err(PrintingError::ExhaustedRetries { .. }) => Ok(LineOutcome::Exhausted),
                    // Another pass retried it between our read and write
                    Err(PrintingError::InvalidState { .. }) => Ok(LineOutcome::InFlight),
                    Err(e) => Err(e),
                }
            }
            PrintJobStatus::Failed => Ok(LineOutcome::Exhausted),
            PrintJobStatus::Pending | PrintJobStatus::InProgress => Ok(LineOutcome::InFlight),
            // Cancelled by an operator: never re-enqueued automatically
            PrintJobStatus::Cancelled => Ok(LineOutcome::Missing { enqueued: false }),
        }
    }

    /// Move the order CREATED -> PREPARING when every live line is PREPARING
    async fn advance_order(&self, order_id: i64) -> PrintingResult<bool> {
        let order = self.gateway.get_order(order_id).await?;
        if order.status != OrderStatus::Created || !order.all_lines_preparing() {
            return Ok(false);
        }
        Ok(self
            .gateway
            .transition_order(order_id, OrderStatus::Created, OrderStatus::Preparing)
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orders::MemoryOrderGateway;
    use crate::printing::storage::PrintStorage;
    use shared::models::Order;

    struct Fixture {
        queue: PrintQueue,
        gateway: Arc<MemoryOrderGateway>,
        events: PrintEventBus,
    }

    impl Fixture {
        fn new(line_ids: &[i64]) -> Self {
            let gateway = Arc::new(MemoryOrderGateway::new());
            gateway.upsert_order(Order {
                id: 1,
                status: OrderStatus::Created,
                zone: None,
                table: Some("7".into()),
                staff: None,
                created_at: 0,
                lines: line_ids.iter().map(|id| line(*id)).collect(),
            });
            let events = PrintEventBus::default();
            Self {
                queue: PrintQueue::new(
                    PrintStorage::open_in_memory().unwrap(),
                    events.clone(),
                    2,
                ),
                gateway,
                events,
            }
        }

        fn sync(&self, options: SyncOptions) -> OrderSynchronizer {
            OrderSynchronizer::new(
                self.queue.clone(),
                self.gateway.clone(),
                self.events.clone(),
                options,
            )
        }

        fn printed(&self, line_id: i64) {
            let job = self.enqueue(line_id);
            self.queue.claim(job.id, 1).unwrap();
            self.queue.complete(job.id).unwrap();
        }

        fn failed(&self, line_id: i64) -> i64 {
            let job = self.enqueue(line_id);
            self.queue.claim(job.id, 1).unwrap();
            self.queue.fail(job.id, "paper out").unwrap();
            job.id
        }

        fn enqueue(&self, line_id: i64) -> shared::models::PrintJob {
            self.queue
                .enqueue(PrintJobCreate {
                    order_item_id: line_id,
                    priority: None,
                    printer_id: None,
                })
                .unwrap()
        }

        async fn order(&self) -> Order {
            self.gateway.get_order(1).await.unwrap()
        }
    }

    fn line(id: i64) -> OrderLine {
        OrderLine {
            id,
            order_id: 1,
            name: format!("Plato {}", id),
            quantity: 1,
            notes: None,
            takeaway: false,
            status: OrderLineStatus::Created,
            created_at: 0,
            preparing_at: None,
            served_at: None,
            canceled_at: None,
        }
    }

    fn no_policies() -> SyncOptions {
        SyncOptions {
            retry_failed: false,
            ensure_jobs: false,
        }
    }

    #[tokio::test]
    async fn test_all_printed_advances_order_once() {
        let fx = Fixture::new(&[10, 11]);
        fx.printed(10);
        fx.printed(11);
        let mut rx = fx.events.subscribe();
        let sync = fx.sync(SyncOptions::default());

        let report = sync.reconcile(1).await.unwrap();
        assert_eq!(report.advanced, 2);
        assert!(report.order_advanced);
        assert_eq!(fx.order().await.status, OrderStatus::Preparing);

        let second = sync.reconcile(1).await.unwrap();
        assert!(!second.changed_anything());
        assert_eq!(second, SyncReport::new(1));

        let mut ready = 0;
        while let Ok(event) = rx.try_recv() {
            if matches!(event, PrintEvent::OrderReady { order_id: 1 }) {
                ready += 1;
            }
        }
        assert_eq!(ready, 1);
    }

    #[tokio::test]
    async fn test_partial_print_keeps_order_created() {
        let fx = Fixture::new(&[10, 11]);
        fx.printed(10);
        fx.enqueue(11);

        let report = fx.sync(SyncOptions::default()).reconcile(1).await.unwrap();
        assert_eq!(report.advanced, 1);
        assert_eq!(report.in_flight, 1);
        assert!(!report.order_advanced);

        let order = fx.order().await;
        assert_eq!(order.status, OrderStatus::Created);
        assert_eq!(order.lines[0].status, OrderLineStatus::Preparing);
        assert_eq!(order.lines[1].status, OrderLineStatus::Created);
    }

    #[tokio::test]
    async fn test_failed_job_retried_within_budget() {
        let fx = Fixture::new(&[10]);
        let job_id = fx.failed(10);
        let sync = fx.sync(SyncOptions::default());

        let report = sync.reconcile(1).await.unwrap();
        assert_eq!(report.retried, 1);
        assert_eq!(fx.queue.get(job_id).unwrap().status, PrintJobStatus::Pending);

        // Consume the last attempt
        fx.queue.claim(job_id, 1).unwrap();
        fx.queue.fail(job_id, "paper out").unwrap();

        let report = sync.reconcile(1).await.unwrap();
        assert_eq!(report.exhausted, 1);
        assert_eq!(fx.queue.get(job_id).unwrap().status, PrintJobStatus::Failed);
        assert_eq!(fx.order().await.lines[0].status, OrderLineStatus::Created);
    }

    #[tokio::test]
    async fn test_retry_policy_disabled() {
        let fx = Fixture::new(&[10]);
        let job_id = fx.failed(10);
        let report = fx.sync(no_policies()).reconcile(1).await.unwrap();
        assert_eq!(report.exhausted, 1);
        assert_eq!(fx.queue.get(job_id).unwrap().status, PrintJobStatus::Failed);
    }

    #[tokio::test]
    async fn test_missing_jobs() {
        let fx = Fixture::new(&[10]);

        let report = fx.sync(no_policies()).reconcile(1).await.unwrap();
        assert_eq!(report.missing, 1);
        assert_eq!(report.enqueued, 0);
        assert!(fx.queue.latest_for_item(10).unwrap().is_none());

        let report = fx.sync(SyncOptions::default()).reconcile(1).await.unwrap();
        assert_eq!(report.enqueued, 1);
        assert!(fx.queue.latest_for_item(10).unwrap().is_some());
    }

    #[tokio::test]
    async fn test_cancelled_job_not_reenqueued() {
        let fx = Fixture::new(&[10]);
        let job = fx.enqueue(10);
        fx.queue.cancel(job.id).unwrap();

        let report = fx.sync(SyncOptions::default()).reconcile(1).await.unwrap();
        assert_eq!(report.missing, 1);
        assert_eq!(report.enqueued, 0);
        assert_eq!(fx.queue.latest_for_item(10).unwrap().unwrap().id, job.id);
    }

    #[tokio::test]
    async fn test_newest_job_wins() {
        let fx = Fixture::new(&[10]);
        fx.printed(10);
        fx.enqueue(10);

        let report = fx.sync(SyncOptions::default()).reconcile(1).await.unwrap();
        assert_eq!(report.in_flight, 1);
        assert_eq!(report.advanced, 0);
    }

    #[tokio::test]
    async fn test_cancelled_lines_ignored() {
        let fx = Fixture::new(&[10, 11]);
        fx.printed(10);
        fx.gateway
            .set_line_status(11, OrderLineStatus::Canceled)
            .unwrap();

        let report = fx.sync(SyncOptions::default()).reconcile(1).await.unwrap();
        assert_eq!(report.missing, 0);
        assert!(report.order_advanced);
    }

    #[tokio::test]
    async fn test_closed_orders_are_left_alone() {
        for status in [OrderStatus::Cancelled, OrderStatus::Paid, OrderStatus::Served] {
            let fx = Fixture::new(&[10, 11]);
            let job_id = fx.failed(11);
            let mut order = fx.order().await;
            order.status = status;
            fx.gateway.upsert_order(order);

            let report = fx.sync(SyncOptions::default()).reconcile(1).await.unwrap();
            assert_eq!(report, SyncReport::new(1));
            assert!(fx.queue.latest_for_item(10).unwrap().is_none());
            assert_eq!(fx.queue.get(job_id).unwrap().status, PrintJobStatus::Failed);
            assert_eq!(fx.order().await.status, status);
        }
    }

    #[tokio::test]
    async fn test_overlapping_passes_enqueue_once() {
        let fx = Fixture::new(&[10, 11, 12]);
        let a = fx.sync(SyncOptions::default());
        let b = fx.sync(SyncOptions::default());

        let (ra, rb) = tokio::join!(a.reconcile(1), b.reconcile(1));
        let (ra, rb) = (ra.unwrap(), rb.unwrap());
        assert_eq!(ra.enqueued + rb.enqueued, 3);
        for line_id in [10, 11, 12] {
            assert_eq!(
                fx.queue
                    .list(&shared::models::PrintJobQuery {
                        status: None,
                        order_item_id: Some(line_id),
                    })
                    .unwrap()
                    .len(),
                1
            );
        }
    }

    #[tokio::test]
    async fn test_unknown_order() {
        let fx = Fixture::new(&[10]);
        let err = fx.sync(SyncOptions::default()).reconcile(99).await.unwrap_err();
        assert!(matches!(err, PrintingError::Gateway(_)));
    }

    #[tokio::test]
    async fn test_reconcile_open_orders() {
        let fx = Fixture::new(&[10]);
        fx.printed(10);
        let reports = fx
            .sync(SyncOptions::default())
            .reconcile_open_orders()
            .await
            .unwrap();
        assert_eq!(reports.len(), 1);
        assert!(reports[0].order_advanced);

        let reports = fx
            .sync(SyncOptions::default())
            .reconcile_open_orders()
            .await
            .unwrap();
        assert!(reports.is_empty());
    }
}
