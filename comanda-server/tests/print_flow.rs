//! End-to-end print flow: enqueue -> dispatch -> reconcile

use async_trait::async_trait;
use comanda_server::orders::{MemoryOrderGateway, OrderGateway};
use comanda_server::printing::renderer::wrap_words;
use comanda_server::printing::{
    DeviceConnector, PrintEvent, PrintStorage, PrintingError, PrintingResult,
};
use comanda_server::{Config, ServerState};
use parking_lot::Mutex;
use shared::models::{
    Order, OrderLine, OrderLineStatus, OrderStatus, PrintJobCreate, PrintJobStatus,
    PrinterDevice, PrinterDeviceCreate, PrinterTransport,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Records every ticket and fails the first `failures` sends
#[derive(Default)]
struct ScriptedDevice {
    failures: AtomicUsize,
    always_fail: bool,
    printed: Mutex<Vec<(i64, Vec<u8>)>>,
}

#[async_trait]
impl DeviceConnector for ScriptedDevice {
    async fn send(&self, device: &PrinterDevice, data: &[u8]) -> PrintingResult<()> {
        if self.always_fail
            || self
                .failures
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
        {
            return Err(PrintingError::Connectivity(format!(
                "{}: connection timed out",
                device.transport.endpoint()
            )));
        }
        self.printed.lock().push((device.id, data.to_vec()));
        Ok(())
    }
}

struct Kitchen {
    state: ServerState,
    gateway: Arc<MemoryOrderGateway>,
    device: Arc<ScriptedDevice>,
}

impl Kitchen {
    fn new(device: ScriptedDevice) -> Self {
        let mut config = Config::with_overrides("/tmp/comanda-print-flow", 0);
        config.max_print_attempts = 3;
        config.default_printer_id = None;
        config.sync_retry_failed = false;
        config.sync_ensure_jobs = true;

        let gateway = Arc::new(MemoryOrderGateway::new());
        let device = Arc::new(device);
        let state = ServerState::with_components(
            config,
            PrintStorage::open_in_memory().unwrap(),
            gateway.clone(),
            device.clone(),
        );
        Self {
            state,
            gateway,
            device,
        }
    }

    fn printer(&self, name: &str) -> PrinterDevice {
        self.state
            .registry
            .create(PrinterDeviceCreate {
                name: name.into(),
                transport: PrinterTransport::Network {
                    host: "192.168.1.60".into(),
                    port: 9100,
                },
                paper_width: 48,
                active: true,
            })
            .unwrap()
    }

    fn order(&self, id: i64, lines: Vec<OrderLine>) {
        self.gateway.upsert_order(Order {
            id,
            status: OrderStatus::Created,
            zone: Some("Salon".into()),
            table: Some("12".into()),
            staff: Some("Rosa".into()),
            created_at: 1_700_000_000_000,
            lines,
        });
    }

    fn enqueue(&self, order_item_id: i64, printer_id: Option<i64>) -> i64 {
        self.state
            .queue
            .enqueue(PrintJobCreate {
                order_item_id,
                priority: None,
                printer_id,
            })
            .unwrap()
            .id
    }

    async fn line_status(&self, line_id: i64) -> OrderLineStatus {
        self.gateway.get_line(line_id).await.unwrap().status
    }
}

fn line(id: i64, order_id: i64, name: &str) -> OrderLine {
    OrderLine {
        id,
        order_id,
        name: name.into(),
        quantity: 1,
        notes: None,
        takeaway: false,
        status: OrderLineStatus::Created,
        created_at: 1_700_000_000_000,
        preparing_at: None,
        served_at: None,
        canceled_at: None,
    }
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

#[tokio::test]
async fn printed_ticket_moves_line_to_preparing() {
    let kitchen = Kitchen::new(ScriptedDevice::default());
    kitchen.printer("Barra");
    kitchen.printer("Postres");
    let cocina = kitchen.printer("Cocina");
    assert_eq!(cocina.id, 3);

    kitchen.order(1, vec![line(42, 1, "Lomo Saltado")]);
    let job_id = kitchen.enqueue(42, Some(cocina.id));
    assert_eq!(
        kitchen.state.queue.get(job_id).unwrap().status,
        PrintJobStatus::Pending
    );

    let stats = kitchen.state.dispatcher.run_once().await.unwrap();
    assert_eq!(stats.printed, 1);

    let job = kitchen.state.queue.get(job_id).unwrap();
    assert_eq!(job.status, PrintJobStatus::Printed);
    assert_eq!(job.printer_id, Some(3));
    assert!(job.error_message.is_none());
    assert!(job.attempts >= 1);

    {
        let printed = kitchen.device.printed.lock();
        assert_eq!(printed.len(), 1);
        assert_eq!(printed[0].0, 3);
        assert!(contains(&printed[0].1, b"Lomo Saltado"));
        assert!(contains(&printed[0].1, b"PEDIDO #1"));
    }

    let report = kitchen.state.synchronizer.reconcile(1).await.unwrap();
    assert_eq!(report.advanced, 1);
    assert_eq!(kitchen.line_status(42).await, OrderLineStatus::Preparing);
}

#[tokio::test]
async fn manual_retries_succeed_on_last_attempt() {
    let kitchen = Kitchen::new(ScriptedDevice {
        failures: AtomicUsize::new(2),
        ..Default::default()
    });
    kitchen.printer("Cocina");
    kitchen.order(1, vec![line(42, 1, "Lomo Saltado")]);
    let job_id = kitchen.enqueue(42, None);

    for expected_attempts in 1..=2 {
        kitchen.state.dispatcher.run_once().await.unwrap();
        let job = kitchen.state.queue.get(job_id).unwrap();
        assert_eq!(job.status, PrintJobStatus::Failed);
        assert_eq!(job.attempts, expected_attempts);
        assert!(job.error_message.unwrap().contains("timed out"));

        let retried = kitchen.state.queue.retry(job_id).unwrap();
        assert_eq!(retried.status, PrintJobStatus::Pending);
        assert!(retried.error_message.is_none());
    }

    kitchen.state.dispatcher.run_once().await.unwrap();
    let job = kitchen.state.queue.get(job_id).unwrap();
    assert_eq!(job.status, PrintJobStatus::Printed);
    assert_eq!(job.attempts, 3);
    assert!(job.error_message.is_none());
}

#[tokio::test]
async fn exhausted_job_stays_failed() {
    let kitchen = Kitchen::new(ScriptedDevice {
        always_fail: true,
        ..Default::default()
    });
    kitchen.printer("Cocina");
    kitchen.order(1, vec![line(42, 1, "Lomo Saltado")]);
    let job_id = kitchen.enqueue(42, None);

    for round in 1..=3 {
        kitchen.state.dispatcher.run_once().await.unwrap();
        if round < 3 {
            kitchen.state.queue.retry(job_id).unwrap();
        }
    }

    let job = kitchen.state.queue.get(job_id).unwrap();
    assert_eq!(job.status, PrintJobStatus::Failed);
    assert_eq!(job.attempts, 3);
    assert!(matches!(
        kitchen.state.queue.retry(job_id),
        Err(PrintingError::ExhaustedRetries { attempts: 3, max_attempts: 3, .. })
    ));
    assert_eq!(kitchen.state.queue.get(job_id).unwrap(), job);

    let report = kitchen.state.synchronizer.reconcile(1).await.unwrap();
    assert_eq!(report.exhausted, 1);
    assert_eq!(kitchen.line_status(42).await, OrderLineStatus::Created);
    assert_eq!(kitchen.state.queue.summary().unwrap().failed, 1);
}

#[tokio::test]
async fn order_advances_once_when_all_lines_printed() {
    let kitchen = Kitchen::new(ScriptedDevice::default());
    kitchen.printer("Cocina");

    let mut cancelled = line(73, 7, "Agua");
    cancelled.status = OrderLineStatus::Canceled;
    kitchen.order(
        7,
        vec![
            line(70, 7, "Ceviche"),
            line(71, 7, "Ají de Gallina"),
            line(72, 7, "Chicha Morada"),
            cancelled,
        ],
    );
    let mut events = kitchen.state.events.subscribe();

    // First pass enqueues the missing tickets
    let report = kitchen.state.synchronizer.reconcile(7).await.unwrap();
    assert_eq!(report.enqueued, 3);
    assert!(!report.order_advanced);

    kitchen.state.dispatcher.run_once().await.unwrap();

    let sync = kitchen.state.synchronizer.clone();
    let (a, b) = tokio::join!(sync.reconcile(7), kitchen.state.synchronizer.reconcile(7));
    let (a, b) = (a.unwrap(), b.unwrap());
    assert_eq!(a.advanced + b.advanced, 3);
    assert!(a.order_advanced ^ b.order_advanced);

    let again = kitchen.state.synchronizer.reconcile(7).await.unwrap();
    assert!(!again.changed_anything());

    let order = kitchen.gateway.get_order(7).await.unwrap();
    assert_eq!(order.status, OrderStatus::Preparing);
    assert_eq!(kitchen.line_status(73).await, OrderLineStatus::Canceled);

    let mut ready = 0;
    while let Ok(event) = events.try_recv() {
        if matches!(event, PrintEvent::OrderReady { order_id: 7 }) {
            ready += 1;
        }
    }
    assert_eq!(ready, 1);
}

#[tokio::test]
async fn cancelling_a_line_after_preparing_never_reverts_the_order() {
    let kitchen = Kitchen::new(ScriptedDevice::default());
    kitchen.printer("Cocina");
    kitchen.order(8, vec![line(80, 8, "Anticuchos"), line(81, 8, "Picarones")]);

    kitchen.state.synchronizer.reconcile(8).await.unwrap();
    kitchen.state.dispatcher.run_once().await.unwrap();
    assert!(kitchen.state.synchronizer.reconcile(8).await.unwrap().order_advanced);

    kitchen
        .gateway
        .set_line_status(81, OrderLineStatus::Canceled)
        .unwrap();
    let report = kitchen.state.synchronizer.reconcile(8).await.unwrap();
    assert!(!report.changed_anything());

    let order = kitchen.gateway.get_order(8).await.unwrap();
    assert_eq!(order.status, OrderStatus::Preparing);
    assert_eq!(kitchen.line_status(80).await, OrderLineStatus::Preparing);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_claims_have_one_winner() {
    let kitchen = Kitchen::new(ScriptedDevice::default());
    let job_id = kitchen.enqueue(1, None);

    let claims: Vec<_> = (1..=16)
        .map(|printer_id| {
            let queue = kitchen.state.queue.clone();
            tokio::spawn(async move { queue.claim(job_id, printer_id) })
        })
        .collect();

    let mut winners = 0;
    let mut conflicts = 0;
    for claim in claims {
        match claim.await.unwrap() {
            Ok(_) => winners += 1,
            Err(PrintingError::ConcurrencyConflict(_)) => conflicts += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert_eq!(winners, 1);
    assert_eq!(conflicts, 15);

    let job = kitchen.state.queue.get(job_id).unwrap();
    assert_eq!(job.status, PrintJobStatus::InProgress);
    assert_eq!(job.attempts, 1);
}

#[test]
fn long_dish_name_wraps_within_narrow_column() {
    let lines = wrap_words("Ensalada Mixta de la Casa con Palta", 14);
    assert!(lines.len() >= 2);
    assert!(lines.iter().all(|l| l.chars().count() <= 14));
    assert_eq!(lines.join(" "), "Ensalada Mixta de la Casa con Palta");
}
