use std::sync::Arc;

use crate::core::tasks::{BackgroundTasks, TaskKind};
use crate::core::{Config, Result, ServerError};
use crate::orders::{HttpOrderGateway, MemoryOrderGateway, OrderGateway};
use crate::printing::{
    DeviceConnector, OrderSynchronizer, PrintDispatcher, PrintEventBus, PrintExecutor,
    PrintQueue, PrintStorage, PrinterRegistry, RenderOptions, SyncOptions, TransportConnector,
};

/// Server state: shared handles to every component
///
/// Cloning is cheap; every field is a handle.
///
/// | Field | Role |
/// |-------|------|
/// | config | immutable configuration |
/// | queue | print job state machine |
/// | registry | printer devices |
/// | dispatcher | sends PENDING jobs to devices |
/// | synchronizer | projects print outcomes onto orders |
/// | events | `PrintEvent` broadcast |
/// | gateway | order service access |
#[derive(Clone)]
pub struct ServerState {
    pub config: Config,
    pub queue: PrintQueue,
    pub registry: PrinterRegistry,
    pub dispatcher: PrintDispatcher,
    pub synchronizer: OrderSynchronizer,
    pub events: PrintEventBus,
    pub gateway: Arc<dyn OrderGateway>,
}

impl ServerState {
    /// Initialize from configuration
    ///
    /// 1. Work directory and `print.redb`
    /// 2. Order gateway (HTTP when `ORDER_SERVICE_URL` is set, in-memory otherwise)
    /// 3. Printing components
    pub fn initialize(config: &Config) -> Result<Self> {
        std::fs::create_dir_all(&config.work_dir).map_err(|e| {
            ServerError::Config(format!("cannot create work dir {}: {}", config.work_dir, e))
        })?;

        let db_path = config.database_path();
        let storage =
            PrintStorage::open(&db_path).map_err(|e| ServerError::Storage(e.to_string()))?;
        tracing::info!(path = %db_path.display(), "Print storage opened");

        let gateway: Arc<dyn OrderGateway> = match &config.order_service_url {
            Some(url) => {
                tracing::info!(url = %url, "Using remote order service");
                Arc::new(
                    HttpOrderGateway::new(url.clone(), config.gateway_timeout())
                        .map_err(|e| ServerError::Config(e.to_string()))?,
                )
            }
            None => {
                tracing::warn!("ORDER_SERVICE_URL not set, using in-memory order gateway");
                Arc::new(MemoryOrderGateway::new())
            }
        };

        let connector = Arc::new(TransportConnector::new(config.print_timeout()));
        Ok(Self::with_components(
            config.clone(),
            storage,
            gateway,
            connector,
        ))
    }

    /// Wire the printing components around an existing storage, gateway and device connector
    pub fn with_components(
        config: Config,
        storage: PrintStorage,
        gateway: Arc<dyn OrderGateway>,
        connector: Arc<dyn DeviceConnector>,
    ) -> Self {
        let events = PrintEventBus::default();
        let queue = PrintQueue::new(storage.clone(), events.clone(), config.max_print_attempts);
        let registry = PrinterRegistry::new(storage, connector.clone());
        let executor = PrintExecutor::new(
            connector,
            RenderOptions {
                double_size_items: config.double_size_items,
                utc_offset_minutes: config.timezone_offset_minutes,
            },
        );
        let dispatcher = PrintDispatcher::new(
            queue.clone(),
            registry.clone(),
            executor,
            gateway.clone(),
        )
        .with_default_printer(config.default_printer_id)
        .with_poll_interval(config.dispatch_interval());
        let synchronizer = OrderSynchronizer::new(
            queue.clone(),
            gateway.clone(),
            events.clone(),
            SyncOptions {
                retry_failed: config.sync_retry_failed,
                ensure_jobs: config.sync_ensure_jobs,
            },
        );

        Self {
            config,
            queue,
            registry,
            dispatcher,
            synchronizer,
            events,
            gateway,
        }
    }

    /// Start the dispatcher and, when enabled, periodic reconciliation
    pub fn start_background_tasks(&self) -> BackgroundTasks {
        let mut tasks = BackgroundTasks::new();

        let token = tasks.shutdown_token();
        tasks.spawn(
            "print_dispatcher",
            TaskKind::Worker,
            self.dispatcher.clone().run(token),
        );

        if let Some(interval) = self.config.sync_interval() {
            let synchronizer = self.synchronizer.clone();
            tasks.spawn_periodic("order_sync", interval, move || {
                let synchronizer = synchronizer.clone();
                async move {
                    if let Err(e) = synchronizer.reconcile_open_orders().await {
                        tracing::warn!(error = %e, "Periodic order reconciliation failed");
                    }
                }
            });
        }

        tasks.log_summary();
        tasks
    }
}
