//! Printer registry
//!
//! Single owner of printer device records and of the per-device locks that
//! keep every write to one physical printer strictly serial.

use comanda_printer::self_test_page;
use dashmap::DashMap;
use shared::models::{
    ConnectionTestResult, PrinterDevice, PrinterDeviceCreate, PrinterDeviceUpdate,
    PrinterTransport,
};
use shared::util::now_millis;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};

use super::error::{PrintingError, PrintingResult};
use super::executor::DeviceConnector;
use super::storage::PrintStorage;

const MAX_NAME_LEN: usize = 64;
const PAPER_WIDTH_RANGE: std::ops::RangeInclusive<usize> = 16..=96;

#[derive(Clone)]
pub struct PrinterRegistry {
    storage: PrintStorage,
    connector: Arc<dyn DeviceConnector>,
    device_locks: Arc<DashMap<i64, Arc<Mutex<()>>>>,
}

impl PrinterRegistry {
    pub fn new(storage: PrintStorage, connector: Arc<dyn DeviceConnector>) -> Self {
        Self {
            storage,
            connector,
            device_locks: Arc::new(DashMap::new()),
        }
    }

    /// Lock held by anything that writes to the device (tickets, test pages)
    pub fn device_lock(&self, printer_id: i64) -> Arc<Mutex<()>> {
        self.device_locks
            .entry(printer_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// All printers, lowest id first
    pub fn list(&self) -> PrintingResult<Vec<PrinterDevice>> {
        Ok(self.storage.list_printers()?)
    }

    pub fn get(&self, id: i64) -> PrintingResult<PrinterDevice> {
        self.storage
            .get_printer(id)?
            .ok_or(PrintingError::PrinterNotFound(id))
    }

    pub fn create(&self, req: PrinterDeviceCreate) -> PrintingResult<PrinterDevice> {
        let name = req.name.trim().to_string();
        validate(&name, &req.transport, req.paper_width)?;

        let txn = self.storage.begin_write()?;
        let printer = PrinterDevice {
            id: self.storage.next_printer_id(&txn)?,
            name,
            transport: req.transport,
            paper_width: req.paper_width,
            active: req.active,
            last_used_at: None,
            created_at: now_millis(),
        };
        self.storage.store_printer(&txn, &printer)?;
        txn.commit()?;

        info!(
            printer_id = printer.id,
            name = %printer.name,
            endpoint = %printer.transport.endpoint(),
            "Printer registered"
        );
        Ok(printer)
    }

    /// Apply a partial update; omitted fields keep their value
    pub fn update(&self, id: i64, req: PrinterDeviceUpdate) -> PrintingResult<PrinterDevice> {
        self.modify(id, |printer| {
            if let Some(name) = req.name {
                printer.name = name.trim().to_string();
            }
            if let Some(transport) = req.transport {
                printer.transport = transport;
            }
            if let Some(width) = req.paper_width {
                printer.paper_width = width;
            }
            validate(&printer.name, &printer.transport, printer.paper_width)
        })
    }

    /// Remove a printer that no PENDING job is pinned to and no IN_PROGRESS job uses
    pub fn delete(&self, id: i64) -> PrintingResult<()> {
        let live = self
            .storage
            .list_jobs()?
            .iter()
            .filter(|j| j.holds_printer(id))
            .count();
        if live > 0 {
            return Err(PrintingError::InUse { id, jobs: live });
        }

        let txn = self.storage.begin_write()?;
        if !self.storage.delete_printer(&txn, id)? {
            return Err(PrintingError::PrinterNotFound(id));
        }
        txn.commit()?;

        info!(printer_id = id, "Printer deleted");
        Ok(())
    }

    pub fn activate(&self, id: i64) -> PrintingResult<PrinterDevice> {
        self.set_active(id, true)
    }

    pub fn deactivate(&self, id: i64) -> PrintingResult<PrinterDevice> {
        self.set_active(id, false)
    }

    fn set_active(&self, id: i64, active: bool) -> PrintingResult<PrinterDevice> {
        let current = self.get(id)?;
        if current.active == active {
            return Ok(current);
        }
        let printer = self.modify(id, |p| {
            p.active = active;
            Ok(())
        })?;
        info!(printer_id = id, active, "Printer activation changed");
        Ok(printer)
    }

    /// Send a short self-test page to the device
    ///
    /// Transport failures are reported in the result, not as an error.
    #[instrument(skip(self))]
    pub async fn test_connection(&self, id: i64) -> PrintingResult<ConnectionTestResult> {
        let printer = self.get(id)?;
        if !printer.active {
            return Err(PrintingError::InactiveDevice(id));
        }

        let page = self_test_page(&printer.name, printer.paper_width);
        let lock = self.device_lock(id);
        let _guard = lock.lock().await;
        match self.connector.send(&printer, &page).await {
            Ok(()) => {
                self.touch(id)?;
                info!(printer_id = id, "Printer test page sent");
                Ok(ConnectionTestResult::ok(format!(
                    "Test page sent to {}",
                    printer.transport.endpoint()
                )))
            }
            Err(e) => {
                warn!(printer_id = id, error = %e, "Printer connection test failed");
                Ok(ConnectionTestResult::failed(e.to_string()))
            }
        }
    }

    /// Record successful use of a printer
    pub fn touch(&self, id: i64) -> PrintingResult<PrinterDevice> {
        self.modify(id, |p| {
            p.last_used_at = Some(now_millis());
            Ok(())
        })
    }

    fn modify<F>(&self, id: i64, mutate: F) -> PrintingResult<PrinterDevice>
    where
        F: FnOnce(&mut PrinterDevice) -> PrintingResult<()>,
    {
        let txn = self.storage.begin_write()?;
        let mut printer = self
            .storage
            .load_printer(&txn, id)?
            .ok_or(PrintingError::PrinterNotFound(id))?;
        mutate(&mut printer)?;
        self.storage.store_printer(&txn, &printer)?;
        txn.commit()?;
        Ok(printer)
    }
}

fn validate(name: &str, transport: &PrinterTransport, paper_width: usize) -> PrintingResult<()> {
    if name.is_empty() {
        return Err(PrintingError::Validation("name must not be empty".into()));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(PrintingError::Validation(format!(
            "name must be at most {} characters",
            MAX_NAME_LEN
        )));
    }
    if !PAPER_WIDTH_RANGE.contains(&paper_width) {
        return Err(PrintingError::Validation(format!(
            "paper_width must be between {} and {}",
            PAPER_WIDTH_RANGE.start(),
            PAPER_WIDTH_RANGE.end()
        )));
    }
    match transport {
        PrinterTransport::Network { host, port } => {
            if host.trim().is_empty() {
                return Err(PrintingError::Validation("host must not be empty".into()));
            }
            if *port == 0 {
                return Err(PrintingError::Validation("port must be greater than 0".into()));
            }
        }
        PrinterTransport::Serial { port, baud_rate } => {
            if port.trim().is_empty() {
                return Err(PrintingError::Validation(
                    "serial port must not be empty".into(),
                ));
            }
            if *baud_rate == 0 {
                return Err(PrintingError::Validation(
                    "baud_rate must be greater than 0".into(),
                ));
            }
        }
    }
    Ok(())
}
