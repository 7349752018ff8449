//! redb-based storage for print jobs and printer devices

use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition, WriteTransaction};
use shared::models::{PrintJob, PrinterDevice};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Print jobs table: key = job id, value = JSON
const PRINT_JOBS_TABLE: TableDefinition<i64, &[u8]> = TableDefinition::new("print_jobs");

/// Index: (order_item_id, job_id) -> ()
const PRINT_JOBS_BY_ITEM_TABLE: TableDefinition<(i64, i64), ()> =
    TableDefinition::new("print_jobs_by_item");

/// Printers table: key = printer id, value = JSON
const PRINTERS_TABLE: TableDefinition<i64, &[u8]> = TableDefinition::new("printers");

/// Monotonic id counters, one per entity kind
const COUNTERS_TABLE: TableDefinition<&str, i64> = TableDefinition::new("counters");

const JOB_COUNTER: &str = "print_job";
const PRINTER_COUNTER: &str = "printer";

#[derive(Debug, Error)]
pub enum PrintStorageError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type PrintStorageResult<T> = Result<T, PrintStorageError>;

/// Print job and printer storage
///
/// Reads open their own read transaction. Writes take a caller-owned
/// [`WriteTransaction`] so several mutations commit atomically; redb allows a
/// single writer at a time, which is what makes job claims exclusive.
#[derive(Clone)]
pub struct PrintStorage {
    db: Arc<Database>,
}

impl PrintStorage {
    /// Open or create database
    pub fn open(path: impl AsRef<Path>) -> PrintStorageResult<Self> {
        Self::init(Database::create(path)?)
    }

    /// Open in-memory database (tests and ephemeral setups)
    pub fn open_in_memory() -> PrintStorageResult<Self> {
        let db =
            Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        Self::init(db)
    }

    fn init(db: Database) -> PrintStorageResult<Self> {
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(PRINT_JOBS_TABLE)?;
            let _ = write_txn.open_table(PRINT_JOBS_BY_ITEM_TABLE)?;
            let _ = write_txn.open_table(PRINTERS_TABLE)?;
            let _ = write_txn.open_table(COUNTERS_TABLE)?;
        }
        write_txn.commit()?;

        Ok(Self { db: Arc::new(db) })
    }

    pub fn begin_write(&self) -> PrintStorageResult<WriteTransaction> {
        Ok(self.db.begin_write()?)
    }

    fn next_id(&self, txn: &WriteTransaction, counter: &str) -> PrintStorageResult<i64> {
        let mut table = txn.open_table(COUNTERS_TABLE)?;
        let current = table.get(counter)?.map(|guard| guard.value()).unwrap_or(0);
        let next = current + 1;
        table.insert(counter, next)?;
        Ok(next)
    }

    // ========== Print Jobs ==========

    /// Allocate the next print job id
    pub fn next_job_id(&self, txn: &WriteTransaction) -> PrintStorageResult<i64> {
        self.next_id(txn, JOB_COUNTER)
    }

    /// Insert or overwrite a print job
    pub fn store_job(&self, txn: &WriteTransaction, job: &PrintJob) -> PrintStorageResult<()> {
        let mut table = txn.open_table(PRINT_JOBS_TABLE)?;
        let value = serde_json::to_vec(job)?;
        table.insert(job.id, value.as_slice())?;

        // Update index
        let mut idx_table = txn.open_table(PRINT_JOBS_BY_ITEM_TABLE)?;
        idx_table.insert((job.order_item_id, job.id), ())?;

        Ok(())
    }

    /// Read a print job inside a write transaction
    pub fn load_job(&self, txn: &WriteTransaction, id: i64) -> PrintStorageResult<Option<PrintJob>> {
        let table = txn.open_table(PRINT_JOBS_TABLE)?;
        match table.get(id)? {
            Some(guard) => Ok(Some(serde_json::from_slice(guard.value())?)),
            None => Ok(None),
        }
    }

    /// Get a print job by ID
    pub fn get_job(&self, id: i64) -> PrintStorageResult<Option<PrintJob>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(PRINT_JOBS_TABLE)?;

        match table.get(id)? {
            Some(guard) => {
                let job: PrintJob = serde_json::from_slice(guard.value())?;
                Ok(Some(job))
            }
            None => Ok(None),
        }
    }

    /// Get all print jobs, in id order
    pub fn list_jobs(&self) -> PrintStorageResult<Vec<PrintJob>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(PRINT_JOBS_TABLE)?;

        let mut jobs = Vec::new();
        for result in table.iter()? {
            let (_, guard) = result?;
            jobs.push(serde_json::from_slice(guard.value())?);
        }
        Ok(jobs)
    }

    /// Get every print job recorded for one order line, oldest first
    pub fn jobs_for_item(&self, order_item_id: i64) -> PrintStorageResult<Vec<PrintJob>> {
        let read_txn = self.db.begin_read()?;
        let idx_table = read_txn.open_table(PRINT_JOBS_BY_ITEM_TABLE)?;
        let data_table = read_txn.open_table(PRINT_JOBS_TABLE)?;

        let mut jobs = Vec::new();
        let range_start = (order_item_id, i64::MIN);
        let range_end = (order_item_id, i64::MAX);

        for result in idx_table.range(range_start..=range_end)? {
            let (key, _) = result?;
            let (_, job_id) = key.value();
            if let Some(guard) = data_table.get(job_id)? {
                let job: PrintJob = serde_json::from_slice(guard.value())?;
                jobs.push(job);
            }
        }

        jobs.sort_by_key(|j| (j.created_at, j.id));
        Ok(jobs)
    }

    /// Whether any print job exists for an order line, read inside a write transaction
    pub fn item_has_jobs(
        &self,
        txn: &WriteTransaction,
        order_item_id: i64,
    ) -> PrintStorageResult<bool> {
        let idx_table = txn.open_table(PRINT_JOBS_BY_ITEM_TABLE)?;
        let mut range = idx_table.range((order_item_id, i64::MIN)..=(order_item_id, i64::MAX))?;
        Ok(range.next().transpose()?.is_some())
    }

    /// Remove a print job and its index entry
    pub fn delete_job(&self, txn: &WriteTransaction, job: &PrintJob) -> PrintStorageResult<()> {
        let mut table = txn.open_table(PRINT_JOBS_TABLE)?;
        table.remove(job.id)?;

        let mut idx_table = txn.open_table(PRINT_JOBS_BY_ITEM_TABLE)?;
        idx_table.remove((job.order_item_id, job.id))?;

        Ok(())
    }

    // ========== Printers ==========

    /// Allocate the next printer id
    pub fn next_printer_id(&self, txn: &WriteTransaction) -> PrintStorageResult<i64> {
        self.next_id(txn, PRINTER_COUNTER)
    }

    /// Insert or overwrite a printer
    pub fn store_printer(
        &self,
        txn: &WriteTransaction,
        printer: &PrinterDevice,
    ) -> PrintStorageResult<()> {
        let mut table = txn.open_table(PRINTERS_TABLE)?;
        let value = serde_json::to_vec(printer)?;
        table.insert(printer.id, value.as_slice())?;
        Ok(())
    }

    /// Read a printer inside a write transaction
    pub fn load_printer(
        &self,
        txn: &WriteTransaction,
        id: i64,
    ) -> PrintStorageResult<Option<PrinterDevice>> {
        let table = txn.open_table(PRINTERS_TABLE)?;
        match table.get(id)? {
            Some(guard) => Ok(Some(serde_json::from_slice(guard.value())?)),
            None => Ok(None),
        }
    }

    /// Get a printer by ID
    pub fn get_printer(&self, id: i64) -> PrintStorageResult<Option<PrinterDevice>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(PRINTERS_TABLE)?;

        match table.get(id)? {
            Some(guard) => Ok(Some(serde_json::from_slice(guard.value())?)),
            None => Ok(None),
        }
    }

    /// Get all printers, lowest id first
    pub fn list_printers(&self) -> PrintStorageResult<Vec<PrinterDevice>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(PRINTERS_TABLE)?;

        let mut printers = Vec::new();
        for result in table.iter()? {
            let (_, guard) = result?;
            printers.push(serde_json::from_slice(guard.value())?);
        }
        Ok(printers)
    }

    /// Remove a printer, returning whether it existed
    pub fn delete_printer(&self, txn: &WriteTransaction, id: i64) -> PrintStorageResult<bool> {
        let mut table = txn.open_table(PRINTERS_TABLE)?;
        let removed = table.remove(id)?.is_some();
        Ok(removed)
    }
}
