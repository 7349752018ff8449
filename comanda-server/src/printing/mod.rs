//! Kitchen Printing Module
//!
//! - [`PrintQueue`]: durable print job state machine
//! - [`PrintDispatcher`]: background worker sending PENDING jobs to devices
//! - [`PrinterRegistry`]: printer device records and connection tests
//! - [`OrderSynchronizer`]: projects print outcomes onto order status
//! - [`KitchenTicketRenderer`]: one ESC/POS ticket per order line

pub mod error;
pub mod events;
pub mod executor;
pub mod queue;
pub mod registry;
pub mod renderer;
pub mod storage;
pub mod sync;
pub mod types;
pub mod worker;

pub use error::{PrintingError, PrintingResult};
pub use events::{PrintEvent, PrintEventBus};
pub use executor::{DeviceConnector, PrintExecutor, TransportConnector};
pub use queue::PrintQueue;
pub use registry::PrinterRegistry;
pub use renderer::{KitchenTicketRenderer, RenderOptions};
pub use storage::{PrintStorage, PrintStorageError, PrintStorageResult};
pub use sync::{OrderSynchronizer, SyncOptions};
pub use types::*;
pub use worker::{DispatchStats, PrintDispatcher};
