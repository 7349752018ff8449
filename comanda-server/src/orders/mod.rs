//! Order service collaborator
//!
//! Orders and order lines are owned by an external order service. The print
//! engine reads them to render tickets and requests compare-and-set status
//! transitions once tickets are printed.
//!
//! - [`OrderGateway`]: the seam every consumer depends on
//! - [`MemoryOrderGateway`]: process-local implementation (standalone mode, tests)
//! - [`HttpOrderGateway`]: REST client for a remote order service

mod gateway;
mod memory;
mod remote;

pub use gateway::{GatewayError, GatewayResult, OrderGateway};
pub use memory::MemoryOrderGateway;
pub use remote::HttpOrderGateway;
