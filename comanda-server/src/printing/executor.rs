//! Print job executor
//!
//! Handles the actual sending of print data to printers.

use async_trait::async_trait;
use comanda_printer::{NetworkPrinter, Printer, SerialPrinter};
use shared::models::{OrderLine, PrinterDevice, PrinterTransport};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument};

use super::error::PrintingResult;
use super::renderer::{KitchenTicketRenderer, RenderOptions};
use super::types::OrderContext;

/// Delivers raw bytes to a printer device
///
/// The production implementation opens the device transport; tests plug in
/// fakes to simulate offline or misbehaving printers.
#[async_trait]
pub trait DeviceConnector: Send + Sync {
    async fn send(&self, device: &PrinterDevice, data: &[u8]) -> PrintingResult<()>;
}

/// [`DeviceConnector`] that talks to real printers over TCP or serial
#[derive(Debug, Clone)]
pub struct TransportConnector {
    timeout: Duration,
}

impl TransportConnector {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl DeviceConnector for TransportConnector {
    #[instrument(skip(self, device, data), fields(printer_id = device.id, endpoint = %device.transport.endpoint()))]
    async fn send(&self, device: &PrinterDevice, data: &[u8]) -> PrintingResult<()> {
        match &device.transport {
            PrinterTransport::Network { host, port } => {
                let printer = NetworkPrinter::new(host, *port)?.with_timeout(self.timeout);
                printer.print(data).await?;
            }
            PrinterTransport::Serial { port, baud_rate } => {
                let printer = SerialPrinter::new(port, *baud_rate)?.with_timeout(self.timeout);
                printer.print(data).await?;
            }
        }
        Ok(())
    }
}

/// Print job executor
///
/// Renders a ticket for the target device's paper width and sends it.
#[derive(Clone)]
pub struct PrintExecutor {
    connector: Arc<dyn DeviceConnector>,
    options: RenderOptions,
}

impl PrintExecutor {
    pub fn new(connector: Arc<dyn DeviceConnector>, options: RenderOptions) -> Self {
        Self { connector, options }
    }

    /// Render and send one order line ticket, returning the bytes sent
    #[instrument(skip(self, device, line, ctx), fields(printer_id = device.id, line_id = line.id))]
    pub async fn print_line(
        &self,
        device: &PrinterDevice,
        line: &OrderLine,
        ctx: &OrderContext,
    ) -> PrintingResult<usize> {
        let data = KitchenTicketRenderer::new(device.paper_width)
            .with_options(self.options)
            .render(line, ctx);

        self.connector.send(device, &data).await?;
        info!(bytes = data.len(), "Kitchen ticket sent");
        Ok(data.len())
    }
}
