//! # comanda-printer
//!
//! ESC/POS thermal printer library - low-level printing capabilities only.
//!
//! ## Scope
//!
//! This crate handles HOW to print:
//! - ESC/POS command building with font-size aware line widths
//! - Windows-1252 encoding for Latin kitchen printers
//! - Network printing (TCP port 9100)
//! - USB-serial printing
//!
//! Business logic (WHAT to print) stays in application code:
//! - Kitchen ticket rendering → comanda-server
//!
//! ## Example
//!
//! ```ignore
//! use comanda_printer::{EscPosBuilder, NetworkPrinter, Printer};
//!
//! let mut builder = EscPosBuilder::new(48);
//! builder.center();
//! builder.double_size();
//! builder.line("PEDIDO #42");
//! builder.reset_size();
//! builder.sep_single();
//! builder.left();
//! builder.line("Milanesa napolitana");
//! builder.cut_feed(3);
//!
//! let printer = NetworkPrinter::new("192.168.1.100", 9100)?;
//! printer.print(&builder.build()).await?;
//! ```

mod encoding;
mod error;
mod escpos;
mod printer;

// Re-exports
pub use encoding::{center_width, encode_cp1252, text_width};
pub use error::{PrintError, PrintResult};
pub use escpos::{EscPosBuilder, FontSize, self_test_page};
pub use printer::{NetworkPrinter, Printer, SerialPrinter};
