//! ESC/POS command builder
//!
//! Provides a fluent API for building ESC/POS print data. The builder keeps
//! track of the active character size so callers can lay out columns with
//! [`EscPosBuilder::effective_width`] instead of the nominal paper width.

use crate::encoding::encode_cp1252;

/// Code page number for WPC1252 on Epson-compatible firmware
const CODE_PAGE_WPC1252: u8 = 16;

/// Character size currently selected on the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FontSize {
    #[default]
    Normal,
    /// Double width and double height (`GS ! 0x11`)
    Double,
}

impl FontSize {
    /// Horizontal magnification applied by the printer
    pub fn width_scale(self) -> usize {
        match self {
            FontSize::Normal => 1,
            FontSize::Double => 2,
        }
    }
}

/// ESC/POS command builder
///
/// Builds ESC/POS byte sequences for thermal printers.
/// Text is encoded as Windows-1252 as it is written.
#[derive(Debug, Clone)]
pub struct EscPosBuilder {
    buf: Vec<u8>,
    width: usize,
    size: FontSize,
}

impl EscPosBuilder {
    /// Create a new builder with the specified paper width in characters
    ///
    /// Common widths:
    /// - 58mm paper: 32 characters
    /// - 80mm paper: 48 characters
    ///
    /// The buffer starts with the reset preamble and code page selection.
    pub fn new(width: usize) -> Self {
        let mut builder = Self {
            buf: Vec::with_capacity(1024),
            width: width.max(1),
            size: FontSize::Normal,
        };
        builder.reset();
        builder
    }

    /// Characters per line at the active font size (never 0)
    pub fn effective_width(&self) -> usize {
        (self.width / self.size.width_scale()).max(1)
    }

    /// Active font size
    pub fn font_size(&self) -> FontSize {
        self.size
    }

    // === Text Output ===

    /// Write raw text (Windows-1252 encoded)
    pub fn text(&mut self, s: &str) -> &mut Self {
        self.buf.extend_from_slice(&encode_cp1252(s));
        self
    }

    /// Write text followed by newline
    pub fn line(&mut self, s: &str) -> &mut Self {
        self.text(s);
        self.buf.push(b'\n');
        self
    }

    /// Print and feed n lines
    pub fn feed(&mut self, lines: u8) -> &mut Self {
        // ESC d n
        self.buf.extend_from_slice(&[0x1B, 0x64, lines]);
        self
    }

    // === Alignment ===

    /// Align text to center
    pub fn center(&mut self) -> &mut Self {
        self.buf.extend_from_slice(&[0x1B, 0x61, 0x01]);
        self
    }

    /// Align text to left (default)
    pub fn left(&mut self) -> &mut Self {
        self.buf.extend_from_slice(&[0x1B, 0x61, 0x00]);
        self
    }

    // === Text Style ===

    /// Enable bold text
    pub fn bold(&mut self) -> &mut Self {
        self.buf.extend_from_slice(&[0x1B, 0x45, 0x01]);
        self
    }

    /// Disable bold text
    pub fn bold_off(&mut self) -> &mut Self {
        self.buf.extend_from_slice(&[0x1B, 0x45, 0x00]);
        self
    }

    /// Double width and height
    pub fn double_size(&mut self) -> &mut Self {
        self.buf.extend_from_slice(&[0x1D, 0x21, 0x11]);
        self.size = FontSize::Double;
        self
    }

    /// Reset to normal size
    pub fn reset_size(&mut self) -> &mut Self {
        self.buf.extend_from_slice(&[0x1D, 0x21, 0x00]);
        self.size = FontSize::Normal;
        self
    }

    // === Separators ===

    /// Print a line of '-' characters across the effective width
    pub fn sep_single(&mut self) -> &mut Self {
        self.line(&"-".repeat(self.effective_width()))
    }

    // === Paper Control ===

    /// Full cut after feeding n lines (`GS V 66 n`)
    ///
    /// The printer accounts for the cutter-to-head distance itself.
    pub fn cut_feed(&mut self, lines: u8) -> &mut Self {
        self.buf.extend_from_slice(&[0x1D, 0x56, 0x42, lines]);
        self
    }

    /// Sound the buzzer `times` times, each `duration` x 50ms (`ESC B n t`)
    pub fn beep(&mut self, times: u8, duration: u8) -> &mut Self {
        self.buf
            .extend_from_slice(&[0x1B, 0x42, times.clamp(1, 9), duration.clamp(1, 9)]);
        self
    }

    // === Printer State ===

    /// Reset printer to default state and re-select the code page
    pub fn reset(&mut self) -> &mut Self {
        // ESC @, then ESC t n since init restores the factory code page
        self.buf.extend_from_slice(&[0x1B, 0x40]);
        self.buf.extend_from_slice(&[0x1B, 0x74, CODE_PAGE_WPC1252]);
        self.size = FontSize::Normal;
        self
    }

    // === Build ===

    /// Build the final byte buffer
    pub fn build(self) -> Vec<u8> {
        self.buf
    }
}

/// Minimal self-test ticket used for connectivity checks
pub fn self_test_page(device_name: &str, width: usize) -> Vec<u8> {
    let mut b = EscPosBuilder::new(width);
    b.center()
        .bold()
        .line("TEST OK")
        .bold_off()
        .line(device_name)
        .left()
        .cut_feed(3);
    b.build()
}
