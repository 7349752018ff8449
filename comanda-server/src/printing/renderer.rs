//! Kitchen ticket renderer
//!
//! Renders one order line into ESC/POS format for thermal printers.

use chrono::{DateTime, Utc};
use comanda_printer::{EscPosBuilder, center_width, text_width};
use shared::models::OrderLine;

use super::types::OrderContext;

/// Quantity column width at normal font size
const QTY_COLUMN_WIDTH: usize = 6;

/// Rendering options shared by every ticket
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    /// Print item rows in double size
    pub double_size_items: bool,
    /// Offset from UTC applied to the ticket timestamp
    pub utc_offset_minutes: i32,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            double_size_items: true,
            utc_offset_minutes: 0,
        }
    }
}

/// Kitchen ticket renderer
///
/// Pure and deterministic: the same line and context always produce the
/// same bytes, and no input makes rendering fail.
pub struct KitchenTicketRenderer {
    width: usize,
    options: RenderOptions,
}

impl KitchenTicketRenderer {
    /// Create a new renderer with specified paper width
    ///
    /// Common widths:
    /// - 58mm paper: 32 characters
    /// - 80mm paper: 48 characters
    pub fn new(width: usize) -> Self {
        Self {
            width: width.max(1),
            options: RenderOptions::default(),
        }
    }

    pub fn with_options(mut self, options: RenderOptions) -> Self {
        self.options = options;
        self
    }

    /// Render an order line to ESC/POS bytes
    pub fn render(&self, line: &OrderLine, ctx: &OrderContext) -> Vec<u8> {
        let mut b = EscPosBuilder::new(self.width);

        self.render_header(&mut b, ctx);
        self.render_item(&mut b, line);
        self.render_notes(&mut b, line.notes.as_deref());
        self.render_footer(&mut b);

        b.build()
    }

    /// Order number, location, staff and timestamp
    fn render_header(&self, b: &mut EscPosBuilder, ctx: &OrderContext) {
        b.center();
        b.double_size();
        b.bold();
        b.line(&format!("PEDIDO #{}", ctx.order_id));
        b.line(&location_line(ctx));
        b.bold_off();
        b.reset_size();

        if let Some(staff) = ctx.staff.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            b.line(&format!("Mozo: {}", staff));
        }

        b.line(&format_timestamp(ctx.created_at, self.options.utc_offset_minutes));

        b.left();
        b.sep_single();
        b.line("CANT | DESCRIPCION");
        b.sep_single();
    }

    /// Quantity and wrapped name in two columns
    fn render_item(&self, b: &mut EscPosBuilder, line: &OrderLine) {
        if self.options.double_size_items {
            b.double_size();
            b.bold();
        }

        // Both columns shrink with the font; wrap against the effective width
        let scale = b.font_size().width_scale();
        let row_width = b.effective_width();
        let qty = line.quantity.to_string();
        let qty_width = (QTY_COLUMN_WIDTH / scale).max(1).max(text_width(&qty));
        let name_width = row_width.saturating_sub(qty_width).max(1);

        let mut rows = wrap_words(&line.name, name_width);
        if rows.is_empty() {
            rows.push(String::new());
        }

        for (i, row) in rows.iter().enumerate() {
            let qty_cell = if i == 0 {
                center_width(&qty, qty_width)
            } else {
                " ".repeat(qty_width)
            };
            b.line(format!("{}{}", qty_cell, row).trim_end());
        }

        if self.options.double_size_items {
            b.bold_off();
            b.reset_size();
        }
    }

    /// Optional notes block at normal size
    fn render_notes(&self, b: &mut EscPosBuilder, notes: Option<&str>) {
        let Some(notes) = notes.map(str::trim).filter(|n| !n.is_empty()) else {
            return;
        };

        b.sep_single();
        b.bold();
        b.line("NOTAS:");
        b.bold_off();
        for row in wrap_words(notes, b.effective_width()) {
            b.line(&row);
        }
    }

    /// Feed, cut and buzzer
    fn render_footer(&self, b: &mut EscPosBuilder) {
        b.feed(1);
        b.cut_feed(3);
        b.beep(2, 3);
    }
}

/// Location line: zone and table, else delivery/dine-in marker
fn location_line(ctx: &OrderContext) -> String {
    let zone = ctx.zone.as_deref().map(str::trim).filter(|s| !s.is_empty());
    let table = ctx.table.as_deref().map(str::trim).filter(|s| !s.is_empty());

    match (zone, table) {
        (Some(zone), Some(table)) => format!("{} - MESA {}", zone, table),
        (Some(zone), None) => zone.to_string(),
        (None, Some(table)) => format!("MESA {}", table),
        (None, None) if ctx.any_takeaway => "DELIVERY".to_string(),
        (None, None) => "SALON".to_string(),
    }
}

/// Format a millisecond timestamp as `dd/mm/YYYY HH:MM` at a fixed UTC offset
fn format_timestamp(millis: i64, utc_offset_minutes: i32) -> String {
    let local = millis.saturating_add(i64::from(utc_offset_minutes) * 60_000);
    DateTime::<Utc>::from_timestamp_millis(local)
        .map(|dt| dt.format("%d/%m/%Y %H:%M").to_string())
        .unwrap_or_default()
}

/// Greedy word wrap
///
/// Words are separated by single spaces and every produced line holds at most
/// `width` characters. A word longer than `width` is split into `width`-sized
/// chunks; that is the only case where a break falls inside a word. Blank input
/// produces no lines.
pub fn wrap_words(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_width = 0;

    for word in text.split_whitespace() {
        let word_width = text_width(word);

        if word_width > width {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
                current_width = 0;
            }
            let chars: Vec<char> = word.chars().collect();
            for chunk in chars.chunks(width) {
                if chunk.len() == width {
                    lines.push(chunk.iter().collect());
                } else {
                    current = chunk.iter().collect();
                    current_width = chunk.len();
                }
            }
            continue;
        }

        if current.is_empty() {
            current.push_str(word);
            current_width = word_width;
        } else if current_width + 1 + word_width <= width {
            current.push(' ');
            current.push_str(word);
            current_width += 1 + word_width;
        } else {
            lines.push(std::mem::replace(&mut current, word.to_string()));
            current_width = word_width;
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use shared::models::OrderLineStatus;

    fn contains(haystack: &[u8], needle: &[u8]) -> bool {
        haystack.windows(needle.len()).any(|w| w == needle)
    }

    fn line(name: &str, quantity: i32, notes: Option<&str>) -> OrderLine {
        OrderLine {
            id: 1,
            order_id: 42,
            name: name.to_string(),
            quantity,
            notes: notes.map(str::to_string),
            takeaway: false,
            status: OrderLineStatus::Created,
            created_at: 0,
            preparing_at: None,
            served_at: None,
            canceled_at: None,
        }
    }

    fn ctx() -> OrderContext {
        OrderContext {
            order_id: 42,
            zone: Some("Terraza".to_string()),
            table: Some("7".to_string()),
            staff: Some("Lucia".to_string()),
            any_takeaway: false,
            // 2024-03-05 21:07:00 UTC
            created_at: 1_709_672_820_000,
        }
    }

    #[test]
    fn test_wrap_words_width_10() {
        assert_eq!(
            wrap_words("Hamburguesa doble con queso", 10),
            vec!["Hamburgues", "a doble", "con queso"]
        );
        assert_eq!(wrap_words("Milanesa con papas", 10), vec!["Milanesa", "con papas"]);
    }

    #[test]
    fn test_wrap_words_edges() {
        assert!(wrap_words("", 10).is_empty());
        assert!(wrap_words("   \t ", 10).is_empty());
        assert_eq!(wrap_words("a  b", 0), vec!["a", "b"]);
        assert_eq!(wrap_words("abcdefgh", 4), vec!["abcd", "efgh"]);
    }

    proptest! {
        #[test]
        fn wrapped_lines_fit_and_rejoin(
            words in prop::collection::vec("[a-zA-Z0-9ñáé]{1,8}", 0..12),
            seps in prop::collection::vec("[ \t]{1,3}", 12),
            width in 8usize..40,
        ) {
            let mut name = String::new();
            for (i, w) in words.iter().enumerate() {
                name.push_str(w);
                name.push_str(&seps[i]);
            }

            let lines = wrap_words(&name, width);
            for l in &lines {
                prop_assert!(l.chars().count() <= width);
            }
            prop_assert_eq!(lines.join(" "), words.join(" "));
        }

        #[test]
        fn wrapped_lines_never_exceed_width(text in "\\PC{0,80}", width in 0usize..30) {
            for l in wrap_words(&text, width) {
                prop_assert!(l.chars().count() <= width.max(1));
            }
        }
    }

    #[test]
    fn test_render_structure() {
        let renderer = KitchenTicketRenderer::new(48);
        let data = renderer.render(&line("Milanesa napolitana", 2, None), &ctx());

        // Reset preamble and code page
        assert!(data.starts_with(&[0x1B, 0x40, 0x1B, 0x74, 16]));
        assert!(contains(&data, b"PEDIDO #42\n"));
        assert!(contains(&data, b"Terraza - MESA 7\n"));
        assert!(contains(&data, b"Mozo: Lucia\n"));
        assert!(contains(&data, b"05/03/2024 21:07\n"));
        assert!(contains(&data, b"CANT | DESCRIPCION\n"));
        // Double size item row: 3-wide quantity column
        assert!(contains(&data, b" 2 Milanesa napolitana\n"));
        assert!(!contains(&data, b"NOTAS:"));
        // Cut with feed then buzzer
        assert!(contains(&data, &[0x1D, 0x56, 0x42, 3]));
        assert!(data.ends_with(&[0x1B, 0x42, 2, 3]));
    }

    #[test]
    fn test_double_size_wraps_at_half_width() {
        // width 16 -> 8 effective, qty column 3, name column 5
        let renderer = KitchenTicketRenderer::new(16);
        let data = renderer.render(&line("Pollo al horno", 1, None), &ctx());

        assert!(contains(&data, b" 1 Pollo\n"));
        assert!(contains(&data, b"   al\n"));
        assert!(contains(&data, b"   horno\n"));
    }

    #[test]
    fn test_normal_size_items() {
        let renderer = KitchenTicketRenderer::new(16).with_options(RenderOptions {
            double_size_items: false,
            utc_offset_minutes: 0,
        });
        let data = renderer.render(&line("Pollo al horno", 12, None), &ctx());
        // 6-wide quantity column, 10-wide name column
        assert!(contains(&data, b"  12  Pollo al\n"));
        assert!(contains(&data, b"      horno\n"));
    }

    #[test]
    fn test_notes_block() {
        let renderer = KitchenTicketRenderer::new(32);
        let data = renderer.render(&line("Bife", 1, Some("  sin sal, punto medio ")), &ctx());
        assert!(contains(&data, b"NOTAS:\n"));
        assert!(contains(&data, b"sin sal, punto medio\n"));

        let data = renderer.render(&line("Bife", 1, Some("   ")), &ctx());
        assert!(!contains(&data, b"NOTAS:"));
    }

    #[test]
    fn test_location_variants() {
        let mut c = ctx();
        c.zone = None;
        c.table = None;
        assert_eq!(location_line(&c), "SALON");

        c.any_takeaway = true;
        assert_eq!(location_line(&c), "DELIVERY");

        c.table = Some("12".into());
        assert_eq!(location_line(&c), "MESA 12");
    }

    #[test]
    fn test_missing_fields_render_blank() {
        let renderer = KitchenTicketRenderer::new(32);
        let c = OrderContext {
            order_id: 9,
            staff: Some("  ".into()),
            created_at: i64::MAX,
            ..Default::default()
        };
        let data = renderer.render(&line("", 0, None), &c);
        assert!(contains(&data, b"PEDIDO #9\n"));
        assert!(!contains(&data, b"Mozo:"));
        assert!(contains(&data, b" 0\n"));
    }

    #[test]
    fn test_timestamp_offset() {
        // UTC-3
        assert_eq!(format_timestamp(1_709_672_820_000, -180), "05/03/2024 18:07");
        assert_eq!(format_timestamp(0, 0), "01/01/1970 00:00");
    }

    #[test]
    fn test_render_is_deterministic() {
        let renderer = KitchenTicketRenderer::new(48);
        let l = line("Empanada de carne cortada a cuchillo", 6, Some("bien calientes"));
        assert_eq!(renderer.render(&l, &ctx()), renderer.render(&l, &ctx()));
    }
}
