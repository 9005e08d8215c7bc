//! # Renderer
//!
//! Walks the block sequence top to bottom and turns it into draw calls on a
//! [`PageSink`]. The only state is a page cursor: where the next block
//! starts and how much room the page has left.
//!
//! Coordinates are in points with the origin at the top-left of the page
//! and y growing downwards. Sinks flip them if their format needs it.
//!
//! Tables paginate row by row. When a row doesn't fit, the page is closed,
//! a new one is started and the header row is drawn again before the row,
//! so every page of the item list is self-describing.

use crate::error::RenderError;
use crate::layout::{Block, ImageRef, KeyValueRow, QrEntry};
use crate::style::{Color, StyleSheet, TextStyle};
use crate::text::{is_rtl, wrap_visual};

/// An axis-aligned rectangle, top-left origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }
}

/// The drawing surface a document is rendered into.
///
/// A sink starts with one open page. Text handed to it is already shaped
/// and in visual order; it is drawn left to right as given.
pub trait PageSink {
    /// Advance width of `text` in points.
    fn text_width(&self, text: &str, style: &TextStyle) -> f64;

    /// Draw `text` with its baseline starting at (`x`, `y`).
    fn draw_text(&mut self, x: f64, y: f64, text: &str, style: &TextStyle) -> Result<(), RenderError>;

    fn draw_rect(&mut self, rect: Rect, fill: Option<Color>, stroke: Option<Color>) -> Result<(), RenderError>;

    fn draw_image(&mut self, rect: Rect, image: &ImageRef) -> Result<(), RenderError>;

    /// Close the current page and open a new one.
    fn break_page(&mut self) -> Result<(), RenderError>;

    /// Close the document and return its bytes.
    fn finish(&mut self) -> Result<Vec<u8>, RenderError>;
}

/// Render `blocks` into `sink` and return the finished document.
pub fn render(blocks: &[Block], style: &StyleSheet, sink: &mut dyn PageSink) -> Result<Vec<u8>, RenderError> {
    let mut renderer = Renderer::new(style);
    for block in blocks {
        renderer.render_block(block, sink)?;
    }
    tracing::debug!(pages = renderer.cursor.page + 1, "blocks rendered");
    sink.finish()
}

#[derive(Debug, Clone)]
struct PageCursor {
    content_x: f64,
    content_y: f64,
    content_width: f64,
    content_height: f64,
    /// Offset from the top of the content area.
    y: f64,
    /// Zero-based page index.
    page: usize,
}

impl PageCursor {
    fn new(style: &StyleSheet) -> Self {
        let (_, page_h) = style.page_size.dimensions();
        Self {
            content_x: style.margins.left,
            content_y: style.margins.top,
            content_width: style.content_width(),
            content_height: page_h - style.margins.top - style.margins.bottom,
            y: 0.0,
            page: 0,
        }
    }

    fn remaining_height(&self) -> f64 {
        (self.content_height - self.y).max(0.0)
    }

    fn at_page_top(&self) -> bool {
        self.y <= 0.0
    }

    /// Absolute y of the cursor on the page.
    fn top(&self) -> f64 {
        self.content_y + self.y
    }

    fn new_page(&self) -> Self {
        Self {
            y: 0.0,
            page: self.page + 1,
            ..self.clone()
        }
    }
}

/// A laid-out table cell: wrapped lines plus alignment.
struct Cell {
    lines: Vec<String>,
    width: f64,
    align: Align,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Align {
    Left,
    Center,
    Right,
}

struct Renderer<'a> {
    style: &'a StyleSheet,
    cursor: PageCursor,
}

impl<'a> Renderer<'a> {
    fn new(style: &'a StyleSheet) -> Self {
        Self {
            style,
            cursor: PageCursor::new(style),
        }
    }

    fn render_block(&mut self, block: &Block, sink: &mut dyn PageSink) -> Result<(), RenderError> {
        if !self.cursor.at_page_top() {
            self.cursor.y += self.style.block_gap;
        }
        match block {
            Block::Title { text } => self.render_title(text, sink),
            Block::KeyValue { rows } => self.render_key_values(rows, sink),
            Block::Table { header, rows, totals } => self.render_table(header, rows, totals.as_deref(), sink),
            Block::QrPanel { entries } => self.render_qr_panel(entries, sink),
            Block::Text { text, role } => {
                let text_style = self.style.text_style(*role);
                self.render_text(text, &text_style, sink)
            }
        }
    }

    /// Start a new page if `height` doesn't fit. A block taller than a whole
    /// page is drawn from the top of a fresh page and allowed to overflow.
    fn ensure_space(&mut self, height: f64, sink: &mut dyn PageSink) -> Result<bool, RenderError> {
        if height > self.cursor.remaining_height() && !self.cursor.at_page_top() {
            sink.break_page()?;
            self.cursor = self.cursor.new_page();
            return Ok(true);
        }
        Ok(false)
    }

    fn render_title(&mut self, text: &str, sink: &mut dyn PageSink) -> Result<(), RenderError> {
        let style = self.style;
        let title = &style.title;
        let width = self.cursor.content_width;
        let lines = wrap_visual(text, is_rtl(text), width - 2.0 * title.padding, |s| {
            sink.text_width(s, &title.text)
        });
        let height = lines.len() as f64 * title.text.line_height() + 2.0 * title.padding;
        self.ensure_space(height, sink)?;

        let rect = Rect::new(self.cursor.content_x, self.cursor.top(), width, height);
        sink.draw_rect(rect, Some(title.background), None)?;
        let cell = Cell {
            lines,
            width,
            align: Align::Center,
        };
        draw_cell(sink, &cell, rect, title.padding, &title.text)?;
        self.cursor.y += height;
        Ok(())
    }

    fn render_key_values(&mut self, rows: &[KeyValueRow], sink: &mut dyn PageSink) -> Result<(), RenderError> {
        let style = self.style;
        let panel = &style.panel;
        let [label_width, value_width] = panel.columns;
        let panel_width = label_width + value_width;
        // Right-aligned: labels read first in RTL.
        let x = self.cursor.content_x + (self.cursor.content_width - panel_width).max(0.0);

        for row in rows {
            let (label_style, value_style) = if row.emphasis {
                (panel.emphasis, panel.emphasis)
            } else {
                (panel.label, panel.value)
            };
            let label = self.cell(sink, &row.label, label_width, panel.padding, &label_style, Align::Right);
            let value = self.cell(sink, &row.value, value_width, panel.padding, &value_style, Align::Right);
            let height = cell_height(&label, &label_style, panel.padding)
                .max(cell_height(&value, &value_style, panel.padding));

            self.ensure_space(height, sink)?;
            let top = self.cursor.top();
            let fill = row.highlight.then_some(panel.highlight);

            let value_rect = Rect::new(x, top, value_width, height);
            let label_rect = Rect::new(x + value_width, top, label_width, height);
            sink.draw_rect(value_rect, fill, Some(panel.grid))?;
            sink.draw_rect(label_rect, fill, Some(panel.grid))?;
            draw_cell(sink, &value, value_rect, panel.padding, &value_style)?;
            draw_cell(sink, &label, label_rect, panel.padding, &label_style)?;

            self.cursor.y += height;
        }
        Ok(())
    }

    fn render_table(
        &mut self,
        header: &[String],
        rows: &[Vec<String>],
        totals: Option<&[String]>,
        sink: &mut dyn PageSink,
    ) -> Result<(), RenderError> {
        let style = self.style;
        let table = &style.table;
        let col_widths: Vec<f64> = table.columns.to_vec();

        let header_cells = self.row_cells(sink, header, &col_widths, &table.header_text, true);
        let header_height = row_height(&header_cells, &table.header_text, table.padding);

        let mut body: Vec<(Vec<Cell>, Color, TextStyle)> = rows
            .iter()
            .enumerate()
            .map(|(i, row)| {
                let cells = self.row_cells(sink, row, &col_widths, &table.cell, false);
                (cells, table.row_backgrounds[i % 2], table.cell)
            })
            .collect();
        if let Some(totals) = totals {
            let cells = self.row_cells(sink, totals, &col_widths, &table.totals_text, false);
            body.push((cells, table.totals_background, table.totals_text));
        }

        // Keep the header together with the first row.
        let first_height = body
            .first()
            .map(|(cells, _, text)| row_height(cells, text, table.padding))
            .unwrap_or(0.0);
        self.ensure_space(header_height + first_height, sink)?;
        self.draw_row(sink, &header_cells, header_height, table.header_background, &table.header_text)?;

        for (cells, background, text_style) in &body {
            let height = row_height(cells, text_style, table.padding);
            if self.ensure_space(height, sink)? {
                self.draw_row(sink, &header_cells, header_height, table.header_background, &table.header_text)?;
            }
            self.draw_row(sink, cells, height, *background, text_style)?;
        }
        Ok(())
    }

    /// Lay out one table row's cells in drawing order (left to right).
    fn row_cells(
        &self,
        sink: &dyn PageSink,
        values: &[String],
        col_widths: &[f64],
        text_style: &TextStyle,
        is_header: bool,
    ) -> Vec<Cell> {
        let table = &self.style.table;
        let mut cells: Vec<Cell> = col_widths
            .iter()
            .enumerate()
            .map(|(i, &width)| {
                let value = values.get(i).map(String::as_str).unwrap_or("");
                let align = if is_header || i > 0 {
                    Align::Center
                } else if is_rtl(value) {
                    Align::Right
                } else {
                    Align::Left
                };
                self.cell(sink, value, width, table.padding, text_style, align)
            })
            .collect();
        if table.mirrored {
            cells.reverse();
        }
        cells
    }

    fn draw_row(
        &mut self,
        sink: &mut dyn PageSink,
        cells: &[Cell],
        height: f64,
        background: Color,
        text_style: &TextStyle,
    ) -> Result<(), RenderError> {
        let top = self.cursor.top();
        let mut x = self.cursor.content_x;
        for cell in cells {
            let rect = Rect::new(x, top, cell.width, height);
            sink.draw_rect(rect, Some(background), Some(self.style.table.grid))?;
            draw_cell(sink, cell, rect, self.style.table.padding, text_style)?;
            x += cell.width;
        }
        self.cursor.y += height;
        Ok(())
    }

    fn render_qr_panel(&mut self, entries: &[QrEntry], sink: &mut dyn PageSink) -> Result<(), RenderError> {
        if entries.is_empty() {
            return Ok(());
        }
        let style = self.style;
        let qr = &style.qr;
        let caption_height = qr.caption.line_height();
        let height = qr.size + caption_height + 4.0;
        self.ensure_space(height, sink)?;

        let count = entries.len() as f64;
        let gap = ((self.cursor.content_width - count * qr.size) / (count + 1.0)).max(0.0);
        let top = self.cursor.top();

        // First entry (the shop) sits on the right, matching reading order.
        for (i, entry) in entries.iter().enumerate() {
            let slot = (entries.len() - 1 - i) as f64;
            let x = self.cursor.content_x + gap + slot * (qr.size + gap);
            sink.draw_image(Rect::new(x, top, qr.size, qr.size), &entry.image)?;

            let caption_width = sink.text_width(&entry.caption, &qr.caption);
            let caption_x = x + (qr.size - caption_width) / 2.0;
            let baseline = top + qr.size + 4.0 + qr.caption.size;
            sink.draw_text(caption_x, baseline, &entry.caption, &qr.caption)?;
        }
        self.cursor.y += height;
        Ok(())
    }

    fn render_text(&mut self, text: &str, text_style: &TextStyle, sink: &mut dyn PageSink) -> Result<(), RenderError> {
        let width = self.cursor.content_width;
        for paragraph in text.split('\n') {
            let lines = wrap_visual(paragraph, is_rtl(paragraph), width, |s| sink.text_width(s, text_style));
            for line in lines {
                let line_height = text_style.line_height();
                self.ensure_space(line_height, sink)?;
                let line_width = sink.text_width(&line, text_style);
                let x = self.cursor.content_x + (width - line_width) / 2.0;
                let baseline = self.cursor.top() + text_style.size;
                sink.draw_text(x, baseline, &line, text_style)?;
                self.cursor.y += line_height;
            }
        }
        Ok(())
    }

    fn cell(
        &self,
        sink: &dyn PageSink,
        text: &str,
        width: f64,
        padding: f64,
        text_style: &TextStyle,
        align: Align,
    ) -> Cell {
        let inner = (width - 2.0 * padding).max(1.0);
        let lines = wrap_visual(text, is_rtl(text), inner, |s| sink.text_width(s, text_style));
        Cell { lines, width, align }
    }
}

fn cell_height(cell: &Cell, text_style: &TextStyle, padding: f64) -> f64 {
    cell.lines.len().max(1) as f64 * text_style.line_height() + 2.0 * padding
}

fn row_height(cells: &[Cell], text_style: &TextStyle, padding: f64) -> f64 {
    cells
        .iter()
        .map(|c| cell_height(c, text_style, padding))
        .fold(0.0, f64::max)
}

/// Draw a cell's lines inside `rect`, vertically centered.
fn draw_cell(
    sink: &mut dyn PageSink,
    cell: &Cell,
    rect: Rect,
    padding: f64,
    text_style: &TextStyle,
) -> Result<(), RenderError> {
    let line_height = text_style.line_height();
    let block_height = cell.lines.len() as f64 * line_height;
    let mut top = rect.y + (rect.height - block_height) / 2.0;

    for line in &cell.lines {
        if !line.is_empty() {
            let line_width = sink.text_width(line, text_style);
            let x = match cell.align {
                Align::Left => rect.x + padding,
                Align::Center => rect.x + (rect.width - line_width) / 2.0,
                Align::Right => rect.x + rect.width - padding - line_width,
            };
            // Baseline sits roughly a cap height below the line's top.
            let baseline = top + (line_height + text_style.size * 0.7) / 2.0;
            sink.draw_text(x, baseline, line, text_style)?;
        }
        top += line_height;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::TextRole;
    use std::path::PathBuf;

    #[derive(Debug, Clone, PartialEq)]
    pub enum Op {
        Text { x: f64, y: f64, text: String },
        Rect { rect: Rect, fill: Option<Color> },
        Image { rect: Rect, path: PathBuf },
    }

    /// Records draw calls per page.
    #[derive(Default)]
    pub struct RecordingSink {
        pub pages: Vec<Vec<Op>>,
        pub fail_images: bool,
    }

    impl RecordingSink {
        pub fn new() -> Self {
            Self {
                pages: vec![Vec::new()],
                fail_images: false,
            }
        }

        pub fn texts(&self, page: usize) -> Vec<&str> {
            self.pages[page]
                .iter()
                .filter_map(|op| match op {
                    Op::Text { text, .. } => Some(text.as_str()),
                    _ => None,
                })
                .collect()
        }
    }

    impl PageSink for RecordingSink {
        fn text_width(&self, text: &str, style: &TextStyle) -> f64 {
            text.chars().count() as f64 * style.size * 0.5
        }

        fn draw_text(&mut self, x: f64, y: f64, text: &str, _style: &TextStyle) -> Result<(), RenderError> {
            self.pages.last_mut().unwrap().push(Op::Text {
                x,
                y,
                text: text.to_string(),
            });
            Ok(())
        }

        fn draw_rect(&mut self, rect: Rect, fill: Option<Color>, _stroke: Option<Color>) -> Result<(), RenderError> {
            self.pages.last_mut().unwrap().push(Op::Rect { rect, fill });
            Ok(())
        }

        fn draw_image(&mut self, rect: Rect, image: &ImageRef) -> Result<(), RenderError> {
            if self.fail_images {
                return Err(RenderError::Image {
                    path: image.path.clone(),
                    reason: "unreadable".to_string(),
                });
            }
            self.pages.last_mut().unwrap().push(Op::Image {
                rect,
                path: image.path.clone(),
            });
            Ok(())
        }

        fn break_page(&mut self) -> Result<(), RenderError> {
            self.pages.push(Vec::new());
            Ok(())
        }

        fn finish(&mut self) -> Result<Vec<u8>, RenderError> {
            Ok(format!("pages:{}", self.pages.len()).into_bytes())
        }
    }

    fn table(rows: usize) -> Block {
        Block::Table {
            header: vec!["Item".into(), "Qty".into(), "Price".into(), "Total".into()],
            rows: (0..rows)
                .map(|i| vec![format!("row{i}"), "1".into(), "10".into(), "10".into()])
                .collect(),
            totals: Some(vec!["Sum".into(), rows.to_string(), String::new(), "999".into()]),
        }
    }

    #[test]
    fn test_header_repeated_on_every_page() {
        let mut sink = RecordingSink::new();
        let bytes = render(&[table(120)], &StyleSheet::royal(), &mut sink).unwrap();

        assert!(sink.pages.len() > 1, "120 rows should not fit on one page");
        assert_eq!(bytes, format!("pages:{}", sink.pages.len()).into_bytes());
        for page in 0..sink.pages.len() {
            let texts = sink.texts(page);
            assert_eq!(texts.first(), Some(&"Item"), "page {page} should start with the header");
            assert_eq!(texts.iter().filter(|t| **t == "Item").count(), 1);
        }
    }

    #[test]
    fn test_rows_drawn_once_in_order() {
        let mut sink = RecordingSink::new();
        render(&[table(120)], &StyleSheet::royal(), &mut sink).unwrap();

        let drawn: Vec<String> = (0..sink.pages.len())
            .flat_map(|p| sink.texts(p).into_iter().map(str::to_string).collect::<Vec<_>>())
            .filter(|t| t.starts_with("row"))
            .collect();
        let expected: Vec<String> = (0..120).map(|i| format!("row{i}")).collect();
        assert_eq!(drawn, expected);
        let last = sink.texts(sink.pages.len() - 1);
        assert!(last.contains(&"Sum"));
    }

    #[test]
    fn test_short_table_single_page() {
        let mut sink = RecordingSink::new();
        render(&[table(3)], &StyleSheet::royal(), &mut sink).unwrap();
        assert_eq!(sink.pages.len(), 1);
    }

    #[test]
    fn test_mirrored_table_puts_name_on_the_right() {
        let x_of = |sink: &RecordingSink, label: &str| {
            sink.pages[0]
                .iter()
                .find_map(|op| match op {
                    Op::Text { x, text, .. } if text == label => Some(*x),
                    _ => None,
                })
                .unwrap()
        };

        let mut royal = RecordingSink::new();
        render(&[table(1)], &StyleSheet::royal(), &mut royal).unwrap();
        assert!(x_of(&royal, "Item") < x_of(&royal, "Qty"));

        let mut emerald = RecordingSink::new();
        render(&[table(1)], &StyleSheet::emerald(), &mut emerald).unwrap();
        assert!(x_of(&emerald, "Item") > x_of(&emerald, "Qty"));
    }

    #[test]
    fn test_rows_alternate_backgrounds() {
        let style = StyleSheet::royal();
        let mut sink = RecordingSink::new();
        render(&[table(2)], &style, &mut sink).unwrap();
        let fills: Vec<Color> = sink.pages[0]
            .iter()
            .filter_map(|op| match op {
                Op::Rect { fill: Some(c), .. } => Some(*c),
                _ => None,
            })
            .collect();
        // header (4 cells), row0 (4), row1 (4), totals (4)
        assert_eq!(fills.len(), 16);
        assert_eq!(fills[4], style.table.row_backgrounds[0]);
        assert_eq!(fills[8], style.table.row_backgrounds[1]);
        assert_eq!(fills[12], style.table.totals_background);
    }

    #[test]
    fn test_qr_panel_draws_every_entry() {
        let entries: Vec<QrEntry> = (0..3)
            .map(|i| QrEntry {
                payload: format!("https://example.com/{i}"),
                image: ImageRef {
                    path: PathBuf::from(format!("qr-{i}.png")),
                },
                caption: format!("cap{i}"),
            })
            .collect();
        let mut sink = RecordingSink::new();
        render(&[Block::QrPanel { entries }], &StyleSheet::royal(), &mut sink).unwrap();

        let images: Vec<&Rect> = sink.pages[0]
            .iter()
            .filter_map(|op| match op {
                Op::Image { rect, .. } => Some(rect),
                _ => None,
            })
            .collect();
        assert_eq!(images.len(), 3);
        // first entry drawn rightmost
        assert!(images[0].x > images[1].x && images[1].x > images[2].x);
        assert_eq!(sink.texts(0), vec!["cap0", "cap1", "cap2"]);
    }

    #[test]
    fn test_sink_failure_is_propagated() {
        let entries = vec![QrEntry {
            payload: "x".into(),
            image: ImageRef {
                path: PathBuf::from("missing.png"),
            },
            caption: "c".into(),
        }];
        let mut sink = RecordingSink::new();
        sink.fail_images = true;
        let err = render(&[Block::QrPanel { entries }], &StyleSheet::royal(), &mut sink).unwrap_err();
        assert!(matches!(err, RenderError::Image { .. }));
    }

    #[test]
    fn test_long_footer_wraps() {
        let text = "thanks ".repeat(60);
        let mut sink = RecordingSink::new();
        render(
            &[Block::Text {
                text: text.trim().to_string(),
                role: TextRole::Footer,
            }],
            &StyleSheet::royal(),
            &mut sink,
        )
        .unwrap();
        let lines = sink.texts(0);
        assert!(lines.len() > 1);
        assert_eq!(lines.join(" ").split(' ').count(), 60);
    }

    #[test]
    fn test_renderer_state_is_per_document() {
        let style = StyleSheet::royal();
        let blocks = [table(120)];
        let mut first = RecordingSink::new();
        let mut second = RecordingSink::new();
        render(&blocks, &style, &mut first).unwrap();
        render(&blocks, &style, &mut second).unwrap();
        assert_eq!(first.pages, second.pages);
    }
}
