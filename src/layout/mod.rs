//! # Invoice Layout
//!
//! Turns a validated order and its aggregate into the ordered list of
//! [`Block`]s the renderer draws. All text in a block is already shaped;
//! the renderer never shapes.
//!
//! Block order is fixed:
//!
//! 1. title bar
//! 2. customer panel
//! 3. items table with a totals row
//! 4. tax summary panel (when a tax rate is configured)
//! 5. QR panel (when at least one QR encodes)
//! 6. footer
//!
//! Table cells are kept in logical column order (name, quantity, unit
//! price, line total). Mirroring for right-to-left presets happens at
//! render time.

pub mod format;

use std::fmt::Write as _;
use std::path::PathBuf;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::aggregate::OrderAggregate;
use crate::error::QrError;
use crate::geo::GeoPoint;
use crate::model::Order;
use crate::style::{StyleSheet, TextRole};
use crate::text::shape;

use format::{format_currency, format_distance, format_percent, group_thousands};

/// An encoded image on disk, owned by the render workspace.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageRef {
    pub path: PathBuf,
}

/// One QR code in the QR panel.
#[derive(Debug, Clone, PartialEq)]
pub struct QrEntry {
    /// The text encoded in the QR code (a URL).
    pub payload: String,
    pub image: ImageRef,
    /// Shaped caption drawn under the code.
    pub caption: String,
}

/// One label/value row of a key-value panel.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyValueRow {
    pub label: String,
    pub value: String,
    /// Draw with the panel highlight background.
    pub highlight: bool,
    /// Draw with the emphasis text style.
    pub emphasis: bool,
}

impl KeyValueRow {
    fn plain(label: &str, value: String) -> Self {
        Self {
            label: shape(label),
            value,
            highlight: false,
            emphasis: false,
        }
    }
}

/// An abstract, style-independent unit of invoice content.
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Title {
        text: String,
    },
    KeyValue {
        rows: Vec<KeyValueRow>,
    },
    Table {
        header: Vec<String>,
        rows: Vec<Vec<String>>,
        totals: Option<Vec<String>>,
    },
    QrPanel {
        entries: Vec<QrEntry>,
    },
    Text {
        text: String,
        role: TextRole,
    },
}

/// Labels used in panels and table headers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Labels {
    pub customer_name: String,
    pub phone: String,
    pub date: String,
    pub distance: String,
    pub distance_unit: String,
    pub item: String,
    pub quantity: String,
    pub unit_price: String,
    pub line_total: String,
    pub totals: String,
    pub subtotal: String,
    pub tax: String,
    pub grand_total: String,
}

impl Default for Labels {
    fn default() -> Self {
        Self {
            customer_name: "اسم العميل:".to_string(),
            phone: "رقم الهاتف:".to_string(),
            date: "التاريخ:".to_string(),
            distance: "المسافة:".to_string(),
            distance_unit: "كم".to_string(),
            item: "المنتج".to_string(),
            quantity: "الكمية".to_string(),
            unit_price: "السعر".to_string(),
            line_total: "المجموع".to_string(),
            totals: "الإجمالي".to_string(),
            subtotal: "المجموع الفرعي:".to_string(),
            tax: "الضريبة".to_string(),
            grand_total: "المبلغ الكلي:".to_string(),
        }
    }
}

/// Captions under the QR codes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QrCaptions {
    pub shop: String,
    pub customer: String,
    pub photo: String,
}

impl Default for QrCaptions {
    fn default() -> Self {
        Self {
            shop: "موقع المتجر".to_string(),
            customer: "موقع العميل".to_string(),
            photo: "صورة الطلب".to_string(),
        }
    }
}

/// Per-shop invoice content settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InvoiceSettings {
    pub shop_title: String,
    pub currency_suffix: String,
    /// `None` disables the tax summary panel.
    pub tax_rate: Option<Decimal>,
    /// The shop's location; distances are measured from here.
    pub reference: GeoPoint,
    pub footer: String,
    /// chrono format string for the order timestamp.
    pub timestamp_format: String,
    /// Prefix of the delivered document's caption.
    pub caption_prefix: String,
    pub labels: Labels,
    pub qr_captions: QrCaptions,
}

impl Default for InvoiceSettings {
    fn default() -> Self {
        Self {
            shop_title: "فاتورة طلب - سوبرماركت العراق".to_string(),
            currency_suffix: "د.ع".to_string(),
            tax_rate: Some(Decimal::new(5, 2)),
            reference: GeoPoint {
                lat: 32.6468089,
                lng: 43.9782430,
            },
            footer: "شكراً لتسوقكم من سوبرماركت العراق".to_string(),
            timestamp_format: "%Y-%m-%d %H:%M".to_string(),
            caption_prefix: "فاتورة طلب".to_string(),
            labels: Labels::default(),
            qr_captions: QrCaptions::default(),
        }
    }
}

impl InvoiceSettings {
    /// Caption for the delivered document, e.g. `فاتورة طلب - Ali`.
    pub fn document_caption(&self, order: &Order) -> String {
        format!("{} - {}", self.caption_prefix, order.customer.name)
    }

    pub fn format_timestamp(&self, order: &Order) -> String {
        let mut out = String::new();
        // A malformed user-supplied format makes Display fail.
        if write!(out, "{}", order.created_at.format(&self.timestamp_format)).is_err() {
            out = order.created_at.to_rfc3339();
        }
        out
    }
}

/// Build the block sequence for one invoice.
///
/// `qr` encodes a payload into an image. A failing entry is left out of the
/// QR panel; it never fails the invoice.
pub fn compose(
    order: &Order,
    aggregate: &OrderAggregate,
    settings: &InvoiceSettings,
    style: &StyleSheet,
    qr: &mut dyn FnMut(&str) -> Result<ImageRef, QrError>,
) -> Vec<Block> {
    let _span = tracing::debug_span!("compose", preset = %style.preset, items = order.items.len()).entered();
    let labels = &settings.labels;
    let money = |value: Decimal| shape(&format_currency(value, &settings.currency_suffix));

    let mut blocks = Vec::with_capacity(6);

    blocks.push(Block::Title {
        text: shape(&settings.shop_title),
    });

    blocks.push(Block::KeyValue {
        rows: customer_rows(order, aggregate, settings),
    });

    let header = vec![
        shape(&labels.item),
        shape(&labels.quantity),
        shape(&labels.unit_price),
        shape(&labels.line_total),
    ];
    let rows = order
        .items
        .iter()
        .zip(&aggregate.line_totals)
        .map(|(item, line_total)| {
            vec![
                shape(&item.name),
                group_thousands(Decimal::from(item.quantity)),
                money(item.unit_price),
                money(*line_total),
            ]
        })
        .collect();
    let totals = vec![
        shape(&labels.totals),
        group_thousands(Decimal::from(aggregate.item_count)),
        String::new(),
        money(aggregate.subtotal),
    ];
    blocks.push(Block::Table {
        header,
        rows,
        totals: Some(totals),
    });

    if let Some(rate) = settings.tax_rate {
        let tax_label = format!("{} ({}%):", labels.tax, format_percent(rate));
        blocks.push(Block::KeyValue {
            rows: vec![
                KeyValueRow::plain(&labels.subtotal, money(aggregate.subtotal)),
                KeyValueRow::plain(&tax_label, money(aggregate.tax(rate))),
                KeyValueRow {
                    emphasis: true,
                    highlight: true,
                    ..KeyValueRow::plain(&labels.grand_total, money(aggregate.total_with_tax(rate)))
                },
            ],
        });
    }

    let entries = qr_entries(order, settings, qr);
    if !entries.is_empty() {
        blocks.push(Block::QrPanel { entries });
    }

    blocks.push(Block::Text {
        text: shape(&settings.footer),
        role: TextRole::Footer,
    });

    blocks
}

fn customer_rows(order: &Order, aggregate: &OrderAggregate, settings: &InvoiceSettings) -> Vec<KeyValueRow> {
    let labels = &settings.labels;
    let mut rows = vec![
        KeyValueRow {
            highlight: true,
            ..KeyValueRow::plain(&labels.customer_name, shape(&order.customer.name))
        },
        KeyValueRow::plain(&labels.phone, shape(&order.customer.phone)),
        KeyValueRow::plain(&labels.date, shape(&settings.format_timestamp(order))),
    ];
    if let Some(meters) = aggregate.distance_meters {
        rows.push(KeyValueRow::plain(
            &labels.distance,
            shape(&format_distance(meters, &labels.distance_unit)),
        ));
    }
    rows
}

/// QR targets in panel order: shop location, customer location, photo.
pub fn qr_targets(order: &Order, settings: &InvoiceSettings) -> Vec<(String, String)> {
    let captions = &settings.qr_captions;
    let mut targets = vec![(settings.reference.maps_url(), captions.shop.clone())];
    if let Some(location) = order.customer.location {
        targets.push((location.maps_url(), captions.customer.clone()));
    }
    if let Some(link) = order.photo_link.as_deref().filter(|l| !l.trim().is_empty()) {
        targets.push((link.to_string(), captions.photo.clone()));
    }
    targets
}

fn qr_entries(
    order: &Order,
    settings: &InvoiceSettings,
    qr: &mut dyn FnMut(&str) -> Result<ImageRef, QrError>,
) -> Vec<QrEntry> {
    qr_targets(order, settings)
        .into_iter()
        .filter_map(|(payload, caption)| match qr(&payload) {
            Ok(image) => Some(QrEntry {
                payload,
                image,
                caption: shape(&caption),
            }),
            Err(e) => {
                tracing::warn!(caption = %caption, error = %e, "qr entry omitted");
                None
            }
        })
        .collect()
}
