//! The plain-text order summary sent ahead of the invoice document.
//!
//! Text stays in logical order: chat clients run their own bidi pass, so
//! shaping it here would scramble it.

use std::fmt::Write as _;

use crate::aggregate::OrderAggregate;
use crate::layout::format::{format_currency, format_distance, format_percent};
use crate::layout::{qr_targets, InvoiceSettings};
use crate::model::Order;

pub fn compose_summary(order: &Order, aggregate: &OrderAggregate, settings: &InvoiceSettings) -> String {
    let labels = &settings.labels;
    let money = |value| format_currency(value, &settings.currency_suffix);

    let mut out = String::new();
    let _ = writeln!(out, "{}", settings.shop_title);
    let _ = writeln!(out);
    let _ = writeln!(out, "{} {}", labels.customer_name, order.customer.name);
    let _ = writeln!(out, "{} {}", labels.phone, order.customer.phone);
    let _ = writeln!(out, "{} {}", labels.date, settings.format_timestamp(order));
    if let Some(meters) = aggregate.distance_meters {
        let _ = writeln!(
            out,
            "{} {}",
            labels.distance,
            format_distance(meters, &labels.distance_unit)
        );
    }

    let _ = writeln!(out);
    for (item, line_total) in order.items.iter().zip(&aggregate.line_totals) {
        let _ = writeln!(
            out,
            "- {} × {} = {}",
            item.name,
            item.quantity,
            money(*line_total)
        );
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "{} {}", labels.subtotal, money(aggregate.subtotal));
    if let Some(rate) = settings.tax_rate {
        let _ = writeln!(
            out,
            "{} ({}%): {}",
            labels.tax,
            format_percent(rate),
            money(aggregate.tax(rate))
        );
        let _ = writeln!(out, "{} {}", labels.grand_total, money(aggregate.total_with_tax(rate)));
    }

    // The shop's own location is not useful to the operator here.
    let links: Vec<_> = qr_targets(order, settings).into_iter().skip(1).collect();
    if !links.is_empty() {
        let _ = writeln!(out);
        for (url, caption) in links {
            let _ = writeln!(out, "{caption}: {url}");
        }
    }

    out.trim_end().to_string()
}
