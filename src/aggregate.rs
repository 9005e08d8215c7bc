//! # Order Aggregation
//!
//! Validates an [`Order`] once at the boundary and folds it into the numbers
//! every later stage reads: subtotal, item count and distance from the shop.

use rust_decimal::Decimal;
use std::collections::HashSet;

use crate::error::InvalidOrderError;
use crate::geo::{self, GeoPoint};
use crate::model::Order;

/// Derived, immutable totals for one order.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderAggregate {
    /// Sum of `unit_price * quantity` over all items.
    pub subtotal: Decimal,
    /// `unit_price * quantity` per item, in item order.
    pub line_totals: Vec<Decimal>,
    /// Sum of quantities.
    pub item_count: u64,
    /// Distance from the reference point, present iff the customer shared a location.
    pub distance_meters: Option<f64>,
}

impl OrderAggregate {
    /// Tax on the subtotal at `rate` (e.g. `0.05`).
    pub fn tax(&self, rate: Decimal) -> Decimal {
        self.subtotal.saturating_mul(rate)
    }

    /// Subtotal plus tax at `rate`.
    pub fn total_with_tax(&self, rate: Decimal) -> Decimal {
        self.subtotal.saturating_add(self.tax(rate))
    }
}

/// Check the invariants the rest of the pipeline relies on.
pub fn validate(order: &Order) -> Result<(), InvalidOrderError> {
    if order.items.is_empty() {
        return Err(InvalidOrderError::EmptyItems);
    }

    let mut seen = HashSet::with_capacity(order.items.len());
    for item in &order.items {
        if !seen.insert(item.name.as_str()) {
            return Err(InvalidOrderError::DuplicateItem(item.name.clone()));
        }
        if item.quantity < 1 {
            return Err(InvalidOrderError::NonPositiveQuantity {
                item: item.name.clone(),
                quantity: item.quantity,
            });
        }
        if item.unit_price < Decimal::ZERO {
            return Err(InvalidOrderError::NegativePrice {
                item: item.name.clone(),
                price: item.unit_price,
            });
        }
    }

    if let Some(location) = order.customer.location {
        if !location.is_valid() {
            return Err(InvalidOrderError::CoordinateOutOfRange {
                lat: location.lat,
                lng: location.lng,
            });
        }
    }

    Ok(())
}

/// Validate `order` and compute its aggregate relative to `reference`.
pub fn aggregate(order: &Order, reference: GeoPoint) -> Result<OrderAggregate, InvalidOrderError> {
    validate(order)?;

    let mut subtotal = Decimal::ZERO;
    let mut item_count: u64 = 0;
    let mut line_totals = Vec::with_capacity(order.items.len());
    for item in &order.items {
        let overflow = || InvalidOrderError::AmountOverflow {
            item: item.name.clone(),
        };
        let line_total = item.line_total().ok_or_else(overflow)?;
        subtotal = subtotal.checked_add(line_total).ok_or_else(overflow)?;
        // quantity >= 1 was checked above
        item_count = item_count
            .checked_add(item.quantity as u64)
            .ok_or_else(overflow)?;
        line_totals.push(line_total);
    }

    let distance_meters = order
        .customer
        .location
        .map(|location| geo::distance(reference, location));

    Ok(OrderAggregate {
        subtotal,
        line_totals,
        item_count,
        distance_meters,
    })
}
