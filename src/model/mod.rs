//! # Order Model
//!
//! The normalized input of the pipeline: a customer, an ordered list of line
//! items, an optional photo link and the creation timestamp.
//!
//! On the wire `items` is a JSON object keyed by item name, the shape shop
//! front-ends already send. Object key order is the row order of the
//! invoice table, so it is deserialized straight into a `Vec` instead of a
//! map that would re-sort the keys.

use std::fmt;

use chrono::{DateTime, FixedOffset, Local};
use rust_decimal::Decimal;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::geo::GeoPoint;

/// A complete order ready for invoicing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub customer: Customer,

    /// Line items in insertion order.
    #[serde(
        deserialize_with = "deserialize_items",
        serialize_with = "serialize_items"
    )]
    pub items: Vec<LineItem>,

    /// Link to a photo of the order (shelf pick, receipt scan, ...).
    #[serde(default, alias = "photo_link", skip_serializing_if = "Option::is_none")]
    pub photo_link: Option<String>,

    /// When the order was placed. Defaults to the time of parsing.
    #[serde(default = "now", alias = "created_at")]
    pub created_at: DateTime<FixedOffset>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    pub name: String,
    pub phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<GeoPoint>,
}

/// One product line. `quantity` is signed so malformed input survives
/// parsing and is rejected by validation with a precise error.
#[derive(Debug, Clone, PartialEq)]
pub struct LineItem {
    pub name: String,
    pub unit_price: Decimal,
    pub quantity: i64,
}

impl LineItem {
    pub fn new(name: &str, unit_price: Decimal, quantity: i64) -> Self {
        Self {
            name: name.to_string(),
            unit_price,
            quantity,
        }
    }

    /// `unit_price * quantity`, or `None` if it does not fit in a `Decimal`.
    pub fn line_total(&self) -> Option<Decimal> {
        self.unit_price.checked_mul(Decimal::from(self.quantity))
    }
}

impl Order {
    /// Create an order timestamped now.
    pub fn new(customer: Customer, items: Vec<LineItem>) -> Self {
        Self {
            customer,
            items,
            photo_link: None,
            created_at: now(),
        }
    }

    pub fn with_photo_link(mut self, link: &str) -> Self {
        self.photo_link = Some(link.to_string());
        self
    }

    pub fn with_created_at(mut self, at: DateTime<FixedOffset>) -> Self {
        self.created_at = at;
        self
    }

    /// Parse an order from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

impl Customer {
    pub fn new(name: &str, phone: &str, location: Option<GeoPoint>) -> Self {
        Self {
            name: name.to_string(),
            phone: phone.to_string(),
            location,
        }
    }
}

fn now() -> DateTime<FixedOffset> {
    Local::now().fixed_offset()
}

/// The value side of an `items` entry.
#[derive(Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
struct ItemEntry {
    #[serde(alias = "unitPrice", alias = "unit_price")]
    price: Decimal,
    quantity: i64,
}

fn deserialize_items<'de, D>(deserializer: D) -> Result<Vec<LineItem>, D::Error>
where
    D: Deserializer<'de>,
{
    struct ItemsVisitor;

    impl<'de> Visitor<'de> for ItemsVisitor {
        type Value = Vec<LineItem>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("an object mapping item names to {price, quantity}")
        }

        fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut items = Vec::with_capacity(map.size_hint().unwrap_or(0));
            // Duplicate names are kept so validation can report them.
            while let Some((name, entry)) = map.next_entry::<String, ItemEntry>()? {
                items.push(LineItem {
                    name,
                    unit_price: entry.price,
                    quantity: entry.quantity,
                });
            }
            Ok(items)
        }
    }

    deserializer.deserialize_map(ItemsVisitor)
}

fn serialize_items<S>(items: &[LineItem], serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let mut map = serializer.serialize_map(Some(items.len()))?;
    for item in items {
        map.serialize_entry(
            &item.name,
            &ItemEntry {
                price: item.unit_price,
                quantity: item.quantity,
            },
        )?;
    }
    map.end()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_items_keep_json_key_order() {
        let json = r#"{
            "customer": { "name": "Ali", "phone": "0770" },
            "items": {
                "Zaatar": { "price": 1500, "quantity": 1 },
                "Apples": { "price": 500, "quantity": 4 },
                "Milk": { "price": 1000, "quantity": 2 }
            }
        }"#;
        let order = Order::from_json(json).unwrap();
        let names: Vec<&str> = order.items.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["Zaatar", "Apples", "Milk"]);
        assert_eq!(order.items[1].unit_price, Decimal::from(500));
        assert_eq!(order.items[1].quantity, 4);
    }

    #[test]
    fn test_duplicate_items_survive_parsing() {
        let json = r#"{
            "customer": { "name": "Ali", "phone": "0770" },
            "items": {
                "Milk": { "price": 1000, "quantity": 2 },
                "Milk": { "price": 1000, "quantity": 1 }
            }
        }"#;
        let order = Order::from_json(json).unwrap();
        assert_eq!(order.items.len(), 2);
    }

    #[test]
    fn test_optional_fields() {
        let json = r#"{
            "customer": {
                "name": "Ali",
                "phone": "0770",
                "location": { "lat": 32.6, "lng": 44.0 }
            },
            "items": { "X": { "unitPrice": 1, "quantity": 1 } },
            "photoLink": "https://example.com/p.jpg",
            "createdAt": "2026-03-01T10:15:00+03:00"
        }"#;
        let order = Order::from_json(json).unwrap();
        assert_eq!(order.customer.location, Some(GeoPoint { lat: 32.6, lng: 44.0 }));
        assert_eq!(order.photo_link.as_deref(), Some("https://example.com/p.jpg"));
        assert_eq!(order.created_at.format("%Y-%m-%d %H:%M").to_string(), "2026-03-01 10:15");
    }

    #[test]
    fn test_items_must_be_an_object() {
        let json = r#"{ "customer": { "name": "A", "phone": "1" }, "items": [1, 2] }"#;
        assert!(Order::from_json(json).is_err());
    }

    #[test]
    fn test_serialize_roundtrip_preserves_order() {
        let order = Order::new(
            Customer::new("Ali", "0770", None),
            vec![
                LineItem::new("B", Decimal::from(2), 1),
                LineItem::new("A", Decimal::from(1), 3),
            ],
        );
        let json = serde_json::to_string(&order).unwrap();
        assert!(json.find("\"B\"").unwrap() < json.find("\"A\"").unwrap());
        let back = Order::from_json(&json).unwrap();
        assert_eq!(back.items, order.items);
    }

    #[test]
    fn test_line_total() {
        let item = LineItem::new("X", Decimal::new(12_50, 2), 3);
        assert_eq!(item.line_total(), Some(Decimal::new(37_50, 2)));
    }

    #[test]
    fn test_line_total_overflow_is_none() {
        let item = LineItem::new("X", Decimal::MAX, 2);
        assert_eq!(item.line_total(), None);
    }
}
