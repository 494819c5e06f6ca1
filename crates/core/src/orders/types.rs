//! Order domain types.

use serde::{Deserialize, Serialize};

/// A marketplace order as listed by the order API, before enrichment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// Marketplace order id (e.g. `113-1234567-1234567`).
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buyer_name: Option<String>,
    #[serde(default)]
    pub shipping_address: ShippingAddress,
}

impl Order {
    /// Attaches the fetched line items. Consumes the order so enrichment
    /// happens exactly once.
    pub fn with_line_items(self, line_items: Vec<LineItem>) -> EnrichedOrder {
        EnrichedOrder {
            order: self,
            line_items,
        }
    }
}

/// Shipping address fields. Every field is optional in the source API.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShippingAddress {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address_line1: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address_line2: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address_line3: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_or_region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// A single line of an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub sku: String,
    pub title: String,
    pub quantity_ordered: u32,
    pub unit_price: Money,
}

/// Price as reported by the API. The amount is kept verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    pub currency: String,
    pub amount: String,
}

/// An order joined with its own line items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedOrder {
    pub order: Order,
    pub line_items: Vec<LineItem>,
}

impl EnrichedOrder {
    pub fn id(&self) -> &str {
        &self.order.id
    }
}
