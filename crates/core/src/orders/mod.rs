//! Marketplace order access.
//!
//! The `OrderApi` trait is the port the pipeline talks to; `MwsOrderApi`
//! is the HTTP adapter for the marketplace web service. Responses keep the
//! collaborator's single-vs-array inconsistency in the type (`OneOrMany`)
//! so the stages normalise it explicitly.

mod mws;
mod normalize;
mod types;
mod xml_tree;

pub use mws::MwsOrderApi;
pub use normalize::OneOrMany;
pub use types::*;
pub use xml_tree::{xml_to_value, XmlTreeError};

use async_trait::async_trait;
use thiserror::Error;

use crate::window::TimeWindow;

/// Errors that can occur when talking to the order API.
#[derive(Debug, Error)]
pub enum OrderApiError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Request timed out.
    #[error("Request timed out")]
    Timeout,

    /// The API returned an error response.
    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    /// Throttled by the API.
    #[error("Request throttled by the order API")]
    Throttled,

    /// Failed to parse response.
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// Client not configured (missing credentials, bad endpoint).
    #[error("Client not configured: {0}")]
    NotConfigured(String),
}

/// Port for listing orders and their items.
#[async_trait]
pub trait OrderApi: Send + Sync {
    /// Returns the name of this implementation.
    fn name(&self) -> &str;

    /// Lists orders created inside the window.
    async fn list_orders(&self, window: &TimeWindow) -> Result<OneOrMany<Order>, OrderApiError>;

    /// Lists the line items of one order.
    async fn list_order_items(&self, order_id: &str)
        -> Result<OneOrMany<LineItem>, OrderApiError>;
}
