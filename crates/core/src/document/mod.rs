//! Order document rendering.
//!
//! Each enriched order becomes one cXML `OrderRequest` document. Address
//! lines longer than the schema allows are split into several elements.

mod chunk;
mod cxml;

pub use chunk::{chunk_text, ADDRESS_LINE_WIDTH};
pub use cxml::{render_order_document, DocumentOptions};

use thiserror::Error;

/// Errors produced while rendering a document.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("XML write failed: {0}")]
    Xml(String),

    #[error("Rendered document is not valid UTF-8")]
    Encoding(#[from] std::string::FromUtf8Error),
}
