//! Error types for the pipeline.
//!
//! Every stage failure is either `Unresolved` (nobody has been told yet)
//! or `Resolved` (the operator or the recipient has already been notified).
//! Only `Unresolved` errors may be handed to the error reporter; it turns
//! them into `Resolved` so the failure travels the rest of the way silently.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::archive::ArchiveError;
use crate::document::DocumentError;
use crate::mailer::MailerError;
use crate::orders::OrderApiError;

/// The pipeline step a failure came from. Used as the report subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageOrigin {
    FetchOrders,
    FetchOrderItems,
    CreateBatchDirectory,
    WriteOrderFile,
    CompressBatch,
    SendDeliveryEmail,
    SendNoOrdersNotice,
    Unhandled,
}

impl StageOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FetchOrders => "fetch orders",
            Self::FetchOrderItems => "fetch order items",
            Self::CreateBatchDirectory => "create batch directory",
            Self::WriteOrderFile => "write order file",
            Self::CompressBatch => "compress batch",
            Self::SendDeliveryEmail => "send delivery email",
            Self::SendNoOrdersNotice => "send no-orders notice",
            Self::Unhandled => "unhandled error",
        }
    }
}

impl fmt::Display for StageOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How an already-handled failure was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "origin", rename_all = "snake_case")]
pub enum Resolution {
    /// The operator received an error report for this origin.
    Reported(StageOrigin),
    /// The window was empty and the recipient was told so.
    NoOrders,
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reported(origin) => write!(f, "reported failure in {}", origin),
            Self::NoOrders => f.write_str("no orders in window"),
        }
    }
}

/// Underlying cause of a stage failure.
#[derive(Debug, Error)]
pub enum StageError {
    #[error(transparent)]
    OrderApi(#[from] OrderApiError),

    #[error("line items for order {order_id}")]
    OrderItems {
        order_id: String,
        #[source]
        source: OrderApiError,
    },

    #[error(transparent)]
    Mailer(#[from] MailerError),

    #[error(transparent)]
    Archive(#[from] ArchiveError),

    #[error(transparent)]
    Document(#[from] DocumentError),

    #[error("I/O error on {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("order id {0:?} is not usable as a file name")]
    InvalidOrderId(String),

    #[error("order id {0:?} appears more than once in the batch")]
    DuplicateOrderId(String),

    #[error("task failed: {0}")]
    Task(String),
}

impl StageError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Error returned by every pipeline stage.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A failure nobody has been notified about.
    #[error("{origin} failed")]
    Unresolved {
        origin: StageOrigin,
        #[source]
        cause: StageError,
    },

    /// A failure that has already been handled; propagate without reporting.
    #[error("{0}")]
    Resolved(Resolution),
}

impl PipelineError {
    pub fn unresolved(origin: StageOrigin, cause: impl Into<StageError>) -> Self {
        Self::Unresolved {
            origin,
            cause: cause.into(),
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved(_))
    }

    /// The originating stage, if known.
    pub fn origin(&self) -> Option<StageOrigin> {
        match self {
            Self::Unresolved { origin, .. } => Some(*origin),
            Self::Resolved(Resolution::Reported(origin)) => Some(*origin),
            Self::Resolved(Resolution::NoOrders) => None,
        }
    }
}
