//! The order pipeline.
//!
//! A run moves through fixed stages, each receiving the same immutable
//! `TimeWindow`:
//! - **Fetch**: list orders created in the window
//! - **Enrich**: fetch line items for every order concurrently
//! - **Render**: write one XML document per order
//! - **Archive**: compress the batch directory
//! - **Deliver**: mail the archive to the recipient
//!
//! Stages report their own failures and hand back a resolved error, so a
//! failure reaches the operator exactly once however far it propagates.

mod deliver;
mod enrich;
mod error;
mod fetch;
mod render;
mod runner;
mod types;

pub use deliver::{ArchiveStage, DeliveryStage};
pub use enrich::OrderEnricher;
pub use error::{PipelineError, Resolution, StageError, StageOrigin};
pub use fetch::OrderFetcher;
pub use render::BatchRenderer;
pub use runner::PipelineRunner;
pub use types::{Batch, BatchLocation, NonEmpty, RunOutcome, RunReport, RunState};
