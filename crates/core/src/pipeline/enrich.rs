//! Line-item enrichment stage.
//!
//! Fans out one `list_order_items` call per order and collects the results
//! through a single stream. Each future owns its order, so items can only
//! ever be attached to the order that requested them.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};

use crate::orders::{EnrichedOrder, Order, OrderApi};
use crate::report::ErrorReporter;
use crate::window::TimeWindow;

use super::error::{PipelineError, StageError, StageOrigin};
use super::types::NonEmpty;

pub struct OrderEnricher {
    api: Arc<dyn OrderApi>,
    reporter: Arc<ErrorReporter>,
    max_concurrent: usize,
}

impl OrderEnricher {
    pub fn new(api: Arc<dyn OrderApi>, reporter: Arc<ErrorReporter>, max_concurrent: usize) -> Self {
        Self {
            api,
            reporter,
            max_concurrent: max_concurrent.max(1),
        }
    }

    /// Attaches line items to every order.
    ///
    /// Output is in completion order. The first failing sub-fetch is
    /// reported once; the remaining in-flight requests are dropped.
    pub async fn enrich(
        &self,
        window: &TimeWindow,
        orders: NonEmpty<Order>,
    ) -> Result<Vec<EnrichedOrder>, PipelineError> {
        let total = orders.len();

        let mut pending = stream::iter(orders)
            .map(|order| {
                let api = Arc::clone(&self.api);
                async move {
                    debug!(order_id = %order.id, "Fetching order items");
                    match api.list_order_items(&order.id).await {
                        Ok(items) => Ok(order.with_line_items(items.into_vec())),
                        Err(source) => Err(StageError::OrderItems {
                            order_id: order.id,
                            source,
                        }),
                    }
                }
            })
            .buffer_unordered(self.max_concurrent);

        let mut enriched = Vec::with_capacity(total);
        while let Some(result) = pending.next().await {
            match result {
                Ok(order) => enriched.push(order),
                Err(cause) => {
                    drop(pending);
                    warn!("Enrichment aborted after {}/{} orders", enriched.len(), total);
                    let err = PipelineError::unresolved(StageOrigin::FetchOrderItems, cause);
                    return Err(self.reporter.resolve(err, window).await);
                }
            }
        }

        info!(count = enriched.len(), "Enriched orders with line items");
        Ok(enriched)
    }
}
