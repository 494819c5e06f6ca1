//! Order fetch stage.

use std::sync::Arc;

use tracing::{info, warn};

use crate::notify::Notifier;
use crate::orders::{Order, OrderApi};
use crate::report::ErrorReporter;
use crate::window::TimeWindow;

use super::error::{PipelineError, Resolution, StageOrigin};
use super::types::NonEmpty;

/// Lists the orders created inside a window.
pub struct OrderFetcher {
    api: Arc<dyn OrderApi>,
    notifier: Arc<Notifier>,
    reporter: Arc<ErrorReporter>,
}

impl OrderFetcher {
    pub fn new(
        api: Arc<dyn OrderApi>,
        notifier: Arc<Notifier>,
        reporter: Arc<ErrorReporter>,
    ) -> Self {
        Self {
            api,
            notifier,
            reporter,
        }
    }

    /// Returns at least one order, or a resolved error.
    ///
    /// An empty window is not a failure: the recipient gets the no-orders
    /// notice and the run ends with `Resolution::NoOrders`.
    pub async fn fetch(&self, window: &TimeWindow) -> Result<NonEmpty<Order>, PipelineError> {
        let listed = match self.api.list_orders(window).await {
            Ok(listed) => listed,
            Err(e) => {
                let err = PipelineError::unresolved(StageOrigin::FetchOrders, e);
                return Err(self.reporter.resolve(err, window).await);
            }
        };

        let orders = listed.into_vec();
        info!(
            api = self.api.name(),
            count = orders.len(),
            "Fetched orders for {} - {}",
            window.start_label(),
            window.end_label()
        );

        match NonEmpty::new(orders) {
            Some(orders) => Ok(orders),
            None => {
                if let Err(e) = self.notifier.notify_no_orders(window).await {
                    warn!("No-orders notice failed: {}", e);
                    let err = PipelineError::unresolved(StageOrigin::SendNoOrdersNotice, e);
                    return Err(self.reporter.resolve(err, window).await);
                }
                Err(PipelineError::Resolved(Resolution::NoOrders))
            }
        }
    }
}
