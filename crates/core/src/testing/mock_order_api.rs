//! Mock order API for testing.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::orders::{LineItem, OneOrMany, Order, OrderApi, OrderApiError};
use crate::window::TimeWindow;

/// Mock implementation of the `OrderApi` trait.
///
/// Mirrors the real collaborator's shapes: one order (or item) comes back
/// as `OneOrMany::One`, several as `OneOrMany::Many`, none as `None`.
///
/// # Example
///
/// ```rust,ignore
/// let api = MockOrderApi::new();
/// api.set_orders(vec![fixtures::order("1"), fixtures::order("2")]).await;
/// api.set_items("1", vec![fixtures::line_item("SKU-1")]).await;
/// api.fail_items_for("2").await;
/// ```
#[derive(Debug, Default)]
pub struct MockOrderApi {
    orders: Arc<RwLock<Vec<Order>>>,
    items: Arc<RwLock<HashMap<String, Vec<LineItem>>>>,
    failing_items: Arc<RwLock<HashSet<String>>>,
    delays: Arc<RwLock<HashMap<String, Duration>>>,
    /// If set, the next `list_orders` call fails with this error.
    next_error: Arc<RwLock<Option<OrderApiError>>>,
    list_calls: Arc<RwLock<Vec<TimeWindow>>>,
    item_requests: Arc<RwLock<Vec<String>>>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

impl MockOrderApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_orders(&self, orders: Vec<Order>) {
        *self.orders.write().await = orders;
    }

    pub async fn set_items(&self, order_id: &str, items: Vec<LineItem>) {
        self.items.write().await.insert(order_id.to_string(), items);
    }

    /// Make `list_order_items` fail for this order id.
    pub async fn fail_items_for(&self, order_id: &str) {
        self.failing_items.write().await.insert(order_id.to_string());
    }

    /// Delay the `list_order_items` response for this order id.
    pub async fn set_items_delay(&self, order_id: &str, delay: Duration) {
        self.delays.write().await.insert(order_id.to_string(), delay);
    }

    pub async fn set_next_error(&self, error: OrderApiError) {
        *self.next_error.write().await = Some(error);
    }

    /// Windows passed to `list_orders`.
    pub async fn recorded_list_calls(&self) -> Vec<TimeWindow> {
        self.list_calls.read().await.clone()
    }

    /// Order ids passed to `list_order_items`, in call order.
    pub async fn recorded_item_requests(&self) -> Vec<String> {
        self.item_requests.read().await.clone()
    }

    /// Highest number of concurrent `list_order_items` calls observed.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OrderApi for MockOrderApi {
    fn name(&self) -> &str {
        "mock"
    }

    async fn list_orders(&self, window: &TimeWindow) -> Result<OneOrMany<Order>, OrderApiError> {
        self.list_calls.write().await.push(window.clone());

        if let Some(error) = self.next_error.write().await.take() {
            return Err(error);
        }

        let orders = self.orders.read().await.clone();
        Ok(OneOrMany::from(orders))
    }

    async fn list_order_items(
        &self,
        order_id: &str,
    ) -> Result<OneOrMany<LineItem>, OrderApiError> {
        self.item_requests.write().await.push(order_id.to_string());

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let delay = self.delays.read().await.get(order_id).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let result = if self.failing_items.read().await.contains(order_id) {
            Err(OrderApiError::ApiError {
                status: 500,
                message: format!("items unavailable for {}", order_id),
            })
        } else {
            let items = self
                .items
                .read()
                .await
                .get(order_id)
                .cloned()
                .unwrap_or_default();
            Ok(OneOrMany::from(items))
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}
