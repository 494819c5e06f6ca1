//! Testing utilities and mock implementations.
//!
//! Mocks for every port the pipeline depends on, so whole runs can be
//! exercised without the marketplace API or a mail provider.
//!
//! # Example
//!
//! ```rust,ignore
//! use orderfeed_core::testing::{fixtures, MockMailer, MockOrderApi};
//!
//! let api = MockOrderApi::new();
//! api.set_orders(vec![fixtures::order("113-1")]).await;
//!
//! let mailer = MockMailer::new();
//! // ... run the pipeline ...
//! assert_eq!(mailer.recorded_messages().await.len(), 1);
//! ```

mod mock_archiver;
mod mock_mailer;
mod mock_order_api;

pub use mock_archiver::MockArchiver;
pub use mock_mailer::MockMailer;
pub use mock_order_api::MockOrderApi;

/// Test fixtures and helper functions.
pub mod fixtures {
    use std::path::Path;

    use chrono::{DateTime, TimeZone, Utc};

    use crate::config::{
        BackfillConfig, Config, MailConfig, MarketplaceConfig, OutputConfig, PipelineConfig,
        ScheduleConfig, WindowConfig,
    };
    use crate::orders::{LineItem, Money, Order, ShippingAddress};
    use crate::window::{TimeWindow, WindowResolver};

    /// 2024-03-15 13:05 in Los Angeles.
    pub fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 15, 20, 5, 0)
            .single()
            .unwrap_or_else(Utc::now)
    }

    /// The default four-hour window ending five minutes before `now()`.
    pub fn window() -> TimeWindow {
        match WindowResolver::from_config(&WindowConfig::default()) {
            Ok(resolver) => resolver.resolve(now()),
            Err(e) => panic!("default window config rejected: {}", e),
        }
    }

    /// An order with a complete US shipping address.
    pub fn order(id: &str) -> Order {
        Order {
            id: id.to_string(),
            buyer_name: Some(format!("Buyer {}", id)),
            shipping_address: ShippingAddress {
                name: Some(format!("Buyer {}", id)),
                address_line1: Some("Receiving".to_string()),
                address_line2: Some("400 Pine St".to_string()),
                address_line3: None,
                city: Some("Seattle".to_string()),
                state_or_region: Some("WA".to_string()),
                postal_code: Some("98101".to_string()),
                country_code: Some("US".to_string()),
                phone: Some("555-0100".to_string()),
            },
        }
    }

    pub fn line_item(sku: &str) -> LineItem {
        LineItem {
            sku: sku.to_string(),
            title: format!("Item {}", sku),
            quantity_ordered: 1,
            unit_price: Money {
                currency: "USD".to_string(),
                amount: "19.99".to_string(),
            },
        }
    }

    pub fn mail_config() -> MailConfig {
        MailConfig {
            base_url: "https://api.mailgun.net".to_string(),
            domain: "mg.example.com".to_string(),
            api_key: "key-test".to_string(),
            recipient: "orders@example.com".to_string(),
            admin: "admin@example.com".to_string(),
            cc_admin: true,
            error_subject_prefix: "ORDER FEED ERROR".to_string(),
            timeout_secs: 30,
        }
    }

    pub fn marketplace_config() -> MarketplaceConfig {
        MarketplaceConfig {
            endpoint: "https://mws.amazonservices.com".to_string(),
            seller_id: "SELLER".to_string(),
            marketplace_id: "ATVPDKIKX0DER".to_string(),
            access_key_id: "AKID".to_string(),
            secret_key: "secret".to_string(),
            timeout_secs: 30,
        }
    }

    /// A full configuration writing batches under `base_dir`.
    pub fn config(base_dir: &Path) -> Config {
        Config {
            marketplace: marketplace_config(),
            mail: mail_config(),
            window: WindowConfig::default(),
            schedule: ScheduleConfig::default(),
            output: OutputConfig {
                base_dir: base_dir.to_path_buf(),
                remove_documents: false,
            },
            pipeline: PipelineConfig::default(),
            backfill: BackfillConfig::default(),
        }
    }
}
