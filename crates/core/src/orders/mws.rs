//! Marketplace web service (MWS) Orders API client.
//!
//! Requests are form-encoded POSTs signed with HMAC-SHA256 (signature
//! version 2). Responses are XML and go through `xml_to_value`, so a
//! single `Order`/`OrderItem` element arrives as an object and several as
//! an array.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, SecondsFormat, Utc};
use hmac::{Hmac, Mac};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use serde_json::Value;
use sha2::Sha256;
use tracing::debug;

use crate::config::MarketplaceConfig;
use crate::window::TimeWindow;

use super::xml_tree::xml_to_value;
use super::{LineItem, Money, OneOrMany, Order, OrderApi, OrderApiError, ShippingAddress};

type HmacSha256 = Hmac<Sha256>;

const API_VERSION: &str = "2013-09-01";
const ORDERS_PATH: &str = "/Orders/2013-09-01";

/// Upper bound on `ListOrdersByNextToken` follow-ups for one window.
const MAX_ORDER_PAGES: usize = 100;

/// MWS Orders API client.
pub struct MwsOrderApi {
    client: Client,
    endpoint: Url,
    config: MarketplaceConfig,
}

impl MwsOrderApi {
    /// Create a new client.
    pub fn new(config: MarketplaceConfig) -> Result<Self, OrderApiError> {
        if config.access_key_id.is_empty() || config.secret_key.is_empty() {
            return Err(OrderApiError::NotConfigured(
                "MWS access key and secret are required".to_string(),
            ));
        }

        let endpoint = Url::parse(&config.endpoint).map_err(|e| {
            OrderApiError::NotConfigured(format!("invalid endpoint {}: {}", config.endpoint, e))
        })?;
        if endpoint.host_str().is_none() {
            return Err(OrderApiError::NotConfigured(format!(
                "endpoint {} has no host",
                config.endpoint
            )));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint,
            config,
        })
    }

    /// `host[:port]` as it appears in the string to sign.
    fn signing_host(&self) -> String {
        let host = self.endpoint.host_str().unwrap_or_default().to_lowercase();
        match self.endpoint.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host,
        }
    }

    /// Builds the signed, form-encoded request body for `action`.
    fn signed_body(
        &self,
        action: &str,
        extra: &[(&str, String)],
        timestamp: DateTime<Utc>,
    ) -> Result<String, OrderApiError> {
        let mut params: BTreeMap<&str, String> = BTreeMap::new();
        params.insert("AWSAccessKeyId", self.config.access_key_id.clone());
        params.insert("Action", action.to_string());
        params.insert("SellerId", self.config.seller_id.clone());
        params.insert("MarketplaceId.Id.1", self.config.marketplace_id.clone());
        params.insert("SignatureMethod", "HmacSHA256".to_string());
        params.insert("SignatureVersion", "2".to_string());
        params.insert(
            "Timestamp",
            timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
        );
        params.insert("Version", API_VERSION.to_string());
        for (key, value) in extra {
            params.insert(*key, value.clone());
        }

        let canonical = params
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");

        let string_to_sign = format!("POST\n{}\n{}\n{}", self.signing_host(), ORDERS_PATH, canonical);
        let signature = sign(&self.config.secret_key, &string_to_sign)?;

        Ok(format!(
            "{}&Signature={}",
            canonical,
            urlencoding::encode(&signature)
        ))
    }

    /// Issues one call and returns the response as a tree.
    async fn call(&self, action: &str, extra: &[(&str, String)]) -> Result<Value, OrderApiError> {
        let body = self.signed_body(action, extra, Utc::now())?;
        let url = self
            .endpoint
            .join(ORDERS_PATH)
            .map_err(|e| OrderApiError::NotConfigured(e.to_string()))?;

        debug!(action = action, "Calling MWS");

        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded; charset=utf-8")
            .body(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    OrderApiError::Timeout
                } else {
                    OrderApiError::HttpError(e)
                }
            })?;

        let status = response.status();
        let text = response.text().await?;

        if status == StatusCode::SERVICE_UNAVAILABLE && text.contains("RequestThrottled") {
            return Err(OrderApiError::Throttled);
        }
        if !status.is_success() {
            return Err(OrderApiError::ApiError {
                status: status.as_u16(),
                message: text.chars().take(200).collect(),
            });
        }

        xml_to_value(&text).map_err(|e| OrderApiError::ParseError(e.to_string()))
    }
}

#[async_trait]
impl OrderApi for MwsOrderApi {
    fn name(&self) -> &str {
        "mws"
    }

    async fn list_orders(&self, window: &TimeWindow) -> Result<OneOrMany<Order>, OrderApiError> {
        let tree = self
            .call(
                "ListOrders",
                &[
                    ("CreatedAfter", window.start_iso()),
                    ("CreatedBefore", window.end_iso()),
                ],
            )
            .await?;
        let (mut orders, mut next_token) = parse_orders_page(&tree, "ListOrders")?;

        let mut pages = 1;
        while let Some(token) = next_token {
            if pages >= MAX_ORDER_PAGES {
                return Err(OrderApiError::ParseError(format!(
                    "ListOrders still paging after {} pages",
                    MAX_ORDER_PAGES
                )));
            }
            let tree = self
                .call("ListOrdersByNextToken", &[("NextToken", token)])
                .await?;
            let (page, token) = parse_orders_page(&tree, "ListOrdersByNextToken")?;
            pages += 1;
            debug!(page = pages, count = page.len(), "MWS listed next order page");
            orders.extend(page);
            next_token = token;
        }

        debug!(count = orders.len(), pages = pages, "MWS listed orders");
        Ok(OneOrMany::from(orders))
    }

    async fn list_order_items(
        &self,
        order_id: &str,
    ) -> Result<OneOrMany<LineItem>, OrderApiError> {
        let tree = self
            .call("ListOrderItems", &[("AmazonOrderId", order_id.to_string())])
            .await?;

        let node = node_at(
            &tree,
            "/ListOrderItemsResponse/ListOrderItemsResult/OrderItems/OrderItem",
        );
        let items = OneOrMany::<MwsOrderItem>::from_value(node)
            .map_err(|e| OrderApiError::ParseError(format!("ListOrderItems {}: {}", order_id, e)))?;

        items.try_map(LineItem::try_from)
    }
}

fn sign(secret: &str, payload: &str) -> Result<String, OrderApiError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| OrderApiError::NotConfigured(e.to_string()))?;
    mac.update(payload.as_bytes());
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

/// Orders on one `ListOrders`/`ListOrdersByNextToken` page, plus the token
/// for the next page when there is one.
fn parse_orders_page(
    tree: &Value,
    action: &str,
) -> Result<(Vec<Order>, Option<String>), OrderApiError> {
    let result = format!("/{action}Response/{action}Result");
    let node = node_at(tree, &format!("{}/Orders/Order", result));
    let orders = OneOrMany::<MwsOrder>::from_value(node)
        .map_err(|e| OrderApiError::ParseError(format!("{}: {}", action, e)))?;

    let next_token = tree
        .pointer(&format!("{}/NextToken", result))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string);

    Ok((orders.map(Order::from).into_vec(), next_token))
}

fn node_at(tree: &Value, pointer: &str) -> Value {
    tree.pointer(pointer).cloned().unwrap_or(Value::Null)
}

// MWS response types
#[derive(Debug, Deserialize)]
#[allow(non_snake_case)]
struct MwsOrder {
    AmazonOrderId: String,
    #[serde(default)]
    BuyerName: Option<String>,
    #[serde(default)]
    ShippingAddress: OneOrMany<MwsAddress>,
}

#[derive(Debug, Deserialize)]
#[allow(non_snake_case)]
struct MwsAddress {
    Name: Option<String>,
    AddressLine1: Option<String>,
    AddressLine2: Option<String>,
    AddressLine3: Option<String>,
    City: Option<String>,
    StateOrRegion: Option<String>,
    PostalCode: Option<String>,
    CountryCode: Option<String>,
    Phone: Option<String>,
}

#[derive(Debug, Deserialize)]
#[allow(non_snake_case)]
struct MwsOrderItem {
    #[serde(default)]
    SellerSKU: String,
    #[serde(default)]
    Title: String,
    QuantityOrdered: String,
    #[serde(default)]
    ItemPrice: OneOrMany<MwsMoney>,
}

#[derive(Debug, Deserialize)]
#[allow(non_snake_case)]
struct MwsMoney {
    #[serde(default)]
    CurrencyCode: String,
    #[serde(default)]
    Amount: String,
}

impl From<MwsOrder> for Order {
    fn from(raw: MwsOrder) -> Self {
        let shipping_address = raw
            .ShippingAddress
            .into_vec()
            .into_iter()
            .next()
            .map(|a| ShippingAddress {
                name: a.Name,
                address_line1: a.AddressLine1,
                address_line2: a.AddressLine2,
                address_line3: a.AddressLine3,
                city: a.City,
                state_or_region: a.StateOrRegion,
                postal_code: a.PostalCode,
                country_code: a.CountryCode,
                phone: a.Phone,
            })
            .unwrap_or_default();

        Order {
            id: raw.AmazonOrderId,
            buyer_name: raw.BuyerName,
            shipping_address,
        }
    }
}

impl TryFrom<MwsOrderItem> for LineItem {
    type Error = OrderApiError;

    fn try_from(raw: MwsOrderItem) -> Result<Self, Self::Error> {
        let quantity_ordered = raw.QuantityOrdered.trim().parse::<u32>().map_err(|e| {
            OrderApiError::ParseError(format!(
                "QuantityOrdered {:?} for {}: {}",
                raw.QuantityOrdered, raw.SellerSKU, e
            ))
        })?;
        let unit_price = raw
            .ItemPrice
            .into_vec()
            .into_iter()
            .next()
            .map(|p| Money {
                currency: p.CurrencyCode,
                amount: p.Amount,
            })
            .unwrap_or_default();

        Ok(LineItem {
            sku: raw.SellerSKU,
            title: raw.Title,
            quantity_ordered,
            unit_price,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn config() -> MarketplaceConfig {
        MarketplaceConfig {
            endpoint: "https://mws.amazonservices.com".to_string(),
            seller_id: "SELLER".to_string(),
            marketplace_id: "ATVPDKIKX0DER".to_string(),
            access_key_id: "AKID".to_string(),
            secret_key: "secret".to_string(),
            timeout_secs: 30,
        }
    }

    #[test]
    fn test_sign_matches_hmac_sha256_vector() {
        // RFC 4231 test case 2, base64 encoded.
        let signature = sign("Jefe", "what do ya want for nothing?").unwrap();
        assert_eq!(signature, "W9zBRr9gdU5qBCQmCJV1x1oAPwidJzmDnexYuWTsOEM=");
    }

    #[test]
    fn test_new_requires_credentials() {
        let mut cfg = config();
        cfg.secret_key.clear();
        assert!(matches!(
            MwsOrderApi::new(cfg),
            Err(OrderApiError::NotConfigured(_))
        ));

        let mut cfg = config();
        cfg.endpoint = "not a url".to_string();
        assert!(matches!(
            MwsOrderApi::new(cfg),
            Err(OrderApiError::NotConfigured(_))
        ));
    }

    #[test]
    fn test_signed_body_is_sorted_and_encoded() {
        let api = MwsOrderApi::new(config()).unwrap();
        let timestamp = Utc.with_ymd_and_hms(2024, 3, 15, 20, 5, 0).unwrap();
        let body = api
            .signed_body(
                "ListOrders",
                &[
                    ("CreatedAfter", "2024-03-15T09:00:00-07:00".to_string()),
                    ("CreatedBefore", "2024-03-15T13:00:00-07:00".to_string()),
                ],
                timestamp,
            )
            .unwrap();

        assert!(body.starts_with("AWSAccessKeyId=AKID&Action=ListOrders&CreatedAfter="));
        assert!(body.contains("CreatedAfter=2024-03-15T09%3A00%3A00-07%3A00"));
        assert!(body.contains("MarketplaceId.Id.1=ATVPDKIKX0DER"));
        assert!(body.contains("Timestamp=2024-03-15T20%3A05%3A00Z"));
        assert!(body.contains("&Signature="));

        // Deterministic for identical inputs.
        let again = api
            .signed_body(
                "ListOrders",
                &[
                    ("CreatedAfter", "2024-03-15T09:00:00-07:00".to_string()),
                    ("CreatedBefore", "2024-03-15T13:00:00-07:00".to_string()),
                ],
                timestamp,
            )
            .unwrap();
        assert_eq!(body, again);
    }

    #[test]
    fn test_signing_host_keeps_explicit_port() {
        let mut cfg = config();
        cfg.endpoint = "http://LOCALHOST:8089".to_string();
        let api = MwsOrderApi::new(cfg).unwrap();
        assert_eq!(api.signing_host(), "localhost:8089");
    }

    #[test]
    fn test_single_order_response_decodes() {
        let xml = r#"<ListOrdersResponse>
  <ListOrdersResult>
    <Orders>
      <Order>
        <AmazonOrderId>111-0000001-0000001</AmazonOrderId>
        <BuyerName>Jo Buyer</BuyerName>
        <ShippingAddress>
          <Name>Jo Buyer</Name>
          <AddressLine1>1 Main St</AddressLine1>
          <City>Springfield</City>
          <CountryCode>US</CountryCode>
        </ShippingAddress>
      </Order>
    </Orders>
  </ListOrdersResult>
</ListOrdersResponse>"#;
        let tree = xml_to_value(xml).unwrap();
        let node = node_at(&tree, "/ListOrdersResponse/ListOrdersResult/Orders/Order");
        let orders: Vec<Order> = OneOrMany::<MwsOrder>::from_value(node)
            .unwrap()
            .map(Order::from)
            .into_vec();

        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].id, "111-0000001-0000001");
        assert_eq!(orders[0].buyer_name.as_deref(), Some("Jo Buyer"));
        assert_eq!(
            orders[0].shipping_address.city.as_deref(),
            Some("Springfield")
        );
        assert!(orders[0].shipping_address.address_line2.is_none());
    }

    #[test]
    fn test_orders_page_exposes_next_token() {
        let xml = r#"<ListOrdersResponse><ListOrdersResult>
  <NextToken>2YgYW55IGNhcm5hbCBwbGVhc3VyZS4=</NextToken>
  <Orders>
    <Order><AmazonOrderId>111-1</AmazonOrderId></Order>
    <Order><AmazonOrderId>111-2</AmazonOrderId></Order>
  </Orders>
</ListOrdersResult></ListOrdersResponse>"#;
        let tree = xml_to_value(xml).unwrap();
        let (orders, token) = parse_orders_page(&tree, "ListOrders").unwrap();

        assert_eq!(orders.len(), 2);
        assert_eq!(token.as_deref(), Some("2YgYW55IGNhcm5hbCBwbGVhc3VyZS4="));
    }

    #[test]
    fn test_next_token_page_parses_and_ends_paging() {
        let xml = r#"<ListOrdersByNextTokenResponse><ListOrdersByNextTokenResult>
  <Orders>
    <Order><AmazonOrderId>111-3</AmazonOrderId></Order>
  </Orders>
</ListOrdersByNextTokenResult></ListOrdersByNextTokenResponse>"#;
        let tree = xml_to_value(xml).unwrap();
        let (orders, token) = parse_orders_page(&tree, "ListOrdersByNextToken").unwrap();

        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].id, "111-3");
        assert!(token.is_none());
    }

    #[test]
    fn test_empty_orders_element_decodes_to_none() {
        let xml = "<ListOrdersResponse><ListOrdersResult><Orders/></ListOrdersResult></ListOrdersResponse>";
        let tree = xml_to_value(xml).unwrap();
        let node = node_at(&tree, "/ListOrdersResponse/ListOrdersResult/Orders/Order");
        let orders = OneOrMany::<MwsOrder>::from_value(node).unwrap();
        assert!(orders.is_empty());
    }

    #[test]
    fn test_order_items_decode_with_quantity_and_price() {
        let xml = r#"<ListOrderItemsResponse><ListOrderItemsResult><OrderItems>
  <OrderItem>
    <SellerSKU>SKU-1</SellerSKU>
    <Title>Widget</Title>
    <QuantityOrdered>2</QuantityOrdered>
    <ItemPrice><CurrencyCode>USD</CurrencyCode><Amount>19.98</Amount></ItemPrice>
  </OrderItem>
  <OrderItem>
    <SellerSKU>SKU-2</SellerSKU>
    <Title>Gadget</Title>
    <QuantityOrdered>1</QuantityOrdered>
  </OrderItem>
</OrderItems></ListOrderItemsResult></ListOrderItemsResponse>"#;
        let tree = xml_to_value(xml).unwrap();
        let node = node_at(
            &tree,
            "/ListOrderItemsResponse/ListOrderItemsResult/OrderItems/OrderItem",
        );
        let items = OneOrMany::<MwsOrderItem>::from_value(node)
            .unwrap()
            .try_map(LineItem::try_from)
            .unwrap()
            .into_vec();

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].quantity_ordered, 2);
        assert_eq!(items[0].unit_price.currency, "USD");
        assert_eq!(items[0].unit_price.amount, "19.98");
        assert_eq!(items[1].unit_price, Money::default());
    }

    #[test]
    fn test_bad_quantity_is_parse_error() {
        let raw = MwsOrderItem {
            SellerSKU: "SKU".to_string(),
            Title: "T".to_string(),
            QuantityOrdered: "two".to_string(),
            ItemPrice: OneOrMany::None,
        };
        assert!(matches!(
            LineItem::try_from(raw),
            Err(OrderApiError::ParseError(_))
        ));
    }
}
