//! Order Submission
//!
//! Builds the `POST /v2/orders` body from a typed [`OrderRequest`] and
//! submits it once.

use rust_decimal::Decimal;
use serde::Serialize;

use super::{RawResponse, RestClient, RestError, join_url};

/// Buy or sell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    /// Buy
    Buy,
    /// Sell
    Sell,
}

/// Order type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderType {
    /// Market order
    Market,
    /// Limit order
    Limit,
    /// Stop order
    Stop,
    /// Stop-limit order
    StopLimit,
}

/// Time in force.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeInForce {
    /// Day
    Day,
    /// Good till cancelled
    Gtc,
    /// Immediate or cancel
    Ioc,
    /// Fill or kill
    Fok,
    /// Market on open
    Opg,
    /// Market on close
    Cls,
}

/// One leg of a multi-leg (`mleg`) options order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderLeg {
    /// OCC option symbol.
    pub symbol: String,
    /// Leg side.
    pub side: OrderSide,
    /// Contracts per unit of the parent quantity.
    pub ratio_qty: u32,
}

/// Body of `POST /v2/orders`.
///
/// Prices and quantities serialize as strings, as the API expects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderRequest {
    /// Symbol; empty for multi-leg orders.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub symbol: String,

    /// Quantity.
    pub qty: Decimal,

    /// Side; absent for multi-leg orders.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub side: Option<OrderSide>,

    /// Order type.
    #[serde(rename = "type")]
    pub order_type: OrderType,

    /// Time in force.
    pub time_in_force: TimeInForce,

    /// Limit price (limit and stop-limit orders).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit_price: Option<Decimal>,

    /// Stop price (stop and stop-limit orders).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_price: Option<Decimal>,

    /// Client-chosen idempotency key.
    pub client_order_id: String,

    /// Order class; `"mleg"` when legs are present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_class: Option<&'static str>,

    /// Legs of a multi-leg order.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub legs: Vec<OrderLeg>,
}

impl OrderRequest {
    /// Market order with a fresh client order id.
    #[must_use]
    pub fn market(symbol: impl Into<String>, side: OrderSide, qty: Decimal) -> Self {
        Self {
            symbol: symbol.into(),
            qty,
            side: Some(side),
            order_type: OrderType::Market,
            time_in_force: TimeInForce::Day,
            limit_price: None,
            stop_price: None,
            client_order_id: uuid::Uuid::new_v4().to_string(),
            order_class: None,
            legs: Vec::new(),
        }
    }

    /// Limit order with a fresh client order id.
    #[must_use]
    pub fn limit(
        symbol: impl Into<String>,
        side: OrderSide,
        qty: Decimal,
        limit_price: Decimal,
    ) -> Self {
        Self {
            order_type: OrderType::Limit,
            limit_price: Some(limit_price),
            ..Self::market(symbol, side, qty)
        }
    }

    /// Multi-leg limit order; `limit_price` is the net debit/credit.
    #[must_use]
    pub fn multi_leg(legs: Vec<OrderLeg>, qty: Decimal, limit_price: Decimal) -> Self {
        Self {
            symbol: String::new(),
            qty,
            side: None,
            order_type: OrderType::Limit,
            time_in_force: TimeInForce::Day,
            limit_price: Some(limit_price),
            stop_price: None,
            client_order_id: uuid::Uuid::new_v4().to_string(),
            order_class: Some("mleg"),
            legs,
        }
    }

    /// Override time in force.
    #[must_use]
    pub const fn with_time_in_force(mut self, tif: TimeInForce) -> Self {
        self.time_in_force = tif;
        self
    }

    /// Add a stop price, turning market into stop and limit into stop-limit.
    #[must_use]
    pub fn with_stop_price(mut self, stop_price: Decimal) -> Self {
        self.stop_price = Some(stop_price);
        self.order_type = match self.order_type {
            OrderType::Limit | OrderType::StopLimit => OrderType::StopLimit,
            OrderType::Market | OrderType::Stop => OrderType::Stop,
        };
        self
    }

    /// Override the client order id.
    #[must_use]
    pub fn with_client_order_id(mut self, id: impl Into<String>) -> Self {
        self.client_order_id = id.into();
        self
    }
}

/// Submits orders to the trading API.
#[derive(Debug, Clone)]
pub struct OrdersClient {
    http: RestClient,
    base_url: String,
}

impl OrdersClient {
    /// Client for the trading host `base_url`.
    #[must_use]
    pub fn new(http: RestClient, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }

    /// Submit one order. The raw response is returned whatever its status.
    ///
    /// # Errors
    ///
    /// Returns [`RestError`] if no response was received.
    pub async fn submit(&self, order: &OrderRequest) -> Result<RawResponse, RestError> {
        tracing::info!(
            symbol = %order.symbol,
            client_order_id = %order.client_order_id,
            legs = order.legs.len(),
            "Submitting order"
        );
        self.http
            .post_json(&join_url(&self.base_url, "/v2/orders"), order)
            .await
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn limit_order_body() {
        let order = OrderRequest::limit("AAPL", OrderSide::Buy, Decimal::new(10, 0), Decimal::new(15025, 2))
            .with_time_in_force(TimeInForce::Gtc)
            .with_client_order_id("abc");

        let body = serde_json::to_value(&order).unwrap();
        assert_eq!(
            body,
            json!({
                "symbol": "AAPL",
                "qty": "10",
                "side": "buy",
                "type": "limit",
                "time_in_force": "gtc",
                "limit_price": "150.25",
                "client_order_id": "abc"
            })
        );
    }

    #[test]
    fn stop_price_upgrades_type() {
        let stop = OrderRequest::market("SPY", OrderSide::Sell, Decimal::ONE).with_stop_price(Decimal::new(400, 0));
        assert_eq!(stop.order_type, OrderType::Stop);

        let stop_limit = OrderRequest::limit("SPY", OrderSide::Sell, Decimal::ONE, Decimal::new(399, 0))
            .with_stop_price(Decimal::new(400, 0));
        assert_eq!(stop_limit.order_type, OrderType::StopLimit);
    }

    #[test]
    fn multi_leg_body() {
        let order = OrderRequest::multi_leg(
            vec![
                OrderLeg {
                    symbol: "AAPL240315C00170000".to_string(),
                    side: OrderSide::Buy,
                    ratio_qty: 1,
                },
                OrderLeg {
                    symbol: "AAPL240315C00175000".to_string(),
                    side: OrderSide::Sell,
                    ratio_qty: 1,
                },
            ],
            Decimal::ONE,
            Decimal::new(150, 2),
        );

        let body = serde_json::to_value(&order).unwrap();
        assert_eq!(body["order_class"], "mleg");
        assert!(body.get("symbol").is_none());
        assert!(body.get("side").is_none());
        assert_eq!(body["legs"][1]["side"], "sell");
    }

    #[test]
    fn client_order_ids_are_unique() {
        let a = OrderRequest::market("SPY", OrderSide::Buy, Decimal::ONE);
        let b = OrderRequest::market("SPY", OrderSide::Buy, Decimal::ONE);
        assert_ne!(a.client_order_id, b.client_order_id);
    }
}
