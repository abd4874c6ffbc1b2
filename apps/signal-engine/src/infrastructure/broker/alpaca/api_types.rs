//! Alpaca API request and response types.
//!
//! These types map directly to Alpaca's REST API format.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::error::AlpacaError;
use crate::application::ports::{AssetClass, BrokerPosition, OrderAck, Quote};
use crate::domain::order_execution::{OrderIntent, OrderReport, OrderSide, OrderStatus};
use crate::domain::shared::{BrokerOrderId, ClientOrderId, Symbol};

// ============================================================================
// Order Request Types
// ============================================================================

/// Order request for Alpaca API.
#[derive(Debug, Clone, Serialize)]
pub struct AlpacaOrderRequest {
    /// Equity or OCC option symbol.
    pub symbol: String,
    /// Quantity (shares or contracts).
    pub qty: String,
    /// Order side.
    pub side: String,
    /// Order type.
    #[serde(rename = "type")]
    pub order_type: String,
    /// Time in force.
    pub time_in_force: String,
    /// Stop price (for stop orders).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_price: Option<String>,
    /// Client order ID.
    pub client_order_id: String,
}

impl From<&OrderIntent> for AlpacaOrderRequest {
    fn from(intent: &OrderIntent) -> Self {
        Self {
            symbol: intent.symbol.as_str().to_string(),
            qty: intent.quantity.normalize().to_string(),
            side: intent.side.as_str().to_string(),
            order_type: intent.order_type.as_str().to_string(),
            time_in_force: intent.time_in_force.as_str().to_string(),
            stop_price: intent.stop_price.map(|p| p.round_dp(2).to_string()),
            client_order_id: intent.client_order_id.as_str().to_string(),
        }
    }
}

// ============================================================================
// Order Response Types
// ============================================================================

/// Order response from Alpaca API.
#[derive(Debug, Clone, Deserialize)]
pub struct AlpacaOrderResponse {
    /// Broker order ID.
    pub id: String,
    /// Client order ID.
    pub client_order_id: String,
    /// Symbol.
    pub symbol: String,
    /// Quantity; absent for notional orders.
    #[serde(default)]
    pub qty: Option<String>,
    /// Filled quantity.
    #[serde(default)]
    pub filled_qty: Option<String>,
    /// Average fill price.
    #[serde(default)]
    pub filled_avg_price: Option<String>,
    /// Order status.
    pub status: String,
    /// Order side.
    pub side: String,
    /// Filled timestamp.
    #[serde(default)]
    pub filled_at: Option<DateTime<Utc>>,
}

impl AlpacaOrderResponse {
    /// Convert to `OrderAck`.
    #[must_use]
    pub fn to_order_ack(&self) -> OrderAck {
        OrderAck {
            broker_order_id: BrokerOrderId::new(&self.id),
            client_order_id: ClientOrderId::new(&self.client_order_id),
            status: OrderStatus::from_broker(&self.status),
        }
    }

    /// Convert to the domain `OrderReport`.
    pub fn to_report(&self) -> Result<OrderReport, AlpacaError> {
        let side = match self.side.as_str() {
            "buy" => OrderSide::Buy,
            "sell" => OrderSide::Sell,
            other => {
                return Err(AlpacaError::JsonParse(format!(
                    "unknown order side {other:?} on order {}",
                    self.id
                )));
            }
        };

        Ok(OrderReport {
            broker_order_id: BrokerOrderId::new(&self.id),
            symbol: Symbol::new(&self.symbol),
            side,
            status: OrderStatus::from_broker(&self.status),
            quantity: parse_optional(self.qty.as_deref(), "qty")?.unwrap_or(Decimal::ZERO),
            filled_quantity: parse_optional(self.filled_qty.as_deref(), "filled_qty")?
                .unwrap_or(Decimal::ZERO),
            filled_avg_price: parse_optional(self.filled_avg_price.as_deref(), "filled_avg_price")?,
            filled_at: self.filled_at,
        })
    }
}

// ============================================================================
// Position Types
// ============================================================================

/// Position response from Alpaca API.
#[derive(Debug, Clone, Deserialize)]
pub struct AlpacaPositionResponse {
    /// Symbol.
    pub symbol: String,
    /// Signed quantity.
    pub qty: String,
    /// Asset class (us_equity, us_option, crypto).
    pub asset_class: String,
    /// Average entry price.
    pub avg_entry_price: String,
    /// Current price.
    #[serde(default)]
    pub current_price: Option<String>,
}

impl AlpacaPositionResponse {
    /// Convert to the port's `BrokerPosition`.
    pub fn to_broker_position(&self) -> Result<BrokerPosition, AlpacaError> {
        Ok(BrokerPosition {
            symbol: Symbol::new(&self.symbol),
            quantity: parse_decimal(&self.qty, "qty")?,
            asset_class: AssetClass::from_broker(&self.asset_class),
            avg_entry_price: parse_decimal(&self.avg_entry_price, "avg_entry_price")?,
            current_price: parse_optional(self.current_price.as_deref(), "current_price")?,
        })
    }
}

// ============================================================================
// Market Data Types
// ============================================================================

/// Bid/ask pair as returned by the data API.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AlpacaQuote {
    /// Bid price.
    #[serde(default)]
    pub bp: Decimal,
    /// Ask price.
    #[serde(default)]
    pub ap: Decimal,
}

/// `/v2/stocks/{symbol}/quotes/latest` response.
#[derive(Debug, Clone, Deserialize)]
pub struct AlpacaStockQuoteResponse {
    /// Latest quote.
    pub quote: AlpacaQuote,
}

/// `/v1beta1/options/quotes/latest` response, keyed by contract symbol.
#[derive(Debug, Clone, Deserialize)]
pub struct AlpacaOptionQuotesResponse {
    /// Latest quote per requested contract.
    #[serde(default)]
    pub quotes: HashMap<String, AlpacaQuote>,
}

impl AlpacaQuote {
    /// Attach the symbol.
    #[must_use]
    pub fn into_quote(self, symbol: Symbol) -> Quote {
        Quote::new(symbol, self.bp, self.ap)
    }
}

// ============================================================================
// Account Types
// ============================================================================

/// Intraday equity curve from `/v2/account/portfolio/history`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortfolioHistory {
    /// Unix timestamps (seconds).
    #[serde(default)]
    pub timestamp: Vec<i64>,
    /// Equity at each timestamp.
    #[serde(default)]
    pub equity: Vec<Option<Decimal>>,
    /// Profit/loss since the period's base value.
    #[serde(default)]
    pub profit_loss: Vec<Option<Decimal>>,
    /// Profit/loss as a fraction of the base value.
    #[serde(default)]
    pub profit_loss_pct: Vec<Option<Decimal>>,
    /// Equity at the start of the period.
    #[serde(default)]
    pub base_value: Option<Decimal>,
    /// Sample spacing, e.g. `5Min`.
    #[serde(default)]
    pub timeframe: String,
}

// ============================================================================
// Error Types
// ============================================================================

/// Error response from Alpaca API.
#[derive(Debug, Clone, Deserialize)]
pub struct AlpacaErrorResponse {
    /// Error code; Alpaca sends a number, proxies sometimes a string.
    #[serde(default)]
    pub code: Option<serde_json::Value>,
    /// Error message.
    pub message: String,
}

impl AlpacaErrorResponse {
    /// Error code as plain text.
    #[must_use]
    pub fn code_string(&self) -> Option<String> {
        match self.code.as_ref()? {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Null => None,
            other => Some(other.to_string()),
        }
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

fn parse_decimal(raw: &str, field: &str) -> Result<Decimal, AlpacaError> {
    raw.parse()
        .map_err(|_| AlpacaError::JsonParse(format!("{field} is not a decimal: {raw:?}")))
}

fn parse_optional(raw: Option<&str>, field: &str) -> Result<Option<Decimal>, AlpacaError> {
    raw.filter(|s| !s.is_empty())
        .map(|s| parse_decimal(s, field))
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn order_json(status: &str, filled_avg_price: &str) -> String {
        format!(
            r#"{{
                "id": "61e69015-8549-4bfd-b9c3-01e75843f47d",
                "client_order_id": "entry-4f1c2a9b8d7e",
                "symbol": "AAPL",
                "qty": "10",
                "filled_qty": "10",
                "filled_avg_price": {filled_avg_price},
                "status": "{status}",
                "side": "buy",
                "type": "market",
                "time_in_force": "day",
                "filled_at": "2024-06-18T14:31:02.123Z"
            }}"#
        )
    }

    #[test]
    fn order_response_to_report() {
        let response: AlpacaOrderResponse =
            serde_json::from_str(&order_json("filled", "\"187.12\"")).unwrap();
        let report = response.to_report().unwrap();
        assert_eq!(report.status, OrderStatus::Filled);
        assert_eq!(report.side, OrderSide::Buy);
        assert_eq!(report.filled_quantity, dec!(10));
        assert_eq!(report.filled_avg_price, Some(dec!(187.12)));
        assert!(report.filled_at.is_some());
    }

    #[test]
    fn null_fill_price_stays_none() {
        let response: AlpacaOrderResponse =
            serde_json::from_str(&order_json("accepted", "null")).unwrap();
        let report = response.to_report().unwrap();
        assert_eq!(report.status, OrderStatus::Accepted);
        assert_eq!(report.filled_avg_price, None);
    }

    #[test]
    fn order_response_to_ack() {
        let response: AlpacaOrderResponse =
            serde_json::from_str(&order_json("new", "null")).unwrap();
        let ack = response.to_order_ack();
        assert_eq!(ack.client_order_id.as_str(), "entry-4f1c2a9b8d7e");
        assert_eq!(ack.status, OrderStatus::New);
    }

    #[test]
    fn order_request_from_stop_intent() {
        let intent = OrderIntent::stop(Symbol::new("AAPL"), OrderSide::Sell, dec!(10), dec!(99.70));
        let request = AlpacaOrderRequest::from(&intent);
        assert_eq!(request.order_type, "stop");
        assert_eq!(request.time_in_force, "gtc");
        assert_eq!(request.stop_price.as_deref(), Some("99.70"));
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["type"], "stop");
        assert_eq!(json["qty"], "10");
    }

    #[test]
    fn market_request_omits_stop_price() {
        let intent = OrderIntent::market(Symbol::new("TSLA"), OrderSide::Buy, dec!(5));
        let json = serde_json::to_value(AlpacaOrderRequest::from(&intent)).unwrap();
        assert!(json.get("stop_price").is_none());
        assert_eq!(json["side"], "buy");
    }

    #[test]
    fn position_keeps_sign_and_asset_class() {
        let response: AlpacaPositionResponse = serde_json::from_str(
            r#"{"symbol":"SPY240621C00450000","qty":"-2","asset_class":"us_option",
                "avg_entry_price":"3.15","current_price":"2.80"}"#,
        )
        .unwrap();
        let position = response.to_broker_position().unwrap();
        assert_eq!(position.quantity, dec!(-2));
        assert_eq!(position.asset_class, AssetClass::UsOption);
        assert_eq!(position.current_price, Some(dec!(2.80)));
    }

    #[test]
    fn quotes_accept_numeric_prices() {
        let stock: AlpacaStockQuoteResponse =
            serde_json::from_str(r#"{"symbol":"AAPL","quote":{"bp":187.1,"ap":187.3,"bs":2}}"#)
                .unwrap();
        let quote = stock.quote.into_quote(Symbol::new("AAPL"));
        assert_eq!(quote.reference_price(), Some(dec!(187.2)));

        let options: AlpacaOptionQuotesResponse = serde_json::from_str(
            r#"{"quotes":{"SPY240621C00450000":{"bp":0,"ap":1.25}}}"#,
        )
        .unwrap();
        let quote = options.quotes["SPY240621C00450000"]
            .clone()
            .into_quote(Symbol::new("SPY240621C00450000"));
        assert_eq!(quote.reference_price(), Some(dec!(1.25)));
    }

    #[test]
    fn error_code_as_text() {
        let err: AlpacaErrorResponse =
            serde_json::from_str(r#"{"code":40310000,"message":"insufficient qty"}"#).unwrap();
        assert_eq!(err.code_string().as_deref(), Some("40310000"));
        let err: AlpacaErrorResponse = serde_json::from_str(r#"{"message":"boom"}"#).unwrap();
        assert_eq!(err.code_string(), None);
    }
}
