//! Alpaca broker adapter implementing BrokerPort.

use async_trait::async_trait;

use crate::application::ports::{
    BrokerError, BrokerPort, BrokerPosition, OrderAck, OrderQueryStatus, Quote,
};
use crate::domain::order_execution::{OrderIntent, OrderReport};
use crate::domain::shared::{BrokerOrderId, ProductLine, Symbol};

use super::api_types::{
    AlpacaOptionQuotesResponse, AlpacaOrderRequest, AlpacaOrderResponse, AlpacaPositionResponse,
    AlpacaStockQuoteResponse, PortfolioHistory,
};
use super::config::{AlpacaConfig, AlpacaEnvironment};
use super::error::AlpacaError;
use super::http_client::AlpacaHttpClient;

/// Orders fetched per history listing.
const ORDER_HISTORY_LIMIT: u32 = 100;

/// Alpaca Markets broker adapter for one product account.
#[derive(Debug, Clone)]
pub struct AlpacaBrokerAdapter {
    client: AlpacaHttpClient,
    environment: AlpacaEnvironment,
    product: ProductLine,
}

impl AlpacaBrokerAdapter {
    /// Create an adapter for a product's account.
    pub fn new(config: &AlpacaConfig, product: ProductLine) -> Result<Self, AlpacaError> {
        let client = AlpacaHttpClient::new(config)?;
        Ok(Self {
            client,
            environment: config.environment,
            product,
        })
    }

    /// Check if we're in live trading mode.
    #[must_use]
    pub const fn is_live(&self) -> bool {
        self.environment.is_live()
    }

    /// The product account this adapter trades.
    #[must_use]
    pub const fn product(&self) -> ProductLine {
        self.product
    }

    /// Intraday equity curve for the current session, P&L reset daily.
    pub async fn portfolio_history(&self) -> Result<PortfolioHistory, BrokerError> {
        self.client
            .get("/v2/account/portfolio/history?intraday_reporting=market_hours&pnl_reset=per_day")
            .await
            .map_err(BrokerError::from)
    }
}

fn to_reports(responses: &[AlpacaOrderResponse]) -> Result<Vec<OrderReport>, BrokerError> {
    responses
        .iter()
        .map(|r| r.to_report().map_err(BrokerError::from))
        .collect()
}

#[async_trait]
impl BrokerPort for AlpacaBrokerAdapter {
    async fn submit_order(&self, intent: &OrderIntent) -> Result<OrderAck, BrokerError> {
        if self.is_live() {
            tracing::warn!(
                product = %self.product,
                client_order_id = %intent.client_order_id,
                symbol = %intent.symbol,
                "Submitting LIVE order - this will execute real trades"
            );
        }

        let request = AlpacaOrderRequest::from(intent);

        tracing::info!(
            product = %self.product,
            client_order_id = %request.client_order_id,
            symbol = %request.symbol,
            side = %request.side,
            order_type = %request.order_type,
            qty = %request.qty,
            stop_price = ?request.stop_price,
            "Submitting order to Alpaca"
        );

        let response: AlpacaOrderResponse = self
            .client
            .post("/v2/orders", &request)
            .await
            .map_err(BrokerError::from)?;

        tracing::info!(
            client_order_id = %response.client_order_id,
            broker_order_id = %response.id,
            status = %response.status,
            "Order submitted"
        );

        Ok(response.to_order_ack())
    }

    async fn get_order(&self, id: &BrokerOrderId) -> Result<Option<OrderReport>, BrokerError> {
        let result: Result<AlpacaOrderResponse, AlpacaError> = self
            .client
            .get(&format!("/v2/orders/{}", id.as_str()))
            .await;

        match result {
            Ok(response) => response.to_report().map(Some).map_err(BrokerError::from),
            Err(AlpacaError::NotFound { .. }) => Ok(None),
            Err(e) => Err(BrokerError::from(e)),
        }
    }

    async fn list_orders(
        &self,
        symbol: &Symbol,
        status: OrderQueryStatus,
    ) -> Result<Vec<OrderReport>, BrokerError> {
        let responses: Vec<AlpacaOrderResponse> = self
            .client
            .get(&format!(
                "/v2/orders?status={}&symbols={}&direction=desc&limit={ORDER_HISTORY_LIMIT}",
                status.as_str(),
                symbol.as_str()
            ))
            .await
            .map_err(BrokerError::from)?;

        to_reports(&responses)
    }

    async fn cancel_order(&self, id: &BrokerOrderId) -> Result<(), BrokerError> {
        tracing::info!(product = %self.product, broker_order_id = %id, "Canceling order");
        self.client
            .delete(&format!("/v2/orders/{}", id.as_str()))
            .await
            .map_err(BrokerError::from)
    }

    async fn cancel_all_orders(&self) -> Result<(), BrokerError> {
        tracing::warn!(product = %self.product, "Canceling all open orders");
        self.client
            .delete("/v2/orders")
            .await
            .map_err(BrokerError::from)
    }

    async fn list_positions(&self) -> Result<Vec<BrokerPosition>, BrokerError> {
        let responses: Vec<AlpacaPositionResponse> = self
            .client
            .get("/v2/positions")
            .await
            .map_err(BrokerError::from)?;

        responses
            .iter()
            .map(|p| p.to_broker_position().map_err(BrokerError::from))
            .collect()
    }

    async fn get_quote(&self, symbol: &Symbol) -> Result<Quote, BrokerError> {
        if symbol.is_option() {
            let path = format!("/v1beta1/options/quotes/latest?symbols={}", symbol.as_str());
            let mut response: AlpacaOptionQuotesResponse = self
                .client
                .data_get(&path)
                .await
                .map_err(BrokerError::from)?;
            return response
                .quotes
                .remove(symbol.as_str())
                .map(|q| q.into_quote(symbol.clone()))
                .ok_or(BrokerError::NotFound { resource: path });
        }

        let response: AlpacaStockQuoteResponse = self
            .client
            .data_get(&format!("/v2/stocks/{}/quotes/latest", symbol.as_str()))
            .await
            .map_err(BrokerError::from)?;
        Ok(response.quote.into_quote(symbol.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adapter_remembers_product_and_environment() {
        let config = AlpacaConfig::new("key".into(), "secret".into(), AlpacaEnvironment::Live);
        let adapter = AlpacaBrokerAdapter::new(&config, ProductLine::Options).unwrap();
        assert!(adapter.is_live());
        assert_eq!(adapter.product(), ProductLine::Options);
    }

    #[test]
    fn adapter_requires_credentials() {
        let config = AlpacaConfig::new("key".into(), String::new(), AlpacaEnvironment::Paper);
        assert!(matches!(
            AlpacaBrokerAdapter::new(&config, ProductLine::Equities),
            Err(AlpacaError::AuthenticationFailed)
        ));
    }
}
