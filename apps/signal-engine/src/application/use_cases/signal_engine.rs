//! Signal Engine
//!
//! One entry point per signal shape. Every entry point checks the product's
//! kill switch first, never returns an error, and answers with a
//! `{message, outcome}` pair. Single-leg signals routed through `dispatch`
//! are written to the signal history when one is configured.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;

use super::equity_position::EquityPositionUseCase;
use super::pair_trade::{PairTarget, PairTradeUseCase};
use super::short_equity::ShortEquityUseCase;
use crate::application::context::EngineContext;
use crate::application::dto::{
    EquitySignal, PairAction, PairedSignal, Signal, SignalAction, SignalOutcome,
};
use crate::application::ports::{BrokerPort, SettingsPort, SignalRecord, TradingSettings};
use crate::domain::order_execution::OrderSide;
use crate::domain::position::{PairedPositionRepository, PositionRepository, TradingMode};
use crate::domain::shared::{PositionId, ProductLine, Symbol};

/// Facade over the signal use cases.
pub struct SignalEngine<B, R, P, S>
where
    B: BrokerPort,
    R: PositionRepository,
    P: PairedPositionRepository,
    S: SettingsPort,
{
    context: Arc<EngineContext<B, R, P, S>>,
    equities: EquityPositionUseCase<B, R, P, S>,
    short_equities: ShortEquityUseCase<B, R, P, S>,
    pairs: PairTradeUseCase<B, R, P, S>,
}

impl<B, R, P, S> SignalEngine<B, R, P, S>
where
    B: BrokerPort,
    R: PositionRepository,
    P: PairedPositionRepository,
    S: SettingsPort,
{
    /// Create an engine over a shared context.
    pub fn new(context: Arc<EngineContext<B, R, P, S>>) -> Self {
        Self {
            equities: EquityPositionUseCase::new(Arc::clone(&context)),
            short_equities: ShortEquityUseCase::new(Arc::clone(&context)),
            pairs: PairTradeUseCase::new(Arc::clone(&context)),
            context,
        }
    }

    /// Shared context.
    pub const fn context(&self) -> &Arc<EngineContext<B, R, P, S>> {
        &self.context
    }

    // ========================================================================
    // Entry points
    // ========================================================================

    /// Auto-managed equity buy.
    pub async fn buy_equity(&self, symbol: &Symbol, quantity: Option<Decimal>) -> SignalOutcome {
        self.open_single(symbol, quantity, TradingMode::Auto).await
    }

    /// Auto-managed equity sell.
    pub async fn sell_equity(&self, symbol: &Symbol) -> SignalOutcome {
        self.close_single(symbol, TradingMode::Auto).await
    }

    /// Manual equity buy; no protective stop.
    pub async fn open_manual(&self, symbol: &Symbol, quantity: Option<Decimal>) -> SignalOutcome {
        self.open_single(symbol, quantity, TradingMode::Manual).await
    }

    /// Manual equity sell.
    pub async fn close_manual(&self, symbol: &Symbol) -> SignalOutcome {
        self.close_single(symbol, TradingMode::Manual).await
    }

    /// Buy on the short-equities account.
    pub async fn buy_short_equity(
        &self,
        symbol: &Symbol,
        quantity: Option<Decimal>,
    ) -> SignalOutcome {
        let settings = match self.admit(ProductLine::ShortEquities, symbol).await {
            Ok(settings) => settings,
            Err(outcome) => return outcome,
        };
        let quantity = match resolve_quantity(quantity, settings.stock_amount) {
            Ok(quantity) => quantity,
            Err(outcome) => return outcome,
        };
        self.short_equities.buy(symbol, quantity).await
    }

    /// Flatten a holding on the short-equities account.
    pub async fn sell_short_equity(&self, symbol: &Symbol) -> SignalOutcome {
        if let Err(outcome) = self.admit(ProductLine::ShortEquities, symbol).await {
            return outcome;
        }
        self.short_equities.sell(symbol).await
    }

    /// Open a pair at the configured options amount.
    pub async fn open_pair(&self, signal: &PairedSignal) -> SignalOutcome {
        if let Err(outcome) = self.check_started(ProductLine::Options).await {
            return outcome;
        }
        if let Err(e) = signal.validate() {
            return SignalOutcome::invalid(e.to_string());
        }
        let settings = match self.settings().await {
            Ok(settings) => settings,
            Err(outcome) => return outcome,
        };
        let quantity = match resolve_quantity(None, settings.options_amount) {
            Ok(quantity) => quantity,
            Err(outcome) => return outcome,
        };
        self.pairs.open(signal, quantity).await
    }

    /// Close the strategy's open pair.
    pub async fn close_pair(&self, strategy: &str) -> SignalOutcome {
        if let Err(outcome) = self.check_started(ProductLine::Options).await {
            return outcome;
        }
        self.pairs
            .close(&PairTarget::Strategy(strategy.to_string()))
            .await
    }

    /// Close a pair by id.
    pub async fn close_pair_by_id(&self, id: &PositionId) -> SignalOutcome {
        if let Err(outcome) = self.check_started(ProductLine::Options).await {
            return outcome;
        }
        self.pairs.close(&PairTarget::Id(id.clone())).await
    }

    /// Flip a product's kill switch.
    pub async fn set_started(&self, product: ProductLine, started: bool) -> SignalOutcome {
        match self.context.settings.set_started(product, started).await {
            Ok(()) => {
                tracing::info!(product = %product, started, "Kill switch updated");
                SignalOutcome::executed(format!(
                    "{product} {}",
                    if started { "started" } else { "stopped" }
                ))
            }
            Err(e) => SignalOutcome::failed(e.to_string()),
        }
    }

    /// Route a tagged signal to its entry point.
    pub async fn dispatch(&self, signal: Signal) -> SignalOutcome {
        tracing::info!(signal = ?signal, "Signal received");
        let received_at = Utc::now();

        let outcome = match &signal {
            Signal::Equity(s) => self.dispatch_single(s, TradingMode::Auto).await,
            Signal::Manual(s) => self.dispatch_single(s, TradingMode::Manual).await,
            Signal::ShortEquity(s) => match s.action {
                SignalAction::Buy => self.buy_short_equity(&s.symbol, s.quantity).await,
                SignalAction::Sell => self.sell_short_equity(&s.symbol).await,
            },
            Signal::Paired(s) => match (s.action, &s.pair_id) {
                (PairAction::Open, _) => self.open_pair(s).await,
                (PairAction::Close, Some(id)) => self.close_pair_by_id(id).await,
                (PairAction::Close, None) => self.close_pair(&s.strategy).await,
            },
        };

        tracing::info!(
            outcome = %outcome.outcome,
            message = %outcome.message,
            "Signal handled"
        );

        let single = match &signal {
            Signal::Equity(s) => Some((ProductLine::Equities, Some(TradingMode::Auto), s)),
            Signal::Manual(s) => Some((ProductLine::Equities, Some(TradingMode::Manual), s)),
            Signal::ShortEquity(s) => Some((ProductLine::ShortEquities, None, s)),
            Signal::Paired(_) => None,
        };
        if let Some((product, mode, s)) = single {
            self.record_history(SignalRecord {
                product,
                mode,
                side: match s.action {
                    SignalAction::Buy => OrderSide::Buy,
                    SignalAction::Sell => OrderSide::Sell,
                },
                symbol: s.symbol.clone(),
                quantity: s.quantity,
                price: s.price,
                outcome: outcome.outcome,
                message: outcome.message.clone(),
                received_at,
            })
            .await;
        }
        outcome
    }

    /// History failures are logged and never change the outcome.
    async fn record_history(&self, record: SignalRecord) {
        let Some(history) = &self.context.history else {
            return;
        };
        if let Err(e) = history.record(record).await {
            tracing::warn!(error = %e, "Failed to record signal history");
        }
    }

    async fn dispatch_single(&self, signal: &EquitySignal, mode: TradingMode) -> SignalOutcome {
        match signal.action {
            SignalAction::Buy => self.open_single(&signal.symbol, signal.quantity, mode).await,
            SignalAction::Sell => self.close_single(&signal.symbol, mode).await,
        }
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    async fn open_single(
        &self,
        symbol: &Symbol,
        quantity: Option<Decimal>,
        mode: TradingMode,
    ) -> SignalOutcome {
        let settings = match self.admit(ProductLine::Equities, symbol).await {
            Ok(settings) => settings,
            Err(outcome) => return outcome,
        };
        let quantity = match resolve_quantity(quantity, settings.stock_amount) {
            Ok(quantity) => quantity,
            Err(outcome) => return outcome,
        };
        self.equities.open(symbol, quantity, mode).await
    }

    async fn close_single(&self, symbol: &Symbol, mode: TradingMode) -> SignalOutcome {
        if let Err(outcome) = self.admit(ProductLine::Equities, symbol).await {
            return outcome;
        }
        self.equities.close(symbol, mode).await
    }

    /// Kill switch, symbol validation, and current settings.
    async fn admit(
        &self,
        product: ProductLine,
        symbol: &Symbol,
    ) -> Result<TradingSettings, SignalOutcome> {
        self.check_started(product).await?;
        symbol
            .validate()
            .map_err(|e| SignalOutcome::invalid(e.to_string()))?;
        self.settings().await
    }

    async fn check_started(&self, product: ProductLine) -> Result<(), SignalOutcome> {
        match self.context.settings.start_stop().await {
            Ok(switches) if switches.is_started(product) => Ok(()),
            Ok(_) => Err(SignalOutcome::not_started(product)),
            Err(e) => Err(SignalOutcome::failed(e.to_string())),
        }
    }

    async fn settings(&self) -> Result<TradingSettings, SignalOutcome> {
        self.context
            .settings
            .trading_settings()
            .await
            .map_err(|e| SignalOutcome::failed(e.to_string()))
    }
}

fn resolve_quantity(requested: Option<Decimal>, configured: Decimal) -> Result<Decimal, SignalOutcome> {
    let quantity = requested.unwrap_or(configured);
    if quantity <= Decimal::ZERO {
        return Err(SignalOutcome::invalid(format!(
            "quantity must be positive, got {quantity}"
        )));
    }
    Ok(quantity)
}
