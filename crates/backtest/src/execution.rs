use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use optcycle_core::{
    ExecutionHandler, ExecutionReport, FillEvent, FillKind, MarketSnapshot, OrderIntent, Right,
    Symbol, CONTRACT_MULTIPLIER,
};

/// Position-closing event injected by the simulation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduledEvent {
    /// Assign the whole position in an option contract. With
    /// `deliver_underlying`, shares change hands at the strike.
    Assignment {
        at: DateTime<Utc>,
        contract: Symbol,
        deliver_underlying: bool,
    },
    /// Close whatever is left of `contract` at zero.
    Expiry { at: DateTime<Utc>, contract: Symbol },
}

impl ScheduledEvent {
    const fn at(&self) -> DateTime<Utc> {
        match self {
            Self::Assignment { at, .. } | Self::Expiry { at, .. } => *at,
        }
    }
}

/// Fills market intents one cycle after submission.
///
/// An intent submitted on snapshot N is filled when the next snapshot is
/// polled, at that snapshot's price for the symbol (falling back to the
/// price at submission). An intent with no price on either snapshot is
/// rejected. Scheduled assignments and expiries are released on the first
/// poll at or after their time.
pub struct SimulatedExecutionHandler {
    commission_rate: Decimal,
    slippage_bps: Decimal,
    pending: Vec<(OrderIntent, Decimal)>,
    scheduled: Vec<ScheduledEvent>,
    holdings: HashMap<Symbol, Decimal>,
}

impl SimulatedExecutionHandler {
    #[must_use]
    pub fn new(commission_rate: Decimal, slippage_bps: Decimal) -> Self {
        Self {
            commission_rate,
            slippage_bps,
            pending: Vec::new(),
            scheduled: Vec::new(),
            holdings: HashMap::new(),
        }
    }

    /// Frictionless fills.
    #[must_use]
    pub fn frictionless() -> Self {
        Self::new(Decimal::ZERO, Decimal::ZERO)
    }

    pub fn schedule(&mut self, event: ScheduledEvent) {
        self.scheduled.push(event);
        self.scheduled.sort_by_key(ScheduledEvent::at);
    }

    #[must_use]
    pub fn with_event(mut self, event: ScheduledEvent) -> Self {
        self.schedule(event);
        self
    }

    /// Net quantity this handler has filled for `symbol`.
    #[must_use]
    pub fn holding(&self, symbol: &Symbol) -> Decimal {
        self.holdings.get(symbol).copied().unwrap_or(Decimal::ZERO)
    }

    #[must_use]
    pub fn pending_intents(&self) -> usize {
        self.pending.len()
    }

    fn apply_slippage(&self, price: Decimal, quantity: Decimal) -> Decimal {
        let slippage = price * self.slippage_bps / Decimal::from(10000);
        if quantity.is_sign_positive() {
            price + slippage
        } else {
            price - slippage
        }
    }

    fn record(&mut self, fill: FillEvent) -> ExecutionReport {
        *self.holdings.entry(fill.symbol.clone()).or_default() += fill.quantity;
        ExecutionReport::Fill(fill)
    }

    fn fill_intent(
        &mut self,
        intent: OrderIntent,
        submit_price: Decimal,
        snapshot: &MarketSnapshot,
    ) -> ExecutionReport {
        let current = snapshot.price(&intent.symbol);
        let base_price = if current.is_zero() { submit_price } else { current };

        if base_price.is_zero() {
            tracing::debug!(symbol = %intent.symbol, "No price to fill against");
            return ExecutionReport::Rejected {
                order_id: intent.id,
                symbol: intent.symbol,
                reason: "no quote available".to_string(),
                timestamp: snapshot.timestamp,
            };
        }

        let price = self.apply_slippage(base_price, intent.quantity);
        let notional = price * intent.quantity * intent.symbol.multiplier();
        let commission = (notional * self.commission_rate).abs();
        self.record(FillEvent {
            order_id: intent.id,
            symbol: intent.symbol,
            quantity: intent.quantity,
            price,
            commission,
            kind: FillKind::Order,
            timestamp: snapshot.timestamp,
        })
    }

    fn release(&mut self, event: ScheduledEvent, now: DateTime<Utc>) -> Vec<ExecutionReport> {
        let (contract, kind, deliver) = match event {
            ScheduledEvent::Assignment {
                contract,
                deliver_underlying,
                ..
            } => (contract, FillKind::Assignment, deliver_underlying),
            ScheduledEvent::Expiry { contract, .. } => (contract, FillKind::Expiry, false),
        };

        let held = self.holding(&contract);
        if held.is_zero() {
            tracing::debug!(contract = %contract, ?kind, "Nothing held, event ignored");
            return Vec::new();
        }

        tracing::info!(contract = %contract, %held, ?kind, "Closing option position");
        let mut reports = Vec::new();

        if deliver {
            if let Some(option) = contract.as_option() {
                // Short put assigned buys shares, short call assigned sells them
                let shares = held * Decimal::from(CONTRACT_MULTIPLIER);
                let quantity = match option.right() {
                    Right::Put => -shares,
                    Right::Call => shares,
                };
                reports.push(self.record(FillEvent {
                    order_id: Uuid::new_v4(),
                    symbol: Symbol::equity(option.underlying()),
                    quantity,
                    price: option.strike(),
                    commission: Decimal::ZERO,
                    kind: FillKind::Delivery,
                    timestamp: now,
                }));
            }
        }

        reports.insert(
            0,
            self.record(FillEvent {
                order_id: Uuid::new_v4(),
                symbol: contract,
                quantity: -held,
                price: Decimal::ZERO,
                commission: Decimal::ZERO,
                kind,
                timestamp: now,
            }),
        );
        reports
    }
}

#[async_trait]
impl ExecutionHandler for SimulatedExecutionHandler {
    async fn submit(&mut self, intent: OrderIntent, snapshot: &MarketSnapshot) -> Result<()> {
        let submit_price = snapshot.price(&intent.symbol);
        tracing::debug!(
            order_id = %intent.id,
            symbol = %intent.symbol,
            quantity = %intent.quantity,
            %submit_price,
            "Intent queued"
        );
        self.pending.push((intent, submit_price));
        Ok(())
    }

    async fn poll_reports(&mut self, snapshot: &MarketSnapshot) -> Result<Vec<ExecutionReport>> {
        let mut reports = Vec::new();

        for (intent, submit_price) in std::mem::take(&mut self.pending) {
            reports.push(self.fill_intent(intent, submit_price, snapshot));
        }

        let due = self
            .scheduled
            .iter()
            .take_while(|e| e.at() <= snapshot.timestamp)
            .count();
        let released: Vec<ScheduledEvent> = self.scheduled.drain(..due).collect();
        for event in released {
            reports.extend(self.release(event, snapshot.timestamp));
        }

        Ok(reports)
    }
}
