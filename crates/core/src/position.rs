use crate::events::FillEvent;
use crate::types::Symbol;
use rust_decimal::Decimal;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Position {
    pub symbol: Symbol,
    /// Signed: negative for short (written) legs.
    pub quantity: Decimal,
    pub avg_price: Decimal,
}

impl Position {
    #[allow(clippy::missing_const_for_fn)] // Symbol cannot be used in const fn
    fn new(symbol: Symbol, quantity: Decimal, avg_price: Decimal) -> Self {
        Self {
            symbol,
            quantity,
            avg_price,
        }
    }
}

/// Signed holdings per symbol.
///
/// Owned by the execution side: the only mutation path is `apply_fill`.
/// Strategies get a shared reference.
#[derive(Debug, Default)]
pub struct PositionBook {
    positions: HashMap<Symbol, Position>,
    /// Fills applied per symbol, kept after the position closes.
    revisions: HashMap<Symbol, u64>,
}

impl PositionBook {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies a confirmed fill and returns the cash `PnL` it realizes.
    ///
    /// Price differences are scaled by the symbol's multiplier, so option
    /// legs and delivered shares are both in cash. Commission is charged on
    /// every fill: an opening fill realizes `-commission`.
    pub fn apply_fill(&mut self, fill: &FillEvent) -> Decimal {
        if fill.quantity.is_zero() {
            return -fill.commission;
        }
        *self.revisions.entry(fill.symbol.clone()).or_default() += 1;

        let Some(pos) = self.positions.get_mut(&fill.symbol) else {
            self.positions.insert(
                fill.symbol.clone(),
                Position::new(fill.symbol.clone(), fill.quantity, fill.price),
            );
            return -fill.commission;
        };

        let same_side = pos.quantity.is_sign_negative() == fill.quantity.is_sign_negative();

        // Adding to existing exposure
        if same_side {
            let total_cost = pos.avg_price * pos.quantity.abs() + fill.price * fill.quantity.abs();
            pos.quantity += fill.quantity;
            pos.avg_price = total_cost / pos.quantity.abs();
            return -fill.commission;
        }

        // Reducing (and possibly flipping) exposure
        let close_quantity = fill.quantity.abs().min(pos.quantity.abs());
        let per_unit = if pos.quantity > Decimal::ZERO {
            fill.price - pos.avg_price
        } else {
            pos.avg_price - fill.price
        };
        let gross = per_unit * close_quantity * fill.symbol.multiplier();

        let remaining = pos.quantity + fill.quantity;
        if remaining.is_zero() {
            self.positions.remove(&fill.symbol);
        } else if remaining.is_sign_negative() == pos.quantity.is_sign_negative() {
            pos.quantity = remaining;
        } else {
            pos.quantity = remaining;
            pos.avg_price = fill.price;
        }

        gross - fill.commission
    }

    /// Number of non-empty fills ever applied to `symbol`.
    ///
    /// Advances on every confirmed change, including ones that net back to
    /// the same quantity between two reads.
    #[must_use]
    pub fn revision(&self, symbol: &Symbol) -> u64 {
        self.revisions.get(symbol).copied().unwrap_or_default()
    }

    /// Signed quantity held, zero when flat.
    #[must_use]
    pub fn quantity(&self, symbol: &Symbol) -> Decimal {
        self.positions
            .get(symbol)
            .map_or(Decimal::ZERO, |p| p.quantity)
    }

    #[must_use]
    pub fn get_position(&self, symbol: &Symbol) -> Option<&Position> {
        self.positions.get(symbol)
    }

    #[must_use]
    pub const fn all_positions(&self) -> &HashMap<Symbol, Position> {
        &self.positions
    }

    /// True when any of `symbols` has a non-zero quantity.
    pub fn is_invested_in<'a>(&self, symbols: impl IntoIterator<Item = &'a Symbol>) -> bool {
        symbols.into_iter().any(|s| !self.quantity(s).is_zero())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::FillKind;
    use crate::types::{OptionContract, Right};
    use chrono::{NaiveDate, Utc};
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn fill(symbol: &Symbol, quantity: Decimal, price: Decimal) -> FillEvent {
        FillEvent {
            order_id: Uuid::new_v4(),
            symbol: symbol.clone(),
            quantity,
            price,
            commission: Decimal::ZERO,
            kind: FillKind::Order,
            timestamp: Utc::now(),
        }
    }

    fn goog_put() -> Symbol {
        OptionContract::new(
            "GOOG",
            Right::Put,
            dec!(800),
            NaiveDate::from_ymd_opt(2016, 1, 15).unwrap(),
        )
        .unwrap()
        .symbol()
    }

    #[test]
    fn short_open_then_buy_back_realizes_pnl() {
        let put = Symbol::equity("PUTLEG");
        let mut book = PositionBook::new();

        assert_eq!(book.apply_fill(&fill(&put, dec!(-1), dec!(5))), Decimal::ZERO);
        assert_eq!(book.quantity(&put), dec!(-1));

        let pnl = book.apply_fill(&fill(&put, dec!(1), dec!(2)));
        assert_eq!(pnl, dec!(3));
        assert_eq!(book.quantity(&put), Decimal::ZERO);
        assert!(book.get_position(&put).is_none());
    }

    #[test]
    fn adding_to_long_averages_price() {
        let spy = Symbol::equity("SPY");
        let mut book = PositionBook::new();
        book.apply_fill(&fill(&spy, dec!(10), dec!(100)));
        book.apply_fill(&fill(&spy, dec!(10), dec!(110)));

        let pos = book.get_position(&spy).unwrap();
        assert_eq!(pos.quantity, dec!(20));
        assert_eq!(pos.avg_price, dec!(105));
    }

    #[test]
    fn crossing_zero_reopens_at_fill_price() {
        let spy = Symbol::equity("SPY");
        let mut book = PositionBook::new();
        book.apply_fill(&fill(&spy, dec!(5), dec!(100)));

        let pnl = book.apply_fill(&fill(&spy, dec!(-8), dec!(90)));
        assert_eq!(pnl, dec!(-50));

        let pos = book.get_position(&spy).unwrap();
        assert_eq!(pos.quantity, dec!(-3));
        assert_eq!(pos.avg_price, dec!(90));
    }

    #[test]
    fn option_pnl_is_scaled_and_every_commission_is_charged() {
        let put = goog_put();
        let mut book = PositionBook::new();

        let mut open = fill(&put, dec!(-1), dec!(55));
        open.commission = dec!(1.5);
        assert_eq!(book.apply_fill(&open), dec!(-1.5));

        // Written at 55, expires worthless: 55 per share on 100 shares
        let mut close = fill(&put, dec!(1), Decimal::ZERO);
        close.commission = dec!(0.5);
        assert_eq!(book.apply_fill(&close), dec!(5499.5));
    }

    #[test]
    fn delivered_shares_net_out_in_cash() {
        let goog = Symbol::equity("GOOG");
        let mut book = PositionBook::new();
        book.apply_fill(&fill(&goog, dec!(100), dec!(800)));

        assert_eq!(book.apply_fill(&fill(&goog, dec!(-100), dec!(600))), dec!(-20000));
        assert!(book.get_position(&goog).is_none());
    }

    #[test]
    fn revision_advances_even_when_quantity_returns_to_zero() {
        let put = goog_put();
        let mut book = PositionBook::new();
        assert_eq!(book.revision(&put), 0);

        book.apply_fill(&fill(&put, dec!(-1), dec!(55)));
        book.apply_fill(&fill(&put, dec!(1), Decimal::ZERO));
        assert_eq!(book.quantity(&put), Decimal::ZERO);
        assert_eq!(book.revision(&put), 2);

        book.apply_fill(&fill(&put, Decimal::ZERO, dec!(55)));
        assert_eq!(book.revision(&put), 2);
        assert_eq!(book.revision(&Symbol::equity("GOOG")), 0);
    }

    #[test]
    fn invested_checks_only_given_symbols() {
        let spy = Symbol::equity("SPY");
        let qqq = Symbol::equity("QQQ");
        let mut book = PositionBook::new();
        book.apply_fill(&fill(&spy, dec!(1), dec!(100)));

        assert!(book.is_invested_in([&spy, &qqq]));
        assert!(!book.is_invested_in([&qqq]));
    }
}
