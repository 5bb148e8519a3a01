// src/agents/trader.rs

//! The market participant: identity, the live customer order, bookkeeping,
//! and the strategy variant that prices it.

use super::zic;
use super::zip::ZipEngine;
use crate::error::{Result, SimError};
use crate::types::order::{Order, OrderStatus, Side, Trade, TraderId};
use log::debug;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

/// Strategy tag as it appears in experiment configs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StrategyKind {
    #[serde(rename = "ZIC")]
    Zic,
    #[serde(rename = "ZIP")]
    Zip,
}

/// Per-variant strategy state. ZIC carries none; ZIP carries its margin
/// engine.
#[derive(Debug, Clone)]
pub enum Strategy {
    Zic,
    Zip(ZipEngine),
}

/// One trader, owned by its side's arena for the whole trial. Customer
/// orders come and go via `assign_order`/`bookkeep`; `limit` and `price`
/// stay observable after the order is retired and are unset only before
/// the first assignment.
#[derive(Debug, Clone)]
pub struct Trader {
    pub id: TraderId,
    strategy: Strategy,
    active: bool,
    order: Option<Order>,
    limit: Option<u64>,
    price: Option<u64>,
    balance: u64,
    price_hist: Vec<u64>,
}

impl Trader {
    pub fn new(kind: StrategyKind, id: TraderId, rng: &mut StdRng) -> Self {
        let strategy = match kind {
            StrategyKind::Zic => Strategy::Zic,
            StrategyKind::Zip => Strategy::Zip(ZipEngine::new(id.side, rng)),
        };
        Self {
            id,
            strategy,
            active: false,
            order: None,
            limit: None,
            price: None,
            balance: 0,
            price_hist: Vec::new(),
        }
    }

    pub fn side(&self) -> Side {
        self.id.side
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn price(&self) -> Option<u64> {
        self.price
    }

    pub fn limit(&self) -> Option<u64> {
        self.limit
    }

    pub fn balance(&self) -> u64 {
        self.balance
    }

    pub fn strategy(&self) -> &Strategy {
        &self.strategy
    }

    /// Take on a new customer order: its price becomes the private limit
    /// and the quote is re-derived from it.
    pub fn assign_order(&mut self, order: Order, rng: &mut StdRng) {
        self.active = true;
        self.limit = Some(order.price);
        self.order = Some(order);
        self.set_price(rng);
    }

    /// Emit the current quote as a live shout, if there is an order to
    /// quote from.
    pub fn quote(&mut self, time: f64) -> Option<Order> {
        match (self.order, self.price) {
            (Some(order), Some(price)) => {
                self.active = true;
                Some(Order::new(self.id, order.side, price, OrderStatus::Shout, time))
            }
            _ => {
                self.active = false;
                None
            }
        }
    }

    fn del_order(&mut self) {
        self.order = None;
        self.active = false;
    }

    /// Re-derive the quote from the limit: ZIC draws uniformly inside it,
    /// ZIP applies its margin.
    fn set_price(&mut self, rng: &mut StdRng) {
        let Some(limit) = self.limit else { return };
        let price = match &self.strategy {
            Strategy::Zic => zic::draw_price(self.id.side, limit, rng),
            Strategy::Zip(engine) => engine.price_for(limit),
        };
        self.price = Some(price);
    }

    /// Would this trader accept a counterparty quote at `oprice` right now?
    pub fn willing_to_trade(&self, oprice: u64) -> bool {
        if self.order.is_none() || !self.active {
            return false;
        }
        match (self.id.side, self.price) {
            (Side::Buy, Some(price)) => price >= oprice,
            (Side::Sell, Some(price)) => price <= oprice,
            _ => false,
        }
    }

    /// Settle a completed trade: realized profit, floored at zero, goes to
    /// the balance and the filled order is retired.
    pub fn bookkeep(&mut self, trade: &Trade) {
        let Some(limit) = self.limit else { return };
        let profit = match self.id.side {
            Side::Buy => limit.saturating_sub(trade.price),
            Side::Sell => trade.price.saturating_sub(limit),
        };
        self.balance += profit;
        debug!(
            "{} bookkeeping: profit={} balance={}",
            self.id, profit, self.balance
        );
        self.del_order();
    }

    /// React to an observed match attempt, own or a neighbor's. ZIC ignores
    /// it. ZIP walks the Cliff decision table: a deal the trader would have
    /// beaten pushes its margin out (more profit), a deal or rejection it
    /// was priced out of pulls the margin in (more competitive). Traders
    /// that never held an order have nothing to update. A non-terminal
    /// status here is a logic error.
    pub fn update(
        &mut self,
        oprice: u64,
        oside: Side,
        status: OrderStatus,
        rng: &mut StdRng,
    ) -> Result<()> {
        let (Some(price), Some(limit)) = (self.price, self.limit) else {
            return Ok(());
        };
        let engine = match &mut self.strategy {
            Strategy::Zic => return Ok(()),
            Strategy::Zip(engine) => engine,
        };

        let target = match (status, self.id.side) {
            (OrderStatus::Deal, Side::Sell) => {
                if price <= oprice {
                    // Could have sold for more: push the ask up.
                    Some(engine.target_up(oprice, rng))
                } else if oside == Side::Buy && self.active {
                    // Priced out of a bid that just cleared: come down.
                    Some(engine.target_down(oprice, rng))
                } else {
                    None
                }
            }
            (OrderStatus::NoDeal, Side::Sell) => {
                if oside == Side::Sell && price >= oprice && self.active {
                    // Asking even more than a rejected ask: come down.
                    Some(engine.target_down(oprice, rng))
                } else {
                    None
                }
            }
            (OrderStatus::Deal, Side::Buy) => {
                if price >= oprice {
                    // Could have bought for less: pull the bid down.
                    Some(engine.target_down(oprice, rng))
                } else if oside == Side::Sell && self.active {
                    // Priced out of an ask that just cleared: come up.
                    Some(engine.target_up(oprice, rng))
                } else {
                    None
                }
            }
            (OrderStatus::NoDeal, Side::Buy) => {
                if oside == Side::Buy && price <= oprice && self.active {
                    // Bidding even less than a rejected bid: come up.
                    Some(engine.target_up(oprice, rng))
                } else {
                    None
                }
            }
            (other, _) => return Err(SimError::InvalidOutcome(other)),
        };

        if let Some(target) = target {
            self.price = Some(engine.adjust(self.id.side, target, price, limit));
        }
        Ok(())
    }

    /// Append the current quote to the day's history, collapsing
    /// consecutive repeats.
    pub fn record_price(&mut self) {
        if let Some(price) = self.price {
            if self.price_hist.last() != Some(&price) {
                self.price_hist.push(price);
            }
        }
    }

    pub fn price_history(&self) -> &[u64] {
        &self.price_hist
    }

    pub fn reset_price_history(&mut self) {
        self.price_hist.clear();
    }
}

// ----- Unit Tests -----

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(42)
    }

    fn customer_order(side: Side, price: u64) -> Order {
        Order::new(
            TraderId::new(side, 0),
            side,
            price,
            OrderStatus::Pending,
            0.0,
        )
    }

    fn new_trader(kind: StrategyKind, side: Side) -> Trader {
        Trader::new(kind, TraderId::new(side, 0), &mut rng())
    }

    fn mock_trade(price: u64) -> Trade {
        Trade {
            time: 1.0,
            price,
            qty: 1,
            party1: TraderId::new(Side::Sell, 0),
            party2: TraderId::new(Side::Buy, 0),
        }
    }

    #[test]
    fn test_fresh_trader_has_no_quote() {
        let mut trader = new_trader(StrategyKind::Zic, Side::Buy);
        assert!(trader.quote(0.0).is_none(), "No order, no quote.");
        assert!(!trader.is_active());
        assert!(!trader.willing_to_trade(1));
    }

    #[test]
    fn test_assign_order_sets_limit_and_quote() {
        // Arrange
        let mut trader = new_trader(StrategyKind::Zip, Side::Sell);
        let mut rng = rng();

        // Act
        trader.assign_order(customer_order(Side::Sell, 100), &mut rng);

        // Assert
        assert_eq!(trader.limit(), Some(100));
        assert!(trader.is_active());
        let shout = trader.quote(0.5).expect("an assigned trader must quote");
        assert_eq!(shout.status, OrderStatus::Shout);
        assert_eq!(shout.side, Side::Sell);
        assert_eq!(Some(shout.price), trader.price());
        assert!((shout.time - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_willingness_respects_side_and_price() {
        let mut rng = rng();
        let mut buyer = new_trader(StrategyKind::Zip, Side::Buy);
        buyer.assign_order(customer_order(Side::Buy, 100), &mut rng);
        let quote = buyer.price().expect("assigned buyer has a price");

        assert!(buyer.willing_to_trade(quote), "Equal price is acceptable.");
        assert!(buyer.willing_to_trade(quote - 1));
        assert!(!buyer.willing_to_trade(quote + 1));

        let mut seller = new_trader(StrategyKind::Zip, Side::Sell);
        seller.assign_order(customer_order(Side::Sell, 100), &mut rng);
        let quote = seller.price().expect("assigned seller has a price");

        assert!(seller.willing_to_trade(quote));
        assert!(seller.willing_to_trade(quote + 1));
        assert!(!seller.willing_to_trade(quote - 1));
    }

    #[test]
    fn test_bookkeep_floors_profit_at_zero() {
        // A buyer with limit 50 trading at 55 must not lose money.
        let mut rng = rng();
        let mut buyer = new_trader(StrategyKind::Zic, Side::Buy);
        buyer.assign_order(customer_order(Side::Buy, 50), &mut rng);

        buyer.bookkeep(&mock_trade(55));

        assert_eq!(buyer.balance(), 0, "Loss-making fills record zero profit.");
        assert!(!buyer.is_active(), "The filled order must be retired.");
    }

    #[test]
    fn test_bookkeep_accumulates_buyer_surplus() {
        let mut rng = rng();
        let mut buyer = new_trader(StrategyKind::Zic, Side::Buy);
        buyer.assign_order(customer_order(Side::Buy, 50), &mut rng);
        buyer.bookkeep(&mock_trade(40));
        assert_eq!(buyer.balance(), 10);

        buyer.assign_order(customer_order(Side::Buy, 60), &mut rng);
        buyer.bookkeep(&mock_trade(45));
        assert_eq!(buyer.balance(), 25, "Profit accumulates across orders.");
    }

    #[test]
    fn test_update_is_noop_before_first_order() {
        let mut rng = rng();
        let mut trader = new_trader(StrategyKind::Zip, Side::Sell);

        let result = trader.update(100, Side::Buy, OrderStatus::Deal, &mut rng);

        assert!(result.is_ok());
        assert!(trader.price().is_none(), "No quote may appear from thin air.");
    }

    #[test]
    fn test_update_rejects_non_terminal_status() {
        let mut rng = rng();
        let mut trader = new_trader(StrategyKind::Zip, Side::Sell);
        trader.assign_order(customer_order(Side::Sell, 100), &mut rng);

        let result = trader.update(100, Side::Buy, OrderStatus::Shout, &mut rng);

        assert!(matches!(result, Err(SimError::InvalidOutcome(_))));
    }

    #[test]
    fn test_zic_ignores_updates() {
        let mut rng = rng();
        let mut trader = new_trader(StrategyKind::Zic, Side::Buy);
        trader.assign_order(customer_order(Side::Buy, 100), &mut rng);
        let before = trader.price();

        trader
            .update(1, Side::Buy, OrderStatus::NoDeal, &mut rng)
            .expect("ZIC update never fails");

        assert_eq!(trader.price(), before, "ZIC quotes only move on re-pricing.");
    }

    #[test]
    fn test_seller_raises_ask_after_deal_above_own_price() {
        // Arrange: a seller quoting below a deal price learns it left money
        // on the table.
        let mut rng = rng();
        let mut seller = new_trader(StrategyKind::Zip, Side::Sell);
        seller.assign_order(customer_order(Side::Sell, 100), &mut rng);
        let before = seller.price().expect("assigned seller has a price");

        // Act: a deal went through at a much higher price.
        seller
            .update(before + 100, Side::Buy, OrderStatus::Deal, &mut rng)
            .expect("terminal status");

        // Assert
        let after = seller.price().expect("price survives updates");
        assert!(
            after > before,
            "Ask should rise after a richer deal ({} -> {}).",
            before,
            after
        );
    }

    #[test]
    fn test_buyer_lowers_bid_after_deal_below_own_price() {
        let mut rng = rng();
        let mut buyer = new_trader(StrategyKind::Zip, Side::Buy);
        buyer.assign_order(customer_order(Side::Buy, 200), &mut rng);
        let before = buyer.price().expect("assigned buyer has a price");

        buyer
            .update(before.saturating_sub(60).max(1), Side::Sell, OrderStatus::Deal, &mut rng)
            .expect("terminal status");

        let after = buyer.price().expect("price survives updates");
        assert!(
            after < before,
            "Bid should fall after a cheaper deal ({} -> {}).",
            before,
            after
        );
    }

    #[test]
    fn test_inactive_seller_still_learns_from_richer_deals() {
        // The raise branch does not require a live order, only a retained
        // price and limit from an earlier one.
        let mut rng = rng();
        let mut seller = new_trader(StrategyKind::Zip, Side::Sell);
        seller.assign_order(customer_order(Side::Sell, 100), &mut rng);
        let before = seller.price().expect("assigned seller has a price");
        seller.bookkeep(&mock_trade(before));
        assert!(!seller.is_active());

        seller
            .update(before + 100, Side::Buy, OrderStatus::Deal, &mut rng)
            .expect("terminal status");

        let after = seller.price().expect("price survives updates");
        assert!(after > before, "Retained quote should still adapt upward.");
    }

    #[test]
    fn test_price_history_collapses_consecutive_repeats() {
        let mut rng = rng();
        let mut trader = new_trader(StrategyKind::Zip, Side::Sell);

        trader.record_price();
        assert!(trader.price_history().is_empty(), "No quote, no history.");

        trader.assign_order(customer_order(Side::Sell, 100), &mut rng);
        trader.record_price();
        trader.record_price();
        trader.record_price();
        assert_eq!(trader.price_history().len(), 1, "Repeats must collapse.");

        trader
            .update(500, Side::Buy, OrderStatus::Deal, &mut rng)
            .expect("terminal status");
        trader.record_price();
        assert_eq!(trader.price_history().len(), 2);

        trader.reset_price_history();
        assert!(trader.price_history().is_empty());
    }
}
