// src/types/order.rs

use serde::{Deserialize, Serialize};
use std::fmt;

/// Market side of a trader or of a quote. A buyer's quote is a bid, a
/// seller's quote is an ask; both are represented by the same tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn opposite(self) -> Side {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "Buy"),
            Side::Sell => write!(f, "Sell"),
        }
    }
}

/// Lifecycle of an order: created `Pending` by the scheduler, emitted as a
/// live `Shout` by the owning trader, and terminally tagged by the matching
/// engine. Terminal orders are never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderStatus {
    Pending,
    Shout,
    Deal,
    NoDeal,
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderStatus::Pending => write!(f, "Pending"),
            OrderStatus::Shout => write!(f, "Shout"),
            OrderStatus::Deal => write!(f, "Deal"),
            OrderStatus::NoDeal => write!(f, "NoDeal"),
        }
    }
}

/// Side-tagged trader identity. The per-side index is dense from 0 and is
/// also the trader's node id in its side's topology graph, so neighbor
/// queries index straight into the side arenas with no key parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TraderId {
    pub side: Side,
    pub index: usize,
}

impl TraderId {
    pub fn new(side: Side, index: usize) -> Self {
        Self { side, index }
    }
}

impl fmt::Display for TraderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.side {
            Side::Buy => 'B',
            Side::Sell => 'S',
        };
        write!(f, "{}{:02}", tag, self.index)
    }
}

/// A single customer order or live quote. `qty` is fixed at 1 in this
/// design; the field is kept so trade records carry an explicit quantity.
#[derive(Debug, Clone, Copy)]
pub struct Order {
    pub trader: TraderId,
    pub side: Side,
    pub price: u64,
    pub qty: u32,
    pub status: OrderStatus,
    pub time: f64,
}

impl Order {
    pub fn new(trader: TraderId, side: Side, price: u64, status: OrderStatus, time: f64) -> Self {
        Self {
            trader,
            side,
            price,
            qty: 1,
            status,
            time,
        }
    }
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{} {} {} P={:03} Q={} T={:5.2}]",
            self.trader, self.side, self.status, self.price, self.qty, self.time
        )
    }
}

/// Record of one successful match. Produced by the matching engine,
/// consumed immediately by both parties' bookkeeping and the tick stats.
#[derive(Debug, Clone, Copy)]
pub struct Trade {
    pub time: f64,
    pub price: u64,
    pub qty: u32,
    /// The counterparty picked from the willing neighbors.
    pub party1: TraderId,
    /// The trader whose shout initiated the match.
    pub party2: TraderId,
}

// ----- Unit Tests -----
