// src/market.rs

//! The per-trial auction engine. A `Market` owns the two trader arenas and
//! the two topology graphs, and drives the session loop: schedule customer
//! orders, let one randomly chosen trader shout, match the shout against
//! willing network neighbors, propagate the outcome, and sample the
//! equilibrium statistics, one virtual timestep at a time.

use crate::agents::trader::{StrategyKind, Trader};
use crate::error::{Result, SimError};
use crate::network::{Network, NetworkSpec};
use crate::scheduler::{OrderSchedule, Scheduler};
use crate::stats::{self, AlphaTable, DayRecord, DayStats, TickRecord};
use crate::types::order::{Order, OrderStatus, Side, Trade, TraderId};
use log::{debug, info};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Deserialize;

/// One homogeneous group in the per-side population mix. The same mix is
/// instantiated on both sides of the market.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct TraderMix {
    pub kind: StrategyKind,
    pub count: usize,
}

/// Everything one session hands back: the per-tick equilibrium table and
/// the per-day rollups.
#[derive(Debug)]
pub struct SessionOutput {
    pub ticks: Vec<TickRecord>,
    pub days: Vec<DayRecord>,
}

pub struct Market {
    buyers: Vec<Trader>,
    sellers: Vec<Trader>,
    buy_network: Network,
    sell_network: Network,
}

impl Market {
    /// Build a fresh market: one buyer and one seller arena from the same
    /// mix, and a seller-side graph that is a structural copy of the
    /// buyer-side graph. Node ids coincide with per-side trader indices.
    pub fn populate(mix: &[TraderMix], spec: &NetworkSpec, rng: &mut StdRng) -> Result<Self> {
        let n: usize = mix.iter().map(|g| g.count).sum();
        if n < 1 {
            return Err(SimError::EmptySide(Side::Buy));
        }

        let buy_network = Network::build(spec, n, rng)?;
        let sell_network = buy_network.clone();

        let mut buyers = Vec::with_capacity(n);
        let mut sellers = Vec::with_capacity(n);
        for side in [Side::Buy, Side::Sell] {
            let arena = match side {
                Side::Buy => &mut buyers,
                Side::Sell => &mut sellers,
            };
            let mut index = 0;
            for group in mix {
                for _ in 0..group.count {
                    arena.push(Trader::new(group.kind, TraderId::new(side, index), rng));
                    index += 1;
                }
            }
        }

        debug!(
            "populated market: {} traders per side on a {:?} topology",
            n, spec
        );
        Ok(Self {
            buyers,
            sellers,
            buy_network,
            sell_network,
        })
    }

    /// Traders per side.
    pub fn n_traders(&self) -> usize {
        self.buyers.len()
    }

    pub fn buyers(&self) -> &[Trader] {
        &self.buyers
    }

    pub fn sellers(&self) -> &[Trader] {
        &self.sellers
    }

    pub fn buy_network(&self) -> &Network {
        &self.buy_network
    }

    fn trader_mut(&mut self, id: TraderId) -> &mut Trader {
        match id.side {
            Side::Buy => &mut self.buyers[id.index],
            Side::Sell => &mut self.sellers[id.index],
        }
    }

    /// Match one live shout against the opposite-side neighbors of its
    /// issuer. A willing counterparty is drawn uniformly and the trade
    /// executes at the shout's own price; otherwise the shout dies as a
    /// `NoDeal`. The order leaves with a terminal status either way.
    pub fn process_order(&mut self, order: &mut Order, time: f64, rng: &mut StdRng) -> Option<Trade> {
        let node = order.trader.index;
        let (others, network) = match order.side {
            Side::Buy => (&self.sellers, &self.sell_network),
            Side::Sell => (&self.buyers, &self.buy_network),
        };

        let willing: Vec<TraderId> = network
            .neighbors(node)
            .iter()
            .map(|&v| &others[v])
            .filter(|t| t.willing_to_trade(order.price))
            .map(|t| t.id)
            .collect();

        match willing.choose(rng) {
            Some(&counterparty) => {
                order.status = OrderStatus::Deal;
                debug!(
                    "TRADE t={:5.2} ${} {} {}",
                    time, order.price, counterparty, order.trader
                );
                Some(Trade {
                    time,
                    price: order.price,
                    qty: order.qty,
                    party1: counterparty,
                    party2: order.trader,
                })
            }
            None => {
                order.status = OrderStatus::NoDeal;
                debug!("no trade t={:5.2} ${} {}", time, order.price, order.trader);
                None
            }
        }
    }

    /// Diffuse a match outcome: every buyer and every seller adjacent to
    /// the initiator's node, plus both same-node traders, observes the
    /// order's price, side, and terminal status.
    pub fn update_traders(&mut self, order: &Order, rng: &mut StdRng) -> Result<()> {
        let node = order.trader.index;

        for b in self
            .buy_network
            .neighbors(node)
            .iter()
            .copied()
            .chain(std::iter::once(node))
        {
            self.buyers[b].update(order.price, order.side, order.status, rng)?;
        }
        for s in self
            .sell_network
            .neighbors(node)
            .iter()
            .copied()
            .chain(std::iter::once(node))
        {
            self.sellers[s].update(order.price, order.side, order.status, rng)?;
        }
        Ok(())
    }

    /// Run one full session from a fresh day 0 to `days * interval`,
    /// folding alpha statistics into the cross-trial table.
    pub fn run_session(
        &mut self,
        trial: u32,
        schedule: &OrderSchedule,
        days: u32,
        table: &mut AlphaTable,
        rng: &mut StdRng,
    ) -> Result<SessionOutput> {
        let n = self.n_traders();
        let mut scheduler = Scheduler::new(schedule.clone())?;
        let end_time = days as f64 * schedule.interval;
        let timestep = 1.0 / (2 * n) as f64;

        let mut ticks = Vec::new();
        let mut day_stats = DayStats::new(schedule.interval);

        let mut time = 0.0;
        while time <= end_time {
            let eq = stats::find_eq(&mut self.buyers, &mut self.sellers);

            for order in scheduler.tick(time, n, rng)? {
                self.trader_mut(order.trader).assign_order(order, rng);
            }

            // One randomly chosen trader gets to shout this tick.
            let mut trade_price = None;
            let pick = rng.gen_range(0..2 * n);
            let shouter = if pick < n {
                &mut self.buyers[pick]
            } else {
                &mut self.sellers[pick - n]
            };
            if let Some(mut order) = shouter.quote(time) {
                if let Some(trade) = self.process_order(&mut order, time, rng) {
                    self.trader_mut(trade.party1).bookkeep(&trade);
                    self.trader_mut(trade.party2).bookkeep(&trade);
                    trade_price = Some(trade.price);
                }
                self.update_traders(&order, rng)?;
            }

            day_stats.update(
                trial,
                time,
                &mut self.buyers,
                &mut self.sellers,
                &eq,
                trade_price,
                table,
            );
            ticks.push(TickRecord {
                trial,
                time,
                eq,
                transaction: trade_price,
            });

            time += timestep;
        }

        let day_records = day_stats.finish(trial, time, &mut self.buyers, &mut self.sellers, table);
        info!(
            "trial {} session done: {} ticks, {} days",
            trial,
            ticks.len(),
            day_records.len()
        );
        Ok(SessionOutput {
            ticks,
            days: day_records,
        })
    }
}

// ----- Unit Tests -----
