// src/stats.rs

//! Market statistics: the equilibrium-price search run every tick, the
//! Smith's-alpha convergence measure closed out at day boundaries, and the
//! per-trader running aggregates kept across trials.

use crate::agents::trader::Trader;
use crate::types::order::{Side, TraderId};
use statrs::statistics::Statistics;

/// A supply/demand crossing: midpoint price and the quantity at which the
/// curves intersect.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EqPoint {
    pub price: f64,
    pub qty: usize,
}

/// Per-tick equilibrium sample. `theoretical` crosses the private limits,
/// `actual` crosses the live quotes; either may be undefined.
#[derive(Debug, Clone, Copy, Default)]
pub struct EqSample {
    pub theoretical: Option<EqPoint>,
    pub actual: Option<EqPoint>,
}

/// One row of the tick table.
#[derive(Debug, Clone, Copy)]
pub struct TickRecord {
    pub trial: u32,
    pub time: f64,
    pub eq: EqSample,
    pub transaction: Option<u64>,
}

/// One row of the day table: day-mean prices, any of which may be
/// undefined if no defined sample landed in the day.
#[derive(Debug, Clone, Copy)]
pub struct DayRecord {
    pub trial: u32,
    pub day: usize,
    pub teq_p: Option<f64>,
    pub aeq_p: Option<f64>,
    pub transaction: Option<f64>,
}

/// Snapshot both equilibria from the currently active traders. The same
/// pass appends every trader's current quote to its day price history.
pub fn find_eq(buyers: &mut [Trader], sellers: &mut [Trader]) -> EqSample {
    fn collect(traders: &mut [Trader]) -> (Vec<u64>, Vec<u64>) {
        let mut prices = Vec::new();
        let mut limits = Vec::new();
        for t in traders.iter_mut() {
            t.record_price();
            if t.is_active() {
                if let (Some(p), Some(l)) = (t.price(), t.limit()) {
                    prices.push(p);
                    limits.push(l);
                }
            }
        }
        (prices, limits)
    }

    let (mut b_price, mut b_limit) = collect(buyers);
    let (mut s_price, mut s_limit) = collect(sellers);

    b_price.sort_unstable_by(|a, b| b.cmp(a));
    b_limit.sort_unstable_by(|a, b| b.cmp(a));
    s_price.sort_unstable();
    s_limit.sort_unstable();

    EqSample {
        theoretical: find_intersect(&b_limit, &s_limit),
        actual: find_intersect(&b_price, &s_price),
    }
}

/// Crossing search over one demand curve (`bp`, descending) and one supply
/// curve (`sp`, ascending). Walks quantity upward until the seller price
/// exceeds the buyer price; the intersection price is the midpoint of the
/// previous pair. When one curve runs out first, the midpoint is taken
/// with that curve's next value; when both run out together, with the last
/// pair.
pub fn find_intersect(bp: &[u64], sp: &[u64]) -> Option<EqPoint> {
    let (bnum, snum) = (bp.len(), sp.len());
    if bnum == 0 || snum == 0 {
        return None;
    }
    if sp[0] > bp[0] {
        return None;
    }

    for q in 0..bnum.max(snum) {
        if sp[q] > bp[q] {
            return Some(EqPoint {
                price: (sp[q - 1] + bp[q - 1]) as f64 * 0.5,
                qty: q,
            });
        }
        if q + 1 == bnum && q + 1 == snum {
            return Some(EqPoint {
                price: (sp[q] + bp[q]) as f64 * 0.5,
                qty: q + 1,
            });
        } else if q + 1 == bnum {
            return Some(EqPoint {
                price: (sp[q] + sp[q + 1]) as f64 * 0.5,
                qty: q + 1,
            });
        } else if q + 1 == snum {
            return Some(EqPoint {
                price: (bp[q] + bp[q + 1]) as f64 * 0.5,
                qty: q + 1,
            });
        }
    }
    None
}

/// Smith's alpha: RMS deviation of a day's quoted prices from the day's
/// equilibrium, normalized by the equilibrium. An empty history scores the
/// 0.0 fallback.
pub fn smiths_alpha(eq: f64, prices: &[u64]) -> f64 {
    if prices.is_empty() {
        return 0.0;
    }
    let mean_sq = prices
        .iter()
        .map(|&p| (p as f64 - eq).powi(2))
        .sum::<f64>()
        / prices.len() as f64;
    mean_sq.sqrt() / eq
}

/// The floor on a trader's achievable alpha: a limit on the wrong side of
/// equilibrium forces at least `|limit - eq| / eq` of dispersion. A trader
/// that never held a limit scores 1.0.
pub fn best_alpha(eq: f64, limit: Option<u64>, side: Side) -> f64 {
    let Some(limit) = limit else { return 1.0 };
    let limit = limit as f64;
    let constrained = match side {
        Side::Buy => limit < eq,
        Side::Sell => limit > eq,
    };
    if constrained {
        (limit - eq).abs() / eq
    } else {
        0.0
    }
}

/// Per-trader, per-day alpha aggregates held across all trials of an
/// experiment: a running mean of Smith's alpha (updated incrementally per
/// trial) and the last trial's best-alpha floor.
#[derive(Debug, Clone)]
pub struct AlphaTable {
    n_days: usize,
    buy_alpha: Vec<Vec<f64>>,
    buy_best: Vec<Vec<f64>>,
    sell_alpha: Vec<Vec<f64>>,
    sell_best: Vec<Vec<f64>>,
}

impl AlphaTable {
    pub fn new(n_per_side: usize, n_days: usize) -> Self {
        Self {
            n_days,
            buy_alpha: vec![vec![0.0; n_days]; n_per_side],
            buy_best: vec![vec![1.0; n_days]; n_per_side],
            sell_alpha: vec![vec![0.0; n_days]; n_per_side],
            sell_best: vec![vec![1.0; n_days]; n_per_side],
        }
    }

    pub fn n_days(&self) -> usize {
        self.n_days
    }

    /// Fold one day's alpha into the trader's running cross-trial mean
    /// (`new = ((trial-1)*old + alpha) / trial`) and overwrite its
    /// best-alpha cell.
    pub fn fold(&mut self, id: TraderId, trial: u32, day: usize, alpha: f64, best: f64) {
        debug_assert!(day < self.n_days, "day {} outside the trial horizon", day);
        if day >= self.n_days {
            return;
        }
        let (alphas, bests) = match id.side {
            Side::Buy => (&mut self.buy_alpha, &mut self.buy_best),
            Side::Sell => (&mut self.sell_alpha, &mut self.sell_best),
        };
        let cell = &mut alphas[id.index][day];
        *cell = ((trial - 1) as f64 * *cell + alpha) / trial as f64;
        bests[id.index][day] = best;
    }

    pub fn alpha(&self, id: TraderId, day: usize) -> f64 {
        match id.side {
            Side::Buy => self.buy_alpha[id.index][day],
            Side::Sell => self.sell_alpha[id.index][day],
        }
    }

    pub fn best(&self, id: TraderId, day: usize) -> f64 {
        match id.side {
            Side::Buy => self.buy_best[id.index][day],
            Side::Sell => self.sell_best[id.index][day],
        }
    }

    /// Rows for tabulation: buyers first, then sellers, each with its
    /// per-day alpha and best-alpha slices.
    pub fn rows(&self) -> impl Iterator<Item = (TraderId, &[f64], &[f64])> {
        let buyers = self
            .buy_alpha
            .iter()
            .zip(&self.buy_best)
            .enumerate()
            .map(|(i, (a, b))| (TraderId::new(Side::Buy, i), a.as_slice(), b.as_slice()));
        let sellers = self
            .sell_alpha
            .iter()
            .zip(&self.sell_best)
            .enumerate()
            .map(|(i, (a, b))| (TraderId::new(Side::Sell, i), a.as_slice(), b.as_slice()));
        buyers.chain(sellers)
    }
}

/// Day-scoped running buffers for one session, rolled up into a
/// `DayRecord` whenever the clock crosses a day boundary.
#[derive(Debug)]
pub struct DayStats {
    interval: f64,
    current_day: usize,
    teq_p: Vec<f64>,
    aeq_p: Vec<f64>,
    transaction: Vec<f64>,
    records: Vec<DayRecord>,
}

impl DayStats {
    pub fn new(interval: f64) -> Self {
        Self {
            interval,
            current_day: 0,
            teq_p: Vec::new(),
            aeq_p: Vec::new(),
            transaction: Vec::new(),
            records: Vec::new(),
        }
    }

    pub fn current_day(&self) -> usize {
        self.current_day
    }

    /// Fold one tick into the day buffers, closing out the previous day
    /// first if `time` has crossed its boundary. Undefined values are
    /// skipped, not recorded as zeros.
    pub fn update(
        &mut self,
        trial: u32,
        time: f64,
        buyers: &mut [Trader],
        sellers: &mut [Trader],
        eq: &EqSample,
        transaction: Option<u64>,
        table: &mut AlphaTable,
    ) {
        if time > self.interval * (self.current_day + 1) as f64 {
            self.end_day(trial, buyers, sellers, table);
        }
        if let Some(teq) = eq.theoretical {
            self.teq_p.push(teq.price);
        }
        if let Some(aeq) = eq.actual {
            self.aeq_p.push(aeq.price);
        }
        if let Some(price) = transaction {
            self.transaction.push(price as f64);
        }
    }

    /// Close the trailing day (the session loop overshoots the last
    /// boundary by one timestep) and hand back the day table.
    pub fn finish(
        mut self,
        trial: u32,
        time: f64,
        buyers: &mut [Trader],
        sellers: &mut [Trader],
        table: &mut AlphaTable,
    ) -> Vec<DayRecord> {
        if time > self.interval * (self.current_day + 1) as f64 {
            self.end_day(trial, buyers, sellers, table);
        }
        self.records
    }

    fn end_day(
        &mut self,
        trial: u32,
        buyers: &mut [Trader],
        sellers: &mut [Trader],
        table: &mut AlphaTable,
    ) {
        let teq = day_mean(&self.teq_p);
        let aeq = day_mean(&self.aeq_p);

        for trader in buyers.iter_mut().chain(sellers.iter_mut()) {
            // A day with no defined theoretical equilibrium contributes no
            // alpha samples; the running mean is left untouched.
            if let Some(teq) = teq {
                let alpha = smiths_alpha(teq, trader.price_history());
                let best = best_alpha(teq, trader.limit(), trader.side());
                table.fold(trader.id, trial, self.current_day, alpha, best);
            }
            trader.reset_price_history();
        }

        self.records.push(DayRecord {
            trial,
            day: self.current_day,
            teq_p: teq,
            aeq_p: aeq,
            transaction: day_mean(&self.transaction),
        });

        self.current_day += 1;
        self.teq_p.clear();
        self.aeq_p.clear();
        self.transaction.clear();
    }
}

fn day_mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(Statistics::mean(values))
    }
}

// ----- Unit Tests -----
