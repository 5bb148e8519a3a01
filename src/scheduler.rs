// src/scheduler.rs

//! Customer-order scheduling: when the pending queue runs dry, a fresh
//! batch of orders (one per buyer, one per seller) is generated with issue
//! times and limit prices drawn from the active schedule window; otherwise
//! any order whose issue time has passed is released to its trader.

use crate::agents::config::{MAX_PRICE, MIN_PRICE};
use crate::error::{Result, SimError};
use crate::types::order::{Order, OrderStatus, Side, TraderId};
use log::warn;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;
use rand_distr::{Distribution, Exp};
use serde::Deserialize;

/// How issue times are spread across one order interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum TimingMode {
    /// Every trader re-ordered at the same fixed point in the interval.
    #[serde(rename = "periodic")]
    Periodic,
    /// Evenly spaced arrivals.
    #[serde(rename = "drip-fixed")]
    DripFixed,
    /// Evenly spaced arrivals plus uniform jitter within each slot.
    #[serde(rename = "drip-jitter")]
    DripJitter,
    /// Exponential inter-arrival times at rate `n / interval`.
    #[serde(rename = "drip-poisson")]
    DripPoisson,
}

/// How per-trader limit prices are laid along a window's price range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum StepMode {
    /// The bare linear ramp value.
    #[serde(rename = "fixed")]
    Fixed,
    /// The ramp value plus uniform noise of up to half a step either way.
    #[serde(rename = "jittered")]
    Jittered,
}

/// One demand or supply window: while `[from, to)` covers the current
/// time, limit prices ramp linearly across `range`.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleWindow {
    pub from: f64,
    pub to: f64,
    pub range: (u64, u64),
    pub stepmode: StepMode,
}

/// The full order schedule for a trial.
#[derive(Debug, Clone)]
pub struct OrderSchedule {
    pub interval: f64,
    pub timemode: TimingMode,
    pub demand: Vec<ScheduleWindow>,
    pub supply: Vec<ScheduleWindow>,
}

/// Owns the pending-order queue for one session.
#[derive(Debug)]
pub struct Scheduler {
    schedule: OrderSchedule,
    pending: Vec<Order>,
}

impl Scheduler {
    pub fn new(schedule: OrderSchedule) -> Result<Self> {
        if !schedule.interval.is_finite() || schedule.interval <= 0.0 {
            return Err(SimError::InvalidSchedule(format!(
                "order interval {} must be positive",
                schedule.interval
            )));
        }
        if schedule.demand.is_empty() || schedule.supply.is_empty() {
            return Err(SimError::InvalidSchedule(
                "demand and supply schedules must both be non-empty".into(),
            ));
        }
        Ok(Self {
            schedule,
            pending: Vec::new(),
        })
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// One scheduling pass. An empty queue triggers a full new batch (and
    /// releases nothing this tick); otherwise every order whose issue time
    /// lies strictly in the past is handed back for assignment.
    pub fn tick(&mut self, time: f64, n_traders: usize, rng: &mut StdRng) -> Result<Vec<Order>> {
        if self.pending.is_empty() {
            let buys = self.batch(time, Side::Buy, n_traders, rng)?;
            let sells = self.batch(time, Side::Sell, n_traders, rng)?;
            self.pending.extend(buys);
            self.pending.extend(sells);
            return Ok(Vec::new());
        }

        let mut released = Vec::new();
        self.pending.retain(|order| {
            if time > order.time {
                released.push(*order);
                false
            } else {
                true
            }
        });
        Ok(released)
    }

    fn batch(&self, time: f64, side: Side, n: usize, rng: &mut StdRng) -> Result<Vec<Order>> {
        let windows = match side {
            Side::Buy => &self.schedule.demand,
            Side::Sell => &self.schedule.supply,
        };
        let window = active_window(time, windows)?;
        let times = issue_times(n, self.schedule.timemode, self.schedule.interval, true, true, rng)?;

        let orders = (0..n)
            .map(|t| {
                Order::new(
                    TraderId::new(side, t),
                    side,
                    window_price(t, n, window, rng),
                    OrderStatus::Pending,
                    time + times[t],
                )
            })
            .collect();
        Ok(orders)
    }
}

/// Generate `n` issue-time offsets into one interval under `mode`. With
/// `fit` set, the whole batch is rescaled so the last arrival lands exactly
/// on the interval boundary; with `shuffle` set, the slot-to-trader
/// assignment is permuted so trader id and schedule slot decorrelate.
pub fn issue_times(
    n: usize,
    mode: TimingMode,
    interval: f64,
    fit: bool,
    shuffle: bool,
    rng: &mut StdRng,
) -> Result<Vec<f64>> {
    if n < 1 {
        return Err(SimError::InvalidSchedule(
            "cannot schedule issue times for zero traders".into(),
        ));
    }
    let timestep = if n > 1 {
        interval / (n - 1) as f64
    } else {
        interval
    };

    let mut times = Vec::with_capacity(n);
    let mut arrival = 0.0;
    for slot in 0..n {
        arrival = match mode {
            TimingMode::Periodic => interval,
            TimingMode::DripFixed => slot as f64 * timestep,
            TimingMode::DripJitter => slot as f64 * timestep + timestep * rng.gen_range(0.0..1.0),
            TimingMode::DripPoisson => {
                let exp = Exp::new(n as f64 / interval).map_err(|e| {
                    SimError::InvalidSchedule(format!("bad poisson arrival rate: {}", e))
                })?;
                arrival + exp.sample(rng)
            }
        };
        times.push(arrival);
    }

    // `arrival` is now the last (unshuffled) arrival time.
    if fit && arrival > 0.0 && arrival != interval {
        for t in &mut times {
            *t = interval * (*t / arrival);
        }
    }

    if shuffle {
        times.shuffle(rng);
    }
    Ok(times)
}

/// First window whose `[from, to)` covers `time`; earlier windows win.
pub fn active_window(time: f64, windows: &[ScheduleWindow]) -> Result<&ScheduleWindow> {
    windows
        .iter()
        .find(|w| w.from <= time && time < w.to)
        .ok_or(SimError::NoScheduleWindow(time))
}

/// Limit price for the trader in ramp slot `slot` out of `n`, per the
/// window's step mode. Both the window bounds and the final price are
/// clamped into the global band.
pub fn window_price(slot: usize, n: usize, window: &ScheduleWindow, rng: &mut StdRng) -> u64 {
    let lo = clamp_price(window.range.0.min(window.range.1) as i64) as i64;
    let hi = clamp_price(window.range.0.max(window.range.1) as i64) as i64;
    let step = if n > 1 {
        (hi - lo) as f64 / (n - 1) as f64
    } else {
        0.0
    };

    let ramp = lo + (slot as f64 * step).trunc() as i64;
    let price = match window.stepmode {
        StepMode::Fixed => ramp,
        StepMode::Jittered => {
            let half_step = (step / 2.0).round() as i64;
            ramp + rng.gen_range(-half_step..=half_step)
        }
    };
    clamp_price(price)
}

fn clamp_price(price: i64) -> u64 {
    if price < MIN_PRICE as i64 {
        warn!("price {} below MIN_PRICE, clamped to {}", price, MIN_PRICE);
        MIN_PRICE
    } else if price > MAX_PRICE as i64 {
        warn!("price {} above MAX_PRICE, clamped to {}", price, MAX_PRICE);
        MAX_PRICE
    } else {
        price as u64
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

    fn window(from: f64, to: f64, range: (u64, u64), stepmode: StepMode) -> ScheduleWindow {
        ScheduleWindow {
            from,
            to,
            range,
            stepmode,
        }
    }

    fn schedule(timemode: TimingMode) -> OrderSchedule {
        OrderSchedule {
            interval: 30.0,
            timemode,
            demand: vec![window(0.0, 300.0, (50, 150), StepMode::Fixed)],
            supply: vec![window(0.0, 300.0, (50, 150), StepMode::Fixed)],
        }
    }

    #[test]
    fn test_issue_times_fit_lands_on_interval_for_every_mode() {
        let mut rng = rng();
        for mode in [
            TimingMode::Periodic,
            TimingMode::DripFixed,
            TimingMode::DripJitter,
            TimingMode::DripPoisson,
        ] {
            let times = issue_times(10, mode, 30.0, true, false, &mut rng)
                .expect("ten traders is a valid batch");
            assert_eq!(times.len(), 10);
            let last = times.iter().cloned().fold(f64::MIN, f64::max);
            assert!(
                (last - 30.0).abs() < 1e-9,
                "{:?}: last arrival {} missed the interval boundary.",
                mode,
                last
            );
            assert!(
                times.iter().all(|&t| t >= 0.0),
                "{:?}: negative arrival time.",
                mode
            );
        }
    }

    #[test]
    fn test_periodic_times_are_all_the_interval() {
        let times = issue_times(5, TimingMode::Periodic, 30.0, true, true, &mut rng())
            .expect("valid batch");
        assert!(times.iter().all(|&t| (t - 30.0).abs() < 1e-12));
    }

    #[test]
    fn test_drip_fixed_is_evenly_spaced_without_shuffle() {
        let times = issue_times(4, TimingMode::DripFixed, 30.0, true, false, &mut rng())
            .expect("valid batch");
        for (slot, &t) in times.iter().enumerate() {
            assert!(
                (t - slot as f64 * 10.0).abs() < 1e-9,
                "Slot {} arrived at {} instead of {}.",
                slot,
                t,
                slot as f64 * 10.0
            );
        }
    }

    #[test]
    fn test_shuffle_preserves_the_time_set() {
        let mut rng_a = StdRng::seed_from_u64(3);
        let mut rng_b = StdRng::seed_from_u64(3);
        let plain = issue_times(8, TimingMode::DripFixed, 30.0, true, false, &mut rng_a)
            .expect("valid batch");
        let mut shuffled = issue_times(8, TimingMode::DripFixed, 30.0, true, true, &mut rng_b)
            .expect("valid batch");
        shuffled.sort_by(|a, b| a.partial_cmp(b).expect("finite times"));
        for (a, b) in plain.iter().zip(&shuffled) {
            assert!((a - b).abs() < 1e-9, "Shuffle must only permute times.");
        }
    }

    #[test]
    fn test_zero_traders_is_a_schedule_error() {
        let result = issue_times(0, TimingMode::DripFixed, 30.0, true, true, &mut rng());
        assert!(matches!(result, Err(SimError::InvalidSchedule(_))));
    }

    #[test]
    fn test_active_window_takes_first_match() {
        let windows = vec![
            window(0.0, 60.0, (50, 150), StepMode::Fixed),
            window(30.0, 120.0, (200, 300), StepMode::Fixed),
        ];

        let w = active_window(45.0, &windows).expect("45 is covered");
        assert_eq!(w.range, (50, 150), "Earlier windows take priority.");

        let w = active_window(60.0, &windows).expect("60 is covered by the second window");
        assert_eq!(w.range, (200, 300));

        assert!(
            matches!(active_window(120.0, &windows), Err(SimError::NoScheduleWindow(_))),
            "`to` is exclusive, 120 is uncovered."
        );
    }

    #[test]
    fn test_fixed_ramp_spans_the_window_range() {
        let mut rng = rng();
        let w = window(0.0, 30.0, (100, 200), StepMode::Fixed);
        let n = 11;

        let prices: Vec<u64> = (0..n).map(|t| window_price(t, n, &w, &mut rng)).collect();

        assert_eq!(prices[0], 100);
        assert_eq!(prices[n - 1], 200);
        for pair in prices.windows(2) {
            assert!(pair[0] <= pair[1], "Fixed ramp must be monotone.");
        }
    }

    #[test]
    fn test_reversed_range_is_normalized() {
        let mut rng = rng();
        let w = window(0.0, 30.0, (200, 100), StepMode::Fixed);
        assert_eq!(window_price(0, 11, &w, &mut rng), 100);
        assert_eq!(window_price(10, 11, &w, &mut rng), 200);
    }

    #[test]
    fn test_jittered_price_stays_within_half_step_and_band() {
        let mut rng = rng();
        let w = window(0.0, 30.0, (100, 200), StepMode::Jittered);
        let n = 11; // step 10, half-step 5
        for slot in 0..n {
            let ramp = 100 + slot as u64 * 10;
            for _ in 0..50 {
                let price = window_price(slot, n, &w, &mut rng);
                assert!(
                    price >= ramp.saturating_sub(5) && price <= ramp + 5,
                    "Slot {} price {} strayed beyond the jitter band.",
                    slot,
                    price
                );
            }
        }
    }

    #[test]
    fn test_out_of_band_prices_are_clamped() {
        let mut rng = rng();
        let w = window(0.0, 30.0, (0, 5000), StepMode::Fixed);
        assert_eq!(window_price(0, 2, &w, &mut rng), MIN_PRICE);
        assert_eq!(window_price(1, 2, &w, &mut rng), MAX_PRICE);
    }

    #[test]
    fn test_empty_queue_generates_one_order_per_trader_per_side() {
        let mut rng = rng();
        let mut scheduler = Scheduler::new(schedule(TimingMode::DripFixed))
            .expect("valid schedule");

        let released = scheduler.tick(0.0, 5, &mut rng).expect("windows cover t=0");

        assert!(released.is_empty(), "The generation tick releases nothing.");
        assert_eq!(scheduler.pending_len(), 10);
    }

    #[test]
    fn test_orders_release_only_after_issue_time() {
        let mut rng = rng();
        let mut scheduler = Scheduler::new(schedule(TimingMode::DripFixed))
            .expect("valid schedule");
        scheduler.tick(0.0, 5, &mut rng).expect("generation tick");

        // Past the interval end every pending order's issue time has passed.
        let released = scheduler.tick(31.0, 5, &mut rng).expect("release tick");

        assert_eq!(released.len(), 10, "All orders fall due within one interval.");
        assert_eq!(scheduler.pending_len(), 0);
        for order in &released {
            assert_eq!(order.status, OrderStatus::Pending);
            assert!(order.time < 31.0, "Released orders were due.");
        }
    }

    #[test]
    fn test_uncovered_time_is_fatal_on_generation() {
        let mut rng = rng();
        let mut sched = schedule(TimingMode::DripFixed);
        sched.demand = vec![window(0.0, 60.0, (50, 150), StepMode::Fixed)];
        let mut scheduler = Scheduler::new(sched).expect("valid schedule");

        let result = scheduler.tick(90.0, 5, &mut rng);

        assert!(matches!(result, Err(SimError::NoScheduleWindow(_))));
    }

    #[test]
    fn test_rejects_degenerate_schedules() {
        let mut bad = schedule(TimingMode::Periodic);
        bad.interval = 0.0;
        assert!(matches!(
            Scheduler::new(bad),
            Err(SimError::InvalidSchedule(_))
        ));

        let mut bad = schedule(TimingMode::Periodic);
        bad.supply.clear();
        assert!(matches!(
            Scheduler::new(bad),
            Err(SimError::InvalidSchedule(_))
        ));
    }
}
