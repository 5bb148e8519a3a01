// src/agents/zip.rs

//! ZIP margin machinery (Cliff 1997): a signed profit margin over the
//! private limit, adapted by a Widrow-Hoff step with momentum whenever the
//! trader observes a match attempt.

use super::config::{
    ZIP_BETA_STEPS, ZIP_BETA_UNIT, ZIP_C_ABS, ZIP_C_REL, ZIP_MARGIN_STEPS, ZIP_MARGIN_UNIT,
    ZIP_MOMENTUM_CAP,
};
use crate::types::order::Side;
use rand::Rng;
use rand::rngs::StdRng;

#[derive(Debug, Clone)]
pub struct ZipEngine {
    margin: f64,
    beta: f64,
    momentum: f64,
    prev_change: f64,
}

impl ZipEngine {
    /// Draw side-appropriate starting parameters: buyers open with a
    /// negative margin, sellers with a positive one. `beta` and `momentum`
    /// are fixed for the life of the trial.
    pub fn new(side: Side, rng: &mut StdRng) -> Self {
        let magnitude = ZIP_MARGIN_UNIT * rng.gen_range(ZIP_MARGIN_STEPS) as f64;
        let margin = match side {
            Side::Buy => -magnitude,
            Side::Sell => magnitude,
        };
        Self {
            margin,
            beta: ZIP_BETA_UNIT * rng.gen_range(ZIP_BETA_STEPS) as f64,
            momentum: ZIP_MOMENTUM_CAP * rng.gen_range(0.0..1.0),
            prev_change: 0.0,
        }
    }

    pub fn margin(&self) -> f64 {
        self.margin
    }

    /// The deterministic quote for a limit: `round(limit * (1 + margin))`,
    /// floored at zero.
    pub fn price_for(&self, limit: u64) -> u64 {
        let raw = limit as f64 * (1.0 + self.margin);
        raw.round().max(0.0) as u64
    }

    /// Propose a target above `price`, perturbed upward by at most
    /// `ZIP_C_REL` relatively and `ZIP_C_ABS` absolutely.
    pub fn target_up(&self, price: u64, rng: &mut StdRng) -> f64 {
        let ptrb_abs = ZIP_C_ABS * rng.gen_range(0.0..1.0);
        let ptrb_rel = price as f64 * (1.0 + ZIP_C_REL * rng.gen_range(0.0..1.0));
        (ptrb_rel + ptrb_abs).round()
    }

    /// Propose a target below `price`, perturbed downward.
    pub fn target_down(&self, price: u64, rng: &mut StdRng) -> f64 {
        let ptrb_abs = ZIP_C_ABS * rng.gen_range(0.0..1.0);
        let ptrb_rel = price as f64 * (1.0 - ZIP_C_REL * rng.gen_range(0.0..1.0));
        (ptrb_rel - ptrb_abs).round()
    }

    /// One Widrow-Hoff step with momentum toward `target`. The new margin
    /// is kept only while its sign stays correct for `side` (negative for
    /// buyers, positive for sellers); momentum state advances either way.
    /// Returns the re-derived quote for `limit`.
    pub fn adjust(&mut self, side: Side, target: f64, price: u64, limit: u64) -> u64 {
        let diff = target - price as f64;
        let change = (1.0 - self.momentum) * (self.beta * diff) + self.momentum * self.prev_change;
        self.prev_change = change;

        let new_margin = (price as f64 + change) / limit as f64 - 1.0;
        match side {
            Side::Buy if new_margin < 0.0 => self.margin = new_margin,
            Side::Sell if new_margin > 0.0 => self.margin = new_margin,
            _ => {}
        }
        self.price_for(limit)
    }
}

// ----- Unit Tests -----
