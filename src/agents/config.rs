// src/agents/config.rs

//! A centralized place for market-wide tuning parameters.

// --- Global price band ---
// Every quote and every scheduled limit is clamped into this band.
pub const MIN_PRICE: u64 = 1;
pub const MAX_PRICE: u64 = 1000;

// --- ZIP learning (Cliff 1997) ---
// Relative/absolute caps on the random perturbation applied when a ZIP
// trader proposes a new target price.
pub const ZIP_C_REL: f64 = 0.05;
pub const ZIP_C_ABS: f64 = 0.05;
// Initial margin magnitude is ZIP_MARGIN_UNIT * a draw from ZIP_MARGIN_STEPS
// (negated for buyers). Learning rate is ZIP_BETA_UNIT * a draw from
// ZIP_BETA_STEPS, so beta lands on one of 0.1..=0.5.
pub const ZIP_MARGIN_UNIT: f64 = 0.01;
pub const ZIP_MARGIN_STEPS: std::ops::Range<u32> = 5..36;
pub const ZIP_BETA_UNIT: f64 = 0.1;
pub const ZIP_BETA_STEPS: std::ops::Range<u32> = 1..6;
// Momentum is uniform in [0, ZIP_MOMENTUM_CAP).
pub const ZIP_MOMENTUM_CAP: f64 = 0.1;
