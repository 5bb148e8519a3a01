// src/agents/zic.rs

//! ZIC quote generation: a uniform random price constrained by the private
//! limit (Gode & Sunder's "zero intelligence, constrained"). No learning.

use super::config::{MAX_PRICE, MIN_PRICE};
use crate::types::order::Side;
use rand::Rng;
use rand::rngs::StdRng;

/// Uniform draw in `[MIN_PRICE, limit]` for a buyer, `[limit, MAX_PRICE]`
/// for a seller, bounds inclusive. The scheduler clamps limits into the
/// global band, so both ranges are non-empty.
pub fn draw_price(side: Side, limit: u64, rng: &mut StdRng) -> u64 {
    match side {
        Side::Buy => rng.gen_range(MIN_PRICE..=limit),
        Side::Sell => rng.gen_range(limit..=MAX_PRICE),
    }
}

// ----- Unit Tests -----
