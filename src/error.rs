// src/error.rs

//! Error taxonomy for the simulator. Fatal setup/invariant problems become
//! `SimError` and bubble up to the driver; expected market conditions
//! (no willing counterparty, no crossing equilibrium, empty price history)
//! are plain values, never errors.

use crate::types::order::{OrderStatus, Side};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SimError {
    #[error("cannot parse experiment config: {0}")]
    ParseConfig(#[from] serde_json::Error),

    #[error("no traders specified on the {0} side")]
    EmptySide(Side),

    #[error("time {0:.2} is not covered by any schedule window")]
    NoScheduleWindow(f64),

    #[error("invalid network spec: {0}")]
    InvalidNetwork(String),

    #[error("invalid order schedule: {0}")]
    InvalidSchedule(String),

    #[error("order status {0} reached a strategy update; expected Deal or NoDeal")]
    InvalidOutcome(OrderStatus),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SimError>;
