// src/lib.rs

// === 1. Declare all the top-level modules ===
pub mod agents;
pub mod error;
pub mod experiment;
pub mod market;
pub mod network;
pub mod scheduler;
pub mod stats;
pub mod types;

// === 2. Re-export the public-facing components to create a clean API ===

// --- From `agents` ---
pub use agents::trader::{Strategy, StrategyKind, Trader};

// --- From `types` ---
pub use types::order::{Order, OrderStatus, Side, Trade, TraderId};

// --- From the `market` engine ---
pub use market::{Market, SessionOutput, TraderMix};

// --- From `network` ---
pub use network::{Network, NetworkSpec};

// --- From `scheduler` ---
pub use scheduler::{OrderSchedule, ScheduleWindow, Scheduler, StepMode, TimingMode};

// --- From `stats` ---
pub use stats::{AlphaTable, DayRecord, EqPoint, EqSample, TickRecord};

// --- From `experiment` ---
pub use experiment::{ExperimentConfig, ExperimentOutput};

// --- Errors ---
pub use error::{Result, SimError};
