// src/experiment.rs

//! Experiment configuration and the multi-trial driver: parse a JSON
//! parameter file, run the configured number of independent trials (each
//! on a freshly populated market with its own seeded RNG), and serialize
//! the tick/day/trader tables to CSV.

use crate::error::Result;
use crate::market::{Market, TraderMix};
use crate::network::NetworkSpec;
use crate::scheduler::{OrderSchedule, ScheduleWindow, StepMode, TimingMode};
use crate::stats::{AlphaTable, DayRecord, TickRecord};
use log::info;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Deserialize;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

/// One demand or supply window as configured, in day units. A window
/// covering days `from_day..=to_day` expands to the half-open time span
/// `[from_day * interval, (to_day + 1) * interval)`.
#[derive(Debug, Clone, Deserialize)]
pub struct WindowConfig {
    pub from_day: u32,
    pub to_day: u32,
    pub range: (u64, u64),
    pub stepmode: StepMode,
}

impl WindowConfig {
    fn expand(&self, interval: f64) -> ScheduleWindow {
        ScheduleWindow {
            from: self.from_day as f64 * interval,
            to: (self.to_day + 1) as f64 * interval,
            range: self.range,
            stepmode: self.stepmode,
        }
    }
}

/// The full parameter set for one experiment.
#[derive(Debug, Clone, Deserialize)]
pub struct ExperimentConfig {
    pub trials: u32,
    /// Per-side population mix, instantiated identically on both sides.
    pub agents: Vec<TraderMix>,
    pub network: NetworkSpec,
    pub order_interval: f64,
    pub days: u32,
    pub timemode: TimingMode,
    pub demand: Vec<WindowConfig>,
    pub supply: Vec<WindowConfig>,
}

impl ExperimentConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn n_per_side(&self) -> usize {
        self.agents.iter().map(|g| g.count).sum()
    }

    pub fn order_schedule(&self) -> OrderSchedule {
        let expand = |windows: &[WindowConfig]| {
            windows
                .iter()
                .map(|w| w.expand(self.order_interval))
                .collect()
        };
        OrderSchedule {
            interval: self.order_interval,
            timemode: self.timemode,
            demand: expand(&self.demand),
            supply: expand(&self.supply),
        }
    }
}

/// Everything an experiment produces, ready for tabulation.
#[derive(Debug)]
pub struct ExperimentOutput {
    pub ticks: Vec<TickRecord>,
    pub days: Vec<DayRecord>,
    pub alphas: AlphaTable,
}

/// Run all trials sequentially. Trial `t` draws from a fresh
/// `StdRng` seeded with `base_seed + t`, so any single trial can be
/// reproduced without re-running its predecessors.
pub fn run(config: &ExperimentConfig, base_seed: u64) -> Result<ExperimentOutput> {
    let schedule = config.order_schedule();
    let mut alphas = AlphaTable::new(config.n_per_side(), config.days as usize);
    let mut ticks = Vec::new();
    let mut days = Vec::new();

    for trial in 1..=config.trials {
        let mut rng = StdRng::seed_from_u64(base_seed + trial as u64);
        let mut market = Market::populate(&config.agents, &config.network, &mut rng)?;
        let output = market.run_session(trial, &schedule, config.days, &mut alphas, &mut rng)?;
        info!(
            "trial {}/{}: {} ticks, {} trades",
            trial,
            config.trials,
            output.ticks.len(),
            output.ticks.iter().filter(|t| t.transaction.is_some()).count()
        );
        ticks.extend(output.ticks);
        days.extend(output.days);
    }

    Ok(ExperimentOutput {
        ticks,
        days,
        alphas,
    })
}

/// Write the three output tables next to `stem`: `<stem>_tdat.csv` (per
/// tick), `<stem>_ddat.csv` (per day), `<stem>_ndat.csv` (per trader).
/// Undefined values serialize as empty cells.
pub fn write_csv(output: &ExperimentOutput, stem: &Path) -> Result<()> {
    fs::write(with_suffix(stem, "_tdat.csv"), tick_csv(&output.ticks))?;
    fs::write(with_suffix(stem, "_ddat.csv"), day_csv(&output.days))?;
    fs::write(with_suffix(stem, "_ndat.csv"), alpha_csv(&output.alphas))?;
    Ok(())
}

fn with_suffix(stem: &Path, suffix: &str) -> std::path::PathBuf {
    let mut name = stem.file_stem().unwrap_or_default().to_os_string();
    name.push(suffix);
    stem.with_file_name(name)
}

fn fmt_opt(value: Option<f64>) -> String {
    value.map(|v| format!("{:.4}", v)).unwrap_or_default()
}

fn fmt_qty(value: Option<usize>) -> String {
    value.map(|q| q.to_string()).unwrap_or_default()
}

pub fn tick_csv(ticks: &[TickRecord]) -> String {
    let mut out = String::from("trialID,time,TEQ_P,TEQ_Q,AEQ_P,AEQ_Q,Transaction\n");
    for t in ticks {
        let _ = writeln!(
            out,
            "{},{:.4},{},{},{},{},{}",
            t.trial,
            t.time,
            fmt_opt(t.eq.theoretical.map(|p| p.price)),
            fmt_qty(t.eq.theoretical.map(|p| p.qty)),
            fmt_opt(t.eq.actual.map(|p| p.price)),
            fmt_qty(t.eq.actual.map(|p| p.qty)),
            t.transaction.map(|p| p.to_string()).unwrap_or_default(),
        );
    }
    out
}

pub fn day_csv(days: &[DayRecord]) -> String {
    let mut out = String::from("trialID,day,TEQ_P,AEQ_P,Transaction\n");
    for d in days {
        let _ = writeln!(
            out,
            "{},{},{},{},{}",
            d.trial,
            d.day,
            fmt_opt(d.teq_p),
            fmt_opt(d.aeq_p),
            fmt_opt(d.transaction),
        );
    }
    out
}

pub fn alpha_csv(table: &AlphaTable) -> String {
    let mut out = String::from("tname");
    for day in 0..table.n_days() {
        let _ = write!(out, ",alpha{}", day);
    }
    for day in 0..table.n_days() {
        let _ = write!(out, ",best{}", day);
    }
    out.push('\n');

    for (id, alphas, bests) in table.rows() {
        let _ = write!(out, "{}", id);
        for a in alphas {
            let _ = write!(out, ",{:.4}", a);
        }
        for b in bests {
            let _ = write!(out, ",{:.4}", b);
        }
        out.push('\n');
    }
    out
}

// ----- Unit Tests -----
