// src/agents/mod.rs

pub mod config;
pub mod trader;
pub mod zic;
pub mod zip;
