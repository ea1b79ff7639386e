//! Configuration loading from TOML.
//!
//! Reads `config.toml` (or the path named by `QUEUE_PRICING_CONFIG`) and
//! deserializes it into strongly-typed structs. Only the `[model]` section
//! is required; solver tuning and output settings fall back to defaults.
//! Numeric validation happens where the values are consumed (model builder
//! and solver), not here.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;

/// Environment variable overriding the config file location.
pub const CONFIG_PATH_ENV: &str = "QUEUE_PRICING_CONFIG";

/// Default config file location.
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub model: ModelConfig,
    #[serde(default)]
    pub solver: SolverConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Queue and pricing parameters.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ModelConfig {
    /// Maximum occupancy `N`; states are `0..=N`.
    pub capacity: usize,
    /// Ordered price levels; the index is the action id.
    pub prices: Vec<f64>,
    /// Arrival rate at price zero.
    pub lambda0: f64,
    /// Price sensitivity of arrivals.
    pub beta: f64,
    /// Service rate.
    pub mu: f64,
    /// Holding cost per customer per unit time.
    pub cw: f64,
    /// Time-step length.
    pub dt: f64,
    /// Discount factor in `[0, 1)`.
    pub gamma: f64,
    /// Upper bound on `A·S·S` transition entries.
    #[serde(default = "default_max_tensor_entries")]
    pub max_tensor_entries: usize,
}

fn default_max_tensor_entries() -> usize {
    25_000_000
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            capacity: 30,
            prices: vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0],
            lambda0: 8.0,
            beta: 0.25,
            mu: 6.0,
            cw: 0.5,
            dt: 0.05,
            gamma: 0.99,
            max_tensor_entries: default_max_tensor_entries(),
        }
    }
}

/// Policy-iteration tuning.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct SolverConfig {
    /// Evaluation stops once the max value change drops below this.
    pub tol: f64,
    /// Sweep budget per policy evaluation.
    pub max_iter: usize,
    /// Outer evaluate/improve budget.
    pub max_outer: usize,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            tol: 1e-10,
            max_iter: 100_000,
            max_outer: 1_000,
        }
    }
}

/// Where and how results are reported.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory receiving the CSV tables and run summary.
    pub dir: String,
    /// Number of states shown in the console preview.
    pub preview_states: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: "results".to_string(),
            preview_states: 10,
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        Self::from_toml_str(&contents)
            .with_context(|| format!("Failed to parse config file: {path}"))
    }

    /// Parse configuration from TOML text.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(contents)?;
        Ok(config)
    }

    /// Config path from `QUEUE_PRICING_CONFIG`, or `config.toml`.
    pub fn resolve_path() -> String {
        std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string())
    }
}
