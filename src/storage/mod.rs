//! Persistence layer.
//!
//! Writes the solved policy, its value function, and the iteration history
//! as CSV tables, plus a JSON run summary that can be loaded back for
//! later comparison between runs.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use uuid::Uuid;

use crate::analysis::PolicyReport;
use crate::config::{ModelConfig, SolverConfig};
use crate::model::QueuePricingMdp;
use crate::types::{
    ConvergenceStatus, IterationRecord, Policy, PolicyIterationOutcome, ValueFunction,
};

pub const POLICY_TABLE_FILE: &str = "policy_table.csv";
pub const VALUE_TABLE_FILE: &str = "value_function.csv";
pub const HISTORY_FILE: &str = "policy_iteration_history.csv";
pub const SUMMARY_FILE: &str = "run_summary.json";

// ---------------------------------------------------------------------------
// Run summary
// ---------------------------------------------------------------------------

/// Everything needed to identify and compare a solver run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub model: ModelConfig,
    pub solver: SolverConfig,
    pub status: ConvergenceStatus,
    pub iterations: usize,
    pub evaluations_converged: bool,
    pub history: Vec<IterationRecord>,
    pub report: PolicyReport,
}

impl RunSummary {
    pub fn new(
        mdp: &QueuePricingMdp,
        solver: &SolverConfig,
        outcome: &PolicyIterationOutcome,
        report: PolicyReport,
    ) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            generated_at: Utc::now(),
            model: mdp.config().clone(),
            solver: solver.clone(),
            status: outcome.status,
            iterations: outcome.iterations(),
            evaluations_converged: outcome.evaluations_converged(),
            history: outcome.history.clone(),
            report,
        }
    }
}

/// Paths of the files written by [`save_results`].
#[derive(Debug, Clone)]
pub struct ResultPaths {
    pub policy_table: PathBuf,
    pub value_table: PathBuf,
    pub history: PathBuf,
}

// ---------------------------------------------------------------------------
// CSV tables
// ---------------------------------------------------------------------------

/// Write all three result tables into `dir`, creating it if needed.
pub fn save_results(
    dir: &Path,
    mdp: &QueuePricingMdp,
    outcome: &PolicyIterationOutcome,
) -> Result<ResultPaths> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory {}", dir.display()))?;

    let paths = ResultPaths {
        policy_table: dir.join(POLICY_TABLE_FILE),
        value_table: dir.join(VALUE_TABLE_FILE),
        history: dir.join(HISTORY_FILE),
    };

    write_policy_table(&paths.policy_table, mdp, &outcome.policy)?;
    write_value_table(&paths.value_table, &outcome.values)?;
    write_history(&paths.history, &outcome.history)?;

    info!(dir = %dir.display(), "Results saved");
    Ok(paths)
}

/// `state_n,action_price`, one row per state.
pub fn write_policy_table(path: &Path, mdp: &QueuePricingMdp, policy: &Policy) -> Result<()> {
    write_csv(path, "state_n,action_price", |out| {
        for (state, &action) in policy.actions().iter().enumerate() {
            writeln!(out, "{},{}", state, mdp.price(action))?;
        }
        Ok(())
    })
}

/// `state_n,V`, one row per state.
pub fn write_value_table(path: &Path, values: &ValueFunction) -> Result<()> {
    write_csv(path, "state_n,V", |out| {
        for (state, v) in values.as_slice().iter().enumerate() {
            writeln!(out, "{},{}", state, v)?;
        }
        Ok(())
    })
}

/// `iter,changed_states`, one row per outer iteration.
pub fn write_history(path: &Path, history: &[IterationRecord]) -> Result<()> {
    write_csv(path, "iter,changed_states", |out| {
        for record in history {
            writeln!(out, "{},{}", record.iteration, record.changed_states)?;
        }
        Ok(())
    })
}

fn write_csv<F>(path: &Path, header: &str, body: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<File>) -> std::io::Result<()>,
{
    let file = File::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    let mut out = BufWriter::new(file);
    write_rows(&mut out, header, body)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    debug!(path = %path.display(), "Table written");
    Ok(())
}

fn write_rows<F>(out: &mut BufWriter<File>, header: &str, body: F) -> std::io::Result<()>
where
    F: FnOnce(&mut BufWriter<File>) -> std::io::Result<()>,
{
    writeln!(out, "{header}")?;
    body(out)?;
    out.flush()
}

// ---------------------------------------------------------------------------
// JSON summary
// ---------------------------------------------------------------------------

/// Save a run summary as pretty-printed JSON.
pub fn save_summary(summary: &RunSummary, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(summary)
        .context("Failed to serialise run summary")?;

    fs::write(path, &json)
        .with_context(|| format!("Failed to write summary to {}", path.display()))?;

    debug!(path = %path.display(), run_id = %summary.run_id, "Summary saved");
    Ok(())
}

/// Load a run summary. Returns None if the file doesn't exist.
pub fn load_summary(path: &Path) -> Result<Option<RunSummary>> {
    if !path.exists() {
        info!(path = %path.display(), "No run summary found");
        return Ok(None);
    }

    let json = fs::read_to_string(path)
        .with_context(|| format!("Failed to read summary from {}", path.display()))?;

    let summary: RunSummary = serde_json::from_str(&json)
        .with_context(|| format!("Failed to parse summary from {}", path.display()))?;

    info!(
        path = %path.display(),
        run_id = %summary.run_id,
        iterations = summary.iterations,
        status = %summary.status,
        "Run summary loaded"
    );

    Ok(Some(summary))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
