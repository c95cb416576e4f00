//! Plan load/save helpers with invariant validation.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use tracing::debug;

use crate::core::invariants::validate_plan;
use crate::core::types::TaskPlan;
use crate::io::fs::write_atomic;

/// Load a plan file and check its shape.
pub fn load_plan(path: &Path) -> Result<TaskPlan> {
    debug!(path = %path.display(), "loading plan");
    let contents =
        fs::read_to_string(path).with_context(|| format!("read plan {}", path.display()))?;
    let plan: TaskPlan = serde_json::from_str(&contents)
        .with_context(|| format!("parse plan {}", path.display()))?;
    validate_plan_invariants(&plan)?;
    Ok(plan)
}

/// Write a plan to disk, overwriting any previous copy.
pub fn write_plan(path: &Path, plan: &TaskPlan) -> Result<()> {
    let mut buf = serde_json::to_string_pretty(plan).context("serialize plan")?;
    buf.push('\n');
    write_atomic(path, &buf, "json.tmp")
}

fn validate_plan_invariants(plan: &TaskPlan) -> Result<()> {
    let errors = validate_plan(plan);
    if errors.is_empty() {
        return Ok(());
    }
    Err(anyhow!("plan invariants failed: {}", errors.join("; ")))
}
