//! Durable checkpoint storage keyed by ticket id.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::core::types::{ExecutionResult, TaskPlan};
use crate::io::fs::write_atomic;
use crate::io::paths::TicketPaths;

/// Persisted runner progress for one ticket (`tickets/<id>/checkpoint.json`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Checkpoint {
    pub ticket_id: String,
    /// Index of the next step to execute.
    pub next_step: usize,
    /// Fingerprint of the plan this checkpoint belongs to.
    pub plan_fingerprint: String,
    /// Results for steps `0..next_step`, plus the failed attempt at `next_step` if the
    /// last run halted.
    pub results: Vec<ExecutionResult>,
}

impl Checkpoint {
    pub fn new(ticket_id: impl Into<String>, plan_fingerprint: impl Into<String>) -> Self {
        Self {
            ticket_id: ticket_id.into(),
            next_step: 0,
            plan_fingerprint: plan_fingerprint.into(),
            results: Vec::new(),
        }
    }
}

/// SHA-256 of the plan's canonical JSON, hex encoded.
pub fn plan_fingerprint(plan: &TaskPlan) -> Result<String> {
    let canonical = serde_json::to_vec(plan).context("serialize plan for fingerprint")?;
    let mut hasher = Sha256::new();
    hasher.update(canonical);
    Ok(hex::encode(hasher.finalize()))
}

/// Key-value store mapping ticket id to its checkpoint.
///
/// A completed `save` must be visible to the next `load` for the same ticket.
pub trait CheckpointStore {
    fn load(&self, ticket_id: &str) -> Result<Option<Checkpoint>>;
    fn save(&self, checkpoint: &Checkpoint) -> Result<()>;
    fn clear(&self, ticket_id: &str) -> Result<()>;
}

/// Checkpoints stored as JSON files under a tickets directory.
#[derive(Debug, Clone)]
pub struct FileCheckpointStore {
    tickets_dir: PathBuf,
}

impl FileCheckpointStore {
    pub fn new(tickets_dir: impl Into<PathBuf>) -> Self {
        Self {
            tickets_dir: tickets_dir.into(),
        }
    }

    pub fn path_for(&self, ticket_id: &str) -> PathBuf {
        TicketPaths::new(&self.tickets_dir, ticket_id).checkpoint_path
    }
}

impl CheckpointStore for FileCheckpointStore {
    fn load(&self, ticket_id: &str) -> Result<Option<Checkpoint>> {
        let path = self.path_for(ticket_id);
        if !path.exists() {
            debug!(ticket_id, "no checkpoint");
            return Ok(None);
        }
        load_checkpoint(&path).map(Some)
    }

    fn save(&self, checkpoint: &Checkpoint) -> Result<()> {
        write_checkpoint(&self.path_for(&checkpoint.ticket_id), checkpoint)
    }

    fn clear(&self, ticket_id: &str) -> Result<()> {
        let path = self.path_for(ticket_id);
        if path.exists() {
            debug!(ticket_id, "clearing checkpoint");
            fs::remove_file(&path).with_context(|| format!("remove {}", path.display()))?;
        }
        Ok(())
    }
}

/// Load a checkpoint from disk.
pub fn load_checkpoint(path: &Path) -> Result<Checkpoint> {
    debug!(path = %path.display(), "loading checkpoint");
    let contents =
        fs::read_to_string(path).with_context(|| format!("read checkpoint {}", path.display()))?;
    let checkpoint: Checkpoint = serde_json::from_str(&contents)
        .with_context(|| format!("parse checkpoint {}", path.display()))?;
    debug!(
        ticket_id = %checkpoint.ticket_id,
        next_step = checkpoint.next_step,
        "checkpoint loaded"
    );
    Ok(checkpoint)
}

/// Atomically write a checkpoint to disk (temp file + rename).
pub fn write_checkpoint(path: &Path, checkpoint: &Checkpoint) -> Result<()> {
    debug!(path = %path.display(), next_step = checkpoint.next_step, "writing checkpoint");
    let mut buf = serde_json::to_string_pretty(checkpoint)?;
    buf.push('\n');
    write_atomic(path, &buf, "json.tmp")
}
