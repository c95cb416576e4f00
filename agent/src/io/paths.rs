//! Canonical on-disk layout under `<root>/.fde/`.

use std::path::{Path, PathBuf};

use anyhow::{Result, anyhow};

/// Workspace-level paths.
#[derive(Debug, Clone)]
pub struct AgentPaths {
    pub root: PathBuf,
    pub state_dir: PathBuf,
    pub tickets_dir: PathBuf,
    pub config_path: PathBuf,
}

impl AgentPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let state_dir = root.join(".fde");
        Self {
            root: root.clone(),
            tickets_dir: state_dir.join("tickets"),
            config_path: state_dir.join("config.toml"),
            state_dir,
        }
    }

    pub fn ticket(&self, ticket_id: &str) -> TicketPaths {
        TicketPaths::new(&self.tickets_dir, ticket_id)
    }

    /// A generated ticket id with no existing ticket directory.
    ///
    /// A counter suffix is appended while the timestamped id is taken, so an
    /// omitted ticket always starts a new ticket instead of resuming one.
    pub fn unused_ticket_id(&self) -> String {
        let base = generate_ticket_id();
        let mut id = base.clone();
        let mut suffix = 1u32;
        while self.ticket(&id).dir.exists() {
            id = format!("{base}_{suffix}");
            suffix += 1;
        }
        id
    }
}

/// Per-ticket artifact paths.
#[derive(Debug, Clone)]
pub struct TicketPaths {
    pub dir: PathBuf,
    pub checkpoint_path: PathBuf,
    pub plan_path: PathBuf,
    pub manifest_path: PathBuf,
}

impl TicketPaths {
    pub fn new(tickets_dir: &Path, ticket_id: &str) -> Self {
        let dir = tickets_dir.join(ticket_id);
        Self {
            checkpoint_path: dir.join("checkpoint.json"),
            plan_path: dir.join("plan.json"),
            manifest_path: dir.join("manifest.json"),
            dir,
        }
    }
}

/// Validate that a ticket id is safe for use as a directory name.
pub fn validate_ticket_id(id: &str) -> Result<()> {
    if id.is_empty() {
        return Err(anyhow!("ticket id must not be empty"));
    }
    if id == "." || id == ".." {
        return Err(anyhow!("ticket id must not be '{id}'"));
    }
    if id
        .chars()
        .any(|c| !(c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-'))
    {
        return Err(anyhow!(
            "ticket id must be [A-Za-z0-9._-] only (got '{id}')"
        ));
    }
    Ok(())
}

/// Ticket id derived from the current UTC time, down to the microsecond.
pub fn generate_ticket_id() -> String {
    chrono::Utc::now().format("fde_%Y%m%d_%H%M%S_%6f").to_string()
}
