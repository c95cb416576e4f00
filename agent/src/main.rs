//! `fde`: classify, plan, execute and record operator tasks.
//!
//! State lives under `<root>/.fde/`: `config.toml` plus one directory per
//! ticket holding its plan, checkpoint and evidence manifest.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{ArgGroup, Parser, Subcommand};
use serde::Serialize;

use fde_agent::adhoc::run_adhoc;
use fde_agent::core::types::{Environment, PlanStep, StepCommand, Task};
use fde_agent::exit_codes;
use fde_agent::io::checkpoint::FileCheckpointStore;
use fde_agent::io::config::{AgentConfig, load_config, write_config};
use fde_agent::io::evidence::load_manifest;
use fde_agent::io::paths::{AgentPaths, validate_ticket_id};
use fde_agent::io::plan_store::load_plan;
use fde_agent::io::transport::SystemTransport;
use fde_agent::logging;
use fde_agent::pipeline::{PipelineOptions, run_task};
use fde_agent::render::{render_adhoc, render_report};

#[derive(Parser)]
#[command(
    name = "fde",
    version,
    about = "Compliance-aware task planner and resumable executor"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write `.fde/config.toml` with default settings.
    Init {
        /// Overwrite an existing config.
        #[arg(short, long)]
        force: bool,
        /// Workspace root.
        #[arg(long, default_value = ".")]
        root: PathBuf,
    },
    /// Plan a task and, with `--execute`, run it.
    ///
    /// Exits 0 whenever the pipeline ran, including when validation failed.
    /// Check `validation_ok` in the output or manifest.
    Run(RunArgs),
    /// Run one shell, http or git command outside any ticket.
    ///
    /// Prints what would run unless `--execute` is given.
    Exec(ExecArgs),
    /// Print the stored evidence manifest for a ticket.
    Show {
        #[arg(long)]
        ticket: String,
        #[arg(long, default_value = ".")]
        root: PathBuf,
    },
}

#[derive(Debug, clap::Args)]
struct RunArgs {
    /// Task description.
    #[arg(long, required_unless_present = "plan")]
    task: Option<String>,
    #[arg(long, value_enum, default_value_t = Environment::Staging)]
    environment: Environment,
    #[arg(long)]
    client: Option<String>,
    /// Ticket id scoping the checkpoint and manifest. Generated when omitted.
    #[arg(long)]
    ticket: Option<String>,
    /// Execute the plan's steps instead of only printing the plan.
    #[arg(long)]
    execute: bool,
    /// Print JSON (the plan for a dry run, the manifest otherwise).
    #[arg(long)]
    json: bool,
    /// Append a human-readable block to this audit log.
    #[arg(long)]
    audit_log: Option<PathBuf>,
    /// Discard the ticket's checkpoint and start from the first step.
    #[arg(long)]
    reset: bool,
    /// Execute a plan file instead of generating a plan.
    #[arg(long)]
    plan: Option<PathBuf>,
    /// Workspace root.
    #[arg(long, default_value = ".")]
    root: PathBuf,
}

#[derive(Debug, clap::Args)]
#[command(group(ArgGroup::new("target").required(true).args(["shell", "url", "git"])))]
struct ExecArgs {
    /// Shell command line.
    #[arg(long)]
    shell: Option<String>,
    /// URL to request.
    #[arg(long)]
    url: Option<String>,
    /// HTTP method for `--url` (default GET).
    #[arg(long, requires = "url")]
    method: Option<String>,
    /// Request body for `--url`.
    #[arg(long, requires = "url")]
    body: Option<String>,
    /// Whitespace-separated git arguments, e.g. `--git "status --short"`.
    #[arg(long, allow_hyphen_values = true)]
    git: Option<String>,
    /// Dispatch the command instead of only printing it.
    #[arg(long)]
    execute: bool,
    /// Print the result as JSON.
    #[arg(long)]
    json: bool,
    /// Append a block to this audit log after executing.
    #[arg(long)]
    audit_log: Option<PathBuf>,
    #[arg(long, default_value = ".")]
    root: PathBuf,
}

fn main() {
    logging::init();
    if let Err(err) = run() {
        eprintln!("{:#}", err);
        std::process::exit(exit_codes::INVALID);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::Init { force, root } => cmd_init(&root, force),
        Command::Run(args) => cmd_run(args),
        Command::Exec(args) => cmd_exec(args),
        Command::Show { ticket, root } => cmd_show(&root, &ticket),
    }
}

fn cmd_init(root: &Path, force: bool) -> Result<()> {
    let paths = AgentPaths::new(root);
    if paths.config_path.exists() && !force {
        println!(
            "{} already exists (use --force to overwrite)",
            paths.config_path.display()
        );
        return Ok(());
    }
    write_config(&paths.config_path, &AgentConfig::default())?;
    println!("wrote {}", paths.config_path.display());
    Ok(())
}

fn cmd_run(args: RunArgs) -> Result<()> {
    let paths = AgentPaths::new(&args.root);
    let config = load_config(&paths.config_path)?;
    let plan = args.plan.as_deref().map(load_plan).transpose()?;

    let text = match (&args.task, &plan) {
        (Some(text), _) => text.clone(),
        (None, Some(plan)) => plan.title.clone(),
        (None, None) => anyhow::bail!("--task is required unless --plan is given"),
    };
    let task = Task {
        text,
        environment: args.environment,
        client: args.client,
        ticket_id: args.ticket,
    };

    let store = FileCheckpointStore::new(&paths.tickets_dir);
    let transport = SystemTransport::new(&paths.root, &config)?;
    let report = run_task(
        &paths,
        &config,
        task,
        PipelineOptions {
            execute: args.execute,
            reset: args.reset,
            audit_log: args.audit_log,
            plan,
        },
        store,
        transport,
    )?;

    if args.json {
        match &report.execution {
            Some(execution) => print_json(&execution.manifest)?,
            None => print_json(&report.plan)?,
        }
    } else {
        print!("{}", render_report(&report));
    }
    Ok(())
}

fn cmd_exec(args: ExecArgs) -> Result<()> {
    let paths = AgentPaths::new(&args.root);
    let config = load_config(&paths.config_path)?;
    let step = exec_step(&args)?;
    let transport = SystemTransport::new(&paths.root, &config)?;
    let run = run_adhoc(
        &config,
        step,
        args.execute,
        args.audit_log.as_deref(),
        transport,
    )?;
    if args.json {
        print_json(&run)
    } else {
        print!("{}", render_adhoc(&run));
        Ok(())
    }
}

fn exec_step(args: &ExecArgs) -> Result<PlanStep> {
    if let Some(command) = &args.shell {
        return Ok(PlanStep::shell(command.clone(), command.clone()));
    }
    if let Some(url) = &args.url {
        let method = args.method.as_deref().unwrap_or("GET").to_ascii_uppercase();
        return Ok(PlanStep {
            description: format!("{method} {url}"),
            command: Some(StepCommand::Http {
                method,
                url: url.clone(),
                body: args.body.clone(),
            }),
        });
    }
    if let Some(git) = &args.git {
        let argv: Vec<&str> = git.split_whitespace().collect();
        return Ok(PlanStep::git(format!("git {}", argv.join(" ")), argv));
    }
    bail!("exec needs one of --shell, --url or --git")
}

fn cmd_show(root: &Path, ticket: &str) -> Result<()> {
    validate_ticket_id(ticket)?;
    let paths = AgentPaths::new(root);
    let manifest_path = paths.ticket(ticket).manifest_path;
    let manifest = load_manifest(&manifest_path)
        .with_context(|| format!("no usable manifest for ticket '{ticket}'"))?;
    print_json(&manifest)
}

/// Pretty-printed JSON with trailing newline on stdout.
fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let payload = serde_json::to_string_pretty(value).context("serialize json")?;
    println!("{payload}");
    Ok(())
}
