//! Human-readable rendering of a [`TaskReport`].

use crate::adhoc::AdhocRun;
use crate::core::types::StepCommand;
use crate::pipeline::TaskReport;

pub fn render_report(report: &TaskReport) -> String {
    let mut out = String::new();
    out.push_str(&format!("Ticket: {}\n", report.ticket_id));
    out.push_str(&format!("Domain: {}\n", report.domain));
    out.push_str(&format!("Environment: {}\n", report.task.environment.as_str()));
    if let Some(client) = &report.task.client {
        out.push_str(&format!("Client: {client}\n"));
    }
    out.push_str(&format!("Summary: {}\n", report.task.text));

    if !report.plan.compliance.is_empty() {
        out.push_str("\nCompliance requirements:\n");
        for requirement in &report.plan.compliance {
            out.push_str(&format!("  - {requirement}\n"));
        }
    }

    out.push_str(&format!("\nPlan: {}\n", report.plan.title));
    for (index, step) in report.plan.steps.iter().enumerate() {
        let hint = command_hint(step.command.as_ref());
        out.push_str(&format!("  {}. {}{hint}\n", index + 1, step.description));
    }

    let Some(execution) = &report.execution else {
        out.push_str(&format!(
            "\nState: {} (dry run, pass --execute to run)\n",
            report.state.as_str()
        ));
        return out;
    };

    out.push_str(&format!(
        "\nExecuted ({} this run, checkpoint {}/{}):\n",
        execution.executed_now,
        execution.checkpoint,
        report.plan.steps.len()
    ));
    for (index, result) in execution.results.iter().enumerate() {
        out.push_str(&format!(
            "  {}. [{}] {}\n",
            index + 1,
            result.status,
            result.description
        ));
        if result.status.is_failed() && !result.stderr.trim().is_empty() {
            out.push_str(&format!("     {}\n", result.stderr.trim()));
        }
    }

    let validation = if execution.validation_ok { "passed" } else { "failed" };
    out.push_str(&format!("\nValidation: {validation}\n"));
    out.push_str(&format!("State: {}\n", report.state.as_str()));
    if let Some(rollback) = &execution.rollback_suggestion {
        out.push_str(&format!("Rollback suggestion: {rollback}\n"));
    }
    for warning in &execution.warnings {
        out.push_str(&format!("Warning: {warning}\n"));
    }
    out.push_str(&format!("Manifest: {}\n", execution.manifest_path.display()));
    out
}

/// Text for one `fde exec` call: status line, then captured output.
pub fn render_adhoc(run: &AdhocRun) -> String {
    let mut out = String::new();
    let hint = command_hint(run.step.command.as_ref());
    let Some(result) = &run.result else {
        out.push_str(&format!("Dry run:{hint} (pass --execute to run)\n"));
        return out;
    };
    out.push_str(&format!("[{}]{hint}\n", result.status));
    for text in [&result.stdout, &result.stderr] {
        let text = text.trim_end();
        if !text.is_empty() {
            out.push_str(text);
            out.push('\n');
        }
    }
    for warning in &run.warnings {
        out.push_str(&format!("Warning: {warning}\n"));
    }
    out
}

fn command_hint(command: Option<&StepCommand>) -> String {
    match command {
        None => String::new(),
        Some(StepCommand::Shell { command }) => format!(" [shell: {command}]"),
        Some(StepCommand::Http { method, url, .. }) => format!(" [http: {method} {url}]"),
        Some(StepCommand::Git { args }) => format!(" [git: {}]", args.join(" ")),
        Some(StepCommand::Unknown) => " [unknown]".to_string(),
    }
}
