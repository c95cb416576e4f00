//! Step dispatch: turns one plan step into exactly one execution result.
//!
//! Dispatch never returns an error. Every transport failure is folded into a
//! `failed(exception)` result so the runner can record it and halt.

use tracing::{debug, warn};

use crate::core::types::{
    CommandKind, ExecutionResult, Failure, PlanStep, ResultMeta, StepCommand, StepStatus,
};
use crate::io::transport::{ProcessOutcome, Transport};

pub const DEFAULT_BODY_PREVIEW_BYTES: usize = 2_000;

/// Routes typed plan steps to a [`Transport`].
pub struct Dispatcher<T: Transport> {
    transport: T,
    body_preview_bytes: usize,
}

impl<T: Transport> Dispatcher<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            body_preview_bytes: DEFAULT_BODY_PREVIEW_BYTES,
        }
    }

    pub fn with_body_preview(mut self, bytes: usize) -> Self {
        self.body_preview_bytes = bytes;
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn dispatch(&self, step: &PlanStep) -> ExecutionResult {
        let Some(command) = &step.command else {
            debug!(description = %step.description, "narrative step, skipping");
            return skipped(step, None, "");
        };

        match command {
            StepCommand::Shell { command } => {
                if command.trim().is_empty() {
                    return skipped(step, Some(CommandKind::Shell), "no command provided");
                }
                process_result(
                    step,
                    CommandKind::Shell,
                    self.transport.run_shell(command),
                )
            }
            StepCommand::Git { args } => {
                if args.is_empty() {
                    return skipped(step, Some(CommandKind::Git), "no git args provided");
                }
                process_result(step, CommandKind::Git, self.transport.run_git(args))
            }
            StepCommand::Http { method, url, body } => {
                if url.trim().is_empty() {
                    return skipped(step, Some(CommandKind::Http), "no url provided");
                }
                match self.transport.run_http(method, url, body.as_deref()) {
                    Ok(outcome) => {
                        let status = if (200..400).contains(&outcome.status_code) {
                            StepStatus::Ok
                        } else {
                            StepStatus::Failed(Failure::Code(i64::from(outcome.status_code)))
                        };
                        ExecutionResult {
                            description: step.description.clone(),
                            command: Some(CommandKind::Http),
                            status,
                            stdout: format!(
                                "HTTP {}\n{}",
                                outcome.status_code,
                                preview(&outcome.body, self.body_preview_bytes)
                            ),
                            stderr: String::new(),
                            meta: Some(ResultMeta::Http {
                                status_code: outcome.status_code,
                            }),
                        }
                    }
                    Err(err) => exception(step, CommandKind::Http, &err),
                }
            }
            StepCommand::Unknown => skipped(
                step,
                Some(CommandKind::Unknown),
                "unrecognized command kind",
            ),
        }
    }
}

fn process_result(
    step: &PlanStep,
    kind: CommandKind,
    outcome: anyhow::Result<ProcessOutcome>,
) -> ExecutionResult {
    match outcome {
        Ok(outcome) => {
            let status = if outcome.exit_code == 0 {
                StepStatus::Ok
            } else {
                StepStatus::Failed(Failure::Code(i64::from(outcome.exit_code)))
            };
            ExecutionResult {
                description: step.description.clone(),
                command: Some(kind),
                status,
                stdout: outcome.stdout,
                stderr: outcome.stderr,
                meta: Some(ResultMeta::Process {
                    exit_code: outcome.exit_code,
                }),
            }
        }
        Err(err) => exception(step, kind, &err),
    }
}

fn skipped(step: &PlanStep, kind: Option<CommandKind>, reason: &str) -> ExecutionResult {
    ExecutionResult {
        description: step.description.clone(),
        command: kind,
        status: StepStatus::Skipped,
        stdout: String::new(),
        stderr: reason.to_string(),
        meta: None,
    }
}

fn exception(step: &PlanStep, kind: CommandKind, err: &anyhow::Error) -> ExecutionResult {
    warn!(description = %step.description, kind = kind.as_str(), err = %err, "transport error");
    ExecutionResult {
        description: step.description.clone(),
        command: Some(kind),
        status: StepStatus::Failed(Failure::Exception),
        stdout: String::new(),
        stderr: format!("{err:#}"),
        meta: None,
    }
}

/// First `limit` bytes of `body`, cut back to a char boundary.
fn preview(body: &str, limit: usize) -> &str {
    if body.len() <= limit {
        return body;
    }
    let mut end = limit;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    &body[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{ScriptedCall, ScriptedTransport};

    #[test]
    fn narrative_step_is_skipped_without_touching_transport() {
        let transport = ScriptedTransport::new();
        let dispatcher = Dispatcher::new(transport);
        let result = dispatcher.dispatch(&PlanStep::narrative("Discovery: map the estate"));
        assert_eq!(result.status, StepStatus::Skipped);
        assert_eq!(result.command, None);
        assert!(dispatcher.transport().calls().is_empty());
    }

    #[test]
    fn missing_payloads_are_skipped_with_reason() {
        let dispatcher = Dispatcher::new(ScriptedTransport::new());
        let shell = dispatcher.dispatch(&PlanStep::shell("Empty", "  "));
        assert_eq!(shell.status, StepStatus::Skipped);
        assert_eq!(shell.stderr, "no command provided");

        let http = dispatcher.dispatch(&PlanStep::http("Empty", "GET", ""));
        assert_eq!(http.stderr, "no url provided");

        let git = dispatcher.dispatch(&PlanStep::git("Empty", Vec::<String>::new()));
        assert_eq!(git.stderr, "no git args provided");
        assert!(dispatcher.transport().calls().is_empty());
    }

    #[test]
    fn unknown_kind_is_skipped() {
        let dispatcher = Dispatcher::new(ScriptedTransport::new());
        let step = PlanStep {
            description: "Page on-call".to_string(),
            command: Some(StepCommand::Unknown),
        };
        let result = dispatcher.dispatch(&step);
        assert_eq!(result.status, StepStatus::Skipped);
        assert_eq!(result.command, Some(CommandKind::Unknown));
        assert_eq!(result.stderr, "unrecognized command kind");
    }

    #[test]
    fn shell_exit_codes_map_to_status() {
        let transport = ScriptedTransport::new();
        transport.push_process(0, "hello\n", "");
        transport.push_process(2, "", "boom\n");
        let dispatcher = Dispatcher::new(transport);

        let ok = dispatcher.dispatch(&PlanStep::shell("Say hi", "echo hello"));
        assert_eq!(ok.status, StepStatus::Ok);
        assert_eq!(ok.stdout, "hello\n");
        assert_eq!(ok.meta, Some(ResultMeta::Process { exit_code: 0 }));

        let failed = dispatcher.dispatch(&PlanStep::shell("Finalize", "exit 2"));
        assert_eq!(failed.status, StepStatus::Failed(Failure::Code(2)));
        assert_eq!(failed.stderr, "boom\n");

        assert_eq!(
            dispatcher.transport().calls(),
            vec![
                ScriptedCall::Shell("echo hello".to_string()),
                ScriptedCall::Shell("exit 2".to_string()),
            ]
        );
        dispatcher.transport().assert_drained();
    }

    #[test]
    fn http_status_classes_map_to_status() {
        let transport = ScriptedTransport::new();
        transport.push_http(200, "<html>ok</html>");
        transport.push_http(302, "");
        transport.push_http(404, "missing");
        let dispatcher = Dispatcher::new(transport);
        let step = PlanStep::http("Health", "GET", "http://127.0.0.1:8000/index.html");

        let ok = dispatcher.dispatch(&step);
        assert_eq!(ok.status, StepStatus::Ok);
        assert_eq!(ok.stdout, "HTTP 200\n<html>ok</html>");
        assert_eq!(ok.meta, Some(ResultMeta::Http { status_code: 200 }));

        assert_eq!(dispatcher.dispatch(&step).status, StepStatus::Ok);
        assert_eq!(
            dispatcher.dispatch(&step).status,
            StepStatus::Failed(Failure::Code(404))
        );
        dispatcher.transport().assert_drained();
    }

    #[test]
    fn http_request_body_reaches_transport() {
        let transport = ScriptedTransport::new();
        transport.push_http(201, "created");
        transport.push_http(200, "ok");
        let dispatcher = Dispatcher::new(transport);
        let post = PlanStep {
            description: "Register clinic".to_string(),
            command: Some(StepCommand::Http {
                method: "POST".to_string(),
                url: "http://127.0.0.1:8000/clinics".to_string(),
                body: Some(r#"{"clinic":"north"}"#.to_string()),
            }),
        };

        assert_eq!(dispatcher.dispatch(&post).status, StepStatus::Ok);
        dispatcher.dispatch(&PlanStep::http("Health", "GET", "http://127.0.0.1:8000/health"));
        assert_eq!(
            dispatcher.transport().calls(),
            vec![
                ScriptedCall::Http {
                    method: "POST".to_string(),
                    url: "http://127.0.0.1:8000/clinics".to_string(),
                    body: Some(r#"{"clinic":"north"}"#.to_string()),
                },
                ScriptedCall::Http {
                    method: "GET".to_string(),
                    url: "http://127.0.0.1:8000/health".to_string(),
                    body: None,
                },
            ]
        );
    }

    #[test]
    fn http_body_is_truncated_for_stdout() {
        let transport = ScriptedTransport::new();
        transport.push_http(200, "abcdefghij");
        let dispatcher = Dispatcher::new(transport).with_body_preview(4);
        let result = dispatcher.dispatch(&PlanStep::http("Health", "GET", "http://x"));
        assert_eq!(result.stdout, "HTTP 200\nabcd");
    }

    #[test]
    fn transport_errors_become_exceptions() {
        let transport = ScriptedTransport::new();
        transport.push_error("connection refused");
        transport.push_error("git command timed out after 30s");
        let dispatcher = Dispatcher::new(transport);

        let http = dispatcher.dispatch(&PlanStep::http("Health", "GET", "http://x"));
        assert_eq!(http.status, StepStatus::Failed(Failure::Exception));
        assert!(http.stderr.contains("connection refused"));
        assert_eq!(http.meta, None);

        let git = dispatcher.dispatch(&PlanStep::git("Status", ["status"]));
        assert_eq!(git.status, StepStatus::Failed(Failure::Exception));
        assert_eq!(git.command, Some(CommandKind::Git));
    }

    #[test]
    fn preview_respects_char_boundaries() {
        assert_eq!(preview("héllo", 2), "h");
        assert_eq!(preview("short", 100), "short");
    }
}
