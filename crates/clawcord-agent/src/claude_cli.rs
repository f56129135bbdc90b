use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::process::Command;
use tracing::debug;

use clawcord_core::config::ClaudeCodeConfig;

use crate::backend::{AssistantBackend, EventStream, QueryOptions};
use crate::error::AgentError;
use crate::event::parse_event_line;

/// Assistant backend that delegates to the Claude Code CLI
/// (`claude -p --output-format stream-json`).
///
/// Claude Code runs its own tools (Bash, Read, Write, ...) and reports each
/// step as a JSON line on stdout, which is decoded into `ResponseEvent`s as
/// it arrives.
pub struct ClaudeCliBackend {
    command: String,
    /// Passed to the child as `ANTHROPIC_API_KEY`; the bot's own environment
    /// is left untouched.
    api_key: Option<String>,
    working_dir: Option<PathBuf>,
}

impl ClaudeCliBackend {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            api_key: None,
            working_dir: None,
        }
    }

    pub fn from_config(config: &ClaudeCodeConfig) -> Self {
        Self::new(config.command.clone())
            .with_api_key(config.api_key.clone())
            .with_working_dir(config.working_dir.clone())
    }

    pub fn with_api_key(mut self, key: Option<String>) -> Self {
        self.api_key = key.filter(|k| !k.trim().is_empty());
        self
    }

    pub fn with_working_dir(mut self, dir: Option<String>) -> Self {
        self.working_dir = dir.map(PathBuf::from);
        self
    }

    /// Assemble the CLI invocation for one query. The prompt goes to stdin.
    fn build_command(&self, options: &QueryOptions) -> Command {
        let mut cmd = Command::new(&self.command);
        cmd.arg("-p")
            .arg("--output-format")
            .arg("stream-json")
            .arg("--verbose");

        if !options.system_prompt.is_empty() {
            cmd.arg("--system-prompt").arg(&options.system_prompt);
        }

        if options.allowed_tools.contains("*") {
            // Wildcard = skip all permission checks.
            cmd.arg("--dangerously-skip-permissions");
        } else {
            for tool in &options.allowed_tools {
                cmd.arg("--allowedTools").arg(tool);
            }
        }

        if let Some(turns) = options.max_turns {
            cmd.arg("--max-turns").arg(turns.to_string());
        }
        if let Some(ref model) = options.model {
            cmd.arg("--model").arg(model);
        }
        if let Some(ref key) = self.api_key {
            cmd.env("ANTHROPIC_API_KEY", key);
        }
        if let Some(ref dir) = self.working_dir {
            cmd.current_dir(dir);
        }

        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

impl AssistantBackend for ClaudeCliBackend {
    fn name(&self) -> &str {
        "claude-cli"
    }

    fn query(&self, prompt: String, options: Arc<QueryOptions>) -> EventStream {
        let mut cmd = self.build_command(&options);
        let command = self.command.clone();

        Box::pin(async_stream::stream! {
            debug!(prompt_len = prompt.len(), "spawning claude CLI");

            let mut child = match cmd.spawn() {
                Ok(child) => child,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    yield Err(AgentError::NotFound(command));
                    return;
                }
                Err(e) => {
                    yield Err(AgentError::Spawn(e));
                    return;
                }
            };

            // Write prompt to stdin, then close it.
            if let Some(mut stdin) = child.stdin.take() {
                if let Err(e) = stdin.write_all(prompt.as_bytes()).await {
                    yield Err(AgentError::Io(e));
                }
                drop(stdin);
            }

            // Drain stderr concurrently so a chatty CLI never blocks on a full pipe.
            let stderr_task = child.stderr.take().map(|stderr| {
                tokio::spawn(async move {
                    let mut buf = String::new();
                    let _ = BufReader::new(stderr).read_to_string(&mut buf).await;
                    buf
                })
            });

            if let Some(stdout) = child.stdout.take() {
                let mut lines = BufReader::new(stdout).lines();
                loop {
                    match lines.next_line().await {
                        Ok(Some(line)) => match parse_event_line(&line) {
                            Ok(Some(event)) => yield Ok(event),
                            Ok(None) => {}
                            Err(e) => yield Err(e),
                        },
                        Ok(None) => break,
                        Err(e) => {
                            yield Err(AgentError::Io(e));
                            break;
                        }
                    }
                }
            }

            let stderr = match stderr_task {
                Some(task) => task.await.unwrap_or_default(),
                None => String::new(),
            };

            match child.wait().await {
                Ok(status) if status.success() => {
                    debug!("claude CLI finished");
                }
                Ok(status) => {
                    yield Err(AgentError::Exit {
                        status,
                        stderr: stderr.trim().to_string(),
                    });
                }
                Err(e) => yield Err(AgentError::Io(e)),
            }
        })
    }
}
