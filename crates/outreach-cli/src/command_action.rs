//! Subprocess-backed outreach action.
//!
//! The configured program is run once per attempt with the target URL and
//! the rendered message appended as its last two arguments. It answers on
//! stdout with a JSON object or a bare `success` / `fail`.

use std::process::Stdio;
use std::time::Duration;

use anyhow::{Context, bail};
use outreach_core::config::ActionConfig;
use outreach_core::ports::OutreachAction;
use outreach_core::{ActionError, RawActionResult};
use tokio::process::Command;
use tokio::runtime::Runtime;

const STDERR_EXCERPT: usize = 200;

pub struct CommandAction {
    program: String,
    args: Vec<String>,
    timeout: Duration,
    runtime: Runtime,
}

impl CommandAction {
    pub fn new(command: &[String], timeout: Duration) -> anyhow::Result<Self> {
        let Some((program, args)) = command.split_first() else {
            bail!("action command is empty");
        };
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("failed to start action runtime")?;
        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
            timeout,
            runtime,
        })
    }

    pub fn from_config(config: &ActionConfig) -> anyhow::Result<Self> {
        if config.command.is_empty() {
            bail!("no action configured: set `command` in the [action] section of the config");
        }
        Self::new(&config.command, Duration::from_secs(config.timeout_secs))
    }

    async fn run(&self, url: &str, payload: &str) -> Result<RawActionResult, ActionError> {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .arg(url)
            .arg(payload)
            .stdin(Stdio::null())
            .kill_on_drop(true);

        let output = match tokio::time::timeout(self.timeout, command.output()).await {
            Err(_) => {
                return Err(ActionError::Timeout(format!(
                    "{} did not answer within {}s",
                    self.program,
                    self.timeout.as_secs_f64()
                )));
            }
            Ok(Err(e)) => {
                return Err(ActionError::Transient(format!(
                    "failed to run {}: {e}",
                    self.program
                )));
            }
            Ok(Ok(output)) => output,
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        let parsed = RawActionResult::parse(&stdout).or_else(|e| {
            // Chatty programs: the answer is the last non-empty line.
            match stdout.lines().rev().find(|l| !l.trim().is_empty()) {
                Some(line) => RawActionResult::parse(line),
                None => Err(e),
            }
        });

        match parsed {
            Ok(result) => Ok(result),
            Err(e) if output.status.success() => Err(e),
            Err(_) => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                let stderr: String = stderr.trim().chars().take(STDERR_EXCERPT).collect();
                Err(ActionError::Transient(format!(
                    "{} exited with {}: {stderr}",
                    self.program, output.status
                )))
            }
        }
    }
}

impl OutreachAction for CommandAction {
    fn perform(&mut self, url: &str, payload: &str) -> Result<RawActionResult, ActionError> {
        self.runtime.block_on(self.run(url, payload))
    }
}
