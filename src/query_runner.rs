//! Query execution gatekeeper
//!
//! `run_query` is the only place that spawns external processes. It keeps the
//! child in its own process group and tracks its PID so an interrupted run
//! never leaves orphaned package-database queries behind.

use crate::process_guard::{ChildRegistry, CommandProcessGroup};
use crate::query_traits::QueryCommand;
use std::process::{Command, Stdio};
use tracing::debug;

/// Captured output of one query command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    /// Exit code (None if terminated by signal)
    pub exit_code: Option<i32>,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Trimmed stderr, falling back to stdout when stderr is empty.
    pub fn diagnostic(&self) -> String {
        let stderr = self.stderr.trim();
        if stderr.is_empty() {
            self.stdout.trim().to_string()
        } else {
            stderr.to_string()
        }
    }
}

/// Run a query command to completion and capture its output.
///
/// A non-zero exit is not an error here; callers interpret exit codes because
/// some tools (`rpm -qf`) use them to signal ordinary outcomes. `Err` is
/// returned only when the process could not be spawned or waited on.
pub fn run_query<T: QueryCommand>(query: &T) -> std::io::Result<CommandOutput> {
    debug!(command = %query.command_line(), "running query");

    let child = Command::new(query.program())
        .args(query.to_cli_args())
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .in_new_process_group()
        .spawn()?;
    let pid = child.id();

    if let Ok(mut registry) = ChildRegistry::global().lock() {
        registry.register(pid);
    }

    let output = child.wait_with_output();

    if let Ok(mut registry) = ChildRegistry::global().lock() {
        registry.unregister(pid);
    }

    let output = output?;
    Ok(CommandOutput {
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        exit_code: output.status.code(),
    })
}
