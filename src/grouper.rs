//! Run orchestration
//!
//! Wires one invocation together:
//!
//! ```text
//! build_inventory → resolve_membership → apply | undo → reload
//! ```
//!
//! Each stage consumes the complete output of the previous one. The first
//! fatal error stops the pipeline; nothing after it runs.

use crate::engine::artifacts::{self, ArtifactLayout, ArtifactOutcome, GroupTarget};
use crate::error::{GroupError, Result};
use crate::logic::inventory::{build_inventory, Progress};
use crate::logic::membership::{resolve_membership, MembershipNotice, MembershipRequest};
use crate::policy::GroupingPolicy;
use crate::queries::systemctl::DaemonReload;
use crate::query_traits::QueryCommand;
use crate::system::SystemQuery;
use crate::types::{RunMode, RunModifiers};
use serde::Serialize;
use tracing::info;

/// Everything one run needs besides the host.
#[derive(Debug, Clone)]
pub struct GroupRequest {
    pub target: String,
    pub repo_filter: String,
    pub policy: GroupingPolicy,
    /// os-release `VERSION_ID`
    pub os_version: String,
    pub modifiers: RunModifiers,
}

/// What happened to the service manager reload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReloadStatus {
    Executed,
    /// Dry-run: only reported
    Planned,
}

/// Summary of a completed run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub mode: RunMode,
    pub dry_run: bool,
    pub target: String,
    pub repo_filter: String,
    pub services_scanned: usize,
    pub members: Vec<String>,
    pub notices: Vec<MembershipNotice>,
    pub artifacts: Vec<ArtifactOutcome>,
    pub reload: ReloadStatus,
}

/// Reject group names that would escape the unit directory or produce an
/// invalid unit name.
pub fn validate_group_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(GroupError::invalid_argument("target name must not be empty"));
    }
    if name.ends_with(".target") {
        return Err(GroupError::invalid_argument(format!(
            "target name '{}' must not include the .target suffix",
            name
        )));
    }
    if name.contains('/') || name.chars().any(char::is_whitespace) || name == "." || name == ".." {
        return Err(GroupError::invalid_argument(format!(
            "target name '{}' may not contain '/' or whitespace",
            name
        )));
    }
    Ok(())
}

/// Execute one full run against `query`, writing artifacts under `layout`.
pub fn run<Q, F>(
    query: &Q,
    layout: &ArtifactLayout,
    request: &GroupRequest,
    on_progress: F,
) -> Result<RunReport>
where
    Q: SystemQuery + ?Sized,
    F: FnMut(Progress),
{
    validate_group_name(&request.target)?;
    let modifiers = request.modifiers;

    let inventory = build_inventory(query, &request.os_version, modifiers.verbose, on_progress)?;

    let resolution = resolve_membership(
        &inventory,
        &MembershipRequest {
            repo_filter: request.repo_filter.clone(),
            inclusions: request.policy.inclusions.clone(),
            exclusions: request.policy.exclusions.clone(),
        },
    )?;
    info!(
        "{} systemd service(s) selected for target '{}'",
        resolution.members.len(),
        request.target
    );

    let target = GroupTarget {
        name: request.target.clone(),
        repo_filter: request.repo_filter.clone(),
    };
    let outcomes = match modifiers.mode() {
        RunMode::Apply => artifacts::apply(layout, &target, &resolution.members, modifiers)?,
        RunMode::Undo => artifacts::undo(layout, &target, &resolution.members, modifiers)?,
    };

    let reload_status = reload(query, modifiers.dry_run)?;

    Ok(RunReport {
        mode: modifiers.mode(),
        dry_run: modifiers.dry_run,
        target: request.target.clone(),
        repo_filter: request.repo_filter.clone(),
        services_scanned: inventory.len(),
        members: resolution
            .members
            .names()
            .into_iter()
            .map(str::to_string)
            .collect(),
        notices: resolution.notices,
        artifacts: outcomes,
        reload: reload_status,
    })
}

/// Reload the service manager, or only report it under dry-run.
pub fn reload<Q: SystemQuery + ?Sized>(query: &Q, dry_run: bool) -> Result<ReloadStatus> {
    let command = DaemonReload.command_line();
    if dry_run {
        info!("would run command '{}' for systemd file changes to take effect", command);
        return Ok(ReloadStatus::Planned);
    }
    info!("running command '{}' for systemd file changes to take effect", command);
    query.signal_reload()?;
    Ok(ReloadStatus::Executed)
}

/// Operator instructions printed after a successful apply.
pub fn control_commands(target: &str) -> String {
    format!(
        "# check the status of all services controlled by the target\n\
         systemctl list-dependencies {t}.target\n\
         \n\
         # stop all services controlled by the target\n\
         sudo systemctl stop {t}.target\n\
         \n\
         # start all services controlled by the target\n\
         sudo systemctl start {t}.target",
        t = target
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_group_name() {
        assert!(validate_group_name("web-stack").is_ok());
        assert!(validate_group_name("").is_err());
        assert!(validate_group_name("../etc").is_err());
        assert!(validate_group_name("my group").is_err());
        assert!(validate_group_name("web.target").is_err());
        assert!(validate_group_name("..").is_err());
    }

    #[test]
    fn test_control_commands_reference_target() {
        let text = control_commands("web");
        assert!(text.contains("systemctl list-dependencies web.target"));
        assert!(text.contains("sudo systemctl stop web.target"));
        assert!(text.contains("sudo systemctl start web.target"));
    }
}
