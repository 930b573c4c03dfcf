//! Artifact State Machine
//!
//! Materializes a group on disk and removes it again.
//!
//! # Layout
//!
//! | Artifact          | Path |
//! |-------------------|------|
//! | Grouping unit     | `<unit_dir>/<group>.target` |
//! | Override directory| `<unit_dir>/<service>.d` |
//! | Override fragment | `<unit_dir>/<service>.d/override.conf` |
//!
//! Every member also contributes one `Wants=<service>` line appended to the
//! grouping unit.
//!
//! # Transitions
//!
//! ```text
//! ABSENT  --apply (exists? needs force)--> PRESENT
//! PRESENT --undo (unconditional)---------> ABSENT
//! ```
//!
//! Under dry-run both transitions stop at the preview stage. The existence
//! checks still run, so a dry-run fails exactly where the real run would.
//!
//! # Partial Failure
//!
//! Writes are not transactional. A failure in the middle of the member loop
//! leaves earlier artifacts in place; rerunning with `--undo` cleans them up.

use crate::error::{GroupError, Result};
use crate::logic::membership::MemberSet;
use crate::types::RunModifiers;
use serde::Serialize;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use strum::Display;
use tracing::{info, warn};

/// Default service manager configuration directory
pub const DEFAULT_UNIT_DIR: &str = "/etc/systemd/system";

/// File name of the per-service override fragment
pub const OVERRIDE_FILE_NAME: &str = "override.conf";

/// Name and source filter of the group being materialized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupTarget {
    pub name: String,
    pub repo_filter: String,
}

/// Where artifacts live on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactLayout {
    unit_dir: PathBuf,
}

impl Default for ArtifactLayout {
    fn default() -> Self {
        Self::new(DEFAULT_UNIT_DIR)
    }
}

impl ArtifactLayout {
    pub fn new(unit_dir: impl Into<PathBuf>) -> Self {
        Self {
            unit_dir: unit_dir.into(),
        }
    }

    pub fn unit_dir(&self) -> &Path {
        &self.unit_dir
    }

    pub fn target_path(&self, group: &str) -> PathBuf {
        self.unit_dir.join(format!("{}.target", group))
    }

    pub fn override_dir(&self, service: &str) -> PathBuf {
        self.unit_dir.join(format!("{}.d", service))
    }

    pub fn fragment_path(&self, service: &str) -> PathBuf {
        self.override_dir(service).join(OVERRIDE_FILE_NAME)
    }
}

/// Grouping unit body, without dependency lines.
pub fn target_unit_content(target: &GroupTarget) -> String {
    format!(
        "[Unit]\n\
         Description=Custom Target {} of Services From RPM Repository {}\n\
         After=multi-user.target network.target\n\
         Conflicts=emergency.target rescue.target\n\
         AllowIsolate=no",
        target.name, target.repo_filter
    )
}

/// Override fragment tying a member's lifecycle to the group.
pub fn override_fragment_content(group: &str) -> String {
    format!(
        "[Unit]\n\
         StopWhenUnneeded=yes\n\
         PartOf={group}.target\n\
         \n\
         [Install]\n\
         WantedBy={group}.target"
    )
}

/// Line appended to the grouping unit for one member.
pub fn dependency_line(service: &str) -> String {
    format!("\nWants={}", service)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "lowercase")]
pub enum ArtifactKind {
    #[strum(serialize = "systemd target file")]
    GroupingUnit,
    #[strum(serialize = "override directory")]
    OverrideDir,
    #[strum(serialize = "override file")]
    OverrideFragment,
    #[strum(serialize = "target dependency")]
    Dependency,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ArtifactAction {
    Create,
    Overwrite,
    Append,
    Remove,
    /// Override directory still holds other drop-ins, left in place
    KeptNonEmpty,
    /// Already in the desired state
    Skip,
}

/// One step taken (or, under dry-run, planned) on one artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactOutcome {
    pub kind: ArtifactKind,
    pub path: PathBuf,
    pub action: ArtifactAction,
    /// True when the step was only previewed
    pub planned: bool,
}

/// Drives one apply or undo pass and records each step.
struct Transition {
    modifiers: RunModifiers,
    outcomes: Vec<ArtifactOutcome>,
}

impl Transition {
    fn new(modifiers: RunModifiers) -> Self {
        Self {
            modifiers,
            outcomes: Vec::new(),
        }
    }

    fn record(&mut self, kind: ArtifactKind, path: &Path, action: ArtifactAction) {
        self.outcomes.push(ArtifactOutcome {
            kind,
            path: path.to_path_buf(),
            action,
            planned: self.modifiers.dry_run,
        });
    }

    fn verb(&self, doing: &'static str, would: &'static str) -> &'static str {
        if self.modifiers.dry_run { would } else { doing }
    }

    /// Exists/force gate shared by the grouping unit and every fragment.
    fn create_or_overwrite(&self, path: &Path) -> Result<ArtifactAction> {
        if !path.exists() {
            return Ok(ArtifactAction::Create);
        }
        if path.is_dir() {
            return Err(wrong_file_type(path, ErrorKind::IsADirectory));
        }
        if !self.modifiers.force {
            return Err(GroupError::AlreadyExists(path.to_path_buf()));
        }
        warn!("overwriting file '{}'", path.display());
        Ok(ArtifactAction::Overwrite)
    }

    fn show(&self, path: &Path, content: &str) {
        if self.modifiers.verbose {
            info!("    # {}", path.display());
            for line in content.lines() {
                info!("    {}", line);
            }
        }
    }

    fn write_file(&mut self, kind: ArtifactKind, path: &Path, content: &str) -> Result<()> {
        let action = self.create_or_overwrite(path)?;
        info!("{} {}", self.verb("creating", "would create"), kind);
        self.show(path, content);

        if !self.modifiers.dry_run {
            fs::write(path, content).map_err(|e| GroupError::io(path, e))?;
        }
        self.record(kind, path, action);
        Ok(())
    }

    fn ensure_dir(&mut self, service: &str, dir: &Path) -> Result<()> {
        if dir.is_dir() {
            self.record(ArtifactKind::OverrideDir, dir, ArtifactAction::Skip);
            return Ok(());
        }
        if dir.exists() {
            return Err(wrong_file_type(dir, ErrorKind::AlreadyExists));
        }
        info!(
            "{} override directory for systemd service {}",
            self.verb("creating", "would create"),
            service
        );
        self.show(dir, "");

        if !self.modifiers.dry_run {
            fs::create_dir(dir).map_err(|e| GroupError::io(dir, e))?;
        }
        self.record(ArtifactKind::OverrideDir, dir, ArtifactAction::Create);
        Ok(())
    }

    fn append_dependency(&mut self, target_path: &Path, service: &str) -> Result<()> {
        let line = dependency_line(service);
        info!(
            "{} service to target file",
            self.verb("appending", "would append")
        );
        self.show(target_path, &line);

        if !self.modifiers.dry_run {
            let mut file = fs::OpenOptions::new()
                .append(true)
                .create(true)
                .open(target_path)
                .map_err(|e| GroupError::io(target_path, e))?;
            file.write_all(line.as_bytes())
                .map_err(|e| GroupError::io(target_path, e))?;
        }
        self.record(ArtifactKind::Dependency, target_path, ArtifactAction::Append);
        Ok(())
    }

    fn remove_file(&mut self, kind: ArtifactKind, path: &Path) -> Result<()> {
        if !path.exists() {
            return Ok(());
        }
        if path.is_dir() {
            return Err(wrong_file_type(path, ErrorKind::IsADirectory));
        }
        warn!(
            "{} {} '{}'",
            self.verb("removing", "would remove"),
            kind,
            path.display()
        );
        if !self.modifiers.dry_run {
            fs::remove_file(path).map_err(|e| GroupError::io(path, e))?;
        }
        self.record(kind, path, ArtifactAction::Remove);
        Ok(())
    }

    fn remove_dir(&mut self, dir: &Path, fragment: &Path) -> Result<()> {
        if !dir.exists() {
            return Ok(());
        }

        // Under dry-run the fragment is still on disk; it does not count.
        if has_entries_besides(dir, fragment).map_err(|e| GroupError::io(dir, e))? {
            warn!(
                "override directory '{}' contains other files, leaving it in place",
                dir.display()
            );
            self.record(ArtifactKind::OverrideDir, dir, ArtifactAction::KeptNonEmpty);
            return Ok(());
        }

        warn!(
            "{} override directory '{}'",
            self.verb("removing", "would remove"),
            dir.display()
        );
        if !self.modifiers.dry_run {
            fs::remove_dir(dir).map_err(|e| GroupError::io(dir, e))?;
        }
        self.record(ArtifactKind::OverrideDir, dir, ArtifactAction::Remove);
        Ok(())
    }
}

/// Something other than the expected artifact type occupies `path`. Checked
/// up front so dry-run fails where the real write or remove would.
fn wrong_file_type(path: &Path, kind: ErrorKind) -> GroupError {
    GroupError::io(path, std::io::Error::from(kind))
}

fn has_entries_besides(dir: &Path, ignored: &Path) -> std::io::Result<bool> {
    for entry in fs::read_dir(dir)? {
        if entry?.path() != ignored {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Create the grouping unit and every member's override artifacts.
///
/// # Errors
///
/// - `AlreadyExists` if the grouping unit or a fragment exists without `force`.
///   The grouping unit is checked before any member artifact is touched.
/// - `PermissionDenied` / `Io` on the first failed write. Earlier writes are
///   not rolled back.
pub fn apply(
    layout: &ArtifactLayout,
    target: &GroupTarget,
    members: &MemberSet,
    modifiers: RunModifiers,
) -> Result<Vec<ArtifactOutcome>> {
    let mut transition = Transition::new(modifiers);
    let target_path = layout.target_path(&target.name);

    transition.write_file(
        ArtifactKind::GroupingUnit,
        &target_path,
        &target_unit_content(target),
    )?;

    let fragment = override_fragment_content(&target.name);
    for member in members.iter() {
        let service = member.service_name.as_str();
        transition.ensure_dir(service, &layout.override_dir(service))?;
        transition.write_file(
            ArtifactKind::OverrideFragment,
            &layout.fragment_path(service),
            &fragment,
        )?;
        transition.append_dependency(&target_path, service)?;
    }

    Ok(transition.outcomes)
}

/// Remove every member's override artifacts, then the grouping unit.
///
/// Removal is unconditional on existence; `force` is not consulted. The
/// grouping unit is deleted as a whole, including any lines added to it by
/// hand after it was created.
pub fn undo(
    layout: &ArtifactLayout,
    target: &GroupTarget,
    members: &MemberSet,
    modifiers: RunModifiers,
) -> Result<Vec<ArtifactOutcome>> {
    let mut transition = Transition::new(modifiers);

    for member in members.iter() {
        let service = member.service_name.as_str();
        let fragment = layout.fragment_path(service);
        transition.remove_file(ArtifactKind::OverrideFragment, &fragment)?;
        transition.remove_dir(&layout.override_dir(service), &fragment)?;
    }

    transition.remove_file(ArtifactKind::GroupingUnit, &layout.target_path(&target.name))?;

    Ok(transition.outcomes)
}
