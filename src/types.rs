//! Core value types shared by the inventory, membership and artifact stages.
//!
//! Sentinel values (`none`, `unknown`) are modeled as enum variants rather
//! than magic strings so they can never accidentally satisfy a repository
//! filter.

use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use strum::Display;

/// Owning package of a service unit file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "String")]
pub enum PackageOwner {
    /// Unit file belongs to this package
    Package(String),
    /// Unit file is not owned by any package
    None,
}

impl PackageOwner {
    /// Package name, if the unit is owned
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Package(name) => Some(name),
            Self::None => None,
        }
    }
}

impl fmt::Display for PackageOwner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Package(name) => f.write_str(name),
            Self::None => f.write_str("none"),
        }
    }
}

impl From<PackageOwner> for String {
    fn from(owner: PackageOwner) -> Self {
        owner.to_string()
    }
}

/// Repository a package was installed from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "String")]
pub enum OriginRepo {
    /// Named repository
    Repo(String),
    /// No lookup was made because the unit has no owning package
    None,
    /// The package database has no origin recorded for the package
    Unknown,
}

impl OriginRepo {
    /// Build from raw query output; blank output means no origin is recorded.
    pub fn from_query_output(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            Self::Unknown
        } else {
            Self::Repo(trimmed.to_string())
        }
    }

    /// Exact match against a repository filter. Sentinels never match.
    pub fn matches(&self, filter: &str) -> bool {
        matches!(self, Self::Repo(name) if name == filter)
    }
}

impl fmt::Display for OriginRepo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Repo(name) => f.write_str(name),
            Self::None => f.write_str("none"),
            Self::Unknown => f.write_str("unknown"),
        }
    }
}

impl From<OriginRepo> for String {
    fn from(repo: OriginRepo) -> Self {
        repo.to_string()
    }
}

/// One discovered service unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceRecord {
    /// Absolute path of the unit definition
    pub unit_path: PathBuf,
    /// Final path segment of `unit_path`, e.g. `httpd.service`
    pub service_name: String,
    pub package: PackageOwner,
    pub origin_repo: OriginRepo,
}

impl ServiceRecord {
    pub fn new(unit_path: impl Into<PathBuf>, package: PackageOwner, origin_repo: OriginRepo) -> Self {
        let unit_path = unit_path.into();
        let service_name = service_name_of(&unit_path);
        Self {
            unit_path,
            service_name,
            package,
            origin_repo,
        }
    }
}

/// Derive the short service name from a unit path.
pub fn service_name_of(unit_path: &Path) -> String {
    unit_path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Which transition the run performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[derive(Display)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    #[default]
    Apply,
    Undo,
}

/// Modifiers applied to a single run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct RunModifiers {
    /// Preview only; never touch the filesystem or the service manager
    pub dry_run: bool,
    /// Overwrite existing artifacts on apply
    pub force: bool,
    /// Log artifact contents as they are written
    pub verbose: bool,
    pub undo: bool,
}

impl RunModifiers {
    pub fn mode(&self) -> RunMode {
        if self.undo { RunMode::Undo } else { RunMode::Apply }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_name_from_path() {
        let record = ServiceRecord::new(
            "/usr/lib/systemd/system/httpd.service",
            PackageOwner::Package("httpd".to_string()),
            OriginRepo::Repo("appstream".to_string()),
        );
        assert_eq!(record.service_name, "httpd.service");
    }

    #[test]
    fn test_sentinels_never_match_filter() {
        assert!(!OriginRepo::None.matches("none"));
        assert!(!OriginRepo::Unknown.matches("unknown"));
        assert!(OriginRepo::Repo("base".to_string()).matches("base"));
        assert!(!OriginRepo::Repo("base".to_string()).matches("Base"));
    }

    #[test]
    fn test_origin_from_blank_output_is_unknown() {
        assert_eq!(OriginRepo::from_query_output("  \n"), OriginRepo::Unknown);
        assert_eq!(
            OriginRepo::from_query_output("epel\n"),
            OriginRepo::Repo("epel".to_string())
        );
    }

    #[test]
    fn test_sentinel_display() {
        assert_eq!(PackageOwner::None.to_string(), "none");
        assert_eq!(OriginRepo::None.to_string(), "none");
        assert_eq!(OriginRepo::Unknown.to_string(), "unknown");
    }

    #[test]
    fn test_run_mode_from_modifiers() {
        let modifiers = RunModifiers {
            undo: true,
            ..Default::default()
        };
        assert_eq!(modifiers.mode(), RunMode::Undo);
        assert_eq!(RunModifiers::default().mode(), RunMode::Apply);
        assert_eq!(RunMode::Undo.to_string(), "undo");
    }
}
