//! RPM database queries.
//!
//! # Field to Flag Mapping
//!
//! | Struct                | Command line |
//! |-----------------------|--------------|
//! | `OwningPackageQuery`  | `rpm -qf <unit> --queryformat %{NAME}\n` |
//! | `YumdbOriginQuery`    | `yumdb get from_repo <package>` |
//! | `DnfOriginQuery`      | `dnf -q repoquery --installed --queryformat %{from_repo} <package>` |

use crate::error::{GroupError, Result};
use crate::query_traits::QueryCommand;
use crate::types::{OriginRepo, PackageOwner};
use std::path::PathBuf;
use strum::Display;

/// `rpm -qf` exit status meaning "file is not owned by any package".
pub const RPM_NOT_OWNED_EXIT: i32 = 1;

// ============================================================================
// Package ownership
// ============================================================================

/// Which package owns a unit file.
#[derive(Debug, Clone)]
pub struct OwningPackageQuery {
    pub unit_path: PathBuf,
}

impl QueryCommand for OwningPackageQuery {
    fn program(&self) -> &'static str {
        "rpm"
    }

    fn to_cli_args(&self) -> Vec<String> {
        vec![
            "-qf".to_string(),
            self.unit_path.display().to_string(),
            "--queryformat".to_string(),
            "%{NAME}\n".to_string(),
        ]
    }
}

/// Interpret `rpm -qf` output. Exit 1 is the "not owned" sentinel; any other
/// non-zero exit is a query failure.
pub fn parse_owning_package(
    unit_path: &std::path::Path,
    exit_code: Option<i32>,
    stdout: &str,
    diagnostic: &str,
) -> Result<PackageOwner> {
    match exit_code {
        Some(0) => {
            let name = stdout.lines().map(str::trim).find(|l| !l.is_empty());
            Ok(name
                .map(|n| PackageOwner::Package(n.to_string()))
                .unwrap_or(PackageOwner::None))
        }
        Some(RPM_NOT_OWNED_EXIT) => Ok(PackageOwner::None),
        code => Err(GroupError::OwnershipQuery {
            unit: unit_path.to_path_buf(),
            code,
            diagnostic: diagnostic.to_string(),
        }),
    }
}

// ============================================================================
// Origin repository
// ============================================================================

/// Origin repository query for EL7 hosts.
#[derive(Debug, Clone)]
pub struct YumdbOriginQuery {
    pub package: String,
}

impl QueryCommand for YumdbOriginQuery {
    fn program(&self) -> &'static str {
        "yumdb"
    }

    fn to_cli_args(&self) -> Vec<String> {
        vec![
            "get".to_string(),
            "from_repo".to_string(),
            self.package.clone(),
        ]
    }
}

/// Origin repository query for EL8 hosts.
#[derive(Debug, Clone)]
pub struct DnfOriginQuery {
    pub package: String,
}

impl QueryCommand for DnfOriginQuery {
    fn program(&self) -> &'static str {
        "dnf"
    }

    fn to_cli_args(&self) -> Vec<String> {
        vec![
            "-q".to_string(),
            "repoquery".to_string(),
            "--installed".to_string(),
            "--queryformat".to_string(),
            "%{from_repo}\n".to_string(),
            self.package.clone(),
        ]
    }
}

/// Query dialect used to find a package's origin repository.
///
/// Selected once per run from the OS major version. Adding support for a new
/// release means adding a variant here; call sites go through
/// `SystemQuery::resolve_origin_repo` and never branch on versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum RepoDialect {
    /// EL7: `yumdb get from_repo`
    Yumdb,
    /// EL8: `dnf repoquery --installed`
    Dnf,
}

impl RepoDialect {
    /// Pick the dialect from an os-release `VERSION_ID`.
    ///
    /// Accepts an exact major (`"8"`) or `major.minor` with a numeric minor
    /// (`"8.10"`). Anything else is unsupported.
    pub fn from_os_version(version: &str) -> Result<Self> {
        let version = version.trim();
        let (major, minor) = match version.split_once('.') {
            Some((major, minor)) => (major, Some(minor)),
            None => (version, None),
        };

        let minor_ok = minor
            .map(|m| !m.is_empty() && m.chars().all(|c| c.is_ascii_digit()))
            .unwrap_or(true);

        match (major, minor_ok) {
            ("7", true) => Ok(Self::Yumdb),
            ("8", true) => Ok(Self::Dnf),
            _ => Err(GroupError::UnsupportedOsVersion(version.to_string())),
        }
    }

    /// Interpret successful query output for this dialect.
    pub fn parse_origin(self, stdout: &str) -> OriginRepo {
        match self {
            // "     from_repo = base" lines; the last assignment wins
            Self::Yumdb => stdout
                .lines()
                .filter(|line| line.contains('='))
                .last()
                .and_then(|line| line.split_whitespace().last())
                .filter(|value| *value != "=")
                .map(OriginRepo::from_query_output)
                .unwrap_or(OriginRepo::Unknown),
            // One line per installed version; the newest is listed last
            Self::Dnf => stdout
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .last()
                .map(OriginRepo::from_query_output)
                .unwrap_or(OriginRepo::Unknown),
        }
    }
}
