//! Host collaborators behind the `SystemQuery` seam.
//!
//! The inventory builder and the run orchestrator only talk to the host
//! through this trait, so the whole engine can be driven by a synthetic
//! host in tests.

use crate::error::{GroupError, Result};
use crate::queries::rpm::{
    parse_owning_package, DnfOriginQuery, OwningPackageQuery, RepoDialect, YumdbOriginQuery,
};
use crate::queries::systemctl::DaemonReload;
use crate::query_runner::{run_query, CommandOutput};
use crate::query_traits::QueryCommand;
use crate::types::{OriginRepo, PackageOwner};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Directories searched for service unit files, in enumeration order
pub const UNIT_SEARCH_DIRS: [&str; 2] = ["/usr/lib/systemd/system", "/etc/systemd/system"];

/// External queries the engine depends on.
pub trait SystemQuery {
    /// All service unit files, symlinks excluded, in a stable order.
    fn list_service_unit_paths(&self) -> Result<Vec<PathBuf>>;

    /// Package owning `unit_path`, or `PackageOwner::None` if unowned.
    fn resolve_owning_package(&self, unit_path: &Path) -> Result<PackageOwner>;

    /// Repository `package` was installed from.
    fn resolve_origin_repo(&self, package: &str, dialect: RepoDialect) -> Result<OriginRepo>;

    /// Ask the service manager to reload its unit graph.
    fn signal_reload(&self) -> Result<()>;
}

/// The real host: walks unit directories and shells out to rpm tooling.
#[derive(Debug, Clone)]
pub struct HostSystem {
    search_dirs: Vec<PathBuf>,
}

impl Default for HostSystem {
    fn default() -> Self {
        Self::new(UNIT_SEARCH_DIRS.iter().map(PathBuf::from).collect())
    }
}

impl HostSystem {
    pub fn new(search_dirs: Vec<PathBuf>) -> Self {
        Self { search_dirs }
    }
}

impl SystemQuery for HostSystem {
    fn list_service_unit_paths(&self) -> Result<Vec<PathBuf>> {
        list_unit_files(&self.search_dirs)
    }

    fn resolve_owning_package(&self, unit_path: &Path) -> Result<PackageOwner> {
        let query = OwningPackageQuery {
            unit_path: unit_path.to_path_buf(),
        };
        let output = run_query(&query).map_err(|e| GroupError::OwnershipQuery {
            unit: unit_path.to_path_buf(),
            code: None,
            diagnostic: format!("failed to run '{}': {}", query.command_line(), e),
        })?;
        parse_owning_package(unit_path, output.exit_code, &output.stdout, &output.diagnostic())
    }

    fn resolve_origin_repo(&self, package: &str, dialect: RepoDialect) -> Result<OriginRepo> {
        let output = match dialect {
            RepoDialect::Yumdb => run_query(&YumdbOriginQuery {
                package: package.to_string(),
            }),
            RepoDialect::Dnf => run_query(&DnfOriginQuery {
                package: package.to_string(),
            }),
        }
        .map_err(|e| GroupError::RepoQuery {
            package: package.to_string(),
            code: None,
            diagnostic: format!("failed to run {} query: {}", dialect, e),
        })?;

        ensure_success(&output).map_err(|(code, diagnostic)| GroupError::RepoQuery {
            package: package.to_string(),
            code,
            diagnostic,
        })?;
        Ok(dialect.parse_origin(&output.stdout))
    }

    fn signal_reload(&self) -> Result<()> {
        let output = run_query(&DaemonReload).map_err(|e| GroupError::Reload {
            code: None,
            diagnostic: e.to_string(),
        })?;
        ensure_success(&output)
            .map_err(|(code, diagnostic)| GroupError::Reload { code, diagnostic })
    }
}

fn ensure_success(output: &CommandOutput) -> std::result::Result<(), (Option<i32>, String)> {
    if output.success() {
        Ok(())
    } else {
        Err((output.exit_code, output.diagnostic()))
    }
}

/// Recursively collect regular `*.service` files under each directory.
///
/// Symbolic links are skipped so a unit linked between directories is only
/// counted once. Entries are sorted by file name within each directory.
pub fn list_unit_files(search_dirs: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    let mut seen = HashSet::new();

    for dir in search_dirs {
        for entry in WalkDir::new(dir).follow_links(false).sort_by_file_name() {
            let entry = entry.map_err(|e| GroupError::Enumeration {
                code: None,
                diagnostic: e.to_string(),
            })?;

            let is_service = entry
                .file_name()
                .to_str()
                .is_some_and(|name| name.ends_with(".service"));

            if entry.file_type().is_file() && is_service && seen.insert(entry.path().to_path_buf()) {
                paths.push(entry.into_path());
            }
        }
    }

    Ok(paths)
}
