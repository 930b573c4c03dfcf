//! Service Inventory Builder
//!
//! Produces an immutable snapshot of every service unit on the host together
//! with its owning package and that package's origin repository.
//!
//! # Failure Policy
//!
//! Any failed enumeration or query aborts the build. A partial inventory is
//! never returned because membership computed from it would silently miss
//! services.

use crate::error::Result;
use crate::queries::rpm::RepoDialect;
use crate::system::SystemQuery;
use crate::types::{OriginRepo, PackageOwner, ServiceRecord};
use serde::Serialize;
use std::path::Path;
use tracing::{debug, info};

/// Processed/total counter reported after each unit file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub processed: usize,
    pub total: usize,
}

impl Progress {
    /// Completion percentage in `[0, 100]`. An empty run is complete.
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            100.0
        } else {
            100.0 * self.processed as f64 / self.total as f64
        }
    }
}

/// Immutable snapshot of the host's service units, in enumeration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Inventory {
    records: Vec<ServiceRecord>,
}

impl Inventory {
    pub fn new(records: Vec<ServiceRecord>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[ServiceRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// First record (in enumeration order) with this service name.
    pub fn find(&self, service_name: &str) -> Option<&ServiceRecord> {
        self.records.iter().find(|r| r.service_name == service_name)
    }

    pub fn contains(&self, service_name: &str) -> bool {
        self.find(service_name).is_some()
    }
}

/// Build the service inventory.
///
/// The repository query dialect is chosen from `os_version` before anything
/// is enumerated, so an unsupported host fails without running a single
/// query. `on_progress` is called once per unit file, in order.
pub fn build_inventory<Q, F>(
    query: &Q,
    os_version: &str,
    verbose: bool,
    mut on_progress: F,
) -> Result<Inventory>
where
    Q: SystemQuery + ?Sized,
    F: FnMut(Progress),
{
    let dialect = RepoDialect::from_os_version(os_version)?;
    debug!(%dialect, os_version, "selected repository query dialect");

    info!("getting all systemd service data, this can take a few minutes");
    let unit_paths = query.list_service_unit_paths()?;
    let total = unit_paths.len();

    if verbose {
        info!("found {} systemd service files", total);
    }

    let mut records = Vec::with_capacity(total);
    for (index, unit_path) in unit_paths.iter().enumerate() {
        records.push(resolve_record(query, dialect, unit_path)?);
        on_progress(Progress {
            processed: index + 1,
            total,
        });
    }

    Ok(Inventory::new(records))
}

fn resolve_record<Q: SystemQuery + ?Sized>(
    query: &Q,
    dialect: RepoDialect,
    unit_path: &Path,
) -> Result<ServiceRecord> {
    let package = query.resolve_owning_package(unit_path)?;

    // Unowned units cannot be traced to a repository; no lookup is made.
    let origin_repo = match &package {
        PackageOwner::Package(name) => query.resolve_origin_repo(name, dialect)?,
        PackageOwner::None => OriginRepo::None,
    };

    let record = ServiceRecord::new(unit_path, package, origin_repo);
    debug!(
        service = %record.service_name,
        package = %record.package,
        repo = %record.origin_repo,
        "resolved service"
    );
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GroupError;
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::path::PathBuf;

    /// In-memory host keyed by unit path.
    #[derive(Default)]
    struct FakeHost {
        units: Vec<(PathBuf, Option<&'static str>)>,
        repos: HashMap<&'static str, &'static str>,
        repo_lookups: RefCell<Vec<(String, RepoDialect)>>,
        fail_ownership_for: Option<PathBuf>,
        fail_origin_for: Option<&'static str>,
    }

    impl SystemQuery for FakeHost {
        fn list_service_unit_paths(&self) -> Result<Vec<PathBuf>> {
            Ok(self.units.iter().map(|(p, _)| p.clone()).collect())
        }

        fn resolve_owning_package(&self, unit_path: &Path) -> Result<PackageOwner> {
            if self.fail_ownership_for.as_deref() == Some(unit_path) {
                return Err(GroupError::OwnershipQuery {
                    unit: unit_path.to_path_buf(),
                    code: Some(2),
                    diagnostic: "rpmdb locked".to_string(),
                });
            }
            let owner = self
                .units
                .iter()
                .find(|(p, _)| p == unit_path)
                .and_then(|(_, pkg)| *pkg);
            Ok(owner
                .map(|p| PackageOwner::Package(p.to_string()))
                .unwrap_or(PackageOwner::None))
        }

        fn resolve_origin_repo(&self, package: &str, dialect: RepoDialect) -> Result<OriginRepo> {
            self.repo_lookups
                .borrow_mut()
                .push((package.to_string(), dialect));
            if self.fail_origin_for == Some(package) {
                return Err(GroupError::RepoQuery {
                    package: package.to_string(),
                    code: Some(3),
                    diagnostic: "Error: rpmdb open failed".to_string(),
                });
            }
            Ok(self
                .repos
                .get(package)
                .map(|r| OriginRepo::Repo(r.to_string()))
                .unwrap_or(OriginRepo::Unknown))
        }

        fn signal_reload(&self) -> Result<()> {
            Ok(())
        }
    }

    fn host() -> FakeHost {
        FakeHost {
            units: vec![
                (PathBuf::from("/usr/lib/systemd/system/httpd.service"), Some("httpd")),
                (PathBuf::from("/etc/systemd/system/custom.service"), None),
                (PathBuf::from("/usr/lib/systemd/system/sshd.service"), Some("openssh-server")),
            ],
            repos: HashMap::from([("httpd", "appstream")]),
            ..Default::default()
        }
    }

    #[test]
    fn test_build_inventory_resolves_records_in_order() {
        let host = host();
        let inventory = build_inventory(&host, "8.4", false, |_| {}).unwrap();

        let names: Vec<&str> = inventory
            .records()
            .iter()
            .map(|r| r.service_name.as_str())
            .collect();
        assert_eq!(names, vec!["httpd.service", "custom.service", "sshd.service"]);

        let httpd = inventory.find("httpd.service").unwrap();
        assert_eq!(httpd.origin_repo, OriginRepo::Repo("appstream".to_string()));

        let custom = inventory.find("custom.service").unwrap();
        assert_eq!(custom.package, PackageOwner::None);
        assert_eq!(custom.origin_repo, OriginRepo::None);

        let sshd = inventory.find("sshd.service").unwrap();
        assert_eq!(sshd.origin_repo, OriginRepo::Unknown);
    }

    #[test]
    fn test_unowned_units_skip_repo_lookup() {
        let host = host();
        build_inventory(&host, "7", false, |_| {}).unwrap();

        let lookups = host.repo_lookups.borrow();
        assert_eq!(
            *lookups,
            vec![
                ("httpd".to_string(), RepoDialect::Yumdb),
                ("openssh-server".to_string(), RepoDialect::Yumdb),
            ]
        );
    }

    #[test]
    fn test_progress_is_monotonic() {
        let host = host();
        let mut seen = Vec::new();
        build_inventory(&host, "8", false, |p| seen.push(p)).unwrap();

        assert_eq!(seen.len(), 3);
        assert!(seen.windows(2).all(|w| w[0].processed < w[1].processed));
        assert_eq!(seen.last().unwrap().percent(), 100.0);
    }

    #[test]
    fn test_unsupported_version_fails_before_queries() {
        let host = host();
        let err = build_inventory(&host, "9.1", false, |_| {}).unwrap_err();
        assert!(matches!(err, GroupError::UnsupportedOsVersion(v) if v == "9.1"));
        assert!(host.repo_lookups.borrow().is_empty());
    }

    #[test]
    fn test_query_failure_aborts_build() {
        let mut host = host();
        host.fail_ownership_for = Some(PathBuf::from("/etc/systemd/system/custom.service"));
        let err = build_inventory(&host, "8", false, |_| {}).unwrap_err();
        assert!(matches!(err, GroupError::OwnershipQuery { code: Some(2), .. }));
    }

    #[test]
    fn test_repo_query_failure_aborts_build() {
        let mut host = host();
        host.fail_origin_for = Some("httpd");
        let mut progress = Vec::new();

        let err = build_inventory(&host, "8", false, |p| progress.push(p)).unwrap_err();

        match &err {
            GroupError::RepoQuery { package, code, .. } => {
                assert_eq!(package, "httpd");
                assert_eq!(*code, Some(3));
            }
            other => panic!("expected RepoQuery, got {:?}", other),
        }
        assert_eq!(err.exit_code(), 3);
        // First unit failed: nothing after it was queried
        assert!(progress.is_empty());
        assert_eq!(host.repo_lookups.borrow().len(), 1);
    }

    #[test]
    fn test_progress_percent_of_empty_run() {
        let progress = Progress {
            processed: 0,
            total: 0,
        };
        assert_eq!(progress.percent(), 100.0);
    }
}
