//! Grouping policy file handling.
//!
//! The policy is a YAML document with two optional lists:
//!
//! ```yaml
//! inclusions:
//!   - chronyd.service
//! exclusions:
//!   - httpd.service
//! ```
//!
//! Both lists are ordered sets: order is preserved and repeated names are
//! dropped after their first occurrence.

use crate::error::{GroupError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Default policy file, relative to the working directory
pub const DEFAULT_POLICY_FILE: &str = "config.yml";

/// Explicit membership overrides loaded from the policy file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupingPolicy {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub inclusions: Vec<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub exclusions: Vec<String>,
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

impl GroupingPolicy {
    /// Parse policy YAML. An empty document is an empty policy.
    pub fn from_yaml(content: &str) -> std::result::Result<Self, serde_yaml::Error> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let policy: Self = serde_yaml::from_str(content)?;
        Ok(policy.deduplicated())
    }

    /// Load the policy file, logging every entry when `verbose` is set.
    pub fn load_from_file(path: &Path, verbose: bool) -> Result<Self> {
        info!("loading exclusions and inclusions from config file '{}'", path.display());

        let content = std::fs::read_to_string(path).map_err(|e| GroupError::PolicyLoad {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let policy = Self::from_yaml(&content).map_err(|e| GroupError::PolicyLoad {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        if verbose {
            for name in &policy.inclusions {
                info!("loaded inclusion of '{}' will attempt to include later", name);
            }
            for name in &policy.exclusions {
                info!("loaded exclusion of '{}' will attempt to remove later", name);
            }
        }

        Ok(policy)
    }

    fn deduplicated(self) -> Self {
        Self {
            inclusions: ordered_set(self.inclusions),
            exclusions: ordered_set(self.exclusions),
        }
    }
}

fn ordered_set(names: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    names
        .into_iter()
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty() && seen.insert(name.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_full_policy() {
        let policy = GroupingPolicy::from_yaml(
            "inclusions:\n  - chronyd.service\n  - sshd.service\nexclusions:\n  - httpd.service\n",
        )
        .unwrap();
        assert_eq!(policy.inclusions, vec!["chronyd.service", "sshd.service"]);
        assert_eq!(policy.exclusions, vec!["httpd.service"]);
    }

    #[test]
    fn test_missing_and_null_lists_are_empty() {
        let policy = GroupingPolicy::from_yaml("inclusions:\n").unwrap();
        assert!(policy.inclusions.is_empty());
        assert!(policy.exclusions.is_empty());

        let policy = GroupingPolicy::from_yaml("").unwrap();
        assert_eq!(policy, GroupingPolicy::default());
    }

    #[test]
    fn test_duplicates_keep_first_occurrence() {
        let policy =
            GroupingPolicy::from_yaml("inclusions: [b.service, a.service, b.service]\n").unwrap();
        assert_eq!(policy.inclusions, vec!["b.service", "a.service"]);
    }

    #[test]
    fn test_malformed_yaml_is_policy_error() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"inclusions: [unterminated\n").unwrap();
        let err = GroupingPolicy::load_from_file(file.path(), false).unwrap_err();
        assert!(matches!(err, GroupError::PolicyLoad { .. }));
        assert!(err.remedy().unwrap().contains("yamllint"));
    }

    #[test]
    fn test_wrong_shape_is_policy_error() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"inclusions: 42\n").unwrap();
        assert!(GroupingPolicy::load_from_file(file.path(), true).is_err());
    }

    #[test]
    fn test_missing_file_is_policy_error() {
        let err =
            GroupingPolicy::load_from_file(Path::new("/nonexistent/config.yml"), false).unwrap_err();
        assert!(matches!(err, GroupError::PolicyLoad { .. }));
    }
}
