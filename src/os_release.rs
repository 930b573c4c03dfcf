//! `/etc/os-release` detection.
//!
//! Only `VERSION_ID` matters to unitgroup: it selects the origin-repository
//! query dialect. The file format is `KEY=VALUE` with optional quoting.

use crate::error::{GroupError, Result};
use std::collections::HashMap;
use std::path::Path;

/// Default location of the os-release file
pub const OS_RELEASE_PATH: &str = "/etc/os-release";

/// Parsed os-release key/value pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OsRelease {
    fields: HashMap<String, String>,
}

impl OsRelease {
    /// Parse os-release content. Blank lines, comments and lines without `=`
    /// are skipped; one level of matching quotes is stripped from values.
    pub fn parse(content: &str) -> Self {
        let fields = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .filter_map(|line| line.split_once('='))
            .map(|(key, value)| (key.trim().to_string(), unquote(value.trim()).to_string()))
            .collect();
        Self { fields }
    }

    /// Read and parse an os-release file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| GroupError::os_release(format!("{}: {}", path.display(), e)))?;
        Ok(Self::parse(&content))
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    /// `VERSION_ID`, required for dialect selection.
    pub fn version_id(&self) -> Result<&str> {
        self.get("VERSION_ID")
            .filter(|v| !v.is_empty())
            .ok_or_else(|| GroupError::os_release("VERSION_ID is missing from os-release"))
    }
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(inner) = value
            .strip_prefix(quote)
            .and_then(|v| v.strip_suffix(quote))
        {
            return inner;
        }
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const RHEL8: &str = r#"NAME="Red Hat Enterprise Linux"
VERSION="8.4 (Ootpa)"
ID="rhel"

# comment
VERSION_ID="8.4"
PLATFORM_ID='platform:el8'
"#;

    #[test]
    fn test_parse_quoted_values() {
        let release = OsRelease::parse(RHEL8);
        assert_eq!(release.version_id().unwrap(), "8.4");
        assert_eq!(release.get("ID"), Some("rhel"));
        assert_eq!(release.get("PLATFORM_ID"), Some("platform:el8"));
        assert_eq!(release.get("VERSION"), Some("8.4 (Ootpa)"));
    }

    #[test]
    fn test_unquoted_value() {
        let release = OsRelease::parse("VERSION_ID=7\n");
        assert_eq!(release.version_id().unwrap(), "7");
    }

    #[test]
    fn test_missing_version_id() {
        let release = OsRelease::parse("NAME=Arch\nID=arch\n");
        assert!(matches!(release.version_id(), Err(GroupError::OsRelease(_))));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"VERSION_ID=\"7.9\"\n").unwrap();
        let release = OsRelease::load(file.path()).unwrap();
        assert_eq!(release.version_id().unwrap(), "7.9");
    }

    #[test]
    fn test_load_missing_file() {
        let err = OsRelease::load(Path::new("/nonexistent/os-release")).unwrap_err();
        assert!(matches!(err, GroupError::OsRelease(_)));
    }
}
