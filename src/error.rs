//! Error handling module for unitgroup
//!
//! Every fatal condition of a run maps to one `GroupError` variant. Recoverable
//! membership diagnostics are not errors; they are reported as notices by the
//! membership resolver.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for unitgroup
#[derive(Error, Debug)]
pub enum GroupError {
    /// The OS version does not map to a known repository query dialect
    #[error("unsupported operating system major version '{0}'")]
    UnsupportedOsVersion(String),

    /// `/etc/os-release` could not be read or lacks VERSION_ID
    #[error("could not determine operating system version: {0}")]
    OsRelease(String),

    /// Enumerating service unit files failed
    #[error("failed to enumerate systemd service files (code {code:?}): {diagnostic}")]
    Enumeration {
        code: Option<i32>,
        diagnostic: String,
    },

    /// The package ownership query failed for a reason other than "not owned"
    #[error("failed to query owning package of '{}' (code {code:?}): {diagnostic}", .unit.display())]
    OwnershipQuery {
        unit: PathBuf,
        code: Option<i32>,
        diagnostic: String,
    },

    /// The origin repository query failed
    #[error("failed to query origin repository of package '{package}' (code {code:?}): {diagnostic}")]
    RepoQuery {
        package: String,
        code: Option<i32>,
        diagnostic: String,
    },

    /// The grouping policy file could not be loaded
    #[error("could not load grouping policy from '{}': {reason}", .path.display())]
    PolicyLoad { path: PathBuf, reason: String },

    /// No service is left in the group after filtering
    #[error("could not find any systemd services installed from the rpm repository '{repo_filter}'")]
    EmptyMembership { repo_filter: String },

    /// An artifact exists and `--force` was not given
    #[error("file already exists '{}'", .0.display())]
    AlreadyExists(PathBuf),

    /// Write or remove was refused by the filesystem
    #[error("permission denied for '{}'", .0.display())]
    PermissionDenied(PathBuf),

    /// Any other filesystem failure on an artifact path
    #[error("I/O error on '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The service manager reload failed
    #[error("service manager reload failed (code {code:?}): {diagnostic}")]
    Reload {
        code: Option<i32>,
        diagnostic: String,
    },

    /// Invalid command-line input
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

/// Result type alias for unitgroup operations
pub type Result<T> = std::result::Result<T, GroupError>;

impl GroupError {
    /// Create an I/O error for an artifact path, classifying permission denial
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::PermissionDenied {
            Self::PermissionDenied(path)
        } else {
            Self::Io { path, source }
        }
    }

    /// Create an invalid argument error
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Create an os-release error
    pub fn os_release(msg: impl Into<String>) -> Self {
        Self::OsRelease(msg.into())
    }

    /// Process exit code for this failure.
    ///
    /// Query failures propagate the underlying command's code where one
    /// exists; everything else exits with 1.
    pub fn exit_code(&self) -> i32 {
        let code = match self {
            Self::Enumeration { code, .. }
            | Self::OwnershipQuery { code, .. }
            | Self::RepoQuery { code, .. }
            | Self::Reload { code, .. } => *code,
            _ => None,
        };
        match code {
            Some(c) if c > 0 && c < 256 => c,
            _ => 1,
        }
    }

    /// Suggested remedy shown to the operator, if any
    pub fn remedy(&self) -> Option<String> {
        match self {
            Self::PermissionDenied(_) => {
                Some("try running again with root permissions".to_string())
            }
            Self::AlreadyExists(_) => Some(
                "if you are sure you want to overwrite this file re-run with --force".to_string(),
            ),
            Self::EmptyMembership { repo_filter } => {
                Some(format!("is '{}' a typo?", repo_filter))
            }
            Self::PolicyLoad { path, .. } => Some(format!(
                "try running 'yamllint {}' for more details",
                path.display()
            )),
            Self::UnsupportedOsVersion(_) => {
                Some("pass --os-version 7 or --os-version 8 to pick a query dialect".to_string())
            }
            _ => None,
        }
    }
}
