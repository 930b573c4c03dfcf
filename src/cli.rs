use clap::Parser;
use std::path::PathBuf;

use crate::engine::artifacts::DEFAULT_UNIT_DIR;
use crate::os_release::OS_RELEASE_PATH;
use crate::policy::DEFAULT_POLICY_FILE;
use crate::types::RunModifiers;

/// unitgroup - control every service from one RPM repository at once
#[derive(Parser, Debug)]
#[command(name = "unitgroup")]
#[command(about = "Create custom systemd targets to control multiple systemd services at once")]
#[command(version)]
pub struct Cli {
    /// Name of the systemd target to create (without the .target suffix)
    #[arg(short, long)]
    pub target: String,

    /// Name of the rpm repository used to select services
    #[arg(short, long)]
    pub repo: String,

    /// Grouping policy file with inclusions and exclusions
    #[arg(short, long, default_value = DEFAULT_POLICY_FILE)]
    pub config: PathBuf,

    /// Show changes without making them.
    ///
    /// Existence checks still run, so a dry-run fails wherever the real run
    /// would.
    #[arg(long, alias = "dryrun")]
    pub dry_run: bool,

    /// Overwrite any existing files
    #[arg(long)]
    pub force: bool,

    /// Remove a previously created target and its overrides
    #[arg(long)]
    pub undo: bool,

    /// Show more output, including file contents
    #[arg(short, long)]
    pub verbose: bool,

    /// Service manager configuration directory
    #[arg(long, default_value = DEFAULT_UNIT_DIR)]
    pub unit_dir: PathBuf,

    /// OS version used to pick the repository query dialect
    /// (default: VERSION_ID from /etc/os-release)
    #[arg(long)]
    pub os_version: Option<String>,

    /// os-release file consulted when --os-version is not given
    #[arg(long, default_value = OS_RELEASE_PATH, hide = true)]
    pub os_release: PathBuf,

    /// Print the run report as JSON on stdout
    #[arg(long)]
    pub json: bool,
}

impl Cli {
    pub fn parse_args() -> Self {
        <Self as clap::Parser>::parse()
    }

    pub fn modifiers(&self) -> RunModifiers {
        RunModifiers {
            dry_run: self.dry_run,
            force: self.force,
            verbose: self.verbose,
            undo: self.undo,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_requires_target_and_repo() {
        assert!(Cli::try_parse_from(["unitgroup"]).is_err());
        assert!(Cli::try_parse_from(["unitgroup", "-t", "web"]).is_err());
        assert!(Cli::try_parse_from(["unitgroup", "-r", "epel"]).is_err());
    }

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::try_parse_from(["unitgroup", "-t", "web", "-r", "epel"]).unwrap();
        assert_eq!(cli.target, "web");
        assert_eq!(cli.repo, "epel");
        assert_eq!(cli.config, PathBuf::from("config.yml"));
        assert_eq!(cli.unit_dir, PathBuf::from("/etc/systemd/system"));
        assert!(cli.os_version.is_none());
        assert_eq!(cli.modifiers(), RunModifiers::default());
    }

    #[test]
    fn test_cli_modifiers() {
        let cli = Cli::try_parse_from([
            "unitgroup",
            "--target",
            "web",
            "--repo",
            "epel",
            "--dryrun",
            "--force",
            "--undo",
            "-v",
        ])
        .unwrap();
        let modifiers = cli.modifiers();
        assert!(modifiers.dry_run);
        assert!(modifiers.force);
        assert!(modifiers.undo);
        assert!(modifiers.verbose);
    }

    #[test]
    fn test_cli_overrides() {
        let cli = Cli::try_parse_from([
            "unitgroup",
            "-t",
            "web",
            "-r",
            "epel",
            "--config",
            "/etc/unitgroup/web.yml",
            "--unit-dir",
            "/tmp/units",
            "--os-version",
            "8.4",
            "--json",
        ])
        .unwrap();
        assert_eq!(cli.config, PathBuf::from("/etc/unitgroup/web.yml"));
        assert_eq!(cli.unit_dir, PathBuf::from("/tmp/units"));
        assert_eq!(cli.os_version.as_deref(), Some("8.4"));
        assert!(cli.json);
    }
}
