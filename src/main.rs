//! unitgroup - main entry point

use anyhow::Context;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::process::ExitCode;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use unitgroup::cli::Cli;
use unitgroup::grouper::{self, GroupRequest, RunReport};
use unitgroup::{ArtifactLayout, GroupError, GroupingPolicy, HostSystem, OsRelease, Progress, RunMode};

/// Initialize logging on stderr. `RUST_LOG` overrides the default filter.
fn init_logger(verbose: bool) {
    let default_filter = if verbose { "unitgroup=debug" } else { "unitgroup=info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .compact(),
        )
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse_args();
    init_logger(cli.verbose);

    if let Err(e) = unitgroup::process_guard::init_signal_handlers() {
        warn!("failed to initialize signal handlers: {}", e);
    }

    match run(&cli) {
        Ok(report) => {
            print_report(&cli, &report);
            ExitCode::SUCCESS
        }
        Err(e) => {
            let (lines, code) = describe_failure(&e);
            for line in lines {
                error!("{}", line);
            }
            ExitCode::from(code)
        }
    }
}

/// Log lines and process exit code for a failed run. The remedy, when there
/// is one, follows the error message.
fn describe_failure(e: &anyhow::Error) -> (Vec<String>, u8) {
    let mut lines = vec![format!("{:#}", e)];
    let group_error = e.downcast_ref::<GroupError>();
    if let Some(remedy) = group_error.and_then(GroupError::remedy) {
        lines.push(format!("    {}", remedy));
    }
    let code = group_error.map_or(1, GroupError::exit_code);
    (lines, u8::try_from(code).unwrap_or(1))
}

fn run(cli: &Cli) -> anyhow::Result<RunReport> {
    let modifiers = cli.modifiers();
    debug!(?modifiers, "parsed arguments");

    let policy = GroupingPolicy::load_from_file(&cli.config, cli.verbose)?;

    let os_version = match &cli.os_version {
        Some(version) => version.clone(),
        None => OsRelease::load(&cli.os_release)
            .and_then(|release| release.version_id().map(str::to_string))
            .context("pass --os-version to skip detection")?,
    };

    let request = GroupRequest {
        target: cli.target.clone(),
        repo_filter: cli.repo.clone(),
        policy,
        os_version,
        modifiers,
    };

    // Verbose mode logs every service while scanning; the bar would interleave.
    let bar = progress_bar(cli.json || cli.verbose);
    let result = grouper::run(
        &HostSystem::default(),
        &ArtifactLayout::new(&cli.unit_dir),
        &request,
        |progress: Progress| {
            bar.set_length(progress.total as u64);
            bar.set_position(progress.processed as u64);
        },
    );
    bar.finish_and_clear();
    Ok(result?)
}

fn progress_bar(hidden: bool) -> ProgressBar {
    if hidden {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::with_draw_target(None, ProgressDrawTarget::stderr());
    if let Ok(style) = ProgressStyle::default_bar().template("[{bar:50}] {percent}% {pos}/{len}") {
        bar.set_style(style.progress_chars("#>-"));
    }
    bar
}

fn print_report(cli: &Cli, report: &RunReport) {
    if cli.json {
        match serde_json::to_string_pretty(report) {
            Ok(json) => println!("{}", json),
            Err(e) => error!("failed to serialize run report: {}", e),
        }
        return;
    }

    if report.mode == RunMode::Undo {
        info!(
            "{} custom target: {}.target",
            if report.dry_run { "would finish removing" } else { "finished removing" },
            report.target
        );
        return;
    }

    info!(
        "{} custom target: {}.target",
        if report.dry_run { "would finish creating" } else { "finished creating" },
        report.target
    );
    println!("control commands:");
    for line in grouper::control_commands(&report.target).lines() {
        println!("    {}", line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_failure_is_described_once_with_remedy() {
        let err = anyhow::Error::new(GroupError::AlreadyExists(PathBuf::from(
            "/etc/systemd/system/web.target",
        )));
        let (lines, code) = describe_failure(&err);

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "file already exists '/etc/systemd/system/web.target'");
        assert!(lines[1].contains("--force"));
        assert_eq!(code, 1);
    }

    #[test]
    fn test_failure_exit_code_follows_query() {
        let err = anyhow::Error::new(GroupError::Reload {
            code: Some(4),
            diagnostic: "Access denied".to_string(),
        })
        .context("reload failed");
        let (lines, code) = describe_failure(&err);

        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("reload failed: "));
        assert_eq!(code, 4);
    }

    #[test]
    fn test_progress_bar_hidden_for_json_and_verbose() {
        assert!(progress_bar(true).is_hidden());
    }
}
