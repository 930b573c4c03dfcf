//! Service manager commands.

use crate::query_traits::QueryCommand;

/// `systemctl daemon-reload`, run after artifacts change.
#[derive(Debug, Clone, Copy, Default)]
pub struct DaemonReload;

impl QueryCommand for DaemonReload {
    fn program(&self) -> &'static str {
        "systemctl"
    }

    fn to_cli_args(&self) -> Vec<String> {
        vec!["daemon-reload".to_string()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_daemon_reload_command_line() {
        assert_eq!(DaemonReload.command_line(), "systemctl daemon-reload");
    }
}
