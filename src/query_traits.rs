//! Type-safe query command contracts.
//!
//! Each external tool invocation (`rpm`, `yumdb`, `dnf`, `systemctl`) is a
//! struct implementing `QueryCommand`. The struct definition is the contract
//! for the argument vector, so call sites never assemble raw strings.

/// Trait for typed external query commands.
///
/// # Invariants
///
/// - `program()` is a bare executable name resolved through `PATH`.
/// - `to_cli_args()` returns arguments exactly as the tool expects them; no
///   shell is involved, so values are never re-interpreted.
pub trait QueryCommand {
    /// Executable to run, e.g. `"rpm"`.
    fn program(&self) -> &'static str;

    /// Arguments passed to the executable.
    fn to_cli_args(&self) -> Vec<String>;

    /// Human-readable command line for logs and dry-run previews.
    fn command_line(&self) -> String {
        let mut line = self.program().to_string();
        for arg in self.to_cli_args() {
            line.push(' ');
            line.push_str(&arg);
        }
        line
    }
}
