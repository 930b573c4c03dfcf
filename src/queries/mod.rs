//! Typed external query commands.
//!
//! - `rpm`: package ownership and origin-repository queries, plus the
//!   OS-version dispatch that picks the origin query dialect
//! - `systemctl`: service manager reload

pub mod rpm;
pub mod systemctl;
