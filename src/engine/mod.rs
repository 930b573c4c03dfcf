//! Engine modules: side-effecting transitions over on-disk artifacts.
//!
//! - `artifacts`: apply/undo of the grouping unit and override fragments

pub mod artifacts;
