//! Logic modules: decide which services form the group.
//!
//! # Modules
//!
//! - `inventory`: snapshot of service units, owning packages and origin repos
//! - `membership`: repository filter plus inclusion/exclusion resolution

pub mod inventory;
pub mod membership;
