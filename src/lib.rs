//! unitgroup library
//!
//! Groups systemd services by the RPM repository their package came from and
//! materializes the group as a target unit plus per-service override
//! fragments.

pub mod cli;
pub mod engine;
pub mod error;
pub mod grouper;
pub mod logic;
pub mod os_release;
pub mod policy;
pub mod process_guard;
pub mod queries;
pub mod query_runner;
pub mod query_traits;
pub mod system;
pub mod types;

// Re-export main types for convenience
pub use engine::artifacts::{
    apply, undo, ArtifactAction, ArtifactKind, ArtifactLayout, ArtifactOutcome, GroupTarget,
};
pub use error::{GroupError, Result};
pub use grouper::{run, GroupRequest, ReloadStatus, RunReport};
pub use logic::inventory::{build_inventory, Inventory, Progress};
pub use logic::membership::{
    resolve_membership, MemberSet, MembershipNotice, MembershipRequest, Resolution,
};
pub use os_release::OsRelease;
pub use policy::GroupingPolicy;
pub use queries::rpm::RepoDialect;
pub use system::{HostSystem, SystemQuery};
pub use types::{OriginRepo, PackageOwner, RunMode, RunModifiers, ServiceRecord};
