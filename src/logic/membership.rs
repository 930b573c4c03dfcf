//! Membership Resolver
//!
//! Turns the inventory plus a repository filter and the policy's
//! inclusion/exclusion lists into the final, ordered member set.
//!
//! # Resolution Rules
//!
//! | Step | Input        | Effect |
//! |------|--------------|--------|
//! | 1    | `repo_filter`| Seed with every record whose origin repo matches exactly |
//! | 2    | `inclusions` | Append known, not-yet-member services, in list order |
//! | 3    | `exclusions` | Remove known members, in list order |
//! | 4    | -            | Empty result is `EmptyMembership` |
//!
//! Inclusions are always processed before exclusions, so a name present in
//! both lists ends up excluded.
//!
//! Unknown or redundant names are not errors; they are returned as
//! `MembershipNotice`s and logged.

use crate::error::{GroupError, Result};
use crate::logic::inventory::Inventory;
use crate::types::ServiceRecord;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use tracing::{info, warn};

/// Input to the resolver.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MembershipRequest {
    pub repo_filter: String,
    pub inclusions: Vec<String>,
    pub exclusions: Vec<String>,
}

/// Diagnostic produced while applying inclusions and exclusions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "service", rename_all = "snake_case")]
pub enum MembershipNotice {
    /// Inclusion names a service that is not installed
    UnknownInclusion(String),
    /// Inclusion names a service that is already a member
    RedundantInclusion(String),
    Included(String),
    /// Exclusion names a service that is not installed
    UnknownExclusion(String),
    /// Exclusion names a service that is not a member
    NotPresent(String),
    Excluded(String),
}

impl MembershipNotice {
    /// Unknown names are warnings; everything else is informational.
    pub fn is_warning(&self) -> bool {
        matches!(self, Self::UnknownInclusion(_) | Self::UnknownExclusion(_))
    }

    fn log(&self) {
        if self.is_warning() {
            warn!("{}", self);
        } else {
            info!("{}", self);
        }
    }
}

impl fmt::Display for MembershipNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownInclusion(s) => {
                write!(f, "systemd service '{}' does not exist, not including in list", s)
            }
            Self::RedundantInclusion(s) => write!(
                f,
                "systemd service '{}' already added, do not need to include in list",
                s
            ),
            Self::Included(s) => write!(f, "adding systemd service '{}'", s),
            Self::UnknownExclusion(s) => {
                write!(f, "systemd service '{}' does not exist, not removing from list", s)
            }
            Self::NotPresent(s) => write!(
                f,
                "could not find systemd service '{}' in list, do not need to remove from list",
                s
            ),
            Self::Excluded(s) => write!(f, "removing systemd service '{}'", s),
        }
    }
}

/// Ordered, non-empty set of member services, unique by service name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct MemberSet {
    members: Vec<ServiceRecord>,
}

impl MemberSet {
    /// Build a member set, keeping the first record for each service name.
    /// Returns `None` when no records are given.
    pub fn new(records: Vec<ServiceRecord>) -> Option<Self> {
        let mut seen = HashSet::new();
        let members: Vec<ServiceRecord> = records
            .into_iter()
            .filter(|r| seen.insert(r.service_name.clone()))
            .collect();
        if members.is_empty() {
            None
        } else {
            Some(Self { members })
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &ServiceRecord> {
        self.members.iter()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Always false for a constructed set.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.members.iter().map(|r| r.service_name.as_str()).collect()
    }

    pub fn contains(&self, service_name: &str) -> bool {
        self.members.iter().any(|r| r.service_name == service_name)
    }
}

/// Resolved members plus the diagnostics emitted along the way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub members: MemberSet,
    pub notices: Vec<MembershipNotice>,
}

/// Resolve the final member set.
///
/// # Errors
///
/// `EmptyMembership` naming the filter when nothing is left after exclusions.
pub fn resolve_membership(inventory: &Inventory, request: &MembershipRequest) -> Result<Resolution> {
    let mut members: Vec<&ServiceRecord> = Vec::new();
    let mut notices = Vec::new();

    // 1. Seed from the repository filter
    for record in inventory.records() {
        if record.origin_repo.matches(&request.repo_filter) && !is_member(&members, &record.service_name) {
            members.push(record);
        }
    }

    // 2. Inclusions
    info!("adding inclusions to list of systemd services to be modified");
    for name in &request.inclusions {
        let notice = match inventory.find(name) {
            None => MembershipNotice::UnknownInclusion(name.clone()),
            Some(_) if is_member(&members, name) => MembershipNotice::RedundantInclusion(name.clone()),
            Some(record) => {
                members.push(record);
                MembershipNotice::Included(name.clone())
            }
        };
        notice.log();
        notices.push(notice);
    }

    // 3. Exclusions
    info!("removing exclusions from list of systemd services to be modified");
    for name in &request.exclusions {
        let notice = if !inventory.contains(name) {
            MembershipNotice::UnknownExclusion(name.clone())
        } else if !is_member(&members, name) {
            MembershipNotice::NotPresent(name.clone())
        } else {
            members.retain(|r| r.service_name != *name);
            MembershipNotice::Excluded(name.clone())
        };
        notice.log();
        notices.push(notice);
    }

    // 4. Empty membership is a hard error
    let members = MemberSet::new(members.into_iter().cloned().collect()).ok_or_else(|| {
        GroupError::EmptyMembership {
            repo_filter: request.repo_filter.clone(),
        }
    })?;

    Ok(Resolution { members, notices })
}

fn is_member(members: &[&ServiceRecord], service_name: &str) -> bool {
    members.iter().any(|r| r.service_name == service_name)
}
