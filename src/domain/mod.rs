//! Core domain models for arm
//!
//! This module contains the fundamental types used throughout the pipeline:
//! - Outdated dependency information and change types
//! - Ecosystem tags
//! - Scan reports
//! - Update policy
//! - Story and pull request records

mod dependency;
mod ecosystem;
mod policy;
mod report;
mod tracking;

pub use dependency::{ChangeType, Dependency, DependencyLocation};
pub use ecosystem::Ecosystem;
pub use policy::UpdatePolicy;
pub use report::DependencyReport;
pub use tracking::{PullRequest, Story};
