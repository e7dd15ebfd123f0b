//! arm - Automated dependency governance library
//!
//! This library provides the pipeline that keeps a repository's dependencies
//! current under human oversight:
//! - Scan a target repository for outdated packages
//! - Filter them through an update policy
//! - Track each approved update as a Story in a governance repository
//! - Open a PR in the target repository that closes the Story

pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod filter;
pub mod forge;
pub mod manifest;
pub mod output;
pub mod pipeline;
pub mod pr;
pub mod progress;
pub mod resilience;
pub mod scanner;
pub mod story;
