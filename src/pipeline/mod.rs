// src/pipeline/mod.rs

//! Change-detection pipeline.
//!
//! - `fingerprint`: Normalized content hashes for items
//! - `diff`: Classify items of two snapshots as new, updated or unchanged
//! - `orchestrator`: Run every configured site and build the run summary

pub mod diff;
pub mod fingerprint;
pub mod orchestrator;

pub use diff::{carry_forward_excerpts, compare};
pub use orchestrator::{Orchestrator, SiteState, write_summary};
