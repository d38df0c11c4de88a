#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

//! Compliance scanning of plans and clusters.
//!
//! Rules implement [`Rule`] and opt in to the resource kinds they can check
//! through [`PlanRule`] and [`ClusterRule`]. A [`Scanner`] holds the
//! registered rules and aggregates their results into a [`ScanResult`] whose
//! overall status is the worst status of any collected result.

mod context;
mod error;
mod resource_id;
mod result;
mod rule;
mod scanner;
mod status;
pub mod store;

#[cfg(test)]
mod tests;

pub use self::{
    context::{Context, ResourceClient, ScanContext, TargetKind},
    error::Error,
    resource_id::ResourceId,
    result::{RuleResult, ScanResult},
    rule::{ClusterRule, PlanRule, Rule},
    scanner::Scanner,
    status::{InvalidStatus, Status},
    store::{MemoryStore, ScanStore},
};
