#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

//! Reconciles plans and clusters by scanning them for compliance.
//!
//! One controller runs per [`Target`] kind. Watch events pass through an
//! [`EventFilter`] before they trigger a reconcile; each reconcile fetches
//! the current object and either archives its scans (the object is being
//! deleted) or scans it through the [`Security`] facade.

mod backoff;
mod client;
mod fetch;
mod filter;
mod metrics;
mod reconcile;
mod security;
mod target;

#[cfg(test)]
mod tests;

pub use self::{
    backoff::Backoff,
    client::PlanClient,
    fetch::Fetch,
    filter::{EventFilter, SystemObjectFilter, Tracker},
    metrics::{ControllerMetrics, ScanMetrics},
    reconcile::{run, Error, Outcome, Reconciler},
    security::{Recorder, Security},
    target::Target,
};
