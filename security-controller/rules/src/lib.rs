#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

//! The compliance rules evaluated by the security controller.
//!
//! [`builtin`] rules are written directly against a resource's typed
//! configuration. [`bundle`] rules are Rego programs loaded from policy
//! bundles and compiled once at startup.

pub mod builtin;
pub mod bundle;
mod config;


pub use self::{
    bundle::{LoadError, PolicyRule},
    config::ConfigError,
};
use security_controller_core::{Rule, Scanner};
use std::sync::Arc;

/// Registers rules with the scanner in the order given.
pub fn register_all<I>(scanner: &Scanner, rules: I) -> usize
where
    I: IntoIterator<Item = Arc<dyn Rule>>,
{
    let mut n = 0;
    for rule in rules {
        scanner.register_rule(rule);
        n += 1;
    }
    n
}
