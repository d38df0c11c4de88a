#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

pub use security_controller_core as core;
pub use security_controller_k8s_api as k8s;
pub use security_controller_k8s_controller as controller;
pub use security_controller_rules as rules;

mod args;
mod policies;

pub use self::args::Args;
