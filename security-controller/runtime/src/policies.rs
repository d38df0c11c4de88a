use crate::{
    core::{Rule, Scanner},
    rules::{self, bundle, LoadError},
};
use std::{path::Path, sync::Arc};
use tracing::info;

/// Registers the native rules and every configured policy bundle.
///
/// Bundles are loaded before anything is registered, so a bundle that fails
/// to load leaves the scanner empty.
pub(crate) fn register(
    scanner: &Scanner,
    builtin_bundles: bool,
    bundle_dir: Option<&Path>,
) -> Result<(), LoadError> {
    let mut policies = Vec::new();
    if builtin_bundles {
        policies.extend(bundle::load_builtin()?);
    }
    if let Some(dir) = bundle_dir {
        policies.extend(bundle::load_dir(dir)?);
    }
    let native = rules::register_all(scanner, rules::builtin::all());
    let policies = rules::register_all(
        scanner,
        policies
            .into_iter()
            .map(|policy| Arc::new(policy) as Arc<dyn Rule>),
    );

    info!(native, policies, "Registered rules");
    Ok(())
}
