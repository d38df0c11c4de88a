//! Rules implemented natively against a resource's configuration.

mod auth_proxy;
mod node_pool;
mod plan_reference;

pub use self::{
    auth_proxy::AuthProxyIpRange,
    node_pool::{NodePoolSetting, GKE_KIND},
    plan_reference::PlanReference,
};
use security_controller_core::Rule;
use std::sync::Arc;

/// Returns every native rule in registration order.
pub fn all() -> Vec<Arc<dyn Rule>> {
    vec![
        Arc::new(AuthProxyIpRange),
        Arc::new(NodePoolSetting::gke_autoscaling()),
        Arc::new(NodePoolSetting::gke_autorepair()),
        Arc::new(PlanReference),
    ]
}
