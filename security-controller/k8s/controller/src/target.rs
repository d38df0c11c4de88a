use crate::Security;
use anyhow::Result;
use security_controller_core::Context;
use security_controller_k8s_api::{Cluster, NamespaceResourceScope, Plan, Resource};
use serde::de::DeserializeOwned;
use std::fmt::Debug;

/// A resource kind reconciled by a security controller.
#[async_trait::async_trait]
pub trait Target:
    Resource<DynamicType = (), Scope = NamespaceResourceScope>
    + Clone
    + DeserializeOwned
    + Debug
    + Send
    + Sync
    + 'static
{
    /// The name of the controller reconciling this kind.
    const CONTROLLER: &'static str;

    async fn scan(&self, security: &dyn Security, ctx: &Context) -> Result<()>;
}

#[async_trait::async_trait]
impl Target for Plan {
    const CONTROLLER: &'static str = "security-plan";

    async fn scan(&self, security: &dyn Security, ctx: &Context) -> Result<()> {
        security.scan_plan(ctx, self).await
    }
}

#[async_trait::async_trait]
impl Target for Cluster {
    const CONTROLLER: &'static str = "security-cluster";

    async fn scan(&self, security: &dyn Security, ctx: &Context) -> Result<()> {
        security.scan_cluster(ctx, self).await
    }
}
