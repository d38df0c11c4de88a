use crate::{RuleResult, ScanContext};
use anyhow::Result;
use security_controller_k8s_api::{Cluster, Plan};

/// Identifies a compliance check.
///
/// A rule opts in to the kinds of resources it can evaluate by implementing
/// [`PlanRule`] and/or [`ClusterRule`] and returning itself from the matching
/// accessor. Rules that do not expose a capability are never invoked for
/// that kind.
pub trait Rule: Send + Sync {
    /// A unique, stable identifier such as `GKE-02`.
    fn code(&self) -> &str;

    fn name(&self) -> &str;

    /// A markdown rationale for the check.
    fn description(&self) -> &str;

    fn as_plan_rule(&self) -> Option<&dyn PlanRule> {
        None
    }

    fn as_cluster_rule(&self) -> Option<&dyn ClusterRule> {
        None
    }
}

/// A rule that can evaluate a [`Plan`].
///
/// Returns `Ok(None)` when the rule does not apply to this particular plan.
#[async_trait::async_trait]
pub trait PlanRule: Rule {
    async fn check_plan(&self, ctx: &ScanContext<'_>, plan: &Plan) -> Result<Option<RuleResult>>;
}

/// A rule that can evaluate a [`Cluster`].
///
/// Returns `Ok(None)` when the rule does not apply to this particular cluster.
#[async_trait::async_trait]
pub trait ClusterRule: Rule {
    async fn check_cluster(
        &self,
        ctx: &ScanContext<'_>,
        cluster: &Cluster,
    ) -> Result<Option<RuleResult>>;
}

impl std::fmt::Debug for dyn Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rule")
            .field("code", &self.code())
            .field("name", &self.name())
            .field("plan", &self.as_plan_rule().is_some())
            .field("cluster", &self.as_cluster_rule().is_some())
            .finish()
    }
}
