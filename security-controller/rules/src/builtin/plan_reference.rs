use anyhow::{Context as _, Result};
use security_controller_core::{ClusterRule, Rule, RuleResult, ScanContext};
use security_controller_k8s_api::Cluster;

const CODE: &str = "CLUSTER-01";

/// Requires a cluster to be traceable to an existing plan.
#[derive(Clone, Debug, Default)]
pub struct PlanReference;

impl Rule for PlanReference {
    fn code(&self) -> &str {
        CODE
    }

    fn name(&self) -> &str {
        "Cluster plan reference"
    }

    fn description(&self) -> &str {
        "## Overview\n\n\
         Clusters should be created from an administrator-approved plan. A cluster \
         whose plan has been removed can no longer be compared against it."
    }

    fn as_cluster_rule(&self) -> Option<&dyn ClusterRule> {
        Some(self)
    }
}

#[async_trait::async_trait]
impl ClusterRule for PlanReference {
    async fn check_cluster(
        &self,
        ctx: &ScanContext<'_>,
        cluster: &Cluster,
    ) -> Result<Option<RuleResult>> {
        let plan = cluster.spec.plan.trim();
        if plan.is_empty() {
            return Ok(Some(RuleResult::warning(
                CODE,
                "Cluster does not reference a plan",
            )));
        }

        let found = ctx
            .client()
            .get_plan(plan)
            .await
            .with_context(|| format!("failed to look up plan {plan}"))?;
        let result = match found {
            Some(_) => RuleResult::compliant(CODE, format!("Cluster was created from plan {plan}")),
            None => RuleResult::warning(
                CODE,
                format!("Cluster references plan {plan} which no longer exists"),
            ),
        };
        Ok(Some(result))
    }
}
