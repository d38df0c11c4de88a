use crate::config;
use anyhow::Result;
use security_controller_core::{ClusterRule, PlanRule, Rule, RuleResult, ScanContext};
use security_controller_k8s_api::{Cluster, Plan};
use serde_json::Value;

pub const GKE_KIND: &str = "GKE";

/// Requires a boolean setting to be enabled on every node pool of a
/// provider's configuration.
///
/// Only resources of the rule's provider kind are checked; for any other
/// kind the rule does not apply.
#[derive(Clone, Debug)]
pub struct NodePoolSetting {
    code: &'static str,
    name: &'static str,
    description: &'static str,
    provider: &'static str,
    field: &'static str,
    feature: &'static str,
}

impl NodePoolSetting {
    pub fn gke_autoscaling() -> Self {
        Self {
            code: "GKE-01",
            name: "GKE node pool autoscaling",
            description: "## Overview\n\n\
                          Node pools without autoscaling cannot absorb load spikes and \
                          are commonly over-provisioned to compensate.\n\n\
                          ## Details\n\n\
                          Every entry of `nodePools` must set `enableAutoscaler: true`.",
            provider: GKE_KIND,
            field: "enableAutoscaler",
            feature: "Autoscaling",
        }
    }

    pub fn gke_autorepair() -> Self {
        Self {
            code: "GKE-02",
            name: "GKE node pool auto-repair",
            description: "## Overview\n\n\
                          Auto-repair replaces nodes that fail health checks. Without it, \
                          unhealthy nodes stay in service until an operator intervenes.\n\n\
                          ## Details\n\n\
                          Every entry of `nodePools` must set `enableAutorepair: true`.",
            provider: GKE_KIND,
            field: "enableAutorepair",
            feature: "Auto-repair",
        }
    }

    fn check(&self, kind: &str, config: &Value) -> Result<Option<RuleResult>> {
        if kind != self.provider {
            return Ok(None);
        }

        let pools = config::require_array(config, "nodePools")?;
        let mut disabled = Vec::new();
        for (i, pool) in pools.iter().enumerate() {
            if !config::require_bool(config, &format!("nodePools.{i}.{}", self.field))? {
                let name = pool
                    .get("name")
                    .and_then(Value::as_str)
                    .map(ToString::to_string)
                    .unwrap_or_else(|| format!("#{i}"));
                disabled.push(name);
            }
        }

        if disabled.is_empty() {
            return Ok(Some(RuleResult::compliant(
                self.code,
                format!("{} is enabled on all node pools", self.feature),
            )));
        }

        Ok(Some(RuleResult::warning(
            self.code,
            format!(
                "{} is not enabled on node pools: {}",
                self.feature,
                disabled.join(", ")
            ),
        )))
    }
}

impl Rule for NodePoolSetting {
    fn code(&self) -> &str {
        self.code
    }

    fn name(&self) -> &str {
        self.name
    }

    fn description(&self) -> &str {
        self.description
    }

    fn as_plan_rule(&self) -> Option<&dyn PlanRule> {
        Some(self)
    }

    fn as_cluster_rule(&self) -> Option<&dyn ClusterRule> {
        Some(self)
    }
}

#[async_trait::async_trait]
impl PlanRule for NodePoolSetting {
    async fn check_plan(&self, _: &ScanContext<'_>, plan: &Plan) -> Result<Option<RuleResult>> {
        self.check(&plan.spec.kind, &plan.spec.configuration)
    }
}

#[async_trait::async_trait]
impl ClusterRule for NodePoolSetting {
    async fn check_cluster(
        &self,
        _: &ScanContext<'_>,
        cluster: &Cluster,
    ) -> Result<Option<RuleResult>> {
        self.check(&cluster.spec.kind, &cluster.spec.configuration)
    }
}
