use crate::config::{self, mistyped};
use anyhow::{Context as _, Result};
use ipnet::IpNet;
use security_controller_core::{
    ClusterRule, PlanRule, Rule, RuleResult, ScanContext, TargetKind,
};
use security_controller_k8s_api::{Cluster, Plan};
use serde_json::Value;

const CODE: &str = "AUTH-01";
const FIELD: &str = "authProxyAllowedIPs";

/// The widest IPv4 range that may reach the auth proxy.
const MIN_IPV4_PREFIX: u8 = 16;

/// The widest IPv6 range that may reach the auth proxy.
const MIN_IPV6_PREFIX: u8 = 48;

/// Requires the auth proxy in front of a cluster's API to be restricted to
/// narrow source ranges.
#[derive(Clone, Debug, Default)]
pub struct AuthProxyIpRange;

impl AuthProxyIpRange {
    fn check(&self, kind: TargetKind, config: &Value) -> Result<RuleResult> {
        let ranges = config::require_array(config, FIELD)?;
        if ranges.is_empty() {
            return Ok(RuleResult::warning(
                CODE,
                format!("No Auth Proxy IP ranges specified by {kind}"),
            ));
        }

        let mut too_wide = Vec::new();
        for (i, range) in ranges.iter().enumerate() {
            let range = range
                .as_str()
                .ok_or_else(|| mistyped(format!("{FIELD}.{i}"), "a string", range))?;
            let net = range
                .parse::<IpNet>()
                .with_context(|| format!("invalid Auth Proxy IP range {range:?}"))?;
            let min_prefix = match net {
                IpNet::V4(_) => MIN_IPV4_PREFIX,
                IpNet::V6(_) => MIN_IPV6_PREFIX,
            };
            if net.prefix_len() < min_prefix {
                too_wide.push(range);
            }
        }

        if too_wide.is_empty() {
            return Ok(RuleResult::compliant(
                CODE,
                format!("All Auth Proxy IP ranges specified by {kind} are sufficiently narrow"),
            ));
        }

        Ok(RuleResult::warning(
            CODE,
            format!(
                "Auth Proxy IP ranges specified by {kind} are too wide (IPv4 ranges must be \
                 /{MIN_IPV4_PREFIX} or narrower, IPv6 /{MIN_IPV6_PREFIX} or narrower): {}",
                too_wide.join(", ")
            ),
        ))
    }
}

impl Rule for AuthProxyIpRange {
    fn code(&self) -> &str {
        CODE
    }

    fn name(&self) -> &str {
        "Auth Proxy IP ranges"
    }

    fn description(&self) -> &str {
        "## Overview\n\n\
         The auth proxy exposes a cluster's API to its team. Limiting the source \
         IP ranges allowed to reach it reduces the cluster's attack surface.\n\n\
         ## Details\n\n\
         `authProxyAllowedIPs` must list at least one range, and every IPv4 range \
         must be a /16 or narrower (IPv6: /48 or narrower)."
    }

    fn as_plan_rule(&self) -> Option<&dyn PlanRule> {
        Some(self)
    }

    fn as_cluster_rule(&self) -> Option<&dyn ClusterRule> {
        Some(self)
    }
}

#[async_trait::async_trait]
impl PlanRule for AuthProxyIpRange {
    async fn check_plan(&self, _: &ScanContext<'_>, plan: &Plan) -> Result<Option<RuleResult>> {
        self.check(TargetKind::Plan, &plan.spec.configuration)
            .map(Some)
    }
}

#[async_trait::async_trait]
impl ClusterRule for AuthProxyIpRange {
    async fn check_cluster(
        &self,
        _: &ScanContext<'_>,
        cluster: &Cluster,
    ) -> Result<Option<RuleResult>> {
        self.check(TargetKind::Cluster, &cluster.spec.configuration)
            .map(Some)
    }
}
