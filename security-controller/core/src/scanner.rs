use crate::{
    Context, Error, ResourceId, Rule, RuleResult, ScanContext, ScanResult, Status, TargetKind,
};
use anyhow::anyhow;
use chrono::Utc;
use parking_lot::RwLock;
use security_controller_k8s_api::{self as k8s, Cluster, Plan, Resource};
use std::{sync::Arc, time::Duration};
use tokio::time;
use tracing::{debug, warn};

/// Evaluates registered rules against plans and clusters.
///
/// Rules are registered once, typically at startup, but registration may
/// happen concurrently with scans: each scan works from a snapshot of the
/// rule set taken under a shared lock.
#[derive(Default)]
pub struct Scanner {
    rules: RwLock<Vec<Arc<dyn Rule>>>,
    rule_timeout: Option<Duration>,
}

#[derive(Copy, Clone)]
enum Target<'t> {
    Plan(&'t Plan),
    Cluster(&'t Cluster),
}

// === impl Scanner ===

impl Scanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bounds how long any single rule may take. A rule that exceeds the
    /// timeout is recorded as a failure.
    ///
    /// The scan stops waiting on the rule but cannot stop work the rule has
    /// moved off the runtime: a policy program evaluating on the blocking
    /// pool runs to completion in the background.
    pub fn with_rule_timeout(mut self, timeout: Duration) -> Self {
        self.rule_timeout = Some(timeout);
        self
    }

    /// Appends a rule to the rule set. Codes are not checked for uniqueness;
    /// lookups return the first rule registered with a given code.
    pub fn register_rule(&self, rule: Arc<dyn Rule>) {
        debug!(code = %rule.code(), name = %rule.name(), "Registering rule");
        self.rules.write().push(rule);
    }

    /// Returns the registered rules in registration order.
    pub fn rules(&self) -> Vec<Arc<dyn Rule>> {
        self.rules.read().clone()
    }

    pub fn rule(&self, code: &str) -> Option<Arc<dyn Rule>> {
        self.rules
            .read()
            .iter()
            .find(|rule| rule.code() == code)
            .cloned()
    }

    pub async fn scan_plan(&self, ctx: &Context, plan: &Plan) -> Result<ScanResult, Error> {
        self.scan(ctx, Target::Plan(plan)).await
    }

    pub async fn scan_cluster(&self, ctx: &Context, cluster: &Cluster) -> Result<ScanResult, Error> {
        self.scan(ctx, Target::Cluster(cluster)).await
    }

    async fn scan(&self, ctx: &Context, target: Target<'_>) -> Result<ScanResult, Error> {
        let resource = target.resource_id();
        let snapshot = target.snapshot().map_err(|source| Error::Snapshot {
            resource: resource.clone(),
            source,
        })?;
        let scan_ctx = ScanContext::new(ctx, target.kind(), snapshot);

        let mut scan = ScanResult::new(&resource, target.owning_team(), Utc::now());
        for rule in self.rules() {
            if scan_ctx.is_cancelled() {
                return Err(Error::Cancelled(resource));
            }

            let check = match target {
                Target::Plan(plan) => match rule.as_plan_rule() {
                    Some(rule) => rule.check_plan(&scan_ctx, plan),
                    None => continue,
                },
                Target::Cluster(cluster) => match rule.as_cluster_rule() {
                    Some(rule) => rule.check_cluster(&scan_ctx, cluster),
                    None => continue,
                },
            };

            let outcome = match self.rule_timeout {
                Some(timeout) => match time::timeout(timeout, check).await {
                    Ok(outcome) => outcome,
                    Err(_) => Err(anyhow!(
                        "rule evaluation timed out after {}ms",
                        timeout.as_millis()
                    )),
                },
                None => check.await,
            };

            // A cancelled scan is abandoned rather than recorded with a
            // partial set of results.
            if scan_ctx.is_cancelled() {
                return Err(Error::Cancelled(resource));
            }

            let result = match outcome {
                Ok(Some(result)) => result,
                Ok(None) => {
                    debug!(%resource, code = %rule.code(), "Rule does not apply");
                    continue;
                }
                Err(error) => {
                    let message = format!("{error:#}");
                    warn!(%resource, code = %rule.code(), error = %message, "Rule failed");
                    RuleResult::new(rule.code(), Status::Failure, message)
                }
            };

            debug!(%resource, code = %result.rule_code, status = %result.status, "Checked rule");
            scan.push(RuleResult {
                checked_at: Utc::now(),
                ..result
            });
        }

        Ok(scan)
    }
}

impl std::fmt::Debug for Scanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scanner")
            .field("rules", &self.rules.read().len())
            .field("rule_timeout", &self.rule_timeout)
            .finish()
    }
}

// === impl Target ===

impl Target<'_> {
    fn kind(&self) -> TargetKind {
        match self {
            Self::Plan(_) => TargetKind::Plan,
            Self::Cluster(_) => TargetKind::Cluster,
        }
    }

    fn resource_id(&self) -> ResourceId {
        match self {
            Self::Plan(plan) => ResourceId::from_meta(&k8s::type_meta::<Plan>(), plan.meta()),
            Self::Cluster(cluster) => {
                ResourceId::from_meta(&k8s::type_meta::<Cluster>(), cluster.meta())
            }
        }
    }

    /// Resources are owned by the team whose namespace they live in.
    fn owning_team(&self) -> String {
        let meta = match self {
            Self::Plan(plan) => plan.meta(),
            Self::Cluster(cluster) => cluster.meta(),
        };
        meta.namespace.clone().unwrap_or_default()
    }

    fn snapshot(&self) -> serde_json::Result<serde_json::Value> {
        match self {
            Self::Plan(plan) => serde_json::to_value(plan),
            Self::Cluster(cluster) => serde_json::to_value(cluster),
        }
    }
}
