
use crate::{
    ClusterRule, Context, PlanRule, ResourceClient, Rule, RuleResult, ScanContext, Status,
};
use anyhow::{bail, Result};
use security_controller_k8s_api::{Cluster, ClusterSpec, ObjectMeta, Plan, PlanSpec};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

pub fn mk_plan(ns: impl ToString, name: impl ToString, kind: impl ToString) -> Plan {
    Plan {
        metadata: ObjectMeta {
            namespace: Some(ns.to_string()),
            name: Some(name.to_string()),
            ..Default::default()
        },
        spec: PlanSpec {
            kind: kind.to_string(),
            summary: String::new(),
            description: String::new(),
            configuration: serde_json::json!({}),
        },
    }
}

pub fn mk_cluster(ns: impl ToString, name: impl ToString, kind: impl ToString) -> Cluster {
    Cluster {
        metadata: ObjectMeta {
            namespace: Some(ns.to_string()),
            name: Some(name.to_string()),
            ..Default::default()
        },
        spec: ClusterSpec {
            kind: kind.to_string(),
            plan: String::new(),
            configuration: serde_json::json!({}),
        },
    }
}

pub fn mk_context() -> Context {
    Context::new(Arc::new(NoPlans))
}

struct NoPlans;

#[async_trait::async_trait]
impl ResourceClient for NoPlans {
    async fn get_plan(&self, _name: &str) -> Result<Option<Plan>> {
        Ok(None)
    }
}

/// What a [`FakeRule`] does when it is invoked.
#[derive(Clone, Debug)]
pub enum Outcome {
    Result(Status),
    NotApplicable,
    Error(&'static str),
}

/// A rule that records how often each capability is invoked.
pub struct FakeRule {
    code: String,
    plan: Option<Outcome>,
    cluster: Option<Outcome>,
    pub plan_calls: AtomicUsize,
    pub cluster_calls: AtomicUsize,
}

impl FakeRule {
    pub fn new(code: impl ToString) -> Self {
        Self {
            code: code.to_string(),
            plan: None,
            cluster: None,
            plan_calls: AtomicUsize::new(0),
            cluster_calls: AtomicUsize::new(0),
        }
    }

    pub fn plans(mut self, outcome: Outcome) -> Self {
        self.plan = Some(outcome);
        self
    }

    pub fn clusters(mut self, outcome: Outcome) -> Self {
        self.cluster = Some(outcome);
        self
    }

    pub fn plan_calls(&self) -> usize {
        self.plan_calls.load(Ordering::SeqCst)
    }

    pub fn cluster_calls(&self) -> usize {
        self.cluster_calls.load(Ordering::SeqCst)
    }

    fn outcome(&self, outcome: &Outcome) -> Result<Option<RuleResult>> {
        match outcome {
            Outcome::Result(status) => Ok(Some(RuleResult::new(
                &self.code,
                *status,
                format!("{} is {status}", self.code),
            ))),
            Outcome::NotApplicable => Ok(None),
            Outcome::Error(msg) => bail!("{msg}"),
        }
    }
}

impl Rule for FakeRule {
    fn code(&self) -> &str {
        &self.code
    }

    fn name(&self) -> &str {
        "Fake rule"
    }

    fn description(&self) -> &str {
        "Returns a canned outcome."
    }

    fn as_plan_rule(&self) -> Option<&dyn PlanRule> {
        self.plan.as_ref().map(|_| self as &dyn PlanRule)
    }

    fn as_cluster_rule(&self) -> Option<&dyn ClusterRule> {
        self.cluster.as_ref().map(|_| self as &dyn ClusterRule)
    }
}

#[async_trait::async_trait]
impl PlanRule for FakeRule {
    async fn check_plan(&self, _: &ScanContext<'_>, _: &Plan) -> Result<Option<RuleResult>> {
        self.plan_calls.fetch_add(1, Ordering::SeqCst);
        self.outcome(self.plan.as_ref().expect("plan outcome must be set"))
    }
}

#[async_trait::async_trait]
impl ClusterRule for FakeRule {
    async fn check_cluster(&self, _: &ScanContext<'_>, _: &Cluster) -> Result<Option<RuleResult>> {
        self.cluster_calls.fetch_add(1, Ordering::SeqCst);
        self.outcome(self.cluster.as_ref().expect("cluster outcome must be set"))
    }
}
