mod recorder;

use crate::{Fetch, Security};
use anyhow::{bail, Result};
use parking_lot::Mutex;
use security_controller_core::{Context, ResourceClient};
use security_controller_k8s_api::{
    Cluster, ClusterSpec, ObjectMeta, Plan, PlanSpec, Resource, Time, TypeMeta,
};
use std::sync::Arc;

pub fn mk_plan(ns: &str, name: &str, kind: &str) -> Plan {
    Plan {
        metadata: ObjectMeta {
            namespace: Some(ns.to_string()),
            name: Some(name.to_string()),
            resource_version: Some("1".to_string()),
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

pub fn mk_cluster(ns: &str, name: &str) -> Cluster {
    Cluster {
        metadata: ObjectMeta {
            namespace: Some(ns.to_string()),
            name: Some(name.to_string()),
            resource_version: Some("1".to_string()),
            ..Default::default()
        },
        spec: ClusterSpec {
            kind: "GKE".to_string(),
            plan: "gke-dev".to_string(),
            configuration: serde_json::json!({}),
        },
    }
}

pub fn deleting<K: Resource>(mut obj: K) -> K {
    let ts = serde_json::from_value::<Time>(serde_json::json!("2024-05-01T12:00:00Z"))
        .expect("timestamp must parse");
    obj.meta_mut().deletion_timestamp = Some(ts);
    obj
}

pub fn mk_context() -> Context {
    Context::new(Arc::new(NoPlans))
}

struct NoPlans;

#[async_trait::async_trait]
impl ResourceClient for NoPlans {
    async fn get_plan(&self, _: &str) -> Result<Option<Plan>> {
        Ok(None)
    }
}

/// Serves a single, replaceable fetch result.
pub struct FakeFetch<K> {
    result: Mutex<Fetched<K>>,
    calls: Mutex<Vec<(Option<String>, String)>>,
}

#[derive(Clone)]
pub enum Fetched<K> {
    Found(K),
    Missing,
    Fail(&'static str),
}

impl<K> FakeFetch<K> {
    pub fn new(result: Fetched<K>) -> Arc<Self> {
        Arc::new(Self {
            result: Mutex::new(result),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn set(&self, result: Fetched<K>) {
        *self.result.lock() = result;
    }

    pub fn calls(&self) -> Vec<(Option<String>, String)> {
        self.calls.lock().clone()
    }
}

#[async_trait::async_trait]
impl<K: Clone + Send + Sync> Fetch<K> for FakeFetch<K> {
    async fn fetch(&self, namespace: Option<&str>, name: &str) -> Result<Option<K>> {
        self.calls
            .lock()
            .push((namespace.map(ToString::to_string), name.to_string()));
        match &*self.result.lock() {
            Fetched::Found(obj) => Ok(Some(obj.clone())),
            Fetched::Missing => Ok(None),
            Fetched::Fail(msg) => bail!("{msg}"),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Call {
    ScanPlan(String),
    ScanCluster(String),
    Archive(TypeMeta, ObjectMeta),
}

/// Records calls to the facade, failing them on demand.
#[derive(Default)]
pub struct FakeSecurity {
    calls: Mutex<Vec<Call>>,
    fail: Mutex<Option<&'static str>>,
}

impl FakeSecurity {
    pub fn failing(msg: &'static str) -> Self {
        Self {
            fail: Mutex::new(Some(msg)),
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    fn call(&self, call: Call) -> Result<()> {
        self.calls.lock().push(call);
        match *self.fail.lock() {
            Some(msg) => bail!("{msg}"),
            None => Ok(()),
        }
    }
}

#[async_trait::async_trait]
impl Security for FakeSecurity {
    async fn scan_plan(&self, _: &Context, plan: &Plan) -> Result<()> {
        self.call(Call::ScanPlan(plan.metadata.name.clone().unwrap_or_default()))
    }

    async fn scan_cluster(&self, _: &Context, cluster: &Cluster) -> Result<()> {
        self.call(Call::ScanCluster(
            cluster.metadata.name.clone().unwrap_or_default(),
        ))
    }

    async fn archive_resource_scans(
        &self,
        _: &Context,
        type_meta: &TypeMeta,
        meta: &ObjectMeta,
    ) -> Result<()> {
        self.call(Call::Archive(type_meta.clone(), meta.clone()))
    }
}
