use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// An administrator-defined template describing how to provision a cluster.
///
/// `kind` names the provider (`GKE`, `EKS`, ...) and selects how
/// `configuration` is interpreted.
#[derive(Clone, Debug, PartialEq, CustomResource, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "config.platform.io",
    version = "v1",
    kind = "Plan",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct PlanSpec {
    pub kind: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub configuration: serde_json::Value,
}
