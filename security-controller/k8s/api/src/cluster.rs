use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A live, team-owned cluster instantiated from a [`Plan`](crate::Plan).
///
/// Clusters live in their owning team's namespace.
#[derive(Clone, Debug, PartialEq, CustomResource, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "clusters.platform.io",
    version = "v1",
    kind = "Cluster",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSpec {
    pub kind: String,
    /// The name of the plan this cluster was created from.
    #[serde(default)]
    pub plan: String,
    #[serde(default)]
    pub configuration: serde_json::Value,
}
