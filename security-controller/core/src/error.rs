use crate::ResourceId;

/// Failures of the scanning machinery itself, as opposed to failures of an
/// individual rule (which are recorded as `Failure` results).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to snapshot {resource} for evaluation")]
    Snapshot {
        resource: ResourceId,
        #[source]
        source: serde_json::Error,
    },

    #[error("scan of {0} was cancelled")]
    Cancelled(ResourceId),
}
