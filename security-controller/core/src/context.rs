use anyhow::Result;
use security_controller_k8s_api::Plan;
use std::{fmt, sync::Arc};
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};

/// Looks up auxiliary resources on behalf of rules.
#[async_trait::async_trait]
pub trait ResourceClient: Send + Sync {
    /// Resolves a plan by name, returning `None` if it does not exist.
    async fn get_plan(&self, name: &str) -> Result<Option<Plan>>;
}

/// Caller-provided state for a scan.
#[derive(Clone)]
pub struct Context {
    client: Arc<dyn ResourceClient>,
    cancel: CancellationToken,
}

/// The kind of resource being scanned.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum TargetKind {
    Plan,
    Cluster,
}

/// Per-target state shared by every rule evaluated within one scan.
pub struct ScanContext<'a> {
    ctx: &'a Context,
    kind: TargetKind,
    snapshot: serde_json::Value,
}

// === impl Context ===

impl Context {
    pub fn new(client: Arc<dyn ResourceClient>) -> Self {
        Self {
            client,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn client(&self) -> &dyn ResourceClient {
        &*self.client
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}

// === impl TargetKind ===

impl TargetKind {
    /// The key under which policy programs report violations for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Plan => "plan",
            Self::Cluster => "cluster",
        }
    }
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// === impl ScanContext ===

impl<'a> ScanContext<'a> {
    pub(crate) fn new(ctx: &'a Context, kind: TargetKind, snapshot: serde_json::Value) -> Self {
        Self {
            ctx,
            kind,
            snapshot,
        }
    }

    pub fn client(&self) -> &dyn ResourceClient {
        self.ctx.client()
    }

    /// The runtime kind of the target under scan.
    pub fn kind(&self) -> TargetKind {
        self.kind
    }

    /// The target serialized as JSON, as it would be returned by the API
    /// server.
    pub fn snapshot(&self) -> &serde_json::Value {
        &self.snapshot
    }

    pub fn is_cancelled(&self) -> bool {
        self.ctx.cancel.is_cancelled()
    }

    /// Completes when the scan is cancelled.
    pub fn cancelled(&self) -> WaitForCancellationFuture<'_> {
        self.ctx.cancel.cancelled()
    }
}
