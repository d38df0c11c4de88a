use crate::ScanMetrics;
use anyhow::Result;
use security_controller_core::{Context, ResourceId, ScanResult, ScanStore, Scanner, TargetKind};
use security_controller_k8s_api::{Cluster, ObjectMeta, Plan, TypeMeta};
use std::sync::Arc;
use tracing::{debug, info};

/// Scans resources and persists the results.
#[async_trait::async_trait]
pub trait Security: Send + Sync {
    async fn scan_plan(&self, ctx: &Context, plan: &Plan) -> Result<()>;

    async fn scan_cluster(&self, ctx: &Context, cluster: &Cluster) -> Result<()>;

    /// Marks every current scan of the resource as archived.
    async fn archive_resource_scans(
        &self,
        ctx: &Context,
        type_meta: &TypeMeta,
        meta: &ObjectMeta,
    ) -> Result<()>;
}

/// Implements [`Security`] by scanning with a [`Scanner`] and recording the
/// results in a [`ScanStore`].
#[derive(Clone)]
pub struct Recorder {
    scanner: Arc<Scanner>,
    store: Arc<dyn ScanStore>,
    metrics: ScanMetrics,
}

// === impl Recorder ===

impl Recorder {
    pub fn new(scanner: Arc<Scanner>, store: Arc<dyn ScanStore>, metrics: ScanMetrics) -> Self {
        Self {
            scanner,
            store,
            metrics,
        }
    }

    async fn record(&self, kind: TargetKind, scan: ScanResult) -> Result<()> {
        let scan = self.store.record(scan).await?;
        self.metrics.recorded(kind, &scan);
        info!(
            id = scan.id,
            resource = %scan.resource_id(),
            status = %scan.overall_status,
            results = scan.results.len(),
            "Recorded scan"
        );
        Ok(())
    }
}

#[async_trait::async_trait]
impl Security for Recorder {
    async fn scan_plan(&self, ctx: &Context, plan: &Plan) -> Result<()> {
        let scan = self.scanner.scan_plan(ctx, plan).await?;
        self.record(TargetKind::Plan, scan).await
    }

    async fn scan_cluster(&self, ctx: &Context, cluster: &Cluster) -> Result<()> {
        let scan = self.scanner.scan_cluster(ctx, cluster).await?;
        self.record(TargetKind::Cluster, scan).await
    }

    async fn archive_resource_scans(
        &self,
        _: &Context,
        type_meta: &TypeMeta,
        meta: &ObjectMeta,
    ) -> Result<()> {
        let resource = ResourceId::from_meta(type_meta, meta);
        let archived = self.store.archive(&resource).await?;
        debug!(%resource, archived, "Archived scans");
        Ok(())
    }
}
