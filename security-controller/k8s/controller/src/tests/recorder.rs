use super::*;
use crate::{Recorder, ScanMetrics};
use security_controller_core::{
    ClusterRule, MemoryStore, ResourceId, Rule, RuleResult, ScanContext, ScanStore, Scanner,
    Status, TargetKind,
};
use security_controller_k8s_api::type_meta;

/// Warns about every cluster.
struct WarnClusters;

impl Rule for WarnClusters {
    fn code(&self) -> &str {
        "TEST-01"
    }

    fn name(&self) -> &str {
        "Test"
    }

    fn description(&self) -> &str {
        ""
    }

    fn as_cluster_rule(&self) -> Option<&dyn ClusterRule> {
        Some(self)
    }
}

#[async_trait::async_trait]
impl ClusterRule for WarnClusters {
    async fn check_cluster(
        &self,
        _: &ScanContext<'_>,
        _: &Cluster,
    ) -> Result<Option<RuleResult>> {
        Ok(Some(RuleResult::warning("TEST-01", "warned")))
    }
}

fn mk_recorder() -> (Recorder, Arc<MemoryStore>, ScanMetrics) {
    let scanner = Scanner::new();
    scanner.register_rule(Arc::new(WarnClusters));
    let store = Arc::new(MemoryStore::new());
    let metrics = ScanMetrics::default();
    let recorder = Recorder::new(Arc::new(scanner), store.clone(), metrics.clone());
    (recorder, store, metrics)
}

#[tokio::test]
async fn records_scans() {
    let (recorder, store, metrics) = mk_recorder();
    let ctx = mk_context();
    let cluster = mk_cluster("team-a", "dev");
    let id = ResourceId::from_meta(&type_meta::<Cluster>(), &cluster.metadata);

    recorder.scan_cluster(&ctx, &cluster).await.unwrap();
    recorder.scan_cluster(&ctx, &cluster).await.unwrap();

    let current = store.current(&id).await.unwrap().expect("must be recorded");
    assert_eq!(current.id, 2);
    assert_eq!(current.owning_team, "team-a");
    assert_eq!(current.overall_status, Status::Warning);
    assert_eq!(store.history(&id).await.unwrap().len(), 2);
    assert_eq!(metrics.scans(TargetKind::Cluster, Status::Warning), 2);

    let plan = mk_plan("platform-admin", "gke-dev", "GKE");
    recorder.scan_plan(&ctx, &plan).await.unwrap();
    assert_eq!(metrics.scans(TargetKind::Plan, Status::Compliant), 1);
    assert_eq!(store.len(), 3);
}

#[tokio::test]
async fn archives_scans() {
    let (recorder, store, _) = mk_recorder();
    let ctx = mk_context();
    let cluster = mk_cluster("team-a", "dev");
    let id = ResourceId::from_meta(&type_meta::<Cluster>(), &cluster.metadata);

    recorder.scan_cluster(&ctx, &cluster).await.unwrap();
    recorder
        .archive_resource_scans(&ctx, &type_meta::<Cluster>(), &cluster.metadata)
        .await
        .unwrap();

    assert!(store.current(&id).await.unwrap().is_none());
    let history = store.history(&id).await.unwrap();
    assert_eq!(history.len(), 1);
    assert!(history[0].archived_at.is_some());

    // Archiving a resource without scans is not an error.
    let other = mk_cluster("team-a", "prod");
    recorder
        .archive_resource_scans(&ctx, &type_meta::<Cluster>(), &other.metadata)
        .await
        .unwrap();
}

#[tokio::test]
async fn cancelled_scans_are_not_recorded() {
    let (recorder, store, _) = mk_recorder();
    let ctx = mk_context();
    ctx.cancel_token().cancel();

    let err = recorder
        .scan_cluster(&ctx, &mk_cluster("team-a", "dev"))
        .await
        .unwrap_err();
    assert!(err
        .downcast_ref::<security_controller_core::Error>()
        .is_some());
    assert!(store.is_empty());
}
