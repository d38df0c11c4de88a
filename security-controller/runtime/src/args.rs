use crate::{
    controller::{
        self, ControllerMetrics, PlanClient, Reconciler, Recorder, ScanMetrics, Security,
        SystemObjectFilter, Target,
    },
    core::{Context, MemoryStore, Scanner},
    k8s::{Cluster, Plan},
    policies,
};
use anyhow::{bail, Result};
use clap::Parser;
use futures::Stream;
use kube::runtime::watcher;
use prometheus_client::registry::Registry;
use std::{path::PathBuf, sync::Arc, time::Duration};
use tokio_util::sync::CancellationToken;
use tracing::{info, info_span, Instrument};

#[derive(Debug, Parser)]
#[clap(name = "security", about = "A compliance scanning controller for plans and clusters")]
pub struct Args {
    #[clap(
        long,
        default_value = "security=info,warn",
        env = "SECURITY_CONTROLLER_LOG"
    )]
    log_level: kubert::LogFilter,

    #[clap(long, default_value = "plain")]
    log_format: kubert::LogFormat,

    #[clap(flatten)]
    client: kubert::ClientArgs,

    #[clap(flatten)]
    admin: kubert::AdminArgs,

    /// A directory of additional policy bundles, loaded after the built-in
    /// bundles.
    #[clap(long, env = "SECURITY_CONTROLLER_POLICY_BUNDLE_DIR")]
    policy_bundle_dir: Option<PathBuf>,

    /// Disables the policy bundles compiled into the controller.
    #[clap(long)]
    disable_builtin_bundles: bool,

    /// The maximum time a single rule may take to evaluate. Zero disables the
    /// limit.
    #[clap(long, default_value = "5000")]
    rule_timeout_ms: u64,

    /// The namespace in which plans are created.
    #[clap(long, default_value = "platform-admin")]
    plans_namespace: String,

    #[clap(long, default_value = "8")]
    max_concurrent_reconciles: u16,
}

impl Args {
    #[inline]
    pub async fn parse_and_run() -> Result<()> {
        Self::parse().run().await
    }

    pub async fn run(self) -> Result<()> {
        let Self {
            admin,
            client,
            log_level,
            log_format,
            policy_bundle_dir,
            disable_builtin_bundles,
            rule_timeout_ms,
            plans_namespace,
            max_concurrent_reconciles,
        } = self;

        let mut prom = <Registry>::default();
        let controller_metrics =
            ControllerMetrics::register(prom.sub_registry_with_prefix("security_controller"));
        let scan_metrics = ScanMetrics::register(prom.sub_registry_with_prefix("security"));
        let rt_metrics = kubert::RuntimeMetrics::register(prom.sub_registry_with_prefix("kube"));

        let mut runtime = kubert::Runtime::builder()
            .with_log(log_level, log_format)
            .with_metrics(rt_metrics)
            .with_admin(admin.into_builder().with_prometheus(prom))
            .with_client(client)
            .build()
            .await?;

        // Rules are loaded before any controller starts so that an invalid
        // bundle fails startup.
        let mut scanner = Scanner::new();
        if rule_timeout_ms > 0 {
            scanner = scanner.with_rule_timeout(Duration::from_millis(rule_timeout_ms));
        }
        policies::register(
            &scanner,
            !disable_builtin_bundles,
            policy_bundle_dir.as_deref(),
        )?;

        let cancel = CancellationToken::new();
        let ctx = Context::new(Arc::new(PlanClient::new(
            runtime.client(),
            &plans_namespace,
        )))
        .with_cancel(cancel.clone());
        let security: Arc<dyn Security> = Arc::new(Recorder::new(
            Arc::new(scanner),
            Arc::new(MemoryStore::new()),
            scan_metrics,
        ));

        let plans = runtime.watch_all::<Plan>(watcher::Config::default());
        let reconciler = Reconciler::<Plan>::new(
            Arc::new(runtime.client()),
            security.clone(),
            ctx.clone(),
            controller_metrics.clone(),
        );
        tokio::spawn(
            reconcile(
                plans,
                reconciler,
                max_concurrent_reconciles,
                cancel.clone(),
                runtime.shutdown_handle(),
            )
            .instrument(info_span!("security-plan")),
        );

        let clusters = runtime.watch_all::<Cluster>(watcher::Config::default());
        let reconciler = Reconciler::<Cluster>::new(
            Arc::new(runtime.client()),
            security,
            ctx,
            controller_metrics,
        );
        tokio::spawn(
            reconcile(
                clusters,
                reconciler,
                max_concurrent_reconciles,
                cancel,
                runtime.shutdown_handle(),
            )
            .instrument(info_span!("security-cluster")),
        );

        // Block the main thread on the shutdown signal. Once it fires, wait for the background tasks to
        // complete before exiting.
        if runtime.run().await.is_err() {
            bail!("Aborted");
        }

        Ok(())
    }
}

/// Runs a controller until shutdown. In-flight scans are cancelled once
/// shutdown begins.
async fn reconcile<K: Target>(
    events: impl Stream<Item = watcher::Event<K>> + Send + 'static,
    reconciler: Reconciler<K>,
    concurrency: u16,
    cancel: CancellationToken,
    drain: drain::Watch,
) {
    let run = controller::run(events, SystemObjectFilter, Arc::new(reconciler), concurrency);
    tokio::pin!(run);

    tokio::select! {
        () = &mut run => {}
        handle = drain.signaled() => {
            info!(controller = K::CONTROLLER, "Shutting down");
            cancel.cancel();
            handle.release_after(run).await;
        }
    }
}
