use crate::{Backoff, ControllerMetrics, EventFilter, Fetch, Security, Target, Tracker};
use futures::prelude::*;
use kube::runtime::{
    controller::{self, Action},
    reflector::{self, ObjectRef},
    watcher, Controller,
};
use parking_lot::Mutex;
use security_controller_core::Context;
use security_controller_k8s_api::type_meta;
use std::{fmt, sync::Arc, time::Duration};
use tracing::{debug, error, info, instrument, warn};

/// How a reconcile completed.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// The object no longer exists.
    NotFound,

    /// The object is being deleted and its scans were archived.
    Archived,

    /// The object was scanned and the result recorded.
    Scanned,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to fetch {object}")]
    Fetch {
        object: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to scan {object}")]
    Scan {
        object: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to archive scans of {object}")]
    Archive {
        object: String,
        #[source]
        source: anyhow::Error,
    },
}

/// Reconciles objects of a single [`Target`] kind.
pub struct Reconciler<K: Target> {
    fetch: Arc<dyn Fetch<K>>,
    security: Arc<dyn Security>,
    ctx: Context,
    backoff: Mutex<Backoff<ObjectRef<K>>>,
    metrics: ControllerMetrics,
}

/// Runs a controller over a stream of watch events until the stream ends and
/// every in-flight reconcile has completed.
pub async fn run<K, F>(
    events: impl Stream<Item = watcher::Event<K>> + Send + 'static,
    filter: F,
    reconciler: Arc<Reconciler<K>>,
    concurrency: u16,
) where
    K: Target,
    F: EventFilter<K>,
{
    let (store, writer) = reflector::store();
    let mut tracker = Tracker::new(filter);
    let forget = reconciler.clone();
    let triggers = reflector::reflector(writer, events.map(Ok)).flat_map(move |event| {
        let objects = match event {
            Ok(event) => tracker.observe(event),
            Err(_) => Vec::new(),
        };
        // Deleted objects are dropped from the store, so they are never
        // reconciled again to clear their retry state.
        for obj in tracker.take_removed() {
            forget.forget(&obj);
        }
        stream::iter(objects.into_iter().map(Ok))
    });

    info!(controller = K::CONTROLLER, "Starting");
    Controller::for_stream(triggers, store)
        .with_config(controller::Config::default().concurrency(concurrency))
        .run(reconcile::<K>, error_policy::<K>, reconciler)
        .for_each(|res| {
            match res {
                Ok((object, _)) => debug!(%object, "Reconciled"),
                // Reconcile errors are logged as they occur.
                Err(controller::Error::ReconcilerFailed(..)) => {}
                Err(error) => warn!(%error, "Controller error"),
            }
            future::ready(())
        })
        .await;
    info!(controller = K::CONTROLLER, "Stopped");
}

async fn reconcile<K: Target>(obj: Arc<K>, reconciler: Arc<Reconciler<K>>) -> Result<Action, Error> {
    reconciler.reconcile(&ObjectRef::from_obj(&*obj)).await?;
    Ok(Action::await_change())
}

fn error_policy<K: Target>(obj: Arc<K>, _: &Error, reconciler: Arc<Reconciler<K>>) -> Action {
    Action::requeue(reconciler.retry_after(&ObjectRef::from_obj(&*obj)))
}

// === impl Outcome ===

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::Archived => "archived",
            Self::Scanned => "scanned",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// === impl Reconciler ===

impl<K: Target> Reconciler<K> {
    pub fn new(
        fetch: Arc<dyn Fetch<K>>,
        security: Arc<dyn Security>,
        ctx: Context,
        metrics: ControllerMetrics,
    ) -> Self {
        Self {
            fetch,
            security,
            ctx,
            backoff: Mutex::new(Backoff::default()),
            metrics,
        }
    }

    pub fn with_backoff(mut self, backoff: Backoff<ObjectRef<K>>) -> Self {
        self.backoff = Mutex::new(backoff);
        self
    }

    /// Fetches the object and either archives its scans or scans it.
    ///
    /// Errors are logged and returned so that the object is retried.
    #[instrument(
        skip_all,
        fields(
            controller = K::CONTROLLER,
            namespace = obj.namespace.as_deref().unwrap_or_default(),
            name = %obj.name,
        )
    )]
    pub async fn reconcile(&self, obj: &ObjectRef<K>) -> Result<Outcome, Error> {
        let res = self.reconcile_inner(obj).await;
        match &res {
            Ok(outcome) => {
                debug!(%outcome);
                self.backoff.lock().reset(obj);
            }
            Err(error) => error!(error = %DisplayChain(error), "Reconcile failed"),
        }
        self.metrics
            .reconciled(K::CONTROLLER, res.as_ref().ok().copied());
        res
    }

    async fn reconcile_inner(&self, obj: &ObjectRef<K>) -> Result<Outcome, Error> {
        let object = format!("{} {}", K::kind(&()), Key(obj));
        let current = self
            .fetch
            .fetch(obj.namespace.as_deref(), &obj.name)
            .await
            .map_err(|source| Error::Fetch {
                object: object.clone(),
                source,
            })?;
        let Some(current) = current else {
            return Ok(Outcome::NotFound);
        };

        if current.meta().deletion_timestamp.is_some() {
            self.security
                .archive_resource_scans(&self.ctx, &type_meta::<K>(), current.meta())
                .await
                .map_err(|source| Error::Archive { object, source })?;
            return Ok(Outcome::Archived);
        }

        current
            .scan(&*self.security, &self.ctx)
            .await
            .map_err(|source| Error::Scan { object, source })?;
        Ok(Outcome::Scanned)
    }

    /// Drops the retry state of an object that no longer exists.
    pub fn forget(&self, obj: &ObjectRef<K>) {
        self.backoff.lock().reset(obj);
    }

    /// Returns how long to wait before retrying a failed object.
    pub fn retry_after(&self, obj: &ObjectRef<K>) -> Duration {
        self.backoff.lock().next(obj.clone())
    }
}

struct Key<'a, K: Target>(&'a ObjectRef<K>);

impl<K: Target> fmt::Display for Key<'_, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.namespace.as_deref() {
            Some(ns) => write!(f, "{ns}/{}", self.0.name),
            None => f.write_str(&self.0.name),
        }
    }
}

/// Formats an error with its sources.
struct DisplayChain<'a>(&'a Error);

impl fmt::Display for DisplayChain<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)?;
        let mut source = std::error::Error::source(self.0);
        while let Some(error) = source {
            write!(f, ": {error}")?;
            source = error.source();
        }
        Ok(())
    }
}
