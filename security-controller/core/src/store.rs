use crate::{ResourceId, ScanResult};
use anyhow::Result;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;

/// Persists scan results.
///
/// A resource has at most one current (unarchived) result: recording a new
/// result archives the previous current one.
#[async_trait::async_trait]
pub trait ScanStore: Send + Sync {
    /// Stores a new current result for its resource and returns it with its
    /// assigned id.
    async fn record(&self, scan: ScanResult) -> Result<ScanResult>;

    /// Archives every current result for the resource, returning how many
    /// were archived.
    async fn archive(&self, resource: &ResourceId) -> Result<usize>;

    async fn current(&self, resource: &ResourceId) -> Result<Option<ScanResult>>;

    /// Returns every result recorded for the resource, oldest first.
    async fn history(&self, resource: &ResourceId) -> Result<Vec<ScanResult>>;
}

/// A process-local [`ScanStore`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    last_id: u64,
    scans: Vec<ScanResult>,
}

// === impl MemoryStore ===

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.read().scans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait::async_trait]
impl ScanStore for MemoryStore {
    async fn record(&self, mut scan: ScanResult) -> Result<ScanResult> {
        let resource = scan.resource_id();
        let mut inner = self.inner.write();
        inner.archive(&resource, scan.checked_at);

        inner.last_id += 1;
        scan.id = inner.last_id;
        scan.archived_at = None;
        inner.scans.push(scan.clone());
        Ok(scan)
    }

    async fn archive(&self, resource: &ResourceId) -> Result<usize> {
        Ok(self.inner.write().archive(resource, Utc::now()))
    }

    async fn current(&self, resource: &ResourceId) -> Result<Option<ScanResult>> {
        Ok(self
            .inner
            .read()
            .scans
            .iter()
            .find(|scan| scan.is_current() && scan.resource_id() == *resource)
            .cloned())
    }

    async fn history(&self, resource: &ResourceId) -> Result<Vec<ScanResult>> {
        Ok(self
            .inner
            .read()
            .scans
            .iter()
            .filter(|scan| scan.resource_id() == *resource)
            .cloned()
            .collect())
    }
}

// === impl Inner ===

impl Inner {
    fn archive(&mut self, resource: &ResourceId, at: DateTime<Utc>) -> usize {
        let mut archived = 0;
        for scan in self.scans.iter_mut() {
            if scan.is_current() && scan.resource_id() == *resource {
                scan.archived_at = Some(at);
                archived += 1;
            }
        }
        archived
    }
}
