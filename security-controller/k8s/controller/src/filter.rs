use kube::runtime::{reflector::ObjectRef, watcher};
use security_controller_k8s_api::{annotations, Resource, ResourceExt};
use std::collections::{HashMap, HashSet};
use tracing::trace;

/// Decides which watch events trigger a reconcile.
pub trait EventFilter<K>: Send + 'static {
    fn create(&self, obj: &K) -> bool;

    fn update(&self, old: &K, new: &K) -> bool;

    fn delete(&self, obj: &K) -> bool;

    /// An object was observed again without having changed, e.g. when the
    /// watch is re-listed.
    fn generic(&self, obj: &K) -> bool;
}

/// Suppresses events for objects managed by the platform itself.
///
/// Updates are judged by the object as it was before the update.
#[derive(Copy, Clone, Debug, Default)]
pub struct SystemObjectFilter;

/// Turns a watch into create, update, delete and generic events and yields
/// the objects whose events pass the filter.
///
/// The tracker remembers the last version of every object it has seen so
/// that updates can be judged against the previous state.
pub struct Tracker<K: Resource, F> {
    filter: F,
    seen: HashMap<ObjectRef<K>, K>,
    relisted: Option<HashSet<ObjectRef<K>>>,
    removed: Vec<ObjectRef<K>>,
}

// === impl SystemObjectFilter ===

impl<K: Resource> EventFilter<K> for SystemObjectFilter {
    fn create(&self, obj: &K) -> bool {
        !annotations::is_system(obj.meta())
    }

    fn update(&self, old: &K, _: &K) -> bool {
        !annotations::is_system(old.meta())
    }

    fn delete(&self, obj: &K) -> bool {
        !annotations::is_system(obj.meta())
    }

    fn generic(&self, obj: &K) -> bool {
        !annotations::is_system(obj.meta())
    }
}

// === impl Tracker ===

impl<K, F> Tracker<K, F>
where
    K: Resource<DynamicType = ()> + Clone,
    F: EventFilter<K>,
{
    pub fn new(filter: F) -> Self {
        Self {
            filter,
            seen: HashMap::new(),
            relisted: None,
            removed: Vec::new(),
        }
    }

    /// The number of objects currently known to exist.
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    /// Returns the objects found deleted since the last call, whether or not
    /// their deletion passed the filter.
    pub fn take_removed(&mut self) -> Vec<ObjectRef<K>> {
        std::mem::take(&mut self.removed)
    }

    /// Processes a watch event, returning the objects to reconcile.
    pub fn observe(&mut self, event: watcher::Event<K>) -> Vec<K> {
        match event {
            watcher::Event::Apply(obj) => self.apply(obj).into_iter().collect(),
            watcher::Event::Delete(obj) => {
                let key = ObjectRef::from_obj(&obj);
                self.seen.remove(&key);
                self.removed.push(key);
                self.deleted(obj).into_iter().collect()
            }
            watcher::Event::Init => {
                self.relisted = Some(HashSet::new());
                Vec::new()
            }
            watcher::Event::InitApply(obj) => {
                if let Some(relisted) = self.relisted.as_mut() {
                    relisted.insert(ObjectRef::from_obj(&obj));
                }
                self.apply(obj).into_iter().collect()
            }
            watcher::Event::InitDone => {
                // Objects missing from the new listing were deleted while the
                // watch was down.
                let Some(relisted) = self.relisted.take() else {
                    return Vec::new();
                };
                let gone = self
                    .seen
                    .keys()
                    .filter(|key| !relisted.contains(*key))
                    .cloned()
                    .collect::<Vec<_>>();
                let removed = gone
                    .into_iter()
                    .filter_map(|key| self.seen.remove(&key))
                    .collect::<Vec<_>>();
                self.removed
                    .extend(removed.iter().map(ObjectRef::from_obj));
                removed
                    .into_iter()
                    .filter_map(|obj| self.deleted(obj))
                    .collect()
            }
        }
    }

    fn apply(&mut self, obj: K) -> Option<K> {
        let key = ObjectRef::from_obj(&obj);
        let pass = match self.seen.get(&key) {
            None => {
                trace!(object = %key, "Create");
                self.filter.create(&obj)
            }
            Some(old) if old.resource_version() == obj.resource_version() => {
                trace!(object = %key, "Generic");
                self.filter.generic(&obj)
            }
            Some(old) => {
                trace!(object = %key, "Update");
                self.filter.update(old, &obj)
            }
        };
        self.seen.insert(key, obj.clone());
        pass.then_some(obj)
    }

    fn deleted(&self, obj: K) -> Option<K> {
        trace!(object = %ObjectRef::from_obj(&obj), "Delete");
        self.filter.delete(&obj).then_some(obj)
    }
}
