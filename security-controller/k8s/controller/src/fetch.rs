use anyhow::{anyhow, Result};
use security_controller_k8s_api::{Api, Client, NamespaceResourceScope, Resource};
use serde::de::DeserializeOwned;
use std::fmt::Debug;

/// Loads the current state of an object.
#[async_trait::async_trait]
pub trait Fetch<K>: Send + Sync {
    /// Returns `None` when the object does not exist.
    async fn fetch(&self, namespace: Option<&str>, name: &str) -> Result<Option<K>>;
}

#[async_trait::async_trait]
impl<K> Fetch<K> for Client
where
    K: Resource<DynamicType = (), Scope = NamespaceResourceScope>,
    K: Clone + DeserializeOwned + Debug + Send + Sync + 'static,
{
    async fn fetch(&self, namespace: Option<&str>, name: &str) -> Result<Option<K>> {
        let namespace =
            namespace.ok_or_else(|| anyhow!("{} {name} has no namespace", K::kind(&())))?;
        let api = Api::<K>::namespaced(self.clone(), namespace);
        Ok(api.get_opt(name).await?)
    }
}
