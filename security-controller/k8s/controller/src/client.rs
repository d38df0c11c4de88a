use anyhow::Result;
use security_controller_core::ResourceClient;
use security_controller_k8s_api::{Api, Client, Plan};

/// Resolves plans from the namespace in which the platform keeps them.
#[derive(Clone)]
pub struct PlanClient {
    api: Api<Plan>,
}

impl PlanClient {
    pub fn new(client: Client, namespace: &str) -> Self {
        Self {
            api: Api::namespaced(client, namespace),
        }
    }
}

#[async_trait::async_trait]
impl ResourceClient for PlanClient {
    async fn get_plan(&self, name: &str) -> Result<Option<Plan>> {
        Ok(self.api.get_opt(name).await?)
    }
}
