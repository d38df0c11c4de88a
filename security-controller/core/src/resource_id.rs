use security_controller_k8s_api::{ObjectMeta, TypeMeta};
use std::fmt;

/// Identifies a scanned resource independently of its revision.
#[derive(Clone, Debug, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub struct ResourceId {
    pub api_version: String,
    pub kind: String,
    pub namespace: String,
    pub name: String,
}

impl ResourceId {
    pub fn new(
        api_version: impl ToString,
        kind: impl ToString,
        namespace: impl ToString,
        name: impl ToString,
    ) -> Self {
        Self {
            api_version: api_version.to_string(),
            kind: kind.to_string(),
            namespace: namespace.to_string(),
            name: name.to_string(),
        }
    }

    pub fn from_meta(type_meta: &TypeMeta, meta: &ObjectMeta) -> Self {
        Self {
            api_version: type_meta.api_version.clone(),
            kind: type_meta.kind.clone(),
            namespace: meta.namespace.clone().unwrap_or_default(),
            name: meta.name.clone().unwrap_or_default(),
        }
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.name)?;
        if !self.namespace.is_empty() {
            write!(f, ".{}", self.namespace)?;
        }
        Ok(())
    }
}
