#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

pub mod annotations;
pub mod cluster;
pub mod plan;

pub use self::{
    cluster::{Cluster, ClusterSpec},
    plan::{Plan, PlanSpec},
};
pub use k8s_openapi::{apimachinery::pkg::apis::meta::v1::Time, NamespaceResourceScope};
pub use kube::{
    api::{Api, ObjectMeta, ResourceExt, TypeMeta},
    Client, Resource,
};

/// Builds the `TypeMeta` of a statically typed resource.
pub fn type_meta<T>() -> TypeMeta
where
    T: Resource<DynamicType = ()>,
{
    TypeMeta {
        api_version: T::api_version(&()).into_owned(),
        kind: T::kind(&()).into_owned(),
    }
}
