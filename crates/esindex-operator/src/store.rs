//! Access to the Kubernetes objects a reconcile pass reads and writes.
//!
//! The controller only talks to the API server through [`ResourceStore`] so
//! the reconcile logic can be exercised against a mock in tests.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{ConfigMap, Secret};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::{
    Api, Client,
    api::{Patch, PatchParams},
};

#[cfg(test)]
use mockall::automock;

use crate::{
    crds::{
        binding::Binding,
        esindex::{EsIndex, EsIndexStatus},
    },
    error::ReconcileError,
};

pub const FIELD_MANAGER: &str = "esindex-operator";

#[cfg_attr(test, automock)]
#[async_trait]
pub trait ResourceStore: Send + Sync {
    /// Binding by name, `None` if it does not exist
    async fn get_binding(&self, ns: &str, name: &str) -> Result<Option<Binding>, ReconcileError>;

    async fn get_secret(&self, ns: &str, name: &str) -> Result<Option<Secret>, ReconcileError>;

    async fn get_config_map(
        &self,
        ns: &str,
        name: &str,
    ) -> Result<Option<ConfigMap>, ReconcileError>;

    /// Replace the finalizer list of an EsIndex
    async fn set_finalizers(
        &self,
        ns: &str,
        name: &str,
        finalizers: Vec<String>,
    ) -> Result<(), ReconcileError>;

    /// Replace the owner reference list of an EsIndex
    async fn set_owner_references(
        &self,
        ns: &str,
        name: &str,
        refs: Vec<OwnerReference>,
    ) -> Result<(), ReconcileError>;

    async fn patch_status(
        &self,
        ns: &str,
        name: &str,
        status: &EsIndexStatus,
    ) -> Result<(), ReconcileError>;
}

/// [`ResourceStore`] backed by the API server.
#[derive(Clone)]
pub struct KubeStore {
    client: Client,
}

impl KubeStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn indexes(&self, ns: &str) -> Api<EsIndex> {
        Api::namespaced(self.client.clone(), ns)
    }
}

#[async_trait]
impl ResourceStore for KubeStore {
    async fn get_binding(&self, ns: &str, name: &str) -> Result<Option<Binding>, ReconcileError> {
        let api: Api<Binding> = Api::namespaced(self.client.clone(), ns);
        Ok(api.get_opt(name.trim()).await?)
    }

    async fn get_secret(&self, ns: &str, name: &str) -> Result<Option<Secret>, ReconcileError> {
        let api: Api<Secret> = Api::namespaced(self.client.clone(), ns);
        Ok(api.get_opt(name.trim()).await?)
    }

    async fn get_config_map(
        &self,
        ns: &str,
        name: &str,
    ) -> Result<Option<ConfigMap>, ReconcileError> {
        let api: Api<ConfigMap> = Api::namespaced(self.client.clone(), ns);
        Ok(api.get_opt(name.trim()).await?)
    }

    async fn set_finalizers(
        &self,
        ns: &str,
        name: &str,
        finalizers: Vec<String>,
    ) -> Result<(), ReconcileError> {
        let pp = PatchParams::default();
        let patch = serde_json::json!({"metadata": {"finalizers": finalizers}});
        let _ = self
            .indexes(ns)
            .patch(name, &pp, &Patch::Merge(&patch))
            .await?;
        Ok(())
    }

    async fn set_owner_references(
        &self,
        ns: &str,
        name: &str,
        refs: Vec<OwnerReference>,
    ) -> Result<(), ReconcileError> {
        let pp = PatchParams::default();
        let patch = serde_json::json!({"metadata": {"ownerReferences": refs}});
        let _ = self
            .indexes(ns)
            .patch(name, &pp, &Patch::Merge(&patch))
            .await?;
        Ok(())
    }

    async fn patch_status(
        &self,
        ns: &str,
        name: &str,
        status: &EsIndexStatus,
    ) -> Result<(), ReconcileError> {
        let pp = PatchParams::apply(FIELD_MANAGER);
        let _ = self
            .indexes(ns)
            .patch_status(name, &pp, &Patch::Merge(serde_json::json!({ "status": status })))
            .await?;
        Ok(())
    }
}
