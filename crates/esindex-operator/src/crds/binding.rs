use kube::{CustomResource, ResourceExt};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Service binding owned by the cloud operator. Only read here: the secret it
/// points at carries the Elasticsearch connection, and its owner references
/// tell us who the managed index belongs to.
#[derive(CustomResource, Debug, Serialize, Deserialize, Clone, Default, JsonSchema)]
#[kube(
    group = "ibmcloud.ibm.com",
    version = "v1alpha1",
    kind = "Binding",
    plural = "bindings",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct BindingSpec {
    #[serde(default)]
    pub service_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_namespace: Option<String>,
    /// Secret holding the credentials; defaults to the binding name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

impl Binding {
    /// Name of the secret carrying the connection blob.
    pub fn credentials_secret(&self) -> String {
        match self.spec.secret_name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => self.name_any(),
        }
    }
}
