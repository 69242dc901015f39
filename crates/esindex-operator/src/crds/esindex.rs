use k8s_openapi::api::core::v1::{ConfigMapKeySelector, SecretKeySelector};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::ReconcileError;

#[derive(CustomResource, Debug, Serialize, Deserialize, Clone, JsonSchema)]
#[kube(
    group = "ibmcloud.ibm.com",
    version = "v1alpha1",
    kind = "EsIndex",
    plural = "esindices",
    namespaced,
    status = "EsIndexStatus",
    shortname = "esi",
    printcolumn = r#"{"name":"State","type":"string","jsonPath":".status.state"}"#,
    printcolumn = r#"{"name":"Index","type":"string","jsonPath":".spec.indexName"}"#,
    printcolumn = r#"{"name":"Message","type":"string","jsonPath":".status.message"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct EsIndexSpec {
    /// Name of the index on Elasticsearch
    pub index_name: String,
    /// Binding resource whose secret holds the Elasticsearch credentials
    #[serde(default, skip_serializing_if = "BindingSource::is_empty")]
    pub binding_from: BindingSource,
    /// URI in the form https://<user>:<passwd>@hostname:port, read from a
    /// Secret or ConfigMap key. Cannot be combined with bindingFrom.
    #[serde(
        default,
        rename = "esURIComposed",
        skip_serializing_if = "UriSource::is_empty"
    )]
    pub es_uri_composed: UriSource,
    /// Bind to an existing index instead of creating it
    #[serde(default)]
    pub bind_only: bool,
    #[serde(default = "default_count")]
    pub number_of_shards: i64,
    #[serde(default = "default_count")]
    pub number_of_replicas: i64,
}

fn default_count() -> i64 {
    1
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, JsonSchema)]
pub struct BindingSource {
    /// Name of the Binding in the same namespace
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl BindingSource {
    /// The trimmed binding name, if one is set.
    pub fn name(&self) -> Option<&str> {
        self.name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
    }

    fn is_empty(&self) -> bool {
        self.name().is_none()
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct UriSource {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_key_ref: Option<SecretKeySelector>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_map_key_ref: Option<ConfigMapKeySelector>,
}

impl UriSource {
    fn is_empty(&self) -> bool {
        self.secret_key_ref.is_none() && self.config_map_key_ref.is_none()
    }
}

/// Where the connection URI comes from when it is not taken from a Binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialSource {
    FromSecret { secret_name: String, key: String },
    FromConfig { config_name: String, key: String },
    Empty,
}

impl TryFrom<&UriSource> for CredentialSource {
    type Error = ReconcileError;

    fn try_from(src: &UriSource) -> Result<Self, Self::Error> {
        match (&src.secret_key_ref, &src.config_map_key_ref) {
            (Some(_), Some(_)) => Err(ReconcileError::ConflictingCredentialSource),
            (Some(s), None) => Ok(CredentialSource::FromSecret {
                secret_name: s.name.trim().to_string(),
                key: s.key.clone(),
            }),
            (None, Some(c)) => Ok(CredentialSource::FromConfig {
                config_name: c.name.trim().to_string(),
                key: c.key.clone(),
            }),
            (None, None) => Ok(CredentialSource::Empty),
        }
    }
}

/// Validated view of how a pass obtains its connection URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialPlan {
    Binding(String),
    Source(CredentialSource),
}

impl EsIndexSpec {
    /// Checks that exactly one credential source is declared.
    pub fn credential_plan(&self) -> Result<CredentialPlan, ReconcileError> {
        let source = CredentialSource::try_from(&self.es_uri_composed)?;
        match (self.binding_from.name(), source) {
            (Some(_), CredentialSource::FromSecret { .. } | CredentialSource::FromConfig { .. }) => {
                Err(ReconcileError::ConflictingCredentialSource)
            }
            (Some(binding), CredentialSource::Empty) => {
                Ok(CredentialPlan::Binding(binding.to_string()))
            }
            (None, CredentialSource::Empty) => Err(ReconcileError::MissingCredentialSource),
            (None, source) => Ok(CredentialPlan::Source(source)),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, Default, PartialEq, Eq, JsonSchema)]
pub enum IndexState {
    #[default]
    #[serde(rename = "")]
    Unset,
    Pending,
    Online,
    Failed,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, JsonSchema)]
pub struct EsIndexStatus {
    #[serde(default)]
    pub state: IndexState,
    /// Empty unless the last pass failed; always serialized so a merge patch clears it
    #[serde(default)]
    pub message: String,
    /// Generation of the spec this status reflects
    #[serde(default, rename = "generation")]
    pub observed_generation: i64,
}

impl EsIndexStatus {
    pub fn new(state: IndexState, message: impl Into<String>, observed_generation: i64) -> Self {
        Self {
            state,
            message: message.into(),
            observed_generation,
        }
    }
}

impl EsIndex {
    pub fn state(&self) -> IndexState {
        self.status.as_ref().map(|s| s.state).unwrap_or_default()
    }
}
