use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("neither bindingFrom nor esURIComposed is specified, must specify one of them")]
    MissingCredentialSource,
    #[error("more than one credential source is specified, must specify only one of them")]
    ConflictingCredentialSource,
    #[error("elastic search uri not found: {0}")]
    EsUriNotFound(String),
    #[error("elastic search uri is not a valid URL")]
    InvalidUri,
    #[error("binding {name} not found in namespace {namespace}")]
    BindingNotFound { namespace: String, name: String },
    #[error("secret {name} not found in namespace {namespace}")]
    SecretNotFound { namespace: String, name: String },
    #[error("configmap {name} not found in namespace {namespace}")]
    ConfigMapNotFound { namespace: String, name: String },
    #[error("binding {0} has no owner references")]
    BindingHasNoOwner(String),
    #[error("resource has no namespace")]
    MissingNamespace,
    #[error("elastic search returned {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error(transparent)]
    Transport(#[from] reqwest::Error),
    #[error(transparent)]
    Kube(#[from] kube::Error),
}

/// Coarse classification used to decide whether a failed pass is worth retrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Will not succeed until the spec or the referenced data changes.
    Configuration,
    /// A referenced object is missing or the API server is unavailable.
    Lookup,
    /// Elasticsearch rejected the request or could not be reached.
    Remote,
    /// Owner reference propagation failed.
    Ownership,
}

impl ReconcileError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingCredentialSource
            | Self::ConflictingCredentialSource
            | Self::EsUriNotFound(_)
            | Self::InvalidUri => ErrorKind::Configuration,
            Self::BindingNotFound { .. }
            | Self::SecretNotFound { .. }
            | Self::ConfigMapNotFound { .. }
            | Self::MissingNamespace
            | Self::Kube(_) => ErrorKind::Lookup,
            Self::Rejected { .. } | Self::Transport(_) => ErrorKind::Remote,
            Self::BindingHasNoOwner(_) => ErrorKind::Ownership,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind() != ErrorKind::Configuration
    }
}
