use kube::{
    Api, Client, ResourceExt,
    runtime::controller::{Action, Controller},
};
use std::sync::Arc;
use tokio::time::Duration;
use tracing::{Span, debug, error, info, info_span, warn};

use crate::{
    config::Config,
    credentials::CredentialResolver,
    crds::esindex::{EsIndex, EsIndexStatus, IndexState},
    error::ReconcileError,
    es::{EsClient, IndexSettings, RestResult, remote_delete_skipped},
    owner::OwnerLinker,
    store::ResourceStore,
};

pub struct Ctx {
    pub store: Arc<dyn ResourceStore>,
    pub es: EsClient,
    pub config: Config,
}

pub fn controller(client: Client, config: &Config) -> Controller<EsIndex> {
    let api: Api<EsIndex> = match &config.watch_namespace {
        Some(ns) => Api::namespaced(client, ns),
        None => Api::all(client),
    };
    Controller::new(api, Default::default()).shutdown_on_signal()
}

pub const FINALIZER: &str = "esindex.ibmcloud.ibm.com/finalizer";

// Pending is written on its own pass; pick the work up right after.
const PENDING_REQUEUE: Duration = Duration::from_secs(1);

pub async fn reconcile(idx: Arc<EsIndex>, ctx: Arc<Ctx>) -> Result<Action, ReconcileError> {
    let ns = idx.namespace().ok_or(ReconcileError::MissingNamespace)?;
    let name = idx.name_any();
    let span = info_span!("esindex", namespace = %ns, name = %name, index = %idx.spec.index_name);
    let store = ctx.store.as_ref();

    // Handle deletion via finalizer
    if idx.metadata.deletion_timestamp.is_some() {
        return finalize(&idx, &ns, &name, &ctx, span).await;
    }

    ensure_finalizer(store, &ns, &name, &idx).await?;

    let generation = idx.metadata.generation.unwrap_or_default();
    if idx.state() == IndexState::Unset {
        let pending = EsIndexStatus::new(IndexState::Pending, "", generation);
        store.patch_status(&ns, &name, &pending).await?;
        return Ok(Action::requeue(PENDING_REQUEUE));
    }

    let uri = match CredentialResolver::new(store, span.clone())
        .resolve(&ns, &idx.spec)
        .await
    {
        Ok(uri) => uri,
        Err(e) => {
            warn!(parent: &span, error = %e, "failed to resolve elastic search uri");
            let failed = EsIndexStatus::new(IndexState::Failed, e.to_string(), generation);
            store.patch_status(&ns, &name, &failed).await?;
            return Err(e);
        }
    };

    let outcome = ensure_remote_index(&ctx.es, &uri, &idx, &span).await;
    let status = match &outcome {
        Ok(res) if res.is_success() => EsIndexStatus::new(IndexState::Online, "", generation),
        Ok(res) => EsIndexStatus::new(IndexState::Failed, failure_message(res), generation),
        Err(e) => EsIndexStatus::new(IndexState::Failed, e.to_string(), generation),
    };

    // Link only once per object; the linker itself appends unconditionally.
    if let Some(binding) = idx.spec.binding_from.name()
        && idx.owner_references().is_empty()
        && let Err(e) = OwnerLinker::new(store, span.clone())
            .link(&ns, binding, &idx)
            .await
    {
        warn!(parent: &span, error = %e, binding, "failed to set owner reference");
    }

    store.patch_status(&ns, &name, &status).await?;

    let res = outcome?;
    if res.is_success() {
        info!(parent: &span, "index online");
        Ok(Action::requeue(ctx.config.resync_interval))
    } else {
        warn!(parent: &span, status = res.status, "elastic search rejected the request");
        Err(ReconcileError::Rejected {
            status: res.status,
            body: res.body,
        })
    }
}

pub fn error_policy(idx: Arc<EsIndex>, err: &ReconcileError, ctx: Arc<Ctx>) -> Action {
    let ns = idx.namespace().unwrap_or_default();
    let name = idx.name_any();
    if err.is_retryable() {
        error!(namespace = %ns, name = %name, kind = ?err.kind(), error = %err, "esindex reconcile failed");
        Action::requeue(ctx.config.error_requeue)
    } else {
        error!(namespace = %ns, name = %name, error = %err, "esindex reconcile failed, waiting for spec change");
        Action::await_change()
    }
}

async fn ensure_remote_index(
    es: &EsClient,
    uri: &str,
    idx: &EsIndex,
    span: &Span,
) -> Result<RestResult, ReconcileError> {
    let index = &idx.spec.index_name;
    // A second PUT on an existing index is rejected by the engine.
    if !idx.spec.bind_only && idx.state() == IndexState::Online {
        let existing = es.get(uri, index).await?;
        if existing.is_success() {
            debug!(parent: span, "index exists");
            return Ok(existing);
        }
        info!(parent: span, status = existing.status, "index missing on elastic search, creating");
    }
    let settings = IndexSettings {
        number_of_shards: idx.spec.number_of_shards,
        number_of_replicas: idx.spec.number_of_replicas,
    };
    es.create_or_adopt(uri, index, settings, idx.spec.bind_only)
        .await
}

fn failure_message(res: &RestResult) -> String {
    if res.body.trim().is_empty() {
        format!("elastic search returned status {}", res.status)
    } else {
        res.body.clone()
    }
}

async fn finalize(
    idx: &EsIndex,
    ns: &str,
    name: &str,
    ctx: &Ctx,
    span: Span,
) -> Result<Action, ReconcileError> {
    if !idx.finalizers().iter().any(|f| f == FINALIZER) {
        return Ok(Action::await_change());
    }
    let store = ctx.store.as_ref();

    let res = if remote_delete_skipped(idx) {
        info!(parent: &span, bind_only = idx.spec.bind_only, state = ?idx.state(), "leaving remote index in place");
        RestResult::skipped()
    } else {
        // The finalizer stays until the remote index is really gone.
        let uri = match CredentialResolver::new(store, span.clone())
            .resolve(ns, &idx.spec)
            .await
        {
            Ok(uri) => uri,
            Err(e) => {
                warn!(parent: &span, error = %e, "cannot resolve elastic search uri, keeping finalizer");
                return Err(e);
            }
        };
        ctx.es.delete(&uri, &idx.spec.index_name).await?
    };
    if res.status == 404 {
        info!(parent: &span, "index already gone");
    } else if !res.is_success() {
        return Err(ReconcileError::Rejected {
            status: res.status,
            body: res.body,
        });
    }

    remove_finalizer(store, ns, name, idx).await?;
    info!(parent: &span, "finalized");
    Ok(Action::await_change())
}

async fn ensure_finalizer(
    store: &dyn ResourceStore,
    ns: &str,
    name: &str,
    idx: &EsIndex,
) -> Result<(), ReconcileError> {
    if idx.finalizers().iter().any(|f| f == FINALIZER) {
        return Ok(());
    }
    let mut finals: Vec<String> = idx.finalizers().to_vec();
    finals.push(FINALIZER.to_string());
    store.set_finalizers(ns, name, finals).await
}

async fn remove_finalizer(
    store: &dyn ResourceStore,
    ns: &str,
    name: &str,
    idx: &EsIndex,
) -> Result<(), ReconcileError> {
    let finals: Vec<String> = idx
        .finalizers()
        .iter()
        .filter(|f| *f != FINALIZER)
        .cloned()
        .collect();
    store.set_finalizers(ns, name, finals).await
}
