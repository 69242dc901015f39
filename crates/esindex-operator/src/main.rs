use esindex_operator::{
    config::Config,
    es::EsClient,
    index_controller as idx,
    store::KubeStore,
};
use futures::StreamExt;
use kube::Client;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let config = Config::from_env()?;
    info!(
        watch_namespace = config.watch_namespace.as_deref().unwrap_or("*"),
        http_timeout_secs = config.http_timeout.as_secs(),
        "esindex-operator starting up"
    );

    let client = Client::try_default().await?;

    let ctx = Arc::new(idx::Ctx {
        store: Arc::new(KubeStore::new(client.clone())),
        es: EsClient::new(config.http_timeout)?,
        config: config.clone(),
    });
    let controller = idx::controller(client, &config)
        .run(idx::reconcile, idx::error_policy, ctx)
        .for_each(|res| async move {
            if let Err(e) = res {
                tracing::warn!(error=?e, "esindex reconcile error");
            }
        });

    tokio::select! {
        _ = controller => {},
        _ = tokio::signal::ctrl_c() => { info!("shutdown signal received"); }
    }
    Ok(())
}
