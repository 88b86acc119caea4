// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use anyhow::{Context, Result};
use k8s_openapi::api::core::v1::{Secret, Service};
use k8s_openapi::NamespaceResourceScope;
use kube::Client;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, info_span, warn};
use tracing_subscriber::EnvFilter;

use waypost::config::Config;
use waypost::dataplane::FileApplier;
use waypost::events::TrackedKind;
use waypost::kubernetes::{wait_for_gateway_api_crds, EventRecorder, KubeEventRecorder, KubeGetter};
use waypost::reconcilers::{
    single_resource_filter, watch_api, Adapter, AdapterConfig, NamespacedNameFilter, Reconciler,
};
use waypost::status::{KubeStatusSink, StatusReporter};
use waypost::sync::{SyncManager, SyncManagerHandle, SyncSettings};
use waypost::types::{Gateway, HTTPRoute, ReferenceGrant};
use waypost::validation::{validate_gateway, validate_http_route, Validator};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting Waypost gateway controller");

    let config = Config::from_env()?;
    info!(
        "Configuration loaded: gateway_class={}, gateway={}, namespace={}",
        config.gateway_class_name,
        config.gateway.as_ref().map(ToString::to_string).unwrap_or_else(|| "*".to_string()),
        config.watch_namespace.as_deref().unwrap_or("*")
    );

    let client = Client::try_default()
        .await
        .context("Failed to create Kubernetes client")?;
    info!("Connected to Kubernetes cluster");

    let cancel = CancellationToken::new();
    tokio::spawn(cancel_on_shutdown(cancel.clone()));

    info!("Waiting for Gateway API CRDs to become available...");
    if !wait_for_gateway_api_crds(&client, &cancel).await? {
        info!("Shutdown requested before the CRDs became available");
        return Ok(());
    }

    let applier = Arc::new(FileApplier::new(config.dataplane_config_path.clone()));
    let status = config.update_status.then(|| {
        StatusReporter::new(
            Arc::new(KubeStatusSink::new(client.clone(), config.controller_name.clone())),
            config.controller_name.clone(),
            info_span!("status"),
        )
    });

    let (sync_manager, sync_handle) =
        SyncManager::new(SyncSettings::from(&config), applier, status, info_span!("sync"));

    let recorder: Arc<dyn EventRecorder> =
        Arc::new(KubeEventRecorder::new(client.clone(), &config.controller_name));
    let gateway_filter = config.gateway.clone().map(single_resource_filter);

    let gateways = reconciler::<Gateway>(
        &client,
        &config,
        &sync_handle,
        &recorder,
        gateway_filter,
        Some(Box::new(validate_gateway)),
    );
    let routes = reconciler::<HTTPRoute>(
        &client,
        &config,
        &sync_handle,
        &recorder,
        None,
        Some(Box::new(validate_http_route)),
    );
    let services = reconciler::<Service>(&client, &config, &sync_handle, &recorder, None, None);
    let grants = reconciler::<ReferenceGrant>(&client, &config, &sync_handle, &recorder, None, None);
    let secrets = reconciler::<Secret>(&client, &config, &sync_handle, &recorder, None, None);
    // Reconcilers hold the only senders from here on
    drop(sync_handle);

    info!("Starting reconcilers...");

    tokio::try_join!(
        sync_manager.run(cancel.clone()),
        gateways.run(cancel.clone()),
        routes.run(cancel.clone()),
        services.run(cancel.clone()),
        grants.run(cancel.clone()),
        secrets.run(cancel.clone()),
    )?;

    if !cancel.is_cancelled() {
        warn!("All reconcilers stopped unexpectedly");
    }
    info!("Waypost gateway controller stopped");
    Ok(())
}

fn reconciler<K>(
    client: &Client,
    config: &Config,
    sync_handle: &SyncManagerHandle,
    recorder: &Arc<dyn EventRecorder>,
    filter: Option<NamespacedNameFilter>,
    validator: Option<Validator<K>>,
) -> Reconciler<K>
where
    K: TrackedKind<Scope = NamespaceResourceScope>,
{
    let span = info_span!("reconciler", kind = %K::KIND);
    let adapter = Adapter::new(AdapterConfig {
        getter: Arc::new(KubeGetter::<K>::new(client.clone())),
        sync_handle: sync_handle.clone(),
        filter,
        validator,
        recorder: recorder.clone(),
        span: span.clone(),
    });
    Reconciler::new(
        watch_api(client.clone(), config.watch_namespace.as_deref()),
        adapter,
        span,
    )
}

async fn cancel_on_shutdown(cancel: CancellationToken) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = terminate.recv() => {}
                }
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }

    info!("Shutdown signal received");
    cancel.cancel();
}
