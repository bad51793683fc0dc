use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use ccplane_api::{AppState, Store};
use ccplane_cache::{CacheRegistry, CacheTtls};
use ccplane_config::Settings;
use ccplane_ingest::ports::fakes::{FakeCsot, RecordingBus};
use ccplane_ingest::{DriftService, HeartbeatPayload, HeartbeatService, HeartbeatServiceConfig, IngestOrchestrator};
use ccplane_reaper::{ReaperScheduler, StaleInstanceReaper};
use ccplane_resilience::CircuitBreaker;
use ccplane_store::{InMemoryStore, PostgresStore};
use tokio::sync::watch;
use tracing::info;

// ── Serve ─────────────────────────────────────────────────────────────────

pub async fn serve(
    bind: String,
    port: u16,
    database_url: Option<String>,
    config: Option<PathBuf>,
    bearer_token: Option<String>,
) -> Result<()> {
    let settings = match &config {
        Some(path) => ccplane_config::load(path).with_context(|| format!("loading {}", path.display()))?,
        None => ccplane_config::load_from_env(),
    };

    let token = bearer_token.unwrap_or_else(|| {
        let t = generate_token();
        println!("No bearer token supplied — generated one for this process: {t}");
        t
    });

    match database_url {
        Some(url) => {
            println!("Using Postgres store at {url}");
            let store = Arc::new(PostgresStore::connect(&url).await.context("connecting to Postgres")?);
            run_server(store, settings, bind, port, token).await
        }
        None => {
            println!("Using in-memory (ephemeral) store — state will be lost on restart");
            let store = Arc::new(InMemoryStore::new());
            run_server(store, settings, bind, port, token).await
        }
    }
}

/// Wires every service and orchestrator for one concrete store type and
/// serves the HTTP surface until the process is killed. The CSoT and
/// event-bus adapters used here are local stand-ins (spec.md §1 scopes the
/// CSoT itself and the bus broker out of this core) — plug in real
/// transport adapters implementing `CsotAdapter`/`RefreshPublisher` when
/// wiring this into an actual deployment.
async fn run_server<S: Store>(store: Arc<S>, settings: Settings, bind: String, port: u16, token: String) -> Result<()> {
    let cache_ttls = CacheTtls {
        expected_hash: settings.expected_hash_ttl,
        service_resolution: settings.service_resolution_ttl,
        permissions: settings.permission_ttl,
        csot_fallback: settings.csot_fallback_ttl,
        idp_fallback: settings.idp_fallback_ttl,
    };
    let cache = Arc::new(CacheRegistry::new(cache_ttls, None));

    let csot = Arc::new(FakeCsot::new());
    let bus = Arc::new(RecordingBus::new());

    let heartbeat_config = HeartbeatServiceConfig {
        auto_register_on_first_heartbeat: settings.auto_register_on_first_heartbeat,
        prod_environment_names: settings.prod_environment_names.clone(),
    };
    let ingest_breaker = CircuitBreaker::new(settings.circuit_breaker_failure_threshold, settings.circuit_breaker_reset);
    let heartbeats = Arc::new(HeartbeatService::new(
        store.clone(),
        store.clone(),
        store.clone(),
        cache.clone(),
        csot,
        bus.clone(),
        ingest_breaker,
        settings.dedup_window,
        heartbeat_config,
    ));
    let orchestrator = Arc::new(IngestOrchestrator::new(heartbeats, settings.ingest_concurrency, 16));
    let drift = Arc::new(DriftService::new(store.clone()));

    let reaper = Arc::new(StaleInstanceReaper::new(
        store.clone(),
        store.clone(),
        settings.stale_threshold,
        settings.delete_threshold,
    ));
    let scheduler = ReaperScheduler::new(reaper, settings.reaper_interval);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let reaper_handle = tokio::spawn(async move { scheduler.run(shutdown_rx).await });

    let state = AppState {
        orchestrator,
        drift,
        cache,
        refresh_bus: bus,
        refresh_breaker: Arc::new(CircuitBreaker::new(
            settings.circuit_breaker_failure_threshold,
            settings.circuit_breaker_reset,
        )),
        auth_token: Arc::new(token),
        default_deadline: settings.default_deadline,
    };
    let app = ccplane_api::build_app(state);

    let addr = format!("{bind}:{port}");
    info!(%addr, "starting control plane server");
    let listener = tokio::net::TcpListener::bind(&addr).await.with_context(|| format!("binding {addr}"))?;
    axum::serve(listener, app).await.context("server error")?;

    let _ = shutdown_tx.send(true);
    let _ = reaper_handle.await;
    Ok(())
}

fn generate_token() -> String {
    let a = uuid::Uuid::new_v4().to_string().replace('-', "");
    let b = uuid::Uuid::new_v4().to_string().replace('-', "");
    format!("{a}{b}")
}

// ── Client commands ──────────────────────────────────────────────────────

fn authed_client(token: &Option<String>) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder();
    if let Some(token) = token {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::AUTHORIZATION,
            reqwest::header::HeaderValue::from_str(&format!("Bearer {token}")).context("token contains invalid header characters")?,
        );
        builder = builder.default_headers(headers);
    }
    builder.build().context("building HTTP client")
}

pub async fn refresh(url: String, token: Option<String>, destination: String) -> Result<()> {
    let client = authed_client(&token)?;
    let resp = client
        .post(format!("{}/refresh", url.trim_end_matches('/')))
        .query(&[("destination", destination.as_str())])
        .send()
        .await
        .with_context(|| format!("reaching server at {url}"))?;
    print_status_and_body(resp).await
}

pub async fn cache_clear(url: String, token: Option<String>, cache_name: Option<String>) -> Result<()> {
    let client = authed_client(&token)?;
    let mut req = client.post(format!("{}/cache/clear", url.trim_end_matches('/')));
    if let Some(name) = &cache_name {
        req = req.query(&[("cacheName", name.as_str())]);
    }
    let resp = req.send().await.with_context(|| format!("reaching server at {url}"))?;
    print_status_and_body(resp).await
}

pub async fn drift_stats(url: String, token: Option<String>) -> Result<()> {
    let client = authed_client(&token)?;
    let body: serde_json::Value = client
        .get(format!("{}/drift/statistics", url.trim_end_matches('/')))
        .send()
        .await
        .with_context(|| format!("reaching server at {url}"))?
        .json()
        .await
        .context("parsing drift statistics response")?;
    println!("{}", serde_json::to_string_pretty(&body)?);
    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub async fn heartbeat(
    url: String,
    token: Option<String>,
    service_name: String,
    instance_id: String,
    config_hash: String,
    environment: String,
    host: Option<String>,
    port: Option<u16>,
    version: Option<String>,
    metadata: Vec<(String, String)>,
) -> Result<()> {
    let payload = HeartbeatPayload {
        service_name,
        instance_id,
        config_hash,
        host,
        port,
        environment,
        version,
        metadata: metadata.into_iter().collect(),
    };
    let client = authed_client(&token)?;
    let resp = client
        .post(format!("{}/heartbeat", url.trim_end_matches('/')))
        .json(&payload)
        .send()
        .await
        .with_context(|| format!("reaching server at {url}"))?;
    print_status_and_body(resp).await
}

async fn print_status_and_body(resp: reqwest::Response) -> Result<()> {
    let status = resp.status();
    let body: serde_json::Value = resp.json().await.unwrap_or(serde_json::Value::Null);
    println!("{}", status);
    if !body.is_null() {
        println!("{}", serde_json::to_string_pretty(&body)?);
    }
    if !status.is_success() {
        anyhow::bail!("request failed: {status}");
    }
    Ok(())
}
