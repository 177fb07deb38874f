//! `wayfarer serve` — exposes the event bus and a health probe over HTTP
//! without driving a task, alongside the Prometheus `/metrics` endpoint
//! `ensure_prometheus` already owns.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use wayfarer_config::ConfigSnapshot;
use wayfarer_event_bus::EventBus;
use wayfarer_telemetry::exporter::ensure_prometheus;

use crate::errors::ExitCode;
use crate::wiring::build_browser_runtime;

#[derive(Clone)]
struct ServeState {
    bus: EventBus,
}

#[derive(Deserialize)]
struct HistoryQuery {
    limit: Option<usize>,
}

async fn healthz() -> &'static str {
    "ok"
}

async fn events(State(state): State<Arc<ServeState>>, Query(query): Query<HistoryQuery>) -> Json<serde_json::Value> {
    let events = state.bus.history(query.limit.unwrap_or(100)).await;
    Json(serde_json::json!({ "events": events }))
}

pub async fn cmd_serve(config: &ConfigSnapshot, bind: &str) -> Result<ExitCode> {
    ensure_prometheus();

    let runtime = build_browser_runtime(config);
    let state = Arc::new(ServeState { bus: runtime.bus.clone() });

    let router = Router::new().route("/healthz", get(healthz)).route("/events", get(events)).with_state(state);

    let addr: SocketAddr = bind.parse().with_context(|| format!("invalid --bind address \"{bind}\""))?;
    let listener = tokio::net::TcpListener::bind(addr).await.with_context(|| format!("binding {addr}"))?;
    tracing::info!(%addr, "serve listening");

    axum::serve(listener, router).await.context("serve exited unexpectedly")?;
    Ok(ExitCode::Success)
}
