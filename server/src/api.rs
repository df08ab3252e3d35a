//! HTTP routes for `/api/incidents` and `/api/status`.

use crate::error::{StoreError, StoreResult};
use crate::storage::Storage;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, Request, State};
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::get;
use axum::{Json, Router};
use common::query::translate;
use common::validation::{validate_create, validate_update};
use common::{ApiConfig, Incident, IncidentCounts, ListParams, Page, ServerStatus};
use log::{info, warn};
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{AllowOrigin, CorsLayer};

pub struct AppState {
    pub storage: Storage,
    pub api: ApiConfig,
    started_at: Instant,
}

impl AppState {
    pub fn new(storage: Storage, api: ApiConfig) -> Self {
        Self { storage, api, started_at: Instant::now() }
    }
}

pub type SharedState = Arc<AppState>;

/// The full application: routes, request logging and CORS for `origins`.
pub fn app(state: AppState, origins: &[String]) -> Router {
    router(state)
        .layer(middleware::from_fn(log_requests))
        .layer(cors_layer(origins))
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/incidents", get(list_incidents).post(create_incident))
        .route(
            "/api/incidents/{id}",
            get(get_incident).patch(update_incident).delete(delete_incident),
        )
        .route("/api/status", get(status))
        .with_state(Arc::new(state))
}

pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin {:?}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE])
}

async fn log_requests(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let started = Instant::now();
    let response = next.run(req).await;
    info!(
        "{} {} -> {} ({} ms)",
        method,
        path,
        response.status().as_u16(),
        started.elapsed().as_millis()
    );
    response
}

async fn create_incident(
    State(state): State<SharedState>,
    body: Result<Json<Value>, JsonRejection>,
) -> StoreResult<(StatusCode, Json<Incident>)> {
    let Json(body) = body.map_err(|e| StoreError::Validation(vec![e.body_text()]))?;
    let new = validate_create(&body, state.api.unknown_fields())?;
    let incident = state.storage.create(new).await?;
    info!("Created incident {} ({}, {})", incident.id, incident.severity, incident.service);
    Ok((StatusCode::CREATED, Json(incident)))
}

async fn list_incidents(
    State(state): State<SharedState>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> StoreResult<Json<Page<Incident>>> {
    let Query(params) = params.map_err(|e| StoreError::Validation(vec![e.body_text()]))?;
    let query = translate(&params, state.api.page_limits())?;
    let page = state.storage.list(&query).await?;
    Ok(Json(page))
}

async fn get_incident(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> StoreResult<Json<Incident>> {
    Ok(Json(state.storage.get_by_id(&id).await?))
}

async fn update_incident(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> StoreResult<Json<Incident>> {
    let Json(body) = body.map_err(|e| StoreError::Validation(vec![e.body_text()]))?;
    let patch = validate_update(&body, state.api.unknown_fields())?;
    let incident = state.storage.update(&id, &patch).await?;
    info!("Updated incident {} (status {})", incident.id, incident.status);
    Ok(Json(incident))
}

async fn delete_incident(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> StoreResult<Json<Incident>> {
    let incident = state.storage.remove(&id).await?;
    info!("Deleted incident {}", incident.id);
    Ok(Json(incident))
}

async fn status(State(state): State<SharedState>) -> StoreResult<Json<ServerStatus>> {
    let open = state.storage.open_counts().await?;
    Ok(Json(ServerStatus {
        status: "running".to_string(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
        incidents: IncidentCounts { open },
    }))
}
