//! HTTP gateway for the suggestion service.
//!
//! Exposes `POST /v2/suggestions` and `GET /healthz` over axum, with bearer
//! token authentication and a per-IP rate limiter in front of the
//! suggestion route.

use std::net::{IpAddr, SocketAddr};
use std::num::NonZeroU32;
use std::sync::Arc;

use anyhow::Result;
use axum::extract::{ConnectInfo, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use governor::clock::DefaultClock;
use governor::state::keyed::DefaultKeyedStateStore;
use governor::{Quota, RateLimiter};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::config::AuthConfig;
use crate::domain::{CatalogItem, Outfit, Slot, SuggestionResult};
use crate::embedder::Embedder;
use crate::errors::AppError;
use crate::orchestrator::Orchestrator;

type IpRateLimiter = RateLimiter<IpAddr, DefaultKeyedStateStore<IpAddr>, DefaultClock>;

/// Resolves a bearer token to an owner id. A stand-in for the out-of-scope
/// auth system (§4.9): production deployments swap this for a real identity
/// provider by implementing the trait.
pub trait Authenticator: Send + Sync {
    fn authenticate(&self, bearer_token: &str) -> Option<String>;
}

/// Looks tokens up in a static map loaded from config/env.
pub struct StaticTokenAuthenticator {
    tokens: std::collections::HashMap<String, String>,
}

impl StaticTokenAuthenticator {
    pub fn new(auth: &AuthConfig) -> Self {
        Self { tokens: auth.tokens.clone() }
    }
}

impl Authenticator for StaticTokenAuthenticator {
    fn authenticate(&self, bearer_token: &str) -> Option<String> {
        self.tokens.get(bearer_token).cloned()
    }
}

/// Shared state between HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    orchestrator: Arc<Orchestrator>,
    embedder: Arc<dyn Embedder>,
    authenticator: Arc<dyn Authenticator>,
    limiter: Arc<IpRateLimiter>,
}

impl AppState {
    pub fn new(
        orchestrator: Arc<Orchestrator>,
        embedder: Arc<dyn Embedder>,
        authenticator: Arc<dyn Authenticator>,
        rate_limit_per_minute: u32,
    ) -> Self {
        let quota = Quota::per_minute(
            NonZeroU32::new(rate_limit_per_minute).unwrap_or(NonZeroU32::new(30).unwrap()),
        );
        Self {
            orchestrator,
            embedder,
            authenticator,
            limiter: Arc::new(RateLimiter::keyed(quota)),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SuggestionRequest {
    pub text: String,
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct ItemView {
    pub id: String,
    pub name: String,
    pub category: &'static str,
    pub color: Option<String>,
    pub image_url: Option<String>,
}

impl ItemView {
    fn from_item(item: &CatalogItem, category: &'static str) -> Self {
        Self {
            id: item.id.clone(),
            name: item.item_type.clone(),
            category,
            color: item.color.clone(),
            image_url: item.image_ref.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct OutfitView {
    pub top: Option<ItemView>,
    pub bottom: Option<ItemView>,
    pub footwear: Option<ItemView>,
    pub outerwear: Option<ItemView>,
    pub accessories: Option<ItemView>,
    pub score: f32,
    pub rationale: String,
}

impl From<&Outfit> for OutfitView {
    fn from(outfit: &Outfit) -> Self {
        Self {
            top: outfit.top.as_ref().map(|i| ItemView::from_item(i, Slot::Top.as_str())),
            bottom: outfit.bottom.as_ref().map(|i| ItemView::from_item(i, Slot::Bottom.as_str())),
            footwear: outfit
                .footwear
                .as_ref()
                .map(|i| ItemView::from_item(i, Slot::Footwear.as_str())),
            outerwear: outfit.layer.as_ref().map(|i| ItemView::from_item(i, Slot::Layer.as_str())),
            accessories: outfit
                .accessories
                .as_ref()
                .map(|i| ItemView::from_item(i, Slot::Accessories.as_str())),
            score: outfit.score,
            rationale: outfit.rationale.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SuggestionResponse {
    pub intent: String,
    pub outfits: Vec<OutfitView>,
}

impl From<&SuggestionResult> for SuggestionResponse {
    fn from(result: &SuggestionResult) -> Self {
        Self {
            intent: result.intent.clone(),
            outfits: result.outfits.iter().map(OutfitView::from).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match &self {
            AppError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Unauthenticated => (StatusCode::UNAUTHORIZED, "unauthenticated".to_string()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::RateLimited { .. } => {
                (StatusCode::TOO_MANY_REQUESTS, "rate limited".to_string())
            }
            AppError::ExternalServiceFailure { message, .. } => {
                (StatusCode::BAD_GATEWAY, message.clone())
            }
            AppError::StorageFailure(_) | AppError::EmbeddingFailure(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, "temporarily unavailable".to_string())
            }
            AppError::Internal(e) => {
                error!("internal error: {:#}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string())
            }
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/v2/suggestions", post(suggestions_handler))
        .route("/healthz", get(health_handler))
        .with_state(state)
}

fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

async fn suggestions_handler(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(body): Json<SuggestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    if state.limiter.check_key(&addr.ip()).is_err() {
        return Err(AppError::RateLimited { retry_after: Some(60) });
    }

    let token = extract_bearer(&headers).ok_or(AppError::Unauthenticated)?;
    let owner_id = state.authenticator.authenticate(token).ok_or(AppError::Unauthenticated)?;

    let text = body.text.trim();
    if text.is_empty() {
        return Err(AppError::InvalidInput("text must not be empty".to_string()));
    }
    if let Some(limit) = body.limit {
        if !(1..=3).contains(&limit) {
            return Err(AppError::InvalidInput("limit must be between 1 and 3".to_string()));
        }
    }
    let limit = body.limit.unwrap_or(3) as usize;

    let result = state.orchestrator.suggest(state.embedder.as_ref(), &owner_id, text, limit).await;
    Ok(Json(SuggestionResponse::from(result.as_ref())))
}

async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": crate::VERSION,
    }))
}

/// Binds the listener and serves the router for the lifetime of the process.
pub async fn start(bind_addr: &str, state: AppState) -> Result<()> {
    let app = build_router(state).into_make_service_with_connect_info::<SocketAddr>();
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    info!("HTTP gateway listening on {}", bind_addr);
    axum::serve(listener, app).await?;
    Ok(())
}

/// Unused in the default build but kept for callers that want a handle
/// separate from `axum::serve` (e.g. graceful-shutdown wiring).
pub fn router(state: AppState) -> Router {
    build_router(state)
}
