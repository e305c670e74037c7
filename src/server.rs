//! Story HTTP API
//!
//! Each endpoint has a thin axum handler that delegates to an inner function
//! returning `(StatusCode, Value)`, so the behavior is testable without
//! going through the router.
//!
//! Endpoints:
//! - POST /api/generate-story: text-only story for a name, age and theme
//! - POST /api/generate-image: one illustration for a prompt
//! - GET  /health

use crate::ai::{self, ImageGenerationService};
use crate::models::{Config, StoryForm};
use crate::story::{StoryGenerator, StorySource};
use crate::Error;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Shared state for all HTTP handlers.
pub struct AppState {
    pub stories: Box<dyn StorySource>,
    pub images: Box<dyn ImageGenerationService>,
}

impl AppState {
    /// Build provider clients from config. A provider with missing
    /// credentials still yields a state; its requests fail with a
    /// configuration error.
    pub fn from_config(config: &Config) -> Self {
        let client = reqwest::Client::new();
        let text = ai::text_service_or_unconfigured(config, client.clone());
        Self {
            stories: Box::new(StoryGenerator::new(text)),
            images: ai::image_service_or_unconfigured(config, client),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ImageRequest {
    pub prompt: Option<String>,
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/generate-story", post(generate_story_handler))
        .route("/api/generate-image", post(generate_image_handler))
        .with_state(state)
}

/// Serve the API on `addr` until `shutdown` resolves.
pub async fn start_http_server<F>(addr: &str, state: Arc<AppState>, shutdown: F) -> crate::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = build_router(state);
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Story API listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown.await;
            tracing::info!("HTTP server shutting down...");
        })
        .await?;

    Ok(())
}

// ============================================================================
// Inner (directly testable) functions
// ============================================================================

pub fn health_inner() -> (StatusCode, Value) {
    (
        StatusCode::OK,
        json!({
            "status": "healthy",
            "version": env!("CARGO_PKG_VERSION"),
        }),
    )
}

pub async fn generate_story_inner(state: &AppState, form: StoryForm) -> (StatusCode, Value) {
    let Some(request) = form.into_request() else {
        return bad_request("name and age are required");
    };

    match state.stories.generate_story(&request).await {
        Ok(story) => match serde_json::to_value(&story) {
            Ok(body) => (StatusCode::OK, body),
            Err(e) => failure("Failed to generate story", &e.into()),
        },
        Err(e) => {
            tracing::error!("Story generation error: {}", e);
            failure("Failed to generate story", &e)
        }
    }
}

pub async fn generate_image_inner(state: &AppState, req: ImageRequest) -> (StatusCode, Value) {
    let prompt = match req.prompt {
        Some(p) if !p.trim().is_empty() => p,
        _ => return bad_request("prompt is required"),
    };

    match state.images.generate_image(&prompt).await {
        Ok(image_url) => (StatusCode::OK, json!({ "imageUrl": image_url })),
        Err(e) => {
            tracing::error!("Image generation error: {}", e);
            failure("Failed to generate image", &e)
        }
    }
}

fn bad_request(message: &str) -> (StatusCode, Value) {
    (StatusCode::BAD_REQUEST, json!({ "error": message }))
}

fn failure(message: &str, error: &Error) -> (StatusCode, Value) {
    let details = error.details().unwrap_or_else(|| error.to_string());
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        json!({
            "error": message,
            "details": details,
        }),
    )
}

// ============================================================================
// Axum handler wrappers
// ============================================================================

pub async fn health_handler() -> impl IntoResponse {
    let (status, body) = health_inner();
    (status, Json(body))
}

pub async fn generate_story_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<StoryForm>, JsonRejection>,
) -> impl IntoResponse {
    let (status, body) = match payload {
        Ok(Json(form)) => generate_story_inner(&state, form).await,
        Err(rejection) => bad_request(&rejection.body_text()),
    };
    (status, Json(body))
}

pub async fn generate_image_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ImageRequest>, JsonRejection>,
) -> impl IntoResponse {
    let (status, body) = match payload {
        Ok(Json(req)) => generate_image_inner(&state, req).await,
        Err(rejection) => bad_request(&rejection.body_text()),
    };
    (status, Json(body))
}
