use axum::extract::{Multipart, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::AppState;
use crate::db::StatusFilter;
use crate::error::IntakeError;
use crate::intake::UploadFile;

/// Create the router with all routes.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/upload", post(upload))
        .route("/api/images", get(list_images))
        .route("/api/action", post(action))
        .route("/api/scrape", post(scrape))
        .route("/api/adhoc", post(adhoc_scrape))
        .route("/api/stats", get(stats))
        .route("/healthz", get(health))
}

/// Map a core failure to an HTTP response.
fn error_response(e: &IntakeError) -> Response {
    let status = match e {
        IntakeError::InvalidAction(_) => StatusCode::BAD_REQUEST,
        IntakeError::NoImagesFound => StatusCode::NOT_FOUND,
        IntakeError::DownloadTool { .. } => StatusCode::BAD_GATEWAY,
        IntakeError::UnsupportedFormat => StatusCode::UNPROCESSABLE_ENTITY,
        IntakeError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    if status == StatusCode::INTERNAL_SERVER_ERROR {
        tracing::error!("Request failed: {e:#}");
    }

    (status, Json(json!({ "success": false, "error": e.to_string() }))).into_response()
}

// ========== Ingestion ==========

async fn upload(State(state): State<AppState>, mut multipart: Multipart) -> Response {
    let mut files = Vec::new();

    loop {
        match multipart.next_field().await {
            Ok(Some(field)) => {
                let Some(name) = field.file_name().map(ToString::to_string) else {
                    continue;
                };
                match field.bytes().await {
                    Ok(bytes) => files.push(UploadFile {
                        name,
                        bytes: bytes.to_vec(),
                    }),
                    Err(e) => {
                        tracing::warn!(name = %name, error = %e, "Skipping unreadable upload field");
                    }
                }
            }
            Ok(None) => break,
            Err(e) => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(json!({ "success": false, "error": format!("Malformed multipart body: {e}") })),
                )
                    .into_response();
            }
        }
    }

    let outcomes = state.intake.ingest_batch(files).await;
    Json(outcomes).into_response()
}

#[derive(Debug, Deserialize)]
struct ScrapeRequest {
    url: String,
}

#[derive(Debug, Serialize)]
struct ScrapeResponse {
    success: bool,
    downloaded: usize,
}

async fn scrape(State(state): State<AppState>, Json(req): Json<ScrapeRequest>) -> Response {
    match state.scraper.ingest_from_configured_source(&req.url).await {
        Ok(outcomes) => Json(ScrapeResponse {
            success: true,
            downloaded: outcomes.len(),
        })
        .into_response(),
        Err(e) => error_response(&e),
    }
}

async fn adhoc_scrape(State(state): State<AppState>, Json(req): Json<ScrapeRequest>) -> Response {
    match state.scraper.ingest_from_ad_hoc_source(&req.url).await {
        Ok(outcomes) => Json(ScrapeResponse {
            success: true,
            downloaded: outcomes.len(),
        })
        .into_response(),
        Err(e) => error_response(&e),
    }
}

// ========== Moderation ==========

#[derive(Debug, Deserialize)]
struct ListParams {
    status: Option<String>,
    limit: Option<i64>,
    offset: Option<i64>,
}

#[derive(Debug, Serialize)]
struct ImageView {
    name: String,
    url: String,
    status: String,
    duplicate: bool,
}

async fn list_images(State(state): State<AppState>, Query(params): Query<ListParams>) -> Response {
    let filter = params
        .status
        .as_deref()
        .map_or(StatusFilter::All, StatusFilter::parse);
    let limit = params.limit.unwrap_or(100).clamp(1, 500);
    let offset = params.offset.unwrap_or(0).max(0);

    match state.moderation.list(filter, limit, offset).await {
        Ok((records, total)) => {
            let images: Vec<ImageView> = records
                .into_iter()
                .map(|r| ImageView {
                    url: state.moderation.image_url(&r.name),
                    name: r.name,
                    status: r.status,
                    duplicate: r.duplicate,
                })
                .collect();
            Json(json!({ "images": images, "total": total })).into_response()
        }
        Err(e) => error_response(&e),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ActionRequest {
    image_id: String,
    action: String,
}

async fn action(State(state): State<AppState>, Json(req): Json<ActionRequest>) -> Response {
    match state.moderation.apply_action(&req.image_id, &req.action).await {
        Ok(()) => Json(json!({ "success": true })).into_response(),
        Err(e) => error_response(&e),
    }
}

async fn stats(State(state): State<AppState>) -> Response {
    match state.moderation.stats().await {
        Ok(s) => Json(s).into_response(),
        Err(e) => error_response(&e),
    }
}

async fn health() -> &'static str {
    "OK"
}
