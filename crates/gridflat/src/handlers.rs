use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

use payout_extract::{HeaderProfile, walk_table};
use payout_types::{Grid, PayoutRecord};

use crate::locate::{find_slab_month, locate_tables};

#[derive(Clone)]
pub struct AppState {
    pub max_grid_cells: usize,
}

#[derive(Deserialize)]
pub struct HeaderQuery {
    pub text: String,
}

#[derive(Deserialize)]
pub struct ExtractRequest {
    pub grid: Grid,
    pub slab_month: Option<String>,
}

#[derive(Serialize)]
pub struct ExtractResponse {
    tables: usize,
    count: usize,
    records: Vec<PayoutRecord>,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/v1/header", get(header))
        .route("/v1/extract", post(extract))
        .with_state(state)
}

async fn healthz() -> impl IntoResponse {
    "ok"
}

/// Debug surface: interpret a single column header without a grid.
async fn header(
    axum::extract::Query(params): axum::extract::Query<HeaderQuery>,
) -> Result<Response, ApiError> {
    let text = params.text.trim();
    if text.is_empty() {
        return Err(ApiError::bad_request("text is required"));
    }
    let profile = HeaderProfile::parse(text);
    Ok(Json(profile).into_response())
}

/// Flatten every table in the submitted grid. A grid without a single
/// recognisable table is a valid request with an empty result, not an
/// error: callers feed arbitrary sheets and filter on the output.
async fn extract(
    State(state): State<AppState>,
    Json(req): Json<ExtractRequest>,
) -> Result<Response, ApiError> {
    if req.grid.cell_count() > state.max_grid_cells {
        return Err(ApiError::bad_request(format!(
            "grid exceeds {} cells",
            state.max_grid_cells
        )));
    }

    let slab_month = req
        .slab_month
        .as_deref()
        .map(str::to_string)
        .or_else(|| find_slab_month(&req.grid));

    let spans = locate_tables(&req.grid);
    let mut records = Vec::new();
    for span in &spans {
        records.extend(walk_table(&req.grid, span, slab_month.as_deref()));
    }
    tracing::info!(
        tables = spans.len(),
        records = records.len(),
        "grid flattened"
    );

    Ok(Json(ExtractResponse {
        tables: spans.len(),
        count: records.len(),
        records,
    })
    .into_response())
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("internal server error")]
    Internal,
}

impl ApiError {
    fn bad_request<T: Into<String>>(msg: T) -> Self {
        ApiError::BadRequest(msg.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(msg) => {
                let body = Json(ErrorResponse { error: msg });
                (StatusCode::BAD_REQUEST, body).into_response()
            }
            ApiError::Internal => {
                let body = Json(json!({ "error": "internal server error" }));
                (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
            }
        }
    }
}
