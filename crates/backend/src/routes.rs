use std::path::PathBuf;
use std::sync::Arc;

use airspace_shared::bounds::QueryBounds;
use airspace_shared::geo::LatLngBounds;
use airspace_shared::models::{Area, AreaType, FeatureCollection};
use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, Multipart, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::compression::CompressionLayer;

use crate::ingest::{self, IngestError};
use crate::spatial::{self, Coverer};
use crate::storage::Storage;

/// Uploads carry whole national datasets.
const UPLOAD_LIMIT_BYTES: usize = 128 * 1024 * 1024;

const UPLOAD_FIELD: &str = "file";

#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<Storage>,
    pub coverer: Coverer,
    pub dist_dir: PathBuf,
}

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(msg) => {
                tracing::warn!("rejected request: {}", msg);
                (StatusCode::BAD_REQUEST, msg).into_response()
            }
            ApiError::Internal(msg) => {
                tracing::error!("request failed: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, msg).into_response()
            }
        }
    }
}

impl From<IngestError> for ApiError {
    fn from(e: IngestError) -> Self {
        ApiError::BadRequest(e.to_string())
    }
}

#[derive(Debug, Deserialize)]
pub struct BoundsQuery {
    bounds: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct UploadSummary {
    pub inserted: usize,
    pub skipped: usize,
}

/// True when the area's outer ring box touches the viewport box. Cell hits alone
/// over-match, since boundary cells stick out of both boxes.
fn overlaps(area: &Area, viewport: &LatLngBounds) -> bool {
    area.rings
        .first()
        .and_then(|ring| LatLngBounds::around(spatial::ring_points(ring)))
        .is_some_and(|b| b.intersects(viewport))
}

fn query_areas(
    state: &AppState,
    query: BoundsQuery,
    area_type: AreaType,
) -> Result<Json<FeatureCollection>, ApiError> {
    let raw = query
        .bounds
        .ok_or_else(|| ApiError::BadRequest("missing bounds parameter".to_string()))?;
    let bounds: QueryBounds = raw
        .parse()
        .map_err(|e| ApiError::BadRequest(format!("{}", e)))?;

    let corners = bounds.corners();
    let area_km2 = spatial::area_km2(&corners);
    if area_km2 > spatial::MAX_BOUNDS_AREA_KM2 {
        tracing::debug!(%area_type, area_km2, "viewport too large, returning no areas");
        return Ok(Json(FeatureCollection::empty()));
    }

    let viewport = bounds.enclosing();
    let cells = state.coverer.cover_bounds(&viewport);
    let features: Vec<_> = state
        .storage
        .search_areas(&cells, area_type)
        .map_err(ApiError::Internal)?
        .iter()
        .filter(|a| overlaps(a, &viewport))
        .map(Area::to_feature)
        .collect();

    tracing::info!(%area_type, cells = cells.len(), areas = features.len(), "area query");
    Ok(Json(FeatureCollection::new(features)))
}

async fn get_did_areas(
    State(state): State<AppState>,
    Query(query): Query<BoundsQuery>,
) -> Result<Json<FeatureCollection>, ApiError> {
    query_areas(&state, query, AreaType::Did)
}

async fn get_airport_areas(
    State(state): State<AppState>,
    Query(query): Query<BoundsQuery>,
) -> Result<Json<FeatureCollection>, ApiError> {
    query_areas(&state, query, AreaType::Airport)
}

fn uploaded_at() -> String {
    chrono::Utc::now().to_rfc3339()
}

async fn upload_did_areas(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<UploadSummary>, ApiError> {
    let areas = ingest::did_areas(&body, &state.coverer, &uploaded_at())?;
    let inserted = state
        .storage
        .insert_areas(&areas)
        .map_err(ApiError::Internal)?;
    tracing::info!(inserted, "stored DID areas");
    Ok(Json(UploadSummary {
        inserted,
        skipped: 0,
    }))
}

async fn upload_airport_areas(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadSummary>, ApiError> {
    let mut file = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.to_string()))?
    {
        if field.name() == Some(UPLOAD_FIELD) {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ApiError::BadRequest(e.to_string()))?;
            file = Some(bytes);
            break;
        }
    }
    let file = file.ok_or_else(|| {
        ApiError::BadRequest(format!("multipart field {:?} is required", UPLOAD_FIELD))
    })?;

    let import = ingest::airport_areas(file.as_ref(), &state.coverer, &uploaded_at())?;
    let inserted = state
        .storage
        .insert_areas(&import.areas)
        .map_err(ApiError::Internal)?;
    tracing::info!(inserted, skipped = import.skipped, "stored airport areas");
    Ok(Json(UploadSummary {
        inserted,
        skipped: import.skipped,
    }))
}

/// Query and upload endpoints, before state is attached.
pub fn api_router() -> Router<AppState> {
    let uploads = Router::new()
        .route("/upload/did_areas", post(upload_did_areas))
        .route("/upload/airport_areas", post(upload_airport_areas))
        .layer(DefaultBodyLimit::max(UPLOAD_LIMIT_BYTES));

    Router::new()
        .route("/api/did_areas", get(get_did_areas))
        .route("/api/airport_areas", get(get_airport_areas))
        .layer(CompressionLayer::new())
        .merge(uploads)
}
