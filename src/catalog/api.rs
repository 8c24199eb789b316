use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info, warn};

use super::client::API_KEY_HEADER;
use super::{filter_by_date, paginate, MetadataStore, UpsertOutcome, VideoRecord};
use crate::error::{Result, LingoError};

const DEFAULT_PAGE_LIMIT: usize = 7;

#[derive(Clone)]
pub struct ApiState {
    pub store: Arc<dyn MetadataStore>,
    /// Key required for writes; writes are refused when unset
    pub api_key: Option<Arc<str>>,
}

impl ApiState {
    pub fn new(store: Arc<dyn MetadataStore>, api_key: Option<String>) -> Self {
        Self {
            store,
            api_key: api_key.filter(|k| !k.is_empty()).map(Arc::from),
        }
    }

    fn authorize(&self, headers: &HeaderMap) -> std::result::Result<(), ApiError> {
        let provided = headers.get(API_KEY_HEADER).and_then(|v| v.to_str().ok());
        match (&self.api_key, provided) {
            (Some(expected), Some(provided)) if expected.as_ref() == provided => Ok(()),
            _ => {
                warn!("Rejected write with missing or invalid API key");
                Err(ApiError::new(
                    StatusCode::FORBIDDEN,
                    "You do not have permission to perform this action.",
                ))
            }
        }
    }
}

/// Error body in the `{"detail": ...}` shape
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    detail: String,
}

impl ApiError {
    fn new<S: Into<String>>(status: StatusCode, detail: S) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }
}

impl From<LingoError> for ApiError {
    fn from(e: LingoError) -> Self {
        error!("Catalog API error: {}", e);
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "detail": self.detail }))).into_response()
    }
}

type ApiResult<T> = std::result::Result<T, ApiError>;

#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    start_date: Option<String>,
    end_date: Option<String>,
    page_num: Option<String>,
    limit: Option<String>,
}

fn parse_date(value: Option<&str>) -> Option<NaiveDate> {
    value.and_then(|v| NaiveDate::parse_from_str(v.trim(), "%Y-%m-%d").ok())
}

pub fn create_router(state: ApiState) -> Router {
    Router::new()
        .route("/today/videos/", get(list_videos))
        .route("/today/videos/latest/", get(latest_video))
        .route("/today/videos/paginated-videos/", get(paginated_videos))
        .route("/today/videos/write-to-db/", post(write_video))
        .route("/today/videos/:id/", get(get_video).delete(delete_video))
        .with_state(state)
}

/// Serve the catalog API until the process is stopped
pub async fn serve(bind: &str, state: ApiState) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!("Catalog API listening on http://{}", listener.local_addr()?);

    axum::serve(listener, create_router(state))
        .await
        .map_err(LingoError::Io)
}

async fn list_videos(State(state): State<ApiState>) -> ApiResult<Json<Vec<VideoRecord>>> {
    Ok(Json(state.store.list().await?))
}

async fn latest_video(State(state): State<ApiState>) -> ApiResult<Json<VideoRecord>> {
    state
        .store
        .list()
        .await?
        .into_iter()
        .next()
        .map(Json)
        .ok_or_else(|| ApiError::new(StatusCode::NOT_FOUND, "No videos available"))
}

async fn paginated_videos(
    State(state): State<ApiState>,
    Query(params): Query<PageParams>,
) -> ApiResult<Response> {
    let page = match params.page_num.as_deref() {
        None => 1,
        Some(raw) => raw
            .trim()
            .parse::<i64>()
            .map_err(|_| ApiError::new(StatusCode::BAD_REQUEST, "Page number must be an integer"))?,
    };
    let limit = match params.limit.as_deref() {
        None => DEFAULT_PAGE_LIMIT,
        Some(raw) => match raw.trim().parse::<usize>() {
            Ok(limit) if limit > 0 => limit,
            _ => {
                return Err(ApiError::new(
                    StatusCode::BAD_REQUEST,
                    "Limit must be a positive integer",
                ))
            }
        },
    };

    let records = filter_by_date(
        state.store.list().await?,
        parse_date(params.start_date.as_deref()),
        parse_date(params.end_date.as_deref()),
    );

    Ok(Json(paginate(records, page, limit)).into_response())
}

async fn get_video(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> ApiResult<Json<VideoRecord>> {
    state
        .store
        .get(&id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::new(StatusCode::NOT_FOUND, "Not found."))
}

async fn write_video(
    State(state): State<ApiState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Response> {
    state.authorize(&headers)?;

    let record: VideoRecord = serde_json::from_slice(&body)
        .map_err(|e| ApiError::new(StatusCode::BAD_REQUEST, e.to_string()))?;
    record
        .validate()
        .map_err(|e| ApiError::new(StatusCode::BAD_REQUEST, e.to_string()))?;

    let (status, message) = match state.store.upsert(&record).await? {
        UpsertOutcome::Created => (StatusCode::CREATED, "Created video record."),
        UpsertOutcome::Updated => (StatusCode::OK, "Updated video record."),
    };

    Ok((status, Json(json!({ "message": message }))).into_response())
}

async fn delete_video(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.authorize(&headers)?;

    if state.store.delete(&id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::new(StatusCode::NOT_FOUND, "Not found."))
    }
}
