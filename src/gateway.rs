//! HTTP boundary over [`CatalogService`].
//!
//! Responses use a `{ "success": bool, ... }` envelope. Every NotFound,
//! whether the record or its file is missing, maps to the same 404 body.

use crate::catalog::{
    CatalogError, CatalogIndex, CatalogService, DocumentId, FileResolver, ListQuery, MetadataStore,
};
use crate::config::Config;
use anyhow::Context;
use axum::body::Body;
use axum::error_handling::HandleErrorLayer;
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::io::ReaderStream;
use tower::ServiceBuilder;
use tower::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

const NOT_FOUND_MESSAGE: &str = "document not found";

type SharedService<S> = Arc<CatalogService<S>>;

/// Query string of the list endpoint. Numbers stay strings so a malformed
/// value falls back to its default instead of rejecting the request.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ListParams {
    pub q: Option<String>,
    pub page: Option<String>,
    pub per_page: Option<String>,
}

impl ListParams {
    /// Collect the recognised keys from raw pairs. The first occurrence of a
    /// key wins; `perPage` is accepted for `per_page`. Unknown keys are ignored.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (String, String)>) -> Self {
        let mut params = Self::default();
        for (key, value) in pairs {
            let slot = match key.as_str() {
                "q" => &mut params.q,
                "page" => &mut params.page,
                "per_page" | "perPage" => &mut params.per_page,
                _ => continue,
            };
            slot.get_or_insert(value);
        }
        params
    }

    fn into_query(self) -> ListQuery {
        ListQuery {
            keyword: self.q,
            page: lenient_int(self.page.as_deref()),
            per_page: lenient_int(self.per_page.as_deref()),
        }
    }
}

fn lenient_int(raw: Option<&str>) -> Option<i64> {
    raw.and_then(|s| s.trim().parse().ok())
}

#[derive(Debug, Serialize)]
struct Pagination {
    page: u32,
    per_page: u32,
    total: u64,
    pages: u64,
}

/// A [`CatalogError`] on its way out of a handler.
#[derive(Debug)]
pub struct ApiError(CatalogError);

impl From<CatalogError> for ApiError {
    fn from(err: CatalogError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            CatalogError::NotFound(missing) => {
                tracing::debug!(%missing, "lookup came up empty");
                (StatusCode::NOT_FOUND, NOT_FOUND_MESSAGE.to_string())
            }
            CatalogError::InvalidInput(message) => (StatusCode::BAD_REQUEST, message.clone()),
            CatalogError::StoreUnavailable { .. } => {
                tracing::error!(error = %self.0, "metadata store unavailable");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "catalog temporarily unavailable".to_string(),
                )
            }
        };
        (status, Json(json!({ "success": false, "error": message }))).into_response()
    }
}

/// Build the gateway router for any metadata store.
pub fn router<S: MetadataStore>(service: SharedService<S>, request_timeout: Option<Duration>) -> Router {
    let router = Router::new()
        .route("/", get(index))
        .route("/api/documents", get(list_documents::<S>))
        .route("/api/documents/{id}", get(document_detail::<S>))
        .route("/api/documents/{id}/download", get(download_document::<S>))
        .route("/api/stats", get(catalog_stats::<S>))
        .fallback(unknown_endpoint)
        .with_state(service);

    let router = match request_timeout {
        Some(timeout) => router.layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(handle_timeout_error))
                .layer(TimeoutLayer::new(timeout)),
        ),
        None => router,
    };
    router.layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
}

async fn index() -> Json<serde_json::Value> {
    Json(json!({
        "success": true,
        "message": "textshelf catalog is running",
        "endpoints": {
            "list": "/api/documents?q=keyword&page=1&per_page=20",
            "detail": "/api/documents/{id}",
            "download": "/api/documents/{id}/download",
            "stats": "/api/stats",
        }
    }))
}

async fn list_documents<S: MetadataStore>(
    State(service): State<SharedService<S>>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let params = ListParams::from_pairs(pairs);
    let page = service.list_or_search(params.into_query()).await?;
    let pagination = Pagination {
        page: page.page,
        per_page: page.per_page,
        total: page.matched_total,
        pages: page.pages,
    };
    Ok(Json(json!({
        "success": true,
        "data": page.records,
        "pagination": pagination,
    })))
}

async fn document_detail<S: MetadataStore>(
    State(service): State<SharedService<S>>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let record = service.get_detail(DocumentId::parse(&id)?).await?;
    Ok(Json(json!({ "success": true, "data": record })))
}

async fn download_document<S: MetadataStore>(
    State(service): State<SharedService<S>>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let stream = service.get_download_stream(DocumentId::parse(&id)?).await?;
    let headers = [
        (header::CONTENT_TYPE, HeaderValue::from_static(stream.content_type())),
        (header::CONTENT_LENGTH, HeaderValue::from(stream.len())),
        (header::CONTENT_DISPOSITION, content_disposition(stream.suggested_name())),
    ];
    let body = Body::from_stream(ReaderStream::new(stream.into_file()));
    Ok((StatusCode::OK, headers, body).into_response())
}

async fn catalog_stats<S: MetadataStore>(
    State(service): State<SharedService<S>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let stats = service.get_stats().await?;
    Ok(Json(json!({ "success": true, "data": stats })))
}

async fn handle_timeout_error(err: tower::BoxError) -> (StatusCode, Json<serde_json::Value>) {
    let (status, message) = if err.is::<tower::timeout::error::Elapsed>() {
        (StatusCode::REQUEST_TIMEOUT, "request timed out".to_string())
    } else {
        tracing::error!(%err, "request failed in middleware");
        (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string())
    };
    (status, Json(json!({ "success": false, "error": message })))
}

async fn unknown_endpoint() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "success": false, "error": "no such endpoint" })),
    )
}

/// `attachment` with an ASCII fallback name plus the RFC 5987 UTF-8 form.
fn content_disposition(name: &str) -> HeaderValue {
    let fallback: String = name
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c == ' ' || c.is_ascii_graphic() => c,
            _ => '_',
        })
        .collect();
    let value = format!(
        "attachment; filename=\"{fallback}\"; filename*=UTF-8''{}",
        urlencoding::encode(name)
    );
    HeaderValue::from_str(&value).unwrap_or_else(|_| HeaderValue::from_static("attachment"))
}

/// Serve the catalog until Ctrl-C.
pub async fn serve(config: &Config) -> anyhow::Result<()> {
    let db_path = config.database_path();
    if !db_path.is_file() {
        tracing::warn!(path = %db_path.display(), "catalog database not found; run `textshelf import` first");
    }

    let store = Arc::new(CatalogIndex::open(db_path));
    let resolver = FileResolver::new(&config.catalog.document_root);
    let service = Arc::new(CatalogService::new(store, resolver));
    let app = router(service, config.request_timeout());

    let address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {address}"))?;
    tracing::info!(address = %listener.local_addr()?, "catalog gateway listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Gateway terminated with an error")?;
    tracing::info!("catalog gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(%err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
