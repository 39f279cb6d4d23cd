//! Axum server and routes.

use axum::{
    body::Bytes,
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use fwlog_ingest::IngestionService;
use fwlog_types::{
    parse_date_bound, BaseResponse, IngestStatus, LogEntry, LogPage, LogQuery, LogStore,
    UploadResponse, UploadResult,
};
use serde::Deserialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{error, info, warn};
use uuid::Uuid;

pub struct AppState {
    pub ingestion: Arc<IngestionService>,
    pub store: Arc<dyn LogStore + Send + Sync>,
    /// Request body cap for uploads.
    pub max_upload_bytes: usize,
}

pub fn router(state: Arc<AppState>) -> Router {
    let body_limit = state.max_upload_bytes;
    Router::new()
        .route("/api/logs", get(handle_list))
        .route("/api/logs/upload", post(handle_upload))
        .route("/api/logs/:id", get(handle_get))
        .route("/health", get(handle_health))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

type Reply<T> = (StatusCode, Json<BaseResponse<T>>);

fn reply<T>(status: StatusCode, message: impl Into<String>, data: Option<T>) -> Reply<T> {
    (
        status,
        Json(BaseResponse {
            code: i32::from(status.as_u16()),
            message: message.into(),
            data,
        }),
    )
}

struct UploadedFile {
    file_name: String,
    bytes: Bytes,
}

/// First `file` part; `None` when there is none or it is empty.
async fn read_file_part(multipart: &mut Multipart) -> Result<Option<UploadedFile>, MultipartError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let bytes = field.bytes().await?;
        if bytes.is_empty() {
            return Ok(None);
        }
        return Ok(Some(UploadedFile { file_name, bytes }));
    }
    Ok(None)
}

fn has_csv_extension(file_name: &str) -> bool {
    std::path::Path::new(file_name)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
}

async fn handle_upload(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> (StatusCode, Json<UploadResponse>) {
    let upload = match read_file_part(&mut multipart).await {
        Ok(Some(upload)) => upload,
        Ok(None) => {
            return reply(
                StatusCode::BAD_REQUEST,
                "No file uploaded or file is empty.",
                None,
            )
        }
        Err(e) => return reply(e.status(), e.body_text(), None),
    };
    if !has_csv_extension(&upload.file_name) {
        return reply(
            StatusCode::BAD_REQUEST,
            "Invalid file type. Please upload a CSV file.",
            None,
        );
    }

    let upload_id = Uuid::new_v4().to_string();
    let file_name = upload.file_name;
    let bytes = upload.bytes;
    let ingestion = Arc::clone(&state.ingestion);
    let report = match tokio::task::spawn_blocking(move || ingestion.ingest(&bytes[..])).await {
        Ok(Ok(report)) => report,
        Ok(Err(e)) => {
            warn!(upload_id = %upload_id, file = %file_name, error = %e, "upload rejected");
            return reply(StatusCode::BAD_REQUEST, e.to_string(), None);
        }
        Err(e) => {
            error!(upload_id = %upload_id, error = %e, "ingestion task failed");
            return reply(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error while processing the file.",
                None,
            );
        }
    };

    if report.summary.status == IngestStatus::NothingToPersist {
        info!(upload_id = %upload_id, file = %file_name, "upload had no valid log entries");
        return reply(
            StatusCode::OK,
            "File processed, but no valid log entries found or file was empty after parsing.",
            Some(UploadResult {
                upload_id,
                saved: 0,
                summary: report.summary,
            }),
        );
    }

    match state.store.insert_batch(&report.records).await {
        Ok(ids) => {
            info!(upload_id = %upload_id, file = %file_name, saved = ids.len(), "upload stored");
            reply(
                StatusCode::OK,
                format!("{} log entries processed and saved successfully.", ids.len()),
                Some(UploadResult {
                    upload_id,
                    saved: ids.len(),
                    summary: report.summary,
                }),
            )
        }
        Err(e) => {
            error!(upload_id = %upload_id, error = %e, "failed to store log entries");
            reply(StatusCode::INTERNAL_SERVER_ERROR, e.to_string(), None)
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ListLogsQuery {
    #[serde(default, alias = "pageNumber")]
    pub page: Option<i64>,
    #[serde(default, alias = "pageSize")]
    pub page_size: Option<i64>,
    #[serde(default, alias = "sourceIpFilter")]
    pub source_ip: Option<String>,
    #[serde(default, alias = "destinationIpFilter")]
    pub destination_ip: Option<String>,
    #[serde(default, alias = "actionFilter")]
    pub action: Option<String>,
    #[serde(default, alias = "startDate")]
    pub start_date: Option<String>,
    #[serde(default, alias = "endDate")]
    pub end_date: Option<String>,
}

impl ListLogsQuery {
    fn into_log_query(self) -> Result<LogQuery, String> {
        let bound = |v: Option<String>| v.as_deref().map(parse_date_bound).transpose();
        Ok(LogQuery {
            source_ip: self.source_ip,
            destination_ip: self.destination_ip,
            action: self.action,
            start: bound(self.start_date)?,
            end: bound(self.end_date)?,
            ..LogQuery::default()
        }
        .paged(self.page, self.page_size))
    }
}

async fn handle_list(
    State(state): State<Arc<AppState>>,
    Query(q): Query<ListLogsQuery>,
) -> Reply<LogPage<LogEntry>> {
    let query = match q.into_log_query() {
        Ok(query) => query,
        Err(msg) => return reply(StatusCode::BAD_REQUEST, msg, None),
    };
    match state.store.query(&query).await {
        Ok(page) => reply(
            StatusCode::OK,
            "Success",
            Some(page.map_items(|stored| LogEntry::from(&stored))),
        ),
        Err(e) => {
            error!(error = %e, "failed to query log entries");
            reply(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error while retrieving log entries.",
                None,
            )
        }
    }
}

async fn handle_get(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Reply<LogEntry> {
    match state.store.get(id).await {
        Ok(Some(stored)) => reply(StatusCode::OK, "Success", Some(LogEntry::from(&stored))),
        Ok(None) => reply(StatusCode::NOT_FOUND, "Log entry not found", None),
        Err(e) => {
            error!(id, error = %e, "failed to load log entry");
            reply(StatusCode::INTERNAL_SERVER_ERROR, e.to_string(), None)
        }
    }
}

async fn handle_health() -> &'static str {
    "ok"
}
