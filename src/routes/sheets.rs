use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::Method,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::Value;
use tower_http::cors::{Any, CorsLayer};

use crate::{
    error::AppError,
    models::{SaveResponse, SearchResponse, TableDescriptor, ViewResponse},
    services::{
        excel::{loader::BLANK_WORKBOOK_COLUMNS, writer::CellEdit},
        file_processor,
    },
    AppState,
};

const DEFAULT_CREATE_ROWS: u32 = 10;
const DEFAULT_CREATE_COLUMNS: u16 = 10;

pub fn routes() -> Router<Arc<AppState>> {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
        .max_age(std::time::Duration::from_secs(3600));

    Router::new()
        .route("/sheets/analyze", post(analyze_sheet))
        .route("/sheets/descriptor", get(get_descriptor))
        .route("/sheets/view", get(view_sheet))
        .route("/sheets/search", get(search_sheet))
        .route("/sheets/recreate", post(recreate_sheet))
        .route("/sheets/create", post(create_sheet))
        .route("/sheets/save", post(save_sheet))
        .layer(cors)
}

#[derive(Debug, Deserialize)]
pub struct FileRequest {
    file: String,
}

#[derive(Debug, Deserialize)]
pub struct ViewParams {
    file: String,
    sheet: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    file: String,
    #[serde(default)]
    q: String,
    column: Option<String>,
    sheet: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateRequest {
    file: String,
    rows: Option<u32>,
    cols: Option<u16>,
}

#[derive(Debug, Deserialize)]
pub struct SaveRequest {
    file: String,
    sheet: Option<String>,
    #[serde(default)]
    data: Vec<Vec<CellEdit>>,
    /// Any non-empty metadata marks a structure change: the sheet is cleared
    /// before the edits are written.
    #[serde(default)]
    metadata: Option<Value>,
}

fn clears_sheet(metadata: Option<&Value>) -> bool {
    match metadata {
        None | Some(Value::Null) => false,
        Some(Value::Object(map)) => !map.is_empty(),
        Some(Value::Array(items)) => !items.is_empty(),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().map_or(false, |n| n != 0.0),
    }
}

/// Resolves the request's file name and checks the upload exists.
fn existing_upload(state: &AppState, file: &str) -> Result<PathBuf, AppError> {
    let path = file_processor::resolve_upload_path(&state.config.upload_dir, file)?;
    file_processor::check_file(&path, state.config.max_file_size)?;
    Ok(path)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

async fn analyze_and_store(state: &AppState, file: &str) -> Result<TableDescriptor, AppError> {
    let path = existing_upload(state, file)?;
    let row_limit = state.config.analysis_row_limit;
    let descriptor =
        tokio::task::spawn_blocking(move || file_processor::analyze_workbook(&path, row_limit))
            .await?;
    state.store.put(file, descriptor.clone());
    Ok(descriptor)
}

async fn analyze_sheet(
    State(state): State<Arc<AppState>>,
    Json(request): Json<FileRequest>,
) -> Result<Json<TableDescriptor>, AppError> {
    tracing::info!("Analyzing {}", request.file);
    let descriptor = analyze_and_store(&state, &request.file).await?;
    Ok(Json(descriptor))
}

async fn get_descriptor(
    State(state): State<Arc<AppState>>,
    Query(request): Query<FileRequest>,
) -> Result<Json<TableDescriptor>, AppError> {
    if let Some(descriptor) = state.store.get(&request.file) {
        tracing::debug!("Replaying stored descriptor for {}", request.file);
        return Ok(Json(descriptor));
    }
    let descriptor = analyze_and_store(&state, &request.file).await?;
    Ok(Json(descriptor))
}

async fn view_sheet(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ViewParams>,
) -> Result<Json<ViewResponse>, AppError> {
    let path = existing_upload(&state, &params.file)?;
    let sheet = non_empty(params.sheet);

    let view = tokio::task::spawn_blocking(move || {
        file_processor::view_workbook(&path, sheet.as_deref())
    })
    .await?
    .map_err(|e| {
        tracing::error!("Error viewing {}: {}", params.file, e);
        e
    })?;

    if view.recovered {
        state.store.put(&params.file, TableDescriptor::blank(BLANK_WORKBOOK_COLUMNS));
    }
    Ok(Json(view))
}

async fn search_sheet(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, AppError> {
    if params.q.is_empty() {
        return Ok(Json(SearchResponse::empty()));
    }

    let path = existing_upload(&state, &params.file)?;
    let column = non_empty(params.column);
    let sheet = non_empty(params.sheet);
    let query = params.q;

    let response = tokio::task::spawn_blocking(move || {
        file_processor::search_workbook(&path, &query, column.as_deref(), sheet.as_deref())
    })
    .await?
    .map_err(|e| {
        tracing::error!("Search failed for {}: {}", params.file, e);
        AppError::Internal(e.to_string())
    })?;

    Ok(Json(response))
}

async fn recreate_sheet(
    State(state): State<Arc<AppState>>,
    Json(request): Json<FileRequest>,
) -> Result<Json<TableDescriptor>, AppError> {
    let path = file_processor::resolve_upload_path(&state.config.upload_dir, &request.file)?;
    tracing::info!("Recreating blank workbook at {}", path.display());

    let descriptor =
        tokio::task::spawn_blocking(move || file_processor::recreate_workbook(&path)).await??;
    state.store.put(&request.file, descriptor.clone());
    Ok(Json(descriptor))
}

async fn create_sheet(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateRequest>,
) -> Result<Json<TableDescriptor>, AppError> {
    let path = file_processor::resolve_upload_path(&state.config.upload_dir, &request.file)?;
    let rows = request.rows.unwrap_or(DEFAULT_CREATE_ROWS);
    let cols = request.cols.unwrap_or(DEFAULT_CREATE_COLUMNS);
    let row_limit = state.config.analysis_row_limit;
    tracing::info!("Creating {}x{} workbook at {}", rows, cols, path.display());

    let descriptor = tokio::task::spawn_blocking(move || {
        file_processor::create_workbook(&path, rows, cols, row_limit)
    })
    .await??;
    state.store.put(&request.file, descriptor.clone());
    Ok(Json(descriptor))
}

async fn save_sheet(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SaveRequest>,
) -> Result<Json<SaveResponse>, AppError> {
    let path = existing_upload(&state, &request.file)?;
    let clear = clears_sheet(request.metadata.as_ref());
    let sheet = non_empty(request.sheet);
    let data = request.data;
    let row_limit = state.config.analysis_row_limit;
    tracing::info!("Saving {} rows into {} (clear: {})", data.len(), request.file, clear);

    let descriptor = tokio::task::spawn_blocking(move || {
        file_processor::save_workbook(&path, sheet.as_deref(), &data, clear, row_limit)
    })
    .await?
    .map_err(|e| {
        tracing::error!("Error saving {}: {}", request.file, e);
        e
    })?;

    state.store.put(&request.file, descriptor.clone());
    Ok(Json(SaveResponse {
        success: true,
        message: "Spreadsheet saved successfully!".to_string(),
        descriptor,
    }))
}
