use std::path::PathBuf;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Failures raised by the workbook pipeline.
#[derive(Debug, Error)]
pub enum SheetError {
    #[error("Workbook {path} could not be read: {reason}")]
    CorruptWorkbook { path: PathBuf, reason: String },

    #[error("Sheet '{sheet}' has no data rows after cleaning")]
    EmptySheet { sheet: String },

    #[error("Sheet '{requested}' not found (available: {})", available.join(", "))]
    UnsupportedSheetSelection {
        requested: String,
        available: Vec<String>,
    },

    #[error("Edited cell at row {row}, column {col} lies outside the worksheet")]
    EditOutOfRange { row: usize, col: usize },

    #[error("Failed to write workbook: {0}")]
    WorkbookWrite(#[from] rust_xlsxwriter::XlsxError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SheetError {
    pub fn corrupt(path: impl Into<PathBuf>, reason: impl std::fmt::Display) -> Self {
        SheetError::CorruptWorkbook {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error(transparent)]
    Sheet(#[from] SheetError),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Sheet(SheetError::CorruptWorkbook { .. })
            | AppError::Sheet(SheetError::EmptySheet { .. })
            | AppError::Sheet(SheetError::UnsupportedSheetSelection { .. })
            | AppError::Sheet(SheetError::EditOutOfRange { .. }) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            AppError::Sheet(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::IoError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}
