//! CSV upload handler

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use faturai_core::Transaction;
use faturai_import::{CsvImporter, ImportOptions, SkippedRow};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{AppError, AppState, CurrentUser};

#[derive(Debug, Deserialize)]
pub struct ImportQuery {
    /// Original file name; stored as each transaction's source
    pub filename: Option<String>,
}

#[derive(Serialize)]
pub struct ImportResponse {
    pub imported: usize,
    pub skipped: Vec<SkippedRow>,
    pub transactions: Vec<Transaction>,
}

/// POST /api/import - raw CSV body through the import pipeline
///
/// File-level failures (empty file, missing columns, no valid rows) are
/// returned as 422 with the pipeline's message; nothing is stored.
pub async fn import_csv(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Query(params): Query<ImportQuery>,
    body: Bytes,
) -> Result<(StatusCode, Json<ImportResponse>), AppError> {
    if let Some(name) = params.filename.as_deref() {
        if !faturai_import::is_csv_path(std::path::Path::new(name)) {
            return Err(AppError::bad_request("Only .csv files can be imported"));
        }
    }

    let options = ImportOptions {
        source: params.filename.clone(),
        ..state.config.import.clone()
    };
    let outcome = CsvImporter::new()
        .import(&body[..], &state.detector, &options)
        .map_err(|e| AppError::unprocessable(&e.to_string()))?;

    let ids = faturai_storage::insert_transactions(&state.db, user.id, &outcome.transactions).await?;
    let transactions: Vec<Transaction> = outcome
        .transactions
        .into_iter()
        .zip(ids)
        .map(|(mut tx, id)| {
            tx.id = Some(id);
            tx
        })
        .collect();

    info!(
        user = %user.username,
        file = params.filename.as_deref().unwrap_or("-"),
        imported = transactions.len(),
        skipped = outcome.skipped.len(),
        "CSV uploaded"
    );

    Ok((
        StatusCode::CREATED,
        Json(ImportResponse {
            imported: transactions.len(),
            skipped: outcome.skipped,
            transactions,
        }),
    ))
}
