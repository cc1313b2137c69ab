//! Transaction handlers

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{Local, NaiveDate};
use faturai_core::{DatePreset, DateRange, Money, SortOrder, Transaction, TransactionQuery};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{AppError, AppState, CurrentUser, MAX_PER_PAGE};

/// Resolves `preset` or `start`/`end` into a range. An open side extends
/// as far as the data goes.
pub(crate) fn resolve_range(
    preset: Option<&str>,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Result<Option<DateRange>, AppError> {
    if let Some(preset) = preset.filter(|p| !p.is_empty() && *p != "all") {
        let preset: DatePreset = preset
            .parse()
            .map_err(|e: String| AppError::bad_request(&e))?;
        return Ok(Some(preset.range(Local::now().date_naive())));
    }
    Ok(match (start, end) {
        (None, None) => None,
        (start, end) => Some(DateRange::new(
            start.unwrap_or(NaiveDate::MIN),
            end.unwrap_or(NaiveDate::MAX),
        )),
    })
}

/// Query parameters for listing transactions
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    /// Date preset (this-month, last-3-months, ...)
    pub preset: Option<String>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub category: Option<String>,
    /// Matches description or category
    pub search: Option<String>,
    /// date_desc (default), date_asc, amount_desc or amount_asc
    pub sort: Option<String>,
    pub page: Option<usize>,
    pub per_page: Option<usize>,
}

/// GET /api/transactions
///
/// Without `page` the full filtered list is returned as an array; with it,
/// a page object carrying totals.
pub async fn list_transactions(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Query(params): Query<ListParams>,
) -> Result<Response, AppError> {
    let range = resolve_range(params.preset.as_deref(), params.start, params.end)?;
    let sort = match params.sort.as_deref() {
        Some(s) => s
            .parse::<SortOrder>()
            .map_err(|e| AppError::bad_request(&e))?,
        None => SortOrder::default(),
    };

    // Open-ended ranges are applied in memory only.
    let db_range = range.filter(|r| r.start > NaiveDate::MIN && r.end < NaiveDate::MAX);
    let transactions = faturai_storage::get_transactions(&state.db, user.id, db_range).await?;
    let query = TransactionQuery {
        range,
        category: params.category,
        search: params.search,
        sort,
        page: params.page,
        per_page: params.per_page.map(|n| n.clamp(1, MAX_PER_PAGE)),
    };
    let page = query.apply(&transactions);

    if params.page.is_some() {
        Ok(Json(page).into_response())
    } else {
        Ok(Json(page.items).into_response())
    }
}

/// One element of the POST /api/transactions body
#[derive(Debug, Deserialize)]
pub struct NewTransaction {
    pub date: NaiveDate,
    pub description: String,
    pub amount: Money,
    pub category: Option<String>,
    pub source: Option<String>,
}

/// POST /api/transactions - store a batch for the logged-in user
///
/// Missing categories are filled in by the detector.
pub async fn create_transactions(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Json(body): Json<Vec<NewTransaction>>,
) -> Result<(StatusCode, Json<Vec<Transaction>>), AppError> {
    let mut transactions = Vec::with_capacity(body.len());
    for item in body {
        let description = item.description.trim();
        if description.is_empty() {
            return Err(AppError::bad_request("Every transaction needs a description"));
        }
        let category = match item.category.as_deref().map(str::trim) {
            Some(c) if !c.is_empty() => c.to_string(),
            _ => state.detector.detect(description).to_string(),
        };
        transactions.push(
            Transaction::new(item.date, description, item.amount, &category).with_source(item.source),
        );
    }

    let ids = faturai_storage::insert_transactions(&state.db, user.id, &transactions).await?;
    for (tx, id) in transactions.iter_mut().zip(ids) {
        tx.id = Some(id);
    }
    info!(user = %user.username, count = transactions.len(), "Transactions stored");

    Ok((StatusCode::CREATED, Json(transactions)))
}

#[derive(Debug, Deserialize)]
pub struct DeleteParams {
    /// Only remove transactions imported from this file
    pub source: Option<String>,
}

#[derive(Serialize)]
pub struct DeleteResponse {
    pub deleted: u64,
}

/// DELETE /api/transactions[?source=file.csv]
pub async fn delete_transactions(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Query(params): Query<DeleteParams>,
) -> Result<Json<DeleteResponse>, AppError> {
    let deleted = match params.source.as_deref() {
        Some(source) => {
            faturai_storage::delete_transactions_by_source(&state.db, user.id, source).await?
        }
        None => faturai_storage::clear_transactions(&state.db, user.id).await?,
    };
    info!(user = %user.username, deleted, source = ?params.source, "Transactions deleted");
    Ok(Json(DeleteResponse { deleted }))
}

#[derive(Debug, Deserialize)]
pub struct CategoryUpdate {
    pub category: String,
}

/// PATCH /api/transactions/{id}/category
pub async fn update_category(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
    Json(body): Json<CategoryUpdate>,
) -> Result<Json<serde_json::Value>, AppError> {
    let category = body.category.trim();
    if category.is_empty() {
        return Err(AppError::bad_request("Category cannot be empty"));
    }
    if !faturai_storage::update_transaction_category(&state.db, user.id, id, category).await? {
        return Err(AppError::not_found("Transaction not found"));
    }
    Ok(Json(serde_json::json!({ "id": id, "category": category })))
}
