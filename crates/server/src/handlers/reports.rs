//! Dashboard and category handlers

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{Local, NaiveDate};
use faturai_core::summary::{
    category_breakdown, daily_frequency, merchant_timeline, spending_trend, CategoryTotal,
    DailyCount, DailyTotal, MerchantSeries, DEFAULT_FREQUENCY_DAYS, DEFAULT_MERCHANT_LIMIT,
};
use faturai_core::{CategoryDefinition, Summary, TimeFrame, TransactionQuery};
use serde::{Deserialize, Serialize};

use super::transactions::resolve_range;
use crate::{AppError, AppState, CurrentUser};

#[derive(Debug, Default, Deserialize)]
pub struct SummaryParams {
    pub preset: Option<String>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    /// Merchant name filter for the timeline
    pub merchant: Option<String>,
    /// Window of the trend series: 7D, 30D (default), 90D or 12M
    pub timeframe: Option<String>,
}

#[derive(Serialize)]
pub struct SummaryResponse {
    #[serde(flatten)]
    pub summary: Summary,
    pub categories: Vec<CategoryTotal>,
    pub merchants: Vec<MerchantSeries>,
    pub frequency: Vec<DailyCount>,
    pub trend: Vec<DailyTotal>,
}

/// GET /api/summary
pub async fn get_summary(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Query(params): Query<SummaryParams>,
) -> Result<Json<SummaryResponse>, AppError> {
    let range = resolve_range(params.preset.as_deref(), params.start, params.end)?;
    let timeframe = match params.timeframe.as_deref() {
        Some(t) => t
            .parse::<TimeFrame>()
            .map_err(|e| AppError::bad_request(&e))?,
        None => TimeFrame::Month,
    };

    let all = faturai_storage::get_transactions(&state.db, user.id, None).await?;
    let filtered = TransactionQuery {
        range,
        ..Default::default()
    }
    .apply(&all)
    .items;

    let today = Local::now().date_naive();
    Ok(Json(SummaryResponse {
        summary: Summary::compute(&filtered),
        categories: category_breakdown(&filtered),
        merchants: merchant_timeline(&filtered, params.merchant.as_deref(), DEFAULT_MERCHANT_LIMIT),
        frequency: daily_frequency(&all, today, DEFAULT_FREQUENCY_DAYS),
        trend: spending_trend(&all, today, timeframe),
    }))
}

/// GET /api/categories - the dictionary used for detection, in match order
pub async fn list_categories(State(state): State<Arc<AppState>>) -> Json<Vec<CategoryDefinition>> {
    Json(state.categories.categories().to_vec())
}
