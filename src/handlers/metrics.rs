// src/handlers/metrics.rs

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::NaiveDate;
use serde::Deserialize;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::{
        auth::AuthenticatedUser,
        guards::{
            FeatureReports, RequireActiveSubscription, RequireFeature, RequireOnboarded,
            RequireRole, Staff,
        },
    },
    services::metrics::MetricsService,
};

#[derive(Debug, Deserialize)]
pub struct DailyMetricsQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

// GET /metrics/daily: os agregados da própria loja, gated pela feature
// `reports` (PRO por default).
pub async fn get_daily_metrics(
    State(app_state): State<AppState>,
    AuthenticatedUser(session): AuthenticatedUser,
    _role: RequireRole<Staff>,
    _sub: RequireActiveSubscription,
    _onboarded: RequireOnboarded,
    _feature: RequireFeature<FeatureReports>,
    Query(query): Query<DailyMetricsQuery>,
) -> Result<impl IntoResponse, AppError> {
    let cafe_id = session.require_cafe()?;

    let today = MetricsService::today();
    let from = query.from.unwrap_or(today);
    let to = query.to.unwrap_or(today);

    let rows = app_state.metrics_service.list_range(cafe_id, from, to).await?;
    Ok((StatusCode::OK, Json(rows)))
}
