// src/handlers/subscription.rs

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::AuthenticatedUser,
    models::features::SubscriptionView,
};

// A visão da própria loja: plano, status e o mapa efetivo de features como
// fonte única de verdade para o frontend.

// GET /subscription
#[utoipa::path(
    get,
    path = "/api/subscription",
    tag = "Subscription",
    responses(
        (status = 200, description = "Plano, status e features efetivas da loja", body = SubscriptionView),
        (status = 401, description = "Não autenticado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_subscription(
    State(app_state): State<AppState>,
    AuthenticatedUser(session): AuthenticatedUser,
) -> Result<impl IntoResponse, AppError> {
    let cafe_id = session.require_cafe()?;
    let view = app_state.subscription_service.get(cafe_id).await?;
    Ok((StatusCode::OK, Json(view)))
}

// GET /cafe/features
pub async fn get_features(
    State(app_state): State<AppState>,
    AuthenticatedUser(session): AuthenticatedUser,
) -> Result<impl IntoResponse, AppError> {
    let cafe_id = session.require_cafe()?;
    let features = app_state.feature_service.resolve(cafe_id).await?;
    Ok((StatusCode::OK, Json(features)))
}
