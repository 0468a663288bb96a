// src/handlers/onboarding.rs

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::AuthenticatedUser,
    models::{auth::Session, tenancy::OnboardingStepPayload},
};

// Estas rotas são as únicas de domínio isentas do guard de onboarding -
// senão ninguém conseguiria concluir o fluxo.

async fn onboarding_cafe(
    app_state: &AppState,
    session: &Session,
) -> Result<uuid::Uuid, AppError> {
    if let Some(cafe_id) = session.cafe_id {
        return Ok(cafe_id);
    }
    // Modo legado: cai na loja `default`, se existir.
    app_state
        .tenant_repo
        .find_default()
        .await?
        .map(|c| c.id)
        .ok_or(AppError::ForbiddenTenant)
}

// GET /onboarding/status
pub async fn get_status(
    State(app_state): State<AppState>,
    AuthenticatedUser(session): AuthenticatedUser,
) -> Result<impl IntoResponse, AppError> {
    let cafe_id = onboarding_cafe(&app_state, &session).await?;
    let status = app_state.onboarding_service.status(cafe_id).await?;
    Ok((StatusCode::OK, Json(status)))
}

// PUT /onboarding/step: salva progresso parcial (mapa livre)
pub async fn save_step(
    State(app_state): State<AppState>,
    AuthenticatedUser(session): AuthenticatedUser,
    Json(payload): Json<OnboardingStepPayload>,
) -> Result<impl IntoResponse, AppError> {
    let cafe_id = onboarding_cafe(&app_state, &session).await?;
    let status = app_state
        .onboarding_service
        .save_step(cafe_id, &payload.data)
        .await?;
    Ok((StatusCode::OK, Json(status)))
}

// POST /onboarding/complete
pub async fn complete(
    State(app_state): State<AppState>,
    AuthenticatedUser(session): AuthenticatedUser,
) -> Result<impl IntoResponse, AppError> {
    let cafe_id = onboarding_cafe(&app_state, &session).await?;
    let status = app_state.onboarding_service.complete(cafe_id).await?;
    Ok((StatusCode::OK, Json(status)))
}
