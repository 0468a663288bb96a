// src/handlers/settings.rs

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{db_utils::resolve_tenant, error::AppError},
    config::AppState,
    middleware::{
        auth::AuthenticatedUser,
        guards::{AdminOnly, RequireActiveSubscription, RequireOnboarded, RequireRole, Staff},
    },
    models::settings::{
        CreatePaymentMethodPayload, UpdateCafeSettingsPayload, UpdateCurrencySettingPayload,
        UpdatePaymentMethodPayload, UpdateTaxSettingPayload,
    },
};

// As tabelas de configuração são por loja; o handler resolve a loja efetiva
// (a da sessão, ou `default` no modo legado) e falha se não houver nenhuma.
async fn settings_cafe(app_state: &AppState, session: &crate::models::auth::Session) -> Result<Uuid, AppError> {
    if let Some(cafe_id) = session.cafe_id {
        return Ok(cafe_id);
    }
    let default_cafe = app_state.tenant_repo.find_default().await?;
    default_cafe.map(|c| c.id).ok_or(AppError::TenantNotFound)
}

// ---
// Configurações gerais
// ---

pub async fn get_cafe_settings(
    State(app_state): State<AppState>,
    AuthenticatedUser(session): AuthenticatedUser,
    _role: RequireRole<Staff>,
    _onboarded: RequireOnboarded,
) -> Result<impl IntoResponse, AppError> {
    let cafe_id = settings_cafe(&app_state, &session).await?;
    let settings = app_state.settings_repo.get_cafe_settings(cafe_id).await?;
    Ok((StatusCode::OK, Json(settings)))
}

pub async fn update_cafe_settings(
    State(app_state): State<AppState>,
    AuthenticatedUser(session): AuthenticatedUser,
    _role: RequireRole<AdminOnly>,
    _sub: RequireActiveSubscription,
    _onboarded: RequireOnboarded,
    Json(payload): Json<UpdateCafeSettingsPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let cafe_id = settings_cafe(&app_state, &session).await?;
    let settings = app_state
        .settings_repo
        .update_cafe_settings(cafe_id, &payload)
        .await?;
    Ok((StatusCode::OK, Json(settings)))
}

// ---
// Impostos
// ---

pub async fn get_tax_settings(
    State(app_state): State<AppState>,
    AuthenticatedUser(session): AuthenticatedUser,
    _role: RequireRole<Staff>,
    _onboarded: RequireOnboarded,
) -> Result<impl IntoResponse, AppError> {
    let cafe_id = settings_cafe(&app_state, &session).await?;
    let setting = app_state.settings_repo.get_tax_setting(cafe_id).await?;
    Ok((StatusCode::OK, Json(setting)))
}

pub async fn update_tax_settings(
    State(app_state): State<AppState>,
    AuthenticatedUser(session): AuthenticatedUser,
    _role: RequireRole<AdminOnly>,
    _sub: RequireActiveSubscription,
    _onboarded: RequireOnboarded,
    Json(payload): Json<UpdateTaxSettingPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let cafe_id = settings_cafe(&app_state, &session).await?;
    let setting = app_state
        .settings_repo
        .update_tax_setting(cafe_id, &payload)
        .await?;
    Ok((StatusCode::OK, Json(setting)))
}

// ---
// Moeda
// ---

pub async fn get_currency_settings(
    State(app_state): State<AppState>,
    AuthenticatedUser(session): AuthenticatedUser,
    _role: RequireRole<Staff>,
    _onboarded: RequireOnboarded,
) -> Result<impl IntoResponse, AppError> {
    let cafe_id = settings_cafe(&app_state, &session).await?;
    let setting = app_state.settings_repo.get_currency_setting(cafe_id).await?;
    Ok((StatusCode::OK, Json(setting)))
}

pub async fn update_currency_settings(
    State(app_state): State<AppState>,
    AuthenticatedUser(session): AuthenticatedUser,
    _role: RequireRole<AdminOnly>,
    _sub: RequireActiveSubscription,
    _onboarded: RequireOnboarded,
    Json(payload): Json<UpdateCurrencySettingPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let cafe_id = settings_cafe(&app_state, &session).await?;
    let setting = app_state
        .settings_repo
        .update_currency_setting(cafe_id, &payload)
        .await?;
    Ok((StatusCode::OK, Json(setting)))
}

// ---
// Formas de pagamento
// ---

pub async fn list_payment_methods(
    State(app_state): State<AppState>,
    AuthenticatedUser(session): AuthenticatedUser,
    _role: RequireRole<Staff>,
    _onboarded: RequireOnboarded,
) -> Result<impl IntoResponse, AppError> {
    let (scope, _) = resolve_tenant(
        &app_state,
        &session,
        app_state.capabilities.payment_methods_cafe_id,
    )
    .await?;

    let methods = app_state.settings_repo.list_payment_methods(scope).await?;
    Ok((StatusCode::OK, Json(methods)))
}

pub async fn create_payment_method(
    State(app_state): State<AppState>,
    AuthenticatedUser(session): AuthenticatedUser,
    _role: RequireRole<AdminOnly>,
    _sub: RequireActiveSubscription,
    _onboarded: RequireOnboarded,
    Json(payload): Json<CreatePaymentMethodPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let (scope, _) = resolve_tenant(
        &app_state,
        &session,
        app_state.capabilities.payment_methods_cafe_id,
    )
    .await?;

    let method = app_state
        .settings_repo
        .create_payment_method(scope, &payload)
        .await?;
    Ok((StatusCode::CREATED, Json(method)))
}

pub async fn update_payment_method(
    State(app_state): State<AppState>,
    AuthenticatedUser(session): AuthenticatedUser,
    _role: RequireRole<AdminOnly>,
    _sub: RequireActiveSubscription,
    _onboarded: RequireOnboarded,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdatePaymentMethodPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let (scope, _) = resolve_tenant(
        &app_state,
        &session,
        app_state.capabilities.payment_methods_cafe_id,
    )
    .await?;

    let method = app_state
        .settings_repo
        .update_payment_method(scope, id, &payload)
        .await?;
    Ok((StatusCode::OK, Json(method)))
}

pub async fn delete_payment_method(
    State(app_state): State<AppState>,
    AuthenticatedUser(session): AuthenticatedUser,
    _role: RequireRole<AdminOnly>,
    _sub: RequireActiveSubscription,
    _onboarded: RequireOnboarded,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let (scope, _) = resolve_tenant(
        &app_state,
        &session,
        app_state.capabilities.payment_methods_cafe_id,
    )
    .await?;

    app_state.settings_repo.delete_payment_method(scope, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
