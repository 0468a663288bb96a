// src/handlers/inventory.rs

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
        guards::{AdminOnly, FeatureInventory, RequireActiveSubscription, RequireFeature, RequireOnboarded, RequireRole, Staff},
    },
    models::inventory::{CreateInventoryItemPayload, UpdateInventoryItemPayload},
};

// O estoque é a feature gated por plano: FREE não tem, PRO tem, e o Super
// Admin pode ligar/desligar por loja via override. A ordem dos extratores
// garante que "feature desabilitada" só aparece depois de autenticação,
// assinatura e onboarding passarem.

pub async fn list_inventory(
    State(app_state): State<AppState>,
    AuthenticatedUser(session): AuthenticatedUser,
    _role: RequireRole<Staff>,
    _sub: RequireActiveSubscription,
    _onboarded: RequireOnboarded,
    _feature: RequireFeature<FeatureInventory>,
) -> Result<impl IntoResponse, AppError> {
    let (scope, _) =
        resolve_tenant(&app_state, &session, app_state.capabilities.inventory_cafe_id).await?;

    let items = app_state.inventory_repo.list(scope).await?;
    Ok((StatusCode::OK, Json(items)))
}

pub async fn create_inventory_item(
    State(app_state): State<AppState>,
    AuthenticatedUser(session): AuthenticatedUser,
    _role: RequireRole<AdminOnly>,
    _sub: RequireActiveSubscription,
    _onboarded: RequireOnboarded,
    _feature: RequireFeature<FeatureInventory>,
    Json(payload): Json<CreateInventoryItemPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let (scope, _) =
        resolve_tenant(&app_state, &session, app_state.capabilities.inventory_cafe_id).await?;

    let item = app_state.inventory_repo.create(scope, &payload).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

pub async fn update_inventory_item(
    State(app_state): State<AppState>,
    AuthenticatedUser(session): AuthenticatedUser,
    _role: RequireRole<AdminOnly>,
    _sub: RequireActiveSubscription,
    _onboarded: RequireOnboarded,
    _feature: RequireFeature<FeatureInventory>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateInventoryItemPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let (scope, _) =
        resolve_tenant(&app_state, &session, app_state.capabilities.inventory_cafe_id).await?;

    let item = app_state.inventory_repo.update(scope, id, &payload).await?;
    Ok((StatusCode::OK, Json(item)))
}

pub async fn delete_inventory_item(
    State(app_state): State<AppState>,
    AuthenticatedUser(session): AuthenticatedUser,
    _role: RequireRole<AdminOnly>,
    _sub: RequireActiveSubscription,
    _onboarded: RequireOnboarded,
    _feature: RequireFeature<FeatureInventory>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let (scope, _) =
        resolve_tenant(&app_state, &session, app_state.capabilities.inventory_cafe_id).await?;

    app_state.inventory_repo.soft_delete(scope, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
