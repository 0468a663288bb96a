// src/handlers/customers.rs

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
        guards::{AdminOnly, FrontOfHouse, RequireActiveSubscription, RequireOnboarded, RequireRole},
    },
    models::customers::{CreateCustomerPayload, UpdateCustomerPayload},
};

pub async fn list_customers(
    State(app_state): State<AppState>,
    AuthenticatedUser(session): AuthenticatedUser,
    _role: RequireRole<FrontOfHouse>,
    _sub: RequireActiveSubscription,
    _onboarded: RequireOnboarded,
) -> Result<impl IntoResponse, AppError> {
    let (scope, _) =
        resolve_tenant(&app_state, &session, app_state.capabilities.customers_cafe_id).await?;

    let customers = app_state.customer_repo.list(scope).await?;
    Ok((StatusCode::OK, Json(customers)))
}

pub async fn get_customer(
    State(app_state): State<AppState>,
    AuthenticatedUser(session): AuthenticatedUser,
    _role: RequireRole<FrontOfHouse>,
    _sub: RequireActiveSubscription,
    _onboarded: RequireOnboarded,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let (scope, _) =
        resolve_tenant(&app_state, &session, app_state.capabilities.customers_cafe_id).await?;

    let customer = app_state
        .customer_repo
        .find_by_id(scope, id)
        .await?
        .ok_or(AppError::NotFound("Cliente"))?;
    Ok((StatusCode::OK, Json(customer)))
}

pub async fn create_customer(
    State(app_state): State<AppState>,
    AuthenticatedUser(session): AuthenticatedUser,
    _role: RequireRole<FrontOfHouse>,
    _sub: RequireActiveSubscription,
    _onboarded: RequireOnboarded,
    Json(payload): Json<CreateCustomerPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let (scope, attribution) =
        resolve_tenant(&app_state, &session, app_state.capabilities.customers_cafe_id).await?;

    let customer = app_state
        .customer_repo
        .create(&app_state.db_pool, scope, &payload, "manual")
        .await?;

    // Cliente novo conta no agregado do dia (best-effort).
    if let Some(cafe_id) = attribution {
        app_state.metrics_service.customer_created(cafe_id, true).await;
    }

    Ok((StatusCode::CREATED, Json(customer)))
}

pub async fn update_customer(
    State(app_state): State<AppState>,
    AuthenticatedUser(session): AuthenticatedUser,
    _role: RequireRole<FrontOfHouse>,
    _sub: RequireActiveSubscription,
    _onboarded: RequireOnboarded,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateCustomerPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let (scope, _) =
        resolve_tenant(&app_state, &session, app_state.capabilities.customers_cafe_id).await?;

    let customer = app_state.customer_repo.update(scope, id, &payload).await?;
    Ok((StatusCode::OK, Json(customer)))
}

pub async fn delete_customer(
    State(app_state): State<AppState>,
    AuthenticatedUser(session): AuthenticatedUser,
    _role: RequireRole<AdminOnly>,
    _sub: RequireActiveSubscription,
    _onboarded: RequireOnboarded,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let (scope, _) =
        resolve_tenant(&app_state, &session, app_state.capabilities.customers_cafe_id).await?;

    app_state.customer_repo.soft_delete(scope, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
