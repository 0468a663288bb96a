// src/handlers/invoices.rs

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use crate::{
    common::{db_utils::resolve_tenant, error::AppError},
    config::AppState,
    middleware::{
        auth::AuthenticatedUser,
        guards::{FrontOfHouse, RequireActiveSubscription, RequireOnboarded, RequireRole},
    },
};

// Faturas são imutáveis: só leitura por aqui. A emissão acontece na
// finalização do pedido.

pub async fn list_invoices(
    State(app_state): State<AppState>,
    AuthenticatedUser(session): AuthenticatedUser,
    _role: RequireRole<FrontOfHouse>,
    _sub: RequireActiveSubscription,
    _onboarded: RequireOnboarded,
) -> Result<impl IntoResponse, AppError> {
    let (scope, _) =
        resolve_tenant(&app_state, &session, app_state.capabilities.invoices_cafe_id).await?;

    let invoices = app_state.invoice_repo.list(scope).await?;
    Ok((StatusCode::OK, Json(invoices)))
}

pub async fn get_invoice(
    State(app_state): State<AppState>,
    AuthenticatedUser(session): AuthenticatedUser,
    _role: RequireRole<FrontOfHouse>,
    _sub: RequireActiveSubscription,
    _onboarded: RequireOnboarded,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let (scope, _) =
        resolve_tenant(&app_state, &session, app_state.capabilities.invoices_cafe_id).await?;

    let invoice = app_state
        .invoice_repo
        .find_by_id(scope, id)
        .await?
        .ok_or(AppError::NotFound("Fatura"))?;
    Ok((StatusCode::OK, Json(invoice)))
}
