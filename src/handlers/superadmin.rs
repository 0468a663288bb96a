// src/handlers/superadmin.rs

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::guards::RequireSuperAdmin,
    models::{
        auth::{RegisterUserPayload, Role},
        features::{ToggleFeaturePayload, UpdateSubscriptionPayload},
        metrics::{DailyMetric, MetricsOverview},
        tenancy::{CreateCafePayload, SubscriptionPlan, UpdateCafePayload},
    },
    services::metrics::MetricsService,
};

// Todas as rotas daqui exigem Super Admin; é o único papel que age sobre
// lojas nomeadas no caminho em vez da loja da própria sessão.

// ---
// Lojas
// ---

pub async fn list_cafes(
    State(app_state): State<AppState>,
    _admin: RequireSuperAdmin,
) -> Result<impl IntoResponse, AppError> {
    let cafes = app_state.tenant_repo.list_all().await?;
    Ok((StatusCode::OK, Json(cafes)))
}

pub async fn create_cafe(
    State(app_state): State<AppState>,
    _admin: RequireSuperAdmin,
    Json(payload): Json<CreateCafePayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let plan = match &payload.subscription_plan {
        Some(raw) => {
            SubscriptionPlan::parse(raw).ok_or_else(|| AppError::InvalidPlan(raw.clone()))?
        }
        None => SubscriptionPlan::Free,
    };

    let cafe = app_state
        .tenant_repo
        .create_cafe(&payload.slug, &payload.name, plan)
        .await?;
    Ok((StatusCode::CREATED, Json(cafe)))
}

pub async fn get_cafe(
    State(app_state): State<AppState>,
    _admin: RequireSuperAdmin,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let cafe = app_state
        .tenant_repo
        .find_by_id(id)
        .await?
        .ok_or(AppError::TenantNotFound)?;
    Ok((StatusCode::OK, Json(cafe)))
}

pub async fn update_cafe(
    State(app_state): State<AppState>,
    _admin: RequireSuperAdmin,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateCafePayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let cafe = app_state
        .tenant_repo
        .update_cafe(id, payload.name.as_deref(), payload.is_active)
        .await?;
    Ok((StatusCode::OK, Json(cafe)))
}

// O "delete" de loja é sempre lógico: ela nunca some enquanto referenciada.
pub async fn delete_cafe(
    State(app_state): State<AppState>,
    _admin: RequireSuperAdmin,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let cafe = app_state.tenant_repo.deactivate(id).await?;
    Ok((StatusCode::OK, Json(cafe)))
}

// ---
// Métricas
// ---

#[derive(Debug, Deserialize)]
pub struct MetricsQuery {
    pub date: Option<NaiveDate>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

// GET /superadmin/cafes/metrics/overview: registrada ANTES de /cafes/:id
#[utoipa::path(
    get,
    path = "/api/superadmin/cafes/metrics/overview",
    tag = "Superadmin",
    responses(
        (status = 200, description = "Visão consolidada de todas as lojas", body = MetricsOverview)
    ),
    security(("api_jwt" = []))
)]
pub async fn metrics_overview(
    State(app_state): State<AppState>,
    _admin: RequireSuperAdmin,
) -> Result<impl IntoResponse, AppError> {
    let overview = app_state.metrics_service.overview().await?;
    Ok((StatusCode::OK, Json(overview)))
}

// GET /superadmin/cafes/:id/metrics?date= | ?from=&to=
#[utoipa::path(
    get,
    path = "/api/superadmin/cafes/{id}/metrics",
    tag = "Superadmin",
    params(
        ("id" = Uuid, Path, description = "ID da loja"),
        ("date" = Option<NaiveDate>, Query, description = "Um dia específico"),
        ("from" = Option<NaiveDate>, Query, description = "Início do intervalo"),
        ("to" = Option<NaiveDate>, Query, description = "Fim do intervalo")
    ),
    responses(
        (status = 200, description = "Agregados diários da loja", body = Vec<DailyMetric>)
    ),
    security(("api_jwt" = []))
)]
pub async fn cafe_metrics(
    State(app_state): State<AppState>,
    _admin: RequireSuperAdmin,
    Path(id): Path<Uuid>,
    Query(query): Query<MetricsQuery>,
) -> Result<impl IntoResponse, AppError> {
    app_state
        .tenant_repo
        .find_by_id(id)
        .await?
        .ok_or(AppError::TenantNotFound)?;

    let rows = match (query.date, query.from, query.to) {
        (Some(date), _, _) => vec![app_state.metrics_service.get_day(id, date).await?],
        (None, Some(from), Some(to)) => app_state.metrics_service.list_range(id, from, to).await?,
        _ => {
            let today = MetricsService::today();
            vec![app_state.metrics_service.get_day(id, today).await?]
        }
    };

    Ok((StatusCode::OK, Json(rows)))
}

// POST /superadmin/cafes/:id/metrics/recompute?date=
// Reconstrói o agregado do dia a partir da fonte de verdade.
pub async fn recompute_metrics(
    State(app_state): State<AppState>,
    _admin: RequireSuperAdmin,
    Path(id): Path<Uuid>,
    Query(query): Query<MetricsQuery>,
) -> Result<impl IntoResponse, AppError> {
    app_state
        .tenant_repo
        .find_by_id(id)
        .await?
        .ok_or(AppError::TenantNotFound)?;

    let date = query.date.unwrap_or_else(MetricsService::today);
    let row = app_state.metrics_service.recompute(id, date).await?;
    Ok((StatusCode::OK, Json(row)))
}

// ---
// Configurações por loja
// ---

pub async fn get_cafe_settings(
    State(app_state): State<AppState>,
    _admin: RequireSuperAdmin,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    app_state
        .tenant_repo
        .find_by_id(id)
        .await?
        .ok_or(AppError::TenantNotFound)?;

    let settings = app_state.settings_repo.get_cafe_settings(id).await?;
    Ok((StatusCode::OK, Json(settings)))
}

pub async fn update_cafe_settings(
    State(app_state): State<AppState>,
    _admin: RequireSuperAdmin,
    Path(id): Path<Uuid>,
    Json(payload): Json<crate::models::settings::UpdateCafeSettingsPayload>,
) -> Result<impl IntoResponse, AppError> {
    app_state
        .tenant_repo
        .find_by_id(id)
        .await?
        .ok_or(AppError::TenantNotFound)?;

    let settings = app_state
        .settings_repo
        .update_cafe_settings(id, &payload)
        .await?;
    Ok((StatusCode::OK, Json(settings)))
}

// ---
// Assinatura e features
// ---

// GET /superadmin/cafes/:id/subscription
pub async fn get_subscription(
    State(app_state): State<AppState>,
    _admin: RequireSuperAdmin,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let view = app_state.subscription_service.get(id).await?;
    Ok((StatusCode::OK, Json(view)))
}

// PUT /superadmin/cafes/:id/subscription
#[utoipa::path(
    put,
    path = "/api/superadmin/cafes/{id}/subscription",
    tag = "Superadmin",
    request_body = UpdateSubscriptionPayload,
    params(("id" = Uuid, Path, description = "ID da loja")),
    responses(
        (status = 200, description = "Plano/status atualizados, com auditoria dos campos alterados"),
        (status = 400, description = "Plano ou status inválido, ou nenhuma alteração pedida"),
        (status = 404, description = "Loja não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_subscription(
    State(app_state): State<AppState>,
    RequireSuperAdmin(session): RequireSuperAdmin,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateSubscriptionPayload>,
) -> Result<impl IntoResponse, AppError> {
    let cafe = app_state
        .subscription_service
        .update(id, &payload, session.user_id)
        .await?;
    Ok((StatusCode::OK, Json(cafe)))
}

// POST /superadmin/cafes/:id/features/:key/toggle
pub async fn toggle_feature(
    State(app_state): State<AppState>,
    RequireSuperAdmin(session): RequireSuperAdmin,
    Path((id, key)): Path<(Uuid, String)>,
    Json(payload): Json<ToggleFeaturePayload>,
) -> Result<impl IntoResponse, AppError> {
    app_state
        .subscription_service
        .toggle_feature(id, &key, payload.enabled, session.user_id)
        .await?;

    let features = app_state.feature_service.resolve(id).await?;
    Ok((StatusCode::OK, Json(features)))
}

// DELETE /superadmin/cafes/:id/features/:key: volta ao default do plano
pub async fn remove_feature_override(
    State(app_state): State<AppState>,
    RequireSuperAdmin(session): RequireSuperAdmin,
    Path((id, key)): Path<(Uuid, String)>,
) -> Result<impl IntoResponse, AppError> {
    app_state
        .subscription_service
        .remove_feature_override(id, &key, session.user_id)
        .await?;

    let features = app_state.feature_service.resolve(id).await?;
    Ok((StatusCode::OK, Json(features)))
}

// GET /superadmin/features: o catálogo global de features
pub async fn list_features(
    State(app_state): State<AppState>,
    _admin: RequireSuperAdmin,
) -> Result<impl IntoResponse, AppError> {
    let features = app_state.feature_service.list_features().await?;
    Ok((StatusCode::OK, Json(features)))
}

// ---
// Auditoria
// ---

#[derive(Debug, Deserialize)]
pub struct AuditQuery {
    pub limit: Option<i64>,
}

pub async fn cafe_audit_log(
    State(app_state): State<AppState>,
    _admin: RequireSuperAdmin,
    Path(id): Path<Uuid>,
    Query(query): Query<AuditQuery>,
) -> Result<impl IntoResponse, AppError> {
    let limit = query.limit.unwrap_or(100).clamp(1, 1000);
    let entries = app_state
        .subscription_service
        .list_audit_for_cafe(id, limit)
        .await?;
    Ok((StatusCode::OK, Json(entries)))
}

pub async fn all_audit_logs(
    State(app_state): State<AppState>,
    _admin: RequireSuperAdmin,
    Query(query): Query<AuditQuery>,
) -> Result<impl IntoResponse, AppError> {
    let limit = query.limit.unwrap_or(100).clamp(1, 1000);
    let entries = app_state.subscription_service.list_audit_all(limit).await?;
    Ok((StatusCode::OK, Json(entries)))
}

// ---
// Usuários
// ---

#[derive(Debug, Deserialize)]
pub struct UsersQuery {
    pub cafe_id: Option<Uuid>,
}

pub async fn list_users(
    State(app_state): State<AppState>,
    _admin: RequireSuperAdmin,
    Query(query): Query<UsersQuery>,
) -> Result<impl IntoResponse, AppError> {
    let users = match query.cafe_id {
        Some(cafe_id) => app_state.user_repo.list_by_cafe(cafe_id).await?,
        None => app_state.user_repo.list_all().await?,
    };
    Ok((StatusCode::OK, Json(users)))
}

pub async fn create_user(
    State(app_state): State<AppState>,
    _admin: RequireSuperAdmin,
    Json(payload): Json<RegisterUserPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let role = payload.role.unwrap_or(Role::User);

    // Invariante: superadmin não pertence a loja nenhuma; os demais papéis
    // de loja precisam de uma.
    if role == Role::Superadmin && payload.cafe_id.is_some() {
        return Err(AppError::Validation(
            "Super Admin não pode ser vinculado a uma loja.".to_string(),
        ));
    }
    if role != Role::Superadmin && payload.cafe_id.is_none() {
        return Err(AppError::Validation(
            "Usuários de loja precisam de um cafeId.".to_string(),
        ));
    }

    if let Some(cafe_id) = payload.cafe_id {
        app_state
            .tenant_repo
            .find_by_id(cafe_id)
            .await?
            .ok_or(AppError::TenantNotFound)?;
    }

    let (_, user) = app_state
        .auth_service
        .register_user(
            &payload.username,
            &payload.email,
            &payload.password,
            role,
            payload.cafe_id,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn get_user(
    State(app_state): State<AppState>,
    _admin: RequireSuperAdmin,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let user = app_state
        .user_repo
        .find_by_id(id)
        .await?
        .ok_or(AppError::UserNotFound)?;
    Ok((StatusCode::OK, Json(user)))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserPayload {
    #[validate(length(min = 2, message = "O nome de usuário deve ter no mínimo 2 caracteres."))]
    pub username: Option<String>,
    #[validate(email(message = "O e-mail fornecido é inválido."))]
    pub email: Option<String>,
    pub role: Option<Role>,
    pub cafe_id: Option<Uuid>,
}

pub async fn update_user(
    State(app_state): State<AppState>,
    _admin: RequireSuperAdmin,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateUserPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let user = app_state
        .user_repo
        .update_user(
            id,
            payload.username.as_deref(),
            payload.email.as_deref(),
            payload.role,
            payload.cafe_id,
        )
        .await?;
    Ok((StatusCode::OK, Json(user)))
}

pub async fn delete_user(
    State(app_state): State<AppState>,
    _admin: RequireSuperAdmin,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    app_state.user_repo.delete_user(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---
// Onboarding
// ---

// POST /superadmin/cafes/:id/reset-onboarding
pub async fn reset_onboarding(
    State(app_state): State<AppState>,
    _admin: RequireSuperAdmin,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let status = app_state.onboarding_service.reset(id).await?;
    Ok((StatusCode::OK, Json(status)))
}
