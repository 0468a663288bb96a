// src/handlers/catalog.rs

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
    models::catalog::{
        BulkImportPayload, BulkImportReport, CreateCategoryPayload, CreateMenuItemPayload,
        UpdateCategoryPayload, UpdateMenuItemPayload,
    },
};

// ---
// Categorias
// ---

pub async fn list_categories(
    State(app_state): State<AppState>,
    AuthenticatedUser(session): AuthenticatedUser,
    _role: RequireRole<Staff>,
    _sub: RequireActiveSubscription,
    _onboarded: RequireOnboarded,
) -> Result<impl IntoResponse, AppError> {
    let (scope, _) =
        resolve_tenant(&app_state, &session, app_state.capabilities.categories_cafe_id).await?;

    let categories = app_state.catalog_repo.list_categories(scope).await?;
    Ok((StatusCode::OK, Json(categories)))
}

pub async fn create_category(
    State(app_state): State<AppState>,
    AuthenticatedUser(session): AuthenticatedUser,
    _role: RequireRole<AdminOnly>,
    _sub: RequireActiveSubscription,
    _onboarded: RequireOnboarded,
    Json(payload): Json<CreateCategoryPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let (scope, _) =
        resolve_tenant(&app_state, &session, app_state.capabilities.categories_cafe_id).await?;

    let category = app_state.catalog_repo.create_category(scope, &payload).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

pub async fn update_category(
    State(app_state): State<AppState>,
    AuthenticatedUser(session): AuthenticatedUser,
    _role: RequireRole<AdminOnly>,
    _sub: RequireActiveSubscription,
    _onboarded: RequireOnboarded,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateCategoryPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let (scope, _) =
        resolve_tenant(&app_state, &session, app_state.capabilities.categories_cafe_id).await?;

    let category = app_state
        .catalog_repo
        .update_category(scope, id, &payload)
        .await?;
    Ok((StatusCode::OK, Json(category)))
}

pub async fn delete_category(
    State(app_state): State<AppState>,
    AuthenticatedUser(session): AuthenticatedUser,
    _role: RequireRole<AdminOnly>,
    _sub: RequireActiveSubscription,
    _onboarded: RequireOnboarded,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let (scope, _) =
        resolve_tenant(&app_state, &session, app_state.capabilities.categories_cafe_id).await?;

    app_state.catalog_repo.delete_category(scope, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---
// Cardápio
// ---

pub async fn list_menu(
    State(app_state): State<AppState>,
    AuthenticatedUser(session): AuthenticatedUser,
    _role: RequireRole<Staff>,
    _sub: RequireActiveSubscription,
    _onboarded: RequireOnboarded,
) -> Result<impl IntoResponse, AppError> {
    let (scope, _) =
        resolve_tenant(&app_state, &session, app_state.capabilities.menu_cafe_id).await?;

    let items = app_state.catalog_repo.list_menu_items(scope).await?;
    Ok((StatusCode::OK, Json(items)))
}

pub async fn get_menu_item(
    State(app_state): State<AppState>,
    AuthenticatedUser(session): AuthenticatedUser,
    _role: RequireRole<Staff>,
    _sub: RequireActiveSubscription,
    _onboarded: RequireOnboarded,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let (scope, _) =
        resolve_tenant(&app_state, &session, app_state.capabilities.menu_cafe_id).await?;

    let item = app_state
        .catalog_repo
        .find_menu_item(scope, id)
        .await?
        .ok_or(AppError::NotFound("Item do cardápio"))?;
    Ok((StatusCode::OK, Json(item)))
}

pub async fn create_menu_item(
    State(app_state): State<AppState>,
    AuthenticatedUser(session): AuthenticatedUser,
    _role: RequireRole<AdminOnly>,
    _sub: RequireActiveSubscription,
    _onboarded: RequireOnboarded,
    Json(payload): Json<CreateMenuItemPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let (scope, _) =
        resolve_tenant(&app_state, &session, app_state.capabilities.menu_cafe_id).await?;

    let item = app_state
        .catalog_repo
        .create_menu_item(&app_state.db_pool, scope, &payload)
        .await?;
    Ok((StatusCode::CREATED, Json(item)))
}

pub async fn update_menu_item(
    State(app_state): State<AppState>,
    AuthenticatedUser(session): AuthenticatedUser,
    _role: RequireRole<AdminOnly>,
    _sub: RequireActiveSubscription,
    _onboarded: RequireOnboarded,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateMenuItemPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let (scope, _) =
        resolve_tenant(&app_state, &session, app_state.capabilities.menu_cafe_id).await?;

    let item = app_state
        .catalog_repo
        .update_menu_item(scope, id, &payload)
        .await?;
    Ok((StatusCode::OK, Json(item)))
}

pub async fn delete_menu_item(
    State(app_state): State<AppState>,
    AuthenticatedUser(session): AuthenticatedUser,
    _role: RequireRole<AdminOnly>,
    _sub: RequireActiveSubscription,
    _onboarded: RequireOnboarded,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let (scope, _) =
        resolve_tenant(&app_state, &session, app_state.capabilities.menu_cafe_id).await?;

    app_state.catalog_repo.delete_menu_item(scope, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---
// Importação em massa do cardápio
// ---
// Transacional: ou todas as linhas entram, ou nenhuma. Linhas inválidas são
// reportadas com o índice original, e a presença de uma única inválida
// cancela a importação inteira.
pub async fn bulk_import_menu(
    State(app_state): State<AppState>,
    AuthenticatedUser(session): AuthenticatedUser,
    _role: RequireRole<AdminOnly>,
    _sub: RequireActiveSubscription,
    _onboarded: RequireOnboarded,
    Json(payload): Json<BulkImportPayload>,
) -> Result<impl IntoResponse, AppError> {
    let (scope, _) =
        resolve_tenant(&app_state, &session, app_state.capabilities.menu_cafe_id).await?;

    // 1. Valida tudo antes de tocar no banco. `failed` conta LINHAS
    // inválidas, mesmo que uma linha tenha mais de um campo com problema.
    let mut errors = Vec::new();
    let mut failed_rows = 0usize;
    for (index, row) in payload.items.iter().enumerate() {
        if let Err(e) = row.validate() {
            failed_rows += 1;
            for (field, field_errors) in e.field_errors() {
                for fe in field_errors {
                    let message = fe
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| "valor inválido".to_string());
                    errors.push(format!("linha {}: {field}: {message}", index + 1));
                }
            }
        }
    }

    if failed_rows > 0 {
        return Ok((
            StatusCode::OK,
            Json(BulkImportReport {
                imported: 0,
                failed: failed_rows,
                errors,
            }),
        ));
    }

    // 2. Insere tudo numa transação única.
    let mut tx = app_state.db_pool.begin().await?;

    for row in &payload.items {
        let category_id = match &row.category {
            Some(name) => Some(
                app_state
                    .catalog_repo
                    .find_or_create_category(&mut *tx, scope, name)
                    .await?,
            ),
            None => None,
        };

        let item = CreateMenuItemPayload {
            category_id,
            name: row.name.clone(),
            price: row.price,
            is_available: true,
            image_url: None,
            featured_priority: None,
        };
        app_state
            .catalog_repo
            .create_menu_item(&mut *tx, scope, &item)
            .await?;
    }

    tx.commit().await?;

    Ok((
        StatusCode::OK,
        Json(BulkImportReport {
            imported: payload.items.len(),
            failed: 0,
            errors: Vec::new(),
        }),
    ))
}
