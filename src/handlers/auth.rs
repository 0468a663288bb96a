// src/handlers/auth.rs

use axum::{Json, extract::State};
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::AuthenticatedUser,
    models::auth::{AuthResponse, LoginUserPayload, RegisterUserPayload, Role, Session},
};

// Handler de login
pub async fn login(
    State(app_state): State<AppState>,
    Json(payload): Json<LoginUserPayload>,
) -> Result<Json<AuthResponse>, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let (token, user) = app_state
        .auth_service
        .login_user(&payload.email, &payload.password)
        .await?;

    Ok(Json(AuthResponse { token, user }))
}

// Registro público: sempre nasce como `user`, sem loja. Papéis de equipe
// são criados pelo admin da loja (abaixo) ou pelo Super Admin.
pub async fn register(
    State(app_state): State<AppState>,
    Json(payload): Json<RegisterUserPayload>,
) -> Result<Json<AuthResponse>, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let (token, user) = app_state
        .auth_service
        .register_user(
            &payload.username,
            &payload.email,
            &payload.password,
            Role::User,
            None,
        )
        .await?;

    Ok(Json(AuthResponse { token, user }))
}

// Variante restrita: o admin da loja cria a própria equipe (chef,
// recepção, user). O papel vem do payload, mas nunca acima do dele.
pub async fn register_staff(
    State(app_state): State<AppState>,
    AuthenticatedUser(session): AuthenticatedUser,
    Json(payload): Json<RegisterUserPayload>,
) -> Result<Json<AuthResponse>, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;

    if session.role != Role::Admin {
        return Err(AppError::ForbiddenRole);
    }
    let cafe_id = session.require_cafe()?;

    let role = payload.role.unwrap_or(Role::User);
    if !matches!(role, Role::Chef | Role::Reception | Role::User) {
        return Err(AppError::ForbiddenRole);
    }

    let (token, user) = app_state
        .auth_service
        .register_user(
            &payload.username,
            &payload.email,
            &payload.password,
            role,
            Some(cafe_id),
        )
        .await?;

    Ok(Json(AuthResponse { token, user }))
}

// Handler da rota protegida /auth/profile
pub async fn profile(AuthenticatedUser(session): AuthenticatedUser) -> Json<Session> {
    Json(session)
}
