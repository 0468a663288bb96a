// src/handlers/orders.rs

use axum::{
    Json,
    extract::{Path, Query, State},
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
        guards::{
            AdminOnly, FrontOfHouse, RequireActiveSubscription, RequireOnboarded, RequireRole,
            Staff,
        },
    },
    models::orders::{
        CreateOrderPayload, Order, OrderListQuery, OrderWithItems, UpdateOrderStatusPayload,
    },
};

// POST /orders
#[utoipa::path(
    post,
    path = "/api/orders",
    tag = "Orders",
    request_body = CreateOrderPayload,
    responses(
        (status = 201, description = "Pedido criado com status pending", body = OrderWithItems),
        (status = 400, description = "Pedido vazio ou pagamento dividido inválido"),
        (status = 403, description = "Assinatura inativa ou onboarding pendente")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_order(
    State(app_state): State<AppState>,
    AuthenticatedUser(session): AuthenticatedUser,
    _role: RequireRole<FrontOfHouse>,
    _sub: RequireActiveSubscription,
    _onboarded: RequireOnboarded,
    Json(payload): Json<CreateOrderPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let (scope, attribution) =
        resolve_tenant(&app_state, &session, app_state.capabilities.orders_cafe_id).await?;

    let order = app_state
        .order_service
        .create_order(scope, attribution, &session, &payload)
        .await?;

    Ok((StatusCode::CREATED, Json(order)))
}

// GET /orders?status=&customer_phone=
#[utoipa::path(
    get,
    path = "/api/orders",
    tag = "Orders",
    params(
        ("status" = Option<String>, Query, description = "Filtra por status do ciclo de vida"),
        ("customer_phone" = Option<String>, Query, description = "Filtra pelo telefone do cliente")
    ),
    responses(
        (status = 200, description = "Pedidos da loja do chamador", body = Vec<Order>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_orders(
    State(app_state): State<AppState>,
    AuthenticatedUser(session): AuthenticatedUser,
    _role: RequireRole<Staff>,
    _sub: RequireActiveSubscription,
    _onboarded: RequireOnboarded,
    Query(query): Query<OrderListQuery>,
) -> Result<impl IntoResponse, AppError> {
    let (scope, _) =
        resolve_tenant(&app_state, &session, app_state.capabilities.orders_cafe_id).await?;

    let orders = app_state
        .order_service
        .list_orders(scope, query.status.as_deref(), query.customer_phone.as_deref())
        .await?;

    Ok((StatusCode::OK, Json(orders)))
}

// GET /orders/:id
pub async fn get_order(
    State(app_state): State<AppState>,
    AuthenticatedUser(session): AuthenticatedUser,
    _role: RequireRole<Staff>,
    _sub: RequireActiveSubscription,
    _onboarded: RequireOnboarded,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let (scope, _) =
        resolve_tenant(&app_state, &session, app_state.capabilities.orders_cafe_id).await?;

    let order = app_state.order_service.get_order(scope, id).await?;
    Ok((StatusCode::OK, Json(order)))
}

// PUT /orders/:id/status
#[utoipa::path(
    put,
    path = "/api/orders/{id}/status",
    tag = "Orders",
    request_body = UpdateOrderStatusPayload,
    params(("id" = Uuid, Path, description = "ID do pedido")),
    responses(
        (status = 200, description = "Status atualizado; pontos creditados na primeira conclusão", body = OrderWithItems),
        (status = 400, description = "Transição de status inválida"),
        (status = 404, description = "Pedido não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_order_status(
    State(app_state): State<AppState>,
    AuthenticatedUser(session): AuthenticatedUser,
    _role: RequireRole<Staff>,
    _sub: RequireActiveSubscription,
    _onboarded: RequireOnboarded,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateOrderStatusPayload>,
) -> Result<impl IntoResponse, AppError> {
    let (scope, attribution) =
        resolve_tenant(&app_state, &session, app_state.capabilities.orders_cafe_id).await?;

    let order = app_state
        .order_service
        .update_status(scope, attribution, id, &payload)
        .await?;

    Ok((StatusCode::OK, Json(order)))
}

// DELETE /orders/:id
pub async fn delete_order(
    State(app_state): State<AppState>,
    AuthenticatedUser(session): AuthenticatedUser,
    _role: RequireRole<AdminOnly>,
    _sub: RequireActiveSubscription,
    _onboarded: RequireOnboarded,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let (scope, attribution) =
        resolve_tenant(&app_state, &session, app_state.capabilities.orders_cafe_id).await?;

    app_state
        .order_service
        .delete_order(scope, attribution, id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
