// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};

use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Orders ---
        handlers::orders::create_order,
        handlers::orders::list_orders,
        handlers::orders::update_order_status,

        // --- Subscription ---
        handlers::subscription::get_subscription,

        // --- Superadmin ---
        handlers::superadmin::metrics_overview,
        handlers::superadmin::cafe_metrics,
        handlers::superadmin::update_subscription,
    ),
    components(
        schemas(
            models::orders::CreateOrderPayload,
            models::orders::OrderLinePayload,
            models::orders::UpdateOrderStatusPayload,
            models::orders::Order,
            models::orders::OrderItem,
            models::orders::OrderWithItems,
            models::orders::OrderStatus,
            models::features::SubscriptionView,
            models::features::UpdateSubscriptionPayload,
            models::features::ToggleFeaturePayload,
            models::metrics::DailyMetric,
            models::metrics::MetricsOverview,
            models::tenancy::SubscriptionPlan,
            models::tenancy::SubscriptionStatus,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Orders", description = "Ciclo de vida dos pedidos"),
        (name = "Subscription", description = "Plano e features da loja"),
        (name = "Superadmin", description = "Administração global das lojas"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "api_jwt",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            );
        }
    }
}
