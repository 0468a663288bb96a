//src/main.rs

use axum::{
    Router,
    middleware as axum_middleware,
    routing::{delete, get, post, put},
};
use tokio::net::TcpListener;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod common;
mod config;
mod db;
mod docs;
mod handlers;
mod middleware;
mod models;
mod realtime;
mod services;

use crate::config::AppState;
use crate::middleware::auth::auth_guard;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().with_target(false).compact().init();

    // .expect() é bom aqui: se a configuração falhar, a aplicação não deve
    // iniciar.
    let app_state = AppState::new()
        .await
        .expect("Falha ao inicializar o estado da aplicação.");

    // Rotas de autenticação (públicas)
    let auth_routes = Router::new()
        .route("/login", post(handlers::auth::login))
        .route("/register", post(handlers::auth::register));

    // Rotas de autenticação protegidas
    let auth_protected_routes = Router::new()
        .route("/profile", get(handlers::auth::profile))
        .route("/register-staff", post(handlers::auth::register_staff))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    // Rotas do Super Admin. Segmentos estáticos (cafes/metrics/overview)
    // ficam registrados antes das rotas parametrizadas (cafes/{id}).
    let superadmin_routes = Router::new()
        .route(
            "/cafes",
            get(handlers::superadmin::list_cafes).post(handlers::superadmin::create_cafe),
        )
        .route(
            "/cafes/metrics/overview",
            get(handlers::superadmin::metrics_overview),
        )
        .route(
            "/cafes/{id}",
            get(handlers::superadmin::get_cafe)
                .put(handlers::superadmin::update_cafe)
                .delete(handlers::superadmin::delete_cafe),
        )
        .route("/cafes/{id}/metrics", get(handlers::superadmin::cafe_metrics))
        .route(
            "/cafes/{id}/metrics/recompute",
            post(handlers::superadmin::recompute_metrics),
        )
        .route(
            "/cafes/{id}/settings",
            get(handlers::superadmin::get_cafe_settings)
                .put(handlers::superadmin::update_cafe_settings),
        )
        .route(
            "/cafes/{id}/subscription",
            get(handlers::superadmin::get_subscription)
                .put(handlers::superadmin::update_subscription),
        )
        .route(
            "/cafes/{id}/features/{key}/toggle",
            post(handlers::superadmin::toggle_feature),
        )
        .route(
            "/cafes/{id}/features/{key}",
            delete(handlers::superadmin::remove_feature_override),
        )
        .route("/cafes/{id}/audit-log", get(handlers::superadmin::cafe_audit_log))
        .route(
            "/cafes/{id}/reset-onboarding",
            post(handlers::superadmin::reset_onboarding),
        )
        .route("/audit-logs", get(handlers::superadmin::all_audit_logs))
        .route("/features", get(handlers::superadmin::list_features))
        .route(
            "/users",
            get(handlers::superadmin::list_users).post(handlers::superadmin::create_user),
        )
        .route(
            "/users/{id}",
            get(handlers::superadmin::get_user)
                .put(handlers::superadmin::update_user)
                .delete(handlers::superadmin::delete_user),
        )
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    // Onboarding: isento do guard de onboarding por construção.
    let onboarding_routes = Router::new()
        .route("/status", get(handlers::onboarding::get_status))
        .route("/step", put(handlers::onboarding::save_step))
        .route("/complete", post(handlers::onboarding::complete))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    // Rotas de domínio da loja
    let tenant_routes = Router::new()
        .route("/subscription", get(handlers::subscription::get_subscription))
        .route("/cafe/features", get(handlers::subscription::get_features))
        // Cardápio
        .route(
            "/menu",
            get(handlers::catalog::list_menu).post(handlers::catalog::create_menu_item),
        )
        .route("/menu/bulk-import", post(handlers::catalog::bulk_import_menu))
        .route(
            "/menu/{id}",
            get(handlers::catalog::get_menu_item)
                .put(handlers::catalog::update_menu_item)
                .delete(handlers::catalog::delete_menu_item),
        )
        // Categorias
        .route(
            "/categories",
            get(handlers::catalog::list_categories).post(handlers::catalog::create_category),
        )
        .route(
            "/categories/{id}",
            put(handlers::catalog::update_category).delete(handlers::catalog::delete_category),
        )
        // Clientes
        .route(
            "/customers",
            get(handlers::customers::list_customers).post(handlers::customers::create_customer),
        )
        .route(
            "/customers/{id}",
            get(handlers::customers::get_customer)
                .put(handlers::customers::update_customer)
                .delete(handlers::customers::delete_customer),
        )
        // Pedidos
        .route(
            "/orders",
            get(handlers::orders::list_orders).post(handlers::orders::create_order),
        )
        .route(
            "/orders/{id}",
            get(handlers::orders::get_order).delete(handlers::orders::delete_order),
        )
        .route("/orders/{id}/status", put(handlers::orders::update_order_status))
        // Relatórios (feature gated por plano)
        .route("/metrics/daily", get(handlers::metrics::get_daily_metrics))
        // Faturas
        .route("/invoices", get(handlers::invoices::list_invoices))
        .route("/invoices/{id}", get(handlers::invoices::get_invoice))
        // Estoque (feature gated por plano)
        .route(
            "/inventory",
            get(handlers::inventory::list_inventory)
                .post(handlers::inventory::create_inventory_item),
        )
        .route(
            "/inventory/{id}",
            put(handlers::inventory::update_inventory_item)
                .delete(handlers::inventory::delete_inventory_item),
        )
        // Configurações
        .route(
            "/settings/cafe",
            get(handlers::settings::get_cafe_settings)
                .put(handlers::settings::update_cafe_settings),
        )
        .route(
            "/settings/tax",
            get(handlers::settings::get_tax_settings)
                .put(handlers::settings::update_tax_settings),
        )
        .route(
            "/settings/currency",
            get(handlers::settings::get_currency_settings)
                .put(handlers::settings::update_currency_settings),
        )
        .route(
            "/payment-methods",
            get(handlers::settings::list_payment_methods)
                .post(handlers::settings::create_payment_method),
        )
        .route(
            "/payment-methods/{id}",
            put(handlers::settings::update_payment_method)
                .delete(handlers::settings::delete_payment_method),
        )
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    // Combina tudo no router principal
    let app = Router::new()
        .route("/api/health", get(handlers::health::health))
        // O caminho duplex autentica pelo token da query string, antes do
        // upgrade; fora da camada de auth HTTP.
        .route("/ws/orders", get(realtime::ws::orders_ws))
        .nest("/api/auth", auth_routes)
        .nest("/api/auth", auth_protected_routes)
        .nest("/api/superadmin", superadmin_routes)
        .nest("/api/onboarding", onboarding_routes)
        .nest("/api", tenant_routes)
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", docs::ApiDoc::openapi()))
        .with_state(app_state.clone());

    // Inicia o servidor
    let addr = format!("{}:{}", app_state.server.host, app_state.server.port);
    let listener = TcpListener::bind(&addr)
        .await
        .expect("Falha ao iniciar o listener TCP");
    tracing::info!("🚀 Servidor escutando em {}", listener.local_addr().unwrap());
    axum::serve(listener, app).await.expect("Erro no servidor Axum");
}
