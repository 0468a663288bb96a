// src/config.rs

use sqlx::{PgPool, postgres::PgPoolOptions};
use std::{env, time::Duration};

use crate::{
    db::{
        AuditRepository, CatalogRepository, CustomerRepository, FeatureRepository,
        InventoryRepository, InvoiceRepository, MetricsRepository, OrderRepository,
        SettingsRepository, TenantRepository, UserRepository, probe::Capabilities,
    },
    realtime::broadcast::OrderBroadcast,
    services::{
        auth::AuthService, features::FeatureService, metrics::MetricsService,
        onboarding::OnboardingService, orders::OrderService,
        subscription::SubscriptionService,
    },
};

// Configuração vinda do ambiente. O fuso do processo é sempre UTC: todos os
// instantes usam `chrono::Utc`, nunca o relógio local.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub frontend_origins: Vec<String>,
    pub backup_retention: u32,
}

impl ServerConfig {
    fn from_env() -> Self {
        let host = env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = env::var("SERVER_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(3000);
        let frontend_origins = env::var("FRONTEND_ORIGINS")
            .unwrap_or_default()
            .split(',')
            .filter(|s| !s.is_empty())
            .map(|s| s.trim().to_string())
            .collect();
        let backup_retention = env::var("BACKUP_RETENTION")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(7);

        Self {
            host,
            port,
            frontend_origins,
            backup_retention,
        }
    }
}

// Monta a URL a partir das variáveis separadas (DB_HOST, DB_USER, ...) ou
// usa DATABASE_URL diretamente quando presente.
fn database_url() -> String {
    if let Ok(url) = env::var("DATABASE_URL") {
        return url;
    }
    let host = env::var("DB_HOST").unwrap_or_else(|_| "localhost".to_string());
    let port = env::var("DB_PORT").unwrap_or_else(|_| "5432".to_string());
    let user = env::var("DB_USER").unwrap_or_else(|_| "postgres".to_string());
    let password = env::var("DB_PASSWORD").unwrap_or_default();
    let name = env::var("DB_NAME").unwrap_or_else(|_| "cafe_pos".to_string());
    format!("postgres://{user}:{password}@{host}:{port}/{name}")
}

// O estado compartilhado que será acessível em toda a aplicação
#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub jwt_secret: String,
    pub server: ServerConfig,

    // Snapshot das capacidades do schema, detectado uma única vez no boot.
    pub capabilities: Capabilities,

    // Canal de eventos de pedidos ao vivo (/ws/orders)
    pub order_events: OrderBroadcast,

    pub started_at: chrono::DateTime<chrono::Utc>,

    // Serviços
    pub auth_service: AuthService,
    pub feature_service: FeatureService,
    pub subscription_service: SubscriptionService,
    pub onboarding_service: OnboardingService,
    pub order_service: OrderService,
    pub metrics_service: MetricsService,

    // Repositórios usados diretamente pelos handlers de CRUD
    pub tenant_repo: TenantRepository,
    pub user_repo: UserRepository,
    pub catalog_repo: CatalogRepository,
    pub customer_repo: CustomerRepository,
    pub invoice_repo: InvoiceRepository,
    pub inventory_repo: InventoryRepository,
    pub settings_repo: SettingsRepository,
}

impl AppState {
    pub async fn new() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let jwt_secret = env::var("JWT_SECRET").expect("JWT_SECRET deve ser definido");
        let server = ServerConfig::from_env();

        // Conecta ao banco de dados, usando '?' para propagar erros
        let db_pool = PgPoolOptions::new()
            .max_connections(10)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&database_url())
            .await?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        // Sonda o catálogo uma única vez; o binário também sobe contra um
        // banco parcialmente migrado, operando em modo legado.
        let capabilities = Capabilities::detect(&db_pool).await?;
        tracing::info!(?capabilities, "Capacidades do schema detectadas");

        let order_events = OrderBroadcast::new();

        // --- Monta o gráfico de dependências ---
        let tenant_repo = TenantRepository::new(db_pool.clone(), capabilities);
        let user_repo = UserRepository::new(db_pool.clone(), capabilities);
        let feature_repo = FeatureRepository::new(db_pool.clone(), capabilities);
        let audit_repo = AuditRepository::new(db_pool.clone());
        let catalog_repo = CatalogRepository::new(db_pool.clone(), capabilities);
        let customer_repo = CustomerRepository::new(db_pool.clone(), capabilities);
        let order_repo = OrderRepository::new(db_pool.clone(), capabilities);
        let invoice_repo = InvoiceRepository::new(db_pool.clone(), capabilities);
        let inventory_repo = InventoryRepository::new(db_pool.clone(), capabilities);
        let settings_repo = SettingsRepository::new(db_pool.clone(), capabilities);
        let metrics_repo = MetricsRepository::new(db_pool.clone(), capabilities);

        let auth_service = AuthService::new(user_repo.clone(), jwt_secret.clone());
        let feature_service = FeatureService::new(feature_repo.clone(), tenant_repo.clone());
        let subscription_service = SubscriptionService::new(
            tenant_repo.clone(),
            audit_repo.clone(),
            feature_service.clone(),
        );
        let onboarding_service = OnboardingService::new(tenant_repo.clone());
        let metrics_service = MetricsService::new(metrics_repo.clone());
        let order_service = OrderService::new(
            db_pool.clone(),
            order_repo.clone(),
            customer_repo.clone(),
            invoice_repo.clone(),
            settings_repo.clone(),
            metrics_service.clone(),
            order_events.clone(),
        );

        // Migra overrides legados (coluna JSON `enabled_modules`) para a
        // tabela de overrides, que é o único caminho de resolução.
        if let Err(e) = feature_repo.migrate_legacy_overrides().await {
            tracing::warn!("Falha ao migrar overrides legados: {e}");
        }

        Ok(Self {
            db_pool,
            jwt_secret,
            server,
            capabilities,
            order_events,
            started_at: chrono::Utc::now(),
            auth_service,
            feature_service,
            subscription_service,
            onboarding_service,
            order_service,
            metrics_service,
            tenant_repo,
            user_repo,
            catalog_repo,
            customer_repo,
            invoice_repo,
            inventory_repo,
            settings_repo,
        })
    }
}
