// src/db/probe.rs

use sqlx::PgPool;

// ---
// A sonda de capacidades do schema
// ---
// O mesmo binário precisa subir contra um banco em qualquer versão de
// migração. Em vez de consultar INFORMATION_SCHEMA a cada requisição, a
// sonda roda uma única vez no boot e congela o resultado num valor tipado
// que os repositórios consultam ao montar SQL. O processo é reiniciado a
// cada deploy, então invalidação é desnecessária.
#[derive(Clone, Copy, Debug, Default)]
pub struct Capabilities {
    // `cafe_id` por tabela: ausente => consulta global em modo legado
    pub categories_cafe_id: bool,
    pub menu_cafe_id: bool,
    pub customers_cafe_id: bool,
    pub orders_cafe_id: bool,
    pub invoices_cafe_id: bool,
    pub inventory_cafe_id: bool,
    pub payment_methods_cafe_id: bool,

    // Colunas opcionais individuais
    pub users_is_active: bool,
    pub menu_featured_priority: bool,
    pub cafes_onboarding: bool,
    pub settings_colors: bool,

    // Coluna JSON legada de overrides, migrada no boot quando presente
    pub cafes_enabled_modules: bool,

    // As tabelas de features podem nem existir ainda
    pub feature_tables: bool,

    // Num banco totalmente pré-migração nem a tabela de lojas existe
    pub cafes_table: bool,
}

impl Capabilities {
    pub async fn detect(pool: &PgPool) -> Result<Self, sqlx::Error> {
        Ok(Self {
            categories_cafe_id: column_exists(pool, "categories", "cafe_id").await?,
            menu_cafe_id: column_exists(pool, "menu_items", "cafe_id").await?,
            customers_cafe_id: column_exists(pool, "customers", "cafe_id").await?,
            orders_cafe_id: column_exists(pool, "orders", "cafe_id").await?,
            invoices_cafe_id: column_exists(pool, "invoices", "cafe_id").await?,
            inventory_cafe_id: column_exists(pool, "inventory_items", "cafe_id").await?,
            payment_methods_cafe_id: column_exists(pool, "payment_methods", "cafe_id").await?,
            users_is_active: column_exists(pool, "users", "is_active").await?,
            menu_featured_priority: column_exists(pool, "menu_items", "featured_priority").await?,
            cafes_onboarding: column_exists(pool, "cafes", "is_onboarded").await?,
            settings_colors: column_exists(pool, "cafe_settings", "primary_color").await?,
            cafes_enabled_modules: column_exists(pool, "cafes", "enabled_modules").await?,
            feature_tables: table_exists(pool, "features").await?
                && table_exists(pool, "feature_overrides").await?,
            cafes_table: table_exists(pool, "cafes").await?,
        })
    }
}

/// Consulta o catálogo: a coluna existe no schema atual? Uma tabela
/// inexistente responde o mesmo "ausente" de uma coluna inexistente.
pub async fn column_exists(pool: &PgPool, table: &str, column: &str) -> Result<bool, sqlx::Error> {
    let (exists,): (bool,) = sqlx::query_as(
        r#"
        SELECT EXISTS (
            SELECT 1 FROM information_schema.columns
            WHERE table_schema = current_schema()
              AND table_name = $1
              AND column_name = $2
        )
        "#,
    )
    .bind(table)
    .bind(column)
    .fetch_one(pool)
    .await?;

    Ok(exists)
}

pub async fn table_exists(pool: &PgPool, table: &str) -> Result<bool, sqlx::Error> {
    let (exists,): (bool,) = sqlx::query_as(
        r#"
        SELECT EXISTS (
            SELECT 1 FROM information_schema.tables
            WHERE table_schema = current_schema()
              AND table_name = $1
        )
        "#,
    )
    .bind(table)
    .fetch_one(pool)
    .await?;

    Ok(exists)
}
