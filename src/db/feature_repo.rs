// src/db/feature_repo.rs

use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::probe::Capabilities,
    models::features::{Feature, FeatureOverride},
};

#[derive(Clone)]
pub struct FeatureRepository {
    pool: PgPool,
    caps: Capabilities,
}

impl FeatureRepository {
    pub fn new(pool: PgPool, caps: Capabilities) -> Self {
        Self { pool, caps }
    }

    /// As tabelas de features podem ainda não existir. Nesse caso a lista é
    /// vazia; o resolvedor devolve o mapa vazio e todo `has` responde false.
    pub async fn list_features(&self) -> Result<Vec<Feature>, AppError> {
        if !self.caps.feature_tables {
            return Ok(Vec::new());
        }

        Ok(sqlx::query_as::<_, Feature>(
            "SELECT key, name, description, default_free, default_pro FROM features ORDER BY key",
        )
        .fetch_all(&self.pool)
        .await?)
    }

    pub async fn find_feature(&self, key: &str) -> Result<Option<Feature>, AppError> {
        if !self.caps.feature_tables {
            return Ok(None);
        }

        Ok(sqlx::query_as::<_, Feature>(
            "SELECT key, name, description, default_free, default_pro \
             FROM features WHERE key = $1",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?)
    }

    pub async fn list_overrides(&self, cafe_id: Uuid) -> Result<Vec<FeatureOverride>, AppError> {
        if !self.caps.feature_tables {
            return Ok(Vec::new());
        }

        Ok(sqlx::query_as::<_, FeatureOverride>(
            "SELECT cafe_id, feature_key, enabled FROM feature_overrides WHERE cafe_id = $1",
        )
        .bind(cafe_id)
        .fetch_all(&self.pool)
        .await?)
    }

    pub async fn upsert_override(
        &self,
        cafe_id: Uuid,
        feature_key: &str,
        enabled: bool,
    ) -> Result<FeatureOverride, AppError> {
        Ok(sqlx::query_as::<_, FeatureOverride>(
            "INSERT INTO feature_overrides (cafe_id, feature_key, enabled) \
             VALUES ($1, $2, $3) \
             ON CONFLICT (cafe_id, feature_key) DO UPDATE SET enabled = EXCLUDED.enabled \
             RETURNING cafe_id, feature_key, enabled",
        )
        .bind(cafe_id)
        .bind(feature_key)
        .bind(enabled)
        .fetch_one(&self.pool)
        .await?)
    }

    /// Remove o override; a loja volta ao default do plano.
    pub async fn delete_override(&self, cafe_id: Uuid, feature_key: &str) -> Result<bool, AppError> {
        let result =
            sqlx::query("DELETE FROM feature_overrides WHERE cafe_id = $1 AND feature_key = $2")
                .bind(cafe_id)
                .bind(feature_key)
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Migração única no boot: a representação antiga de overrides era um
    /// mapa JSON `enabled_modules` na própria linha da loja. Copiamos cada
    /// entrada para a tabela de overrides (sem sobrescrever o que já existe)
    /// e anulamos a coluna, deixando a tabela como único caminho de resolução.
    pub async fn migrate_legacy_overrides(&self) -> Result<(), AppError> {
        if !self.caps.cafes_enabled_modules || !self.caps.feature_tables {
            return Ok(());
        }

        let rows: Vec<(Uuid, serde_json::Value)> = sqlx::query_as(
            "SELECT id, enabled_modules FROM cafes WHERE enabled_modules IS NOT NULL",
        )
        .fetch_all(&self.pool)
        .await?;

        for (cafe_id, modules) in &rows {
            let Some(map) = modules.as_object() else { continue };
            for (key, value) in map {
                let Some(enabled) = value.as_bool() else { continue };
                sqlx::query(
                    "INSERT INTO feature_overrides (cafe_id, feature_key, enabled) \
                     VALUES ($1, $2, $3) ON CONFLICT (cafe_id, feature_key) DO NOTHING",
                )
                .bind(cafe_id)
                .bind(key)
                .bind(enabled)
                .execute(&self.pool)
                .await?;
            }
        }

        if !rows.is_empty() {
            sqlx::query("UPDATE cafes SET enabled_modules = NULL")
                .execute(&self.pool)
                .await?;
            tracing::info!(
                "Overrides legados migrados para a tabela feature_overrides ({} lojas)",
                rows.len()
            );
        }

        Ok(())
    }
}
