// src/db/tenant_repo.rs

use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::{AppError, map_unique_violation},
    db::probe::Capabilities,
    models::tenancy::{Cafe, SubscriptionPlan, SubscriptionStatus},
};

#[derive(Clone)]
pub struct TenantRepository {
    pool: PgPool,
    caps: Capabilities,
}

impl TenantRepository {
    pub fn new(pool: PgPool, caps: Capabilities) -> Self {
        Self { pool, caps }
    }

    // As colunas de onboarding só existem em schemas migrados; num banco
    // antigo a loja é tratada como já onboardada para não travar os guards.
    fn select_cols(&self) -> &'static str {
        if self.caps.cafes_onboarding {
            "id, slug, name, is_active, subscription_plan, subscription_status, \
             is_onboarded, onboarding_data, created_at, updated_at"
        } else {
            "id, slug, name, is_active, subscription_plan, subscription_status, \
             TRUE AS is_onboarded, NULL::jsonb AS onboarding_data, created_at, updated_at"
        }
    }

    pub async fn create_cafe(
        &self,
        slug: &str,
        name: &str,
        plan: SubscriptionPlan,
    ) -> Result<Cafe, AppError> {
        let sql = format!(
            "INSERT INTO cafes (slug, name, subscription_plan, subscription_status) \
             VALUES ($1, $2, $3, 'active') RETURNING {}",
            self.select_cols()
        );

        sqlx::query_as::<_, Cafe>(&sql)
            .bind(slug)
            .bind(name)
            .bind(plan.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_unique_violation(e, "Já existe uma loja com este slug."))
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Cafe>, AppError> {
        if !self.caps.cafes_table {
            return Ok(None);
        }
        let sql = format!("SELECT {} FROM cafes WHERE id = $1", self.select_cols());
        Ok(sqlx::query_as::<_, Cafe>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    pub async fn find_by_slug(&self, slug: &str) -> Result<Option<Cafe>, AppError> {
        // Banco totalmente pré-migração: não há lojas para resolver.
        if !self.caps.cafes_table {
            return Ok(None);
        }
        let sql = format!("SELECT {} FROM cafes WHERE slug = $1", self.select_cols());
        Ok(sqlx::query_as::<_, Cafe>(&sql)
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?)
    }

    /// A loja de fallback do modo legado (slug fixo `default`). A migração
    /// é responsável por criá-la; aqui apenas a resolvemos.
    pub async fn find_default(&self) -> Result<Option<Cafe>, AppError> {
        self.find_by_slug("default").await
    }

    pub async fn list_all(&self) -> Result<Vec<Cafe>, AppError> {
        if !self.caps.cafes_table {
            return Ok(Vec::new());
        }
        let sql = format!("SELECT {} FROM cafes ORDER BY name", self.select_cols());
        Ok(sqlx::query_as::<_, Cafe>(&sql).fetch_all(&self.pool).await?)
    }

    pub async fn update_cafe(
        &self,
        id: Uuid,
        name: Option<&str>,
        is_active: Option<bool>,
    ) -> Result<Cafe, AppError> {
        let sql = format!(
            "UPDATE cafes SET name = COALESCE($2, name), \
             is_active = COALESCE($3, is_active), updated_at = NOW() \
             WHERE id = $1 RETURNING {}",
            self.select_cols()
        );

        sqlx::query_as::<_, Cafe>(&sql)
            .bind(id)
            .bind(name)
            .bind(is_active)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(AppError::TenantNotFound)
    }

    /// Soft delete: a loja nunca é removida fisicamente enquanto referenciada.
    pub async fn deactivate(&self, id: Uuid) -> Result<Cafe, AppError> {
        self.update_cafe(id, None, Some(false)).await
    }

    pub async fn update_subscription(
        &self,
        id: Uuid,
        plan: SubscriptionPlan,
        status: SubscriptionStatus,
    ) -> Result<Cafe, AppError> {
        let sql = format!(
            "UPDATE cafes SET subscription_plan = $2, subscription_status = $3, \
             updated_at = NOW() WHERE id = $1 RETURNING {}",
            self.select_cols()
        );

        sqlx::query_as::<_, Cafe>(&sql)
            .bind(id)
            .bind(plan.as_str())
            .bind(status.as_str())
            .fetch_optional(&self.pool)
            .await?
            .ok_or(AppError::TenantNotFound)
    }

    // ---
    // Onboarding
    // ---

    pub async fn save_onboarding_data(
        &self,
        id: Uuid,
        data: &serde_json::Value,
    ) -> Result<Cafe, AppError> {
        if !self.caps.cafes_onboarding {
            // Banco antigo: não há onde salvar o progresso.
            return self.find_by_id(id).await?.ok_or(AppError::TenantNotFound);
        }

        let sql = format!(
            "UPDATE cafes SET onboarding_data = $2, updated_at = NOW() \
             WHERE id = $1 RETURNING {}",
            self.select_cols()
        );

        sqlx::query_as::<_, Cafe>(&sql)
            .bind(id)
            .bind(data)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(AppError::TenantNotFound)
    }

    pub async fn set_onboarded(&self, id: Uuid, onboarded: bool) -> Result<Cafe, AppError> {
        if !self.caps.cafes_onboarding {
            return self.find_by_id(id).await?.ok_or(AppError::TenantNotFound);
        }

        let sql = format!(
            "UPDATE cafes SET is_onboarded = $2, updated_at = NOW() \
             WHERE id = $1 RETURNING {}",
            self.select_cols()
        );

        sqlx::query_as::<_, Cafe>(&sql)
            .bind(id)
            .bind(onboarded)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(AppError::TenantNotFound)
    }

    /// Reset completo do onboarding (ação de Super Admin).
    pub async fn reset_onboarding(&self, id: Uuid) -> Result<Cafe, AppError> {
        if !self.caps.cafes_onboarding {
            return self.find_by_id(id).await?.ok_or(AppError::TenantNotFound);
        }

        let sql = format!(
            "UPDATE cafes SET is_onboarded = FALSE, onboarding_data = NULL, \
             updated_at = NOW() WHERE id = $1 RETURNING {}",
            self.select_cols()
        );

        sqlx::query_as::<_, Cafe>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(AppError::TenantNotFound)
    }
}
