// src/db/audit_repo.rs

use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::features::{AuditAction, AuditEntry},
};

// Trilha append-only das mutações de assinatura e features. Nunca é
// atualizada nem apagada; a escrita é best-effort (o serviço loga e segue
// em frente se falhar).
#[derive(Clone)]
pub struct AuditRepository {
    pool: PgPool,
}

impl AuditRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn append(
        &self,
        cafe_id: Uuid,
        action: AuditAction,
        previous_value: Option<&str>,
        new_value: Option<&str>,
        changed_by: Uuid,
    ) -> Result<AuditEntry, AppError> {
        Ok(sqlx::query_as::<_, AuditEntry>(
            "INSERT INTO audit_logs (cafe_id, action_type, previous_value, new_value, changed_by) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING id, cafe_id, action_type, previous_value, new_value, changed_by, created_at",
        )
        .bind(cafe_id)
        .bind(action.as_str())
        .bind(previous_value)
        .bind(new_value)
        .bind(changed_by)
        .fetch_one(&self.pool)
        .await?)
    }

    pub async fn list_for_cafe(&self, cafe_id: Uuid, limit: i64) -> Result<Vec<AuditEntry>, AppError> {
        Ok(sqlx::query_as::<_, AuditEntry>(
            "SELECT id, cafe_id, action_type, previous_value, new_value, changed_by, created_at \
             FROM audit_logs WHERE cafe_id = $1 ORDER BY created_at DESC LIMIT $2",
        )
        .bind(cafe_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?)
    }

    pub async fn list_all(&self, limit: i64) -> Result<Vec<AuditEntry>, AppError> {
        Ok(sqlx::query_as::<_, AuditEntry>(
            "SELECT id, cafe_id, action_type, previous_value, new_value, changed_by, created_at \
             FROM audit_logs ORDER BY created_at DESC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?)
    }
}
