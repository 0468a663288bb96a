// src/db/inventory_repo.rs

use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::{AppError, map_unique_violation},
    db::{probe::Capabilities, scope::TenantScope},
    models::inventory::{CreateInventoryItemPayload, InventoryItem, UpdateInventoryItemPayload},
};

#[derive(Clone)]
pub struct InventoryRepository {
    pool: PgPool,
    caps: Capabilities,
}

impl InventoryRepository {
    pub fn new(pool: PgPool, caps: Capabilities) -> Self {
        Self { pool, caps }
    }

    fn cols(&self) -> &'static str {
        if self.caps.inventory_cafe_id {
            "id, cafe_id, name, unit, quantity, low_stock_threshold, is_active, \
             created_at, updated_at"
        } else {
            "id, NULL::uuid AS cafe_id, name, unit, quantity, low_stock_threshold, \
             is_active, created_at, updated_at"
        }
    }

    pub async fn list(&self, scope: TenantScope) -> Result<Vec<InventoryItem>, AppError> {
        let rows = match scope {
            TenantScope::Tenant(cafe_id) => {
                let sql = format!(
                    "SELECT {} FROM inventory_items WHERE cafe_id = $1 AND is_active = TRUE \
                     ORDER BY name",
                    self.cols()
                );
                sqlx::query_as::<_, InventoryItem>(&sql)
                    .bind(cafe_id)
                    .fetch_all(&self.pool)
                    .await?
            }
            TenantScope::Legacy => {
                let sql = format!(
                    "SELECT {} FROM inventory_items WHERE is_active = TRUE ORDER BY name",
                    self.cols()
                );
                sqlx::query_as::<_, InventoryItem>(&sql)
                    .fetch_all(&self.pool)
                    .await?
            }
        };
        Ok(rows)
    }

    pub async fn create(
        &self,
        scope: TenantScope,
        payload: &CreateInventoryItemPayload,
    ) -> Result<InventoryItem, AppError> {
        let result = match scope {
            TenantScope::Tenant(cafe_id) => {
                let sql = format!(
                    "INSERT INTO inventory_items (cafe_id, name, unit, quantity, \
                     low_stock_threshold) VALUES ($1, $2, $3, $4, $5) RETURNING {}",
                    self.cols()
                );
                sqlx::query_as::<_, InventoryItem>(&sql)
                    .bind(cafe_id)
                    .bind(&payload.name)
                    .bind(&payload.unit)
                    .bind(payload.quantity)
                    .bind(payload.low_stock_threshold)
                    .fetch_one(&self.pool)
                    .await
            }
            TenantScope::Legacy => {
                let sql = format!(
                    "INSERT INTO inventory_items (name, unit, quantity, low_stock_threshold) \
                     VALUES ($1, $2, $3, $4) RETURNING {}",
                    self.cols()
                );
                sqlx::query_as::<_, InventoryItem>(&sql)
                    .bind(&payload.name)
                    .bind(&payload.unit)
                    .bind(payload.quantity)
                    .bind(payload.low_stock_threshold)
                    .fetch_one(&self.pool)
                    .await
            }
        };

        result.map_err(|e| map_unique_violation(e, "Já existe um insumo com este nome."))
    }

    pub async fn update(
        &self,
        scope: TenantScope,
        id: Uuid,
        payload: &UpdateInventoryItemPayload,
    ) -> Result<InventoryItem, AppError> {
        let set = "name = COALESCE($2, name), unit = COALESCE($3, unit), \
                   quantity = COALESCE($4, quantity), \
                   low_stock_threshold = COALESCE($5, low_stock_threshold), \
                   updated_at = NOW()";

        let result = match scope {
            TenantScope::Tenant(cafe_id) => {
                let sql = format!(
                    "UPDATE inventory_items SET {set} WHERE id = $1 AND cafe_id = $6 \
                     RETURNING {}",
                    self.cols()
                );
                sqlx::query_as::<_, InventoryItem>(&sql)
                    .bind(id)
                    .bind(&payload.name)
                    .bind(&payload.unit)
                    .bind(payload.quantity)
                    .bind(payload.low_stock_threshold)
                    .bind(cafe_id)
                    .fetch_optional(&self.pool)
                    .await?
            }
            TenantScope::Legacy => {
                let sql = format!(
                    "UPDATE inventory_items SET {set} WHERE id = $1 RETURNING {}",
                    self.cols()
                );
                sqlx::query_as::<_, InventoryItem>(&sql)
                    .bind(id)
                    .bind(&payload.name)
                    .bind(&payload.unit)
                    .bind(payload.quantity)
                    .bind(payload.low_stock_threshold)
                    .fetch_optional(&self.pool)
                    .await?
            }
        };

        result.ok_or(AppError::NotFound("Insumo"))
    }

    pub async fn soft_delete(&self, scope: TenantScope, id: Uuid) -> Result<(), AppError> {
        let result = match scope {
            TenantScope::Tenant(cafe_id) => {
                sqlx::query(
                    "UPDATE inventory_items SET is_active = FALSE WHERE id = $1 AND cafe_id = $2",
                )
                .bind(id)
                .bind(cafe_id)
                .execute(&self.pool)
                .await?
            }
            TenantScope::Legacy => {
                sqlx::query("UPDATE inventory_items SET is_active = FALSE WHERE id = $1")
                    .bind(id)
                    .execute(&self.pool)
                    .await?
            }
        };

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Insumo"));
        }
        Ok(())
    }
}
