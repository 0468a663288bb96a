// src/db/catalog_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::{AppError, map_unique_violation},
    db::{probe::Capabilities, scope::TenantScope},
    models::catalog::{
        Category, CreateCategoryPayload, CreateMenuItemPayload, MenuItem, UpdateCategoryPayload,
        UpdateMenuItemPayload,
    },
};

#[derive(Clone)]
pub struct CatalogRepository {
    pool: PgPool,
    caps: Capabilities,
}

impl CatalogRepository {
    pub fn new(pool: PgPool, caps: Capabilities) -> Self {
        Self { pool, caps }
    }

    // ---
    // Categorias
    // ---

    fn category_cols(&self) -> &'static str {
        if self.caps.categories_cafe_id {
            "id, cafe_id, name, sort_order, is_active, created_at"
        } else {
            "id, NULL::uuid AS cafe_id, name, sort_order, is_active, created_at"
        }
    }

    pub async fn list_categories(&self, scope: TenantScope) -> Result<Vec<Category>, AppError> {
        let rows = match scope {
            TenantScope::Tenant(cafe_id) => {
                let sql = format!(
                    "SELECT {} FROM categories WHERE cafe_id = $1 AND is_active = TRUE \
                     ORDER BY sort_order, name",
                    self.category_cols()
                );
                sqlx::query_as::<_, Category>(&sql)
                    .bind(cafe_id)
                    .fetch_all(&self.pool)
                    .await?
            }
            TenantScope::Legacy => {
                let sql = format!(
                    "SELECT {} FROM categories WHERE is_active = TRUE ORDER BY sort_order, name",
                    self.category_cols()
                );
                sqlx::query_as::<_, Category>(&sql).fetch_all(&self.pool).await?
            }
        };
        Ok(rows)
    }

    pub async fn create_category(
        &self,
        scope: TenantScope,
        payload: &CreateCategoryPayload,
    ) -> Result<Category, AppError> {
        let result = match scope {
            TenantScope::Tenant(cafe_id) => {
                let sql = format!(
                    "INSERT INTO categories (cafe_id, name, sort_order) VALUES ($1, $2, $3) \
                     RETURNING {}",
                    self.category_cols()
                );
                sqlx::query_as::<_, Category>(&sql)
                    .bind(cafe_id)
                    .bind(&payload.name)
                    .bind(payload.sort_order)
                    .fetch_one(&self.pool)
                    .await
            }
            TenantScope::Legacy => {
                let sql = format!(
                    "INSERT INTO categories (name, sort_order) VALUES ($1, $2) RETURNING {}",
                    self.category_cols()
                );
                sqlx::query_as::<_, Category>(&sql)
                    .bind(&payload.name)
                    .bind(payload.sort_order)
                    .fetch_one(&self.pool)
                    .await
            }
        };

        result.map_err(|e| map_unique_violation(e, "Já existe uma categoria com este nome."))
    }

    pub async fn update_category(
        &self,
        scope: TenantScope,
        id: Uuid,
        payload: &UpdateCategoryPayload,
    ) -> Result<Category, AppError> {
        let set = "name = COALESCE($2, name), sort_order = COALESCE($3, sort_order), \
                   is_active = COALESCE($4, is_active)";

        let result = match scope {
            TenantScope::Tenant(cafe_id) => {
                let sql = format!(
                    "UPDATE categories SET {set} WHERE id = $1 AND cafe_id = $5 RETURNING {}",
                    self.category_cols()
                );
                sqlx::query_as::<_, Category>(&sql)
                    .bind(id)
                    .bind(&payload.name)
                    .bind(payload.sort_order)
                    .bind(payload.is_active)
                    .bind(cafe_id)
                    .fetch_optional(&self.pool)
                    .await
            }
            TenantScope::Legacy => {
                let sql = format!(
                    "UPDATE categories SET {set} WHERE id = $1 RETURNING {}",
                    self.category_cols()
                );
                sqlx::query_as::<_, Category>(&sql)
                    .bind(id)
                    .bind(&payload.name)
                    .bind(payload.sort_order)
                    .bind(payload.is_active)
                    .fetch_optional(&self.pool)
                    .await
            }
        };

        result
            .map_err(|e| map_unique_violation(e, "Já existe uma categoria com este nome."))?
            .ok_or(AppError::NotFound("Categoria"))
    }

    /// Categorias têm `is_active`: o delete é sempre lógico.
    pub async fn delete_category(&self, scope: TenantScope, id: Uuid) -> Result<(), AppError> {
        let result = match scope {
            TenantScope::Tenant(cafe_id) => {
                sqlx::query("UPDATE categories SET is_active = FALSE WHERE id = $1 AND cafe_id = $2")
                    .bind(id)
                    .bind(cafe_id)
                    .execute(&self.pool)
                    .await?
            }
            TenantScope::Legacy => {
                sqlx::query("UPDATE categories SET is_active = FALSE WHERE id = $1")
                    .bind(id)
                    .execute(&self.pool)
                    .await?
            }
        };

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Categoria"));
        }
        Ok(())
    }

    // ---
    // Itens do cardápio
    // ---
    // Duas colunas opcionais aqui: `cafe_id` e `featured_priority`. A lista
    // de colunas é montada conforme o snapshot de capacidades, com NULL no
    // lugar das ausentes para o modelo continuar único.

    fn menu_cols(&self) -> String {
        let cafe = if self.caps.menu_cafe_id {
            "cafe_id"
        } else {
            "NULL::uuid AS cafe_id"
        };
        let featured = if self.caps.menu_featured_priority {
            "featured_priority"
        } else {
            "NULL::int AS featured_priority"
        };
        format!(
            "id, {cafe}, category_id, name, price, is_available, image_url, {featured}, created_at"
        )
    }

    pub async fn list_menu_items(&self, scope: TenantScope) -> Result<Vec<MenuItem>, AppError> {
        let rows = match scope {
            TenantScope::Tenant(cafe_id) => {
                let sql = format!(
                    "SELECT {} FROM menu_items WHERE cafe_id = $1 ORDER BY name",
                    self.menu_cols()
                );
                sqlx::query_as::<_, MenuItem>(&sql)
                    .bind(cafe_id)
                    .fetch_all(&self.pool)
                    .await?
            }
            TenantScope::Legacy => {
                let sql = format!("SELECT {} FROM menu_items ORDER BY name", self.menu_cols());
                sqlx::query_as::<_, MenuItem>(&sql).fetch_all(&self.pool).await?
            }
        };
        Ok(rows)
    }

    pub async fn find_menu_item(
        &self,
        scope: TenantScope,
        id: Uuid,
    ) -> Result<Option<MenuItem>, AppError> {
        let row = match scope {
            TenantScope::Tenant(cafe_id) => {
                let sql = format!(
                    "SELECT {} FROM menu_items WHERE id = $1 AND cafe_id = $2",
                    self.menu_cols()
                );
                sqlx::query_as::<_, MenuItem>(&sql)
                    .bind(id)
                    .bind(cafe_id)
                    .fetch_optional(&self.pool)
                    .await?
            }
            TenantScope::Legacy => {
                let sql = format!("SELECT {} FROM menu_items WHERE id = $1", self.menu_cols());
                sqlx::query_as::<_, MenuItem>(&sql)
                    .bind(id)
                    .fetch_optional(&self.pool)
                    .await?
            }
        };
        Ok(row)
    }

    /// Aceita qualquer executor para participar da transação da importação
    /// em massa.
    pub async fn create_menu_item<'e, E>(
        &self,
        executor: E,
        scope: TenantScope,
        payload: &CreateMenuItemPayload,
    ) -> Result<MenuItem, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let mut insert_cols = vec!["category_id", "name", "price", "is_available", "image_url"];
        if self.caps.menu_featured_priority {
            insert_cols.push("featured_priority");
        }
        if self.caps.menu_cafe_id && matches!(scope, TenantScope::Tenant(_)) {
            insert_cols.push("cafe_id");
        }
        let placeholders: Vec<String> =
            (1..=insert_cols.len()).map(|i| format!("${i}")).collect();

        let sql = format!(
            "INSERT INTO menu_items ({}) VALUES ({}) RETURNING {}",
            insert_cols.join(", "),
            placeholders.join(", "),
            self.menu_cols()
        );

        let mut query = sqlx::query_as::<_, MenuItem>(&sql)
            .bind(payload.category_id)
            .bind(&payload.name)
            .bind(payload.price)
            .bind(payload.is_available)
            .bind(&payload.image_url);

        if self.caps.menu_featured_priority {
            query = query.bind(payload.featured_priority);
        }
        if let TenantScope::Tenant(cafe_id) = scope {
            if self.caps.menu_cafe_id {
                query = query.bind(cafe_id);
            }
        }

        query
            .fetch_one(executor)
            .await
            .map_err(|e| map_unique_violation(e, "Já existe um item com este nome na categoria."))
    }

    pub async fn update_menu_item(
        &self,
        scope: TenantScope,
        id: Uuid,
        payload: &UpdateMenuItemPayload,
    ) -> Result<MenuItem, AppError> {
        let featured_set = if self.caps.menu_featured_priority {
            ", featured_priority = COALESCE($7, featured_priority)"
        } else {
            ""
        };
        let set = format!(
            "category_id = COALESCE($2, category_id), name = COALESCE($3, name), \
             price = COALESCE($4, price), is_available = COALESCE($5, is_available), \
             image_url = COALESCE($6, image_url){featured_set}"
        );

        let where_clause = match scope {
            TenantScope::Tenant(_) => {
                if self.caps.menu_featured_priority {
                    "id = $1 AND cafe_id = $8"
                } else {
                    "id = $1 AND cafe_id = $7"
                }
            }
            TenantScope::Legacy => "id = $1",
        };

        let sql = format!(
            "UPDATE menu_items SET {set} WHERE {where_clause} RETURNING {}",
            self.menu_cols()
        );

        let mut query = sqlx::query_as::<_, MenuItem>(&sql)
            .bind(id)
            .bind(payload.category_id)
            .bind(&payload.name)
            .bind(payload.price)
            .bind(payload.is_available)
            .bind(&payload.image_url);

        if self.caps.menu_featured_priority {
            query = query.bind(payload.featured_priority);
        }
        if let TenantScope::Tenant(cafe_id) = scope {
            query = query.bind(cafe_id);
        }

        query
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_unique_violation(e, "Já existe um item com este nome na categoria."))?
            .ok_or(AppError::NotFound("Item do cardápio"))
    }

    /// Itens do cardápio não têm `is_active`: a remoção é física.
    pub async fn delete_menu_item(&self, scope: TenantScope, id: Uuid) -> Result<(), AppError> {
        let result = match scope {
            TenantScope::Tenant(cafe_id) => {
                sqlx::query("DELETE FROM menu_items WHERE id = $1 AND cafe_id = $2")
                    .bind(id)
                    .bind(cafe_id)
                    .execute(&self.pool)
                    .await?
            }
            TenantScope::Legacy => {
                sqlx::query("DELETE FROM menu_items WHERE id = $1")
                    .bind(id)
                    .execute(&self.pool)
                    .await?
            }
        };

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Item do cardápio"));
        }
        Ok(())
    }

    /// Resolve a categoria pelo nome, criando-a se ainda não existir.
    /// Usado pela importação em massa, dentro da transação do chamador.
    pub async fn find_or_create_category(
        &self,
        conn: &mut sqlx::PgConnection,
        scope: TenantScope,
        name: &str,
    ) -> Result<Uuid, AppError> {
        let (find_sql, insert_sql) = match scope {
            TenantScope::Tenant(_) => (
                "SELECT id FROM categories WHERE cafe_id = $2 AND name = $1",
                "INSERT INTO categories (name, cafe_id) VALUES ($1, $2) RETURNING id",
            ),
            TenantScope::Legacy => (
                "SELECT id FROM categories WHERE name = $1",
                "INSERT INTO categories (name) VALUES ($1) RETURNING id",
            ),
        };

        let mut find = sqlx::query_as::<_, (Uuid,)>(find_sql).bind(name);
        if let TenantScope::Tenant(cafe_id) = scope {
            find = find.bind(cafe_id);
        }
        if let Some((id,)) = find.fetch_optional(&mut *conn).await? {
            return Ok(id);
        }

        let mut insert = sqlx::query_as::<_, (Uuid,)>(insert_sql).bind(name);
        if let TenantScope::Tenant(cafe_id) = scope {
            insert = insert.bind(cafe_id);
        }
        let (id,) = insert.fetch_one(&mut *conn).await?;
        Ok(id)
    }
}
