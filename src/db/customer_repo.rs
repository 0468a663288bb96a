// src/db/customer_repo.rs

use rust_decimal::Decimal;
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::{AppError, map_unique_violation},
    db::{probe::Capabilities, scope::TenantScope},
    models::customers::{CreateCustomerPayload, Customer, UpdateCustomerPayload},
};

#[derive(Clone)]
pub struct CustomerRepository {
    pool: PgPool,
    caps: Capabilities,
}

impl CustomerRepository {
    pub fn new(pool: PgPool, caps: Capabilities) -> Self {
        Self { pool, caps }
    }

    fn cols(&self) -> &'static str {
        if self.caps.customers_cafe_id {
            "id, cafe_id, name, phone, email, loyalty_points, total_spent, visit_count, \
             last_visit_date, source, is_active, created_at"
        } else {
            "id, NULL::uuid AS cafe_id, name, phone, email, loyalty_points, total_spent, \
             visit_count, last_visit_date, source, is_active, created_at"
        }
    }

    pub async fn list(&self, scope: TenantScope) -> Result<Vec<Customer>, AppError> {
        let rows = match scope {
            TenantScope::Tenant(cafe_id) => {
                let sql = format!(
                    "SELECT {} FROM customers WHERE cafe_id = $1 AND is_active = TRUE \
                     ORDER BY name",
                    self.cols()
                );
                sqlx::query_as::<_, Customer>(&sql)
                    .bind(cafe_id)
                    .fetch_all(&self.pool)
                    .await?
            }
            TenantScope::Legacy => {
                let sql = format!(
                    "SELECT {} FROM customers WHERE is_active = TRUE ORDER BY name",
                    self.cols()
                );
                sqlx::query_as::<_, Customer>(&sql).fetch_all(&self.pool).await?
            }
        };
        Ok(rows)
    }

    pub async fn find_by_id(
        &self,
        scope: TenantScope,
        id: Uuid,
    ) -> Result<Option<Customer>, AppError> {
        let row = match scope {
            TenantScope::Tenant(cafe_id) => {
                let sql = format!(
                    "SELECT {} FROM customers WHERE id = $1 AND cafe_id = $2",
                    self.cols()
                );
                sqlx::query_as::<_, Customer>(&sql)
                    .bind(id)
                    .bind(cafe_id)
                    .fetch_optional(&self.pool)
                    .await?
            }
            TenantScope::Legacy => {
                let sql = format!("SELECT {} FROM customers WHERE id = $1", self.cols());
                sqlx::query_as::<_, Customer>(&sql)
                    .bind(id)
                    .fetch_optional(&self.pool)
                    .await?
            }
        };
        Ok(row)
    }

    /// O telefone é único dentro da loja; é a chave natural usada pelo
    /// fluxo de pedidos para reencontrar o cliente.
    pub async fn find_by_phone<'e, E>(
        &self,
        executor: E,
        scope: TenantScope,
        phone: &str,
    ) -> Result<Option<Customer>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let row = match scope {
            TenantScope::Tenant(cafe_id) => {
                let sql = format!(
                    "SELECT {} FROM customers WHERE phone = $1 AND cafe_id = $2",
                    self.cols()
                );
                sqlx::query_as::<_, Customer>(&sql)
                    .bind(phone)
                    .bind(cafe_id)
                    .fetch_optional(executor)
                    .await?
            }
            TenantScope::Legacy => {
                let sql = format!("SELECT {} FROM customers WHERE phone = $1", self.cols());
                sqlx::query_as::<_, Customer>(&sql)
                    .bind(phone)
                    .fetch_optional(executor)
                    .await?
            }
        };
        Ok(row)
    }

    /// `source` distingue cadastro manual de cliente nascido de um pedido.
    pub async fn create<'e, E>(
        &self,
        executor: E,
        scope: TenantScope,
        payload: &CreateCustomerPayload,
        source: &str,
    ) -> Result<Customer, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = match scope {
            TenantScope::Tenant(cafe_id) => {
                let sql = format!(
                    "INSERT INTO customers (cafe_id, name, phone, email, source) \
                     VALUES ($1, $2, $3, $4, $5) RETURNING {}",
                    self.cols()
                );
                sqlx::query_as::<_, Customer>(&sql)
                    .bind(cafe_id)
                    .bind(&payload.name)
                    .bind(&payload.phone)
                    .bind(&payload.email)
                    .bind(source)
                    .fetch_one(executor)
                    .await
            }
            TenantScope::Legacy => {
                let sql = format!(
                    "INSERT INTO customers (name, phone, email, source) \
                     VALUES ($1, $2, $3, $4) RETURNING {}",
                    self.cols()
                );
                sqlx::query_as::<_, Customer>(&sql)
                    .bind(&payload.name)
                    .bind(&payload.phone)
                    .bind(&payload.email)
                    .bind(source)
                    .fetch_one(executor)
                    .await
            }
        };

        result.map_err(|e| map_unique_violation(e, "Já existe um cliente com este telefone."))
    }

    pub async fn update(
        &self,
        scope: TenantScope,
        id: Uuid,
        payload: &UpdateCustomerPayload,
    ) -> Result<Customer, AppError> {
        let set = "name = COALESCE($2, name), phone = COALESCE($3, phone), \
                   email = COALESCE($4, email)";

        let result = match scope {
            TenantScope::Tenant(cafe_id) => {
                let sql = format!(
                    "UPDATE customers SET {set} WHERE id = $1 AND cafe_id = $5 RETURNING {}",
                    self.cols()
                );
                sqlx::query_as::<_, Customer>(&sql)
                    .bind(id)
                    .bind(&payload.name)
                    .bind(&payload.phone)
                    .bind(&payload.email)
                    .bind(cafe_id)
                    .fetch_optional(&self.pool)
                    .await
            }
            TenantScope::Legacy => {
                let sql = format!(
                    "UPDATE customers SET {set} WHERE id = $1 RETURNING {}",
                    self.cols()
                );
                sqlx::query_as::<_, Customer>(&sql)
                    .bind(id)
                    .bind(&payload.name)
                    .bind(&payload.phone)
                    .bind(&payload.email)
                    .fetch_optional(&self.pool)
                    .await
            }
        };

        result
            .map_err(|e| map_unique_violation(e, "Já existe um cliente com este telefone."))?
            .ok_or(AppError::NotFound("Cliente"))
    }

    pub async fn soft_delete(&self, scope: TenantScope, id: Uuid) -> Result<(), AppError> {
        let result = match scope {
            TenantScope::Tenant(cafe_id) => {
                sqlx::query("UPDATE customers SET is_active = FALSE WHERE id = $1 AND cafe_id = $2")
                    .bind(id)
                    .bind(cafe_id)
                    .execute(&self.pool)
                    .await?
            }
            TenantScope::Legacy => {
                sqlx::query("UPDATE customers SET is_active = FALSE WHERE id = $1")
                    .bind(id)
                    .execute(&self.pool)
                    .await?
            }
        };

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Cliente"));
        }
        Ok(())
    }

    // ---
    // Efeitos de fidelidade disparados pelo ciclo de vida do pedido
    // ---

    /// Débito imediato dos pontos resgatados na criação do pedido.
    pub async fn deduct_points<'e, E>(
        &self,
        executor: E,
        customer_id: Uuid,
        points: i32,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            "UPDATE customers SET loyalty_points = GREATEST(loyalty_points - $2, 0) \
             WHERE id = $1",
        )
        .bind(customer_id)
        .bind(points)
        .execute(executor)
        .await?;
        Ok(())
    }

    /// Crédito único na primeira transição para `completed`: pontos,
    /// total gasto, contagem de visitas e data da última visita.
    pub async fn apply_completion_credit<'e, E>(
        &self,
        executor: E,
        customer_id: Uuid,
        points_earned: i32,
        amount_spent: Decimal,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            "UPDATE customers SET loyalty_points = loyalty_points + $2, \
             total_spent = total_spent + $3, visit_count = visit_count + 1, \
             last_visit_date = NOW() WHERE id = $1",
        )
        .bind(customer_id)
        .bind(points_earned)
        .bind(amount_spent)
        .execute(executor)
        .await?;
        Ok(())
    }
}
