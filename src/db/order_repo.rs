// src/db/order_repo.rs

use rust_decimal::Decimal;
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::{AppError, map_unique_violation},
    db::{probe::Capabilities, scope::TenantScope},
    models::orders::{Order, OrderItem, OrderLinePayload, OrderStatus},
};

#[derive(Clone)]
pub struct OrderRepository {
    pool: PgPool,
    caps: Capabilities,
}

// Parâmetros de inserção já calculados pelo serviço (totais, impostos,
// desconto de pontos). O repositório só persiste.
pub struct NewOrder<'a> {
    pub order_number: &'a str,
    pub customer_id: Option<Uuid>,
    pub customer_name: &'a str,
    pub customer_phone: Option<&'a str>,
    pub total_amount: Decimal,
    pub tax_amount: Decimal,
    pub tip_amount: Decimal,
    pub points_redeemed: i32,
    pub final_amount: Decimal,
    pub payment_method: &'a str,
    pub split_payment_method: Option<&'a str>,
    pub split_amount: Option<Decimal>,
    pub extra_charge: Decimal,
    pub notes: Option<&'a str>,
}

impl OrderRepository {
    pub fn new(pool: PgPool, caps: Capabilities) -> Self {
        Self { pool, caps }
    }

    fn cols(&self) -> &'static str {
        if self.caps.orders_cafe_id {
            "id, cafe_id, order_number, customer_id, customer_name, customer_phone, \
             total_amount, tax_amount, tip_amount, points_redeemed, points_awarded, \
             final_amount, status, payment_method, split_payment_method, split_amount, \
             extra_charge, notes, created_at, updated_at"
        } else {
            "id, NULL::uuid AS cafe_id, order_number, customer_id, customer_name, \
             customer_phone, total_amount, tax_amount, tip_amount, points_redeemed, \
             points_awarded, final_amount, status, payment_method, split_payment_method, \
             split_amount, extra_charge, notes, created_at, updated_at"
        }
    }

    pub async fn insert_order(
        &self,
        conn: &mut sqlx::PgConnection,
        scope: TenantScope,
        new_order: &NewOrder<'_>,
    ) -> Result<Order, AppError> {
        let base_cols = "order_number, customer_id, customer_name, customer_phone, \
                         total_amount, tax_amount, tip_amount, points_redeemed, final_amount, \
                         status, payment_method, split_payment_method, split_amount, \
                         extra_charge, notes";
        let base_vals = "$1, $2, $3, $4, $5, $6, $7, $8, $9, 'pending', $10, $11, $12, $13, $14";

        let sql = match scope {
            TenantScope::Tenant(_) => format!(
                "INSERT INTO orders ({base_cols}, cafe_id) VALUES ({base_vals}, $15) \
                 RETURNING {}",
                self.cols()
            ),
            TenantScope::Legacy => format!(
                "INSERT INTO orders ({base_cols}) VALUES ({base_vals}) RETURNING {}",
                self.cols()
            ),
        };

        let mut query = sqlx::query_as::<_, Order>(&sql)
            .bind(new_order.order_number)
            .bind(new_order.customer_id)
            .bind(new_order.customer_name)
            .bind(new_order.customer_phone)
            .bind(new_order.total_amount)
            .bind(new_order.tax_amount)
            .bind(new_order.tip_amount)
            .bind(new_order.points_redeemed)
            .bind(new_order.final_amount)
            .bind(new_order.payment_method)
            .bind(new_order.split_payment_method)
            .bind(new_order.split_amount)
            .bind(new_order.extra_charge)
            .bind(new_order.notes);

        if let TenantScope::Tenant(cafe_id) = scope {
            query = query.bind(cafe_id);
        }

        query
            .fetch_one(&mut *conn)
            .await
            .map_err(|e| map_unique_violation(e, "Número de pedido já utilizado."))
    }

    pub async fn insert_items(
        &self,
        conn: &mut sqlx::PgConnection,
        order_id: Uuid,
        lines: &[OrderLinePayload],
    ) -> Result<Vec<OrderItem>, AppError> {
        let mut items = Vec::with_capacity(lines.len());
        for line in lines {
            let total_price = line.unit_price * Decimal::from(line.quantity);
            let item = sqlx::query_as::<_, OrderItem>(
                "INSERT INTO order_items (order_id, menu_item_id, item_name, quantity, \
                 unit_price, total_price) VALUES ($1, $2, $3, $4, $5, $6) \
                 RETURNING id, order_id, menu_item_id, item_name, quantity, unit_price, total_price",
            )
            .bind(order_id)
            .bind(line.menu_item_id)
            .bind(&line.item_name)
            .bind(line.quantity)
            .bind(line.unit_price)
            .bind(total_price)
            .fetch_one(&mut *conn)
            .await?;
            items.push(item);
        }
        Ok(items)
    }

    pub async fn find_by_id(&self, scope: TenantScope, id: Uuid) -> Result<Option<Order>, AppError> {
        let row = match scope {
            TenantScope::Tenant(cafe_id) => {
                let sql = format!(
                    "SELECT {} FROM orders WHERE id = $1 AND cafe_id = $2",
                    self.cols()
                );
                sqlx::query_as::<_, Order>(&sql)
                    .bind(id)
                    .bind(cafe_id)
                    .fetch_optional(&self.pool)
                    .await?
            }
            TenantScope::Legacy => {
                let sql = format!("SELECT {} FROM orders WHERE id = $1", self.cols());
                sqlx::query_as::<_, Order>(&sql)
                    .bind(id)
                    .fetch_optional(&self.pool)
                    .await?
            }
        };
        Ok(row)
    }

    pub async fn items_for(&self, order_id: Uuid) -> Result<Vec<OrderItem>, AppError> {
        Ok(sqlx::query_as::<_, OrderItem>(
            "SELECT id, order_id, menu_item_id, item_name, quantity, unit_price, total_price \
             FROM order_items WHERE order_id = $1",
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?)
    }

    /// Lista com filtros opcionais de status e telefone do cliente.
    pub async fn list(
        &self,
        scope: TenantScope,
        status: Option<&str>,
        customer_phone: Option<&str>,
    ) -> Result<Vec<Order>, AppError> {
        let mut clauses: Vec<String> = Vec::new();
        let mut n = 0;

        if matches!(scope, TenantScope::Tenant(_)) {
            n += 1;
            clauses.push(format!("cafe_id = ${n}"));
        }
        if status.is_some() {
            n += 1;
            clauses.push(format!("status = ${n}"));
        }
        if customer_phone.is_some() {
            n += 1;
            clauses.push(format!("customer_phone = ${n}"));
        }

        let where_clause = if clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", clauses.join(" AND "))
        };
        let sql = format!(
            "SELECT {} FROM orders{where_clause} ORDER BY created_at DESC",
            self.cols()
        );

        let mut query = sqlx::query_as::<_, Order>(&sql);
        if let TenantScope::Tenant(cafe_id) = scope {
            query = query.bind(cafe_id);
        }
        if let Some(status) = status {
            query = query.bind(status);
        }
        if let Some(phone) = customer_phone {
            query = query.bind(phone);
        }

        Ok(query.fetch_all(&self.pool).await?)
    }

    pub async fn update_status<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        status: OrderStatus,
    ) -> Result<Order, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            "UPDATE orders SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING {}",
            self.cols()
        );

        sqlx::query_as::<_, Order>(&sql)
            .bind(id)
            .bind(status.as_str())
            .fetch_optional(executor)
            .await?
            .ok_or(AppError::OrderNotFound)
    }

    /// A trava que garante crédito único de pontos por pedido.
    pub async fn mark_points_awarded<'e, E>(&self, executor: E, id: Uuid) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("UPDATE orders SET points_awarded = TRUE WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(())
    }

    /// Remove o pedido e devolve a linha removida para o chamador ajustar o
    /// agregado do dia e notificar os assinantes.
    pub async fn delete(&self, scope: TenantScope, id: Uuid) -> Result<Order, AppError> {
        let sql = match scope {
            TenantScope::Tenant(_) => format!(
                "DELETE FROM orders WHERE id = $1 AND cafe_id = $2 RETURNING {}",
                self.cols()
            ),
            TenantScope::Legacy => {
                format!("DELETE FROM orders WHERE id = $1 RETURNING {}", self.cols())
            }
        };

        let mut query = sqlx::query_as::<_, Order>(&sql).bind(id);
        if let TenantScope::Tenant(cafe_id) = scope {
            query = query.bind(cafe_id);
        }

        query
            .fetch_optional(&self.pool)
            .await?
            .ok_or(AppError::OrderNotFound)
    }
}
