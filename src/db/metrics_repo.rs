// src/db/metrics_repo.rs

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::probe::Capabilities,
    models::metrics::{DailyMetric, MetricsOverview},
};

// A tabela denormalizada de contadores por (loja, dia). Todas as mutações
// são write-through: garantem a linha e aplicam o delta na mesma instrução.
// Contadores nunca ficam negativos; decrementos saturam com GREATEST.
#[derive(Clone)]
pub struct MetricsRepository {
    pool: PgPool,
    caps: Capabilities,
}

const METRIC_COLS: &str =
    "cafe_id, date, total_orders, completed_orders, total_revenue, completed_revenue, \
     new_customers";

impl MetricsRepository {
    pub fn new(pool: PgPool, caps: Capabilities) -> Self {
        Self { pool, caps }
    }

    async fn ensure_row(&self, cafe_id: Uuid, date: NaiveDate) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO daily_metrics (cafe_id, date) VALUES ($1, $2) \
             ON CONFLICT (cafe_id, date) DO NOTHING",
        )
        .bind(cafe_id)
        .bind(date)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn increment_order(
        &self,
        cafe_id: Uuid,
        date: NaiveDate,
        revenue: Decimal,
        is_completed: bool,
    ) -> Result<(), AppError> {
        self.ensure_row(cafe_id, date).await?;
        sqlx::query(
            "UPDATE daily_metrics SET \
             total_orders = total_orders + 1, \
             total_revenue = total_revenue + $3, \
             completed_orders = completed_orders + CASE WHEN $4 THEN 1 ELSE 0 END, \
             completed_revenue = completed_revenue + CASE WHEN $4 THEN $3 ELSE 0 END \
             WHERE cafe_id = $1 AND date = $2",
        )
        .bind(cafe_id)
        .bind(date)
        .bind(revenue)
        .bind(is_completed)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn decrement_order(
        &self,
        cafe_id: Uuid,
        date: NaiveDate,
        revenue: Decimal,
        was_completed: bool,
    ) -> Result<(), AppError> {
        self.ensure_row(cafe_id, date).await?;
        sqlx::query(
            "UPDATE daily_metrics SET \
             total_orders = GREATEST(total_orders - 1, 0), \
             total_revenue = GREATEST(total_revenue - $3, 0), \
             completed_orders = GREATEST(completed_orders - CASE WHEN $4 THEN 1 ELSE 0 END, 0), \
             completed_revenue = GREATEST(completed_revenue - CASE WHEN $4 THEN $3 ELSE 0 END, 0) \
             WHERE cafe_id = $1 AND date = $2",
        )
        .bind(cafe_id)
        .bind(date)
        .bind(revenue)
        .bind(was_completed)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Transição entrando (`true`) ou saindo (`false`) de `completed`.
    pub async fn update_completion(
        &self,
        cafe_id: Uuid,
        date: NaiveDate,
        revenue: Decimal,
        is_now_completed: bool,
    ) -> Result<(), AppError> {
        self.ensure_row(cafe_id, date).await?;
        sqlx::query(
            "UPDATE daily_metrics SET \
             completed_orders = GREATEST(completed_orders + CASE WHEN $4 THEN 1 ELSE -1 END, 0), \
             completed_revenue = GREATEST(completed_revenue + CASE WHEN $4 THEN $3 ELSE -$3 END, 0) \
             WHERE cafe_id = $1 AND date = $2",
        )
        .bind(cafe_id)
        .bind(date)
        .bind(revenue)
        .bind(is_now_completed)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn increment_customer(
        &self,
        cafe_id: Uuid,
        date: NaiveDate,
        is_new: bool,
    ) -> Result<(), AppError> {
        if !is_new {
            return Ok(());
        }
        self.ensure_row(cafe_id, date).await?;
        sqlx::query(
            "UPDATE daily_metrics SET new_customers = new_customers + 1 \
             WHERE cafe_id = $1 AND date = $2",
        )
        .bind(cafe_id)
        .bind(date)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get(&self, cafe_id: Uuid, date: NaiveDate) -> Result<DailyMetric, AppError> {
        let row = sqlx::query_as::<_, DailyMetric>(&format!(
            "SELECT {METRIC_COLS} FROM daily_metrics WHERE cafe_id = $1 AND date = $2"
        ))
        .bind(cafe_id)
        .bind(date)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.unwrap_or_else(|| DailyMetric::empty(cafe_id, date)))
    }

    pub async fn list_range(
        &self,
        cafe_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<DailyMetric>, AppError> {
        Ok(sqlx::query_as::<_, DailyMetric>(&format!(
            "SELECT {METRIC_COLS} FROM daily_metrics \
             WHERE cafe_id = $1 AND date BETWEEN $2 AND $3 ORDER BY date"
        ))
        .bind(cafe_id)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?)
    }

    /// Reconstrói a linha do dia a partir das tabelas-fonte. Idempotente e
    /// autoritativo: depois de rodar, a linha é igual ao agregado real.
    /// É o reconciliador da contabilização best-effort.
    pub async fn recompute(&self, cafe_id: Uuid, date: NaiveDate) -> Result<DailyMetric, AppError> {
        // Em modo legado (sem cafe_id nas tabelas-fonte) o agregado lê tudo.
        let order_filter = if self.caps.orders_cafe_id {
            "cafe_id = $1 AND created_at::date = $2"
        } else {
            "created_at::date = $2"
        };
        let customer_filter = if self.caps.customers_cafe_id {
            "cafe_id = $1 AND created_at::date = $2"
        } else {
            "created_at::date = $2"
        };

        let (total_orders, total_revenue, completed_orders, completed_revenue): (
            i64,
            Decimal,
            i64,
            Decimal,
        ) = sqlx::query_as(&format!(
            // Pedidos cancelados saem do agregado, espelhando o caminho
            // incremental (criação conta, cancelamento abate).
            "SELECT COUNT(*) FILTER (WHERE status <> 'cancelled'), \
             COALESCE(SUM(final_amount) FILTER (WHERE status <> 'cancelled'), 0), \
             COUNT(*) FILTER (WHERE status = 'completed'), \
             COALESCE(SUM(final_amount) FILTER (WHERE status = 'completed'), 0) \
             FROM orders WHERE {order_filter}"
        ))
        .bind(cafe_id)
        .bind(date)
        .fetch_one(&self.pool)
        .await?;

        let (new_customers,): (i64,) = sqlx::query_as(&format!(
            "SELECT COUNT(*) FROM customers WHERE {customer_filter}"
        ))
        .bind(cafe_id)
        .bind(date)
        .fetch_one(&self.pool)
        .await?;

        Ok(sqlx::query_as::<_, DailyMetric>(&format!(
            "INSERT INTO daily_metrics ({METRIC_COLS}) VALUES ($1, $2, $3, $4, $5, $6, $7) \
             ON CONFLICT (cafe_id, date) DO UPDATE SET \
             total_orders = EXCLUDED.total_orders, \
             completed_orders = EXCLUDED.completed_orders, \
             total_revenue = EXCLUDED.total_revenue, \
             completed_revenue = EXCLUDED.completed_revenue, \
             new_customers = EXCLUDED.new_customers \
             RETURNING {METRIC_COLS}"
        ))
        .bind(cafe_id)
        .bind(date)
        .bind(total_orders as i32)
        .bind(completed_orders as i32)
        .bind(total_revenue)
        .bind(completed_revenue)
        .bind(new_customers as i32)
        .fetch_one(&self.pool)
        .await?)
    }

    /// Visão consolidada do painel do Super Admin.
    pub async fn overview(&self, today: NaiveDate) -> Result<MetricsOverview, AppError> {
        let (total_cafes, active_cafes): (i64, i64) = sqlx::query_as(
            "SELECT COUNT(*), COUNT(*) FILTER (WHERE is_active) FROM cafes",
        )
        .fetch_one(&self.pool)
        .await?;

        let (orders_today, revenue_today): (i64, Decimal) = sqlx::query_as(
            "SELECT COALESCE(SUM(total_orders), 0)::bigint, COALESCE(SUM(total_revenue), 0) \
             FROM daily_metrics WHERE date = $1",
        )
        .bind(today)
        .fetch_one(&self.pool)
        .await?;

        Ok(MetricsOverview {
            total_cafes,
            active_cafes,
            orders_today,
            revenue_today,
        })
    }
}
