// src/models/metrics.rs

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

// A linha denormalizada de contadores por (loja, dia). Todos os contadores
// são não-negativos; decrementos saturam em zero.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DailyMetric {
    pub cafe_id: Uuid,
    pub date: NaiveDate,
    pub total_orders: i32,
    pub completed_orders: i32,
    pub total_revenue: Decimal,
    pub completed_revenue: Decimal,
    pub new_customers: i32,
}

impl DailyMetric {
    pub fn empty(cafe_id: Uuid, date: NaiveDate) -> Self {
        Self {
            cafe_id,
            date,
            total_orders: 0,
            completed_orders: 0,
            total_revenue: Decimal::ZERO,
            completed_revenue: Decimal::ZERO,
            new_customers: 0,
        }
    }
}

// Visão consolidada para o painel do Super Admin.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MetricsOverview {
    pub total_cafes: i64,
    pub active_cafes: i64,
    pub orders_today: i64,
    pub revenue_today: Decimal,
}
