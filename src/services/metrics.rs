// src/services/metrics.rs

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::MetricsRepository,
    models::metrics::{DailyMetric, MetricsOverview},
};

// O agregador de métricas diárias. As mutações disparadas pelos caminhos de
// escrita de pedidos e clientes são best-effort: falha aqui jamais derruba
// a mutação primária; loga e segue. O `recompute` é o reconciliador.
#[derive(Clone)]
pub struct MetricsService {
    metrics_repo: MetricsRepository,
}

impl MetricsService {
    pub fn new(metrics_repo: MetricsRepository) -> Self {
        Self { metrics_repo }
    }

    pub fn today() -> NaiveDate {
        Utc::now().date_naive()
    }

    pub async fn order_created(&self, cafe_id: Uuid, revenue: Decimal, is_completed: bool) {
        if let Err(e) = self
            .metrics_repo
            .increment_order(cafe_id, Self::today(), revenue, is_completed)
            .await
        {
            tracing::warn!("Falha ao incrementar métricas do dia para {cafe_id}: {e}");
        }
    }

    pub async fn order_deleted(
        &self,
        cafe_id: Uuid,
        date: NaiveDate,
        revenue: Decimal,
        was_completed: bool,
    ) {
        if let Err(e) = self
            .metrics_repo
            .decrement_order(cafe_id, date, revenue, was_completed)
            .await
        {
            tracing::warn!("Falha ao decrementar métricas do dia para {cafe_id}: {e}");
        }
    }

    /// Cancelamento tira o pedido do agregado do dia: criar e cancelar em
    /// seguida resulta em contagem líquida zero.
    pub async fn order_cancelled(&self, cafe_id: Uuid, date: NaiveDate, revenue: Decimal) {
        if let Err(e) = self
            .metrics_repo
            .decrement_order(cafe_id, date, revenue, false)
            .await
        {
            tracing::warn!("Falha ao abater pedido cancelado nas métricas para {cafe_id}: {e}");
        }
    }

    pub async fn order_completion_changed(
        &self,
        cafe_id: Uuid,
        date: NaiveDate,
        revenue: Decimal,
        is_now_completed: bool,
    ) {
        if let Err(e) = self
            .metrics_repo
            .update_completion(cafe_id, date, revenue, is_now_completed)
            .await
        {
            tracing::warn!("Falha ao atualizar conclusão nas métricas para {cafe_id}: {e}");
        }
    }

    pub async fn customer_created(&self, cafe_id: Uuid, is_new: bool) {
        if let Err(e) = self
            .metrics_repo
            .increment_customer(cafe_id, Self::today(), is_new)
            .await
        {
            tracing::warn!("Falha ao contar cliente novo nas métricas para {cafe_id}: {e}");
        }
    }

    // ---
    // Leituras (estas propagam erro normalmente)
    // ---

    pub async fn get_day(&self, cafe_id: Uuid, date: NaiveDate) -> Result<DailyMetric, AppError> {
        self.metrics_repo.get(cafe_id, date).await
    }

    pub async fn list_range(
        &self,
        cafe_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<DailyMetric>, AppError> {
        self.metrics_repo.list_range(cafe_id, from, to).await
    }

    /// Reconstrói a linha do dia a partir da fonte de verdade. Idempotente.
    pub async fn recompute(&self, cafe_id: Uuid, date: NaiveDate) -> Result<DailyMetric, AppError> {
        self.metrics_repo.recompute(cafe_id, date).await
    }

    pub async fn overview(&self) -> Result<MetricsOverview, AppError> {
        self.metrics_repo.overview(Self::today()).await
    }
}
