// src/db/invoice_repo.rs

use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::{AppError, map_unique_violation},
    db::{probe::Capabilities, scope::TenantScope},
    models::{invoices::Invoice, orders::Order},
};

#[derive(Clone)]
pub struct InvoiceRepository {
    pool: PgPool,
    caps: Capabilities,
}

impl InvoiceRepository {
    pub fn new(pool: PgPool, caps: Capabilities) -> Self {
        Self { pool, caps }
    }

    fn cols(&self) -> &'static str {
        if self.caps.invoices_cafe_id {
            "id, invoice_number, order_id, cafe_id, customer_name, customer_phone, \
             subtotal, tax_amount, tip_amount, total_amount, payment_method, invoice_date"
        } else {
            "id, invoice_number, order_id, NULL::uuid AS cafe_id, customer_name, \
             customer_phone, subtotal, tax_amount, tip_amount, total_amount, \
             payment_method, invoice_date"
        }
    }

    /// A fatura é o snapshot imutável do pedido na finalização; os valores
    /// vêm todos da linha do pedido, nunca recalculados.
    pub async fn create_from_order(
        &self,
        conn: &mut sqlx::PgConnection,
        scope: TenantScope,
        invoice_number: &str,
        order: &Order,
    ) -> Result<Invoice, AppError> {
        let base_cols = "invoice_number, order_id, customer_name, customer_phone, subtotal, \
                         tax_amount, tip_amount, total_amount, payment_method";
        let base_vals = "$1, $2, $3, $4, $5, $6, $7, $8, $9";

        let sql = match scope {
            TenantScope::Tenant(_) => format!(
                "INSERT INTO invoices ({base_cols}, cafe_id) VALUES ({base_vals}, $10) \
                 RETURNING {}",
                self.cols()
            ),
            TenantScope::Legacy => format!(
                "INSERT INTO invoices ({base_cols}) VALUES ({base_vals}) RETURNING {}",
                self.cols()
            ),
        };

        let mut query = sqlx::query_as::<_, Invoice>(&sql)
            .bind(invoice_number)
            .bind(order.id)
            .bind(&order.customer_name)
            .bind(&order.customer_phone)
            .bind(order.total_amount)
            .bind(order.tax_amount)
            .bind(order.tip_amount)
            .bind(order.final_amount)
            .bind(&order.payment_method);

        if let TenantScope::Tenant(cafe_id) = scope {
            query = query.bind(cafe_id);
        }

        query
            .fetch_one(&mut *conn)
            .await
            .map_err(|e| map_unique_violation(e, "Número de fatura já utilizado."))
    }

    pub async fn list(&self, scope: TenantScope) -> Result<Vec<Invoice>, AppError> {
        let rows = match scope {
            TenantScope::Tenant(cafe_id) => {
                let sql = format!(
                    "SELECT {} FROM invoices WHERE cafe_id = $1 ORDER BY invoice_date DESC",
                    self.cols()
                );
                sqlx::query_as::<_, Invoice>(&sql)
                    .bind(cafe_id)
                    .fetch_all(&self.pool)
                    .await?
            }
            TenantScope::Legacy => {
                let sql = format!(
                    "SELECT {} FROM invoices ORDER BY invoice_date DESC",
                    self.cols()
                );
                sqlx::query_as::<_, Invoice>(&sql).fetch_all(&self.pool).await?
            }
        };
        Ok(rows)
    }

    pub async fn find_by_id(
        &self,
        scope: TenantScope,
        id: Uuid,
    ) -> Result<Option<Invoice>, AppError> {
        let row = match scope {
            TenantScope::Tenant(cafe_id) => {
                let sql = format!(
                    "SELECT {} FROM invoices WHERE id = $1 AND cafe_id = $2",
                    self.cols()
                );
                sqlx::query_as::<_, Invoice>(&sql)
                    .bind(id)
                    .bind(cafe_id)
                    .fetch_optional(&self.pool)
                    .await?
            }
            TenantScope::Legacy => {
                let sql = format!("SELECT {} FROM invoices WHERE id = $1", self.cols());
                sqlx::query_as::<_, Invoice>(&sql)
                    .bind(id)
                    .fetch_optional(&self.pool)
                    .await?
            }
        };
        Ok(row)
    }
}
