// src/models/invoices.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

// Documento de cobrança imutável, derivado do pedido na finalização.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    pub id: Uuid,
    pub invoice_number: String,
    pub order_id: Option<Uuid>,
    pub cafe_id: Option<Uuid>,

    pub customer_name: String,
    pub customer_phone: Option<String>,

    pub subtotal: Decimal,
    pub tax_amount: Decimal,
    pub tip_amount: Decimal,
    pub total_amount: Decimal,
    pub payment_method: String,

    pub invoice_date: DateTime<Utc>,
}
