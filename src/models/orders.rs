// src/models/orders.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

// ---
// 1. O ciclo de vida do pedido
// ---
// pending -> preparing -> ready -> completed, com cancelamento possível a
// partir de qualquer estado não terminal. `completed` e `cancelled` são
// terminais: não se sai deles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Preparing,
    Ready,
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Preparing => "preparing",
            OrderStatus::Ready => "ready",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Cancelled)
    }

    /// Avanço monotônico; cancelamento alcançável de qualquer estado vivo.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        match next {
            OrderStatus::Cancelled => true,
            OrderStatus::Preparing => *self == OrderStatus::Pending,
            OrderStatus::Ready => *self == OrderStatus::Preparing,
            OrderStatus::Completed => *self == OrderStatus::Ready,
            OrderStatus::Pending => false,
        }
    }
}

impl TryFrom<String> for OrderStatus {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "pending" => Ok(OrderStatus::Pending),
            "preparing" => Ok(OrderStatus::Preparing),
            "ready" => Ok(OrderStatus::Ready),
            "completed" => Ok(OrderStatus::Completed),
            "cancelled" => Ok(OrderStatus::Cancelled),
            other => Err(format!("status de pedido desconhecido: {other}")),
        }
    }
}

// ---
// 2. Order
// ---
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: Uuid,
    pub cafe_id: Option<Uuid>,
    pub order_number: String,
    pub customer_id: Option<Uuid>,

    // Snapshot do contato no momento da venda; o cadastro pode mudar depois.
    pub customer_name: String,
    pub customer_phone: Option<String>,

    pub total_amount: Decimal,
    pub tax_amount: Decimal,
    pub tip_amount: Decimal,
    pub points_redeemed: i32,
    pub points_awarded: bool,
    pub final_amount: Decimal,

    #[sqlx(try_from = "String")]
    pub status: OrderStatus,

    pub payment_method: String,
    pub split_payment_method: Option<String>,
    pub split_amount: Option<Decimal>,
    pub extra_charge: Decimal,
    pub notes: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Itens são imutáveis depois de criados; nome e preço ficam denormalizados
// para que o histórico sobreviva a mudanças no cardápio.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub menu_item_id: Option<Uuid>,
    pub item_name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub total_price: Decimal,
}

// Pedido completo devolvido ao cliente
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderWithItems {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
}

// ---
// 3. Payloads
// ---
fn validate_quantity(q: i32) -> Result<(), ValidationError> {
    if q < 1 {
        let mut err = ValidationError::new("range");
        err.message = Some("A quantidade mínima é 1.".into());
        return Err(err);
    }
    Ok(())
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderLinePayload {
    pub menu_item_id: Option<Uuid>,

    #[validate(length(min = 1, message = "O nome do item é obrigatório."))]
    pub item_name: String,

    #[validate(custom(function = "validate_quantity"))]
    pub quantity: i32,

    pub unit_price: Decimal,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderPayload {
    #[validate(nested)]
    pub items: Vec<OrderLinePayload>,

    // "Walk-in Customer" quando o caixa não identifica o cliente.
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,

    #[validate(length(min = 1, message = "A forma de pagamento é obrigatória."))]
    pub payment_method: String,

    #[serde(default)]
    pub tip_amount: Decimal,

    #[serde(default)]
    pub extra_charge: Decimal,

    #[serde(default)]
    pub points_redeemed: i32,

    pub split_payment_method: Option<String>,
    pub split_amount: Option<Decimal>,

    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOrderStatusPayload {
    pub status: OrderStatus,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderListQuery {
    pub status: Option<String>,
    pub customer_phone: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path_advances_monotonically() {
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Preparing));
        assert!(OrderStatus::Preparing.can_transition_to(OrderStatus::Ready));
        assert!(OrderStatus::Ready.can_transition_to(OrderStatus::Completed));
    }

    #[test]
    fn test_no_skipping_and_no_regression() {
        assert!(!OrderStatus::Pending.can_transition_to(OrderStatus::Ready));
        assert!(!OrderStatus::Pending.can_transition_to(OrderStatus::Completed));
        assert!(!OrderStatus::Ready.can_transition_to(OrderStatus::Preparing));
        assert!(!OrderStatus::Preparing.can_transition_to(OrderStatus::Pending));
    }

    #[test]
    fn test_cancel_reachable_from_any_live_state() {
        for s in [
            OrderStatus::Pending,
            OrderStatus::Preparing,
            OrderStatus::Ready,
        ] {
            assert!(s.can_transition_to(OrderStatus::Cancelled));
        }
    }

    #[test]
    fn test_terminal_states_are_locked() {
        for s in [OrderStatus::Completed, OrderStatus::Cancelled] {
            for next in [
                OrderStatus::Pending,
                OrderStatus::Preparing,
                OrderStatus::Ready,
                OrderStatus::Completed,
                OrderStatus::Cancelled,
            ] {
                assert!(!s.can_transition_to(next), "{s:?} -> {next:?} deveria falhar");
            }
        }
    }
}
