// src/services/orders.rs

use rust_decimal::{Decimal, prelude::ToPrimitive};
use sqlx::PgPool;
use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::{SystemTime, UNIX_EPOCH},
};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{
        CustomerRepository, InvoiceRepository, OrderRepository, SettingsRepository,
        order_repo::NewOrder, scope::TenantScope,
    },
    models::{
        auth::{Role, Session},
        customers::CreateCustomerPayload,
        orders::{CreateOrderPayload, Order, OrderStatus, OrderWithItems, UpdateOrderStatusPayload},
        settings::TaxSetting,
    },
    realtime::broadcast::{OrderBroadcast, OrderEvent},
    services::metrics::MetricsService,
};

// ---
// Numeração de pedidos
// ---
// Número único e monotônico por processo, derivado do relógio de alta
// resolução. Dois pedidos no mesmo microssegundo recebem números
// consecutivos; nunca repetidos.
pub struct OrderNumberGen {
    last: AtomicU64,
}

impl OrderNumberGen {
    pub fn new() -> Self {
        Self { last: AtomicU64::new(0) }
    }

    pub fn next(&self) -> String {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_micros() as u64)
            .unwrap_or(0);

        let mut prev = self.last.load(Ordering::Relaxed);
        loop {
            let candidate = now.max(prev + 1);
            match self
                .last
                .compare_exchange(prev, candidate, Ordering::SeqCst, Ordering::Relaxed)
            {
                Ok(_) => return format!("ORD-{candidate}"),
                Err(actual) => prev = actual,
            }
        }
    }
}

impl Default for OrderNumberGen {
    fn default() -> Self {
        Self::new()
    }
}

// ---
// A aritmética do pedido, como funções puras
// ---

pub fn compute_subtotal(payload: &CreateOrderPayload) -> Decimal {
    payload
        .items
        .iter()
        .map(|line| line.unit_price * Decimal::from(line.quantity))
        .sum()
}

/// Imposto zero quando a loja não inclui imposto; senão
/// `round(subtotal * alíquota / 100, 2)`.
pub fn compute_tax(subtotal: Decimal, tax: &TaxSetting) -> Decimal {
    if !tax.include_tax {
        return Decimal::ZERO;
    }
    (subtotal * tax.tax_rate / Decimal::from(100)).round_dp(2)
}

/// Câmbio fixo do resgate: 1 ponto = 0.1 unidade da moeda da loja.
pub fn points_discount(points_redeemed: i32) -> Decimal {
    Decimal::from(points_redeemed) / Decimal::from(10)
}

pub fn compute_final_amount(
    subtotal: Decimal,
    tax: Decimal,
    tip: Decimal,
    discount: Decimal,
    extra_charge: Decimal,
) -> Decimal {
    subtotal + tax + tip - discount + extra_charge
}

/// Pontos ganhos na conclusão: `floor(valor final / 10)`.
pub fn points_earned(final_amount: Decimal) -> i32 {
    (final_amount / Decimal::from(10))
        .floor()
        .to_i32()
        .unwrap_or(0)
}

/// Pagamento dividido: exclusivo do papel admin, com valor estritamente
/// positivo e estritamente menor que o total.
pub fn validate_split_payment(
    role: Role,
    split_method: Option<&str>,
    split_amount: Option<Decimal>,
    final_amount: Decimal,
) -> Result<(), AppError> {
    match (split_method, split_amount) {
        (None, None) => Ok(()),
        (Some(_), Some(amount)) => {
            if role != Role::Admin {
                return Err(AppError::InvalidSplitPayment);
            }
            if amount <= Decimal::ZERO || amount >= final_amount {
                return Err(AppError::InvalidSplitPayment);
            }
            Ok(())
        }
        // Método sem valor (ou vice-versa) é malformado.
        _ => Err(AppError::InvalidSplitPayment),
    }
}

// ---
// O serviço
// ---

#[derive(Clone)]
pub struct OrderService {
    pool: PgPool,
    order_repo: OrderRepository,
    customer_repo: CustomerRepository,
    invoice_repo: InvoiceRepository,
    settings_repo: SettingsRepository,
    metrics: MetricsService,
    broadcast: OrderBroadcast,
    numbers: Arc<OrderNumberGen>,
}

impl OrderService {
    pub fn new(
        pool: PgPool,
        order_repo: OrderRepository,
        customer_repo: CustomerRepository,
        invoice_repo: InvoiceRepository,
        settings_repo: SettingsRepository,
        metrics: MetricsService,
        broadcast: OrderBroadcast,
    ) -> Self {
        Self {
            pool,
            order_repo,
            customer_repo,
            invoice_repo,
            settings_repo,
            metrics,
            broadcast,
            numbers: Arc::new(OrderNumberGen::new()),
        }
    }

    /// Criação do pedido: totais, cliente, numeração, persistência atômica,
    /// débito imediato de pontos, evento ao vivo e agregado do dia.
    ///
    /// `attribution_cafe` é a loja dona do pedido para fins de imposto e
    /// métricas; a da sessão, ou a loja `default` em modo legado.
    pub async fn create_order(
        &self,
        scope: TenantScope,
        attribution_cafe: Option<Uuid>,
        session: &Session,
        payload: &CreateOrderPayload,
    ) -> Result<OrderWithItems, AppError> {
        if payload.items.is_empty() {
            return Err(AppError::EmptyOrder);
        }

        let subtotal = compute_subtotal(payload);

        let tax_amount = match attribution_cafe {
            Some(cafe_id) => {
                let tax = self.settings_repo.get_tax_setting(cafe_id).await?;
                compute_tax(subtotal, &tax)
            }
            None => Decimal::ZERO,
        };

        let discount = points_discount(payload.points_redeemed);
        let final_amount = compute_final_amount(
            subtotal,
            tax_amount,
            payload.tip_amount,
            discount,
            payload.extra_charge,
        );

        validate_split_payment(
            session.role,
            payload.split_payment_method.as_deref(),
            payload.split_amount,
            final_amount,
        )?;

        let customer_name = payload
            .customer_name
            .clone()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| "Walk-in Customer".to_string());

        // --- INÍCIO DA TRANSAÇÃO ---
        let mut tx = self.pool.begin().await?;

        // Resolve (ou cria) o cliente pelo telefone, dentro da transação.
        let mut new_customer = false;
        let customer = match payload.customer_phone.as_deref().filter(|p| !p.is_empty()) {
            Some(phone) => {
                match self.customer_repo.find_by_phone(&mut *tx, scope, phone).await? {
                    Some(existing) => Some(existing),
                    None => {
                        new_customer = true;
                        Some(
                            self.customer_repo
                                .create(
                                    &mut *tx,
                                    scope,
                                    &CreateCustomerPayload {
                                        name: customer_name.clone(),
                                        phone: Some(phone.to_string()),
                                        email: None,
                                    },
                                    "order",
                                )
                                .await?,
                        )
                    }
                }
            }
            None => None,
        };

        if payload.points_redeemed > 0 {
            let Some(ref customer) = customer else {
                return Err(AppError::Validation(
                    "Resgate de pontos exige cliente identificado por telefone.".to_string(),
                ));
            };
            // Débito imediato; o resgate não é devolvido em cancelamento.
            self.customer_repo
                .deduct_points(&mut *tx, customer.id, payload.points_redeemed)
                .await?;
        }

        let order_number = self.numbers.next();
        let new_order = NewOrder {
            order_number: &order_number,
            customer_id: customer.as_ref().map(|c| c.id),
            customer_name: &customer_name,
            customer_phone: payload.customer_phone.as_deref(),
            total_amount: subtotal,
            tax_amount,
            tip_amount: payload.tip_amount,
            points_redeemed: payload.points_redeemed,
            final_amount,
            payment_method: &payload.payment_method,
            split_payment_method: payload.split_payment_method.as_deref(),
            split_amount: payload.split_amount,
            extra_charge: payload.extra_charge,
            notes: payload.notes.as_deref(),
        };

        let order = self.order_repo.insert_order(&mut *tx, scope, &new_order).await?;
        let items = self
            .order_repo
            .insert_items(&mut *tx, order.id, &payload.items)
            .await?;

        tx.commit().await?;
        // --- FIM DA TRANSAÇÃO ---

        let result = OrderWithItems { order, items };

        if let Some(cafe_id) = attribution_cafe {
            self.metrics.order_created(cafe_id, final_amount, false).await;
            if new_customer {
                self.metrics.customer_created(cafe_id, true).await;
            }
        }

        if let Ok(json) = serde_json::to_value(&result) {
            self.broadcast
                .publish(OrderEvent::order_created(attribution_cafe, json));
        }

        Ok(result)
    }

    /// Transição de status com o crédito único de fidelidade na primeira
    /// chegada a `completed` e a emissão da fatura imutável.
    pub async fn update_status(
        &self,
        scope: TenantScope,
        attribution_cafe: Option<Uuid>,
        order_id: Uuid,
        payload: &UpdateOrderStatusPayload,
    ) -> Result<OrderWithItems, AppError> {
        let order = self
            .order_repo
            .find_by_id(scope, order_id)
            .await?
            .ok_or(AppError::OrderNotFound)?;

        if !order.status.can_transition_to(payload.status) {
            return Err(AppError::InvalidStateTransition {
                from: order.status.as_str().to_string(),
                to: payload.status.as_str().to_string(),
            });
        }

        let mut tx = self.pool.begin().await?;

        let mut updated = self
            .order_repo
            .update_status(&mut *tx, order_id, payload.status)
            .await?;

        let entering_completed = payload.status == OrderStatus::Completed;

        if entering_completed {
            // O crédito acontece exatamente uma vez: `points_awarded` é a
            // trava. Reentradas em `completed` não creditam de novo.
            if !order.points_awarded {
                if let Some(customer_id) = order.customer_id {
                    let earned = points_earned(order.final_amount);
                    self.customer_repo
                        .apply_completion_credit(
                            &mut *tx,
                            customer_id,
                            earned,
                            order.final_amount,
                        )
                        .await?;
                    self.order_repo.mark_points_awarded(&mut *tx, order_id).await?;
                    updated.points_awarded = true;
                }
            }

            // A fatura nasce na finalização, na mesma transação do pedido.
            let invoice_number = order_number_to_invoice(&updated.order_number);
            self.invoice_repo
                .create_from_order(&mut *tx, scope, &invoice_number, &updated)
                .await?;
        }

        tx.commit().await?;

        if let Some(cafe_id) = attribution_cafe {
            if entering_completed {
                self.metrics
                    .order_completion_changed(
                        cafe_id,
                        updated.created_at.date_naive(),
                        updated.final_amount,
                        true,
                    )
                    .await;
            } else if payload.status == OrderStatus::Cancelled {
                self.metrics
                    .order_cancelled(
                        cafe_id,
                        updated.created_at.date_naive(),
                        updated.final_amount,
                    )
                    .await;
            }
        }

        let items = self.order_repo.items_for(order_id).await?;
        let result = OrderWithItems { order: updated, items };

        if let Ok(json) = serde_json::to_value(&result) {
            self.broadcast
                .publish(OrderEvent::order_updated(attribution_cafe, json));
        }

        Ok(result)
    }

    pub async fn get_order(&self, scope: TenantScope, id: Uuid) -> Result<OrderWithItems, AppError> {
        let order = self
            .order_repo
            .find_by_id(scope, id)
            .await?
            .ok_or(AppError::OrderNotFound)?;
        let items = self.order_repo.items_for(id).await?;
        Ok(OrderWithItems { order, items })
    }

    pub async fn list_orders(
        &self,
        scope: TenantScope,
        status: Option<&str>,
        customer_phone: Option<&str>,
    ) -> Result<Vec<Order>, AppError> {
        self.order_repo.list(scope, status, customer_phone).await
    }

    pub async fn delete_order(
        &self,
        scope: TenantScope,
        attribution_cafe: Option<Uuid>,
        id: Uuid,
    ) -> Result<(), AppError> {
        let deleted = self.order_repo.delete(scope, id).await?;

        if let Some(cafe_id) = attribution_cafe {
            self.metrics
                .order_deleted(
                    cafe_id,
                    deleted.created_at.date_naive(),
                    deleted.final_amount,
                    deleted.status == OrderStatus::Completed,
                )
                .await;
        }

        self.broadcast
            .publish(OrderEvent::order_deleted(attribution_cafe, deleted.id));

        Ok(())
    }
}

fn order_number_to_invoice(order_number: &str) -> String {
    match order_number.strip_prefix("ORD-") {
        Some(digits) => format!("INV-{digits}"),
        None => format!("INV-{order_number}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::orders::OrderLinePayload;
    use pretty_assertions::assert_eq;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn payload_with(items: Vec<(i32, &str)>) -> CreateOrderPayload {
        CreateOrderPayload {
            items: items
                .into_iter()
                .map(|(q, price)| OrderLinePayload {
                    menu_item_id: None,
                    item_name: "Espresso".into(),
                    quantity: q,
                    unit_price: dec(price),
                })
                .collect(),
            customer_name: Some("Alex".into()),
            customer_phone: Some("+91 1".into()),
            payment_method: "cash".into(),
            tip_amount: Decimal::ZERO,
            extra_charge: Decimal::ZERO,
            points_redeemed: 0,
            split_payment_method: None,
            split_amount: None,
            notes: None,
        }
    }

    fn tax(rate: &str, include: bool) -> TaxSetting {
        TaxSetting {
            cafe_id: Uuid::new_v4(),
            tax_rate: dec(rate),
            tax_name: None,
            include_tax: include,
            updated_at: None,
        }
    }

    #[test]
    fn test_subtotal_sums_lines() {
        let p = payload_with(vec![(1, "120.00"), (2, "50.00")]);
        assert_eq!(compute_subtotal(&p), dec("220.00"));
    }

    #[test]
    fn test_tax_zero_when_not_included() {
        assert_eq!(compute_tax(dec("100.00"), &tax("18", false)), Decimal::ZERO);
    }

    #[test]
    fn test_tax_rounds_to_two_places() {
        // 33.33 * 18% = 5.9994 -> 6.00
        assert_eq!(compute_tax(dec("33.33"), &tax("18", true)), dec("6.00"));
    }

    #[test]
    fn test_points_discount_is_tenth_per_point() {
        assert_eq!(points_discount(10), dec("1.0"));
        assert_eq!(points_discount(0), Decimal::ZERO);
    }

    #[test]
    fn test_final_amount_composition() {
        // 100 + 5 de imposto + 10 de gorjeta - 1 de pontos + 2 de extra
        let total = compute_final_amount(dec("100"), dec("5"), dec("10"), dec("1"), dec("2"));
        assert_eq!(total, dec("116"));
    }

    #[test]
    fn test_points_earned_floors() {
        assert_eq!(points_earned(dec("120.00")), 12);
        assert_eq!(points_earned(dec("99.00")), 9);
        assert_eq!(points_earned(dec("9.99")), 0);
    }

    #[test]
    fn test_split_requires_admin() {
        let err = validate_split_payment(
            Role::Reception,
            Some("card"),
            Some(dec("10")),
            dec("100"),
        );
        assert!(matches!(err, Err(AppError::InvalidSplitPayment)));
    }

    #[test]
    fn test_split_equal_to_total_is_rejected() {
        let err = validate_split_payment(Role::Admin, Some("card"), Some(dec("100")), dec("100"));
        assert!(matches!(err, Err(AppError::InvalidSplitPayment)));
    }

    #[test]
    fn test_split_within_bounds_passes() {
        assert!(
            validate_split_payment(Role::Admin, Some("card"), Some(dec("40")), dec("100")).is_ok()
        );
    }

    #[test]
    fn test_split_zero_is_rejected() {
        let err = validate_split_payment(Role::Admin, Some("card"), Some(dec("0")), dec("100"));
        assert!(matches!(err, Err(AppError::InvalidSplitPayment)));
    }

    #[test]
    fn test_split_method_without_amount_is_rejected() {
        let err = validate_split_payment(Role::Admin, Some("card"), None, dec("100"));
        assert!(matches!(err, Err(AppError::InvalidSplitPayment)));
    }

    #[test]
    fn test_order_numbers_are_monotonic_and_unique() {
        let generator = OrderNumberGen::new();
        let mut previous = 0u64;
        for _ in 0..1000 {
            let number = generator.next();
            let value: u64 = number.strip_prefix("ORD-").unwrap().parse().unwrap();
            assert!(value > previous, "numeração regrediu: {value} <= {previous}");
            previous = value;
        }
    }

    #[test]
    fn test_invoice_number_mirrors_order_number() {
        assert_eq!(order_number_to_invoice("ORD-123"), "INV-123");
    }
}
