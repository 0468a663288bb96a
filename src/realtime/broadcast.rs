// src/realtime/broadcast.rs

use chrono::Utc;
use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

// ---
// O canal de eventos de pedidos ao vivo
// ---
// Um canal broadcast multi-produtor/multi-consumidor: os pontos de
// publicação (criação, mudança de status, remoção de pedido) enviam e cada
// conexão WebSocket assina sua própria cópia. Entrega best-effort,
// at-most-once; um assinante lento perde eventos (lag) em vez de travar os
// demais. A ordem é FIFO por assinante, sem garantia entre assinantes.

const CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderEventKind {
    Connected,
    OrderCreated,
    OrderUpdated,
    OrderDeleted,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderEvent {
    #[serde(rename = "type")]
    pub kind: OrderEventKind,

    // Todo evento carrega a loja de origem: o handler do WebSocket filtra
    // por tenant antes de entregar.
    pub cafe_id: Option<Uuid>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<serde_json::Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<Uuid>,

    pub timestamp: String,
}

impl OrderEvent {
    fn new(kind: OrderEventKind, cafe_id: Option<Uuid>) -> Self {
        Self {
            kind,
            cafe_id,
            order: None,
            order_id: None,
            timestamp: Utc::now().to_rfc3339(),
        }
    }

    pub fn connected(cafe_id: Option<Uuid>) -> Self {
        Self::new(OrderEventKind::Connected, cafe_id)
    }

    pub fn order_created(cafe_id: Option<Uuid>, order: serde_json::Value) -> Self {
        Self {
            order: Some(order),
            ..Self::new(OrderEventKind::OrderCreated, cafe_id)
        }
    }

    pub fn order_updated(cafe_id: Option<Uuid>, order: serde_json::Value) -> Self {
        Self {
            order: Some(order),
            ..Self::new(OrderEventKind::OrderUpdated, cafe_id)
        }
    }

    pub fn order_deleted(cafe_id: Option<Uuid>, order_id: Uuid) -> Self {
        Self {
            order_id: Some(order_id),
            ..Self::new(OrderEventKind::OrderDeleted, cafe_id)
        }
    }
}

#[derive(Clone)]
pub struct OrderBroadcast {
    tx: broadcast::Sender<OrderEvent>,
}

impl OrderBroadcast {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    /// Publica para todos os assinantes conectados. Devolve quantos
    /// receberam; zero assinantes não é erro.
    pub fn publish(&self, event: OrderEvent) -> usize {
        match self.tx.send(event) {
            Ok(subscriber_count) => {
                tracing::debug!("Evento de pedido entregue a {subscriber_count} assinantes");
                subscriber_count
            }
            Err(_) => 0,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<OrderEvent> {
        self.tx.subscribe()
    }
}

impl Default for OrderBroadcast {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_without_subscribers_is_ok() {
        let broadcast = OrderBroadcast::new();
        let count = broadcast.publish(OrderEvent::connected(None));
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_fan_out_to_all_subscribers() {
        let broadcast = OrderBroadcast::new();
        let mut rx1 = broadcast.subscribe();
        let mut rx2 = broadcast.subscribe();

        let cafe = Uuid::new_v4();
        let count = broadcast.publish(OrderEvent::order_deleted(Some(cafe), Uuid::new_v4()));
        assert_eq!(count, 2);

        let e1 = rx1.recv().await.unwrap();
        let e2 = rx2.recv().await.unwrap();
        assert_eq!(e1.kind, OrderEventKind::OrderDeleted);
        assert_eq!(e2.cafe_id, Some(cafe));
    }

    #[tokio::test]
    async fn test_per_subscriber_order_is_publish_order() {
        let broadcast = OrderBroadcast::new();
        let mut rx = broadcast.subscribe();

        let id1 = Uuid::new_v4();
        let id2 = Uuid::new_v4();
        broadcast.publish(OrderEvent::order_deleted(None, id1));
        broadcast.publish(OrderEvent::order_deleted(None, id2));

        assert_eq!(rx.recv().await.unwrap().order_id, Some(id1));
        assert_eq!(rx.recv().await.unwrap().order_id, Some(id2));
    }

    #[test]
    fn test_event_wire_format() {
        let event = OrderEvent::order_created(None, serde_json::json!({"orderNumber": "ORD-1"}));
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "order_created");
        assert!(json["timestamp"].is_string());
        assert!(json.get("orderId").is_none());
    }
}
