// src/realtime/ws.rs

use axum::{
    extract::{
        Query, State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::Response,
};
use serde::Deserialize;

use uuid::Uuid;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::guards::ensure_cafe_access,
    models::auth::Session,
    realtime::broadcast::OrderEvent,
};

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    // Browsers não mandam Authorization em upgrade de WebSocket; o token
    // vem na query string.
    token: Option<String>,

    // Loja a observar. Só o Super Admin pode nomear uma loja alheia.
    cafe_id: Option<Uuid>,
}

/// GET /ws/orders: o caminho duplex de atualizações ao vivo.
///
/// A sessão é autenticada antes do upgrade; depois, a conexão recebe os
/// eventos de pedido da loja observada: a da sessão, ou a nomeada na query
/// (esta última checada contra a regra de acesso por loja). Super Admin
/// sem loja nomeada observa todas.
pub async fn orders_ws(
    State(app_state): State<AppState>,
    Query(query): Query<WsQuery>,
    ws: WebSocketUpgrade,
) -> Result<Response, AppError> {
    let token = query.token.ok_or(AppError::InvalidToken)?;
    let session = app_state.auth_service.authenticate(&token).await?;

    let observed = match query.cafe_id {
        Some(target) => {
            ensure_cafe_access(&session, target)?;
            Some(target)
        }
        None => session.cafe_id,
    };

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, app_state, session, observed)))
}

// O evento é entregue se for da loja observada; eventos sem loja (modo
// legado) vão para todos, e o Super Admin sem filtro enxerga tudo.
fn should_deliver(session: &Session, observed: Option<Uuid>, event: &OrderEvent) -> bool {
    match (event.cafe_id, observed) {
        (Some(event_cafe), Some(observed_cafe)) => event_cafe == observed_cafe,
        (Some(_), None) => session.is_superadmin(),
        (None, _) => true,
    }
}

async fn handle_socket(
    mut socket: WebSocket,
    app_state: AppState,
    session: Session,
    observed: Option<Uuid>,
) {
    let mut rx = app_state.order_events.subscribe();

    // Saudação de conexão, com a loja observada.
    let hello = OrderEvent::connected(observed);
    if let Ok(text) = serde_json::to_string(&hello) {
        if socket.send(Message::Text(text.into())).await.is_err() {
            return;
        }
    }

    loop {
        tokio::select! {
            event = rx.recv() => {
                match event {
                    Ok(event) => {
                        if !should_deliver(&session, observed, &event) {
                            continue;
                        }
                        let Ok(text) = serde_json::to_string(&event) else {
                            continue;
                        };
                        // Falha de envio remove o assinante: sair do loop
                        // dropa o receiver.
                        if socket.send(Message::Text(text.into())).await.is_err() {
                            break;
                        }
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(
                            "Assinante de pedidos atrasado, {skipped} eventos perdidos"
                        );
                        continue;
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                }
            }
            incoming = socket.recv() => {
                match incoming {
                    // Cliente fechou (ou erro de transporte): encerra.
                    None | Some(Err(_)) => break,
                    Some(Ok(Message::Close(_))) => break,
                    // Pings o axum responde sozinho; o resto é ignorado.
                    Some(Ok(_)) => continue,
                }
            }
        }
    }

    tracing::debug!("Assinante de pedidos desconectado ({})", session.username);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::auth::Role;

    fn session(role: Role, cafe_id: Option<Uuid>) -> Session {
        Session {
            user_id: Uuid::new_v4(),
            username: "ws".into(),
            email: "ws@example.com".into(),
            role,
            cafe_id,
            cafe_slug: None,
            cafe_name: None,
        }
    }

    #[test]
    fn test_same_tenant_receives() {
        let cafe = Uuid::new_v4();
        let s = session(Role::Reception, Some(cafe));
        let event = OrderEvent::order_deleted(Some(cafe), Uuid::new_v4());
        assert!(should_deliver(&s, s.cafe_id, &event));
    }

    #[test]
    fn test_other_tenant_is_filtered() {
        let s = session(Role::Reception, Some(Uuid::new_v4()));
        let event = OrderEvent::order_deleted(Some(Uuid::new_v4()), Uuid::new_v4());
        assert!(!should_deliver(&s, s.cafe_id, &event));
    }

    #[test]
    fn test_superadmin_without_filter_observes_all() {
        let s = session(Role::Superadmin, None);
        let event = OrderEvent::order_deleted(Some(Uuid::new_v4()), Uuid::new_v4());
        assert!(should_deliver(&s, None, &event));
    }

    #[test]
    fn test_superadmin_with_filter_sees_only_that_cafe() {
        let s = session(Role::Superadmin, None);
        let observed = Uuid::new_v4();
        let matching = OrderEvent::order_deleted(Some(observed), Uuid::new_v4());
        let other = OrderEvent::order_deleted(Some(Uuid::new_v4()), Uuid::new_v4());
        assert!(should_deliver(&s, Some(observed), &matching));
        assert!(!should_deliver(&s, Some(observed), &other));
    }

    #[test]
    fn test_legacy_events_reach_everyone() {
        let s = session(Role::Admin, Some(Uuid::new_v4()));
        let event = OrderEvent::order_deleted(None, Uuid::new_v4());
        assert!(should_deliver(&s, s.cafe_id, &event));
    }
}
