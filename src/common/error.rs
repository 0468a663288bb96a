// src/common/error.rs

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

// Nosso tipo de erro central, com `thiserror` para melhor ergonomia.
// Cada variante mapeia para um status HTTP e um `code` que o frontend
// consegue distinguir programaticamente.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("{0}")]
    Validation(String),

    #[error("E-mail ou senha inválidos")]
    InvalidCredentials,

    #[error("Conta desativada")]
    AccountDisabled,

    #[error("Token inválido ou ausente")]
    InvalidToken,

    #[error("Papel sem permissão para esta ação")]
    ForbiddenRole,

    #[error("Acesso negado a dados de outra loja")]
    ForbiddenTenant,

    #[error("Recurso '{0}' não habilitado no plano atual")]
    FeatureDisabled(String),

    #[error("Assinatura inativa")]
    SubscriptionInactive,

    #[error("Onboarding da loja ainda não concluído")]
    OnboardingRequired,

    #[error("Loja não encontrada")]
    TenantNotFound,

    #[error("Pedido não encontrado")]
    OrderNotFound,

    #[error("Usuário não encontrado")]
    UserNotFound,

    #[error("{0} não encontrado")]
    NotFound(&'static str),

    #[error("{0}")]
    Conflict(String),

    #[error("Plano inválido: {0}")]
    InvalidPlan(String),

    #[error("Status de assinatura inválido: {0}")]
    InvalidStatus(String),

    #[error("Nenhuma alteração solicitada")]
    NoChangeRequested,

    #[error("Transição de status inválida: {from} -> {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("Pagamento dividido inválido")]
    InvalidSplitPayment,

    #[error("Pedido sem itens")]
    EmptyOrder,

    // Variante para erros de banco de dados
    #[error("Erro de banco de dados")]
    DatabaseError(#[from] sqlx::Error),

    // Variante genérica para qualquer outro erro inesperado.
    // `anyhow::Error` é ótimo para capturar o contexto do erro.
    #[error("Erro interno do servidor")]
    InternalServerError(#[from] anyhow::Error),

    #[error("Erro de Bcrypt: {0}")]
    BcryptError(#[from] bcrypt::BcryptError),

    #[error("Erro de JWT: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
}

impl AppError {
    // O `code` legível por máquina que vai no envelope de erro.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::ValidationError(_) | AppError::Validation(_) => "validation",
            AppError::InvalidCredentials => "invalid_credentials",
            AppError::AccountDisabled => "account_disabled",
            AppError::InvalidToken => "unauthenticated",
            AppError::ForbiddenRole => "forbidden_role",
            AppError::ForbiddenTenant => "forbidden_tenant",
            AppError::FeatureDisabled(_) => "feature_disabled",
            AppError::SubscriptionInactive => "subscription_inactive",
            AppError::OnboardingRequired => "onboarding_required",
            AppError::TenantNotFound => "tenant_not_found",
            AppError::OrderNotFound => "order_not_found",
            AppError::UserNotFound | AppError::NotFound(_) => "not_found",
            AppError::Conflict(_) => "conflict",
            AppError::InvalidPlan(_) => "invalid_plan",
            AppError::InvalidStatus(_) => "invalid_status",
            AppError::NoChangeRequested => "no_change_requested",
            AppError::InvalidStateTransition { .. } => "invalid_state_transition",
            AppError::InvalidSplitPayment => "invalid_split_payment",
            AppError::EmptyOrder => "empty_order",
            _ => "unexpected",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_)
            | AppError::Validation(_)
            | AppError::Conflict(_)
            | AppError::InvalidPlan(_)
            | AppError::InvalidStatus(_)
            | AppError::NoChangeRequested
            | AppError::InvalidStateTransition { .. }
            | AppError::InvalidSplitPayment
            | AppError::EmptyOrder => StatusCode::BAD_REQUEST,

            AppError::InvalidCredentials | AppError::InvalidToken => StatusCode::UNAUTHORIZED,

            AppError::AccountDisabled
            | AppError::ForbiddenRole
            | AppError::ForbiddenTenant
            | AppError::FeatureDisabled(_)
            | AppError::SubscriptionInactive
            | AppError::OnboardingRequired => StatusCode::FORBIDDEN,

            AppError::TenantNotFound
            | AppError::OrderNotFound
            | AppError::UserNotFound
            | AppError::NotFound(_) => StatusCode::NOT_FOUND,

            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Validação retorna todos os detalhes por campo.
        if let AppError::ValidationError(errors) = &self {
            let mut details = std::collections::HashMap::new();
            for (field, field_errors) in errors.field_errors() {
                let messages: Vec<String> = field_errors
                    .iter()
                    .filter_map(|e| e.message.as_ref().map(|m| m.to_string()))
                    .collect();
                details.insert(field.to_string(), messages);
            }
            let body = Json(json!({
                "error": "Um ou mais campos são inválidos.",
                "code": "validation",
                "details": details,
            }));
            return (StatusCode::BAD_REQUEST, body).into_response();
        }

        let status = self.status();

        // Erros internos não vazam detalhes do driver; o `tracing` guarda
        // a mensagem completa do lado do servidor.
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("Erro interno do servidor: {self:?}");
            "Ocorreu um erro inesperado.".to_string()
        } else {
            self.to_string()
        };

        let body = Json(json!({ "error": message, "code": self.code() }));
        (status, body).into_response()
    }
}

// Traduz violações de integridade do Postgres na fronteira do repositório,
// para que rotas devolvam `conflict` em vez de um 500 opaco.
pub fn map_unique_violation(err: sqlx::Error, message: &str) -> AppError {
    if let sqlx::Error::Database(ref db_err) = err {
        if db_err.code().as_deref() == Some("23505") {
            return AppError::Conflict(message.to_string());
        }
    }
    AppError::DatabaseError(err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_match_taxonomy() {
        assert_eq!(AppError::InvalidToken.code(), "unauthenticated");
        assert_eq!(
            AppError::FeatureDisabled("inventory".into()).code(),
            "feature_disabled"
        );
        assert_eq!(AppError::ForbiddenTenant.code(), "forbidden_tenant");
        assert_eq!(AppError::EmptyOrder.code(), "empty_order");
        assert_eq!(AppError::Conflict("slug".into()).code(), "conflict");
    }

    #[test]
    fn test_conflict_is_flat_400() {
        // Decisão de design: conflitos de unicidade voltam como 400.
        assert_eq!(
            AppError::Conflict("slug duplicado".into()).status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_authorization_failures_are_403() {
        assert_eq!(
            AppError::SubscriptionInactive.status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(AppError::OnboardingRequired.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            AppError::FeatureDisabled("reports".into()).status(),
            StatusCode::FORBIDDEN
        );
    }
}
