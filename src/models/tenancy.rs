// src/models/tenancy.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

// ---
// 1. Plano de assinatura
// ---
// PRO é um superconjunto de FREE nos defaults de features (invariante de seed).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum SubscriptionPlan {
    #[serde(rename = "FREE")]
    Free,
    #[serde(rename = "PRO")]
    Pro,
}

impl SubscriptionPlan {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionPlan::Free => "FREE",
            SubscriptionPlan::Pro => "PRO",
        }
    }

    /// Normaliza a entrada do cliente ("pro", "Pro", "PRO") antes de validar.
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_uppercase().as_str() {
            "FREE" => Some(SubscriptionPlan::Free),
            "PRO" => Some(SubscriptionPlan::Pro),
            _ => None,
        }
    }
}

impl TryFrom<String> for SubscriptionPlan {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        SubscriptionPlan::parse(&value).ok_or_else(|| format!("plano desconhecido: {value}"))
    }
}

// ---
// 2. Status da assinatura
// ---
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    Active,
    Inactive,
    Expired,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::Inactive => "inactive",
            SubscriptionStatus::Expired => "expired",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "active" => Some(SubscriptionStatus::Active),
            "inactive" => Some(SubscriptionStatus::Inactive),
            "expired" => Some(SubscriptionStatus::Expired),
            _ => None,
        }
    }
}

impl TryFrom<String> for SubscriptionStatus {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        SubscriptionStatus::parse(&value).ok_or_else(|| format!("status desconhecido: {value}"))
    }
}

// ---
// 3. Cafe (O "Tenant")
// ---
// A fronteira de isolamento de todos os dados de domínio.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Cafe {
    pub id: Uuid,
    pub slug: String,
    pub name: String,
    pub is_active: bool,

    #[sqlx(try_from = "String")]
    pub subscription_plan: SubscriptionPlan,

    #[sqlx(try_from = "String")]
    pub subscription_status: SubscriptionStatus,

    pub is_onboarded: bool,
    pub onboarding_data: Option<serde_json::Value>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Slug minúsculo, só [a-z0-9-]. Uma letra maiúscula é rejeitada na validação.
pub fn validate_slug(slug: &str) -> Result<(), ValidationError> {
    let ok = !slug.is_empty()
        && slug
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
    if !ok {
        let mut err = ValidationError::new("slug");
        err.message = Some("O slug deve conter apenas letras minúsculas, dígitos e hífens.".into());
        return Err(err);
    }
    Ok(())
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateCafePayload {
    #[validate(custom(function = "validate_slug"))]
    pub slug: String,

    #[validate(length(min = 1, message = "O nome é obrigatório."))]
    pub name: String,

    pub subscription_plan: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCafePayload {
    #[validate(length(min = 1, message = "O nome não pode ser vazio."))]
    pub name: Option<String>,
    pub is_active: Option<bool>,
}

// ---
// 4. Onboarding
// ---
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OnboardingStatus {
    pub is_onboarded: bool,
    pub onboarding_data: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnboardingStepPayload {
    // Mapa livre; o serviço mescla com o progresso já salvo.
    pub data: serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_parse_normalizes_case() {
        assert_eq!(SubscriptionPlan::parse("pro"), Some(SubscriptionPlan::Pro));
        assert_eq!(SubscriptionPlan::parse("Free"), Some(SubscriptionPlan::Free));
        assert_eq!(SubscriptionPlan::parse("gold"), None);
    }

    #[test]
    fn test_slug_rejects_uppercase() {
        assert!(validate_slug("sunrise").is_ok());
        assert!(validate_slug("cafe-do-centro-2").is_ok());
        assert!(validate_slug("Sunrise").is_err());
        assert!(validate_slug("").is_err());
        assert!(validate_slug("com espaço").is_err());
    }

    #[test]
    fn test_status_parse_is_exact() {
        assert_eq!(
            SubscriptionStatus::parse("active"),
            Some(SubscriptionStatus::Active)
        );
        // Diferente do plano, o status não é normalizado.
        assert_eq!(SubscriptionStatus::parse("Active"), None);
    }
}
