// src/models/features.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::collections::BTreeMap;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::tenancy::{SubscriptionPlan, SubscriptionStatus};

// ---
// 1. Feature (global, raramente alterada)
// ---
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Feature {
    pub key: String,
    pub name: String,
    pub description: Option<String>,
    pub default_free: bool,
    pub default_pro: bool,
}

impl Feature {
    pub fn default_for(&self, plan: SubscriptionPlan) -> bool {
        match plan {
            SubscriptionPlan::Free => self.default_free,
            SubscriptionPlan::Pro => self.default_pro,
        }
    }
}

// ---
// 2. Override por loja (vence o default do plano)
// ---
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct FeatureOverride {
    pub cafe_id: Uuid,
    pub feature_key: String,
    pub enabled: bool,
}

// O mapa efetivo devolvido ao cliente como fonte única de verdade.
pub type FeatureMap = BTreeMap<String, bool>;

// ---
// 3. Auditoria (append-only)
// ---
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuditAction {
    #[serde(rename = "PLAN_CHANGED")]
    PlanChanged,
    #[serde(rename = "FEATURE_ENABLED")]
    FeatureEnabled,
    #[serde(rename = "FEATURE_DISABLED")]
    FeatureDisabled,
    #[serde(rename = "CAFE_ACTIVATED")]
    CafeActivated,
    #[serde(rename = "CAFE_DEACTIVATED")]
    CafeDeactivated,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::PlanChanged => "PLAN_CHANGED",
            AuditAction::FeatureEnabled => "FEATURE_ENABLED",
            AuditAction::FeatureDisabled => "FEATURE_DISABLED",
            AuditAction::CafeActivated => "CAFE_ACTIVATED",
            AuditAction::CafeDeactivated => "CAFE_DEACTIVATED",
        }
    }
}

impl TryFrom<String> for AuditAction {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "PLAN_CHANGED" => Ok(AuditAction::PlanChanged),
            "FEATURE_ENABLED" => Ok(AuditAction::FeatureEnabled),
            "FEATURE_DISABLED" => Ok(AuditAction::FeatureDisabled),
            "CAFE_ACTIVATED" => Ok(AuditAction::CafeActivated),
            "CAFE_DEACTIVATED" => Ok(AuditAction::CafeDeactivated),
            other => Err(format!("ação de auditoria desconhecida: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    pub id: Uuid,
    pub cafe_id: Uuid,

    #[sqlx(try_from = "String")]
    pub action_type: AuditAction,

    pub previous_value: Option<String>,
    pub new_value: Option<String>,
    pub changed_by: Uuid,
    pub created_at: DateTime<Utc>,
}

// ---
// 4. Visão de assinatura devolvida ao cliente
// ---
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionView {
    pub plan: SubscriptionPlan,
    pub status: SubscriptionStatus,
    pub features: FeatureMap,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSubscriptionPayload {
    pub plan: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ToggleFeaturePayload {
    pub enabled: bool,
}
