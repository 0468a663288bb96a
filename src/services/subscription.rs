// src/services/subscription.rs

use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{AuditRepository, TenantRepository},
    models::{
        features::{AuditAction, SubscriptionView, UpdateSubscriptionPayload},
        tenancy::{Cafe, SubscriptionPlan, SubscriptionStatus},
    },
    services::features::FeatureService,
};

#[derive(Clone)]
pub struct SubscriptionService {
    tenant_repo: TenantRepository,
    audit_repo: AuditRepository,
    feature_service: FeatureService,
}

impl SubscriptionService {
    pub fn new(
        tenant_repo: TenantRepository,
        audit_repo: AuditRepository,
        feature_service: FeatureService,
    ) -> Self {
        Self {
            tenant_repo,
            audit_repo,
            feature_service,
        }
    }

    // A auditoria é best-effort por contrato: a mutação nunca depende do
    // sucesso do append. Falha é logada e engolida aqui.
    async fn audit(
        &self,
        cafe_id: Uuid,
        action: AuditAction,
        previous: Option<&str>,
        new: Option<&str>,
        changed_by: Uuid,
    ) {
        if let Err(e) = self
            .audit_repo
            .append(cafe_id, action, previous, new, changed_by)
            .await
        {
            tracing::warn!(
                "Falha ao gravar auditoria {action:?} para a loja {cafe_id}: {e}"
            );
        }
    }

    pub async fn get(&self, cafe_id: Uuid) -> Result<SubscriptionView, AppError> {
        let cafe = self
            .tenant_repo
            .find_by_id(cafe_id)
            .await?
            .ok_or(AppError::TenantNotFound)?;

        let features = self.feature_service.resolve(cafe_id).await?;

        Ok(SubscriptionView {
            plan: cafe.subscription_plan,
            status: cafe.subscription_status,
            features,
        })
    }

    /// Atualiza plano e/ou status, gravando uma entrada de auditoria para
    /// cada campo que efetivamente mudou.
    pub async fn update(
        &self,
        cafe_id: Uuid,
        payload: &UpdateSubscriptionPayload,
        actor: Uuid,
    ) -> Result<Cafe, AppError> {
        if payload.plan.is_none() && payload.status.is_none() {
            return Err(AppError::NoChangeRequested);
        }

        let current = self
            .tenant_repo
            .find_by_id(cafe_id)
            .await?
            .ok_or(AppError::TenantNotFound)?;

        // O plano é normalizado para maiúsculas antes da validação.
        let new_plan = match &payload.plan {
            Some(raw) => SubscriptionPlan::parse(raw)
                .ok_or_else(|| AppError::InvalidPlan(raw.clone()))?,
            None => current.subscription_plan,
        };
        let new_status = match &payload.status {
            Some(raw) => SubscriptionStatus::parse(raw)
                .ok_or_else(|| AppError::InvalidStatus(raw.clone()))?,
            None => current.subscription_status,
        };

        let updated = self
            .tenant_repo
            .update_subscription(cafe_id, new_plan, new_status)
            .await?;

        if new_plan != current.subscription_plan {
            self.audit(
                cafe_id,
                AuditAction::PlanChanged,
                Some(current.subscription_plan.as_str()),
                Some(new_plan.as_str()),
                actor,
            )
            .await;
        }

        if new_status != current.subscription_status {
            let action = if new_status == SubscriptionStatus::Active {
                AuditAction::CafeActivated
            } else {
                AuditAction::CafeDeactivated
            };
            self.audit(
                cafe_id,
                action,
                Some(current.subscription_status.as_str()),
                Some(new_status.as_str()),
                actor,
            )
            .await;
        }

        Ok(updated)
    }

    /// Liga ou desliga uma feature para a loja via override.
    pub async fn toggle_feature(
        &self,
        cafe_id: Uuid,
        key: &str,
        enabled: bool,
        actor: Uuid,
    ) -> Result<(), AppError> {
        self.tenant_repo
            .find_by_id(cafe_id)
            .await?
            .ok_or(AppError::TenantNotFound)?;

        let previous = self.feature_service.has(cafe_id, key).await?;
        self.feature_service.set_override(cafe_id, key, enabled).await?;

        let action = if enabled {
            AuditAction::FeatureEnabled
        } else {
            AuditAction::FeatureDisabled
        };
        self.audit(
            cafe_id,
            action,
            Some(&format!("{key}={previous}")),
            Some(&format!("{key}={enabled}")),
            actor,
        )
        .await;

        Ok(())
    }

    /// Remove o override; a loja volta ao default do plano.
    pub async fn remove_feature_override(
        &self,
        cafe_id: Uuid,
        key: &str,
        actor: Uuid,
    ) -> Result<(), AppError> {
        self.tenant_repo
            .find_by_id(cafe_id)
            .await?
            .ok_or(AppError::TenantNotFound)?;

        let previous = self.feature_service.has(cafe_id, key).await?;
        self.feature_service.clear_override(cafe_id, key).await?;

        self.audit(
            cafe_id,
            AuditAction::FeatureDisabled,
            Some(&format!("{key}={previous}")),
            Some("reverted to plan default"),
            actor,
        )
        .await;

        Ok(())
    }

    pub async fn list_audit_for_cafe(
        &self,
        cafe_id: Uuid,
        limit: i64,
    ) -> Result<Vec<crate::models::features::AuditEntry>, AppError> {
        self.audit_repo.list_for_cafe(cafe_id, limit).await
    }

    pub async fn list_audit_all(
        &self,
        limit: i64,
    ) -> Result<Vec<crate::models::features::AuditEntry>, AppError> {
        self.audit_repo.list_all(limit).await
    }
}
