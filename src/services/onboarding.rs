// src/services/onboarding.rs

use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::TenantRepository,
    models::tenancy::OnboardingStatus,
};

// Toda loja nasce com `is_onboarded = false`; até concluir, o guard de
// onboarding bloqueia as rotas de domínio. O progresso é um mapa livre que
// o frontend salva por etapa.
#[derive(Clone)]
pub struct OnboardingService {
    tenant_repo: TenantRepository,
}

impl OnboardingService {
    pub fn new(tenant_repo: TenantRepository) -> Self {
        Self { tenant_repo }
    }

    pub async fn status(&self, cafe_id: Uuid) -> Result<OnboardingStatus, AppError> {
        let cafe = self
            .tenant_repo
            .find_by_id(cafe_id)
            .await?
            .ok_or(AppError::TenantNotFound)?;

        Ok(OnboardingStatus {
            is_onboarded: cafe.is_onboarded,
            onboarding_data: cafe.onboarding_data,
        })
    }

    /// Mescla o passo recebido com o progresso já salvo (merge raso por
    /// chave; o passo novo vence).
    pub async fn save_step(
        &self,
        cafe_id: Uuid,
        step: &serde_json::Value,
    ) -> Result<OnboardingStatus, AppError> {
        let cafe = self
            .tenant_repo
            .find_by_id(cafe_id)
            .await?
            .ok_or(AppError::TenantNotFound)?;

        let merged = merge_step(cafe.onboarding_data, step);
        let updated = self.tenant_repo.save_onboarding_data(cafe_id, &merged).await?;

        Ok(OnboardingStatus {
            is_onboarded: updated.is_onboarded,
            onboarding_data: updated.onboarding_data,
        })
    }

    pub async fn complete(&self, cafe_id: Uuid) -> Result<OnboardingStatus, AppError> {
        let updated = self.tenant_repo.set_onboarded(cafe_id, true).await?;
        Ok(OnboardingStatus {
            is_onboarded: updated.is_onboarded,
            onboarding_data: updated.onboarding_data,
        })
    }

    /// Reset pelo Super Admin: a loja volta ao início do fluxo.
    pub async fn reset(&self, cafe_id: Uuid) -> Result<OnboardingStatus, AppError> {
        let updated = self.tenant_repo.reset_onboarding(cafe_id).await?;
        Ok(OnboardingStatus {
            is_onboarded: updated.is_onboarded,
            onboarding_data: updated.onboarding_data,
        })
    }
}

fn merge_step(existing: Option<serde_json::Value>, step: &serde_json::Value) -> serde_json::Value {
    match (existing, step) {
        (Some(serde_json::Value::Object(mut base)), serde_json::Value::Object(new)) => {
            for (k, v) in new {
                base.insert(k.clone(), v.clone());
            }
            serde_json::Value::Object(base)
        }
        // Sem progresso anterior (ou formato inesperado): o passo vira o todo.
        _ => step.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_merge_keeps_existing_keys() {
        let merged = merge_step(
            Some(json!({"nome": "Sunrise", "etapa": 1})),
            &json!({"etapa": 2}),
        );
        assert_eq!(merged, json!({"nome": "Sunrise", "etapa": 2}));
    }

    #[test]
    fn test_first_step_becomes_whole_map() {
        let merged = merge_step(None, &json!({"etapa": 1}));
        assert_eq!(merged, json!({"etapa": 1}));
    }
}
