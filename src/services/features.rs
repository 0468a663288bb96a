// src/services/features.rs

use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{FeatureRepository, TenantRepository},
    models::{
        features::{Feature, FeatureMap, FeatureOverride},
        tenancy::SubscriptionPlan,
    },
};

// ---
// Resolução de features como função pura
// ---
// O mapa efetivo é `defaults do plano ⊕ overrides`, com o override sempre
// vencendo. Determinístico e independente da ordem de iteração (o BTreeMap
// garante chaves ordenadas na saída).
pub fn resolve_features(
    plan: SubscriptionPlan,
    features: &[Feature],
    overrides: &[FeatureOverride],
) -> FeatureMap {
    let mut map = FeatureMap::new();
    for feature in features {
        map.insert(feature.key.clone(), feature.default_for(plan));
    }
    for ov in overrides {
        // Override de feature desconhecida não inventa chave nova fora do
        // catálogo global.
        if map.contains_key(&ov.feature_key) {
            map.insert(ov.feature_key.clone(), ov.enabled);
        }
    }
    map
}

#[derive(Clone)]
pub struct FeatureService {
    feature_repo: FeatureRepository,
    tenant_repo: TenantRepository,
}

impl FeatureService {
    pub fn new(feature_repo: FeatureRepository, tenant_repo: TenantRepository) -> Self {
        Self { feature_repo, tenant_repo }
    }

    /// O mapa efetivo da loja. Tabelas de features ausentes resultam num
    /// mapa vazio (nenhuma feature habilitada), nunca em erro.
    pub async fn resolve(&self, cafe_id: Uuid) -> Result<FeatureMap, AppError> {
        let cafe = self
            .tenant_repo
            .find_by_id(cafe_id)
            .await?
            .ok_or(AppError::TenantNotFound)?;

        let features = self.feature_repo.list_features().await?;
        let overrides = self.feature_repo.list_overrides(cafe_id).await?;

        Ok(resolve_features(cafe.subscription_plan, &features, &overrides))
    }

    pub async fn has(&self, cafe_id: Uuid, key: &str) -> Result<bool, AppError> {
        Ok(self.resolve(cafe_id).await?.get(key).copied().unwrap_or(false))
    }

    pub async fn set_override(
        &self,
        cafe_id: Uuid,
        key: &str,
        enabled: bool,
    ) -> Result<FeatureOverride, AppError> {
        // A chave precisa existir no catálogo global.
        self.feature_repo
            .find_feature(key)
            .await?
            .ok_or(AppError::NotFound("Feature"))?;

        self.feature_repo.upsert_override(cafe_id, key, enabled).await
    }

    /// Remove o override; a loja volta ao default do plano.
    pub async fn clear_override(&self, cafe_id: Uuid, key: &str) -> Result<(), AppError> {
        let removed = self.feature_repo.delete_override(cafe_id, key).await?;
        if !removed {
            return Err(AppError::NotFound("Override de feature"));
        }
        Ok(())
    }

    pub async fn list_features(&self) -> Result<Vec<Feature>, AppError> {
        self.feature_repo.list_features().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn feature(key: &str, free: bool, pro: bool) -> Feature {
        Feature {
            key: key.to_string(),
            name: key.to_string(),
            description: None,
            default_free: free,
            default_pro: pro,
        }
    }

    fn ov(key: &str, enabled: bool) -> FeatureOverride {
        FeatureOverride {
            cafe_id: Uuid::new_v4(),
            feature_key: key.to_string(),
            enabled,
        }
    }

    fn catalog() -> Vec<Feature> {
        vec![
            feature("inventory", false, true),
            feature("reports", false, true),
            feature("orders", true, true),
        ]
    }

    #[test]
    fn test_plan_defaults_without_overrides() {
        let map = resolve_features(SubscriptionPlan::Free, &catalog(), &[]);
        assert_eq!(map.get("inventory"), Some(&false));
        assert_eq!(map.get("orders"), Some(&true));

        let map = resolve_features(SubscriptionPlan::Pro, &catalog(), &[]);
        assert_eq!(map.get("inventory"), Some(&true));
        assert_eq!(map.get("reports"), Some(&true));
    }

    #[test]
    fn test_override_upgrades_single_feature() {
        let map = resolve_features(SubscriptionPlan::Free, &catalog(), &[ov("inventory", true)]);
        assert_eq!(map.get("inventory"), Some(&true));
        // As demais continuam no default do plano.
        assert_eq!(map.get("reports"), Some(&false));
    }

    #[test]
    fn test_override_downgrades_single_feature() {
        let map = resolve_features(SubscriptionPlan::Pro, &catalog(), &[ov("reports", false)]);
        assert_eq!(map.get("reports"), Some(&false));
        assert_eq!(map.get("inventory"), Some(&true));
    }

    #[test]
    fn test_set_then_clear_restores_initial_map() {
        // Lei de round-trip: aplicar e remover um override devolve o mapa
        // efetivo original.
        let initial = resolve_features(SubscriptionPlan::Free, &catalog(), &[]);
        let with_override =
            resolve_features(SubscriptionPlan::Free, &catalog(), &[ov("inventory", true)]);
        assert_ne!(initial, with_override);

        let cleared = resolve_features(SubscriptionPlan::Free, &catalog(), &[]);
        assert_eq!(initial, cleared);
    }

    #[test]
    fn test_empty_catalog_yields_empty_map() {
        let map = resolve_features(SubscriptionPlan::Pro, &[], &[ov("inventory", true)]);
        assert!(map.is_empty());
    }

    #[test]
    fn test_unknown_override_key_is_ignored() {
        let map = resolve_features(SubscriptionPlan::Free, &catalog(), &[ov("fantasma", true)]);
        assert_eq!(map.get("fantasma"), None);
    }
}
