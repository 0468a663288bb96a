// src/middleware/guards.rs

use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use std::marker::PhantomData;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    config::AppState,
    models::{
        auth::{Role, Session},
        tenancy::{Cafe, SubscriptionStatus},
    },
};

// ---
// A cadeia de autorização
// ---
// Cada guard é um extrator que lê a sessão já autenticada das extensions e
// passa, ou falha com o erro específico da camada dele. A ordem de extração
// no handler reproduz a ordem da cadeia: autenticação antes de papel, papel
// antes de assinatura, assinatura antes de feature; assim nunca reportamos
// "feature desabilitada" quando a resposta certa era "não autenticado".

fn session_from(parts: &Parts) -> Result<Session, AppError> {
    parts
        .extensions
        .get::<Session>()
        .cloned()
        .ok_or(AppError::InvalidToken)
}

/// Resolve a loja "efetiva" do chamador: a da sessão, ou a loja `default`
/// no modo legado (sessões antigas sem loja). Super Admin nunca passa por
/// aqui; os guards tratam o bypass antes.
async fn effective_cafe(state: &AppState, session: &Session) -> Result<Option<Cafe>, AppError> {
    if let Some(cafe_id) = session.cafe_id {
        return Ok(Some(
            state
                .tenant_repo
                .find_by_id(cafe_id)
                .await?
                .ok_or(AppError::TenantNotFound)?,
        ));
    }
    state.tenant_repo.find_default().await
}

// ---
// 1. Papéis
// ---

/// O conjunto de papéis aceitos por uma rota. Super Admin nunca entra num
/// conjunto implicitamente; quem quer Super Admin usa `RequireSuperAdmin`.
pub trait RoleSet: Send + Sync + 'static {
    fn allowed() -> &'static [Role];
}

pub struct RequireRole<T: RoleSet>(pub PhantomData<T>);

impl<T, S> FromRequestParts<S> for RequireRole<T>
where
    T: RoleSet,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let session = session_from(parts)?;
        if !T::allowed().contains(&session.role) {
            return Err(AppError::ForbiddenRole);
        }
        Ok(RequireRole(PhantomData))
    }
}

// Conjuntos usados pelas rotas
pub struct AdminOnly;
impl RoleSet for AdminOnly {
    fn allowed() -> &'static [Role] {
        &[Role::Admin]
    }
}

pub struct Staff;
impl RoleSet for Staff {
    fn allowed() -> &'static [Role] {
        &[Role::Admin, Role::Chef, Role::Reception]
    }
}

pub struct FrontOfHouse;
impl RoleSet for FrontOfHouse {
    fn allowed() -> &'static [Role] {
        &[Role::Admin, Role::Reception]
    }
}

// ---
// 2. Super Admin
// ---

pub struct RequireSuperAdmin(pub Session);

impl<S> FromRequestParts<S> for RequireSuperAdmin
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let session = session_from(parts)?;
        if !session.is_superadmin() {
            return Err(AppError::ForbiddenRole);
        }
        Ok(RequireSuperAdmin(session))
    }
}

// ---
// 3. Assinatura ativa
// ---

pub struct RequireActiveSubscription;

impl<S> FromRequestParts<S> for RequireActiveSubscription
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let session = session_from(parts)?;
        if session.is_superadmin() {
            return Ok(RequireActiveSubscription);
        }

        let app_state = AppState::from_ref(state);
        match effective_cafe(&app_state, &session).await? {
            Some(cafe) if cafe.subscription_status == SubscriptionStatus::Active => {
                Ok(RequireActiveSubscription)
            }
            Some(_) => Err(AppError::SubscriptionInactive),
            // Banco legado sem loja `default`: nada a verificar.
            None => Ok(RequireActiveSubscription),
        }
    }
}

// ---
// 4. Feature habilitada
// ---

/// Define a chave de feature exigida por uma rota, no mesmo espírito do
/// conjunto de papéis.
pub trait FeatureKeyDef: Send + Sync + 'static {
    fn key() -> &'static str;
}

pub struct RequireFeature<T: FeatureKeyDef>(pub PhantomData<T>);

impl<T, S> FromRequestParts<S> for RequireFeature<T>
where
    T: FeatureKeyDef,
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let session = session_from(parts)?;
        if session.is_superadmin() {
            // Super Admin enxerga tudo, independente de plano.
            return Ok(RequireFeature(PhantomData));
        }

        let app_state = AppState::from_ref(state);
        let cafe = effective_cafe(&app_state, &session).await?;
        let Some(cafe) = cafe else {
            return Err(AppError::FeatureDisabled(T::key().to_string()));
        };

        // Falha de resolução degrada para "nenhuma feature habilitada",
        // nunca derruba a requisição com 500.
        let enabled = match app_state.feature_service.has(cafe.id, T::key()).await {
            Ok(enabled) => enabled,
            Err(e) => {
                tracing::warn!("Falha ao resolver features da loja {}: {e}", cafe.id);
                false
            }
        };

        if !enabled {
            return Err(AppError::FeatureDisabled(T::key().to_string()));
        }
        Ok(RequireFeature(PhantomData))
    }
}

pub struct FeatureInventory;
impl FeatureKeyDef for FeatureInventory {
    fn key() -> &'static str {
        "inventory"
    }
}

pub struct FeatureReports;
impl FeatureKeyDef for FeatureReports {
    fn key() -> &'static str {
        "reports"
    }
}

// ---
// 5. Onboarding concluído
// ---
// As rotas de onboarding em si não montam este guard; Super Admin é isento.

pub struct RequireOnboarded;

impl<S> FromRequestParts<S> for RequireOnboarded
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let session = session_from(parts)?;
        if session.is_superadmin() {
            return Ok(RequireOnboarded);
        }

        let app_state = AppState::from_ref(state);
        match effective_cafe(&app_state, &session).await? {
            Some(cafe) if !cafe.is_onboarded => Err(AppError::OnboardingRequired),
            _ => Ok(RequireOnboarded),
        }
    }
}

// ---
// 6. Acesso a loja nomeada no caminho
// ---

/// Para rotas que carregam o id da loja no path: ou é a loja da própria
/// sessão, ou o chamador é Super Admin.
pub fn ensure_cafe_access(session: &Session, cafe_id: Uuid) -> Result<(), AppError> {
    if session.is_superadmin() || session.cafe_id == Some(cafe_id) {
        return Ok(());
    }
    Err(AppError::ForbiddenTenant)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(role: Role, cafe_id: Option<Uuid>) -> Session {
        Session {
            user_id: Uuid::new_v4(),
            username: "teste".into(),
            email: "t@example.com".into(),
            role,
            cafe_id,
            cafe_slug: None,
            cafe_name: None,
        }
    }

    #[test]
    fn test_role_sets_exclude_superadmin() {
        // Super Admin nunca está num conjunto a menos que nomeado.
        assert!(!Staff::allowed().contains(&Role::Superadmin));
        assert!(!AdminOnly::allowed().contains(&Role::Superadmin));
        assert!(!FrontOfHouse::allowed().contains(&Role::Superadmin));
    }

    #[test]
    fn test_cafe_access_own_tenant() {
        let cafe = Uuid::new_v4();
        let s = session(Role::Admin, Some(cafe));
        assert!(ensure_cafe_access(&s, cafe).is_ok());
    }

    #[test]
    fn test_cafe_access_other_tenant_is_forbidden() {
        let s = session(Role::Admin, Some(Uuid::new_v4()));
        assert!(matches!(
            ensure_cafe_access(&s, Uuid::new_v4()),
            Err(AppError::ForbiddenTenant)
        ));
    }

    #[test]
    fn test_cafe_access_superadmin_passes_anywhere() {
        let s = session(Role::Superadmin, None);
        assert!(ensure_cafe_access(&s, Uuid::new_v4()).is_ok());
    }
}
