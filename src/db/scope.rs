// src/db/scope.rs

use uuid::Uuid;

use crate::{common::error::AppError, models::auth::Session};

// ---
// O escopo de tenant de uma consulta
// ---
// Toda leitura e escrita em tabela de domínio passa por aqui. Quando a
// coluna `cafe_id` existe, a consulta é obrigatoriamente filtrada pela loja
// do chamador. Quando ainda não existe (banco pré-migração), a consulta
// roda global, em modo legado.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TenantScope {
    Tenant(Uuid),
    Legacy,
}

impl TenantScope {
    /// Resolve o escopo para uma tabela cuja coluna `cafe_id` pode não
    /// existir. `has_cafe_id` vem do snapshot de capacidades.
    ///
    /// Com a coluna presente, uma sessão sem loja é rejeitada; o atalho do
    /// tenant `default` só sobrevive em modo legado.
    pub fn resolve(has_cafe_id: bool, session: &Session) -> Result<Self, AppError> {
        if !has_cafe_id {
            return Ok(TenantScope::Legacy);
        }
        Ok(TenantScope::Tenant(session.require_cafe()?))
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::auth::Role;

    fn session(role: Role, cafe_id: Option<Uuid>) -> Session {
        Session {
            user_id: Uuid::new_v4(),
            username: "ana".into(),
            email: "ana@example.com".into(),
            role,
            cafe_id,
            cafe_slug: cafe_id.map(|_| "sunrise".into()),
            cafe_name: cafe_id.map(|_| "Sunrise Cafe".into()),
        }
    }

    #[test]
    fn test_migrated_schema_scopes_by_cafe() {
        let cafe = Uuid::new_v4();
        let s = session(Role::Admin, Some(cafe));
        assert_eq!(
            TenantScope::resolve(true, &s).unwrap(),
            TenantScope::Tenant(cafe)
        );
    }

    #[test]
    fn test_migrated_schema_rejects_tenantless_session() {
        let s = session(Role::Admin, None);
        assert!(matches!(
            TenantScope::resolve(true, &s),
            Err(AppError::ForbiddenTenant)
        ));
    }

    #[test]
    fn test_legacy_schema_runs_global() {
        let s = session(Role::Admin, None);
        assert_eq!(TenantScope::resolve(false, &s).unwrap(), TenantScope::Legacy);
    }
}
