// src/common/db_utils.rs

use uuid::Uuid;

use crate::{
    common::error::AppError, config::AppState, db::scope::TenantScope, models::auth::Session,
};

// ---
// Resolução de tenant por requisição
// ---
/// O par (escopo da consulta, loja de atribuição) que todo handler de
/// domínio precisa.
///
/// - Schema migrado (`has_cafe_id`): a sessão precisa ter loja; consultas
///   saem filtradas por ela. Sessão sem loja é rejeitada; inclusive Super
///   Admin, que age sobre lojas nomeadas nas rotas próprias dele.
/// - Schema legado: consultas rodam globais e a atribuição (imposto,
///   métricas) cai na loja `default`, se existir.
pub async fn resolve_tenant(
    app_state: &AppState,
    session: &Session,
    has_cafe_id: bool,
) -> Result<(TenantScope, Option<Uuid>), AppError> {
    if has_cafe_id {
        let cafe_id = session.require_cafe()?;
        return Ok((TenantScope::Tenant(cafe_id), Some(cafe_id)));
    }

    let default_cafe = app_state.tenant_repo.find_default().await?;
    Ok((TenantScope::Legacy, default_cafe.map(|c| c.id)))
}
