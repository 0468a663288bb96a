// src/handlers/health.rs

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde_json::json;

use crate::config::AppState;

// GET /health: conectividade do banco, uptime e memória residente.
pub async fn health(State(app_state): State<AppState>) -> impl IntoResponse {
    let database_ok = sqlx::query("SELECT 1")
        .execute(&app_state.db_pool)
        .await
        .is_ok();

    let uptime_secs = (chrono::Utc::now() - app_state.started_at).num_seconds();

    let status = if database_ok { "ok" } else { "degraded" };
    let code = if database_ok {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };

    (
        code,
        Json(json!({
            "status": status,
            "database": database_ok,
            "uptimeSeconds": uptime_secs,
            "memoryRssBytes": resident_memory_bytes(),
        })),
    )
}

// RSS via /proc/self/statm (segundo campo, em páginas). Fora do Linux, ou
// se a leitura falhar, reporta null.
fn resident_memory_bytes() -> Option<u64> {
    let statm = std::fs::read_to_string("/proc/self/statm").ok()?;
    let rss_pages: u64 = statm.split_whitespace().nth(1)?.parse().ok()?;
    Some(rss_pages * 4096)
}
