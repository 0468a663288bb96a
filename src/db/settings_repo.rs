// src/db/settings_repo.rs

use sqlx::PgPool;
use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
    time::{Duration, Instant},
};
use uuid::Uuid;

use crate::{
    common::error::{AppError, map_unique_violation},
    db::{probe::Capabilities, scope::TenantScope},
    models::settings::{
        CafeSettings, CreatePaymentMethodPayload, CurrencySetting, PaymentMethod, TaxSetting,
        UpdateCafeSettingsPayload, UpdateCurrencySettingPayload, UpdatePaymentMethodPayload,
        UpdateTaxSettingPayload,
    },
};

// O imposto vigente é lido em todo pedido criado; um cache curto evita uma
// ida ao banco por venda. A chave inclui a loja; impostos são por tenant.
const TAX_CACHE_TTL: Duration = Duration::from_secs(60);

#[derive(Clone)]
pub struct SettingsRepository {
    pool: PgPool,
    caps: Capabilities,
    tax_cache: Arc<RwLock<HashMap<Uuid, (TaxSetting, Instant)>>>,
}

impl SettingsRepository {
    pub fn new(pool: PgPool, caps: Capabilities) -> Self {
        Self {
            pool,
            caps,
            tax_cache: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    // ---
    // Configurações gerais da loja
    // ---

    fn settings_cols(&self) -> &'static str {
        if self.caps.settings_colors {
            "cafe_id, display_name, address, phone, logo_url, primary_color, \
             secondary_color, updated_at"
        } else {
            "cafe_id, display_name, address, phone, logo_url, NULL::text AS primary_color, \
             NULL::text AS secondary_color, updated_at"
        }
    }

    pub async fn get_cafe_settings(&self, cafe_id: Uuid) -> Result<CafeSettings, AppError> {
        let sql = format!(
            "SELECT {} FROM cafe_settings WHERE cafe_id = $1",
            self.settings_cols()
        );
        let settings = sqlx::query_as::<_, CafeSettings>(&sql)
            .bind(cafe_id)
            .fetch_optional(&self.pool)
            .await?;

        // Loja sem linha de configuração responde um registro vazio.
        Ok(settings.unwrap_or(CafeSettings {
            cafe_id,
            display_name: None,
            address: None,
            phone: None,
            logo_url: None,
            primary_color: None,
            secondary_color: None,
            updated_at: None,
        }))
    }

    pub async fn update_cafe_settings(
        &self,
        cafe_id: Uuid,
        payload: &UpdateCafeSettingsPayload,
    ) -> Result<CafeSettings, AppError> {
        let (insert_cols, insert_vals, update_set) = if self.caps.settings_colors {
            (
                "cafe_id, display_name, address, phone, logo_url, primary_color, \
                 secondary_color, updated_at",
                "$1, $2, $3, $4, $5, $6, $7, NOW()",
                "display_name = COALESCE($2, cafe_settings.display_name), \
                 address = COALESCE($3, cafe_settings.address), \
                 phone = COALESCE($4, cafe_settings.phone), \
                 logo_url = COALESCE($5, cafe_settings.logo_url), \
                 primary_color = COALESCE($6, cafe_settings.primary_color), \
                 secondary_color = COALESCE($7, cafe_settings.secondary_color), \
                 updated_at = NOW()",
            )
        } else {
            (
                "cafe_id, display_name, address, phone, logo_url, updated_at",
                "$1, $2, $3, $4, $5, NOW()",
                "display_name = COALESCE($2, cafe_settings.display_name), \
                 address = COALESCE($3, cafe_settings.address), \
                 phone = COALESCE($4, cafe_settings.phone), \
                 logo_url = COALESCE($5, cafe_settings.logo_url), \
                 updated_at = NOW()",
            )
        };

        let sql = format!(
            "INSERT INTO cafe_settings ({insert_cols}) VALUES ({insert_vals}) \
             ON CONFLICT (cafe_id) DO UPDATE SET {update_set} RETURNING {}",
            self.settings_cols()
        );

        let mut query = sqlx::query_as::<_, CafeSettings>(&sql)
            .bind(cafe_id)
            .bind(&payload.display_name)
            .bind(&payload.address)
            .bind(&payload.phone)
            .bind(&payload.logo_url);

        if self.caps.settings_colors {
            query = query
                .bind(&payload.primary_color)
                .bind(&payload.secondary_color);
        }

        Ok(query.fetch_one(&self.pool).await?)
    }

    // ---
    // Impostos (com cache de 60 s por loja)
    // ---

    pub async fn get_tax_setting(&self, cafe_id: Uuid) -> Result<TaxSetting, AppError> {
        if let Ok(cache) = self.tax_cache.read() {
            if let Some((setting, stored_at)) = cache.get(&cafe_id) {
                if stored_at.elapsed() < TAX_CACHE_TTL {
                    return Ok(setting.clone());
                }
            }
        }

        let setting = sqlx::query_as::<_, TaxSetting>(
            "SELECT cafe_id, tax_rate, tax_name, include_tax, updated_at \
             FROM tax_settings WHERE cafe_id = $1",
        )
        .bind(cafe_id)
        .fetch_optional(&self.pool)
        .await?
        .unwrap_or_else(|| TaxSetting::disabled(cafe_id));

        if let Ok(mut cache) = self.tax_cache.write() {
            cache.insert(cafe_id, (setting.clone(), Instant::now()));
        }

        Ok(setting)
    }

    pub async fn update_tax_setting(
        &self,
        cafe_id: Uuid,
        payload: &UpdateTaxSettingPayload,
    ) -> Result<TaxSetting, AppError> {
        let setting = sqlx::query_as::<_, TaxSetting>(
            "INSERT INTO tax_settings (cafe_id, tax_rate, tax_name, include_tax, updated_at) \
             VALUES ($1, $2, $3, $4, NOW()) \
             ON CONFLICT (cafe_id) DO UPDATE SET tax_rate = $2, tax_name = $3, \
             include_tax = $4, updated_at = NOW() \
             RETURNING cafe_id, tax_rate, tax_name, include_tax, updated_at",
        )
        .bind(cafe_id)
        .bind(payload.tax_rate)
        .bind(&payload.tax_name)
        .bind(payload.include_tax)
        .fetch_one(&self.pool)
        .await?;

        // Qualquer escrita invalida a entrada da loja no cache.
        if let Ok(mut cache) = self.tax_cache.write() {
            cache.remove(&cafe_id);
        }

        Ok(setting)
    }

    // ---
    // Moeda
    // ---

    pub async fn get_currency_setting(&self, cafe_id: Uuid) -> Result<CurrencySetting, AppError> {
        let setting = sqlx::query_as::<_, CurrencySetting>(
            "SELECT cafe_id, currency_code, currency_symbol, updated_at \
             FROM currency_settings WHERE cafe_id = $1",
        )
        .bind(cafe_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(setting.unwrap_or(CurrencySetting {
            cafe_id,
            currency_code: "INR".to_string(),
            currency_symbol: "₹".to_string(),
            updated_at: None,
        }))
    }

    pub async fn update_currency_setting(
        &self,
        cafe_id: Uuid,
        payload: &UpdateCurrencySettingPayload,
    ) -> Result<CurrencySetting, AppError> {
        Ok(sqlx::query_as::<_, CurrencySetting>(
            "INSERT INTO currency_settings (cafe_id, currency_code, currency_symbol, updated_at) \
             VALUES ($1, $2, $3, NOW()) \
             ON CONFLICT (cafe_id) DO UPDATE SET currency_code = $2, currency_symbol = $3, \
             updated_at = NOW() \
             RETURNING cafe_id, currency_code, currency_symbol, updated_at",
        )
        .bind(cafe_id)
        .bind(&payload.currency_code)
        .bind(&payload.currency_symbol)
        .fetch_one(&self.pool)
        .await?)
    }

    // ---
    // Formas de pagamento
    // ---

    fn payment_cols(&self) -> &'static str {
        if self.caps.payment_methods_cafe_id {
            "id, cafe_id, name, is_active, sort_order"
        } else {
            "id, NULL::uuid AS cafe_id, name, is_active, sort_order"
        }
    }

    pub async fn list_payment_methods(
        &self,
        scope: TenantScope,
    ) -> Result<Vec<PaymentMethod>, AppError> {
        let rows = match scope {
            TenantScope::Tenant(cafe_id) => {
                let sql = format!(
                    "SELECT {} FROM payment_methods WHERE cafe_id = $1 AND is_active = TRUE \
                     ORDER BY sort_order, name",
                    self.payment_cols()
                );
                sqlx::query_as::<_, PaymentMethod>(&sql)
                    .bind(cafe_id)
                    .fetch_all(&self.pool)
                    .await?
            }
            TenantScope::Legacy => {
                let sql = format!(
                    "SELECT {} FROM payment_methods WHERE is_active = TRUE \
                     ORDER BY sort_order, name",
                    self.payment_cols()
                );
                sqlx::query_as::<_, PaymentMethod>(&sql)
                    .fetch_all(&self.pool)
                    .await?
            }
        };
        Ok(rows)
    }

    pub async fn create_payment_method(
        &self,
        scope: TenantScope,
        payload: &CreatePaymentMethodPayload,
    ) -> Result<PaymentMethod, AppError> {
        let result = match scope {
            TenantScope::Tenant(cafe_id) => {
                let sql = format!(
                    "INSERT INTO payment_methods (cafe_id, name, sort_order) \
                     VALUES ($1, $2, $3) RETURNING {}",
                    self.payment_cols()
                );
                sqlx::query_as::<_, PaymentMethod>(&sql)
                    .bind(cafe_id)
                    .bind(&payload.name)
                    .bind(payload.sort_order)
                    .fetch_one(&self.pool)
                    .await
            }
            TenantScope::Legacy => {
                let sql = format!(
                    "INSERT INTO payment_methods (name, sort_order) VALUES ($1, $2) \
                     RETURNING {}",
                    self.payment_cols()
                );
                sqlx::query_as::<_, PaymentMethod>(&sql)
                    .bind(&payload.name)
                    .bind(payload.sort_order)
                    .fetch_one(&self.pool)
                    .await
            }
        };

        result.map_err(|e| map_unique_violation(e, "Já existe uma forma de pagamento com este nome."))
    }

    pub async fn update_payment_method(
        &self,
        scope: TenantScope,
        id: Uuid,
        payload: &UpdatePaymentMethodPayload,
    ) -> Result<PaymentMethod, AppError> {
        let set = "name = COALESCE($2, name), is_active = COALESCE($3, is_active), \
                   sort_order = COALESCE($4, sort_order)";

        let result = match scope {
            TenantScope::Tenant(cafe_id) => {
                let sql = format!(
                    "UPDATE payment_methods SET {set} WHERE id = $1 AND cafe_id = $5 \
                     RETURNING {}",
                    self.payment_cols()
                );
                sqlx::query_as::<_, PaymentMethod>(&sql)
                    .bind(id)
                    .bind(&payload.name)
                    .bind(payload.is_active)
                    .bind(payload.sort_order)
                    .bind(cafe_id)
                    .fetch_optional(&self.pool)
                    .await?
            }
            TenantScope::Legacy => {
                let sql = format!(
                    "UPDATE payment_methods SET {set} WHERE id = $1 RETURNING {}",
                    self.payment_cols()
                );
                sqlx::query_as::<_, PaymentMethod>(&sql)
                    .bind(id)
                    .bind(&payload.name)
                    .bind(payload.is_active)
                    .bind(payload.sort_order)
                    .fetch_optional(&self.pool)
                    .await?
            }
        };

        result.ok_or(AppError::NotFound("Forma de pagamento"))
    }

    pub async fn delete_payment_method(&self, scope: TenantScope, id: Uuid) -> Result<(), AppError> {
        let result = match scope {
            TenantScope::Tenant(cafe_id) => {
                sqlx::query(
                    "UPDATE payment_methods SET is_active = FALSE WHERE id = $1 AND cafe_id = $2",
                )
                .bind(id)
                .bind(cafe_id)
                .execute(&self.pool)
                .await?
            }
            TenantScope::Legacy => {
                sqlx::query("UPDATE payment_methods SET is_active = FALSE WHERE id = $1")
                    .bind(id)
                    .execute(&self.pool)
                    .await?
            }
        };

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Forma de pagamento"));
        }
        Ok(())
    }
}
