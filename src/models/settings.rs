// src/models/settings.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::{Validate, ValidationError};

// ---
// 1. Configurações gerais da loja
// ---
// As colunas de cor só existem em schemas migrados; ficam opcionais e o
// probe decide se entram no SQL.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CafeSettings {
    pub cafe_id: Uuid,
    pub display_name: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub logo_url: Option<String>,
    pub primary_color: Option<String>,
    pub secondary_color: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCafeSettingsPayload {
    pub display_name: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub logo_url: Option<String>,
    pub primary_color: Option<String>,
    pub secondary_color: Option<String>,
}

// ---
// 2. Impostos
// ---
fn validate_rate(rate: &Decimal) -> Result<(), ValidationError> {
    if rate.is_sign_negative() || *rate > Decimal::from(100) {
        let mut err = ValidationError::new("range");
        err.message = Some("A alíquota deve estar entre 0 e 100.".into());
        return Err(err);
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TaxSetting {
    pub cafe_id: Uuid,
    pub tax_rate: Decimal,
    pub tax_name: Option<String>,
    pub include_tax: bool,
    pub updated_at: Option<DateTime<Utc>>,
}

impl TaxSetting {
    // Default quando a loja nunca configurou imposto: 0%, desligado.
    pub fn disabled(cafe_id: Uuid) -> Self {
        Self {
            cafe_id,
            tax_rate: Decimal::ZERO,
            tax_name: None,
            include_tax: false,
            updated_at: None,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaxSettingPayload {
    #[validate(custom(function = "validate_rate"))]
    pub tax_rate: Decimal,
    pub tax_name: Option<String>,
    pub include_tax: bool,
}

// ---
// 3. Moeda
// ---
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CurrencySetting {
    pub cafe_id: Uuid,
    pub currency_code: String,
    pub currency_symbol: String,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCurrencySettingPayload {
    #[validate(length(min = 3, max = 3, message = "O código da moeda deve ter 3 letras."))]
    pub currency_code: String,

    #[validate(length(min = 1, message = "O símbolo é obrigatório."))]
    pub currency_symbol: String,
}

// ---
// 4. Formas de pagamento
// ---
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PaymentMethod {
    pub id: Uuid,
    pub cafe_id: Option<Uuid>,
    pub name: String,
    pub is_active: bool,
    pub sort_order: i32,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentMethodPayload {
    #[validate(length(min = 1, message = "O nome é obrigatório."))]
    pub name: String,

    #[serde(default)]
    pub sort_order: i32,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePaymentMethodPayload {
    #[validate(length(min = 1, message = "O nome não pode ser vazio."))]
    pub name: Option<String>,
    pub is_active: Option<bool>,
    pub sort_order: Option<i32>,
}
