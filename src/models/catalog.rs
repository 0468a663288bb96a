// src/models/catalog.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::{Validate, ValidationError};

// ---
// 1. Category
// ---
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: Uuid,
    pub cafe_id: Option<Uuid>,
    pub name: String,
    pub sort_order: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateCategoryPayload {
    #[validate(length(min = 1, message = "O nome é obrigatório."))]
    pub name: String,

    #[serde(default)]
    pub sort_order: i32,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCategoryPayload {
    #[validate(length(min = 1, message = "O nome não pode ser vazio."))]
    pub name: Option<String>,
    pub sort_order: Option<i32>,
    pub is_active: Option<bool>,
}

// ---
// 2. MenuItem
// ---
// `featured_priority` só existe em schemas já migrados; o probe decide se a
// coluna entra no SQL, e aqui ela é opcional.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct MenuItem {
    pub id: Uuid,
    pub cafe_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
    pub name: String,
    pub price: Decimal,
    pub is_available: bool,
    pub image_url: Option<String>,
    pub featured_priority: Option<i32>,
    pub created_at: DateTime<Utc>,
}

fn validate_price(price: &Decimal) -> Result<(), ValidationError> {
    if price.is_sign_negative() {
        let mut err = ValidationError::new("range");
        err.message = Some("O preço não pode ser negativo.".into());
        return Err(err);
    }
    Ok(())
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateMenuItemPayload {
    pub category_id: Option<Uuid>,

    #[validate(length(min = 1, message = "O nome é obrigatório."))]
    pub name: String,

    #[validate(custom(function = "validate_price"))]
    pub price: Decimal,

    #[serde(default = "default_true")]
    pub is_available: bool,

    pub image_url: Option<String>,
    pub featured_priority: Option<i32>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMenuItemPayload {
    pub category_id: Option<Uuid>,

    #[validate(length(min = 1, message = "O nome não pode ser vazio."))]
    pub name: Option<String>,

    #[validate(custom(function = "validate_price"))]
    pub price: Option<Decimal>,

    pub is_available: Option<bool>,
    pub image_url: Option<String>,
    pub featured_priority: Option<i32>,
}

// ---
// 3. Importação em massa (planilha já convertida em linhas JSON)
// ---
// A importação é transacional: ou todas as linhas entram, ou nenhuma.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkImportPayload {
    pub items: Vec<BulkImportRow>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BulkImportRow {
    #[validate(length(min = 1, message = "O nome é obrigatório."))]
    pub name: String,

    #[validate(custom(function = "validate_price"))]
    pub price: Decimal,

    pub category: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkImportReport {
    pub imported: usize,
    pub failed: usize,
    // Uma mensagem por linha inválida, com o índice original da linha.
    pub errors: Vec<String>,
}
