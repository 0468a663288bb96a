// src/db/user_repo.rs

use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::{
    common::error::{AppError, map_unique_violation},
    db::probe::Capabilities,
    models::auth::{Role, Session, User},
};

#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
    caps: Capabilities,
}

impl UserRepository {
    pub fn new(pool: PgPool, caps: Capabilities) -> Self {
        Self { pool, caps }
    }

    // `is_active` pode não existir num banco antigo; nesse caso todo mundo
    // conta como ativo.
    fn select_cols(&self) -> &'static str {
        if self.caps.users_is_active {
            "id, username, email, password_hash, role, cafe_id, is_active, last_login, created_at"
        } else {
            "id, username, email, password_hash, role, cafe_id, TRUE AS is_active, \
             last_login, created_at"
        }
    }

    pub async fn create_user(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
        role: Role,
        cafe_id: Option<Uuid>,
    ) -> Result<User, AppError> {
        let sql = format!(
            "INSERT INTO users (username, email, password_hash, role, cafe_id) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {}",
            self.select_cols()
        );

        sqlx::query_as::<_, User>(&sql)
            .bind(username)
            .bind(email)
            .bind(password_hash)
            .bind(role.as_str())
            .bind(cafe_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_unique_violation(e, "Este e-mail já está em uso."))
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let sql = format!("SELECT {} FROM users WHERE email = $1", self.select_cols());
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", self.select_cols());
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    /// Carrega o usuário junto com a loja (slug e nome) numa consulta só.
    /// É isto que vira a `Session` da requisição autenticada.
    pub async fn find_session(&self, user_id: Uuid) -> Result<Option<Session>, AppError> {
        let active_col = if self.caps.users_is_active {
            "u.is_active"
        } else {
            "TRUE"
        };

        // Sem a tabela de lojas (banco pré-migração) o join sai do SQL.
        let sql = if self.caps.cafes_table {
            format!(
                "SELECT u.id, u.username, u.email, u.role, u.cafe_id, \
                        {active_col} AS is_active, c.slug AS cafe_slug, c.name AS cafe_name \
                 FROM users u LEFT JOIN cafes c ON c.id = u.cafe_id \
                 WHERE u.id = $1"
            )
        } else {
            format!(
                "SELECT u.id, u.username, u.email, u.role, u.cafe_id, \
                        {active_col} AS is_active, NULL::text AS cafe_slug, NULL::text AS cafe_name \
                 FROM users u WHERE u.id = $1"
            )
        };

        let row = sqlx::query(&sql)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else { return Ok(None) };

        if !row.try_get::<bool, _>("is_active")? {
            return Err(AppError::AccountDisabled);
        }

        let role: String = row.try_get("role")?;
        Ok(Some(Session {
            user_id: row.try_get("id")?,
            username: row.try_get("username")?,
            email: row.try_get("email")?,
            role: Role::try_from(role).map_err(AppError::Validation)?,
            cafe_id: row.try_get("cafe_id")?,
            cafe_slug: row.try_get("cafe_slug")?,
            cafe_name: row.try_get("cafe_name")?,
        }))
    }

    pub async fn record_login(&self, id: Uuid) -> Result<(), AppError> {
        sqlx::query("UPDATE users SET last_login = NOW() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn list_all(&self) -> Result<Vec<User>, AppError> {
        let sql = format!("SELECT {} FROM users ORDER BY created_at", self.select_cols());
        Ok(sqlx::query_as::<_, User>(&sql).fetch_all(&self.pool).await?)
    }

    pub async fn list_by_cafe(&self, cafe_id: Uuid) -> Result<Vec<User>, AppError> {
        let sql = format!(
            "SELECT {} FROM users WHERE cafe_id = $1 ORDER BY created_at",
            self.select_cols()
        );
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(cafe_id)
            .fetch_all(&self.pool)
            .await?)
    }

    pub async fn update_user(
        &self,
        id: Uuid,
        username: Option<&str>,
        email: Option<&str>,
        role: Option<Role>,
        cafe_id: Option<Uuid>,
    ) -> Result<User, AppError> {
        let sql = format!(
            "UPDATE users SET username = COALESCE($2, username), \
             email = COALESCE($3, email), role = COALESCE($4, role), \
             cafe_id = COALESCE($5, cafe_id) \
             WHERE id = $1 RETURNING {}",
            self.select_cols()
        );

        sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(username)
            .bind(email)
            .bind(role.map(|r| r.as_str()))
            .bind(cafe_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_unique_violation(e, "Este e-mail já está em uso."))?
            .ok_or(AppError::UserNotFound)
    }

    /// Soft delete quando a coluna existe; remoção física no modo legado.
    pub async fn delete_user(&self, id: Uuid) -> Result<(), AppError> {
        let sql = if self.caps.users_is_active {
            "UPDATE users SET is_active = FALSE WHERE id = $1"
        } else {
            "DELETE FROM users WHERE id = $1"
        };

        let result = sqlx::query(sql).bind(id).execute(&self.pool).await?;
        if result.rows_affected() == 0 {
            return Err(AppError::UserNotFound);
        }
        Ok(())
    }
}
