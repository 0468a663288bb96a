// src/services/auth.rs

use bcrypt::{hash, verify};
use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::UserRepository,
    models::auth::{Claims, Role, Session},
};

// O token expira em 24 horas; iat e exp são instantes UTC explícitos.
const TOKEN_TTL_HOURS: i64 = 24;

#[derive(Clone)]
pub struct AuthService {
    user_repo: UserRepository,
    jwt_secret: String,
}

impl AuthService {
    pub fn new(user_repo: UserRepository, jwt_secret: String) -> Self {
        Self { user_repo, jwt_secret }
    }

    /// Cria o usuário com a senha já conferida pelo payload. O hashing roda
    /// fora do executor async para não travar o runtime.
    pub async fn register_user(
        &self,
        username: &str,
        email: &str,
        password: &str,
        role: Role,
        cafe_id: Option<Uuid>,
    ) -> Result<(String, Session), AppError> {
        let password_clone = password.to_owned();
        let hashed_password =
            tokio::task::spawn_blocking(move || hash(&password_clone, bcrypt::DEFAULT_COST))
                .await
                .map_err(|e| anyhow::anyhow!("Falha na task de hashing: {}", e))??;

        let new_user = self
            .user_repo
            .create_user(username, email, &hashed_password, role, cafe_id)
            .await?;

        let session = self
            .user_repo
            .find_session(new_user.id)
            .await?
            .ok_or(AppError::UserNotFound)?;

        Ok((self.create_token(new_user.id)?, session))
    }

    pub async fn login_user(
        &self,
        email: &str,
        password: &str,
    ) -> Result<(String, Session), AppError> {
        let user = self
            .user_repo
            .find_by_email(email)
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        if !user.is_active {
            return Err(AppError::AccountDisabled);
        }

        let password_clone = password.to_owned();
        let password_hash_clone = user.password_hash.clone();

        // Executa a verificação em um thread separado
        let is_password_valid =
            tokio::task::spawn_blocking(move || verify(&password_clone, &password_hash_clone))
                .await
                .map_err(|e| anyhow::anyhow!("Falha na task de verificação de senha: {}", e))??;

        if !is_password_valid {
            return Err(AppError::InvalidCredentials);
        }

        self.user_repo.record_login(user.id).await?;

        let session = self
            .user_repo
            .find_session(user.id)
            .await?
            .ok_or(AppError::UserNotFound)?;

        Ok((self.create_token(user.id)?, session))
    }

    /// Verifica assinatura e expiração e carrega a sessão completa
    /// (usuário + slug e nome da loja).
    pub async fn authenticate(&self, token: &str) -> Result<Session, AppError> {
        let claims = decode_claims(token, &self.jwt_secret)?;

        self.user_repo
            .find_session(claims.sub)
            .await?
            .ok_or(AppError::InvalidToken)
    }

    pub fn create_token(&self, user_id: Uuid) -> Result<String, AppError> {
        let now = Utc::now();
        let expires_at = now + chrono::Duration::hours(TOKEN_TTL_HOURS);

        let claims = Claims {
            sub: user_id,
            exp: expires_at.timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        Ok(encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_ref()),
        )?)
    }
}

/// Decodificação pura do token: qualquer defeito (assinatura, formato,
/// expiração, sem tolerância) vira `unauthenticated`.
pub fn decode_claims(token: &str, secret: &str) -> Result<Claims, AppError> {
    let mut validation = Validation::default();
    validation.leeway = 0;

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &validation,
    )
    .map_err(|_| AppError::InvalidToken)?;

    Ok(token_data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_token(secret: &str, iat_offset_secs: i64, ttl_secs: i64) -> String {
        let now = Utc::now().timestamp() + iat_offset_secs;
        let claims = Claims {
            sub: Uuid::new_v4(),
            iat: now as usize,
            exp: (now + ttl_secs) as usize,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_ref()),
        )
        .unwrap()
    }

    #[test]
    fn test_valid_token_round_trips() {
        let token = make_token("segredo", 0, 3600);
        assert!(decode_claims(&token, "segredo").is_ok());
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let token = make_token("segredo", 0, 3600);
        assert!(matches!(
            decode_claims(&token, "outro-segredo"),
            Err(AppError::InvalidToken)
        ));
    }

    #[test]
    fn test_just_expired_token_is_rejected() {
        // Expirou há poucos segundos: sem tolerância, já é inválido.
        let token = make_token("segredo", -3610, 3600);
        assert!(matches!(
            decode_claims(&token, "segredo"),
            Err(AppError::InvalidToken)
        ));
    }

    #[test]
    fn test_garbage_token_is_rejected() {
        assert!(matches!(
            decode_claims("nao-e-um-jwt", "segredo"),
            Err(AppError::InvalidToken)
        ));
    }
}
