// src/services/auth.rs

use bcrypt::{hash, verify};
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::UserRepository,
    models::auth::{Claims, User, UserCompany},
};

const TOKEN_TTL_DAYS: i64 = 7;

#[derive(Clone)]
pub struct AuthService {
    user_repo: UserRepository,
    jwt_secret: String,
    pool: PgPool,
}

impl AuthService {
    pub fn new(user_repo: UserRepository, jwt_secret: String, pool: PgPool) -> Self {
        Self { user_repo, jwt_secret, pool }
    }

    pub async fn register_user(
        &self,
        email: &str,
        password: &str,
        full_name: Option<&str>,
    ) -> Result<String, AppError> {
        // 1. Hashing fora do runtime assíncrono (bcrypt é caro)
        let password_clone = password.to_owned();
        let hashed_password = tokio::task::spawn_blocking(move || {
            hash(&password_clone, bcrypt::DEFAULT_COST)
        })
            .await
            .map_err(|e| anyhow::anyhow!("Falha na task de hashing: {}", e))?
            ?;

        // 2. Cria o usuário
        let email = email.trim().to_lowercase();
        let new_user = self.user_repo
            .create_user(&self.pool, &email, &hashed_password, full_name)
            .await?;

        tracing::info!(user_id = %new_user.id, "Novo usuário registrado");

        // 3. Gera o token
        self.create_token(new_user.id)
    }

    pub async fn login_user(&self, email: &str, password: &str) -> Result<String, AppError> {
        let user = self.user_repo
            .find_by_email(&email.trim().to_lowercase())
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        let password_clone = password.to_owned();
        let password_hash_clone = user.password_hash.clone();

        // Executa a verificação em um thread separado
        let is_password_valid = tokio::task::spawn_blocking(move || {
            verify(&password_clone, &password_hash_clone)
        })
        .await
        .map_err(|e| anyhow::anyhow!("Falha na task de verificação de senha: {}", e))?
        ?;

        if !is_password_valid {
            return Err(AppError::InvalidCredentials);
        }

        self.create_token(user.id)
    }

    pub async fn validate_token(&self, token: &str) -> Result<User, AppError> {
        let user_id = decode_token(token, &self.jwt_secret)?;

        self.user_repo
            .find_by_id(user_id)
            .await?
            .ok_or(AppError::UserNotFound)
    }

    pub async fn list_companies(&self, user_id: Uuid) -> Result<Vec<UserCompany>, AppError> {
        self.user_repo.list_companies(user_id).await
    }

    fn create_token(&self, user_id: Uuid) -> Result<String, AppError> {
        encode_token(user_id, &self.jwt_secret)
    }
}

fn encode_token(user_id: Uuid, secret: &str) -> Result<String, AppError> {
    let now = Utc::now();
    let expires_at = now + chrono::Duration::days(TOKEN_TTL_DAYS);

    let claims = Claims {
        sub: user_id,
        exp: expires_at.timestamp() as usize,
        iat: now.timestamp() as usize,
    };

    Ok(encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_ref()),
    )?)
}

fn decode_token(token: &str, secret: &str) -> Result<Uuid, AppError> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &Validation::default(),
    )
    .map_err(|_| AppError::InvalidToken)?;

    Ok(token_data.claims.sub)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_round_trips_the_user_id() {
        let user_id = Uuid::new_v4();
        let token = encode_token(user_id, "segredo-de-teste").unwrap();
        assert_eq!(decode_token(&token, "segredo-de-teste").unwrap(), user_id);
    }

    #[test]
    fn token_signed_with_another_secret_is_rejected() {
        let token = encode_token(Uuid::new_v4(), "segredo-a").unwrap();
        assert!(matches!(decode_token(&token, "segredo-b"), Err(AppError::InvalidToken)));
    }
}
