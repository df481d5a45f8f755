// src/db/user_repo.rs

use sqlx::{PgPool, Postgres, Executor};
use uuid::Uuid;
use crate::{
    common::error::AppError,
    models::auth::{User, UserCompany},
};

// O repositório de usuários, responsável por todas as interações com a tabela 'users'
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // Busca um usuário pelo seu e-mail
    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let maybe_user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(maybe_user)
    }

    // Busca um usuário pelo seu ID
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        let maybe_user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(maybe_user)
    }

    // Cria um novo usuário no banco de dados
    // Com tratamento de erro específico para e-mails duplicados.
    pub async fn create_user<'e, E>(
        &self,
        executor: E,
        email: &str,
        password_hash: &str,
        full_name: Option<&str>,
    ) -> Result<User, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, password_hash, full_name)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
            .bind(email)
            .bind(password_hash)
            .bind(full_name)
            .fetch_one(executor)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(db_err) = &e {
                    if db_err.is_unique_violation() {
                        return AppError::EmailAlreadyExists;
                    }
                }
                e.into()
            })
    }

    // Empresas das quais o usuário é membro, com o cargo
    pub async fn list_companies(&self, user_id: Uuid) -> Result<Vec<UserCompany>, AppError> {
        let companies = sqlx::query_as::<_, UserCompany>(
            r#"
            SELECT t.id AS tenant_id, t.name, ut.role
            FROM user_tenants ut
            JOIN tenants t ON t.id = ut.tenant_id
            WHERE ut.user_id = $1
            ORDER BY t.name ASC
            "#,
        )
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(companies)
    }
}
