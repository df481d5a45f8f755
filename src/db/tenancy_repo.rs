// src/db/tenancy_repo.rs

use sqlx::{PgPool, Postgres, Executor};
use uuid::Uuid;
use crate::common::error::AppError;
use crate::models::tenancy::{MemberRole, Tenant, TenantMember};

#[derive(Clone)]
pub struct TenantRepository {
    pool: PgPool,
}

impl TenantRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Verifica se um utilizador tem permissão para aceder a um tenant.
    /// Esta é a verificação de segurança de autorização mais importante.
    pub async fn check_user_tenancy(
        &self,
        user_id: Uuid,
        tenant_id: Uuid,
    ) -> Result<bool, AppError> {
        // SELECT EXISTS: apenas 'true' ou 'false'
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM user_tenants
                WHERE user_id = $1 AND tenant_id = $2
            )
            "#,
        )
            .bind(user_id)
            .bind(tenant_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(exists)
    }

    pub async fn create_tenant<'e, E>(
        &self,
        executor: E,
        name: &str,
        document_number: Option<&str>,
    ) -> Result<Tenant, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let tenant = sqlx::query_as::<_, Tenant>(
            r#"
            INSERT INTO tenants (name, document_number)
            VALUES ($1, $2)
            RETURNING *
            "#,
        )
            .bind(name)
            .bind(document_number)
            .fetch_one(executor)
            .await?;

        Ok(tenant)
    }

    /// Liga um utilizador a um tenant com um cargo.
    pub async fn add_member<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        user_id: Uuid,
        role: MemberRole,
    ) -> Result<TenantMember, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, TenantMember>(
            r#"
            INSERT INTO user_tenants (user_id, tenant_id, role)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
            .bind(user_id)
            .bind(tenant_id)
            .bind(role)
            .fetch_one(executor)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(db_err) = &e {
                    if db_err.is_unique_violation() {
                        return AppError::MemberAlreadyExists;
                    }
                }
                e.into()
            })
    }

    pub async fn list_members<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
    ) -> Result<Vec<TenantMember>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let members = sqlx::query_as::<_, TenantMember>(
            "SELECT * FROM user_tenants WHERE tenant_id = $1 ORDER BY created_at ASC",
        )
            .bind(tenant_id)
            .fetch_all(executor)
            .await?;

        Ok(members)
    }

    pub async fn get_tenants_for_user(&self, user_id: Uuid) -> Result<Vec<Tenant>, AppError> {
        let tenants = sqlx::query_as::<_, Tenant>(
            r#"
            SELECT t.*
            FROM tenants t
            JOIN user_tenants ut ON ut.tenant_id = t.id
            WHERE ut.user_id = $1
            ORDER BY t.name ASC
            "#,
        )
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(tenants)
    }
}
