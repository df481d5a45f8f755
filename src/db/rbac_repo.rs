// src/db/rbac_repo.rs

use sqlx::PgPool;
use uuid::Uuid;
use crate::common::error::AppError;

#[derive(Clone)]
pub struct RbacRepository {
    pool: PgPool,
}

impl RbacRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // O cargo do membro decide as permissões (tabela role_permissions)
    pub async fn user_has_permission(
        &self,
        user_id: Uuid,
        tenant_id: Uuid,
        permission_slug: &str,
    ) -> Result<bool, AppError> {
        let allowed: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1
                FROM user_tenants ut
                JOIN role_permissions rp ON rp.role = ut.role
                WHERE ut.user_id = $1
                  AND ut.tenant_id = $2
                  AND rp.permission = $3
            )
            "#,
        )
            .bind(user_id)
            .bind(tenant_id)
            .bind(permission_slug)
            .fetch_one(&self.pool)
            .await?;

        Ok(allowed)
    }
}
