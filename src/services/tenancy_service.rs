// src/services/tenancy_service.rs

use crate::{
    common::error::AppError,
    db::{SettingsRepository, TenantRepository, UserRepository},
    models::tenancy::{MemberRole, Tenant, TenantMember},
};
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

#[derive(Clone)]
pub struct TenantService {
    tenant_repo: TenantRepository,
    user_repo: UserRepository,
    settings_repo: SettingsRepository,
    pool: PgPool, // Usamos a pool para iniciar transações
}

impl TenantService {
    pub fn new(
        tenant_repo: TenantRepository,
        user_repo: UserRepository,
        settings_repo: SettingsRepository,
        pool: PgPool,
    ) -> Self {
        Self { tenant_repo, user_repo, settings_repo, pool }
    }

    /// Cria a empresa e, na mesma transação, torna o criador OWNER
    /// e grava a configuração inicial (nome e documento no cupom).
    pub async fn create_tenant_with_owner(
        &self,
        name: &str,
        document_number: Option<&str>,
        owner_id: Uuid,
    ) -> Result<Tenant, AppError> {
        let mut tx = self.pool.begin().await?;

        let new_tenant = self.tenant_repo
            .create_tenant(&mut *tx, name, document_number)
            .await?;

        self.tenant_repo
            .add_member(&mut *tx, new_tenant.id, owner_id, MemberRole::Owner)
            .await?;

        self.settings_repo
            .init_settings(&mut *tx, new_tenant.id, name, document_number)
            .await?;

        tx.commit().await?;

        tracing::info!(tenant_id = %new_tenant.id, owner_id = %owner_id, "Empresa criada");
        Ok(new_tenant)
    }

    pub async fn list_user_tenants(&self, user_id: Uuid) -> Result<Vec<Tenant>, AppError> {
        self.tenant_repo.get_tenants_for_user(user_id).await
    }

    /// Adiciona um usuário já cadastrado (pelo e-mail) à empresa.
    pub async fn add_member_by_email<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        email: &str,
        role: MemberRole,
    ) -> Result<TenantMember, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let user = self.user_repo
            .find_by_email(&email.trim().to_lowercase())
            .await?
            .ok_or(AppError::UserNotFound)?;

        let member = self.tenant_repo
            .add_member(executor, tenant_id, user.id, role)
            .await?;

        tracing::info!(tenant_id = %tenant_id, user_id = %user.id, role = ?role, "Membro adicionado");
        Ok(member)
    }

    pub async fn list_members<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
    ) -> Result<Vec<TenantMember>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.tenant_repo.list_members(executor, tenant_id).await
    }
}
