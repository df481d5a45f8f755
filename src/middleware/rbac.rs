// src/middleware/rbac.rs

use axum::{
    extract::{FromRequestParts, FromRef},
    http::request::Parts,
};
use serde::Serialize;
use std::marker::PhantomData;
use utoipa::ToSchema;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::{auth::AuthenticatedUser, tenancy::TenantContext},
};

/// 1. O Trait que define o que é uma Permissão
pub trait PermissionDef: Send + Sync + 'static {
    fn slug() -> &'static str;
}

/// Entrada do catálogo de permissões (GET /api/permissions).
#[derive(Debug, Clone, Copy, Serialize, ToSchema)]
pub struct PermissionInfo {
    pub slug: &'static str,
    pub description: &'static str,
}

inventory::collect!(PermissionInfo);

/// Todas as permissões declaradas, em ordem de slug.
pub fn all_permissions() -> Vec<PermissionInfo> {
    let mut permissions: Vec<PermissionInfo> = inventory::iter::<PermissionInfo>
        .into_iter()
        .copied()
        .collect();
    permissions.sort_by_key(|p| p.slug);
    permissions
}

/// 2. O Extractor (Guardião)
pub struct RequirePermission<T>(pub PhantomData<T>);

impl<T, S> FromRequestParts<S> for RequirePermission<T>
where
    T: PermissionDef,
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);

        // A. Usuário e loja vêm do tenant_guard
        let user = parts
            .extensions
            .get::<AuthenticatedUser>()
            .ok_or(AppError::InvalidToken)?;

        let tenant = parts
            .extensions
            .get::<TenantContext>()
            .ok_or(AppError::InvalidTenantHeader)?;

        // B. Verifica no banco pelo cargo do membro
        let required_perm = T::slug();
        let has_permission = app_state
            .rbac_repo
            .user_has_permission(user.0.id, tenant.0, required_perm)
            .await?;

        if !has_permission {
            return Err(AppError::PermissionDenied(required_perm.to_string()));
        }

        Ok(RequirePermission(PhantomData))
    }
}

// ---
// DEFINIÇÃO DAS PERMISSÕES (TIPOS)
// ---

macro_rules! permission {
    ($name:ident, $slug:literal, $description:literal) => {
        pub struct $name;
        impl PermissionDef for $name {
            fn slug() -> &'static str { $slug }
        }
        inventory::submit! {
            PermissionInfo { slug: $slug, description: $description }
        }
    };
}

permission!(PermInventoryRead, "inventory:read", "Consultar produtos e movimentações de estoque");
permission!(PermInventoryWrite, "inventory:write", "Cadastrar produtos e lançar movimentações de estoque");
permission!(PermCashOperate, "cash:operate", "Abrir o caixa, lançar suprimentos e sangrias");
permission!(PermCashManage, "cash:manage", "Fechar o caixa e consultar sessões anteriores");
permission!(PermSalesWrite, "sales:write", "Registrar vendas");
permission!(PermSalesCancel, "sales:cancel", "Cancelar vendas");
permission!(PermServiceOrdersWrite, "service_orders:write", "Abrir e atualizar ordens de serviço");
permission!(PermSettingsWrite, "settings:write", "Alterar dados da empresa e impressão");
permission!(PermMembersWrite, "members:write", "Adicionar membros à empresa");
permission!(PermBillingWrite, "billing:write", "Alterar a assinatura da empresa");
permission!(PermReportsRead, "reports:read", "Ver painel e exportar relatórios");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_lists_every_declared_permission_once() {
        let permissions = all_permissions();
        let slugs: Vec<&str> = permissions.iter().map(|p| p.slug).collect();

        assert_eq!(slugs.len(), 11);
        assert!(slugs.contains(&PermCashOperate::slug()));
        assert!(slugs.contains(&PermSalesCancel::slug()));
        assert!(slugs.windows(2).all(|w| w[0] < w[1]));
    }
}
