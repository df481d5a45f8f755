use axum::{
    extract::{FromRequestParts, Request, State},
    http::{request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{authorization::Bearer, Authorization, HeaderMapExt};

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::tenancy::{parse_tenant_header, TenantContext},
    models::auth::User,
};

// Valida o "Authorization: Bearer <token>" e devolve o usuário dono do token
async fn authenticate(app_state: &AppState, headers: &HeaderMap) -> Result<User, AppError> {
    let bearer = headers
        .typed_get::<Authorization<Bearer>>()
        .ok_or(AppError::InvalidToken)?;

    app_state.auth_service.validate_token(bearer.token()).await
}

// Rotas de usuário: só exige o token
pub async fn auth_guard(
    State(app_state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let user = authenticate(&app_state, request.headers()).await?;

    // Insere o usuário nos "extensions" da requisição
    request.extensions_mut().insert(AuthenticatedUser(user));
    Ok(next.run(request).await)
}

// Rotas da loja: token + X-Tenant-ID + vínculo do usuário com a empresa
pub async fn tenant_guard(
    State(app_state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let user = authenticate(&app_state, request.headers()).await?;
    let tenant_id = parse_tenant_header(request.headers())?;

    let is_member = app_state
        .tenant_repo
        .check_user_tenancy(user.id, tenant_id)
        .await?;

    if !is_member {
        tracing::warn!(user_id = %user.id, tenant_id = %tenant_id, "Acesso negado à empresa");
        return Err(AppError::TenantAccessDenied);
    }

    request.extensions_mut().insert(AuthenticatedUser(user));
    request.extensions_mut().insert(TenantContext(tenant_id));
    Ok(next.run(request).await)
}

// Rotas da plataforma (planos, cupons, métricas): só super admin
pub async fn admin_guard(
    State(app_state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let user = authenticate(&app_state, request.headers()).await?;

    if !user.is_super_admin {
        return Err(AppError::PermissionDenied("platform:admin".into()));
    }

    request.extensions_mut().insert(AuthenticatedUser(user));
    Ok(next.run(request).await)
}

// Extrator para obter o usuário autenticado diretamente nos handlers
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or(AppError::InvalidToken)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request as HttpRequest;
    use chrono::Utc;
    use uuid::Uuid;

    fn user() -> User {
        User {
            id: Uuid::new_v4(),
            email: "caixa@loja.com".into(),
            password_hash: String::new(),
            full_name: Some("Operador".into()),
            is_super_admin: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn extractor_reads_user_inserted_by_guard() {
        let expected = user();
        let mut request = HttpRequest::builder().body(()).unwrap();
        request.extensions_mut().insert(AuthenticatedUser(expected.clone()));
        let (mut parts, _) = request.into_parts();

        let AuthenticatedUser(found) = AuthenticatedUser::from_request_parts(&mut parts, &())
            .await
            .unwrap();

        assert_eq!(found.id, expected.id);
    }

    #[tokio::test]
    async fn extractor_without_guard_is_unauthorized() {
        let (mut parts, _) = HttpRequest::builder().body(()).unwrap().into_parts();

        let err = AuthenticatedUser::from_request_parts(&mut parts, &())
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::InvalidToken));
    }
}
