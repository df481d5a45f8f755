// src/middleware/tenancy.rs

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap},
};
use uuid::Uuid;
use crate::common::error::AppError;

// O nome do nosso cabeçalho HTTP customizado
const TENANT_ID_HEADER: &str = "x-tenant-id";

// A empresa (tenant) em que o usuário está operando.
// Só é criado pelo `tenant_guard`, depois de conferir o vínculo.
#[derive(Debug, Clone)]
pub struct TenantContext(pub Uuid);

/// Lê e valida o cabeçalho X-Tenant-ID.
pub fn parse_tenant_header(headers: &HeaderMap) -> Result<Uuid, AppError> {
    headers
        .get(TENANT_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| Uuid::parse_str(value.trim()).ok())
        .ok_or(AppError::InvalidTenantHeader)
}

impl<S> FromRequestParts<S> for TenantContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<TenantContext>()
            .cloned()
            .ok_or(AppError::InvalidTenantHeader)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn header_must_be_a_uuid() {
        let id = Uuid::new_v4();
        let mut headers = HeaderMap::new();
        headers.insert(TENANT_ID_HEADER, HeaderValue::from_str(&id.to_string()).unwrap());
        assert_eq!(parse_tenant_header(&headers).unwrap(), id);

        headers.insert(TENANT_ID_HEADER, HeaderValue::from_static("loja-1"));
        assert!(matches!(parse_tenant_header(&headers), Err(AppError::InvalidTenantHeader)));
    }

    #[test]
    fn missing_header_is_rejected() {
        assert!(matches!(
            parse_tenant_header(&HeaderMap::new()),
            Err(AppError::InvalidTenantHeader)
        ));
    }
}
