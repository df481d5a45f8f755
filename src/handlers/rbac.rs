// src/handlers/rbac.rs

use axum::Json;

use crate::middleware::rbac::{all_permissions, PermissionInfo};

// GET /api/permissions (para o frontend montar a tela de cargos)
#[utoipa::path(
    get,
    path = "/api/permissions",
    tag = "RBAC",
    responses(
        (status = 200, description = "Permissões do sistema", body = Vec<PermissionInfo>)
    )
)]
pub async fn list_permissions() -> Json<Vec<PermissionInfo>> {
    Json(all_permissions())
}
