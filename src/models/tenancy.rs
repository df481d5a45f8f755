// src/models/tenancy.rs

use serde::{Serialize, Deserialize};
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;
use utoipa::ToSchema;

// ---
// 1. Tenant (A "Empresa")
// ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Tenant {
    pub id: Uuid,
    #[schema(example = "Assistência Técnica Central")]
    pub name: String,
    #[schema(example = "12.345.678/0001-99")]
    pub document_number: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ---
// 2. Cargo do membro dentro da empresa
// ---
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "member_role", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MemberRole {
    Owner,
    Manager,
    Cashier,
    Technician,
}

// ---
// 3. TenantMember (A "Ponte" Usuário-Empresa)
// ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TenantMember {
    pub user_id: Uuid,
    pub tenant_id: Uuid,
    pub role: MemberRole,
    pub created_at: DateTime<Utc>,
}
