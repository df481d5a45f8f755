// src/models/settings.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

/// Largura do papel da impressora de cupom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "paper_width", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaperWidth {
    Mm58,
    #[default]
    Mm80,
    A4,
}

impl PaperWidth {
    /// Largura útil da página (CSS).
    pub fn css_width(self) -> &'static str {
        match self {
            Self::Mm58 => "58mm",
            Self::Mm80 => "80mm",
            Self::A4 => "210mm",
        }
    }

    pub fn font_size(self) -> &'static str {
        match self {
            Self::Mm58 => "10px",
            Self::Mm80 => "12px",
            Self::A4 => "13px",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TenantSettings {
    #[schema(ignore)] // Ocultamos o ID interno, pois o contexto (Header) já define a loja
    pub tenant_id: Uuid,

    #[schema(example = "Assistência Técnica Central")]
    pub company_name: Option<String>,

    #[schema(example = "12.345.678/0001-99")]
    pub document_number: Option<String>,

    #[schema(example = "Rua das Flores, 123 - Centro")]
    pub address: Option<String>,

    #[schema(example = "(11) 99999-8888")]
    pub phone: Option<String>,

    #[schema(example = "https://minhaloja.com/assets/logo.png")]
    pub logo_url: Option<String>,

    #[schema(example = "12.345.678/0001-99")]
    pub pix_key: Option<String>,

    pub paper_width: PaperWidth,

    pub show_logo: bool,

    #[schema(example = "Obrigado pela preferência!")]
    pub receipt_footer: Option<String>,

    pub updated_at: Option<DateTime<Utc>>,
}

impl TenantSettings {
    pub fn empty(tenant_id: Uuid) -> Self {
        Self {
            tenant_id,
            company_name: None,
            document_number: None,
            address: None,
            phone: None,
            logo_url: None,
            pix_key: None,
            paper_width: PaperWidth::default(),
            show_logo: true,
            receipt_footer: None,
            updated_at: None,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSettingsRequest {
    #[schema(example = "Minha Nova Loja")]
    pub company_name: Option<String>,

    #[schema(example = "12.345.678/0001-99")]
    pub document_number: Option<String>,

    #[schema(example = "Av. Paulista, 1000")]
    pub address: Option<String>,

    pub phone: Option<String>,

    #[validate(url(message = "A URL do logo é inválida."))]
    pub logo_url: Option<String>,

    #[schema(example = "chave@pix.com.br")]
    pub pix_key: Option<String>,

    pub paper_width: Option<PaperWidth>,

    pub show_logo: Option<bool>,

    #[validate(length(max = 200, message = "O rodapé deve ter no máximo 200 caracteres."))]
    pub receipt_footer: Option<String>,
}
