use sqlx::{Executor, Postgres};
use uuid::Uuid;
use crate::{
    common::error::AppError,
    models::settings::{TenantSettings, UpdateSettingsRequest},
};

#[derive(Clone, Default)]
pub struct SettingsRepository;

impl SettingsRepository {
    pub fn new() -> Self {
        Self
    }

    pub async fn get_settings<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
    ) -> Result<TenantSettings, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        // Loja sem configuração ainda: tratamos "não encontrado" como vazio.
        let settings = sqlx::query_as::<_, TenantSettings>(
            "SELECT * FROM tenant_settings WHERE tenant_id = $1",
        )
            .bind(tenant_id)
            .fetch_optional(executor)
            .await?;

        Ok(settings.unwrap_or_else(|| TenantSettings::empty(tenant_id)))
    }

    pub async fn update_settings<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        input: &UpdateSettingsRequest,
    ) -> Result<TenantSettings, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        // UPSERT: campos ausentes mantêm o valor gravado
        let settings = sqlx::query_as::<_, TenantSettings>(
            r#"
            INSERT INTO tenant_settings
                (tenant_id, company_name, document_number, address, phone, logo_url, pix_key,
                 paper_width, show_logo, receipt_footer)
            VALUES ($1, $2, $3, $4, $5, $6, $7, COALESCE($8, 'MM80'::paper_width), COALESCE($9, TRUE), $10)
            ON CONFLICT (tenant_id)
            DO UPDATE SET
                company_name = COALESCE(EXCLUDED.company_name, tenant_settings.company_name),
                document_number = COALESCE(EXCLUDED.document_number, tenant_settings.document_number),
                address = COALESCE(EXCLUDED.address, tenant_settings.address),
                phone = COALESCE(EXCLUDED.phone, tenant_settings.phone),
                logo_url = COALESCE(EXCLUDED.logo_url, tenant_settings.logo_url),
                pix_key = COALESCE(EXCLUDED.pix_key, tenant_settings.pix_key),
                paper_width = COALESCE($8, tenant_settings.paper_width),
                show_logo = COALESCE($9, tenant_settings.show_logo),
                receipt_footer = COALESCE(EXCLUDED.receipt_footer, tenant_settings.receipt_footer),
                updated_at = NOW()
            RETURNING *
            "#,
        )
            .bind(tenant_id)
            .bind(input.company_name.as_deref())
            .bind(input.document_number.as_deref())
            .bind(input.address.as_deref())
            .bind(input.phone.as_deref())
            .bind(input.logo_url.as_deref())
            .bind(input.pix_key.as_deref())
            .bind(input.paper_width)
            .bind(input.show_logo)
            .bind(input.receipt_footer.as_deref())
            .fetch_one(executor)
            .await?;

        Ok(settings)
    }

    /// Configuração criada junto com a empresa (nome e documento iniciais).
    pub async fn init_settings<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        company_name: &str,
        document_number: Option<&str>,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            INSERT INTO tenant_settings (tenant_id, company_name, document_number)
            VALUES ($1, $2, $3)
            ON CONFLICT (tenant_id) DO NOTHING
            "#,
        )
            .bind(tenant_id)
            .bind(company_name)
            .bind(document_number)
            .execute(executor)
            .await?;

        Ok(())
    }
}
