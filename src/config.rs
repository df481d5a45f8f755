// src/config.rs

use std::{env, sync::Arc, time::Duration};

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    common::{db_utils::reset_rls_settings, i18n::I18nStore},
    db::{
        BillingRepository, CashRepository, DashboardRepository, InventoryRepository,
        RbacRepository, SalesRepository, ServiceOrderRepository, SettingsRepository,
        TenantRepository, UserRepository,
    },
    services::{
        auth::AuthService, billing_service::BillingService, cash_service::CashService,
        dashboard_service::DashboardService, document_service::DocumentService,
        export_service::ExportService, inventory_service::InventoryService,
        receipt_service::ReceiptService, sales_service::SalesService,
        service_order_service::ServiceOrderService, tenancy_service::TenantService,
    },
};

/// Configuração lida do ambiente (`.env` em desenvolvimento).
#[derive(Debug, Clone)]
pub struct Settings {
    pub database_url: String,
    pub jwt_secret: String,
    pub server_addr: String,
    pub db_max_connections: u32,
    pub fonts_dir: String,
}

impl Settings {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL").context("DATABASE_URL deve ser definida")?;
        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET deve ser definido")?;
        let server_addr = env::var("SERVER_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let db_max_connections = match env::var("DB_MAX_CONNECTIONS") {
            Ok(value) => value
                .parse()
                .with_context(|| format!("DB_MAX_CONNECTIONS inválido: {}", value))?,
            Err(_) => 5,
        };
        let fonts_dir = env::var("FONTS_DIR").unwrap_or_else(|_| "./fonts".to_string());

        Ok(Self { database_url, jwt_secret, server_addr, db_max_connections, fonts_dir })
    }
}

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub jwt_secret: String,
    pub i18n_store: Arc<I18nStore>,

    // Repositórios usados direto pelos guards e handlers simples
    pub tenant_repo: TenantRepository,
    pub rbac_repo: RbacRepository,
    pub settings_repo: SettingsRepository,

    pub auth_service: AuthService,
    pub tenant_service: TenantService,
    pub inventory_service: InventoryService,
    pub cash_service: CashService,
    pub sales_service: SalesService,
    pub service_order_service: ServiceOrderService,
    pub billing_service: BillingService,
    pub dashboard_service: DashboardService,
    pub export_service: ExportService,
    pub receipt_service: ReceiptService,
    pub document_service: DocumentService,
}

impl AppState {
    pub async fn new(settings: &Settings) -> anyhow::Result<Self> {
        let db_pool = PgPoolOptions::new()
            .max_connections(settings.db_max_connections)
            .acquire_timeout(Duration::from_secs(3))
            // As variáveis RLS são por sessão: limpamos antes de devolver a conexão
            .after_release(|conn, _meta| {
                Box::pin(async move {
                    match reset_rls_settings(conn).await {
                        Ok(()) => Ok(true),
                        Err(e) => {
                            tracing::warn!("Descartando conexão, falha ao limpar RLS: {:?}", e);
                            Ok(false)
                        }
                    }
                })
            })
            .connect(&settings.database_url)
            .await
            .context("Falha ao conectar ao banco de dados")?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        Ok(Self::from_pool(db_pool, settings))
    }

    /// Monta o gráfico de dependências sobre uma pool já criada.
    pub fn from_pool(db_pool: PgPool, settings: &Settings) -> Self {
        let user_repo = UserRepository::new(db_pool.clone());
        let tenant_repo = TenantRepository::new(db_pool.clone());
        let rbac_repo = RbacRepository::new(db_pool.clone());
        let settings_repo = SettingsRepository::new();
        let inventory_repo = InventoryRepository::new();
        let cash_repo = CashRepository::new();
        let sales_repo = SalesRepository::new();
        let service_order_repo = ServiceOrderRepository::new();
        let billing_repo = BillingRepository::new(db_pool.clone());
        let dashboard_repo = DashboardRepository::new();

        let auth_service = AuthService::new(user_repo.clone(), settings.jwt_secret.clone(), db_pool.clone());
        let tenant_service = TenantService::new(
            tenant_repo.clone(),
            user_repo,
            settings_repo.clone(),
            db_pool.clone(),
        );
        let inventory_service = InventoryService::new(inventory_repo.clone());
        let cash_service = CashService::new(cash_repo.clone());
        let sales_service = SalesService::new(
            sales_repo.clone(),
            inventory_repo.clone(),
            inventory_service.clone(),
            cash_service.clone(),
        );
        let service_order_service = ServiceOrderService::new(
            service_order_repo,
            inventory_repo.clone(),
            inventory_service.clone(),
            cash_service.clone(),
        );
        let billing_service = BillingService::new(billing_repo, db_pool.clone());
        let dashboard_service = DashboardService::new(dashboard_repo, cash_service.clone());
        let export_service = ExportService::new(inventory_repo, sales_repo, cash_repo);
        let receipt_service = ReceiptService::new(
            settings_repo.clone(),
            sales_service.clone(),
            service_order_service.clone(),
            cash_service.clone(),
        );
        let document_service = DocumentService::new(
            service_order_service.clone(),
            settings_repo.clone(),
            settings.fonts_dir.clone(),
        );

        Self {
            db_pool,
            jwt_secret: settings.jwt_secret.clone(),
            i18n_store: Arc::new(I18nStore::new()),
            tenant_repo,
            rbac_repo,
            settings_repo,
            auth_service,
            tenant_service,
            inventory_service,
            cash_service,
            sales_service,
            service_order_service,
            billing_service,
            dashboard_service,
            export_service,
            receipt_service,
            document_service,
        }
    }
}
