use crate::common::error::AppError;
use crate::config::AppState;
use crate::middleware::auth::AuthenticatedUser;
use crate::middleware::tenancy::TenantContext;

// ---
// Helper RLS: A "Chave" para o Banco de Dados
// ---
/// Adquire uma conexão da pool e define as variáveis RLS (`app.tenant_id`, `app.user_id`).
/// A pool limpa as variáveis quando a conexão volta (ver `config.rs`).
pub(crate) async fn get_rls_connection(
    app_state: &AppState,
    tenant_ctx: &TenantContext,
    user: &AuthenticatedUser,
) -> Result<sqlx::pool::PoolConnection<sqlx::Postgres>, AppError> {
    let mut conn = app_state.db_pool.acquire().await?;

    sqlx::query("SELECT set_config('app.tenant_id', $1, false), set_config('app.user_id', $2, false)")
        .bind(tenant_ctx.0.to_string())
        .bind(user.0.id.to_string())
        .execute(&mut *conn)
        .await?;

    Ok(conn)
}

/// Limpa as variáveis RLS de uma conexão que está voltando para a pool.
pub(crate) async fn reset_rls_settings(conn: &mut sqlx::PgConnection) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT set_config('app.tenant_id', '', false), set_config('app.user_id', '', false)")
        .execute(conn)
        .await?;
    Ok(())
}
