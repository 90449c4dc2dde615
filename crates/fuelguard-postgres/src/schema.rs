use crate::client::PostgresClient;
use anyhow::{Context, Result};
use tracing::info;

const INIT_SQL: &str = include_str!("../migrations/00001_init.sql");

/// Apply the embedded schema. Every statement is `IF NOT EXISTS`, so the
/// call is idempotent and safe on every startup.
pub async fn ensure_schema(client: &PostgresClient) -> Result<()> {
    let conn = client.get_connection().await?;
    conn.batch_execute(INIT_SQL)
        .await
        .context("failed to apply database schema")?;
    info!("database schema ensured");
    Ok(())
}
