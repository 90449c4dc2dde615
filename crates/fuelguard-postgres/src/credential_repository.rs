use crate::client::PostgresClient;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fuelguard_domain::{CredentialRepository, DeviceCredential, DomainError, DomainResult};
use tracing::instrument;

/// PostgreSQL implementation of CredentialRepository. Every operation is a
/// single statement, so concurrent rotate/revoke/verify for the same device
/// observe before-or-after state, never a torn row.
#[derive(Clone)]
pub struct PostgresCredentialRepository {
    client: PostgresClient,
}

impl PostgresCredentialRepository {
    pub fn new(client: PostgresClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl CredentialRepository for PostgresCredentialRepository {
    #[instrument(skip(self, credential), fields(device_id = %credential.device_id))]
    async fn upsert_credential(&self, credential: DeviceCredential) -> DomainResult<()> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::RepositoryError)?;

        conn.execute(
            "INSERT INTO device_credentials (device_id, token_hash, created_at, revoked, revoked_at) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (device_id) DO UPDATE SET \
                 token_hash = EXCLUDED.token_hash, \
                 created_at = EXCLUDED.created_at, \
                 revoked = EXCLUDED.revoked, \
                 revoked_at = EXCLUDED.revoked_at",
            &[
                &credential.device_id,
                &credential.token_hash,
                &credential.created_at,
                &credential.revoked,
                &credential.revoked_at,
            ],
        )
        .await
        .map_err(|e| DomainError::RepositoryError(e.into()))?;

        Ok(())
    }

    async fn get_credential(&self, device_id: &str) -> DomainResult<Option<DeviceCredential>> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::RepositoryError)?;

        let row = conn
            .query_opt(
                "SELECT device_id, token_hash, created_at, revoked, revoked_at \
                 FROM device_credentials WHERE device_id = $1",
                &[&device_id],
            )
            .await
            .map_err(|e| DomainError::RepositoryError(e.into()))?;

        Ok(row.map(|row| DeviceCredential {
            device_id: row.get(0),
            token_hash: row.get(1),
            created_at: row.get(2),
            revoked: row.get(3),
            revoked_at: row.get(4),
        }))
    }

    async fn revoke_credential(
        &self,
        device_id: &str,
        revoked_at: DateTime<Utc>,
    ) -> DomainResult<bool> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::RepositoryError)?;

        let updated = conn
            .execute(
                "UPDATE device_credentials SET revoked = TRUE, revoked_at = $2 \
                 WHERE device_id = $1",
                &[&device_id, &revoked_at],
            )
            .await
            .map_err(|e| DomainError::RepositoryError(e.into()))?;

        Ok(updated > 0)
    }
}
