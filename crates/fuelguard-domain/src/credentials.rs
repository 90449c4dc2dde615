use crate::device::DeviceCredential;
use crate::error::{DomainError, DomainResult};
use crate::repository::CredentialRepository;
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::{debug, info};

/// Claims embedded in a device token. No expiry by design: devices are
/// long-lived and revocation is the sole lifecycle control.
#[derive(Debug, Serialize, Deserialize)]
struct DeviceTokenClaims {
    sub: String,
    org: String,
    purpose: String,
    iat: i64,
    /// Random nonce so that rotation always mints a distinct token; the
    /// stored hash is what makes exactly one of them verify.
    jti: String,
}

const DEVICE_PURPOSE: &str = "device";

/// Identity recovered from a verified token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceIdentity {
    pub device_id: String,
    pub organization_id: String,
}

/// Issues, rotates, revokes, and verifies device tokens. Tokens are signed
/// HS256 JWTs; only the SHA-256 hash of a token is persisted. Verification is
/// the single authorization gate for device-originated command traffic.
pub struct CredentialService {
    repository: Arc<dyn CredentialRepository>,
    secret: String,
}

impl CredentialService {
    pub fn new(repository: Arc<dyn CredentialRepository>, secret: String) -> Self {
        Self { repository, secret }
    }

    /// Issue a fresh token and store its hash with `revoked = false`.
    /// The returned plaintext is shown once and never retrievable again.
    pub async fn issue(&self, device_id: &str, organization_id: &str) -> DomainResult<String> {
        let token = self.sign(device_id, organization_id)?;

        self.repository
            .upsert_credential(DeviceCredential {
                device_id: device_id.to_string(),
                token_hash: hash_token(&token),
                created_at: Utc::now(),
                revoked: false,
                revoked_at: None,
            })
            .await?;

        info!(device_id = %device_id, "issued device credentials");
        Ok(token)
    }

    /// Same as issue; overwriting the stored hash makes the previous token
    /// fail verification by hash mismatch even though it is never flagged
    /// revoked itself.
    pub async fn rotate(&self, device_id: &str, organization_id: &str) -> DomainResult<String> {
        let token = self.issue(device_id, organization_id).await?;
        info!(device_id = %device_id, "rotated device credentials");
        Ok(token)
    }

    /// Revoke the device's credential; all subsequent verifications fail
    /// regardless of hash match.
    pub async fn revoke(&self, device_id: &str) -> DomainResult<()> {
        let found = self
            .repository
            .revoke_credential(device_id, Utc::now())
            .await?;
        if !found {
            return Err(DomainError::DeviceNotFound(device_id.to_string()));
        }
        info!(device_id = %device_id, "revoked device credentials");
        Ok(())
    }

    /// Verify a presented token. Invalid when the signature or structure is
    /// bad, the purpose claim is wrong, no credential row exists, the row is
    /// revoked, or the stored hash does not match.
    pub async fn verify(&self, token: &str) -> DomainResult<DeviceIdentity> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        let data = decode::<DeviceTokenClaims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        )
        .map_err(|e| DomainError::InvalidToken(e.to_string()))?;

        let claims = data.claims;
        if claims.purpose != DEVICE_PURPOSE {
            return Err(DomainError::InvalidToken(format!(
                "unexpected purpose claim: {}",
                claims.purpose
            )));
        }

        let credential = self
            .repository
            .get_credential(&claims.sub)
            .await?
            .ok_or_else(|| DomainError::InvalidToken("no credential on record".to_string()))?;

        if credential.revoked {
            return Err(DomainError::CredentialRevoked(claims.sub));
        }

        if !constant_time_eq(hash_token(token).as_bytes(), credential.token_hash.as_bytes()) {
            return Err(DomainError::InvalidToken(
                "token does not match stored credential".to_string(),
            ));
        }

        debug!(device_id = %claims.sub, "device token verified");
        Ok(DeviceIdentity {
            device_id: claims.sub,
            organization_id: claims.org,
        })
    }

    fn sign(&self, device_id: &str, organization_id: &str) -> DomainResult<String> {
        let mut nonce = [0u8; 8];
        rand::Rng::fill(&mut rand::thread_rng(), &mut nonce);

        let claims = DeviceTokenClaims {
            sub: device_id.to_string(),
            org: organization_id.to_string(),
            purpose: DEVICE_PURPOSE.to_string(),
            iat: Utc::now().timestamp(),
            jti: hex::encode(nonce),
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| DomainError::InvalidToken(format!("token signing failed: {}", e)))
    }
}

fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
