use crate::payload::PayloadError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("invalid payload: {0}")]
    InvalidPayload(#[from] PayloadError),

    #[error("device not found: {0}")]
    DeviceNotFound(String),

    #[error("device not assigned to a vehicle: {0}")]
    DeviceUnassigned(String),

    #[error("vehicle not found: {0}")]
    VehicleNotFound(String),

    #[error("alert not found: {0}")]
    AlertNotFound(String),

    #[error("invalid device token: {0}")]
    InvalidToken(String),

    #[error("credentials revoked for device: {0}")]
    CredentialRevoked(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("notification error: {0}")]
    NotificationError(String),

    #[error("repository error: {0}")]
    RepositoryError(#[from] anyhow::Error),
}

pub type DomainResult<T> = Result<T, DomainError>;
