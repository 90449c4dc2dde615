use config::{Config, ConfigError, Environment};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Deserialize, Serialize, Clone)]
pub struct ServiceConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    // PostgreSQL configuration
    /// PostgreSQL host
    #[serde(default = "default_postgres_host")]
    pub postgres_host: String,

    /// PostgreSQL port
    #[serde(default = "default_postgres_port")]
    pub postgres_port: u16,

    /// PostgreSQL database name
    #[serde(default = "default_postgres_database")]
    pub postgres_database: String,

    /// PostgreSQL username
    #[serde(default = "default_postgres_username")]
    pub postgres_username: String,

    /// PostgreSQL password
    #[serde(default = "default_postgres_password")]
    pub postgres_password: String,

    /// Connection pool size
    #[serde(default = "default_postgres_pool_size")]
    pub postgres_pool_size: usize,

    // MQTT configuration
    /// MQTT broker host
    #[serde(default = "default_mqtt_host")]
    pub mqtt_host: String,

    /// MQTT broker port
    #[serde(default = "default_mqtt_port")]
    pub mqtt_port: u16,

    /// MQTT client identifier
    #[serde(default = "default_mqtt_client_id")]
    pub mqtt_client_id: String,

    /// MQTT keep-alive interval in seconds
    #[serde(default = "default_mqtt_keep_alive_secs")]
    pub mqtt_keep_alive_secs: u64,

    /// Delay before reconnecting after a broker failure, in seconds
    #[serde(default = "default_mqtt_reconnect_delay_secs")]
    pub mqtt_reconnect_delay_secs: u64,

    // Ingestion configuration
    /// Number of ingest worker shards
    #[serde(default = "default_ingest_shards")]
    pub ingest_shards: usize,

    /// Per-shard queue depth before messages are dropped
    #[serde(default = "default_ingest_queue_depth")]
    pub ingest_queue_depth: usize,

    // Credential configuration
    /// Device token signing secret (required for production)
    #[serde(default = "default_device_token_secret")]
    pub device_token_secret: String,

    // Retention configuration
    /// Days of readings to keep
    #[serde(default = "default_retention_days")]
    pub retention_days: i64,

    /// Rows deleted per retention batch
    #[serde(default = "default_retention_batch_limit")]
    pub retention_batch_limit: i64,

    /// Seconds between retention sweeps
    #[serde(default = "default_retention_interval_secs")]
    pub retention_interval_secs: u64,
}

/// Secrets never land in logs; startup dumps the whole config at debug level.
impl fmt::Debug for ServiceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceConfig")
            .field("log_level", &self.log_level)
            .field("postgres_host", &self.postgres_host)
            .field("postgres_port", &self.postgres_port)
            .field("postgres_database", &self.postgres_database)
            .field("postgres_username", &self.postgres_username)
            .field("postgres_password", &"<redacted>")
            .field("postgres_pool_size", &self.postgres_pool_size)
            .field("mqtt_host", &self.mqtt_host)
            .field("mqtt_port", &self.mqtt_port)
            .field("mqtt_client_id", &self.mqtt_client_id)
            .field("mqtt_keep_alive_secs", &self.mqtt_keep_alive_secs)
            .field("mqtt_reconnect_delay_secs", &self.mqtt_reconnect_delay_secs)
            .field("ingest_shards", &self.ingest_shards)
            .field("ingest_queue_depth", &self.ingest_queue_depth)
            .field("device_token_secret", &"<redacted>")
            .field("retention_days", &self.retention_days)
            .field("retention_batch_limit", &self.retention_batch_limit)
            .field("retention_interval_secs", &self.retention_interval_secs)
            .finish()
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

// PostgreSQL defaults
fn default_postgres_host() -> String {
    "localhost".to_string()
}

fn default_postgres_port() -> u16 {
    5432
}

fn default_postgres_database() -> String {
    "fuelguard".to_string()
}

fn default_postgres_username() -> String {
    "fuelguard".to_string()
}

fn default_postgres_password() -> String {
    "fuelguard".to_string()
}

fn default_postgres_pool_size() -> usize {
    5
}

// MQTT defaults
fn default_mqtt_host() -> String {
    "localhost".to_string()
}

fn default_mqtt_port() -> u16 {
    1883
}

fn default_mqtt_client_id() -> String {
    "fuelguard-ingest".to_string()
}

fn default_mqtt_keep_alive_secs() -> u64 {
    30
}

fn default_mqtt_reconnect_delay_secs() -> u64 {
    5
}

// Ingestion defaults
fn default_ingest_shards() -> usize {
    8
}

fn default_ingest_queue_depth() -> usize {
    256
}

// Credential defaults
fn default_device_token_secret() -> String {
    "change-me-in-production".to_string()
}

// Retention defaults
fn default_retention_days() -> i64 {
    30
}

fn default_retention_batch_limit() -> i64 {
    5_000
}

fn default_retention_interval_secs() -> u64 {
    3_600
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(Environment::with_prefix("FUELGUARD"))
            .build()?
            .try_deserialize()
    }
}
