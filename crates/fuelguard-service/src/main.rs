mod config;
mod notifier;
mod telemetry;

use config::ServiceConfig;
use fuelguard_domain::{
    CredentialService, DetectionEngine, DeviceRegistry, IngestionService, Notifier,
    RetentionService,
};
use fuelguard_mqtt::{MqttBridgeConfig, MqttIngestBridge};
use fuelguard_postgres::{
    schema, PostgresAlertRepository, PostgresClient, PostgresCredentialRepository,
    PostgresDeviceRepository, PostgresReadingRepository, PostgresVehicleRepository,
};
use notifier::LoggingNotifier;
use std::sync::Arc;
use std::time::Duration;
use telemetry::init_telemetry;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

#[tokio::main]
async fn main() {
    let config = match ServiceConfig::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    init_telemetry(&config.log_level);

    info!("Starting fuelguard service");
    debug!("Configuration: {:?}", config);

    if let Err(e) = run(config).await {
        error!(error = %e, "service failed");
        std::process::exit(1);
    }
}

async fn run(config: ServiceConfig) -> anyhow::Result<()> {
    // PostgreSQL initialization
    info!("Initializing PostgreSQL...");
    let postgres_client = PostgresClient::new(
        &config.postgres_host,
        config.postgres_port,
        &config.postgres_database,
        &config.postgres_username,
        &config.postgres_password,
        config.postgres_pool_size,
    )?;
    postgres_client.ping().await?;
    schema::ensure_schema(&postgres_client).await?;

    let readings = Arc::new(PostgresReadingRepository::new(postgres_client.clone()));
    let devices = Arc::new(PostgresDeviceRepository::new(postgres_client.clone()));
    let vehicles = Arc::new(PostgresVehicleRepository::new(postgres_client.clone()));
    let alerts = Arc::new(PostgresAlertRepository::new(postgres_client.clone()));
    let credentials_repo = Arc::new(PostgresCredentialRepository::new(postgres_client));

    // Domain services
    let notifier: Arc<dyn Notifier> = Arc::new(LoggingNotifier);
    let credentials = Arc::new(CredentialService::new(
        credentials_repo,
        config.device_token_secret.clone(),
    ));
    let registry = Arc::new(DeviceRegistry::new(devices.clone(), credentials));
    let detection = Arc::new(DetectionEngine::new(
        readings.clone(),
        alerts,
        devices,
        vehicles,
        notifier,
    ));
    let ingestion = Arc::new(IngestionService::new(
        registry,
        readings.clone(),
        detection,
    ));
    let retention = RetentionService::new(
        readings,
        config.retention_days,
        config.retention_batch_limit,
    );

    let shutdown_token = CancellationToken::new();

    // MQTT ingest bridge
    let bridge = MqttIngestBridge::new(
        MqttBridgeConfig {
            broker_host: config.mqtt_host.clone(),
            broker_port: config.mqtt_port,
            client_id: config.mqtt_client_id.clone(),
            keep_alive_secs: config.mqtt_keep_alive_secs,
            reconnect_delay_secs: config.mqtt_reconnect_delay_secs,
            shards: config.ingest_shards,
            queue_depth: config.ingest_queue_depth,
        },
        ingestion,
    );
    let bridge_handle = tokio::spawn(bridge.run(shutdown_token.clone()));

    // Periodic retention sweep
    let retention_handle = tokio::spawn(run_retention_loop(
        retention,
        Duration::from_secs(config.retention_interval_secs),
        shutdown_token.clone(),
    ));

    wait_for_shutdown_signal().await;
    info!("shutdown signal received, stopping");
    shutdown_token.cancel();

    if let Err(e) = bridge_handle.await {
        error!(error = %e, "MQTT bridge task panicked");
    }
    if let Err(e) = retention_handle.await {
        error!(error = %e, "retention task panicked");
    }

    info!("fuelguard service stopped");
    Ok(())
}

async fn run_retention_loop(
    retention: RetentionService,
    interval: Duration,
    shutdown_token: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = shutdown_token.cancelled() => {
                debug!("retention loop stopped");
                break;
            }
            _ = ticker.tick() => {
                if let Err(e) = retention.run_once(fuelguard_domain::now_millis()).await {
                    error!(error = %e, "retention sweep failed");
                }
            }
        }
    }
}

async fn wait_for_shutdown_signal() {
    let mut sigterm = match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
    {
        Ok(signal) => signal,
        Err(e) => {
            error!(error = %e, "failed to install SIGTERM handler");
            let _ = tokio::signal::ctrl_c().await;
            return;
        }
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = sigterm.recv() => {}
    }
}
