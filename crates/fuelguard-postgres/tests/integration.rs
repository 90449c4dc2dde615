use fuelguard_domain::{
    Alert, AlertLocation, AlertQuery, AlertRepository, AlertStatus, AlertType, CredentialRepository,
    Device, DeviceConfiguration, DeviceCredential, DeviceHealthUpdate, DeviceRepository,
    HealthStatus, Location, NewFuelReading, ReadingRepository, ResolveAlertUpdate, SensorReadings,
    Severity, VehicleRepository, VehicleStatus,
};
use fuelguard_postgres::{
    schema, PostgresAlertRepository, PostgresClient, PostgresCredentialRepository,
    PostgresDeviceRepository, PostgresReadingRepository, PostgresVehicleRepository,
};
use testcontainers::runners::AsyncRunner;
use testcontainers_modules::postgres::Postgres;

async fn start_client() -> (testcontainers::ContainerAsync<Postgres>, PostgresClient) {
    let container = Postgres::default().start().await.unwrap();
    let host = container.get_host().await.unwrap();
    let port = container.get_host_port_ipv4(5432).await.unwrap();

    let client = PostgresClient::new(
        &host.to_string(),
        port,
        "postgres",
        "postgres",
        "postgres",
        5,
    )
    .unwrap();
    client.ping().await.unwrap();
    schema::ensure_schema(&client).await.unwrap();
    (container, client)
}

fn sensors(tamper: bool) -> SensorReadings {
    SensorReadings {
        ultrasonic_distance: 40.0,
        ultrasonic_valid: true,
        float_value: 500.0,
        float_valid: true,
        gps_fix: true,
        gps_satellites: 6,
        gps_speed: 5.0,
        tamper,
        battery: 3.9,
        signal_strength: 22,
    }
}

fn reading(timestamp: i64, liters: f64, percentage: f64) -> NewFuelReading {
    NewFuelReading {
        device_id: "dev_1".to_string(),
        vehicle_id: "veh-1".to_string(),
        organization_id: "org-a".to_string(),
        timestamp,
        fuel_liters: liters,
        fuel_percentage: percentage,
        location: Some(Location {
            lat: 9.0,
            lon: 38.7,
            speed: 5.0,
            satellites: 6,
        }),
        sensors: sensors(false),
    }
}

#[tokio::test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
async fn test_append_is_idempotent_on_device_and_timestamp() {
    let (_container, client) = start_client().await;
    let repo = PostgresReadingRepository::new(client);

    let first = repo.append(reading(1_000, 150.0, 75.0)).await.unwrap();
    let second = repo.append(reading(1_000, 150.0, 75.0)).await.unwrap();
    assert_eq!(first, second);

    let third = repo.append(reading(2_000, 149.0, 74.5)).await.unwrap();
    assert_ne!(first, third);
}

#[tokio::test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
async fn test_previous_before_is_strict() {
    let (_container, client) = start_client().await;
    let repo = PostgresReadingRepository::new(client);

    repo.append(reading(1_000, 150.0, 75.0)).await.unwrap();
    repo.append(reading(2_000, 140.0, 70.0)).await.unwrap();

    let previous = repo.previous_before("veh-1", 2_000).await.unwrap().unwrap();
    assert_eq!(previous.timestamp, 1_000);
    assert_eq!(previous.fuel_liters, 150.0);
    assert_eq!(previous.location.as_ref().unwrap().lat, 9.0);

    assert!(repo.previous_before("veh-1", 1_000).await.unwrap().is_none());
}

#[tokio::test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
async fn test_list_recent_is_org_scoped_and_newest_first() {
    let (_container, client) = start_client().await;
    let repo = PostgresReadingRepository::new(client);

    repo.append(reading(1_000, 150.0, 75.0)).await.unwrap();
    repo.append(reading(2_000, 149.0, 74.5)).await.unwrap();
    repo.append(reading(3_000, 148.0, 74.0)).await.unwrap();

    let recent = repo.list_recent("veh-1", "org-a", 2).await.unwrap();
    assert_eq!(recent.len(), 2);
    assert_eq!(recent[0].timestamp, 3_000);
    assert_eq!(recent[1].timestamp, 2_000);

    assert!(repo.list_recent("veh-1", "org-b", 10).await.unwrap().is_empty());
}

#[tokio::test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
async fn test_purge_older_than_is_bounded_and_idempotent() {
    let (_container, client) = start_client().await;
    let repo = PostgresReadingRepository::new(client);

    for i in 0..5 {
        repo.append(reading(1_000 + i, 150.0, 75.0)).await.unwrap();
    }

    assert_eq!(repo.purge_older_than(1_003, 2).await.unwrap(), 2);
    assert_eq!(repo.purge_older_than(1_003, 2).await.unwrap(), 1);
    assert_eq!(repo.purge_older_than(1_003, 2).await.unwrap(), 0);
}

#[tokio::test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
async fn test_device_lifecycle() {
    let (_container, client) = start_client().await;
    let repo = PostgresDeviceRepository::new(client);

    let now = chrono::Utc::now();
    let device = Device {
        device_id: "dev_1".to_string(),
        serial_number: "SN-1".to_string(),
        firmware_version: "1.0.0".to_string(),
        vehicle_id: Some("veh-1".to_string()),
        organization_id: "org-a".to_string(),
        health_status: HealthStatus::Offline,
        last_seen: 0,
        battery_level: 0.0,
        signal_strength: 0,
        configuration: DeviceConfiguration::default(),
        created_at: now,
        updated_at: now,
    };
    repo.create_device(device.clone()).await.unwrap();

    let fetched = repo.get_device("dev_1").await.unwrap().unwrap();
    assert_eq!(fetched.serial_number, "SN-1");
    assert_eq!(fetched.health_status, HealthStatus::Offline);
    assert_eq!(fetched.configuration, DeviceConfiguration::default());

    repo.update_health(DeviceHealthUpdate {
        device_id: "dev_1".to_string(),
        last_seen: 123_456,
        battery_level: 3.8,
        signal_strength: 19,
    })
    .await
    .unwrap();

    let fetched = repo.get_device("dev_1").await.unwrap().unwrap();
    assert_eq!(fetched.health_status, HealthStatus::Online);
    assert_eq!(fetched.last_seen, 123_456);

    repo.set_health_status("dev_1", HealthStatus::Error, None)
        .await
        .unwrap();
    let fetched = repo.get_device("dev_1").await.unwrap().unwrap();
    assert_eq!(fetched.health_status, HealthStatus::Error);
    assert_eq!(fetched.last_seen, 123_456);

    assert!(repo.create_device(device).await.is_err());
}

#[tokio::test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
async fn test_vehicle_status_round_trip() {
    let (_container, client) = start_client().await;

    // Vehicle rows are provisioned out of band; seed one directly.
    let conn = client.get_connection().await.unwrap();
    conn.execute(
        "INSERT INTO vehicles (vehicle_id, license_plate, make, model, year, \
         tank_capacity_liters, device_id, status, organization_id) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        &[
            &"veh-1",
            &"ABC-123",
            &"Isuzu",
            &"NPR",
            &2021i32,
            &200.0f64,
            &Some("dev_1".to_string()),
            &"offline",
            &"org-a",
        ],
    )
    .await
    .unwrap();
    drop(conn);

    let repo = PostgresVehicleRepository::new(client);

    let vehicle = repo.get_vehicle("veh-1").await.unwrap().unwrap();
    assert_eq!(vehicle.license_plate, "ABC-123");
    assert_eq!(vehicle.tank_capacity_liters, 200.0);
    assert_eq!(vehicle.status, VehicleStatus::Offline);

    repo.set_status("veh-1", VehicleStatus::Online, 123_456)
        .await
        .unwrap();
    let vehicle = repo.get_vehicle("veh-1").await.unwrap().unwrap();
    assert_eq!(vehicle.status, VehicleStatus::Online);

    assert!(repo.get_vehicle("veh-missing").await.unwrap().is_none());
}

#[tokio::test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
async fn test_credential_upsert_and_revoke() {
    let (_container, client) = start_client().await;
    let repo = PostgresCredentialRepository::new(client);

    let now = chrono::Utc::now();
    repo.upsert_credential(DeviceCredential {
        device_id: "dev_1".to_string(),
        token_hash: "hash-1".to_string(),
        created_at: now,
        revoked: false,
        revoked_at: None,
    })
    .await
    .unwrap();

    repo.upsert_credential(DeviceCredential {
        device_id: "dev_1".to_string(),
        token_hash: "hash-2".to_string(),
        created_at: now,
        revoked: false,
        revoked_at: None,
    })
    .await
    .unwrap();

    let credential = repo.get_credential("dev_1").await.unwrap().unwrap();
    assert_eq!(credential.token_hash, "hash-2");
    assert!(!credential.revoked);

    assert!(repo.revoke_credential("dev_1", now).await.unwrap());
    let credential = repo.get_credential("dev_1").await.unwrap().unwrap();
    assert!(credential.revoked);
    assert!(credential.revoked_at.is_some());

    assert!(!repo.revoke_credential("dev_missing", now).await.unwrap());
}

#[tokio::test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
async fn test_alert_create_query_resolve() {
    let (_container, client) = start_client().await;
    let repo = PostgresAlertRepository::new(client);

    let alert = Alert {
        alert_id: "alert-1".to_string(),
        vehicle_id: "veh-1".to_string(),
        device_id: "dev_1".to_string(),
        alert_type: AlertType::FuelTheft,
        fuel_loss_liters: 30.0,
        location: Some(AlertLocation { lat: 9.0, lon: 38.7 }),
        status: AlertStatus::Active,
        severity: Severity::High,
        detected_at: 1_000,
        resolved_at: None,
        resolved_by: None,
        notes: None,
        organization_id: "org-a".to_string(),
    };
    repo.create_alert(alert).await.unwrap();

    let listed = repo
        .list_alerts(AlertQuery {
            organization_id: "org-a".to_string(),
            vehicle_id: Some("veh-1".to_string()),
            status: Some(AlertStatus::Active),
            alert_type: None,
            limit: 10,
        })
        .await
        .unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].severity, Severity::High);

    let other_org = repo
        .list_alerts(AlertQuery {
            organization_id: "org-b".to_string(),
            vehicle_id: None,
            status: None,
            alert_type: None,
            limit: 10,
        })
        .await
        .unwrap();
    assert!(other_org.is_empty());

    repo.resolve_alert(ResolveAlertUpdate {
        alert_id: "alert-1".to_string(),
        status: AlertStatus::Resolved,
        resolved_at: 2_000,
        resolved_by: "user-7".to_string(),
        notes: Some("confirmed refuel".to_string()),
    })
    .await
    .unwrap();

    let fetched = repo.get_alert("alert-1").await.unwrap().unwrap();
    assert_eq!(fetched.status, AlertStatus::Resolved);
    assert_eq!(fetched.resolved_by.as_deref(), Some("user-7"));
}
