pub mod alert_repository;
pub mod client;
pub mod credential_repository;
pub mod device_repository;
pub mod reading_repository;
pub mod schema;
pub mod vehicle_repository;

pub use alert_repository::PostgresAlertRepository;
pub use client::PostgresClient;
pub use credential_repository::PostgresCredentialRepository;
pub use device_repository::PostgresDeviceRepository;
pub use reading_repository::PostgresReadingRepository;
pub use vehicle_repository::PostgresVehicleRepository;
