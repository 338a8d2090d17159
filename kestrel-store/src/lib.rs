pub mod app_config;
pub mod database;
pub mod inventory_repo;
pub mod booking_repo;
pub mod passenger_repo;
pub mod memory;

pub use database::DbClient;
pub use inventory_repo::PgInventoryStore;
pub use booking_repo::PgBookingStore;
pub use passenger_repo::PgPassengerStore;
pub use memory::InMemoryRecords;
