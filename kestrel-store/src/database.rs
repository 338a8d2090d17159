use kestrel_core::StoreError;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};
use std::time::Duration;
use tracing::info;

use crate::app_config::DatabaseConfig;
use crate::{PgBookingStore, PgInventoryStore, PgPassengerStore};

#[derive(Clone)]
pub struct DbClient {
    pub pool: Pool<Postgres>,
}

impl DbClient {
    pub async fn new(config: &DatabaseConfig) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_seconds))
            .connect(&config.url)
            .await?;

        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        info!("Running database migrations...");
        sqlx::migrate!("../migrations").run(&self.pool).await?;
        info!("Migrations completed successfully.");
        Ok(())
    }

    pub fn inventory_store(&self) -> PgInventoryStore {
        PgInventoryStore::new(self.pool.clone())
    }

    pub fn booking_store(&self) -> PgBookingStore {
        PgBookingStore::new(self.pool.clone())
    }

    pub fn passenger_store(&self) -> PgPassengerStore {
        PgPassengerStore::new(self.pool.clone())
    }
}

/// Classify a driver error for the storage layer
pub(crate) fn db_error(err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if db.constraint().is_some() => StoreError::Constraint(db.message().to_string()),
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => StoreError::Unavailable(err.to_string()),
        _ => StoreError::backend(err),
    }
}

pub(crate) fn to_i32(value: u32, field: &str) -> Result<i32, StoreError> {
    i32::try_from(value).map_err(|_| StoreError::Constraint(format!("{} out of range: {}", field, value)))
}

pub(crate) fn to_u32(value: i32, field: &str) -> Result<u32, StoreError> {
    u32::try_from(value).map_err(|_| StoreError::Corrupt(format!("negative {}: {}", field, value)))
}
