use async_trait::async_trait;
use chrono::NaiveDate;
use kestrel_core::{FlightAvailability, InventoryStore, ReserveOutcome, StoreError, StoreResult};
use kestrel_shared::FlightId;
use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::info;

use crate::database::{db_error, to_i32, to_u32};

pub struct PgInventoryStore {
    pool: PgPool,
}

impl PgInventoryStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the row for a flight date with a full cabin, or resize an
    /// existing one. Seats already sold stay sold; a capacity below them is
    /// rejected and the row is left unchanged.
    pub async fn upsert(&self, row: &FlightAvailability) -> StoreResult<FlightAvailability> {
        let stored = sqlx::query_as::<_, AvailabilityRow>(
            r#"
            INSERT INTO flight_availability AS fa (flight_id, flight_date, capacity, seats_available, cost_per_seat)
            VALUES ($1, $2, $3, $3, $4)
            ON CONFLICT (flight_id, flight_date) DO UPDATE
            SET capacity = EXCLUDED.capacity,
                seats_available = EXCLUDED.capacity - (fa.capacity - fa.seats_available),
                cost_per_seat = EXCLUDED.cost_per_seat
            WHERE EXCLUDED.capacity >= fa.capacity - fa.seats_available
            RETURNING flight_id, flight_date, capacity, seats_available, cost_per_seat
            "#,
        )
        .bind(row.flight_id.as_str())
        .bind(row.flight_date)
        .bind(to_i32(row.capacity, "capacity")?)
        .bind(row.cost_per_seat)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?
        .ok_or_else(|| {
            StoreError::Constraint(format!(
                "capacity {} is below the seats already sold on {} {}",
                row.capacity, row.flight_id, row.flight_date
            ))
        })?
        .into_model()?;

        info!(
            flight_id = %stored.flight_id,
            date = %stored.flight_date,
            capacity = stored.capacity,
            seats_available = stored.seats_available,
            "Availability seeded"
        );
        Ok(stored)
    }
}

#[derive(sqlx::FromRow)]
struct AvailabilityRow {
    flight_id: String,
    flight_date: NaiveDate,
    capacity: i32,
    seats_available: i32,
    cost_per_seat: Decimal,
}

impl AvailabilityRow {
    fn into_model(self) -> StoreResult<FlightAvailability> {
        Ok(FlightAvailability {
            flight_id: FlightId(self.flight_id),
            flight_date: self.flight_date,
            capacity: to_u32(self.capacity, "capacity")?,
            seats_available: to_u32(self.seats_available, "seats_available")?,
            cost_per_seat: self.cost_per_seat,
        })
    }
}

#[async_trait]
impl InventoryStore for PgInventoryStore {
    async fn lookup(
        &self,
        flight_id: &FlightId,
        date: NaiveDate,
    ) -> StoreResult<Option<FlightAvailability>> {
        let row = sqlx::query_as::<_, AvailabilityRow>(
            r#"
            SELECT flight_id, flight_date, capacity, seats_available, cost_per_seat
            FROM flight_availability
            WHERE flight_id = $1 AND flight_date = $2
            "#,
        )
        .bind(flight_id.as_str())
        .bind(date)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        row.map(AvailabilityRow::into_model).transpose()
    }

    async fn reserve_atomic(
        &self,
        flight_id: &FlightId,
        date: NaiveDate,
        seats: u32,
    ) -> StoreResult<ReserveOutcome> {
        // Check and decrement in one statement; the row lock serialises racing reservations.
        let remaining: Option<i32> = sqlx::query_scalar(
            r#"
            UPDATE flight_availability
            SET seats_available = seats_available - $3
            WHERE flight_id = $1 AND flight_date = $2 AND seats_available >= $3
            RETURNING seats_available
            "#,
        )
        .bind(flight_id.as_str())
        .bind(date)
        .bind(to_i32(seats, "seats")?)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        if let Some(remaining) = remaining {
            return Ok(ReserveOutcome::Reserved {
                remaining: to_u32(remaining, "seats_available")?,
            });
        }

        Ok(match self.lookup(flight_id, date).await? {
            Some(row) => ReserveOutcome::Insufficient {
                available: row.seats_available,
            },
            None => ReserveOutcome::NotFound,
        })
    }

    async fn release(
        &self,
        flight_id: &FlightId,
        date: NaiveDate,
        seats: u32,
    ) -> StoreResult<Option<u32>> {
        // seats_within_capacity rejects a release that would overfill the cabin.
        let available: Option<i32> = sqlx::query_scalar(
            r#"
            UPDATE flight_availability
            SET seats_available = seats_available + $3
            WHERE flight_id = $1 AND flight_date = $2
            RETURNING seats_available
            "#,
        )
        .bind(flight_id.as_str())
        .bind(date)
        .bind(to_i32(seats, "seats")?)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        available.map(|n| to_u32(n, "seats_available")).transpose()
    }
}
