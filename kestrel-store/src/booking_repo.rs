use async_trait::async_trait;
use chrono::NaiveDate;
use kestrel_core::{Booking, BookingStatus, BookingStore, NewBooking, StoreError, StoreResult};
use kestrel_shared::{FlightId, ReferenceId, UserId};
use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::database::{db_error, to_i32, to_u32};

pub struct PgBookingStore {
    pool: PgPool,
}

impl PgBookingStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct BookingRow {
    reference_id: i64,
    user_id: i64,
    flight_id: String,
    flight_date: NaiveDate,
    status: String,
    booked_seats: i32,
    total_cost: Decimal,
}

impl BookingRow {
    fn into_model(self) -> StoreResult<Booking> {
        let status = BookingStatus::from_code(&self.status).ok_or_else(|| {
            StoreError::Corrupt(format!("booking {} has status {:?}", self.reference_id, self.status))
        })?;

        Ok(Booking {
            reference_id: ReferenceId(self.reference_id),
            user_id: UserId(self.user_id),
            flight_id: FlightId(self.flight_id),
            flight_date: self.flight_date,
            status,
            booked_seats: to_u32(self.booked_seats, "booked_seats")?,
            total_cost: self.total_cost,
        })
    }
}

const BOOKING_COLUMNS: &str =
    "reference_id, user_id, flight_id, flight_date, status, booked_seats, total_cost";

#[async_trait]
impl BookingStore for PgBookingStore {
    async fn create(&self, booking: &NewBooking) -> StoreResult<Booking> {
        let row = sqlx::query_as::<_, BookingRow>(&format!(
            r#"
            INSERT INTO bookings (user_id, flight_id, flight_date, status, booked_seats, total_cost)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {}
            "#,
            BOOKING_COLUMNS
        ))
        .bind(booking.user_id.0)
        .bind(booking.flight_id.as_str())
        .bind(booking.flight_date)
        .bind(BookingStatus::Booked.code())
        .bind(to_i32(booking.booked_seats, "booked_seats")?)
        .bind(booking.total_cost)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error)?;

        row.into_model()
    }

    async fn get(&self, reference_id: ReferenceId) -> StoreResult<Option<Booking>> {
        let row = sqlx::query_as::<_, BookingRow>(&format!(
            "SELECT {} FROM bookings WHERE reference_id = $1",
            BOOKING_COLUMNS
        ))
        .bind(reference_id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        row.map(BookingRow::into_model).transpose()
    }

    async fn set_status(&self, reference_id: ReferenceId, status: BookingStatus) -> StoreResult<bool> {
        let from = BookingStatus::Booked;
        if !from.can_transition_to(status) {
            return Ok(false);
        }

        let result = sqlx::query(
            "UPDATE bookings SET status = $2, updated_at = NOW() WHERE reference_id = $1 AND status = $3",
        )
        .bind(reference_id.0)
        .bind(status.code())
        .bind(from.code())
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(result.rows_affected() == 1)
    }

    async fn list_by_user(&self, user_id: UserId) -> StoreResult<Vec<Booking>> {
        let rows = sqlx::query_as::<_, BookingRow>(&format!(
            "SELECT {} FROM bookings WHERE user_id = $1 ORDER BY reference_id",
            BOOKING_COLUMNS
        ))
        .bind(user_id.0)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        rows.into_iter().map(BookingRow::into_model).collect()
    }

    async fn remove(&self, reference_id: ReferenceId) -> StoreResult<()> {
        // Passengers go with it through ON DELETE CASCADE.
        sqlx::query("DELETE FROM bookings WHERE reference_id = $1")
            .bind(reference_id.0)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(())
    }

    async fn reinstate(&self, reference_id: ReferenceId) -> StoreResult<bool> {
        let result = sqlx::query(
            "UPDATE bookings SET status = $2, updated_at = NOW() WHERE reference_id = $1 AND status = $3",
        )
        .bind(reference_id.0)
        .bind(BookingStatus::Booked.code())
        .bind(BookingStatus::Cancelled.code())
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(result.rows_affected() == 1)
    }
}
