use async_trait::async_trait;
use kestrel_core::{NewPassenger, Passenger, PassengerStatus, PassengerStore, StoreError, StoreResult};
use kestrel_shared::{Masked, ReferenceId, TicketNumber};
use sqlx::PgPool;
use tracing::debug;

use crate::database::{db_error, to_u32};

pub struct PgPassengerStore {
    pool: PgPool,
}

impl PgPassengerStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct PassengerRow {
    ticket_number: i64,
    reference_id: i64,
    name: String,
    age: i32,
    status: String,
}

impl PassengerRow {
    fn into_model(self) -> StoreResult<Passenger> {
        let status = PassengerStatus::from_code(&self.status).ok_or_else(|| {
            StoreError::Corrupt(format!("ticket {} has status {:?}", self.ticket_number, self.status))
        })?;

        Ok(Passenger {
            ticket_number: TicketNumber(self.ticket_number),
            reference_id: ReferenceId(self.reference_id),
            name: Masked(self.name),
            age: to_u32(self.age, "age")?,
            status,
        })
    }
}

#[async_trait]
impl PassengerStore for PgPassengerStore {
    async fn create_batch(
        &self,
        reference_id: ReferenceId,
        passengers: &[NewPassenger],
    ) -> StoreResult<Vec<Passenger>> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;
        let mut created = Vec::with_capacity(passengers.len());

        // Any failed insert drops `tx`, which rolls back the whole batch.
        for passenger in passengers {
            let age = i32::try_from(passenger.age)
                .map_err(|_| StoreError::Constraint(format!("age out of range: {}", passenger.age)))?;

            let row = sqlx::query_as::<_, PassengerRow>(
                r#"
                INSERT INTO passengers (reference_id, name, age, status)
                VALUES ($1, $2, $3, $4)
                RETURNING ticket_number, reference_id, name, age, status
                "#,
            )
            .bind(reference_id.0)
            .bind(passenger.name.inner().as_str())
            .bind(age)
            .bind(PassengerStatus::Booked.code())
            .fetch_one(&mut *tx)
            .await
            .map_err(db_error)?;

            created.push(row.into_model()?);
        }

        tx.commit().await.map_err(db_error)?;
        debug!(%reference_id, count = created.len(), "Passenger batch inserted");
        Ok(created)
    }

    async fn get(&self, ticket_number: TicketNumber) -> StoreResult<Option<Passenger>> {
        let row = sqlx::query_as::<_, PassengerRow>(
            "SELECT ticket_number, reference_id, name, age, status FROM passengers WHERE ticket_number = $1",
        )
        .bind(ticket_number.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        row.map(PassengerRow::into_model).transpose()
    }

    async fn set_status(&self, ticket_number: TicketNumber, status: PassengerStatus) -> StoreResult<bool> {
        let from = PassengerStatus::Booked;
        if !from.can_transition_to(status) {
            return Ok(false);
        }

        let result = sqlx::query(
            "UPDATE passengers SET status = $2, updated_at = NOW() WHERE ticket_number = $1 AND status = $3",
        )
        .bind(ticket_number.0)
        .bind(status.code())
        .bind(from.code())
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(result.rows_affected() == 1)
    }

    async fn list_by_reference(&self, reference_id: ReferenceId) -> StoreResult<Vec<Passenger>> {
        let rows = sqlx::query_as::<_, PassengerRow>(
            r#"
            SELECT ticket_number, reference_id, name, age, status
            FROM passengers
            WHERE reference_id = $1
            ORDER BY ticket_number
            "#,
        )
        .bind(reference_id.0)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        rows.into_iter().map(PassengerRow::into_model).collect()
    }

    async fn count_cancelled_by_reference(&self, reference_id: ReferenceId) -> StoreResult<u32> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM passengers WHERE reference_id = $1 AND status = $2",
        )
        .bind(reference_id.0)
        .bind(PassengerStatus::Cancelled.code())
        .fetch_one(&self.pool)
        .await
        .map_err(db_error)?;

        u32::try_from(count).map_err(|_| StoreError::Corrupt(format!("cancelled count {}", count)))
    }

    async fn reinstate(&self, ticket_number: TicketNumber) -> StoreResult<bool> {
        let result = sqlx::query(
            "UPDATE passengers SET status = $2, updated_at = NOW() WHERE ticket_number = $1 AND status = $3",
        )
        .bind(ticket_number.0)
        .bind(PassengerStatus::Booked.code())
        .bind(PassengerStatus::Cancelled.code())
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(result.rows_affected() == 1)
    }
}
