use async_trait::async_trait;
use chrono::NaiveDate;
use kestrel_shared::{FlightId, ReferenceId, TicketNumber, UserId};
use std::error::Error;

use crate::models::{Booking, BookingStatus, FlightAvailability, NewBooking, NewPassenger, Passenger, PassengerStatus};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Storage backend error: {0}")]
    Backend(#[source] Box<dyn Error + Send + Sync>),
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
    #[error("Constraint violated: {0}")]
    Constraint(String),
    #[error("Corrupt record: {0}")]
    Corrupt(String),
}

impl StoreError {
    pub fn backend(err: impl Error + Send + Sync + 'static) -> Self {
        StoreError::Backend(Box::new(err))
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Result of an atomic conditional seat decrement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReserveOutcome {
    Reserved { remaining: u32 },
    Insufficient { available: u32 },
    NotFound,
}

/// Access to the per-(flight, date) seat counters.
///
/// `reserve_atomic` and `release` must each be a single atomic operation on
/// the stored counter; two racing reservations must never both succeed when
/// only one fits.
#[async_trait]
pub trait InventoryStore: Send + Sync {
    async fn lookup(
        &self,
        flight_id: &FlightId,
        date: NaiveDate,
    ) -> StoreResult<Option<FlightAvailability>>;

    async fn reserve_atomic(
        &self,
        flight_id: &FlightId,
        date: NaiveDate,
        seats: u32,
    ) -> StoreResult<ReserveOutcome>;

    /// Returns the new seat count, or `None` when the row does not exist
    async fn release(
        &self,
        flight_id: &FlightId,
        date: NaiveDate,
        seats: u32,
    ) -> StoreResult<Option<u32>>;
}

#[async_trait]
pub trait BookingStore: Send + Sync {
    async fn create(&self, booking: &NewBooking) -> StoreResult<Booking>;

    async fn get(&self, reference_id: ReferenceId) -> StoreResult<Option<Booking>>;

    /// Applies a legal status transition. Returns `false` when the row is
    /// missing or already past the requested status.
    async fn set_status(&self, reference_id: ReferenceId, status: BookingStatus) -> StoreResult<bool>;

    async fn list_by_user(&self, user_id: UserId) -> StoreResult<Vec<Booking>>;

    /// Deletes a booking and its passengers; only used to undo a failed create
    async fn remove(&self, reference_id: ReferenceId) -> StoreResult<()>;

    /// Puts a cancelled booking back to Booked. Only used to undo a
    /// cancellation whose seats were never released; returns `false` when
    /// the booking is not cancelled.
    async fn reinstate(&self, reference_id: ReferenceId) -> StoreResult<bool>;
}

#[async_trait]
pub trait PassengerStore: Send + Sync {
    /// Inserts every passenger or none of them
    async fn create_batch(
        &self,
        reference_id: ReferenceId,
        passengers: &[NewPassenger],
    ) -> StoreResult<Vec<Passenger>>;

    async fn get(&self, ticket_number: TicketNumber) -> StoreResult<Option<Passenger>>;

    /// Same contract as [`BookingStore::set_status`]
    async fn set_status(&self, ticket_number: TicketNumber, status: PassengerStatus) -> StoreResult<bool>;

    async fn list_by_reference(&self, reference_id: ReferenceId) -> StoreResult<Vec<Passenger>>;

    async fn count_cancelled_by_reference(&self, reference_id: ReferenceId) -> StoreResult<u32>;

    /// Same contract as [`BookingStore::reinstate`]
    async fn reinstate(&self, ticket_number: TicketNumber) -> StoreResult<bool>;
}
