pub mod models;
pub mod repository;
pub mod validation;

use chrono::NaiveDate;
use kestrel_shared::FlightId;

pub use models::{
    Booking, BookingAggregate, BookingRequest, BookingStatus, CancelPassengersRequest,
    FlightAvailability, NewBooking, NewPassenger, Passenger, PassengerRequest, PassengerStatus,
};
pub use repository::{BookingStore, InventoryStore, PassengerStore, ReserveOutcome, StoreError, StoreResult};

/// Closed error taxonomy for every booking-engine operation.
/// Each variant is terminal for the request that produced it.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    ValidationError(String),
    #[error("Insufficient seats on {flight_id} {date}: requested {requested}, available {available}")]
    CapacityError {
        flight_id: FlightId,
        date: NaiveDate,
        requested: u32,
        available: u32,
    },
    #[error("Not found: {0}")]
    NotFoundError(String),
    #[error("Conflict: {0}")]
    ConflictError(String),
    #[error("Persistence failure: {0}")]
    PersistenceError(#[from] StoreError),
}

impl CoreError {
    pub fn validation(msg: impl Into<String>) -> Self {
        CoreError::ValidationError(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        CoreError::NotFoundError(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        CoreError::ConflictError(msg.into())
    }

    /// Short machine-readable kind, used by callers that map errors to their own surface.
    pub fn kind(&self) -> &'static str {
        match self {
            CoreError::ValidationError(_) => "VALIDATION",
            CoreError::CapacityError { .. } => "CAPACITY",
            CoreError::NotFoundError(_) => "NOT_FOUND",
            CoreError::ConflictError(_) => "CONFLICT",
            CoreError::PersistenceError(_) => "PERSISTENCE",
        }
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
