use chrono::NaiveDate;
use kestrel_core::validation::require_reference;
use kestrel_core::{
    BookingAggregate, BookingRequest, BookingStore, CancelPassengersRequest, CoreError, CoreResult,
    FlightAvailability, InventoryStore, Passenger, PassengerStore,
};
use kestrel_inventory::SeatLedger;
use kestrel_shared::{FlightId, ReferenceId, UserId};
use std::sync::Arc;

use crate::{BookingOrchestrator, BookingQueries, PassengerCancellationOrchestrator};

/// Entry point for callers outside the engine. Accepts raw, possibly
/// incomplete identifiers and reports missing ones as validation errors.
#[derive(Clone)]
pub struct BookingService {
    ledger: SeatLedger,
    bookings: BookingOrchestrator,
    cancellations: PassengerCancellationOrchestrator,
    queries: BookingQueries,
}

impl BookingService {
    pub fn new(
        inventory: Arc<dyn InventoryStore>,
        bookings: Arc<dyn BookingStore>,
        passengers: Arc<dyn PassengerStore>,
    ) -> Self {
        let ledger = SeatLedger::new(inventory);
        Self {
            bookings: BookingOrchestrator::new(ledger.clone(), bookings.clone(), passengers.clone()),
            cancellations: PassengerCancellationOrchestrator::new(ledger.clone(), bookings.clone(), passengers.clone()),
            queries: BookingQueries::new(bookings, passengers),
            ledger,
        }
    }

    /// get-bookings-for-user
    pub async fn get_bookings_for_user(&self, user_id: Option<UserId>) -> CoreResult<Vec<BookingAggregate>> {
        let user_id = user_id.ok_or_else(|| CoreError::validation("User id is missing"))?;
        self.queries.bookings_for_user(user_id).await
    }

    /// save-booking
    pub async fn save_booking(&self, request: &BookingRequest) -> CoreResult<BookingAggregate> {
        self.bookings.create_booking(request).await
    }

    /// cancel-booking
    pub async fn cancel_booking(&self, reference_id: Option<ReferenceId>) -> CoreResult<BookingAggregate> {
        self.bookings.cancel_booking(require_reference(reference_id)?).await
    }

    /// get-booking-by-reference
    pub async fn get_booking_by_reference(&self, reference_id: Option<ReferenceId>) -> CoreResult<BookingAggregate> {
        self.queries.booking_by_reference(require_reference(reference_id)?).await
    }

    /// get-passengers-for-booking
    pub async fn get_passengers_for_booking(&self, reference_id: Option<ReferenceId>) -> CoreResult<Vec<Passenger>> {
        self.queries.passengers_for_booking(require_reference(reference_id)?).await
    }

    /// cancel-passengers-by-ticket
    pub async fn cancel_passengers_by_ticket(&self, request: &CancelPassengersRequest) -> CoreResult<BookingAggregate> {
        self.cancellations.cancel_passengers(request).await
    }

    pub async fn get_flight_availability(
        &self,
        flight_id: Option<FlightId>,
        date: Option<NaiveDate>,
    ) -> CoreResult<FlightAvailability> {
        let flight_id = flight_id
            .filter(|id| !id.is_blank())
            .ok_or_else(|| CoreError::validation("Flight id is missing"))?;
        let date = date.ok_or_else(|| CoreError::validation("Flight date is missing"))?;
        self.ledger.lookup(&flight_id, date).await
    }
}
