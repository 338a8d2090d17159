use kestrel_core::validation::{validate_booking, BookingDraft};
use kestrel_core::{
    Booking, BookingAggregate, BookingRequest, BookingStatus, BookingStore, CoreError, CoreResult, NewBooking,
    PassengerStatus, PassengerStore,
};
use kestrel_inventory::SeatLedger;
use kestrel_shared::ReferenceId;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::queries::{booking_not_found, BookingQueries};
use crate::rollback::CancellationLog;

/// Creates bookings against the seat ledger and cancels them as a whole.
#[derive(Clone)]
pub struct BookingOrchestrator {
    ledger: SeatLedger,
    bookings: Arc<dyn BookingStore>,
    passengers: Arc<dyn PassengerStore>,
    queries: BookingQueries,
}

impl BookingOrchestrator {
    pub fn new(ledger: SeatLedger, bookings: Arc<dyn BookingStore>, passengers: Arc<dyn PassengerStore>) -> Self {
        let queries = BookingQueries::new(bookings.clone(), passengers.clone());
        Self {
            ledger,
            bookings,
            passengers,
            queries,
        }
    }

    /// Reserve seats and persist a booking with all of its passengers.
    ///
    /// All-or-nothing: if any write after the reservation fails, the seats are
    /// released and the booking row is removed before the error is returned.
    pub async fn create_booking(&self, request: &BookingRequest) -> CoreResult<BookingAggregate> {
        let draft = validate_booking(request).inspect_err(|e| warn!("Booking request rejected: {}", e))?;

        let availability = self.ledger.lookup(&draft.flight_id, draft.flight_date).await?;
        self.ledger
            .reserve(&draft.flight_id, draft.flight_date, draft.booked_seats)
            .await?;

        let total_cost = availability.cost_per_seat * Decimal::from(draft.booked_seats);
        if let Some(client_total) = request.total_cost.filter(|t| *t != total_cost) {
            debug!(%client_total, %total_cost, "Ignoring client-supplied total cost");
        }

        let new_booking = NewBooking {
            user_id: draft.user_id,
            flight_id: draft.flight_id.clone(),
            flight_date: draft.flight_date,
            booked_seats: draft.booked_seats,
            total_cost,
        };

        let booking = match self.bookings.create(&new_booking).await {
            Ok(booking) => booking,
            Err(e) => {
                error!("Failed to persist booking: {}", e);
                self.undo_create(&draft, None).await;
                return Err(e.into());
            }
        };

        let passengers = match self.passengers.create_batch(booking.reference_id, &draft.passengers).await {
            Ok(passengers) => passengers,
            Err(e) => {
                error!(reference_id = %booking.reference_id, "Failed to persist passengers: {}", e);
                self.undo_create(&draft, Some(booking.reference_id)).await;
                return Err(e.into());
            }
        };

        info!(
            reference_id = %booking.reference_id,
            user_id = %booking.user_id,
            flight_id = %booking.flight_id,
            date = %booking.flight_date,
            seats = booking.booked_seats,
            %total_cost,
            "Booking created"
        );

        Ok(BookingAggregate::new(booking, passengers))
    }

    /// Cancel a booking and every passenger still booked under it, then
    /// return their seats to the ledger.
    ///
    /// If a write fails before the seats are released, every status change
    /// made by this call is reinstated so the cancellation can be retried.
    pub async fn cancel_booking(&self, reference_id: ReferenceId) -> CoreResult<BookingAggregate> {
        let booking = self
            .bookings
            .get(reference_id)
            .await?
            .ok_or_else(|| booking_not_found(reference_id))?;

        if booking.status.is_cancelled() {
            warn!(%reference_id, "Cancel rejected: booking already cancelled");
            return Err(already_cancelled(reference_id));
        }

        // Conditional write: a concurrent cancel that got here first wins.
        if !self.bookings.set_status(reference_id, BookingStatus::Cancelled).await? {
            return Err(already_cancelled(reference_id));
        }

        let mut log = CancellationLog {
            booking: Some(reference_id),
            ..CancellationLog::default()
        };
        if let Err(e) = self.cancel_passengers_and_release(&booking, &mut log).await {
            error!(%reference_id, "Booking cancellation failed: {}", e);
            log.revert(self.bookings.as_ref(), self.passengers.as_ref()).await;
            return Err(e);
        }

        info!(%reference_id, released = log.tickets.len(), "Booking cancelled");
        self.queries.booking_by_reference(reference_id).await
    }

    async fn cancel_passengers_and_release(&self, booking: &Booking, log: &mut CancellationLog) -> CoreResult<()> {
        for passenger in self.passengers.list_by_reference(booking.reference_id).await? {
            if passenger.status != PassengerStatus::Booked {
                continue;
            }
            if self
                .passengers
                .set_status(passenger.ticket_number, PassengerStatus::Cancelled)
                .await?
            {
                log.tickets.push(passenger.ticket_number);
            }
        }

        let released = log.tickets.len() as u32;
        if released > 0 {
            self.ledger
                .release(&booking.flight_id, booking.flight_date, released)
                .await?;
        }
        Ok(())
    }

    async fn undo_create(&self, draft: &BookingDraft, reference_id: Option<ReferenceId>) {
        if let Some(reference_id) = reference_id {
            if let Err(e) = self.bookings.remove(reference_id).await {
                error!(%reference_id, "Compensation failed, booking row left behind: {}", e);
            }
        }

        match self
            .ledger
            .release(&draft.flight_id, draft.flight_date, draft.booked_seats)
            .await
        {
            Ok(_) => warn!(
                flight_id = %draft.flight_id,
                date = %draft.flight_date,
                seats = draft.booked_seats,
                "Reservation rolled back"
            ),
            Err(e) => error!(
                flight_id = %draft.flight_id,
                date = %draft.flight_date,
                seats = draft.booked_seats,
                "Compensation failed, seats not returned: {}",
                e
            ),
        }
    }
}

fn already_cancelled(reference_id: ReferenceId) -> CoreError {
    CoreError::conflict(format!("Booking {} is already cancelled", reference_id))
}
