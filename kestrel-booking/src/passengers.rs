use kestrel_core::validation::validate_cancel_passengers;
use kestrel_core::{
    Booking, BookingAggregate, BookingStatus, BookingStore, CancelPassengersRequest, CoreError, CoreResult,
    Passenger, PassengerStatus, PassengerStore,
};
use kestrel_inventory::SeatLedger;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::queries::{booking_not_found, BookingQueries};
use crate::rollback::CancellationLog;

/// Cancels individual passengers and cascades the booking to Cancelled once
/// no passenger under it is still booked.
#[derive(Clone)]
pub struct PassengerCancellationOrchestrator {
    ledger: SeatLedger,
    bookings: Arc<dyn BookingStore>,
    passengers: Arc<dyn PassengerStore>,
    queries: BookingQueries,
}

impl PassengerCancellationOrchestrator {
    pub fn new(ledger: SeatLedger, bookings: Arc<dyn BookingStore>, passengers: Arc<dyn PassengerStore>) -> Self {
        let queries = BookingQueries::new(bookings.clone(), passengers.clone());
        Self {
            ledger,
            bookings,
            passengers,
            queries,
        }
    }

    pub async fn cancel_passengers(&self, request: &CancelPassengersRequest) -> CoreResult<BookingAggregate> {
        let cancellation = validate_cancel_passengers(request)
            .inspect_err(|e| warn!("Passenger cancellation rejected: {}", e))?;
        let reference_id = cancellation.reference_id;

        // Resolve every ticket before the first write so an unknown ticket
        // leaves the booking untouched.
        let mut targets = Vec::with_capacity(cancellation.ticket_numbers.len());
        for ticket_number in &cancellation.ticket_numbers {
            let passenger = self
                .passengers
                .get(*ticket_number)
                .await?
                .ok_or_else(|| CoreError::not_found(format!("Ticket {} not found", ticket_number)))?;

            if passenger.reference_id != reference_id {
                return Err(CoreError::not_found(format!(
                    "Ticket {} not found under booking {}",
                    ticket_number, reference_id
                )));
            }
            targets.push(passenger);
        }

        let booking = self
            .bookings
            .get(reference_id)
            .await?
            .ok_or_else(|| booking_not_found(reference_id))?;

        let mut log = CancellationLog::default();
        let cumulative_cancelled = match self.cancel_and_release(&booking, &targets, &mut log).await {
            Ok(cumulative) => cumulative,
            Err(e) => {
                error!(%reference_id, "Passenger cancellation failed: {}", e);
                log.revert(self.bookings.as_ref(), self.passengers.as_ref()).await;
                return Err(e);
            }
        };

        info!(
            %reference_id,
            newly_cancelled = log.tickets.len(),
            cumulative_cancelled,
            booked_seats = booking.booked_seats,
            "Passengers cancelled"
        );

        self.queries.booking_by_reference(reference_id).await
    }

    /// Cancel the still-booked targets, cascade the booking when nobody is
    /// left on it and release this call's seats. Every status write lands in
    /// `log` so the caller can reinstate it if a later step fails.
    async fn cancel_and_release(
        &self,
        booking: &Booking,
        targets: &[Passenger],
        log: &mut CancellationLog,
    ) -> CoreResult<u32> {
        let reference_id = booking.reference_id;

        // Tickets already cancelled are skipped; only this call's transitions are released.
        for passenger in targets.iter().filter(|p| p.status == PassengerStatus::Booked) {
            if self
                .passengers
                .set_status(passenger.ticket_number, PassengerStatus::Cancelled)
                .await?
            {
                log.tickets.push(passenger.ticket_number);
            }
        }

        let cumulative_cancelled = self.passengers.count_cancelled_by_reference(reference_id).await?;
        if cumulative_cancelled >= booking.booked_seats
            && !booking.status.is_cancelled()
            && self.bookings.set_status(reference_id, BookingStatus::Cancelled).await?
        {
            log.booking = Some(reference_id);
            info!(%reference_id, "All passengers cancelled, booking cancelled");
        }

        let newly_cancelled = log.tickets.len() as u32;
        if newly_cancelled > 0 {
            self.ledger
                .release(&booking.flight_id, booking.flight_date, newly_cancelled)
                .await?;
        }
        Ok(cumulative_cancelled)
    }
}
