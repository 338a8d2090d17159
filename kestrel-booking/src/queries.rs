use kestrel_core::{BookingAggregate, BookingStore, CoreError, CoreResult, Passenger, PassengerStore};
use kestrel_shared::{ReferenceId, UserId};
use std::sync::Arc;

/// Read side shared by both orchestrators and the service facade
#[derive(Clone)]
pub struct BookingQueries {
    bookings: Arc<dyn BookingStore>,
    passengers: Arc<dyn PassengerStore>,
}

impl BookingQueries {
    pub fn new(bookings: Arc<dyn BookingStore>, passengers: Arc<dyn PassengerStore>) -> Self {
        Self { bookings, passengers }
    }

    /// Booking row plus its passengers in ticket order
    pub async fn booking_by_reference(&self, reference_id: ReferenceId) -> CoreResult<BookingAggregate> {
        let booking = self
            .bookings
            .get(reference_id)
            .await?
            .ok_or_else(|| booking_not_found(reference_id))?;
        let passengers = self.passengers.list_by_reference(reference_id).await?;
        Ok(BookingAggregate::new(booking, passengers))
    }

    pub async fn bookings_for_user(&self, user_id: UserId) -> CoreResult<Vec<BookingAggregate>> {
        let mut bookings = self.bookings.list_by_user(user_id).await?;
        bookings.sort_by_key(|b| b.reference_id);

        let mut aggregates = Vec::with_capacity(bookings.len());
        for booking in bookings {
            let passengers = self.passengers.list_by_reference(booking.reference_id).await?;
            aggregates.push(BookingAggregate::new(booking, passengers));
        }
        Ok(aggregates)
    }

    pub async fn passengers_for_booking(&self, reference_id: ReferenceId) -> CoreResult<Vec<Passenger>> {
        if self.bookings.get(reference_id).await?.is_none() {
            return Err(booking_not_found(reference_id));
        }
        self.passengers
            .list_by_reference(reference_id)
            .await
            .map_err(CoreError::from)
    }
}

pub(crate) fn booking_not_found(reference_id: ReferenceId) -> CoreError {
    CoreError::not_found(format!("Booking {} not found", reference_id))
}
