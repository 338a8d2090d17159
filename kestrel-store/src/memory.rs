use async_trait::async_trait;
use kestrel_core::{
    Booking, BookingStatus, BookingStore, NewBooking, NewPassenger, Passenger, PassengerStatus, PassengerStore,
    StoreError, StoreResult,
};
use kestrel_shared::{ReferenceId, TicketNumber, UserId};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

#[derive(Default)]
struct Records {
    last_reference: i64,
    last_ticket: i64,
    bookings: BTreeMap<ReferenceId, Booking>,
    passengers: BTreeMap<TicketNumber, Passenger>,
}

/// Booking and passenger tables kept in one process-local map.
///
/// Both stores share a single lock so that removing a booking also removes
/// its passengers, mirroring the cascading foreign key of the SQL schema.
pub struct InMemoryRecords {
    state: Mutex<Records>,
}

impl InMemoryRecords {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(Records::default()),
        }
    }

    fn state(&self) -> StoreResult<MutexGuard<'_, Records>> {
        self.state
            .lock()
            .map_err(|_| StoreError::Unavailable("record lock poisoned".to_string()))
    }
}

impl Default for InMemoryRecords {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BookingStore for InMemoryRecords {
    async fn create(&self, booking: &NewBooking) -> StoreResult<Booking> {
        let mut state = self.state()?;
        state.last_reference += 1;

        let created = Booking {
            reference_id: ReferenceId(state.last_reference),
            user_id: booking.user_id,
            flight_id: booking.flight_id.clone(),
            flight_date: booking.flight_date,
            status: BookingStatus::Booked,
            booked_seats: booking.booked_seats,
            total_cost: booking.total_cost,
        };
        state.bookings.insert(created.reference_id, created.clone());
        Ok(created)
    }

    async fn get(&self, reference_id: ReferenceId) -> StoreResult<Option<Booking>> {
        Ok(self.state()?.bookings.get(&reference_id).cloned())
    }

    async fn set_status(&self, reference_id: ReferenceId, status: BookingStatus) -> StoreResult<bool> {
        let mut state = self.state()?;
        match state.bookings.get_mut(&reference_id) {
            Some(booking) if booking.status.can_transition_to(status) => {
                booking.status = status;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn list_by_user(&self, user_id: UserId) -> StoreResult<Vec<Booking>> {
        Ok(self
            .state()?
            .bookings
            .values()
            .filter(|b| b.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn remove(&self, reference_id: ReferenceId) -> StoreResult<()> {
        let mut state = self.state()?;
        state.bookings.remove(&reference_id);
        state.passengers.retain(|_, p| p.reference_id != reference_id);
        Ok(())
    }

    async fn reinstate(&self, reference_id: ReferenceId) -> StoreResult<bool> {
        let mut state = self.state()?;
        match state.bookings.get_mut(&reference_id) {
            Some(booking) if booking.status.is_cancelled() => {
                booking.status = BookingStatus::Booked;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[async_trait]
impl PassengerStore for InMemoryRecords {
    async fn create_batch(
        &self,
        reference_id: ReferenceId,
        passengers: &[NewPassenger],
    ) -> StoreResult<Vec<Passenger>> {
        let mut state = self.state()?;
        if !state.bookings.contains_key(&reference_id) {
            return Err(StoreError::Constraint(format!(
                "passengers reference unknown booking {}",
                reference_id
            )));
        }

        let mut created = Vec::with_capacity(passengers.len());
        for passenger in passengers {
            state.last_ticket += 1;
            created.push(Passenger {
                ticket_number: TicketNumber(state.last_ticket),
                reference_id,
                name: passenger.name.clone(),
                age: passenger.age,
                status: PassengerStatus::Booked,
            });
        }
        for passenger in &created {
            state.passengers.insert(passenger.ticket_number, passenger.clone());
        }
        Ok(created)
    }

    async fn get(&self, ticket_number: TicketNumber) -> StoreResult<Option<Passenger>> {
        Ok(self.state()?.passengers.get(&ticket_number).cloned())
    }

    async fn set_status(&self, ticket_number: TicketNumber, status: PassengerStatus) -> StoreResult<bool> {
        let mut state = self.state()?;
        match state.passengers.get_mut(&ticket_number) {
            Some(passenger) if passenger.status.can_transition_to(status) => {
                passenger.status = status;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn list_by_reference(&self, reference_id: ReferenceId) -> StoreResult<Vec<Passenger>> {
        Ok(self
            .state()?
            .passengers
            .values()
            .filter(|p| p.reference_id == reference_id)
            .cloned()
            .collect())
    }

    async fn count_cancelled_by_reference(&self, reference_id: ReferenceId) -> StoreResult<u32> {
        let count = self
            .state()?
            .passengers
            .values()
            .filter(|p| p.reference_id == reference_id && p.status == PassengerStatus::Cancelled)
            .count();
        Ok(count as u32)
    }

    async fn reinstate(&self, ticket_number: TicketNumber) -> StoreResult<bool> {
        let mut state = self.state()?;
        match state.passengers.get_mut(&ticket_number) {
            Some(passenger) if passenger.status.is_cancelled() => {
                passenger.status = PassengerStatus::Booked;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use kestrel_shared::{FlightId, Masked};
    use rust_decimal_macros::dec;

    fn new_booking(user: i64, seats: u32) -> NewBooking {
        NewBooking {
            user_id: UserId(user),
            flight_id: FlightId::new("A1"),
            flight_date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            booked_seats: seats,
            total_cost: dec!(100) * rust_decimal::Decimal::from(seats),
        }
    }

    fn passenger(name: &str, age: u32) -> NewPassenger {
        NewPassenger {
            name: Masked(name.to_string()),
            age,
        }
    }

    #[tokio::test]
    async fn test_references_and_tickets_are_sequential() {
        let records = InMemoryRecords::new();
        let first = BookingStore::create(&records, &new_booking(7, 1)).await.unwrap();
        let second = BookingStore::create(&records, &new_booking(7, 2)).await.unwrap();
        assert_eq!(first.reference_id, ReferenceId(1));
        assert_eq!(second.reference_id, ReferenceId(2));

        let tickets = records
            .create_batch(second.reference_id, &[passenger("Alice", 30), passenger("Bob", 40)])
            .await
            .unwrap();
        assert_eq!(tickets[0].ticket_number, TicketNumber(1));
        assert_eq!(tickets[1].ticket_number, TicketNumber(2));
    }

    #[tokio::test]
    async fn test_status_only_moves_forward() {
        let records = InMemoryRecords::new();
        let booking = BookingStore::create(&records, &new_booking(7, 1)).await.unwrap();

        assert!(BookingStore::set_status(&records, booking.reference_id, BookingStatus::Cancelled).await.unwrap());
        assert!(!BookingStore::set_status(&records, booking.reference_id, BookingStatus::Cancelled).await.unwrap());
        assert!(!BookingStore::set_status(&records, booking.reference_id, BookingStatus::Booked).await.unwrap());
        assert!(!BookingStore::set_status(&records, ReferenceId(99), BookingStatus::Cancelled).await.unwrap());
    }

    #[tokio::test]
    async fn test_reinstate_undoes_only_cancellations() {
        let records = InMemoryRecords::new();
        let booking = BookingStore::create(&records, &new_booking(7, 1)).await.unwrap();
        let tickets = records
            .create_batch(booking.reference_id, &[passenger("Alice", 30)])
            .await
            .unwrap();
        let ticket = tickets[0].ticket_number;

        assert!(!BookingStore::reinstate(&records, booking.reference_id).await.unwrap());
        assert!(!PassengerStore::reinstate(&records, ticket).await.unwrap());

        BookingStore::set_status(&records, booking.reference_id, BookingStatus::Cancelled).await.unwrap();
        PassengerStore::set_status(&records, ticket, PassengerStatus::Cancelled).await.unwrap();

        assert!(BookingStore::reinstate(&records, booking.reference_id).await.unwrap());
        assert!(PassengerStore::reinstate(&records, ticket).await.unwrap());
        assert_eq!(records.count_cancelled_by_reference(booking.reference_id).await.unwrap(), 0);
        assert_eq!(
            BookingStore::get(&records, booking.reference_id).await.unwrap().unwrap().status,
            BookingStatus::Booked
        );
    }

    #[tokio::test]
    async fn test_batch_for_unknown_booking_inserts_nothing() {
        let records = InMemoryRecords::new();
        let result = records.create_batch(ReferenceId(42), &[passenger("Alice", 30)]).await;
        assert!(matches!(result, Err(StoreError::Constraint(_))));
        assert!(records.list_by_reference(ReferenceId(42)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_remove_cascades_to_passengers() {
        let records = InMemoryRecords::new();
        let booking = BookingStore::create(&records, &new_booking(7, 2)).await.unwrap();
        records
            .create_batch(booking.reference_id, &[passenger("Alice", 30), passenger("Bob", 40)])
            .await
            .unwrap();

        records.remove(booking.reference_id).await.unwrap();
        assert!(BookingStore::get(&records, booking.reference_id).await.unwrap().is_none());
        assert!(records.list_by_reference(booking.reference_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_count_and_user_listing() {
        let records = InMemoryRecords::new();
        let mine = BookingStore::create(&records, &new_booking(7, 2)).await.unwrap();
        BookingStore::create(&records, &new_booking(8, 1)).await.unwrap();
        let tickets = records
            .create_batch(mine.reference_id, &[passenger("Alice", 30), passenger("Bob", 40)])
            .await
            .unwrap();

        PassengerStore::set_status(&records, tickets[0].ticket_number, PassengerStatus::Cancelled)
            .await
            .unwrap();
        assert_eq!(records.count_cancelled_by_reference(mine.reference_id).await.unwrap(), 1);

        let listed = records.list_by_user(UserId(7)).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].reference_id, mine.reference_id);
    }
}
