use chrono::NaiveDate;
use kestrel_core::{CoreError, CoreResult, FlightAvailability, InventoryStore, ReserveOutcome};
use kestrel_shared::FlightId;
use std::sync::Arc;
use tracing::{info, warn};

/// Seat Inventory Ledger: the only component allowed to move a seat counter.
#[derive(Clone)]
pub struct SeatLedger {
    store: Arc<dyn InventoryStore>,
}

impl SeatLedger {
    pub fn new(store: Arc<dyn InventoryStore>) -> Self {
        Self { store }
    }

    /// Current seats and price for a flight date
    pub async fn lookup(&self, flight_id: &FlightId, date: NaiveDate) -> CoreResult<FlightAvailability> {
        self.store
            .lookup(flight_id, date)
            .await?
            .ok_or_else(|| availability_not_found(flight_id, date))
    }

    /// Take `seats` from the counter if they are all available.
    /// Returns the seats left afterwards.
    pub async fn reserve(&self, flight_id: &FlightId, date: NaiveDate, seats: u32) -> CoreResult<u32> {
        match self.store.reserve_atomic(flight_id, date, seats).await? {
            ReserveOutcome::Reserved { remaining } => {
                info!(%flight_id, %date, seats, remaining, "Seats reserved");
                Ok(remaining)
            }
            ReserveOutcome::Insufficient { available } => {
                warn!(%flight_id, %date, requested = seats, available, "Reservation rejected: insufficient seats");
                Err(CoreError::CapacityError {
                    flight_id: flight_id.clone(),
                    date,
                    requested: seats,
                    available,
                })
            }
            ReserveOutcome::NotFound => Err(availability_not_found(flight_id, date)),
        }
    }

    /// Return `seats` to the counter. Returns the seats available afterwards.
    pub async fn release(&self, flight_id: &FlightId, date: NaiveDate, seats: u32) -> CoreResult<u32> {
        let available = self
            .store
            .release(flight_id, date, seats)
            .await?
            .ok_or_else(|| availability_not_found(flight_id, date))?;
        info!(%flight_id, %date, seats, available, "Seats released");
        Ok(available)
    }
}

fn availability_not_found(flight_id: &FlightId, date: NaiveDate) -> CoreError {
    CoreError::not_found(format!("No availability for flight {} on {}", flight_id, date))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InMemoryInventory;
    use rust_decimal_macros::dec;

    fn ledger_with(capacity: u32) -> (SeatLedger, FlightId, NaiveDate) {
        let inventory = InMemoryInventory::new();
        let flight = FlightId::new("A1");
        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        inventory.initialize(flight.clone(), date, capacity, dec!(100)).unwrap();
        (SeatLedger::new(Arc::new(inventory)), flight, date)
    }

    #[tokio::test]
    async fn test_reserve_and_release() {
        let (ledger, flight, date) = ledger_with(10);

        assert_eq!(ledger.reserve(&flight, date, 3).await.unwrap(), 7);
        assert_eq!(ledger.lookup(&flight, date).await.unwrap().seats_available, 7);
        assert_eq!(ledger.release(&flight, date, 3).await.unwrap(), 10);
    }

    #[tokio::test]
    async fn test_reserve_over_capacity_is_capacity_error() {
        let (ledger, flight, date) = ledger_with(2);

        let err = ledger.reserve(&flight, date, 3).await.unwrap_err();
        assert!(matches!(err, CoreError::CapacityError { requested: 3, available: 2, .. }));
        assert_eq!(ledger.lookup(&flight, date).await.unwrap().seats_available, 2);
    }

    #[tokio::test]
    async fn test_zero_seat_operations_require_row() {
        let (ledger, flight, date) = ledger_with(5);
        assert_eq!(ledger.reserve(&flight, date, 0).await.unwrap(), 5);
        assert_eq!(ledger.release(&flight, date, 0).await.unwrap(), 5);

        let other = date.succ_opt().unwrap();
        assert!(matches!(ledger.release(&flight, other, 0).await, Err(CoreError::NotFoundError(_))));
    }

    #[tokio::test]
    async fn test_unknown_flight_is_not_found() {
        let (ledger, _, date) = ledger_with(5);
        let unknown = FlightId::new("B2");
        assert!(matches!(ledger.lookup(&unknown, date).await, Err(CoreError::NotFoundError(_))));
        assert!(matches!(ledger.reserve(&unknown, date, 1).await, Err(CoreError::NotFoundError(_))));
    }
}
