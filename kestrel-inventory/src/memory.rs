use async_trait::async_trait;
use chrono::NaiveDate;
use kestrel_core::{FlightAvailability, InventoryStore, ReserveOutcome, StoreError, StoreResult};
use kestrel_shared::FlightId;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

type AvailabilityKey = (FlightId, NaiveDate);

/// In-process inventory store. Every check-and-update happens under one lock,
/// which makes reserve/release atomic with respect to each other.
pub struct InMemoryInventory {
    rows: Mutex<HashMap<AvailabilityKey, FlightAvailability>>,
}

impl InMemoryInventory {
    pub fn new() -> Self {
        Self {
            rows: Mutex::new(HashMap::new()),
        }
    }

    /// Create the row for a flight date with a full cabin, or resize an
    /// existing one. Seats already sold stay sold; shrinking the cabin below
    /// them is a constraint violation.
    pub fn initialize(
        &self,
        flight_id: FlightId,
        date: NaiveDate,
        capacity: u32,
        cost_per_seat: Decimal,
    ) -> StoreResult<FlightAvailability> {
        let mut rows = self.rows()?;
        let mut row = FlightAvailability::new(flight_id.clone(), date, capacity, cost_per_seat);

        if let Some(existing) = rows.get(&(flight_id.clone(), date)) {
            let sold = existing.seats_sold();
            row.seats_available = capacity.checked_sub(sold).ok_or_else(|| {
                StoreError::Constraint(format!(
                    "capacity {} is below the {} seats already sold on {} {}",
                    capacity, sold, flight_id, date
                ))
            })?;
        }

        rows.insert((flight_id, date), row.clone());
        Ok(row)
    }

    /// Snapshot of a row
    pub fn get(&self, flight_id: &FlightId, date: NaiveDate) -> Option<FlightAvailability> {
        self.rows
            .lock()
            .ok()
            .and_then(|rows| rows.get(&(flight_id.clone(), date)).cloned())
    }

    fn rows(&self) -> StoreResult<MutexGuard<'_, HashMap<AvailabilityKey, FlightAvailability>>> {
        self.rows
            .lock()
            .map_err(|_| StoreError::Unavailable("inventory lock poisoned".to_string()))
    }
}

impl Default for InMemoryInventory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl InventoryStore for InMemoryInventory {
    async fn lookup(
        &self,
        flight_id: &FlightId,
        date: NaiveDate,
    ) -> StoreResult<Option<FlightAvailability>> {
        Ok(self.rows()?.get(&(flight_id.clone(), date)).cloned())
    }

    async fn reserve_atomic(
        &self,
        flight_id: &FlightId,
        date: NaiveDate,
        seats: u32,
    ) -> StoreResult<ReserveOutcome> {
        let mut rows = self.rows()?;
        let Some(row) = rows.get_mut(&(flight_id.clone(), date)) else {
            return Ok(ReserveOutcome::NotFound);
        };

        if row.seats_available < seats {
            return Ok(ReserveOutcome::Insufficient {
                available: row.seats_available,
            });
        }

        row.seats_available -= seats;
        Ok(ReserveOutcome::Reserved {
            remaining: row.seats_available,
        })
    }

    async fn release(
        &self,
        flight_id: &FlightId,
        date: NaiveDate,
        seats: u32,
    ) -> StoreResult<Option<u32>> {
        let mut rows = self.rows()?;
        let Some(row) = rows.get_mut(&(flight_id.clone(), date)) else {
            return Ok(None);
        };

        // Releases are always paired with an earlier reservation of at least this size.
        debug_assert!(
            row.seats_available + seats <= row.capacity,
            "release of {} seats would exceed capacity {} on {} {}",
            seats,
            row.capacity,
            flight_id,
            date
        );
        row.seats_available = (row.seats_available + seats).min(row.capacity);
        Ok(Some(row.seats_available))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    fn may_first() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
    }

    #[tokio::test]
    async fn test_inventory_lifecycle() {
        let inventory = InMemoryInventory::new();
        let flight = FlightId::new("A1");
        inventory.initialize(flight.clone(), may_first(), 100, dec!(100)).unwrap();

        let outcome = inventory.reserve_atomic(&flight, may_first(), 10).await.unwrap();
        assert_eq!(outcome, ReserveOutcome::Reserved { remaining: 90 });

        assert_eq!(inventory.get(&flight, may_first()).unwrap().seats_sold(), 10);

        let after = inventory.release(&flight, may_first(), 10).await.unwrap();
        assert_eq!(after, Some(100));
    }

    #[tokio::test]
    async fn test_reinitialize_keeps_sold_seats() {
        let inventory = InMemoryInventory::new();
        let flight = FlightId::new("A1");
        inventory.initialize(flight.clone(), may_first(), 10, dec!(100)).unwrap();
        inventory.reserve_atomic(&flight, may_first(), 4).await.unwrap();

        let resized = inventory.initialize(flight.clone(), may_first(), 12, dec!(120)).unwrap();
        assert_eq!(resized.seats_available, 8);
        assert_eq!(resized.cost_per_seat, dec!(120));

        let err = inventory.initialize(flight.clone(), may_first(), 3, dec!(120)).unwrap_err();
        assert!(matches!(err, StoreError::Constraint(_)));
        assert_eq!(inventory.get(&flight, may_first()).unwrap().seats_available, 8);

        assert_eq!(inventory.release(&flight, may_first(), 4).await.unwrap(), Some(12));
    }

    #[tokio::test]
    async fn test_insufficient_leaves_counter_untouched() {
        let inventory = InMemoryInventory::new();
        let flight = FlightId::new("A1");
        inventory.initialize(flight.clone(), may_first(), 3, dec!(100)).unwrap();

        let outcome = inventory.reserve_atomic(&flight, may_first(), 4).await.unwrap();
        assert_eq!(outcome, ReserveOutcome::Insufficient { available: 3 });
        assert_eq!(inventory.get(&flight, may_first()).unwrap().seats_available, 3);
    }

    #[tokio::test]
    async fn test_missing_row() {
        let inventory = InMemoryInventory::new();
        let flight = FlightId::new("ZZ9");
        assert_eq!(
            inventory.reserve_atomic(&flight, may_first(), 1).await.unwrap(),
            ReserveOutcome::NotFound
        );
        assert_eq!(inventory.release(&flight, may_first(), 1).await.unwrap(), None);
        assert!(inventory.lookup(&flight, may_first()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_concurrent_reservations_never_oversell() {
        let inventory = Arc::new(InMemoryInventory::new());
        let flight = FlightId::new("A1");
        inventory.initialize(flight.clone(), may_first(), 10, dec!(100)).unwrap();

        let mut handles = Vec::new();
        for _ in 0..50 {
            let inventory = inventory.clone();
            let flight = flight.clone();
            handles.push(tokio::spawn(async move {
                inventory.reserve_atomic(&flight, may_first(), 1).await.unwrap()
            }));
        }

        let mut granted = 0;
        for handle in handles {
            if let ReserveOutcome::Reserved { .. } = handle.await.unwrap() {
                granted += 1;
            }
        }

        assert_eq!(granted, 10);
        assert_eq!(inventory.get(&flight, may_first()).unwrap().seats_available, 0);
    }
}
