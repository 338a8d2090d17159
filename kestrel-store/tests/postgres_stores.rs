//! Runs against a live PostgreSQL when `DATABASE_URL` is set; otherwise each
//! test returns early.

use chrono::NaiveDate;
use kestrel_core::{
    BookingStatus, BookingStore, FlightAvailability, InventoryStore, NewBooking, NewPassenger, PassengerStatus,
    PassengerStore, ReserveOutcome, StoreError,
};
use kestrel_shared::{FlightId, Masked, UserId};
use kestrel_store::app_config::DatabaseConfig;
use kestrel_store::DbClient;
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

async fn connect() -> Option<DbClient> {
    let url = std::env::var("DATABASE_URL").ok()?;
    let db = DbClient::new(&DatabaseConfig {
        url,
        max_connections: 10,
        acquire_timeout_seconds: 5,
    })
    .await
    .expect("Failed to connect to DATABASE_URL");
    db.migrate().await.expect("Failed to run migrations");
    Some(db)
}

/// Flight ids unique per run so repeated runs do not collide
fn unique_flight(prefix: &str) -> FlightId {
    let nanos = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().subsec_nanos();
    FlightId(format!("{}{}", prefix, nanos % 1_000_000_000))
}

fn may_first() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
}

#[tokio::test]
async fn test_reserve_is_conditional() {
    let Some(db) = connect().await else { return };
    let inventory = db.inventory_store();
    let flight = unique_flight("R");
    inventory
        .upsert(&FlightAvailability::new(flight.clone(), may_first(), 3, dec!(100)))
        .await
        .unwrap();

    assert_eq!(
        inventory.reserve_atomic(&flight, may_first(), 2).await.unwrap(),
        ReserveOutcome::Reserved { remaining: 1 }
    );
    assert_eq!(
        inventory.reserve_atomic(&flight, may_first(), 2).await.unwrap(),
        ReserveOutcome::Insufficient { available: 1 }
    );
    assert_eq!(inventory.release(&flight, may_first(), 2).await.unwrap(), Some(3));
    assert_eq!(
        inventory.reserve_atomic(&unique_flight("X"), may_first(), 1).await.unwrap(),
        ReserveOutcome::NotFound
    );
}

#[tokio::test]
async fn test_reseed_keeps_sold_seats() {
    let Some(db) = connect().await else { return };
    let inventory = db.inventory_store();
    let flight = unique_flight("S");
    inventory
        .upsert(&FlightAvailability::new(flight.clone(), may_first(), 10, dec!(100)))
        .await
        .unwrap();
    inventory.reserve_atomic(&flight, may_first(), 4).await.unwrap();

    let resized = inventory
        .upsert(&FlightAvailability::new(flight.clone(), may_first(), 12, dec!(120)))
        .await
        .unwrap();
    assert_eq!(resized.capacity, 12);
    assert_eq!(resized.seats_available, 8);
    assert_eq!(resized.cost_per_seat, dec!(120));

    let err = inventory
        .upsert(&FlightAvailability::new(flight.clone(), may_first(), 3, dec!(120)))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Constraint(_)));

    let row = inventory.lookup(&flight, may_first()).await.unwrap().unwrap();
    assert_eq!((row.capacity, row.seats_available), (12, 8));
    assert_eq!(inventory.release(&flight, may_first(), 4).await.unwrap(), Some(12));
}

#[tokio::test]
async fn test_concurrent_reservations_never_oversell() {
    let Some(db) = connect().await else { return };
    let inventory = Arc::new(db.inventory_store());
    let flight = unique_flight("C");
    inventory
        .upsert(&FlightAvailability::new(flight.clone(), may_first(), 5, dec!(80)))
        .await
        .unwrap();

    let mut handles = Vec::new();
    for _ in 0..20 {
        let inventory = inventory.clone();
        let flight = flight.clone();
        handles.push(tokio::spawn(async move {
            inventory.reserve_atomic(&flight, may_first(), 1).await.unwrap()
        }));
    }

    let mut granted = 0;
    for handle in handles {
        if matches!(handle.await.unwrap(), ReserveOutcome::Reserved { .. }) {
            granted += 1;
        }
    }
    assert_eq!(granted, 5);
    assert_eq!(inventory.lookup(&flight, may_first()).await.unwrap().unwrap().seats_available, 0);
}

#[tokio::test]
async fn test_booking_and_passenger_rows() {
    let Some(db) = connect().await else { return };
    let inventory = db.inventory_store();
    let bookings = db.booking_store();
    let passengers = db.passenger_store();
    let flight = unique_flight("B");
    inventory
        .upsert(&FlightAvailability::new(flight.clone(), may_first(), 10, dec!(100)))
        .await
        .unwrap();

    let booking = bookings
        .create(&NewBooking {
            user_id: UserId(7),
            flight_id: flight.clone(),
            flight_date: may_first(),
            booked_seats: 2,
            total_cost: dec!(200),
        })
        .await
        .unwrap();
    assert_eq!(booking.status, BookingStatus::Booked);
    assert_eq!(booking.total_cost, dec!(200));

    let created = passengers
        .create_batch(
            booking.reference_id,
            &[
                NewPassenger { name: Masked("Alice".to_string()), age: 30 },
                NewPassenger { name: Masked("Bob".to_string()), age: 40 },
            ],
        )
        .await
        .unwrap();
    assert_eq!(created.len(), 2);

    assert!(passengers.set_status(created[0].ticket_number, PassengerStatus::Cancelled).await.unwrap());
    assert!(!passengers.set_status(created[0].ticket_number, PassengerStatus::Cancelled).await.unwrap());
    assert_eq!(passengers.count_cancelled_by_reference(booking.reference_id).await.unwrap(), 1);

    assert!(bookings.set_status(booking.reference_id, BookingStatus::Cancelled).await.unwrap());
    assert!(!bookings.set_status(booking.reference_id, BookingStatus::Booked).await.unwrap());

    assert!(bookings.reinstate(booking.reference_id).await.unwrap());
    assert!(!bookings.reinstate(booking.reference_id).await.unwrap());
    assert!(passengers.reinstate(created[0].ticket_number).await.unwrap());
    assert_eq!(passengers.count_cancelled_by_reference(booking.reference_id).await.unwrap(), 0);

    bookings.remove(booking.reference_id).await.unwrap();
    assert!(bookings.get(booking.reference_id).await.unwrap().is_none());
    assert!(passengers.list_by_reference(booking.reference_id).await.unwrap().is_empty());
}
