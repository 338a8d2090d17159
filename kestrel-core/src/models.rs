use chrono::NaiveDate;
use kestrel_shared::{FlightId, Masked, ReferenceId, TicketNumber, UserId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Lifecycle of a booking and of each passenger seat under it.
/// The only edge is Booked → Cancelled.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Booked,
    Cancelled,
}

pub type PassengerStatus = BookingStatus;

impl BookingStatus {
    /// Single-letter code used in persisted rows
    pub fn code(&self) -> &'static str {
        match self {
            BookingStatus::Booked => "B",
            BookingStatus::Cancelled => "C",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "B" => Some(BookingStatus::Booked),
            "C" => Some(BookingStatus::Cancelled),
            _ => None,
        }
    }

    /// Lenient parse for caller-supplied status fields ("Booked", "BOOKED", "b", ...)
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "B" | "BOOKED" => Some(BookingStatus::Booked),
            "C" | "CANCELLED" => Some(BookingStatus::Cancelled),
            _ => None,
        }
    }

    pub fn can_transition_to(&self, next: BookingStatus) -> bool {
        matches!((self, next), (BookingStatus::Booked, BookingStatus::Cancelled))
    }

    pub fn is_cancelled(&self) -> bool {
        *self == BookingStatus::Cancelled
    }
}

/// Seat counter and price for one flight on one date
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FlightAvailability {
    pub flight_id: FlightId,
    pub flight_date: NaiveDate,
    pub capacity: u32,
    pub seats_available: u32,
    pub cost_per_seat: Decimal,
}

impl FlightAvailability {
    pub fn new(flight_id: FlightId, flight_date: NaiveDate, capacity: u32, cost_per_seat: Decimal) -> Self {
        Self {
            flight_id,
            flight_date,
            capacity,
            seats_available: capacity,
            cost_per_seat,
        }
    }

    pub fn seats_sold(&self) -> u32 {
        self.capacity - self.seats_available
    }
}

/// Persisted booking row. Passengers are loaded separately by reference.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Booking {
    pub reference_id: ReferenceId,
    pub user_id: UserId,
    pub flight_id: FlightId,
    pub flight_date: NaiveDate,
    pub status: BookingStatus,
    pub booked_seats: u32,
    pub total_cost: Decimal,
}

/// Booking row plus the passengers that reference it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BookingAggregate {
    #[serde(flatten)]
    pub booking: Booking,
    pub passengers: Vec<Passenger>,
}

impl BookingAggregate {
    pub fn new(booking: Booking, passengers: Vec<Passenger>) -> Self {
        Self { booking, passengers }
    }

    pub fn active_passengers(&self) -> usize {
        self.passengers
            .iter()
            .filter(|p| p.status == PassengerStatus::Booked)
            .count()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Passenger {
    pub ticket_number: TicketNumber,
    pub reference_id: ReferenceId,
    pub name: Masked<String>,
    pub age: u32,
    pub status: PassengerStatus,
}

/// Booking row ready to insert; the store assigns the reference
#[derive(Debug, Clone, PartialEq)]
pub struct NewBooking {
    pub user_id: UserId,
    pub flight_id: FlightId,
    pub flight_date: NaiveDate,
    pub booked_seats: u32,
    pub total_cost: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewPassenger {
    pub name: Masked<String>,
    pub age: u32,
}

// ============================================================================
// Caller-facing requests. Every field is optional so that a missing value is
// reported as a validation failure instead of a decode error.
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BookingRequest {
    pub user_id: Option<UserId>,
    pub flight_id: Option<FlightId>,
    pub flight_date: Option<NaiveDate>,
    pub booked_seats: Option<i64>,
    /// Accepted for compatibility; the server always recomputes the total.
    pub total_cost: Option<Decimal>,
    pub status: Option<String>,
    #[serde(default)]
    pub passengers: Vec<PassengerRequest>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PassengerRequest {
    pub name: Option<String>,
    pub age: Option<u32>,
    pub status: Option<String>,
}

impl PassengerRequest {
    pub fn booked(name: &str, age: u32) -> Self {
        Self {
            name: Some(name.to_string()),
            age: Some(age),
            status: Some("Booked".to_string()),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CancelPassengersRequest {
    pub reference_id: Option<ReferenceId>,
    #[serde(default)]
    pub ticket_numbers: Vec<Option<TicketNumber>>,
}

impl CancelPassengersRequest {
    pub fn new(reference_id: ReferenceId, tickets: impl IntoIterator<Item = TicketNumber>) -> Self {
        Self {
            reference_id: Some(reference_id),
            ticket_numbers: tickets.into_iter().map(Some).collect(),
        }
    }
}
