//! Structural checks run before any state change.
//!
//! Validation turns loosely-typed requests into drafts whose fields are all
//! present, so the orchestrators never handle a missing value.

use chrono::NaiveDate;
use kestrel_shared::{FlightId, Masked, ReferenceId, TicketNumber, UserId};

use crate::models::{BookingRequest, BookingStatus, CancelPassengersRequest, NewPassenger, PassengerRequest};
use crate::{CoreError, CoreResult};

/// Longest passenger name the passengers table stores
pub const MAX_PASSENGER_NAME_CHARS: usize = 100;

/// A booking request that passed validation
#[derive(Debug, Clone, PartialEq)]
pub struct BookingDraft {
    pub user_id: UserId,
    pub flight_id: FlightId,
    pub flight_date: NaiveDate,
    pub booked_seats: u32,
    pub passengers: Vec<NewPassenger>,
}

/// A passenger-cancellation request that passed validation
#[derive(Debug, Clone, PartialEq)]
pub struct PassengerCancellation {
    pub reference_id: ReferenceId,
    /// Deduplicated, in request order
    pub ticket_numbers: Vec<TicketNumber>,
}

pub fn validate_booking(req: &BookingRequest) -> CoreResult<BookingDraft> {
    let user_id = req.user_id.ok_or_else(|| CoreError::validation("User id is missing"))?;

    let flight_id = match &req.flight_id {
        Some(id) if !id.is_blank() => id.clone(),
        _ => return Err(CoreError::validation("Flight id is missing")),
    };

    let flight_date = req.flight_date.ok_or_else(|| CoreError::validation("Flight date is missing"))?;

    require_booked(req.status.as_deref(), "Booking")?;

    let booked_seats = match req.booked_seats {
        None => return Err(CoreError::validation("Booked seats is missing")),
        Some(n) if n <= 0 => {
            return Err(CoreError::validation(format!("Booked seats must be positive, got {}", n)))
        }
        Some(n) => u32::try_from(n)
            .map_err(|_| CoreError::validation(format!("Booked seats out of range: {}", n)))?,
    };

    if req.passengers.is_empty() {
        return Err(CoreError::validation("Passenger list is empty"));
    }

    let passengers = req
        .passengers
        .iter()
        .enumerate()
        .map(|(index, p)| validate_passenger(index, p))
        .collect::<CoreResult<Vec<_>>>()?;

    if passengers.len() != booked_seats as usize {
        return Err(CoreError::validation(format!(
            "Booked seats ({}) does not match passenger count ({})",
            booked_seats,
            passengers.len()
        )));
    }

    Ok(BookingDraft {
        user_id,
        flight_id,
        flight_date,
        booked_seats,
        passengers,
    })
}

pub fn validate_passenger(index: usize, passenger: &PassengerRequest) -> CoreResult<NewPassenger> {
    let name = passenger
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .ok_or_else(|| CoreError::validation(format!("Passenger #{} name is missing", index + 1)))?;

    if name.chars().count() > MAX_PASSENGER_NAME_CHARS {
        return Err(CoreError::validation(format!(
            "Passenger #{} name is longer than {} characters",
            index + 1,
            MAX_PASSENGER_NAME_CHARS
        )));
    }

    let age = passenger
        .age
        .ok_or_else(|| CoreError::validation(format!("Passenger #{} age is missing", index + 1)))?;

    require_booked(passenger.status.as_deref(), &format!("Passenger #{}", index + 1))?;

    Ok(NewPassenger {
        name: Masked(name.to_string()),
        age,
    })
}

pub fn validate_cancel_passengers(req: &CancelPassengersRequest) -> CoreResult<PassengerCancellation> {
    let reference_id = require_reference(req.reference_id)?;

    if req.ticket_numbers.is_empty() {
        return Err(CoreError::validation("No ticket numbers supplied"));
    }

    let mut ticket_numbers: Vec<TicketNumber> = Vec::with_capacity(req.ticket_numbers.len());
    for (index, ticket) in req.ticket_numbers.iter().enumerate() {
        let ticket = ticket.ok_or_else(|| {
            CoreError::validation(format!("Ticket number #{} is missing", index + 1))
        })?;
        if !ticket_numbers.contains(&ticket) {
            ticket_numbers.push(ticket);
        }
    }

    Ok(PassengerCancellation {
        reference_id,
        ticket_numbers,
    })
}

pub fn require_reference(reference_id: Option<ReferenceId>) -> CoreResult<ReferenceId> {
    reference_id.ok_or_else(|| CoreError::validation("Booking reference id is missing"))
}

fn require_booked(status: Option<&str>, subject: &str) -> CoreResult<()> {
    match status.and_then(BookingStatus::parse) {
        Some(BookingStatus::Booked) => Ok(()),
        Some(other) => Err(CoreError::validation(format!(
            "{} status must be BOOKED, got {:?}",
            subject, other
        ))),
        None => Err(CoreError::validation(format!("{} status is missing or invalid", subject))),
    }
}
