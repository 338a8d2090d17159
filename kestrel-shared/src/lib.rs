pub mod ids;
pub mod pii;

pub use ids::{FlightId, ReferenceId, TicketNumber, UserId};
pub use pii::Masked;
