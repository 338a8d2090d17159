pub mod booking;
pub mod passengers;
pub mod queries;
mod rollback;
pub mod service;

pub use booking::BookingOrchestrator;
pub use passengers::PassengerCancellationOrchestrator;
pub use queries::BookingQueries;
pub use service::BookingService;
