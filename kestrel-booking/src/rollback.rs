use kestrel_core::{BookingStore, PassengerStore};
use kestrel_shared::{ReferenceId, TicketNumber};
use tracing::{error, warn};

/// Status writes a cancellation has made so far, none of whose seats have
/// been returned yet.
#[derive(Debug, Default)]
pub(crate) struct CancellationLog {
    pub booking: Option<ReferenceId>,
    pub tickets: Vec<TicketNumber>,
}

impl CancellationLog {
    /// Reinstate everything recorded
    pub async fn revert(self, bookings: &dyn BookingStore, passengers: &dyn PassengerStore) {
        if let Some(reference_id) = self.booking {
            if let Err(e) = bookings.reinstate(reference_id).await {
                error!(%reference_id, "Compensation failed, booking left cancelled: {}", e);
            }
        }

        for ticket_number in self.tickets.iter().rev() {
            if let Err(e) = passengers.reinstate(*ticket_number).await {
                error!(%ticket_number, "Compensation failed, passenger left cancelled: {}", e);
            }
        }

        warn!(
            reference_id = ?self.booking,
            tickets = self.tickets.len(),
            "Cancellation rolled back"
        );
    }
}
