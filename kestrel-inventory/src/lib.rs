pub mod ledger;
pub mod memory;

pub use ledger::SeatLedger;
pub use memory::InMemoryInventory;
