pub mod memory;
pub mod postgres;
pub mod store;

pub use memory::MemoryClinicStore;
pub use postgres::PgClinicStore;
pub use store::{BookedPair, ClinicStore, StoreError, StoreResult, UnitOfWork};
