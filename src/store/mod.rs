//! Store drivers: the seam between the engine and persistent tabular storage.

mod driver;
mod memory;
mod postgres;

pub use driver::StoreDriver;
pub use memory::MemoryStore;
pub use postgres::{ensure_database_exists, map_db_error, PgStore};
