//! Warehouse store implementations

pub mod memory;
pub mod postgres;

pub use memory::MemoryWarehouse;
pub use postgres::PostgresWarehouse;
