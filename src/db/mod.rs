pub mod connection;
pub mod listings;
pub mod regions;
pub mod scrapes;
pub mod stats;

pub use connection::{init_db, Database};
