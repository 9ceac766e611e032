// SQLite record store
// Stores one row per record, fields kept as a JSON document

mod db;
mod error;
mod queries;
mod records;
mod schema;

// Public API
pub use db::Database;
pub use error::{Error, Result};
pub use records::RecordRow;
pub use schema::SCHEMA_VERSION;
