//! Database abstraction layer.
//!
//! This module provides:
//! - The transaction nesting counter
//! - The generic nested-transaction adapter and its capability traits
//! - The sqlx connection binding (parameters, row decoding, dispatch macro)
//! - The forward-only result cursor

#[macro_use]
pub mod macros;
pub mod connection;
pub mod cursor;
pub mod database;
pub mod driver;
pub mod level;
pub mod params;
pub mod row;

pub use connection::DbConnection;
pub use cursor::Cursor;
pub use database::{Database, DatabaseAccess};
pub use driver::{PhysicalTransactions, QueryDriver};
pub use level::{LevelState, Step, TransactionLevel};
pub use row::RowToRecord;
