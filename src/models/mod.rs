//! Data models shared by the adapter, the driver binding and the CLI.

pub mod connection;
pub mod query;

pub use connection::{DatabaseType, mask_connection_string};
pub use query::{ParamType, QueryParam, Record, apply_hints};
