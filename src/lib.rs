//! nestdb
//!
//! A database adapter over sqlx that collapses nested logical transactions
//! onto one physical transaction with a level counter, and translates driver
//! failures into a small error vocabulary.

pub mod config;
pub mod db;
pub mod error;
pub mod models;

pub use config::Config;
pub use db::{Database, DatabaseAccess, DbConnection};
pub use error::{DbError, DbResult};
