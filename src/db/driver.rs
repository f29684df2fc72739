//! Driver capabilities the adapter is written against.
//!
//! `PhysicalTransactions` is the minimal surface the nesting logic needs;
//! `QueryDriver` adds statement execution. Any connection type implementing
//! them can be wrapped in a [`Database`](crate::db::Database).

use crate::error::DriverFault;
use crate::models::{DatabaseType, QueryParam, Record};
use futures_util::stream::BoxStream;
use std::future::Future;

/// Physical transaction demarcation on a single connection.
///
/// Each call is one round trip to the database. `Ok(false)` means the driver
/// declined without raising a fault; it is passed through to the caller.
pub trait PhysicalTransactions: Send {
    fn begin(&mut self) -> impl Future<Output = Result<bool, DriverFault>> + Send;

    fn commit(&mut self) -> impl Future<Output = Result<bool, DriverFault>> + Send;

    fn rollback(&mut self) -> impl Future<Output = Result<bool, DriverFault>> + Send;
}

/// Statement execution on a single connection.
pub trait QueryDriver: PhysicalTransactions {
    fn kind(&self) -> DatabaseType;

    /// Prepare and execute `sql` with positional parameters.
    ///
    /// Nothing is sent until the stream is first polled. The stream is a
    /// single forward pass over the driver's cursor.
    fn fetch<'a>(
        &'a mut self,
        sql: &'a str,
        params: Vec<QueryParam>,
    ) -> BoxStream<'a, Result<Record, DriverFault>>;
}
