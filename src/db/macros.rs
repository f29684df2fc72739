//! Database dispatch macro.
//!
//! Generates the match over `DbConnection` variants so each backend arm stays
//! on one line while the per-backend code stays fully typed.

/// Macro for generating `DbConnection` dispatch match arms.
///
/// # Example
///
/// ```ignore
/// impl_db_dispatch!(self, {
///     MySql(c) => do_mysql(c),
///     Postgres(c) => do_postgres(c),
///     SQLite(c) => do_sqlite(c),
/// });
/// ```
#[macro_export]
macro_rules! impl_db_dispatch {
    ($conn:expr, { $($variant:ident($c:ident) => $body:expr),+ $(,)? }) => {
        match $conn {
            $(
                $crate::db::connection::DbConnection::$variant($c) => $body,
            )+
        }
    };
}

pub use impl_db_dispatch;
