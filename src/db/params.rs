//! Parameter binding for each sqlx backend.
//!
//! Parameters are bound by value so the resulting query only borrows the SQL
//! text.

use crate::models::QueryParam;
use sqlx::mysql::MySqlArguments;
use sqlx::postgres::PgArguments;
use sqlx::sqlite::SqliteArguments;
use sqlx::{MySql, Postgres, Sqlite};

/// Bind a parameter to a MySQL query.
pub(crate) fn bind_mysql_param<'q>(
    query: sqlx::query::Query<'q, MySql, MySqlArguments>,
    param: QueryParam,
) -> sqlx::query::Query<'q, MySql, MySqlArguments> {
    match param {
        QueryParam::Null => query.bind(None::<String>),
        QueryParam::Bool(v) => query.bind(v),
        QueryParam::Int(v) => query.bind(v),
        QueryParam::Float(v) => query.bind(v),
        QueryParam::String(v) => query.bind(v),
        QueryParam::Bytes(v) => query.bind(v),
    }
}

/// Bind a parameter to a PostgreSQL query.
pub(crate) fn bind_postgres_param<'q>(
    query: sqlx::query::Query<'q, Postgres, PgArguments>,
    param: QueryParam,
) -> sqlx::query::Query<'q, Postgres, PgArguments> {
    match param {
        QueryParam::Null => query.bind(None::<String>),
        QueryParam::Bool(v) => query.bind(v),
        QueryParam::Int(v) => query.bind(v),
        QueryParam::Float(v) => query.bind(v),
        QueryParam::String(v) => query.bind(v),
        QueryParam::Bytes(v) => query.bind(v),
    }
}

/// Bind a parameter to a SQLite query.
pub(crate) fn bind_sqlite_param<'q>(
    query: sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>>,
    param: QueryParam,
) -> sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>> {
    match param {
        QueryParam::Null => query.bind(None::<String>),
        QueryParam::Bool(v) => query.bind(v),
        QueryParam::Int(v) => query.bind(v),
        QueryParam::Float(v) => query.bind(v),
        QueryParam::String(v) => query.bind(v),
        QueryParam::Bytes(v) => query.bind(v),
    }
}
