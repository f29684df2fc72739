//! sqlx connection binding.
//!
//! `DbConnection` wraps one database-specific sqlx connection (no pool) and
//! implements the driver capabilities on top of it. Transaction demarcation
//! is issued as plain `BEGIN` / `COMMIT` / `ROLLBACK` statements so the
//! nesting decision stays with the adapter.

use crate::db::driver::{PhysicalTransactions, QueryDriver};
use crate::db::params::{bind_mysql_param, bind_postgres_param, bind_sqlite_param};
use crate::db::row::RowToRecord;
use crate::error::{DbError, DbResult, DriverFault};
use crate::models::{DatabaseType, QueryParam, Record, mask_connection_string};
use futures_util::StreamExt;
use futures_util::stream::BoxStream;
use sqlx::{Connection, Executor, MySqlConnection, PgConnection, SqliteConnection};
use tracing::{debug, info};

/// Database-specific connection.
#[derive(Debug)]
pub enum DbConnection {
    MySql(MySqlConnection),
    Postgres(PgConnection),
    SQLite(SqliteConnection),
}

impl DbConnection {
    /// Open a single connection for the given URL.
    pub async fn connect(url: &str) -> DbResult<Self> {
        let masked = mask_connection_string(url);
        let db_type = DatabaseType::from_connection_string(url).ok_or_else(|| {
            DbError::invalid_input(format!("Unknown database type in connection string: {}", masked))
        })?;

        info!(db_type = %db_type, url = %masked, "Connecting to database");

        let result = match db_type {
            DatabaseType::MySQL => MySqlConnection::connect(url).await.map(Self::MySql),
            DatabaseType::PostgreSQL => PgConnection::connect(url).await.map(Self::Postgres),
            DatabaseType::SQLite => SqliteConnection::connect(url).await.map(Self::SQLite),
        };

        result.map_err(|e| {
            DbError::connection(
                format!("{} ({}): {}", db_type, masked, DriverFault::from(e)),
                "Check the connection string, credentials and database server status",
            )
        })
    }

    /// Get the database type for this connection.
    pub fn db_type(&self) -> DatabaseType {
        match self {
            DbConnection::MySql(_) => DatabaseType::MySQL,
            DbConnection::Postgres(_) => DatabaseType::PostgreSQL,
            DbConnection::SQLite(_) => DatabaseType::SQLite,
        }
    }

    /// Close the connection gracefully.
    pub async fn close(self) -> DbResult<()> {
        let db_type = self.db_type();
        impl_db_dispatch!(self, {
            MySql(c) => c.close().await,
            Postgres(c) => c.close().await,
            SQLite(c) => c.close().await,
        })
        .map_err(|e| {
            DbError::connection(
                format!("Failed to close {} connection: {}", db_type, DriverFault::from(e)),
                "The connection is dropped regardless",
            )
        })
    }

    /// Run a transaction control statement without preparing it.
    async fn execute_control(&mut self, sql: &'static str) -> Result<bool, DriverFault> {
        debug!(db_type = %self.db_type(), sql = sql, "Executing transaction control");
        impl_db_dispatch!(self, {
            MySql(c) => c.execute(sql).await.map(|_| true),
            Postgres(c) => c.execute(sql).await.map(|_| true),
            SQLite(c) => c.execute(sql).await.map(|_| true),
        })
        .map_err(DriverFault::from)
    }
}

impl PhysicalTransactions for DbConnection {
    async fn begin(&mut self) -> Result<bool, DriverFault> {
        self.execute_control("BEGIN").await
    }

    async fn commit(&mut self) -> Result<bool, DriverFault> {
        self.execute_control("COMMIT").await
    }

    async fn rollback(&mut self) -> Result<bool, DriverFault> {
        self.execute_control("ROLLBACK").await
    }
}

impl QueryDriver for DbConnection {
    fn kind(&self) -> DatabaseType {
        self.db_type()
    }

    fn fetch<'a>(
        &'a mut self,
        sql: &'a str,
        params: Vec<QueryParam>,
    ) -> BoxStream<'a, Result<Record, DriverFault>> {
        match self {
            DbConnection::MySql(conn) => {
                let mut query = sqlx::query(sql);
                for param in params {
                    query = bind_mysql_param(query, param);
                }
                query
                    .fetch(conn)
                    .map(|row| row.map(|r| r.to_record()).map_err(DriverFault::from))
                    .boxed()
            }
            DbConnection::Postgres(conn) => {
                let mut query = sqlx::query(sql);
                for param in params {
                    query = bind_postgres_param(query, param);
                }
                query
                    .fetch(conn)
                    .map(|row| row.map(|r| r.to_record()).map_err(DriverFault::from))
                    .boxed()
            }
            DbConnection::SQLite(conn) => {
                let mut query = sqlx::query(sql);
                for param in params {
                    query = bind_sqlite_param(query, param);
                }
                query
                    .fetch(conn)
                    .map(|row| row.map(|r| r.to_record()).map_err(DriverFault::from))
                    .boxed()
            }
        }
    }
}
