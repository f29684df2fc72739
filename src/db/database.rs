//! Nested-transaction adapter.
//!
//! `Database` wraps one driver connection and layers "fake" nested
//! transactions on top of it: logical begins are counted, and only the
//! outermost begin and the matching outermost commit or rollback reach the
//! driver. Nothing is done with savepoints, so a rollback of an inner
//! transaction only closes that nesting layer; the work stays part of the
//! outer physical transaction until the outermost commit or rollback.
//!
//! The adapter is single-owner. Every operation takes `&mut self`, so sharing
//! one adapter between tasks needs external locking by the caller.

use crate::db::cursor::Cursor;
use crate::db::driver::{PhysicalTransactions, QueryDriver};
use crate::db::level::{LevelState, Step, TransactionLevel};
use crate::error::{DbError, DbResult};
use crate::models::{ParamType, QueryParam, apply_hints};
use futures_util::StreamExt;
use std::future::Future;
use tracing::{debug, info, warn};

/// Caller-facing capability of a nested-transaction database.
pub trait DatabaseAccess {
    /// Current nesting depth.
    fn level(&self) -> i64;

    fn start_transaction(&mut self) -> impl Future<Output = DbResult<bool>> + Send;

    fn commit_transaction(&mut self) -> impl Future<Output = DbResult<bool>> + Send;

    fn rollback_transaction(&mut self) -> impl Future<Output = DbResult<bool>> + Send;

    fn run_query<'a>(
        &'a mut self,
        sql: &'a str,
        params: &'a [QueryParam],
        hints: &'a [ParamType],
    ) -> impl Future<Output = DbResult<Cursor<'a>>> + Send + 'a;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Finish {
    Commit,
    Rollback,
}

impl Finish {
    fn as_str(self) -> &'static str {
        match self {
            Finish::Commit => "commit",
            Finish::Rollback => "rollback",
        }
    }
}

/// Level-tracking adapter over a driver connection.
#[derive(Debug)]
pub struct Database<D> {
    id: String,
    level: TransactionLevel,
    driver: D,
}

impl<D> Database<D> {
    /// Wrap a connection. The counter starts at 0.
    pub fn new(driver: D) -> Self {
        Self {
            id: generate_database_id(),
            level: TransactionLevel::new(),
            driver,
        }
    }

    /// Identifier carried by every error this adapter raises.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn level(&self) -> i64 {
        self.level.get()
    }

    pub fn level_state(&self) -> LevelState {
        self.level.state()
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Direct access to the connection. Transaction statements issued through
    /// it bypass the nesting counter.
    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    /// Give the connection back, discarding the counter.
    pub fn into_inner(self) -> D {
        self.driver
    }

    fn integrity_error(&self, operation: &str, level: i64) -> DbError {
        warn!(
            database = %self.id,
            operation = operation,
            level = level,
            "Transaction level integrity violated"
        );
        DbError::level_integrity(self.id.clone(), level)
    }
}

impl<D: PhysicalTransactions> Database<D> {
    /// Begin a logical transaction.
    ///
    /// Only the transition from level 0 contacts the driver. If that physical
    /// begin fails the level stays at 1; callers are expected to discard the
    /// adapter (or roll back) rather than retry on it.
    pub async fn start_transaction(&mut self) -> DbResult<bool> {
        match self.level.enter() {
            Ok(Step::Nested) => {
                debug!(database = %self.id, level = self.level.get(), "Nested transaction started");
                Ok(true)
            }
            Ok(Step::Physical) => match self.driver.begin().await {
                Ok(started) => {
                    info!(database = %self.id, started = started, "Transaction started");
                    Ok(started)
                }
                Err(fault) => {
                    warn!(
                        database = %self.id,
                        level = self.level.get(),
                        error = %fault,
                        "Physical begin failed"
                    );
                    Err(DbError::communication(self.id.clone(), fault))
                }
            },
            Err(level) => Err(self.integrity_error("begin", level)),
        }
    }

    /// Commit a logical transaction; the driver commits only at level 0.
    pub async fn commit_transaction(&mut self) -> DbResult<bool> {
        self.finish(Finish::Commit).await
    }

    /// Roll back a logical transaction.
    ///
    /// An inner rollback only closes one nesting layer, exactly like an inner
    /// commit. Only the outermost rollback undoes anything.
    pub async fn rollback_transaction(&mut self) -> DbResult<bool> {
        self.finish(Finish::Rollback).await
    }

    async fn finish(&mut self, finish: Finish) -> DbResult<bool> {
        match self.level.leave() {
            Ok(Step::Nested) => {
                debug!(
                    database = %self.id,
                    level = self.level.get(),
                    operation = finish.as_str(),
                    "Nested transaction closed"
                );
                Ok(true)
            }
            Ok(Step::Physical) => {
                let result = match finish {
                    Finish::Commit => self.driver.commit().await,
                    Finish::Rollback => self.driver.rollback().await,
                };
                match result {
                    Ok(done) => {
                        info!(
                            database = %self.id,
                            operation = finish.as_str(),
                            done = done,
                            "Transaction finished"
                        );
                        Ok(done)
                    }
                    Err(fault) => {
                        warn!(
                            database = %self.id,
                            operation = finish.as_str(),
                            error = %fault,
                            "Physical transaction end failed"
                        );
                        Err(DbError::communication(self.id.clone(), fault))
                    }
                }
            }
            Err(level) => Err(self.integrity_error(finish.as_str(), level)),
        }
    }
}

impl<D: QueryDriver> Database<D> {
    /// Execute a parameterized statement.
    ///
    /// `hints` apply positionally to `params`. Execution errors are returned
    /// here as `DbError::Query`; on success the rows are streamed lazily
    /// through the returned cursor, which keeps the adapter borrowed.
    pub async fn run_query<'a>(
        &'a mut self,
        sql: &'a str,
        params: &[QueryParam],
        hints: &[ParamType],
    ) -> DbResult<Cursor<'a>> {
        let bound = apply_hints(params, hints);
        debug!(
            database = %self.id,
            db_type = %self.driver.kind(),
            sql = %sql,
            params = bound.len(),
            level = self.level.get(),
            "Running query"
        );

        let database = self.id.clone();
        let mut rows = self.driver.fetch(sql, bound);
        match rows.next().await {
            Some(Err(fault)) => {
                warn!(database = %database, error = %fault, "Query failed");
                Err(DbError::query(database, fault))
            }
            Some(Ok(first)) => Ok(Cursor::new(database, Some(first), rows)),
            None => Ok(Cursor::new(database, None, rows)),
        }
    }
}

impl<D: QueryDriver> DatabaseAccess for Database<D> {
    fn level(&self) -> i64 {
        Database::level(self)
    }

    fn start_transaction(&mut self) -> impl Future<Output = DbResult<bool>> + Send {
        Database::start_transaction(self)
    }

    fn commit_transaction(&mut self) -> impl Future<Output = DbResult<bool>> + Send {
        Database::commit_transaction(self)
    }

    fn rollback_transaction(&mut self) -> impl Future<Output = DbResult<bool>> + Send {
        Database::rollback_transaction(self)
    }

    fn run_query<'a>(
        &'a mut self,
        sql: &'a str,
        params: &'a [QueryParam],
        hints: &'a [ParamType],
    ) -> impl Future<Output = DbResult<Cursor<'a>>> + Send + 'a {
        Database::run_query(self, sql, params, hints)
    }
}

/// Generate a unique adapter ID.
fn generate_database_id() -> String {
    format!("db_{}", uuid::Uuid::new_v4().simple())
}
