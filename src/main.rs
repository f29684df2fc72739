//! nestdb - Main entry point.
//!
//! Connects to one database, opens an outer transaction and runs every SQL
//! argument in its own nested transaction. Rows are written to stdout as JSON
//! lines; logs go to stderr.

use clap::Parser;
use futures_util::StreamExt;
use nestdb::config::Config;
use nestdb::db::{Database, DbConnection};
use nestdb::error::DbResult;
use nestdb::models::{ParamType, QueryParam};
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize the tracing subscriber for logging.
fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if config.json_logs {
        subscriber
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        subscriber
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Parse configuration from command line and environment
    let config = Config::parse();

    init_tracing(&config);

    info!(
        statements = config.statements.len(),
        rollback = config.rollback,
        "Starting nestdb v{}",
        env!("CARGO_PKG_VERSION")
    );

    match run(&config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, kind = ?e.kind(), "Run failed");
            eprintln!("Error: {}", e);
            if let Some(suggestion) = e.suggestion() {
                eprintln!("Hint: {}", suggestion);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(config: &Config) -> DbResult<()> {
    config.database_type()?;
    let params = config.parse_params()?;

    let connection = DbConnection::connect(&config.database).await?;
    let mut db = Database::new(connection);

    db.start_transaction().await?;

    let outcome = run_statements(&mut db, &config.statements, &params, &config.hints).await;

    let finished = match (&outcome, config.rollback) {
        (Ok(()), false) => db.commit_transaction().await,
        _ => db.rollback_transaction().await,
    };

    let close = db.into_inner().close().await;

    // A statement error is the interesting one; report it over the rollback result
    outcome?;
    finished?;
    if let Err(e) = close {
        warn!(error = %e, "Closing the connection failed");
    }

    Ok(())
}

async fn run_statements(
    db: &mut Database<DbConnection>,
    statements: &[String],
    params: &[QueryParam],
    hints: &[ParamType],
) -> DbResult<()> {
    for (idx, sql) in statements.iter().enumerate() {
        db.start_transaction().await?;

        match print_rows(db, sql, params, hints).await {
            Ok(rows) => {
                db.commit_transaction().await?;
                info!(statement = idx + 1, rows = rows, level = db.level(), "Statement done");
            }
            Err(e) => {
                // closes the nested layer only; the caller rolls back the outer one
                db.rollback_transaction().await?;
                return Err(e);
            }
        }
    }

    Ok(())
}

async fn print_rows(
    db: &mut Database<DbConnection>,
    sql: &str,
    params: &[QueryParam],
    hints: &[ParamType],
) -> DbResult<u64> {
    let mut cursor = db.run_query(sql, params, hints).await?;
    while let Some(record) = cursor.next().await {
        println!("{}", serde_json::Value::Object(record?));
    }
    Ok(cursor.rows_read())
}
