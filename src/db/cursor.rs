//! Forward-only row cursor returned by `run_query`.

use crate::error::{DbError, DbResult, DriverFault};
use crate::models::Record;
use futures_util::stream::{BoxStream, Stream, StreamExt, TryStreamExt};
use std::pin::Pin;
use std::task::{Context, Poll};

/// A lazy, single-pass sequence of records.
///
/// The statement has already executed when a cursor exists; the first row
/// (if any) is held back and yielded first. Once the underlying stream ends
/// or fails, the cursor yields nothing more. It cannot be rewound.
pub struct Cursor<'a> {
    database: String,
    first: Option<Record>,
    rows: BoxStream<'a, Result<Record, DriverFault>>,
    finished: bool,
    rows_read: u64,
}

impl<'a> Cursor<'a> {
    pub(crate) fn new(
        database: String,
        first: Option<Record>,
        rows: BoxStream<'a, Result<Record, DriverFault>>,
    ) -> Self {
        let finished = first.is_none();
        Self {
            database,
            first,
            rows,
            finished,
            rows_read: 0,
        }
    }

    /// Number of records handed out so far.
    pub fn rows_read(&self) -> u64 {
        self.rows_read
    }

    /// Drain the remaining records.
    pub async fn collect_records(self) -> DbResult<Vec<Record>> {
        self.try_collect().await
    }
}

impl Stream for Cursor<'_> {
    type Item = DbResult<Record>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        if let Some(record) = this.first.take() {
            this.rows_read += 1;
            return Poll::Ready(Some(Ok(record)));
        }

        if this.finished {
            return Poll::Ready(None);
        }

        match this.rows.poll_next_unpin(cx) {
            Poll::Ready(Some(Ok(record))) => {
                this.rows_read += 1;
                Poll::Ready(Some(Ok(record)))
            }
            Poll::Ready(Some(Err(fault))) => {
                this.finished = true;
                Poll::Ready(Some(Err(DbError::query(this.database.clone(), fault))))
            }
            Poll::Ready(None) => {
                this.finished = true;
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl std::fmt::Debug for Cursor<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cursor")
            .field("database", &self.database)
            .field("rows_read", &self.rows_read)
            .field("finished", &self.finished)
            .finish()
    }
}
