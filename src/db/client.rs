//! Collaborator contracts for the execution engine: an asynchronous SQL
//! client (pool + connection traits) and its result-set shapes.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::value::SqlValue;
use crate::error::{Error, Result};

/// One result row: shared column names plus driver-level values.
#[derive(Debug, Clone)]
pub struct Row {
    columns: Arc<Vec<String>>,
    values: Vec<SqlValue>,
}

impl Row {
    fn index(&self, column: &str) -> Result<usize> {
        self.columns
            .iter()
            .position(|c| c == column)
            .ok_or_else(|| Error::MissingColumn(column.to_string()))
    }

    fn value(&self, column: &str) -> Result<&SqlValue> {
        Ok(&self.values[self.index(column)?])
    }

    pub fn get_i64(&self, column: &str) -> Result<i64> {
        match self.value(column)? {
            SqlValue::BigInt(v) => Ok(*v),
            other => Err(Error::Decode {
                column: column.to_string(),
                expected: "bigint",
                found: other.kind(),
            }),
        }
    }

    pub fn get_str(&self, column: &str) -> Result<&str> {
        match self.value(column)? {
            SqlValue::Text(v) => Ok(v),
            other => Err(Error::Decode {
                column: column.to_string(),
                expected: "text",
                found: other.kind(),
            }),
        }
    }

    pub fn get_string(&self, column: &str) -> Result<String> {
        self.get_str(column).map(str::to_string)
    }

    pub fn get_timestamp(&self, column: &str) -> Result<DateTime<Utc>> {
        match self.value(column)? {
            SqlValue::Timestamp(v) => Ok(*v),
            other => Err(Error::Decode {
                column: column.to_string(),
                expected: "timestamptz",
                found: other.kind(),
            }),
        }
    }
}

/// A result set delivered as a linked chain of pages. A single statement
/// produces one page; a batched call produces one page per sub-statement,
/// linked in submission order.
#[derive(Debug)]
pub struct RowSet {
    affected: u64,
    rows: Vec<Row>,
    next: Option<Box<RowSet>>,
}

impl RowSet {
    pub fn page(columns: &[&str], rows: Vec<Vec<SqlValue>>, affected: u64) -> Self {
        let columns = Arc::new(columns.iter().map(|c| c.to_string()).collect::<Vec<_>>());
        let rows = rows
            .into_iter()
            .map(|values| Row {
                columns: Arc::clone(&columns),
                values,
            })
            .collect();
        Self {
            affected,
            rows,
            next: None,
        }
    }

    pub fn empty() -> Self {
        Self {
            affected: 0,
            rows: Vec::new(),
            next: None,
        }
    }

    /// Links pages into one chain, preserving the given order.
    pub fn chain(pages: Vec<RowSet>) -> Self {
        let mut chained: Option<RowSet> = None;
        for mut page in pages.into_iter().rev() {
            page.next = chained.take().map(Box::new);
            chained = Some(page);
        }
        chained.unwrap_or_else(Self::empty)
    }

    /// Affected-row count of the first page.
    pub fn affected(&self) -> u64 {
        self.affected
    }

    /// Affected-row count summed across all pages.
    pub fn total_affected(&self) -> u64 {
        self.pages().map(|p| p.affected).sum()
    }

    /// Rows of the first page.
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn first(&self) -> Option<&Row> {
        self.rows.first()
    }

    /// Row count of the first page.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Walks the page chain front to back.
    pub fn pages(&self) -> Pages<'_> {
        Pages { next: Some(self) }
    }
}

pub struct Pages<'a> {
    next: Option<&'a RowSet>,
}

impl<'a> Iterator for Pages<'a> {
    type Item = &'a RowSet;

    fn next(&mut self) -> Option<Self::Item> {
        let page = self.next?;
        self.next = page.next.as_deref();
        Some(page)
    }
}

/// A single database connection (or transaction) the engine can execute on.
#[async_trait]
pub trait SqlConn: Send {
    /// Prepares and executes one statement.
    async fn query(&mut self, sql: &str, args: &[SqlValue]) -> Result<RowSet>;

    /// Prepares one statement and executes it once per bind tuple, returning
    /// the per-execution pages chained in submission order.
    async fn query_batch(&mut self, sql: &str, batches: &[Vec<SqlValue>]) -> Result<RowSet>;
}

/// A pool handing out [`SqlConn`] connections.
#[async_trait]
pub trait SqlPool: Send + Sync {
    type Conn: SqlConn;

    async fn acquire(&self) -> Result<Self::Conn>;
}

/// Execution target of an engine call: either an ad hoc connection drawn
/// from the default pool, or a caller-supplied connection shared across
/// statements (the way to make several calls observe one transaction).
pub enum Target<'a> {
    Pool,
    Scoped(&'a mut dyn SqlConn),
}
