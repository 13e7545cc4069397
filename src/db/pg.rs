//! sqlx-backed PostgreSQL implementation of the client contracts.
//!
//! `Target::Scoped` interoperates with sqlx transactions directly: a
//! `Transaction` derefs to `PgConnection`, which implements [`SqlConn`], so
//! `Target::Scoped(&mut *tx)` runs a call inside the transaction.

use async_trait::async_trait;
use futures::TryStreamExt;
use sqlx::pool::PoolConnection;
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::{Column, Either, Executor, PgConnection, PgPool, Postgres, Row as _, TypeInfo};

use super::client::{RowSet, SqlConn, SqlPool};
use super::value::SqlValue;
use crate::error::Result;

/// Default connection pool handed to the engine.
#[derive(Clone)]
pub struct PgSqlPool {
    pool: PgPool,
}

impl PgSqlPool {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn inner(&self) -> &PgPool {
        &self.pool
    }

    /// Begins a transaction whose connection can be passed as a scoped
    /// execution target.
    pub async fn begin(&self) -> Result<sqlx::Transaction<'static, Postgres>> {
        Ok(self.pool.begin().await?)
    }
}

#[async_trait]
impl SqlPool for PgSqlPool {
    type Conn = PgSession;

    async fn acquire(&self) -> Result<PgSession> {
        Ok(PgSession {
            conn: self.pool.acquire().await?,
        })
    }
}

/// A pooled connection checked out for one engine call.
pub struct PgSession {
    conn: PoolConnection<Postgres>,
}

#[async_trait]
impl SqlConn for PgSession {
    async fn query(&mut self, sql: &str, args: &[SqlValue]) -> Result<RowSet> {
        SqlConn::query(&mut *self.conn, sql, args).await
    }

    async fn query_batch(&mut self, sql: &str, batches: &[Vec<SqlValue>]) -> Result<RowSet> {
        SqlConn::query_batch(&mut *self.conn, sql, batches).await
    }
}

#[async_trait]
impl SqlConn for PgConnection {
    async fn query(&mut self, sql: &str, args: &[SqlValue]) -> Result<RowSet> {
        run_query(self, sql, args).await
    }

    async fn query_batch(&mut self, sql: &str, batches: &[Vec<SqlValue>]) -> Result<RowSet> {
        // One prepared statement, executed per bind tuple on this connection;
        // pages are chained in submission order.
        let mut pages = Vec::with_capacity(batches.len());
        for args in batches {
            pages.push(run_query(&mut *self, sql, args).await?);
        }
        Ok(RowSet::chain(pages))
    }
}

async fn run_query(conn: &mut PgConnection, sql: &str, args: &[SqlValue]) -> Result<RowSet> {
    let mut query = sqlx::query(sql);
    for arg in args {
        query = bind(query, arg);
    }
    let mut affected = 0u64;
    let mut pg_rows: Vec<PgRow> = Vec::new();
    let mut stream = conn.fetch_many(query);
    while let Some(step) = stream.try_next().await? {
        match step {
            Either::Left(done) => affected += done.rows_affected(),
            Either::Right(row) => pg_rows.push(row),
        }
    }
    Ok(to_row_set(&pg_rows, affected))
}

type PgQuery<'q> = sqlx::query::Query<'q, Postgres, PgArguments>;

fn bind<'q>(query: PgQuery<'q>, arg: &SqlValue) -> PgQuery<'q> {
    match arg {
        SqlValue::Null => query.bind(None::<String>),
        SqlValue::Bool(v) => query.bind(*v),
        SqlValue::BigInt(v) => query.bind(*v),
        SqlValue::Text(v) => query.bind(v.clone()),
        SqlValue::Timestamp(v) => query.bind(*v),
        SqlValue::BigIntArray(v) => query.bind(v.clone()),
        SqlValue::TextArray(v) => query.bind(v.clone()),
    }
}

fn to_row_set(pg_rows: &[PgRow], affected: u64) -> RowSet {
    let Some(first) = pg_rows.first() else {
        return RowSet::page(&[], Vec::new(), affected);
    };
    let columns: Vec<&str> = first.columns().iter().map(Column::name).collect();
    let rows = pg_rows
        .iter()
        .map(|row| {
            row.columns()
                .iter()
                .enumerate()
                .map(|(i, column)| decode(row, i, column.type_info().name()))
                .collect()
        })
        .collect();
    RowSet::page(&columns, rows, affected)
}

fn decode(row: &PgRow, i: usize, type_name: &str) -> SqlValue {
    fn opt<T>(value: sqlx::Result<Option<T>>, into: impl Fn(T) -> SqlValue) -> SqlValue {
        match value {
            Ok(Some(v)) => into(v),
            Ok(None) => SqlValue::Null,
            Err(e) => {
                tracing::warn!(error = %e, "failed to decode column, substituting null");
                SqlValue::Null
            }
        }
    }

    match type_name {
        "INT8" => opt(row.try_get::<Option<i64>, _>(i), SqlValue::BigInt),
        "INT4" => opt(row.try_get::<Option<i32>, _>(i), |v| {
            SqlValue::BigInt(i64::from(v))
        }),
        "INT2" => opt(row.try_get::<Option<i16>, _>(i), |v| {
            SqlValue::BigInt(i64::from(v))
        }),
        "BOOL" => opt(row.try_get::<Option<bool>, _>(i), SqlValue::Bool),
        "TIMESTAMPTZ" => opt(
            row.try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(i),
            SqlValue::Timestamp,
        ),
        "TIMESTAMP" => opt(row.try_get::<Option<chrono::NaiveDateTime>, _>(i), |v| {
            SqlValue::Timestamp(v.and_utc())
        }),
        "INT8[]" => opt(row.try_get::<Option<Vec<i64>>, _>(i), SqlValue::BigIntArray),
        "TEXT[]" | "VARCHAR[]" => opt(
            row.try_get::<Option<Vec<String>>, _>(i),
            SqlValue::TextArray,
        ),
        // TEXT, VARCHAR, NAME, BPCHAR and anything else that reads as text.
        _ => opt(row.try_get::<Option<String>, _>(i), SqlValue::Text),
    }
}
