//! The generic database-access layer every data-access operation funnels
//! through: query extraction, the execution engine, row mapping, and the
//! Postgres client implementation.

mod client;
mod engine;
mod extract;
mod log;
mod pg;
mod query;
mod value;

#[cfg(test)]
pub(crate) mod testing;

pub use client::{Pages, Row, RowSet, SqlConn, SqlPool, Target};
pub use engine::DbClient;
pub use extract::extract;
pub use pg::{PgSession, PgSqlPool};
pub use query::{
    Delete, Dialect, Insert, Join, JoinCond, OnConflict, Predicate, Query, Rendered, Select,
};
pub use value::{Json, RawBind, SqlValue, Value};
