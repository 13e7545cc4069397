//! Instrumentation helpers shared by every engine operation. Each call gets
//! a correlation id generated once and threaded through the start, failure,
//! and completion entries.

use std::fmt;

use tracing::Level;
use uuid::Uuid;

use super::value::SqlValue;
use crate::error::Error;

const MAX_LOGGED_TEXT: usize = 256;
const MAX_LOGGED_ARRAY: usize = 32;

/// Renders bind values for logging. Long text values are truncated and
/// large arrays elided so production logs stay bounded.
pub(crate) fn redact_args(args: &[SqlValue]) -> String {
    let mut out = String::from("[");
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        match arg {
            SqlValue::Text(s) if s.len() > MAX_LOGGED_TEXT => {
                out.push_str(&format!("text(len={})", s.len()));
            }
            SqlValue::BigIntArray(v) if v.len() > MAX_LOGGED_ARRAY => {
                out.push_str(&format!("bigint[](len={})", v.len()));
            }
            SqlValue::TextArray(v) if v.len() > MAX_LOGGED_ARRAY => {
                out.push_str(&format!("text[](len={})", v.len()));
            }
            other => out.push_str(&format!("{other:?}")),
        }
    }
    out.push(']');
    out
}

pub(crate) fn start(point: &'static str, query_id: Uuid, sql: &str, args: &[SqlValue]) {
    tracing::debug!(
        %query_id,
        point,
        sql,
        args = %redact_args(args),
        "executing query"
    );
}

pub(crate) fn start_batch(point: &'static str, query_id: Uuid, sql: &str, batches: usize) {
    tracing::debug!(%query_id, point, sql, batches, "executing batch");
}

pub(crate) fn failure(point: &'static str, query_id: Uuid, error: &Error) {
    tracing::error!(%query_id, point, error = %error, "query failed");
}

pub(crate) fn finish_count(point: &'static str, query_id: Uuid, affected: u64) {
    tracing::debug!(%query_id, point, affected, "query finished");
}

pub(crate) fn finish_rows<T: fmt::Debug>(
    point: &'static str,
    query_id: Uuid,
    rows: usize,
    result: &T,
) {
    // Materializing full result content for logs is costly; only do it when
    // someone is actually listening at TRACE.
    if tracing::enabled!(Level::TRACE) {
        tracing::trace!(%query_id, point, rows, result = ?result, "query finished");
    } else {
        tracing::debug!(%query_id, point, rows, "query finished");
    }
}
