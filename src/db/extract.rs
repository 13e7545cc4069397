//! Compiles an abstract query description into driver-level SQL and binds.
//!
//! Two driver-compatibility rewrites happen here and nowhere else:
//! array-typed placeholders lose their rendered cast suffix (the driver
//! infers array typing from the bound value), and structured values are
//! unwrapped to the raw scalar the driver can accept.

use super::query::{Dialect, Query};
use super::value::{SqlValue, Value};

/// Extraction is pure: the same builder always yields the same (sql, args).
pub fn extract(dialect: &Dialect, build: impl Fn(&Dialect) -> Query) -> (String, Vec<SqlValue>) {
    let rendered = dialect.render(build(dialect));
    let mut sql = rendered.sql;
    for (i, value) in rendered.params.iter().enumerate() {
        if let Some(cast) = value.array_cast() {
            let placeholder = format!("{}{}", dialect.prefix(), i + 1);
            sql = sql.replace(&format!("{placeholder}::{cast}[]"), &placeholder);
        }
    }
    let args = rendered.params.into_iter().map(Value::into_bind).collect();
    (sql, args)
}
