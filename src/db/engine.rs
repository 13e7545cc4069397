//! The execution engine. Stateless: every operation is a pure function of
//! (execution target, query description, row mapper), plus the default pool
//! it falls back to. Store errors are logged with the call's correlation id
//! and propagated unchanged; there are no retries and no error translation.

use std::collections::HashSet;
use std::fmt;
use std::hash::Hash;

use uuid::Uuid;

use super::client::{Row, RowSet, SqlConn, SqlPool, Target};
use super::extract::extract;
use super::log;
use super::query::{Dialect, Query};
use super::value::SqlValue;
use crate::error::{Error, Result};

pub struct DbClient<P: SqlPool> {
    pool: P,
    dialect: Dialect,
}

impl<P: SqlPool> DbClient<P> {
    pub fn new(pool: P, dialect: Dialect) -> Self {
        Self { pool, dialect }
    }

    pub fn dialect(&self) -> &Dialect {
        &self.dialect
    }

    pub fn pool(&self) -> &P {
        &self.pool
    }

    async fn run(&self, target: Target<'_>, sql: &str, args: &[SqlValue]) -> Result<RowSet> {
        match target {
            Target::Pool => {
                let mut conn = self.pool.acquire().await?;
                conn.query(sql, args).await
            }
            Target::Scoped(conn) => conn.query(sql, args).await,
        }
    }

    async fn run_batch(
        &self,
        target: Target<'_>,
        sql: &str,
        batches: &[Vec<SqlValue>],
    ) -> Result<RowSet> {
        match target {
            Target::Pool => {
                let mut conn = self.pool.acquire().await?;
                conn.query_batch(sql, batches).await
            }
            Target::Scoped(conn) => conn.query_batch(sql, batches).await,
        }
    }

    /// Runs one statement, returning the affected-row count.
    pub async fn execute(
        &self,
        target: Target<'_>,
        point: &'static str,
        build: impl Fn(&Dialect) -> Query,
    ) -> Result<u64> {
        let (sql, args) = extract(&self.dialect, build);
        let query_id = Uuid::new_v4();
        log::start(point, query_id, &sql, &args);
        let rows = self
            .run(target, &sql, &args)
            .await
            .inspect_err(|e| log::failure(point, query_id, e))?;
        let affected = rows.affected();
        log::finish_count(point, query_id, affected);
        Ok(affected)
    }

    /// Runs one statement expected to return at most one row. Zero rows is
    /// `None`, never an error. Extra rows are ignored: single-row-ness is a
    /// caller contract, not enforced here.
    pub async fn fetch_optional<T: fmt::Debug>(
        &self,
        target: Target<'_>,
        point: &'static str,
        build: impl Fn(&Dialect) -> Query,
        map: impl Fn(&Row) -> Result<T>,
    ) -> Result<Option<T>> {
        let (sql, args) = extract(&self.dialect, build);
        let query_id = Uuid::new_v4();
        log::start(point, query_id, &sql, &args);
        let rows = self
            .run(target, &sql, &args)
            .await
            .inspect_err(|e| log::failure(point, query_id, e))?;
        let result = rows.first().map(&map).transpose()?;
        log::finish_rows(point, query_id, rows.len(), &result);
        Ok(result)
    }

    /// Runs one statement and maps every row into `C`, draining all linked
    /// pages. Zero rows yields an empty collection, never an absent one.
    pub async fn fetch_collection<C, T>(
        &self,
        target: Target<'_>,
        point: &'static str,
        build: impl Fn(&Dialect) -> Query,
        map: impl Fn(&Row) -> Result<T>,
    ) -> Result<C>
    where
        C: Default + Extend<T> + fmt::Debug,
        T: fmt::Debug,
    {
        let (sql, args) = extract(&self.dialect, build);
        let query_id = Uuid::new_v4();
        log::start(point, query_id, &sql, &args);
        let rows = self
            .run(target, &sql, &args)
            .await
            .inspect_err(|e| log::failure(point, query_id, e))?;
        let mut total = 0usize;
        let mut out = C::default();
        for page in rows.pages() {
            total += page.len();
            for row in page.rows() {
                out.extend(std::iter::once(map(row)?));
            }
        }
        log::finish_rows(point, query_id, total, &out);
        Ok(out)
    }

    /// Order-preserving collection fetch.
    pub async fn fetch_vec<T: fmt::Debug>(
        &self,
        target: Target<'_>,
        point: &'static str,
        build: impl Fn(&Dialect) -> Query,
        map: impl Fn(&Row) -> Result<T>,
    ) -> Result<Vec<T>> {
        self.fetch_collection(target, point, build, map).await
    }

    /// Deduplicating collection fetch.
    pub async fn fetch_set<T>(
        &self,
        target: Target<'_>,
        point: &'static str,
        build: impl Fn(&Dialect) -> Query,
        map: impl Fn(&Row) -> Result<T>,
    ) -> Result<HashSet<T>>
    where
        T: Eq + Hash + fmt::Debug,
    {
        self.fetch_collection(target, point, build, map).await
    }

    /// Executes every builder against the SQL template of the first one, as
    /// a single batched call. Returns the affected-row count summed across
    /// sub-executions.
    pub async fn execute_batch<B>(
        &self,
        target: Target<'_>,
        point: &'static str,
        builders: &[B],
    ) -> Result<u64>
    where
        B: Fn(&Dialect) -> Query,
    {
        let (sql, batches) = self.extract_batch(builders)?;
        let query_id = Uuid::new_v4();
        log::start_batch(point, query_id, &sql, batches.len());
        let rows = self
            .run_batch(target, &sql, &batches)
            .await
            .inspect_err(|e| log::failure(point, query_id, e))?;
        let affected = rows.total_affected();
        log::finish_count(point, query_id, affected);
        Ok(affected)
    }

    /// Batched variant of [`Self::fetch_vec`]: maps every row of every
    /// sub-result, concatenated in submission order.
    pub async fn fetch_batch<B, T>(
        &self,
        target: Target<'_>,
        point: &'static str,
        builders: &[B],
        map: impl Fn(&Row) -> Result<T>,
    ) -> Result<Vec<T>>
    where
        B: Fn(&Dialect) -> Query,
        T: fmt::Debug,
    {
        let (sql, batches) = self.extract_batch(builders)?;
        let query_id = Uuid::new_v4();
        log::start_batch(point, query_id, &sql, batches.len());
        let rows = self
            .run_batch(target, &sql, &batches)
            .await
            .inspect_err(|e| log::failure(point, query_id, e))?;
        let mut out = Vec::new();
        for page in rows.pages() {
            for row in page.rows() {
                out.push(map(row)?);
            }
        }
        log::finish_rows(point, query_id, out.len(), &out);
        Ok(out)
    }

    /// One SQL template (from the first builder) plus one bind tuple per
    /// builder. Builders past the first contribute only their binds.
    fn extract_batch<B>(&self, builders: &[B]) -> Result<(String, Vec<Vec<SqlValue>>)>
    where
        B: Fn(&Dialect) -> Query,
    {
        let first = builders.first().ok_or(Error::EmptyBatch)?;
        let (sql, _) = extract(&self.dialect, first);
        let batches = builders
            .iter()
            .map(|b| extract(&self.dialect, b).1)
            .collect();
        Ok((sql, batches))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::query::{Insert, Predicate, Select};
    use crate::db::testing::MockPool;

    fn client(pool: &MockPool) -> DbClient<MockPool> {
        DbClient::new(pool.clone(), Dialect::default())
    }

    fn by_id(id: i64) -> impl Fn(&Dialect) -> Query {
        move |_| {
            Select::from("structures")
                .column("id")
                .filter(Predicate::eq("id", id))
                .build()
        }
    }

    #[tokio::test]
    async fn test_execute_returns_affected_count() {
        let pool = MockPool::new();
        pool.push(RowSet::page(&[], vec![], 1));
        let affected = client(&pool)
            .execute(Target::Pool, "test.execute", by_id(5))
            .await
            .unwrap();
        assert_eq!(affected, 1);

        let calls = pool.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].sql, "select id from structures where id = $1");
        assert_eq!(calls[0].batches, vec![vec![SqlValue::BigInt(5)]]);
    }

    #[tokio::test]
    async fn test_fetch_optional_zero_rows_is_none() {
        let pool = MockPool::new();
        pool.push(RowSet::empty());
        let found = client(&pool)
            .fetch_optional(Target::Pool, "test.fetch", by_id(5), |row| {
                row.get_i64("id")
            })
            .await
            .unwrap();
        assert_eq!(found, None);
    }

    #[tokio::test]
    async fn test_fetch_optional_maps_first_row_only() {
        let pool = MockPool::new();
        pool.push(RowSet::page(
            &["id"],
            vec![vec![SqlValue::BigInt(1)], vec![SqlValue::BigInt(2)]],
            0,
        ));
        let found = client(&pool)
            .fetch_optional(Target::Pool, "test.fetch", by_id(5), |row| {
                row.get_i64("id")
            })
            .await
            .unwrap();
        assert_eq!(found, Some(1));
    }

    #[tokio::test]
    async fn test_fetch_vec_empty_on_zero_rows() {
        let pool = MockPool::new();
        pool.push(RowSet::empty());
        let links: Vec<String> = client(&pool)
            .fetch_vec(Target::Pool, "test.fetch", by_id(5), |row| {
                row.get_string("link")
            })
            .await
            .unwrap();
        assert!(links.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_vec_drains_linked_pages_in_order() {
        let pool = MockPool::new();
        pool.push(RowSet::chain(vec![
            RowSet::page(
                &["id"],
                vec![vec![SqlValue::BigInt(1)], vec![SqlValue::BigInt(2)]],
                0,
            ),
            RowSet::page(&["id"], vec![vec![SqlValue::BigInt(3)]], 0),
        ]));
        let ids = client(&pool)
            .fetch_vec(Target::Pool, "test.fetch", by_id(5), |row| {
                row.get_i64("id")
            })
            .await
            .unwrap();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_fetch_set_deduplicates() {
        let pool = MockPool::new();
        pool.push(RowSet::page(
            &["link"],
            vec![
                vec![SqlValue::Text("a".into())],
                vec![SqlValue::Text("a".into())],
                vec![SqlValue::Text("b".into())],
            ],
            0,
        ));
        let links = client(&pool)
            .fetch_set(Target::Pool, "test.fetch", by_id(5), |row| {
                row.get_string("link")
            })
            .await
            .unwrap();
        assert_eq!(links.len(), 2);
    }

    #[tokio::test]
    async fn test_execute_batch_rejects_empty_input() {
        let pool = MockPool::new();
        let builders: Vec<fn(&Dialect) -> Query> = Vec::new();
        let result = client(&pool)
            .execute_batch(Target::Pool, "test.batch", &builders)
            .await;
        assert!(matches!(result, Err(Error::EmptyBatch)));
        assert!(pool.calls().is_empty());
    }

    #[tokio::test]
    async fn test_execute_batch_sums_affected_across_pages() {
        let pool = MockPool::new();
        pool.push(RowSet::chain(vec![
            RowSet::page(&[], vec![], 1),
            RowSet::page(&[], vec![], 1),
        ]));
        let builders: Vec<_> = ["/a", "/b"]
            .iter()
            .map(|path| {
                move |_: &Dialect| {
                    Insert::into("schemas")
                        .set("path", *path)
                        .set("version_id", 9i64)
                        .build()
                }
            })
            .collect();
        let affected = client(&pool)
            .execute_batch(Target::Pool, "test.batch", &builders)
            .await
            .unwrap();
        assert_eq!(affected, 2);

        let calls = pool.calls();
        assert!(calls[0].batch);
        assert_eq!(
            calls[0].sql,
            "insert into schemas (path, version_id) values ($1, $2)"
        );
        assert_eq!(
            calls[0].batches,
            vec![
                vec![SqlValue::Text("/a".into()), SqlValue::BigInt(9)],
                vec![SqlValue::Text("/b".into()), SqlValue::BigInt(9)],
            ]
        );
    }

    #[tokio::test]
    async fn test_fetch_batch_concatenates_in_submission_order() {
        let pool = MockPool::new();
        pool.push(RowSet::chain(vec![
            RowSet::page(&["id"], vec![vec![SqlValue::BigInt(11)]], 1),
            RowSet::page(&["id"], vec![vec![SqlValue::BigInt(12)]], 1),
        ]));
        let builders: Vec<_> = [1i64, 2]
            .iter()
            .map(|v| move |_: &Dialect| Insert::into("schemas").set("version_id", *v).build())
            .collect();
        let ids = client(&pool)
            .fetch_batch(Target::Pool, "test.batch", &builders, |row| {
                row.get_i64("id")
            })
            .await
            .unwrap();
        assert_eq!(ids, vec![11, 12]);
    }

    #[tokio::test]
    async fn test_failure_propagates_unchanged() {
        let pool = MockPool::new();
        pool.push_err(Error::Database(sqlx::Error::RowNotFound));
        let result = client(&pool)
            .execute(Target::Pool, "test.execute", by_id(5))
            .await;
        assert!(matches!(
            result,
            Err(Error::Database(sqlx::Error::RowNotFound))
        ));
    }

    #[tokio::test]
    async fn test_scoped_target_does_not_touch_the_pool() {
        let pool = MockPool::new();
        pool.push(RowSet::page(&[], vec![], 1));
        let mut conn = pool.conn();
        let affected = client(&pool)
            .execute(Target::Scoped(&mut conn), "test.execute", by_id(5))
            .await
            .unwrap();
        assert_eq!(affected, 1);
        assert_eq!(pool.acquired(), 0);
    }
}
