use std::collections::HashSet;
use std::sync::Arc;

use super::SchemaKey;
use crate::db::{DbClient, Dialect, Insert, JoinCond, Predicate, Select, SqlPool, Target, Value};
use crate::error::Result;
use crate::types::{NewSchema, Schema};

pub struct SchemaDao<P: SqlPool> {
    db: Arc<DbClient<P>>,
}

impl<P: SqlPool> SchemaDao<P> {
    pub fn new(db: Arc<DbClient<P>>) -> Self {
        Self { db }
    }

    /// Batch-inserts the schemas, returning their generated ids in input
    /// order.
    pub async fn create(&self, target: Target<'_>, schemas: &[NewSchema]) -> Result<Vec<i64>> {
        let builders: Vec<_> = schemas
            .iter()
            .map(|schema| {
                move |_: &Dialect| {
                    Insert::into("schemas")
                        .set("path", schema.path.as_str())
                        .set("version_id", schema.version_id)
                        .set("link", schema.link.as_str())
                        .returning("id")
                        .build()
                }
            })
            .collect();
        self.db
            .fetch_batch(target, "schemas.create", &builders, |row| row.get_i64("id"))
            .await
    }

    /// Resolves the schema's link: direct id wins, otherwise the natural-key
    /// chain joins through versions and structures matched by name.
    pub async fn get_link(&self, target: Target<'_>, key: &SchemaKey) -> Result<Option<String>> {
        self.db
            .fetch_optional(
                target,
                "schemas.get_link",
                |_| {
                    let query = Select::from("schemas").column("schemas.link");
                    match key {
                        SchemaKey::ById(id) => query.filter(Predicate::eq("schemas.id", *id)),
                        SchemaKey::ByNaturalKey {
                            path,
                            version_name,
                            structure_name,
                        } => query
                            .join(
                                "versions",
                                vec![
                                    JoinCond::Columns("versions.id", "schemas.version_id"),
                                    JoinCond::Bound(
                                        "versions.name",
                                        Value::from(version_name.as_str()),
                                    ),
                                ],
                            )
                            .join(
                                "structures",
                                vec![
                                    JoinCond::Columns("structures.id", "versions.structure_id"),
                                    JoinCond::Bound(
                                        "structures.name",
                                        Value::from(structure_name.as_str()),
                                    ),
                                ],
                            )
                            .filter(Predicate::eq("schemas.path", path.as_str())),
                    }
                    .build()
                },
                |row| row.get_string("link"),
            )
            .await
    }

    pub async fn links_by_version_id(
        &self,
        target: Target<'_>,
        version_id: i64,
    ) -> Result<HashSet<String>> {
        self.db
            .fetch_set(
                target,
                "schemas.links_by_version_id",
                |_| {
                    Select::from("schemas")
                        .column("schemas.link")
                        .filter(Predicate::eq("schemas.version_id", version_id))
                        .build()
                },
                |row| row.get_string("link"),
            )
            .await
    }

    pub async fn links_by_version_ids(
        &self,
        target: Target<'_>,
        version_ids: &[i64],
    ) -> Result<HashSet<String>> {
        self.db
            .fetch_set(
                target,
                "schemas.links_by_version_ids",
                |_| {
                    Select::from("schemas")
                        .column("schemas.link")
                        .filter(Predicate::any_of("schemas.version_id", version_ids.to_vec()))
                        .build()
                },
                |row| row.get_string("link"),
            )
            .await
    }

    pub async fn records_by_version_ids(
        &self,
        target: Target<'_>,
        version_ids: &[i64],
    ) -> Result<HashSet<Schema>> {
        self.db
            .fetch_set(
                target,
                "schemas.records_by_version_ids",
                |_| {
                    Select::from("schemas")
                        .filter(Predicate::any_of("version_id", version_ids.to_vec()))
                        .build()
                },
                |row| {
                    Ok(Schema {
                        id: row.get_i64("id")?,
                        path: row.get_string("path")?,
                        version_id: row.get_i64("version_id")?,
                        link: row.get_string("link")?,
                    })
                },
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testing::MockPool;
    use crate::db::{RowSet, SqlValue};

    fn dao(pool: &MockPool) -> SchemaDao<MockPool> {
        SchemaDao::new(Arc::new(DbClient::new(pool.clone(), Dialect::default())))
    }

    fn new_schema(path: &str, version_id: i64) -> NewSchema {
        NewSchema {
            path: path.to_string(),
            version_id,
            link: format!("s3://bucket{path}"),
        }
    }

    #[tokio::test]
    async fn test_create_batches_one_template_and_per_row_binds() {
        let pool = MockPool::new();
        pool.push(RowSet::chain(vec![
            RowSet::page(&["id"], vec![vec![SqlValue::BigInt(21)]], 1),
            RowSet::page(&["id"], vec![vec![SqlValue::BigInt(22)]], 1),
        ]));
        let ids = dao(&pool)
            .create(
                Target::Pool,
                &[new_schema("/a", 9), new_schema("/b", 9)],
            )
            .await
            .unwrap();
        assert_eq!(ids, vec![21, 22]);

        let call = &pool.calls()[0];
        assert!(call.batch);
        assert_eq!(
            call.sql,
            "insert into schemas (path, version_id, link) values ($1, $2, $3) returning id"
        );
        assert_eq!(call.batches.len(), 2);
        assert_eq!(call.batches[0][0], SqlValue::Text("/a".to_string()));
        assert_eq!(call.batches[1][0], SqlValue::Text("/b".to_string()));
    }

    #[tokio::test]
    async fn test_get_link_by_id() {
        let pool = MockPool::new();
        dao(&pool)
            .get_link(Target::Pool, &SchemaKey::ById(5))
            .await
            .unwrap();
        assert_eq!(
            pool.calls()[0].sql,
            "select schemas.link from schemas where schemas.id = $1"
        );
    }

    #[tokio::test]
    async fn test_get_link_by_natural_key_joins_the_chain() {
        let pool = MockPool::new();
        dao(&pool)
            .get_link(
                Target::Pool,
                &SchemaKey::ByNaturalKey {
                    path: "/a".to_string(),
                    version_name: "v1".to_string(),
                    structure_name: "s1".to_string(),
                },
            )
            .await
            .unwrap();
        let call = &pool.calls()[0];
        assert_eq!(
            call.sql,
            "select schemas.link from schemas \
             join versions on versions.id = schemas.version_id and versions.name = $1 \
             join structures on structures.id = versions.structure_id and structures.name = $2 \
             where schemas.path = $3"
        );
        assert_eq!(
            call.batches[0],
            vec![
                SqlValue::Text("v1".to_string()),
                SqlValue::Text("s1".to_string()),
                SqlValue::Text("/a".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_links_by_version_ids_binds_bare_array() {
        let pool = MockPool::new();
        pool.push(RowSet::page(
            &["link"],
            vec![
                vec![SqlValue::Text("s3://bucket/a".to_string())],
                vec![SqlValue::Text("s3://bucket/a".to_string())],
            ],
            0,
        ));
        let links = dao(&pool)
            .links_by_version_ids(Target::Pool, &[4, 5])
            .await
            .unwrap();
        assert_eq!(links.len(), 1);

        let call = &pool.calls()[0];
        // Cast suffix stripped; the array rides in the bind tuple.
        assert_eq!(
            call.sql,
            "select schemas.link from schemas where schemas.version_id = any($1)"
        );
        assert_eq!(call.batches[0], vec![SqlValue::BigIntArray(vec![4, 5])]);
    }
}
