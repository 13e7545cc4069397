use std::sync::Arc;

use chrono::Utc;

use super::StructureKey;
use crate::db::{Delete, DbClient, Insert, Predicate, Select, SqlPool, Target, Value};
use crate::error::Result;
use crate::types::Structure;

pub struct StructureDao<P: SqlPool> {
    db: Arc<DbClient<P>>,
}

impl<P: SqlPool> StructureDao<P> {
    pub fn new(db: Arc<DbClient<P>>) -> Self {
        Self { db }
    }

    /// Inserts the structure, or touches `updated_at` when the name is
    /// already taken. Returns the row's id either way.
    pub async fn upsert(&self, target: Target<'_>, name: &str) -> Result<Option<i64>> {
        let now = Utc::now();
        self.db
            .fetch_optional(
                target,
                "structures.upsert",
                |_| {
                    Insert::into("structures")
                        .set("name", name)
                        .set("created_at", now)
                        .set("updated_at", now)
                        .on_conflict_update("name", vec![("updated_at", Value::from(now))])
                        .returning("id")
                        .build()
                },
                |row| row.get_i64("id"),
            )
            .await
    }

    pub async fn get(&self, target: Target<'_>, key: &StructureKey) -> Result<Option<Structure>> {
        self.db
            .fetch_optional(
                target,
                "structures.get",
                |_| {
                    let query = Select::from("structures");
                    match key {
                        StructureKey::ById(id) => query.filter(Predicate::eq("id", *id)),
                        StructureKey::ByName(name) => {
                            query.filter(Predicate::eq("name", name.as_str()))
                        }
                    }
                    .build()
                },
                |row| {
                    Ok(Structure {
                        id: row.get_i64("id")?,
                        name: row.get_string("name")?,
                        created_at: row.get_timestamp("created_at")?,
                        updated_at: row.get_timestamp("updated_at")?,
                    })
                },
            )
            .await
    }

    pub async fn delete(&self, target: Target<'_>, id: i64) -> Result<u64> {
        self.db
            .execute(target, "structures.delete", |_| {
                Delete::from("structures")
                    .filter(Predicate::eq("id", id))
                    .build()
            })
            .await
    }

    /// Deletes the structure only while no version references it. An
    /// affected count of zero means the guard failed or the row was already
    /// gone; callers must inspect the count.
    pub async fn try_delete(&self, target: Target<'_>, id: i64) -> Result<u64> {
        self.db
            .execute(target, "structures.try_delete", |_| {
                Delete::from("structures")
                    .filter(Predicate::eq("id", id))
                    .filter(Predicate::not_exists(
                        Select::from("versions")
                            .column("1")
                            .filter(Predicate::eq("versions.structure_id", id)),
                    ))
                    .build()
            })
            .await
    }
}
