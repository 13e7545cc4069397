use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;

use super::VersionKey;
use crate::db::{Delete, DbClient, Insert, JoinCond, Predicate, Select, SqlPool, Target};
use crate::error::Result;
use crate::types::{NewVersion, Version, VersionRef};

pub struct VersionDao<P: SqlPool> {
    db: Arc<DbClient<P>>,
}

impl<P: SqlPool> VersionDao<P> {
    pub fn new(db: Arc<DbClient<P>>) -> Self {
        Self { db }
    }

    pub async fn create(&self, target: Target<'_>, version: &NewVersion) -> Result<Option<i64>> {
        let now = Utc::now();
        self.db
            .fetch_optional(
                target,
                "versions.create",
                |_| {
                    Insert::into("versions")
                        .set("name", version.name.as_str())
                        .set("structure_id", version.structure_id)
                        .set("link", version.link.as_str())
                        .set("created_at", now)
                        .returning("id")
                        .build()
                },
                |row| row.get_i64("id"),
            )
            .await
    }

    /// Resolves the version's link by the most specific identifier present:
    /// id, else structure id + name, else the name chain through structures.
    pub async fn get_link(&self, target: Target<'_>, key: &VersionKey) -> Result<Option<String>> {
        self.db
            .fetch_optional(
                target,
                "versions.get_link",
                |_| {
                    let query = Select::from("versions").column("versions.link");
                    match key {
                        VersionKey::ById(id) => query.filter(Predicate::eq("versions.id", *id)),
                        VersionKey::ByStructure { structure_id, name } => query
                            .filter(Predicate::eq("versions.name", name.as_str()))
                            .filter(Predicate::eq("versions.structure_id", *structure_id)),
                        VersionKey::ByNames {
                            structure_name,
                            version_name,
                        } => query
                            .join(
                                "structures",
                                vec![JoinCond::Columns(
                                    "structures.id",
                                    "versions.structure_id",
                                )],
                            )
                            .filter(Predicate::eq("versions.name", version_name.as_str()))
                            .filter(Predicate::eq("structures.name", structure_name.as_str())),
                    }
                    .build()
                },
                |row| row.get_string("link"),
            )
            .await
    }

    pub async fn get(
        &self,
        target: Target<'_>,
        structure_id: i64,
        name: &str,
    ) -> Result<Option<VersionRef>> {
        self.db
            .fetch_optional(
                target,
                "versions.get",
                |_| {
                    Select::from("versions")
                        .columns(&["versions.id", "versions.link"])
                        .filter(Predicate::eq("versions.structure_id", structure_id))
                        .filter(Predicate::eq("versions.name", name))
                        .build()
                },
                |row| {
                    Ok(VersionRef {
                        id: row.get_i64("id")?,
                        link: row.get_string("link")?,
                    })
                },
            )
            .await
    }

    /// Deletes the version and hands back the owning structure's id so the
    /// caller can decide whether to clean up the structure as well.
    pub async fn delete_returning_structure_id(
        &self,
        target: Target<'_>,
        id: i64,
    ) -> Result<Option<i64>> {
        self.db
            .fetch_optional(
                target,
                "versions.delete",
                |_| {
                    Delete::from("versions")
                        .filter(Predicate::eq("id", id))
                        .returning("structure_id")
                        .build()
                },
                |row| row.get_i64("structure_id"),
            )
            .await
    }

    pub async fn delete(&self, target: Target<'_>, id: i64) -> Result<u64> {
        self.db
            .execute(target, "versions.delete", |_| {
                Delete::from("versions")
                    .filter(Predicate::eq("id", id))
                    .build()
            })
            .await
    }

    /// Id/link pairs of every version under the structure.
    pub async fn refs_by_structure(
        &self,
        target: Target<'_>,
        structure_id: i64,
    ) -> Result<HashSet<VersionRef>> {
        self.db
            .fetch_set(
                target,
                "versions.refs_by_structure",
                |_| {
                    Select::from("versions")
                        .columns(&["versions.id", "versions.link"])
                        .filter(Predicate::eq("versions.structure_id", structure_id))
                        .build()
                },
                |row| {
                    Ok(VersionRef {
                        id: row.get_i64("id")?,
                        link: row.get_string("link")?,
                    })
                },
            )
            .await
    }

    pub async fn list_by_structure(
        &self,
        target: Target<'_>,
        structure_id: i64,
    ) -> Result<HashSet<Version>> {
        self.db
            .fetch_set(
                target,
                "versions.list_by_structure",
                |_| {
                    Select::from("versions")
                        .filter(Predicate::eq("structure_id", structure_id))
                        .build()
                },
                |row| {
                    Ok(Version {
                        id: row.get_i64("id")?,
                        name: row.get_string("name")?,
                        structure_id: row.get_i64("structure_id")?,
                        link: row.get_string("link")?,
                        created_at: row.get_timestamp("created_at")?,
                    })
                },
            )
            .await
    }
}
