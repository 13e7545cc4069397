use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Top-level named entity owning zero or more versions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Structure {
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Named revision under a structure, owning zero or more schemas.
/// `link` points at externally stored content and is opaque to the registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Version {
    pub id: i64,
    pub name: String,
    pub structure_id: i64,
    pub link: String,
    pub created_at: DateTime<Utc>,
}

/// Id and link of a version, for lookups that resolve the rest from context.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VersionRef {
    pub id: i64,
    pub link: String,
}

/// Leaf entity identified by a path, owned by exactly one version.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Schema {
    pub id: i64,
    pub path: String,
    pub version_id: i64,
    pub link: String,
}

/// Insert row for `versions`; `created_at` is set by the dao.
#[derive(Debug, Clone)]
pub struct NewVersion {
    pub name: String,
    pub structure_id: i64,
    pub link: String,
}

/// Insert row for `schemas`.
#[derive(Debug, Clone)]
pub struct NewSchema {
    pub path: String,
    pub version_id: i64,
    pub link: String,
}
