//! Entity daos and their lookup keys.
//!
//! Lookups that accept several alternative identifiers are expressed as
//! tagged unions constructed once at the boundary. Resolution priority is
//! fixed: a direct id wins outright, then a parent id plus name, then the
//! fully qualified natural-key chain joined through the parent tables.
//! Partial specificities are never combined.

mod ddl;
mod schema;
mod structure;
mod version;

pub use ddl::{SCHEMA, initialize};
pub use schema::SchemaDao;
pub use structure::StructureDao;
pub use version::VersionDao;

/// How to find a structure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StructureKey {
    ById(i64),
    ByName(String),
}

/// How to find a version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionKey {
    ById(i64),
    ByStructure { structure_id: i64, name: String },
    ByNames {
        structure_name: String,
        version_name: String,
    },
}

/// How to find a schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaKey {
    ById(i64),
    ByNaturalKey {
        path: String,
        version_name: String,
        structure_name: String,
    },
}
