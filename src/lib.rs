//! # Schema Registry Core
//!
//! The data-access core of a metadata registry mapping named structures to
//! versions to schemas, backed by PostgreSQL. Everything funnels through the
//! generic execution engine in [`db`]; the entity daos in [`store`] build
//! abstract query descriptions and hand them to it.
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use schema_registry::config::DbConfig;
//! use schema_registry::db::Target;
//! use schema_registry::store::{self, StructureDao};
//!
//! let db = Arc::new(DbConfig::default().connect().await?);
//! store::initialize(db.pool().inner()).await?;
//!
//! let structures = StructureDao::new(Arc::clone(&db));
//! let id = structures.upsert(Target::Pool, "events").await?;
//!
//! // Statements that must share a transaction run on a scoped target:
//! let mut tx = db.pool().begin().await?;
//! structures.try_delete(Target::Scoped(&mut *tx), id.unwrap()).await?;
//! tx.commit().await?;
//! ```

pub mod config;
pub mod db;
pub mod error;
pub mod store;
pub mod types;
