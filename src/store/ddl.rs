use sqlx::PgPool;

use crate::error::Result;

pub const SCHEMA: &str = r#"
-- Top-level named entities
CREATE TABLE IF NOT EXISTS structures (
    id BIGSERIAL PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

-- Named revisions under a structure
CREATE TABLE IF NOT EXISTS versions (
    id BIGSERIAL PRIMARY KEY,
    name TEXT NOT NULL,
    structure_id BIGINT NOT NULL REFERENCES structures(id),
    link TEXT NOT NULL,       -- opaque pointer to externally stored content
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),

    UNIQUE (structure_id, name)
);

-- Leaf entities identified by a path, owned by exactly one version
CREATE TABLE IF NOT EXISTS schemas (
    id BIGSERIAL PRIMARY KEY,
    path TEXT NOT NULL,
    version_id BIGINT NOT NULL REFERENCES versions(id) ON DELETE CASCADE,
    link TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_versions_structure ON versions(structure_id);
CREATE INDEX IF NOT EXISTS idx_schemas_version ON schemas(version_id);
CREATE INDEX IF NOT EXISTS idx_schemas_path ON schemas(path);
"#;

/// Creates the registry tables if they do not exist.
pub async fn initialize(pool: &PgPool) -> Result<()> {
    sqlx::raw_sql(SCHEMA).execute(pool).await?;
    Ok(())
}
