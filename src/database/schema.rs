//! Database schema definitions
//!
//! Every entity table has the same physical shape: the primary id, the
//! tenant columns and the `type` discriminator are lifted out for indexing,
//! and the full row is kept as a JSONB body.

use super::StoreTable;

/// Schema version for migrations
pub const SCHEMA_VERSION: i32 = 1;

/// Database schema helper
pub struct DatabaseSchema;

impl DatabaseSchema {
    /// Table creation SQL, one body table per [`StoreTable`]
    pub fn create_tables_sql() -> String {
        let mut sql = String::from(
            r#"
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP
);
"#,
        );
        for table in StoreTable::ALL {
            sql.push_str(&format!(
                r#"
CREATE TABLE IF NOT EXISTS {name} (
    id TEXT PRIMARY KEY,
    user_id TEXT,
    organization_id TEXT,
    kind TEXT,
    body JSONB NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP
);
"#,
                name = table.table_name()
            ));
        }
        sql
    }

    /// Tenant and kind indexes for every body table
    pub fn create_indexes_sql() -> String {
        StoreTable::ALL
            .iter()
            .map(|table| {
                let name = table.table_name();
                format!(
                    "CREATE INDEX IF NOT EXISTS idx_{name}_org ON {name}(organization_id, user_id);\n\
                     CREATE INDEX IF NOT EXISTS idx_{name}_kind ON {name}(organization_id, kind);\n"
                )
            })
            .collect()
    }

    pub fn record_schema_version_sql() -> &'static str {
        "INSERT INTO schema_version (version) VALUES ($1) ON CONFLICT (version) DO NOTHING"
    }

    /// Drop every table (testing and reset)
    pub fn drop_all_tables_sql() -> String {
        let mut sql: String = StoreTable::ALL
            .iter()
            .rev()
            .map(|table| format!("DROP TABLE IF EXISTS {};\n", table.table_name()))
            .collect();
        sql.push_str("DROP TABLE IF EXISTS schema_version;\n");
        sql
    }
}

/// SQL for body table operations
pub mod body_sql {
    use super::StoreTable;

    /// Insert or replace one row. Parameters: id, user_id, organization_id,
    /// kind, body.
    pub fn upsert(table: StoreTable) -> String {
        format!(
            r#"
INSERT INTO {name} (id, user_id, organization_id, kind, body, updated_at)
VALUES ($1, $2, $3, $4, $5, CURRENT_TIMESTAMP)
ON CONFLICT (id) DO UPDATE SET
    user_id = EXCLUDED.user_id,
    organization_id = EXCLUDED.organization_id,
    kind = EXCLUDED.kind,
    body = EXCLUDED.body,
    updated_at = CURRENT_TIMESTAMP
"#,
            name = table.table_name()
        )
    }

    /// Filtered select. Parameters: user_id, organization_id, kind, ids; a
    /// NULL parameter disables its filter.
    pub fn select(table: StoreTable) -> String {
        format!(
            r#"
SELECT body FROM {name}
WHERE ($1::TEXT IS NULL OR user_id = $1)
  AND ($2::TEXT IS NULL OR organization_id = $2)
  AND ($3::TEXT IS NULL OR kind = $3)
  AND ($4::TEXT[] IS NULL OR id = ANY($4))
ORDER BY updated_at, id
"#,
            name = table.table_name()
        )
    }

    /// Transaction-scoped advisory lock on an organization
    pub const LOCK_ORGANIZATION: &str = "SELECT pg_advisory_xact_lock(hashtext($1))";
}
