//! DDL applied to the shard stores and the coordinator store.
//!
//! Pragmas are applied at connection time (see the coordinator), so
//! the statements here are plain DDL.

pub const CREATE_URLS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS urls (
    url         TEXT DEFAULT NULL,
    short_key   TEXT NOT NULL,
    malicious   INTEGER DEFAULT NULL,
    generation  INTEGER NOT NULL DEFAULT 1,
    created_at  TIMESTAMP NOT NULL,
    updated_at  TIMESTAMP NOT NULL,
    deleted_at  TIMESTAMP
)
"#;

pub const CREATE_SHORT_KEY_INDEX: &str =
    "CREATE UNIQUE INDEX IF NOT EXISTS idx_short_key ON urls (short_key)";

// Partial index keeps the free-inventory scan cheap even when the
// store holds billions of assigned rows.
pub const CREATE_NULL_URL_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_null_url ON urls (url) WHERE url IS NULL";

pub const CREATE_SHARD_STATUS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS shard_status (
    shard_id    TEXT NOT NULL,
    shard_char  TEXT NOT NULL,
    start       INTEGER NOT NULL,
    "end"       INTEGER NOT NULL,
    generation  INTEGER NOT NULL DEFAULT 1,
    status      TEXT NOT NULL,
    created_at  TIMESTAMP NOT NULL,
    updated_at  TIMESTAMP NOT NULL,
    PRIMARY KEY (shard_id, shard_char)
)
"#;
