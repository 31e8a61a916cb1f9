/// Schema for the local stores.
pub const SCHEMA: &str = r#"
-- Key-value pairs, partitioned by scope ('session' or 'local')
CREATE TABLE IF NOT EXISTS kv_store (
    scope TEXT NOT NULL,
    key TEXT NOT NULL,
    value TEXT NOT NULL,
    PRIMARY KEY (scope, key)
);

-- TTL cache of resource payloads (serialized JSON)
CREATE TABLE IF NOT EXISTS resource_cache (
    cache_key TEXT PRIMARY KEY,
    data TEXT NOT NULL,
    fetched_at_millis INTEGER NOT NULL
);
"#;
