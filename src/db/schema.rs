/// Schema for everything the program persists. Applied on every open.
pub const SCHEMA: &str = r#"
-- Recurring expenses. AUTOINCREMENT keeps ids from being reused after deletes.
CREATE TABLE IF NOT EXISTS expenses (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    name        TEXT NOT NULL,
    amount      TEXT NOT NULL,
    frequency   TEXT NOT NULL,
    day         TEXT NOT NULL,
    created_on  TEXT NOT NULL DEFAULT (date('now'))
);

-- Single-value settings (budget amount)
CREATE TABLE IF NOT EXISTS settings (
    key   TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

-- Named, versioned asset caches
CREATE TABLE IF NOT EXISTS caches (
    name        TEXT PRIMARY KEY,
    created_at  TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS cache_entries (
    cache_name  TEXT NOT NULL,
    key_hash    TEXT NOT NULL,
    method      TEXT NOT NULL,
    url         TEXT NOT NULL,
    status      INTEGER NOT NULL,
    kind        TEXT NOT NULL,
    headers     TEXT NOT NULL,
    body        BLOB NOT NULL,
    cached_at   TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (cache_name, key_hash),
    FOREIGN KEY (cache_name) REFERENCES caches(name) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_cache_entries_name ON cache_entries(cache_name);
"#;
