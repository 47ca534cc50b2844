// ==========================================
// 物流批次跟踪系统 - SQLite 连接与建表
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为 (外键 / busy_timeout)
// - 内嵌建表脚本，启动时幂等执行
// ==========================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// 时间戳存储格式 (UTC)
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// 建表脚本
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS branch (
    id          INTEGER PRIMARY KEY,
    name        TEXT NOT NULL UNIQUE,
    address     TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS warehouse (
    id          INTEGER PRIMARY KEY,
    name        TEXT NOT NULL UNIQUE,
    address     TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS port (
    id          INTEGER PRIMARY KEY,
    name        TEXT NOT NULL UNIQUE,
    address     TEXT NOT NULL,
    country     TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS carrier (
    id           INTEGER PRIMARY KEY,
    name         TEXT NOT NULL UNIQUE,
    contact_info TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS client (
    id           INTEGER PRIMARY KEY,
    user_id      INTEGER NOT NULL UNIQUE,
    name         TEXT NOT NULL,
    phone_number TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS batch (
    id                       INTEGER PRIMARY KEY,
    branch_id                INTEGER NOT NULL REFERENCES branch(id),
    name                     TEXT NOT NULL,
    status                   TEXT NOT NULL,
    shipment_count           INTEGER NOT NULL DEFAULT 0 CHECK (shipment_count >= 0),
    total_weight             REAL NOT NULL DEFAULT 0 CHECK (total_weight >= 0),
    threshold_count          INTEGER NOT NULL,
    threshold_weight         REAL NOT NULL,
    source_warehouse_id      INTEGER REFERENCES warehouse(id),
    destination_warehouse_id INTEGER REFERENCES warehouse(id),
    source_port_id           INTEGER REFERENCES port(id),
    destination_port_id      INTEGER REFERENCES port(id),
    carrier_assigned_at      TEXT,
    revision                 INTEGER NOT NULL DEFAULT 0,
    created_at               TEXT NOT NULL,
    updated_at               TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_batch_branch_status ON batch(branch_id, status);

CREATE TABLE IF NOT EXISTS shipment (
    id               INTEGER PRIMARY KEY,
    client_id        INTEGER NOT NULL REFERENCES client(id),
    batch_id         INTEGER REFERENCES batch(id),
    status           TEXT NOT NULL,
    weight           REAL NOT NULL CHECK (weight > 0),
    volume           REAL,
    pickup_address   TEXT NOT NULL,
    delivery_address TEXT NOT NULL,
    carrier_id       INTEGER REFERENCES carrier(id),
    revision         INTEGER NOT NULL DEFAULT 0,
    created_at       TEXT NOT NULL,
    updated_at       TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_shipment_batch ON shipment(batch_id);
CREATE INDEX IF NOT EXISTS idx_shipment_client ON shipment(client_id);
CREATE INDEX IF NOT EXISTS idx_shipment_carrier ON shipment(carrier_id);

CREATE TABLE IF NOT EXISTS shipment_event (
    id            INTEGER PRIMARY KEY,
    shipment_id   INTEGER NOT NULL REFERENCES shipment(id),
    event_type    TEXT NOT NULL,
    actor_user_id INTEGER,
    location      TEXT,
    message       TEXT NOT NULL,
    created_at    TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_shipment_event_shipment ON shipment_event(shipment_id, created_at);

CREATE TABLE IF NOT EXISTS config_kv (
    key         TEXT PRIMARY KEY,
    value       TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS schema_version (
    version     INTEGER PRIMARY KEY,
    applied_at  TEXT NOT NULL
);
"#;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要“每个连接”单独开启
/// - busy_timeout 需要“每个连接”单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    configure_sqlite_connection_with_timeout(conn, DEFAULT_BUSY_TIMEOUT_MS)
}

/// 配置 SQLite 连接 (自定义 busy_timeout)
pub fn configure_sqlite_connection_with_timeout(
    conn: &Connection,
    busy_timeout_ms: u64,
) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(busy_timeout_ms))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str, busy_timeout_ms: u64) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection_with_timeout(&conn, busy_timeout_ms)?;
    Ok(conn)
}

/// 建表并登记 schema_version (幂等)
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA)?;
    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version, applied_at) VALUES (?, ?)",
        rusqlite::params![
            CURRENT_SCHEMA_VERSION,
            chrono::Utc::now().naive_utc().format(TIMESTAMP_FORMAT).to_string()
        ],
    )?;
    Ok(())
}

/// 读取 schema_version（若表不存在则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> = conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        configure_sqlite_connection(&conn).unwrap();
        assert_eq!(read_schema_version(&conn).unwrap(), None);

        init_schema(&conn).unwrap();
        init_schema(&conn).unwrap();
        assert_eq!(read_schema_version(&conn).unwrap(), Some(CURRENT_SCHEMA_VERSION));
    }

    #[test]
    fn test_foreign_keys_enforced() {
        let conn = Connection::open_in_memory().unwrap();
        configure_sqlite_connection(&conn).unwrap();
        init_schema(&conn).unwrap();

        let result = conn.execute(
            "INSERT INTO batch (branch_id, name, status, threshold_count, threshold_weight, created_at, updated_at)
             VALUES (999, 'orphan', 'DRAFT', 1, 1.0, 'x', 'x')",
            [],
        );
        assert!(result.is_err());
    }
}
