// ==========================================
// 物流批次跟踪系统 - 配置管理器
// ==========================================
// 职责: 运行期业务开关的查询与覆写
// 存储: config_kv 表 (key-value)
// ==========================================

use crate::repository::error::RepositoryResult;
use crate::repository::row_utils::format_ts;
use crate::repository::unit_of_work::{lock_conn, SharedConnection};
use rusqlite::{params, OptionalExtension};
use serde_json::json;
use std::collections::BTreeMap;

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: SharedConnection,
}

impl ConfigManager {
    /// 从已有连接创建 ConfigManager
    pub fn new(conn: SharedConnection) -> Self {
        Self { conn }
    }

    /// 读取配置值
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    pub fn get_value(&self, key: &str) -> RepositoryResult<Option<String>> {
        let conn = lock_conn(&self.conn)?;
        let value = conn
            .query_row(
                "SELECT value FROM config_kv WHERE key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    /// 写入配置值 (存在则覆盖)
    pub fn set_value(&self, key: &str, value: &str) -> RepositoryResult<()> {
        let conn = lock_conn(&self.conn)?;
        conn.execute(
            "INSERT INTO config_kv (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = ?2, updated_at = ?3",
            params![key, value, format_ts(&chrono::Utc::now().naive_utc())],
        )?;
        tracing::info!(config_key = key, value = value, "配置已更新");
        Ok(())
    }

    /// 读取布尔开关
    ///
    /// 无法识别的值按默认值处理并记录告警
    pub fn get_bool(&self, key: &str, default: bool) -> RepositoryResult<bool> {
        let raw = match self.get_value(key)? {
            Some(v) => v,
            None => return Ok(default),
        };
        match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => {
                tracing::warn!(
                    config_key = key,
                    raw_value = %raw,
                    "布尔配置格式错误，使用默认值"
                );
                Ok(default)
            }
        }
    }

    /// 超出建议容量时是否告警
    pub fn threshold_warning_enabled(&self) -> RepositoryResult<bool> {
        self.get_bool(config_keys::THRESHOLD_WARNING_ENABLED, true)
    }

    /// 批次推进时是否同步成员运单状态
    pub fn project_batch_status(&self) -> RepositoryResult<bool> {
        self.get_bool(config_keys::PROJECT_BATCH_STATUS, true)
    }

    /// 获取所有配置的快照（JSON格式，按键排序）
    pub fn snapshot(&self) -> RepositoryResult<String> {
        let conn = lock_conn(&self.conn)?;
        let mut stmt = conn.prepare("SELECT key, value FROM config_kv ORDER BY key")?;

        let mut config_map: BTreeMap<String, String> = BTreeMap::new();
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;
        for row in rows {
            let (key, value) = row?;
            config_map.insert(key, value);
        }

        Ok(json!(config_map).to_string())
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 批次
    pub const THRESHOLD_WARNING_ENABLED: &str = "batch.threshold_warning_enabled";

    // 运单
    pub const PROJECT_BATCH_STATUS: &str = "shipment.project_batch_status";
}
