// ==========================================
// 物流批次跟踪系统 - 进程配置
// ==========================================
// 来源: 环境变量，缺省时使用默认值
// ==========================================

use crate::db::DEFAULT_BUSY_TIMEOUT_MS;
use std::path::PathBuf;

pub const ENV_DB_PATH: &str = "SHIPMENT_TRACKER_DB_PATH";
pub const ENV_BIND_ADDR: &str = "SHIPMENT_TRACKER_BIND_ADDR";
pub const ENV_BUSY_TIMEOUT_MS: &str = "SQLITE_BUSY_TIMEOUT_MS";
pub const ENV_SLOW_SQL_MS: &str = "SHIPMENT_TRACKER_SLOW_SQL_MS";

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";
pub const DEFAULT_DB_FILE: &str = "shipment_tracker.db";

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub db_path: String,
    pub bind_addr: String,
    pub busy_timeout_ms: u64,
    /// 慢 SQL 阈值 (毫秒)，None 表示不记录语句耗时
    pub slow_sql_ms: Option<u64>,
}

impl AppConfig {
    /// 从环境变量加载
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 从任意键值来源加载
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let db_path = non_empty(ENV_DB_PATH).unwrap_or_else(default_db_path);
        let bind_addr = non_empty(ENV_BIND_ADDR).unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let busy_timeout_ms = match non_empty(ENV_BUSY_TIMEOUT_MS) {
            Some(raw) => raw.parse::<u64>().unwrap_or_else(|_| {
                tracing::warn!(raw_value = %raw, "{} 格式错误，使用默认值", ENV_BUSY_TIMEOUT_MS);
                DEFAULT_BUSY_TIMEOUT_MS
            }),
            None => DEFAULT_BUSY_TIMEOUT_MS,
        };
        let slow_sql_ms = non_empty(ENV_SLOW_SQL_MS)
            .and_then(|raw| raw.parse::<u64>().ok())
            .filter(|ms| *ms > 0);

        Self {
            db_path,
            bind_addr,
            busy_timeout_ms,
            slow_sql_ms,
        }
    }
}

/// 默认数据库路径
///
/// 优先使用系统数据目录，不可用时回退到当前目录
pub fn default_db_path() -> String {
    let path = match dirs::data_dir() {
        Some(dir) => {
            let app_dir: PathBuf = dir.join("shipment-tracker");
            if let Err(e) = std::fs::create_dir_all(&app_dir) {
                tracing::warn!("创建数据目录失败: {}, 使用当前目录", e);
                return DEFAULT_DB_FILE.to_string();
            }
            app_dir.join(DEFAULT_DB_FILE)
        }
        None => PathBuf::from(DEFAULT_DB_FILE),
    };
    path.to_string_lossy().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_explicit_values() {
        let env: HashMap<&str, &str> = [
            (ENV_DB_PATH, "/tmp/st.db"),
            (ENV_BIND_ADDR, "0.0.0.0:9000"),
            (ENV_BUSY_TIMEOUT_MS, "250"),
            (ENV_SLOW_SQL_MS, "40"),
        ]
        .into_iter()
        .collect();
        let cfg = AppConfig::from_lookup(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(cfg.db_path, "/tmp/st.db");
        assert_eq!(cfg.bind_addr, "0.0.0.0:9000");
        assert_eq!(cfg.busy_timeout_ms, 250);
        assert_eq!(cfg.slow_sql_ms, Some(40));
    }

    #[test]
    fn test_defaults() {
        let cfg = AppConfig::from_lookup(|k| {
            if k == ENV_BUSY_TIMEOUT_MS {
                Some("abc".to_string())
            } else {
                None
            }
        });
        assert_eq!(cfg.bind_addr, DEFAULT_BIND_ADDR);
        assert_eq!(cfg.busy_timeout_ms, DEFAULT_BUSY_TIMEOUT_MS);
        assert!(cfg.db_path.ends_with(DEFAULT_DB_FILE));
        assert_eq!(cfg.slow_sql_ms, None);
    }
}
