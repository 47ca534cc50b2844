// ==========================================
// 物流批次跟踪系统 - 配置层
// ==========================================
// 职责: 进程配置 (环境变量) + 业务开关 (config_kv 表)
// ==========================================

pub mod app_config;
pub mod config_manager;

pub use app_config::AppConfig;
pub use config_manager::{config_keys, ConfigManager};
