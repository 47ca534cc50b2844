// ==========================================
// 物流批次跟踪系统 - 应用状态
// ==========================================
// 职责: 打开数据库、建表、装配仓储与 API 实例
// 约束: 全进程共享一个连接 (Arc<Mutex<Connection>>)，写操作在其上开工作单元
// ==========================================

use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::api::{BatchApi, ShipmentApi};
use crate::config::{AppConfig, ConfigManager};
use crate::db::{
    configure_sqlite_connection_with_timeout, init_schema, open_sqlite_connection,
    read_schema_version,
};
use crate::repository::{
    BatchRepository, MasterDataRepository, SharedConnection, ShipmentEventRepository,
    ShipmentRepository,
};

/// 应用状态
///
/// 作为 axum 的 State 在各路由间共享，克隆只复制 Arc
#[derive(Clone)]
pub struct AppState {
    /// 数据库路径 (内存库为 ":memory:")
    pub db_path: String,

    /// 共享连接
    pub conn: SharedConnection,

    /// 批次API
    pub batch_api: Arc<BatchApi>,

    /// 运单API
    pub shipment_api: Arc<ShipmentApi>,

    /// 主数据仓储 (网点/仓库/港口/承运商/客户)
    pub master_repo: Arc<MasterDataRepository>,

    /// 业务开关
    pub config_manager: Arc<ConfigManager>,
}

impl AppState {
    /// 按进程配置创建应用状态
    ///
    /// # 参数
    /// - config: 进程配置 (数据库路径、busy_timeout、慢 SQL 阈值)
    ///
    /// # 返回
    /// - Ok(AppState): 初始化成功
    /// - Err(String): 打开数据库或建表失败
    pub fn new(config: &AppConfig) -> Result<Self, String> {
        tracing::info!("初始化AppState，数据库路径: {}", config.db_path);

        let mut conn = open_sqlite_connection(&config.db_path, config.busy_timeout_ms)
            .map_err(|e| format!("无法打开数据库 {}: {}", config.db_path, e))?;
        crate::perf::install_sql_profiling(&mut conn, config.slow_sql_ms);

        Self::build(config.db_path.clone(), conn)
    }

    /// 基于已打开的连接创建应用状态 (测试与内存库使用)
    pub fn from_connection(conn: Connection) -> Result<Self, String> {
        configure_sqlite_connection_with_timeout(&conn, crate::db::DEFAULT_BUSY_TIMEOUT_MS)
            .map_err(|e| format!("配置数据库连接失败: {}", e))?;
        let db_path = conn
            .path()
            .filter(|p| !p.is_empty())
            .unwrap_or(":memory:")
            .to_string();
        Self::build(db_path, conn)
    }

    fn build(db_path: String, conn: Connection) -> Result<Self, String> {
        init_schema(&conn).map_err(|e| format!("初始化数据库结构失败: {}", e))?;
        match read_schema_version(&conn) {
            Ok(Some(version)) => tracing::info!(schema_version = version, "数据库结构就绪"),
            Ok(None) => tracing::warn!("未读取到 schema_version"),
            Err(e) => tracing::warn!("读取 schema_version 失败: {}", e),
        }

        let conn: SharedConnection = Arc::new(Mutex::new(conn));

        let batch_repo = Arc::new(BatchRepository::new(conn.clone()));
        let shipment_repo = Arc::new(ShipmentRepository::new(conn.clone()));
        let event_repo = Arc::new(ShipmentEventRepository::new(conn.clone()));
        let master_repo = Arc::new(MasterDataRepository::new(conn.clone()));
        let config_manager = Arc::new(ConfigManager::new(conn.clone()));

        let batch_api = Arc::new(BatchApi::new(
            conn.clone(),
            batch_repo,
            config_manager.clone(),
        ));
        let shipment_api = Arc::new(ShipmentApi::new(
            conn.clone(),
            shipment_repo,
            event_repo,
            master_repo.clone(),
        ));

        tracing::info!("AppState初始化完成");

        Ok(Self {
            db_path,
            conn,
            batch_api,
            shipment_api,
            master_repo,
            config_manager,
        })
    }
}
