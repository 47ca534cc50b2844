// ==========================================
// 物流批次跟踪系统 - 核心库
// ==========================================
// 技术栈: axum + Rust + SQLite
// 系统定位: 批次生命周期状态机 (批次 → 运单 → 事件时间线)
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 业务规则
pub mod engine;

// 配置层 - 进程配置与业务开关
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA/建表）
pub mod db;

// 日志系统
pub mod logging;

// 请求耗时与慢 SQL 记录
pub mod perf;

// API 层 - 业务接口
pub mod api;

// 应用层 - 状态装配与 HTTP
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{BatchStatus, RoleType, ShipmentEventType, ShipmentStatus};

// 领域实体
pub use domain::{Batch, Branch, Carrier, Client, Port, Shipment, ShipmentEvent, Warehouse};

// 引擎
pub use engine::{
    BatchAggregate, BatchCommand, BatchOperation, BatchStateMachine, CarrierAssignment,
    CarrierAssignmentPlanner, ShipmentStatusProjector,
};

// API
pub use api::{ApiError, ApiResult, BatchApi, Caller, ShipmentApi};

// 应用
pub use app::{router, AppState};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "物流批次跟踪系统";
