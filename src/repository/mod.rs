// ==========================================
// 物流批次跟踪系统 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 提供数据访问接口,屏蔽数据库细节
// 约束: 所有查询使用参数化,防止 SQL 注入
// 约定: `*_tx` 函数在调用方持有的事务 (或连接) 上执行
// ==========================================

pub mod batch_repo;
pub mod error;
pub mod master_data_repo;
pub mod row_utils;
pub mod shipment_event_repo;
pub mod shipment_repo;
pub mod unit_of_work;

// 重导出核心仓储
pub use batch_repo::{BatchFilter, BatchRepository};
pub use error::{RepositoryError, RepositoryResult};
pub use master_data_repo::{MasterDataRepository, MasterTable};
pub use shipment_event_repo::ShipmentEventRepository;
pub use shipment_repo::{ShipmentFilter, ShipmentRepository};
pub use unit_of_work::{lock_conn, SharedConnection, UnitOfWork};
