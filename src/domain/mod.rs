// ==========================================
// 物流批次跟踪系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod batch;
pub mod master_data;
pub mod shipment;
pub mod types;

// 重导出核心类型
pub use batch::{round_weight, Batch};
pub use master_data::{Branch, Carrier, Client, Port, Warehouse};
pub use shipment::{Shipment, ShipmentEvent};
pub use types::{BatchStatus, RoleType, ShipmentEventType, ShipmentStatus};
