// ==========================================
// 物流批次跟踪系统 - 领域类型定义
// ==========================================
// 职责: 批次状态 / 运单状态 / 角色 / 运单事件类型
// 序列化格式: SCREAMING_SNAKE_CASE (与数据库一致)
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 批次状态 (Batch Status)
// ==========================================
// 主链: DRAFT → OPEN → CLOSED → IN_WAREHOUSE → AT_SOURCE_PORT
//       → CLEARED_SOURCE_PORT → IN_TRANSIT → ARRIVED_DESTINATION_PORT
//       → IN_DESTINATION_WAREHOUSE → ASSIGNED_TO_CARRIERS
//       → DELIVERED | PARTIALLY_DELIVERED
// 旁路终态: CANCELLED / ARCHIVED
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BatchStatus {
    Draft,                  // 草稿
    Open,                   // 开放收货
    Closed,                 // 已封批
    InWarehouse,            // 始发仓
    AtSourcePort,           // 始发港
    ClearedSourcePort,      // 始发港已放行
    InTransit,              // 在途
    ArrivedDestinationPort, // 到达目的港
    InDestinationWarehouse, // 目的仓
    AssignedToCarriers,     // 已分配承运商
    Delivered,              // 已妥投
    PartiallyDelivered,     // 部分妥投
    Cancelled,              // 已取消
    Archived,               // 已归档
}

impl BatchStatus {
    /// 全部状态 (按管线顺序)
    pub const ALL: [BatchStatus; 14] = [
        BatchStatus::Draft,
        BatchStatus::Open,
        BatchStatus::Closed,
        BatchStatus::InWarehouse,
        BatchStatus::AtSourcePort,
        BatchStatus::ClearedSourcePort,
        BatchStatus::InTransit,
        BatchStatus::ArrivedDestinationPort,
        BatchStatus::InDestinationWarehouse,
        BatchStatus::AssignedToCarriers,
        BatchStatus::Delivered,
        BatchStatus::PartiallyDelivered,
        BatchStatus::Cancelled,
        BatchStatus::Archived,
    ];

    /// 转换为数据库字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            BatchStatus::Draft => "DRAFT",
            BatchStatus::Open => "OPEN",
            BatchStatus::Closed => "CLOSED",
            BatchStatus::InWarehouse => "IN_WAREHOUSE",
            BatchStatus::AtSourcePort => "AT_SOURCE_PORT",
            BatchStatus::ClearedSourcePort => "CLEARED_SOURCE_PORT",
            BatchStatus::InTransit => "IN_TRANSIT",
            BatchStatus::ArrivedDestinationPort => "ARRIVED_DESTINATION_PORT",
            BatchStatus::InDestinationWarehouse => "IN_DESTINATION_WAREHOUSE",
            BatchStatus::AssignedToCarriers => "ASSIGNED_TO_CARRIERS",
            BatchStatus::Delivered => "DELIVERED",
            BatchStatus::PartiallyDelivered => "PARTIALLY_DELIVERED",
            BatchStatus::Cancelled => "CANCELLED",
            BatchStatus::Archived => "ARCHIVED",
        }
    }

    /// 从数据库字符串解析
    ///
    /// 未知值返回 None，由仓储层转换为数据错误（不静默回退）
    pub fn from_db_str(s: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|status| status.to_db_str().eq_ignore_ascii_case(s.trim()))
    }

    /// 是否终态
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BatchStatus::Delivered
                | BatchStatus::PartiallyDelivered
                | BatchStatus::Cancelled
                | BatchStatus::Archived
        )
    }
}

impl fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

// ==========================================
// 运单状态 (Shipment Status)
// ==========================================
// 与批次状态对应但独立维护
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShipmentStatus {
    Created,           // 已创建 (未入批)
    InBatch,           // 已入批
    InWarehouse,       // 在仓
    AtSourcePort,      // 在始发港
    InTransit,         // 在途
    AtDestinationPort, // 在目的港
    WithCarrier,       // 已交承运商
    OutForDelivery,    // 派送中
    Delivered,         // 已妥投
    Returned,          // 已退回
    Cancelled,         // 已取消
}

impl ShipmentStatus {
    pub const ALL: [ShipmentStatus; 11] = [
        ShipmentStatus::Created,
        ShipmentStatus::InBatch,
        ShipmentStatus::InWarehouse,
        ShipmentStatus::AtSourcePort,
        ShipmentStatus::InTransit,
        ShipmentStatus::AtDestinationPort,
        ShipmentStatus::WithCarrier,
        ShipmentStatus::OutForDelivery,
        ShipmentStatus::Delivered,
        ShipmentStatus::Returned,
        ShipmentStatus::Cancelled,
    ];

    /// 转换为数据库字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            ShipmentStatus::Created => "CREATED",
            ShipmentStatus::InBatch => "IN_BATCH",
            ShipmentStatus::InWarehouse => "IN_WAREHOUSE",
            ShipmentStatus::AtSourcePort => "AT_SOURCE_PORT",
            ShipmentStatus::InTransit => "IN_TRANSIT",
            ShipmentStatus::AtDestinationPort => "AT_DESTINATION_PORT",
            ShipmentStatus::WithCarrier => "WITH_CARRIER",
            ShipmentStatus::OutForDelivery => "OUT_FOR_DELIVERY",
            ShipmentStatus::Delivered => "DELIVERED",
            ShipmentStatus::Returned => "RETURNED",
            ShipmentStatus::Cancelled => "CANCELLED",
        }
    }

    /// 从数据库字符串解析
    pub fn from_db_str(s: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|status| status.to_db_str().eq_ignore_ascii_case(s.trim()))
    }

    /// 是否仍由批次管线驱动 (可被批次状态投影覆盖)
    pub fn is_pipeline_managed(&self) -> bool {
        matches!(
            self,
            ShipmentStatus::InBatch
                | ShipmentStatus::InWarehouse
                | ShipmentStatus::AtSourcePort
                | ShipmentStatus::InTransit
                | ShipmentStatus::AtDestinationPort
        )
    }
}

impl fmt::Display for ShipmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

// ==========================================
// 角色 (Role Type)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoleType {
    DataEntry,         // 录入员
    BranchAdmin,       // 网点管理员
    WarehouseOperator, // 仓库操作员
    PortOperator,      // 港口操作员
    CarrierOperator,   // 承运商操作员
    Client,            // 客户
    Admin,             // 系统管理员
}

impl RoleType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoleType::DataEntry => "DataEntry",
            RoleType::BranchAdmin => "BranchAdmin",
            RoleType::WarehouseOperator => "WarehouseOperator",
            RoleType::PortOperator => "PortOperator",
            RoleType::CarrierOperator => "CarrierOperator",
            RoleType::Client => "Client",
            RoleType::Admin => "Admin",
        }
    }

    /// 从角色名解析 (大小写不敏感)
    pub fn from_str(s: &str) -> Option<Self> {
        let s = s.trim();
        [
            RoleType::DataEntry,
            RoleType::BranchAdmin,
            RoleType::WarehouseOperator,
            RoleType::PortOperator,
            RoleType::CarrierOperator,
            RoleType::Client,
            RoleType::Admin,
        ]
        .into_iter()
        .find(|role| role.as_str().eq_ignore_ascii_case(s))
    }
}

impl fmt::Display for RoleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 运单事件类型 (Shipment Event Type)
// ==========================================
// 数据库中以自由字符串存储，这里只枚举系统自身写入的类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShipmentEventType {
    Created,          // 创建
    StatusChanged,    // 状态变更
    Cancelled,        // 取消
    AddedToBatch,     // 入批
    RemovedFromBatch, // 出批
    CarrierAssigned,  // 分配承运商
}

impl ShipmentEventType {
    /// 转换为字符串 (用于数据库存储)
    pub fn as_str(&self) -> &'static str {
        match self {
            ShipmentEventType::Created => "Created",
            ShipmentEventType::StatusChanged => "StatusChanged",
            ShipmentEventType::Cancelled => "Cancelled",
            ShipmentEventType::AddedToBatch => "AddedToBatch",
            ShipmentEventType::RemovedFromBatch => "RemovedFromBatch",
            ShipmentEventType::CarrierAssigned => "CarrierAssigned",
        }
    }

    /// 从字符串解析
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "Created" => Some(ShipmentEventType::Created),
            "StatusChanged" => Some(ShipmentEventType::StatusChanged),
            "Cancelled" => Some(ShipmentEventType::Cancelled),
            "AddedToBatch" => Some(ShipmentEventType::AddedToBatch),
            "RemovedFromBatch" => Some(ShipmentEventType::RemovedFromBatch),
            "CarrierAssigned" => Some(ShipmentEventType::CarrierAssigned),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_status_db_codec() {
        for status in BatchStatus::ALL {
            assert_eq!(BatchStatus::from_db_str(status.to_db_str()), Some(status));
        }
        assert_eq!(BatchStatus::from_db_str("in_transit"), Some(BatchStatus::InTransit));
        assert_eq!(BatchStatus::from_db_str("SHIPPED"), None);
    }

    #[test]
    fn test_shipment_status_serde_matches_db() {
        let json = serde_json::to_string(&ShipmentStatus::AtDestinationPort).unwrap();
        assert_eq!(json, "\"AT_DESTINATION_PORT\"");
        assert_eq!(
            ShipmentStatus::from_db_str("WITH_CARRIER"),
            Some(ShipmentStatus::WithCarrier)
        );
    }

    #[test]
    fn test_terminal_batch_statuses() {
        let terminal: Vec<_> = BatchStatus::ALL.iter().filter(|s| s.is_terminal()).collect();
        assert_eq!(terminal.len(), 4);
        assert!(!BatchStatus::AssignedToCarriers.is_terminal());
    }

    #[test]
    fn test_role_parse() {
        assert_eq!(RoleType::from_str(" portoperator "), Some(RoleType::PortOperator));
        assert_eq!(RoleType::from_str("Root"), None);
    }
}
