// ==========================================
// 物流批次跟踪系统 - 访问控制
// ==========================================
// 职责: 调用方身份 + 操作 → 角色表
// 约定: Admin 拥有全部操作权限
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::domain::types::RoleType;
use serde::Serialize;

/// 调用方身份 (由上游认证网关解析)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Caller {
    pub user_id: i64,
    pub roles: Vec<RoleType>,
}

impl Caller {
    pub fn new(user_id: i64, roles: Vec<RoleType>) -> Self {
        Self { user_id, roles }
    }

    pub fn has_role(&self, role: RoleType) -> bool {
        self.roles.contains(&role)
    }

    /// 是否仅具有客户角色 (只能查看自己的运单)
    pub fn is_client_only(&self) -> bool {
        self.has_role(RoleType::Client) && self.roles.iter().all(|r| *r == RoleType::Client)
    }
}

// ==========================================
// Operation - 受控操作
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    // ===== 批次 =====
    ListBatches,
    GetBatch,
    CreateBatch,
    OpenBatch,
    CloseBatch,
    AddShipmentToBatch,
    RemoveShipmentFromBatch,
    MoveToWarehouse,
    AssignDestinationWarehouse,
    MoveToDestinationWarehouse,
    MoveToSourcePort,
    ClearSourcePort,
    StartTransit,
    MarkArrival,
    AssignCarriers,
    CompleteDelivery,
    CancelBatch,
    ArchiveBatch,
    ReconcileAggregates,

    // ===== 运单 =====
    ListShipments,
    ListCarrierShipments,
    CreateShipment,
    ListUnassigned,
    GetShipment,
    UpdateShipmentStatus,
    CancelShipment,
}

const INTAKE: &[RoleType] = &[RoleType::DataEntry, RoleType::BranchAdmin];
const WAREHOUSE: &[RoleType] = &[RoleType::WarehouseOperator];
const PORT: &[RoleType] = &[RoleType::PortOperator];
const BRANCH_ADMIN: &[RoleType] = &[RoleType::BranchAdmin];
const DELIVERY: &[RoleType] = &[RoleType::BranchAdmin, RoleType::CarrierOperator];
const SHIPMENT_READERS: &[RoleType] = &[
    RoleType::DataEntry,
    RoleType::BranchAdmin,
    RoleType::CarrierOperator,
];
const SHIPMENT_VIEWERS: &[RoleType] = &[
    RoleType::DataEntry,
    RoleType::BranchAdmin,
    RoleType::CarrierOperator,
    RoleType::Client,
];
const CARRIER: &[RoleType] = &[RoleType::CarrierOperator];

impl Operation {
    /// 允许执行该操作的角色 (Admin 除外，Admin 恒允许)
    pub fn allowed_roles(&self) -> &'static [RoleType] {
        match self {
            Operation::ListBatches
            | Operation::GetBatch
            | Operation::CreateBatch
            | Operation::OpenBatch
            | Operation::CloseBatch
            | Operation::AddShipmentToBatch
            | Operation::RemoveShipmentFromBatch => INTAKE,

            Operation::MoveToWarehouse
            | Operation::AssignDestinationWarehouse
            | Operation::MoveToDestinationWarehouse => WAREHOUSE,

            Operation::MoveToSourcePort
            | Operation::ClearSourcePort
            | Operation::StartTransit
            | Operation::MarkArrival => PORT,

            Operation::AssignCarriers
            | Operation::CancelBatch
            | Operation::ArchiveBatch
            | Operation::ReconcileAggregates => BRANCH_ADMIN,

            Operation::CompleteDelivery => DELIVERY,

            Operation::ListShipments | Operation::ListCarrierShipments => SHIPMENT_READERS,
            Operation::CreateShipment | Operation::ListUnassigned => INTAKE,
            Operation::GetShipment => SHIPMENT_VIEWERS,
            Operation::UpdateShipmentStatus => CARRIER,
            Operation::CancelShipment => BRANCH_ADMIN,
        }
    }
}

/// 角色校验
///
/// # 返回
/// - Ok(()): 允许
/// - Err(ApiError::Forbidden): 调用方不具备任一所需角色
pub fn authorize(caller: &Caller, operation: Operation) -> ApiResult<()> {
    if caller.has_role(RoleType::Admin) {
        return Ok(());
    }
    let allowed = operation.allowed_roles();
    if caller.roles.iter().any(|r| allowed.contains(r)) {
        return Ok(());
    }

    tracing::warn!(
        user_id = caller.user_id,
        operation = ?operation,
        "调用方角色不足，拒绝操作"
    );
    Err(ApiError::Forbidden(format!(
        "操作 {:?} 需要角色: {}",
        operation,
        allowed
            .iter()
            .map(|r| r.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    )))
}
