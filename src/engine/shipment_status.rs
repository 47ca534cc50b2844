// ==========================================
// 物流批次跟踪系统 - 运单状态投影
// ==========================================
// 职责: 由批次状态推导成员运单状态
// 红线: 只覆盖仍由批次管线驱动的运单，承运商阶段与终态不动
// ==========================================

use crate::domain::shipment::Shipment;
use crate::domain::types::{BatchStatus, ShipmentStatus};
use chrono::NaiveDateTime;

#[derive(Debug, Clone, Copy, Default)]
pub struct ShipmentStatusProjector;

impl ShipmentStatusProjector {
    pub fn new() -> Self {
        Self
    }

    /// 批次状态对应的运单状态
    ///
    /// 仅运输段状态有映射，其余返回 None
    pub fn project(&self, batch_status: BatchStatus) -> Option<ShipmentStatus> {
        match batch_status {
            BatchStatus::InWarehouse => Some(ShipmentStatus::InWarehouse),
            BatchStatus::AtSourcePort | BatchStatus::ClearedSourcePort => {
                Some(ShipmentStatus::AtSourcePort)
            }
            BatchStatus::InTransit => Some(ShipmentStatus::InTransit),
            BatchStatus::ArrivedDestinationPort | BatchStatus::InDestinationWarehouse => {
                Some(ShipmentStatus::AtDestinationPort)
            }
            _ => None,
        }
    }

    /// 将投影应用到单个运单
    ///
    /// # 返回
    /// - Some(旧状态): 状态已变更
    /// - None: 无需变更
    pub fn apply(
        &self,
        batch_status: BatchStatus,
        shipment: &mut Shipment,
        now: NaiveDateTime,
    ) -> Option<ShipmentStatus> {
        let target = self.project(batch_status)?;
        if !shipment.status.is_pipeline_managed() || shipment.status == target {
            return None;
        }
        let previous = shipment.status;
        shipment.status = target;
        shipment.updated_at = now;
        Some(previous)
    }
}
