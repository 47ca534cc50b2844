// ==========================================
// 物流批次跟踪系统 - 承运商分配校验
// ==========================================
// 职责: 校验分配清单形状与每一行的引用关系
// 红线: 任一行失败即整体失败，由调用方回滚事务
// ==========================================

use crate::domain::shipment::Shipment;
use crate::domain::types::ShipmentStatus;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

/// 单行分配: 运单 → 承运商
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarrierAssignment {
    pub shipment_id: i64,
    pub carrier_id: i64,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AssignmentError {
    #[error("分配清单不能为空")]
    EmptyAssignments,

    #[error("运单 {shipment_id} 在分配清单中重复出现")]
    DuplicateShipment { shipment_id: i64 },

    #[error("运单 {shipment_id} 不存在")]
    ShipmentMissing { shipment_id: i64 },

    #[error("运单 {shipment_id} 不属于批次 {batch_id}")]
    ShipmentNotInBatch { shipment_id: i64, batch_id: i64 },

    #[error("承运商 {carrier_id} 不存在 (运单 {shipment_id})")]
    CarrierMissing { shipment_id: i64, carrier_id: i64 },
}

// ==========================================
// CarrierAssignmentPlanner
// ==========================================
#[derive(Debug, Clone, Copy, Default)]
pub struct CarrierAssignmentPlanner;

impl CarrierAssignmentPlanner {
    pub fn new() -> Self {
        Self
    }

    /// 校验清单形状 (非空、运单不重复)
    pub fn validate_shape(&self, assignments: &[CarrierAssignment]) -> Result<(), AssignmentError> {
        if assignments.is_empty() {
            return Err(AssignmentError::EmptyAssignments);
        }
        let mut seen = HashSet::with_capacity(assignments.len());
        for a in assignments {
            if !seen.insert(a.shipment_id) {
                return Err(AssignmentError::DuplicateShipment {
                    shipment_id: a.shipment_id,
                });
            }
        }
        Ok(())
    }

    /// 校验单行引用
    ///
    /// # 参数
    /// - `shipment`: 按 shipment_id 加载的运单 (None = 不存在)
    /// - `carrier_exists`: 承运商是否存在
    ///
    /// # 返回
    /// - Ok(Shipment): 校验通过的批次成员运单
    pub fn validate_row(
        &self,
        batch_id: i64,
        assignment: &CarrierAssignment,
        shipment: Option<Shipment>,
        carrier_exists: bool,
    ) -> Result<Shipment, AssignmentError> {
        let shipment = shipment.ok_or(AssignmentError::ShipmentMissing {
            shipment_id: assignment.shipment_id,
        })?;
        if !shipment.belongs_to(batch_id) {
            return Err(AssignmentError::ShipmentNotInBatch {
                shipment_id: assignment.shipment_id,
                batch_id,
            });
        }
        if !carrier_exists {
            return Err(AssignmentError::CarrierMissing {
                shipment_id: assignment.shipment_id,
                carrier_id: assignment.carrier_id,
            });
        }
        Ok(shipment)
    }

    /// 应用到运单: 设置承运商并转为 WITH_CARRIER
    pub fn apply(&self, shipment: &mut Shipment, carrier_id: i64, now: NaiveDateTime) {
        shipment.carrier_id = Some(carrier_id);
        shipment.status = ShipmentStatus::WithCarrier;
        shipment.updated_at = now;
    }
}
