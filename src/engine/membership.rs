// ==========================================
// 物流批次跟踪系统 - 批次成员与聚合计数
// ==========================================
// 红线: 成员关系与 shipment_count / total_weight 必须同时变更
// 红线: 校验全部通过后才修改任何字段
// ==========================================

use crate::domain::batch::{round_weight, Batch};
use crate::domain::shipment::Shipment;
use crate::domain::types::{BatchStatus, ShipmentStatus};
use chrono::NaiveDateTime;
use serde::Serialize;
use thiserror::Error;

/// 成员变更错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MembershipError {
    #[error("批次不处于开放状态: 当前状态={current}, 要求状态=OPEN")]
    BatchNotOpen { current: BatchStatus },

    #[error("运单 {shipment_id} 已属于批次 {batch_id}")]
    AlreadyInBatch { shipment_id: i64, batch_id: i64 },

    #[error("运单 {shipment_id} 不属于批次 {batch_id}")]
    NotInBatch { shipment_id: i64, batch_id: i64 },
}

/// 聚合计数重算结果
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AggregateDrift {
    pub stored_count: i64,
    pub stored_weight: f64,
    pub actual_count: i64,
    pub actual_weight: f64,
}

impl AggregateDrift {
    pub fn has_drift(&self) -> bool {
        self.stored_count != self.actual_count
            || round_weight(self.stored_weight) != round_weight(self.actual_weight)
    }
}

/// 出批后的计数与总重
///
/// # 返回
/// - (count, weight, clamped): clamped 为 true 表示存储值已低于成员实际值，结果被截断为 0
fn shrink_aggregate(count: i64, total_weight: f64, shipment_weight: f64) -> (i64, f64, bool) {
    let raw_count = count - 1;
    let raw_weight = round_weight(total_weight - shipment_weight);
    let clamped = raw_count < 0 || raw_weight < 0.0;
    (raw_count.max(0), raw_weight.max(0.0), clamped)
}

// ==========================================
// BatchAggregate - 批次成员维护
// ==========================================
#[derive(Debug, Clone, Copy, Default)]
pub struct BatchAggregate;

impl BatchAggregate {
    pub fn new() -> Self {
        Self
    }

    /// 运单入批
    ///
    /// # 参数
    /// - `batch`: 目标批次 (必须为 OPEN)
    /// - `shipment`: 待入批运单 (batch_id 必须为空)
    ///
    /// # 返回
    /// - Ok(()): 运单 batch_id/状态 与批次计数已同步更新
    pub fn attach(
        &self,
        batch: &mut Batch,
        shipment: &mut Shipment,
        now: NaiveDateTime,
    ) -> Result<(), MembershipError> {
        if batch.status != BatchStatus::Open {
            return Err(MembershipError::BatchNotOpen {
                current: batch.status,
            });
        }
        if let Some(existing) = shipment.batch_id {
            return Err(MembershipError::AlreadyInBatch {
                shipment_id: shipment.id,
                batch_id: existing,
            });
        }

        shipment.batch_id = Some(batch.id);
        shipment.status = ShipmentStatus::InBatch;
        shipment.updated_at = now;

        batch.shipment_count += 1;
        batch.total_weight = round_weight(batch.total_weight + shipment.weight);
        batch.updated_at = now;
        Ok(())
    }

    /// 运单出批 (回到未分配池)
    pub fn detach(
        &self,
        batch: &mut Batch,
        shipment: &mut Shipment,
        now: NaiveDateTime,
    ) -> Result<(), MembershipError> {
        if batch.status != BatchStatus::Open {
            return Err(MembershipError::BatchNotOpen {
                current: batch.status,
            });
        }
        if !shipment.belongs_to(batch.id) {
            return Err(MembershipError::NotInBatch {
                shipment_id: shipment.id,
                batch_id: batch.id,
            });
        }

        shipment.batch_id = None;
        shipment.status = ShipmentStatus::Created;
        shipment.updated_at = now;

        let (count, weight, clamped) =
            shrink_aggregate(batch.shipment_count, batch.total_weight, shipment.weight);
        if clamped {
            tracing::warn!(
                batch_id = batch.id,
                shipment_id = shipment.id,
                shipment_count = batch.shipment_count,
                total_weight = batch.total_weight,
                shipment_weight = shipment.weight,
                "批次聚合计数低于成员运单，已截断为0，需执行对账"
            );
        }
        batch.shipment_count = count;
        batch.total_weight = weight;
        batch.updated_at = now;
        Ok(())
    }

    /// 按成员运单重算聚合计数
    ///
    /// # 参数
    /// - `members`: 当前 batch_id 指向该批次的全部运单
    pub fn reconcile(&self, batch: &mut Batch, members: &[Shipment]) -> AggregateDrift {
        let actual_count = members.len() as i64;
        let actual_weight = round_weight(members.iter().map(|s| s.weight).sum());
        let drift = AggregateDrift {
            stored_count: batch.shipment_count,
            stored_weight: batch.total_weight,
            actual_count,
            actual_weight,
        };
        batch.shipment_count = actual_count;
        batch.total_weight = actual_weight;
        drift
    }
}
