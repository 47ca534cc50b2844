// ==========================================
// 物流批次跟踪系统 - 批次领域模型
// ==========================================
// 对齐: schema batch 表
// 红线: shipment_count / total_weight 必须等于当前成员运单的计数与重量和
// ==========================================

use crate::domain::types::BatchStatus;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// 重量精度 (小数位)
pub const WEIGHT_SCALE: f64 = 1000.0;

/// 重量取整到 3 位小数
///
/// 批次总重由增量累加维护，统一取整保证与 SUM 重算结果一致
pub fn round_weight(value: f64) -> f64 {
    (value * WEIGHT_SCALE).round() / WEIGHT_SCALE
}

// ==========================================
// Batch - 批次
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Batch {
    // ===== 主键与归属 =====
    pub id: i64,        // 批次ID (插入前为 0)
    pub branch_id: i64, // 所属网点
    pub name: String,   // 批次名称

    // ===== 状态 =====
    pub status: BatchStatus,

    // ===== 聚合计数 (冗余字段，随成员变化维护) =====
    pub shipment_count: i64, // 成员运单数
    pub total_weight: f64,   // 成员运单总重

    // ===== 容量目标 (建议值，不做硬限制) =====
    pub threshold_count: i64,
    pub threshold_weight: f64,

    // ===== 管线节点 (随状态推进逐步填充) =====
    pub source_warehouse_id: Option<i64>,
    pub destination_warehouse_id: Option<i64>,
    pub source_port_id: Option<i64>,
    pub destination_port_id: Option<i64>,
    pub carrier_assigned_at: Option<NaiveDateTime>,

    // ===== 并发控制 =====
    pub revision: i32, // 乐观锁版本号

    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Batch {
    /// 创建草稿批次
    ///
    /// # 参数
    /// - `branch_id`: 所属网点
    /// - `name`: 批次名称
    /// - `threshold_count`: 建议运单数上限
    /// - `threshold_weight`: 建议重量上限
    pub fn new(branch_id: i64, name: String, threshold_count: i64, threshold_weight: f64) -> Self {
        let now = chrono::Utc::now().naive_utc();
        Self {
            id: 0,
            branch_id,
            name,
            status: BatchStatus::Draft,
            shipment_count: 0,
            total_weight: 0.0,
            threshold_count,
            threshold_weight,
            source_warehouse_id: None,
            destination_warehouse_id: None,
            source_port_id: None,
            destination_port_id: None,
            carrier_assigned_at: None,
            revision: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// 运单数是否达到建议上限
    pub fn count_threshold_reached(&self) -> bool {
        self.threshold_count > 0 && self.shipment_count >= self.threshold_count
    }

    /// 总重是否达到建议上限
    pub fn weight_threshold_reached(&self) -> bool {
        self.threshold_weight > 0.0 && self.total_weight >= self.threshold_weight
    }

    /// 是否超出任一建议上限
    pub fn exceeds_thresholds(&self) -> bool {
        (self.threshold_count > 0 && self.shipment_count > self.threshold_count)
            || (self.threshold_weight > 0.0 && self.total_weight > self.threshold_weight)
    }

    pub fn is_empty(&self) -> bool {
        self.shipment_count == 0
    }
}
