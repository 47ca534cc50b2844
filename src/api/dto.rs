// ==========================================
// 物流批次跟踪系统 - API 数据传输对象
// ==========================================
// 职责: 请求参数校验 + 响应视图
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::domain::batch::{round_weight, Batch};
use crate::domain::shipment::{Shipment, ShipmentEvent};
use crate::domain::types::ShipmentStatus;
use crate::engine::{BatchOperation, BatchStateMachine};
use serde::{Deserialize, Serialize};

// ==========================================
// 请求
// ==========================================

pub const BATCH_NAME_MIN: usize = 3;
pub const BATCH_NAME_MAX: usize = 100;
pub const ADDRESS_MIN: usize = 10;
pub const ADDRESS_MAX: usize = 500;
pub const MIN_THRESHOLD_WEIGHT: f64 = 0.01;
pub const MIN_SHIPMENT_WEIGHT: f64 = 0.01;

/// 重量/体积必须可由 3 位小数精确表示，与批次总重取整口径一致
fn has_weight_scale(value: f64) -> bool {
    (round_weight(value) - value).abs() < 1e-9
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBatchRequest {
    pub branch_id: i64,
    pub name: String,
    pub threshold_count: i64,
    pub threshold_weight: f64,
}

impl CreateBatchRequest {
    pub fn validate(&self) -> ApiResult<()> {
        let len = self.name.trim().chars().count();
        if !(BATCH_NAME_MIN..=BATCH_NAME_MAX).contains(&len) {
            return Err(ApiError::ValidationError(format!(
                "批次名称长度必须在{}到{}之间",
                BATCH_NAME_MIN, BATCH_NAME_MAX
            )));
        }
        if self.threshold_count < 1 {
            return Err(ApiError::ValidationError(
                "threshold_count 必须大于等于 1".to_string(),
            ));
        }
        if !self.threshold_weight.is_finite() || self.threshold_weight < MIN_THRESHOLD_WEIGHT {
            return Err(ApiError::ValidationError(format!(
                "threshold_weight 必须大于等于 {}",
                MIN_THRESHOLD_WEIGHT
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateShipmentRequest {
    pub client_id: i64,
    pub weight: f64,
    pub volume: Option<f64>,
    pub pickup_address: String,
    pub delivery_address: String,
}

impl CreateShipmentRequest {
    pub fn validate(&self) -> ApiResult<()> {
        if !self.weight.is_finite() || self.weight < MIN_SHIPMENT_WEIGHT {
            return Err(ApiError::ValidationError(format!(
                "运单重量必须大于等于 {}",
                MIN_SHIPMENT_WEIGHT
            )));
        }
        if !has_weight_scale(self.weight) {
            return Err(ApiError::ValidationError(
                "运单重量最多保留3位小数".to_string(),
            ));
        }
        if let Some(volume) = self.volume {
            if !volume.is_finite() || volume <= 0.0 {
                return Err(ApiError::ValidationError("运单体积必须大于 0".to_string()));
            }
            if !has_weight_scale(volume) {
                return Err(ApiError::ValidationError(
                    "运单体积最多保留3位小数".to_string(),
                ));
            }
        }
        validate_address("pickup_address", &self.pickup_address)?;
        validate_address("delivery_address", &self.delivery_address)?;
        Ok(())
    }
}

fn validate_address(field: &str, value: &str) -> ApiResult<()> {
    let len = value.trim().chars().count();
    if (ADDRESS_MIN..=ADDRESS_MAX).contains(&len) {
        Ok(())
    } else {
        Err(ApiError::ValidationError(format!(
            "{} 长度必须在{}到{}之间",
            field, ADDRESS_MIN, ADDRESS_MAX
        )))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateShipmentStatusRequest {
    pub status: ShipmentStatus,
    pub notes: Option<String>,
    pub location: Option<String>,
}

// ==========================================
// 响应视图
// ==========================================

/// 批次视图 (附带建议容量标记与可执行操作)
#[derive(Debug, Clone, Serialize)]
pub struct BatchView {
    #[serde(flatten)]
    pub batch: Batch,
    pub count_threshold_reached: bool,
    pub weight_threshold_reached: bool,
    pub exceeds_thresholds: bool,
    pub allowed_operations: Vec<BatchOperation>,
}

impl From<Batch> for BatchView {
    fn from(batch: Batch) -> Self {
        Self {
            count_threshold_reached: batch.count_threshold_reached(),
            weight_threshold_reached: batch.weight_threshold_reached(),
            exceeds_thresholds: batch.exceeds_thresholds(),
            allowed_operations: BatchStateMachine::new().allowed_operations(batch.status),
            batch,
        }
    }
}

/// 批次详情 (含成员运单)
#[derive(Debug, Clone, Serialize)]
pub struct BatchDetail {
    #[serde(flatten)]
    pub view: BatchView,
    pub shipments: Vec<Shipment>,
}

/// 运单详情 (含事件时间线)
#[derive(Debug, Clone, Serialize)]
pub struct ShipmentDetail {
    #[serde(flatten)]
    pub shipment: Shipment,
    pub events: Vec<ShipmentEvent>,
}
