// ==========================================
// 物流批次跟踪系统 - 运单与运单事件领域模型
// ==========================================
// 对齐: schema shipment / shipment_event 表
// 红线: batch_id 非空 ⇔ 该批次成员中包含此运单
// 红线: shipment_event 只追加，不修改不删除
// ==========================================

use crate::domain::types::{ShipmentEventType, ShipmentStatus};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// ==========================================
// Shipment - 运单
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shipment {
    pub id: i64,
    pub client_id: i64,       // 所属客户
    pub batch_id: Option<i64>, // 所属批次 (None = 未分配池)
    pub status: ShipmentStatus,

    pub weight: f64,         // 重量 (>0)
    pub volume: Option<f64>, // 体积 (可选)
    pub pickup_address: String,
    pub delivery_address: String,

    pub carrier_id: Option<i64>, // 末端承运商

    pub revision: i32, // 乐观锁版本号
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Shipment {
    /// 创建新运单 (未入批)
    pub fn new(
        client_id: i64,
        weight: f64,
        volume: Option<f64>,
        pickup_address: String,
        delivery_address: String,
    ) -> Self {
        let now = chrono::Utc::now().naive_utc();
        Self {
            id: 0,
            client_id,
            batch_id: None,
            status: ShipmentStatus::Created,
            weight,
            volume,
            pickup_address,
            delivery_address,
            carrier_id: None,
            revision: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// 是否属于指定批次
    pub fn belongs_to(&self, batch_id: i64) -> bool {
        self.batch_id == Some(batch_id)
    }

    /// 是否可取消 (已妥投/已取消不可再取消)
    pub fn is_cancellable(&self) -> bool {
        !matches!(
            self.status,
            ShipmentStatus::Delivered | ShipmentStatus::Cancelled
        )
    }
}

// ==========================================
// ShipmentEvent - 运单事件 (审计追加日志)
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShipmentEvent {
    pub id: i64,
    pub shipment_id: i64,
    pub event_type: String, // 自由字符串标签，系统写入时取自 ShipmentEventType
    pub actor_user_id: Option<i64>,
    pub location: Option<String>,
    pub message: String,
    pub created_at: NaiveDateTime,
}

impl ShipmentEvent {
    /// 创建新的运单事件
    pub fn new(shipment_id: i64, event_type: ShipmentEventType, message: impl Into<String>) -> Self {
        Self {
            id: 0,
            shipment_id,
            event_type: event_type.as_str().to_string(),
            actor_user_id: None,
            location: None,
            message: message.into(),
            created_at: chrono::Utc::now().naive_utc(),
        }
    }

    pub fn with_actor(mut self, actor_user_id: Option<i64>) -> Self {
        self.actor_user_id = actor_user_id;
        self
    }

    pub fn with_location(mut self, location: Option<String>) -> Self {
        self.location = location;
        self
    }
}
