// ==========================================
// 物流批次跟踪系统 - API 层
// ==========================================
// 职责: 提供业务 API 接口,供 HTTP 路由调用
// 红线: 校验 → 工作单元 → 引擎 → 仓储，错误统一映射为 ApiError
// ==========================================

pub mod access;
pub mod batch_api;
pub mod dto;
pub mod error;
pub mod shipment_api;

// 重导出核心类型
pub use access::{authorize, Caller, Operation};
pub use batch_api::{BatchApi, ReconcileReport};
pub use dto::{
    BatchDetail, BatchView, CreateBatchRequest, CreateShipmentRequest, ShipmentDetail,
    UpdateShipmentStatusRequest,
};
pub use error::{ApiError, ApiResult, ErrorBody};
pub use shipment_api::ShipmentApi;
