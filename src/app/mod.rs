// ==========================================
// 物流批次跟踪系统 - 应用层
// ==========================================
// 职责: 应用状态装配 + HTTP 接口
// ==========================================

pub mod http;
pub mod state;

// 重导出
pub use http::router;
pub use state::AppState;
