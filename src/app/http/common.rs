// ==========================================
// 公共工具：响应封装、错误映射、阻塞任务执行
// ==========================================

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::api::{ApiError, ApiResult};
use crate::perf::OpTimer;

/// 成功响应体
#[derive(Debug, Clone, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub message: String,
    pub data: T,
}

/// 封装成功响应
pub(super) fn ok<T: Serialize>(message: impl Into<String>, data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse {
        success: true,
        message: message.into(),
        data,
    })
}

/// ApiError → HTTP 响应 (状态码 + `{success, code, message}`)
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.to_body())).into_response()
    }
}

/// 在阻塞线程池上执行同步 API 调用
///
/// API 层持有连接互斥锁并执行同步 SQL，不能直接跑在 async 任务上
pub(super) async fn run_blocking<T, F>(op: &'static str, f: F) -> ApiResult<T>
where
    F: FnOnce() -> ApiResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let _timer = OpTimer::new(op);
        f()
    })
    .await
    .map_err(|e| ApiError::Unexpected(format!("任务执行失败: {}", e)))?
}
