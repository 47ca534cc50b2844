// ==========================================
// 物流批次跟踪系统 - HTTP 接口 (按域拆分)
// ==========================================
// 职责: 路由定义、身份提取、错误映射
// 约定: 同步 API 调用统一经 spawn_blocking 执行
// ==========================================

mod batch;
mod common;
mod extract;
mod shipment;

use axum::extract::Request;
use axum::http::HeaderValue;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{delete, get, post, put};
use axum::Router;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::app::state::AppState;

pub use common::ApiResponse;
pub use extract::{USER_ID_HEADER, USER_ROLES_HEADER};

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// 请求关联ID (写入请求扩展，供日志 span 使用)
#[derive(Debug, Clone, Copy)]
pub struct RequestId(pub Uuid);

/// 构建路由
pub fn router(state: AppState) -> Router {
    let batches = Router::new()
        .route("/", get(batch::list_batches).post(batch::create_batch))
        .route("/:id", get(batch::get_batch))
        .route("/:id/open", post(batch::open_batch))
        .route("/:id/close", post(batch::close_batch))
        .route("/:id/shipments", post(batch::add_shipment))
        .route("/:id/shipments/:shipment_id", delete(batch::remove_shipment))
        .route("/:id/move-to-warehouse", post(batch::move_to_warehouse))
        .route(
            "/:id/assign-destination-warehouse",
            post(batch::assign_destination_warehouse),
        )
        .route("/:id/move-to-source-port", post(batch::move_to_source_port))
        .route("/:id/clear-source-port", post(batch::clear_source_port))
        .route("/:id/start-transit", post(batch::start_transit))
        .route("/:id/arrival", post(batch::mark_arrival))
        .route(
            "/:id/move-to-destination-warehouse",
            post(batch::move_to_destination_warehouse),
        )
        .route("/:id/assign-carriers", post(batch::assign_carriers))
        .route("/:id/complete-delivery", post(batch::complete_delivery))
        .route("/:id/cancel", post(batch::cancel_batch))
        .route("/:id/archive", post(batch::archive_batch))
        .route("/:id/reconcile", post(batch::reconcile_aggregates));

    let shipments = Router::new()
        .route(
            "/",
            get(shipment::list_shipments).post(shipment::create_shipment),
        )
        .route("/unassigned", get(shipment::list_unassigned))
        .route("/:id", get(shipment::get_shipment))
        .route("/:id/status", put(shipment::update_shipment_status))
        .route("/:id/cancel", post(shipment::cancel_shipment));

    Router::new()
        .route("/health", get(health_check))
        .nest("/api/batches", batches)
        .nest("/api/shipments", shipments)
        .route(
            "/api/carriers/:id/shipments",
            get(shipment::list_carrier_shipments),
        )
        .layer(
            TraceLayer::new_for_http().make_span_with(|req: &Request| {
                let request_id = req
                    .extensions()
                    .get::<RequestId>()
                    .map(|id| id.0.to_string())
                    .unwrap_or_default();
                tracing::info_span!(
                    "http_request",
                    method = %req.method(),
                    uri = %req.uri(),
                    request_id = %request_id,
                )
            }),
        )
        .layer(middleware::from_fn(request_id))
        .with_state(state)
}

/// 存活检查
async fn health_check() -> &'static str {
    "ok"
}

/// 关联ID中间件
///
/// 沿用上游传入的 X-Request-Id (须为 UUID)，否则生成新ID；响应头回写同一ID
async fn request_id(mut req: Request, next: Next) -> Response {
    let id = req
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| Uuid::parse_str(v.trim()).ok())
        .unwrap_or_else(Uuid::new_v4);
    req.extensions_mut().insert(RequestId(id));

    let mut response = next.run(req).await;
    if let Ok(value) = HeaderValue::from_str(&id.to_string()) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}
