// ==========================================
// 运单相关路由
// ==========================================

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::Deserialize;

use crate::api::{
    authorize, ApiError, ApiResult, Caller, CreateShipmentRequest, Operation,
    UpdateShipmentStatusRequest,
};
use crate::app::state::AppState;
use crate::domain::types::ShipmentStatus;
use crate::repository::ShipmentFilter;

use super::common::{ok, run_blocking};
use super::extract::{ApiJson, ApiPath, ApiQuery};

#[derive(Debug, Deserialize)]
pub struct ShipmentListQuery {
    pub client_id: Option<i64>,
    pub batch_id: Option<i64>,
    pub status: Option<String>,
}

fn parse_status(raw: Option<String>) -> ApiResult<Option<ShipmentStatus>> {
    match raw.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => ShipmentStatus::from_db_str(s)
            .map(Some)
            .ok_or_else(|| ApiError::ValidationError(format!("未知运单状态: {}", s))),
    }
}

pub async fn list_shipments(
    State(state): State<AppState>,
    caller: Caller,
    ApiQuery(query): ApiQuery<ShipmentListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&caller, Operation::ListShipments)?;
    let filter = ShipmentFilter {
        client_id: query.client_id,
        batch_id: query.batch_id,
        status: parse_status(query.status)?,
    };
    let api = state.shipment_api.clone();
    let shipments =
        run_blocking("http.list_shipments", move || api.list_shipments(&filter)).await?;
    Ok(ok("查询成功", shipments))
}

pub async fn list_unassigned(
    State(state): State<AppState>,
    caller: Caller,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&caller, Operation::ListUnassigned)?;
    let api = state.shipment_api.clone();
    let shipments = run_blocking("http.list_unassigned", move || api.list_unassigned()).await?;
    Ok(ok("查询成功", shipments))
}

pub async fn list_carrier_shipments(
    State(state): State<AppState>,
    caller: Caller,
    ApiPath(carrier_id): ApiPath<i64>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&caller, Operation::ListCarrierShipments)?;
    let api = state.shipment_api.clone();
    let shipments = run_blocking("http.list_carrier_shipments", move || {
        api.list_carrier_shipments(carrier_id)
    })
    .await?;
    Ok(ok("查询成功", shipments))
}

pub async fn create_shipment(
    State(state): State<AppState>,
    caller: Caller,
    ApiJson(req): ApiJson<CreateShipmentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&caller, Operation::CreateShipment)?;
    let api = state.shipment_api.clone();
    let actor = Some(caller.user_id);
    let shipment =
        run_blocking("http.create_shipment", move || api.create_shipment(&req, actor)).await?;
    Ok((StatusCode::CREATED, ok("运单已创建", shipment)))
}

pub async fn get_shipment(
    State(state): State<AppState>,
    caller: Caller,
    ApiPath(shipment_id): ApiPath<i64>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&caller, Operation::GetShipment)?;
    let api = state.shipment_api.clone();
    let detail = run_blocking("http.get_shipment", move || {
        api.get_shipment(shipment_id, &caller)
    })
    .await?;
    Ok(ok("查询成功", detail))
}

pub async fn update_shipment_status(
    State(state): State<AppState>,
    caller: Caller,
    ApiPath(shipment_id): ApiPath<i64>,
    ApiJson(req): ApiJson<UpdateShipmentStatusRequest>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&caller, Operation::UpdateShipmentStatus)?;
    let api = state.shipment_api.clone();
    let actor = Some(caller.user_id);
    let shipment = run_blocking("http.update_shipment_status", move || {
        api.update_status(shipment_id, &req, actor)
    })
    .await?;
    Ok(ok("运单状态已更新", shipment))
}

pub async fn cancel_shipment(
    State(state): State<AppState>,
    caller: Caller,
    ApiPath(shipment_id): ApiPath<i64>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&caller, Operation::CancelShipment)?;
    let api = state.shipment_api.clone();
    let actor = Some(caller.user_id);
    let shipment = run_blocking("http.cancel_shipment", move || {
        api.cancel_shipment(shipment_id, actor)
    })
    .await?;
    Ok(ok("运单已取消", shipment))
}
