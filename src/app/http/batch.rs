// ==========================================
// 批次相关路由
// ==========================================

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::Deserialize;

use crate::api::{authorize, ApiError, ApiResult, Caller, CreateBatchRequest, Operation};
use crate::app::state::AppState;
use crate::domain::types::BatchStatus;
use crate::engine::CarrierAssignment;
use crate::repository::BatchFilter;

use super::common::{ok, run_blocking};
use super::extract::{ApiJson, ApiPath, ApiQuery};

#[derive(Debug, Deserialize)]
pub struct BatchListQuery {
    pub branch_id: Option<i64>,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ShipmentRef {
    pub shipment_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct WarehouseRef {
    pub warehouse_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct SourcePortRequest {
    pub source_port_id: i64,
    pub destination_port_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct AssignCarriersRequest {
    pub assignments: Vec<CarrierAssignment>,
}

fn parse_status(raw: Option<String>) -> ApiResult<Option<BatchStatus>> {
    match raw.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => BatchStatus::from_db_str(s)
            .map(Some)
            .ok_or_else(|| ApiError::ValidationError(format!("未知批次状态: {}", s))),
    }
}

// ==========================================
// 查询 / 创建
// ==========================================

pub async fn list_batches(
    State(state): State<AppState>,
    caller: Caller,
    ApiQuery(query): ApiQuery<BatchListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&caller, Operation::ListBatches)?;
    let filter = BatchFilter {
        branch_id: query.branch_id,
        status: parse_status(query.status)?,
    };
    let api = state.batch_api.clone();
    let batches = run_blocking("http.list_batches", move || api.list_batches(&filter)).await?;
    Ok(ok("查询成功", batches))
}

pub async fn get_batch(
    State(state): State<AppState>,
    caller: Caller,
    ApiPath(batch_id): ApiPath<i64>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&caller, Operation::GetBatch)?;
    let api = state.batch_api.clone();
    let detail = run_blocking("http.get_batch", move || api.get_batch(batch_id)).await?;
    Ok(ok("查询成功", detail))
}

pub async fn create_batch(
    State(state): State<AppState>,
    caller: Caller,
    ApiJson(req): ApiJson<CreateBatchRequest>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&caller, Operation::CreateBatch)?;
    let api = state.batch_api.clone();
    let actor = Some(caller.user_id);
    let view = run_blocking("http.create_batch", move || api.create_batch(&req, actor)).await?;
    Ok((StatusCode::CREATED, ok("批次已创建", view)))
}

// ==========================================
// 成员维护
// ==========================================

pub async fn add_shipment(
    State(state): State<AppState>,
    caller: Caller,
    ApiPath(batch_id): ApiPath<i64>,
    ApiJson(req): ApiJson<ShipmentRef>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&caller, Operation::AddShipmentToBatch)?;
    let api = state.batch_api.clone();
    let actor = Some(caller.user_id);
    let view = run_blocking("http.add_shipment", move || {
        api.add_shipment(batch_id, req.shipment_id, actor)
    })
    .await?;
    Ok(ok("运单已加入批次", view))
}

pub async fn remove_shipment(
    State(state): State<AppState>,
    caller: Caller,
    ApiPath((batch_id, shipment_id)): ApiPath<(i64, i64)>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&caller, Operation::RemoveShipmentFromBatch)?;
    let api = state.batch_api.clone();
    let actor = Some(caller.user_id);
    let view = run_blocking("http.remove_shipment", move || {
        api.remove_shipment(batch_id, shipment_id, actor)
    })
    .await?;
    Ok(ok("运单已移出批次", view))
}

// ==========================================
// 状态推进
// ==========================================

pub async fn open_batch(
    State(state): State<AppState>,
    caller: Caller,
    ApiPath(batch_id): ApiPath<i64>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&caller, Operation::OpenBatch)?;
    let api = state.batch_api.clone();
    let actor = Some(caller.user_id);
    let view = run_blocking("http.open_batch", move || api.open_batch(batch_id, actor)).await?;
    Ok(ok("批次已开放", view))
}

pub async fn close_batch(
    State(state): State<AppState>,
    caller: Caller,
    ApiPath(batch_id): ApiPath<i64>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&caller, Operation::CloseBatch)?;
    let api = state.batch_api.clone();
    let actor = Some(caller.user_id);
    let view = run_blocking("http.close_batch", move || api.close_batch(batch_id, actor)).await?;
    Ok(ok("批次已封批", view))
}

pub async fn move_to_warehouse(
    State(state): State<AppState>,
    caller: Caller,
    ApiPath(batch_id): ApiPath<i64>,
    ApiJson(req): ApiJson<WarehouseRef>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&caller, Operation::MoveToWarehouse)?;
    let api = state.batch_api.clone();
    let actor = Some(caller.user_id);
    let view = run_blocking("http.move_to_warehouse", move || {
        api.move_to_warehouse(batch_id, req.warehouse_id, actor)
    })
    .await?;
    Ok(ok("批次已入始发仓", view))
}

pub async fn assign_destination_warehouse(
    State(state): State<AppState>,
    caller: Caller,
    ApiPath(batch_id): ApiPath<i64>,
    ApiJson(req): ApiJson<WarehouseRef>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&caller, Operation::AssignDestinationWarehouse)?;
    let api = state.batch_api.clone();
    let actor = Some(caller.user_id);
    let view = run_blocking("http.assign_destination_warehouse", move || {
        api.assign_destination_warehouse(batch_id, req.warehouse_id, actor)
    })
    .await?;
    Ok(ok("目的仓已设置", view))
}

pub async fn move_to_source_port(
    State(state): State<AppState>,
    caller: Caller,
    ApiPath(batch_id): ApiPath<i64>,
    ApiJson(req): ApiJson<SourcePortRequest>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&caller, Operation::MoveToSourcePort)?;
    let api = state.batch_api.clone();
    let actor = Some(caller.user_id);
    let view = run_blocking("http.move_to_source_port", move || {
        api.move_to_source_port(batch_id, req.source_port_id, req.destination_port_id, actor)
    })
    .await?;
    Ok(ok("批次已到达始发港", view))
}

pub async fn clear_source_port(
    State(state): State<AppState>,
    caller: Caller,
    ApiPath(batch_id): ApiPath<i64>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&caller, Operation::ClearSourcePort)?;
    let api = state.batch_api.clone();
    let actor = Some(caller.user_id);
    let view = run_blocking("http.clear_source_port", move || {
        api.clear_source_port(batch_id, actor)
    })
    .await?;
    Ok(ok("批次已放行", view))
}

pub async fn start_transit(
    State(state): State<AppState>,
    caller: Caller,
    ApiPath(batch_id): ApiPath<i64>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&caller, Operation::StartTransit)?;
    let api = state.batch_api.clone();
    let actor = Some(caller.user_id);
    let view =
        run_blocking("http.start_transit", move || api.start_transit(batch_id, actor)).await?;
    Ok(ok("批次已启运", view))
}

pub async fn mark_arrival(
    State(state): State<AppState>,
    caller: Caller,
    ApiPath(batch_id): ApiPath<i64>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&caller, Operation::MarkArrival)?;
    let api = state.batch_api.clone();
    let actor = Some(caller.user_id);
    let view = run_blocking("http.mark_arrival", move || api.mark_arrival(batch_id, actor)).await?;
    Ok(ok("批次已到达目的港", view))
}

pub async fn move_to_destination_warehouse(
    State(state): State<AppState>,
    caller: Caller,
    ApiPath(batch_id): ApiPath<i64>,
    ApiJson(req): ApiJson<WarehouseRef>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&caller, Operation::MoveToDestinationWarehouse)?;
    let api = state.batch_api.clone();
    let actor = Some(caller.user_id);
    let view = run_blocking("http.move_to_destination_warehouse", move || {
        api.move_to_destination_warehouse(batch_id, req.warehouse_id, actor)
    })
    .await?;
    Ok(ok("批次已入目的仓", view))
}

pub async fn assign_carriers(
    State(state): State<AppState>,
    caller: Caller,
    ApiPath(batch_id): ApiPath<i64>,
    ApiJson(req): ApiJson<AssignCarriersRequest>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&caller, Operation::AssignCarriers)?;
    let api = state.batch_api.clone();
    let actor = Some(caller.user_id);
    let detail = run_blocking("http.assign_carriers", move || {
        api.assign_carriers(batch_id, &req.assignments, actor)
    })
    .await?;
    Ok(ok("承运商已分配", detail))
}

pub async fn complete_delivery(
    State(state): State<AppState>,
    caller: Caller,
    ApiPath(batch_id): ApiPath<i64>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&caller, Operation::CompleteDelivery)?;
    let api = state.batch_api.clone();
    let actor = Some(caller.user_id);
    let view = run_blocking("http.complete_delivery", move || {
        api.complete_delivery(batch_id, actor)
    })
    .await?;
    Ok(ok("批次妥投已确认", view))
}

pub async fn cancel_batch(
    State(state): State<AppState>,
    caller: Caller,
    ApiPath(batch_id): ApiPath<i64>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&caller, Operation::CancelBatch)?;
    let api = state.batch_api.clone();
    let actor = Some(caller.user_id);
    let view = run_blocking("http.cancel_batch", move || api.cancel_batch(batch_id, actor)).await?;
    Ok(ok("批次已取消", view))
}

pub async fn archive_batch(
    State(state): State<AppState>,
    caller: Caller,
    ApiPath(batch_id): ApiPath<i64>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&caller, Operation::ArchiveBatch)?;
    let api = state.batch_api.clone();
    let actor = Some(caller.user_id);
    let view =
        run_blocking("http.archive_batch", move || api.archive_batch(batch_id, actor)).await?;
    Ok(ok("批次已归档", view))
}

pub async fn reconcile_aggregates(
    State(state): State<AppState>,
    caller: Caller,
    ApiPath(batch_id): ApiPath<i64>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&caller, Operation::ReconcileAggregates)?;
    let api = state.batch_api.clone();
    let report = run_blocking("http.reconcile_aggregates", move || {
        api.reconcile_aggregates(batch_id)
    })
    .await?;
    Ok(ok("聚合计数已核对", report))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_status_filter() {
        assert_eq!(parse_status(None).unwrap(), None);
        assert_eq!(parse_status(Some(" ".to_string())).unwrap(), None);
        assert_eq!(
            parse_status(Some("open".to_string())).unwrap(),
            Some(BatchStatus::Open)
        );
        assert_eq!(
            parse_status(Some("SHIPPED".to_string())).unwrap_err().code(),
            "VALIDATION_ERROR"
        );
    }
}
