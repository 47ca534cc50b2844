// ==========================================
// 物流批次跟踪系统 - 运单 API
// ==========================================
// 职责: 运单创建、查询、状态更新、取消
// 红线: 每次状态变化都追加一条运单事件
// ==========================================

use std::sync::Arc;

use tracing::info;

use crate::api::access::Caller;
use crate::api::dto::{CreateShipmentRequest, ShipmentDetail, UpdateShipmentStatusRequest};
use crate::api::error::{log_failure, ApiError, ApiResult};
use crate::domain::shipment::{Shipment, ShipmentEvent};
use crate::domain::types::{ShipmentEventType, ShipmentStatus};
use crate::repository::{
    lock_conn, MasterDataRepository, MasterTable, SharedConnection, ShipmentEventRepository,
    ShipmentFilter, ShipmentRepository, UnitOfWork,
};

// ==========================================
// ShipmentApi - 运单 API
// ==========================================
pub struct ShipmentApi {
    conn: SharedConnection,
    shipment_repo: Arc<ShipmentRepository>,
    event_repo: Arc<ShipmentEventRepository>,
    master_repo: Arc<MasterDataRepository>,
}

impl ShipmentApi {
    pub fn new(
        conn: SharedConnection,
        shipment_repo: Arc<ShipmentRepository>,
        event_repo: Arc<ShipmentEventRepository>,
        master_repo: Arc<MasterDataRepository>,
    ) -> Self {
        Self {
            conn,
            shipment_repo,
            event_repo,
            master_repo,
        }
    }

    // ==========================================
    // 创建
    // ==========================================

    /// 创建运单 (进入未分配池) 并记录 Created 事件
    pub fn create_shipment(
        &self,
        req: &CreateShipmentRequest,
        actor: Option<i64>,
    ) -> ApiResult<Shipment> {
        let shipment = self
            .create_inner(req, actor)
            .map_err(|e| log_failure("create_shipment", None, e))?;
        info!(
            shipment_id = shipment.id,
            client_id = shipment.client_id,
            weight = shipment.weight,
            actor = ?actor,
            "运单已创建"
        );
        Ok(shipment)
    }

    fn create_inner(&self, req: &CreateShipmentRequest, actor: Option<i64>) -> ApiResult<Shipment> {
        req.validate()?;

        let mut conn = lock_conn(&self.conn)?;
        let uow = UnitOfWork::begin(&mut conn)?;
        let tx = uow.tx();

        if !MasterDataRepository::exists_tx(tx, MasterTable::Client, req.client_id)? {
            return Err(ApiError::reference_not_found("Client", req.client_id));
        }

        let mut shipment = Shipment::new(
            req.client_id,
            req.weight,
            req.volume,
            req.pickup_address.trim().to_string(),
            req.delivery_address.trim().to_string(),
        );
        ShipmentRepository::insert_tx(tx, &mut shipment)?;

        let mut event = ShipmentEvent::new(shipment.id, ShipmentEventType::Created, "运单已创建")
            .with_actor(actor);
        ShipmentEventRepository::append_tx(tx, &mut event)?;

        uow.commit()?;
        Ok(shipment)
    }

    // ==========================================
    // 查询
    // ==========================================

    /// 运单详情 (含事件时间线)
    ///
    /// 仅具有客户角色的调用方只能查看自己的运单
    pub fn get_shipment(&self, shipment_id: i64, caller: &Caller) -> ApiResult<ShipmentDetail> {
        let shipment = self
            .shipment_repo
            .find_by_id(shipment_id)?
            .ok_or_else(|| ApiError::not_found("Shipment", shipment_id))?;

        if caller.is_client_only() {
            let own_client = self.master_repo.find_client_by_user_id(caller.user_id)?;
            if own_client.map(|c| c.id) != Some(shipment.client_id) {
                return Err(log_failure(
                    "get_shipment",
                    Some(shipment_id),
                    ApiError::Forbidden("只能查看自己的运单".to_string()),
                ));
            }
        }

        let events = self.event_repo.find_by_shipment(shipment_id)?;
        Ok(ShipmentDetail { shipment, events })
    }

    pub fn list_shipments(&self, filter: &ShipmentFilter) -> ApiResult<Vec<Shipment>> {
        Ok(self.shipment_repo.list(filter)?)
    }

    /// 未分配池 (可加入批次的运单)
    pub fn list_unassigned(&self) -> ApiResult<Vec<Shipment>> {
        Ok(self.shipment_repo.list_unassigned()?)
    }

    /// 承运商名下运单
    pub fn list_carrier_shipments(&self, carrier_id: i64) -> ApiResult<Vec<Shipment>> {
        if !self.master_repo.exists(MasterTable::Carrier, carrier_id)? {
            return Err(ApiError::not_found("Carrier", carrier_id));
        }
        Ok(self.shipment_repo.list_by_carrier(carrier_id)?)
    }

    // ==========================================
    // 状态变更
    // ==========================================

    /// 更新运单状态
    ///
    /// 不校验当前状态，任意状态可直接覆盖；变更记录写入事件
    pub fn update_status(
        &self,
        shipment_id: i64,
        req: &UpdateShipmentStatusRequest,
        actor: Option<i64>,
    ) -> ApiResult<Shipment> {
        let (shipment, previous) = self
            .update_status_inner(shipment_id, req, actor)
            .map_err(|e| log_failure("update_shipment_status", Some(shipment_id), e))?;
        info!(
            shipment_id,
            from = %previous,
            to = %shipment.status,
            actor = ?actor,
            "运单状态已更新"
        );
        Ok(shipment)
    }

    fn update_status_inner(
        &self,
        shipment_id: i64,
        req: &UpdateShipmentStatusRequest,
        actor: Option<i64>,
    ) -> ApiResult<(Shipment, ShipmentStatus)> {
        let mut conn = lock_conn(&self.conn)?;
        let uow = UnitOfWork::begin(&mut conn)?;
        let tx = uow.tx();

        let mut shipment = ShipmentRepository::find_by_id_tx(tx, shipment_id)?
            .ok_or_else(|| ApiError::not_found("Shipment", shipment_id))?;

        let previous = shipment.status;
        shipment.status = req.status;
        shipment.updated_at = chrono::Utc::now().naive_utc();
        ShipmentRepository::update_tx(tx, &mut shipment)?;

        let message = req
            .notes
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("运单状态由{}变更为{}", previous, req.status));
        let location = req
            .location
            .as_deref()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string);
        let mut event = ShipmentEvent::new(shipment.id, ShipmentEventType::StatusChanged, message)
            .with_actor(actor)
            .with_location(location);
        ShipmentEventRepository::append_tx(tx, &mut event)?;

        uow.commit()?;
        Ok((shipment, previous))
    }

    /// 取消运单 (已妥投/已取消不可取消)
    pub fn cancel_shipment(&self, shipment_id: i64, actor: Option<i64>) -> ApiResult<Shipment> {
        let shipment = self
            .cancel_inner(shipment_id, actor)
            .map_err(|e| log_failure("cancel_shipment", Some(shipment_id), e))?;
        info!(shipment_id, actor = ?actor, "运单已取消");
        Ok(shipment)
    }

    fn cancel_inner(&self, shipment_id: i64, actor: Option<i64>) -> ApiResult<Shipment> {
        let mut conn = lock_conn(&self.conn)?;
        let uow = UnitOfWork::begin(&mut conn)?;
        let tx = uow.tx();

        let mut shipment = ShipmentRepository::find_by_id_tx(tx, shipment_id)?
            .ok_or_else(|| ApiError::not_found("Shipment", shipment_id))?;

        if !shipment.is_cancellable() {
            let required = ShipmentStatus::ALL
                .iter()
                .filter(|s| !matches!(s, ShipmentStatus::Delivered | ShipmentStatus::Cancelled))
                .map(|s| s.to_db_str().to_string())
                .collect::<Vec<_>>();
            return Err(ApiError::InvalidState {
                current: shipment.status.to_db_str().to_string(),
                message: format!(
                    "运单无法取消: 当前状态={}, 要求状态={}",
                    shipment.status,
                    required.join("|")
                ),
                required,
            });
        }

        shipment.status = ShipmentStatus::Cancelled;
        shipment.updated_at = chrono::Utc::now().naive_utc();
        ShipmentRepository::update_tx(tx, &mut shipment)?;

        let mut event = ShipmentEvent::new(shipment.id, ShipmentEventType::Cancelled, "运单已取消")
            .with_actor(actor);
        ShipmentEventRepository::append_tx(tx, &mut event)?;

        uow.commit()?;
        Ok(shipment)
    }
}
