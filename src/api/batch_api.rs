// ==========================================
// 物流批次跟踪系统 - 批次 API
// ==========================================
// 职责: 批次创建、状态推进、成员维护、承运商分配
// 红线: 每个写操作在一个工作单元内完成 (BEGIN IMMEDIATE + revision 校验)
// 红线: 校验失败不写入任何数据
// ==========================================

use std::sync::Arc;

use chrono::NaiveDateTime;
use rusqlite::Connection;
use serde::Serialize;
use tracing::{info, warn};

use crate::api::dto::{BatchDetail, BatchView, CreateBatchRequest};
use crate::api::error::{log_failure, ApiError, ApiResult};
use crate::config::ConfigManager;
use crate::domain::batch::Batch;
use crate::domain::shipment::{Shipment, ShipmentEvent};
use crate::domain::types::{ShipmentEventType, ShipmentStatus};
use crate::engine::{
    AggregateDrift, BatchAggregate, BatchCommand, BatchOperation, BatchStateMachine, CarrierAssignment,
    CarrierAssignmentPlanner, DeliveryTally, ShipmentStatusProjector,
};
use crate::repository::{
    lock_conn, BatchFilter, BatchRepository, MasterDataRepository, MasterTable, SharedConnection,
    ShipmentEventRepository, ShipmentRepository, UnitOfWork,
};

/// 聚合计数重算报告
#[derive(Debug, Clone, Serialize)]
pub struct ReconcileReport {
    pub batch_id: i64,
    pub drift: AggregateDrift,
    pub repaired: bool,
}

// ==========================================
// BatchApi - 批次 API
// ==========================================
pub struct BatchApi {
    conn: SharedConnection,
    batch_repo: Arc<BatchRepository>,
    config: Arc<ConfigManager>,
    state_machine: BatchStateMachine,
    aggregate: BatchAggregate,
    planner: CarrierAssignmentPlanner,
    projector: ShipmentStatusProjector,
}

impl BatchApi {
    /// 创建新的 BatchApi 实例
    ///
    /// # 参数
    /// - conn: 共享连接 (写操作在其上开启工作单元)
    /// - batch_repo: 批次仓储 (只读查询)
    /// - config: 业务开关
    pub fn new(
        conn: SharedConnection,
        batch_repo: Arc<BatchRepository>,
        config: Arc<ConfigManager>,
    ) -> Self {
        Self {
            conn,
            batch_repo,
            config,
            state_machine: BatchStateMachine::new(),
            aggregate: BatchAggregate::new(),
            planner: CarrierAssignmentPlanner::new(),
            projector: ShipmentStatusProjector::new(),
        }
    }

    // ==========================================
    // 查询
    // ==========================================

    pub fn list_batches(&self, filter: &BatchFilter) -> ApiResult<Vec<BatchView>> {
        let batches = self
            .batch_repo
            .list(filter)
            .map_err(|e| log_failure("list_batches", None, e.into()))?;
        Ok(batches.into_iter().map(BatchView::from).collect())
    }

    /// 批次详情 (含成员运单)
    pub fn get_batch(&self, batch_id: i64) -> ApiResult<BatchDetail> {
        let conn = lock_conn(&self.conn)?;
        let batch = load_batch(&conn, batch_id)?;
        let shipments = ShipmentRepository::find_by_batch_tx(&conn, batch_id)?;
        Ok(BatchDetail {
            view: BatchView::from(batch),
            shipments,
        })
    }

    // ==========================================
    // 创建
    // ==========================================

    /// 创建草稿批次
    pub fn create_batch(&self, req: &CreateBatchRequest, actor: Option<i64>) -> ApiResult<BatchView> {
        self.create_batch_inner(req)
            .map(|batch| {
                info!(
                    batch_id = batch.id,
                    branch_id = batch.branch_id,
                    actor = ?actor,
                    "批次已创建"
                );
                BatchView::from(batch)
            })
            .map_err(|e| log_failure("create_batch", None, e))
    }

    fn create_batch_inner(&self, req: &CreateBatchRequest) -> ApiResult<Batch> {
        req.validate()?;

        let mut conn = lock_conn(&self.conn)?;
        let uow = UnitOfWork::begin(&mut conn)?;
        let tx = uow.tx();

        if !MasterDataRepository::exists_tx(tx, MasterTable::Branch, req.branch_id)? {
            return Err(ApiError::reference_not_found("Branch", req.branch_id));
        }

        let mut batch = Batch::new(
            req.branch_id,
            req.name.trim().to_string(),
            req.threshold_count,
            req.threshold_weight,
        );
        BatchRepository::insert_tx(tx, &mut batch)?;
        uow.commit()?;
        Ok(batch)
    }

    // ==========================================
    // 状态推进
    // ==========================================

    /// DRAFT → OPEN
    pub fn open_batch(&self, batch_id: i64, actor: Option<i64>) -> ApiResult<BatchView> {
        self.transition(batch_id, BatchCommand::Open, &[], actor)
    }

    /// OPEN → CLOSED (批次不能为空)
    pub fn close_batch(&self, batch_id: i64, actor: Option<i64>) -> ApiResult<BatchView> {
        self.transition(batch_id, BatchCommand::Close, &[], actor)
    }

    /// CLOSED → IN_WAREHOUSE (设置始发仓)
    pub fn move_to_warehouse(
        &self,
        batch_id: i64,
        warehouse_id: i64,
        actor: Option<i64>,
    ) -> ApiResult<BatchView> {
        self.transition(
            batch_id,
            BatchCommand::MoveToWarehouse { warehouse_id },
            &[(MasterTable::Warehouse, warehouse_id)],
            actor,
        )
    }

    /// 设置目的仓 (状态不变)
    pub fn assign_destination_warehouse(
        &self,
        batch_id: i64,
        warehouse_id: i64,
        actor: Option<i64>,
    ) -> ApiResult<BatchView> {
        self.transition(
            batch_id,
            BatchCommand::AssignDestinationWarehouse { warehouse_id },
            &[(MasterTable::Warehouse, warehouse_id)],
            actor,
        )
    }

    /// IN_WAREHOUSE → AT_SOURCE_PORT
    pub fn move_to_source_port(
        &self,
        batch_id: i64,
        source_port_id: i64,
        destination_port_id: Option<i64>,
        actor: Option<i64>,
    ) -> ApiResult<BatchView> {
        let mut references = vec![(MasterTable::Port, source_port_id)];
        if let Some(port_id) = destination_port_id {
            references.push((MasterTable::Port, port_id));
        }
        self.transition(
            batch_id,
            BatchCommand::MoveToSourcePort {
                source_port_id,
                destination_port_id,
            },
            &references,
            actor,
        )
    }

    /// AT_SOURCE_PORT → CLEARED_SOURCE_PORT
    pub fn clear_source_port(&self, batch_id: i64, actor: Option<i64>) -> ApiResult<BatchView> {
        self.transition(batch_id, BatchCommand::ClearSourcePort, &[], actor)
    }

    /// CLEARED_SOURCE_PORT → IN_TRANSIT
    pub fn start_transit(&self, batch_id: i64, actor: Option<i64>) -> ApiResult<BatchView> {
        self.transition(batch_id, BatchCommand::StartTransit, &[], actor)
    }

    /// IN_TRANSIT → ARRIVED_DESTINATION_PORT
    pub fn mark_arrival(&self, batch_id: i64, actor: Option<i64>) -> ApiResult<BatchView> {
        self.transition(batch_id, BatchCommand::MarkArrival, &[], actor)
    }

    /// ARRIVED_DESTINATION_PORT → IN_DESTINATION_WAREHOUSE
    pub fn move_to_destination_warehouse(
        &self,
        batch_id: i64,
        warehouse_id: i64,
        actor: Option<i64>,
    ) -> ApiResult<BatchView> {
        self.transition(
            batch_id,
            BatchCommand::MoveToDestinationWarehouse { warehouse_id },
            &[(MasterTable::Warehouse, warehouse_id)],
            actor,
        )
    }

    /// ASSIGNED_TO_CARRIERS → DELIVERED | PARTIALLY_DELIVERED
    ///
    /// 妥投统计在工作单元内按成员运单计算
    pub fn complete_delivery(&self, batch_id: i64, actor: Option<i64>) -> ApiResult<BatchView> {
        self.transition(
            batch_id,
            BatchCommand::CompleteDelivery {
                tally: DeliveryTally::default(),
            },
            &[],
            actor,
        )
    }

    /// 取消批次 (不级联成员运单)
    pub fn cancel_batch(&self, batch_id: i64, actor: Option<i64>) -> ApiResult<BatchView> {
        self.transition(batch_id, BatchCommand::Cancel, &[], actor)
    }

    /// 归档已结束批次
    pub fn archive_batch(&self, batch_id: i64, actor: Option<i64>) -> ApiResult<BatchView> {
        self.transition(batch_id, BatchCommand::Archive, &[], actor)
    }

    /// 统一转换入口
    ///
    /// 顺序: 加载批次 → 前置状态 → 引用实体 → 守卫与副作用 → 持久化 → 运单投影
    fn transition(
        &self,
        batch_id: i64,
        command: BatchCommand,
        references: &[(MasterTable, i64)],
        actor: Option<i64>,
    ) -> ApiResult<BatchView> {
        let operation = command.operation();
        self.transition_inner(batch_id, command, references, actor)
            .map(|(batch, projected)| {
                info!(
                    batch_id,
                    operation = %operation,
                    status = %batch.status,
                    projected_shipments = projected,
                    actor = ?actor,
                    "批次状态已更新"
                );
                BatchView::from(batch)
            })
            .map_err(|e| log_failure(operation.as_str(), Some(batch_id), e))
    }

    fn transition_inner(
        &self,
        batch_id: i64,
        mut command: BatchCommand,
        references: &[(MasterTable, i64)],
        actor: Option<i64>,
    ) -> ApiResult<(Batch, usize)> {
        // 配置读取需在持有连接锁之前完成
        let project_enabled = self.config.project_batch_status()?;

        let mut conn = lock_conn(&self.conn)?;
        let uow = UnitOfWork::begin(&mut conn)?;
        let tx = uow.tx();

        let mut batch = load_batch(tx, batch_id)?;
        self.state_machine.check(&batch, command.operation())?;

        for (table, ref_id) in references {
            if !MasterDataRepository::exists_tx(tx, *table, *ref_id)? {
                return Err(ApiError::reference_not_found(table.entity_name(), *ref_id));
            }
        }

        if let BatchCommand::CompleteDelivery { tally } = &mut command {
            *tally = delivery_tally(&ShipmentRepository::find_by_batch_tx(tx, batch_id)?);
        }

        let now = chrono::Utc::now().naive_utc();
        let outcome = self.state_machine.apply(&mut batch, &command, now)?;
        BatchRepository::update_tx(tx, &mut batch)?;

        let projected = if project_enabled && outcome.status_changed() {
            self.project_members(tx, &batch, actor, now)?
        } else {
            0
        };

        uow.commit()?;
        Ok((batch, projected))
    }

    /// 将批次状态投影到成员运单
    ///
    /// # 返回
    /// - 状态发生变化的运单数
    fn project_members(
        &self,
        tx: &Connection,
        batch: &Batch,
        actor: Option<i64>,
        now: NaiveDateTime,
    ) -> ApiResult<usize> {
        let mut changed = 0;
        for mut shipment in ShipmentRepository::find_by_batch_tx(tx, batch.id)? {
            if let Some(previous) = self.projector.apply(batch.status, &mut shipment, now) {
                ShipmentRepository::update_tx(tx, &mut shipment)?;
                let mut event = ShipmentEvent::new(
                    shipment.id,
                    ShipmentEventType::StatusChanged,
                    format!(
                        "批次{}进入{}，运单状态由{}变更为{}",
                        batch.name, batch.status, previous, shipment.status
                    ),
                )
                .with_actor(actor);
                ShipmentEventRepository::append_tx(tx, &mut event)?;
                changed += 1;
            }
        }
        Ok(changed)
    }

    // ==========================================
    // 成员维护
    // ==========================================

    /// 运单入批 (成员关系与计数同一事务内更新)
    pub fn add_shipment(
        &self,
        batch_id: i64,
        shipment_id: i64,
        actor: Option<i64>,
    ) -> ApiResult<BatchView> {
        let warn_enabled = self
            .config
            .threshold_warning_enabled()
            .map_err(|e| log_failure("add_shipment", Some(batch_id), e.into()))?;

        let batch = self
            .change_membership(batch_id, shipment_id, true, actor)
            .map_err(|e| log_failure("add_shipment", Some(batch_id), e))?;

        info!(
            batch_id,
            shipment_id,
            shipment_count = batch.shipment_count,
            total_weight = batch.total_weight,
            actor = ?actor,
            "运单已加入批次"
        );
        if warn_enabled && batch.exceeds_thresholds() {
            warn!(
                batch_id,
                shipment_count = batch.shipment_count,
                threshold_count = batch.threshold_count,
                total_weight = batch.total_weight,
                threshold_weight = batch.threshold_weight,
                "批次已超出建议容量"
            );
        }
        Ok(BatchView::from(batch))
    }

    /// 运单出批 (回到未分配池)
    pub fn remove_shipment(
        &self,
        batch_id: i64,
        shipment_id: i64,
        actor: Option<i64>,
    ) -> ApiResult<BatchView> {
        let batch = self
            .change_membership(batch_id, shipment_id, false, actor)
            .map_err(|e| log_failure("remove_shipment", Some(batch_id), e))?;

        info!(
            batch_id,
            shipment_id,
            shipment_count = batch.shipment_count,
            total_weight = batch.total_weight,
            actor = ?actor,
            "运单已移出批次"
        );
        Ok(BatchView::from(batch))
    }

    fn change_membership(
        &self,
        batch_id: i64,
        shipment_id: i64,
        attach: bool,
        actor: Option<i64>,
    ) -> ApiResult<Batch> {
        let mut conn = lock_conn(&self.conn)?;
        let uow = UnitOfWork::begin(&mut conn)?;
        let tx = uow.tx();

        let mut batch = load_batch(tx, batch_id)?;
        let mut shipment = load_shipment(tx, shipment_id)?;
        let now = chrono::Utc::now().naive_utc();

        let (event_type, message) = if attach {
            self.aggregate.attach(&mut batch, &mut shipment, now)?;
            (
                ShipmentEventType::AddedToBatch,
                format!("运单加入批次{}", batch.name),
            )
        } else {
            self.aggregate.detach(&mut batch, &mut shipment, now)?;
            (
                ShipmentEventType::RemovedFromBatch,
                format!("运单移出批次{}", batch.name),
            )
        };

        BatchRepository::update_tx(tx, &mut batch)?;
        ShipmentRepository::update_tx(tx, &mut shipment)?;
        let mut event = ShipmentEvent::new(shipment.id, event_type, message).with_actor(actor);
        ShipmentEventRepository::append_tx(tx, &mut event)?;

        uow.commit()?;
        Ok(batch)
    }

    // ==========================================
    // 承运商分配 (全部成功或全部回滚)
    // ==========================================

    /// IN_DESTINATION_WAREHOUSE → ASSIGNED_TO_CARRIERS
    ///
    /// # 参数
    /// - assignments: 按顺序处理的 (运单, 承运商) 清单
    ///
    /// # 返回
    /// - Ok(BatchDetail): 分配后的批次与成员运单
    /// - Err: 任一行失败时整个事务回滚，批次与运单均保持原状
    pub fn assign_carriers(
        &self,
        batch_id: i64,
        assignments: &[CarrierAssignment],
        actor: Option<i64>,
    ) -> ApiResult<BatchDetail> {
        let detail = self
            .assign_carriers_inner(batch_id, assignments, actor)
            .map_err(|e| log_failure("assign_carriers", Some(batch_id), e))?;

        info!(
            batch_id,
            assigned = assignments.len(),
            actor = ?actor,
            "批次承运商分配完成"
        );
        Ok(detail)
    }

    fn assign_carriers_inner(
        &self,
        batch_id: i64,
        assignments: &[CarrierAssignment],
        actor: Option<i64>,
    ) -> ApiResult<BatchDetail> {
        let mut conn = lock_conn(&self.conn)?;
        let uow = UnitOfWork::begin(&mut conn)?;
        let tx = uow.tx();

        let mut batch = load_batch(tx, batch_id)?;
        self.state_machine
            .check(&batch, BatchOperation::AssignCarriers)?;

        let now = chrono::Utc::now().naive_utc();
        if let Err(e) = self.apply_assignments(tx, &mut batch, assignments, actor, now) {
            uow.rollback()?;
            return Err(e);
        }

        let shipments = ShipmentRepository::find_by_batch_tx(uow.tx(), batch_id)?;
        uow.commit()?;
        Ok(BatchDetail {
            view: BatchView::from(batch),
            shipments,
        })
    }

    fn apply_assignments(
        &self,
        tx: &Connection,
        batch: &mut Batch,
        assignments: &[CarrierAssignment],
        actor: Option<i64>,
        now: NaiveDateTime,
    ) -> ApiResult<()> {
        self.planner.validate_shape(assignments)?;

        for assignment in assignments {
            let shipment = ShipmentRepository::find_by_id_tx(tx, assignment.shipment_id)?;
            let carrier_exists =
                MasterDataRepository::exists_tx(tx, MasterTable::Carrier, assignment.carrier_id)?;
            let mut shipment =
                self.planner
                    .validate_row(batch.id, assignment, shipment, carrier_exists)?;

            self.planner.apply(&mut shipment, assignment.carrier_id, now);
            ShipmentRepository::update_tx(tx, &mut shipment)?;

            let mut event = ShipmentEvent::new(
                shipment.id,
                ShipmentEventType::CarrierAssigned,
                format!("运单已分配承运商 {}", assignment.carrier_id),
            )
            .with_actor(actor);
            ShipmentEventRepository::append_tx(tx, &mut event)?;
        }

        self.state_machine
            .apply(batch, &BatchCommand::AssignCarriers { assigned_at: now }, now)?;
        BatchRepository::update_tx(tx, batch)?;
        Ok(())
    }

    // ==========================================
    // 维护
    // ==========================================

    /// 按成员关系重算批次聚合计数
    pub fn reconcile_aggregates(&self, batch_id: i64) -> ApiResult<ReconcileReport> {
        self.reconcile_inner(batch_id)
            .map_err(|e| log_failure("reconcile_aggregates", Some(batch_id), e))
    }

    fn reconcile_inner(&self, batch_id: i64) -> ApiResult<ReconcileReport> {
        let mut conn = lock_conn(&self.conn)?;
        let uow = UnitOfWork::begin(&mut conn)?;
        let tx = uow.tx();

        let mut batch = load_batch(tx, batch_id)?;
        let members = ShipmentRepository::find_by_batch_tx(tx, batch_id)?;
        let drift = self.aggregate.reconcile(&mut batch, &members);

        let repaired = drift.has_drift();
        if repaired {
            batch.updated_at = chrono::Utc::now().naive_utc();
            BatchRepository::update_tx(tx, &mut batch)?;
            warn!(
                batch_id,
                stored_count = drift.stored_count,
                actual_count = drift.actual_count,
                stored_weight = drift.stored_weight,
                actual_weight = drift.actual_weight,
                "批次聚合计数与成员不一致，已修复"
            );
        }
        uow.commit()?;

        Ok(ReconcileReport {
            batch_id,
            drift,
            repaired,
        })
    }
}

// ==========================================
// 辅助函数
// ==========================================

fn load_batch(tx: &Connection, batch_id: i64) -> ApiResult<Batch> {
    BatchRepository::find_by_id_tx(tx, batch_id)?.ok_or_else(|| ApiError::not_found("Batch", batch_id))
}

fn load_shipment(tx: &Connection, shipment_id: i64) -> ApiResult<Shipment> {
    ShipmentRepository::find_by_id_tx(tx, shipment_id)?
        .ok_or_else(|| ApiError::not_found("Shipment", shipment_id))
}

fn delivery_tally(members: &[Shipment]) -> DeliveryTally {
    let active = members
        .iter()
        .filter(|s| s.status != ShipmentStatus::Cancelled)
        .count() as i64;
    let delivered = members
        .iter()
        .filter(|s| s.status == ShipmentStatus::Delivered)
        .count() as i64;
    DeliveryTally { active, delivered }
}
