// ==========================================
// 物流批次跟踪系统 - 批次状态机
// ==========================================
// 职责: 校验并应用批次状态转换
// 红线: 前置状态只在转换表中定义一次，所有操作统一经由 apply 校验
// 红线: 校验失败不修改批次
// ==========================================

use crate::domain::batch::Batch;
use crate::domain::types::BatchStatus;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// ==========================================
// BatchOperation - 批次操作
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BatchOperation {
    Open,
    Close,
    MoveToWarehouse,
    AssignDestinationWarehouse,
    MoveToSourcePort,
    ClearSourcePort,
    StartTransit,
    MarkArrival,
    MoveToDestinationWarehouse,
    AssignCarriers,
    CompleteDelivery,
    Cancel,
    Archive,
}

impl BatchOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchOperation::Open => "OPEN",
            BatchOperation::Close => "CLOSE",
            BatchOperation::MoveToWarehouse => "MOVE_TO_WAREHOUSE",
            BatchOperation::AssignDestinationWarehouse => "ASSIGN_DESTINATION_WAREHOUSE",
            BatchOperation::MoveToSourcePort => "MOVE_TO_SOURCE_PORT",
            BatchOperation::ClearSourcePort => "CLEAR_SOURCE_PORT",
            BatchOperation::StartTransit => "START_TRANSIT",
            BatchOperation::MarkArrival => "MARK_ARRIVAL",
            BatchOperation::MoveToDestinationWarehouse => "MOVE_TO_DESTINATION_WAREHOUSE",
            BatchOperation::AssignCarriers => "ASSIGN_CARRIERS",
            BatchOperation::CompleteDelivery => "COMPLETE_DELIVERY",
            BatchOperation::Cancel => "CANCEL",
            BatchOperation::Archive => "ARCHIVE",
        }
    }
}

impl fmt::Display for BatchOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// DeliveryTally - 批次成员妥投统计
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DeliveryTally {
    pub active: i64,    // 未取消的成员运单数
    pub delivered: i64, // 已妥投的成员运单数
}

// ==========================================
// BatchCommand - 携带参数的转换指令
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub enum BatchCommand {
    Open,
    Close,
    MoveToWarehouse {
        warehouse_id: i64,
    },
    AssignDestinationWarehouse {
        warehouse_id: i64,
    },
    MoveToSourcePort {
        source_port_id: i64,
        destination_port_id: Option<i64>,
    },
    ClearSourcePort,
    StartTransit,
    MarkArrival,
    MoveToDestinationWarehouse {
        warehouse_id: i64,
    },
    AssignCarriers {
        assigned_at: NaiveDateTime,
    },
    CompleteDelivery {
        tally: DeliveryTally,
    },
    Cancel,
    Archive,
}

impl BatchCommand {
    pub fn operation(&self) -> BatchOperation {
        match self {
            BatchCommand::Open => BatchOperation::Open,
            BatchCommand::Close => BatchOperation::Close,
            BatchCommand::MoveToWarehouse { .. } => BatchOperation::MoveToWarehouse,
            BatchCommand::AssignDestinationWarehouse { .. } => {
                BatchOperation::AssignDestinationWarehouse
            }
            BatchCommand::MoveToSourcePort { .. } => BatchOperation::MoveToSourcePort,
            BatchCommand::ClearSourcePort => BatchOperation::ClearSourcePort,
            BatchCommand::StartTransit => BatchOperation::StartTransit,
            BatchCommand::MarkArrival => BatchOperation::MarkArrival,
            BatchCommand::MoveToDestinationWarehouse { .. } => {
                BatchOperation::MoveToDestinationWarehouse
            }
            BatchCommand::AssignCarriers { .. } => BatchOperation::AssignCarriers,
            BatchCommand::CompleteDelivery { .. } => BatchOperation::CompleteDelivery,
            BatchCommand::Cancel => BatchOperation::Cancel,
            BatchCommand::Archive => BatchOperation::Archive,
        }
    }
}

// ==========================================
// TransitionError - 状态转换错误
// ==========================================
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransitionError {
    #[error("{}", describe_invalid_state(*.operation, *.current, .required, .reason.as_deref()))]
    InvalidState {
        operation: BatchOperation,
        current: BatchStatus,
        required: Vec<BatchStatus>,
        reason: Option<String>,
    },
}

fn describe_invalid_state(
    operation: BatchOperation,
    current: BatchStatus,
    required: &[BatchStatus],
    reason: Option<&str>,
) -> String {
    let required = required
        .iter()
        .map(|s| s.to_db_str())
        .collect::<Vec<_>>()
        .join("|");
    match reason {
        Some(reason) => format!(
            "批次无法执行{}: {} (当前状态={}, 要求状态={})",
            operation, reason, current, required
        ),
        None => format!(
            "批次无法执行{}: 当前状态={}, 要求状态={}",
            operation, current, required
        ),
    }
}

// ==========================================
// 转换表
// ==========================================

/// 转换目标状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionTarget {
    /// 固定目标状态
    To(BatchStatus),
    /// 状态不变，仅更新字段
    Unchanged,
    /// 由妥投统计决定 (DELIVERED / PARTIALLY_DELIVERED)
    DeliveryOutcome,
}

/// 转换规则: (操作) → (前置状态, 守卫, 目标状态, 字段副作用)
pub struct TransitionRule {
    pub operation: BatchOperation,
    pub allowed_from: &'static [BatchStatus],
    pub target: TransitionTarget,
    pub guard: fn(&Batch, &BatchCommand) -> Result<(), String>,
    pub effect: fn(&mut Batch, &BatchCommand),
}

const CANCELLABLE: &[BatchStatus] = &[
    BatchStatus::Draft,
    BatchStatus::Open,
    BatchStatus::Closed,
    BatchStatus::InWarehouse,
    BatchStatus::AtSourcePort,
    BatchStatus::ClearedSourcePort,
    BatchStatus::InTransit,
    BatchStatus::ArrivedDestinationPort,
    BatchStatus::InDestinationWarehouse,
    BatchStatus::AssignedToCarriers,
    BatchStatus::PartiallyDelivered,
    BatchStatus::Archived,
];

fn no_guard(_batch: &Batch, _command: &BatchCommand) -> Result<(), String> {
    Ok(())
}

fn no_effect(_batch: &mut Batch, _command: &BatchCommand) {}

fn guard_non_empty(batch: &Batch, _command: &BatchCommand) -> Result<(), String> {
    if batch.shipment_count > 0 {
        Ok(())
    } else {
        Err("不能封闭空批次".to_string())
    }
}

fn guard_any_delivered(_batch: &Batch, command: &BatchCommand) -> Result<(), String> {
    match command {
        BatchCommand::CompleteDelivery { tally } if tally.delivered > 0 => Ok(()),
        BatchCommand::CompleteDelivery { .. } => Err("尚无已妥投的运单".to_string()),
        _ => Ok(()),
    }
}

fn set_source_warehouse(batch: &mut Batch, command: &BatchCommand) {
    if let BatchCommand::MoveToWarehouse { warehouse_id } = command {
        batch.source_warehouse_id = Some(*warehouse_id);
    }
}

fn set_destination_warehouse(batch: &mut Batch, command: &BatchCommand) {
    match command {
        BatchCommand::AssignDestinationWarehouse { warehouse_id }
        | BatchCommand::MoveToDestinationWarehouse { warehouse_id } => {
            batch.destination_warehouse_id = Some(*warehouse_id);
        }
        _ => {}
    }
}

fn set_ports(batch: &mut Batch, command: &BatchCommand) {
    if let BatchCommand::MoveToSourcePort {
        source_port_id,
        destination_port_id,
    } = command
    {
        batch.source_port_id = Some(*source_port_id);
        // 未提供目的港时保留原值
        if let Some(port_id) = destination_port_id {
            batch.destination_port_id = Some(*port_id);
        }
    }
}

fn set_carrier_assigned_at(batch: &mut Batch, command: &BatchCommand) {
    if let BatchCommand::AssignCarriers { assigned_at } = command {
        batch.carrier_assigned_at = Some(*assigned_at);
    }
}

/// 批次状态转换表 (顺序与 BatchStateMachine::rule 的下标一致)
pub static TRANSITION_TABLE: [TransitionRule; 13] = [
    TransitionRule {
        operation: BatchOperation::Open,
        allowed_from: &[BatchStatus::Draft],
        target: TransitionTarget::To(BatchStatus::Open),
        guard: no_guard,
        effect: no_effect,
    },
    TransitionRule {
        operation: BatchOperation::Close,
        allowed_from: &[BatchStatus::Open],
        target: TransitionTarget::To(BatchStatus::Closed),
        guard: guard_non_empty,
        effect: no_effect,
    },
    TransitionRule {
        operation: BatchOperation::MoveToWarehouse,
        allowed_from: &[BatchStatus::Closed],
        target: TransitionTarget::To(BatchStatus::InWarehouse),
        guard: no_guard,
        effect: set_source_warehouse,
    },
    TransitionRule {
        operation: BatchOperation::AssignDestinationWarehouse,
        allowed_from: &[BatchStatus::InWarehouse, BatchStatus::AtSourcePort],
        target: TransitionTarget::Unchanged,
        guard: no_guard,
        effect: set_destination_warehouse,
    },
    TransitionRule {
        operation: BatchOperation::MoveToSourcePort,
        allowed_from: &[BatchStatus::InWarehouse],
        target: TransitionTarget::To(BatchStatus::AtSourcePort),
        guard: no_guard,
        effect: set_ports,
    },
    TransitionRule {
        operation: BatchOperation::ClearSourcePort,
        allowed_from: &[BatchStatus::AtSourcePort],
        target: TransitionTarget::To(BatchStatus::ClearedSourcePort),
        guard: no_guard,
        effect: no_effect,
    },
    TransitionRule {
        operation: BatchOperation::StartTransit,
        allowed_from: &[BatchStatus::ClearedSourcePort],
        target: TransitionTarget::To(BatchStatus::InTransit),
        guard: no_guard,
        effect: no_effect,
    },
    TransitionRule {
        operation: BatchOperation::MarkArrival,
        allowed_from: &[BatchStatus::InTransit],
        target: TransitionTarget::To(BatchStatus::ArrivedDestinationPort),
        guard: no_guard,
        effect: no_effect,
    },
    TransitionRule {
        operation: BatchOperation::MoveToDestinationWarehouse,
        allowed_from: &[BatchStatus::ArrivedDestinationPort],
        target: TransitionTarget::To(BatchStatus::InDestinationWarehouse),
        guard: no_guard,
        effect: set_destination_warehouse,
    },
    TransitionRule {
        operation: BatchOperation::AssignCarriers,
        allowed_from: &[BatchStatus::InDestinationWarehouse],
        target: TransitionTarget::To(BatchStatus::AssignedToCarriers),
        guard: no_guard,
        effect: set_carrier_assigned_at,
    },
    TransitionRule {
        operation: BatchOperation::CompleteDelivery,
        allowed_from: &[BatchStatus::AssignedToCarriers],
        target: TransitionTarget::DeliveryOutcome,
        guard: guard_any_delivered,
        effect: no_effect,
    },
    TransitionRule {
        operation: BatchOperation::Cancel,
        allowed_from: CANCELLABLE,
        target: TransitionTarget::To(BatchStatus::Cancelled),
        guard: no_guard,
        effect: no_effect,
    },
    TransitionRule {
        operation: BatchOperation::Archive,
        allowed_from: &[
            BatchStatus::Delivered,
            BatchStatus::PartiallyDelivered,
            BatchStatus::Cancelled,
        ],
        target: TransitionTarget::To(BatchStatus::Archived),
        guard: no_guard,
        effect: no_effect,
    },
];

/// 转换结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TransitionOutcome {
    pub operation: BatchOperation,
    pub from: BatchStatus,
    pub to: BatchStatus,
}

impl TransitionOutcome {
    pub fn status_changed(&self) -> bool {
        self.from != self.to
    }
}

// ==========================================
// BatchStateMachine - 批次状态机
// ==========================================
#[derive(Debug, Clone, Copy, Default)]
pub struct BatchStateMachine;

impl BatchStateMachine {
    pub fn new() -> Self {
        Self
    }

    /// 查找操作对应的转换规则
    pub fn rule(&self, operation: BatchOperation) -> &'static TransitionRule {
        let index = match operation {
            BatchOperation::Open => 0,
            BatchOperation::Close => 1,
            BatchOperation::MoveToWarehouse => 2,
            BatchOperation::AssignDestinationWarehouse => 3,
            BatchOperation::MoveToSourcePort => 4,
            BatchOperation::ClearSourcePort => 5,
            BatchOperation::StartTransit => 6,
            BatchOperation::MarkArrival => 7,
            BatchOperation::MoveToDestinationWarehouse => 8,
            BatchOperation::AssignCarriers => 9,
            BatchOperation::CompleteDelivery => 10,
            BatchOperation::Cancel => 11,
            BatchOperation::Archive => 12,
        };
        &TRANSITION_TABLE[index]
    }

    /// 只校验前置状态 (不含守卫)
    ///
    /// 用于在校验引用实体之前尽早拒绝非法操作
    pub fn check(&self, batch: &Batch, operation: BatchOperation) -> Result<(), TransitionError> {
        let rule = self.rule(operation);
        if rule.allowed_from.contains(&batch.status) {
            Ok(())
        } else {
            Err(TransitionError::InvalidState {
                operation,
                current: batch.status,
                required: rule.allowed_from.to_vec(),
                reason: None,
            })
        }
    }

    /// 校验并应用状态转换
    ///
    /// # 返回
    /// - Ok(TransitionOutcome): 已修改批次
    /// - Err(TransitionError): 批次保持不变
    pub fn apply(
        &self,
        batch: &mut Batch,
        command: &BatchCommand,
        now: NaiveDateTime,
    ) -> Result<TransitionOutcome, TransitionError> {
        let operation = command.operation();
        let rule = self.rule(operation);
        self.check(batch, operation)?;

        (rule.guard)(batch, command).map_err(|reason| TransitionError::InvalidState {
            operation,
            current: batch.status,
            required: rule.allowed_from.to_vec(),
            reason: Some(reason),
        })?;

        let from = batch.status;
        let to = match rule.target {
            TransitionTarget::To(status) => status,
            TransitionTarget::Unchanged => from,
            TransitionTarget::DeliveryOutcome => match command {
                BatchCommand::CompleteDelivery { tally } if tally.delivered >= tally.active => {
                    BatchStatus::Delivered
                }
                _ => BatchStatus::PartiallyDelivered,
            },
        };

        (rule.effect)(batch, command);
        batch.status = to;
        batch.updated_at = now;

        Ok(TransitionOutcome { operation, from, to })
    }

    /// 当前状态下允许的操作列表
    pub fn allowed_operations(&self, status: BatchStatus) -> Vec<BatchOperation> {
        TRANSITION_TABLE
            .iter()
            .filter(|rule| rule.allowed_from.contains(&status))
            .map(|rule| rule.operation)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batch_in(status: BatchStatus, shipment_count: i64) -> Batch {
        let mut batch = Batch::new(1, "B-TEST".to_string(), 10, 100.0);
        batch.id = 1;
        batch.status = status;
        batch.shipment_count = shipment_count;
        batch.total_weight = shipment_count as f64 * 5.0;
        batch
    }

    fn now() -> NaiveDateTime {
        chrono::Utc::now().naive_utc()
    }

    fn sample_command(operation: BatchOperation) -> BatchCommand {
        match operation {
            BatchOperation::Open => BatchCommand::Open,
            BatchOperation::Close => BatchCommand::Close,
            BatchOperation::MoveToWarehouse => BatchCommand::MoveToWarehouse { warehouse_id: 3 },
            BatchOperation::AssignDestinationWarehouse => {
                BatchCommand::AssignDestinationWarehouse { warehouse_id: 4 }
            }
            BatchOperation::MoveToSourcePort => BatchCommand::MoveToSourcePort {
                source_port_id: 5,
                destination_port_id: Some(6),
            },
            BatchOperation::ClearSourcePort => BatchCommand::ClearSourcePort,
            BatchOperation::StartTransit => BatchCommand::StartTransit,
            BatchOperation::MarkArrival => BatchCommand::MarkArrival,
            BatchOperation::MoveToDestinationWarehouse => {
                BatchCommand::MoveToDestinationWarehouse { warehouse_id: 4 }
            }
            BatchOperation::AssignCarriers => BatchCommand::AssignCarriers { assigned_at: now() },
            BatchOperation::CompleteDelivery => BatchCommand::CompleteDelivery {
                tally: DeliveryTally {
                    active: 2,
                    delivered: 2,
                },
            },
            BatchOperation::Cancel => BatchCommand::Cancel,
            BatchOperation::Archive => BatchCommand::Archive,
        }
    }

    const ALL_OPERATIONS: [BatchOperation; 13] = [
        BatchOperation::Open,
        BatchOperation::Close,
        BatchOperation::MoveToWarehouse,
        BatchOperation::AssignDestinationWarehouse,
        BatchOperation::MoveToSourcePort,
        BatchOperation::ClearSourcePort,
        BatchOperation::StartTransit,
        BatchOperation::MarkArrival,
        BatchOperation::MoveToDestinationWarehouse,
        BatchOperation::AssignCarriers,
        BatchOperation::CompleteDelivery,
        BatchOperation::Cancel,
        BatchOperation::Archive,
    ];

    #[test]
    fn test_every_operation_has_exactly_one_rule() {
        for op in ALL_OPERATIONS {
            let count = TRANSITION_TABLE.iter().filter(|r| r.operation == op).count();
            assert_eq!(count, 1, "operation {} should have one rule", op);
        }
        assert_eq!(TRANSITION_TABLE.len(), ALL_OPERATIONS.len());
    }

    #[test]
    fn test_rule_lookup_matches_table_order() {
        let machine = BatchStateMachine::new();
        for op in ALL_OPERATIONS {
            assert_eq!(machine.rule(op).operation, op);
        }
        for (index, rule) in TRANSITION_TABLE.iter().enumerate() {
            assert_eq!(ALL_OPERATIONS[index], rule.operation);
        }
    }

    #[test]
    fn test_rejected_transitions_never_mutate() {
        let machine = BatchStateMachine::new();
        for status in BatchStatus::ALL {
            for op in ALL_OPERATIONS {
                let mut batch = batch_in(status, 2);
                let before = batch.clone();
                let result = machine.apply(&mut batch, &sample_command(op), now());
                let allowed = machine.rule(op).allowed_from.contains(&status);
                assert_eq!(result.is_ok(), allowed, "status={} op={}", status, op);
                if !allowed {
                    assert_eq!(batch, before, "failed {} from {} mutated batch", op, status);
                    match result {
                        Err(TransitionError::InvalidState {
                            current, required, ..
                        }) => {
                            assert_eq!(current, status);
                            assert_eq!(required, machine.rule(op).allowed_from.to_vec());
                        }
                        Ok(_) => unreachable!(),
                    }
                }
            }
        }
    }

    #[test]
    fn test_move_to_source_port_from_draft_reports_statuses() {
        let machine = BatchStateMachine::new();
        let mut batch = batch_in(BatchStatus::Draft, 0);
        let err = machine
            .apply(
                &mut batch,
                &BatchCommand::MoveToSourcePort {
                    source_port_id: 1,
                    destination_port_id: None,
                },
                now(),
            )
            .unwrap_err();

        assert_eq!(
            err,
            TransitionError::InvalidState {
                operation: BatchOperation::MoveToSourcePort,
                current: BatchStatus::Draft,
                required: vec![BatchStatus::InWarehouse],
                reason: None,
            }
        );
        let msg = err.to_string();
        assert!(msg.contains("DRAFT"));
        assert!(msg.contains("IN_WAREHOUSE"));
    }

    #[test]
    fn test_close_requires_members() {
        let machine = BatchStateMachine::new();
        let mut empty = batch_in(BatchStatus::Open, 0);
        let err = machine.apply(&mut empty, &BatchCommand::Close, now()).unwrap_err();
        match err {
            TransitionError::InvalidState { reason, current, .. } => {
                assert_eq!(current, BatchStatus::Open);
                assert!(reason.is_some());
            }
        }
        assert_eq!(empty.status, BatchStatus::Open);

        let mut loaded = batch_in(BatchStatus::Open, 1);
        let outcome = machine.apply(&mut loaded, &BatchCommand::Close, now()).unwrap();
        assert_eq!(outcome.to, BatchStatus::Closed);
        assert_eq!(loaded.status, BatchStatus::Closed);
    }

    #[test]
    fn test_full_pipeline_sets_fields() {
        let machine = BatchStateMachine::new();
        let mut batch = batch_in(BatchStatus::Draft, 1);
        let assigned_at = now();
        let steps = vec![
            BatchCommand::Open,
            BatchCommand::Close,
            BatchCommand::MoveToWarehouse { warehouse_id: 10 },
            BatchCommand::AssignDestinationWarehouse { warehouse_id: 11 },
            BatchCommand::MoveToSourcePort {
                source_port_id: 20,
                destination_port_id: Some(21),
            },
            BatchCommand::ClearSourcePort,
            BatchCommand::StartTransit,
            BatchCommand::MarkArrival,
            BatchCommand::MoveToDestinationWarehouse { warehouse_id: 12 },
            BatchCommand::AssignCarriers { assigned_at },
        ];
        for step in &steps {
            machine.apply(&mut batch, step, now()).unwrap();
        }

        assert_eq!(batch.status, BatchStatus::AssignedToCarriers);
        assert_eq!(batch.source_warehouse_id, Some(10));
        assert_eq!(batch.destination_warehouse_id, Some(12));
        assert_eq!(batch.source_port_id, Some(20));
        assert_eq!(batch.destination_port_id, Some(21));
        assert_eq!(batch.carrier_assigned_at, Some(assigned_at));
    }

    #[test]
    fn test_assign_destination_warehouse_keeps_status() {
        let machine = BatchStateMachine::new();
        let mut batch = batch_in(BatchStatus::AtSourcePort, 1);
        let outcome = machine
            .apply(
                &mut batch,
                &BatchCommand::AssignDestinationWarehouse { warehouse_id: 9 },
                now(),
            )
            .unwrap();
        assert!(!outcome.status_changed());
        assert_eq!(batch.status, BatchStatus::AtSourcePort);
        assert_eq!(batch.destination_warehouse_id, Some(9));
    }

    #[test]
    fn test_move_to_source_port_keeps_destination_when_absent() {
        let machine = BatchStateMachine::new();
        let mut batch = batch_in(BatchStatus::InWarehouse, 1);
        batch.destination_port_id = Some(99);
        machine
            .apply(
                &mut batch,
                &BatchCommand::MoveToSourcePort {
                    source_port_id: 7,
                    destination_port_id: None,
                },
                now(),
            )
            .unwrap();
        assert_eq!(batch.destination_port_id, Some(99));
        assert_eq!(batch.source_port_id, Some(7));
    }

    #[test]
    fn test_cancel_is_terminal() {
        let machine = BatchStateMachine::new();
        let mut batch = batch_in(BatchStatus::InTransit, 3);
        machine.apply(&mut batch, &BatchCommand::Cancel, now()).unwrap();
        assert_eq!(batch.status, BatchStatus::Cancelled);
        assert!(machine.apply(&mut batch, &BatchCommand::Cancel, now()).is_err());

        let mut delivered = batch_in(BatchStatus::Delivered, 3);
        assert!(machine.apply(&mut delivered, &BatchCommand::Cancel, now()).is_err());
    }

    #[test]
    fn test_delivery_outcome() {
        let machine = BatchStateMachine::new();

        let mut full = batch_in(BatchStatus::AssignedToCarriers, 3);
        let cmd = BatchCommand::CompleteDelivery {
            tally: DeliveryTally { active: 3, delivered: 3 },
        };
        assert_eq!(machine.apply(&mut full, &cmd, now()).unwrap().to, BatchStatus::Delivered);

        let mut partial = batch_in(BatchStatus::AssignedToCarriers, 3);
        let cmd = BatchCommand::CompleteDelivery {
            tally: DeliveryTally { active: 3, delivered: 1 },
        };
        assert_eq!(
            machine.apply(&mut partial, &cmd, now()).unwrap().to,
            BatchStatus::PartiallyDelivered
        );

        let mut none = batch_in(BatchStatus::AssignedToCarriers, 3);
        let cmd = BatchCommand::CompleteDelivery {
            tally: DeliveryTally { active: 3, delivered: 0 },
        };
        assert!(machine.apply(&mut none, &cmd, now()).is_err());
        assert_eq!(none.status, BatchStatus::AssignedToCarriers);
    }

    #[test]
    fn test_allowed_operations() {
        let machine = BatchStateMachine::new();
        let ops = machine.allowed_operations(BatchStatus::InWarehouse);
        assert!(ops.contains(&BatchOperation::MoveToSourcePort));
        assert!(ops.contains(&BatchOperation::AssignDestinationWarehouse));
        assert!(ops.contains(&BatchOperation::Cancel));
        assert!(!ops.contains(&BatchOperation::Close));

        assert_eq!(
            machine.allowed_operations(BatchStatus::Cancelled),
            vec![BatchOperation::Archive]
        );
    }
}
