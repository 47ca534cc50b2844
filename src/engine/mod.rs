// ==========================================
// 物流批次跟踪系统 - 引擎层
// ==========================================
// 职责: 批次生命周期业务规则
// 红线: 纯内存计算，不访问数据库
// ==========================================

pub mod batch_state_machine;
pub mod carrier_assignment;
pub mod membership;
pub mod shipment_status;

pub use batch_state_machine::{
    BatchCommand, BatchOperation, BatchStateMachine, DeliveryTally, TransitionError,
    TransitionOutcome, TransitionRule, TransitionTarget, TRANSITION_TABLE,
};
pub use carrier_assignment::{AssignmentError, CarrierAssignment, CarrierAssignmentPlanner};
pub use membership::{AggregateDrift, BatchAggregate, MembershipError};
pub use shipment_status::ShipmentStatusProjector;
