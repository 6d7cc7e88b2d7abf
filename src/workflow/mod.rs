// Approval workflow: edge table, per-record state machine, kanban board

pub mod board;
pub mod edges;
pub mod machine;

pub use board::{ApprovalBoard, BoardColumn};
pub use edges::Workflow;
pub use machine::{
    plan, restore_target, ApprovalEffect, ApprovalEvent, ApprovalMachine, ApprovalState,
    Transition, TransitionRecord,
};
