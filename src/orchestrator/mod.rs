//! The generation workflow orchestrator.
//!
//! - `state`: `WorkflowState`, the snapshot published to callers, and `GenerateOutcome`.
//! - `workflow`: `Orchestrator`, which sequences the collaborators.
pub mod state;
pub mod workflow;


pub use state::{GenerateOutcome, Status, WorkflowSnapshot, WorkflowState};
pub use workflow::Orchestrator;
