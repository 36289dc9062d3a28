pub mod coordinator;
pub mod orchestrator;

pub use coordinator::{ActionOutcome, ActionState, ExecutionCoordinator, ExecutionReport};
pub use orchestrator::{CycleError, CycleReport, MirrorOrchestrator};
