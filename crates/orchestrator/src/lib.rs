pub mod engine;
pub mod error;
pub mod state;

pub use engine::Orchestrator;
pub use error::{OrchestratorError, Result};
pub use state::WorkflowState;
