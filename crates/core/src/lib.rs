pub mod domain;

pub use domain::run::{RunId, RunStatus, StepKind, StepResult, StepStatus, WorkflowRun};
pub use domain::workflow::{
    GitConfig, SeedFile, WorkflowReport, WorkflowRequest, DEFAULT_BASE_BRANCH,
};
