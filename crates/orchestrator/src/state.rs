use forgeflow_core::RunStatus;

/// Position of a run in the workflow. Progression is linear; optional
/// stages are passed through even when their step was skipped or failed,
/// so the state always reflects how far the machine has advanced, not
/// whether the steps succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowState {
    Init,
    SandboxReady,
    Cloned,
    Branched,
    CodeModified,
    Committed,
    PrCreated,
    Validated,
    CleanedUp,
    Terminal(RunStatus),
}

impl WorkflowState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::SandboxReady => "sandbox_ready",
            Self::Cloned => "cloned",
            Self::Branched => "branched",
            Self::CodeModified => "code_modified",
            Self::Committed => "committed",
            Self::PrCreated => "pr_created",
            Self::Validated => "validated",
            Self::CleanedUp => "cleaned_up",
            Self::Terminal(_) => "terminal",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Terminal(_))
    }

    /// Whether `next` is a legal successor of `self`.
    pub fn can_advance_to(&self, next: WorkflowState) -> bool {
        use WorkflowState::*;
        match (self, next) {
            (Init, SandboxReady) => true,
            (Init, Terminal(RunStatus::Failed)) => true,
            (SandboxReady, Cloned) => true,
            (Cloned, Branched) => true,
            (Branched, CodeModified) | (Branched, Committed) => true,
            (CodeModified, Committed) => true,
            (Committed, PrCreated) | (Committed, Validated) | (Committed, CleanedUp) => true,
            (PrCreated, Validated) | (PrCreated, CleanedUp) => true,
            (Validated, CleanedUp) => true,
            (CleanedUp, Terminal(status)) => status.is_terminal(),
            _ => false,
        }
    }
}
