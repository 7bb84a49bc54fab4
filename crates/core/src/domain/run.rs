use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// Opaque identifier for one workflow run: `<yyyymmdd_HHMMSS>_<8 hex chars>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(String);

impl RunId {
    pub fn generate() -> Self {
        let suffix = Uuid::new_v4().simple().to_string();
        let timestamp = Utc::now().format("%Y%m%d_%H%M%S");
        Self(format!("{}_{}", timestamp, &suffix[..8]))
    }

    /// The random tail of the id, used to derive branch and file names.
    pub fn short(&self) -> &str {
        self.0.rsplit('_').next().unwrap_or(&self.0)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    #[default]
    Pending,
    Running,
    Succeeded,
    Failed,
    /// Terminal state for runs where at least one mandatory step failed but
    /// the workflow still ran to cleanup.
    PartialFailure,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::PartialFailure => "partial_failure",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "running" => Some(Self::Running),
            "succeeded" => Some(Self::Succeeded),
            "failed" => Some(Self::Failed),
            "partial_failure" => Some(Self::PartialFailure),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::PartialFailure)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Success,
    Failure,
    Skipped,
}

impl StepStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failure => "failure",
            Self::Skipped => "skipped",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    CreateSandbox,
    CloneRepo,
    CreateBranch,
    ModifyCode,
    CommitChanges,
    CreatePullRequest,
    RunValidation,
    CleanupSandbox,
}

impl StepKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CreateSandbox => "create_sandbox",
            Self::CloneRepo => "clone_repo",
            Self::CreateBranch => "create_branch",
            Self::ModifyCode => "modify_code",
            Self::CommitChanges => "commit_changes",
            Self::CreatePullRequest => "create_pull_request",
            Self::RunValidation => "run_validation",
            Self::CleanupSandbox => "cleanup_sandbox",
        }
    }

    /// Steps whose failure downgrades the run to `PartialFailure`.
    pub fn is_mandatory(&self) -> bool {
        matches!(self, Self::CloneRepo | Self::CreateBranch | Self::CommitChanges)
    }
}

/// Outcome of one workflow step. Immutable once appended to a run;
/// list order is execution order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResult {
    pub step: StepKind,
    pub status: StepStatus,
    /// Error text for failed steps.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Step payload: commit hash, PR URL, sandbox path.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

impl StepResult {
    pub fn success(step: StepKind) -> Self {
        Self {
            step,
            status: StepStatus::Success,
            error: None,
            detail: None,
            recorded_at: Utc::now(),
        }
    }

    pub fn success_with(step: StepKind, detail: impl Into<String>) -> Self {
        Self {
            detail: Some(detail.into()),
            ..Self::success(step)
        }
    }

    pub fn failure(step: StepKind, error: impl Into<String>) -> Self {
        Self {
            step,
            status: StepStatus::Failure,
            error: Some(error.into()),
            detail: None,
            recorded_at: Utc::now(),
        }
    }

    pub fn skipped(step: StepKind) -> Self {
        Self {
            step,
            status: StepStatus::Skipped,
            error: None,
            detail: None,
            recorded_at: Utc::now(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == StepStatus::Success
    }
}

/// Run-scoped state owned by the orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowRun {
    pub id: RunId,
    pub status: RunStatus,
    pub steps: Vec<StepResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sandbox_path: Option<PathBuf>,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl WorkflowRun {
    pub fn new() -> Self {
        Self {
            id: RunId::generate(),
            status: RunStatus::Pending,
            steps: Vec::new(),
            sandbox_path: None,
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    pub fn record(&mut self, result: StepResult) {
        self.steps.push(result);
    }

    pub fn step(&self, kind: StepKind) -> Option<&StepResult> {
        self.steps.iter().find(|s| s.step == kind)
    }

    /// True when every mandatory step that was attempted succeeded.
    /// Skipped steps do not count against the run.
    pub fn mandatory_steps_ok(&self) -> bool {
        self.steps
            .iter()
            .filter(|s| s.step.is_mandatory())
            .all(|s| s.status != StepStatus::Failure)
    }

    pub fn finish(&mut self, status: RunStatus) {
        self.status = status;
        self.finished_at = Some(Utc::now());
    }
}

impl Default for WorkflowRun {
    fn default() -> Self {
        Self::new()
    }
}
