//! The workflow engine: runs every step of a request in order, recording
//! each outcome on the run instead of aborting.
//!
//! Only sandbox acquisition is fatal. Everything after it is best-effort:
//! a failed clone still gets a branch attempt, a failed commit still gets
//! a PR attempt, and cleanup runs exactly once no matter what happened.

use std::future::Future;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use coder::CodeModifier;
use forge::{CreatePrRequest, ForgeApi, RepoConfig};
use forgeflow_core::{
    RunStatus, SeedFile, StepKind, StepResult, StepStatus, WorkflowReport, WorkflowRequest,
    WorkflowRun,
};
use sandbox::{SandboxGuard, SandboxProvider};
use validation::Validator;
use vcs::GitOps;

use crate::error::{OrchestratorError, Result};
use crate::state::WorkflowState;

pub struct Orchestrator {
    sandbox: Arc<dyn SandboxProvider>,
    git: Arc<dyn GitOps>,
    forge: Option<Arc<dyn ForgeApi>>,
    coder: Option<Arc<dyn CodeModifier>>,
    validator: Option<Arc<dyn Validator>>,
    step_timeout: Option<Duration>,
}

impl Orchestrator {
    pub fn new(sandbox: Arc<dyn SandboxProvider>, git: Arc<dyn GitOps>) -> Self {
        Self {
            sandbox,
            git,
            forge: None,
            coder: None,
            validator: None,
            step_timeout: None,
        }
    }

    pub fn with_forge(mut self, forge: Arc<dyn ForgeApi>) -> Self {
        self.forge = Some(forge);
        self
    }

    pub fn with_coder(mut self, coder: Arc<dyn CodeModifier>) -> Self {
        self.coder = Some(coder);
        self
    }

    pub fn with_validator(mut self, validator: Arc<dyn Validator>) -> Self {
        self.validator = Some(validator);
        self
    }

    pub fn with_step_timeout(mut self, limit: Duration) -> Self {
        self.step_timeout = Some(limit);
        self
    }

    /// Run one workflow end to end. Step failures are recorded on the
    /// report; an `Err` here means the request itself was unusable.
    pub async fn run(&self, request: WorkflowRequest) -> Result<WorkflowReport> {
        if request.repo_url.trim().is_empty() {
            return Err(OrchestratorError::InvalidRequest(
                "repo_url is empty".to_string(),
            ));
        }
        if request.commit_message.trim().is_empty() {
            return Err(OrchestratorError::InvalidRequest(
                "commit_message is empty".to_string(),
            ));
        }

        let mut run = WorkflowRun::new();
        run.status = RunStatus::Running;
        let mut state = WorkflowState::Init;
        info!("Starting workflow run {}", run.id);

        let acquired = match &request.workdir {
            Some(dir) => self
                .bounded(self.sandbox.adopt(dir))
                .await
                .map(|path| (path, false)),
            None => self
                .bounded(self.sandbox.acquire(None))
                .await
                .map(|path| (path, true)),
        };

        let mut guard = match acquired {
            Ok((path, owned)) => {
                run.sandbox_path = Some(path.clone());
                run.record(StepResult::success_with(
                    StepKind::CreateSandbox,
                    path.to_string_lossy(),
                ));
                self.advance(&mut state, WorkflowState::SandboxReady);
                if owned {
                    SandboxGuard::owned(path, Arc::clone(&self.sandbox))
                } else {
                    SandboxGuard::external(path, Arc::clone(&self.sandbox))
                }
            }
            Err(e) => {
                error!("Sandbox acquisition failed, aborting run: {}", e);
                run.record(StepResult::failure(StepKind::CreateSandbox, e));
                run.record(StepResult::skipped(StepKind::CleanupSandbox));
                run.finish(RunStatus::Failed);
                self.advance(&mut state, WorkflowState::Terminal(RunStatus::Failed));
                return Ok(report_for(run));
            }
        };

        let workdir = guard.path().to_path_buf();
        let branch = request.branch_for(&run.id);

        self.clone_step(&mut run, &request, &workdir).await;
        self.advance(&mut state, WorkflowState::Cloned);

        self.branch_step(&mut run, &branch, &workdir).await;
        self.advance(&mut state, WorkflowState::Branched);

        if self.modify_step(&mut run, &request, &workdir).await {
            self.advance(&mut state, WorkflowState::CodeModified);
        }

        self.commit_step(&mut run, &request, &branch, &workdir).await;
        self.advance(&mut state, WorkflowState::Committed);

        if self.pr_step(&mut run, &request, &branch).await {
            self.advance(&mut state, WorkflowState::PrCreated);
        }

        if self.validation_step(&mut run, &request, &workdir).await {
            self.advance(&mut state, WorkflowState::Validated);
        }

        match guard.release().await {
            Ok(()) => run.record(StepResult::success(StepKind::CleanupSandbox)),
            Err(e) => {
                warn!("Sandbox cleanup failed: {}", e);
                run.record(StepResult::failure(StepKind::CleanupSandbox, e.to_string()));
            }
        }
        self.advance(&mut state, WorkflowState::CleanedUp);

        let status = if run.mandatory_steps_ok() {
            RunStatus::Succeeded
        } else {
            RunStatus::PartialFailure
        };
        run.finish(status);
        self.advance(&mut state, WorkflowState::Terminal(status));
        info!("Workflow run {} finished: {}", run.id, status.as_str());

        Ok(report_for(run))
    }

    async fn clone_step(&self, run: &mut WorkflowRun, request: &WorkflowRequest, workdir: &Path) {
        match self
            .bounded(self.git.clone_repo(
                &request.repo_url,
                workdir,
                request.clone_branch.as_deref(),
            ))
            .await
        {
            Ok(()) => run.record(StepResult::success(StepKind::CloneRepo)),
            Err(e) => {
                warn!("Clone failed: {}", e);
                run.record(StepResult::failure(StepKind::CloneRepo, e));
            }
        }

        // Identity config is best-effort; a failure here surfaces later as
        // a commit error if it actually matters.
        if !request.git_config.is_empty() {
            let entries: Vec<(String, String)> = request
                .git_config
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect();
            if let Err(e) = self.git.configure(workdir, &entries).await {
                warn!("Applying git config failed: {}", e);
            }
        }
    }

    async fn branch_step(&self, run: &mut WorkflowRun, branch: &str, workdir: &Path) {
        match self
            .bounded(self.git.create_branch(branch, None, workdir))
            .await
        {
            Ok(()) => run.record(StepResult::success_with(StepKind::CreateBranch, branch)),
            Err(e) => {
                warn!("Branch creation failed: {}", e);
                run.record(StepResult::failure(StepKind::CreateBranch, e));
            }
        }
    }

    /// Returns true when the step was attempted (not skipped).
    async fn modify_step(
        &self,
        run: &mut WorkflowRun,
        request: &WorkflowRequest,
        workdir: &Path,
    ) -> bool {
        let instruction = match &request.change_instruction {
            Some(instruction) => instruction,
            None => {
                run.record(StepResult::skipped(StepKind::ModifyCode));
                return false;
            }
        };

        let result = match &self.coder {
            Some(coder) => match self.bounded(coder.modify(workdir, instruction)).await {
                Ok(report) if report.success => {
                    Ok(format!("{} files changed", report.files_changed))
                }
                Ok(report) => {
                    let failed = report.outcomes.iter().filter(|o| !o.success).count();
                    Err(if report.outcomes.is_empty() {
                        report.summary
                    } else {
                        format!("{} of {} files failed", failed, report.outcomes.len())
                    })
                }
                Err(e) => Err(e),
            },
            None => Err("No code modifier configured".to_string()),
        };

        match result {
            Ok(detail) => run.record(StepResult::success_with(StepKind::ModifyCode, detail)),
            Err(e) => {
                warn!("Code modification failed: {}", e);
                run.record(StepResult::failure(StepKind::ModifyCode, e));
            }
        }
        true
    }

    async fn commit_step(
        &self,
        run: &mut WorkflowRun,
        request: &WorkflowRequest,
        branch: &str,
        workdir: &Path,
    ) {
        let result = async {
            if request.change_instruction.is_none() {
                if let Some(seed) = &request.seed_file {
                    write_seed_file(workdir, seed).await?;
                }
            }
            self.bounded(self.git.stage_all(workdir)).await?;
            let hash = self
                .bounded(self.git.commit(&request.commit_message, workdir))
                .await?;
            self.bounded(self.git.push(branch, None, workdir)).await?;
            Ok::<String, String>(hash)
        }
        .await;

        match result {
            Ok(hash) => run.record(StepResult::success_with(StepKind::CommitChanges, hash)),
            Err(e) => {
                warn!("Commit failed: {}", e);
                run.record(StepResult::failure(StepKind::CommitChanges, e));
            }
        }
    }

    async fn pr_step(&self, run: &mut WorkflowRun, request: &WorkflowRequest, branch: &str) -> bool {
        let full_name = match &request.repo_full_name {
            Some(full_name) => full_name,
            None => {
                run.record(StepResult::skipped(StepKind::CreatePullRequest));
                return false;
            }
        };

        let title = if request.pr_title.is_empty() {
            request.commit_message.clone()
        } else {
            request.pr_title.clone()
        };

        let result = match &self.forge {
            Some(forge) => match RepoConfig::from_full_name(full_name) {
                Ok(repo) => {
                    let mut pr_request = CreatePrRequest::new(title, branch, &request.base_branch)
                        .with_body(request.pr_body.clone());
                    if request.draft_pr {
                        pr_request = pr_request.as_draft();
                    }
                    self.bounded(forge.create_pull_request(&repo, pr_request))
                        .await
                        .map(|pr| pr.html_url)
                }
                Err(e) => Err(e.to_string()),
            },
            None => Err("No forge client configured".to_string()),
        };

        match result {
            Ok(url) => {
                info!("Pull request created: {}", url);
                run.record(StepResult::success_with(StepKind::CreatePullRequest, url));
            }
            Err(e) => {
                warn!("Pull request creation failed: {}", e);
                run.record(StepResult::failure(StepKind::CreatePullRequest, e));
            }
        }
        true
    }

    async fn validation_step(
        &self,
        run: &mut WorkflowRun,
        request: &WorkflowRequest,
        workdir: &Path,
    ) -> bool {
        if !request.run_validation {
            run.record(StepResult::skipped(StepKind::RunValidation));
            return false;
        }

        let result = match &self.validator {
            Some(validator) => match self.bounded(validator.validate(workdir)).await {
                Ok(report) => {
                    let passed = report.checks.iter().filter(|c| c.success).count();
                    let detail = format!("{}/{} checks passed", passed, report.checks.len());
                    if report.overall_success {
                        Ok(detail)
                    } else {
                        Err(detail)
                    }
                }
                Err(e) => Err(e),
            },
            None => Err("No validator configured".to_string()),
        };

        match result {
            Ok(detail) => run.record(StepResult::success_with(StepKind::RunValidation, detail)),
            Err(e) => {
                warn!("Validation failed: {}", e);
                run.record(StepResult::failure(StepKind::RunValidation, e));
            }
        }
        true
    }

    fn advance(&self, state: &mut WorkflowState, next: WorkflowState) {
        debug_assert!(state.can_advance_to(next), "{:?} -> {:?}", state, next);
        debug!("Workflow state: {} -> {}", state.as_str(), next.as_str());
        *state = next;
    }

    /// Run a component call under the configured step timeout, flattening
    /// its error into the step's failure message.
    async fn bounded<T, E, F>(&self, fut: F) -> std::result::Result<T, String>
    where
        F: Future<Output = std::result::Result<T, E>>,
        E: std::fmt::Display,
    {
        match self.step_timeout {
            Some(limit) => match timeout(limit, fut).await {
                Ok(result) => result.map_err(|e| e.to_string()),
                Err(_) => Err(format!("Timed out after {:.1}s", limit.as_secs_f64())),
            },
            None => fut.await.map_err(|e| e.to_string()),
        }
    }
}

async fn write_seed_file(workdir: &Path, seed: &SeedFile) -> std::result::Result<(), String> {
    let relative = PathBuf::from(&seed.path);
    let safe = !relative.as_os_str().is_empty()
        && relative.components().all(|c| matches!(c, Component::Normal(_)));
    if !safe {
        return Err(format!("Seed file path escapes working tree: {}", seed.path));
    }

    let target = workdir.join(relative);
    if let Some(parent) = target.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| e.to_string())?;
    }
    tokio::fs::write(&target, &seed.content)
        .await
        .map_err(|e| e.to_string())
}

fn report_for(run: WorkflowRun) -> WorkflowReport {
    let commit = run
        .step(StepKind::CommitChanges)
        .and_then(|s| s.detail.clone());
    let pr_url = run
        .step(StepKind::CreatePullRequest)
        .and_then(|s| s.detail.clone());
    let error = run
        .steps
        .iter()
        .find(|s| s.status == StepStatus::Failure)
        .and_then(|s| s.error.clone());

    WorkflowReport {
        run_id: run.id.clone(),
        status: run.status,
        success: run.status == RunStatus::Succeeded,
        steps: run.steps,
        commit,
        pr_url,
        error,
    }
}
