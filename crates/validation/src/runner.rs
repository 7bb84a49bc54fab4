//! Runs the configured checks against a working tree.
//!
//! Every check runs regardless of earlier results; a check that cannot be
//! spawned is recorded as that check's failure rather than an error.

use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::config::{CommandSpec, ValidatorConfig};
use crate::error::{Result, ValidationError};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckOutcome {
    pub name: String,
    pub success: bool,
    pub output: String,
    pub error: String,
    pub command: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    pub checks: Vec<CheckOutcome>,
    pub overall_success: bool,
}

impl ValidationReport {
    fn from_checks(checks: Vec<CheckOutcome>) -> Self {
        let overall_success = checks.iter().all(|c| c.success);
        Self {
            checks,
            overall_success,
        }
    }
}

#[async_trait]
pub trait Validator: Send + Sync {
    async fn validate(&self, workdir: &Path) -> Result<ValidationReport>;
}

pub struct CommandValidator {
    config: ValidatorConfig,
}

impl CommandValidator {
    pub fn new(config: ValidatorConfig) -> Self {
        Self { config }
    }

    async fn run_check(spec: &CommandSpec, workdir: &Path) -> CheckOutcome {
        debug!("Running check '{}': {}", spec.name, spec.command_line());

        let output = Command::new(&spec.program)
            .args(&spec.args)
            .current_dir(workdir)
            .output()
            .await;

        match output {
            Ok(output) => {
                let success = output.status.success();
                if !success {
                    warn!("Check '{}' failed ({})", spec.name, output.status);
                }
                CheckOutcome {
                    name: spec.name.clone(),
                    success,
                    output: String::from_utf8_lossy(&output.stdout).into_owned(),
                    error: String::from_utf8_lossy(&output.stderr).into_owned(),
                    command: spec.command_line(),
                }
            }
            Err(e) => {
                warn!("Check '{}' could not be started: {}", spec.name, e);
                CheckOutcome {
                    name: spec.name.clone(),
                    success: false,
                    output: String::new(),
                    error: format!("Failed to start command: {e}"),
                    command: spec.command_line(),
                }
            }
        }
    }
}

#[async_trait]
impl Validator for CommandValidator {
    async fn validate(&self, workdir: &Path) -> Result<ValidationReport> {
        if !workdir.is_dir() {
            return Err(ValidationError::WorkspaceMissing(workdir.to_path_buf()));
        }

        let mut checks = Vec::new();
        for spec in self.config.checks() {
            checks.push(Self::run_check(spec, workdir).await);
        }

        let report = ValidationReport::from_checks(checks);
        info!(
            "Validation finished: {}/{} checks passed",
            report.checks.iter().filter(|c| c.success).count(),
            report.checks.len()
        );
        Ok(report)
    }
}
