use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use coder::{CodeModTool, CodeModifier, CollectLimits, OpenAiClient};
use forge::{ForgeClient, RepoConfig};
use forgeflow_core::{SeedFile, WorkflowRequest};
use orchestrator::Orchestrator;
use sandbox::SandboxManager;
use validation::{CommandValidator, Validator};
use vcs::{GitCli, GitOps};

mod config;

use config::{require_env_secret, FlowConfig, GITHUB_TOKEN_VAR, OPENAI_API_KEY_VAR};

#[derive(Parser)]
#[command(name = "forgeflow")]
#[command(about = "Sandboxed Git workflow runner", long_about = None)]
#[command(version)]
struct Cli {
    /// Config file path; defaults to ./forgeflow.toml when present.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a workflow: sandbox, clone, branch, change, commit, push, PR.
    Run {
        /// URL of the repository to clone.
        #[arg(long)]
        repo_url: String,

        /// Clone into this existing directory instead of a managed
        /// sandbox; it is left in place afterwards.
        #[arg(long)]
        workdir: Option<PathBuf>,

        /// Branch to check out after cloning.
        #[arg(long)]
        clone_branch: Option<String>,

        /// Branch to create; derived from the run id when omitted.
        #[arg(long)]
        branch: Option<String>,

        /// Branch the pull request targets.
        #[arg(long, default_value = "main")]
        base_branch: String,

        /// Commit message.
        #[arg(short, long)]
        message: String,

        /// Natural-language change instruction for the completion API.
        #[arg(long)]
        instruction: Option<String>,

        /// `owner/repo` on the forge; enables pull-request creation.
        #[arg(long)]
        repo: Option<String>,

        /// Open a pull request, deriving `owner/repo` from the clone URL
        /// when --repo is omitted.
        #[arg(long)]
        pr: bool,

        #[arg(long)]
        pr_title: Option<String>,

        #[arg(long)]
        pr_body: Option<String>,

        /// Open the pull request as a draft.
        #[arg(long)]
        draft: bool,

        /// Run the configured validation checks after the change.
        #[arg(long)]
        validate: bool,

        /// File committed when no instruction is given.
        #[arg(long)]
        seed_path: Option<String>,

        #[arg(long, default_value = "")]
        seed_content: String,

        /// Per-step timeout in seconds.
        #[arg(long)]
        step_timeout: Option<u64>,
    },
    /// Apply a change instruction to an existing directory.
    Modify {
        #[arg(long, default_value = ".")]
        dir: PathBuf,

        #[arg(long)]
        instruction: String,
    },
    /// Run the configured validation checks in a directory.
    Validate {
        #[arg(long, default_value = ".")]
        dir: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = FlowConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Run {
            repo_url,
            workdir,
            clone_branch,
            branch,
            base_branch,
            message,
            instruction,
            repo,
            pr,
            pr_title,
            pr_body,
            draft,
            validate,
            seed_path,
            seed_content,
            step_timeout,
        } => {
            let mut request = WorkflowRequest::new(repo_url, message);
            request.workdir = workdir;
            request.clone_branch = clone_branch;
            request.branch_name = branch;
            request.base_branch = base_branch;
            request.git_config = config.git_config();
            request.change_instruction = instruction;
            request.seed_file = seed_path.map(|path| SeedFile {
                path,
                content: seed_content,
            });
            request.repo_full_name = match repo {
                Some(repo) => Some(repo),
                None if pr => Some(RepoConfig::from_git_url(&request.repo_url)?.full_name()),
                None => None,
            };
            request.pr_title = pr_title.unwrap_or_default();
            request.pr_body = pr_body.unwrap_or_default();
            request.draft_pr = draft;
            request.run_validation = validate;

            run_workflow(&config, request, step_timeout).await
        }
        Commands::Modify { dir, instruction } => modify(&config, &dir, &instruction).await,
        Commands::Validate { dir } => validate_dir(&config, &dir).await,
    }
}

async fn run_workflow(
    config: &FlowConfig,
    request: WorkflowRequest,
    step_timeout: Option<u64>,
) -> Result<()> {
    let git = GitCli::new();
    if !git.is_available().await {
        anyhow::bail!("git is not installed or not on PATH");
    }

    let provider = Arc::new(SandboxManager::new(config.sandbox.root.clone()));
    let mut orchestrator = Orchestrator::new(provider, Arc::new(git));

    if request.wants_pull_request() {
        let token = require_env_secret(GITHUB_TOKEN_VAR)?;
        let client = match &config.forge.base_url {
            Some(base_url) => ForgeClient::with_base_url(token, base_url),
            None => ForgeClient::new(token),
        };
        orchestrator = orchestrator.with_forge(Arc::new(client));
    }

    if request.change_instruction.is_some() {
        orchestrator = orchestrator.with_coder(Arc::new(build_coder(config)?));
    }

    if request.run_validation {
        let validator = CommandValidator::new(config.validation.clone());
        orchestrator = orchestrator.with_validator(Arc::new(validator));
    }

    if let Some(secs) = step_timeout {
        orchestrator = orchestrator.with_step_timeout(Duration::from_secs(secs));
    }

    let report = orchestrator.run(request).await?;
    println!("{}", serde_json::to_string_pretty(&report)?);

    if !report.success {
        std::process::exit(1);
    }
    Ok(())
}

async fn modify(config: &FlowConfig, dir: &PathBuf, instruction: &str) -> Result<()> {
    let tool = build_coder(config)?;
    let report = tool.modify(dir, instruction).await?;
    println!("{}", serde_json::to_string_pretty(&report)?);

    if !report.success {
        std::process::exit(1);
    }
    Ok(())
}

async fn validate_dir(config: &FlowConfig, dir: &PathBuf) -> Result<()> {
    let validator = CommandValidator::new(config.validation.clone());
    let report = validator.validate(dir).await?;
    println!("{}", serde_json::to_string_pretty(&report)?);

    if !report.overall_success {
        std::process::exit(1);
    }
    Ok(())
}

fn build_coder(config: &FlowConfig) -> Result<CodeModTool> {
    let api_key = require_env_secret(OPENAI_API_KEY_VAR)?;
    let mut client = match &config.coder.base_url {
        Some(base_url) => OpenAiClient::with_base_url(api_key, base_url),
        None => OpenAiClient::new(api_key),
    };
    if let Some(model) = &config.coder.model {
        client = client.with_model(model);
    }

    let defaults = CollectLimits::default();
    let limits = CollectLimits {
        max_files: config.coder.max_files.unwrap_or(defaults.max_files),
        max_total_lines: config
            .coder
            .max_total_lines
            .unwrap_or(defaults.max_total_lines),
    };

    Ok(CodeModTool::new(Arc::new(client)).with_limits(limits))
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "forgeflow=info,orchestrator=info,sandbox=info,vcs=info,forge=info,coder=info,validation=info"
                    .into()
            }),
        )
        .init();
}
