use clap::Parser;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use crate::ai::http_client::build_client;
use crate::ai::{AccessTokenSource, ConfigTokenSource, HttpOrganizeApi, StaticToken};
use crate::config::{user_folders, AppConfig};
use crate::history::ActionLogBatch;
use crate::models::{OrganizeOptions, OrganizeResult};
use crate::organize::{ExecutionSummary, OrganizeDeps, OrganizeOrchestrator, OrganizeProgress};
use crate::services::LocalFileOps;

/// Group the files of a folder into suggested sub-folders and optionally move them.
///
/// Without `--apply` only the proposed grouping is printed.
#[derive(Parser, Debug)]
#[command(name = "auto-organize", author, version, about, long_about = None)]
pub struct Cli {
    /// Folder to organize. `desktop`, `documents`, `downloads` and `home` are
    /// resolved to the user's folders.
    pub folder: String,

    /// Send the folder's existing sub-folders as naming hints
    #[arg(long)]
    pub existing_folders: bool,

    /// Read file contents and send text previews with the analysis
    #[arg(long)]
    pub extract_content: bool,

    /// Let the language model name the clusters
    #[arg(long)]
    pub gemini_naming: bool,

    /// Let the language model do the whole grouping
    #[arg(long)]
    pub gemini_full: bool,

    /// Extra instructions for the grouping
    #[arg(long, value_name = "TEXT")]
    pub prompt: Option<String>,

    /// Move the files after printing the preview
    #[arg(long)]
    pub apply: bool,

    /// Ask for reusable sorting rules after the moves
    #[arg(long, requires = "apply")]
    pub rules: bool,

    /// Organize service URL, overrides the config file
    #[arg(long, value_name = "URL")]
    pub api_url: Option<String>,

    /// Bearer token, overrides the config file
    #[arg(long, value_name = "TOKEN")]
    pub token: Option<String>,
}

impl Cli {
    pub fn options(&self) -> OrganizeOptions {
        OrganizeOptions {
            use_gemini_naming: self.gemini_naming,
            use_gemini_full: self.gemini_full,
            use_existing_folders: self.existing_folders,
            use_content_extraction: self.extract_content,
            custom_prompt: self.prompt.clone().unwrap_or_default(),
        }
    }

    /// Folder argument with the user-folder shortcuts applied
    pub fn resolve_folder(&self) -> PathBuf {
        let folders = user_folders();
        let shortcut = match self.folder.to_lowercase().as_str() {
            "desktop" => folders.desktop,
            "documents" => folders.documents,
            "downloads" => folders.downloads,
            "home" => folders.home,
            _ => None,
        };
        // an actual sub-folder with that name wins over the shortcut
        let literal = PathBuf::from(&self.folder);
        match shortcut {
            Some(path) if !literal.exists() => PathBuf::from(path),
            _ => literal,
        }
    }
}

fn load_config(cli: &Cli) -> AppConfig {
    let mut config = AppConfig::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Could not load config, using defaults");
        let mut config = AppConfig::default();
        config.apply_env();
        config
    });
    if let Some(url) = &cli.api_url {
        config.api_url = url.clone();
    }
    config
}

/// Run one organize session from the command line
pub async fn run_cli(cli: Cli) -> Result<(), String> {
    let config = load_config(&cli);
    let limits = config.limits.clone();

    let api = HttpOrganizeApi::with_client(build_client(limits.request_timeout()), config.api_base());
    let tokens: Arc<dyn AccessTokenSource> = match &cli.token {
        Some(token) => Arc::new(StaticToken(Some(token.clone()))),
        None => Arc::new(ConfigTokenSource::new(Arc::new(RwLock::new(config)))),
    };

    let orchestrator = OrganizeOrchestrator::new(
        OrganizeDeps {
            files: Arc::new(LocalFileOps::new()),
            tokens,
            api: Arc::new(api),
        },
        limits,
    )
    .with_progress(Arc::new(|progress: &OrganizeProgress| {
        eprintln!("[{}] {}", progress.step, progress.message);
    }));

    let folder = cli.resolve_folder();
    let result = orchestrator.start(&folder, cli.options()).await?;

    let unassigned: Vec<String> = orchestrator
        .snapshot()
        .unassigned_files()
        .iter()
        .map(|f| f.filename.clone())
        .collect();
    print_preview(&result, &unassigned);

    if !cli.apply {
        println!("\nNothing moved. Run again with --apply to move the files.");
        orchestrator.cancel();
        return Ok(());
    }

    apply_plan(&orchestrator, cli.rules).await
}

/// Move the previewed plan and close the session.
///
/// History calls are joined and the session is finished even when the
/// rule suggestion step fails; its error is returned afterwards.
async fn apply_plan(orchestrator: &OrganizeOrchestrator, rules: bool) -> Result<(), String> {
    let summary = orchestrator.execute().await?;

    // let history calls finish before the runtime shuts down
    if let Some(history) = print_summary(summary) {
        let logged = history.wait().await;
        tracing::debug!(logged = logged.logged, failed = logged.failed, "Move history recorded");
    }

    let suggested = if rules {
        suggest_rules(orchestrator).await
    } else {
        Ok(())
    };

    orchestrator.finish()?;
    suggested
}

async fn suggest_rules(orchestrator: &OrganizeOrchestrator) -> Result<(), String> {
    let rules = orchestrator.generate_rules().await?;
    if rules.is_empty() {
        println!("\n{}", orchestrator.status());
        return Ok(());
    }

    println!("\nSuggested rules:");
    for rule in &rules {
        println!(
            "  [{}] {} -> {} ({:.0}%) {}",
            rule.rule_type,
            rule.pattern,
            rule.target_folder,
            rule.confidence * 100.0,
            rule.description
        );
    }
    orchestrator.confirm_rules();
    Ok(())
}

fn print_preview(result: &OrganizeResult, unassigned: &[String]) {
    println!("Proposed folders ({}):", result.folders.len());
    for folder in &result.folders {
        let confidence = folder
            .confidence
            .map(|c| format!(", {:.0}%", c * 100.0))
            .unwrap_or_default();
        println!("\n{}/ ({} files{})", folder.destination(), folder.files.len(), confidence);
        if !folder.reason.is_empty() {
            println!("  {}", folder.reason);
        }
        for file in &folder.files {
            println!("  - {}", file);
        }
    }

    if !unassigned.is_empty() {
        println!("\nLeft in place ({}):", unassigned.len());
        for file in unassigned {
            println!("  - {}", file);
        }
    }
}

fn print_summary(summary: ExecutionSummary) -> Option<ActionLogBatch> {
    println!("\n{}", summary.status);
    for error in &summary.result.errors {
        println!("  ! {}", error);
    }
    summary.history
}
