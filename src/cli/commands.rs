//! CLI command implementations.
//!
//! Contains the business logic for each CLI command.

use std::io::Write as IoWrite;
use std::path::{Path, PathBuf};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::agent::{
    AgentConfig, PromptSet, ProviderKind, ReportGenerator, ReportPipeline, Subject,
    create_provider,
};
use crate::cli::output::{OutputFormat, format_report, format_startups, format_status};
use crate::cli::parser::{Cli, Commands, StartupCommands};
use crate::core::{ReportAction, ReportKind, ReportRequest, Startup};
use crate::error::{CommandError, Result, StorageError};
use crate::relay::StreamEvent;
use crate::server::{AppState, serve};
use crate::storage::{SqliteStorage, Storage, shared};

/// Events buffered between a streaming generation and stdout.
const STREAM_BUFFER: usize = 64;

/// Arguments of `dealroom report`.
#[derive(Debug, Clone, Default)]
pub struct ReportParams<'a> {
    /// Report kind name.
    pub kind: &'a str,
    /// Startup id.
    pub subject_id: &'a str,
    /// Startup name.
    pub name: Option<&'a str>,
    /// Startup description.
    pub description: Option<&'a str>,
    /// Sector or category.
    pub category: Option<&'a str>,
    /// Flow action name.
    pub action: Option<&'a str>,
    /// Print stream frames instead of the final result.
    pub stream: bool,
    /// Disable model calls.
    pub offline: bool,
    /// System prompt overrides.
    pub prompt_dir: Option<&'a Path>,
}

/// Executes the CLI command.
///
/// # Arguments
///
/// * `cli` - Parsed CLI arguments.
///
/// # Returns
///
/// Result with output string on success.
///
/// # Errors
///
/// Returns an error if the command fails to execute.
pub fn execute(cli: &Cli) -> Result<String> {
    let format = OutputFormat::parse(&cli.format);
    let db_path = cli.get_db_path();

    match &cli.command {
        Commands::Init { force } => cmd_init(&db_path, *force, format),
        Commands::Status => cmd_status(&db_path, format),
        Commands::Serve {
            host,
            port,
            offline,
            prompt_dir,
        } => cmd_serve(&db_path, host, *port, *offline, prompt_dir.as_deref()),
        Commands::Report {
            kind,
            subject_id,
            name,
            description,
            category,
            action,
            stream,
            offline,
            prompt_dir,
        } => {
            let params = ReportParams {
                kind,
                subject_id,
                name: name.as_deref(),
                description: description.as_deref(),
                category: category.as_deref(),
                action: action.as_deref(),
                stream: *stream,
                offline: *offline,
                prompt_dir: prompt_dir.as_deref(),
            };
            cmd_report(&db_path, &params, format)
        }
        Commands::Startup(sub) => execute_startup(sub, &db_path, format),
        Commands::InitPrompts { dir } => cmd_init_prompts(dir.as_deref(), format),
    }
}

fn execute_startup(cmd: &StartupCommands, db_path: &Path, format: OutputFormat) -> Result<String> {
    match cmd {
        StartupCommands::Add {
            name,
            id,
            sector,
            description,
            team_info,
        } => {
            let mut startup = Startup::new(name.trim());
            if let Some(id) = id {
                startup.id.clone_from(id);
            }
            startup.sector.clone_from(sector);
            startup.description.clone_from(description);
            startup.team_info.clone_from(team_info);
            cmd_startup_add(db_path, &startup, format)
        }
        StartupCommands::List => cmd_startup_list(db_path, format),
    }
}

/// Opens storage and ensures it's initialized.
fn open_storage(db_path: &Path) -> Result<SqliteStorage> {
    let storage = SqliteStorage::open(db_path)?;

    if !storage.is_initialized()? {
        return Err(StorageError::NotInitialized.into());
    }

    Ok(storage)
}

/// Builds the report pipeline over the database at `db_path`.
fn open_pipeline(db_path: &Path, offline: bool, prompt_dir: Option<&Path>) -> Result<ReportPipeline> {
    let storage = open_storage(db_path)?;

    let mut builder = AgentConfig::builder().from_env();
    if offline {
        builder = builder.provider(ProviderKind::Offline);
    }
    if let Some(dir) = prompt_dir {
        builder = builder.prompt_dir(dir);
    }
    let config = builder.build()?;
    info!(
        provider = config.provider.as_str(),
        tool_mode = config.tool_mode.as_str(),
        "agent configured"
    );

    let generator = ReportGenerator::new(create_provider(&config), config);
    Ok(ReportPipeline::new(generator, shared(storage)))
}

fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new().map_err(|e| {
        CommandError::ExecutionFailed(format!("Failed to create async runtime: {e}")).into()
    })
}

// ==================== Command Implementations ====================

fn cmd_init(db_path: &Path, force: bool, format: OutputFormat) -> Result<String> {
    if db_path.exists() && !force {
        return Err(CommandError::ExecutionFailed(
            "Database already exists. Use --force to reinitialize.".to_string(),
        )
        .into());
    }

    let mut storage = SqliteStorage::open(db_path)?;
    if force {
        storage.reset()?;
    } else {
        storage.init()?;
    }

    match format {
        OutputFormat::Text => Ok(format!(
            "Initialized dealroom database at: {}\n",
            db_path.display()
        )),
        OutputFormat::Json | OutputFormat::Ndjson => {
            let json = serde_json::json!({
                "success": true,
                "path": db_path.to_string_lossy(),
                "force": force
            });
            Ok(format.to_json(&json))
        }
    }
}

fn cmd_status(db_path: &Path, format: OutputFormat) -> Result<String> {
    let storage = open_storage(db_path)?;
    let stats = storage.stats()?;
    Ok(format_status(&stats, format))
}

fn cmd_serve(
    db_path: &Path,
    host: &str,
    port: u16,
    offline: bool,
    prompt_dir: Option<&Path>,
) -> Result<String> {
    let pipeline = open_pipeline(db_path, offline, prompt_dir)?;

    runtime()?
        .block_on(serve(AppState::new(pipeline), host, port))
        .map_err(|e| CommandError::ExecutionFailed(format!("Server error: {e}")))?;

    Ok(String::new())
}

fn cmd_report(db_path: &Path, params: &ReportParams<'_>, format: OutputFormat) -> Result<String> {
    let kind = ReportKind::parse(params.kind)?;
    let action = match params.action {
        Some(action) => ReportAction::parse_for(kind, action)?,
        None => kind.default_action(),
    };

    let pipeline = open_pipeline(db_path, params.offline, params.prompt_dir)?;
    let subject = Subject {
        id: params.subject_id.to_string(),
        name: params.name.map(String::from),
        description: params.description.map(String::from),
        category: params.category.map(String::from),
    };
    let request = pipeline.prepare(&subject, kind, action)?;

    let rt = runtime()?;
    if params.stream {
        rt.block_on(stream_frames(&pipeline, &request))?;
        return Ok(String::new());
    }

    let outcome = rt.block_on(pipeline.run(&request, &CancellationToken::new()))?;
    Ok(format_report(&outcome, format))
}

/// Writes every stream event to stdout as an SSE frame, then records the
/// report.
///
/// A closed stdout (e.g. `| head`) cancels the generation.
async fn stream_frames(pipeline: &ReportPipeline, request: &ReportRequest) -> Result<()> {
    let cancel = CancellationToken::new();
    let (tx, mut rx) = mpsc::channel::<StreamEvent>(STREAM_BUFFER);

    let produce = {
        let generator = pipeline.generator();
        let cancel = cancel.clone();
        async move {
            let report = generator.stream_into(request, &tx, &cancel).await;
            drop(tx);
            report
        }
    };
    let consume = async {
        while let Some(event) = rx.recv().await {
            let mut stdout = std::io::stdout().lock();
            if let Err(e) = stdout
                .write_all(event.to_sse_frame().as_bytes())
                .and_then(|()| stdout.flush())
            {
                cancel.cancel();
                return Err(e);
            }
        }
        Ok(())
    };

    let (report, written) = tokio::join!(produce, consume);
    pipeline.finish(request, report)?;
    written?;
    Ok(())
}

fn cmd_startup_add(db_path: &Path, startup: &Startup, format: OutputFormat) -> Result<String> {
    if startup.name.is_empty() {
        return Err(CommandError::InvalidArgument("startup name is required".to_string()).into());
    }
    let mut storage = open_storage(db_path)?;
    storage.save_startup(startup)?;

    match format {
        OutputFormat::Text => Ok(format!("Saved startup '{}' ({})\n", startup.name, startup.id)),
        OutputFormat::Json | OutputFormat::Ndjson => Ok(format.to_json(startup)),
    }
}

fn cmd_startup_list(db_path: &Path, format: OutputFormat) -> Result<String> {
    let storage = open_storage(db_path)?;
    Ok(format_startups(&storage.list_startups()?, format))
}

fn cmd_init_prompts(dir: Option<&Path>, format: OutputFormat) -> Result<String> {
    let target_dir = dir
        .map(PathBuf::from)
        .or_else(PromptSet::default_dir)
        .ok_or_else(|| {
            CommandError::ExecutionFailed(
                "Could not determine home directory for default prompt path".to_string(),
            )
        })?;

    let written = PromptSet::write_defaults(&target_dir).map_err(|e| {
        CommandError::ExecutionFailed(format!("Failed to write prompt files: {e}"))
    })?;

    match format {
        OutputFormat::Text => {
            if written.is_empty() {
                return Ok(format!(
                    "All prompt files already exist in: {}\n",
                    target_dir.display()
                ));
            }
            let mut output = format!(
                "Wrote {} prompt file(s) to: {}\n",
                written.len(),
                target_dir.display()
            );
            for path in &written {
                output.push_str("  ");
                output.push_str(
                    path.file_name()
                        .and_then(|n| n.to_str())
                        .unwrap_or("unknown"),
                );
                output.push('\n');
            }
            output.push_str("\nEdit these files to customize the system prompts.\n");
            Ok(output)
        }
        OutputFormat::Json | OutputFormat::Ndjson => {
            let json = serde_json::json!({
                "directory": target_dir.to_string_lossy(),
                "written": written.iter().map(|p| p.to_string_lossy().into_owned()).collect::<Vec<_>>(),
                "count": written.len()
            });
            Ok(format.to_json(&json))
        }
    }
}
