//! CLI route: single route table and run context. Builds the job runtime from
//! config and dispatches to the orchestrators and the HTTP server.

use crate::cancellation::InMemoryCancellationRegistry;
use crate::cli::output::{format_suggestions, TextRenderer};
use crate::cli::parse::{Commands, StreamFormat};
use crate::config::{ClauseConfig, ConfigLoader};
use crate::drafting::ProviderDocumentModel;
use crate::error::ApiError;
use crate::generation::{EditOrchestrator, GenerationOrchestrator, JobHandle, JobRuntime};
use crate::job::{Document, JobKind, OutputEvent};
use crate::retry::RetryPolicy;
use crate::server::{self, AppState, SseEncoder};
use std::io::{IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Runtime context for CLI execution: the loaded config.
pub struct RunContext {
    config: ClauseConfig,
}

impl RunContext {
    /// Load and validate config for `workspace_root`, or from `config_path` when given.
    pub fn new(workspace_root: PathBuf, config_path: Option<PathBuf>) -> Result<Self, ApiError> {
        let config = if let Some(ref cfg_path) = config_path {
            ConfigLoader::load_from_file(cfg_path)?
        } else {
            ConfigLoader::load(&workspace_root)?
        };
        config.ensure_valid()?;
        Ok(Self::with_config(config))
    }

    pub fn with_config(config: ClauseConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ClauseConfig {
        &self.config
    }

    /// Job runtime over the configured provider. Fails when no API key is available.
    pub fn build_runtime(&self) -> Result<JobRuntime, ApiError> {
        let model = ProviderDocumentModel::from_config(&self.config.provider)?;
        info!(
            provider = ?self.config.provider.provider_type,
            model = %self.config.provider.model,
            "Provider configured"
        );
        Ok(JobRuntime::new(
            Arc::new(model),
            Arc::new(InMemoryCancellationRegistry::new()),
            RetryPolicy::from_config(&self.config.retry),
            self.config.jobs.clone(),
        ))
    }

    /// Execute a CLI command via the single route table.
    pub fn execute(&self, command: &Commands) -> Result<String, ApiError> {
        let rt = tokio::runtime::Runtime::new()
            .map_err(|e| ApiError::Io(format!("Failed to create runtime: {}", e)))?;
        rt.block_on(async {
            let runtime = self.build_runtime()?;
            let stdout = std::io::stdout();
            let color = stdout.is_terminal();
            let mut out = stdout.lock();
            self.run(runtime, command, &mut out, color).await
        })
    }

    /// Run `command` on `runtime`, streaming job output to `out`.
    pub async fn run<W: Write>(
        &self,
        runtime: JobRuntime,
        command: &Commands,
        out: &mut W,
        color: bool,
    ) -> Result<String, ApiError> {
        match command {
            Commands::Serve { host, port, cors } => {
                let mut server_config = self.config.server.clone();
                if let Some(host) = host {
                    server_config.host = host.clone();
                }
                if let Some(port) = port {
                    server_config.port = *port;
                }
                if *cors {
                    server_config.permissive_cors = true;
                }
                server_config.validate().map_err(ApiError::ConfigError)?;

                let state = Arc::new(AppState::new(runtime));
                server::serve(&server_config, state, async {
                    if let Err(e) = tokio::signal::ctrl_c().await {
                        warn!(error = %e, "Failed to listen for shutdown signal");
                    }
                })
                .await?;
                Ok("Server stopped".to_string())
            }
            Commands::Generate { prompt, format } => {
                let orchestrator = GenerationOrchestrator::new(runtime.clone());
                let handle = orchestrator.start(prompt).await?;
                stream_job(&runtime, handle, JobKind::Generation, *format, color, out).await
            }
            Commands::Edit {
                file,
                title,
                instruction,
                format,
            } => {
                let source = read_document(file, title.as_deref())?;
                let edits = EditOrchestrator::new(runtime.clone());
                let handle = edits.start(&source, instruction).await?;
                stream_job(&runtime, handle, JobKind::Edit, *format, color, out).await
            }
            Commands::Suggest { file, title } => {
                let document = read_document(file, title.as_deref())?;
                let suggestions = EditOrchestrator::new(runtime).suggest_edits(&document).await;
                Ok(format_suggestions(&suggestions))
            }
        }
    }
}

fn read_document(file: &Path, title: Option<&str>) -> Result<Document, ApiError> {
    let content = std::fs::read_to_string(file)
        .map_err(|e| ApiError::Io(format!("Failed to read {}: {}", file.display(), e)))?;
    let title = match title {
        Some(title) => title.to_string(),
        None => file
            .file_stem()
            .map(|stem| stem.to_string_lossy().to_string())
            .unwrap_or_default(),
    };
    Ok(Document::from_text(None, title, content))
}

/// Write a job's events to `out` until a terminal event arrives. The first
/// Ctrl-C cancels the job; its remaining events are still drained.
async fn stream_job<W: Write>(
    runtime: &JobRuntime,
    mut handle: JobHandle,
    kind: JobKind,
    format: StreamFormat,
    color: bool,
    out: &mut W,
) -> Result<String, ApiError> {
    let job_id = handle.job_id;
    let renderer = TextRenderer::new(kind, color);
    let mut encoder = SseEncoder::new(kind);
    let interrupt = tokio::signal::ctrl_c();
    tokio::pin!(interrupt);
    let mut interrupted = false;

    loop {
        let event = tokio::select! {
            event = handle.next_event() => event,
            _ = &mut interrupt, if !interrupted => {
                interrupted = true;
                info!(job_id = %job_id, "Interrupt received, cancelling job");
                runtime.registry().cancel(&job_id).await;
                continue;
            }
        };
        let Some(event) = event else {
            return Err(ApiError::JobFailed(
                "event stream ended without an outcome".to_string(),
            ));
        };

        match format {
            StreamFormat::Sse => {
                for frame in encoder.encode(&event) {
                    out.write_all(frame.as_bytes())?;
                }
            }
            StreamFormat::Text => {
                if let Some(text) = renderer.render(&event) {
                    out.write_all(text.as_bytes())?;
                }
            }
        }
        out.flush()?;

        match event {
            OutputEvent::Completed { document } => {
                info!(job_id = %document.id, "Contract completed");
                return Ok(String::new());
            }
            OutputEvent::Cancelled => return Err(ApiError::Cancelled),
            OutputEvent::Failed { reason } => return Err(ApiError::JobFailed(reason)),
            _ => {}
        }
    }
}
