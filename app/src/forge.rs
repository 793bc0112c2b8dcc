//! Headless pipeline driver
//!
//! description → generator → extracted code → preview runtime → outcome,
//! recording every generation in the application state.

use std::sync::Arc;

use generation::{CodeGenerator, GeneratedComponent, GenerationError, OllamaClient};
use preview_engine::{
    EventSink, ExecutionHost, PreviewController, PreviewError, PreviewRuntime, RenderOutcome,
    SourceDocument,
};

use crate::config::{AppConfig, ConfigError};
use crate::state::{HistoryEntry, SharedAppState};

#[derive(Debug, thiserror::Error)]
pub enum ForgeError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Generation failed: {0}")]
    Generation(#[from] GenerationError),

    #[error(transparent)]
    Preview(#[from] PreviewError),

    #[error("Preview task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    /// The runtime settled nothing for the submitted source
    #[error("Preview produced no outcome")]
    NoOutcome,
}

/// A generated component together with its preview
#[derive(Debug, Clone)]
pub struct ForgeResult {
    pub component: GeneratedComponent,
    pub outcome: RenderOutcome,
}

pub struct Forge {
    state: SharedAppState,
    runtime: PreviewRuntime,
    generator: Arc<dyn CodeGenerator>,
}

impl Forge {
    pub fn new(
        config: &AppConfig,
        state: SharedAppState,
        generator: Arc<dyn CodeGenerator>,
        host: Arc<dyn ExecutionHost>,
        events: Arc<dyn EventSink>,
    ) -> Result<Self, ForgeError> {
        let controller = PreviewController::new(config.preview.mocks()?, config.preview.settings());
        Ok(Self {
            state,
            runtime: PreviewRuntime::new(controller, host, events),
            generator,
        })
    }

    pub fn state(&self) -> &SharedAppState {
        &self.state
    }

    pub fn runtime(&self) -> &PreviewRuntime {
        &self.runtime
    }

    /// Preview source text and wait for it to settle
    pub async fn preview(&self, source: impl Into<SourceDocument>) -> Result<RenderOutcome, ForgeError> {
        if let Some(load) = self.runtime.set_source(source) {
            load.await?;
        }
        self.runtime.latest_outcome().ok_or(ForgeError::NoOutcome)
    }

    /// Generate a component from `description`, preview it and record it
    pub async fn generate(&self, description: &str) -> Result<ForgeResult, ForgeError> {
        self.state.write().await.set_generating(true);
        let generated = self.generator.generate(description).await;
        self.state.write().await.set_generating(false);
        let component = generated?;

        log::info!(
            "Generated {} bytes via {} in {}ms ({:.1} tok/s)",
            component.code.len(),
            component.strategy,
            component.response_time_ms,
            component.tokens_per_second
        );

        let outcome = self.preview(component.code.as_str()).await?;
        let component_name = self
            .runtime
            .controller()
            .lock()
            .component_name()
            .map(str::to_string);
        self.state.write().await.record(HistoryEntry::new(
            description,
            component.code.clone(),
            component_name,
            outcome.message().map(str::to_string),
        ));

        Ok(ForgeResult { component, outcome })
    }
}

/// Refresh the connection status in `state` from the daemon
pub async fn check_connection(client: &OllamaClient, state: &SharedAppState) -> bool {
    if !client.health_check().await {
        state
            .write()
            .await
            .set_disconnected(format!("Ollama is not reachable at {}", client.base_url()));
        return false;
    }

    let version = match client.version().await {
        Ok(version) => Some(version),
        Err(e) => {
            log::debug!("Could not read Ollama version: {}", e);
            None
        }
    };
    match client.list_models().await {
        Ok(models) => {
            log::info!("Connected to Ollama with {} models", models.len());
            state.write().await.set_connected(version, &models);
            true
        }
        Err(e) => {
            state.write().await.set_disconnected(e.to_string());
            false
        }
    }
}
