use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use crystal_forge::{check_connection, AppConfig, AppState, Forge};
use generation::{CrystalProfile, OllamaClient, OllamaGenerator, PatternClassifier};
use preview_engine::{NullEventSink, RenderOutcome};

/// Crystal Forge: describe a UI component, generate it with a local model and
/// preview it in the sandbox.
#[derive(Parser, Debug)]
#[command(name = "crystal-forge", version)]
struct Args {
    /// Preview an existing component file instead of generating one
    #[arg(long, value_name = "PATH", conflicts_with = "description")]
    file: Option<PathBuf>,

    /// Ollama base URL; overrides the config file
    #[arg(long, env = "CRYSTAL_FORGE_OLLAMA_URL")]
    ollama_url: Option<String>,

    /// Model tag to generate with; overrides the config file
    #[arg(long, env = "CRYSTAL_FORGE_MODEL")]
    model: Option<String>,

    /// What to build, e.g. "a pricing card with three tiers"
    #[arg(required_unless_present = "file")]
    description: Vec<String>,
}

enum Mode {
    Generate(String),
    File(PathBuf),
}

impl Args {
    fn mode(&self) -> Mode {
        match &self.file {
            Some(path) => Mode::File(path.clone()),
            None => Mode::Generate(self.description.join(" ")),
        }
    }
}

fn print_outcome(outcome: &RenderOutcome) {
    match outcome {
        RenderOutcome::Mounted { generation, markup } => {
            println!("Mounted (generation {})", generation);
            println!("{}", markup);
        }
        RenderOutcome::Failed {
            generation,
            origin,
            message,
            ..
        } => {
            println!("Failed (generation {}, {}): {}", generation, origin, message);
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let args = Args::parse();

    match run(args).await {
        Ok(mounted) if mounted => ExitCode::SUCCESS,
        Ok(_) => ExitCode::FAILURE,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<bool, Box<dyn std::error::Error>> {
    log::info!("Crystal Forge starting...");

    let mut config = match AppConfig::default_dir() {
        Some(dir) => AppConfig::load(&dir).await?,
        None => AppConfig::default(),
    };
    if let Some(url) = &args.ollama_url {
        config.generation.base_url = url.clone();
    }
    if let Some(model) = &args.model {
        config.generation.model = model.clone();
    }

    let crystal = CrystalProfile::amethyst().with_model(config.generation.model.clone());
    let state = AppState::new(crystal.clone()).shared();
    let client = OllamaClient::new(config.generation.base_url.clone(), config.generation.options())?;
    let generator = OllamaGenerator::new(
        client.clone(),
        crystal,
        Arc::new(PatternClassifier::builtin()?),
    );
    let forge = Forge::new(
        &config,
        state.clone(),
        Arc::new(generator),
        Arc::new(config.preview.host()),
        Arc::new(NullEventSink),
    )?;

    let outcome = match args.mode() {
        Mode::File(path) => {
            let source = tokio::fs::read_to_string(&path).await?;
            forge.preview(source).await?
        }
        Mode::Generate(description) => {
            if !check_connection(&client, &state).await {
                let status = state.read().await.connection().clone();
                return Err(status
                    .last_error
                    .unwrap_or_else(|| "Ollama is not reachable".to_string())
                    .into());
            }
            let result = forge.generate(&description).await?;
            println!("{}\n", result.component.code);
            if !result.component.explanation.is_empty() {
                println!("{}\n", result.component.explanation);
            }
            result.outcome
        }
    };

    print_outcome(&outcome);
    Ok(outcome.is_mounted())
}
