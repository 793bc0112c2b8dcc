//! Crystal Forge application layer
//!
//! Configuration, the shared application state and the pipeline driver that
//! ties generation to the preview engine.

pub mod config;
pub mod forge;
pub mod state;

pub use config::{AppConfig, ConfigError, GenerationConfig, PreviewConfig, SandboxConfig};
pub use forge::{check_connection, Forge, ForgeError, ForgeResult};
pub use state::{AppState, ConnectionStatus, HistoryEntry, SharedAppState};
