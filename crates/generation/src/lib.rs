//! Generation - Component source from natural-language descriptions
//!
//! The collaborator that feeds the preview engine:
//!
//! - `ollama`: HTTP client for a local Ollama daemon
//! - `classifier`: description → component kind registry
//! - `extract`: fenced block / declaration run / line classification chain
//! - `generator`: the `CodeGenerator` seam and its Ollama implementation

pub mod classifier;
pub mod crystal;
pub mod error;
pub mod extract;
pub mod generator;
pub mod ollama;

// Re-export key types
pub use classifier::{Classification, ComponentClassifier, ComponentKind, PatternClassifier};
pub use crystal::CrystalProfile;
pub use error::{GenerationError, Result};
pub use extract::{Extraction, ExtractionStrategy, Extractor};
pub use generator::{build_prompt, CodeGenerator, GeneratedComponent, OllamaGenerator};
pub use ollama::{GenerateResponse, ModelSummary, OllamaClient, OllamaOptions, DEFAULT_BASE_URL};
