//! Component generation
//!
//! [`CodeGenerator`] is the seam between the application and whatever
//! produces component source. [`OllamaGenerator`] classifies the description,
//! builds the prompt, calls the daemon and separates code from prose.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

use crate::classifier::{Classification, ComponentClassifier};
use crate::crystal::CrystalProfile;
use crate::error::Result;
use crate::extract::Extractor;
use crate::ollama::OllamaClient;

/// Explanation used when the model gave none
pub const DEFAULT_EXPLANATION: &str = "Component generated without further explanation";

/// A generated component, code separated from prose
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedComponent {
    pub code: String,
    pub explanation: String,
    /// Extraction strategy that found the code
    pub strategy: String,
    pub tokens_per_second: f64,
    pub response_time_ms: u64,
}

/// Produces component source from a description
#[async_trait]
pub trait CodeGenerator: Send + Sync {
    async fn generate(&self, description: &str) -> Result<GeneratedComponent>;
}

/// Assemble the user prompt for `description`
pub fn build_prompt(description: &str, classification: Option<&Classification>) -> String {
    let mut prompt = format!(
        "Create a React TypeScript component: {}\n\n\
         Requirements:\n\
         - Use TypeScript with a props interface\n\
         - Use Tailwind CSS classes for styling\n\
         - Export the component\n",
        description.trim()
    );
    if let Some(template) = classification.and_then(|c| c.template) {
        prompt.push_str("\nExample structure:\n```typescript\n");
        prompt.push_str(template);
        prompt.push_str("\n```\n");
    }
    prompt.push_str("\nProvide only the component code in a markdown code block.");
    prompt
}

/// Generator backed by a local Ollama daemon
pub struct OllamaGenerator {
    client: OllamaClient,
    crystal: CrystalProfile,
    classifier: Arc<dyn ComponentClassifier>,
    extractor: Extractor,
}

impl OllamaGenerator {
    pub fn new(
        client: OllamaClient,
        crystal: CrystalProfile,
        classifier: Arc<dyn ComponentClassifier>,
    ) -> Self {
        Self {
            client,
            crystal,
            classifier,
            extractor: Extractor::default(),
        }
    }

    pub fn with_extractor(mut self, extractor: Extractor) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn crystal(&self) -> &CrystalProfile {
        &self.crystal
    }

    pub fn client(&self) -> &OllamaClient {
        &self.client
    }
}

#[async_trait]
impl CodeGenerator for OllamaGenerator {
    async fn generate(&self, description: &str) -> Result<GeneratedComponent> {
        let started = Instant::now();
        let classification = self.classifier.classify(description);
        match &classification {
            Some(c) => log::info!("Generating {} component with {}", c.kind, self.crystal.model),
            None => log::info!("Generating generic component with {}", self.crystal.model),
        }

        let prompt = build_prompt(description, classification.as_ref());
        let response = self
            .client
            .generate(
                &self.crystal.model,
                &prompt,
                self.crystal.system_prompt.as_deref(),
            )
            .await?;
        let response_time_ms = started.elapsed().as_millis() as u64;

        let extraction = self.extractor.extract(&response.response)?;
        let explanation = if extraction.explanation.is_empty() {
            DEFAULT_EXPLANATION.to_string()
        } else {
            extraction.explanation
        };

        Ok(GeneratedComponent {
            code: extraction.code,
            explanation,
            strategy: extraction.strategy.to_string(),
            tokens_per_second: response.tokens_per_second(),
            response_time_ms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::PatternClassifier;
    use crate::error::GenerationError;
    use crate::ollama::tests::serve_once;
    use crate::ollama::OllamaOptions;

    #[test]
    fn test_prompt_carries_template() {
        let classifier = PatternClassifier::builtin().unwrap();
        let classification = classifier.classify("a submit button");
        let prompt = build_prompt("a submit button", classification.as_ref());
        assert!(prompt.starts_with("Create a React TypeScript component: a submit button"));
        assert!(prompt.contains("interface ButtonProps"));

        let prompt = build_prompt("something", None);
        assert!(!prompt.contains("Example structure"));
        assert!(prompt.ends_with("markdown code block."));
    }

    fn generator(url: String) -> OllamaGenerator {
        OllamaGenerator::new(
            OllamaClient::new(url, OllamaOptions::default()).unwrap(),
            CrystalProfile::amethyst(),
            Arc::new(PatternClassifier::builtin().unwrap()),
        )
    }

    #[tokio::test]
    async fn test_generate_extracts_code() {
        let (url, server) = serve_once(
            200,
            r#"{"model":"m","response":"```tsx\nexport const Chip = () => <span>chip</span>;\n```","done":true}"#,
        )
        .await;
        let component = generator(url).generate("a status chip").await.unwrap();
        assert_eq!(component.code, "export const Chip = () => <span>chip</span>;");
        assert_eq!(component.explanation, DEFAULT_EXPLANATION);
        assert_eq!(component.strategy, "fenced-block");
        assert_eq!(component.tokens_per_second, 0.0);

        let request = server.await.unwrap();
        assert!(request.contains("qwen2.5-coder:7b-instruct-q8_0"));
    }

    #[tokio::test]
    async fn test_prose_only_response_is_a_generation_failure() {
        let (url, _server) = serve_once(
            200,
            r#"{"model":"m","response":"I cannot help with that.","done":true}"#,
        )
        .await;
        assert!(matches!(
            generator(url).generate("anything").await,
            Err(GenerationError::NoCodeFound)
        ));
    }
}
