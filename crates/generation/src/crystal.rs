//! Crystal profiles
//!
//! A crystal is a named model/persona record: which model to use and the
//! system prompt that goes with it. The engine treats the rest of the record
//! as opaque metadata.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrystalProfile {
    pub id: String,
    pub name: String,
    /// What the crystal is for, e.g. "Code generator & refactorer"
    pub role: String,
    /// Ollama model tag
    pub model: String,
    #[serde(default)]
    pub system_prompt: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl CrystalProfile {
    /// The default code-generation crystal
    pub fn amethyst() -> Self {
        Self {
            id: "amethyst.dev".to_string(),
            name: "Amethyst".to_string(),
            role: "Code generator & refactorer".to_string(),
            model: "qwen2.5-coder:7b-instruct-q8_0".to_string(),
            system_prompt: Some(
                "You generate production-quality React components in TypeScript styled with Tailwind CSS. \
                 Define a props interface, take all text from props and export the component."
                    .to_string(),
            ),
            tags: vec!["code".to_string(), "react".to_string()],
            color: Some("#9333ea".to_string()),
        }
    }

    /// Same crystal, different model
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

impl Default for CrystalProfile {
    fn default() -> Self {
        Self::amethyst()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_profile_deserializes() {
        let profile: CrystalProfile = serde_json::from_str(
            r#"{"id":"quartz.ui","name":"Quartz","role":"UI","model":"llama3"}"#,
        )
        .unwrap();
        assert_eq!(profile.model, "llama3");
        assert!(profile.system_prompt.is_none());
        assert!(profile.tags.is_empty());
    }

    #[test]
    fn test_with_model() {
        let profile = CrystalProfile::amethyst().with_model("codellama");
        assert_eq!(profile.name, "Amethyst");
        assert_eq!(profile.model, "codellama");
    }
}
