//! Component kind classification
//!
//! Guesses what kind of component a description asks for so the prompt can
//! carry a matching example. The default [`PatternClassifier`] is an ordered
//! registry of (pattern, kind, template) entries; the first matching pattern
//! wins.

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{GenerationError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentKind {
    Button,
    Card,
    Hero,
    Form,
    Modal,
    Navigation,
    List,
    Table,
    Alert,
    Badge,
}

impl ComponentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentKind::Button => "button",
            ComponentKind::Card => "card",
            ComponentKind::Hero => "hero",
            ComponentKind::Form => "form",
            ComponentKind::Modal => "modal",
            ComponentKind::Navigation => "navigation",
            ComponentKind::List => "list",
            ComponentKind::Table => "table",
            ComponentKind::Alert => "alert",
            ComponentKind::Badge => "badge",
        }
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of classifying a description
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub kind: ComponentKind,
    /// Example source to include in the prompt, if the kind has one
    pub template: Option<&'static str>,
}

/// Pluggable description classifier
pub trait ComponentClassifier: Send + Sync {
    /// `None` means a generic component
    fn classify(&self, description: &str) -> Option<Classification>;
}

const BUTTON_TEMPLATE: &str = r#"interface ButtonProps {
  children: React.ReactNode;
  onClick?: () => void;
  variant?: 'primary' | 'secondary' | 'danger';
  size?: 'sm' | 'md' | 'lg';
  disabled?: boolean;
}

export const Button: React.FC<ButtonProps> = ({
  children,
  onClick,
  variant = 'primary',
  size = 'md',
  disabled = false
}) => {
  const variants = {
    primary: 'bg-purple-600 hover:bg-purple-700 text-white',
    secondary: 'bg-zinc-700 hover:bg-zinc-600 text-white',
    danger: 'bg-red-600 hover:bg-red-700 text-white'
  };
  const sizes = {
    sm: 'px-3 py-1.5 text-sm',
    md: 'px-4 py-2 text-base',
    lg: 'px-6 py-3 text-lg'
  };
  return (
    <button
      onClick={onClick}
      disabled={disabled}
      className={`${variants[variant]} ${sizes[size]} font-medium rounded-lg transition-all duration-200`}
    >
      {children}
    </button>
  );
};"#;

const CARD_TEMPLATE: &str = r#"interface CardProps {
  title: string;
  description?: string;
  image?: string;
  onClick?: () => void;
}

export const Card: React.FC<CardProps> = ({ title, description, image, onClick }) => {
  return (
    <article
      className="bg-zinc-800 border border-zinc-700 rounded-xl overflow-hidden"
      onClick={onClick}
      role={onClick ? 'button' : undefined}
    >
      {image && <img src={image} alt={title} className="w-full h-48 object-cover" />}
      <div className="p-6">
        <h3 className="text-xl font-bold text-white mb-2">{title}</h3>
        {description && <p className="text-zinc-400">{description}</p>}
      </div>
    </article>
  );
};"#;

/// Built-in registry, in matching order
const BUILTIN_PATTERNS: &[(&str, ComponentKind, Option<&str>)] = &[
    (r"button|btn|cta|action", ComponentKind::Button, Some(BUTTON_TEMPLATE)),
    (r"card|tile|panel|box", ComponentKind::Card, Some(CARD_TEMPLATE)),
    (r"hero|banner|header|landing", ComponentKind::Hero, None),
    (r"form|input|field|login|signup|register", ComponentKind::Form, None),
    (r"modal|dialog|popup|overlay", ComponentKind::Modal, None),
    (r"nav|menu|header|sidebar", ComponentKind::Navigation, None),
    (r"list|grid|gallery|items", ComponentKind::List, None),
    (r"table|data|grid|spreadsheet", ComponentKind::Table, None),
    (r"alert|notification|toast|message", ComponentKind::Alert, None),
    (r"badge|tag|label|chip", ComponentKind::Badge, None),
];

struct Rule {
    pattern: Regex,
    classification: Classification,
}

/// Ordered (pattern, kind, template) registry
pub struct PatternClassifier {
    rules: Vec<Rule>,
}

impl PatternClassifier {
    /// An empty registry: every description is generic
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// The built-in registry
    pub fn builtin() -> Result<Self> {
        let mut classifier = Self::empty();
        for (pattern, kind, template) in BUILTIN_PATTERNS {
            classifier.register(pattern, *kind, *template)?;
        }
        Ok(classifier)
    }

    /// Append a rule; it is consulted after every existing rule.
    /// Patterns match case-insensitively.
    pub fn register(
        &mut self,
        pattern: &str,
        kind: ComponentKind,
        template: Option<&'static str>,
    ) -> Result<()> {
        let compiled = RegexBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .map_err(|e| GenerationError::Pattern {
                pattern: pattern.to_string(),
                message: e.to_string(),
            })?;
        self.rules.push(Rule {
            pattern: compiled,
            classification: Classification { kind, template },
        });
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl ComponentClassifier for PatternClassifier {
    fn classify(&self, description: &str) -> Option<Classification> {
        self.rules
            .iter()
            .find(|rule| rule.pattern.is_match(description))
            .map(|rule| rule.classification)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kind_of(description: &str) -> Option<ComponentKind> {
        PatternClassifier::builtin()
            .unwrap()
            .classify(description)
            .map(|c| c.kind)
    }

    #[test]
    fn test_first_match_wins() {
        assert_eq!(kind_of("A primary CTA"), Some(ComponentKind::Button));
        // "header" appears under hero before navigation
        assert_eq!(kind_of("site header"), Some(ComponentKind::Hero));
        assert_eq!(kind_of("a pricing card with a button"), Some(ComponentKind::Button));
        assert_eq!(kind_of("Login screen"), Some(ComponentKind::Form));
        assert_eq!(kind_of("status chip"), Some(ComponentKind::Badge));
        assert_eq!(kind_of("something whimsical"), None);
    }

    #[test]
    fn test_templates_only_for_some_kinds() {
        let classifier = PatternClassifier::builtin().unwrap();
        let card = classifier.classify("profile card").unwrap();
        assert!(card.template.unwrap().contains("CardProps"));
        let modal = classifier.classify("confirm dialog").unwrap();
        assert_eq!(modal.kind, ComponentKind::Modal);
        assert!(modal.template.is_none());
    }

    #[test]
    fn test_custom_registry() {
        let mut classifier = PatternClassifier::empty();
        assert!(classifier.classify("button").is_none());
        classifier.register(r"\bstepper\b", ComponentKind::Form, None).unwrap();
        assert_eq!(classifier.len(), 1);
        assert_eq!(
            classifier.classify("A STEPPER widget").map(|c| c.kind),
            Some(ComponentKind::Form)
        );
        assert!(matches!(
            classifier.register("(", ComponentKind::Form, None),
            Err(GenerationError::Pattern { .. })
        ));
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(ComponentKind::Navigation.to_string(), "navigation");
        assert_eq!(serde_json::to_string(&ComponentKind::Badge).unwrap(), "\"badge\"");
    }
}
