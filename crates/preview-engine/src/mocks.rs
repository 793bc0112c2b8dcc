//! Dependency Mock Layer
//!
//! Stand-in bindings for the libraries generated components import but the
//! sandbox cannot load: icon components, animation wrappers and the presence
//! wrapper. Each binding is rendered as one `var` statement that runs before
//! the component body, so adding a mock is adding one entry to the table.

use std::collections::BTreeMap;

use crate::error::{PreviewError, Result};

/// Plain element types exposed as `motion.<tag>`
pub const MOTION_ELEMENTS: &[&str] = &[
    "div", "span", "button", "a", "p", "h1", "h2", "h3", "h4", "h5", "h6", "section", "article",
    "ul", "ol", "li", "img", "nav", "header", "footer", "main", "form", "input", "label", "svg",
    "path",
];

/// Icon names and the glyph drawn in their place
const STANDARD_ICONS: &[(&str, &str)] = &[
    ("AlertCircle", "⚠"),
    ("AlertTriangle", "⚠"),
    ("ArrowLeft", "←"),
    ("ArrowRight", "→"),
    ("ArrowUp", "↑"),
    ("ArrowDown", "↓"),
    ("Bell", "🔔"),
    ("Bookmark", "🔖"),
    ("Calendar", "📅"),
    ("Check", "✓"),
    ("CheckCircle", "✓"),
    ("ChevronDown", "▼"),
    ("ChevronLeft", "‹"),
    ("ChevronRight", "›"),
    ("ChevronUp", "▲"),
    ("Clock", "🕐"),
    ("Code", "</>"),
    ("Copy", "📋"),
    ("Download", "⬇"),
    ("Edit", "✏"),
    ("ExternalLink", "↗"),
    ("Eye", "👁"),
    ("EyeOff", "⚫"),
    ("Filter", "⏷"),
    ("Github", "⌥"),
    ("Globe", "🌐"),
    ("Heart", "❤"),
    ("Home", "🏠"),
    ("Info", "ⓘ"),
    ("Loader", "⟳"),
    ("Loader2", "⟳"),
    ("Lock", "🔒"),
    ("LogOut", "⎋"),
    ("Mail", "✉"),
    ("Menu", "☰"),
    ("Minus", "-"),
    ("MoreHorizontal", "⋯"),
    ("Phone", "📞"),
    ("Plus", "+"),
    ("Save", "💾"),
    ("Search", "🔍"),
    ("Settings", "⚙"),
    ("Share", "⇪"),
    ("ShoppingCart", "🛒"),
    ("Sparkles", "✨"),
    ("Star", "⭐"),
    ("Trash", "🗑"),
    ("Trash2", "🗑"),
    ("Upload", "⬆"),
    ("User", "👤"),
    ("Users", "👥"),
    ("X", "✕"),
];

/// One replacement binding
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockBinding {
    /// Icon component drawing a short glyph
    Icon { glyph: String },
    /// Object of wrapper components rendering plain elements, ignoring animation props
    Motion { elements: Vec<String> },
    /// Wrapper that renders its children unconditionally
    Presence,
    /// Arbitrary script expression bound to the name
    Script(String),
}

impl MockBinding {
    fn render(&self, name: &str) -> String {
        let value = match self {
            MockBinding::Icon { glyph } => {
                format!("__forge.icon({}, {})", js_string(name), js_string(glyph))
            }
            MockBinding::Motion { elements } => {
                let list: Vec<String> = elements.iter().map(|e| js_string(e)).collect();
                format!("__forge.motion([{}])", list.join(", "))
            }
            MockBinding::Presence => "__forge.presence()".to_string(),
            MockBinding::Script(expr) => expr.clone(),
        };
        format!("var {} = {};", name, value)
    }
}

/// Table of mock bindings, keyed and rendered by name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MockLibrary {
    bindings: BTreeMap<String, MockBinding>,
}

impl MockLibrary {
    /// An empty library
    pub fn new() -> Self {
        Self::default()
    }

    /// The standard set: common lucide icons, `motion`, `AnimatePresence`
    /// and the `cn`/`clsx` class-name helpers
    pub fn standard() -> Self {
        let mut library = Self::new();
        for (name, glyph) in STANDARD_ICONS {
            library.bindings.insert(
                (*name).to_string(),
                MockBinding::Icon {
                    glyph: (*glyph).to_string(),
                },
            );
        }
        library.bindings.insert(
            "motion".to_string(),
            MockBinding::Motion {
                elements: MOTION_ELEMENTS.iter().map(|e| (*e).to_string()).collect(),
            },
        );
        library
            .bindings
            .insert("AnimatePresence".to_string(), MockBinding::Presence);
        for helper in ["cn", "clsx"] {
            library
                .bindings
                .insert(helper.to_string(), MockBinding::Script("__forge.classNames".to_string()));
        }
        library
    }

    /// Add or replace a binding
    pub fn register(&mut self, name: impl Into<String>, binding: MockBinding) -> Result<()> {
        let name = name.into();
        if !is_identifier(&name) {
            return Err(PreviewError::InvalidMockName(name));
        }
        self.bindings.insert(name, binding);
        Ok(())
    }

    /// Add or replace an icon binding
    pub fn register_icon(&mut self, name: impl Into<String>, glyph: impl Into<String>) -> Result<()> {
        self.register(
            name,
            MockBinding::Icon {
                glyph: glyph.into(),
            },
        )
    }

    pub fn get(&self, name: &str) -> Option<&MockBinding> {
        self.bindings.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.bindings.keys().map(String::as_str)
    }

    /// Script declaring every binding as a global, in name order.
    ///
    /// The component body runs inside its own function scope, so a local
    /// `const Star = ...` shadows the mock instead of colliding with it.
    pub fn render(&self) -> String {
        self.bindings
            .iter()
            .map(|(name, binding)| binding.render(name))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_' || c == '$')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
        && !name.starts_with("__forge")
}

fn js_string(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_library_covers_common_names() {
        let library = MockLibrary::standard();
        for name in ["Star", "Loader2", "motion", "AnimatePresence", "cn"] {
            assert!(library.contains(name), "missing {}", name);
        }
        assert!(!library.contains("Zap"));
    }

    #[test]
    fn test_render_is_sorted_by_name() {
        let mut library = MockLibrary::new();
        library.register_icon("Star", "*").unwrap();
        library.register("AnimatePresence", MockBinding::Presence).unwrap();
        library.register_icon("Bell", "b").unwrap();

        assert_eq!(
            library.render(),
            "var AnimatePresence = __forge.presence();\nvar Bell = __forge.icon(\"Bell\", \"b\");\nvar Star = __forge.icon(\"Star\", \"*\");"
        );
    }

    #[test]
    fn test_motion_binding_lists_elements() {
        let mut library = MockLibrary::new();
        library
            .register(
                "motion",
                MockBinding::Motion {
                    elements: vec!["div".into(), "span".into()],
                },
            )
            .unwrap();
        assert_eq!(library.render(), "var motion = __forge.motion([\"div\", \"span\"]);");
    }

    #[test]
    fn test_rejects_invalid_names() {
        let mut library = MockLibrary::new();
        assert!(matches!(
            library.register_icon("not-valid", "x"),
            Err(PreviewError::InvalidMockName(_))
        ));
        assert!(library.register_icon("__forge_host", "x").is_err());
        assert!(library.register_icon("Zap", "⚡").is_ok());
        assert_eq!(library.len(), 1);
    }
}
