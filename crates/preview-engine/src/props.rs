//! Property Inference Panel
//!
//! Reads the `<Name>Props` declaration of a component, turns each field into a
//! [`PropertyDefinition`] and keeps the live [`PropertyBag`] the render harness
//! instantiates the component with.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::PropertyError;
use crate::normalizer::scan::{block_comment_end, line_comment_end, matching_bracket_end, string_end};

static PROPS_DECLARATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:interface\s+([A-Za-z_$][\w$]*Props)\b[^{;]*|type\s+([A-Za-z_$][\w$]*Props)\s*=\s*)\{")
        .unwrap()
});
static MEMBER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^(?:readonly\s+)?(?:([A-Za-z_$][\w$]*)|'([^']+)'|"([^"]+)")\s*(\?)?\s*(:|\()"#).unwrap()
});
static NUMBER_LITERAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^-?(?:\d+\.?\d*|\.\d+)$").unwrap());

/// Control offered for a property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyKind {
    Text,
    Number,
    Boolean,
    Select,
    /// Function-typed fields get no control
    Function,
}

impl PropertyKind {
    fn expected(&self) -> &'static str {
        match self {
            PropertyKind::Text | PropertyKind::Select => "string",
            PropertyKind::Number => "number",
            PropertyKind::Boolean => "boolean",
            PropertyKind::Function => "function",
        }
    }
}

/// One editable property inferred from the props declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyDefinition {
    pub name: String,
    pub kind: PropertyKind,
    pub default: Value,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    pub required: bool,
}

impl PropertyDefinition {
    /// Whether the property starts out in the active bag
    pub fn enabled_by_default(&self) -> bool {
        self.required || self.name == "children"
    }

    /// Check that `value` fits this property's control
    pub fn validate(&self, value: &Value) -> Result<(), PropertyError> {
        let fits = match self.kind {
            PropertyKind::Text => value.is_string(),
            PropertyKind::Number => value.is_number(),
            PropertyKind::Boolean => value.is_boolean(),
            PropertyKind::Select => value.is_string(),
            PropertyKind::Function => false,
        };
        if !fits {
            return Err(PropertyError::KindMismatch {
                name: self.name.clone(),
                expected: self.kind.expected(),
            });
        }
        if self.kind == PropertyKind::Select {
            let chosen = value.as_str().unwrap_or_default();
            if !self.options.iter().any(|option| option == chosen) {
                return Err(PropertyError::InvalidOption {
                    name: self.name.clone(),
                    value: chosen.to_string(),
                    options: self.options.join(", "),
                });
            }
        }
        Ok(())
    }
}

/// Property values handed to the component, keyed by name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PropertyBag(BTreeMap<String, Value>);

impl PropertyBag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(name.into(), value)
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.0.remove(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// JSON object literal of the bag
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.0)
    }
}

/// Infer the editable properties of `component` from its source.
///
/// `<component>Props` is preferred; otherwise the first `*Props` declaration
/// is used. Function-typed fields are left out.
pub fn infer_properties(source: &str, component: Option<&str>) -> Vec<PropertyDefinition> {
    let Some(body) = props_body(source, component) else {
        return Vec::new();
    };

    let mut definitions: Vec<PropertyDefinition> = Vec::new();
    for member in split_members(body) {
        let Some(definition) = parse_member(&member) else {
            continue;
        };
        if definition.kind == PropertyKind::Function {
            log::trace!("Skipping function-typed property '{}'", definition.name);
            continue;
        }
        if definitions.iter().all(|d| d.name != definition.name) {
            definitions.push(definition);
        }
    }
    definitions
}

fn props_body<'a>(source: &'a str, component: Option<&str>) -> Option<&'a str> {
    let preferred = component.map(|name| format!("{}Props", name));
    let mut fallback = None;
    for caps in PROPS_DECLARATION.captures_iter(source) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1).or_else(|| caps.get(2))) else {
            continue;
        };
        let open = whole.end() - 1;
        let Ok(end) = matching_bracket_end(source, open) else {
            continue;
        };
        let body = &source[open + 1..end - 1];
        if preferred.as_deref() == Some(name.as_str()) {
            return Some(body);
        }
        fallback.get_or_insert(body);
    }
    fallback
}

/// Split a type literal body into members at top-level `;`, `,` and line
/// breaks, keeping multi-line unions together
fn split_members(body: &str) -> Vec<String> {
    let bytes = body.as_bytes();
    let mut members = Vec::new();
    let mut current = String::new();
    let mut depth = 0i32;
    let mut pos = 0;

    let mut flush = |current: &mut String| {
        let member = current.trim();
        if !member.is_empty() {
            members.push(member.to_string());
        }
        current.clear();
    };

    while pos < bytes.len() {
        let b = bytes[pos];
        match b {
            b'\'' | b'"' | b'`' => {
                let end = if b == b'`' {
                    body[pos + 1..].find('`').map_or(body.len(), |i| pos + i + 2)
                } else {
                    string_end(body, pos).unwrap_or(body.len())
                };
                current.push_str(&body[pos..end]);
                pos = end;
                continue;
            }
            b'/' if bytes.get(pos + 1) == Some(&b'/') => {
                pos = line_comment_end(bytes, pos);
                continue;
            }
            b'/' if bytes.get(pos + 1) == Some(&b'*') => {
                pos = block_comment_end(body, pos).unwrap_or(body.len());
                continue;
            }
            b'(' | b'[' | b'{' | b'<' => depth += 1,
            b')' | b']' | b'}' => depth -= 1,
            b'>' if pos > 0 && bytes[pos - 1] != b'=' => depth -= 1,
            b';' | b',' if depth <= 0 => {
                flush(&mut current);
                pos += 1;
                continue;
            }
            b'\n' if depth <= 0 => {
                let trimmed = current.trim_end();
                let open_ended = trimmed.ends_with(['|', '&', ':']) || trimmed.ends_with("=>");
                let continued = bytes[pos..]
                    .iter()
                    .find(|c| !c.is_ascii_whitespace())
                    .is_some_and(|c| matches!(c, b'|' | b'&'));
                if !open_ended && !continued {
                    flush(&mut current);
                    pos += 1;
                    continue;
                }
            }
            _ => {}
        }
        let run_end = pos + utf8_len(b);
        current.push_str(&body[pos..run_end.min(body.len())]);
        pos = run_end;
    }
    flush(&mut current);
    members
}

fn utf8_len(first: u8) -> usize {
    match first {
        0x00..=0x7F => 1,
        0xC0..=0xDF => 2,
        0xE0..=0xEF => 3,
        _ => 4,
    }
}

fn parse_member(member: &str) -> Option<PropertyDefinition> {
    let caps = MEMBER.captures(member)?;
    let name = caps
        .get(1)
        .or_else(|| caps.get(2))
        .or_else(|| caps.get(3))?
        .as_str()
        .to_string();
    let required = caps.get(4).is_none();
    let marker = caps.get(5)?;

    if marker.as_str() == "(" {
        return Some(PropertyDefinition {
            name,
            kind: PropertyKind::Function,
            default: Value::Null,
            options: Vec::new(),
            required,
        });
    }

    let type_text = member[marker.end()..].trim();
    let (kind, options, literal_default) = classify(type_text);
    let default = default_value(&name, kind, &options, literal_default, type_text);
    Some(PropertyDefinition {
        name,
        kind,
        default,
        options,
        required,
    })
}

/// Top-level union members of a type, without `undefined`/`null`
fn union_members(type_text: &str) -> Vec<String> {
    let bytes = type_text.as_bytes();
    let mut members = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    let mut pos = 0;
    while pos < bytes.len() {
        match bytes[pos] {
            b'\'' | b'"' => {
                pos = string_end(type_text, pos).unwrap_or(type_text.len());
                continue;
            }
            b'(' | b'[' | b'{' | b'<' => depth += 1,
            b')' | b']' | b'}' => depth -= 1,
            b'>' if pos > 0 && bytes[pos - 1] != b'=' => depth -= 1,
            b'|' if depth == 0 => {
                members.push(type_text[start..pos].trim().to_string());
                start = pos + 1;
            }
            _ => {}
        }
        pos += 1;
    }
    members.push(type_text[start..].trim().to_string());
    members
        .into_iter()
        .filter(|m| !m.is_empty() && m != "undefined" && m != "null")
        .collect()
}

fn is_function_type(member: &str) -> bool {
    if member == "Function" || member.starts_with("Function<") {
        return true;
    }
    // `=>` outside any brackets: `(e) => void`, `() => Promise<void>`
    let bytes = member.as_bytes();
    let mut depth = 0i32;
    for (i, &b) in bytes.iter().enumerate() {
        match b {
            b'(' | b'[' | b'{' | b'<' => depth += 1,
            b')' | b']' | b'}' => depth -= 1,
            b'>' if i > 0 && bytes[i - 1] == b'=' && depth == 0 => return true,
            b'>' => depth -= 1,
            _ => {}
        }
    }
    false
}

fn string_literal(member: &str) -> Option<&str> {
    let quoted = (member.starts_with('\'') && member.ends_with('\''))
        || (member.starts_with('"') && member.ends_with('"'));
    (quoted && member.len() >= 2).then(|| &member[1..member.len() - 1])
}

fn classify(type_text: &str) -> (PropertyKind, Vec<String>, Option<Value>) {
    let type_text = type_text.trim_start_matches('|').trim();
    let inner = type_text
        .strip_prefix('(')
        .and_then(|t| t.strip_suffix(')'))
        .filter(|t| !t.contains("=>"))
        .unwrap_or(type_text);
    let members = union_members(inner);

    if members.iter().any(|m| is_function_type(m)) {
        return (PropertyKind::Function, Vec::new(), None);
    }
    if !members.is_empty() && members.iter().all(|m| m == "boolean" || m == "true" || m == "false") {
        return (PropertyKind::Boolean, Vec::new(), None);
    }
    if members == ["number"] {
        return (PropertyKind::Number, Vec::new(), None);
    }
    if !members.is_empty() && members.iter().all(|m| NUMBER_LITERAL.is_match(m)) {
        let first = members[0].parse::<f64>().ok().and_then(serde_json::Number::from_f64);
        return (PropertyKind::Number, Vec::new(), first.map(Value::Number));
    }
    let literals: Option<Vec<String>> = members
        .iter()
        .map(|m| string_literal(m).map(str::to_string))
        .collect();
    match literals {
        Some(options) if !options.is_empty() => (PropertyKind::Select, options, None),
        _ => (PropertyKind::Text, Vec::new(), None),
    }
}

fn default_value(
    name: &str,
    kind: PropertyKind,
    options: &[String],
    literal_default: Option<Value>,
    type_text: &str,
) -> Value {
    match kind {
        PropertyKind::Boolean => Value::Bool(false),
        PropertyKind::Number => literal_default.unwrap_or_else(|| Value::from(0)),
        PropertyKind::Function => Value::Null,
        PropertyKind::Select => {
            let preferred = (name == "size" && options.iter().any(|o| o == "md")).then_some("md");
            Value::String(preferred.or(options.first().map(String::as_str)).unwrap_or_default().to_string())
        }
        PropertyKind::Text => {
            let text = match name {
                "children" => "Button Text",
                "title" => "Component Title",
                "description" => "This is a description text",
                "label" => "Label",
                "placeholder" => "Enter text...",
                _ if type_text.contains("ReactNode") || type_text.contains("JSX.Element") => "Content",
                _ => "",
            };
            Value::String(text.to_string())
        }
    }
}

/// Inferred definitions plus the active property bag
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertyPanel {
    definitions: Vec<PropertyDefinition>,
    bag: PropertyBag,
}

impl PropertyPanel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn definitions(&self) -> &[PropertyDefinition] {
        &self.definitions
    }

    pub fn bag(&self) -> &PropertyBag {
        &self.bag
    }

    pub fn definition(&self, name: &str) -> Option<&PropertyDefinition> {
        self.definitions.iter().find(|d| d.name == name)
    }

    pub fn is_enabled(&self, name: &str) -> bool {
        self.bag.contains(name)
    }

    /// Replace the definitions after the source changed.
    ///
    /// Newly discovered required fields (and `children`) get their defaults,
    /// values of fields that still exist are kept when they still fit, and
    /// values of vanished fields are dropped.
    pub fn reconcile(&mut self, definitions: Vec<PropertyDefinition>) {
        let mut bag = PropertyBag::new();
        for definition in &definitions {
            let known = self.definition(&definition.name).is_some();
            match self.bag.get(&definition.name) {
                Some(value) if definition.validate(value).is_ok() => {
                    bag.insert(definition.name.clone(), value.clone());
                }
                Some(_) => {
                    bag.insert(definition.name.clone(), definition.default.clone());
                }
                None if !known && definition.enabled_by_default() => {
                    bag.insert(definition.name.clone(), definition.default.clone());
                }
                None => {}
            }
        }
        log::debug!(
            "Reconciled {} properties ({} active)",
            definitions.len(),
            bag.len()
        );
        self.definitions = definitions;
        self.bag = bag;
    }

    /// Include an optional property with its default value
    pub fn enable(&mut self, name: &str) -> Result<(), PropertyError> {
        let definition = self
            .definition(name)
            .ok_or_else(|| PropertyError::Unknown(name.to_string()))?;
        if !self.bag.contains(name) {
            let default = definition.default.clone();
            self.bag.insert(name, default);
        }
        Ok(())
    }

    /// Remove a property from the bag so the component sees it as absent
    pub fn disable(&mut self, name: &str) -> Result<(), PropertyError> {
        if self.definition(name).is_none() {
            return Err(PropertyError::Unknown(name.to_string()));
        }
        self.bag.remove(name);
        Ok(())
    }

    /// Set a property value, enabling it if needed
    pub fn set(&mut self, name: &str, value: Value) -> Result<(), PropertyError> {
        let definition = self
            .definition(name)
            .ok_or_else(|| PropertyError::Unknown(name.to_string()))?;
        definition.validate(&value)?;
        self.bag.insert(name, value);
        Ok(())
    }

    /// Back to the defaults of required fields and `children`
    pub fn reset(&mut self) {
        self.bag = self
            .definitions
            .iter()
            .filter(|d| d.enabled_by_default())
            .map(|d| (d.name.clone(), d.default.clone()))
            .fold(PropertyBag::new(), |mut bag, (name, value)| {
                bag.insert(name, value);
                bag
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const BUTTON: &str = r#"
interface ButtonProps {
  variant: 'primary' | 'secondary';
  size?: number;
}
export const Button = ({ variant, size }: ButtonProps) => <button>{variant}</button>;
"#;

    #[test]
    fn test_variant_and_optional_size() {
        let definitions = infer_properties(BUTTON, Some("Button"));
        assert_eq!(
            definitions,
            vec![
                PropertyDefinition {
                    name: "variant".into(),
                    kind: PropertyKind::Select,
                    default: json!("primary"),
                    options: vec!["primary".into(), "secondary".into()],
                    required: true,
                },
                PropertyDefinition {
                    name: "size".into(),
                    kind: PropertyKind::Number,
                    default: json!(0),
                    options: vec![],
                    required: false,
                },
            ]
        );

        let mut panel = PropertyPanel::new();
        panel.reconcile(definitions);
        assert_eq!(panel.bag().to_json().unwrap(), r#"{"variant":"primary"}"#);
    }

    #[test]
    fn test_type_detection() {
        let source = r#"
type CardProps = {
  title: string
  elevated?: boolean
  onClick?: () => void
  onHover(event: MouseEvent): void
  tone?:
    | "info"
    | "warning"
  cols: 1 | 2 | 3,
  children: React.ReactNode;
  renderItem: (item: { id: number }) => JSX.Element;
  isOpen: boolean | undefined;
  meta?: Record<string, boolean>;
}
"#;
        let definitions = infer_properties(source, None);
        let kinds: Vec<(&str, PropertyKind)> =
            definitions.iter().map(|d| (d.name.as_str(), d.kind)).collect();
        assert_eq!(
            kinds,
            vec![
                ("title", PropertyKind::Text),
                ("elevated", PropertyKind::Boolean),
                ("tone", PropertyKind::Select),
                ("cols", PropertyKind::Number),
                ("children", PropertyKind::Text),
                ("isOpen", PropertyKind::Boolean),
                ("meta", PropertyKind::Text),
            ]
        );
        assert_eq!(definitions[0].default, json!("Component Title"));
        assert_eq!(definitions[2].options, vec!["info", "warning"]);
        assert_eq!(definitions[3].default, json!(1.0));
        assert_eq!(definitions[4].default, json!("Button Text"));
    }

    #[test]
    fn test_prefers_component_props() {
        let source = "interface IconProps { glyph: string }\ninterface CardProps { heading: string }";
        let definitions = infer_properties(source, Some("Card"));
        assert_eq!(definitions[0].name, "heading");
        assert_eq!(infer_properties(source, Some("Other"))[0].name, "glyph");
        assert!(infer_properties("const A = 1;", None).is_empty());
    }

    #[test]
    fn test_reconcile_keeps_drops_and_adds() {
        let mut panel = PropertyPanel::new();
        panel.reconcile(infer_properties(
            "interface AProps { label: string; count: number; hint?: string }",
            None,
        ));
        panel.set("label", json!("Custom")).unwrap();
        panel.enable("hint").unwrap();

        panel.reconcile(infer_properties(
            "interface AProps { label: string; hint?: string; active: boolean }",
            None,
        ));
        assert_eq!(panel.bag().get("label"), Some(&json!("Custom")));
        assert_eq!(panel.bag().get("hint"), Some(&json!("")));
        assert_eq!(panel.bag().get("active"), Some(&json!(false)));
        assert!(!panel.is_enabled("count"));
    }

    #[test]
    fn test_removed_required_field_leaves_bag() {
        let mut panel = PropertyPanel::new();
        panel.reconcile(infer_properties("interface XProps { a: string; b: number }", None));
        assert!(panel.is_enabled("b"));
        panel.reconcile(infer_properties("interface XProps { a: string }", None));
        assert!(!panel.is_enabled("b"));
        assert_eq!(panel.bag().len(), 1);
    }

    #[test]
    fn test_disable_removes_key() {
        let mut panel = PropertyPanel::new();
        panel.reconcile(infer_properties(BUTTON, None));
        panel.disable("variant").unwrap();
        assert!(panel.bag().is_empty());
        assert_eq!(panel.bag().to_json().unwrap(), "{}");
    }

    #[test]
    fn test_setter_validation() {
        let mut panel = PropertyPanel::new();
        panel.reconcile(infer_properties(BUTTON, None));
        assert!(matches!(
            panel.set("variant", json!("ghost")),
            Err(PropertyError::InvalidOption { .. })
        ));
        assert!(matches!(
            panel.set("size", json!("big")),
            Err(PropertyError::KindMismatch { expected: "number", .. })
        ));
        assert!(matches!(
            panel.enable("missing"),
            Err(PropertyError::Unknown(_))
        ));
        panel.set("size", json!(3)).unwrap();
        panel.reset();
        assert_eq!(panel.bag().to_json().unwrap(), r#"{"variant":"primary"}"#);
    }
}
