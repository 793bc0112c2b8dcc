//! Code Normalizer
//!
//! Turns generated component source into a plain script body:
//!
//! 1. the primary component name is resolved from the raw text
//! 2. module syntax (imports, exports, interfaces, type aliases) is removed
//! 3. JSX is lowered to `React.createElement` calls
//! 4. inline type annotations are stripped
//!
//! Every step is a pure function of its input, so normalizing the same text
//! twice yields byte-identical output.

mod jsx;
pub(crate) mod scan;
mod types;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::NormalizeError;
use crate::source::SourceDocument;

use scan::{
    block_comment_end, line_comment_end, matching_bracket_end, string_end, template_end, Token,
    TokenKind,
};

/// Binding introduced for anonymous default exports
pub const ANONYMOUS_DEFAULT: &str = "__forgeDefault";

/// Result of normalizing one source document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedProgram {
    /// Runnable script body
    pub body: String,
    /// Name of the primary component declared in `body`
    pub component_name: String,
}

/// Which pattern resolved the primary symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamePattern {
    /// `export default Name;` at the end of the file
    DefaultTrailer,
    /// `export const Name` / `export function Name` / `export class Name`
    NamedExport,
    /// `export default function Name`
    DefaultDeclaration,
    /// a declaration later exported by a bare `export default Name`
    DeclaredThenExported,
    /// `export default function (...)` or `export default () => ...`
    AnonymousDefault,
    /// first top-level declaration
    FirstDeclaration,
}

const IDENT: &str = r"[A-Za-z_$][\w$]*";

static DEFAULT_TRAILER: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"export\s+default\s+({IDENT})\s*;?\s*$")).unwrap());
static NAMED_EXPORT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"export\s+(?:async\s+|abstract\s+)?(?:const|function|class)\s+({IDENT})"
    ))
    .unwrap()
});
static DEFAULT_DECLARATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"export\s+default\s+(?:async\s+)?(?:function|class)\s+({IDENT})")).unwrap()
});
static BARE_DEFAULT: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"export\s+default\s+({IDENT})\b")).unwrap());
static ANONYMOUS_DEFAULT_EXPORT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"export\s+default\s+(?:async\s+)?(?:function\s*\(|\(|class\s*\{)").unwrap()
});
static FIRST_DECLARATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?m)^(?:export\s+(?:default\s+)?)?(?:async\s+|abstract\s+)?(?:const|function|class)\s+({IDENT})"
    ))
    .unwrap()
});

static IMPORT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?m)^[ \t]*import\s+(?:type\s+)?[^;'"]*?\s*from\s*['"][^'"\n]*['"][ \t]*;?"#)
        .unwrap()
});
static SIDE_EFFECT_IMPORT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?m)^[ \t]*import\s*['"][^'"\n]*['"][ \t]*;?"#).unwrap());
static INTERFACE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?m)^[ \t]*(?:export\s+)?(?:declare\s+)?interface\s+{IDENT}"
    ))
    .unwrap()
});
static TYPE_ALIAS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?m)^[ \t]*(?:export\s+)?(?:declare\s+)?type\s+{IDENT}\s*(?:<[^;\n]*?>\s*)?="
    ))
    .unwrap()
});
static ENUM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?m)^([ \t]*)(?:export\s+)?(?:declare\s+)?(?:const\s+)?enum\s+({IDENT})\s*\{{"
    ))
    .unwrap()
});
static EXPORT_LIST: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?m)^[ \t]*export\s+(?:type\s+)?(?:\{[^}]*\}|\*(?:\s+as\s+[\w$]+)?)(?:\s*from\s*['"][^'"\n]*['"])?[ \t]*;?"#,
    )
    .unwrap()
});
static DECLARE_STATEMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^[ \t]*declare\s+(?:const|let|var|function|module|global)\b[^;\n]*;?").unwrap()
});
static BARE_DEFAULT_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"(?m)^[ \t]*export\s+default\s+({IDENT})[ \t]*;?[ \t]*$")).unwrap()
});
static DEFAULT_EXPORT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^([ \t]*)export\s+default\s+").unwrap());
static DECLARATION_EXPORT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^([ \t]*)export\s+(const|let|var|function|class|async|abstract)\b").unwrap()
});

/// Words that can follow `export default` without being the exported name
fn is_declaration_keyword(word: &str) -> bool {
    matches!(word, "function" | "class" | "async" | "const" | "let" | "var" | "abstract" | "interface")
}

/// Normalize a source document
pub fn normalize(source: &SourceDocument) -> Result<NormalizedProgram, NormalizeError> {
    normalize_text(source.text())
}

/// Normalize raw component source
pub fn normalize_text(text: &str) -> Result<NormalizedProgram, NormalizeError> {
    let (component_name, pattern) = resolve_component_name(text)?;
    log::debug!("Resolved component '{}' via {:?}", component_name, pattern);

    let body = strip_module_syntax(text)?;
    let body = jsx::lower_jsx(&body)?;
    let body = types::strip_type_annotations(&body)?;

    Ok(NormalizedProgram {
        body: body.trim().to_string(),
        component_name,
    })
}

/// Resolve the primary component name, trying each pattern in order
pub fn resolve_component_name(text: &str) -> Result<(String, NamePattern), NormalizeError> {
    if let Some(name) = first(&DEFAULT_TRAILER, text.trim_end()) {
        return Ok((name, NamePattern::DefaultTrailer));
    }
    if let Some(name) = first(&NAMED_EXPORT, text) {
        return Ok((name, NamePattern::NamedExport));
    }
    if let Some(name) = first(&DEFAULT_DECLARATION, text) {
        return Ok((name, NamePattern::DefaultDeclaration));
    }
    let declared_then_exported = BARE_DEFAULT
        .captures_iter(text)
        .map(|caps| caps[1].to_string())
        .filter(|name| !is_declaration_keyword(name))
        .find(|name| is_declared(text, name));
    if let Some(name) = declared_then_exported {
        return Ok((name, NamePattern::DeclaredThenExported));
    }
    if ANONYMOUS_DEFAULT_EXPORT.is_match(text) {
        return Ok((ANONYMOUS_DEFAULT.to_string(), NamePattern::AnonymousDefault));
    }
    if let Some(name) = first(&FIRST_DECLARATION, text) {
        return Ok((name, NamePattern::FirstDeclaration));
    }
    Err(NormalizeError::NameResolution)
}

fn first(re: &Regex, haystack: &str) -> Option<String> {
    re.captures_iter(haystack)
        .map(|caps| caps[1].to_string())
        .find(|name| !is_declaration_keyword(name))
}

fn is_declared(text: &str, name: &str) -> bool {
    let pattern = format!(r"\b(?:const|let|var|function|class)\s+{}\b", regex::escape(name));
    Regex::new(&pattern).is_ok_and(|re| re.is_match(text))
}

/// Remove imports, exports and type-only declarations
pub(crate) fn strip_module_syntax(text: &str) -> Result<String, NormalizeError> {
    let text = IMPORT.replace_all(text, "");
    let text = SIDE_EFFECT_IMPORT.replace_all(&text, "");
    let text = remove_declarations(&text, &INTERFACE, interface_end)?;
    let text = remove_declarations(&text, &TYPE_ALIAS, type_alias_end)?;
    let text = lower_enums(&text)?;
    let text = EXPORT_LIST.replace_all(&text, "");
    let text = DECLARE_STATEMENT.replace_all(&text, "");
    let text = BARE_DEFAULT_LINE.replace_all(&text, |caps: &regex::Captures<'_>| {
        if is_declaration_keyword(&caps[1]) {
            caps[0].to_string()
        } else {
            String::new()
        }
    });
    let text = rewrite_default_exports(&text);
    let text = DECLARATION_EXPORT.replace_all(&text, "$1$2");
    Ok(text.into_owned())
}

/// Remove every top-level declaration whose header matches `header`, using
/// `end` to find where the declaration body stops
fn remove_declarations(
    text: &str,
    header: &Regex,
    end: fn(&str, usize) -> Result<usize, NormalizeError>,
) -> Result<String, NormalizeError> {
    let mut out = String::with_capacity(text.len());
    let mut copied = 0;
    let mut search = 0;
    while let Some(m) = header.find_at(text, search) {
        if !is_top_level(text, m.start()) {
            // JSX text such as "type your name" inside a component
            search = m.end();
            continue;
        }
        let stop = end(text, m.end())?;
        out.push_str(&text[copied..m.start()]);
        copied = stop;
        search = stop;
    }
    out.push_str(&text[copied..]);
    Ok(out)
}

/// Whether `pos` sits outside every bracket. Quotes that do not close on
/// their line (apostrophes in JSX text) count as plain characters.
fn is_top_level(text: &str, pos: usize) -> bool {
    let bytes = text.as_bytes();
    let mut depth = 0i32;
    let mut i = 0;
    while i < pos {
        let skip_to = match bytes[i] {
            b'\'' | b'"' => string_end(text, i).ok(),
            b'`' => template_end(text, i).ok(),
            b'/' if bytes.get(i + 1) == Some(&b'/') => Some(line_comment_end(bytes, i)),
            b'/' if bytes.get(i + 1) == Some(&b'*') => block_comment_end(text, i).ok(),
            b'(' | b'[' | b'{' => {
                depth += 1;
                None
            }
            b')' | b']' | b'}' => {
                depth -= 1;
                None
            }
            _ => None,
        };
        i = skip_to.unwrap_or(i + 1);
    }
    depth <= 0
}

/// Rewrite top-level `enum` declarations as frozen object literals
fn lower_enums(text: &str) -> Result<String, NormalizeError> {
    let mut out = String::with_capacity(text.len());
    let mut copied = 0;
    let mut search = 0;
    while let Some(caps) = ENUM.captures_at(text, search) {
        let (Some(whole), Some(indent), Some(name)) = (caps.get(0), caps.get(1), caps.get(2)) else {
            break;
        };
        if !is_top_level(text, whole.start()) {
            search = whole.end();
            continue;
        }
        let open = whole.end() - 1;
        let close = matching_bracket_end(text, open)?;
        let members = enum_members(text, open + 1, close - 1)?;

        out.push_str(&text[copied..whole.start()]);
        out.push_str(indent.as_str());
        out.push_str("const ");
        out.push_str(name.as_str());
        out.push_str(" = Object.freeze({ ");
        let entries: Vec<String> = members
            .iter()
            .map(|(key, value)| format!("{}: {}", key, value))
            .collect();
        out.push_str(&entries.join(", "));
        out.push_str(" })");
        copied = if text[close..].starts_with(';') { close + 1 } else { close };
        out.push(';');
        search = copied;
    }
    out.push_str(&text[copied..]);
    Ok(out)
}

/// `(key, value)` pairs of the enum body `text[start..end]`; members without
/// an initializer count up from the previous one
fn enum_members(text: &str, start: usize, end: usize) -> Result<Vec<(String, String)>, NormalizeError> {
    let body = &text[start..end];
    let tokens: Vec<Token> = scan::tokenize(body)?
        .into_iter()
        .filter(|t| !t.is_trivia())
        .collect();

    let mut members = Vec::new();
    let mut previous: Option<String> = None;
    let mut k = 0;
    while k < tokens.len() {
        let key = &body[tokens[k].start..tokens[k].end];
        if !matches!(tokens[k].kind, TokenKind::Ident | TokenKind::Str) {
            return Err(NormalizeError::syntax_at(
                text,
                start + tokens[k].start,
                "unexpected token in enum body",
            ));
        }
        k += 1;

        let value = if k < tokens.len() && &body[tokens[k].start..tokens[k].end] == "=" {
            let first = k + 1;
            let mut depth = 0i32;
            k = first;
            while k < tokens.len() {
                match &body[tokens[k].start..tokens[k].end] {
                    "(" | "[" | "{" => depth += 1,
                    ")" | "]" | "}" => depth -= 1,
                    "," if depth == 0 => break,
                    _ => {}
                }
                k += 1;
            }
            if first == k {
                return Err(NormalizeError::syntax_at(text, start, "enum member without a value"));
            }
            body[tokens[first].start..tokens[k - 1].end].to_string()
        } else {
            match &previous {
                None => "0".to_string(),
                Some(prev) => match prev.parse::<i64>() {
                    Ok(n) => (n + 1).to_string(),
                    Err(_) => format!("({}) + 1", prev),
                },
            }
        };

        previous = Some(value.clone());
        members.push((key.to_string(), value));
        if k < tokens.len() && &body[tokens[k].start..tokens[k].end] == "," {
            k += 1;
        }
    }
    Ok(members)
}

fn interface_end(text: &str, pos: usize) -> Result<usize, NormalizeError> {
    let open = text[pos..]
        .find('{')
        .map(|offset| pos + offset)
        .ok_or_else(|| NormalizeError::syntax_at(text, pos, "interface without a body"))?;
    let end = matching_bracket_end(text, open)?;
    Ok(if text[end..].starts_with(';') { end + 1 } else { end })
}

/// End of a type alias: a `;` at depth zero, or a line break that is not
/// followed or preceded by a union/intersection continuation
fn type_alias_end(text: &str, mut pos: usize) -> Result<usize, NormalizeError> {
    let bytes = text.as_bytes();
    let mut depth = 0i32;
    let mut last = 0u8;
    let mut after_arrow = false;
    while pos < bytes.len() {
        let b = bytes[pos];
        match b {
            b'\'' | b'"' => {
                pos = string_end(text, pos)?;
                last = b;
                continue;
            }
            b'`' => {
                pos = template_end(text, pos)?;
                last = b;
                continue;
            }
            b'/' if bytes.get(pos + 1) == Some(&b'/') => {
                pos = line_comment_end(bytes, pos);
                continue;
            }
            b'/' if bytes.get(pos + 1) == Some(&b'*') => {
                pos = block_comment_end(text, pos)?;
                continue;
            }
            b'(' | b'[' | b'{' | b'<' => depth += 1,
            b')' | b']' | b'}' => {
                depth -= 1;
                if depth < 0 {
                    return Ok(pos);
                }
            }
            b'>' if pos > 0 && bytes[pos - 1] == b'=' => after_arrow = true,
            b'>' => depth -= 1,
            b';' if depth <= 0 => return Ok(pos + 1),
            b'\n' if depth <= 0 => {
                let trailing = matches!(last, b'=' | b'|' | b'&' | b',' | b':') || after_arrow;
                let leading = bytes[pos..]
                    .iter()
                    .find(|c| !c.is_ascii_whitespace())
                    .is_some_and(|c| matches!(c, b'|' | b'&'));
                if last != 0 && !trailing && !leading {
                    return Ok(pos);
                }
            }
            _ => {}
        }
        if !b.is_ascii_whitespace() {
            if b != b'>' {
                after_arrow = false;
            }
            last = b;
        }
        pos += 1;
    }
    Ok(pos)
}

/// `export default function Name` keeps the declaration; anything else becomes
/// a binding named [`ANONYMOUS_DEFAULT`]
fn rewrite_default_exports(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    for caps in DEFAULT_EXPORT.captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        let indent = caps.get(1).map_or("", |m| m.as_str());
        out.push_str(&text[cursor..whole.start()]);
        out.push_str(indent);
        if !declares_name(&text[whole.end()..]) {
            out.push_str("const ");
            out.push_str(ANONYMOUS_DEFAULT);
            out.push_str(" = ");
        }
        cursor = whole.end();
    }
    out.push_str(&text[cursor..]);
    out
}

/// Whether `rest` starts with a named function or class declaration
fn declares_name(rest: &str) -> bool {
    static NAMED: Lazy<Regex> = Lazy::new(|| {
        Regex::new(&format!(r"^(?:async\s+)?(?:function\s*\*?\s*|class\s+){IDENT}")).unwrap()
    });
    NAMED.is_match(rest) && !rest.starts_with("class extends") && !rest.starts_with("class{")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(text: &str) -> String {
        resolve_component_name(text).unwrap().0
    }

    #[test]
    fn test_default_trailer_wins() {
        let text = "export const helper = () => 1;\nconst Card = () => null;\nexport default Card;\n";
        assert_eq!(
            resolve_component_name(text).unwrap(),
            ("Card".to_string(), NamePattern::DefaultTrailer)
        );
    }

    #[test]
    fn test_named_export() {
        assert_eq!(name("export const Foo = () => <div>Hi</div>;"), "Foo");
        assert_eq!(name("export function Bar() { return null }"), "Bar");
    }

    #[test]
    fn test_default_declaration() {
        assert_eq!(
            resolve_component_name("export default function Hero() { return null; }").unwrap(),
            ("Hero".to_string(), NamePattern::DefaultDeclaration)
        );
    }

    #[test]
    fn test_declared_then_exported_before_trailing_comment() {
        let text = "function Panel() { return null; }\nexport default Panel\n// footer note";
        assert_eq!(
            resolve_component_name(text).unwrap(),
            ("Panel".to_string(), NamePattern::DeclaredThenExported)
        );
    }

    #[test]
    fn test_first_declaration_fallback() {
        let text = "const helper = 1;\nfunction Widget() { return null; }";
        assert_eq!(
            resolve_component_name(text).unwrap(),
            ("helper".to_string(), NamePattern::FirstDeclaration)
        );
    }

    #[test]
    fn test_exported_class() {
        let text = "interface S { n: number }\nexport class Counter extends React.Component<{}, S> {\n  render() { return null; }\n}";
        assert_eq!(
            resolve_component_name(text).unwrap(),
            ("Counter".to_string(), NamePattern::NamedExport)
        );
        assert_eq!(
            resolve_component_name("const x = 1;\nexport default class Panel {}").unwrap(),
            ("Panel".to_string(), NamePattern::DefaultDeclaration)
        );
        assert_eq!(
            resolve_component_name("// helpers\nexport async function load() {}").unwrap(),
            ("load".to_string(), NamePattern::NamedExport)
        );
    }

    #[test]
    fn test_first_declaration_accepts_export_prefix() {
        let caps = FIRST_DECLARATION
            .captures("// note\nexport class Board {}")
            .unwrap();
        assert_eq!(&caps[1], "Board");
    }

    #[test]
    fn test_no_pattern_fails() {
        assert_eq!(
            resolve_component_name("React.render(<div/>)").unwrap_err(),
            NormalizeError::NameResolution
        );
    }

    #[test]
    fn test_strips_imports_of_every_form() {
        let text = "import React, { useState } from 'react';\nimport * as Icons from \"lucide-react\";\nimport {\n  motion,\n  AnimatePresence\n} from 'framer-motion';\nimport './styles.css';\nimport type { FC } from 'react';\nconst A = 1;";
        assert_eq!(strip_module_syntax(text).unwrap().trim(), "const A = 1;");
    }

    #[test]
    fn test_strips_interfaces_and_type_aliases() {
        let text = "export interface CardProps extends Base {\n  title: string;\n  meta: { a: number };\n}\ntype Variant =\n  | 'primary'\n  | 'secondary';\ntype Size = 'sm' | 'md'\nconst x = 1;";
        assert_eq!(strip_module_syntax(text).unwrap().trim(), "const x = 1;");
    }

    #[test]
    fn test_jsx_text_is_not_a_type_alias() {
        let text = "export const Form = () => (\n  <p>\n    type your name below\n  </p>\n);";
        assert_eq!(strip_module_syntax(text).unwrap(), "const Form = () => (\n  <p>\n    type your name below\n  </p>\n);");

        let text = "function f() {\n  type Local = string;\n}\ntype Top<T = string> = { value: T };\nconst y = 2;";
        let stripped = strip_module_syntax(text).unwrap();
        assert!(stripped.contains("type Local = string;"));
        assert!(!stripped.contains("Top"));
    }

    #[test]
    fn test_enums_become_frozen_objects() {
        let text = "export enum Size {\n  Small, // default\n  Medium = 4,\n  Large,\n}\nconst enum Tone { Warm = 'warm', Cold = \"cold\" }\nconst z = Size.Large;";
        assert_eq!(
            strip_module_syntax(text).unwrap(),
            "const Size = Object.freeze({ Small: 0, Medium: 4, Large: 5 });\nconst Tone = Object.freeze({ Warm: 'warm', Cold: \"cold\" });\nconst z = Size.Large;"
        );
    }

    #[test]
    fn test_rewrites_exports() {
        let text = "export const A = 1;\nexport default function B() {}\nexport { A, B };\nexport default B;";
        assert_eq!(
            strip_module_syntax(text).unwrap().trim(),
            "const A = 1;\nfunction B() {}"
        );
    }

    #[test]
    fn test_anonymous_default_gets_binding() {
        let program = normalize_text("export default function () { return <p>x</p>; }").unwrap();
        assert_eq!(program.component_name, ANONYMOUS_DEFAULT);
        assert!(program.body.starts_with("const __forgeDefault = function () {"));
    }

    #[test]
    fn test_full_normalization() {
        let text = r#"import React from 'react';

interface GreetingProps {
  name: string;
  onClick?: () => void;
}

export const Greeting: React.FC<GreetingProps> = ({ name }: GreetingProps) => {
  const [count, setCount] = useState<number>(0);
  return <div className="greet">Hello {name}</div>;
};
"#;
        let program = normalize_text(text).unwrap();
        assert_eq!(program.component_name, "Greeting");
        assert_eq!(
            program.body,
            "const Greeting = ({ name }) => {\n  const [count, setCount] = useState(0);\n  return React.createElement(\"div\", {\"className\": \"greet\"}, \"Hello \", name);\n};"
        );
    }

    #[test]
    fn test_normalization_is_idempotent() {
        let text = "export const Foo = () => <div>Hi</div>;";
        assert_eq!(normalize_text(text).unwrap(), normalize_text(text).unwrap());
    }
}
