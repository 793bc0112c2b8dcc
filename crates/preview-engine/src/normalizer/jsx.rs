//! JSX lowering
//!
//! Rewrites JSX elements into `React.createElement(type, props, ...children)`
//! calls and copies everything else through untouched. The pass runs before
//! type annotations are stripped, so generic arguments such as
//! `useState<string>()` must not be mistaken for elements: an element can only
//! start where an expression is expected.

use super::scan::{
    block_comment_end, ident_end, is_ident_char, is_ident_start, line_comment_end, regex_end,
    string_end, EXPRESSION_KEYWORDS,
};
use crate::error::NormalizeError;

type Result<T> = std::result::Result<T, NormalizeError>;

/// Lower every JSX element in `src`
pub(crate) fn lower_jsx(src: &str) -> Result<String> {
    let mut lowerer = Lowerer {
        src,
        bytes: src.as_bytes(),
        pos: 0,
        out: String::with_capacity(src.len() + src.len() / 4),
    };
    lowerer.script(false)?;
    Ok(lowerer.out)
}

/// What the previous significant token allows next
#[derive(Clone, Copy, PartialEq, Eq)]
enum Prev {
    /// An operand ended: `<` compares and `/` divides
    Operand,
    /// An operator or opening punctuation: an expression may start
    Operator,
}

enum Attribute {
    Named { key: String, value: String },
    Spread(String),
}

struct Lowerer<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
    out: String,
}

impl<'a> Lowerer<'a> {
    fn error(&self, at: usize, message: &str) -> NormalizeError {
        NormalizeError::syntax_at(self.src, at, message)
    }

    fn copy_to(&mut self, end: usize) {
        self.out.push_str(&self.src[self.pos..end]);
        self.pos = end;
    }

    fn peek(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.pos + offset).copied()
    }

    /// Copy script text. With `in_braces` set, stops after the `}` that closes
    /// the current expression container; that brace is consumed, not copied.
    fn script(&mut self, in_braces: bool) -> Result<()> {
        let start = self.pos;
        let mut depth = 0usize;
        let mut prev = Prev::Operator;

        while self.pos < self.bytes.len() {
            let b = self.bytes[self.pos];
            match b {
                _ if b.is_ascii_whitespace() => self.copy_to(self.pos + 1),
                b'/' if self.peek(1) == Some(b'/') => {
                    let end = line_comment_end(self.bytes, self.pos);
                    self.copy_to(end);
                }
                b'/' if self.peek(1) == Some(b'*') => {
                    let end = block_comment_end(self.src, self.pos)?;
                    self.copy_to(end);
                }
                b'\'' | b'"' => {
                    let end = string_end(self.src, self.pos)?;
                    self.copy_to(end);
                    prev = Prev::Operand;
                }
                b'`' => {
                    self.template()?;
                    prev = Prev::Operand;
                }
                b'/' if prev == Prev::Operator => {
                    let end = regex_end(self.src, self.pos)?;
                    self.copy_to(end);
                    prev = Prev::Operand;
                }
                b'{' => {
                    depth += 1;
                    self.copy_to(self.pos + 1);
                    prev = Prev::Operator;
                }
                b'}' if depth == 0 && in_braces => {
                    self.pos += 1;
                    return Ok(());
                }
                b'}' => {
                    depth = depth.saturating_sub(1);
                    self.copy_to(self.pos + 1);
                    prev = Prev::Operator;
                }
                b'<' if prev == Prev::Operator && self.element_starts_here() => {
                    let element = self.element()?;
                    self.out.push_str(&element);
                    prev = Prev::Operand;
                }
                b')' | b']' => {
                    self.copy_to(self.pos + 1);
                    prev = Prev::Operand;
                }
                b'=' if self.peek(1) == Some(b'>') => {
                    self.copy_to(self.pos + 2);
                    prev = Prev::Operator;
                }
                _ if is_ident_start(b) => {
                    let end = ident_end(self.bytes, self.pos);
                    let word = &self.src[self.pos..end];
                    prev = if EXPRESSION_KEYWORDS.contains(&word) {
                        Prev::Operator
                    } else {
                        Prev::Operand
                    };
                    self.copy_to(end);
                }
                _ if b.is_ascii_digit() => {
                    let mut end = self.pos + 1;
                    while end < self.bytes.len()
                        && (is_ident_char(self.bytes[end]) || self.bytes[end] == b'.')
                    {
                        end += 1;
                    }
                    self.copy_to(end);
                    prev = Prev::Operand;
                }
                _ => {
                    self.copy_to(self.pos + 1);
                    prev = Prev::Operator;
                }
            }
        }

        if in_braces {
            return Err(self.error(start, "unterminated JSX expression container"));
        }
        Ok(())
    }

    /// Copy a template literal, lowering JSX inside `${}` substitutions
    fn template(&mut self) -> Result<()> {
        let start = self.pos;
        self.copy_to(self.pos + 1);
        while self.pos < self.bytes.len() {
            match self.bytes[self.pos] {
                b'\\' => {
                    let end = (self.pos + 2).min(self.bytes.len());
                    self.copy_to(end);
                }
                b'`' => {
                    self.copy_to(self.pos + 1);
                    return Ok(());
                }
                b'$' if self.peek(1) == Some(b'{') => {
                    self.copy_to(self.pos + 2);
                    self.script(true)?;
                    self.out.push('}');
                }
                _ => {
                    let next = self.src[self.pos..]
                        .chars()
                        .next()
                        .map_or(1, char::len_utf8);
                    self.copy_to(self.pos + next);
                }
            }
        }
        Err(self.error(start, "unterminated template literal"))
    }

    /// `<` in expression position: an element, a fragment, or a generic arrow
    fn element_starts_here(&self) -> bool {
        match self.peek(1) {
            Some(b'>') => true,
            Some(b) if is_ident_start(b) => {
                let mut i = self.pos + 1;
                while i < self.bytes.len()
                    && (is_ident_char(self.bytes[i]) || matches!(self.bytes[i], b'.' | b'-' | b':'))
                {
                    i += 1;
                }
                while i < self.bytes.len() && self.bytes[i].is_ascii_whitespace() {
                    i += 1;
                }
                // `<T,>(x) => ...` and `<T extends U>(x) => ...` are generic arrows
                let rest = &self.src[i..];
                !(rest.starts_with(',')
                    || (rest.starts_with("extends")
                        && rest.as_bytes().get(7).is_some_and(|b| !is_ident_char(*b))))
            }
            _ => false,
        }
    }

    /// Run `f` with a fresh output buffer and return what it wrote
    fn capture(&mut self, f: impl FnOnce(&mut Self) -> Result<()>) -> Result<String> {
        let saved = std::mem::take(&mut self.out);
        let result = f(self);
        let captured = std::mem::replace(&mut self.out, saved);
        result.map(|()| captured)
    }

    fn skip_whitespace(&mut self) {
        while self.pos < self.bytes.len() && self.bytes[self.pos].is_ascii_whitespace() {
            self.pos += 1;
        }
    }

    fn tag_name(&mut self) -> &'a str {
        let src: &'a str = self.src;
        let start = self.pos;
        while self.pos < self.bytes.len()
            && (is_ident_char(self.bytes[self.pos])
                || matches!(self.bytes[self.pos], b'.' | b'-' | b':'))
        {
            self.pos += 1;
        }
        &src[start..self.pos]
    }

    /// Lower one element starting at `<`; returns the `createElement` call
    fn element(&mut self) -> Result<String> {
        let start = self.pos;
        self.pos += 1;
        self.skip_whitespace();

        if self.peek(0) == Some(b'>') {
            self.pos += 1;
            let children = self.children(start, "")?;
            return Ok(create_element("React.Fragment", "null", &children));
        }

        let name = self.tag_name();
        let element_type = if is_intrinsic(name) {
            json_string(name)
        } else {
            name.to_string()
        };

        let mut attributes = Vec::new();
        let children = loop {
            self.skip_whitespace();
            match self.peek(0) {
                None => return Err(self.error(start, &format!("unterminated <{}> tag", name))),
                Some(b'/') => {
                    if self.peek(1) != Some(b'>') {
                        return Err(self.error(self.pos, "expected '>' after '/' in tag"));
                    }
                    self.pos += 2;
                    break Vec::new();
                }
                Some(b'>') => {
                    self.pos += 1;
                    break self.children(start, name)?;
                }
                Some(b'{') => {
                    self.pos += 1;
                    self.skip_whitespace();
                    if !self.src[self.pos..].starts_with("...") {
                        return Err(self.error(self.pos, "expected spread attribute"));
                    }
                    self.pos += 3;
                    let expr = self.capture(|l| l.script(true))?;
                    attributes.push(Attribute::Spread(expr.trim().to_string()));
                }
                Some(b) if is_ident_start(b) => {
                    let attr = self.attribute()?;
                    attributes.push(attr);
                }
                Some(_) => {
                    return Err(self.error(self.pos, &format!("unexpected character in <{}> tag", name)))
                }
            }
        };

        Ok(create_element(&element_type, &props_literal(&attributes), &children))
    }

    fn attribute(&mut self) -> Result<Attribute> {
        let key = self.tag_name().to_string();
        self.skip_whitespace();
        if self.peek(0) != Some(b'=') {
            return Ok(Attribute::Named {
                key,
                value: "true".to_string(),
            });
        }
        self.pos += 1;
        self.skip_whitespace();

        let value = match self.peek(0) {
            Some(quote @ (b'"' | b'\'')) => {
                let start = self.pos;
                let close = self.src[start + 1..]
                    .find(quote as char)
                    .ok_or_else(|| self.error(start, "unterminated attribute string"))?;
                let raw = &self.src[start + 1..start + 1 + close];
                self.pos = start + close + 2;
                json_string(&decode_entities(raw))
            }
            Some(b'{') => {
                self.pos += 1;
                let expr = self.capture(|l| l.script(true))?;
                let expr = expr.trim();
                if expr.is_empty() {
                    return Err(self.error(self.pos, "empty expression in attribute"));
                }
                expr.to_string()
            }
            Some(b'<') => self.element()?,
            _ => return Err(self.error(self.pos, &format!("missing value for attribute '{}'", key))),
        };
        Ok(Attribute::Named { key, value })
    }

    /// Collect children up to and including the closing tag of `name`
    fn children(&mut self, open: usize, name: &str) -> Result<Vec<String>> {
        let mut children = Vec::new();
        loop {
            match self.peek(0) {
                None => {
                    let label = if name.is_empty() { "fragment" } else { name };
                    return Err(self.error(open, &format!("unclosed <{}> element", label)));
                }
                Some(b'<') if self.peek(1) == Some(b'/') => {
                    let close_start = self.pos;
                    self.pos += 2;
                    self.skip_whitespace();
                    let closing = self.tag_name();
                    self.skip_whitespace();
                    if self.peek(0) != Some(b'>') {
                        return Err(self.error(close_start, "malformed closing tag"));
                    }
                    self.pos += 1;
                    if closing != name {
                        return Err(self.error(
                            close_start,
                            &format!("expected </{}> but found </{}>", name, closing),
                        ));
                    }
                    return Ok(children);
                }
                Some(b'<') => {
                    let child = self.element()?;
                    children.push(child);
                }
                Some(b'{') => {
                    self.pos += 1;
                    let expr = self.capture(|l| l.script(true))?;
                    if !is_blank_expression(&expr) {
                        children.push(expr.trim().to_string());
                    }
                }
                Some(_) => {
                    let start = self.pos;
                    while self.pos < self.bytes.len() && !matches!(self.bytes[self.pos], b'<' | b'{') {
                        self.pos += 1;
                    }
                    if let Some(text) = clean_text(&self.src[start..self.pos]) {
                        children.push(json_string(&decode_entities(&text)));
                    }
                }
            }
        }
    }
}

fn is_intrinsic(name: &str) -> bool {
    name.as_bytes().first().is_some_and(u8::is_ascii_lowercase) && !name.contains('.')
}

fn create_element(element_type: &str, props: &str, children: &[String]) -> String {
    let mut call = format!("React.createElement({}, {}", element_type, props);
    for child in children {
        call.push_str(", ");
        call.push_str(child);
    }
    call.push(')');
    call
}

fn props_literal(attributes: &[Attribute]) -> String {
    if attributes.is_empty() {
        return "null".to_string();
    }
    let parts: Vec<String> = attributes
        .iter()
        .map(|attr| match attr {
            Attribute::Named { key, value } => format!("{}: {}", json_string(key), value),
            Attribute::Spread(expr) => format!("...{}", expr),
        })
        .collect();
    format!("{{{}}}", parts.join(", "))
}

fn json_string(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}

/// An expression container holding only whitespace and comments
fn is_blank_expression(expr: &str) -> bool {
    let bytes = expr.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i].is_ascii_whitespace() {
            i += 1;
        } else if expr[i..].starts_with("//") {
            i = line_comment_end(bytes, i);
        } else if expr[i..].starts_with("/*") {
            match expr[i + 2..].find("*/") {
                Some(offset) => i += offset + 4,
                None => return false,
            }
        } else {
            return false;
        }
    }
    true
}

/// JSX text whitespace rules: lines are trimmed where they meet line breaks,
/// blank lines vanish, and the remaining lines are joined with single spaces.
fn clean_text(raw: &str) -> Option<String> {
    let lines: Vec<String> = raw
        .split('\n')
        .map(|line| line.trim_end_matches('\r').replace('\t', " "))
        .collect();
    let last_non_empty = lines.iter().rposition(|line| !line.trim().is_empty())?;
    let last = lines.len() - 1;

    let mut text = String::new();
    for (i, line) in lines.iter().enumerate() {
        let mut trimmed = line.as_str();
        if i != 0 {
            trimmed = trimmed.trim_start_matches(' ');
        }
        if i != last {
            trimmed = trimmed.trim_end_matches(' ');
        }
        if !trimmed.is_empty() {
            text.push_str(trimmed);
            if i != last_non_empty {
                text.push(' ');
            }
        }
    }
    (!text.is_empty()).then_some(text)
}

fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let decoded = rest
            .find(';')
            .filter(|&semi| semi <= 10)
            .and_then(|semi| decode_entity(&rest[1..semi]).map(|c| (c, semi)));
        match decoded {
            Some((c, semi)) => {
                out.push(c);
                rest = &rest[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_entity(name: &str) -> Option<char> {
    if let Some(hex) = name.strip_prefix("#x").or_else(|| name.strip_prefix("#X")) {
        return u32::from_str_radix(hex, 16).ok().and_then(char::from_u32);
    }
    if let Some(dec) = name.strip_prefix('#') {
        return dec.parse().ok().and_then(char::from_u32);
    }
    let c = match name {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => '\u{a0}',
        "copy" => '\u{a9}',
        "reg" => '\u{ae}',
        "trade" => '\u{2122}',
        "mdash" => '\u{2014}',
        "ndash" => '\u{2013}',
        "hellip" => '\u{2026}',
        "middot" => '\u{b7}',
        "times" => '\u{d7}',
        "rarr" => '\u{2192}',
        "larr" => '\u{2190}',
        _ => return None,
    };
    Some(c)
}
