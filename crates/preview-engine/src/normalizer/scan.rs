//! Byte-level scanning shared by the JSX lowering and type stripping passes.
//!
//! Every delimiter these passes look at is ASCII, and UTF-8 continuation bytes
//! are never ASCII, so each position handed back here is a valid `str` boundary.

use crate::error::NormalizeError;

/// Keywords after which an expression (and therefore a regex or JSX) may start
pub(crate) const EXPRESSION_KEYWORDS: &[&str] = &[
    "return", "typeof", "instanceof", "in", "of", "new", "delete", "void", "throw", "case", "do",
    "else", "yield", "await", "default",
];

pub(crate) fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_' || b == b'$' || b >= 0x80
}

pub(crate) fn is_ident_char(b: u8) -> bool {
    is_ident_start(b) || b.is_ascii_digit()
}

/// End of the identifier starting at `pos`
pub(crate) fn ident_end(bytes: &[u8], mut pos: usize) -> usize {
    while pos < bytes.len() && is_ident_char(bytes[pos]) {
        pos += 1;
    }
    pos
}

/// End of the quoted string starting at `pos` (which holds the quote)
pub(crate) fn string_end(src: &str, pos: usize) -> Result<usize, NormalizeError> {
    let bytes = src.as_bytes();
    let quote = bytes[pos];
    let mut i = pos + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'\n' => break,
            b if b == quote => return Ok(i + 1),
            _ => i += 1,
        }
    }
    Err(NormalizeError::syntax_at(src, pos, "unterminated string literal"))
}

/// End of the `//` comment starting at `pos` (the newline is not included)
pub(crate) fn line_comment_end(bytes: &[u8], pos: usize) -> usize {
    bytes[pos..]
        .iter()
        .position(|&b| b == b'\n')
        .map_or(bytes.len(), |offset| pos + offset)
}

/// End of the `/* */` comment starting at `pos`
pub(crate) fn block_comment_end(src: &str, pos: usize) -> Result<usize, NormalizeError> {
    src[pos + 2..]
        .find("*/")
        .map(|offset| pos + 2 + offset + 2)
        .ok_or_else(|| NormalizeError::syntax_at(src, pos, "unterminated block comment"))
}

/// End of the regex literal starting at `pos` (flags included)
pub(crate) fn regex_end(src: &str, pos: usize) -> Result<usize, NormalizeError> {
    let bytes = src.as_bytes();
    let mut i = pos + 1;
    let mut in_class = false;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'\n' => break,
            b'[' => {
                in_class = true;
                i += 1;
            }
            b']' => {
                in_class = false;
                i += 1;
            }
            b'/' if !in_class => return Ok(ident_end(bytes, i + 1)),
            _ => i += 1,
        }
    }
    Err(NormalizeError::syntax_at(src, pos, "unterminated regular expression"))
}

/// End of the template literal starting at `pos`, including nested `${}` parts
pub(crate) fn template_end(src: &str, pos: usize) -> Result<usize, NormalizeError> {
    let bytes = src.as_bytes();
    let mut i = pos + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'`' => return Ok(i + 1),
            b'$' if bytes.get(i + 1) == Some(&b'{') => {
                i = substitution_end(src, i + 2)?;
            }
            _ => i += 1,
        }
    }
    Err(NormalizeError::syntax_at(src, pos, "unterminated template literal"))
}

/// Position just past the `}` closing a `${` substitution whose body starts at `pos`
fn substitution_end(src: &str, mut pos: usize) -> Result<usize, NormalizeError> {
    let bytes = src.as_bytes();
    let start = pos;
    let mut depth = 0usize;
    while pos < bytes.len() {
        match bytes[pos] {
            b'\'' | b'"' => pos = string_end(src, pos)?,
            b'`' => pos = template_end(src, pos)?,
            b'/' if bytes.get(pos + 1) == Some(&b'/') => pos = line_comment_end(bytes, pos),
            b'/' if bytes.get(pos + 1) == Some(&b'*') => pos = block_comment_end(src, pos)?,
            b'{' => {
                depth += 1;
                pos += 1;
            }
            b'}' if depth == 0 => return Ok(pos + 1),
            b'}' => {
                depth -= 1;
                pos += 1;
            }
            _ => pos += 1,
        }
    }
    Err(NormalizeError::syntax_at(src, start, "unterminated template substitution"))
}

/// Position just past the bracket matching the one at `pos`, skipping strings and comments
pub(crate) fn matching_bracket_end(src: &str, pos: usize) -> Result<usize, NormalizeError> {
    let bytes = src.as_bytes();
    let mut stack = Vec::new();
    let mut i = pos;
    while i < bytes.len() {
        match bytes[i] {
            b'\'' | b'"' => {
                i = string_end(src, i)?;
                continue;
            }
            b'`' => {
                i = template_end(src, i)?;
                continue;
            }
            b'/' if bytes.get(i + 1) == Some(&b'/') => {
                i = line_comment_end(bytes, i);
                continue;
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                i = block_comment_end(src, i)?;
                continue;
            }
            open @ (b'{' | b'(' | b'[') => stack.push(open),
            close @ (b'}' | b')' | b']') => {
                let expected = match close {
                    b'}' => b'{',
                    b')' => b'(',
                    _ => b'[',
                };
                if stack.pop() != Some(expected) {
                    return Err(NormalizeError::syntax_at(src, i, "unbalanced brackets"));
                }
                if stack.is_empty() {
                    return Ok(i + 1);
                }
            }
            _ => {}
        }
        i += 1;
    }
    Err(NormalizeError::syntax_at(src, pos, "unclosed bracket"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TokenKind {
    Ident,
    Number,
    Str,
    Template,
    Regex,
    Punct,
    Comment,
    Whitespace,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Token {
    pub kind: TokenKind,
    pub start: usize,
    pub end: usize,
}

impl Token {
    pub fn is_trivia(&self) -> bool {
        matches!(self.kind, TokenKind::Comment | TokenKind::Whitespace)
    }
}

/// Multi-byte punctuators, longest first. `>` always stays single so generic
/// argument lists like `Array<Array<T>>` close one level at a time.
const PUNCTUATORS: &[&str] = &[
    "...", "===", "!==", "**=", "<<=", "=>", "==", "!=", "<=", ">=", "&&", "||", "??", "?.", "++",
    "--", "+=", "-=", "*=", "/=", "%=", "&=", "|=", "^=", "**", "<<",
];

/// Tokenize plain JavaScript/TypeScript (no JSX)
pub(crate) fn tokenize(src: &str) -> Result<Vec<Token>, NormalizeError> {
    let bytes = src.as_bytes();
    let mut tokens: Vec<Token> = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        let b = bytes[pos];
        let start = pos;
        let kind = if b.is_ascii_whitespace() {
            while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
                pos += 1;
            }
            TokenKind::Whitespace
        } else if b == b'/' && bytes.get(pos + 1) == Some(&b'/') {
            pos = line_comment_end(bytes, pos);
            TokenKind::Comment
        } else if b == b'/' && bytes.get(pos + 1) == Some(&b'*') {
            pos = block_comment_end(src, pos)?;
            TokenKind::Comment
        } else if b == b'\'' || b == b'"' {
            pos = string_end(src, pos)?;
            TokenKind::Str
        } else if b == b'`' {
            pos = template_end(src, pos)?;
            TokenKind::Template
        } else if b.is_ascii_digit()
            || (b == b'.' && bytes.get(pos + 1).is_some_and(u8::is_ascii_digit))
        {
            pos += 1;
            while pos < bytes.len() && (is_ident_char(bytes[pos]) || bytes[pos] == b'.') {
                pos += 1;
            }
            TokenKind::Number
        } else if is_ident_start(b) {
            pos = ident_end(bytes, pos);
            TokenKind::Ident
        } else if b == b'/' && regex_allowed(src, &tokens) {
            pos = regex_end(src, pos)?;
            TokenKind::Regex
        } else {
            pos += punctuator_len(&src[pos..]);
            TokenKind::Punct
        };
        tokens.push(Token {
            kind,
            start,
            end: pos,
        });
    }

    Ok(tokens)
}

fn punctuator_len(rest: &str) -> usize {
    for p in PUNCTUATORS {
        if rest.starts_with(p) {
            // `a ?.5 : b` is a conditional, not optional chaining
            if *p == "?." && rest.as_bytes().get(2).is_some_and(u8::is_ascii_digit) {
                return 1;
            }
            return p.len();
        }
    }
    rest.chars().next().map_or(1, char::len_utf8)
}

/// Whether a `/` at this point starts a regex literal rather than a division
fn regex_allowed(src: &str, tokens: &[Token]) -> bool {
    match tokens.iter().rev().find(|t| !t.is_trivia()) {
        None => true,
        Some(t) => match t.kind {
            TokenKind::Ident => EXPRESSION_KEYWORDS.contains(&&src[t.start..t.end]),
            TokenKind::Punct => !matches!(&src[t.start..t.end], ")" | "]"),
            _ => false,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(src: &str) -> Vec<&str> {
        tokenize(src)
            .unwrap()
            .into_iter()
            .filter(|t| !t.is_trivia())
            .map(|t| &src[t.start..t.end])
            .collect()
    }

    #[test]
    fn test_generic_closers_stay_single() {
        assert_eq!(
            texts("useState<Array<Item>>([])"),
            vec!["useState", "<", "Array", "<", "Item", ">", ">", "(", "[", "]", ")"]
        );
    }

    #[test]
    fn test_regex_versus_division() {
        assert_eq!(texts("a / b / c").len(), 5);
        let tokens = tokenize("x = /a\\/b/g.test(y)").unwrap();
        assert!(tokens.iter().any(|t| t.kind == TokenKind::Regex));
    }

    #[test]
    fn test_template_with_nested_substitution() {
        let src = "`a ${ {b: `c${d}`}.b } e` + 1";
        let tokens = tokenize(src).unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Template);
        assert_eq!(&src[tokens[0].start..tokens[0].end], "`a ${ {b: `c${d}`}.b } e`");
    }

    #[test]
    fn test_optional_chaining_not_conditional() {
        assert_eq!(texts("a?.b"), vec!["a", "?.", "b"]);
        assert_eq!(texts("a ?.5 : 1"), vec!["a", "?", ".5", ":", "1"]);
    }

    #[test]
    fn test_unterminated_string_reports_line() {
        let err = tokenize("const a = 1;\nconst b = 'oops;\n").unwrap_err();
        assert!(matches!(err, NormalizeError::Syntax { line: 2, .. }));
    }

    #[test]
    fn test_matching_bracket_skips_strings() {
        let src = "{ a: '}', b: { c: 1 } } tail";
        let end = matching_bracket_end(src, 0).unwrap();
        assert_eq!(&src[end..], " tail");
    }
}
