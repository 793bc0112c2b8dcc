//! Code extraction from raw model responses
//!
//! Models answer with a mix of prose and code. The [`Extractor`] runs an
//! ordered chain of [`ExtractionStrategy`]s and takes the first candidate that
//! holds an exported component: a fenced code block, then a run of
//! declarations ending in an export, then a line-by-line classification.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{GenerationError, Result};

static FENCED_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"```([\w+-]*)[ \t]*\n?([\s\S]*?)\n?```").unwrap());
static DECLARATION_RUN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?:import[\s\S]*?from[\s\S]*?;\s*)*(?:interface|type)[\s\S]*?export\s+(?:const|function|default)[\s\S]+",
    )
    .unwrap()
});
static LEFTOVER_OPEN_FENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^```\w*[ \t]*\n?").unwrap());
static LEFTOVER_CLOSE_FENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)```$").unwrap());

/// Fence tags that mark a script block
const CODE_TAGS: &[&str] = &["tsx", "ts", "typescript", "jsx", "js", "javascript"];

/// Lines with this many code lines behind them may end the code on a blank line
const MIN_CODE_LINES_BEFORE_BREAK: usize = 10;

/// Code and prose separated from one response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    pub code: String,
    pub explanation: String,
    /// Name of the strategy that produced it
    pub strategy: &'static str,
}

/// One way of separating code from prose
pub trait ExtractionStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Returns `None` when this strategy finds no code
    fn extract(&self, response: &str) -> Option<Extraction>;

    /// Every extraction this strategy would accept, best first
    fn candidates(&self, response: &str) -> Vec<Extraction> {
        self.extract(response).into_iter().collect()
    }
}

/// Fenced blocks tagged with a script language, then untagged ones. Blocks in
/// any other language (shell, JSON, CSS) are never code.
pub struct FencedBlock;

impl ExtractionStrategy for FencedBlock {
    fn name(&self) -> &'static str {
        "fenced-block"
    }

    fn extract(&self, response: &str) -> Option<Extraction> {
        self.candidates(response).into_iter().next()
    }

    fn candidates(&self, response: &str) -> Vec<Extraction> {
        let fences: Vec<_> = FENCED_BLOCK
            .captures_iter(response)
            .filter_map(|caps| {
                let whole = caps.get(0)?;
                let tag = caps.get(1)?.as_str().to_ascii_lowercase();
                Some((whole, tag, caps.get(2)?.as_str()))
            })
            .collect();

        let tagged = fences
            .iter()
            .filter(|(_, tag, _)| CODE_TAGS.contains(&tag.as_str()));
        let untagged = fences.iter().filter(|(_, tag, _)| tag.is_empty());
        tagged
            .chain(untagged)
            .map(|(whole, _, code)| Extraction {
                code: code.trim().to_string(),
                explanation: format!("{}{}", &response[..whole.start()], &response[whole.end()..])
                    .trim()
                    .to_string(),
                strategy: self.name(),
            })
            .collect()
    }
}

/// Imports and a type declaration through the end of an export
pub struct DeclarationRun;

impl ExtractionStrategy for DeclarationRun {
    fn name(&self) -> &'static str {
        "declaration-run"
    }

    fn extract(&self, response: &str) -> Option<Extraction> {
        let found = DECLARATION_RUN.find(response)?;
        let explanation = format!(
            "{}{}",
            &response[..found.start()],
            &response[found.end()..]
        );
        Some(Extraction {
            code: found.as_str().trim().to_string(),
            explanation: explanation.trim().to_string(),
            strategy: self.name(),
        })
    }
}

/// Lines that look like code start a code region; prose before it is kept
/// as the explanation
pub struct LineClassification;

impl LineClassification {
    fn looks_like_code(line: &str) -> bool {
        line.contains("import ") || line.contains("export ") || line.contains("interface ")
    }
}

impl ExtractionStrategy for LineClassification {
    fn name(&self) -> &'static str {
        "line-classification"
    }

    fn extract(&self, response: &str) -> Option<Extraction> {
        let mut code = Vec::new();
        let mut explanation = Vec::new();
        let mut in_code = false;

        for line in response.lines() {
            if in_code || Self::looks_like_code(line) {
                in_code = true;
                code.push(line);
                if line.trim().is_empty() && code.len() > MIN_CODE_LINES_BEFORE_BREAK {
                    in_code = false;
                }
            } else {
                explanation.push(line);
            }
        }

        let code = code.join("\n").trim().to_string();
        if code.is_empty() {
            return None;
        }
        Some(Extraction {
            code,
            explanation: explanation.join("\n").trim().to_string(),
            strategy: self.name(),
        })
    }
}

/// Ordered chain of extraction strategies
pub struct Extractor {
    strategies: Vec<Box<dyn ExtractionStrategy>>,
}

impl Default for Extractor {
    fn default() -> Self {
        Self::new()
            .with_strategy(FencedBlock)
            .with_strategy(DeclarationRun)
            .with_strategy(LineClassification)
    }
}

impl Extractor {
    /// An empty chain
    pub fn new() -> Self {
        Self {
            strategies: Vec::new(),
        }
    }

    pub fn with_strategy(mut self, strategy: impl ExtractionStrategy + 'static) -> Self {
        self.strategies.push(Box::new(strategy));
        self
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Separate code from prose.
    ///
    /// Candidates without an `export` are skipped. Fails with
    /// [`GenerationError::NoCodeFound`] when no candidate of any strategy is
    /// left.
    pub fn extract(&self, response: &str) -> Result<Extraction> {
        for strategy in &self.strategies {
            for mut extraction in strategy.candidates(response) {
                let code = LEFTOVER_OPEN_FENCE.replace_all(&extraction.code, "");
                let code = LEFTOVER_CLOSE_FENCE.replace_all(&code, "");
                extraction.code = code.trim().to_string();

                if extraction.code.contains("export") {
                    log::debug!(
                        "Extracted {} bytes of code via {}",
                        extraction.code.len(),
                        extraction.strategy
                    );
                    return Ok(extraction);
                }
                log::debug!("Skipping {} candidate without an export", strategy.name());
            }
        }
        log::warn!("No extraction strategy produced an exported component");
        Err(GenerationError::NoCodeFound)
    }
}
