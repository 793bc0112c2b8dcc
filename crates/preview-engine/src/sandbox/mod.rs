//! Sandboxed Execution Host
//!
//! Assembles programs and tracks the lifecycle of the one live sandbox:
//! create, load, settle, destroy. Loading itself is done by an
//! [`ExecutionHost`]; the in-process one is [`BoaHost`], and webview
//! embeddings use [`AssembledProgram::document`] instead.

pub mod boa_host;
pub mod document;
pub mod harness;

pub use boa_host::{BoaHost, ExecutionHost};
pub use document::{content_security_policy, render_document, render_iframe};
pub use harness::{bootstrap_script, FailureKind, HarnessConfig, HarnessReport, RUNTIME_JS};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::error::SandboxLoadError;
use crate::mocks::MockLibrary;
use crate::normalizer::NormalizedProgram;
use crate::props::PropertyBag;

/// A fully assembled program, ready to load
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledProgram {
    pub generation: u64,
    pub component_name: String,
    /// Runtime, mocks, body and boot call as one script
    pub script: String,
    /// The same script inside a `srcdoc` HTML document
    pub document: String,
}

impl AssembledProgram {
    /// The document wrapped in a sandboxed `<iframe>` for webview embeddings
    pub fn iframe(&self) -> String {
        render_iframe(&self.document)
    }
}

/// Combine a normalized program with mocks and the harness
pub fn assemble(
    program: &NormalizedProgram,
    mocks: &MockLibrary,
    config: &HarnessConfig,
    props: &PropertyBag,
) -> Result<AssembledProgram, SandboxLoadError> {
    let script = bootstrap_script(program, mocks, config, props)
        .map_err(|e| SandboxLoadError::Assembly(e.to_string()))?;
    let document = render_document(&script, config.theme);
    Ok(AssembledProgram {
        generation: config.generation,
        component_name: program.component_name.clone(),
        script,
        document,
    })
}

/// A request to load one program, handed to whoever drives the host
#[derive(Debug, Clone)]
pub struct LoadRequest {
    pub generation: u64,
    pub program: Arc<AssembledProgram>,
    cancelled: Arc<AtomicBool>,
}

impl LoadRequest {
    /// A standalone request with nobody able to cancel it
    pub fn new(program: AssembledProgram) -> Self {
        Self {
            generation: program.generation,
            program: Arc::new(program),
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Set once the sandbox this request belongs to has been destroyed
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// The live sandbox of a controller
#[derive(Debug)]
pub(crate) struct LiveSandbox {
    generation: u64,
    program: Arc<AssembledProgram>,
    cancelled: Arc<AtomicBool>,
    created_at: Instant,
}

impl LiveSandbox {
    pub(crate) fn create(program: AssembledProgram) -> Self {
        log::debug!("Creating sandbox for generation {}", program.generation);
        Self {
            generation: program.generation,
            program: Arc::new(program),
            cancelled: Arc::new(AtomicBool::new(false)),
            created_at: Instant::now(),
        }
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }

    pub(crate) fn program(&self) -> &AssembledProgram {
        &self.program
    }

    pub(crate) fn load_request(&self) -> LoadRequest {
        LoadRequest {
            generation: self.generation,
            program: Arc::clone(&self.program),
            cancelled: Arc::clone(&self.cancelled),
        }
    }

    /// Release the sandbox; an in-flight load sees the cancellation flag
    pub(crate) fn destroy(self) {
        self.cancelled.store(true, Ordering::SeqCst);
        log::debug!(
            "Destroyed sandbox for generation {} after {:?}",
            self.generation,
            self.created_at.elapsed()
        );
    }
}
