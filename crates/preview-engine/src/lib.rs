//! Preview Engine - Sandboxed live preview for generated UI components
//!
//! Takes untrusted, freshly generated component source and turns it into a
//! rendered preview without letting anything it does reach the host:
//!
//! - `normalizer`: strips module and type syntax, lowers JSX, resolves the
//!   primary component name
//! - `mocks`: stand-in bindings for icon and animation libraries
//! - `sandbox`: assembles the program (runtime + mocks + body + harness) and
//!   runs it in an isolated script context
//! - `controller`: owns the live session and the generation counter
//! - `props`: infers a property panel from `<Name>Props` declarations
//!
//! # Example
//!
//! ```ignore
//! use preview_engine::{BoaHost, NullEventSink, PreviewController, PreviewRuntime};
//! use std::sync::Arc;
//!
//! let runtime = PreviewRuntime::new(
//!     PreviewController::default(),
//!     Arc::new(BoaHost::default()),
//!     Arc::new(NullEventSink),
//! );
//! if let Some(load) = runtime.set_source("export const Foo = () => <div>Hi</div>;") {
//!     load.await?;
//! }
//! ```

pub mod constants;
pub mod controller;
pub mod error;
pub mod events;
pub mod mocks;
pub mod normalizer;
pub mod outcome;
pub mod props;
pub mod runtime;
pub mod sandbox;
pub mod session;
pub mod source;

// Re-export key types
pub use controller::{PreviewController, PreviewStatus, Rebuild};
pub use error::{NormalizeError, PreviewError, PropertyError, Result, SandboxLoadError};
pub use events::{ChannelEventSink, EventError, EventSink, NullEventSink, PreviewEvent, VecEventSink};
pub use mocks::{MockBinding, MockLibrary};
pub use normalizer::{normalize, normalize_text, NormalizedProgram};
pub use outcome::{FailureOrigin, RenderOutcome};
pub use props::{infer_properties, PropertyBag, PropertyDefinition, PropertyKind, PropertyPanel};
pub use runtime::{LoadHandle, PreviewRuntime};
pub use sandbox::{AssembledProgram, BoaHost, ExecutionHost, FailureKind, LoadRequest};
pub use session::{Device, PreviewSession, PreviewSettings, Theme};
pub use source::SourceDocument;
