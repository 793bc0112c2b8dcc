//! Preview Controller
//!
//! Owns the source, the preview settings, the property panel and the one live
//! sandbox. Every input that changes the assembled program triggers a full
//! rebuild: the generation counter is bumped, the old sandbox is destroyed,
//! the source is normalized again and a new sandbox is created. Results come
//! back through [`PreviewController::settle`], which ignores anything that is
//! not tagged with the current generation.

use serde_json::Value;

use crate::error::{PropertyError, SandboxLoadError};
use crate::mocks::MockLibrary;
use crate::normalizer::{self, NormalizedProgram};
use crate::outcome::{FailureOrigin, RenderOutcome};
use crate::props::{infer_properties, PropertyPanel};
use crate::sandbox::{self, AssembledProgram, HarnessConfig, HarnessReport, LiveSandbox, LoadRequest};
use crate::session::{Device, PreviewSession, PreviewSettings, Theme};
use crate::source::SourceDocument;

/// What a state change asks the caller to do next
#[derive(Debug, Clone)]
pub enum Rebuild {
    /// A new sandbox exists; load its program and report back via `settle`
    Load(LoadRequest),
    /// The rebuild already failed before a sandbox could be created
    Settled(RenderOutcome),
    /// Preview is paused; show the placeholder
    Paused,
    /// No source to preview yet
    Idle,
}

/// Coarse state for the UI
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewStatus {
    Idle,
    Paused,
    Loading { generation: u64 },
    Mounted { generation: u64 },
    Failed { generation: u64, origin: FailureOrigin },
}

pub struct PreviewController {
    source: Option<SourceDocument>,
    program: Option<NormalizedProgram>,
    settings: PreviewSettings,
    panel: PropertyPanel,
    mocks: MockLibrary,
    generation: u64,
    session: Option<PreviewSession>,
    sandbox: Option<LiveSandbox>,
    outcome: Option<RenderOutcome>,
    draft: Option<String>,
}

impl Default for PreviewController {
    fn default() -> Self {
        Self::new(MockLibrary::standard(), PreviewSettings::default())
    }
}

impl PreviewController {
    pub fn new(mocks: MockLibrary, settings: PreviewSettings) -> Self {
        let settings = PreviewSettings {
            zoom: PreviewSettings::clamp_zoom(settings.zoom),
            ..settings
        };
        Self {
            source: None,
            program: None,
            settings,
            panel: PropertyPanel::new(),
            mocks,
            generation: 0,
            session: None,
            sandbox: None,
            outcome: None,
            draft: None,
        }
    }

    // Accessors --------------------------------------------------------------

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn settings(&self) -> &PreviewSettings {
        &self.settings
    }

    pub fn session(&self) -> Option<&PreviewSession> {
        self.session.as_ref()
    }

    pub fn source(&self) -> Option<&SourceDocument> {
        self.source.as_ref()
    }

    pub fn properties(&self) -> &PropertyPanel {
        &self.panel
    }

    pub fn mocks(&self) -> &MockLibrary {
        &self.mocks
    }

    /// Program loaded into the live sandbox
    pub fn current_program(&self) -> Option<&AssembledProgram> {
        self.sandbox.as_ref().map(LiveSandbox::program)
    }

    /// Most recent settled outcome
    pub fn latest_outcome(&self) -> Option<&RenderOutcome> {
        self.outcome.as_ref()
    }

    pub fn status(&self) -> PreviewStatus {
        if !self.settings.playing {
            return PreviewStatus::Paused;
        }
        match &self.outcome {
            Some(outcome) if outcome.generation() == self.generation => match outcome.origin() {
                None => PreviewStatus::Mounted {
                    generation: self.generation,
                },
                Some(origin) => PreviewStatus::Failed {
                    generation: self.generation,
                    origin,
                },
            },
            _ if self.sandbox.is_some() => PreviewStatus::Loading {
                generation: self.generation,
            },
            _ => PreviewStatus::Idle,
        }
    }

    // Inputs that rebuild -------------------------------------------------------

    /// Replace the source document and rebuild
    pub fn set_source(&mut self, source: impl Into<SourceDocument>) -> Rebuild {
        let source = source.into();
        let component = normalizer::resolve_component_name(source.text())
            .ok()
            .map(|(name, _)| name);
        self.panel
            .reconcile(infer_properties(source.text(), component.as_deref()));
        self.source = Some(source);
        self.draft = None;
        self.rebuild()
    }

    pub fn set_theme(&mut self, theme: Theme) -> Rebuild {
        self.settings.theme = theme;
        self.rebuild()
    }

    pub fn set_device(&mut self, device: Device) -> Rebuild {
        self.settings.device = device;
        self.rebuild()
    }

    /// Stop previewing; the sandbox is destroyed and a placeholder shown
    pub fn pause(&mut self) -> Rebuild {
        self.settings.playing = false;
        self.rebuild()
    }

    /// Start previewing again from a fresh sandbox
    pub fn resume(&mut self) -> Rebuild {
        self.settings.playing = true;
        self.rebuild()
    }

    /// Rebuild with unchanged inputs
    pub fn refresh(&mut self) -> Rebuild {
        self.rebuild()
    }

    pub fn set_property(&mut self, name: &str, value: Value) -> Result<Rebuild, PropertyError> {
        self.panel.set(name, value)?;
        Ok(self.rebuild())
    }

    pub fn enable_property(&mut self, name: &str) -> Result<Rebuild, PropertyError> {
        self.panel.enable(name)?;
        Ok(self.rebuild())
    }

    pub fn disable_property(&mut self, name: &str) -> Result<Rebuild, PropertyError> {
        self.panel.disable(name)?;
        Ok(self.rebuild())
    }

    pub fn reset_properties(&mut self) -> Rebuild {
        self.panel.reset();
        self.rebuild()
    }

    // Zoom (visual only) --------------------------------------------------------

    /// Set the container zoom; returns the clamped value. No rebuild.
    pub fn set_zoom(&mut self, percent: u16) -> u16 {
        let zoom = PreviewSettings::clamp_zoom(percent);
        self.settings.zoom = zoom;
        if let Some(session) = self.session.as_mut() {
            session.set_zoom(zoom);
        }
        zoom
    }

    /// Inline style for the element hosting the sandbox
    pub fn container_style(&self) -> String {
        format!(
            "transform: scale({}); transform-origin: top center",
            f64::from(self.settings.zoom) / 100.0
        )
    }

    // Edit and resubmit ---------------------------------------------------------

    /// Open the edit buffer with the current source
    pub fn start_editing(&mut self) {
        let text = self
            .source
            .as_ref()
            .map(|s| s.text().to_string())
            .unwrap_or_default();
        self.draft = Some(text);
    }

    pub fn is_editing(&self) -> bool {
        self.draft.is_some()
    }

    pub fn draft(&self) -> Option<&str> {
        self.draft.as_deref()
    }

    /// Replace the buffer; ignored when not editing
    pub fn update_draft(&mut self, text: impl Into<String>) {
        if let Some(draft) = self.draft.as_mut() {
            *draft = text.into();
        }
    }

    /// Submit the buffer as a new source document
    pub fn commit_edit(&mut self) -> Option<Rebuild> {
        let draft = self.draft.take()?;
        Some(self.set_source(draft))
    }

    pub fn cancel_edit(&mut self) {
        self.draft = None;
    }

    // Copy / export -------------------------------------------------------------

    pub fn source_text(&self) -> Option<&str> {
        self.source.as_ref().map(SourceDocument::text)
    }

    /// File name offered when exporting the source
    pub fn export_file_name(&self) -> Option<String> {
        let source = self.source.as_ref()?;
        let name = normalizer::resolve_component_name(source.text())
            .ok()
            .map(|(name, _)| name)
            .filter(|name| name != normalizer::ANONYMOUS_DEFAULT)
            .unwrap_or_else(|| "Component".to_string());
        Some(format!("{}.tsx", name))
    }

    // Settling ------------------------------------------------------------------

    /// Record the result of loading `generation`.
    ///
    /// Returns `false` when the result belongs to a sandbox that has since
    /// been replaced; such results never touch the visible state.
    pub fn settle(
        &mut self,
        generation: u64,
        result: Result<HarnessReport, SandboxLoadError>,
    ) -> bool {
        let live = self
            .sandbox
            .as_ref()
            .is_some_and(|sandbox| sandbox.generation() == generation);
        if generation != self.generation || !live {
            log::debug!(
                "Discarding stale result for generation {} (current {})",
                generation,
                self.generation
            );
            return false;
        }

        let outcome = match result {
            Ok(report) if report.generation() == generation => RenderOutcome::from_report(report),
            Ok(report) => RenderOutcome::from_load_error(
                generation,
                &SandboxLoadError::MalformedReport(format!(
                    "report tagged with generation {}",
                    report.generation()
                )),
            ),
            Err(err) => RenderOutcome::from_load_error(generation, &err),
        };

        match &outcome {
            RenderOutcome::Mounted { .. } => {
                log::info!("Preview generation {} mounted", generation)
            }
            RenderOutcome::Failed {
                origin, message, ..
            } => log::warn!(
                "Preview generation {} failed ({}): {}",
                generation,
                origin,
                message
            ),
        }
        self.outcome = Some(outcome);
        true
    }

    fn rebuild(&mut self) -> Rebuild {
        self.generation += 1;
        let generation = self.generation;

        if let Some(old) = self.sandbox.take() {
            old.destroy();
        }
        self.session = None;

        if !self.settings.playing {
            log::debug!("Preview paused at generation {}", generation);
            self.outcome = None;
            return Rebuild::Paused;
        }
        let Some(source) = self.source.clone() else {
            self.outcome = None;
            return Rebuild::Idle;
        };

        log::info!("Rebuilding preview (generation {})", generation);

        let program = match normalizer::normalize(&source) {
            Ok(program) => program,
            Err(err) => {
                log::warn!("Normalization failed for generation {}: {}", generation, err);
                self.program = None;
                let outcome = RenderOutcome::from_normalize_error(generation, &err);
                self.outcome = Some(outcome.clone());
                return Rebuild::Settled(outcome);
            }
        };

        let config = HarnessConfig::new(generation, self.settings.theme, self.settings.device);
        let props = self.panel.bag().clone();
        let assembled = match sandbox::assemble(&program, &self.mocks, &config, &props) {
            Ok(assembled) => assembled,
            Err(err) => {
                log::warn!("Assembly failed for generation {}: {}", generation, err);
                let outcome = RenderOutcome::from_load_error(generation, &err);
                self.outcome = Some(outcome.clone());
                return Rebuild::Settled(outcome);
            }
        };

        self.program = Some(program);
        self.session = Some(PreviewSession::new(generation, self.settings, props));
        let live = LiveSandbox::create(assembled);
        let request = live.load_request();
        self.sandbox = Some(live);
        Rebuild::Load(request)
    }

    /// Name of the component in the live program
    pub fn component_name(&self) -> Option<&str> {
        self.program.as_ref().map(|p| p.component_name.as_str())
    }
}
