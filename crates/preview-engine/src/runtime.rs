//! Async driver for the preview controller
//!
//! The controller itself never blocks: it hands back [`Rebuild`] requests.
//! `PreviewRuntime` executes load requests on the blocking pool, feeds the
//! result back through the controller's generation check and emits
//! [`PreviewEvent`]s for the UI.

use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::controller::{PreviewController, Rebuild};
use crate::error::{PreviewError, Result, SandboxLoadError};
use crate::events::{EventSink, PreviewEvent};
use crate::outcome::RenderOutcome;
use crate::sandbox::{ExecutionHost, LoadRequest};
use crate::session::{Device, Theme};
use crate::source::SourceDocument;

/// Handle to an in-flight load
pub type LoadHandle = JoinHandle<()>;

pub struct PreviewRuntime {
    controller: Arc<Mutex<PreviewController>>,
    host: Arc<dyn ExecutionHost>,
    events: Arc<dyn EventSink>,
}

impl PreviewRuntime {
    pub fn new(
        controller: PreviewController,
        host: Arc<dyn ExecutionHost>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            controller: Arc::new(Mutex::new(controller)),
            host,
            events,
        }
    }

    /// Shared controller, for reading state
    pub fn controller(&self) -> Arc<Mutex<PreviewController>> {
        Arc::clone(&self.controller)
    }

    pub fn latest_outcome(&self) -> Option<RenderOutcome> {
        self.controller.lock().latest_outcome().cloned()
    }

    /// Apply a state change and dispatch whatever rebuild it produced
    pub fn apply<F>(&self, change: F) -> Option<LoadHandle>
    where
        F: FnOnce(&mut PreviewController) -> Rebuild,
    {
        let rebuild = change(&mut self.controller.lock());
        self.dispatch(rebuild)
    }

    pub fn set_source(&self, source: impl Into<SourceDocument>) -> Option<LoadHandle> {
        let source = source.into();
        self.apply(move |c| c.set_source(source))
    }

    pub fn set_theme(&self, theme: Theme) -> Option<LoadHandle> {
        self.apply(|c| c.set_theme(theme))
    }

    pub fn set_device(&self, device: Device) -> Option<LoadHandle> {
        self.apply(|c| c.set_device(device))
    }

    pub fn pause(&self) -> Option<LoadHandle> {
        self.apply(PreviewController::pause)
    }

    pub fn resume(&self) -> Option<LoadHandle> {
        self.apply(PreviewController::resume)
    }

    pub fn refresh(&self) -> Option<LoadHandle> {
        self.apply(PreviewController::refresh)
    }

    pub fn set_property(&self, name: &str, value: Value) -> Result<Option<LoadHandle>> {
        let rebuild = self
            .controller
            .lock()
            .set_property(name, value)
            .map_err(PreviewError::from)?;
        Ok(self.dispatch(rebuild))
    }

    /// Run the rebuild: loads go to the blocking pool, everything else is
    /// reported right away
    pub fn dispatch(&self, rebuild: Rebuild) -> Option<LoadHandle> {
        match rebuild {
            Rebuild::Load(request) => {
                emit(
                    self.events.as_ref(),
                    PreviewEvent::RebuildStarted {
                        generation: request.generation,
                        component_name: request.program.component_name.clone(),
                    },
                );
                Some(tokio::spawn(load(
                    Arc::clone(&self.controller),
                    Arc::clone(&self.host),
                    Arc::clone(&self.events),
                    request,
                )))
            }
            Rebuild::Settled(outcome) => {
                emit(self.events.as_ref(), PreviewEvent::Settled { outcome });
                None
            }
            Rebuild::Paused => {
                let generation = self.controller.lock().generation();
                emit(self.events.as_ref(), PreviewEvent::Paused { generation });
                None
            }
            Rebuild::Idle => None,
        }
    }
}

async fn load(
    controller: Arc<Mutex<PreviewController>>,
    host: Arc<dyn ExecutionHost>,
    events: Arc<dyn EventSink>,
    request: LoadRequest,
) {
    let result = if request.is_cancelled() {
        None
    } else {
        log::debug!(
            "Loading generation {} into {} host",
            request.generation,
            host.name()
        );
        let worker_request = request.clone();
        let result = tokio::task::spawn_blocking(move || host.execute(&worker_request))
            .await
            .unwrap_or_else(|e| Err(SandboxLoadError::Panicked(e.to_string())));
        Some(result)
    };

    let (accepted, current, outcome) = {
        let mut controller = controller.lock();
        let accepted = match result {
            Some(result) => controller.settle(request.generation, result),
            None => false,
        };
        (
            accepted,
            controller.generation(),
            controller.latest_outcome().cloned(),
        )
    };

    match (accepted, outcome) {
        (true, Some(outcome)) => emit(events.as_ref(), PreviewEvent::Settled { outcome }),
        _ => emit(
            events.as_ref(),
            PreviewEvent::StaleDiscarded {
                generation: request.generation,
                current_generation: current,
            },
        ),
    }
}

fn emit(events: &dyn EventSink, event: PreviewEvent) {
    if let Err(e) = events.send(event) {
        log::warn!("Failed to send preview event: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::VecEventSink;
    use crate::sandbox::HarnessReport;
    use std::time::Duration;

    /// Host that takes longer for components named `Slow`
    struct ScriptedHost;

    impl ExecutionHost for ScriptedHost {
        fn name(&self) -> &'static str {
            "scripted"
        }

        fn execute(
            &self,
            request: &LoadRequest,
        ) -> std::result::Result<HarnessReport, SandboxLoadError> {
            let program = &request.program;
            let delay = if program.component_name == "Slow" { 200 } else { 5 };
            std::thread::sleep(Duration::from_millis(delay));
            Ok(HarnessReport::Mounted {
                generation: program.generation,
                markup: program.component_name.clone(),
            })
        }
    }

    fn runtime(sink: Arc<VecEventSink>) -> PreviewRuntime {
        PreviewRuntime::new(PreviewController::default(), Arc::new(ScriptedHost), sink)
    }

    #[tokio::test]
    async fn test_latest_rebuild_wins() {
        let sink = Arc::new(VecEventSink::new());
        let runtime = runtime(Arc::clone(&sink));

        let slow = runtime
            .set_source("export const Slow = () => <p>slow</p>;")
            .unwrap();
        let fast = runtime
            .set_source("export const Fast = () => <p>fast</p>;")
            .unwrap();
        fast.await.unwrap();
        slow.await.unwrap();

        let outcome = runtime.latest_outcome().unwrap();
        assert_eq!(outcome.markup(), Some("Fast"));
        assert_eq!(outcome.generation(), 2);

        let events = sink.events();
        assert!(events.contains(&PreviewEvent::StaleDiscarded {
            generation: 1,
            current_generation: 2
        }));
        assert_eq!(
            events
                .iter()
                .filter(|e| matches!(e, PreviewEvent::Settled { .. }))
                .count(),
            1
        );
    }

    #[tokio::test]
    async fn test_failures_and_pause_are_reported() {
        let sink = Arc::new(VecEventSink::new());
        let runtime = runtime(Arc::clone(&sink));

        assert!(runtime.set_source("plain text, no component").is_none());
        assert!(runtime.pause().is_none());

        let events = sink.events();
        assert!(matches!(
            &events[0],
            PreviewEvent::Settled {
                outcome: RenderOutcome::Failed { .. }
            }
        ));
        assert_eq!(events[1], PreviewEvent::Paused { generation: 2 });

        let handle = runtime.resume();
        assert!(handle.is_none(), "the last source cannot be normalized");
    }

    #[tokio::test]
    async fn test_property_errors_surface() {
        let runtime = runtime(Arc::new(VecEventSink::new()));
        let handle = runtime.set_source("export const A = () => <p/>;").unwrap();
        handle.await.unwrap();
        assert!(matches!(
            runtime.set_property("missing", Value::Bool(true)),
            Err(PreviewError::Property(_))
        ));
        assert!(runtime.latest_outcome().unwrap().is_mounted());
    }
}
