//! End-to-end preview tests against the in-process script host

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use preview_engine::{
    normalize_text, BoaHost, ExecutionHost, FailureKind, FailureOrigin, NormalizeError,
    PreviewController, PreviewEvent, PreviewRuntime, PropertyKind, Rebuild, RenderOutcome,
    SandboxLoadError, VecEventSink,
};
use serde_json::json;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Drive one rebuild to completion on the current thread
fn run(controller: &mut PreviewController, rebuild: Rebuild) -> RenderOutcome {
    match rebuild {
        Rebuild::Load(request) => {
            let result = BoaHost::default().execute(&request);
            assert!(controller.settle(request.generation, result));
            controller.latest_outcome().cloned().unwrap()
        }
        Rebuild::Settled(outcome) => outcome,
        other => panic!("expected a rebuild, got {:?}", other),
    }
}

#[test]
fn test_simple_component_mounts() {
    init_logging();
    let mut controller = PreviewController::default();
    let rebuild = controller.set_source("export const Foo = () => <div>Hi</div>;");
    assert_eq!(controller.component_name(), Some("Foo"));

    let outcome = run(&mut controller, rebuild);
    assert!(outcome.is_mounted(), "unexpected outcome: {:?}", outcome);
    let markup = outcome.markup().unwrap();
    assert!(markup.contains("<div>Hi</div>"));
    assert!(markup.contains("forge-frame"));
}

#[test]
fn test_typescript_component_with_mocks() {
    init_logging();
    let source = r#"import React, { useState } from 'react';
import { motion, AnimatePresence } from 'framer-motion';
import { Star } from 'lucide-react';

interface RatingProps {
  label: string;
  count?: number;
}

export default function Rating({ label, count = 3 }: RatingProps): JSX.Element {
  const [hover, setHover] = useState<number | null>(null);
  const stars: number[] = Array.from({ length: count }, (_, i) => i);
  return (
    <AnimatePresence>
      <motion.div initial={{ opacity: 0 }} animate={{ opacity: 1 }} className="rating">
        <span>{label}</span>
        {stars.map((i) => (
          <Star key={i} size={16} className={hover === i ? 'on' : 'off'} />
        ))}
      </motion.div>
    </AnimatePresence>
  );
}
"#;
    let mut controller = PreviewController::default();
    let rebuild = controller.set_source(source);
    assert_eq!(controller.component_name(), Some("Rating"));
    assert!(controller.properties().is_enabled("label"));
    assert!(!controller.properties().is_enabled("count"));

    let outcome = run(&mut controller, rebuild);
    assert!(outcome.is_mounted(), "unexpected outcome: {:?}", outcome);
    let markup = outcome.markup().unwrap();
    assert!(markup.contains(r#"<div class="rating">"#));
    assert!(markup.contains("<span>Label</span>"));
    assert_eq!(markup.matches(r#"data-icon="Star""#).count(), 3);
    assert!(!markup.contains("initial"));
}

#[test]
fn test_unmocked_icon_is_a_runtime_failure() {
    init_logging();
    let mut controller = PreviewController::default();
    let rebuild = controller.set_source(
        "export const Alert = () => <div className=\"alert\"><Zap /> Careful</div>;",
    );
    let outcome = run(&mut controller, rebuild);

    assert_eq!(outcome.origin(), Some(FailureOrigin::Runtime));
    assert!(outcome.message().unwrap().contains("Zap"));
    assert!(outcome.markup().unwrap().contains("forge-error"));
}

#[test]
fn test_property_scenario() {
    init_logging();
    let source = r#"interface ChipProps { variant: 'primary' | 'secondary'; size?: number }

export const Chip = ({ variant, size }: ChipProps) => (
  <span className={variant} data-size={size}>{variant}</span>
);
"#;
    let mut controller = PreviewController::default();
    let rebuild = controller.set_source(source);

    let definitions = controller.properties().definitions();
    assert_eq!(definitions.len(), 2);
    assert_eq!(definitions[0].name, "variant");
    assert_eq!(definitions[0].kind, PropertyKind::Select);
    assert_eq!(definitions[0].options, vec!["primary", "secondary"]);
    assert_eq!(definitions[0].default, json!("primary"));
    assert!(definitions[0].required);
    assert_eq!(definitions[1].name, "size");
    assert_eq!(definitions[1].kind, PropertyKind::Number);
    assert_eq!(definitions[1].default, json!(0));
    assert!(!definitions[1].required);
    assert_eq!(controller.properties().bag().to_json().unwrap(), r#"{"variant":"primary"}"#);

    let outcome = run(&mut controller, rebuild);
    assert!(outcome
        .markup()
        .unwrap()
        .contains(r#"<span class="primary">primary</span>"#));

    let rebuild = controller.set_property("variant", json!("secondary")).unwrap();
    let outcome = run(&mut controller, rebuild);
    assert!(outcome.markup().unwrap().contains(">secondary</span>"));

    // Dropping the field from the declaration drops it from the bag
    let rebuild = controller.set_source(
        "interface ChipProps { size?: number }\nexport const Chip = ({ size }: ChipProps) => <span>{size}</span>;",
    );
    assert!(controller.properties().bag().is_empty());
    assert!(run(&mut controller, rebuild).is_mounted());
}

#[test]
fn test_fault_containment_and_recovery() {
    init_logging();
    let mut controller = PreviewController::default();
    let rebuild = controller.set_source(
        "export const Boom = () => { throw new Error('kaboom'); };",
    );
    let outcome = run(&mut controller, rebuild);
    assert_eq!(outcome.origin(), Some(FailureOrigin::Runtime));
    assert_eq!(outcome.failure_kind(), Some(FailureKind::Render));
    assert_eq!(outcome.message(), Some("kaboom"));
    assert!(outcome.markup().unwrap().contains("kaboom"));

    // Retrying the same input reproduces the failure
    let rebuild = controller.refresh();
    assert_eq!(run(&mut controller, rebuild).message(), Some("kaboom"));

    let rebuild = controller.set_source("export const Boom = () => <p>fixed</p>;");
    let outcome = run(&mut controller, rebuild);
    assert!(outcome.is_mounted());
    assert!(outcome.markup().unwrap().contains("<p>fixed</p>"));
}

#[test]
fn test_missing_component_names_the_symbol() {
    init_logging();
    let mut controller = PreviewController::default();
    // Declared only inside a block, so the resolved name is never bound
    let rebuild = controller.set_source("if (false) { function Ghost() { return null; } }\nexport default Ghost;");
    let outcome = run(&mut controller, rebuild);
    assert_eq!(outcome.origin(), Some(FailureOrigin::Runtime));
    assert_eq!(outcome.failure_kind(), Some(FailureKind::ComponentNotFound));
    assert!(outcome.message().unwrap().contains("Ghost"));
}

#[test]
fn test_unrecognized_source_fails_normalization() {
    init_logging();
    assert_eq!(
        normalize_text("just some prose, no code at all"),
        Err(NormalizeError::NameResolution)
    );

    let mut controller = PreviewController::default();
    let rebuild = controller.set_source("just some prose, no code at all");
    let outcome = run(&mut controller, rebuild);
    assert_eq!(outcome.origin(), Some(FailureOrigin::Normalization));
    assert_eq!(
        outcome.message(),
        Some("could not identify a component in the generated code")
    );
}

#[test]
fn test_normalization_is_deterministic() {
    let source = "import x from 'y';\ninterface P { a: string }\nexport default function Card({ a }: P) { return <div>{a}</div>; }\n";
    let first = normalize_text(source).unwrap();
    let second = normalize_text(source).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.component_name, "Card");
}

/// Runs for hours while every frame stays under the loop iteration limit
const BUSY_COMPONENT: &str = r#"function spin() { for (let j = 0; j < 900000; j++) {} }

export const Busy = () => {
  for (let i = 0; i < 900000; i++) { spin(); }
  return <p>done</p>;
};
"#;

fn mounted_markup(source: &str) -> String {
    let mut controller = PreviewController::default();
    let rebuild = controller.set_source(source);
    let outcome = run(&mut controller, rebuild);
    assert!(outcome.is_mounted(), "unexpected outcome: {:?}", outcome);
    outcome.markup().unwrap().to_string()
}

fn wait_for_workers(host: &BoaHost) -> usize {
    let start = Instant::now();
    while host.active_workers() > 0 && start.elapsed() < Duration::from_secs(5) {
        thread::sleep(Duration::from_millis(10));
    }
    host.active_workers()
}

#[test]
fn test_generic_arrow_helpers() {
    init_logging();
    let markup = mounted_markup(
        r#"const first = <T,>(items: T[]): T | undefined => items[0];
const wrap = <T extends string>(value: T) => `[${value}]`;

export const Tag = () => <span>{wrap(first(['alpha', 'beta']) ?? '')}</span>;
"#,
    );
    assert!(markup.contains("<span>[alpha]</span>"));
}

#[test]
fn test_exported_class_component() {
    init_logging();
    let markup = mounted_markup(
        r#"import React from 'react';

interface CounterState { count: number }

export class Counter extends React.Component<{}, CounterState> {
  state: CounterState = { count: 2 };

  render() {
    return <p>Count: {this.state.count}</p>;
  }
}
"#,
    );
    assert!(markup.contains("<p>Count: 2</p>"));
}

#[test]
fn test_jsx_text_starting_with_a_keyword() {
    init_logging();
    let markup = mounted_markup(
        "export const Hint = () => (\n  <p>\n    type your name below\n  </p>\n);\n",
    );
    assert!(markup.contains("<p>type your name below</p>"));
}

#[test]
fn test_enum_members() {
    init_logging();
    let markup = mounted_markup(
        "enum Tone { Calm = 'calm', Loud = 'loud' }\nexport const Badge = () => <b className={Tone.Loud}>{Tone.Calm}</b>;",
    );
    assert!(markup.contains(r#"<b class="loud">calm</b>"#));
}

#[test]
fn test_timed_out_sandbox_is_released() {
    init_logging();
    let mut controller = PreviewController::default();
    let Rebuild::Load(request) = controller.set_source(BUSY_COMPONENT) else {
        panic!("expected a load request");
    };

    let host = BoaHost::new(300);
    let result = host.execute(&request);
    assert_eq!(result, Err(SandboxLoadError::Timeout(300)));
    assert!(controller.settle(request.generation, result));
    assert_eq!(
        controller.latest_outcome().and_then(|o| o.origin()),
        Some(FailureOrigin::SandboxLoad)
    );
    assert_eq!(wait_for_workers(&host), 0, "sandbox worker kept running");
}

#[test]
fn test_replaced_sandbox_stops_running() {
    init_logging();
    let mut controller = PreviewController::default();
    let Rebuild::Load(request) = controller.set_source(BUSY_COMPONENT) else {
        panic!("expected a load request");
    };
    let generation = request.generation;

    let host = BoaHost::new(60_000);
    let worker_host = host.clone();
    let load = thread::spawn(move || worker_host.execute(&request));
    thread::sleep(Duration::from_millis(100));

    // Rebuilding destroys the running sandbox
    let started = Instant::now();
    let _retry = controller.refresh();
    let result = load.join().unwrap();
    assert_eq!(result, Err(SandboxLoadError::Cancelled));
    assert!(started.elapsed() < Duration::from_secs(5));
    assert!(!controller.settle(generation, result));
    assert_eq!(host.active_workers(), 0);
}

#[tokio::test]
async fn test_runtime_drives_real_host() {
    init_logging();
    let sink = Arc::new(VecEventSink::new());
    let runtime = PreviewRuntime::new(
        PreviewController::default(),
        Arc::new(BoaHost::default()),
        sink.clone(),
    );

    let first = runtime
        .set_source("export const A = () => <p>first</p>;")
        .unwrap();
    let second = runtime
        .set_source("export const B = () => <p>second</p>;")
        .unwrap();
    first.await.unwrap();
    second.await.unwrap();

    let outcome = runtime.latest_outcome().unwrap();
    assert!(outcome.markup().unwrap().contains("<p>second</p>"));

    let settled: Vec<_> = sink
        .events()
        .into_iter()
        .filter_map(|event| match event {
            PreviewEvent::Settled { outcome } => Some(outcome.generation()),
            _ => None,
        })
        .collect();
    assert_eq!(settled, vec![2]);
}
