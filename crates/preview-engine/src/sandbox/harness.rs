//! Render Harness
//!
//! Wraps a normalized body into the program the sandbox executes: runtime,
//! mock bindings, the body inside its own function scope, then one call into
//! `__forge.boot` which looks the component up, renders it behind a fault
//! boundary and reports back to the host.

use serde::{Deserialize, Serialize};

use crate::constants::reserved;
use crate::mocks::MockLibrary;
use crate::normalizer::NormalizedProgram;
use crate::props::PropertyBag;
use crate::session::{Device, Theme};

/// React-compatible runtime and harness helpers shared by every program
pub const RUNTIME_JS: &str = include_str!("runtime.js");

/// Parameters baked into the boot call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HarnessConfig {
    pub generation: u64,
    pub theme: Theme,
    pub device: Device,
    pub width: Option<u32>,
}

impl HarnessConfig {
    pub fn new(generation: u64, theme: Theme, device: Device) -> Self {
        Self {
            generation,
            theme,
            device,
            width: device.width(),
        }
    }
}

/// Why the harness fell back to an error panel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The primary symbol was not defined after the body ran
    ComponentNotFound,
    /// The component body threw while being evaluated
    Evaluation,
    /// The first render threw
    Render,
}

/// What the harness reports once the program settles
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum HarnessReport {
    Mounted {
        generation: u64,
        markup: String,
    },
    Failed {
        generation: u64,
        kind: FailureKind,
        message: String,
        markup: String,
    },
}

impl HarnessReport {
    pub fn generation(&self) -> u64 {
        match self {
            HarnessReport::Mounted { generation, .. } | HarnessReport::Failed { generation, .. } => {
                *generation
            }
        }
    }

    /// Markup attached to the sandbox root
    pub fn markup(&self) -> &str {
        match self {
            HarnessReport::Mounted { markup, .. } | HarnessReport::Failed { markup, .. } => markup,
        }
    }
}

/// Build the script for one program
pub fn bootstrap_script(
    program: &NormalizedProgram,
    mocks: &MockLibrary,
    config: &HarnessConfig,
    props: &PropertyBag,
) -> Result<String, serde_json::Error> {
    let config_json = serde_json::to_string(config)?;
    let name_json = serde_json::to_string(&program.component_name)?;
    let props_json = props.to_json()?;
    let name = &program.component_name;

    let mut script = String::with_capacity(RUNTIME_JS.len() + program.body.len() + 4096);
    script.push_str(RUNTIME_JS);
    script.push('\n');
    script.push_str(&mocks.render());
    script.push_str("\n\n");
    script.push_str(&format!("function {}() {{\n", reserved::MODULE_FN));
    script.push_str(&program.body);
    script.push_str(&format!(
        "\n;return typeof {name} !== 'undefined' ? {name} : undefined;\n}}\n"
    ));
    script.push_str(&format!(
        "{}.boot({}, {}, {}, {});\n",
        reserved::RUNTIME,
        config_json,
        reserved::MODULE_FN,
        name_json,
        props_json
    ));
    Ok(script)
}
