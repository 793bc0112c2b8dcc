//! Preview session state

use serde::{Deserialize, Serialize};

use crate::constants::{device_widths, zoom};
use crate::props::PropertyBag;

/// Colour scheme applied to the sandbox document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }

    pub fn background(&self) -> &'static str {
        match self {
            Theme::Light => "#ffffff",
            Theme::Dark => "#0f172a",
        }
    }

    pub fn foreground(&self) -> &'static str {
        match self {
            Theme::Light => "#0f172a",
            Theme::Dark => "#f8fafc",
        }
    }
}

/// Simulated viewport class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Device {
    Mobile,
    Tablet,
    #[default]
    Desktop,
}

impl Device {
    pub fn as_str(&self) -> &'static str {
        match self {
            Device::Mobile => "mobile",
            Device::Tablet => "tablet",
            Device::Desktop => "desktop",
        }
    }

    /// Width of the root frame in CSS pixels; desktop fills the container
    pub fn width(&self) -> Option<u32> {
        match self {
            Device::Mobile => Some(device_widths::MOBILE),
            Device::Tablet => Some(device_widths::TABLET),
            Device::Desktop => None,
        }
    }
}

/// User-facing preview controls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewSettings {
    pub theme: Theme,
    pub device: Device,
    /// Zoom in percent, clamped to [`zoom::MIN`]..=[`zoom::MAX`]
    pub zoom: u16,
    pub playing: bool,
}

impl Default for PreviewSettings {
    fn default() -> Self {
        Self {
            theme: Theme::default(),
            device: Device::default(),
            zoom: zoom::DEFAULT,
            playing: true,
        }
    }
}

impl PreviewSettings {
    pub fn clamp_zoom(percent: u16) -> u16 {
        percent.clamp(zoom::MIN, zoom::MAX)
    }
}

/// One live sandbox instance.
///
/// Built fresh for every rebuild and never patched afterwards, apart from the
/// zoom, which only affects the container.
#[derive(Debug, Clone, PartialEq)]
pub struct PreviewSession {
    generation: u64,
    settings: PreviewSettings,
    props: PropertyBag,
}

impl PreviewSession {
    pub(crate) fn new(generation: u64, settings: PreviewSettings, props: PropertyBag) -> Self {
        Self {
            generation,
            settings,
            props,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn settings(&self) -> &PreviewSettings {
        &self.settings
    }

    pub fn theme(&self) -> Theme {
        self.settings.theme
    }

    pub fn device(&self) -> Device {
        self.settings.device
    }

    pub fn zoom(&self) -> u16 {
        self.settings.zoom
    }

    pub fn is_playing(&self) -> bool {
        self.settings.playing
    }

    pub fn props(&self) -> &PropertyBag {
        &self.props
    }

    pub(crate) fn set_zoom(&mut self, percent: u16) {
        self.settings.zoom = percent;
    }
}
