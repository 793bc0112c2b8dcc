//! Preview engine constants
//!
//! Single source of truth for the numbers baked into assembled programs.

/// Zoom bounds for the sandbox container (percent)
pub mod zoom {
    pub const MIN: u16 = 25;
    pub const MAX: u16 = 200;
    pub const DEFAULT: u16 = 100;
}

/// Simulated device widths (CSS pixels)
pub mod device_widths {
    pub const MOBILE: u32 = 375;
    pub const TABLET: u32 = 768;
}

/// Sandbox execution defaults
pub mod sandbox {
    /// Time a program may run before the load is abandoned
    pub const DEFAULT_TIMEOUT_MS: u64 = 5000;
    /// Element id of the sandbox's single root node
    pub const ROOT_ID: &str = "root";
    /// Value for the iframe `sandbox` attribute when embedding the document
    pub const IFRAME_SANDBOX: &str = "allow-scripts";
    /// Style origins the sandbox document may load from
    pub const STYLE_ORIGINS: &[&str] = &["https://cdn.tailwindcss.com"];
    /// Script origins the sandbox document may load from (style tooling only)
    pub const SCRIPT_ORIGINS: &[&str] = &["https://cdn.tailwindcss.com"];
}

/// Identifiers the assembled program reserves for itself
pub mod reserved {
    pub const MODULE_FN: &str = "__forge_module";
    pub const HOST: &str = "__forge_host";
    pub const RUNTIME: &str = "__forge";
}
