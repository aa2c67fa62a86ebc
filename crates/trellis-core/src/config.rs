#![forbid(unsafe_code)]

//! Render configuration shared by a render session.

use serde::{Deserialize, Serialize};

/// Default number of nested closure updates before propagation is treated
/// as a dependency cycle.
pub const DEFAULT_PROPAGATION_LIMIT: usize = 256;

/// Default viewport width (px) at or below which the device is `mobile`.
pub const DEFAULT_BREAKPOINT_WIDTH: u32 = 768;

/// Configuration for one render session.
///
/// ```
/// use trellis_core::RenderConfig;
///
/// let config = RenderConfig::default()
///     .with_dark_mode(true)
///     .with_propagation_limit(64);
/// assert!(config.dark_mode);
/// assert_eq!(config.propagation_limit, 64);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Nested closure updates allowed before failing fast.
    pub propagation_limit: usize,
    /// Render `StringValue` content as inline markdown when interactive.
    pub markdown: bool,
    /// Viewport width at or below which the device is `mobile`.
    pub breakpoint_width: u32,
    /// Initial colour scheme.
    pub dark_mode: bool,
    /// Prefix of generated style-class names.
    pub class_prefix: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            propagation_limit: DEFAULT_PROPAGATION_LIMIT,
            markdown: true,
            breakpoint_width: DEFAULT_BREAKPOINT_WIDTH,
            dark_mode: false,
            class_prefix: "__".to_owned(),
        }
    }
}

impl RenderConfig {
    #[must_use]
    pub fn with_propagation_limit(mut self, limit: usize) -> Self {
        self.propagation_limit = limit.max(1);
        self
    }

    #[must_use]
    pub fn with_markdown(mut self, enabled: bool) -> Self {
        self.markdown = enabled;
        self
    }

    #[must_use]
    pub fn with_breakpoint_width(mut self, width: u32) -> Self {
        self.breakpoint_width = width;
        self
    }

    #[must_use]
    pub fn with_dark_mode(mut self, dark: bool) -> Self {
        self.dark_mode = dark;
        self
    }

    #[must_use]
    pub fn with_class_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.class_prefix = prefix.into();
        self
    }

    /// Whether a viewport of `width` pixels counts as mobile.
    #[must_use]
    pub fn is_mobile_width(&self, width: u32) -> bool {
        width <= self.breakpoint_width
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = RenderConfig::default();
        assert_eq!(config.propagation_limit, DEFAULT_PROPAGATION_LIMIT);
        assert!(config.markdown);
        assert!(!config.dark_mode);
        assert_eq!(config.class_prefix, "__");
    }

    #[test]
    fn zero_limit_is_clamped() {
        let config = RenderConfig::default().with_propagation_limit(0);
        assert_eq!(config.propagation_limit, 1);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: RenderConfig = serde_json::from_str(r#"{"dark_mode": true}"#).unwrap();
        assert!(config.dark_mode);
        assert_eq!(config.breakpoint_width, DEFAULT_BREAKPOINT_WIDTH);
    }

    #[test]
    fn breakpoint_is_inclusive() {
        let config = RenderConfig::default().with_breakpoint_width(600);
        assert!(config.is_mobile_width(600));
        assert!(!config.is_mobile_width(601));
    }
}
