//! Overlay Configuration
//!
//! Defaults cover the normal page. Hosts may override individual keys: the
//! web build reads a `window.overlayConfig` object, the desktop build reads
//! `OVERLAY_*` environment variables. Both go through
//! [`OverlayConfig::with_overrides`] so parsing and validation are shared.

use crate::brush::StrokeStyle;
use crate::error::{OverlayError, Result};
use crate::expiry::DEFAULT_EXPIRY_DELAY_MS;
use crate::sizing::DEFAULT_RESIZE_DEBOUNCE_MS;

/// Keys understood by [`OverlayConfig::with_overrides`]
pub const KEY_EXPIRY_DELAY_MS: &str = "expiryDelayMs";
pub const KEY_RESIZE_DEBOUNCE_MS: &str = "resizeDebounceMs";
pub const KEY_STROKE_COLOR: &str = "strokeColor";
pub const KEY_STROKE_WIDTH: &str = "strokeWidth";
pub const KEY_TRAIL_ENABLED: &str = "trailEnabled";
pub const KEY_PARTICLE_SEED: &str = "particleSeed";

#[derive(Debug, Clone, PartialEq)]
pub struct OverlayConfig {
    /// How long an auto-expiring stroke stays visible
    pub expiry_delay_ms: f64,
    /// Quiet period after the last window resize before re-rendering
    pub resize_debounce_ms: f64,
    /// Initial stroke style (the inputs may change it later)
    pub stroke_style: StrokeStyle,
    /// Whether the particle trail is on when the page opens
    pub trail_enabled_at_start: bool,
    /// Seed for particle randomness; `None` seeds from the clock
    pub particle_seed: Option<u64>,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            expiry_delay_ms: DEFAULT_EXPIRY_DELAY_MS,
            resize_debounce_ms: DEFAULT_RESIZE_DEBOUNCE_MS,
            stroke_style: StrokeStyle::default(),
            trail_enabled_at_start: false,
            particle_seed: None,
        }
    }
}

impl OverlayConfig {
    /// Validate that parameters are in acceptable ranges
    pub fn validate(&self) -> Result<()> {
        if !self.expiry_delay_ms.is_finite() || self.expiry_delay_ms <= 0.0 {
            return Err(OverlayError::InvalidConfig(format!(
                "{KEY_EXPIRY_DELAY_MS} must be positive, got {}",
                self.expiry_delay_ms
            )));
        }
        if !self.resize_debounce_ms.is_finite() || self.resize_debounce_ms < 0.0 {
            return Err(OverlayError::InvalidConfig(format!(
                "{KEY_RESIZE_DEBOUNCE_MS} must be non-negative, got {}",
                self.resize_debounce_ms
            )));
        }
        self.stroke_style
            .validate()
            .map_err(|e| OverlayError::InvalidConfig(e.to_string()))
    }

    /// Apply string overrides looked up by key, then validate
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(value) = lookup(KEY_EXPIRY_DELAY_MS) {
            self.expiry_delay_ms = parse_number(KEY_EXPIRY_DELAY_MS, &value)?;
        }
        if let Some(value) = lookup(KEY_RESIZE_DEBOUNCE_MS) {
            self.resize_debounce_ms = parse_number(KEY_RESIZE_DEBOUNCE_MS, &value)?;
        }
        let color = lookup(KEY_STROKE_COLOR);
        let width = lookup(KEY_STROKE_WIDTH);
        if color.is_some() || width.is_some() {
            let color = color.unwrap_or_else(|| hex(&self.stroke_style));
            let width = width.unwrap_or_else(|| self.stroke_style.width.to_string());
            self.stroke_style =
                StrokeStyle::from_inputs(&color, &width).map_err(|e| OverlayError::InvalidConfig(e.to_string()))?;
        }
        if let Some(value) = lookup(KEY_TRAIL_ENABLED) {
            self.trail_enabled_at_start = match value.trim() {
                "true" | "1" => true,
                "false" | "0" => false,
                other => {
                    return Err(OverlayError::InvalidConfig(format!(
                        "{KEY_TRAIL_ENABLED} '{other}' is not a boolean"
                    )))
                }
            };
        }
        if let Some(value) = lookup(KEY_PARTICLE_SEED) {
            let seed = value
                .trim()
                .parse()
                .map_err(|_| OverlayError::InvalidConfig(format!("{KEY_PARTICLE_SEED} '{value}' is not an integer")))?;
            self.particle_seed = Some(seed);
        }
        self.validate()?;
        Ok(self)
    }

    /// Desktop: `OVERLAY_EXPIRY_DELAY_MS`, `OVERLAY_STROKE_COLOR`, ...
    #[cfg(not(target_arch = "wasm32"))]
    pub fn from_env() -> Result<Self> {
        Self::default().with_overrides(|key| std::env::var(env_key(key)).ok())
    }
}

fn parse_number(key: &str, value: &str) -> Result<f64> {
    value
        .trim()
        .parse()
        .map_err(|_| OverlayError::InvalidConfig(format!("{key} '{value}' is not a number")))
}

fn hex(style: &StrokeStyle) -> String {
    format!("#{:02x}{:02x}{:02x}", style.color.r, style.color.g, style.color.b)
}

/// `expiryDelayMs` -> `OVERLAY_EXPIRY_DELAY_MS`
#[cfg_attr(target_arch = "wasm32", allow(dead_code))]
fn env_key(key: &str) -> String {
    let mut out = String::from("OVERLAY_");
    for c in key.chars() {
        if c.is_ascii_uppercase() {
            out.push('_');
        }
        out.push(c.to_ascii_uppercase());
    }
    out
}
