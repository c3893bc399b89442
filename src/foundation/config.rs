use crate::foundation::error::{GfxError, GfxResult};
use crate::pool::{PoolStrategy, RefStrength};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Process-level knobs for pipe selection, caching and reclamation.
///
/// Everything here is read once when a [`crate::render::registry::PipeRegistry`] is built; the
/// registry is then shared immutably by every graphics context.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GfxConfig {
    /// Number of stable-source uses a surface proxy waits out before building a cached copy.
    pub proxy_threshold: u32,
    /// Antialiased strokes at or below this device width are drawn as thin strokes.
    pub min_aa_pen_size: f64,
    /// Initial LCD text contrast hint, `100..=250`.
    pub lcd_text_contrast: u32,
    /// Platform text antialiasing policy.
    pub text_policy: TextPolicy,
    /// Scratch-context pooling used by the clip rasterizer.
    pub pool: PoolConfig,
    /// Bounds applied by [`crate::surface::disposer::Disposer::poll_removed`].
    pub disposer: DisposerConfig,
}

impl Default for GfxConfig {
    fn default() -> Self {
        Self {
            proxy_threshold: 1,
            min_aa_pen_size: 0.125,
            lcd_text_contrast: 140,
            text_policy: TextPolicy::default(),
            pool: PoolConfig::default(),
            disposer: DisposerConfig::default(),
        }
    }
}

impl GfxConfig {
    pub fn from_json_str(s: &str) -> GfxResult<Self> {
        let cfg: Self =
            serde_json::from_str(s).map_err(|e| GfxError::config(format!("parse config: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load and validate a JSON config file.
    pub fn from_json_path(path: &Path) -> GfxResult<Self> {
        let f = std::fs::File::open(path).map_err(|e| {
            GfxError::config(format!("open config '{}': {e}", path.display()))
        })?;
        let cfg: Self = serde_json::from_reader(std::io::BufReader::new(f))
            .map_err(|e| GfxError::config(format!("parse config '{}': {e}", path.display())))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> GfxResult<()> {
        if !(100..=250).contains(&self.lcd_text_contrast) {
            return Err(GfxError::config(format!(
                "lcd_text_contrast must be within 100..=250, got {}",
                self.lcd_text_contrast
            )));
        }
        if !self.min_aa_pen_size.is_finite() || self.min_aa_pen_size < 0.0 {
            return Err(GfxError::config("min_aa_pen_size must be finite and >= 0"));
        }
        if self.disposer.max_reclaimed_per_poll == 0 || self.disposer.max_deferred_per_poll == 0 {
            return Err(GfxError::config("disposer poll bounds must be > 0"));
        }
        Ok(())
    }
}

/// How text antialiasing defaults are resolved on this platform.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TextPolicy {
    /// Resolve an explicit "off" text antialiasing request to grayscale antialiasing. Some
    /// platforms cannot render non-antialiased text legibly.
    pub promote_off_to_aa: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PoolConfig {
    pub strategy: PoolStrategy,
    pub strength: RefStrength,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DisposerConfig {
    pub max_reclaimed_per_poll: usize,
    pub max_deferred_per_poll: usize,
}

impl Default for DisposerConfig {
    fn default() -> Self {
        Self {
            max_reclaimed_per_poll: 10_000,
            max_deferred_per_poll: 100,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/config.rs"]
mod tests;
