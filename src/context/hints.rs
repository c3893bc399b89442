use crate::foundation::error::{GfxError, GfxResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderQualityHint {
    #[default]
    Default,
    Speed,
    Quality,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AntialiasHint {
    Default,
    #[default]
    Off,
    On,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextAntialiasHint {
    /// Follow the shape antialiasing hint.
    #[default]
    Default,
    Off,
    On,
    /// Let the font's per-size table decide.
    Gasp,
    LcdHrgb,
    LcdHbgr,
    LcdVrgb,
    LcdVbgr,
}

impl TextAntialiasHint {
    pub fn is_lcd(self) -> bool {
        matches!(
            self,
            Self::LcdHrgb | Self::LcdHbgr | Self::LcdVrgb | Self::LcdVbgr
        )
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FractionalMetricsHint {
    Default,
    #[default]
    Off,
    On,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterpolationHint {
    #[default]
    NearestNeighbor,
    Bilinear,
    Bicubic,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrokeControlHint {
    #[default]
    Default,
    Normalize,
    Pure,
}

/// One rendering hint, as set on a context or listed in a script.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "key", content = "value", rename_all = "snake_case")]
pub enum RenderingHint {
    Rendering(RenderQualityHint),
    Antialiasing(AntialiasHint),
    TextAntialiasing(TextAntialiasHint),
    FractionalMetrics(FractionalMetricsHint),
    TextLcdContrast(u32),
    Interpolation(InterpolationHint),
    StrokeControl(StrokeControlHint),
    /// Hint the pipeline does not interpret; stored and returned verbatim.
    Custom {
        name: String,
        value: serde_json::Value,
    },
}

impl RenderingHint {
    pub fn key(&self) -> HintKey {
        match self {
            Self::Rendering(_) => HintKey::Rendering,
            Self::Antialiasing(_) => HintKey::Antialiasing,
            Self::TextAntialiasing(_) => HintKey::TextAntialiasing,
            Self::FractionalMetrics(_) => HintKey::FractionalMetrics,
            Self::TextLcdContrast(_) => HintKey::TextLcdContrast,
            Self::Interpolation(_) => HintKey::Interpolation,
            Self::StrokeControl(_) => HintKey::StrokeControl,
            Self::Custom { name, .. } => HintKey::Custom(name.clone()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum HintKey {
    Rendering,
    Antialiasing,
    TextAntialiasing,
    FractionalMetrics,
    TextLcdContrast,
    Interpolation,
    StrokeControl,
    Custom(String),
}

/// Which derived state a hint change touched.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct HintChange {
    /// Pipes must be re-selected.
    pub state: bool,
    /// Cached font information must be recomputed.
    pub text: bool,
    /// The stroke classification depends on the changed value.
    pub stroke: bool,
}

/// Hint values held by a graphics context.
#[derive(Clone, Debug, PartialEq)]
pub struct Hints {
    pub rendering: RenderQualityHint,
    pub antialiasing: AntialiasHint,
    pub text_antialiasing: TextAntialiasHint,
    pub fractional_metrics: FractionalMetricsHint,
    pub lcd_contrast: u32,
    /// Explicit interpolation hint; `None` lets the rendering hint decide.
    pub interpolation: Option<InterpolationHint>,
    /// Effective image interpolation.
    pub interpolation_type: InterpolationHint,
    pub stroke_control: StrokeControlHint,
    pub custom: BTreeMap<String, serde_json::Value>,
}

impl Hints {
    pub fn new(lcd_contrast: u32) -> Self {
        Self {
            rendering: RenderQualityHint::Default,
            antialiasing: AntialiasHint::Off,
            text_antialiasing: TextAntialiasHint::Default,
            fractional_metrics: FractionalMetricsHint::Off,
            lcd_contrast,
            interpolation: None,
            interpolation_type: InterpolationHint::NearestNeighbor,
            stroke_control: StrokeControlHint::Default,
            custom: BTreeMap::new(),
        }
    }

    /// Store `hint`, reporting what it invalidated.
    pub(crate) fn apply(&mut self, hint: RenderingHint) -> GfxResult<HintChange> {
        let mut change = HintChange::default();
        match hint {
            RenderingHint::Rendering(v) => {
                change.state = self.rendering != v;
                if change.state {
                    self.rendering = v;
                    if self.interpolation.is_none() {
                        self.interpolation_type = match v {
                            RenderQualityHint::Quality => InterpolationHint::Bilinear,
                            _ => InterpolationHint::NearestNeighbor,
                        };
                    }
                }
            }
            RenderingHint::Antialiasing(v) => {
                change.state = self.antialiasing != v;
                self.antialiasing = v;
                if change.state {
                    change.text = self.text_antialiasing == TextAntialiasHint::Default;
                    change.stroke = true;
                }
            }
            RenderingHint::TextAntialiasing(v) => {
                change.state = self.text_antialiasing != v;
                change.text = change.state;
                self.text_antialiasing = v;
            }
            RenderingHint::FractionalMetrics(v) => {
                change.state = self.fractional_metrics != v;
                change.text = change.state;
                self.fractional_metrics = v;
            }
            RenderingHint::TextLcdContrast(v) => {
                if !(100..=250).contains(&v) {
                    return Err(GfxError::illegal_argument(format!(
                        "lcd text contrast must be within 100..=250, got {v}"
                    )));
                }
                self.lcd_contrast = v;
            }
            RenderingHint::Interpolation(v) => {
                self.interpolation = Some(v);
                change.state = self.interpolation_type != v;
                self.interpolation_type = v;
            }
            RenderingHint::StrokeControl(v) => {
                change.state = self.stroke_control != v;
                self.stroke_control = v;
            }
            RenderingHint::Custom { name, value } => {
                self.custom.insert(name, value);
            }
        }
        Ok(change)
    }

    pub fn get(&self, key: &HintKey) -> Option<RenderingHint> {
        Some(match key {
            HintKey::Rendering => RenderingHint::Rendering(self.rendering),
            HintKey::Antialiasing => RenderingHint::Antialiasing(self.antialiasing),
            HintKey::TextAntialiasing => RenderingHint::TextAntialiasing(self.text_antialiasing),
            HintKey::FractionalMetrics => RenderingHint::FractionalMetrics(self.fractional_metrics),
            HintKey::TextLcdContrast => RenderingHint::TextLcdContrast(self.lcd_contrast),
            HintKey::Interpolation => RenderingHint::Interpolation(self.interpolation?),
            HintKey::StrokeControl => RenderingHint::StrokeControl(self.stroke_control),
            HintKey::Custom(name) => RenderingHint::Custom {
                name: name.clone(),
                value: self.custom.get(name)?.clone(),
            },
        })
    }

    /// Every hint currently set, custom hints last.
    pub fn to_list(&self) -> Vec<RenderingHint> {
        let mut out = vec![
            RenderingHint::Rendering(self.rendering),
            RenderingHint::Antialiasing(self.antialiasing),
            RenderingHint::TextAntialiasing(self.text_antialiasing),
            RenderingHint::FractionalMetrics(self.fractional_metrics),
            RenderingHint::TextLcdContrast(self.lcd_contrast),
        ];
        if let Some(i) = self.interpolation {
            out.push(RenderingHint::Interpolation(i));
        }
        out.push(RenderingHint::StrokeControl(self.stroke_control));
        out.extend(self.custom.iter().map(|(name, value)| RenderingHint::Custom {
            name: name.clone(),
            value: value.clone(),
        }));
        out
    }
}

#[cfg(test)]
#[path = "../../tests/unit/context/hints.rs"]
mod tests;
