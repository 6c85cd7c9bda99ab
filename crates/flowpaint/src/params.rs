//! Brush parameters and the keyed registry the undo history writes through

use glam::Vec2;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::config::{
    EngineConfig, MAX_BRUSH_RADIUS, MAX_BRUSH_STRENGTH, MIN_BRUSH_RADIUS, MIN_BRUSH_STRENGTH,
};
use crate::types::BrushMode;

/// Radius change per horizontal pixel of a quick-adjust drag
pub const QUICK_ADJUST_RADIUS_PER_PX: f32 = 0.1;

/// Strength change per vertical pixel of a quick-adjust drag (up = stronger)
pub const QUICK_ADJUST_STRENGTH_PER_PX: f32 = 0.005;

/// Keys of parameters that can be read and written through a registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamKey {
    BrushRadius,
    BrushStrength,
    SpeedSensitivity,
    BrushMode,
    Seamless,
    InvertX,
    InvertY,
}

/// A parameter value
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ParamValue {
    Float(f32),
    Bool(bool),
    Mode(BrushMode),
}

#[derive(Debug, Error, PartialEq)]
pub enum ParamError {
    #[error("Parameter key not registered: {0:?}")]
    UnknownKey(ParamKey),
    #[error("Parameter {key:?} cannot take value {value:?}")]
    TypeMismatch { key: ParamKey, value: ParamValue },
    #[error("Parameter {0:?} must be finite")]
    NonFinite(ParamKey),
}

/// Keyed parameter access.
///
/// `transient` marks drag-preview writes; implementations apply them the
/// same way, the distinction matters to whoever records history.
pub trait ParameterRegistry {
    fn read(&self, key: ParamKey) -> Result<ParamValue, ParamError>;

    fn apply(&mut self, key: ParamKey, value: ParamValue, transient: bool) -> Result<(), ParamError>;

    fn has_key(&self, key: ParamKey) -> bool {
        self.read(key).is_ok()
    }
}

/// Live brush settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrushSettings {
    pub radius: f32,
    pub strength: f32,
    pub speed_sensitivity: f32,
    pub mode: BrushMode,
    pub seamless: bool,
    pub invert_x: bool,
    pub invert_y: bool,
}

impl Default for BrushSettings {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

/// Brush values captured when a quick-adjust drag starts
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdjustAnchor {
    pub radius: f32,
    pub strength: f32,
}

impl BrushSettings {
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            radius: config.brush.radius,
            strength: config.brush.strength,
            speed_sensitivity: config.brush.speed_sensitivity,
            mode: BrushMode::Flow,
            seamless: config.canvas.seamless,
            invert_x: config.export.invert_x,
            invert_y: config.export.invert_y,
        }
    }

    pub fn anchor(&self) -> AdjustAnchor {
        AdjustAnchor {
            radius: self.radius,
            strength: self.strength,
        }
    }

    /// Modifier-drag adjustment relative to `anchor`.
    ///
    /// Dominant horizontal motion sets the radius, dominant vertical motion
    /// the strength; the other value returns to its anchor. Returns the key
    /// that changed.
    pub fn quick_adjust(&mut self, anchor: AdjustAnchor, delta: Vec2) -> Option<ParamKey> {
        if !delta.is_finite() {
            return None;
        }
        if delta.x.abs() > delta.y.abs() {
            self.radius = (anchor.radius + delta.x * QUICK_ADJUST_RADIUS_PER_PX)
                .clamp(MIN_BRUSH_RADIUS, MAX_BRUSH_RADIUS);
            self.strength = anchor.strength;
            Some(ParamKey::BrushRadius)
        } else {
            // Screen Y grows down; dragging up strengthens
            self.strength = (anchor.strength - delta.y * QUICK_ADJUST_STRENGTH_PER_PX)
                .clamp(MIN_BRUSH_STRENGTH, MAX_BRUSH_STRENGTH);
            self.radius = anchor.radius;
            Some(ParamKey::BrushStrength)
        }
    }
}

fn expect_float(key: ParamKey, value: ParamValue) -> Result<f32, ParamError> {
    match value {
        ParamValue::Float(v) if v.is_finite() => Ok(v),
        ParamValue::Float(_) => Err(ParamError::NonFinite(key)),
        _ => Err(ParamError::TypeMismatch { key, value }),
    }
}

fn expect_bool(key: ParamKey, value: ParamValue) -> Result<bool, ParamError> {
    match value {
        ParamValue::Bool(v) => Ok(v),
        _ => Err(ParamError::TypeMismatch { key, value }),
    }
}

impl ParameterRegistry for BrushSettings {
    fn read(&self, key: ParamKey) -> Result<ParamValue, ParamError> {
        Ok(match key {
            ParamKey::BrushRadius => ParamValue::Float(self.radius),
            ParamKey::BrushStrength => ParamValue::Float(self.strength),
            ParamKey::SpeedSensitivity => ParamValue::Float(self.speed_sensitivity),
            ParamKey::BrushMode => ParamValue::Mode(self.mode),
            ParamKey::Seamless => ParamValue::Bool(self.seamless),
            ParamKey::InvertX => ParamValue::Bool(self.invert_x),
            ParamKey::InvertY => ParamValue::Bool(self.invert_y),
        })
    }

    fn apply(&mut self, key: ParamKey, value: ParamValue, transient: bool) -> Result<(), ParamError> {
        match key {
            ParamKey::BrushRadius => {
                self.radius = expect_float(key, value)?.clamp(MIN_BRUSH_RADIUS, MAX_BRUSH_RADIUS)
            }
            ParamKey::BrushStrength => {
                self.strength =
                    expect_float(key, value)?.clamp(MIN_BRUSH_STRENGTH, MAX_BRUSH_STRENGTH)
            }
            ParamKey::SpeedSensitivity => {
                self.speed_sensitivity = expect_float(key, value)?.clamp(0.0, 1.0)
            }
            ParamKey::BrushMode => match value {
                ParamValue::Mode(mode) => self.mode = mode,
                _ => return Err(ParamError::TypeMismatch { key, value }),
            },
            ParamKey::Seamless => self.seamless = expect_bool(key, value)?,
            ParamKey::InvertX => self.invert_x = expect_bool(key, value)?,
            ParamKey::InvertY => self.invert_y = expect_bool(key, value)?,
        }
        debug!(
            "BrushSettings::apply: {:?} = {:?} (transient={})",
            key, value, transient
        );
        Ok(())
    }
}
