//! Named, parameterised pixel transforms applied in place to one layer.
//!
//! Callers checkpoint the stack before applying a filter; `Document` does
//! this for you.

pub mod adjust;
pub mod blur;
pub mod inpaint;
pub mod smudge;

use std::collections::HashMap;

use crate::canvas::layer_stack::LayerStack;
use crate::error::{EngineError, Result};
use crate::utils::profiler::ScopeTimer;
use crate::utils::vector::Vec2;

pub use inpaint::InpaintMethod;

/// Largest blur radius accepted; kernels grow linearly with it.
pub const MAX_BLUR_RADIUS: i64 = 512;
/// Largest inpaint neighbourhood radius accepted.
pub const MAX_INPAINT_RADIUS: i64 = 50;
/// Largest smudge dab diameter accepted, in pixels.
pub const MAX_SMUDGE_SIZE: f64 = 300.0;

/// One filter parameter as supplied by the caller.
#[derive(Clone, Debug, PartialEq)]
pub enum ParamValue {
    Int(i64),
    Float(f64),
    Str(String),
    Points(Vec<Vec2>),
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Int(v)
    }
}

impl From<i32> for ParamValue {
    fn from(v: i32) -> Self {
        ParamValue::Int(v as i64)
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Float(v)
    }
}

impl From<f32> for ParamValue {
    fn from(v: f32) -> Self {
        ParamValue::Float(v as f64)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::Str(v.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        ParamValue::Str(v)
    }
}

impl From<Vec<Vec2>> for ParamValue {
    fn from(v: Vec<Vec2>) -> Self {
        ParamValue::Points(v)
    }
}

/// Parameter map keyed by name. Missing keys fall back to per-filter defaults.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FilterParams {
    values: HashMap<String, ParamValue>,
}

impl FilterParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ParamValue>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.values.get(key)
    }

    /// Integer parameter; integral floats are accepted too.
    pub fn int(&self, key: &str, default: i64) -> Result<i64> {
        match self.values.get(key) {
            None => Ok(default),
            Some(ParamValue::Int(v)) => Ok(*v),
            Some(ParamValue::Float(v)) if v.is_finite() && v.fract() == 0.0 => Ok(*v as i64),
            Some(other) => Err(wrong_type(key, "an integer", other)),
        }
    }

    pub fn float(&self, key: &str, default: f64) -> Result<f64> {
        match self.values.get(key) {
            None => Ok(default),
            Some(ParamValue::Int(v)) => Ok(*v as f64),
            Some(ParamValue::Float(v)) if v.is_finite() => Ok(*v),
            Some(other) => Err(wrong_type(key, "a finite number", other)),
        }
    }

    pub fn string(&self, key: &str, default: &str) -> Result<String> {
        match self.values.get(key) {
            None => Ok(default.to_string()),
            Some(ParamValue::Str(v)) => Ok(v.clone()),
            Some(other) => Err(wrong_type(key, "a string", other)),
        }
    }

    pub fn points(&self, key: &str) -> Result<Option<Vec<Vec2>>> {
        match self.values.get(key) {
            None => Ok(None),
            Some(ParamValue::Points(v)) if v.iter().all(|p| p.is_finite()) => Ok(Some(v.clone())),
            Some(other) => Err(wrong_type(key, "a list of finite points", other)),
        }
    }
}

fn wrong_type(key: &str, expected: &str, got: &ParamValue) -> EngineError {
    EngineError::invalid(format!("parameter '{key}' must be {expected}, got {got:?}"))
}

fn in_range(key: &str, value: i64, min: i64, max: i64) -> Result<i64> {
    if value < min || value > max {
        return Err(EngineError::invalid(format!(
            "parameter '{key}' must be in {min}..={max}, got {value}"
        )));
    }
    Ok(value)
}

/// A fully validated filter invocation.
#[derive(Clone, Debug, PartialEq)]
pub enum Filter {
    GaussianBlur {
        radius: u32,
    },
    UnsharpMask {
        radius: u32,
        amount: f32,
        threshold: u8,
    },
    BrightnessContrast {
        brightness: i32,
        contrast: i32,
    },
    Inpaint {
        method: InpaintMethod,
        radius: u32,
        points: Option<Vec<Vec2>>,
    },
    Smudge {
        size: f32,
        strength: f32,
        points: Vec<Vec2>,
    },
}

impl Filter {
    pub const NAMES: [&'static str; 5] = [
        "gaussian_blur",
        "unsharp_mask",
        "brightness_contrast",
        "inpaint",
        "smudge",
    ];

    /// Resolve a filter name and its parameters, validating everything up front.
    pub fn parse(name: &str, params: &FilterParams) -> Result<Self> {
        match name {
            "gaussian_blur" => {
                let radius = in_range("radius", params.int("radius", 5)?, 1, MAX_BLUR_RADIUS)?;
                Ok(Filter::GaussianBlur {
                    radius: radius as u32,
                })
            }
            "unsharp_mask" => {
                let radius = in_range("radius", params.int("radius", 3)?, 1, MAX_BLUR_RADIUS)?;
                let amount = params.float("amount", 1.0)?;
                if amount < 0.0 {
                    return Err(EngineError::invalid(format!(
                        "parameter 'amount' must be >= 0, got {amount}"
                    )));
                }
                let threshold = in_range("threshold", params.int("threshold", 0)?, 0, 255)?;
                Ok(Filter::UnsharpMask {
                    radius: radius as u32,
                    amount: amount as f32,
                    threshold: threshold as u8,
                })
            }
            "brightness_contrast" => {
                let brightness = in_range("brightness", params.int("brightness", 0)?, -100, 100)?;
                let contrast = in_range("contrast", params.int("contrast", 0)?, -100, 100)?;
                Ok(Filter::BrightnessContrast {
                    brightness: brightness as i32,
                    contrast: contrast as i32,
                })
            }
            "inpaint" => {
                let method = InpaintMethod::from_name(&params.string("method", "telea")?)?;
                let radius = in_range("radius", params.int("radius", 3)?, 1, MAX_INPAINT_RADIUS)?;
                Ok(Filter::Inpaint {
                    method,
                    radius: radius as u32,
                    points: params.points("points")?,
                })
            }
            "smudge" => {
                let size = params.float("size", 15.0)?;
                if size <= 0.0 || size > MAX_SMUDGE_SIZE {
                    return Err(EngineError::invalid(format!(
                        "parameter 'size' must be in (0, {MAX_SMUDGE_SIZE}], got {size}"
                    )));
                }
                let strength = params.float("strength", 0.5)?;
                if !(0.0..=1.0).contains(&strength) {
                    return Err(EngineError::invalid(format!(
                        "parameter 'strength' must be in [0, 1], got {strength}"
                    )));
                }
                let points = match params.points("points")? {
                    Some(points) if !points.is_empty() => points,
                    _ => return Err(EngineError::invalid("smudge needs at least one point")),
                };
                Ok(Filter::Smudge {
                    size: size as f32,
                    strength: strength as f32,
                    points,
                })
            }
            other => Err(EngineError::UnsupportedOperation(format!("filter '{other}'"))),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Filter::GaussianBlur { .. } => "gaussian_blur",
            Filter::UnsharpMask { .. } => "unsharp_mask",
            Filter::BrightnessContrast { .. } => "brightness_contrast",
            Filter::Inpaint { .. } => "inpaint",
            Filter::Smudge { .. } => "smudge",
        }
    }
}

/// Dispatches filters onto a layer of a stack.
pub struct FilterEngine;

impl FilterEngine {
    /// Parse `filter_name`/`params` and apply the filter to layer `layer`.
    pub fn apply(
        stack: &mut LayerStack,
        layer: usize,
        filter_name: &str,
        params: &FilterParams,
    ) -> Result<()> {
        let filter = Filter::parse(filter_name, params)?;
        Self::apply_filter(stack, layer, &filter)
    }

    pub fn apply_filter(stack: &mut LayerStack, layer: usize, filter: &Filter) -> Result<()> {
        let grid = stack.layer_mut(layer)?.pixels_mut();
        let _timer = ScopeTimer::new(filter.name());
        log::debug!("apply {} to layer {}", filter.name(), layer);
        match filter {
            Filter::GaussianBlur { radius } => blur::gaussian_blur(grid, *radius),
            Filter::UnsharpMask {
                radius,
                amount,
                threshold,
            } => blur::unsharp_mask(grid, *radius, *amount, *threshold),
            Filter::BrightnessContrast {
                brightness,
                contrast,
            } => adjust::brightness_contrast(grid, *brightness, *contrast),
            Filter::Inpaint {
                method,
                radius,
                points,
            } => inpaint::inpaint(grid, *method, *radius, points.as_deref()),
            Filter::Smudge {
                size,
                strength,
                points,
            } => smudge::smudge(grid, *size, *strength, points),
        }
    }
}
