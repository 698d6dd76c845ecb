use super::bucket::Axis;
use super::filter::IntervalPolicy;
use crate::error::{HeatmapError, Result};
use glam::Vec3;
use gpui::Rgba;
use serde::{Deserialize, Serialize};

/// Serde helper for `Rgba` <-> `#rrggbbaa` strings.
pub mod hex_color {
    use gpui::Rgba;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    fn channel(v: f32) -> u8 {
        (v.clamp(0.0, 1.0) * 255.0).round() as u8
    }

    pub fn to_hex(color: &Rgba) -> String {
        format!(
            "#{:02x}{:02x}{:02x}{:02x}",
            channel(color.r),
            channel(color.g),
            channel(color.b),
            channel(color.a)
        )
    }

    /// Accepts `#rrggbb` and `#rrggbbaa` (leading `#` optional).
    pub fn parse_hex_str(hex: &str) -> Option<Rgba> {
        let digits = hex.strip_prefix('#').unwrap_or(hex);
        if !(digits.len() == 6 || digits.len() == 8) || !digits.is_ascii() {
            return None;
        }
        let byte = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).ok();
        let a = if digits.len() == 8 { byte(6)? } else { 255 };
        Some(Rgba {
            r: byte(0)? as f32 / 255.0,
            g: byte(2)? as f32 / 255.0,
            b: byte(4)? as f32 / 255.0,
            a: a as f32 / 255.0,
        })
    }

    pub fn serialize<S>(color: &Rgba, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&to_hex(color))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Rgba, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse_hex_str(&s).ok_or_else(|| D::Error::custom(format!("invalid color '{s}'")))
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BucketStyle {
    /// One vertex per bucket.
    Point,
    /// Eight vertices per bucket, drawn as filled faces and/or wireframe edges.
    #[default]
    Cube,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub enum FillStyle {
    None,
    /// Sample the color gradient with the normalized bucket value.
    #[default]
    Gradient,
    Solid(#[serde(with = "hex_color")] Rgba),
}

/// What an edge gradient is sampled on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GradientSource {
    Axis(Axis),
    Value,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub enum EdgeStyle {
    #[default]
    None,
    /// Constant color handed to the draw call; no color array is built.
    Solid(#[serde(with = "hex_color")] Rgba),
    Gradient(GradientSource),
}

/// Projected-space box the normalized `[0,1]^3` cube is mapped into.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SceneBox {
    pub min: [f32; 3],
    pub max: [f32; 3],
}

impl Default for SceneBox {
    fn default() -> Self {
        Self {
            min: [0.0; 3],
            max: [1.0; 3],
        }
    }
}

impl SceneBox {
    pub fn project(&self, normalized: Vec3) -> Vec3 {
        let min = Vec3::from_array(self.min);
        let max = Vec3::from_array(self.max);
        min + normalized * (max - min)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeatmapConfig {
    pub bucket_style: BucketStyle,
    pub fill: FillStyle,
    pub edges: EdgeStyle,
    /// Emit 4-float RGBA colors instead of 3-float RGB.
    pub alpha: bool,
    pub scene: SceneBox,
    /// Sort raw input into sorted mode on every data replacement.
    pub presort: bool,
    pub interval_policy: IntervalPolicy,
    /// Pins the value-axis domain instead of tracking the data range.
    pub fixed_value_range: Option<(f64, f64)>,
}

impl Default for HeatmapConfig {
    fn default() -> Self {
        Self {
            bucket_style: BucketStyle::Cube,
            fill: FillStyle::Gradient,
            edges: EdgeStyle::None,
            alpha: false,
            scene: SceneBox::default(),
            presort: true,
            interval_policy: IntervalPolicy::Strict,
            fixed_value_range: None,
        }
    }
}

impl HeatmapConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| HeatmapError::Config(e.to_string()))
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| HeatmapError::Config(e.to_string()))
    }

    pub fn color_stride(&self) -> usize {
        if self.alpha {
            4
        } else {
            3
        }
    }
}
