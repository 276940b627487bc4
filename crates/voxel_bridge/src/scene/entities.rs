//! Placeable scene entities
//!
//! Plain data. Each entity serializes as the flat JSON array the renderer
//! expects rather than as an object, so field order here is wire order.

use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};

use super::error::SceneError;
use super::quantize::round_two_decimals;
use crate::foundation::math::Vec3;

/// Largest integer an `f64` holds exactly
const MAX_EXACT_INT: f64 = 9_007_199_254_740_992.0;

/// Number written as a JSON integer when it has no fractional part
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Num(pub f64);

impl Serialize for Num {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let v = self.0;
        if v.is_finite() && v.fract() == 0.0 && v.abs() < MAX_EXACT_INT {
            serializer.serialize_i64(v as i64)
        } else {
            serializer.serialize_f64(v)
        }
    }
}

/// RGBA colour with components rounded to two decimals
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    /// Red
    pub r: f64,
    /// Green
    pub g: f64,
    /// Blue
    pub b: f64,
    /// Opacity
    pub alpha: f64,
}

impl Color {
    /// Build a colour, rounding each component
    pub fn new(r: f64, g: f64, b: f64, alpha: f64) -> Self {
        Self {
            r: round_two_decimals(r),
            g: round_two_decimals(g),
            b: round_two_decimals(b),
            alpha: round_two_decimals(alpha),
        }
    }

    /// Opaque white, used for textured boxes
    pub fn white() -> Self {
        Self::new(1.0, 1.0, 1.0, 1.0)
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::white()
    }
}

/// Euler angles in degrees
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Angles {
    /// Rotation about the lateral axis
    pub pitch: f64,
    /// Rotation about the vertical axis
    pub yaw: f64,
    /// Rotation about the depth axis
    pub roll: f64,
}

impl Angles {
    /// Build from pitch, yaw and roll
    pub fn new(pitch: f64, yaw: f64, roll: f64) -> Self {
        Self { pitch, yaw, roll }
    }

    /// All three angles negated
    pub fn negated(self) -> Self {
        Self::new(-self.pitch, -self.yaw, -self.roll)
    }
}

/// One voxel: `[x, y, z, r, g, b, alpha, textureId]`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoxelBox {
    /// Quantized cell position
    pub position: Vec3,
    /// Colour
    pub color: Color,
    /// Index into the texture catalog, -1 when untextured
    pub texture_id: i32,
}

impl VoxelBox {
    /// Whether this box occupies `position`
    pub fn occupies(&self, position: &Vec3) -> bool {
        self.position == *position
    }
}

impl Serialize for VoxelBox {
    #[rustfmt::skip]
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let p = &self.position;
        let c = &self.color;
        (
            Num(p.x), Num(p.y), Num(p.z),
            Num(c.r), Num(c.g), Num(c.b), Num(c.alpha),
            self.texture_id,
        )
            .serialize(serializer)
    }
}

/// A box recorded while framing: `[x, y, z, r, g, b, alpha, textureId, frameId]`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FramedBox {
    /// The box itself
    pub voxel: VoxelBox,
    /// Frame it belongs to
    pub frame_id: u32,
}

impl Serialize for FramedBox {
    #[rustfmt::skip]
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let p = &self.voxel.position;
        let c = &self.voxel.color;
        (
            Num(p.x), Num(p.y), Num(p.z),
            Num(c.r), Num(c.g), Num(c.b), Num(c.alpha),
            self.voxel.texture_id,
            self.frame_id,
        )
            .serialize(serializer)
    }
}

/// Node placement recorded while framing: `[x, y, z, pitch, yaw, roll, frameId]`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameTransform {
    /// Quantized node position
    pub position: Vec3,
    /// Node orientation
    pub angles: Angles,
    /// Frame it belongs to
    pub frame_id: u32,
}

impl Serialize for FrameTransform {
    #[rustfmt::skip]
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let p = &self.position;
        let a = &self.angles;
        (
            Num(p.x), Num(p.y), Num(p.z),
            Num(a.pitch), Num(a.yaw), Num(a.roll),
            self.frame_id,
        )
            .serialize(serializer)
    }
}

/// Animation parameters: `[x, y, z, pitch, yaw, roll, scale, interval]`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Animation {
    /// Target offset
    pub position: Vec3,
    /// Target orientation
    pub angles: Angles,
    /// Target scale
    pub scale: f64,
    /// Duration between steps
    pub interval: f64,
}

impl Default for Animation {
    fn default() -> Self {
        Self {
            position: Vec3::zeros(),
            angles: Angles::default(),
            scale: 1.0,
            interval: 0.0,
        }
    }
}

impl Serialize for Animation {
    #[rustfmt::skip]
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let p = &self.position;
        let a = &self.angles;
        (
            Num(p.x), Num(p.y), Num(p.z),
            Num(a.pitch), Num(a.yaw), Num(a.roll),
            Num(self.scale), Num(self.interval),
        )
            .serialize(serializer)
    }
}

/// Text placed in the scene:
/// `[text, x, y, z, r, g, b, alpha, fontSize, isFixedWidth]`
#[derive(Debug, Clone, PartialEq)]
pub struct Sentence {
    /// The text
    pub text: String,
    /// Quantized anchor position
    pub position: Vec3,
    /// Colour
    pub color: Color,
    /// Font size in points
    pub font_size: f64,
    /// Monospaced layout
    pub fixed_width: bool,
}

impl Serialize for Sentence {
    #[rustfmt::skip]
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let p = &self.position;
        let c = &self.color;
        (
            &self.text,
            Num(p.x), Num(p.y), Num(p.z),
            Num(c.r), Num(c.g), Num(c.b), Num(c.alpha),
            Num(self.font_size),
            u8::from(self.fixed_width),
        )
            .serialize(serializer)
    }
}

/// Light kinds with their wire codes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LightType {
    /// Omnidirectional
    #[default]
    Point,
    /// Cone
    Spot,
    /// Parallel rays
    Directional,
}

impl LightType {
    /// Wire code: point=1, spot=2, directional=3
    pub fn code(self) -> u8 {
        match self {
            Self::Point => 1,
            Self::Spot => 2,
            Self::Directional => 3,
        }
    }
}

impl FromStr for LightType {
    type Err = SceneError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "point" => Ok(Self::Point),
            "spot" => Ok(Self::Spot),
            "directional" => Ok(Self::Directional),
            other => Err(SceneError::InvalidLightType(other.to_string())),
        }
    }
}

/// Light: `[x, y, z, r, g, b, alpha, intensity, interval, lightType]`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Light {
    /// Quantized position
    pub position: Vec3,
    /// Colour
    pub color: Color,
    /// Brightness
    pub intensity: f64,
    /// Blink interval
    pub interval: f64,
    /// Kind of light
    pub light_type: LightType,
}

impl Serialize for Light {
    #[rustfmt::skip]
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let p = &self.position;
        let c = &self.color;
        (
            Num(p.x), Num(p.y), Num(p.z),
            Num(c.r), Num(c.g), Num(c.b), Num(c.alpha),
            Num(self.intensity), Num(self.interval),
            self.light_type.code(),
        )
            .serialize(serializer)
    }
}

/// Primitive used to draw every voxel
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Shape {
    /// Cube
    #[default]
    Box,
    /// Ball
    Sphere,
    /// Flat square
    Plane,
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Box => "box",
            Self::Sphere => "sphere",
            Self::Plane => "plane",
        };
        f.write_str(name)
    }
}

impl FromStr for Shape {
    type Err = SceneError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "box" => Ok(Self::Box),
            "sphere" => Ok(Self::Sphere),
            "plane" => Ok(Self::Plane),
            other => Err(SceneError::InvalidShape(other.to_string())),
        }
    }
}

/// Placed model: `[modelName, x, y, z, pitch, yaw, roll, scale, entityName]`
#[derive(Debug, Clone, PartialEq)]
pub struct Model {
    /// Catalog model name
    pub model_name: String,
    /// Quantized position
    pub position: Vec3,
    /// Orientation
    pub angles: Angles,
    /// Uniform scale
    pub scale: f64,
    /// Instance name used by later moves
    pub entity_name: String,
}

impl Serialize for Model {
    #[rustfmt::skip]
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let p = &self.position;
        let a = &self.angles;
        (
            &self.model_name,
            Num(p.x), Num(p.y), Num(p.z),
            Num(a.pitch), Num(a.yaw), Num(a.roll),
            Num(self.scale),
            &self.entity_name,
        )
            .serialize(serializer)
    }
}

/// Model instance move: `[entityName, x, y, z, pitch, yaw, roll, scale]`
#[derive(Debug, Clone, PartialEq)]
pub struct ModelMove {
    /// Instance being moved
    pub entity_name: String,
    /// Quantized position
    pub position: Vec3,
    /// Orientation
    pub angles: Angles,
    /// Uniform scale
    pub scale: f64,
}

impl Serialize for ModelMove {
    #[rustfmt::skip]
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let p = &self.position;
        let a = &self.angles;
        (
            &self.entity_name,
            Num(p.x), Num(p.y), Num(p.z),
            Num(a.pitch), Num(a.yaw), Num(a.roll),
            Num(self.scale),
        )
            .serialize(serializer)
    }
}

/// 2-D game overlay: `[width, height, angle, r, g, b, alpha]`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GameScreen {
    /// Screen width in voxels
    pub width: f64,
    /// Screen height in voxels
    pub height: f64,
    /// Tilt in degrees
    pub angle: f64,
    /// Background colour
    pub color: Color,
}

impl Serialize for GameScreen {
    #[rustfmt::skip]
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let c = &self.color;
        (
            Num(self.width), Num(self.height), Num(self.angle),
            Num(c.r), Num(c.g), Num(c.b), Num(c.alpha),
        )
            .serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integral_numbers_serialize_as_integers() {
        let voxel = VoxelBox {
            position: Vec3::new(1.0, -2.0, 3.0),
            color: Color::new(1.0, 0.5, 0.0, 1.0),
            texture_id: -1,
        };
        let json = serde_json::to_string(&voxel).unwrap();
        assert_eq!(json, "[1,-2,3,1,0.5,0,1,-1]");
    }

    #[test]
    fn test_sentence_wire_layout() {
        let sentence = Sentence {
            text: "Hello".to_string(),
            position: Vec3::new(0.0, 10.0, 0.0),
            color: Color::new(1.0, 0.0, 0.0, 1.0),
            font_size: 16.0,
            fixed_width: true,
        };
        let json = serde_json::to_string(&sentence).unwrap();
        assert_eq!(json, r#"["Hello",0,10,0,1,0,0,1,16,1]"#);
    }

    #[test]
    fn test_light_codes() {
        assert_eq!("point".parse::<LightType>().unwrap().code(), 1);
        assert_eq!("Spot".parse::<LightType>().unwrap().code(), 2);
        assert_eq!("directional".parse::<LightType>().unwrap().code(), 3);
        assert!(matches!("laser".parse::<LightType>(), Err(SceneError::InvalidLightType(_))));
    }

    #[test]
    fn test_shape_names() {
        assert_eq!("sphere".parse::<Shape>().unwrap(), Shape::Sphere);
        assert_eq!(Shape::Plane.to_string(), "plane");
        assert!("cone".parse::<Shape>().is_err());
    }

    #[test]
    fn test_color_rounding() {
        let c = Color::new(0.123, 0.456, 0.789, 1.0);
        assert_eq!((c.r, c.g, c.b), (0.12, 0.46, 0.79));
    }
}
