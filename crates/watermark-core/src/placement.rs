//! Placement descriptor: where and how strongly a watermark is drawn

use crate::source::WatermarkSource;
use crate::{Result, WatermarkError};
use serde::{Deserialize, Serialize};

/// How the watermark is laid out on the target
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum TilingMode {
    /// One watermark at a fractional position
    #[default]
    SingleAnchored,
    /// Text repeated along both diagonals
    DiagonalTiled,
    /// Image repeated on a 4x4 grid
    GridScattered,
}

/// Normalized placement parameters
///
/// Positions and opacity are clamped to `[0, 1]` and rotation reduced to
/// `[0, 360)`. Non-finite inputs become 0. Deserialized values go through the same
/// normalization as [`Placement::new`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(from = "RawPlacement", rename_all = "camelCase")]
pub struct Placement {
    position_x: f32,
    position_y: f32,
    opacity: f32,
    rotation_degrees: f32,
    mode: TilingMode,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPlacement {
    #[serde(default)]
    position_x: f32,
    #[serde(default)]
    position_y: f32,
    #[serde(default = "default_opacity")]
    opacity: f32,
    #[serde(default)]
    rotation_degrees: f32,
    #[serde(default)]
    mode: TilingMode,
}

fn default_opacity() -> f32 {
    1.0
}

impl From<RawPlacement> for Placement {
    fn from(raw: RawPlacement) -> Self {
        Placement::new(
            raw.position_x,
            raw.position_y,
            raw.opacity,
            raw.rotation_degrees,
            raw.mode,
        )
    }
}

fn finite_or_zero(value: f32) -> f32 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

impl Placement {
    /// Create a placement, normalizing every field
    pub fn new(
        position_x: f32,
        position_y: f32,
        opacity: f32,
        rotation_degrees: f32,
        mode: TilingMode,
    ) -> Self {
        let rotation = finite_or_zero(rotation_degrees).rem_euclid(360.0);
        // rem_euclid can round up to exactly 360 for tiny negative inputs
        let rotation = if rotation >= 360.0 { 0.0 } else { rotation };

        Self {
            position_x: finite_or_zero(position_x).clamp(0.0, 1.0),
            position_y: finite_or_zero(position_y).clamp(0.0, 1.0),
            opacity: finite_or_zero(opacity).clamp(0.0, 1.0),
            rotation_degrees: rotation,
            mode,
        }
    }

    /// Diagonal text tiling at the given opacity
    pub fn diagonal(opacity: f32) -> Self {
        Self::new(0.0, 0.0, opacity, 0.0, TilingMode::DiagonalTiled)
    }

    /// Scattered image grid at the given opacity
    pub fn grid(opacity: f32) -> Self {
        Self::new(0.0, 0.0, opacity, 0.0, TilingMode::GridScattered)
    }

    pub fn position_x(&self) -> f32 {
        self.position_x
    }

    pub fn position_y(&self) -> f32 {
        self.position_y
    }

    pub fn opacity(&self) -> f32 {
        self.opacity
    }

    pub fn rotation_degrees(&self) -> f32 {
        self.rotation_degrees
    }

    pub fn mode(&self) -> TilingMode {
        self.mode
    }

    /// Check that this placement's mode can lay out the given source
    pub fn check_source(&self, source: &WatermarkSource) -> Result<()> {
        let supported = match (self.mode, source) {
            (TilingMode::SingleAnchored, _) => true,
            (TilingMode::DiagonalTiled, WatermarkSource::Text(_)) => true,
            (TilingMode::GridScattered, WatermarkSource::Image(_)) => true,
            _ => false,
        };

        if supported {
            Ok(())
        } else {
            Err(WatermarkError::UnsupportedWatermarkMode {
                mode: self.mode,
                source_kind: source.kind_name(),
            })
        }
    }
}

impl Default for Placement {
    fn default() -> Self {
        Self::new(0.0, 0.0, 1.0, 0.0, TilingMode::SingleAnchored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::FixedFont;
    use crate::source::WatermarkDescriptor;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_opacity_clamped() {
        assert_eq!(Placement::new(0.0, 0.0, 1.7, 0.0, TilingMode::SingleAnchored).opacity(), 1.0);
        assert_eq!(Placement::new(0.0, 0.0, -0.2, 0.0, TilingMode::SingleAnchored).opacity(), 0.0);
        assert_eq!(
            Placement::new(0.0, 0.0, f32::NAN, 0.0, TilingMode::SingleAnchored).opacity(),
            0.0
        );
    }

    #[test]
    fn test_rotation_normalized() {
        let cases = [
            (0.0, 0.0),
            (90.0, 90.0),
            (360.0, 0.0),
            (450.0, 90.0),
            (-90.0, 270.0),
            (-720.0, 0.0),
        ];
        for (input, expected) in cases {
            let placement = Placement::new(0.0, 0.0, 1.0, input, TilingMode::SingleAnchored);
            assert_eq!(placement.rotation_degrees(), expected, "rotation {input}");
        }

        let placement = Placement::new(0.0, 0.0, 1.0, f32::INFINITY, TilingMode::SingleAnchored);
        assert_eq!(placement.rotation_degrees(), 0.0);
    }

    #[test]
    fn test_rotation_plus_full_turn_is_equal() {
        let a = Placement::new(0.25, 0.75, 0.5, 30.0, TilingMode::SingleAnchored);
        let b = Placement::new(0.25, 0.75, 0.5, 390.0, TilingMode::SingleAnchored);
        assert_eq!(a, b);
    }

    #[test]
    fn test_non_finite_position_becomes_zero() {
        let placement = Placement::new(f32::NAN, f32::NEG_INFINITY, 1.0, 0.0, TilingMode::SingleAnchored);
        assert_eq!(placement.position_x(), 0.0);
        assert_eq!(placement.position_y(), 0.0);
    }

    #[test]
    fn test_position_clamped() {
        let placement = Placement::new(-1e19, 1.5, 1.0, 0.0, TilingMode::SingleAnchored);
        assert_eq!(placement.position_x(), 0.0);
        assert_eq!(placement.position_y(), 1.0);

        let placement = Placement::new(0.25, f32::MAX, 1.0, 0.0, TilingMode::SingleAnchored);
        assert_eq!(placement.position_x(), 0.25);
        assert_eq!(placement.position_y(), 1.0);
    }

    #[test]
    fn test_deserialize_normalizes() {
        let json = r#"{"positionX": 0.5, "positionY": 0.25, "opacity": 3.0, "rotationDegrees": -45.0, "mode": "SingleAnchored"}"#;
        let placement: Placement = serde_json::from_str(json).unwrap();

        assert_eq!(placement.position_x(), 0.5);
        assert_eq!(placement.position_y(), 0.25);
        assert_eq!(placement.opacity(), 1.0);
        assert_eq!(placement.rotation_degrees(), 315.0);
        assert_eq!(placement.mode(), TilingMode::SingleAnchored);
    }

    #[test]
    fn test_deserialize_defaults() {
        let placement: Placement = serde_json::from_str(r#"{"mode": "DiagonalTiled"}"#).unwrap();
        assert_eq!(placement, Placement::new(0.0, 0.0, 1.0, 0.0, TilingMode::DiagonalTiled));
    }

    #[test]
    fn test_mode_source_combinations() {
        let fonts = FixedFont::builtin();
        let text = WatermarkDescriptor::text("DRAFT").resolve(&fonts).unwrap();

        assert!(Placement::default().check_source(&text).is_ok());
        assert!(Placement::diagonal(0.3).check_source(&text).is_ok());

        let err = Placement::grid(0.3).check_source(&text).unwrap_err();
        match err {
            WatermarkError::UnsupportedWatermarkMode { mode, source_kind } => {
                assert_eq!(mode, TilingMode::GridScattered);
                assert_eq!(source_kind, "text");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
