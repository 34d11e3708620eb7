//! Resolution-independent screen coordinates.
//!
//! A [`NormalizedPoint`] expresses a cursor position as a fraction of the
//! screen's width and height, so a click at the centre of a 1920×1080 screen
//! and a click at the centre of a 2560×1440 screen are both `(0.5, 0.5)`.
//!
//! Values outside `[0.0, 1.0]` are rejected, never clamped: the relay drops
//! such a message instead of replaying it on the screen edge.

use std::fmt;

use crate::protocol::codec::ProtocolError;

/// Identifies the coordinate axis in validation errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    /// Horizontal axis (`relX` on the wire).
    X,
    /// Vertical axis (`relY` on the wire).
    Y,
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Axis::X => f.write_str("relX"),
            Axis::Y => f.write_str("relY"),
        }
    }
}

/// A screen position expressed as fractions of width and height.
///
/// Both components are guaranteed to lie in `[0.0, 1.0]`; the only way to
/// build one is through a validating constructor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizedPoint {
    x: f64,
    y: f64,
}

impl NormalizedPoint {
    /// Creates a point from relative coordinates.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::CoordinateOutOfRange`] if either component is
    /// NaN, negative, or greater than `1.0`.  The boundaries `0.0` and `1.0`
    /// are accepted.
    pub fn new(x: f64, y: f64) -> Result<Self, ProtocolError> {
        check_axis(Axis::X, x)?;
        check_axis(Axis::Y, y)?;
        Ok(Self { x, y })
    }

    /// Normalizes an absolute pixel position against a screen size.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::InvalidScreenSize`] for a zero-sized screen and
    /// [`ProtocolError::CoordinateOutOfRange`] when the pixel lies outside the
    /// screen (e.g. on a secondary monitor).
    pub fn from_pixels(px: i32, py: i32, width: u32, height: u32) -> Result<Self, ProtocolError> {
        if width == 0 || height == 0 {
            return Err(ProtocolError::InvalidScreenSize { width, height });
        }
        Self::new(f64::from(px) / f64::from(width), f64::from(py) / f64::from(height))
    }

    /// Relative horizontal position in `[0.0, 1.0]`.
    pub fn x(&self) -> f64 {
        self.x
    }

    /// Relative vertical position in `[0.0, 1.0]`.
    pub fn y(&self) -> f64 {
        self.y
    }

    /// Maps the point onto a screen of the given size.
    ///
    /// `1.0` maps to the last pixel column/row rather than one past it, so the
    /// result always addresses a pixel that exists on the target screen.
    pub fn to_pixels(&self, width: u32, height: u32) -> (i32, i32) {
        (scale(self.x, width), scale(self.y, height))
    }
}

fn check_axis(axis: Axis, value: f64) -> Result<(), ProtocolError> {
    if value.is_nan() || !(0.0..=1.0).contains(&value) {
        return Err(ProtocolError::CoordinateOutOfRange { axis, value });
    }
    Ok(())
}

fn scale(fraction: f64, extent: u32) -> i32 {
    if extent == 0 {
        return 0;
    }
    let last = i64::from(extent) - 1;
    let pixel = (fraction * f64::from(extent)).floor() as i64;
    pixel.clamp(0, last) as i32
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_accepts_exact_boundaries() {
        assert!(NormalizedPoint::new(0.0, 0.0).is_ok());
        assert!(NormalizedPoint::new(1.0, 1.0).is_ok());
        assert!(NormalizedPoint::new(0.0, 1.0).is_ok());
    }

    #[test]
    fn test_new_rejects_negative_x() {
        let err = NormalizedPoint::new(-0.01, 0.5).unwrap_err();
        assert_eq!(
            err,
            ProtocolError::CoordinateOutOfRange {
                axis: Axis::X,
                value: -0.01
            }
        );
    }

    #[test]
    fn test_new_rejects_y_above_one() {
        let err = NormalizedPoint::new(0.5, 1.0001).unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::CoordinateOutOfRange { axis: Axis::Y, .. }
        ));
    }

    #[test]
    fn test_new_rejects_nan() {
        assert!(NormalizedPoint::new(f64::NAN, 0.5).is_err());
        assert!(NormalizedPoint::new(0.5, f64::NAN).is_err());
    }

    #[test]
    fn test_new_rejects_infinity() {
        assert!(NormalizedPoint::new(f64::INFINITY, 0.5).is_err());
    }

    #[test]
    fn test_from_pixels_centre_of_1080p() {
        // Arrange / Act
        let p = NormalizedPoint::from_pixels(960, 540, 1920, 1080).unwrap();

        // Assert
        assert_eq!(p.x(), 0.5);
        assert_eq!(p.y(), 0.5);
    }

    #[test]
    fn test_from_pixels_zero_width_is_error() {
        let err = NormalizedPoint::from_pixels(0, 0, 0, 1080).unwrap_err();
        assert_eq!(
            err,
            ProtocolError::InvalidScreenSize {
                width: 0,
                height: 1080
            }
        );
    }

    #[test]
    fn test_from_pixels_outside_screen_is_rejected() {
        // A cursor on a monitor to the right of the primary one.
        assert!(NormalizedPoint::from_pixels(2500, 100, 1920, 1080).is_err());
        assert!(NormalizedPoint::from_pixels(-10, 100, 1920, 1080).is_err());
    }

    #[test]
    fn test_to_pixels_scales_to_target_resolution() {
        let p = NormalizedPoint::new(0.25, 0.75).unwrap();
        assert_eq!(p.to_pixels(2560, 1440), (640, 1080));
    }

    #[test]
    fn test_to_pixels_one_maps_to_last_pixel() {
        let p = NormalizedPoint::new(1.0, 1.0).unwrap();
        assert_eq!(p.to_pixels(1920, 1080), (1919, 1079));
    }

    #[test]
    fn test_to_pixels_zero_sized_screen_is_origin() {
        let p = NormalizedPoint::new(0.5, 0.5).unwrap();
        assert_eq!(p.to_pixels(0, 0), (0, 0));
    }

    #[test]
    fn test_axis_display_uses_wire_names() {
        assert_eq!(Axis::X.to_string(), "relX");
        assert_eq!(Axis::Y.to_string(), "relY");
    }
}
