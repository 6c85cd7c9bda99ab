use glam::Vec3;
use thiserror::Error;

use crate::brush::{BrushStamp, StampKind};

#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("Non-finite stamp center: ({x}, {y})")]
    NonFiniteCenter { x: f32, y: f32 },
    #[error("Invalid stamp radius: {0}")]
    InvalidRadius(f32),
    #[error("Invalid stamp strength: {0}")]
    InvalidStrength(f32),
    #[error("Invalid flow vector: ({x}, {y})")]
    InvalidFlow { x: f32, y: f32 },
    #[error("Invalid ray: origin={origin:?}, direction={direction:?}")]
    InvalidRay { origin: Vec3, direction: Vec3 },
}

/// Check that a stamp can be rasterized without corrupting the field
pub fn validate_stamp(stamp: &BrushStamp) -> Result<(), ValidationError> {
    if !stamp.center.is_finite() {
        return Err(ValidationError::NonFiniteCenter {
            x: stamp.center.x,
            y: stamp.center.y,
        });
    }

    if !stamp.radius.is_finite() || stamp.radius <= 0.0 {
        return Err(ValidationError::InvalidRadius(stamp.radius));
    }

    // Zero strength is valid input but changes nothing; callers skip it
    if !stamp.strength.is_finite() || stamp.strength < 0.0 {
        return Err(ValidationError::InvalidStrength(stamp.strength));
    }

    if let StampKind::Flow(flow) = stamp.kind {
        if !flow.is_finite() {
            return Err(ValidationError::InvalidFlow {
                x: flow.x,
                y: flow.y,
            });
        }
    }

    Ok(())
}

/// Check that a ray has a finite origin and a usable direction
pub fn validate_ray(origin: Vec3, direction: Vec3) -> Result<(), ValidationError> {
    if !origin.is_finite() || !direction.is_finite() || direction.length_squared() <= 0.0 {
        return Err(ValidationError::InvalidRay { origin, direction });
    }
    Ok(())
}

/// Clamp a pressure reading into 0..=1, treating garbage as no pressure
pub fn sanitize_pressure(pressure: Option<f32>) -> Option<f32> {
    pressure.filter(|p| p.is_finite()).map(|p| p.clamp(0.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;

    fn stamp() -> BrushStamp {
        BrushStamp::flow(Vec2::new(10.0, 10.0), 5.0, Vec2::X, 1.0)
    }

    #[test]
    fn test_valid_stamp() {
        assert!(validate_stamp(&stamp()).is_ok());
    }

    #[test]
    fn test_rejects_nan_center() {
        let mut s = stamp();
        s.center.x = f32::NAN;
        assert!(matches!(
            validate_stamp(&s),
            Err(ValidationError::NonFiniteCenter { .. })
        ));
    }

    #[test]
    fn test_rejects_bad_radius() {
        let mut s = stamp();
        s.radius = 0.0;
        assert_eq!(validate_stamp(&s), Err(ValidationError::InvalidRadius(0.0)));
        s.radius = f32::INFINITY;
        assert!(validate_stamp(&s).is_err());
    }

    #[test]
    fn test_rejects_nan_flow() {
        let mut s = stamp();
        s.kind = StampKind::Flow(Vec2::new(f32::NAN, 0.0));
        assert!(validate_stamp(&s).is_err());
    }

    #[test]
    fn test_validate_ray() {
        assert!(validate_ray(Vec3::ZERO, Vec3::Z).is_ok());
        assert!(validate_ray(Vec3::ZERO, Vec3::ZERO).is_err());
        assert!(validate_ray(Vec3::splat(f32::NAN), Vec3::Z).is_err());
    }

    #[test]
    fn test_sanitize_pressure() {
        assert_eq!(sanitize_pressure(Some(1.5)), Some(1.0));
        assert_eq!(sanitize_pressure(Some(f32::NAN)), None);
        assert_eq!(sanitize_pressure(None), None);
    }
}
