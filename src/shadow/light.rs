//! Orthonormal frame aligned with a directional light

use glam::{Vec2, Vec3};

/// Smallest direction length accepted as a light direction
const MIN_DIRECTION_LENGTH: f32 = 1e-6;

/// Unit direction toward the light plus two unit axes spanning the plane
/// perpendicular to it.
///
/// Projecting onto `(axis_x, axis_y)` collapses depth along the light, so two
/// shapes can only shadow each other if their projections overlap.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightBasis {
    direction: Vec3,
    axis_x: Vec3,
    axis_y: Vec3,
}

impl LightBasis {
    /// Builds the basis for a light lying in `direction` from the scene.
    ///
    /// Returns `None` for zero-length or non-finite directions.
    pub fn new(direction: Vec3) -> Option<Self> {
        let length = direction.length();
        if !length.is_finite() || length < MIN_DIRECTION_LENGTH {
            return None;
        }
        let direction = direction / length;

        // Cross with the coordinate axis least aligned with the light.
        let helper_axis = if direction.x.abs() < 0.9 { Vec3::X } else { Vec3::Y };
        let axis_x = direction.cross(helper_axis).normalize();
        let axis_y = axis_x.cross(direction);

        Some(Self {
            direction,
            axis_x,
            axis_y,
        })
    }

    /// Unit vector pointing toward the light
    pub fn direction(&self) -> Vec3 {
        self.direction
    }

    pub fn axis_x(&self) -> Vec3 {
        self.axis_x
    }

    pub fn axis_y(&self) -> Vec3 {
        self.axis_y
    }

    /// Position in the plane perpendicular to the light
    #[inline]
    pub fn project(&self, point: Vec3) -> Vec2 {
        Vec2::new(point.dot(self.axis_x), point.dot(self.axis_y))
    }

    /// Signed distance along the light direction
    #[inline]
    pub fn depth(&self, point: Vec3) -> f32 {
        point.dot(self.direction)
    }
}
