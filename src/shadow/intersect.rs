//! Ray intersection routines for the shadow narrow phase
//!
//! Every routine takes a unit `direction` and returns the distance along the
//! ray to the nearest hit in front of the origin. Degenerate shapes and
//! near-parallel configurations report `None` instead of producing NaN.

use glam::Vec3;

/// Nearest positive hit of a ray with a sphere.
pub fn ray_sphere(origin: Vec3, direction: Vec3, center: Vec3, radius: f32) -> Option<f32> {
    if radius.is_nan() || radius <= 0.0 {
        return None;
    }
    let center_to_origin = origin - center;
    let half_b = center_to_origin.dot(direction);
    let c = center_to_origin.length_squared() - radius * radius;
    let discriminant = half_b * half_b - c;
    if discriminant < 0.0 {
        return None;
    }
    let root = discriminant.sqrt();
    [-half_b - root, -half_b + root]
        .into_iter()
        .find(|&distance| distance > 0.0)
}

/// Nearest positive hit of a ray with a capped cylinder from `start` to `end`.
///
/// Tests the curved body (within the axis span) and both end caps. A
/// zero-radius or zero-length cylinder never hits.
pub fn ray_capped_cylinder(
    origin: Vec3,
    direction: Vec3,
    start: Vec3,
    end: Vec3,
    radius: f32,
) -> Option<f32> {
    let axis = end - start;
    let axis_length_squared = axis.length_squared();
    let degenerate_axis = !axis_length_squared.is_finite() || axis_length_squared <= f32::EPSILON;
    if radius.is_nan() || radius <= 0.0 || degenerate_axis {
        return None;
    }

    let start_to_origin = origin - start;
    let axis_dot_direction = axis.dot(direction);
    let axis_dot_origin = axis.dot(start_to_origin);
    let radius_squared = radius * radius;

    let mut nearest: Option<f32> = None;
    let mut consider = |distance: f32| {
        if distance > 0.0 && distance.is_finite() && nearest.map_or(true, |best| distance < best) {
            nearest = Some(distance);
        }
    };

    // Body: |q|^2 - (q.axis)^2 / |axis|^2 = r^2 with q = start_to_origin + t * direction
    let k2 = axis_length_squared - axis_dot_direction * axis_dot_direction;
    if k2 > f32::EPSILON * axis_length_squared {
        let k1 = axis_length_squared * start_to_origin.dot(direction)
            - axis_dot_origin * axis_dot_direction;
        let k0 = axis_length_squared * start_to_origin.length_squared()
            - axis_dot_origin * axis_dot_origin
            - radius_squared * axis_length_squared;
        let discriminant = k1 * k1 - k2 * k0;
        if discriminant >= 0.0 {
            let root = discriminant.sqrt();
            for distance in [(-k1 - root) / k2, (-k1 + root) / k2] {
                let along_axis = axis_dot_origin + distance * axis_dot_direction;
                if (0.0..=axis_length_squared).contains(&along_axis) {
                    consider(distance);
                }
            }
        }
    }

    // Caps: planes through start and end, perpendicular to the axis.
    if axis_dot_direction.abs() > f32::EPSILON {
        for (cap_center, cap_offset) in [(start, 0.0), (end, axis_length_squared)] {
            let distance = (cap_offset - axis_dot_origin) / axis_dot_direction;
            let hit_point = origin + direction * distance;
            if hit_point.distance_squared(cap_center) <= radius_squared {
                consider(distance);
            }
        }
    }

    nearest
}

/// Möller–Trumbore ray/triangle intersection.
///
/// Rays nearly parallel to the triangle plane (`|det| < epsilon`) and
/// degenerate triangles report no hit. Hits closer than `epsilon` are ignored.
pub fn ray_triangle(
    origin: Vec3,
    direction: Vec3,
    vertices: [Vec3; 3],
    epsilon: f32,
) -> Option<f32> {
    let edge_one = vertices[1] - vertices[0];
    let edge_two = vertices[2] - vertices[0];
    let direction_cross_edge = direction.cross(edge_two);
    let determinant = edge_one.dot(direction_cross_edge);
    if determinant.is_nan() || determinant.abs() < epsilon {
        return None;
    }
    let inverse_determinant = 1.0 / determinant;

    let vertex_to_origin = origin - vertices[0];
    let u = vertex_to_origin.dot(direction_cross_edge) * inverse_determinant;
    if !(0.0..=1.0).contains(&u) {
        return None;
    }

    let origin_cross_edge = vertex_to_origin.cross(edge_one);
    let v = direction.dot(origin_cross_edge) * inverse_determinant;
    if v < 0.0 || u + v > 1.0 {
        return None;
    }

    let distance = edge_two.dot(origin_cross_edge) * inverse_determinant;
    (distance > epsilon).then_some(distance)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-7;

    fn assert_close(actual: Option<f32>, expected: f32) {
        let actual = actual.expect("expected a hit");
        assert!((actual - expected).abs() < 1e-4, "expected {}, got {}", expected, actual);
    }

    #[test]
    fn test_ray_sphere_front_and_inside() {
        assert_close(ray_sphere(Vec3::ZERO, Vec3::Z, Vec3::new(0.0, 0.0, 5.0), 1.0), 4.0);
        assert_close(ray_sphere(Vec3::ZERO, Vec3::Z, Vec3::ZERO, 2.0), 2.0);
        assert!(ray_sphere(Vec3::ZERO, Vec3::Z, Vec3::new(0.0, 0.0, -5.0), 1.0).is_none());
        assert!(ray_sphere(Vec3::ZERO, Vec3::Z, Vec3::new(3.0, 0.0, 5.0), 1.0).is_none());
        assert!(ray_sphere(Vec3::ZERO, Vec3::Z, Vec3::new(0.0, 0.0, 5.0), 0.0).is_none());
    }

    #[test]
    fn test_ray_cylinder_body() {
        let start = Vec3::new(-1.0, 0.0, 1.0);
        let end = Vec3::new(1.0, 0.0, 1.0);
        assert_close(ray_capped_cylinder(Vec3::ZERO, Vec3::Z, start, end, 0.2), 0.8);
        assert!(ray_capped_cylinder(Vec3::new(0.0, 0.5, 0.0), Vec3::Z, start, end, 0.2).is_none());
        // Beyond the end cap along the axis.
        assert!(ray_capped_cylinder(Vec3::new(1.5, 0.0, 0.0), Vec3::Z, start, end, 0.2).is_none());
    }

    #[test]
    fn test_ray_cylinder_cap() {
        // Ray travelling along the axis hits the near cap.
        let start = Vec3::new(0.0, 0.0, 2.0);
        let end = Vec3::new(0.0, 0.0, 4.0);
        assert_close(ray_capped_cylinder(Vec3::ZERO, Vec3::Z, start, end, 0.5), 2.0);
        assert_close(ray_capped_cylinder(Vec3::new(0.3, 0.0, 0.0), Vec3::Z, start, end, 0.5), 2.0);
        assert!(ray_capped_cylinder(Vec3::new(0.6, 0.0, 0.0), Vec3::Z, start, end, 0.5).is_none());
    }

    #[test]
    fn test_ray_cylinder_degenerate() {
        let start = Vec3::new(-1.0, 0.0, 1.0);
        let end = Vec3::new(1.0, 0.0, 1.0);
        assert!(ray_capped_cylinder(Vec3::ZERO, Vec3::Z, start, end, 0.0).is_none());
        assert!(ray_capped_cylinder(Vec3::ZERO, Vec3::Z, start, start, 0.5).is_none());
        assert!(ray_capped_cylinder(Vec3::ZERO, Vec3::Z, start, end, f32::NAN).is_none());
    }

    #[test]
    fn test_ray_triangle_hit_and_miss() {
        let triangle = [Vec3::ZERO, Vec3::X, Vec3::Y];
        assert_close(ray_triangle(Vec3::new(0.25, 0.25, -1.0), Vec3::Z, triangle, EPSILON), 1.0);
        assert!(ray_triangle(Vec3::new(0.75, 0.75, -1.0), Vec3::Z, triangle, EPSILON).is_none());
        assert!(ray_triangle(Vec3::new(0.25, 0.25, 1.0), Vec3::Z, triangle, EPSILON).is_none());
    }

    #[test]
    fn test_ray_triangle_edges_are_inclusive() {
        let triangle = [Vec3::ZERO, Vec3::X, Vec3::Y];
        assert!(ray_triangle(Vec3::new(0.5, 0.0, -1.0), Vec3::Z, triangle, EPSILON).is_some());
        assert!(ray_triangle(Vec3::new(0.0, 0.0, -1.0), Vec3::Z, triangle, EPSILON).is_some());
    }

    #[test]
    fn test_ray_triangle_degenerate() {
        let collinear = [Vec3::ZERO, Vec3::X, Vec3::X * 2.0];
        assert!(ray_triangle(Vec3::new(0.5, 0.0, -1.0), Vec3::Z, collinear, EPSILON).is_none());
        // Ray parallel to the triangle plane.
        let triangle = [Vec3::ZERO, Vec3::X, Vec3::Y];
        assert!(ray_triangle(Vec3::new(-1.0, 0.2, 0.0), Vec3::X, triangle, EPSILON).is_none());
    }
}
