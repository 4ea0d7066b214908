//! Shadow-casting primitives and the arena that owns them

use glam::Vec3;

use super::intersect::{ray_capped_cylinder, ray_sphere, ray_triangle};

/// Kind of shadow caster. Each kind gets its own light-frame grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    Sphere,
    Cylinder,
    Triangle,
}

impl PrimitiveKind {
    /// Kinds in the order occlusion passes visit them
    pub const ALL: [PrimitiveKind; 3] = [
        PrimitiveKind::Sphere,
        PrimitiveKind::Cylinder,
        PrimitiveKind::Triangle,
    ];

    #[inline]
    pub(crate) fn slot(self) -> usize {
        match self {
            PrimitiveKind::Sphere => 0,
            PrimitiveKind::Cylinder => 1,
            PrimitiveKind::Triangle => 2,
        }
    }
}

/// Sphere enclosing a primitive, used for broad-phase culling
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingSphere {
    pub center: Vec3,
    pub radius: f32,
}

/// Geometry that can cast a shadow
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ShadowPrimitive {
    Sphere { center: Vec3, radius: f32 },
    Cylinder { start: Vec3, end: Vec3, radius: f32 },
    Triangle { vertices: [Vec3; 3] },
}

impl ShadowPrimitive {
    pub fn kind(&self) -> PrimitiveKind {
        match self {
            ShadowPrimitive::Sphere { .. } => PrimitiveKind::Sphere,
            ShadowPrimitive::Cylinder { .. } => PrimitiveKind::Cylinder,
            ShadowPrimitive::Triangle { .. } => PrimitiveKind::Triangle,
        }
    }

    /// Whether every coordinate and radius is finite
    pub fn is_finite(&self) -> bool {
        match self {
            ShadowPrimitive::Sphere { center, radius } => center.is_finite() && radius.is_finite(),
            ShadowPrimitive::Cylinder { start, end, radius } => {
                start.is_finite() && end.is_finite() && radius.is_finite()
            }
            ShadowPrimitive::Triangle { vertices } => {
                vertices.iter().all(|vertex| vertex.is_finite())
            }
        }
    }

    /// Sphere that encloses the primitive.
    ///
    /// Cylinders use their midpoint and half-length plus radius; triangles use
    /// their centroid and the distance to the farthest vertex.
    pub fn bounding_sphere(&self) -> BoundingSphere {
        match *self {
            ShadowPrimitive::Sphere { center, radius } => BoundingSphere { center, radius },
            ShadowPrimitive::Cylinder { start, end, radius } => BoundingSphere {
                center: (start + end) * 0.5,
                radius: start.distance(end) * 0.5 + radius,
            },
            ShadowPrimitive::Triangle { vertices } => {
                let centroid = (vertices[0] + vertices[1] + vertices[2]) / 3.0;
                let radius = vertices
                    .iter()
                    .map(|vertex| vertex.distance(centroid))
                    .fold(0.0f32, f32::max);
                BoundingSphere { center: centroid, radius }
            }
        }
    }

    /// Distance along a unit-direction ray to the nearest hit in front of `origin`.
    pub fn intersect_ray(
        &self,
        origin: Vec3,
        direction: Vec3,
        determinant_epsilon: f32,
    ) -> Option<f32> {
        match *self {
            ShadowPrimitive::Sphere { center, radius } => {
                ray_sphere(origin, direction, center, radius)
            }
            ShadowPrimitive::Cylinder { start, end, radius } => {
                ray_capped_cylinder(origin, direction, start, end, radius)
            }
            ShadowPrimitive::Triangle { vertices } => {
                ray_triangle(origin, direction, vertices, determinant_epsilon)
            }
        }
    }
}

/// Handle to a primitive owned by a [`ShadowPrimitiveCache`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PrimitiveHandle {
    kind: PrimitiveKind,
    index: u32,
}

impl PrimitiveHandle {
    pub(crate) fn new(kind: PrimitiveKind, index: usize) -> Self {
        Self {
            kind,
            index: index as u32,
        }
    }

    pub fn kind(&self) -> PrimitiveKind {
        self.kind
    }

    /// Position within the primitives of the same kind
    pub fn index(&self) -> usize {
        self.index as usize
    }
}

/// Primitives of one kind with their bounding spheres, index-aligned
#[derive(Debug, Clone, Default)]
pub(crate) struct PrimitiveList {
    pub(crate) shapes: Vec<ShadowPrimitive>,
    pub(crate) bounds: Vec<BoundingSphere>,
}

/// Arena owning every shadow caster of a frame
///
/// Storage is one flat list per kind; callers only ever hold
/// [`PrimitiveHandle`]s.
#[derive(Debug, Clone, Default)]
pub struct ShadowPrimitiveCache {
    lists: [PrimitiveList; 3],
}

impl ShadowPrimitiveCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a primitive and its bounding sphere.
    ///
    /// Negative radii are clamped to zero. Primitives with non-finite
    /// geometry are rejected.
    pub fn insert(&mut self, primitive: ShadowPrimitive) -> Option<PrimitiveHandle> {
        if !primitive.is_finite() {
            log::warn!("shadow cache: rejecting non-finite primitive {:?}", primitive);
            return None;
        }
        let primitive = match primitive {
            ShadowPrimitive::Sphere { center, radius } => ShadowPrimitive::Sphere {
                center,
                radius: radius.max(0.0),
            },
            ShadowPrimitive::Cylinder { start, end, radius } => ShadowPrimitive::Cylinder {
                start,
                end,
                radius: radius.max(0.0),
            },
            triangle @ ShadowPrimitive::Triangle { .. } => triangle,
        };

        let kind = primitive.kind();
        let list = &mut self.lists[kind.slot()];
        list.bounds.push(primitive.bounding_sphere());
        list.shapes.push(primitive);
        Some(PrimitiveHandle::new(kind, list.shapes.len() - 1))
    }

    pub fn get(&self, handle: PrimitiveHandle) -> Option<&ShadowPrimitive> {
        self.lists[handle.kind.slot()].shapes.get(handle.index())
    }

    pub fn bounding_sphere(&self, handle: PrimitiveHandle) -> Option<BoundingSphere> {
        self.lists[handle.kind.slot()].bounds.get(handle.index()).copied()
    }

    /// Number of primitives of one kind
    pub fn len(&self, kind: PrimitiveKind) -> usize {
        self.lists[kind.slot()].shapes.len()
    }

    pub fn total_len(&self) -> usize {
        self.lists.iter().map(|list| list.shapes.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total_len() == 0
    }

    pub fn clear(&mut self) {
        for list in &mut self.lists {
            list.shapes.clear();
            list.bounds.clear();
        }
    }

    pub(crate) fn list(&self, kind: PrimitiveKind) -> &PrimitiveList {
        &self.lists[kind.slot()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cylinder_bounds_enclose_caps() {
        let cylinder = ShadowPrimitive::Cylinder {
            start: Vec3::new(-2.0, 0.0, 0.0),
            end: Vec3::new(2.0, 0.0, 0.0),
            radius: 0.5,
        };
        let bounds = cylinder.bounding_sphere();
        assert_eq!(bounds.center, Vec3::ZERO);
        assert!((bounds.radius - 2.5).abs() < 1e-6);
    }

    #[test]
    fn test_triangle_bounds_enclose_vertices() {
        let vertices = [Vec3::ZERO, Vec3::X, Vec3::Y];
        let bounds = ShadowPrimitive::Triangle { vertices }.bounding_sphere();
        for vertex in vertices {
            assert!(vertex.distance(bounds.center) <= bounds.radius + 1e-6);
        }
    }

    #[test]
    fn test_handles_are_per_kind() {
        let mut cache = ShadowPrimitiveCache::new();
        let sphere = cache
            .insert(ShadowPrimitive::Sphere { center: Vec3::ZERO, radius: 1.0 })
            .unwrap();
        let triangle = cache
            .insert(ShadowPrimitive::Triangle { vertices: [Vec3::ZERO, Vec3::X, Vec3::Y] })
            .unwrap();
        let second_sphere = cache
            .insert(ShadowPrimitive::Sphere { center: Vec3::ONE, radius: 2.0 })
            .unwrap();

        assert_eq!(sphere.index(), 0);
        assert_eq!(triangle.index(), 0);
        assert_eq!(second_sphere.index(), 1);
        assert_eq!(triangle.kind(), PrimitiveKind::Triangle);
        assert_eq!(cache.len(PrimitiveKind::Sphere), 2);
        assert_eq!(cache.total_len(), 3);
        assert_eq!(cache.bounding_sphere(second_sphere).unwrap().radius, 2.0);

        cache.clear();
        assert!(cache.is_empty());
        assert!(cache.get(sphere).is_none());
    }

    #[test]
    fn test_invalid_primitives() {
        let mut cache = ShadowPrimitiveCache::new();
        assert!(cache
            .insert(ShadowPrimitive::Sphere { center: Vec3::NAN, radius: 1.0 })
            .is_none());
        let handle = cache
            .insert(ShadowPrimitive::Cylinder {
                start: Vec3::ZERO,
                end: Vec3::X,
                radius: -1.0,
            })
            .unwrap();
        assert_eq!(
            cache.get(handle),
            Some(&ShadowPrimitive::Cylinder { start: Vec3::ZERO, end: Vec3::X, radius: 0.0 })
        );
    }
}
