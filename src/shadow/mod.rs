//! Shadow visibility for a directional light
//!
//! The engine answers one question per shaded sample: is this point occluded
//! along the direction to the light? Casters are cached once per frame, their
//! bounding spheres are projected into the plane perpendicular to the light
//! and binned into one 2D grid per primitive kind. A query then only looks at
//! casters whose projected circle covers the sample.
//!
//! Grids are rebuilt from scratch whenever the light or the caster set
//! changes, and are read-only while queried, so batches of queries can run in
//! parallel with one coherence cache per worker.

pub mod intersect;
pub mod light;
pub mod primitive;

use glam::{Vec2, Vec3};
use rayon::prelude::*;

pub use light::LightBasis;
pub use primitive::{
    BoundingSphere, PrimitiveHandle, PrimitiveKind, ShadowPrimitive, ShadowPrimitiveCache,
};

use crate::config::ShadowSettings;
use crate::error::{ConfigError, ShadowError};
use crate::spatial::{BoundedGrid2, Rect2};
use crate::util::Timed;

/// Lifecycle of the engine for the current light configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// No light frame: no light set yet, or casters changed since the last build
    Idle,
    /// Light-frame grids are built and no query has used them yet
    GridsBuilt,
    /// Queries are running against the current grids
    Querying,
}

/// Light-frame grid for one primitive kind
#[derive(Debug, Clone)]
struct KindGrid {
    grid: BoundedGrid2,
    /// Projected bounding-sphere centres, indexed like the primitive list
    projected_centers: Vec<Vec2>,
}

/// Grids built for one light direction and one caster set
#[derive(Debug, Clone)]
pub struct LightFrame {
    generation: u64,
    basis: LightBasis,
    grids: [KindGrid; 3],
}

impl LightFrame {
    fn build(
        generation: u64,
        basis: LightBasis,
        primitives: &ShadowPrimitiveCache,
        settings: &ShadowSettings,
    ) -> Self {
        let _timer = Timed::debug("light frame build");
        let grids = PrimitiveKind::ALL.map(|kind| {
            let bounds = &primitives.list(kind).bounds;
            let projected_centers: Vec<Vec2> = bounds
                .iter()
                .map(|bounding_sphere| basis.project(bounding_sphere.center))
                .collect();
            let largest_radius = bounds
                .iter()
                .map(|bounding_sphere| bounding_sphere.radius)
                .fold(0.0f32, f32::max);

            let mut grid = BoundedGrid2::new(settings.max_grid_dim);
            if let Some(projected_bounds) = Rect2::from_points(projected_centers.iter().copied()) {
                grid.reset(projected_bounds, largest_radius.max(settings.min_cell_size));
                for (primitive_index, &projected_center) in projected_centers.iter().enumerate() {
                    grid.add(primitive_index, projected_center);
                }
            }
            log::debug!(
                "light frame {}: {} {:?} casters in {:?} cells of {:.3}",
                generation,
                projected_centers.len(),
                kind,
                grid.dims(),
                grid.cell_size()
            );

            KindGrid {
                grid,
                projected_centers,
            }
        });

        Self {
            generation,
            basis,
            grids,
        }
    }

    pub fn basis(&self) -> &LightBasis {
        &self.basis
    }

    /// Counter identifying this build; increases with every rebuild
    pub fn generation(&self) -> u64 {
        self.generation
    }

    fn is_occluded(
        &self,
        primitives: &ShadowPrimitiveCache,
        settings: &ShadowSettings,
        cache: &mut OcclusionCache,
        point: Vec3,
    ) -> bool {
        cache.sync_generation(self.generation);
        if !point.is_finite() {
            return false;
        }
        let light_direction = self.basis.direction();
        let origin = point + light_direction * settings.surface_offset;
        let projected_origin = self.basis.project(origin);

        for kind in PrimitiveKind::ALL {
            let Some(cached_index) = cache.last_obscuring[kind.slot()] else {
                continue;
            };
            let cached_index = cached_index as usize;
            if self.obscures(primitives, settings, kind, cached_index, origin, projected_origin) {
                cache.coherence_hits += 1;
                log::trace!("coherence hit on {:?} {}", kind, cached_index);
                return true;
            }
        }

        for kind in PrimitiveKind::ALL {
            let kind_grid = &self.grids[kind.slot()];
            cache.candidates.clear();
            let candidates = &mut cache.candidates;
            kind_grid
                .grid
                .visit_candidates(projected_origin, kind_grid.grid.cell_size(), |primitive_index| {
                    candidates.push(primitive_index)
                });

            let skipped_index = cache.last_obscuring[kind.slot()].map(|index| index as usize);
            let hit_index = cache.candidates.iter().copied().find(|&primitive_index| {
                Some(primitive_index) != skipped_index
                    && self.obscures(
                        primitives,
                        settings,
                        kind,
                        primitive_index,
                        origin,
                        projected_origin,
                    )
            });
            if let Some(primitive_index) = hit_index {
                cache.last_obscuring[kind.slot()] = Some(primitive_index as u32);
                return true;
            }
        }

        false
    }

    /// Broad phase on the bounding sphere, then the exact test for the kind.
    fn obscures(
        &self,
        primitives: &ShadowPrimitiveCache,
        settings: &ShadowSettings,
        kind: PrimitiveKind,
        primitive_index: usize,
        origin: Vec3,
        projected_origin: Vec2,
    ) -> bool {
        let list = primitives.list(kind);
        let bounding_sphere = list.bounds[primitive_index];
        let light_direction = self.basis.direction();

        // The caster must lie toward the light. A sphere's centre has to be on
        // the light side; other kinds may straddle the point by their bound.
        let center_to_point_depth = (origin - bounding_sphere.center).dot(light_direction);
        let depth_allowance = match kind {
            PrimitiveKind::Sphere => 0.0,
            PrimitiveKind::Cylinder | PrimitiveKind::Triangle => bounding_sphere.radius,
        };
        if center_to_point_depth > depth_allowance {
            return false;
        }

        let projected_center = self.grids[kind.slot()].projected_centers[primitive_index];
        let radius_squared = bounding_sphere.radius * bounding_sphere.radius;
        if projected_origin.distance_squared(projected_center) >= radius_squared {
            return false;
        }

        match list.shapes[primitive_index] {
            // A sphere's silhouette is its bounding circle.
            ShadowPrimitive::Sphere { .. } => true,
            shape => shape
                .intersect_ray(origin, light_direction, settings.determinant_epsilon)
                .is_some(),
        }
    }
}

/// One-slot memo per primitive kind of the last caster that occluded a query
///
/// Consecutive samples (neighbouring pixels along a scanline) are often
/// shadowed by the same caster. The cache is a sequential-scan optimisation:
/// each worker thread needs its own.
#[derive(Debug, Clone, Default)]
pub struct OcclusionCache {
    generation: u64,
    last_obscuring: [Option<u32>; 3],
    coherence_hits: u64,
    candidates: Vec<usize>,
}

impl OcclusionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last caster of `kind` that occluded a query, if any
    pub fn last_obscuring(&self, kind: PrimitiveKind) -> Option<PrimitiveHandle> {
        self.last_obscuring[kind.slot()].map(|index| PrimitiveHandle::new(kind, index as usize))
    }

    /// Number of queries answered straight from the cache
    pub fn coherence_hits(&self) -> u64 {
        self.coherence_hits
    }

    pub fn clear(&mut self) {
        self.last_obscuring = [None; 3];
    }

    fn sync_generation(&mut self, generation: u64) {
        if self.generation != generation {
            self.generation = generation;
            self.clear();
        }
    }
}

/// Read-only occlusion query view with its own coherence cache
///
/// Obtained from [`ShadowEngine::query`]; create one per worker thread.
pub struct OcclusionQuery<'a> {
    frame: &'a LightFrame,
    primitives: &'a ShadowPrimitiveCache,
    settings: &'a ShadowSettings,
    cache: OcclusionCache,
}

impl<'a> OcclusionQuery<'a> {
    pub fn is_occluded(&mut self, point: Vec3) -> bool {
        self.frame
            .is_occluded(self.primitives, self.settings, &mut self.cache, point)
    }

    pub fn cache(&self) -> &OcclusionCache {
        &self.cache
    }
}

/// Shadow visibility engine owning its casters, light frame and caches
#[derive(Debug, Clone, Default)]
pub struct ShadowEngine {
    settings: ShadowSettings,
    primitives: ShadowPrimitiveCache,
    light: Option<LightBasis>,
    frame: Option<LightFrame>,
    builds: u64,
    coherence: OcclusionCache,
    queried: bool,
}

impl ShadowEngine {
    pub fn new(settings: ShadowSettings) -> Result<Self, ConfigError> {
        settings.validate()?;
        Ok(Self {
            settings,
            ..Self::default()
        })
    }

    pub fn settings(&self) -> &ShadowSettings {
        &self.settings
    }

    pub fn primitives(&self) -> &ShadowPrimitiveCache {
        &self.primitives
    }

    /// Unit direction toward the light, once a light is set
    pub fn light_direction(&self) -> Option<Vec3> {
        self.light.map(|basis| basis.direction())
    }

    pub fn state(&self) -> EngineState {
        match (&self.frame, self.queried) {
            (None, _) => EngineState::Idle,
            (Some(_), false) => EngineState::GridsBuilt,
            (Some(_), true) => EngineState::Querying,
        }
    }

    /// The current light frame, if built
    pub fn frame(&self) -> Option<&LightFrame> {
        self.frame.as_ref()
    }

    pub fn add_sphere(&mut self, center: Vec3, radius: f32) -> Option<PrimitiveHandle> {
        self.add_primitive(ShadowPrimitive::Sphere { center, radius })
    }

    pub fn add_cylinder(&mut self, start: Vec3, end: Vec3, radius: f32) -> Option<PrimitiveHandle> {
        self.add_primitive(ShadowPrimitive::Cylinder { start, end, radius })
    }

    pub fn add_triangle(
        &mut self,
        first: Vec3,
        second: Vec3,
        third: Vec3,
    ) -> Option<PrimitiveHandle> {
        self.add_primitive(ShadowPrimitive::Triangle {
            vertices: [first, second, third],
        })
    }

    /// Adds a caster. The light frame is dropped and rebuilt on the next query.
    pub fn add_primitive(&mut self, primitive: ShadowPrimitive) -> Option<PrimitiveHandle> {
        let handle = self.primitives.insert(primitive)?;
        self.invalidate_frame();
        Some(handle)
    }

    /// Removes every caster and the light frame. The light direction is kept.
    pub fn clear(&mut self) {
        self.primitives.clear();
        self.invalidate_frame();
    }

    /// Sets the direction toward the light and rebuilds every grid.
    ///
    /// A zero-length or non-finite direction leaves the engine unchanged.
    pub fn set_light(&mut self, direction: Vec3) -> Result<(), ShadowError> {
        let Some(basis) = LightBasis::new(direction) else {
            log::warn!("ignoring degenerate light direction {}", direction);
            return Err(ShadowError::DegenerateLight(direction));
        };
        self.light = Some(basis);
        self.rebuild_frame(basis);
        Ok(())
    }

    /// Builds the light frame now if it is missing. Returns false with no light.
    pub fn prepare(&mut self) -> bool {
        if self.frame.is_none() {
            if let Some(basis) = self.light {
                self.rebuild_frame(basis);
            }
        }
        self.frame.is_some()
    }

    /// Whether `point` is occluded along the direction to the light.
    ///
    /// Always false until a light is set.
    pub fn is_occluded(&mut self, point: Vec3) -> bool {
        if !self.prepare() {
            return false;
        }
        self.queried = true;
        match &self.frame {
            Some(frame) => {
                frame.is_occluded(&self.primitives, &self.settings, &mut self.coherence, point)
            }
            None => false,
        }
    }

    /// Whether a surface with `normal` faces away from the light:
    /// `normal . light < tolerance`. Always false until a light is set.
    pub fn is_self_shadowed(&self, normal: Vec3, tolerance: f32) -> bool {
        self.light
            .map_or(false, |basis| normal.dot(basis.direction()) < tolerance)
    }

    /// Occlusion of many points, evaluated in parallel with one coherence
    /// cache per worker.
    pub fn occlusion_mask(&mut self, points: &[Vec3]) -> Vec<bool> {
        if !self.prepare() {
            return vec![false; points.len()];
        }
        self.queried = true;
        let engine = &*self;
        points
            .par_iter()
            .map_init(
                || engine.query(),
                |query, &point| query.as_mut().map_or(false, |query| query.is_occluded(point)),
            )
            .collect()
    }

    /// Query view for callers that schedule their own workers.
    ///
    /// `None` until the light frame is built (see [`prepare`](Self::prepare)).
    pub fn query(&self) -> Option<OcclusionQuery<'_>> {
        self.frame.as_ref().map(|frame| OcclusionQuery {
            frame,
            primitives: &self.primitives,
            settings: &self.settings,
            cache: OcclusionCache::new(),
        })
    }

    /// Coherence cache used by [`is_occluded`](Self::is_occluded)
    pub fn coherence_cache(&self) -> &OcclusionCache {
        &self.coherence
    }

    fn rebuild_frame(&mut self, basis: LightBasis) {
        self.builds += 1;
        self.frame = Some(LightFrame::build(
            self.builds,
            basis,
            &self.primitives,
            &self.settings,
        ));
        self.coherence.sync_generation(self.builds);
        self.queried = false;
    }

    fn invalidate_frame(&mut self) {
        self.frame = None;
        self.queried = false;
    }
}
