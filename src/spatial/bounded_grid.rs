//! Dense 2D linked-cell grid over a fixed rectangle

use glam::Vec2;

use super::{search_rings, NeighbourFilter, NO_OCCUPANT};

/// Axis-aligned rectangle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect2 {
    pub min: Vec2,
    pub max: Vec2,
}

impl Rect2 {
    pub fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    /// Smallest rectangle holding every finite point, or `None` if there are none.
    pub fn from_points(points: impl IntoIterator<Item = Vec2>) -> Option<Self> {
        let mut bounds: Option<Rect2> = None;
        for point in points.into_iter().filter(|point| point.is_finite()) {
            bounds = Some(match bounds {
                Some(rect) => Rect2::new(rect.min.min(point), rect.max.max(point)),
                None => Rect2::new(point, point),
            });
        }
        bounds
    }

    pub fn extent(&self) -> Vec2 {
        (self.max - self.min).max(Vec2::ZERO)
    }

    pub fn contains(&self, point: Vec2) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }

    fn is_finite(&self) -> bool {
        self.min.is_finite() && self.max.is_finite()
    }
}

/// Linked-cell grid over a bounded rectangle
///
/// `reset` sizes the grid for a rectangle and a minimum cell size. The number
/// of cells per axis is capped at `max_dim`; when the naive size would exceed
/// it the cells grow instead, trading precision for bounded memory.
#[derive(Debug, Clone)]
pub struct BoundedGrid2 {
    bounds: Rect2,
    cell_size: f32,
    dims: [usize; 2],
    max_dim: usize,
    head: Vec<u32>,
    next: Vec<u32>,
    ids: Vec<usize>,
}

impl BoundedGrid2 {
    /// Creates an empty single-cell grid. Call [`reset`](Self::reset) before use.
    pub fn new(max_dim: usize) -> Self {
        Self {
            bounds: Rect2::new(Vec2::ZERO, Vec2::ZERO),
            cell_size: 1.0,
            dims: [1, 1],
            max_dim: max_dim.max(1),
            head: vec![NO_OCCUPANT],
            next: Vec::new(),
            ids: Vec::new(),
        }
    }

    /// Resizes the grid for `bounds` and empties it.
    pub fn reset(&mut self, bounds: Rect2, min_cell_size: f32) {
        let bounds = if bounds.is_finite() {
            bounds
        } else {
            log::warn!("bounded grid: non-finite bounds {:?}, using an empty rectangle", bounds);
            Rect2::new(Vec2::ZERO, Vec2::ZERO)
        };
        let mut cell_size = if min_cell_size.is_finite() && min_cell_size > 0.0 {
            min_cell_size
        } else {
            log::warn!("bounded grid: invalid minimum cell size {}, using 1.0", min_cell_size);
            1.0
        };

        let extent = bounds.extent();
        let naive_x = 1 + (extent.x / cell_size).floor() as usize;
        let naive_y = 1 + (extent.y / cell_size).floor() as usize;
        if naive_x > self.max_dim || naive_y > self.max_dim {
            let divisions = (self.max_dim - 1).max(1) as f32;
            cell_size = cell_size.max(extent.max_element() / divisions);
        }
        let dim_x = (1 + (extent.x / cell_size).floor() as usize).min(self.max_dim);
        let dim_y = (1 + (extent.y / cell_size).floor() as usize).min(self.max_dim);

        self.bounds = bounds;
        self.cell_size = cell_size;
        self.dims = [dim_x, dim_y];
        self.head.clear();
        self.head.resize(dim_x * dim_y, NO_OCCUPANT);
        self.next.clear();
        self.ids.clear();

        log::trace!(
            "bounded grid reset: {}x{} cells of {:.3} (requested {:.3})",
            dim_x,
            dim_y,
            cell_size,
            min_cell_size
        );
    }

    pub fn bounds(&self) -> Rect2 {
        self.bounds
    }

    /// Effective cell size after clamping
    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    pub fn dims(&self) -> [usize; 2] {
        self.dims
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Inserts a point under the caller's `id`.
    ///
    /// Points outside the bounds violate the grid's contract; they are logged
    /// and dropped so a single bad point cannot abort a render pass.
    pub fn add(&mut self, id: usize, position: Vec2) -> bool {
        if !position.is_finite() || !self.bounds.contains(position) {
            log::warn!(
                "bounded grid: id {} at {} lies outside {:?}, dropped",
                id,
                position,
                self.bounds
            );
            return false;
        }

        let cell_x = self.axis_cell(position.x - self.bounds.min.x, 0);
        let cell_y = self.axis_cell(position.y - self.bounds.min.y, 1);
        let cell_index = cell_y * self.dims[0] + cell_x;

        let occupant_index = self.ids.len() as u32;
        self.next.push(self.head[cell_index]);
        self.head[cell_index] = occupant_index;
        self.ids.push(id);
        true
    }

    /// Appends to `output` every occupant of the 3x3 block of cells around
    /// `position` that passes `filter` relative to `query_id`.
    ///
    /// Positions outside the bounds are allowed; only in-range cells are read.
    pub fn possible_neighbours(
        &self,
        query_id: usize,
        position: Vec2,
        radius: f32,
        filter: NeighbourFilter,
        output: &mut Vec<usize>,
    ) {
        self.visit_candidates(position, radius, |candidate_id| {
            if filter.accepts(query_id, candidate_id) {
                output.push(candidate_id);
            }
        });
    }

    /// Calls `visit` with the id of every occupant near `position`.
    pub fn visit_candidates(&self, position: Vec2, radius: f32, mut visit: impl FnMut(usize)) {
        if !position.is_finite() || self.ids.is_empty() {
            return;
        }
        let rings = search_rings(radius, self.cell_size) as i64;
        let local = (position - self.bounds.min) / self.cell_size;
        let center_x = local.x.floor() as i64;
        let center_y = local.y.floor() as i64;

        let x_range = clamp_range(center_x - rings, center_x + rings, self.dims[0]);
        let y_range = clamp_range(center_y - rings, center_y + rings, self.dims[1]);
        let (Some((x_min, x_max)), Some((y_min, y_max))) = (x_range, y_range) else {
            return;
        };

        for cell_y in y_min..=y_max {
            let row_offset = cell_y * self.dims[0];
            for cell_x in x_min..=x_max {
                let mut occupant = self.head[row_offset + cell_x];
                while occupant != NO_OCCUPANT {
                    visit(self.ids[occupant as usize]);
                    occupant = self.next[occupant as usize];
                }
            }
        }
    }

    fn axis_cell(&self, local_coordinate: f32, axis: usize) -> usize {
        ((local_coordinate / self.cell_size).floor().max(0.0) as usize).min(self.dims[axis] - 1)
    }
}

/// Intersects `[low, high]` with `[0, dim - 1]`.
fn clamp_range(low: i64, high: i64, dim: usize) -> Option<(usize, usize)> {
    let last = dim as i64 - 1;
    let low = low.max(0);
    let high = high.min(last);
    (low <= high).then(|| (low as usize, high as usize))
}
