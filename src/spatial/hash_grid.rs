//! Unbounded 3D linked-cell spatial hash

use glam::Vec3;
use smallvec::SmallVec;

use super::{cell_coord, search_rings, NeighbourFilter, NO_OCCUPANT};
use crate::error::{ensure_positive, ConfigError};

/// Number of hash buckets. Must be a power of two.
const BUCKET_COUNT: usize = 4096;

/// One occupied cell: its integer coordinates and the head of its occupant list
#[derive(Debug, Clone, Copy)]
struct CellRecord {
    coordinates: [i32; 3],
    head: u32,
}

/// Linked-cell grid over unbounded 3D space
///
/// Points are bucketed by `floor(position / cell_size)`. Occupied cells are
/// allocated on first use and found through a fixed-size hash table whose
/// buckets chain the cell records that share a hash. Callers supply their own
/// ids, which may be sparse.
#[derive(Debug, Clone)]
pub struct SpatialHashGrid {
    cell_size: f32,
    buckets: Vec<SmallVec<[u32; 4]>>,
    cells: Vec<CellRecord>,
    /// Next occupant in the same cell, indexed by insertion order
    next: Vec<u32>,
    /// Insertion order -> caller id
    ids: Vec<usize>,
    positions: Vec<Vec3>,
}

impl SpatialHashGrid {
    pub fn new(cell_size: f32) -> Result<Self, ConfigError> {
        Self::with_capacity(cell_size, 0)
    }

    pub fn with_capacity(cell_size: f32, expected_points: usize) -> Result<Self, ConfigError> {
        ensure_positive("grid.cell_size", cell_size)?;
        Ok(Self {
            cell_size,
            buckets: vec![SmallVec::new(); BUCKET_COUNT],
            cells: Vec::new(),
            next: Vec::with_capacity(expected_points),
            ids: Vec::with_capacity(expected_points),
            positions: Vec::with_capacity(expected_points),
        })
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// Number of inserted points
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Number of occupied cells
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Drops every point while keeping the cell size and allocations.
    pub fn clear(&mut self) {
        for bucket in &mut self.buckets {
            bucket.clear();
        }
        self.cells.clear();
        self.next.clear();
        self.ids.clear();
        self.positions.clear();
    }

    /// Integer cell coordinates of a position.
    pub fn cell_coordinates(&self, position: Vec3) -> [i32; 3] {
        [
            cell_coord(position.x, self.cell_size),
            cell_coord(position.y, self.cell_size),
            cell_coord(position.z, self.cell_size),
        ]
    }

    /// Inserts a point under the caller's `id`.
    ///
    /// Non-finite positions cannot be placed in a cell and are dropped.
    pub fn add(&mut self, id: usize, position: Vec3) -> bool {
        if !position.is_finite() {
            log::warn!("spatial hash: dropping id {} at non-finite position {}", id, position);
            return false;
        }

        let coordinates = self.cell_coordinates(position);
        let cell_index = match self.find_cell(coordinates) {
            Some(existing_index) => existing_index,
            None => {
                let new_index = self.cells.len() as u32;
                self.cells.push(CellRecord {
                    coordinates,
                    head: NO_OCCUPANT,
                });
                self.buckets[bucket_index(coordinates)].push(new_index);
                new_index
            }
        };

        let occupant_index = self.ids.len() as u32;
        let cell = &mut self.cells[cell_index as usize];
        self.next.push(cell.head);
        cell.head = occupant_index;
        self.ids.push(id);
        self.positions.push(position);
        true
    }

    /// Appends to `output` every occupant of the cells around `position` that
    /// passes `filter` relative to `query_id`.
    ///
    /// The 3x3x3 block is visited when `radius <= cell_size`, which
    /// guarantees every point within `radius` is reported. Candidates further
    /// than `radius` may also be reported; callers confirm distances.
    ///
    /// There is no half-neighbourhood variant. To enumerate each unordered
    /// pair once, query every point with [`NeighbourFilter::GreaterIds`]
    /// over the full block instead.
    pub fn possible_neighbours(
        &self,
        query_id: usize,
        position: Vec3,
        radius: f32,
        filter: NeighbourFilter,
        output: &mut Vec<usize>,
    ) {
        self.visit_candidates(position, radius, |occupant_index| {
            let candidate_id = self.ids[occupant_index];
            if filter.accepts(query_id, candidate_id) {
                output.push(candidate_id);
            }
        });
    }

    /// All occupants near `position` except `exclude_id`.
    pub fn neighbours_of(
        &self,
        exclude_id: usize,
        position: Vec3,
        radius: f32,
        output: &mut Vec<usize>,
    ) {
        self.possible_neighbours(exclude_id, position, radius, NeighbourFilter::All, output);
    }

    /// Occupants near `position` whose id is greater than `query_id`.
    pub fn forward_neighbours_of(
        &self,
        query_id: usize,
        position: Vec3,
        radius: f32,
        output: &mut Vec<usize>,
    ) {
        self.possible_neighbours(query_id, position, radius, NeighbourFilter::GreaterIds, output);
    }

    /// Appends `(id, squared distance)` for every occupant strictly within
    /// `radius` of `position`.
    pub fn within_radius(&self, position: Vec3, radius: f32, output: &mut Vec<(usize, f32)>) {
        let radius_squared = radius * radius;
        self.visit_candidates(position, radius, |occupant_index| {
            let distance_squared = self.positions[occupant_index].distance_squared(position);
            if distance_squared < radius_squared {
                output.push((self.ids[occupant_index], distance_squared));
            }
        });
    }

    fn visit_candidates(&self, position: Vec3, radius: f32, mut visit: impl FnMut(usize)) {
        if !position.is_finite() || self.cells.is_empty() {
            return;
        }
        let rings = search_rings(radius, self.cell_size);
        let center = self.cell_coordinates(position);

        // Wide queries over a sparse grid scan the occupied cells instead of
        // probing every coordinate of the ring cube.
        let block_side = 2 * rings as u64 + 1;
        if block_side.saturating_pow(3) > self.cells.len() as u64 {
            for cell in &self.cells {
                if chebyshev_distance(cell.coordinates, center) <= rings as i64 {
                    self.visit_cell(cell.head, &mut visit);
                }
            }
            return;
        }

        for offset_z in -rings..=rings {
            for offset_y in -rings..=rings {
                for offset_x in -rings..=rings {
                    let coordinates = [
                        center[0].saturating_add(offset_x),
                        center[1].saturating_add(offset_y),
                        center[2].saturating_add(offset_z),
                    ];
                    if let Some(cell_index) = self.find_cell(coordinates) {
                        self.visit_cell(self.cells[cell_index as usize].head, &mut visit);
                    }
                }
            }
        }
    }

    #[inline]
    fn visit_cell(&self, head: u32, visit: &mut impl FnMut(usize)) {
        let mut occupant = head;
        while occupant != NO_OCCUPANT {
            visit(occupant as usize);
            occupant = self.next[occupant as usize];
        }
    }

    fn find_cell(&self, coordinates: [i32; 3]) -> Option<u32> {
        self.buckets[bucket_index(coordinates)]
            .iter()
            .copied()
            .find(|&cell_index| self.cells[cell_index as usize].coordinates == coordinates)
    }
}

/// Largest per-axis distance between two cells.
#[inline]
fn chebyshev_distance(first: [i32; 3], second: [i32; 3]) -> i64 {
    (0..3)
        .map(|axis| (first[axis] as i64 - second[axis] as i64).abs())
        .max()
        .unwrap_or(0)
}

#[inline]
fn bucket_index(coordinates: [i32; 3]) -> usize {
    let hash = (coordinates[0] as u32).wrapping_mul(73_856_093)
        ^ (coordinates[1] as u32).wrapping_mul(19_349_663)
        ^ (coordinates[2] as u32).wrapping_mul(83_492_791);
    hash as usize & (BUCKET_COUNT - 1)
}
