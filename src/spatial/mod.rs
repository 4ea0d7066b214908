//! Linked-cell spatial indexing
//!
//! Two grids share the same classic linked-cell layout (a `head` slot per cell,
//! a parallel `next` array over occupants, insert-only):
//!
//! - [`SpatialHashGrid`]: unbounded 3D grid, cells hashed into a fixed bucket
//!   table. Used for bond inference, hydrogen bond search and surface colouring.
//! - [`BoundedGrid2`]: dense 2D grid over a known rectangle. Used for the
//!   light-frame broad phase of the shadow engine.
//!
//! Both are rebuilt, never patched, when the point set or the radius changes.

pub mod bounded_grid;
pub mod hash_grid;

pub use bounded_grid::{BoundedGrid2, Rect2};
pub use hash_grid::SpatialHashGrid;

/// Sentinel terminating an occupancy list.
pub(crate) const NO_OCCUPANT: u32 = u32::MAX;

/// Which occupants a neighbour query reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NeighbourFilter {
    /// Every occupant except the query id itself.
    All,
    /// Only occupants whose id is numerically greater than the query id.
    ///
    /// Querying every point with this filter enumerates each unordered pair
    /// exactly once.
    GreaterIds,
}

impl NeighbourFilter {
    #[inline]
    pub fn accepts(self, query_id: usize, candidate_id: usize) -> bool {
        match self {
            NeighbourFilter::All => candidate_id != query_id,
            NeighbourFilter::GreaterIds => candidate_id > query_id,
        }
    }
}

/// Integer cell coordinate of `coordinate` along one axis.
///
/// Floors toward negative infinity, so `-0.0001` lands in cell `-1`.
#[inline]
pub fn cell_coord(coordinate: f32, cell_size: f32) -> i32 {
    (coordinate / cell_size).floor() as i32
}

/// Number of cell rings a query of `radius` has to visit.
///
/// An infinite radius saturates at `i32::MAX`; NaN searches one ring.
#[inline]
pub(crate) fn search_rings(radius: f32, cell_size: f32) -> i32 {
    if radius > cell_size {
        (radius / cell_size).ceil() as i32
    } else {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_coord_floors_negative_coordinates() {
        assert_eq!(cell_coord(-0.0001, 1.0), -1);
        assert_eq!(cell_coord(0.0, 1.0), 0);
        assert_eq!(cell_coord(0.9999, 1.0), 0);
        assert_eq!(cell_coord(1.0, 1.0), 1);
        assert_eq!(cell_coord(-1.0, 1.0), -1);
        assert_eq!(cell_coord(-1.0001, 1.0), -2);
        assert_eq!(cell_coord(-7.5, 5.0), -2);
    }

    #[test]
    fn test_neighbour_filter() {
        assert!(NeighbourFilter::All.accepts(3, 1));
        assert!(!NeighbourFilter::All.accepts(3, 3));
        assert!(NeighbourFilter::GreaterIds.accepts(3, 4));
        assert!(!NeighbourFilter::GreaterIds.accepts(3, 3));
        assert!(!NeighbourFilter::GreaterIds.accepts(3, 1));
    }

    #[test]
    fn test_search_rings() {
        assert_eq!(search_rings(0.5, 1.0), 1);
        assert_eq!(search_rings(1.0, 1.0), 1);
        assert_eq!(search_rings(1.5, 1.0), 2);
        assert_eq!(search_rings(f32::INFINITY, 1.0), i32::MAX);
        assert_eq!(search_rings(f32::NAN, 1.0), 1);
    }
}
