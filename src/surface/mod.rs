//! Molecular surface meshes and nearest-atom colouring
//!
//! Surface meshes come from an external mesher; this module only maps atom
//! colours onto their vertices, using a spatial hash so each vertex looks at
//! a handful of nearby atoms instead of the whole structure.

use glam::Vec3;
use rayon::prelude::*;

use crate::config::SurfaceColorSettings;
use crate::error::ConfigError;
use crate::spatial::SpatialHashGrid;
use crate::util::Timed;

/// Represents a vertex on the molecular surface mesh
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct SurfaceVertex {
    /// World space position of the vertex
    pub world_space_position: [f32; 3],
    /// Normal vector for lighting calculations
    pub surface_normal_vector: [f32; 3],
    /// Color of the surface at this vertex
    pub surface_color_rgb: [f32; 3],
}

/// A complete mesh representing the molecular surface
#[derive(Debug, Clone, Default)]
pub struct MolecularSurfaceMesh {
    /// List of vertices in the mesh
    pub surface_vertices_collection: Vec<SurfaceVertex>,
    /// List of indices for triangle drawing
    pub surface_indices_collection: Vec<u32>,
}

impl MolecularSurfaceMesh {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_mesh_empty(&self) -> bool {
        self.surface_vertices_collection.is_empty()
    }

    /// Recolours every vertex with the colour of its nearest atom.
    pub fn apply_nearest_atom_colors(
        &mut self,
        colored_atoms: &[ColoredAtom],
        settings: &SurfaceColorSettings,
    ) -> Result<(), ConfigError> {
        let vertex_positions: Vec<Vec3> = self
            .surface_vertices_collection
            .iter()
            .map(|vertex| Vec3::from_array(vertex.world_space_position))
            .collect();
        let vertex_colors =
            color_vertices_by_nearest_atom(&vertex_positions, colored_atoms, settings)?;
        for (vertex, color) in self.surface_vertices_collection.iter_mut().zip(vertex_colors) {
            vertex.surface_color_rgb = color;
        }
        Ok(())
    }
}

/// Atom position with the colour it lends to nearby surface
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColoredAtom {
    pub position: Vec3,
    pub color_rgb: [f32; 3],
}

/// Assigns each vertex the colour of the nearest atom.
///
/// Atoms within `search_radius` are found through the spatial hash; vertices
/// with no atom in range fall back to a scan of every atom. With no atoms at
/// all every vertex gets `fallback_color`.
pub fn color_vertices_by_nearest_atom(
    vertex_positions: &[Vec3],
    colored_atoms: &[ColoredAtom],
    settings: &SurfaceColorSettings,
) -> Result<Vec<[f32; 3]>, ConfigError> {
    settings.validate()?;
    let _timer = Timed::info("surface colouring");
    if colored_atoms.is_empty() {
        return Ok(vec![settings.fallback_color; vertex_positions.len()]);
    }

    let mut atom_grid =
        SpatialHashGrid::with_capacity(settings.search_radius, colored_atoms.len())?;
    for (atom_index, atom) in colored_atoms.iter().enumerate() {
        atom_grid.add(atom_index, atom.position);
    }

    let vertex_colors = vertex_positions
        .par_iter()
        .map_init(Vec::new, |nearby_atoms, &vertex_position| {
            nearby_atoms.clear();
            atom_grid.within_radius(vertex_position, settings.search_radius, nearby_atoms);
            let nearest_atom_index = closest(nearby_atoms.iter().copied())
                .or_else(|| {
                    closest(colored_atoms.iter().enumerate().map(|(atom_index, atom)| {
                        (atom_index, atom.position.distance_squared(vertex_position))
                    }))
                });
            nearest_atom_index
                .map(|atom_index| colored_atoms[atom_index].color_rgb)
                .unwrap_or(settings.fallback_color)
        })
        .collect();
    Ok(vertex_colors)
}

/// Index with the smallest squared distance; ties go to the lower index.
fn closest(candidates: impl Iterator<Item = (usize, f32)>) -> Option<usize> {
    candidates
        .filter(|(_, distance_squared)| !distance_squared.is_nan())
        .min_by(|first, second| first.1.total_cmp(&second.1).then(first.0.cmp(&second.0)))
        .map(|(atom_index, _)| atom_index)
}
