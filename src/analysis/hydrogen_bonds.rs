//! Geometric detection of hydrogen bonds between polar atoms

use std::collections::HashSet;

use glam::Vec3;
use rayon::prelude::*;

use crate::config::HydrogenBondSettings;
use crate::error::ConfigError;
use crate::protein::AtomBond;
use crate::spatial::SpatialHashGrid;

/// Represents a detected hydrogen bond
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HydrogenBond {
    pub donor_atom_index: usize,
    pub acceptor_atom_index: usize,
    pub distance_in_angstroms: f32,
}

/// Returns true for elements that can donate or accept a hydrogen bond
pub fn is_polar_element(element_symbol: &str) -> bool {
    matches!(element_symbol.trim().to_ascii_uppercase().as_str(), "N" | "O")
}

/// Identifies hydrogen bonds by donor-acceptor distance
///
/// Every N/O pair closer than `max_distance` is reported once, with the lower
/// atom index as donor. Pairs that already share a covalent bond are skipped.
pub fn detect_hydrogen_bonds(
    atoms: &[(Vec3, &str)],
    covalent_bonds: &[AtomBond],
    settings: &HydrogenBondSettings,
) -> Result<Vec<HydrogenBond>, ConfigError> {
    settings.validate()?;

    // Acceptors: O, N (with lone pairs)
    // Donors: N, O (with hydrogens attached)
    let polar_atoms: Vec<(usize, Vec3)> = atoms
        .iter()
        .enumerate()
        .filter(|&(_, &(_, element_symbol))| is_polar_element(element_symbol))
        .map(|(atom_index, &(position, _))| (atom_index, position))
        .collect();

    let mut polar_atom_grid =
        SpatialHashGrid::with_capacity(settings.max_distance, polar_atoms.len())?;
    for &(atom_index, position) in &polar_atoms {
        polar_atom_grid.add(atom_index, position);
    }

    let excluded_pairs: HashSet<AtomBond> = covalent_bonds.iter().copied().collect();
    let max_distance_squared = settings.max_distance * settings.max_distance;

    let mut identified_hydrogen_bonds: Vec<HydrogenBond> = polar_atoms
        .par_iter()
        .flat_map_iter(|&(donor_atom_index, donor_position)| {
            let mut candidate_indices = Vec::new();
            polar_atom_grid.forward_neighbours_of(
                donor_atom_index,
                donor_position,
                settings.max_distance,
                &mut candidate_indices,
            );

            let excluded_pairs = &excluded_pairs;
            candidate_indices.into_iter().filter_map(move |acceptor_atom_index| {
                if excluded_pairs.contains(&AtomBond::new(donor_atom_index, acceptor_atom_index)) {
                    return None;
                }
                let distance_squared =
                    donor_position.distance_squared(atoms[acceptor_atom_index].0);
                (distance_squared < max_distance_squared).then(|| HydrogenBond {
                    donor_atom_index,
                    acceptor_atom_index,
                    distance_in_angstroms: distance_squared.sqrt(),
                })
            })
        })
        .collect();

    identified_hydrogen_bonds
        .sort_unstable_by_key(|bond| (bond.donor_atom_index, bond.acceptor_atom_index));
    log::debug!(
        "hydrogen bonds: {} polar atoms, {} bonds",
        polar_atoms.len(),
        identified_hydrogen_bonds.len()
    );
    Ok(identified_hydrogen_bonds)
}
