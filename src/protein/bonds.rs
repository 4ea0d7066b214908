//! Bond inference from atomic coordinates
//!
//! Two atoms are bonded when their distance is below the sum of their bonding
//! radii. The main path bins atoms into a linked-cell grid and walks each cell
//! against itself and 13 half-shell neighbours, so every cell pair is visited
//! exactly once. A windowed sweep over x-sorted atoms is kept as a fallback.

use glam::Vec3;

use super::elements::{bonding_radius, is_special};
use crate::config::BondingSettings;
use crate::error::ConfigError;
use crate::util::Timed;

/// Sentinel terminating a cell's atom list
const NO_ATOM: u32 = u32::MAX;

/// Neighbour cell offsets covering half of the 26 surrounding cells.
///
/// For every offset `o` in this set, `-o` is absent, so walking a cell against
/// these neighbours visits each unordered pair of adjacent cells once.
const HALF_SHELL_OFFSETS: [[i32; 3]; 13] = [
    [1, 0, 0],
    [-1, 1, 0],
    [0, 1, 0],
    [1, 1, 0],
    [-1, -1, 1],
    [0, -1, 1],
    [1, -1, 1],
    [-1, 0, 1],
    [0, 0, 1],
    [1, 0, 1],
    [-1, 1, 1],
    [0, 1, 1],
    [1, 1, 1],
];

/// Represents a bond between two atoms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AtomBond {
    /// Lower of the two atom indices
    pub first_atom_index: usize,
    /// Higher of the two atom indices
    pub second_atom_index: usize,
}

impl AtomBond {
    pub fn new(first_index: usize, second_index: usize) -> Self {
        let (lower_atom_index, higher_atom_index) = if first_index < second_index {
            (first_index, second_index)
        } else {
            (second_index, first_index)
        };
        Self {
            first_atom_index: lower_atom_index,
            second_atom_index: higher_atom_index,
        }
    }
}

/// Infers covalent bonds from coordinates and per-atom bonding radii
#[derive(Debug, Clone, Default)]
pub struct ConnectivityBuilder {
    settings: BondingSettings,
}

impl ConnectivityBuilder {
    pub fn new(settings: BondingSettings) -> Result<Self, ConfigError> {
        settings.validate()?;
        Ok(Self { settings })
    }

    pub fn settings(&self) -> &BondingSettings {
        &self.settings
    }

    /// Bonds between atoms given as `(position, element symbol)` pairs.
    pub fn bonds_for_elements(&self, atoms: &[(Vec3, &str)]) -> Vec<AtomBond> {
        let positions: Vec<Vec3> = atoms.iter().map(|&(position, _)| position).collect();
        let radii: Vec<f32> = atoms.iter().map(|&(_, symbol)| bonding_radius(symbol)).collect();
        self.build_bonds(&positions, &radii)
    }

    /// Returns every pair `(i, j)` with `distance(i, j) < radii[i] + radii[j]`,
    /// sorted and without duplicates.
    ///
    /// Atoms with a non-finite position or an invalid radius never bond.
    pub fn build_bonds(&self, positions: &[Vec3], radii: &[f32]) -> Vec<AtomBond> {
        let _timer = Timed::debug("linked-cell bond search");
        let atom_count = common_length(positions, radii);
        let usable_atoms: Vec<usize> = (0..atom_count)
            .filter(|&atom_index| is_bonding_candidate(positions[atom_index], radii[atom_index]))
            .collect();
        let Some((grid_minimum, grid_maximum)) = bounding_box(positions, &usable_atoms) else {
            return Vec::new();
        };
        let maximum_radius = usable_atoms
            .iter()
            .map(|&atom_index| radii[atom_index])
            .fold(0.0f32, f32::max);

        let grid = LinkedCells::build(
            positions,
            &usable_atoms,
            grid_minimum,
            grid_maximum - grid_minimum,
            self.settings.cell_size.max(2.0 * maximum_radius),
            self.settings.max_grid_dim,
        );

        let mut identified_bonds = Vec::new();
        let mut test_pair = |first_atom: usize, second_atom: usize| {
            if is_bonded(positions, radii, first_atom, second_atom) {
                identified_bonds.push(AtomBond::new(first_atom, second_atom));
            }
        };

        let [dim_x, dim_y, dim_z] = grid.dims;
        for cell_z in 0..dim_z {
            for cell_y in 0..dim_y {
                for cell_x in 0..dim_x {
                    let cell_head = grid.head[grid.cell_index(cell_x, cell_y, cell_z)];
                    if cell_head == NO_ATOM {
                        continue;
                    }

                    let mut first_atom = cell_head;
                    while first_atom != NO_ATOM {
                        let mut second_atom = grid.next[first_atom as usize];
                        while second_atom != NO_ATOM {
                            test_pair(first_atom as usize, second_atom as usize);
                            second_atom = grid.next[second_atom as usize];
                        }
                        first_atom = grid.next[first_atom as usize];
                    }

                    for offset in &HALF_SHELL_OFFSETS {
                        let Some(neighbour_index) = grid.offset_cell_index(
                            [cell_x, cell_y, cell_z],
                            *offset,
                        ) else {
                            continue;
                        };
                        let neighbour_head = grid.head[neighbour_index];
                        if neighbour_head == NO_ATOM {
                            continue;
                        }

                        let mut first_atom = cell_head;
                        while first_atom != NO_ATOM {
                            let mut second_atom = neighbour_head;
                            while second_atom != NO_ATOM {
                                test_pair(first_atom as usize, second_atom as usize);
                                second_atom = grid.next[second_atom as usize];
                            }
                            first_atom = grid.next[first_atom as usize];
                        }
                    }
                }
            }
        }

        identified_bonds.sort_unstable();
        identified_bonds.dedup();
        log::debug!(
            "linked-cell bond search: {} atoms, {} bonds, {:?} cells",
            usable_atoms.len(),
            identified_bonds.len(),
            grid.dims
        );
        identified_bonds
    }

    /// Fallback bond search that does not build a grid.
    ///
    /// Atoms are swept in order of increasing x. Each atom is compared with
    /// the following atoms while the x gap could still admit a bond, up to
    /// `window_size` candidates. Pairs involving a special atom (`special[i]`,
    /// see [`is_special`]) are always compared.
    pub fn build_bonds_windowed(
        &self,
        positions: &[Vec3],
        radii: &[f32],
        special: &[bool],
    ) -> Vec<AtomBond> {
        let _timer = Timed::debug("windowed bond search");
        let atom_count = common_length(positions, radii);
        let mut sweep_order: Vec<usize> = (0..atom_count)
            .filter(|&atom_index| is_bonding_candidate(positions[atom_index], radii[atom_index]))
            .collect();
        sweep_order.sort_unstable_by(|&first_atom, &second_atom| {
            positions[first_atom]
                .x
                .total_cmp(&positions[second_atom].x)
                .then(first_atom.cmp(&second_atom))
        });

        let maximum_reach = 2.0
            * sweep_order
                .iter()
                .map(|&atom_index| radii[atom_index])
                .fold(0.0f32, f32::max);
        let is_special_atom = |atom_index: usize| special.get(atom_index).copied().unwrap_or(false);

        let mut identified_bonds = Vec::new();
        for (sweep_rank, &first_atom) in sweep_order.iter().enumerate() {
            let first_is_special = is_special_atom(first_atom);
            let mut scanned_candidates = 0usize;

            for &second_atom in &sweep_order[sweep_rank + 1..] {
                if positions[second_atom].x - positions[first_atom].x >= maximum_reach {
                    break;
                }
                if scanned_candidates >= self.settings.window_size
                    && !first_is_special
                    && !is_special_atom(second_atom)
                {
                    continue;
                }
                scanned_candidates += 1;

                if is_bonded(positions, radii, first_atom, second_atom) {
                    identified_bonds.push(AtomBond::new(first_atom, second_atom));
                }
            }
        }

        identified_bonds.sort_unstable();
        identified_bonds.dedup();
        identified_bonds
    }

    /// Windowed search with special kinds and radii taken from element symbols.
    pub fn bonds_for_elements_windowed(&self, atoms: &[(Vec3, &str)]) -> Vec<AtomBond> {
        let positions: Vec<Vec3> = atoms.iter().map(|&(position, _)| position).collect();
        let radii: Vec<f32> = atoms.iter().map(|&(_, symbol)| bonding_radius(symbol)).collect();
        let special: Vec<bool> = atoms.iter().map(|&(_, symbol)| is_special(symbol)).collect();
        self.build_bonds_windowed(&positions, &radii, &special)
    }
}

/// Dense linked-cell lists over atom indices `0..N`
struct LinkedCells {
    dims: [usize; 3],
    head: Vec<u32>,
    next: Vec<u32>,
}

impl LinkedCells {
    fn build(
        positions: &[Vec3],
        atom_indices: &[usize],
        origin: Vec3,
        extent: Vec3,
        requested_cell_size: f32,
        max_grid_dim: usize,
    ) -> Self {
        let mut cell_size = requested_cell_size;
        let naive_dims = (extent / cell_size).floor() + Vec3::ONE;
        if naive_dims.max_element() > max_grid_dim as f32 {
            let divisions = (max_grid_dim - 1).max(1) as f32;
            cell_size = cell_size.max(extent.max_element() / divisions);
            log::debug!(
                "bond grid would need {} cells per axis, enlarging cells to {:.2}",
                naive_dims.max_element(),
                cell_size
            );
        }

        let axis_dim =
            |axis_extent: f32| (1 + (axis_extent / cell_size).floor() as usize).min(max_grid_dim);
        let dims = [axis_dim(extent.x), axis_dim(extent.y), axis_dim(extent.z)];

        let mut head = vec![NO_ATOM; dims[0] * dims[1] * dims[2]];
        let mut next = vec![NO_ATOM; positions.len()];
        // Reverse insertion leaves each cell list in ascending atom order.
        for &atom_index in atom_indices.iter().rev() {
            let local = (positions[atom_index] - origin) / cell_size;
            let cell_x = (local.x.floor().max(0.0) as usize).min(dims[0] - 1);
            let cell_y = (local.y.floor().max(0.0) as usize).min(dims[1] - 1);
            let cell_z = (local.z.floor().max(0.0) as usize).min(dims[2] - 1);
            let cell_index = cell_x + cell_y * dims[0] + cell_z * dims[0] * dims[1];
            next[atom_index] = head[cell_index];
            head[cell_index] = atom_index as u32;
        }

        Self { dims, head, next }
    }

    #[inline]
    fn cell_index(&self, cell_x: usize, cell_y: usize, cell_z: usize) -> usize {
        cell_x + cell_y * self.dims[0] + cell_z * self.dims[0] * self.dims[1]
    }

    fn offset_cell_index(&self, cell: [usize; 3], offset: [i32; 3]) -> Option<usize> {
        let mut shifted = [0usize; 3];
        for axis in 0..3 {
            let coordinate = cell[axis] as i64 + offset[axis] as i64;
            if coordinate < 0 || coordinate >= self.dims[axis] as i64 {
                return None;
            }
            shifted[axis] = coordinate as usize;
        }
        Some(self.cell_index(shifted[0], shifted[1], shifted[2]))
    }
}

fn common_length(positions: &[Vec3], radii: &[f32]) -> usize {
    if positions.len() != radii.len() {
        log::warn!(
            "bond search: {} positions but {} radii, using the first {}",
            positions.len(),
            radii.len(),
            positions.len().min(radii.len())
        );
    }
    positions.len().min(radii.len())
}

fn is_bonding_candidate(position: Vec3, radius: f32) -> bool {
    position.is_finite() && radius.is_finite() && radius >= 0.0
}

#[inline]
fn is_bonded(positions: &[Vec3], radii: &[f32], first_atom: usize, second_atom: usize) -> bool {
    let bonding_distance = radii[first_atom] + radii[second_atom];
    positions[first_atom].distance_squared(positions[second_atom])
        < bonding_distance * bonding_distance
}

fn bounding_box(positions: &[Vec3], atom_indices: &[usize]) -> Option<(Vec3, Vec3)> {
    let first_position = positions[*atom_indices.first()?];
    Some(atom_indices.iter().fold(
        (first_position, first_position),
        |(minimum, maximum), &atom_index| {
            (minimum.min(positions[atom_index]), maximum.max(positions[atom_index]))
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn brute_force_bonds(positions: &[Vec3], radii: &[f32]) -> Vec<AtomBond> {
        let mut bonds = Vec::new();
        for first_atom in 0..positions.len() {
            for second_atom in (first_atom + 1)..positions.len() {
                if is_bonded(positions, radii, first_atom, second_atom) {
                    bonds.push(AtomBond::new(first_atom, second_atom));
                }
            }
        }
        bonds
    }

    #[test]
    fn test_atom_bond_orders_indices() {
        let bond = AtomBond::new(9, 2);
        assert_eq!(bond.first_atom_index, 2);
        assert_eq!(bond.second_atom_index, 9);
        assert_eq!(bond, AtomBond::new(2, 9));
    }

    #[test]
    fn test_half_shell_has_no_opposites() {
        for offset in &HALF_SHELL_OFFSETS {
            let opposite = [-offset[0], -offset[1], -offset[2]];
            assert!(!HALF_SHELL_OFFSETS.contains(&opposite));
            assert_ne!(*offset, [0, 0, 0]);
        }
    }

    #[test]
    fn test_empty_input_gives_no_bonds() {
        let builder = ConnectivityBuilder::default();
        assert!(builder.build_bonds(&[], &[]).is_empty());
        assert!(builder.build_bonds_windowed(&[], &[], &[]).is_empty());
    }

    #[test]
    fn test_ethane_like_chain() {
        let builder = ConnectivityBuilder::default();
        let atoms = [
            (Vec3::new(0.0, 0.0, 0.0), "C"),
            (Vec3::new(1.54, 0.0, 0.0), "C"),
            (Vec3::new(-0.36, 1.03, 0.0), "H"),
            (Vec3::new(1.90, 1.03, 0.0), "H"),
        ];
        let bonds = builder.bonds_for_elements(&atoms);
        assert_eq!(
            bonds,
            vec![AtomBond::new(0, 1), AtomBond::new(0, 2), AtomBond::new(1, 3)]
        );
        assert_eq!(builder.bonds_for_elements_windowed(&atoms), bonds);
    }

    #[test]
    fn test_threshold_is_strict() {
        let builder = ConnectivityBuilder::default();
        let positions = [Vec3::ZERO, Vec3::new(2.0, 0.0, 0.0)];
        assert!(builder.build_bonds(&positions, &[1.0, 1.0]).is_empty());
        assert_eq!(builder.build_bonds(&positions, &[1.0, 1.01]).len(), 1);
    }

    #[test]
    fn test_pairs_across_cell_boundaries_and_negative_coordinates() {
        let builder = ConnectivityBuilder::default();
        let positions = [
            Vec3::new(-0.5, -0.5, -0.5),
            Vec3::new(0.5, 0.5, 0.5),
            Vec3::new(4.9, 0.0, 0.0),
            Vec3::new(5.1, 0.0, 0.0),
            Vec3::new(-10.0, 7.0, 3.0),
        ];
        let radii = [1.0; 5];
        assert_eq!(builder.build_bonds(&positions, &radii), brute_force_bonds(&positions, &radii));
    }

    #[test]
    fn test_large_radii_widen_cells() {
        let builder = ConnectivityBuilder::default();
        // Bond length larger than the default 5 Angstrom cell.
        let positions = [Vec3::ZERO, Vec3::new(7.0, 0.0, 0.0), Vec3::new(13.0, 0.0, 0.0)];
        let radii = [4.0, 4.0, 4.0];
        assert_eq!(
            builder.build_bonds(&positions, &radii),
            vec![AtomBond::new(0, 1), AtomBond::new(1, 2)]
        );
    }

    #[test]
    fn test_far_outlier_is_clamped() {
        let builder = ConnectivityBuilder::default();
        let positions = [
            Vec3::ZERO,
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(1.0e6, 1.0e6, 1.0e6),
            Vec3::new(1.0e6, 1.0e6, 1.0e6 + 1.0),
        ];
        let radii = [0.8; 4];
        assert_eq!(
            builder.build_bonds(&positions, &radii),
            vec![AtomBond::new(0, 1), AtomBond::new(2, 3)]
        );
    }

    #[test]
    fn test_invalid_atoms_never_bond() {
        let builder = ConnectivityBuilder::default();
        let positions = [Vec3::ZERO, Vec3::new(f32::NAN, 0.0, 0.0), Vec3::new(0.5, 0.0, 0.0)];
        let radii = [1.0, 1.0, f32::NAN];
        assert!(builder.build_bonds(&positions, &radii).is_empty());
        assert!(builder.build_bonds_windowed(&positions, &radii, &[]).is_empty());
    }

    #[test]
    fn test_mismatched_lengths_use_common_prefix() {
        let builder = ConnectivityBuilder::default();
        let positions = [Vec3::ZERO, Vec3::new(1.0, 0.0, 0.0), Vec3::new(0.5, 0.0, 0.0)];
        assert_eq!(builder.build_bonds(&positions, &[1.0, 1.0]), vec![AtomBond::new(0, 1)]);
    }

    #[test]
    fn test_special_atoms_ignore_window() {
        let settings = BondingSettings {
            window_size: 1,
            ..BondingSettings::default()
        };
        let builder = ConnectivityBuilder::new(settings).unwrap();
        // Three atoms within bonding range of the sulfur at the origin.
        let positions = [
            Vec3::ZERO,
            Vec3::new(0.1, 1.0, 0.0),
            Vec3::new(0.2, -1.0, 0.0),
            Vec3::new(0.3, 0.0, 1.0),
        ];
        let radii = [1.25; 4];

        let limited = builder.build_bonds_windowed(&positions, &radii, &[false; 4]);
        let with_sulfur =
            builder.build_bonds_windowed(&positions, &radii, &[true, false, false, false]);
        assert!(with_sulfur.contains(&AtomBond::new(0, 3)));
        assert!(!limited.contains(&AtomBond::new(0, 3)));
    }
}
