use glam::Vec3;
use protein_spatial::config::BondingSettings;
use protein_spatial::protein::bonding_radius;
use protein_spatial::{AtomBond, ConnectivityBuilder};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

const ELEMENTS: [&str; 5] = ["C", "N", "O", "S", "H"];

fn random_atoms(seed: u64, count: usize, extent: f32) -> Vec<(Vec3, &'static str)> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..count)
        .map(|_| {
            let position = Vec3::new(
                rng.gen_range(0.0..extent),
                rng.gen_range(0.0..extent),
                rng.gen_range(0.0..extent),
            );
            (position, ELEMENTS[rng.gen_range(0..ELEMENTS.len())])
        })
        .collect()
}

fn brute_force_bonds(positions: &[Vec3], radii: &[f32]) -> Vec<AtomBond> {
    let mut bonds = Vec::new();
    for first in 0..positions.len() {
        for second in first + 1..positions.len() {
            let reach = radii[first] + radii[second];
            if positions[first].distance_squared(positions[second]) < reach * reach {
                bonds.push(AtomBond::new(first, second));
            }
        }
    }
    bonds
}

#[test]
fn linked_cells_match_brute_force() {
    let atoms = random_atoms(42, 800, 18.0);
    let positions: Vec<Vec3> = atoms.iter().map(|&(position, _)| position).collect();
    let radii: Vec<f32> = atoms.iter().map(|&(_, symbol)| bonding_radius(symbol)).collect();

    let builder = ConnectivityBuilder::default();
    let bonds = builder.build_bonds(&positions, &radii);
    assert!(!bonds.is_empty());
    assert_eq!(bonds, brute_force_bonds(&positions, &radii));
    assert_eq!(bonds, builder.bonds_for_elements(&atoms));
}

#[test]
fn small_cells_still_find_every_bond() {
    let atoms = random_atoms(5, 300, 10.0);
    let positions: Vec<Vec3> = atoms.iter().map(|&(position, _)| position).collect();
    let radii: Vec<f32> = atoms.iter().map(|&(_, symbol)| bonding_radius(symbol)).collect();

    let builder = ConnectivityBuilder::new(BondingSettings {
        cell_size: 0.5,
        ..BondingSettings::default()
    })
    .unwrap();
    assert_eq!(builder.build_bonds(&positions, &radii), brute_force_bonds(&positions, &radii));
}

#[test]
fn output_does_not_depend_on_insertion_order() {
    let atoms = random_atoms(9, 400, 14.0);
    let builder = ConnectivityBuilder::default();
    let reference = builder.bonds_for_elements(&atoms);

    let mut rng = ChaCha8Rng::seed_from_u64(99);
    let mut permutation: Vec<usize> = (0..atoms.len()).collect();
    permutation.shuffle(&mut rng);
    let shuffled: Vec<(Vec3, &str)> = permutation.iter().map(|&index| atoms[index]).collect();

    // Map bonds of the shuffled input back to the original indices.
    let mut remapped: Vec<AtomBond> = builder
        .bonds_for_elements(&shuffled)
        .into_iter()
        .map(|bond| {
            AtomBond::new(
                permutation[bond.first_atom_index],
                permutation[bond.second_atom_index],
            )
        })
        .collect();
    remapped.sort_unstable();
    assert_eq!(remapped, reference);
}

#[test]
fn windowed_path_matches_linked_cells_with_a_wide_window() {
    let atoms = random_atoms(21, 500, 16.0);
    let builder = ConnectivityBuilder::new(BondingSettings {
        window_size: 10_000,
        ..BondingSettings::default()
    })
    .unwrap();
    assert_eq!(
        builder.bonds_for_elements_windowed(&atoms),
        builder.bonds_for_elements(&atoms)
    );
}

#[test]
fn special_atoms_bypass_the_window() {
    // In x order atom 1 sits between atoms 0 and 2 but is far away in y.
    let positions = [
        Vec3::new(0.0, 0.0, 0.0),
        Vec3::new(0.01, 10.0, 0.0),
        Vec3::new(0.02, 0.0, 0.5),
    ];
    let radii = [1.0; 3];
    let builder = ConnectivityBuilder::new(BondingSettings {
        window_size: 1,
        ..BondingSettings::default()
    })
    .unwrap();

    let plain = builder.build_bonds_windowed(&positions, &radii, &[false; 3]);
    assert!(plain.is_empty());

    let with_special = builder.build_bonds_windowed(&positions, &radii, &[false, false, true]);
    assert_eq!(with_special, vec![AtomBond::new(0, 2)]);

    // The linked-cell path has no window at all.
    assert_eq!(builder.build_bonds(&positions, &radii), vec![AtomBond::new(0, 2)]);
}

#[test]
fn invalid_input_never_bonds() {
    let builder = ConnectivityBuilder::default();
    assert!(builder.build_bonds(&[], &[]).is_empty());
    assert!(builder
        .build_bonds(&[Vec3::ZERO, Vec3::new(f32::NAN, 0.0, 0.0)], &[1.0, 1.0])
        .is_empty());
    // Mismatched lengths use the common prefix.
    let bonds = builder.build_bonds(&[Vec3::ZERO, Vec3::X, Vec3::Y], &[0.8, 0.8]);
    assert_eq!(bonds, vec![AtomBond::new(0, 1)]);
}
