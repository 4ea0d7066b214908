//! Analysis tools for protein structures

pub mod hydrogen_bonds;

pub use hydrogen_bonds::{detect_hydrogen_bonds, HydrogenBond};
