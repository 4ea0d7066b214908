//! Covalent connectivity for molecular structures
//!
//! This module infers the bond graph from atomic coordinates and per-element
//! bonding radii

pub mod bonds;
pub mod elements;

pub use bonds::{AtomBond, ConnectivityBuilder};
pub use elements::{bonding_radius, covalent_radius, is_special};
