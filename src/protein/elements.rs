//! Per-element bonding parameters

/// Slack added to each covalent radius so slightly stretched bonds still count
const BOND_TOLERANCE_ANGSTROMS: f32 = 0.2;

/// Returns the covalent radius of an element in Angstroms.
///
/// Unknown symbols get a carbon-like radius.
pub fn covalent_radius(element_symbol: &str) -> f32 {
    match element_symbol.trim().to_ascii_uppercase().as_str() {
        "H" | "D" => 0.31,
        "C" => 0.76,
        "N" => 0.71,
        "O" => 0.66,
        "F" => 0.57,
        "P" => 1.07,
        "S" => 1.05,
        "CL" => 1.02,
        "SE" => 1.20,
        "BR" => 1.20,
        "I" => 1.39,
        "NA" => 1.66,
        "MG" => 1.41,
        "K" => 2.03,
        "CA" => 1.76,
        "MN" => 1.39,
        "FE" => 1.32,
        "CO" => 1.26,
        "NI" => 1.24,
        "CU" => 1.32,
        "ZN" => 1.22,
        _ => 0.77,
    }
}

/// Radius used by the sum-of-radii bond test: covalent radius plus tolerance.
pub fn bonding_radius(element_symbol: &str) -> f32 {
    covalent_radius(element_symbol) + BOND_TOLERANCE_ANGSTROMS
}

/// Elements that may bond at longer range or to many partners.
///
/// The windowed bond search never limits how many candidates these are
/// compared against.
pub fn is_special(element_symbol: &str) -> bool {
    matches!(
        element_symbol.trim().to_ascii_uppercase().as_str(),
        "S" | "P" | "SE"
    )
}
