//! Tunable settings for the spatial engines
//!
//! Every struct deserializes with defaults for missing fields, so a settings
//! file only needs to name the values it overrides.

use serde::{Deserialize, Serialize};

use crate::error::{ensure_at_least, ensure_positive, ConfigError};

/// Settings for covalent bond inference
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BondingSettings {
    /// Edge length of a linked-cell grid cell in Angstroms
    pub cell_size: f32,
    /// Forward candidates scanned per atom by the windowed fallback
    pub window_size: usize,
    /// Maximum number of cells along any axis before the cell size is enlarged
    pub max_grid_dim: usize,
}

impl Default for BondingSettings {
    fn default() -> Self {
        Self {
            cell_size: 5.0,
            window_size: 64,
            max_grid_dim: 128,
        }
    }
}

impl BondingSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure_positive("bonding.cell_size", self.cell_size)?;
        ensure_at_least("bonding.window_size", self.window_size, 1)?;
        ensure_at_least("bonding.max_grid_dim", self.max_grid_dim, 1)
    }
}

/// Settings for the shadow visibility engine
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShadowSettings {
    /// Distance a query point is moved toward the light before testing
    pub surface_offset: f32,
    /// Maximum number of light-frame grid cells along either axis
    pub max_grid_dim: usize,
    /// Lower bound on the light-frame cell size
    pub min_cell_size: f32,
    /// Determinant and hit-distance threshold for ray/triangle tests
    pub determinant_epsilon: f32,
}

impl Default for ShadowSettings {
    fn default() -> Self {
        Self {
            surface_offset: 0.01,
            max_grid_dim: 64,
            min_cell_size: 0.01,
            determinant_epsilon: 1e-7,
        }
    }
}

impl ShadowSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.surface_offset.is_finite() || self.surface_offset < 0.0 {
            return Err(ConfigError::NonPositive {
                name: "shadow.surface_offset",
                value: self.surface_offset,
            });
        }
        ensure_at_least("shadow.max_grid_dim", self.max_grid_dim, 1)?;
        ensure_positive("shadow.min_cell_size", self.min_cell_size)?;
        ensure_positive("shadow.determinant_epsilon", self.determinant_epsilon)
    }
}

/// Settings for hydrogen bond detection
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HydrogenBondSettings {
    /// Maximum donor-acceptor distance in Angstroms
    pub max_distance: f32,
}

impl Default for HydrogenBondSettings {
    fn default() -> Self {
        Self { max_distance: 3.5 }
    }
}

impl HydrogenBondSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure_positive("hydrogen_bonds.max_distance", self.max_distance)
    }
}

/// Settings for nearest-atom surface colouring
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurfaceColorSettings {
    /// Radius searched around each vertex before falling back to a full scan
    pub search_radius: f32,
    /// Colour used when there are no atoms at all
    pub fallback_color: [f32; 3],
}

impl Default for SurfaceColorSettings {
    fn default() -> Self {
        Self {
            search_radius: 5.0,
            fallback_color: [0.5, 0.5, 0.5],
        }
    }
}

impl SurfaceColorSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure_positive("surface.search_radius", self.search_radius)
    }
}

/// All engine settings in one document
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub bonding: BondingSettings,
    pub shadow: ShadowSettings,
    pub hydrogen_bonds: HydrogenBondSettings,
    pub surface: SurfaceColorSettings,
}

impl Settings {
    /// Parses and validates settings from a JSON document.
    pub fn from_json_str(json_text: &str) -> Result<Self, ConfigError> {
        let parsed_settings: Settings = serde_json::from_str(json_text)?;
        parsed_settings.validate()?;
        Ok(parsed_settings)
    }

    pub fn to_json_string(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.bonding.validate()?;
        self.shadow.validate()?;
        self.hydrogen_bonds.validate()?;
        self.surface.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(Settings::default().validate().is_ok());
        assert_eq!(BondingSettings::default().cell_size, 5.0);
        assert_eq!(ShadowSettings::default().max_grid_dim, 64);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let settings =
            Settings::from_json_str(r#"{ "shadow": { "surface_offset": 0.05 } }"#).unwrap();
        assert_eq!(settings.shadow.surface_offset, 0.05);
        assert_eq!(settings.shadow.max_grid_dim, 64);
        assert_eq!(settings.bonding, BondingSettings::default());
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let result = Settings::from_json_str(r#"{ "bonding": { "cell_size": -1.0 } }"#);
        assert!(matches!(
            result,
            Err(ConfigError::NonPositive { name: "bonding.cell_size", .. })
        ));

        let result = Settings::from_json_str(r#"{ "shadow": { "max_grid_dim": 0 } }"#);
        assert!(matches!(result, Err(ConfigError::TooSmall { .. })));

        assert!(matches!(
            Settings::from_json_str("not json"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_round_trip_through_json() {
        let mut settings = Settings::default();
        settings.hydrogen_bonds.max_distance = 3.2;
        let json_text = settings.to_json_string().unwrap();
        assert_eq!(Settings::from_json_str(&json_text).unwrap(), settings);
    }
}
