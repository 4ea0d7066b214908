//! Spatial indexing for molecular scenes
//!
//! Linked-cell grids answer "what is near this point" in constant time per
//! query. On top of them sit bond inference from atom positions and
//! per-element radii, hydrogen-bond detection, nearest-atom surface colouring
//! and a shadow visibility engine for directional lights.

pub mod analysis;
pub mod config;
pub mod error;
pub mod protein;
pub mod shadow;
pub mod spatial;
pub mod surface;
pub mod util;

pub use config::Settings;
pub use error::{ConfigError, ShadowError};
pub use protein::{AtomBond, ConnectivityBuilder};
pub use shadow::{
    EngineState, OcclusionCache, OcclusionQuery, PrimitiveHandle, PrimitiveKind, ShadowEngine,
};
pub use spatial::{BoundedGrid2, NeighbourFilter, Rect2, SpatialHashGrid};
