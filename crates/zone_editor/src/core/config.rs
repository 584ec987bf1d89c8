//! # Editor Configuration
//!
//! Tunables for the collision, picking, manipulation and navigation
//! subsystems. Every struct is serde-serializable and has sensible defaults,
//! so a config file only needs to name the values it overrides.
//!
//! ## Configuration Categories
//!
//! - **Collision**: tolerance band, embedding depth, stacking iterations
//! - **Pick**: selection-cycle tolerance and timeout, precise triangle picking
//! - **Manipulation**: grid snapping and scale limits
//! - **Navigation**: avatar bounds and camera speeds

use serde::{Deserialize, Serialize};
use std::time::Duration;

pub use crate::config::{Config, ConfigError};

/// Offset keeping embedded objects (windows in walls, items resting on a
/// surface) from z-fighting with their host surface.
pub const DEFAULT_EMBEDDING_DEPTH: f64 = 1.0e-3;

/// Default tolerance used when `use_epsilon` is requested on bounds tests.
pub const DEFAULT_COLLISION_EPSILON: f64 = 1.0e-4;

/// # Collision Configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollisionConfig {
    /// Gap below which two boxes count as touching in epsilon mode
    pub epsilon: f64,
    /// Depth an object sinks into the surface it rests on
    pub embedding_depth: f64,
    /// Upper bound on re-checks while resolving a stack elevation
    pub max_stack_iterations: usize,
}

impl Default for CollisionConfig {
    fn default() -> Self {
        Self {
            epsilon: DEFAULT_COLLISION_EPSILON,
            embedding_depth: DEFAULT_EMBEDDING_DEPTH,
            max_stack_iterations: 8,
        }
    }
}

/// # Pick Configuration
///
/// Controls selection cycling: repeated clicks within `cycle_tolerance_px`
/// of the previous click, and before `cycle_timeout_ms` elapses, step through
/// overlapping hits instead of re-selecting the nearest one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PickConfig {
    /// Pointer movement (pixels) still treated as the same position
    pub cycle_tolerance_px: f64,
    /// Time window for cycling, in milliseconds
    pub cycle_timeout_ms: u64,
    /// Refine bounding-box hits against model triangles
    pub precise: bool,
}

impl PickConfig {
    /// Cycle timeout as a duration
    pub fn cycle_timeout(&self) -> Duration {
        Duration::from_millis(self.cycle_timeout_ms)
    }
}

impl Default for PickConfig {
    fn default() -> Self {
        Self {
            cycle_tolerance_px: 3.0,
            cycle_timeout_ms: 5000,
            precise: true,
        }
    }
}

/// # Manipulation Configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManipulationConfig {
    /// Smallest per-axis scale a scale gesture may produce
    pub min_scale: f32,
    /// Grid spacing in world units
    pub grid_spacing: f64,
    /// Whether positions snap to the grid
    pub grid_enabled: bool,
}

impl Default for ManipulationConfig {
    fn default() -> Self {
        Self {
            min_scale: 0.01,
            grid_spacing: 0.1,
            grid_enabled: true,
        }
    }
}

/// # Navigation Configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigationConfig {
    /// Size of the box standing in for the viewer during collision avoidance
    pub avatar_size: [f32; 3],
    /// Multiplier for dolly distance per unit of pointer travel
    pub zoom_speed: f64,
    /// Radians of orbit per unit of pointer travel
    pub orbit_speed: f64,
    /// Multiplier for pan distance per unit of pointer travel
    pub pan_speed: f64,
    /// Closest the camera may zoom toward its target
    pub min_distance: f64,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            avatar_size: [0.3, 0.3, 0.3],
            zoom_speed: 1.0,
            orbit_speed: 1.0,
            pan_speed: 1.0,
            min_distance: 0.25,
        }
    }
}

/// # Complete Editor Configuration
///
/// Top-level configuration that encompasses all editing subsystems.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Collision engine settings
    pub collision: CollisionConfig,
    /// Picking and selection cycling settings
    pub pick: PickConfig,
    /// Manipulation handler settings
    pub manipulation: ManipulationConfig,
    /// Camera navigation settings
    pub navigation: NavigationConfig,
}

impl EditorConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.collision.epsilon < 0.0 {
            return Err(invalid("collision.epsilon", "must not be negative"));
        }
        if self.collision.embedding_depth < 0.0 {
            return Err(invalid("collision.embedding_depth", "must not be negative"));
        }
        if self.pick.cycle_timeout_ms == 0 {
            return Err(invalid("pick.cycle_timeout_ms", "must be at least 1"));
        }
        if self.pick.cycle_tolerance_px < 0.0 {
            return Err(invalid("pick.cycle_tolerance_px", "must not be negative"));
        }
        if self.manipulation.min_scale <= 0.0 {
            return Err(invalid("manipulation.min_scale", "must be positive"));
        }
        if self.manipulation.grid_spacing <= 0.0 {
            return Err(invalid("manipulation.grid_spacing", "must be positive"));
        }
        if self.navigation.min_distance < 0.0 {
            return Err(invalid("navigation.min_distance", "must not be negative"));
        }
        Ok(())
    }
}

fn invalid(field: &'static str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.to_string(),
    }
}

impl Config for EditorConfig {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(EditorConfig::default().validate().is_ok());
    }

    #[test]
    fn test_toml_partial_override() {
        let config = EditorConfig::from_toml_str(
            "[pick]\ncycle_timeout_ms = 2000\n\n[collision]\nepsilon = 0.01\n",
        )
        .unwrap();
        assert_eq!(config.pick.cycle_timeout(), Duration::from_secs(2));
        assert!((config.collision.epsilon - 0.01).abs() < 1e-12);
        assert_eq!(config.manipulation, ManipulationConfig::default());
    }

    #[test]
    fn test_ron_round_trip() {
        let mut config = EditorConfig::default();
        config.manipulation.grid_enabled = false;
        let text = config.to_ron_string().unwrap();
        let parsed = EditorConfig::from_ron_str(&text).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let mut config = EditorConfig::default();
        config.pick.cycle_timeout_ms = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { field: "pick.cycle_timeout_ms", .. })
        ));
    }

    #[test]
    fn test_unknown_extension_rejected() {
        let result = EditorConfig::load_from_file("editor.yaml");
        assert!(result.is_err());
    }
}
