//! Grid snapping

use crate::core::config::ManipulationConfig;
use crate::foundation::math::{Real, Vec3};

/// Positional snapping consulted by manipulation handlers
pub trait EditorGrid {
    /// Snap a zone-frame position to the nearest grid point
    fn align_position_to_grid(&self, position: &Vec3) -> Vec3;

    /// Adjust `vector` so that `fixed_reference + vector` lands on the grid
    fn align_vector_to_grid_spacing(&self, vector: &Vec3, fixed_reference: &Vec3) -> Vec3 {
        self.align_position_to_grid(&(fixed_reference + vector)) - fixed_reference
    }
}

/// Uniform cubic grid
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnapGrid {
    spacing: Real,
    enabled: bool,
}

impl SnapGrid {
    /// Enabled grid with the given spacing
    pub fn new(spacing: Real) -> Self {
        Self {
            spacing,
            enabled: spacing > 0.0,
        }
    }

    /// Grid that leaves positions untouched
    pub fn disabled() -> Self {
        Self {
            spacing: 0.0,
            enabled: false,
        }
    }

    /// Grid from manipulation settings
    pub fn from_config(config: &ManipulationConfig) -> Self {
        if config.grid_enabled {
            Self::new(config.grid_spacing)
        } else {
            Self::disabled()
        }
    }

    /// Spacing between grid points
    pub fn spacing(&self) -> Real {
        self.spacing
    }

    /// Whether snapping is active
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

impl Default for SnapGrid {
    fn default() -> Self {
        Self::from_config(&ManipulationConfig::default())
    }
}

impl EditorGrid for SnapGrid {
    fn align_position_to_grid(&self, position: &Vec3) -> Vec3 {
        if !self.enabled {
            return *position;
        }
        position.map(|c| (c / self.spacing).round() * self.spacing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_align_position() {
        let grid = SnapGrid::new(0.5);
        assert_relative_eq!(
            grid.align_position_to_grid(&Vec3::new(0.26, -0.74, 1.1)),
            Vec3::new(0.5, -0.5, 1.0),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_align_vector_keeps_reference_on_grid() {
        let grid = SnapGrid::new(0.5);
        let reference = Vec3::new(0.1, 0.0, 0.0);
        let aligned = grid.align_vector_to_grid_spacing(&Vec3::new(0.3, 0.0, 0.0), &reference);
        assert_relative_eq!(aligned, Vec3::new(0.4, 0.0, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn test_disabled_grid_is_identity() {
        let grid = SnapGrid::from_config(&ManipulationConfig {
            grid_enabled: false,
            ..ManipulationConfig::default()
        });
        let p = Vec3::new(0.123, 4.56, 7.89);
        assert_eq!(grid.align_position_to_grid(&p), p);
        assert!(!grid.is_enabled());
    }
}
