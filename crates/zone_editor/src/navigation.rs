//! Camera navigation with collision avoidance
//!
//! Pointer drags propose a new camera placement: orbit around the target,
//! pan in the view plane, or dolly toward the target. A box of
//! `avatar_size` stands in for the viewer; a proposal that would put it
//! inside any zone descendant is rejected and the camera stays put.

use crate::core::config::NavigationConfig;
use crate::foundation::math::{vec3_from_f32, Mat4, Point3, Real, Vec2, Vec3, DEGENERATE_LENGTH};
use crate::physics::bounds::OrientedBoundingBox;
use crate::physics::ZoneCollisionEngine;
use crate::render::Camera;
use crate::scene::Scene;
use std::f64::consts::FRAC_PI_2;

/// Margin keeping orbit pitch off the poles
const POLE_MARGIN: Real = 0.01;

/// What a drag does to the camera
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NavigationMode {
    /// Orbit around the target
    #[default]
    Examine,
    /// Slide position and target together in the view plane
    Pan,
    /// Move toward or away from the target
    Zoom,
}

/// Drives the camera from pointer deltas
#[derive(Debug, Clone)]
pub struct NavigationController {
    config: NavigationConfig,
    mode: NavigationMode,
}

impl NavigationController {
    /// Create a controller in [`NavigationMode::Examine`]
    pub fn new(config: NavigationConfig) -> Self {
        Self {
            config,
            mode: NavigationMode::default(),
        }
    }

    /// Current drag mode
    pub fn mode(&self) -> NavigationMode {
        self.mode
    }

    /// Switch drag mode
    pub fn set_mode(&mut self, mode: NavigationMode) {
        self.mode = mode;
    }

    /// Speeds, avatar size and zoom limit
    pub fn config(&self) -> &NavigationConfig {
        &self.config
    }

    /// Apply a drag of `delta` (NDC) in the current mode.
    ///
    /// Returns `false` when the move was rejected; the camera is then left
    /// unchanged.
    pub fn navigate(&self, scene: &Scene, collision: &ZoneCollisionEngine, camera: &mut Camera, delta: &Vec2) -> bool {
        let Some(proposal) = self.propose(camera, delta) else {
            log::debug!("{:?} navigation has no usable camera frame", self.mode);
            return false;
        };
        if self.blocked(scene, collision, &proposal.position) {
            log::debug!("Navigation to {:?} blocked", proposal.position);
            return false;
        }
        *camera = proposal;
        true
    }

    /// Camera the drag would produce, ignoring collisions
    pub fn propose(&self, camera: &Camera, delta: &Vec2) -> Option<Camera> {
        let mut next = camera.clone();
        match self.mode {
            NavigationMode::Examine => {
                self.orbit(&mut next, delta.x * self.config.orbit_speed, delta.y * self.config.orbit_speed)?;
            }
            NavigationMode::Pan => self.pan(&mut next, delta)?,
            NavigationMode::Zoom => self.dolly(&mut next, delta.y * self.config.zoom_speed)?,
        }
        Some(next)
    }

    /// Spherical orbit about the target; +Z is the pole
    fn orbit(&self, camera: &mut Camera, yaw: Real, pitch: Real) -> Option<()> {
        let offset = camera.position - camera.target;
        let distance = offset.norm();
        let direction = offset.try_normalize(DEGENERATE_LENGTH)?;

        let theta = direction.y.atan2(direction.x) - yaw;
        let phi = (direction.z.asin() - pitch).clamp(-FRAC_PI_2 + POLE_MARGIN, FRAC_PI_2 - POLE_MARGIN);
        let turned = Vec3::new(phi.cos() * theta.cos(), phi.cos() * theta.sin(), phi.sin());

        camera.position = camera.target + turned * distance;
        Some(())
    }

    /// Pan scaled so the point under the target tracks the pointer
    fn pan(&self, camera: &mut Camera, delta: &Vec2) -> Option<()> {
        let right = camera.right()?;
        let forward = camera.forward()?;
        let up = right.cross(&forward);
        let frustum = camera.frustum_at(camera.distance());
        let (dx, dy) = frustum.scale_device_delta(delta.x, delta.y);
        let shift = (right * -dx + up * -dy) * self.config.pan_speed;

        camera.position += shift;
        camera.target += shift;
        Some(())
    }

    /// Dolly by `amount` times the current distance, never closer than
    /// `min_distance`
    fn dolly(&self, camera: &mut Camera, amount: Real) -> Option<()> {
        let forward = camera.forward()?;
        let distance = camera.distance();
        let next = (distance * (1.0 - amount)).max(self.config.min_distance);
        camera.position = camera.target - forward * next;
        Some(())
    }

    fn blocked(&self, scene: &Scene, collision: &ZoneCollisionEngine, position: &Point3) -> bool {
        let avatar = OrientedBoundingBox::from_size(vec3_from_f32(self.config.avatar_size), Vec3::repeat(1.0))
            .transformed(&Mat4::new_translation(&position.coords));
        let mut hits = Vec::new();
        collision.check_bounds(scene, &avatar, None, &mut hits)
    }
}
