//! # Zone Editor
//!
//! Zone-relative collision, picking and manipulation commands for an
//! interactive 3D scene editor.
//!
//! ## Features
//!
//! - **Zones**: floors and walls define the frame every placement is measured in
//! - **Collision**: oriented-box and triangle tests, stacking with embedding depth
//! - **Picking**: camera-ray picks with click-to-cycle through overlapping hits
//! - **Manipulation**: move, rotate, scale, thickness and add gestures emitting
//!   undoable commands
//! - **Navigation**: orbit, pan and zoom that refuse to fly into geometry
//!
//! ## Quick Start
//!
//! ```rust
//! use zone_editor::prelude::*;
//!
//! let mut scene = Scene::new();
//! scene
//!     .add_entity(Entity::new(EntityId(1), EntityKind::Zone(ZoneKind::Floor)).with_size([10.0, 10.0, 0.0]))
//!     .unwrap();
//! let cube = scene
//!     .add_entity(Entity::new(EntityId(2), EntityKind::Model).with_parent(EntityId(1)).with_position([0.0, 0.0, 0.5]))
//!     .unwrap();
//!
//! let mut session = EditorSession::new(EditorConfig::default())
//!     .with_camera(Camera::perspective(Point3::new(0.0, -8.0, 6.0), 60.0, 1.5, 0.1, 100.0));
//! session.set_zone(Some(EntityId(1)));
//!
//! let mut queue = CommandQueue::new();
//! let press = TrackerEvent::new(TrackerState::Press, Vec2::zeros(), Vec2::zeros());
//! let release = TrackerEvent::new(TrackerState::Release, Vec2::new(0.1, 0.0), Vec2::zeros());
//! for event in [press, release] {
//!     session.respond(&mut scene, GestureKind::Move, TrackerId(0), &event, &[cube], None, &mut queue);
//! }
//! queue.apply_to(&mut scene);
//! assert!(scene.entity(cube).unwrap().position[0] > 0.0);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

// Shared settings
pub mod config;
pub mod core;
pub mod error;

pub mod foundation;
pub mod scene;
pub mod physics;
pub mod render;
pub mod input;
pub mod picking;
pub mod commands;
pub mod manipulation;
pub mod navigation;

pub use error::{EditError, EditResult};

/// Common imports for editor hosts
pub mod prelude {
    pub use crate::{
        commands::{Command, CommandController, CommandKind, CommandQueue, ErrorReporter, LogErrorReporter},
        core::config::{Config, EditorConfig},
        error::{EditError, EditResult},
        foundation::math::{Mat4, Point3, Quat, Real, Vec2, Vec3},
        input::{PointerState, TrackerEvent, TrackerId, TrackerState},
        manipulation::{EditorSession, GestureKind, SnapGrid, Tool},
        navigation::{NavigationController, NavigationMode},
        physics::{OrientedBoundingBox, ZoneCollisionEngine},
        picking::{PickResolver, PickResult, PickTarget},
        render::Camera,
        scene::{Entity, EntityFlags, EntityId, EntityKind, Scene, ZoneKind},
    };
}
