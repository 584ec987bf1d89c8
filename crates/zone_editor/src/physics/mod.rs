//! Physics module for collision detection
//!
//! Oriented-box and triangle intersection, plus the zone-relative collision
//! engine that manipulation handlers query on every pointer move.

pub mod bounds;
pub mod collision;
pub mod triangle_intersector;
pub mod zone_collision;

pub use bounds::OrientedBoundingBox;
pub use collision::{Ray, Triangle};
pub use triangle_intersector::TriangleIntersector;
pub use zone_collision::ZoneCollisionEngine;
