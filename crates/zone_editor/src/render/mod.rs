//! Viewing
//!
//! Only the camera math the editor needs for picking and pointer-to-world
//! conversion; drawing is left to the host application.

pub mod camera;

pub use camera::{Camera, ViewFrustum};
