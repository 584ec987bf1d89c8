//! Foundation module - Core utilities and types
//!
//! This module provides fundamental utilities used throughout the editor:
//! - Math types and operations
//! - Poll-based time sources
//! - Logging utilities

pub mod math;
pub mod time;
pub mod logging;
