//! # Core Editor Module
//!
//! Shared configuration used by every editing subsystem.

pub mod config;

pub use config::{
    CollisionConfig,
    Config,
    ConfigError,
    EditorConfig,
    ManipulationConfig,
    NavigationConfig,
    PickConfig,
    DEFAULT_EMBEDDING_DEPTH,
};
