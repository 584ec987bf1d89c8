//! Editing errors
//!
//! Per-frame entry points never return these to the interaction loop. They
//! flow through internal helpers with `?` and are logged where the affected
//! entity is skipped.

use crate::scene::EntityId;
use thiserror::Error;

/// Errors raised while resolving an edit
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditError {
    /// No wrapper is registered for the entity
    #[error("no spatial wrapper for entity {0}")]
    MissingWrapper(EntityId),

    /// The entity is not in the entity store
    #[error("entity {0} is not in the scene")]
    MissingEntity(EntityId),

    /// An entity with this id is already in the scene
    #[error("entity {0} already exists")]
    DuplicateEntity(EntityId),

    /// A render-graph node was removed while still referenced
    #[error("render node no longer exists")]
    MissingNode,

    /// A direction or delta had zero length
    #[error("degenerate direction: {0}")]
    DegenerateDirection(&'static str),

    /// A mesh uses a primitive encoding the intersector cannot decode
    #[error("unsupported primitive encoding: {0}")]
    UnsupportedPrimitive(&'static str),

    /// No zone has been configured
    #[error("no active zone")]
    NoZone,

    /// The pick produced no usable hit
    #[error("pick returned no results")]
    EmptyPick,

    /// The entity's children changed since the gesture started
    #[error("topology of entity {0} changed during the gesture")]
    TopologyChanged(EntityId),
}

/// Result alias for editing operations
pub type EditResult<T> = Result<T, EditError>;
