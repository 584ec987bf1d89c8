//! # Manipulation pipeline
//!
//! Turns tracker events into edit commands.
//!
//! ## Architecture
//!
//! ```text
//! TrackerEvent ──▶ EditorSession::respond
//!                      │ Press: snapshot ActionData
//!                      ▼
//!                  GestureKind::respond ──▶ handler (move, rotate, ...)
//!                      │ Vec<Command>
//!                      ▼
//!                  CommandController::execute
//! ```
//!
//! Handlers are stateless per invocation: every result is computed from the
//! gesture's [`ActionData`] plus the current event. A handler that cannot
//! resolve an entity (missing wrapper, degenerate direction, empty pick,
//! changed topology) logs and skips that entity.

pub mod action_data;
pub mod grid;
pub mod session;

mod add_handler;
mod move_handler;
mod placement;
mod rotate_handler;
mod scale_handler;
mod thickness_handler;

#[cfg(test)]
mod test_support;

pub use action_data::{ActionData, EntitySnapshot, ZoneOrientation};
pub use grid::{EditorGrid, SnapGrid};
pub use session::EditorSession;

use crate::commands::{Command, CommandKind};
use crate::foundation::math::{quat_from_axis_angle, vec3_from_f32, Quat, Real, Vec3, DEGENERATE_LENGTH};
use crate::input::{TrackerEvent, TrackerState};
use crate::physics::bounds::OrientedBoundingBox;
use crate::scene::{Entity, EntityFlags, EntityId, EntityKind, Scene};

/// What a tracker gesture does to the entities it acts on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GestureKind {
    /// Translate in the zone plane, emitting durable commands
    Move,
    /// Translate in the zone plane, transient until the gesture ends
    TransientMove,
    /// Spin about the zone normal
    Rotate,
    /// Corner-drag scaling
    Scale,
    /// Place the tool's template
    Add,
    /// Place the template stretched between its neighbours
    AddAutoSpan,
    /// Place a vertex, joined to the previous one by a segment
    AddSegmentable,
    /// Drag a segment face to change its thickness
    SegmentThickness,
}

impl GestureKind {
    /// Short name used in diagnostics
    pub fn name(self) -> &'static str {
        match self {
            Self::Move => "move",
            Self::TransientMove => "transient move",
            Self::Rotate => "rotate",
            Self::Scale => "scale",
            Self::Add => "add",
            Self::AddAutoSpan => "add auto-span",
            Self::AddSegmentable => "add segmentable",
            Self::SegmentThickness => "segment thickness",
        }
    }

    /// Whether the gesture creates entities rather than editing them
    pub fn is_additive(self) -> bool {
        matches!(self, Self::Add | Self::AddAutoSpan | Self::AddSegmentable)
    }

    /// Commands for one event of the gesture
    pub fn respond(
        self,
        ctx: &HandlerContext<'_>,
        event: &TrackerEvent,
        entities: &[EntityId],
        tool: Option<&Tool>,
    ) -> Vec<Command> {
        let transient = !event.state.is_final();
        match self {
            Self::Move => move_handler::respond(ctx, event, entities, false),
            Self::TransientMove => move_handler::respond(ctx, event, entities, transient),
            Self::Rotate => rotate_handler::respond(ctx, event, entities, transient),
            Self::Scale => scale_handler::respond(ctx, event, entities, transient),
            Self::SegmentThickness => thickness_handler::respond(ctx, event, entities, transient),
            Self::Add => add_handler::respond_add(ctx, event, tool),
            Self::AddAutoSpan => add_handler::respond_auto_span(ctx, event, tool),
            Self::AddSegmentable => add_handler::respond_segmentable(ctx, event, tool),
        }
    }
}

/// Template and settings for additive gestures
#[derive(Debug, Clone, PartialEq)]
pub struct Tool {
    /// Kind of entity placed
    pub kind: EntityKind,
    /// Unscaled size of placed entities
    pub size: [f32; 3],
    /// Scale of placed entities
    pub scale: [f32; 3],
    /// Rotation of placed entities, relative to the zone
    pub rotation: [f32; 4],
    /// Flags of placed entities
    pub flags: EntityFlags,
    /// Vertex the next segment starts from
    pub previous_vertex: Option<EntityId>,
    /// Segmentable new vertices join when there is no previous vertex
    pub segmentable: Option<EntityId>,
    /// Thickness of segments created between vertices
    pub segment_thickness: f32,
    /// Height of segments created between vertices
    pub segment_height: f32,
}

impl Tool {
    /// Tool placing plain models of the given size
    pub fn model(size: [f32; 3]) -> Self {
        Self {
            kind: EntityKind::Model,
            size,
            scale: [1.0; 3],
            rotation: [0.0, 0.0, 1.0, 0.0],
            flags: EntityFlags::default(),
            previous_vertex: None,
            segmentable: None,
            segment_thickness: 0.2,
            segment_height: 2.5,
        }
    }

    /// Tool placing vertices joined by segments of the given section
    pub fn segmented(thickness: f32, height: f32) -> Self {
        Self {
            kind: EntityKind::Vertex,
            size: [0.1; 3],
            flags: EntityFlags::PICKABLE,
            segment_thickness: thickness,
            segment_height: height,
            ..Self::model([0.1; 3])
        }
    }

    /// Builder pattern: continue from an existing vertex
    pub fn with_previous_vertex(mut self, vertex: EntityId) -> Self {
        self.previous_vertex = Some(vertex);
        self
    }

    /// Builder pattern: add vertices to an existing segmentable
    pub fn with_segmentable(mut self, segmentable: EntityId) -> Self {
        self.segmentable = Some(segmentable);
        self
    }

    /// Builder pattern: set the placed scale
    pub fn with_scale(mut self, scale: [f32; 3]) -> Self {
        self.scale = scale;
        self
    }

    /// Rotation as a quaternion
    pub fn rotation_quat(&self) -> Quat {
        quat_from_axis_angle(self.rotation)
    }

    /// Scaled extent per axis
    pub fn extent(&self) -> Vec3 {
        vec3_from_f32(self.size).component_mul(&vec3_from_f32(self.scale))
    }

    /// Scaled height along local Z
    pub fn scaled_height(&self) -> Real {
        Real::from(self.size[2]) * Real::from(self.scale[2])
    }

    /// Local bounds of a placed entity
    pub fn local_bounds(&self) -> OrientedBoundingBox {
        OrientedBoundingBox::from_size(vec3_from_f32(self.size), vec3_from_f32(self.scale))
    }

    /// Entity built from the template
    pub fn instantiate(&self, id: EntityId, parent: EntityId, position: &Vec3) -> Entity {
        Entity::new(id, self.kind)
            .with_parent(parent)
            .with_position([position.x, position.y, position.z])
            .with_rotation(self.rotation)
            .with_scale(self.scale)
            .with_size(self.size)
            .with_flags(self.flags)
    }
}

/// Everything a handler reads while responding
#[derive(Debug, Clone, Copy)]
pub struct HandlerContext<'a> {
    /// Session settings, camera and collision engine
    pub session: &'a EditorSession,
    /// Scene as of this event
    pub scene: &'a Scene,
    /// Snapshot taken at gesture start
    pub action: &'a ActionData,
}

impl HandlerContext<'_> {
    /// Command carrying the session's error reporter
    pub fn command(&self, kind: CommandKind, transient: bool) -> Command {
        Command::new(kind, transient, self.session.reporter())
    }

    /// One command for `parts`: itself when single, `Multi` otherwise
    pub fn batch(&self, mut parts: Vec<Command>) -> Option<Command> {
        match parts.len() {
            0 => None,
            1 => parts.pop(),
            _ => Some(Command::multi(parts, self.session.reporter())),
        }
    }
}

/// Whether an edit gesture should emit for `event`.
///
/// Presses and clicks never edit. Drags emit once the pointer has moved;
/// the release always emits so transient edits are finalised.
fn emits_edit(ctx: &HandlerContext<'_>, event: &TrackerEvent) -> bool {
    match event.state {
        TrackerState::Press | TrackerState::Click => false,
        TrackerState::Release => true,
        TrackerState::Drag => {
            let moved = ctx.action.device_delta(event).norm() > DEGENERATE_LENGTH;
            if !moved {
                log::trace!("Zero pointer delta; nothing to emit");
            }
            moved
        }
    }
}
