//! Editor session
//!
//! Owns what every handler needs: configuration, the viewing camera, the
//! zone collision engine, the pick resolver and the grid. Gesture state
//! lives here between tracker events, one [`ActionData`] at a time.

use super::action_data::ActionData;
use super::grid::{EditorGrid, SnapGrid};
use super::{GestureKind, HandlerContext, Tool};
use crate::commands::{CommandController, ErrorReporter, LogErrorReporter};
use crate::core::config::{ConfigError, EditorConfig};
use crate::error::{EditError, EditResult};
use crate::foundation::math::Vec2;
use crate::input::{PointerState, TrackerEvent, TrackerId, TrackerState};
use crate::physics::zone_collision::ZoneCollisionEngine;
use crate::picking::{PickResolver, PickResult};
use crate::render::{Camera, ViewFrustum};
use crate::scene::{EntityId, EntityKind, Scene};
use std::cell::Cell;
use std::fmt;
use std::rc::Rc;
use std::time::Instant;

/// Editing state shared by all manipulation handlers
pub struct EditorSession {
    config: EditorConfig,
    camera: Camera,
    collision: ZoneCollisionEngine,
    picker: PickResolver,
    grid: Box<dyn EditorGrid>,
    reporter: Rc<dyn ErrorReporter>,
    action: Option<ActionData>,
    next_id: Cell<u32>,
}

impl fmt::Debug for EditorSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EditorSession")
            .field("config", &self.config)
            .field("camera", &self.camera)
            .field("zone", &self.collision.zone())
            .field("action", &self.action)
            .finish_non_exhaustive()
    }
}

impl EditorSession {
    /// Create a session with the default camera, a grid from the
    /// manipulation settings and log-based error reporting.
    ///
    /// An invalid `config` is logged and replaced by the defaults; use
    /// [`try_new`](Self::try_new) to get the error instead.
    pub fn new(config: EditorConfig) -> Self {
        Self::try_new(config).unwrap_or_else(|error| {
            log::warn!("Invalid editor config ({}); using defaults", error);
            Self::build(EditorConfig::default())
        })
    }

    /// Create a session after validating `config`
    pub fn try_new(config: EditorConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: EditorConfig) -> Self {
        Self {
            camera: Camera::default(),
            collision: ZoneCollisionEngine::new(config.collision.clone()),
            picker: PickResolver::new(config.pick.clone()),
            grid: Box::new(SnapGrid::from_config(&config.manipulation)),
            reporter: Rc::new(LogErrorReporter),
            action: None,
            next_id: Cell::new(0),
            config,
        }
    }

    /// Builder pattern: set the camera
    pub fn with_camera(mut self, camera: Camera) -> Self {
        self.camera = camera;
        self
    }

    /// Builder pattern: replace the grid
    pub fn with_grid<G: EditorGrid + 'static>(mut self, grid: G) -> Self {
        self.grid = Box::new(grid);
        self
    }

    /// Builder pattern: replace the error reporter attached to commands
    pub fn with_reporter(mut self, reporter: Rc<dyn ErrorReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Set the active zone for collision and picking.
    ///
    /// Any gesture in progress is dropped.
    pub fn set_zone(&mut self, zone: Option<EntityId>) {
        if self.collision.zone() != zone {
            log::debug!("Active zone set to {:?}", zone);
            self.action = None;
        }
        self.collision.set_zone(zone);
        self.picker.set_zone(zone);
    }

    /// Active zone
    pub fn zone(&self) -> Option<EntityId> {
        self.collision.zone()
    }

    /// Editor settings
    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    /// Viewing camera
    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    /// Viewing camera, mutably
    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    /// Zone collision engine
    pub fn collision(&self) -> &ZoneCollisionEngine {
        &self.collision
    }

    /// Pick resolver
    pub fn picker(&self) -> &PickResolver {
        &self.picker
    }

    /// Grid used for snapping
    pub fn grid(&self) -> &dyn EditorGrid {
        self.grid.as_ref()
    }

    /// Reporter attached to emitted commands
    pub fn reporter(&self) -> Rc<dyn ErrorReporter> {
        Rc::clone(&self.reporter)
    }

    /// Reserve a fresh entity id for a pending add.
    ///
    /// Ids handed out here are never reused, even while the commands that
    /// add them are still queued.
    pub fn reserve_id(&self, scene: &Scene) -> EntityId {
        let id = self.next_id.get().max(scene.entities().next_id().0);
        self.next_id.set(id + 1);
        EntityId(id)
    }

    /// Gesture in progress
    pub fn action(&self) -> Option<&ActionData> {
        self.action.as_ref()
    }

    /// Pick at a pointer position in NDC
    pub fn pick(&self, scene: &Scene, device_position: &Vec2) -> Vec<PickResult> {
        self.picker.pick(scene, &self.camera, device_position)
    }

    /// Pick for selection, cycling through overlapping entities on
    /// repeated clicks
    pub fn pick_and_cycle(&mut self, scene: &Scene, pointer: &PointerState, now: Instant) -> Option<PickResult> {
        self.picker.pick_and_cycle(scene, &self.camera, pointer, now)
    }

    /// Snapshot `entities` (and the vertices and segments they drag along)
    /// for a new gesture.
    pub fn begin_gesture(
        &mut self,
        scene: &mut Scene,
        tracker: TrackerId,
        event: &TrackerEvent,
        entities: &[EntityId],
    ) -> EditResult<()> {
        let zone = self.collision.zone().ok_or(EditError::NoZone)?;
        let zone_world = self.collision.zone_world_transform(scene)?;
        let related = related_entities(scene, entities);
        scene.begin_gesture(&related);

        let picks = self.pick(scene, &event.device_position);
        let frustum = self.frustum_through(picks.first());
        let action = ActionData::capture(scene, zone, zone_world, tracker, event, frustum, picks, &related)?;
        log::debug!(
            "Gesture started by tracker {:?} on {} entities",
            tracker,
            action.snapshots().len()
        );
        self.action = Some(action);
        Ok(())
    }

    /// Drop the gesture in progress
    pub fn cancel_gesture(&mut self) {
        if self.action.take().is_some() {
            log::debug!("Gesture cancelled");
        }
    }

    /// Half-frustum at the depth of the grabbed point
    fn frustum_through(&self, hit: Option<&PickResult>) -> ViewFrustum {
        let depth = hit.and_then(|hit| {
            let forward = self.camera.forward()?;
            Some((hit.point - self.camera.position).dot(&forward))
        });
        match depth {
            Some(depth) if depth > self.camera.near => self.camera.frustum_at(depth),
            _ => self.camera.frustum_at_target(),
        }
    }

    /// Feed one tracker event through `gesture` and submit the resulting
    /// commands to `controller`. Returns how many commands were submitted.
    ///
    /// A press (or a click, which is a whole gesture) starts a new gesture;
    /// the final event ends it.
    pub fn respond(
        &mut self,
        scene: &mut Scene,
        gesture: GestureKind,
        tracker: TrackerId,
        event: &TrackerEvent,
        entities: &[EntityId],
        tool: Option<&Tool>,
        controller: &mut dyn CommandController,
    ) -> usize {
        if gesture.is_additive() && tool.is_none() {
            log::debug!("{} gesture needs a tool", gesture.name());
            return 0;
        }
        if matches!(event.state, TrackerState::Press | TrackerState::Click) {
            if let Err(error) = self.begin_gesture(scene, tracker, event, entities) {
                log::debug!("{} gesture not started: {}", gesture.name(), error);
                self.action = None;
                return 0;
            }
        }

        let Some(action) = self.action.take() else {
            log::debug!("{} event without a gesture in progress", gesture.name());
            return 0;
        };
        if action.tracker() != tracker {
            log::debug!("Ignoring tracker {:?}; gesture belongs to {:?}", tracker, action.tracker());
            self.action = Some(action);
            return 0;
        }

        let commands = {
            let ctx = HandlerContext {
                session: &*self,
                scene: &*scene,
                action: &action,
            };
            gesture.respond(&ctx, event, entities, tool)
        };
        if !event.state.is_final() {
            self.action = Some(action);
        }

        let count = commands.len();
        for command in commands {
            log::trace!("Submitting {} command (transient: {})", command.kind.name(), command.transient);
            controller.execute(command);
        }
        count
    }
}

/// `entities` plus every vertex and segment whose placement follows theirs
fn related_entities(scene: &Scene, entities: &[EntityId]) -> Vec<EntityId> {
    let store = scene.entities();
    let mut related: Vec<EntityId> = Vec::with_capacity(entities.len());
    let mut push = |id: EntityId| {
        if !related.contains(&id) {
            related.push(id);
        }
    };

    for &id in entities {
        push(id);
        let vertices: Vec<EntityId> = match scene.entity(id).map(|e| e.kind) {
            Some(EntityKind::Vertex) => vec![id],
            Some(EntityKind::Segment { start, end, .. }) => vec![start, end],
            _ => Vec::new(),
        };
        for vertex in vertices {
            push(vertex);
            for segment in store.segments_using(vertex) {
                push(segment);
                if let Some(EntityKind::Segment { start, end, .. }) = scene.entity(segment).map(|e| e.kind) {
                    push(start);
                    push(end);
                }
            }
        }
    }
    related
}
