//! Edit commands
//!
//! Handlers never touch entity data directly. They describe each edit as a
//! [`Command`] and hand it to a [`CommandController`], which owns execution
//! and undo. Transient commands are issued on every pointer move of a drag
//! and are superseded by the durable command issued when the gesture ends.
//!
//! # Example
//!
//! ```rust
//! use zone_editor::commands::{Command, CommandController, CommandKind, CommandQueue};
//! use zone_editor::scene::EntityId;
//!
//! let mut queue = CommandQueue::new();
//! queue.execute(Command::durable(CommandKind::Select {
//!     entities: vec![EntityId(3)],
//! }));
//! assert_eq!(queue.len(), 1);
//! ```

use crate::error::EditError;
use crate::scene::{Entity, EntityId, Scene};
use std::fmt;
use std::rc::Rc;

/// Receives errors raised while a command executes
pub trait ErrorReporter {
    /// Report that `command` failed with `error`
    fn report(&self, command: &Command, error: &EditError);
}

/// Reporter that forwards failures to the `log` facade
#[derive(Debug, Default, Clone, Copy)]
pub struct LogErrorReporter;

impl ErrorReporter for LogErrorReporter {
    fn report(&self, command: &Command, error: &EditError) {
        log::warn!("{} command failed: {}", command.kind.name(), error);
    }
}

/// What an edit does
#[derive(Debug, Clone, PartialEq)]
pub enum CommandKind {
    /// Place an entity at a new position in its parent's frame
    Move {
        /// Target entity
        entity: EntityId,
        /// New box centre
        position: [f64; 3],
    },
    /// Replace an entity's rotation
    Rotate {
        /// Target entity
        entity: EntityId,
        /// New axis-angle rotation
        rotation: [f32; 4],
    },
    /// Replace an entity's scale
    Scale {
        /// Target entity
        entity: EntityId,
        /// New per-axis scale
        scale: [f32; 3],
    },
    /// Insert a new entity
    Add {
        /// Fully placed entity, id already allocated
        entity: Box<Entity>,
    },
    /// Replace the selection
    Select {
        /// Newly selected entities
        entities: Vec<EntityId>,
    },
    /// Change a segment's thickness
    ChangeThickness {
        /// Target segment
        segment: EntityId,
        /// New thickness
        thickness: f32,
    },
    /// Re-fit a segment between its endpoints
    AlignSegment {
        /// Target segment
        segment: EntityId,
        /// New box centre
        position: [f64; 3],
        /// New rotation about the zone normal
        rotation: [f32; 4],
        /// New size (length, thickness, height)
        size: [f32; 3],
    },
    /// Commands executed and undone as one unit
    Multi(Vec<Command>),
}

impl CommandKind {
    /// Short name used in diagnostics
    pub fn name(&self) -> &'static str {
        match self {
            Self::Move { .. } => "move",
            Self::Rotate { .. } => "rotate",
            Self::Scale { .. } => "scale",
            Self::Add { .. } => "add",
            Self::Select { .. } => "select",
            Self::ChangeThickness { .. } => "change thickness",
            Self::AlignSegment { .. } => "align segment",
            Self::Multi(_) => "multi",
        }
    }
}

/// An edit plus the hook that reports its failure
#[derive(Clone)]
pub struct Command {
    /// What the command does
    pub kind: CommandKind,
    /// Whether a later command is expected to supersede this one
    pub transient: bool,
    reporter: Rc<dyn ErrorReporter>,
}

impl Command {
    /// Create a command reporting failures through `reporter`
    pub fn new(kind: CommandKind, transient: bool, reporter: Rc<dyn ErrorReporter>) -> Self {
        Self {
            kind,
            transient,
            reporter,
        }
    }

    /// Durable command with the default log reporter
    pub fn durable(kind: CommandKind) -> Self {
        Self::new(kind, false, Rc::new(LogErrorReporter))
    }

    /// Transient command with the default log reporter
    pub fn transient(kind: CommandKind) -> Self {
        Self::new(kind, true, Rc::new(LogErrorReporter))
    }

    /// Batch `commands` into one `Multi`; transient only if all parts are
    pub fn multi(commands: Vec<Command>, reporter: Rc<dyn ErrorReporter>) -> Self {
        let transient = !commands.is_empty() && commands.iter().all(|c| c.transient);
        Self::new(CommandKind::Multi(commands), transient, reporter)
    }

    /// Forward a failure to this command's reporter
    pub fn report(&self, error: &EditError) {
        self.reporter.report(self, error);
    }

    /// Entities this command changes, flattened through `Multi`
    pub fn affected_entities(&self) -> Vec<EntityId> {
        match &self.kind {
            CommandKind::Move { entity, .. }
            | CommandKind::Rotate { entity, .. }
            | CommandKind::Scale { entity, .. } => vec![*entity],
            CommandKind::ChangeThickness { segment, .. } | CommandKind::AlignSegment { segment, .. } => {
                vec![*segment]
            }
            CommandKind::Add { entity } => vec![entity.id()],
            CommandKind::Select { entities } => entities.clone(),
            CommandKind::Multi(parts) => parts.iter().flat_map(Command::affected_entities).collect(),
        }
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("kind", &self.kind)
            .field("transient", &self.transient)
            .finish_non_exhaustive()
    }
}

impl PartialEq for Command {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.transient == other.transient
    }
}

/// Executes commands and owns their undo history
pub trait CommandController {
    /// Execute (or enqueue) a command
    fn execute(&mut self, command: Command);
}

/// In-memory controller that records commands in submission order
#[derive(Debug, Default)]
pub struct CommandQueue {
    commands: Vec<Command>,
}

impl CommandQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorded commands
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Number of recorded commands
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Whether no commands are recorded
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Take all recorded commands
    pub fn drain(&mut self) -> Vec<Command> {
        std::mem::take(&mut self.commands)
    }

    /// Apply and clear all recorded commands; failures go to each
    /// command's reporter. Returns how many commands applied cleanly.
    pub fn apply_to(&mut self, scene: &mut Scene) -> usize {
        let mut applied = 0;
        for command in self.drain() {
            match scene.apply(&command) {
                Ok(()) => applied += 1,
                Err(error) => command.report(&error),
            }
        }
        applied
    }
}

impl CommandController for CommandQueue {
    fn execute(&mut self, command: Command) {
        log::trace!(
            "Queued {} command ({})",
            command.kind.name(),
            if command.transient { "transient" } else { "durable" }
        );
        self.commands.push(command);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Default)]
    struct RecordingReporter {
        failures: RefCell<Vec<String>>,
    }

    impl ErrorReporter for RecordingReporter {
        fn report(&self, command: &Command, error: &EditError) {
            self.failures
                .borrow_mut()
                .push(format!("{}: {}", command.kind.name(), error));
        }
    }

    #[test]
    fn test_multi_is_transient_only_when_all_parts_are() {
        let reporter: Rc<dyn ErrorReporter> = Rc::new(LogErrorReporter);
        let mixed = Command::multi(
            vec![
                Command::transient(CommandKind::Select { entities: vec![] }),
                Command::durable(CommandKind::Select { entities: vec![] }),
            ],
            reporter.clone(),
        );
        assert!(!mixed.transient);

        let all = Command::multi(
            vec![Command::transient(CommandKind::Select { entities: vec![] })],
            reporter,
        );
        assert!(all.transient);
    }

    #[test]
    fn test_affected_entities_flatten_multi() {
        let command = Command::multi(
            vec![
                Command::durable(CommandKind::Move { entity: EntityId(1), position: [0.0; 3] }),
                Command::durable(CommandKind::ChangeThickness { segment: EntityId(4), thickness: 0.3 }),
            ],
            Rc::new(LogErrorReporter),
        );
        assert_eq!(command.affected_entities(), vec![EntityId(1), EntityId(4)]);
    }

    #[test]
    fn test_failed_apply_goes_to_reporter() {
        let reporter = Rc::new(RecordingReporter::default());
        let mut queue = CommandQueue::new();
        queue.execute(Command::new(
            CommandKind::Move { entity: EntityId(42), position: [1.0, 0.0, 0.0] },
            false,
            reporter.clone(),
        ));

        let mut scene = Scene::new();
        assert_eq!(queue.apply_to(&mut scene), 0);
        assert!(queue.is_empty());
        assert_eq!(reporter.failures.borrow().len(), 1);
        assert!(reporter.failures.borrow()[0].starts_with("move"));
    }
}
