//! Pointer input
//!
//! Device polling belongs to the host window layer. The editor only sees
//! tracker events carrying a pointer position in pixels and in normalized
//! device coordinates (NDC).

use crate::foundation::math::{Real, Vec2};

/// Identifies one pointing device (mouse, pen, tracked controller)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TrackerId(pub u32);

/// Phase of a tracker gesture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerState {
    /// Button went down; the gesture starts
    Press,
    /// Pointer moved with the button held
    Drag,
    /// Button released after a drag; the gesture ends
    Release,
    /// Button pressed and released without dragging
    Click,
}

impl TrackerState {
    /// Whether this event completes a gesture
    pub fn is_final(self) -> bool {
        matches!(self, Self::Release | Self::Click)
    }
}

/// One tracker event as delivered to handlers
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackerEvent {
    /// Gesture phase
    pub state: TrackerState,
    /// Pointer position in NDC (`x` left to right, `y` bottom to top)
    pub device_position: Vec2,
    /// Pointer position in pixels from the top-left corner
    pub pixel_position: Vec2,
}

impl TrackerEvent {
    /// Create an event
    pub fn new(state: TrackerState, device_position: Vec2, pixel_position: Vec2) -> Self {
        Self {
            state,
            device_position,
            pixel_position,
        }
    }
}

/// Pointer state for picking and drags
#[derive(Debug, Clone, PartialEq)]
pub struct PointerState {
    /// Current screen-space X position (pixels)
    pub screen_x: Real,
    /// Current screen-space Y position (pixels)
    pub screen_y: Real,
    /// Viewport width in pixels
    pub viewport_width: u32,
    /// Viewport height in pixels
    pub viewport_height: u32,
    /// Drag start position (None if not dragging)
    pub drag_start: Option<(Real, Real)>,
    /// Whether the button is currently held down
    pub button_down: bool,
}

impl PointerState {
    /// Pixels of travel before a press becomes a drag
    pub const DRAG_THRESHOLD: Real = 5.0;

    /// Create a pointer state at the top-left corner
    pub fn new(viewport_width: u32, viewport_height: u32) -> Self {
        Self {
            screen_x: 0.0,
            screen_y: 0.0,
            viewport_width,
            viewport_height,
            drag_start: None,
            button_down: false,
        }
    }

    /// Builder pattern: set the position
    pub fn at(mut self, x: Real, y: Real) -> Self {
        self.update_position(x, y);
        self
    }

    /// Convert screen coordinates to NDC.
    ///
    /// X runs -1 (left) to +1 (right); Y runs -1 (bottom) to +1 (top).
    pub fn screen_to_ndc(&self) -> Vec2 {
        let width = Real::from(self.viewport_width.max(1));
        let height = Real::from(self.viewport_height.max(1));
        Vec2::new(self.screen_x / width * 2.0 - 1.0, 1.0 - self.screen_y / height * 2.0)
    }

    /// Position in pixels
    pub fn pixel_position(&self) -> Vec2 {
        Vec2::new(self.screen_x, self.screen_y)
    }

    /// Update pointer position (pixels from the top-left corner)
    pub fn update_position(&mut self, x: Real, y: Real) {
        self.screen_x = x;
        self.screen_y = y;
    }

    /// Update viewport size (for NDC conversion)
    pub fn update_viewport(&mut self, width: u32, height: u32) {
        self.viewport_width = width;
        self.viewport_height = height;
    }

    /// Start a drag at the current position
    pub fn start_drag(&mut self) {
        self.drag_start = Some((self.screen_x, self.screen_y));
        self.button_down = true;
    }

    /// End the drag
    pub fn end_drag(&mut self) {
        self.drag_start = None;
        self.button_down = false;
    }

    /// Whether the pointer travelled past the drag threshold with the button held
    pub fn is_dragging(&self) -> bool {
        match self.drag_start {
            Some((start_x, start_y)) if self.button_down => {
                let dx = self.screen_x - start_x;
                let dy = self.screen_y - start_y;
                dx.hypot(dy) >= Self::DRAG_THRESHOLD
            }
            _ => false,
        }
    }

    /// Snapshot as a tracker event
    pub fn event(&self, state: TrackerState) -> TrackerEvent {
        TrackerEvent::new(state, self.screen_to_ndc(), self.pixel_position())
    }
}

impl Default for PointerState {
    fn default() -> Self {
        Self::new(1920, 1080)
    }
}
