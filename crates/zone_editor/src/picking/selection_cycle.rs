//! Selection cycling
//!
//! Repeated clicks at (nearly) the same pixel step through every entity
//! under the pointer instead of re-selecting the nearest one.
//!
//! ```text
//! Idle ──pick with hits──▶ Active(index 0)
//! Active ──pick within tolerance, before expiry──▶ Active(index + 1, wraps)
//! Active ──moved beyond tolerance / expired──▶ Idle ──▶ fresh pick
//! ```
//!
//! Expiry is a stored deadline checked on the next pick; nothing runs in the
//! background.

use super::PickResult;
use crate::foundation::math::{Real, Vec2};
use crate::foundation::time::Deadline;
use std::time::{Duration, Instant};

/// Cycling state
#[derive(Debug, Clone, PartialEq)]
pub enum CycleState {
    /// No cycle in progress
    Idle,
    /// Cycling through `hits`
    Active {
        /// Hits of the pick that started the cycle, nearest first
        hits: Vec<PickResult>,
        /// Currently selected hit
        index: usize,
        /// Pixel position of the pick that started the cycle
        anchor: Vec2,
        /// When the cycle lapses
        deadline: Deadline,
    },
}

/// Drives selection cycling across pick calls
#[derive(Debug, Clone)]
pub struct SelectionCycler {
    state: CycleState,
    tolerance_px: Real,
    timeout: Duration,
}

impl SelectionCycler {
    /// Create an idle cycler
    pub fn new(tolerance_px: Real, timeout: Duration) -> Self {
        Self {
            state: CycleState::Idle,
            tolerance_px,
            timeout,
        }
    }

    /// Current state
    pub fn state(&self) -> &CycleState {
        &self.state
    }

    /// Drop any cycle in progress
    pub fn reset(&mut self) {
        self.state = CycleState::Idle;
    }

    /// Handle a pick at `pixel`.
    ///
    /// Continues the active cycle when the pointer stayed within tolerance
    /// and the deadline has not passed; otherwise calls `fresh_pick` and
    /// starts over at its nearest hit. Returns the hit to select.
    pub fn advance<F>(&mut self, pixel: Vec2, now: Instant, fresh_pick: F) -> Option<PickResult>
    where
        F: FnOnce() -> Vec<PickResult>,
    {
        if let CycleState::Active {
            hits,
            index,
            anchor,
            deadline,
        } = &mut self.state
        {
            let expired = deadline.is_expired(now);
            let moved = (pixel - *anchor).norm() > self.tolerance_px;
            if !expired && !moved && !hits.is_empty() {
                *index = (*index + 1) % hits.len();
                *deadline = Deadline::after(now, self.timeout);
                log::trace!("Selection cycle advanced to {}/{}", *index + 1, hits.len());
                return hits.get(*index).cloned();
            }
            log::trace!("Selection cycle reset (expired: {}, moved: {})", expired, moved);
            self.state = CycleState::Idle;
        }

        let hits = fresh_pick();
        let first = hits.first().cloned()?;
        self.state = CycleState::Active {
            hits,
            index: 0,
            anchor: pixel,
            deadline: Deadline::after(now, self.timeout),
        };
        Some(first)
    }
}
