//! Layout allocation for newly materialized nodes.
//!
//! Two placements: `FanOut` spreads a folder's revealed children on an arc
//! around it, `Grid` lays out the bulk root set of a fresh analysis. Both
//! are pure: same input, bit-identical output.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::model::Position;

// ============================================================================
// Fan-out
// ============================================================================

/// Arc placement around a parent.
///
/// radius = `max(min_radius, n * radius_per_child)`; children sit at
/// `start + i * span / max(1, n - 1)`, odd indices pushed down by
/// `odd_jitter` to stagger labels. A single child lands on `start`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FanOut {
    pub min_radius: f64,
    pub radius_per_child: f64,
    /// Angular span in radians.
    pub span: f64,
    /// Start angle in radians.
    pub start: f64,
    pub odd_jitter: f64,
}

impl Default for FanOut {
    fn default() -> Self {
        Self {
            min_radius: 300.0,
            radius_per_child: 30.0,
            span: PI * 1.5,
            start: -PI / 4.0,
            odd_jitter: 50.0,
        }
    }
}

impl FanOut {
    pub fn radius(&self, count: usize) -> f64 {
        self.min_radius.max(count as f64 * self.radius_per_child)
    }

    pub fn angle(&self, index: usize, count: usize) -> f64 {
        let step = self.span / count.saturating_sub(1).max(1) as f64;
        self.start + index as f64 * step
    }

    /// Positions for `count` siblings around `parent`, in sibling order.
    pub fn place(&self, parent: Position, count: usize) -> Vec<Position> {
        let radius = self.radius(count);
        (0..count)
            .map(|i| {
                let angle = self.angle(i, count);
                let jitter = (i % 2) as f64 * self.odd_jitter;
                Position::new(
                    parent.x + radius * angle.cos(),
                    parent.y + radius * angle.sin() + jitter,
                )
            })
            .collect()
    }
}

/// `FanOut::default().place(parent, count)`.
pub fn fan_out(parent: Position, count: usize) -> Vec<Position> {
    FanOut::default().place(parent, count)
}

// ============================================================================
// Grid
// ============================================================================

/// Row-major grid for the initial root set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Grid {
    pub columns: usize,
    pub cell_width: f64,
    pub cell_height: f64,
    pub origin: Position,
}

impl Default for Grid {
    fn default() -> Self {
        Self {
            columns: 4,
            cell_width: 400.0,
            cell_height: 300.0,
            origin: Position::new(50.0, 50.0),
        }
    }
}

impl Grid {
    pub fn place(&self, index: usize) -> Position {
        let columns = self.columns.max(1);
        let col = index % columns;
        let row = index / columns;
        Position::new(
            col as f64 * self.cell_width + self.origin.x,
            row as f64 * self.cell_height + self.origin.y,
        )
    }
}
