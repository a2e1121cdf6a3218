/// Shared geometry for the simulation — single source of truth.
///
/// ## Coordinates
///
/// World space is continuous: x grows to the right, y grows upward,
/// and (0, 0) is the bottom-left corner of the level. One tile is
/// `TILE_SIZE` units wide and tall.
///
/// ## Cell snapping
///
/// Every world → cell conversion goes through `cell_index()`. A value that
/// lies within `BOUNDARY_EPS` tiles of a tile boundary is treated as lying
/// exactly on it, and a position exactly on a boundary belongs to the cell
/// above / to the right. This keeps float error (e.g. `3.0 * 0.7`) from
/// flipping a probe between two cells from one tick to the next.
///
/// ## Overlap
///
/// Lethal contact uses strict AABB overlap: boxes that only share an edge
/// do not overlap. A player standing on a resting block touches it but is
/// never "inside" it.

use super::tile::TILE_SIZE;

/// Tolerance (in tiles) for snapping onto a tile boundary.
const BOUNDARY_EPS: f32 = 1e-4;

/// How far probes are pushed past an edge to sample the neighbouring cell.
pub const PROBE_INSET: f32 = 0.001;

#[derive(Clone, Copy, PartialEq, Debug, Default)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Vec2 { x, y }
    }

    pub fn distance(self, other: Vec2) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Axis-aligned box described by centre and half-extent.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct Aabb {
    pub left: f32,
    pub right: f32,
    pub bottom: f32,
    pub top: f32,
}

impl Aabb {
    pub fn from_center(center: Vec2, half: f32) -> Self {
        Aabb {
            left: center.x - half,
            right: center.x + half,
            bottom: center.y - half,
            top: center.y + half,
        }
    }

    /// Strict overlap: shared edges do not count.
    pub fn overlaps(&self, other: &Aabb) -> bool {
        self.left < other.right
            && self.right > other.left
            && self.bottom < other.top
            && self.top > other.bottom
    }
}

// ══════════════════════════════════════════════════════════════
// World ↔ cell helpers
// ══════════════════════════════════════════════════════════════

/// Index of the tile containing world coordinate `v` along one axis.
/// Values within `BOUNDARY_EPS` tiles of a boundary snap onto it.
#[inline]
pub fn cell_index(v: f32) -> i32 {
    let t = v / TILE_SIZE;
    let nearest = t.round();
    if (t - nearest).abs() < BOUNDARY_EPS {
        nearest as i32
    } else {
        t.floor() as i32
    }
}

/// Lower world edge of tile `index`.
#[inline]
pub fn cell_start(index: i32) -> f32 {
    index as f32 * TILE_SIZE
}

/// Top surface of the tile containing `y` (where something resting on it sits).
#[inline]
pub fn surface_above(y: f32) -> f32 {
    cell_start(cell_index(y) + 1)
}

/// Bottom surface of the tile containing `y` (where something pressed under it stops).
#[inline]
pub fn surface_below(y: f32) -> f32 {
    cell_start(cell_index(y))
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════
