/// TileGrid: the live tile-code array of one level.
///
/// ## Layers
///
///   - `cells`   — raw codes, file order (row 0 = top line of the file).
///                 After load only `EMPTY` / `SOLID` remain; hazards write
///                 `SOLID` into cells they claim and `EMPTY` on release.
///   - `spawns`  — hazard spawn descriptors lifted out at load time.
///                 Never mutated afterwards; `find_block` reads these,
///                 not live entity state.
///   - `start`, `goal` — consumed markers.
///
/// ## Boundary policy
///
///   Left, top and bottom edges are solid. The right edge is solid too,
///   except inside the level's exit lanes (Y bands taken from level
///   metadata) where probes beyond the last column read as open so the
///   player can walk out to the next level.
///
/// Rows may be ragged. A missing cell inside the level bounds reads as
/// open for collision and as `-1` through `grid_value`.

use tracing::warn;

use super::physics::{cell_index, Aabb, Vec2};
use super::tile::{HazardKind, Tile, EMPTY, SOLID, TILE_SIZE};

/// A valid (column, array-row) pair inside the level rectangle.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct GridCoord {
    pub col: usize,
    pub row: usize,
}

/// A hazard spawn captured at load time.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct SpawnDescriptor {
    pub kind: HazardKind,
    pub coord: GridCoord,
    /// World-space centre of the spawn cell.
    pub position: Vec2,
}

/// Open Y interval beyond the right edge where the wall is absent.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct ExitLane {
    pub min_y: f32,
    pub max_y: f32,
}

impl ExitLane {
    pub fn above(y: f32) -> Self {
        ExitLane { min_y: y, max_y: f32::INFINITY }
    }

    pub fn below(y: f32) -> Self {
        ExitLane { min_y: f32::NEG_INFINITY, max_y: y }
    }

    pub fn band(min_y: f32, max_y: f32) -> Self {
        ExitLane { min_y, max_y }
    }

    pub fn contains(&self, y: f32) -> bool {
        y > self.min_y && y < self.max_y
    }
}

#[derive(Clone, Debug)]
pub struct TileGrid {
    cells: Vec<Vec<i32>>,
    width: usize,
    start: Option<Vec2>,
    goal: Option<Vec2>,
    spawns: Vec<SpawnDescriptor>,
    exit_lanes: Vec<ExitLane>,
}

// ── Construction ──

impl TileGrid {
    /// Build the live grid from parsed rows (top row first).
    /// Start, goal and hazard codes are lifted out and their cells zeroed.
    pub fn from_codes(mut cells: Vec<Vec<i32>>, exit_lanes: Vec<ExitLane>) -> Self {
        let height = cells.len();
        let width = cells.iter().map(|r| r.len()).max().unwrap_or(0);
        let mut start = None;
        let mut goal = None;
        let mut spawns = Vec::new();

        for (row, line) in cells.iter_mut().enumerate() {
            for (col, code) in line.iter_mut().enumerate() {
                let coord = GridCoord { col, row };
                let center = center_of(coord, height);
                match Tile::from_code(*code) {
                    Some(t) if t.is_static() => continue,
                    Some(Tile::Start) => {
                        if start.is_some() {
                            warn!(col, row, "duplicate start marker ignored");
                        } else {
                            start = Some(center);
                        }
                    }
                    Some(Tile::Goal) => {
                        if goal.is_some() {
                            warn!(col, row, "duplicate goal marker ignored");
                        } else {
                            goal = Some(center);
                        }
                    }
                    Some(Tile::Hazard(kind)) => {
                        spawns.push(SpawnDescriptor { kind, coord, position: center });
                    }
                    Some(_) => {}
                    None => warn!(col, row, code = *code, "unknown tile code treated as empty"),
                }
                *code = EMPTY;
            }
        }

        TileGrid { cells, width, start, goal, spawns, exit_lanes }
    }

    /// A grid with no cells (before the first level loads).
    pub fn empty() -> Self {
        TileGrid::from_codes(vec![], vec![])
    }
}

// ── Dimensions & markers ──

impl TileGrid {
    pub fn cols(&self) -> usize {
        self.width
    }

    pub fn rows(&self) -> usize {
        self.cells.len()
    }

    pub fn world_width(&self) -> f32 {
        self.width as f32 * TILE_SIZE
    }

    pub fn world_height(&self) -> f32 {
        self.cells.len() as f32 * TILE_SIZE
    }

    pub fn start(&self) -> Option<Vec2> {
        self.start
    }

    pub fn goal(&self) -> Option<Vec2> {
        self.goal
    }

    pub fn has_goal(&self) -> bool {
        self.goal.is_some()
    }

    pub fn spawn_descriptors(&self) -> &[SpawnDescriptor] {
        &self.spawns
    }

    pub fn exit_lanes(&self) -> &[ExitLane] {
        &self.exit_lanes
    }

    /// First spawn descriptor of the given kind, from load-time data.
    pub fn find_block(&self, kind: HazardKind) -> Option<&SpawnDescriptor> {
        self.spawns.iter().find(|d| d.kind == kind)
    }
}

// ── Coordinate mapping ──

impl TileGrid {
    /// Grid cell containing a world position, or `None` outside the level.
    pub fn grid_coordinates(&self, pos: Vec2) -> Option<GridCoord> {
        let col = cell_index(pos.x);
        let from_bottom = cell_index(pos.y);
        let rows = self.rows() as i32;
        if col < 0 || col >= self.width as i32 || from_bottom < 0 || from_bottom >= rows {
            return None;
        }
        Some(GridCoord { col: col as usize, row: (rows - 1 - from_bottom) as usize })
    }

    /// World-space centre of a cell.
    pub fn cell_center(&self, coord: GridCoord) -> Vec2 {
        center_of(coord, self.rows())
    }
}

fn center_of(coord: GridCoord, rows: usize) -> Vec2 {
    let half = TILE_SIZE / 2.0;
    let from_bottom = rows as i32 - 1 - coord.row as i32;
    Vec2::new(coord.col as f32 * TILE_SIZE + half, from_bottom as f32 * TILE_SIZE + half)
}

// ── Cell read / write ──

impl TileGrid {
    /// Raw value at (col, row), or -1 when out of range (including the
    /// missing tail of a short row).
    pub fn grid_value(&self, col: i32, row: i32) -> i32 {
        if col < 0 || row < 0 {
            return -1;
        }
        self.cells
            .get(row as usize)
            .and_then(|r| r.get(col as usize))
            .copied()
            .unwrap_or(-1)
    }

    pub fn value_at(&self, coord: GridCoord) -> i32 {
        self.grid_value(coord.col as i32, coord.row as i32)
    }

    /// Bounds-checked write; out-of-range writes are ignored.
    pub fn set_grid_cell(&mut self, col: i32, row: i32, value: i32) {
        if col < 0 || row < 0 {
            return;
        }
        if let Some(cell) = self.cells.get_mut(row as usize).and_then(|r| r.get_mut(col as usize)) {
            *cell = value;
        }
    }

    /// Mark the cell under `pos` as a platform. Only an empty cell can be
    /// claimed, so no cell is ever held by two owners at once.
    pub fn claim_cell(&mut self, pos: Vec2) -> Option<GridCoord> {
        let coord = self.grid_coordinates(pos)?;
        if self.value_at(coord) != EMPTY {
            return None;
        }
        self.set_grid_cell(coord.col as i32, coord.row as i32, SOLID);
        Some(coord)
    }

    /// Give a claimed cell back.
    pub fn release_cell(&mut self, coord: GridCoord) {
        if self.value_at(coord) == SOLID {
            self.set_grid_cell(coord.col as i32, coord.row as i32, EMPTY);
        }
    }
}

// ── Collision queries ──

impl TileGrid {
    /// Is the world point inside solid geometry? See the boundary policy above.
    pub fn check_collision(&self, pos: Vec2) -> bool {
        if self.cells.is_empty() {
            return false;
        }
        let col = cell_index(pos.x);
        let from_bottom = cell_index(pos.y);
        let rows = self.rows() as i32;

        if col < 0 || from_bottom < 0 || from_bottom >= rows {
            return true;
        }
        if col >= self.width as i32 {
            return !self.in_exit_lane(pos.y);
        }
        self.grid_value(col, rows - 1 - from_bottom) == SOLID
    }

    pub fn in_exit_lane(&self, y: f32) -> bool {
        self.exit_lanes.iter().any(|lane| lane.contains(y))
    }

    /// Does a box of half-extent `half` at `pos` overlap the goal tile?
    pub fn check_goal_collision(&self, pos: Vec2, half: f32) -> bool {
        match self.goal {
            Some(goal) => Aabb::from_center(goal, TILE_SIZE / 2.0).overlaps(&Aabb::from_center(pos, half)),
            None => false,
        }
    }
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Build a grid from CSV-ish rows, top row first.
    pub(crate) fn grid_from(rows: &[&str]) -> TileGrid {
        grid_with_lanes(rows, vec![])
    }

    pub(crate) fn grid_with_lanes(rows: &[&str], lanes: Vec<ExitLane>) -> TileGrid {
        let cells = rows
            .iter()
            .map(|r| {
                r.split(',')
                    .filter(|c| !c.trim().is_empty())
                    .map(|c| c.trim().parse::<i32>().unwrap())
                    .collect()
            })
            .collect();
        TileGrid::from_codes(cells, lanes)
    }

    #[test]
    fn load_lifts_markers_and_zeroes_cells() {
        let g = grid_from(&[
            "0,3,0,5",
            "2,0,9,0",
            "1,1,1,1",
        ]);
        assert_eq!(g.rows(), 3);
        assert_eq!(g.cols(), 4);
        for row in 0..2 {
            for col in 0..4 {
                assert_eq!(g.grid_value(col, row), EMPTY, "({col},{row})");
            }
        }
        assert_eq!(g.grid_value(0, 2), SOLID);
        assert_eq!(g.start(), Some(g.cell_center(GridCoord { col: 0, row: 1 })));
        assert_eq!(g.goal(), Some(g.cell_center(GridCoord { col: 3, row: 0 })));
        assert_eq!(g.spawn_descriptors().len(), 2);
        assert_eq!(g.spawn_descriptors()[0].kind, HazardKind::FallOnly);
        assert_eq!(g.spawn_descriptors()[1].kind, HazardKind::StaticHazard);
    }

    #[test]
    fn unknown_codes_become_empty() {
        let g = grid_from(&["0,42,1"]);
        assert_eq!(g.grid_value(1, 0), EMPTY);
        assert!(g.spawn_descriptors().is_empty());
    }

    #[test]
    fn find_block_returns_first_descriptor() {
        let g = grid_from(&["4,0,4", "0,10,0"]);
        let d = g.find_block(HazardKind::Spike).unwrap();
        assert_eq!(d.coord, GridCoord { col: 0, row: 0 });
        assert!(g.find_block(HazardKind::RiseThenFall).is_some());
        assert!(g.find_block(HazardKind::SideAttack).is_none());
    }

    #[test]
    fn coordinates_round_trip_for_every_cell() {
        let g = grid_from(&[
            "0,0,0,0,0,0",
            "0,0,0,0,0,0",
            "0,0,0,0,0,0",
            "1,1,1,1,1,1",
        ]);
        for row in 0..g.rows() {
            for col in 0..g.cols() {
                let c = GridCoord { col, row };
                assert_eq!(g.grid_coordinates(g.cell_center(c)), Some(c));
            }
        }
    }

    #[test]
    fn rows_are_inverted_against_world_y() {
        let g = grid_from(&["0,0", "0,0", "1,1"]);
        let bottom = g.grid_coordinates(Vec2::new(0.1, 0.1)).unwrap();
        assert_eq!(bottom.row, 2);
        let top = g.grid_coordinates(Vec2::new(0.1, 2.0)).unwrap();
        assert_eq!(top.row, 0);
        assert!(g.check_collision(Vec2::new(0.1, 0.1)));
        assert!(!g.check_collision(Vec2::new(0.1, 1.0)));
    }

    #[test]
    fn out_of_range_queries_are_sentinels() {
        let mut g = grid_from(&["0,0", "1,1"]);
        assert_eq!(g.grid_value(-1, 0), -1);
        assert_eq!(g.grid_value(2, 0), -1);
        assert_eq!(g.grid_value(0, 5), -1);
        assert_eq!(g.grid_coordinates(Vec2::new(-0.1, 0.1)), None);
        assert_eq!(g.grid_coordinates(Vec2::new(0.1, 99.0)), None);
        g.set_grid_cell(7, 7, SOLID);
        g.set_grid_cell(-1, 0, SOLID);
        assert_eq!(g.grid_value(0, 0), EMPTY);
    }

    #[test]
    fn ragged_rows_are_tolerated() {
        let mut g = grid_from(&["0,0,0,0", "1", "1,1,1,1"]);
        assert_eq!(g.cols(), 4);
        assert_eq!(g.grid_value(3, 1), -1);
        // Missing cell inside the level is open, not solid.
        let p = g.cell_center(GridCoord { col: 3, row: 1 });
        assert!(!g.check_collision(p));
        g.set_grid_cell(3, 1, SOLID);
        assert_eq!(g.grid_value(3, 1), -1);
    }

    #[test]
    fn edges_are_solid() {
        let g = grid_from(&["0,0,0", "0,0,0", "0,0,0"]);
        assert!(g.check_collision(Vec2::new(-0.01, 1.0)), "left");
        assert!(g.check_collision(Vec2::new(1.0, g.world_height() + 0.01)), "top");
        assert!(g.check_collision(Vec2::new(1.0, -0.01)), "bottom");
        assert!(g.check_collision(Vec2::new(g.world_width() + 0.01, 1.0)), "right");
        assert!(!g.check_collision(Vec2::new(1.0, 1.0)));
    }

    #[test]
    fn exit_lane_opens_right_edge_only_inside_band() {
        let g = grid_with_lanes(&["0,0,0", "0,0,0", "0,0,0"], vec![ExitLane::above(1.4)]);
        let beyond = g.world_width() + 0.05;
        assert!(!g.check_collision(Vec2::new(beyond, 1.6)));
        assert!(g.check_collision(Vec2::new(beyond, 1.0)));
        // Above the level top stays solid even inside the band.
        assert!(g.check_collision(Vec2::new(beyond, g.world_height() + 0.1)));
        // Left edge is never an exit.
        assert!(g.check_collision(Vec2::new(-0.05, 1.6)));
    }

    #[test]
    fn boundary_probe_does_not_flap() {
        // Column 2 solid, column 1 empty: x = 2 * TILE is the shared edge.
        let g = grid_from(&["0,0,1", "0,0,1"]);
        let edge = 2.0 * TILE_SIZE;
        let y = 0.3;
        let at = g.check_collision(Vec2::new(edge, y));
        for eps in [1e-6_f32, 1e-5] {
            assert_eq!(g.check_collision(Vec2::new(edge + eps, y)), at);
            assert_eq!(g.check_collision(Vec2::new(edge - eps, y)), at);
        }
        assert!(at);
        assert!(!g.check_collision(Vec2::new(edge - 0.01, y)));
    }

    #[test]
    fn claim_and_release_only_touch_empty_cells() {
        let mut g = grid_from(&["0,0", "1,1"]);
        let p = g.cell_center(GridCoord { col: 0, row: 0 });
        let c = g.claim_cell(p).unwrap();
        assert_eq!(g.value_at(c), SOLID);
        assert_eq!(g.claim_cell(p), None, "second claim must fail");
        g.release_cell(c);
        assert_eq!(g.value_at(c), EMPTY);
        // Static wall cannot be claimed.
        let wall = g.cell_center(GridCoord { col: 0, row: 1 });
        assert_eq!(g.claim_cell(wall), None);
    }

    #[test]
    fn goal_overlap_uses_one_tile_footprint() {
        let g = grid_from(&["0,5", "1,1"]);
        let goal = g.goal().unwrap();
        assert!(g.check_goal_collision(goal, 0.2));
        assert!(g.check_goal_collision(Vec2::new(goal.x - 0.5, goal.y), 0.2));
        assert!(!g.check_goal_collision(Vec2::new(goal.x - 0.6, goal.y), 0.2));
        let none = grid_from(&["0,0"]);
        assert!(!none.check_goal_collision(Vec2::new(0.3, 0.3), 0.2));
    }
}
