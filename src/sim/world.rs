/// WorldState: the complete snapshot of a running game.
///
/// ## Level arena
///
/// Everything that belongs to one level (the live grid, its hazards and
/// its traps) lives in a `LevelArena`. The arena is built by
/// `sim::level::build_arena` and replaced wholesale on level change;
/// nothing outside it holds a reference into it.
///
/// The player controller lives outside the arena: it survives level
/// changes and is only repositioned.
///
/// ## Camera / Viewport
///
/// World coordinates and screen coordinates are separate:
///   - `camera` — viewport into the level in whole tiles
///   - Renderer maps: `screen(sx, sy) = grid(camera.x + sx, camera.y + sy)`
///   - Camera follows the player with a dead-zone approach
///   - Levels smaller than the viewport are centered

use crate::config::{GameConfig, GeneralConfig};
use crate::domain::grid::TileGrid;
use crate::domain::hazard::HazardEntity;
use crate::domain::model::{Camera, DrawSink, Material, Renderable};
use crate::domain::physics::{cell_index, Vec2};
use crate::domain::player::PlayerController;
use crate::domain::tile::TILE_SIZE;
use crate::domain::trap::AmbushTrap;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Phase {
    LevelIntro,
    Playing,
    Dying,
    LevelOutro,
    GameComplete,
}

/// Per-level entities. Update order inside a tick is index order.
#[derive(Clone, Debug)]
pub struct LevelArena {
    pub grid: TileGrid,
    pub hazards: Vec<HazardEntity>,
    pub traps: Vec<AmbushTrap>,
    /// Drawable for the goal tile, if the level has one.
    goal: Option<Renderable>,
}

impl LevelArena {
    pub fn new(grid: TileGrid, hazards: Vec<HazardEntity>, traps: Vec<AmbushTrap>) -> Self {
        let goal = grid.goal().map(|pos| Renderable::new(pos, TILE_SIZE));
        LevelArena { grid, hazards, traps, goal }
    }

    pub fn empty() -> Self {
        LevelArena::new(TileGrid::empty(), vec![], vec![])
    }

    /// Submit the goal, traps, hazards (in that order) to a sink.
    pub fn draw(&self, sink: &mut dyn DrawSink, camera: &Camera) {
        if let Some(goal) = &self.goal {
            goal.draw(sink, camera, Material::Goal);
        }
        for trap in &self.traps {
            trap.draw(sink, camera);
        }
        for hazard in &self.hazards {
            hazard.draw(sink, camera);
        }
    }

    /// Put every entity back where the level started it.
    /// All claims are released before any spawn cell is re-claimed, so a
    /// block resting in another block's spawn cell cannot clobber it.
    pub fn reset_entities(&mut self) {
        for h in &mut self.hazards {
            h.reset(&mut self.grid);
        }
        for h in &mut self.hazards {
            h.claim_spawn(&mut self.grid);
        }
        for t in &mut self.traps {
            t.reset();
        }
    }
}

pub struct WorldState {
    // ── Level ──
    pub arena: LevelArena,
    pub player: PlayerController,

    // ── Timing ──
    pub timing: GeneralConfig,

    // ── Meta ──
    pub phase: Phase,
    pub current_level: usize,
    pub total_levels: usize,
    pub level_name: String,
    pub tick: u64,
    pub deaths: u32,

    // ── UI ──
    pub message: String,
    pub message_timer: u32,

    // ── Animation ──
    pub anim_tick: u32,

    // ── Pause ──
    pub paused: bool,

    // ── Camera / Viewport ──
    pub camera: Camera,
}

// ── Construction ──

impl WorldState {
    pub fn new(config: &GameConfig) -> Self {
        WorldState {
            arena: LevelArena::empty(),
            player: PlayerController::new(config.player.clone(), Vec2::ZERO),
            timing: config.general.clone(),
            phase: Phase::LevelIntro,
            current_level: 0,
            total_levels: 0,
            level_name: String::new(),
            tick: 0,
            deaths: 0,
            message: String::new(),
            message_timer: 0,
            anim_tick: 0,
            paused: false,
            camera: Camera::new(),
        }
    }

    pub fn set_message(&mut self, msg: &str, duration: u32) {
        self.message = msg.to_string();
        self.message_timer = duration;
    }

    pub fn tick_message(&mut self) {
        if self.message_timer > 0 {
            self.message_timer -= 1;
            if self.message_timer == 0 {
                self.message.clear();
            }
        }
    }
}

// ── Camera helpers ──

impl WorldState {
    /// Grid (col, row) under a world position; may lie outside the level.
    pub fn cell_of(&self, pos: Vec2) -> (i32, i32) {
        let rows = self.arena.grid.rows() as i32;
        (cell_index(pos.x), rows - 1 - cell_index(pos.y))
    }

    pub fn follow_player(&mut self) {
        let (col, row) = self.cell_of(self.player.position());
        let (w, h) = (self.arena.grid.cols(), self.arena.grid.rows());
        self.camera.follow(col, row, w, h);
    }

    pub fn center_camera(&mut self) {
        let (col, row) = self.cell_of(self.player.position());
        let (w, h) = (self.arena.grid.cols(), self.arena.grid.rows());
        self.camera.center_on(col, row, w, h);
    }
}
