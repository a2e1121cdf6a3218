/// HazardEntity: the seven block hazards.
///
/// Every kind shares one state machine; the kind only decides which
/// trigger is armed and where a block may come to rest.
///
/// ```text
///   Idle ──trigger──▶ Falling ──ground──▶ Landed(Floor)
///     │                  ▲                   │ Spike: player on top
///     │                  │                   ▼
///     ├──trigger──▶ Rising ──obstruction──▶ Landed(Ceiling)
///     │                  RiseThenFall: player below ─┘ (back to Falling)
///     └──trigger──▶ MovingSide ──contact──▶ Spent
/// ```
///
/// ## Grid claims
///
/// A block at rest (Idle or Landed) claims its cell in the grid so the
/// player can stand on it. A claim only succeeds on an empty cell, so two
/// blocks never own the same cell. Every transition out of a resting
/// state releases the claim before the block moves. Claims and releases
/// are visible immediately to entities updated later in the same tick.
///
/// ## Lethality
///
/// Falling, Rising and MovingSide kill on strict overlap. StaticHazard
/// kills every tick and never moves. Resting blocks are safe.

use crate::config::HazardTuning;

use super::grid::{GridCoord, SpawnDescriptor, TileGrid};
use super::model::{Camera, DrawSink, Material, Renderable};
use super::physics::{surface_above, surface_below, Aabb, Vec2, PROBE_INSET};
use super::player::PlayerController;
use super::tile::{HazardKind, TILE_SIZE};

const HALF: f32 = TILE_SIZE / 2.0;

/// Which face of the world a landed block is pressed against.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Resting {
    Floor,
    Ceiling,
}

#[derive(Clone, Copy, PartialEq, Debug)]
pub enum HazardState {
    Idle { claim: Option<GridCoord> },
    Falling,
    Landed { claim: Option<GridCoord>, resting: Resting },
    Rising,
    /// `dir` is ±1, fixed when the charge starts.
    MovingSide { dir: f32 },
    /// Out of play until the next reset.
    Spent,
}

/// State change reported back to the driver.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum HazardTransition {
    Triggered,
    Landed,
    Despawned,
}

/// What happened during one `update`.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct HazardTick {
    pub transition: Option<HazardTransition>,
    pub killed: bool,
}

#[derive(Clone, Debug)]
pub struct HazardEntity {
    kind: HazardKind,
    spawn: Vec2,
    tuning: HazardTuning,
    state: HazardState,
    model: Renderable,
}

impl HazardEntity {
    pub fn new(kind: HazardKind, spawn: Vec2, tuning: HazardTuning) -> Self {
        HazardEntity {
            kind,
            spawn,
            tuning,
            state: HazardState::Idle { claim: None },
            model: Renderable::new(spawn, TILE_SIZE),
        }
    }

    pub fn from_descriptor(desc: &SpawnDescriptor, tuning: HazardTuning) -> Self {
        HazardEntity::new(desc.kind, desc.position, tuning)
    }

    pub fn kind(&self) -> HazardKind {
        self.kind
    }

    pub fn state(&self) -> HazardState {
        self.state
    }

    pub fn position(&self) -> Vec2 {
        self.model.position()
    }

    pub fn spawn(&self) -> Vec2 {
        self.spawn
    }

    pub fn is_visible(&self) -> bool {
        self.model.visible
    }

    /// Cell currently held as a platform, if any.
    pub fn claimed_cell(&self) -> Option<GridCoord> {
        match self.state {
            HazardState::Idle { claim } | HazardState::Landed { claim, .. } => claim,
            _ => None,
        }
    }

    /// Charge direction while moving sideways.
    pub fn move_dir(&self) -> Option<f32> {
        match self.state {
            HazardState::MovingSide { dir } => Some(dir),
            _ => None,
        }
    }

    pub fn is_lethal(&self) -> bool {
        self.kind == HazardKind::StaticHazard
            || matches!(self.state, HazardState::Falling | HazardState::Rising | HazardState::MovingSide { .. })
    }

    pub fn draw(&self, sink: &mut dyn DrawSink, camera: &Camera) {
        self.model.draw(sink, camera, Material::Hazard(self.kind));
    }

    /// Release any claim and go back to the spawn cell, idle and visible.
    /// The spawn cell is re-claimed by `claim_spawn` or the next update.
    pub fn reset(&mut self, grid: &mut TileGrid) {
        if let Some(cell) = self.claimed_cell() {
            grid.release_cell(cell);
        }
        self.state = HazardState::Idle { claim: None };
        self.model.set_position(self.spawn);
        self.model.visible = true;
    }

    /// Make an idle block standable right away (level start / after reset).
    pub fn claim_spawn(&mut self, grid: &mut TileGrid) {
        if let HazardState::Idle { claim: None } = self.state {
            if self.kind.is_platform() {
                self.state = HazardState::Idle { claim: grid.claim_cell(self.position()) };
            }
        }
    }
}

// ══════════════════════════════════════════════════════════════
// Update
// ══════════════════════════════════════════════════════════════

impl HazardEntity {
    pub fn update(&mut self, player: &mut PlayerController, grid: &mut TileGrid) -> HazardTick {
        let mut tick = HazardTick::default();

        if self.kind == HazardKind::StaticHazard {
            tick.killed = self.strike(player);
            return tick;
        }

        match self.state {
            HazardState::Idle { claim } => {
                if !player.is_alive() {
                    return tick;
                }
                let claim = claim.or_else(|| grid.claim_cell(self.position()));
                self.state = HazardState::Idle { claim };
                if let Some(next) = self.idle_trigger(player) {
                    self.leave_rest(claim, next, grid);
                    tick.transition = Some(HazardTransition::Triggered);
                }
            }
            HazardState::Landed { claim, resting } => {
                if !player.is_alive() {
                    return tick;
                }
                if let Some(next) = self.landed_trigger(player, resting) {
                    self.leave_rest(claim, next, grid);
                    tick.transition = Some(HazardTransition::Triggered);
                }
            }
            HazardState::Falling => {
                let mut pos = self.position();
                pos.y -= self.tuning.fall_speed;
                self.model.set_position(pos);
                tick.killed = self.strike(player);

                let foot = Vec2::new(pos.x, pos.y - HALF - PROBE_INSET);
                if grid.check_collision(foot) {
                    pos.y = surface_above(foot.y) + HALF;
                    self.come_to_rest(pos, Resting::Floor, grid);
                    tick.transition = Some(HazardTransition::Landed);
                }
            }
            HazardState::Rising => {
                let mut pos = self.position();
                pos.y += self.tuning.rise_speed;
                self.model.set_position(pos);
                tick.killed = self.strike(player);

                // Above the level top also reads as solid.
                let head = pos.y + HALF;
                if grid.check_collision(Vec2::new(pos.x, head)) {
                    pos.y = surface_below(head) - HALF;
                    self.come_to_rest(pos, Resting::Ceiling, grid);
                    tick.transition = Some(HazardTransition::Landed);
                }
            }
            HazardState::MovingSide { dir } => {
                let mut pos = self.position();
                pos.x += dir * self.tuning.side_speed;
                self.model.set_position(pos);
                tick.killed = self.strike(player);

                let front = Vec2::new(pos.x + dir * (HALF + PROBE_INSET), pos.y);
                let gone = pos.x < -HALF || pos.x > grid.world_width() + HALF;
                if gone || grid.check_collision(front) {
                    self.state = HazardState::Spent;
                    self.model.visible = false;
                    tick.transition = Some(HazardTransition::Despawned);
                }
            }
            HazardState::Spent => {}
        }
        tick
    }

    fn idle_trigger(&self, player: &PlayerController) -> Option<HazardState> {
        let (dx, dy) = self.offset_to(player);
        match self.kind {
            HazardKind::FallOnly | HazardKind::Spike if self.player_below(dx, dy) => Some(HazardState::Falling),
            HazardKind::FallOnTop if self.player_on_top(dx, dy) => Some(HazardState::Falling),
            HazardKind::RiseOnTop | HazardKind::RiseThenFall if self.player_on_top(dx, dy) => Some(HazardState::Rising),
            HazardKind::SideAttack if player.position().distance(self.position()) <= self.tuning.side_trigger_radius => {
                let dir = if dx >= 0.0 { 1.0 } else { -1.0 };
                Some(HazardState::MovingSide { dir })
            }
            _ => None,
        }
    }

    fn landed_trigger(&self, player: &PlayerController, resting: Resting) -> Option<HazardState> {
        let (dx, dy) = self.offset_to(player);
        match (self.kind, resting) {
            (HazardKind::Spike, Resting::Floor) if self.player_on_top(dx, dy) => Some(HazardState::Rising),
            (HazardKind::RiseThenFall, Resting::Ceiling) if self.player_below(dx, dy) => Some(HazardState::Falling),
            _ => None,
        }
    }

    fn offset_to(&self, player: &PlayerController) -> (f32, f32) {
        let p = player.position();
        let s = self.position();
        (p.x - s.x, p.y - s.y)
    }

    fn player_below(&self, dx: f32, dy: f32) -> bool {
        dx.abs() < HALF * 0.5 && dy < 0.0 && -dy <= self.tuning.search_range
    }

    fn player_on_top(&self, dx: f32, dy: f32) -> bool {
        dx.abs() < HALF && dy > 0.0 && dy <= self.tuning.on_top_range
    }

    fn leave_rest(&mut self, claim: Option<GridCoord>, next: HazardState, grid: &mut TileGrid) {
        if let Some(cell) = claim {
            grid.release_cell(cell);
        }
        self.state = next;
    }

    fn come_to_rest(&mut self, pos: Vec2, resting: Resting, grid: &mut TileGrid) {
        self.model.set_position(pos);
        let claim = grid.claim_cell(pos);
        self.state = HazardState::Landed { claim, resting };
    }

    /// Kill the player on overlap while lethal. True if this call killed.
    fn strike(&self, player: &mut PlayerController) -> bool {
        if !self.is_lethal() || !player.is_alive() {
            return false;
        }
        let me = Aabb::from_center(self.position(), HALF);
        let them = Aabb::from_center(player.position(), player.half_size());
        me.overlaps(&them) && player.die()
    }
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════
