/// PlayerController: per-tick kinematics and grid collision for the player.
///
/// ## Tick order
///
///   1. Horizontal velocity from input (left wins over right).
///   2. Gravity, or the wall-slide clamp while airborne against a wall.
///   3. Y axis: integrate, probe the feet (falling) or head (rising) at the
///      pre-move X, snap onto / under the tile that was hit.
///   4. X axis: integrate at the resolved Y, probe near-top and near-bottom.
///      The bottom probe sits just above the feet when grounded (so the
///      floor is not mistaken for a wall) and just below them when airborne
///      (so a ledge corner cannot be tunnelled through).
///   5. Jump buffer: count down, re-arm on a fresh press.
///   6. Buffered ground jump, else wall jump away from the touched wall.
///   7. Facing.
///
/// While dead, input and collision are skipped and the body plays a
/// ballistic spinning fall until the driver resets it.

use crate::config::PlayerTuning;

use super::entity::{Facing, FrameInput, JumpKind, WallSide};
use super::grid::TileGrid;
use super::model::{Camera, DrawSink, Material, Renderable};
use super::physics::{surface_above, surface_below, Vec2, PROBE_INSET};

#[derive(Clone, Debug)]
pub struct PlayerController {
    tuning: PlayerTuning,
    pos: Vec2,
    vel: Vec2,
    grounded: bool,
    wall: WallSide,
    jump_buffer: u32,
    /// Set on the wall-jump tick: the next tick keeps the outward kick
    /// instead of taking X velocity from input.
    wall_kick: bool,
    alive: bool,
    respawn: Vec2,
    facing: Facing,
    model: Renderable,
}

impl PlayerController {
    pub fn new(tuning: PlayerTuning, spawn: Vec2) -> Self {
        let scale = tuning.half_size * 2.0;
        let mut p = PlayerController {
            tuning,
            pos: spawn,
            vel: Vec2::ZERO,
            grounded: false,
            wall: WallSide::None,
            jump_buffer: 0,
            wall_kick: false,
            alive: true,
            respawn: spawn,
            facing: Facing::Right,
            model: Renderable::new(spawn, scale),
        };
        p.set_position(spawn);
        p
    }

    // ── Queries ──

    pub fn position(&self) -> Vec2 {
        self.pos
    }

    pub fn velocity(&self) -> Vec2 {
        self.vel
    }

    pub fn half_size(&self) -> f32 {
        self.tuning.half_size
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    pub fn is_grounded(&self) -> bool {
        self.grounded
    }

    pub fn wall_side(&self) -> WallSide {
        self.wall
    }

    pub fn facing(&self) -> Facing {
        self.facing
    }

    pub fn respawn_point(&self) -> Vec2 {
        self.respawn
    }

    /// Centre beyond the right edge, inside one of the level's exit lanes.
    pub fn is_exiting(&self, grid: &TileGrid) -> bool {
        self.pos.x > grid.world_width() && grid.in_exit_lane(self.pos.y)
    }

    pub fn draw(&self, sink: &mut dyn DrawSink, camera: &Camera) {
        self.model.draw(sink, camera, Material::Player);
    }

    // ── Life cycle ──

    /// Kill the player. Returns false if it was already dead.
    pub fn die(&mut self) -> bool {
        if !self.alive {
            return false;
        }
        self.alive = false;
        self.vel = Vec2::new(0.0, self.tuning.death_bounce);
        self.grounded = false;
        self.wall = WallSide::None;
        true
    }

    /// Back to the last respawn point, alive.
    pub fn reset(&mut self) {
        self.set_position(self.respawn);
        self.alive = true;
    }

    /// Teleport and clear all motion state. The position becomes the new
    /// respawn point.
    pub fn set_position(&mut self, pos: Vec2) {
        self.pos = pos;
        self.vel = Vec2::ZERO;
        self.grounded = false;
        self.wall = WallSide::None;
        self.jump_buffer = 0;
        self.wall_kick = false;
        self.respawn = pos;
        self.model.transform.rotate_z = 0.0;
        self.sync_model();
    }

    fn sync_model(&mut self) {
        self.model.set_position(self.pos);
        self.model.transform.rotate_y = self.facing.yaw();
    }
}

// ══════════════════════════════════════════════════════════════
// Update
// ══════════════════════════════════════════════════════════════

impl PlayerController {
    /// Advance one tick. Returns the jump performed this tick, if any.
    pub fn update(&mut self, input: &FrameInput, grid: &TileGrid) -> Option<JumpKind> {
        if !self.alive {
            self.update_dead();
            return None;
        }

        let move_x = input.move_x();
        if self.wall_kick {
            self.wall_kick = false;
        } else {
            self.vel.x = move_x * self.tuning.move_speed;
        }

        let slide = self.tuning.wall_slide_speed;
        if self.wall != WallSide::None && !self.grounded && self.vel.y < -slide {
            self.vel.y = -slide;
        } else {
            self.vel.y -= self.tuning.gravity;
        }

        self.grounded = false;
        self.wall = WallSide::None;

        self.resolve_y(grid);
        self.resolve_x(grid);
        if self.wall == WallSide::None && !self.grounded {
            self.wall = self.sense_wall(grid);
        }

        let jump = self.try_jump(input, move_x);
        self.update_facing(move_x);
        self.sync_model();
        jump
    }

    fn update_dead(&mut self) {
        self.vel.y -= self.tuning.gravity;
        self.pos.x += self.vel.x;
        self.pos.y += self.vel.y;
        self.model.transform.rotate_z += self.tuning.death_spin;
        self.model.set_position(self.pos);
    }

    fn resolve_y(&mut self, grid: &TileGrid) {
        let h = self.tuning.half_size;
        let new_y = self.pos.y + self.vel.y;
        let left = self.pos.x - h;
        let right = self.pos.x + h;

        if self.vel.y < 0.0 {
            let bottom = new_y - h;
            if grid.check_collision(Vec2::new(left, bottom)) || grid.check_collision(Vec2::new(right, bottom)) {
                self.pos.y = surface_above(bottom) + h;
                self.vel.y = 0.0;
                self.grounded = true;
                return;
            }
        } else if self.vel.y > 0.0 {
            let top = new_y + h;
            if grid.check_collision(Vec2::new(left, top)) || grid.check_collision(Vec2::new(right, top)) {
                self.pos.y = surface_below(top) - h;
                self.vel.y = 0.0;
                return;
            }
        }
        self.pos.y = new_y;
    }

    fn resolve_x(&mut self, grid: &TileGrid) {
        let h = self.tuning.half_size;
        let new_x = self.pos.x + self.vel.x;
        let (top_y, bottom_y) = self.side_probe_heights();

        if self.vel.x < 0.0 {
            let left = new_x - h;
            if grid.check_collision(Vec2::new(left, top_y)) || grid.check_collision(Vec2::new(left, bottom_y)) {
                self.pos.x = surface_above(left) + h + PROBE_INSET;
                self.vel.x = 0.0;
                if !self.grounded {
                    self.wall = WallSide::Left;
                }
                return;
            }
        } else if self.vel.x > 0.0 {
            let right = new_x + h;
            if grid.check_collision(Vec2::new(right, top_y)) || grid.check_collision(Vec2::new(right, bottom_y)) {
                self.pos.x = surface_below(right) - h - PROBE_INSET;
                self.vel.x = 0.0;
                if !self.grounded {
                    self.wall = WallSide::Right;
                }
                return;
            }
        }
        self.pos.x = new_x;
    }

    /// Airborne contact with a wall the player is not pushing into.
    fn sense_wall(&self, grid: &TileGrid) -> WallSide {
        let h = self.tuning.half_size;
        let reach = PROBE_INSET * 2.0;
        let (top_y, bottom_y) = self.side_probe_heights();
        let touches = |x: f32| grid.check_collision(Vec2::new(x, top_y)) || grid.check_collision(Vec2::new(x, bottom_y));

        if touches(self.pos.x - h - reach) {
            WallSide::Left
        } else if touches(self.pos.x + h + reach) {
            WallSide::Right
        } else {
            WallSide::None
        }
    }

    fn side_probe_heights(&self) -> (f32, f32) {
        let h = self.tuning.half_size;
        let top = self.pos.y + h - PROBE_INSET;
        let bottom = if self.grounded {
            self.pos.y - h + PROBE_INSET
        } else {
            self.pos.y - h - PROBE_INSET
        };
        (top, bottom)
    }

    fn try_jump(&mut self, input: &FrameInput, move_x: f32) -> Option<JumpKind> {
        if self.jump_buffer > 0 {
            self.jump_buffer -= 1;
        }
        // The press tick itself plus `jump_buffer_ticks` ticks after it.
        if input.jump_pressed {
            self.jump_buffer = self.tuning.jump_buffer_ticks + 1;
        }
        if self.jump_buffer == 0 {
            return None;
        }

        if self.grounded {
            self.vel.y = self.tuning.jump_power;
            self.jump_buffer = 0;
            self.grounded = false;
            return Some(JumpKind::Ground);
        }

        let away = match self.wall {
            WallSide::Left if move_x >= 0.0 => Facing::Right,
            WallSide::Right if move_x <= 0.0 => Facing::Left,
            _ => return None,
        };
        let dir = if away == Facing::Right { 1.0 } else { -1.0 };
        self.vel = Vec2::new(self.tuning.wall_jump_x * dir, self.tuning.wall_jump_y);
        self.jump_buffer = 0;
        self.facing = away;
        self.wall = WallSide::None;
        self.wall_kick = true;
        Some(JumpKind::Wall)
    }

    fn update_facing(&mut self, move_x: f32) {
        if self.grounded {
            if move_x > 0.0 {
                self.facing = Facing::Right;
            } else if move_x < 0.0 {
                self.facing = Facing::Left;
            }
        } else if self.wall == WallSide::None {
            if self.vel.x > 0.01 {
                self.facing = Facing::Right;
            } else if self.vel.x < -0.01 {
                self.facing = Facing::Left;
            }
        }
    }
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════
