/// AmbushTrap: a wall that charges in from off-screen once per level.
///
/// ```text
///   Idle ──player enters band──▶ Attacking ──at target──▶ Waiting
///                                                          │ timer
///   Finished ◀──back at spawn── Returning ◀────────────────┘
/// ```
///
/// The trigger is edge-detected: it fires on the tick the player's Y
/// enters a one-tile band around `trigger_y`, never while the player just
/// stays inside it. Attacking and Waiting are lethal, and a kill does not
/// interrupt the charge. Finished is terminal until `reset`.

use crate::config::TrapTuning;

use super::grid::TileGrid;
use super::model::{Camera, DrawSink, Material, Renderable};
use super::physics::{Aabb, Vec2};
use super::player::PlayerController;
use super::tile::TILE_SIZE;

const HALF: f32 = TILE_SIZE / 2.0;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum AttackSide {
    FromLeft,
    FromRight,
}

impl AttackSide {
    fn dir(self) -> f32 {
        match self {
            AttackSide::FromLeft => 1.0,
            AttackSide::FromRight => -1.0,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Debug)]
pub enum TrapState {
    Idle,
    Attacking { target_x: f32, return_x: f32 },
    Waiting { ticks_left: u32, return_x: f32 },
    Returning { return_x: f32 },
    Finished,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TrapTransition {
    Fired,
    Finished,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct TrapTick {
    pub transition: Option<TrapTransition>,
    pub killed: bool,
}

#[derive(Clone, Debug)]
pub struct AmbushTrap {
    side: AttackSide,
    trigger_y: f32,
    stop_margin: f32,
    spawn_x: f32,
    tuning: TrapTuning,
    state: TrapState,
    /// Player was inside the trigger band on the last live tick.
    in_zone: bool,
    model: Renderable,
}

impl AmbushTrap {
    /// `map_width` is the level width in world units; the trap waits
    /// `offscreen_tiles` beyond the edge it attacks from.
    pub fn new(side: AttackSide, trigger_y: f32, stop_margin: f32, map_width: f32, tuning: TrapTuning) -> Self {
        let offscreen = TILE_SIZE * tuning.offscreen_tiles;
        let spawn_x = match side {
            AttackSide::FromLeft => -offscreen,
            AttackSide::FromRight => map_width + offscreen,
        };
        let mut trap = AmbushTrap {
            side,
            trigger_y,
            stop_margin,
            spawn_x,
            tuning,
            state: TrapState::Idle,
            in_zone: false,
            model: Renderable::new(Vec2::new(spawn_x, trigger_y), TILE_SIZE),
        };
        trap.reset();
        trap
    }

    pub fn state(&self) -> TrapState {
        self.state
    }

    pub fn side(&self) -> AttackSide {
        self.side
    }

    pub fn trigger_y(&self) -> f32 {
        self.trigger_y
    }

    pub fn position(&self) -> Vec2 {
        self.model.position()
    }

    pub fn is_visible(&self) -> bool {
        self.model.visible
    }

    pub fn is_lethal(&self) -> bool {
        matches!(self.state, TrapState::Attacking { .. } | TrapState::Waiting { .. })
    }

    pub fn draw(&self, sink: &mut dyn DrawSink, camera: &Camera) {
        self.model.draw(sink, camera, Material::Trap);
    }

    /// Back to Idle at the off-screen spawn. The only way out of Finished.
    pub fn reset(&mut self) {
        self.state = TrapState::Idle;
        self.in_zone = false;
        self.model.set_position(Vec2::new(self.spawn_x, self.trigger_y));
        self.model.visible = false;
    }
}

// ══════════════════════════════════════════════════════════════
// Update
// ══════════════════════════════════════════════════════════════

impl AmbushTrap {
    pub fn update(&mut self, player: &mut PlayerController, grid: &TileGrid) -> TrapTick {
        let mut tick = TrapTick::default();
        if self.state == TrapState::Finished {
            return tick;
        }

        let entered = if player.is_alive() {
            let was = self.in_zone;
            self.in_zone = (player.position().y - self.trigger_y).abs() < TILE_SIZE * 0.5;
            self.in_zone && !was
        } else {
            false
        };

        let dir = self.side.dir();
        let speed = self.tuning.speed;

        match self.state {
            TrapState::Idle => {
                if entered {
                    let target_x = self.target_for(player, grid.world_width());
                    self.state = TrapState::Attacking { target_x, return_x: self.spawn_x };
                    self.model.set_position(Vec2::new(self.spawn_x, self.trigger_y));
                    self.model.visible = true;
                    tick.transition = Some(TrapTransition::Fired);
                }
            }
            TrapState::Attacking { target_x, return_x } => {
                let mut x = self.position().x + dir * speed;
                if (x - target_x) * dir >= 0.0 {
                    x = target_x;
                    self.state = TrapState::Waiting { ticks_left: self.tuning.wait_ticks, return_x };
                }
                self.model.set_position(Vec2::new(x, self.trigger_y));
                tick.killed = self.strike(player);
            }
            TrapState::Waiting { ticks_left, return_x } => {
                tick.killed = self.strike(player);
                let ticks_left = ticks_left.saturating_sub(1);
                self.state = if ticks_left == 0 {
                    TrapState::Returning { return_x }
                } else {
                    TrapState::Waiting { ticks_left, return_x }
                };
            }
            TrapState::Returning { return_x } => {
                let mut x = self.position().x - dir * speed;
                if (x - return_x) * dir <= 0.0 {
                    x = return_x;
                    self.state = TrapState::Finished;
                    self.model.visible = false;
                    tick.transition = Some(TrapTransition::Finished);
                }
                self.model.set_position(Vec2::new(x, self.trigger_y));
            }
            TrapState::Finished => {}
        }
        tick
    }

    /// Where the charge stops. Small margins give a fixed "peek" out of the
    /// wall; larger ones stop short of the player. Never past the far edge.
    fn target_for(&self, player: &PlayerController, map_width: f32) -> f32 {
        let peek = self.stop_margin < TILE_SIZE * 0.8;
        let px = player.position().x;
        let reach = self.stop_margin + player.half_size();
        let target = match (self.side, peek) {
            (AttackSide::FromLeft, true) => HALF + self.stop_margin,
            (AttackSide::FromLeft, false) => px - reach,
            (AttackSide::FromRight, true) => map_width - HALF - self.stop_margin,
            (AttackSide::FromRight, false) => px + reach,
        };
        target.clamp(HALF, (map_width - HALF).max(HALF))
    }

    fn strike(&self, player: &mut PlayerController) -> bool {
        if !player.is_alive() {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PlayerTuning;
    use crate::domain::grid::tests::grid_from;

    /// 20 x 6 room, floor on the bottom row.
    fn room() -> TileGrid {
        let open = vec!["0"; 20].join(",");
        let floor = vec!["1"; 20].join(",");
        grid_from(&[&open, &open, &open, &open, &open, &floor])
    }

    const LANE_Y: f32 = 0.9;

    fn player_at(x: f32, y: f32) -> PlayerController {
        PlayerController::new(PlayerTuning::default(), Vec2::new(x, y))
    }

    fn trap(side: AttackSide, margin: f32, wait_ticks: u32, grid: &TileGrid) -> AmbushTrap {
        let tuning = TrapTuning { wait_ticks, ..TrapTuning::default() };
        AmbushTrap::new(side, LANE_Y, margin, grid.world_width(), tuning)
    }

    fn target_of(t: &AmbushTrap) -> f32 {
        match t.state() {
            TrapState::Attacking { target_x, .. } => target_x,
            other => panic!("not attacking: {other:?}"),
        }
    }

    #[test]
    fn hidden_offscreen_until_fired() {
        let grid = room();
        let t = trap(AttackSide::FromRight, 1.4, 10, &grid);
        assert!(!t.is_visible());
        assert!((t.position().x - (grid.world_width() + 3.0 * TILE_SIZE)).abs() < 1e-5);
        let l = trap(AttackSide::FromLeft, 1.4, 10, &grid);
        assert!((l.position().x + 3.0 * TILE_SIZE).abs() < 1e-5);
    }

    #[test]
    fn fires_only_on_entering_the_band() {
        let grid = room();
        let mut t = trap(AttackSide::FromLeft, 1.4, 10, &grid);
        let mut p = player_at(5.0, 3.0);
        assert_eq!(t.update(&mut p, &grid).transition, None);

        // Already inside last tick: no edge.
        t.in_zone = true;
        p.set_position(Vec2::new(5.0, LANE_Y));
        assert_eq!(t.update(&mut p, &grid).transition, None);
        assert_eq!(t.state(), TrapState::Idle);

        p.set_position(Vec2::new(5.0, 3.0));
        t.update(&mut p, &grid);
        p.set_position(Vec2::new(5.0, LANE_Y + 0.3));
        assert_eq!(t.update(&mut p, &grid).transition, Some(TrapTransition::Fired));
        assert!(t.is_visible());
        assert!(t.is_lethal());
    }

    #[test]
    fn dead_player_cannot_fire_it() {
        let grid = room();
        let mut t = trap(AttackSide::FromLeft, 1.4, 10, &grid);
        let mut p = player_at(5.0, LANE_Y);
        p.die();
        t.update(&mut p, &grid);
        assert_eq!(t.state(), TrapState::Idle);
        // Zone flag was not updated while dead, so the respawn counts as entering.
        p.reset();
        assert_eq!(t.update(&mut p, &grid).transition, Some(TrapTransition::Fired));
    }

    #[test]
    fn charge_stops_short_of_player() {
        let grid = room();
        let mut t = trap(AttackSide::FromLeft, 1.4, 10, &grid);
        let mut p = player_at(6.0, LANE_Y);
        t.update(&mut p, &grid);
        assert!((target_of(&t) - (6.0 - 1.4 - 0.2)).abs() < 1e-5);

        let mut r = trap(AttackSide::FromRight, 1.4, 10, &grid);
        r.update(&mut p, &grid);
        assert!((target_of(&r) - (6.0 + 1.4 + 0.2)).abs() < 1e-5);
    }

    #[test]
    fn small_margin_peeks_from_the_wall() {
        let grid = room();
        let w = grid.world_width();
        let mut p = player_at(3.0, LANE_Y);
        let mut r = trap(AttackSide::FromRight, 0.2, 10, &grid);
        r.update(&mut p, &grid);
        assert!((target_of(&r) - (w - HALF - 0.2)).abs() < 1e-5);

        let mut l = trap(AttackSide::FromLeft, 0.2, 10, &grid);
        l.update(&mut p, &grid);
        assert!((target_of(&l) - (HALF + 0.2)).abs() < 1e-5);
    }

    #[test]
    fn target_never_overshoots_far_edge() {
        let grid = room();
        let w = grid.world_width();
        let mut p = player_at(w - 0.5, LANE_Y);
        let mut r = trap(AttackSide::FromRight, 1.4, 10, &grid);
        r.update(&mut p, &grid);
        assert!((target_of(&r) - (w - HALF)).abs() < 1e-5);

        p.set_position(Vec2::new(0.5, LANE_Y));
        let mut l = trap(AttackSide::FromLeft, 1.4, 10, &grid);
        l.update(&mut p, &grid);
        assert!((target_of(&l) - HALF).abs() < 1e-5);
    }

    #[test]
    fn kill_mid_charge_does_not_abort() {
        let grid = room();
        let mut t = trap(AttackSide::FromLeft, 1.4, 10, &grid);
        let mut p = player_at(4.0, LANE_Y);
        t.update(&mut p, &grid);
        let target = target_of(&t);

        // Player steps back into the path of the wall.
        p.set_position(Vec2::new(0.5, LANE_Y));
        let mut killed_at = None;
        for i in 0..100 {
            let before = t.position().x;
            let tick = t.update(&mut p, &grid);
            if tick.killed {
                killed_at = Some(i);
            }
            if let TrapState::Waiting { .. } = t.state() {
                break;
            }
            assert!(t.position().x > before, "wall reversed at tick {i}");
            assert_eq!(target_of(&t), target);
        }
        assert!(killed_at.is_some());
        assert!(!p.is_alive());
        assert!((t.position().x - target).abs() < 1e-6);
    }

    #[test]
    fn waiting_is_lethal_returning_is_not() {
        let grid = room();
        let mut t = trap(AttackSide::FromLeft, 0.2, 3, &grid);
        let mut p = player_at(5.0, LANE_Y);
        t.update(&mut p, &grid);
        while matches!(t.state(), TrapState::Attacking { .. }) {
            t.update(&mut p, &grid);
        }
        assert!(matches!(t.state(), TrapState::Waiting { ticks_left: 3, .. }));

        p.set_position(t.position());
        assert!(t.update(&mut p, &grid).killed);
        assert!(matches!(t.state(), TrapState::Waiting { ticks_left: 2, .. }));

        t.update(&mut p, &grid);
        t.update(&mut p, &grid);
        assert!(matches!(t.state(), TrapState::Returning { .. }));

        p.reset();
        p.set_position(t.position());
        assert!(!t.update(&mut p, &grid).killed);
        assert!(p.is_alive());
    }

    #[test]
    fn finished_trap_is_inert_until_reset() {
        let grid = room();
        let mut t = trap(AttackSide::FromRight, 1.4, 2, &grid);
        let mut p = player_at(10.0, LANE_Y);
        t.update(&mut p, &grid);
        p.set_position(Vec2::new(2.0, 3.0));

        let mut finished = false;
        for _ in 0..500 {
            if t.update(&mut p, &grid).transition == Some(TrapTransition::Finished) {
                finished = true;
                break;
            }
        }
        assert!(finished);
        assert!(!t.is_visible());
        let parked = t.position();
        assert!((parked.x - (grid.world_width() + 3.0 * TILE_SIZE)).abs() < 1e-5);

        for i in 0..50 {
            let y = if i % 2 == 0 { LANE_Y } else { 3.0 };
            p.set_position(Vec2::new(10.0, y));
            assert_eq!(t.update(&mut p, &grid), TrapTick::default());
            assert_eq!(t.state(), TrapState::Finished);
            assert_eq!(t.position(), parked);
        }

        t.reset();
        assert_eq!(t.state(), TrapState::Idle);
        p.set_position(Vec2::new(10.0, LANE_Y));
        assert_eq!(t.update(&mut p, &grid).transition, Some(TrapTransition::Fired));
    }
}
