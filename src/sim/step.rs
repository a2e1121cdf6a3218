/// The step function: advances the world by one tick.
///
/// Processing order:
///   1. Player (input, gravity, collision, jumps)
///   2. Traps, in index order
///   3. Hazards, in index order
///   4. Death check (Playing → Dying)
///   5. Exit / goal check (Playing → LevelOutro)
///   6. Respawn countdown (Dying → Playing)
///
/// Grid claims made by a hazard are visible to every entity updated after
/// it in the same tick, so list order is part of the simulation.
/// While Dying the world keeps running with idle input.

use tracing::{debug, info};

use crate::domain::entity::{FrameInput, JumpKind};
use crate::domain::hazard::HazardTransition;
use crate::domain::trap::TrapTransition;
use super::event::{GameEvent, KillCause};
use super::world::{Phase, WorldState};

// ══════════════════════════════════════════════════════════════
// Main entry point
// ══════════════════════════════════════════════════════════════

pub fn step(world: &mut WorldState, input: FrameInput) -> Vec<GameEvent> {
    if !matches!(world.phase, Phase::Playing | Phase::Dying) {
        return vec![];
    }

    let mut events: Vec<GameEvent> = Vec::new();
    world.tick += 1;
    world.tick_message();

    let input = if world.phase == Phase::Playing { input } else { FrameInput::idle() };
    update_player(world, &input, &mut events);
    update_traps(world, &mut events);
    update_hazards(world, &mut events);

    match world.phase {
        Phase::Playing => {
            if !world.player.is_alive() {
                enter_dying(world);
            } else {
                check_exit(world, &mut events);
            }
        }
        Phase::Dying => tick_dying(world, &mut events),
        _ => {}
    }

    events
}

// ══════════════════════════════════════════════════════════════
// Entity updates
// ══════════════════════════════════════════════════════════════

fn update_player(world: &mut WorldState, input: &FrameInput, events: &mut Vec<GameEvent>) {
    match world.player.update(input, &world.arena.grid) {
        Some(JumpKind::Ground) => events.push(GameEvent::PlayerJumped),
        Some(JumpKind::Wall) => events.push(GameEvent::PlayerWallJumped),
        None => {}
    }
}

fn update_traps(world: &mut WorldState, events: &mut Vec<GameEvent>) {
    let arena = &mut world.arena;
    for (index, trap) in arena.traps.iter_mut().enumerate() {
        let tick = trap.update(&mut world.player, &arena.grid);
        match tick.transition {
            Some(TrapTransition::Fired) => {
                debug!(index, side = ?trap.side(), "trap fired");
                events.push(GameEvent::TrapFired { index });
            }
            Some(TrapTransition::Finished) => events.push(GameEvent::TrapFinished { index }),
            None => {}
        }
        if tick.killed {
            info!(index, "player killed by trap");
            events.push(GameEvent::PlayerKilled { cause: KillCause::Trap });
        }
    }
}

fn update_hazards(world: &mut WorldState, events: &mut Vec<GameEvent>) {
    let arena = &mut world.arena;
    for (index, hazard) in arena.hazards.iter_mut().enumerate() {
        let kind = hazard.kind();
        let tick = hazard.update(&mut world.player, &mut arena.grid);
        match tick.transition {
            Some(HazardTransition::Triggered) => {
                debug!(index, kind = kind.name(), "hazard triggered");
                events.push(GameEvent::HazardTriggered { index, kind });
            }
            Some(HazardTransition::Landed) => {
                debug!(index, kind = kind.name(), cell = ?hazard.claimed_cell(), "hazard landed");
                events.push(GameEvent::HazardLanded { index, kind });
            }
            Some(HazardTransition::Despawned) => events.push(GameEvent::HazardDespawned { index }),
            None => {}
        }
        if tick.killed {
            info!(index, kind = kind.name(), "player killed by hazard");
            events.push(GameEvent::PlayerKilled { cause: KillCause::Hazard(kind) });
        }
    }
}

// ══════════════════════════════════════════════════════════════
// Phase transitions
// ══════════════════════════════════════════════════════════════

fn enter_dying(world: &mut WorldState) {
    world.phase = Phase::Dying;
    world.anim_tick = 0;
    world.deaths += 1;
}

fn tick_dying(world: &mut WorldState, events: &mut Vec<GameEvent>) {
    world.anim_tick += 1;
    if world.anim_tick >= world.timing.respawn_ticks {
        reset_level_state(world);
        info!(deaths = world.deaths, "player respawned");
        events.push(GameEvent::PlayerRespawned);
    }
}

fn check_exit(world: &mut WorldState, events: &mut Vec<GameEvent>) {
    let pos = world.player.position();
    if world.player.is_exiting(&world.arena.grid) {
        info!(level = world.current_level + 1, "level exited");
        events.push(GameEvent::LevelExited);
    } else if world.arena.grid.check_goal_collision(pos, world.player.half_size()) {
        info!(level = world.current_level + 1, "goal reached");
        events.push(GameEvent::GoalReached);
    } else {
        return;
    }
    world.phase = Phase::LevelOutro;
    world.anim_tick = 0;
    world.set_message("LEVEL CLEAR!", world.timing.outro_ticks);
}

/// Player back at its respawn point, every entity back at its spawn.
fn reset_level_state(world: &mut WorldState) {
    world.player.reset();
    world.arena.reset_entities();
    world.phase = Phase::Playing;
    world.anim_tick = 0;
    world.center_camera();
}

/// Count down the level banner. Returns true on the tick play starts.
pub fn tick_intro(world: &mut WorldState) -> bool {
    if world.phase != Phase::LevelIntro {
        return false;
    }
    world.anim_tick += 1;
    if world.anim_tick >= world.timing.intro_ticks {
        world.phase = Phase::Playing;
        world.anim_tick = 0;
        return true;
    }
    false
}

/// Count down the clear banner. Returns true once the next level should load.
pub fn tick_outro(world: &mut WorldState) -> bool {
    if world.phase != Phase::LevelOutro {
        return false;
    }
    world.tick_message();
    world.anim_tick += 1;
    world.anim_tick >= world.timing.outro_ticks
}

/// Start the current level over. Deaths are kept.
pub fn restart_level(world: &mut WorldState) -> Vec<GameEvent> {
    if !matches!(world.phase, Phase::Playing | Phase::Dying) {
        return vec![];
    }
    reset_level_state(world);
    world.set_message("Restart", 60);
    info!(level = world.current_level + 1, "level restarted");
    vec![GameEvent::LevelRestarted]
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{GameConfig, HazardTuning, TrapTuning};
    use crate::domain::grid::tests::grid_with_lanes;
    use crate::domain::grid::ExitLane;
    use crate::domain::hazard::{HazardEntity, HazardState};
    use crate::domain::tile::{HazardKind, SOLID};
    use crate::domain::trap::{AmbushTrap, AttackSide, TrapState};
    use crate::sim::world::LevelArena;

    fn world_from(rows: &[&str], lanes: Vec<ExitLane>) -> WorldState {
        let grid = grid_with_lanes(rows, lanes);
        let hazards = grid
            .spawn_descriptors()
            .iter()
            .map(|d| HazardEntity::from_descriptor(d, HazardTuning::default()))
            .collect();
        let start = grid.start().unwrap();
        let mut world = WorldState::new(&GameConfig::default());
        world.arena = LevelArena::new(grid, hazards, vec![]);
        world.arena.reset_entities();
        world.player.set_position(start);
        world.phase = Phase::Playing;
        world
    }

    fn right() -> FrameInput {
        FrameInput { right: true, ..FrameInput::default() }
    }

    fn run_until(world: &mut WorldState, input: FrameInput, max: usize, want: &GameEvent) -> Vec<GameEvent> {
        let mut seen = Vec::new();
        for _ in 0..max {
            let events = step(world, input);
            let hit = events.contains(want);
            seen.extend(events);
            if hit {
                return seen;
            }
        }
        panic!("never saw {want:?}; got {seen:?}");
    }

    /// Falling block one tile above the start lane, in column 1.
    const DROP_ROOM: [&str; 3] = ["0,3,0,0,0", "2,0,0,0,0", "1,1,1,1,1"];

    #[test]
    fn nothing_moves_outside_play() {
        let mut world = world_from(&DROP_ROOM, vec![]);
        world.phase = Phase::LevelIntro;
        let before = world.player.position();
        assert!(step(&mut world, right()).is_empty());
        assert_eq!(world.player.position(), before);
        assert_eq!(world.tick, 0);
    }

    #[test]
    fn intro_counts_down_into_play() {
        let mut world = world_from(&DROP_ROOM, vec![]);
        world.phase = Phase::LevelIntro;
        world.timing.intro_ticks = 3;
        assert!(!tick_intro(&mut world));
        assert!(!tick_intro(&mut world));
        assert!(tick_intro(&mut world));
        assert_eq!(world.phase, Phase::Playing);
    }

    #[test]
    fn grounded_jump_is_reported() {
        let mut world = world_from(&DROP_ROOM, vec![]);
        for _ in 0..20 {
            step(&mut world, FrameInput::idle());
        }
        assert!(world.player.is_grounded());
        let jump = FrameInput { jump_pressed: true, ..FrameInput::default() };
        assert!(step(&mut world, jump).contains(&GameEvent::PlayerJumped));
    }

    #[test]
    fn death_then_respawn_resets_everything() {
        let mut world = world_from(&DROP_ROOM, vec![]);
        world.timing.respawn_ticks = 5;
        let start = world.player.position();
        let spawn_cell = world.arena.hazards[0].claimed_cell().unwrap();

        let events = run_until(
            &mut world,
            right(),
            40,
            &GameEvent::PlayerKilled { cause: KillCause::Hazard(HazardKind::FallOnly) },
        );
        assert!(events.contains(&GameEvent::HazardTriggered { index: 0, kind: HazardKind::FallOnly }));
        assert_eq!(world.phase, Phase::Dying);
        assert_eq!(world.deaths, 1);
        assert!(!world.player.is_alive());

        // The block keeps falling while the player is dying.
        run_until(&mut world, right(), 10, &GameEvent::HazardLanded { index: 0, kind: HazardKind::FallOnly });
        run_until(&mut world, right(), 10, &GameEvent::PlayerRespawned);

        assert_eq!(world.phase, Phase::Playing);
        assert!(world.player.is_alive());
        assert_eq!(world.player.position(), start);
        let hz = &world.arena.hazards[0];
        assert_eq!(hz.position(), hz.spawn());
        assert_eq!(hz.claimed_cell(), Some(spawn_cell));
        assert_eq!(world.arena.grid.value_at(spawn_cell), SOLID);
        let solid = (0..world.arena.grid.rows() as i32 - 1)
            .flat_map(|r| (0..5).map(move |c| (c, r)))
            .filter(|&(c, r)| world.arena.grid.grid_value(c, r) == SOLID)
            .count();
        assert_eq!(solid, 1, "landed claim must be released");
    }

    #[test]
    fn walking_out_through_a_lane_ends_the_level() {
        let rows = ["0,0,0,0", "2,0,0,0", "1,1,1,1"];
        let mut world = world_from(&rows, vec![ExitLane::band(0.7, 1.4)]);
        run_until(&mut world, right(), 60, &GameEvent::LevelExited);
        assert_eq!(world.phase, Phase::LevelOutro);
        assert_eq!(world.anim_tick, 0);
        assert!(step(&mut world, right()).is_empty());
    }

    #[test]
    fn wall_without_lane_keeps_the_player_in() {
        let rows = ["0,0,0,0", "2,0,0,0", "1,1,1,1"];
        let mut world = world_from(&rows, vec![]);
        for _ in 0..60 {
            let events = step(&mut world, right());
            assert!(!events.contains(&GameEvent::LevelExited));
        }
        assert_eq!(world.phase, Phase::Playing);
        assert!(world.player.position().x < world.arena.grid.world_width());
    }

    #[test]
    fn touching_the_goal_ends_the_level() {
        let rows = ["0,0,0,0", "2,0,5,0", "1,1,1,1"];
        let mut world = world_from(&rows, vec![]);
        world.timing.outro_ticks = 2;
        run_until(&mut world, right(), 30, &GameEvent::GoalReached);
        assert_eq!(world.phase, Phase::LevelOutro);
        assert!(!tick_outro(&mut world));
        assert!(tick_outro(&mut world));
    }

    #[test]
    fn trap_fires_when_player_enters_its_lane() {
        let rows = ["0,0,0,0,0,0,0,0", "2,0,0,0,0,0,0,0", "1,1,1,1,1,1,1,1"];
        let mut world = world_from(&rows, vec![]);
        let width = world.arena.grid.world_width();
        world.arena.traps.push(AmbushTrap::new(AttackSide::FromRight, 0.9, 1.4, width, TrapTuning::default()));
        let events = step(&mut world, FrameInput::idle());
        assert!(events.contains(&GameEvent::TrapFired { index: 0 }));
        assert!(matches!(world.arena.traps[0].state(), TrapState::Attacking { .. }));
    }

    #[test]
    fn restart_resets_entities_and_keeps_deaths() {
        let mut world = world_from(&DROP_ROOM, vec![]);
        world.deaths = 3;
        run_until(
            &mut world,
            right(),
            40,
            &GameEvent::HazardTriggered { index: 0, kind: HazardKind::FallOnly },
        );
        assert_eq!(world.arena.hazards[0].state(), HazardState::Falling);

        let events = restart_level(&mut world);
        assert_eq!(events, vec![GameEvent::LevelRestarted]);
        assert_eq!(world.phase, Phase::Playing);
        assert_eq!(world.deaths, 3);
        assert!(matches!(world.arena.hazards[0].state(), HazardState::Idle { claim: Some(_) }));
        assert_eq!(world.player.position(), world.player.respawn_point());
    }
}
