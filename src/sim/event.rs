/// Events emitted during a simulation step.
/// The presentation layer consumes these for sound and messages.

use crate::domain::tile::HazardKind;

/// What killed the player.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum KillCause {
    Hazard(HazardKind),
    Trap,
}

#[derive(Clone, Debug, PartialEq)]
pub enum GameEvent {
    PlayerJumped,
    PlayerWallJumped,
    PlayerKilled { cause: KillCause },
    PlayerRespawned,
    HazardTriggered { index: usize, kind: HazardKind },
    HazardLanded { index: usize, kind: HazardKind },
    HazardDespawned { index: usize },
    TrapFired { index: usize },
    TrapFinished { index: usize },
    GoalReached,
    LevelExited,
    LevelRestarted,
}
