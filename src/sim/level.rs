/// Level loader.
///
/// ## Sources (priority order):
///   1. `levels/` directory (`*.csv` files, sorted by file name)
///   2. Built-in embedded levels
///
/// ## Level format (`.csv`):
///   ```
///   # Level Name
///   @exit above 7.7
///   @trap left 5.95 1.4
///   1,1,1,1,1
///   1,2,0,5,1
///   1,1,1,1,1
///   ```
///
/// `#` names the level (first one wins; later ones are comments).
/// `@exit above Y` / `@exit below Y` / `@exit band LO HI` open the right
/// edge for a Y interval. `@trap left|right Y MARGIN` places an ambush trap.
/// Every other non-blank line is a map row, top row first. Empty cells
/// read as 0; rows may differ in length.
///
/// ## Tile legend:
///   0 = Empty        1 = Solid           2 = Player start    5 = Goal
///   3 = Fall-only    4 = Spike           6 = Rise-on-top     7 = Side-attack
///   8 = Fall-on-top  9 = Static hazard  10 = Rise-then-fall

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::GameConfig;
use crate::domain::grid::{ExitLane, TileGrid};
use crate::domain::hazard::HazardEntity;
use crate::domain::physics::Vec2;
use crate::domain::tile::TILE_SIZE;
use crate::domain::trap::{AmbushTrap, AttackSide};
use crate::sim::world::{LevelArena, Phase, WorldState};

#[derive(Debug, Error)]
pub enum LevelError {
    #[error("cannot read level {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("line {line}, column {column}: `{text}` is not a tile code")]
    BadCell { line: usize, column: usize, text: String },
    #[error("line {line}: malformed directive `{text}`")]
    BadDirective { line: usize, text: String },
    #[error("level `{name}` has no map rows")]
    Empty { name: String },
}

/// An ambush trap as written in the level file.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct TrapDef {
    pub side: AttackSide,
    pub trigger_y: f32,
    pub stop_margin: f32,
}

/// Runtime level data (loaded from file or embedded).
#[derive(Clone, Debug)]
pub struct LevelDef {
    pub name: String,
    pub rows: Vec<Vec<i32>>,
    pub lanes: Vec<ExitLane>,
    pub traps: Vec<TrapDef>,
}

// ══════════════════════════════════════════════════════════════
// Public API
// ══════════════════════════════════════════════════════════════

/// Every level the game will play, in order.
pub fn load_levels(config: &GameConfig) -> Result<Vec<LevelDef>, LevelError> {
    let dir = &config.levels_dir;
    if dir.is_dir() {
        let levels = load_from_directory(dir)?;
        if !levels.is_empty() {
            info!(dir = %dir.display(), count = levels.len(), "levels loaded");
            return Ok(levels);
        }
    }
    info!(dir = %dir.display(), "no level files found, using built-in levels");
    embedded_levels()
}

/// Put level `level_idx` into play. Past the last level the game is complete.
/// Deaths carry over.
pub fn load_level(world: &mut WorldState, level_idx: usize, levels: &[LevelDef], config: &GameConfig) {
    world.total_levels = levels.len();
    let Some(def) = levels.get(level_idx) else {
        world.phase = Phase::GameComplete;
        world.set_message("ALL LEVELS CLEAR!", u32::MAX);
        info!(deaths = world.deaths, "game complete");
        return;
    };

    world.arena = build_arena(def, config);
    world.current_level = level_idx;
    world.level_name = def.name.clone();
    world.tick = 0;

    let start = world.arena.grid.start().unwrap_or_else(|| {
        warn!(level = %def.name, "no start marker; using the lower-left cell");
        Vec2::new(TILE_SIZE * 1.5, TILE_SIZE * 1.5)
    });
    world.player.set_position(start);

    world.phase = Phase::LevelIntro;
    world.anim_tick = 0;
    world.set_message(&def.name, world.timing.intro_ticks);
    world.center_camera();

    info!(
        level = level_idx + 1,
        name = %def.name,
        cols = world.arena.grid.cols(),
        rows = world.arena.grid.rows(),
        hazards = world.arena.hazards.len(),
        traps = world.arena.traps.len(),
        "level loaded"
    );
}

/// Build the live grid and every entity for a level, spawn cells claimed.
pub fn build_arena(def: &LevelDef, config: &GameConfig) -> LevelArena {
    let mut grid = TileGrid::from_codes(def.rows.clone(), def.lanes.clone());
    let mut hazards: Vec<HazardEntity> = grid
        .spawn_descriptors()
        .iter()
        .map(|d| HazardEntity::from_descriptor(d, config.hazard.clone()))
        .collect();
    for h in &mut hazards {
        h.claim_spawn(&mut grid);
    }
    let width = grid.world_width();
    let traps = def
        .traps
        .iter()
        .map(|t| AmbushTrap::new(t.side, t.trigger_y, t.stop_margin, width, config.trap.clone()))
        .collect();
    LevelArena::new(grid, hazards, traps)
}

/// Read one level file. The file stem names levels without a `#` line.
pub fn read_level_file(path: &Path) -> Result<LevelDef, LevelError> {
    let text = std::fs::read_to_string(path).map_err(|source| LevelError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let stem = path.file_stem().unwrap_or_default().to_string_lossy();
    parse_level(&stem, &text)
}

// ══════════════════════════════════════════════════════════════
// Level text parsing
// ══════════════════════════════════════════════════════════════

/// Parse one level. `fallback_name` is used when there is no `#` line.
pub fn parse_level(fallback_name: &str, text: &str) -> Result<LevelDef, LevelError> {
    let mut name: Option<String> = None;
    let mut rows = vec![];
    let mut lanes = vec![];
    let mut traps = vec![];

    for (idx, raw) in text.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        if let Some(rest) = line.strip_prefix('#') {
            if name.is_none() {
                name = Some(rest.trim().to_string());
            }
        } else if let Some(rest) = line.strip_prefix('@') {
            parse_directive(rest, line_no, &mut lanes, &mut traps)?;
        } else {
            rows.push(parse_row(line, line_no)?);
        }
    }

    let name = match name {
        Some(n) if !n.is_empty() => n,
        _ => fallback_name.to_string(),
    };
    if rows.is_empty() {
        return Err(LevelError::Empty { name });
    }
    Ok(LevelDef { name, rows, lanes, traps })
}

fn parse_row(line: &str, line_no: usize) -> Result<Vec<i32>, LevelError> {
    line.trim_end_matches(',')
        .split(',')
        .enumerate()
        .map(|(col, cell)| {
            let cell = cell.trim();
            if cell.is_empty() {
                return Ok(0);
            }
            match cell.parse::<i32>() {
                Ok(code) if code >= 0 => Ok(code),
                _ => Err(LevelError::BadCell { line: line_no, column: col + 1, text: cell.to_string() }),
            }
        })
        .collect()
}

fn parse_directive(
    rest: &str,
    line_no: usize,
    lanes: &mut Vec<ExitLane>,
    traps: &mut Vec<TrapDef>,
) -> Result<(), LevelError> {
    let words: Vec<&str> = rest.split_whitespace().collect();
    let bad = || LevelError::BadDirective { line: line_no, text: format!("@{rest}") };
    let num = |i: usize| words.get(i).and_then(|w| w.parse::<f32>().ok()).ok_or_else(bad);

    match words.first().copied() {
        Some("exit") => {
            let lane = match words.get(1).copied() {
                Some("above") => ExitLane::above(num(2)?),
                Some("below") => ExitLane::below(num(2)?),
                Some("band") => ExitLane::band(num(2)?, num(3)?),
                _ => return Err(bad()),
            };
            lanes.push(lane);
        }
        Some("trap") => {
            let side = match words.get(1).copied() {
                Some("left") => AttackSide::FromLeft,
                Some("right") => AttackSide::FromRight,
                _ => return Err(bad()),
            };
            traps.push(TrapDef { side, trigger_y: num(2)?, stop_margin: num(3)? });
        }
        _ => warn!(line = line_no, directive = rest, "unknown directive ignored"),
    }
    Ok(())
}

// ══════════════════════════════════════════════════════════════
// Directory loading (individual .csv files)
// ══════════════════════════════════════════════════════════════

fn load_from_directory(dir: &Path) -> Result<Vec<LevelDef>, LevelError> {
    let entries = std::fs::read_dir(dir).map_err(|source| LevelError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut paths: Vec<PathBuf> = entries
        .flatten()
        .map(|e| e.path())
        .filter(|p| p.extension().map_or(false, |e| e == "csv"))
        .collect();
    paths.sort();

    paths
        .iter()
        .map(|p| {
            debug!(path = %p.display(), "reading level");
            read_level_file(p)
        })
        .collect()
}

// ══════════════════════════════════════════════════════════════
// Embedded fallback levels
// ══════════════════════════════════════════════════════════════

const EMBEDDED: [(&str, &str); 3] = [
    ("level-1", include_str!("../../levels/01-mind-the-ceiling.csv")),
    ("level-2", include_str!("../../levels/02-stepping-stones.csv")),
    ("level-3", include_str!("../../levels/03-the-long-way-up.csv")),
];

fn embedded_levels() -> Result<Vec<LevelDef>, LevelError> {
    EMBEDDED.iter().map(|(name, text)| parse_level(name, text)).collect()
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::tile::{HazardKind, SOLID};
    use std::collections::HashSet;

    fn scratch_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("tumbleblock-{tag}-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn parses_name_directives_and_rows() {
        let text = "# Test Room\n@exit band 0.7 1.4\n@trap right 0.9 1.4\n\n1,1,1\n1,2,0\n1,1,1\n";
        let def = parse_level("fallback", text).unwrap();
        assert_eq!(def.name, "Test Room");
        assert_eq!(def.rows, vec![vec![1, 1, 1], vec![1, 2, 0], vec![1, 1, 1]]);
        assert_eq!(def.lanes, vec![ExitLane::band(0.7, 1.4)]);
        assert_eq!(
            def.traps,
            vec![TrapDef { side: AttackSide::FromRight, trigger_y: 0.9, stop_margin: 1.4 }]
        );
    }

    #[test]
    fn empty_cells_read_as_zero_and_rows_may_be_ragged() {
        let def = parse_level("ragged", "1,,1\n1, 2\n1,1,1,\n").unwrap();
        assert_eq!(def.name, "ragged");
        assert_eq!(def.rows, vec![vec![1, 0, 1], vec![1, 2], vec![1, 1, 1]]);
    }

    #[test]
    fn bad_cell_reports_position() {
        match parse_level("x", "# X\n1,1,1\n1,x,1\n") {
            Err(LevelError::BadCell { line, column, text }) => {
                assert_eq!((line, column), (3, 2));
                assert_eq!(text, "x");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(parse_level("x", "1,-1,1\n"), Err(LevelError::BadCell { .. })));
    }

    #[test]
    fn malformed_directive_is_an_error() {
        assert!(matches!(parse_level("x", "@exit sideways 1\n1\n"), Err(LevelError::BadDirective { line: 1, .. })));
        assert!(matches!(parse_level("x", "@trap left 2.0\n1\n"), Err(LevelError::BadDirective { .. })));
        // Unknown directives are skipped.
        assert!(parse_level("x", "@music loud\n1\n").is_ok());
    }

    #[test]
    fn level_without_rows_is_an_error() {
        match parse_level("blank", "# Nothing Here\n@exit above 1.0\n") {
            Err(LevelError::Empty { name }) => assert_eq!(name, "Nothing Here"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let path = scratch_dir("missing").join("nope.csv");
        let err = read_level_file(&path).unwrap_err();
        assert!(matches!(err, LevelError::Io { .. }));
        assert!(err.to_string().contains("nope.csv"));
    }

    #[test]
    fn directory_levels_load_sorted_by_file_name() {
        let dir = scratch_dir("sorted");
        std::fs::write(dir.join("b.csv"), "# Second\n1,2,5\n").unwrap();
        std::fs::write(dir.join("a.csv"), "# First\n1,2,5\n").unwrap();
        std::fs::write(dir.join("notes.txt"), "not a level").unwrap();

        let mut config = GameConfig::default();
        config.levels_dir = dir.clone();
        let levels = load_levels(&config).unwrap();
        let names: Vec<_> = levels.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, ["First", "Second"]);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn empty_directory_falls_back_to_builtin_levels() {
        let dir = scratch_dir("empty");
        let mut config = GameConfig::default();
        config.levels_dir = dir.clone();
        let levels = load_levels(&config).unwrap();
        assert_eq!(levels.len(), EMBEDDED.len());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn builtin_levels_are_playable_and_cover_every_hazard() {
        let config = GameConfig::default();
        let levels = embedded_levels().unwrap();
        let mut kinds = HashSet::new();
        for def in &levels {
            let arena = build_arena(def, &config);
            assert!(arena.grid.start().is_some(), "{} has no start", def.name);
            assert!(
                arena.grid.has_goal() || !arena.grid.exit_lanes().is_empty(),
                "{} cannot be finished",
                def.name
            );
            kinds.extend(arena.hazards.iter().map(|h| h.kind()));
        }
        for kind in [
            HazardKind::FallOnly,
            HazardKind::Spike,
            HazardKind::RiseOnTop,
            HazardKind::SideAttack,
            HazardKind::FallOnTop,
            HazardKind::StaticHazard,
            HazardKind::RiseThenFall,
        ] {
            assert!(kinds.contains(&kind), "no {kind:?} level");
        }
    }

    #[test]
    fn arena_claims_platform_spawns_and_builds_traps() {
        let def = parse_level("x", "@trap left 0.9 1.4\n1,1,1,1\n1,3,9,1\n1,2,0,1\n1,1,1,1\n").unwrap();
        let arena = build_arena(&def, &GameConfig::default());
        assert_eq!(arena.hazards.len(), 2);
        assert_eq!(arena.traps.len(), 1);
        let fall = &arena.hazards[0];
        assert_eq!(arena.grid.value_at(fall.claimed_cell().unwrap()), SOLID);
        assert_eq!(arena.hazards[1].claimed_cell(), None);
        assert!(!arena.traps[0].is_visible());
    }

    #[test]
    fn loading_past_the_last_level_completes_the_game() {
        let config = GameConfig::default();
        let levels = embedded_levels().unwrap();
        let mut world = WorldState::new(&config);

        load_level(&mut world, 0, &levels, &config);
        assert_eq!(world.phase, Phase::LevelIntro);
        assert_eq!(world.level_name, "Mind the Ceiling");
        assert_eq!(Some(world.player.position()), world.arena.grid.start());

        load_level(&mut world, levels.len(), &levels, &config);
        assert_eq!(world.phase, Phase::GameComplete);
    }
}
