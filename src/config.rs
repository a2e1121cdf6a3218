/// External configuration loader.
///
/// Reads `config.toml` from the executable's directory (or CWD).
/// Every key is optional: a missing file, section or key falls back to the
/// tuning the game ships with.

use serde::Deserialize;
use std::path::{Path, PathBuf};

// ── Public Config Struct ──

#[derive(Clone, Debug)]
pub struct GameConfig {
    pub general: GeneralConfig,
    pub player: PlayerTuning,
    pub hazard: HazardTuning,
    pub trap: TrapTuning,
    pub gamepad: GamepadConfig,
    pub levels_dir: PathBuf,
    pub log_file: PathBuf,
    /// File the settings came from, if any.
    pub source: Option<PathBuf>,
    /// Problems met while loading; logged once tracing is up.
    pub warnings: Vec<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct GeneralConfig {
    #[serde(default = "default_tick_rate")]
    pub tick_rate_ms: u64,
    #[serde(default = "default_intro_ticks")]
    pub intro_ticks: u32,
    #[serde(default = "default_outro_ticks")]
    pub outro_ticks: u32,
    #[serde(default = "default_respawn_ticks")]
    pub respawn_ticks: u32,
    #[serde(default = "default_levels_dir")]
    levels_dir: String,
    #[serde(default = "default_log_file")]
    log_file: String,
}

/// Player kinematics, in world units per tick.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct PlayerTuning {
    #[serde(default = "default_move_speed")]
    pub move_speed: f32,
    #[serde(default = "default_gravity")]
    pub gravity: f32,
    #[serde(default = "default_jump_power")]
    pub jump_power: f32,
    #[serde(default = "default_wall_slide")]
    pub wall_slide_speed: f32,
    #[serde(default = "default_wall_jump_x")]
    pub wall_jump_x: f32,
    #[serde(default = "default_wall_jump_y")]
    pub wall_jump_y: f32,
    #[serde(default = "default_half_size")]
    pub half_size: f32,
    #[serde(default = "default_jump_buffer")]
    pub jump_buffer_ticks: u32,
    #[serde(default = "default_death_bounce")]
    pub death_bounce: f32,
    #[serde(default = "default_death_spin")]
    pub death_spin: f32,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct HazardTuning {
    #[serde(default = "default_fall_speed")]
    pub fall_speed: f32,
    #[serde(default = "default_rise_speed")]
    pub rise_speed: f32,
    #[serde(default = "default_side_speed")]
    pub side_speed: f32,
    /// How far below a hazard the player may be and still trigger a drop.
    #[serde(default = "default_search_range")]
    pub search_range: f32,
    /// How far above a hazard counts as standing on it.
    #[serde(default = "default_on_top_range")]
    pub on_top_range: f32,
    #[serde(default = "default_side_radius")]
    pub side_trigger_radius: f32,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct TrapTuning {
    #[serde(default = "default_trap_speed")]
    pub speed: f32,
    #[serde(default = "default_trap_wait")]
    pub wait_ticks: u32,
    /// Spawn distance beyond the map edge, in tiles.
    #[serde(default = "default_offscreen_tiles")]
    pub offscreen_tiles: f32,
}

#[derive(Clone, Debug, Deserialize)]
pub struct GamepadConfig {
    #[serde(default = "default_pad_jump")]
    pub jump: Vec<String>,
    #[serde(default = "default_pad_restart")]
    pub restart: Vec<String>,
    #[serde(default = "default_pad_quit")]
    pub quit: Vec<String>,
}

// ── TOML Schema ──

#[derive(Deserialize, Debug, Default)]
struct TomlConfig {
    #[serde(default)]
    general: GeneralConfig,
    #[serde(default)]
    player: PlayerTuning,
    #[serde(default)]
    hazard: HazardTuning,
    #[serde(default)]
    trap: TrapTuning,
    #[serde(default)]
    gamepad: GamepadConfig,
}

// ── Defaults ──

fn default_tick_rate() -> u64 { 16 }     // ~60 Hz, the rate all speeds are tuned for
fn default_intro_ticks() -> u32 { 60 }
fn default_outro_ticks() -> u32 { 45 }
fn default_respawn_ticks() -> u32 { 60 }
fn default_levels_dir() -> String { "levels".into() }
fn default_log_file() -> String { "tumbleblock.log".into() }

fn default_move_speed() -> f32 { 0.1 }
fn default_gravity() -> f32 { 0.025 }
fn default_jump_power() -> f32 { 0.45 }
fn default_wall_slide() -> f32 { 0.02 }
fn default_wall_jump_x() -> f32 { 0.3 }
fn default_wall_jump_y() -> f32 { 0.42 }
fn default_half_size() -> f32 { 0.2 }
fn default_jump_buffer() -> u32 { 6 }    // 0.1s
fn default_death_bounce() -> f32 { 0.2 }
fn default_death_spin() -> f32 { 0.15 }

fn default_fall_speed() -> f32 { 0.2 }
fn default_rise_speed() -> f32 { 0.2 }
fn default_side_speed() -> f32 { 0.3 }
fn default_search_range() -> f32 { 7.0 }
fn default_on_top_range() -> f32 { 1.0 }
fn default_side_radius() -> f32 { 2.1 }

fn default_trap_speed() -> f32 { 0.2 }
fn default_trap_wait() -> u32 { 120 }    // 2s
fn default_offscreen_tiles() -> f32 { 3.0 }

fn default_pad_jump() -> Vec<String> { vec!["A".into(), "B".into()] }
fn default_pad_restart() -> Vec<String> { vec!["Start".into()] }
fn default_pad_quit() -> Vec<String> { vec!["Select".into()] }

impl Default for GeneralConfig {
    fn default() -> Self {
        GeneralConfig {
            tick_rate_ms: default_tick_rate(),
            intro_ticks: default_intro_ticks(),
            outro_ticks: default_outro_ticks(),
            respawn_ticks: default_respawn_ticks(),
            levels_dir: default_levels_dir(),
            log_file: default_log_file(),
        }
    }
}

impl Default for PlayerTuning {
    fn default() -> Self {
        PlayerTuning {
            move_speed: default_move_speed(),
            gravity: default_gravity(),
            jump_power: default_jump_power(),
            wall_slide_speed: default_wall_slide(),
            wall_jump_x: default_wall_jump_x(),
            wall_jump_y: default_wall_jump_y(),
            half_size: default_half_size(),
            jump_buffer_ticks: default_jump_buffer(),
            death_bounce: default_death_bounce(),
            death_spin: default_death_spin(),
        }
    }
}

impl Default for HazardTuning {
    fn default() -> Self {
        HazardTuning {
            fall_speed: default_fall_speed(),
            rise_speed: default_rise_speed(),
            side_speed: default_side_speed(),
            search_range: default_search_range(),
            on_top_range: default_on_top_range(),
            side_trigger_radius: default_side_radius(),
        }
    }
}

impl Default for TrapTuning {
    fn default() -> Self {
        TrapTuning {
            speed: default_trap_speed(),
            wait_ticks: default_trap_wait(),
            offscreen_tiles: default_offscreen_tiles(),
        }
    }
}

impl Default for GamepadConfig {
    fn default() -> Self {
        GamepadConfig {
            jump: default_pad_jump(),
            restart: default_pad_restart(),
            quit: default_pad_quit(),
        }
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        GameConfig::from_toml(TomlConfig::default(), &[], None, vec![])
    }
}

// ── Loading ──

impl GameConfig {
    /// Load config from `config.toml`.
    /// Search order: (1) exe directory, (2) current working directory.
    pub fn load() -> Self {
        let search_dirs = candidate_dirs();
        let mut warnings = Vec::new();
        let (toml_cfg, source) = load_toml(&search_dirs, &mut warnings);
        GameConfig::from_toml(toml_cfg, &search_dirs, source, warnings)
    }

    /// Parse a config document directly (no file search).
    pub fn parse(text: &str) -> Result<Self, toml::de::Error> {
        let cfg = toml::from_str::<TomlConfig>(text)?;
        Ok(GameConfig::from_toml(cfg, &[], None, vec![]))
    }

    fn from_toml(cfg: TomlConfig, search_dirs: &[PathBuf], source: Option<PathBuf>, warnings: Vec<String>) -> Self {
        let levels_dir = resolve_dir(&cfg.general.levels_dir, search_dirs);
        let log_file = PathBuf::from(&cfg.general.log_file);
        GameConfig {
            general: cfg.general,
            player: cfg.player,
            hazard: cfg.hazard,
            trap: cfg.trap,
            gamepad: cfg.gamepad,
            levels_dir,
            log_file,
            source,
            warnings,
        }
    }
}

/// Absolute paths are used as-is; relative ones are looked up in each
/// candidate dir, falling back to CWD-relative.
fn resolve_dir(name: &str, search_dirs: &[PathBuf]) -> PathBuf {
    let path = PathBuf::from(name);
    if path.is_absolute() {
        return path;
    }
    search_dirs
        .iter()
        .map(|d| d.join(name))
        .find(|p| p.is_dir())
        .unwrap_or(path)
}

/// Candidate directories to search: exe dir + CWD + XDG data home (deduplicated).
fn candidate_dirs() -> Vec<PathBuf> {
    let mut dirs: Vec<PathBuf> = vec![];

    if let Ok(exe) = std::env::current_exe() {
        let resolved = exe.canonicalize().unwrap_or(exe);
        if let Some(parent) = resolved.parent() {
            dirs.push(parent.to_path_buf());
        }
    }

    if let Ok(cwd) = std::env::current_dir() {
        if !dirs.iter().any(|d| d == &cwd) {
            dirs.push(cwd);
        }
    }

    // ~/.local/share/tumbleblock
    if let Ok(home) = std::env::var("HOME") {
        let xdg = PathBuf::from(&home).join(".local/share/tumbleblock");
        if xdg.is_dir() && !dirs.iter().any(|d| d == &xdg) {
            dirs.push(xdg);
        }
    }

    if dirs.is_empty() {
        dirs.push(PathBuf::from("."));
    }
    dirs
}

/// First readable config.toml in the candidate dirs.
fn load_toml(search_dirs: &[PathBuf], warnings: &mut Vec<String>) -> (TomlConfig, Option<PathBuf>) {
    for dir in search_dirs {
        let path = dir.join("config.toml");
        if !path.exists() {
            continue;
        }
        match std::fs::read_to_string(&path) {
            Ok(text) => return (parse_or_default(&path, &text, warnings), Some(path)),
            Err(e) => note(warnings, format!("could not read {}: {e}", path.display())),
        }
    }
    (TomlConfig::default(), None)
}

fn parse_or_default(path: &Path, text: &str, warnings: &mut Vec<String>) -> TomlConfig {
    match toml::from_str::<TomlConfig>(text) {
        Ok(cfg) => cfg,
        Err(e) => {
            note(warnings, format!("{} parse error: {e}; using default settings", path.display()));
            TomlConfig::default()
        }
    }
}

fn note(warnings: &mut Vec<String>, msg: String) {
    eprintln!("Warning: {msg}");
    warnings.push(msg);
}
