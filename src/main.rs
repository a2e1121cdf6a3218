/// Entry point and game loop.

mod config;
mod domain;
mod sim;
mod ui;

use std::fs::File;
use std::path::Path;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use config::GameConfig;
use domain::entity::FrameInput;
use sim::event::GameEvent;
use sim::level::{load_level, load_levels, LevelDef};
use sim::step;
use sim::world::{Phase, WorldState};
use ui::gamepad::GamepadState;
use ui::input::{InputState, KEYS_CONFIRM, KEYS_PAUSE, KEYS_QUIT, KEYS_RESTART};
use ui::renderer::Renderer;
use ui::sound::SoundEngine;

const FRAME_SLEEP: Duration = Duration::from_millis(5);

fn main() {
    let config = GameConfig::load();
    init_tracing(&config.log_file);
    match &config.source {
        Some(path) => info!(path = %path.display(), "config loaded"),
        None => info!("no config.toml found; using defaults"),
    }
    for w in &config.warnings {
        warn!("{w}");
        eprintln!("config: {w}");
    }

    let levels = match load_levels(&config) {
        Ok(levels) => levels,
        Err(e) => {
            error!(error = %e, "level loading failed");
            eprintln!("Cannot load levels: {e}");
            std::process::exit(1);
        }
    };

    let mut world = WorldState::new(&config);
    load_level(&mut world, 0, &levels, &config);

    let mut renderer = Renderer::new();

    if let Err(e) = renderer.init() {
        eprintln!("Terminal init failed: {e}");
        return;
    }

    let sound = SoundEngine::new();

    let result = game_loop(&mut world, &mut renderer, sound.as_ref(), &levels, &config);

    if let Err(e) = renderer.cleanup() {
        eprintln!("Terminal cleanup failed: {e}");
    }

    if let Err(e) = result {
        error!(error = %e, "game loop aborted");
        eprintln!("Game error: {e}");
    }

    info!(deaths = world.deaths, level = world.current_level + 1, "session ended");
    println!();
    println!("Thanks for playing Tumbleblock!");
    println!("Deaths: {}", world.deaths);
}

/// Log to a file: the terminal belongs to the renderer.
/// `RUST_LOG` overrides the default `info` filter.
fn init_tracing(path: &Path) {
    let file = match File::create(path) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Logging disabled: cannot open {}: {e}", path.display());
            return;
        }
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init();
}

fn game_loop(
    world: &mut WorldState,
    renderer: &mut Renderer,
    sound: Option<&SoundEngine>,
    levels: &[LevelDef],
    config: &GameConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut kb = InputState::new();
    let mut gp = GamepadState::new();
    gp.load_button_config(&config.gamepad);
    let mut last_tick = Instant::now();
    let tick_rate = Duration::from_millis(config.general.tick_rate_ms.max(1));

    // A jump pressed between ticks must survive until the next one.
    let mut pending_jump = false;

    loop {
        kb.drain_events();
        gp.update();

        if kb.ctrl_c_pressed() {
            break;
        }
        if handle_meta(world, sound, &kb, &gp) {
            break;
        }

        if world.phase == Phase::Playing && !world.paused {
            pending_jump |= kb.frame_input().jump_pressed || gp.jump_pressed();
        }

        if last_tick.elapsed() >= tick_rate {
            // Pause blocks simulation but allows anim_tick for blink
            if world.paused {
                world.anim_tick = world.anim_tick.wrapping_add(1);
            } else {
                match world.phase {
                    Phase::LevelIntro => {
                        world.tick_message();
                        step::tick_intro(world);
                    }
                    Phase::Playing | Phase::Dying => {
                        let input = merge_input(kb.frame_input(), gp.frame_input(), pending_jump);
                        pending_jump = false;
                        let events = step::step(world, input);
                        process_sound_events(sound, &events);
                        world.follow_player();
                    }
                    Phase::LevelOutro => {
                        if step::tick_outro(world) {
                            let next = world.current_level + 1;
                            load_level(world, next, levels, config);
                        }
                    }
                    Phase::GameComplete => {
                        world.anim_tick = world.anim_tick.wrapping_add(1);
                        world.tick_message();
                    }
                }
            }
            last_tick = Instant::now();
        }

        renderer.render(world)?;
        std::thread::sleep(FRAME_SLEEP);
    }

    Ok(())
}

/// Keyboard and gamepad together: either side can run or jump.
fn merge_input(kb: FrameInput, gp: FrameInput, pending_jump: bool) -> FrameInput {
    FrameInput {
        left: kb.left || gp.left,
        right: kb.right || gp.right,
        jump_pressed: pending_jump || kb.jump_pressed || gp.jump_pressed,
    }
}

fn process_sound_events(sound: Option<&SoundEngine>, events: &[GameEvent]) {
    let sfx = match sound {
        Some(s) => s,
        None => return,
    };
    for event in events {
        match event {
            GameEvent::PlayerJumped => sfx.play_jump(),
            GameEvent::PlayerWallJumped => sfx.play_wall_jump(),
            GameEvent::PlayerKilled { .. } => sfx.play_die(),
            GameEvent::HazardTriggered { .. } => sfx.play_trigger(),
            GameEvent::HazardLanded { .. } => sfx.play_land(),
            GameEvent::TrapFired { .. } => sfx.play_trap(),
            GameEvent::GoalReached | GameEvent::LevelExited => sfx.play_clear(),
            _ => {}
        }
    }
}

/// Pause, restart and quit. Returns true when the game should exit.
fn handle_meta(world: &mut WorldState, sound: Option<&SoundEngine>, kb: &InputState, gp: &GamepadState) -> bool {
    let quit = kb.any_pressed(KEYS_QUIT) || gp.quit_pressed();
    let restart = kb.any_pressed(KEYS_RESTART) || gp.restart_pressed();

    if world.phase == Phase::GameComplete {
        return quit || kb.any_pressed(KEYS_CONFIRM);
    }

    // F1: Pause / Resume
    if kb.any_pressed(KEYS_PAUSE) {
        world.paused = !world.paused;
        info!(paused = world.paused, "pause toggled");
        return false;
    }

    if quit {
        return true;
    }

    if restart {
        let events = step::restart_level(world);
        if !events.is_empty() {
            world.paused = false;
            process_sound_events(sound, &events);
        }
    }

    false
}
