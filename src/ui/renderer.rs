/// Presentation layer: double-buffered, diff-based terminal renderer.
///
/// How it works:
///   1. Build the next frame into `front` buffer (array of Cell)
///   2. Compare each cell with `back` buffer (previous frame)
///   3. Only emit terminal commands for cells that changed
///   4. All commands are batched with `queue!`, flushed once at the end
///   5. Swap front/back
///
/// The renderer is also the game's `DrawSink`: entities submit their
/// renderable handles and the sink maps each transform to a tile cell
/// through the camera, then paints a two-column glyph there.

use std::io::{self, BufWriter, Write};

use crossterm::{
    cursor::{self, MoveTo},
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};

use crate::domain::model::{Camera, DrawSink, Material, Transform};
use crate::domain::physics::cell_index;
use crate::domain::tile::{HazardKind, SOLID};
use crate::sim::world::{Phase, WorldState};

// ── Cell: the unit of the back-buffer ──

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
struct Cell {
    ch: char,
    fg: Color,
    bg: Color,
}

impl Cell {
    /// Explicit dark background for all "empty" terminal cells, so the
    /// inter-row gap colour on VTE terminals matches the cells.
    const BASE_BG: Color = Color::Rgb { r: 22, g: 22, b: 35 };

    const BLANK: Cell = Cell { ch: ' ', fg: Color::White, bg: Cell::BASE_BG };

    /// Sentinel used to invalidate the back buffer (forces a full repaint).
    const INVALID: Cell = Cell { ch: '?', fg: Color::Magenta, bg: Color::Magenta };

    fn new(ch: char, fg: Color, bg: Color) -> Self {
        let bg = match bg {
            Color::Reset => Self::BASE_BG,
            other => other,
        };
        Cell { ch, fg, bg }
    }
}

// ── FrameBuffer: a 2D grid of Cells ──

struct FrameBuffer {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl FrameBuffer {
    fn new(w: usize, h: usize) -> Self {
        FrameBuffer { width: w, height: h, cells: vec![Cell::BLANK; w * h] }
    }

    fn resize(&mut self, w: usize, h: usize) {
        if self.width != w || self.height != h {
            self.width = w;
            self.height = h;
            self.cells = vec![Cell::BLANK; w * h];
        }
    }

    fn clear(&mut self) {
        self.cells.fill(Cell::BLANK);
    }

    fn set(&mut self, x: usize, y: usize, cell: Cell) {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x] = cell;
        }
    }

    fn get(&self, x: usize, y: usize) -> Cell {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x]
        } else {
            Cell::BLANK
        }
    }

    fn put_str(&mut self, x: usize, y: usize, s: &str, fg: Color, bg: Color) {
        for (i, ch) in s.chars().enumerate() {
            if x + i >= self.width {
                break;
            }
            self.set(x + i, y, Cell::new(ch, fg, bg));
        }
    }

    fn fill_row(&mut self, y: usize, bg: Color) {
        for x in 0..self.width {
            self.set(x, y, Cell::new(' ', Color::White, bg));
        }
    }
}

// ── Glyphs ──

/// Each tile is CELL_W terminal columns wide.
const CELL_W: usize = 2;

/// Vertical offsets
const HUD_ROW: usize = 0;
const MAP_ROW: usize = 2;
/// HUD + gap above the map, message + gap + help below it.
const RESERVED_ROWS: usize = MAP_ROW + 4;

const HUD_BG: Color = Color::Rgb { r: 20, g: 20, b: 60 };
const MSG_BG: Color = Color::Rgb { r: 200, g: 180, b: 50 };
const BANNER: Color = Color::Rgb { r: 255, g: 220, b: 50 };

type Glyph = (char, char, Color, Color);

fn solid_glyph() -> Glyph {
    ('█', '█', Color::Rgb { r: 120, g: 120, b: 130 }, Color::Rgb { r: 70, g: 70, b: 80 })
}

fn material_glyph(material: Material, transform: &Transform) -> Glyph {
    match material {
        Material::Player => {
            let fg = Color::Rgb { r: 100, g: 200, b: 255 };
            if transform.rotate_z != 0.0 {
                ('x', 'x', Color::Rgb { r: 255, g: 80, b: 80 }, Color::Reset)
            } else if transform.rotate_y < 0.0 {
                ('@', '>', fg, Color::Reset)
            } else {
                ('<', '@', fg, Color::Reset)
            }
        }
        Material::Hazard(kind) => hazard_glyph(kind),
        Material::Trap => ('=', '=', Color::Rgb { r: 255, g: 60, b: 60 }, Color::Rgb { r: 90, g: 0, b: 0 }),
        Material::Goal => ('[', ']', Color::Rgb { r: 80, g: 255, b: 80 }, Color::Rgb { r: 0, g: 60, b: 0 }),
    }
}

fn hazard_glyph(kind: HazardKind) -> Glyph {
    let block = Color::Rgb { r: 100, g: 65, b: 30 };
    match kind {
        HazardKind::FallOnly => ('▼', '▼', Color::Rgb { r: 230, g: 160, b: 80 }, block),
        HazardKind::Spike => ('╨', '╨', Color::Rgb { r: 255, g: 120, b: 120 }, block),
        HazardKind::RiseOnTop => ('▲', '▲', Color::Rgb { r: 160, g: 230, b: 80 }, block),
        HazardKind::SideAttack => ('◆', '◆', Color::Rgb { r: 255, g: 200, b: 60 }, block),
        HazardKind::FallOnTop => ('▽', '▽', Color::Rgb { r: 230, g: 160, b: 80 }, block),
        HazardKind::StaticHazard => ('✖', '✖', Color::Rgb { r: 255, g: 60, b: 60 }, Color::Rgb { r: 60, g: 0, b: 0 }),
        HazardKind::RiseThenFall => ('↕', '↕', Color::Rgb { r: 180, g: 120, b: 255 }, block),
    }
}

/// Map rows revealed (from the bottom) during the level banner.
/// The whole map is visible after two thirds of the intro.
fn reveal_rows(anim_tick: u32, intro_ticks: u32, rows: usize) -> usize {
    let span = (intro_ticks.max(3) * 2 / 3) as usize;
    (anim_tick as usize * rows / span).min(rows)
}

// ── Renderer ──

pub struct Renderer {
    writer: BufWriter<io::Stdout>,
    front: FrameBuffer,
    back: FrameBuffer,
    term_w: usize,
    term_h: usize,
    last_phase: Option<Phase>,
    /// Grid rows of the level being drawn (for world → row mapping).
    level_rows: i32,
}

impl Renderer {
    pub fn new() -> Self {
        Renderer {
            writer: BufWriter::with_capacity(16384, io::stdout()),
            front: FrameBuffer::new(0, 0),
            back: FrameBuffer::new(0, 0),
            term_w: 0,
            term_h: 0,
            last_phase: None,
            level_rows: 0,
        }
    }

    pub fn init(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(
            self.writer,
            terminal::EnterAlternateScreen,
            cursor::Hide,
            SetBackgroundColor(Cell::BASE_BG),
            Clear(ClearType::All)
        )?;

        let (tw, th) = terminal::size().unwrap_or((80, 24));
        self.resize(tw as usize, th as usize);
        Ok(())
    }

    pub fn cleanup(&mut self) -> io::Result<()> {
        execute!(self.writer, ResetColor, cursor::Show, terminal::LeaveAlternateScreen)?;
        terminal::disable_raw_mode()
    }

    fn resize(&mut self, w: usize, h: usize) {
        self.term_w = w;
        self.term_h = h;
        self.front.resize(w, h);
        self.back.resize(w, h);
        // Force full repaint: back ≠ front for every cell.
        self.back.cells.fill(Cell::INVALID);
    }

    pub fn render(&mut self, world: &mut WorldState) -> io::Result<()> {
        let (tw, th) = terminal::size().unwrap_or((80, 24));
        if tw as usize != self.term_w || th as usize != self.term_h {
            self.resize(tw as usize, th as usize);
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
        }

        if self.last_phase != Some(world.phase) {
            self.back.cells.fill(Cell::INVALID);
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
            self.last_phase = Some(world.phase);
        }

        self.fit_camera(world);
        self.compose(world);
        self.flush_diff()?;

        // Swap: current front becomes next back
        std::mem::swap(&mut self.front, &mut self.back);
        Ok(())
    }

    /// Size the viewport from the terminal and re-aim the camera.
    fn fit_camera(&self, world: &mut WorldState) {
        let cols = world.arena.grid.cols();
        let rows = world.arena.grid.rows();
        world.camera.view_w = (self.term_w / CELL_W).min(cols.max(1));
        world.camera.view_h = self.term_h.saturating_sub(RESERVED_ROWS).max(1).min(rows.max(1));
        match world.phase {
            Phase::Playing => world.follow_player(),
            _ => world.center_camera(),
        }
    }

    // ── Diff flush: only write changed cells ──

    fn flush_diff(&mut self) -> io::Result<()> {
        let mut last_fg = Color::White;
        let mut last_bg = Cell::BASE_BG;
        let mut need_move = true;
        let mut last_x: usize = 0;
        let mut last_y: usize = 0;

        // Explicit base colours; ResetColor would fall back to the terminal default.
        queue!(self.writer, SetForegroundColor(Color::White), SetBackgroundColor(Cell::BASE_BG))?;

        for y in 0..self.front.height {
            for x in 0..self.front.width {
                let cell = self.front.get(x, y);
                if cell == self.back.get(x, y) {
                    need_move = true;
                    continue;
                }

                if need_move || x != last_x + 1 || y != last_y {
                    queue!(self.writer, MoveTo(x as u16, y as u16))?;
                    need_move = false;
                }
                if cell.fg != last_fg {
                    queue!(self.writer, SetForegroundColor(cell.fg))?;
                    last_fg = cell.fg;
                }
                if cell.bg != last_bg {
                    queue!(self.writer, SetBackgroundColor(cell.bg))?;
                    last_bg = cell.bg;
                }
                queue!(self.writer, Print(cell.ch))?;
                last_x = x;
                last_y = y;
            }
        }

        self.writer.flush()
    }

    // ── Compose: build front buffer content ──

    fn compose(&mut self, w: &WorldState) {
        self.front.clear();
        match w.phase {
            Phase::LevelIntro => self.compose_level_intro(w),
            Phase::Playing | Phase::Dying | Phase::LevelOutro => self.compose_game(w),
            Phase::GameComplete => self.compose_game_complete(w),
        }
        if w.paused {
            self.compose_pause_overlay(w);
        }
    }

    fn compose_hud(&mut self, w: &WorldState) {
        let hud = format!(
            " Level {}/{}  {}   Deaths: {} ",
            w.current_level + 1,
            w.total_levels,
            w.level_name,
            w.deaths,
        );
        self.front.fill_row(HUD_ROW, HUD_BG);
        self.front.put_str(0, HUD_ROW, &hud, Color::White, HUD_BG);
    }

    fn compose_game(&mut self, w: &WorldState) {
        self.compose_hud(w);
        self.compose_map(w, usize::MAX);
        self.compose_entities(w);

        let cam = &w.camera;
        let msg_row = MAP_ROW + cam.view_h + 1;
        if !w.message.is_empty() && msg_row < self.front.height {
            let msg = format!(" ◈ {} ", w.message);
            self.front.fill_row(msg_row, MSG_BG);
            self.front.put_str(0, msg_row, &msg, Color::Black, MSG_BG);
        }

        let help_row = MAP_ROW + cam.view_h + 3;
        if help_row < self.front.height {
            let help = " ←/→ Run  Space/↑ Jump  R Restart  F1 Pause  Esc Quit";
            self.front.put_str(0, help_row, help, Color::DarkGrey, Color::Reset);
        }
    }

    /// Level banner over a map revealed row by row from the bottom.
    fn compose_level_intro(&mut self, w: &WorldState) {
        self.compose_hud(w);
        let rows = w.arena.grid.rows();
        let visible = reveal_rows(w.anim_tick, w.timing.intro_ticks, rows);
        self.compose_map(w, visible);
        if visible >= rows {
            self.compose_entities(w);
        }

        let cam = &w.camera;
        let view_cols = cam.view_w * CELL_W;
        let name_row = MAP_ROW + cam.view_h / 2;
        let name = format!(" ◈ {} ◈ ", w.level_name);
        let cx = view_cols.saturating_sub(name.chars().count()) / 2;
        self.front.put_str(cx, name_row.saturating_sub(1), &name, BANNER, Color::Reset);
        let ready = "GET READY";
        let rx = view_cols.saturating_sub(ready.len()) / 2;
        self.front.put_str(rx, name_row + 1, ready, Color::Rgb { r: 80, g: 255, b: 80 }, Color::Reset);
    }

    /// Solid tiles through the camera. Only the bottom `visible_rows` grid rows are drawn.
    fn compose_map(&mut self, w: &WorldState, visible_rows: usize) {
        let grid = &w.arena.grid;
        let rows = grid.rows() as i32;
        let cam = &w.camera;

        for vy in 0..cam.view_h {
            let gy = cam.y + vy as i32;
            let row = MAP_ROW + vy;
            if row >= self.front.height {
                break;
            }
            if gy < 0 || gy >= rows || (rows - 1 - gy) as usize >= visible_rows {
                continue;
            }
            for vx in 0..cam.view_w {
                let gx = cam.x + vx as i32;
                let col = vx * CELL_W;
                if col + 1 >= self.front.width {
                    break;
                }
                if grid.grid_value(gx, gy) == SOLID {
                    self.put_glyph(col, row, solid_glyph());
                }
            }
        }
    }

    fn compose_entities(&mut self, w: &WorldState) {
        self.level_rows = w.arena.grid.rows() as i32;
        let cam = w.camera.clone();
        w.arena.draw(self, &cam);
        w.player.draw(self, &cam);
    }

    fn put_glyph(&mut self, col: usize, row: usize, (c0, c1, fg, bg): Glyph) {
        self.front.set(col, row, Cell::new(c0, fg, bg));
        self.front.set(col + 1, row, Cell::new(c1, fg, bg));
    }

    fn compose_game_complete(&mut self, w: &WorldState) {
        let box_art = [
            "╔════════════════════════════════╗",
            "║    ★  ALL LEVELS CLEARED!  ★   ║",
            "╚════════════════════════════════╝",
        ];
        for (i, l) in box_art.iter().enumerate() {
            self.front.put_str(4, 4 + i, l, BANNER, Color::Reset);
        }
        let levels = format!("◈ Levels cleared: {}", w.total_levels);
        let deaths = format!("◈ Deaths: {}", w.deaths);
        self.front.put_str(6, 9, &levels, Color::White, Color::Reset);
        self.front.put_str(6, 10, &deaths, Color::White, Color::Reset);
        self.front.put_str(6, 12, "▸ ENTER / ESC: Quit", Color::Rgb { r: 80, g: 255, b: 80 }, Color::Reset);
    }

    fn compose_pause_overlay(&mut self, w: &WorldState) {
        let dim = Color::Rgb { r: 40, g: 40, b: 40 };
        let key_c = Color::Rgb { r: 100, g: 200, b: 255 };
        let cam = &w.camera;

        let view_cols = cam.view_w * CELL_W;
        let box_w = 28_usize.min(view_cols);
        let box_h = 7_usize.min(cam.view_h);
        let box_x = view_cols.saturating_sub(box_w) / 2;
        let box_y = MAP_ROW + cam.view_h.saturating_sub(box_h) / 2;

        for y in box_y..box_y + box_h {
            for x in box_x..box_x + box_w {
                self.front.set(x, y, Cell::new(' ', Color::Reset, dim));
            }
        }
        let label = if (w.anim_tick / 8) % 2 == 0 { "▶  PAUSED  ◀" } else { "   PAUSED   " };
        self.front.put_str(box_x + 8, box_y + 1, label, BANNER, dim);
        self.front.put_str(box_x + 2, box_y + 3, "F1  Resume", key_c, dim);
        self.front.put_str(box_x + 2, box_y + 4, "R   Restart Level", key_c, dim);
        self.front.put_str(box_x + 2, box_y + 5, "Esc Quit", key_c, dim);
    }
}

impl DrawSink for Renderer {
    fn submit(&mut self, transform: &Transform, camera: &Camera, material: Material) {
        let pos = transform.translate;
        let col = cell_index(pos.x);
        let row = self.level_rows - 1 - cell_index(pos.y);
        if let Some((vx, vy)) = camera.world_to_view(col, row) {
            let glyph = material_glyph(material, transform);
            self.put_glyph(vx * CELL_W, MAP_ROW + vy, glyph);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::sim::level::{build_arena, parse_level};

    fn world_with(text: &str) -> WorldState {
        let config = GameConfig::default();
        let def = parse_level("test", text).unwrap();
        let mut world = WorldState::new(&config);
        world.arena = build_arena(&def, &config);
        if let Some(start) = world.arena.grid.start() {
            world.player.set_position(start);
        }
        world.phase = Phase::Playing;
        world
    }

    fn renderer(w: usize, h: usize) -> Renderer {
        let mut r = Renderer::new();
        r.resize(w, h);
        r
    }

    #[test]
    fn reveal_runs_bottom_up_and_completes_early() {
        assert_eq!(reveal_rows(0, 60, 15), 0);
        assert_eq!(reveal_rows(20, 60, 15), 7);
        assert_eq!(reveal_rows(40, 60, 15), 15);
        assert_eq!(reveal_rows(59, 60, 15), 15);
    }

    #[test]
    fn tiles_and_entities_land_in_their_cells() {
        let mut world = world_with("1,1,1,1\n1,3,0,1\n1,2,5,1\n1,1,1,1\n");
        let mut r = renderer(40, 20);
        r.fit_camera(&mut world);
        assert_eq!((world.camera.view_w, world.camera.view_h), (4, 4));
        r.compose(&world);

        // Top-left wall.
        assert_eq!(r.front.get(0, MAP_ROW).ch, '█');
        // Hazard at grid (1, 1).
        assert_eq!(r.front.get(CELL_W, MAP_ROW + 1).ch, '▼');
        // Player at grid (1, 2), facing right.
        assert_eq!(r.front.get(CELL_W, MAP_ROW + 2).ch, '@');
        // Goal at grid (2, 2).
        assert_eq!(r.front.get(2 * CELL_W, MAP_ROW + 2).ch, '[');
    }

    #[test]
    fn hidden_handles_are_not_drawn() {
        let mut world = world_with("@trap left 1.05 1.4\n1,1,1,1\n1,0,0,1\n1,2,0,1\n1,1,1,1\n");
        let mut r = renderer(40, 20);
        r.fit_camera(&mut world);
        r.compose(&world);
        let drawn = r.front.cells.iter().filter(|c| c.ch == '=').count();
        assert_eq!(drawn, 0);
    }

    #[test]
    fn message_bar_sits_below_the_map() {
        let mut world = world_with("1,1,1\n1,2,1\n1,1,1\n");
        world.set_message("LEVEL CLEAR!", 10);
        let mut r = renderer(40, 20);
        r.fit_camera(&mut world);
        r.compose(&world);
        let row = MAP_ROW + world.camera.view_h + 1;
        let text: String = (0..16).map(|x| r.front.get(x, row).ch).collect();
        assert!(text.contains("LEVEL CLEAR!"), "{text:?}");
    }
}
