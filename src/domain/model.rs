/// Renderable handles and the camera they are drawn through.
///
/// Every entity owns one `Renderable` and mutates its transform during
/// `update`. Drawing is somebody else's job: an entity hands its handle to
/// a `DrawSink` together with the camera and a material, and the sink
/// decides what that means (terminal glyphs, GPU draw calls, nothing).
/// The simulation never reads a transform back out of a sink.

use super::tile::HazardKind;
use super::physics::Vec2;

/// Position / rotation / scale of a drawable.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct Transform {
    pub translate: Vec2,
    /// Roll in radians (used by the death spin).
    pub rotate_z: f32,
    /// Yaw in radians: -π/2 faces right, +π/2 faces left.
    pub rotate_y: f32,
    pub scale: f32,
}

impl Transform {
    pub fn at(translate: Vec2, scale: f32) -> Self {
        Transform { translate, rotate_z: 0.0, rotate_y: 0.0, scale }
    }
}

/// What to paint a handle with. The sink maps these to textures or glyphs.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Material {
    Player,
    Hazard(HazardKind),
    Trap,
    Goal,
}

/// Receiver of draw submissions.
pub trait DrawSink {
    fn submit(&mut self, transform: &Transform, camera: &Camera, material: Material);
}

/// Opaque renderable handle owned by an entity.
#[derive(Clone, Debug)]
pub struct Renderable {
    pub transform: Transform,
    pub visible: bool,
}

impl Renderable {
    pub fn new(position: Vec2, scale: f32) -> Self {
        Renderable { transform: Transform::at(position, scale), visible: true }
    }

    pub fn position(&self) -> Vec2 {
        self.transform.translate
    }

    pub fn set_position(&mut self, position: Vec2) {
        self.transform.translate = position;
    }

    /// Submit this handle for drawing. Hidden handles submit nothing.
    pub fn draw(&self, sink: &mut dyn DrawSink, camera: &Camera, material: Material) {
        if self.visible {
            sink.submit(&self.transform, camera, material);
        }
    }
}

/// Camera: a viewport into the level, measured in whole tiles.
///
/// `(x, y)` is the column / grid row of the top-left visible cell.
/// `(view_w, view_h)` is how many tiles fit; the front end sets these
/// from the terminal size before composing a frame.
#[derive(Clone, Debug, Default)]
pub struct Camera {
    pub x: i32,
    pub y: i32,
    pub view_w: usize,
    pub view_h: usize,
}

impl Camera {
    pub fn new() -> Self {
        Camera::default()
    }

    /// Follow a target cell with a dead zone; levels narrower than the
    /// viewport are centred instead.
    pub fn follow(&mut self, target_col: i32, target_row: i32, level_w: usize, level_h: usize) {
        if self.view_w == 0 || self.view_h == 0 {
            return;
        }
        self.x = follow_axis(self.x, target_col, self.view_w, level_w);
        self.y = follow_axis(self.y, target_row, self.view_h, level_h);
    }

    /// Jump straight to the target (level load / respawn).
    pub fn center_on(&mut self, target_col: i32, target_row: i32, level_w: usize, level_h: usize) {
        if self.view_w == 0 || self.view_h == 0 {
            return;
        }
        self.x = center_axis(target_col, self.view_w, level_w);
        self.y = center_axis(target_row, self.view_h, level_h);
    }

    /// Viewport cell for a level cell, if visible.
    pub fn world_to_view(&self, col: i32, row: i32) -> Option<(usize, usize)> {
        let vx = col - self.x;
        let vy = row - self.y;
        if vx >= 0 && vx < self.view_w as i32 && vy >= 0 && vy < self.view_h as i32 {
            Some((vx as usize, vy as usize))
        } else {
            None
        }
    }
}

fn follow_axis(current: i32, target: i32, view: usize, level: usize) -> i32 {
    if level <= view {
        return -((view as i32 - level as i32) / 2);
    }
    let margin = view as i32 / 5;
    let low = current + margin;
    let high = current + view as i32 - margin - 1;
    let mut next = current;
    if target < low {
        next = target - margin;
    } else if target > high {
        next = target - view as i32 + margin + 1;
    }
    next.clamp(0, (level as i32 - view as i32).max(0))
}

fn center_axis(target: i32, view: usize, level: usize) -> i32 {
    if level <= view {
        return -((view as i32 - level as i32) / 2);
    }
    (target - view as i32 / 2).clamp(0, (level as i32 - view as i32).max(0))
}
