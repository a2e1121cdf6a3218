/// Small value types shared by every entity: facing, wall contact,
/// the per-tick input snapshot and jump outcomes.

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Facing {
    Left,
    Right,
}

impl Facing {
    /// Model yaw for this facing (radians).
    pub fn yaw(self) -> f32 {
        match self {
            Facing::Right => -std::f32::consts::FRAC_PI_2,
            Facing::Left => std::f32::consts::FRAC_PI_2,
        }
    }
}

/// Which side of the player is pressed against a wall this tick.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum WallSide {
    #[default]
    None,
    Left,
    Right,
}

/// Frame input: built once per tick by the front end, read by everyone.
/// `left` / `right` are held state, `jump_pressed` is a fresh press.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct FrameInput {
    pub left: bool,
    pub right: bool,
    pub jump_pressed: bool,
}

impl FrameInput {
    /// No keys down (used while the player is dying or the game is paused).
    pub fn idle() -> Self {
        FrameInput::default()
    }

    /// Horizontal intent in {-1, 0, +1}. Left wins when both are held.
    pub fn move_x(&self) -> f32 {
        if self.left {
            -1.0
        } else if self.right {
            1.0
        } else {
            0.0
        }
    }
}

/// A jump that actually happened this tick.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum JumpKind {
    Ground,
    Wall,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn left_overrides_right() {
        let both = FrameInput { left: true, right: true, jump_pressed: false };
        assert_eq!(both.move_x(), -1.0);
        let right = FrameInput { right: true, ..FrameInput::idle() };
        assert_eq!(right.move_x(), 1.0);
        assert_eq!(FrameInput::idle().move_x(), 0.0);
    }

    #[test]
    fn yaw_points_the_right_way() {
        assert!(Facing::Right.yaw() < 0.0);
        assert!(Facing::Left.yaw() > 0.0);
    }
}
