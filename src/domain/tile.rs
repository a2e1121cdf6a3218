/// Tile codes and their properties.
/// Level files store raw integers; the meaning of each code lives here
/// so loaders and entities never compare magic numbers.

/// World units per tile edge.
pub const TILE_SIZE: f32 = 0.7;

/// Raw code of an empty cell.
pub const EMPTY: i32 = 0;
/// Raw code of a solid cell (static wall or a claimed hazard platform).
pub const SOLID: i32 = 1;

/// Hazard behaviour, keyed by the tile code that spawns it.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum HazardKind {
    FallOnly,     // 3: drops when the player passes underneath
    Spike,        // 4: drops, then shoots back up when stood on
    RiseOnTop,    // 6: rises when stood on
    SideAttack,   // 7: flies sideways when the player comes near
    FallOnTop,    // 8: drops when stood on
    StaticHazard, // 9: never moves, always lethal
    RiseThenFall, // 10: rises when stood on, sticks to the ceiling, drops on the player
}

impl HazardKind {
    /// Can the player stand on this block while it is at rest?
    pub fn is_platform(self) -> bool {
        !matches!(self, HazardKind::StaticHazard)
    }

    pub fn name(self) -> &'static str {
        match self {
            HazardKind::FallOnly => "fall-only",
            HazardKind::Spike => "spike",
            HazardKind::RiseOnTop => "rise-on-top",
            HazardKind::SideAttack => "side-attack",
            HazardKind::FallOnTop => "fall-on-top",
            HazardKind::StaticHazard => "static",
            HazardKind::RiseThenFall => "rise-then-fall",
        }
    }
}

/// What a raw level code means at load time.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Tile {
    Empty,
    Solid,
    Start,
    Goal,
    Hazard(HazardKind),
}

impl Tile {
    /// Decode a level-file integer. Unknown codes yield `None`.
    pub fn from_code(code: i32) -> Option<Tile> {
        let tile = match code {
            0 => Tile::Empty,
            1 => Tile::Solid,
            2 => Tile::Start,
            3 => Tile::Hazard(HazardKind::FallOnly),
            4 => Tile::Hazard(HazardKind::Spike),
            5 => Tile::Goal,
            6 => Tile::Hazard(HazardKind::RiseOnTop),
            7 => Tile::Hazard(HazardKind::SideAttack),
            8 => Tile::Hazard(HazardKind::FallOnTop),
            9 => Tile::Hazard(HazardKind::StaticHazard),
            10 => Tile::Hazard(HazardKind::RiseThenFall),
            _ => return None,
        };
        Some(tile)
    }

    /// Does this code stay in the live grid after load?
    /// Everything else is lifted into auxiliary records and zeroed.
    pub fn is_static(self) -> bool {
        matches!(self, Tile::Empty | Tile::Solid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_known_code_decodes() {
        assert_eq!(Tile::from_code(EMPTY), Some(Tile::Empty));
        assert_eq!(Tile::from_code(SOLID), Some(Tile::Solid));
        assert_eq!(Tile::from_code(2), Some(Tile::Start));
        assert_eq!(Tile::from_code(5), Some(Tile::Goal));
        let hazards: Vec<_> = [3, 4, 6, 7, 8, 9, 10]
            .into_iter()
            .filter_map(|code| match Tile::from_code(code) {
                Some(Tile::Hazard(kind)) => Some(kind),
                _ => None,
            })
            .collect();
        assert_eq!(
            hazards,
            vec![
                HazardKind::FallOnly,
                HazardKind::Spike,
                HazardKind::RiseOnTop,
                HazardKind::SideAttack,
                HazardKind::FallOnTop,
                HazardKind::StaticHazard,
                HazardKind::RiseThenFall,
            ]
        );
    }

    #[test]
    fn unknown_codes_are_rejected() {
        assert_eq!(Tile::from_code(11), None);
        assert_eq!(Tile::from_code(-1), None);
    }

    #[test]
    fn only_empty_and_solid_are_static() {
        assert!(Tile::Empty.is_static());
        assert!(Tile::Solid.is_static());
        assert!(!Tile::Start.is_static());
        assert!(!Tile::Goal.is_static());
        assert!(!Tile::Hazard(HazardKind::Spike).is_static());
    }

    #[test]
    fn static_hazard_is_never_a_platform() {
        assert!(!HazardKind::StaticHazard.is_platform());
        assert!(HazardKind::FallOnly.is_platform());
        assert!(HazardKind::RiseThenFall.is_platform());
    }
}
