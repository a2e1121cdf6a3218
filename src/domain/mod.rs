pub mod entity;
pub mod grid;
pub mod hazard;
pub mod model;
pub mod physics;
pub mod player;
pub mod tile;
pub mod trap;
