use crate::mask::{self, Mask};

/// Selector for the single-grid renderings of a generated level.
///
/// The enumerated replacement for the mode strings the renderer used to pass
/// around; layer computation itself lives in the generators.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DrawMode {
    /// Room outlines plus hallways clipped at the walls.
    #[default]
    Outline,
    /// Hallway floor and doorway cells only.
    HallOnly,
    /// Every floor cell, walls omitted.
    NoWalls,
    /// Doorways plus room floor.
    Doors,
    /// Doorway cells only.
    DoorOnly,
    /// Every passable cell.
    NonSolid,
}

/// Named boolean grids handed to the external tile renderer, all sharing the
/// generator's grid frame.
#[derive(Clone, Debug)]
pub struct Layers {
    /// Floor cells inside rooms.
    pub floor_room: Mask,
    /// Hallway or tunnel cells outside any room.
    pub floor_hall: Mask,
    /// Floor gained through carving, beyond the original room area.
    pub floor_carve: Mask,
    /// Solid boundary cells.
    pub wall: Mask,
    /// Cells where a hallway or tunnel pierces a wall.
    pub door: Mask,
    /// Union of every occupied cell.
    pub all: Mask,
}

impl Layers {
    /// Composes the single grid for the requested draw mode.
    pub fn select(&self, mode: DrawMode) -> Mask {
        match mode {
            DrawMode::Outline => mask::union(
                &mask::union(&self.wall, &self.door),
                &self.floor_hall,
            ),
            DrawMode::HallOnly => mask::union(&self.floor_hall, &self.door),
            DrawMode::NoWalls => mask::union(
                &mask::union(&self.floor_room, &self.floor_hall),
                &self.floor_carve,
            ),
            DrawMode::Doors => mask::union(&self.door, &self.floor_room),
            DrawMode::DoorOnly => self.door.clone(),
            DrawMode::NonSolid => mask::union(
                &mask::union(&self.floor_room, &self.floor_hall),
                &mask::union(&self.floor_carve, &self.door),
            ),
        }
    }
}
