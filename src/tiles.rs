//! Tile semantics
//!
//! Tile IDs come from the map source; the core only needs to know which IDs
//! block movement and which placeholder IDs stand for entities.

use crate::grid::EntityKind;

pub type TileId = u16;

pub const FLOOR: TileId = 1;
pub const MOUNTAIN: TileId = 2;
pub const WATER: TileId = 3;
pub const WALL: TileId = 5;
pub const MINED_FLOOR: TileId = 18;

const FISH_PLACEHOLDER: TileId = 4;
const ROCK_PLACEHOLDER: TileId = 6;
const BUG_PLACEHOLDER: TileId = 7;

pub fn is_solid(tile: TileId) -> bool {
    matches!(tile, MOUNTAIN | WATER | WALL)
}

/// Entity spawned by a placeholder tile, which then reverts to floor.
pub fn placeholder_entity(tile: TileId) -> Option<EntityKind> {
    match tile {
        FISH_PLACEHOLDER => Some(EntityKind::Fish),
        ROCK_PLACEHOLDER => Some(EntityKind::Rock),
        BUG_PLACEHOLDER => Some(EntityKind::Bug),
        _ => None,
    }
}
