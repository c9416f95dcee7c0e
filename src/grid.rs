//! Tile grid and entity placement
//!
//! The grid owns the tile matrix, the entity occupancy matrix and a flat list
//! of placed entities that mirrors it. Tile writes are recorded in a change
//! log which the owning world drains after every mutation step.

use std::collections::BTreeMap;
use std::fmt;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geometry::Position;
use crate::tiles::{self, TileId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(u64);

impl EntityId {
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "entity#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Fish,
    Rock,
    Bug,
}

/// An immobile item lying on a tile, or carried by a unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entity {
    pub id: EntityId,
    pub kind: EntityKind,
    /// `None` while the entity is held by a unit.
    pub location: Option<Position>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileChange {
    pub position: Position,
    pub previous: TileId,
    pub current: TileId,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GridError {
    #[error("position ({}, {}) is outside the grid", .0.x, .0.y)]
    OutOfBounds(Position),
    #[error("tile ({}, {}) is already occupied by {occupant}", .position.x, .position.y)]
    Occupied {
        position: Position,
        occupant: EntityId,
    },
    #[error("unknown {0}")]
    UnknownEntity(EntityId),
    #[error("{0} is already placed on the grid")]
    AlreadyPlaced(EntityId),
    #[error("{0} is not placed on the grid")]
    NotPlaced(EntityId),
    #[error("grid rows must all have width {expected}, row {row} has {found}")]
    RaggedRows {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("occupancy mirror is inconsistent: {0}")]
    MirrorBroken(String),
}

pub struct Grid {
    width: i32,
    height: i32,
    tiles: Vec<TileId>,
    occupancy: Vec<Option<EntityId>>,
    placed: Vec<(EntityId, Position)>,
    entities: BTreeMap<EntityId, Entity>,
    next_entity: u64,
    changes: Vec<TileChange>,
}

impl Grid {
    pub fn filled(width: i32, height: i32, tile: TileId) -> Self {
        let cells = (width.max(0) * height.max(0)) as usize;
        Self {
            width,
            height,
            tiles: vec![tile; cells],
            occupancy: vec![None; cells],
            placed: Vec::new(),
            entities: BTreeMap::new(),
            next_entity: 0,
            changes: Vec::new(),
        }
    }

    /// Build a grid from rows of tile IDs. Placeholder tiles spawn their
    /// entity and revert to floor.
    pub fn from_rows(rows: &[Vec<TileId>]) -> Result<Self, GridError> {
        let height = rows.len();
        let width = rows.first().map(Vec::len).unwrap_or(0);
        let mut grid = Self::filled(width as i32, height as i32, tiles::FLOOR);
        for (y, row) in rows.iter().enumerate() {
            if row.len() != width {
                return Err(GridError::RaggedRows {
                    row: y,
                    expected: width,
                    found: row.len(),
                });
            }
            for (x, &tile) in row.iter().enumerate() {
                let pos = Position::new(x as i32, y as i32);
                let index = grid.index(pos).ok_or(GridError::OutOfBounds(pos))?;
                match tiles::placeholder_entity(tile) {
                    Some(kind) => {
                        grid.tiles[index] = tiles::FLOOR;
                        grid.spawn_entity(kind, pos)?;
                    }
                    None => grid.tiles[index] = tile,
                }
            }
        }
        Ok(grid)
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn in_bounds(&self, pos: Position) -> bool {
        pos.x >= 0 && pos.x < self.width && pos.y >= 0 && pos.y < self.height
    }

    pub(crate) fn index(&self, pos: Position) -> Option<usize> {
        if self.in_bounds(pos) {
            Some((pos.y * self.width + pos.x) as usize)
        } else {
            None
        }
    }

    pub fn tile(&self, pos: Position) -> Option<TileId> {
        self.index(pos).map(|index| self.tiles[index])
    }

    /// Off-grid positions count as solid.
    pub fn is_solid(&self, pos: Position) -> bool {
        self.tile(pos).map_or(true, tiles::is_solid)
    }

    pub fn set_tile(&mut self, pos: Position, tile: TileId) -> Result<TileId, GridError> {
        let index = self.index(pos).ok_or(GridError::OutOfBounds(pos))?;
        let previous = std::mem::replace(&mut self.tiles[index], tile);
        self.changes.push(TileChange {
            position: pos,
            previous,
            current: tile,
        });
        Ok(previous)
    }

    /// Drain the tile writes recorded since the last call.
    pub fn take_tile_changes(&mut self) -> Vec<TileChange> {
        std::mem::take(&mut self.changes)
    }

    pub fn spawn_entity(&mut self, kind: EntityKind, pos: Position) -> Result<EntityId, GridError> {
        self.check_free(pos)?;
        let id = EntityId(self.next_entity);
        self.next_entity += 1;
        self.entities.insert(
            id,
            Entity {
                id,
                kind,
                location: None,
            },
        );
        self.place_entity(id, pos)?;
        Ok(id)
    }

    /// Put a held entity back on the grid.
    pub fn place_entity(&mut self, id: EntityId, pos: Position) -> Result<(), GridError> {
        self.check_free(pos)?;
        let index = self.index(pos).ok_or(GridError::OutOfBounds(pos))?;
        let entity = self
            .entities
            .get_mut(&id)
            .ok_or(GridError::UnknownEntity(id))?;
        if entity.location.is_some() {
            return Err(GridError::AlreadyPlaced(id));
        }
        entity.location = Some(pos);
        self.occupancy[index] = Some(id);
        self.placed.push((id, pos));
        Ok(())
    }

    /// Remove an entity from its tile but keep its record, e.g. when a unit
    /// picks it up.
    pub fn lift_entity(&mut self, id: EntityId) -> Result<Position, GridError> {
        let entity = self
            .entities
            .get_mut(&id)
            .ok_or(GridError::UnknownEntity(id))?;
        let pos = entity.location.take().ok_or(GridError::NotPlaced(id))?;
        if let Some(index) = self.index(pos) {
            self.occupancy[index] = None;
        }
        self.placed.retain(|(placed, _)| *placed != id);
        Ok(pos)
    }

    /// Remove an entity from the simulation entirely.
    pub fn destroy_entity(&mut self, id: EntityId) -> Result<EntityKind, GridError> {
        let placed = self
            .entities
            .get(&id)
            .ok_or(GridError::UnknownEntity(id))?
            .location
            .is_some();
        if placed {
            self.lift_entity(id)?;
        }
        let entity = self
            .entities
            .remove(&id)
            .ok_or(GridError::UnknownEntity(id))?;
        Ok(entity.kind)
    }

    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    pub fn entity_at(&self, pos: Position) -> Option<&Entity> {
        self.index(pos)
            .and_then(|index| self.occupancy[index])
            .and_then(|id| self.entities.get(&id))
    }

    /// Entities currently lying on the grid.
    pub fn placed_entities(&self) -> impl Iterator<Item = &Entity> {
        self.placed.iter().filter_map(|(id, _)| self.entities.get(id))
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Find one placed entity accepted by `predicate`. The candidates are
    /// shuffled first so no entity is starved of consideration.
    pub fn find_entity<R, F>(&self, rng: &mut R, mut predicate: F) -> Option<(EntityId, Position)>
    where
        R: Rng + ?Sized,
        F: FnMut(&Entity, Position) -> bool,
    {
        let mut candidates = self.placed.clone();
        candidates.shuffle(rng);
        candidates.into_iter().find(|(id, pos)| {
            self.entities
                .get(id)
                .map_or(false, |entity| predicate(entity, *pos))
        })
    }

    /// Check that the occupancy matrix, the placed list and the entity
    /// records agree with each other.
    pub fn verify_mirror(&self) -> Result<(), GridError> {
        let occupied = self.occupancy.iter().filter(|cell| cell.is_some()).count();
        if occupied != self.placed.len() {
            return Err(GridError::MirrorBroken(format!(
                "{occupied} occupied tiles but {} placed entities",
                self.placed.len()
            )));
        }
        for &(id, pos) in &self.placed {
            let index = self.index(pos).ok_or(GridError::OutOfBounds(pos))?;
            if self.occupancy[index] != Some(id) {
                return Err(GridError::MirrorBroken(format!(
                    "{id} listed at ({}, {}) but the tile disagrees",
                    pos.x, pos.y
                )));
            }
            let recorded = self.entities.get(&id).and_then(|e| e.location);
            if recorded != Some(pos) {
                return Err(GridError::MirrorBroken(format!(
                    "{id} record points at {recorded:?}"
                )));
            }
        }
        Ok(())
    }

    fn check_free(&self, pos: Position) -> Result<(), GridError> {
        let index = self.index(pos).ok_or(GridError::OutOfBounds(pos))?;
        match self.occupancy[index] {
            Some(occupant) => Err(GridError::Occupied {
                position: pos,
                occupant,
            }),
            None => Ok(()),
        }
    }
}
