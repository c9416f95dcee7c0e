//! Teams coordinate their units through designations, stockpiles and a
//! reservation ledger.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geometry::{Position, Rect};
use crate::grid::{EntityId, EntityKind, Grid};
use crate::stockpile::{Stockpile, StockpileId};
use crate::tiles;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TeamId(pub(crate) u32);

impl TeamId {
    pub fn raw(self) -> u32 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DesignationId(pub(crate) u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum DesignationKind {
    Mine,
    /// Deliver one rock to the wall site of `build`.
    Supply { build: DesignationId },
    BuildWall,
}

#[derive(Debug, Clone, Serialize)]
pub struct Designation {
    pub id: DesignationId,
    #[serde(flatten)]
    pub kind: DesignationKind,
    pub location: Position,
    pub done: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Reservation {
    Entity(EntityId),
    Location(Position),
    Mine(DesignationId),
    Designation(DesignationId),
}

impl fmt::Display for Reservation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reservation::Entity(id) => write!(f, "{id}"),
            Reservation::Location(pos) => write!(f, "location ({}, {})", pos.x, pos.y),
            Reservation::Mine(id) => write!(f, "mine designation {}", id.0),
            Reservation::Designation(id) => write!(f, "designation {}", id.0),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LedgerError {
    #[error("{0} is already reserved")]
    AlreadyReserved(Reservation),
    #[error("{0} is not reserved")]
    NotReserved(Reservation),
}

/// Set of claimed objects; each object appears at most once.
#[derive(Debug, Default, Clone)]
pub struct ReservationLedger {
    held: BTreeSet<Reservation>,
}

impl ReservationLedger {
    pub fn reserve(&mut self, reservation: Reservation) -> Result<(), LedgerError> {
        if !self.held.insert(reservation) {
            return Err(LedgerError::AlreadyReserved(reservation));
        }
        Ok(())
    }

    pub fn relinquish(&mut self, reservation: Reservation) -> Result<(), LedgerError> {
        if !self.held.remove(&reservation) {
            return Err(LedgerError::NotReserved(reservation));
        }
        Ok(())
    }

    pub fn is_reserved(&self, reservation: Reservation) -> bool {
        self.held.contains(&reservation)
    }

    pub fn len(&self) -> usize {
        self.held.len()
    }

    pub fn is_empty(&self) -> bool {
        self.held.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Reservation> {
        self.held.iter()
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TeamError {
    #[error("stockpile {0:?} leaves the grid")]
    OutOfBounds(Rect),
    #[error("stockpile {rect:?} overlaps stockpile {existing:?}")]
    Overlaps { rect: Rect, existing: StockpileId },
    #[error("tile ({}, {}) is solid", .0.x, .0.y)]
    SolidTile(Position),
    #[error("tile ({}, {}) already carries a designation", .0.x, .0.y)]
    AlreadyDesignated(Position),
    #[error("tile ({}, {}) lies inside a stockpile", .0.x, .0.y)]
    InStockpile(Position),
}

#[derive(Debug)]
pub struct Team {
    pub id: TeamId,
    pub name: String,
    designations: Vec<Designation>,
    stockpiles: Vec<Stockpile>,
    ledger: ReservationLedger,
    next_designation: u32,
    next_stockpile: u32,
}

impl Team {
    pub fn new(id: TeamId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            designations: Vec::new(),
            stockpiles: Vec::new(),
            ledger: ReservationLedger::default(),
            next_designation: 0,
            next_stockpile: 0,
        }
    }

    pub fn designations(&self) -> &[Designation] {
        &self.designations
    }

    pub fn designation(&self, id: DesignationId) -> Option<&Designation> {
        self.designations.iter().find(|d| d.id == id)
    }

    pub fn stockpiles(&self) -> &[Stockpile] {
        &self.stockpiles
    }

    pub fn stockpile(&self, id: StockpileId) -> Option<&Stockpile> {
        self.stockpiles.iter().find(|s| s.id == id)
    }

    pub fn ledger(&self) -> &ReservationLedger {
        &self.ledger
    }

    pub fn ledger_mut(&mut self) -> &mut ReservationLedger {
        &mut self.ledger
    }

    pub fn in_any_stockpile(&self, pos: Position) -> bool {
        self.stockpiles.iter().any(|s| s.contains(pos))
    }

    fn is_designated(&self, pos: Position) -> bool {
        self.designations.iter().any(|d| d.location == pos)
    }

    fn push_designation(&mut self, kind: DesignationKind, location: Position) -> DesignationId {
        let id = DesignationId(self.next_designation);
        self.next_designation += 1;
        self.designations.push(Designation {
            id,
            kind,
            location,
            done: false,
        });
        id
    }

    /// Designate every mountain tile in `rect` for mining. Returns how many
    /// designations were created.
    pub fn designate_mining(&mut self, grid: &Grid, rect: Rect) -> usize {
        let mut created = 0;
        for pos in rect.positions() {
            if grid.tile(pos) == Some(tiles::MOUNTAIN) && !self.is_designated(pos) {
                self.push_designation(DesignationKind::Mine, pos);
                created += 1;
            }
        }
        created
    }

    /// Plan a wall at `position` needing `rocks` deliveries before it can be
    /// built.
    pub fn designate_wall(
        &mut self,
        grid: &Grid,
        position: Position,
        rocks: u32,
    ) -> Result<DesignationId, TeamError> {
        if grid.is_solid(position) {
            return Err(TeamError::SolidTile(position));
        }
        if self.is_designated(position) {
            return Err(TeamError::AlreadyDesignated(position));
        }
        if self.in_any_stockpile(position) {
            return Err(TeamError::InStockpile(position));
        }
        let build = self.push_designation(DesignationKind::BuildWall, position);
        for _ in 0..rocks {
            self.push_designation(DesignationKind::Supply { build }, position);
        }
        Ok(build)
    }

    /// True once every supply designation feeding `build` is done.
    pub fn supplies_done(&self, build: DesignationId) -> bool {
        self.designations.iter().all(|d| match d.kind {
            DesignationKind::Supply { build: target } if target == build => d.done,
            _ => true,
        })
    }

    pub fn mark_done(&mut self, id: DesignationId) {
        if let Some(designation) = self.designations.iter_mut().find(|d| d.id == id) {
            designation.done = true;
        }
    }

    /// Remove finished designations. Returns how many were removed.
    pub fn prune_finished(&mut self) -> usize {
        let before = self.designations.len();
        self.designations.retain(|d| !d.done);
        before - self.designations.len()
    }

    pub fn add_stockpile(
        &mut self,
        grid: &Grid,
        rect: Rect,
        kinds: impl IntoIterator<Item = EntityKind>,
    ) -> Result<StockpileId, TeamError> {
        if rect.width <= 0 || rect.height <= 0 || rect.positions().any(|pos| !grid.in_bounds(pos)) {
            return Err(TeamError::OutOfBounds(rect));
        }
        if let Some(existing) = self.stockpiles.iter().find(|s| s.rect.overlaps(&rect)) {
            return Err(TeamError::Overlaps {
                rect,
                existing: existing.id,
            });
        }
        if let Some(solid) = rect.positions().find(|pos| grid.is_solid(*pos)) {
            return Err(TeamError::SolidTile(solid));
        }
        let id = StockpileId(self.next_stockpile);
        self.next_stockpile += 1;
        self.stockpiles.push(Stockpile::new(id, rect, kinds));
        Ok(id)
    }

    pub fn remove_stockpile_at(&mut self, position: Position) -> Option<Stockpile> {
        let index = self.stockpiles.iter().position(|s| s.contains(position))?;
        Some(self.stockpiles.remove(index))
    }
}
