use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::geometry::{Position, Rect};
use crate::grid::{EntityKind, Grid};
use crate::team::{Reservation, ReservationLedger};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StockpileId(pub(crate) u32);

/// A rectangle of tiles where a team stores entities of the accepted kinds.
#[derive(Debug, Clone, Serialize)]
pub struct Stockpile {
    pub id: StockpileId,
    pub rect: Rect,
    pub accepted: BTreeSet<EntityKind>,
}

impl Stockpile {
    pub fn new(id: StockpileId, rect: Rect, accepted: impl IntoIterator<Item = EntityKind>) -> Self {
        Self {
            id,
            rect,
            accepted: accepted.into_iter().collect(),
        }
    }

    pub fn accepts(&self, kind: EntityKind) -> bool {
        self.accepted.contains(&kind)
    }

    pub fn contains(&self, pos: Position) -> bool {
        self.rect.contains(pos)
    }

    /// A slot is taken when it is solid, holds an accepted entity or someone
    /// has reserved it for a delivery.
    fn slot_taken(&self, pos: Position, grid: &Grid, ledger: &ReservationLedger) -> bool {
        if grid.is_solid(pos) {
            return true;
        }
        let stored = grid
            .entity_at(pos)
            .map_or(false, |entity| self.accepts(entity.kind));
        stored || ledger.is_reserved(Reservation::Location(pos))
    }

    pub fn is_full(&self, grid: &Grid, ledger: &ReservationLedger) -> bool {
        self.rect
            .positions()
            .all(|pos| self.slot_taken(pos, grid, ledger))
    }

    /// First slot, in row-major order, still free for a delivery.
    pub fn open_slot(&self, grid: &Grid, ledger: &ReservationLedger) -> Option<Position> {
        self.rect
            .positions()
            .find(|pos| !self.slot_taken(*pos, grid, ledger))
    }
}
