use crate::geometry::Position;
use crate::grid::EntityId;
use crate::stockpile::StockpileId;
use crate::team::Reservation;
use crate::unit::Unit;

use super::drop::DropEntity;
use super::{TaskContext, TaskError, TaskFailure, TaskStatus};

/// Swap the held entity with the one lying under the unit.
#[derive(Debug)]
pub struct Trade {
    entity: EntityId,
    occupier: EntityId,
}

impl Trade {
    pub fn new(entity: EntityId, occupier: EntityId) -> Self {
        Self { entity, occupier }
    }

    pub(super) fn enact(
        &mut self,
        unit: &mut Unit,
        ctx: &mut TaskContext<'_>,
    ) -> Result<TaskStatus, TaskError> {
        if unit.held != Some(self.entity) {
            return Err(TaskError::NotHolding {
                unit: unit.id,
                entity: self.entity,
            });
        }
        if ctx.grid.entity_at(unit.position).map(|e| e.id) != Some(self.occupier) {
            return Err(TaskError::Misplaced {
                unit: unit.id,
                entity: self.occupier,
            });
        }
        ctx.grid.lift_entity(self.occupier)?;
        ctx.grid.place_entity(self.entity, unit.position)?;
        unit.held = Some(self.occupier);
        Ok(TaskStatus::Finished)
    }
}

/// Deliver the held entity into a stockpile slot. An empty slot takes a
/// plain drop; a slot cluttered with an unreserved item the stockpile does
/// not accept is swapped, leaving the unit holding the clutter.
#[derive(Debug)]
pub struct Stow {
    entity: EntityId,
    slot: Position,
    stockpile: StockpileId,
}

impl Stow {
    pub fn new(entity: EntityId, slot: Position, stockpile: StockpileId) -> Self {
        Self {
            entity,
            slot,
            stockpile,
        }
    }

    pub(super) fn enact(
        &mut self,
        unit: &mut Unit,
        ctx: &mut TaskContext<'_>,
    ) -> Result<TaskStatus, TaskError> {
        if unit.position != self.slot {
            return Ok(TaskStatus::Failed(TaskFailure::Blocked));
        }
        let occupant = ctx.grid.entity_at(self.slot).map(|e| (e.id, e.kind));
        let Some((occupier, kind)) = occupant else {
            return DropEntity::new(self.entity).enact(unit, ctx);
        };
        let swappable = ctx.team().map_or(false, |team| {
            let foreign = team
                .stockpile(self.stockpile)
                .map_or(false, |pile| !pile.accepts(kind));
            foreign && !team.ledger().is_reserved(Reservation::Entity(occupier))
        });
        if !swappable {
            return Ok(TaskStatus::Failed(TaskFailure::Blocked));
        }
        Trade::new(self.entity, occupier).enact(unit, ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Rect;
    use crate::grid::{EntityKind, Grid};
    use crate::task::testing::Bench;
    use crate::task::Action;
    use crate::tiles;

    fn holding_bench(held_kind: EntityKind) -> (Bench, usize, EntityId, StockpileId) {
        let mut bench = Bench::floor(4, 4);
        let grid = Grid::filled(4, 4, tiles::FLOOR);
        let pile = bench
            .team
            .add_stockpile(&grid, Rect::new(2, 2, 1, 1), [EntityKind::Fish])
            .unwrap();
        let held = bench.grid.spawn_entity(held_kind, Position::new(0, 0)).unwrap();
        bench.grid.lift_entity(held).unwrap();
        let unit = bench.add_unit(2, 2);
        bench.units[unit].held = Some(held);
        (bench, unit, held, pile)
    }

    fn stow(entity: EntityId, pile: StockpileId) -> Action {
        Action::Stow {
            entity,
            slot: Position::new(2, 2),
            stockpile: pile,
        }
    }

    #[test]
    fn test_stow_into_empty_slot_drops() {
        let (mut bench, unit, fish, pile) = holding_bench(EntityKind::Fish);
        let mut task = bench.start(unit, stow(fish, pile));
        assert_eq!(bench.enact(unit, &mut task).unwrap(), TaskStatus::Finished);
        assert_eq!(bench.units[unit].held, None);
        assert_eq!(bench.grid.entity_at(Position::new(2, 2)).map(|e| e.id), Some(fish));
    }

    #[test]
    fn test_stow_swaps_out_clutter() {
        let (mut bench, unit, fish, pile) = holding_bench(EntityKind::Fish);
        let rock = bench.grid.spawn_entity(EntityKind::Rock, Position::new(2, 2)).unwrap();
        let mut task = bench.start(unit, stow(fish, pile));
        assert_eq!(bench.enact(unit, &mut task).unwrap(), TaskStatus::Finished);
        assert_eq!(bench.units[unit].held, Some(rock));
        assert_eq!(bench.grid.entity_at(Position::new(2, 2)).map(|e| e.id), Some(fish));
        assert!(bench.grid.verify_mirror().is_ok());
    }

    #[test]
    fn test_stow_blocked_by_reserved_clutter() {
        let (mut bench, unit, fish, pile) = holding_bench(EntityKind::Fish);
        let rock = bench.grid.spawn_entity(EntityKind::Rock, Position::new(2, 2)).unwrap();
        bench.team.ledger_mut().reserve(Reservation::Entity(rock)).unwrap();
        let mut task = bench.start(unit, stow(fish, pile));
        assert_eq!(
            bench.enact(unit, &mut task).unwrap(),
            TaskStatus::Failed(TaskFailure::Blocked)
        );
    }

    #[test]
    fn test_stow_blocked_by_accepted_item() {
        let (mut bench, unit, fish, pile) = holding_bench(EntityKind::Fish);
        bench.grid.spawn_entity(EntityKind::Fish, Position::new(2, 2)).unwrap();
        let mut task = bench.start(unit, stow(fish, pile));
        assert_eq!(
            bench.enact(unit, &mut task).unwrap(),
            TaskStatus::Failed(TaskFailure::Blocked)
        );
        assert_eq!(bench.units[unit].held, Some(fish));
    }
}
