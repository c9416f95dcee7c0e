use crate::grid::EntityId;
use crate::unit::Unit;

use super::{TaskContext, TaskError, TaskFailure, TaskStatus};

/// Put the held entity down on the unit's tile.
#[derive(Debug)]
pub struct DropEntity {
    entity: EntityId,
}

impl DropEntity {
    pub fn new(entity: EntityId) -> Self {
        Self { entity }
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
        if ctx.grid.entity_at(unit.position).is_some() {
            return Ok(TaskStatus::Failed(TaskFailure::Blocked));
        }
        ctx.grid.place_entity(self.entity, unit.position)?;
        unit.held = None;
        Ok(TaskStatus::Finished)
    }
}
