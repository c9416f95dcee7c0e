use crate::grid::EntityId;
use crate::team::DesignationId;
use crate::unit::Unit;

use super::{TaskContext, TaskError, TaskStatus};

/// Hand the held entity over to a construction site, consuming it.
#[derive(Debug)]
pub struct Contribute {
    entity: EntityId,
    supply: DesignationId,
}

impl Contribute {
    pub fn new(entity: EntityId, supply: DesignationId) -> Self {
        Self { entity, supply }
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
        let Some(team) = ctx.team.as_deref_mut() else {
            return Err(TaskError::NoTeam { unit: unit.id });
        };
        ctx.grid.destroy_entity(self.entity)?;
        unit.held = None;
        team.mark_done(self.supply);
        Ok(TaskStatus::Finished)
    }
}
