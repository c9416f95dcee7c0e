//! Task primitives
//!
//! A task is a small single-shot state machine enacted at most once per turn
//! by the unit whose job owns it. Each enact reports whether the task is
//! still running, finished, or failed in an expected way; misuse of a task
//! surfaces as a [`TaskError`].

mod build;
mod contribute;
mod drop;
mod eat;
mod go;
mod go_beside;
mod go_to_spot;
mod mine;
mod take;
mod trade;
mod wait;

use rand::RngCore;
use serde::Serialize;
use thiserror::Error;

use crate::config::SimulationRules;
use crate::geometry::Position;
use crate::grid::{EntityId, GridError, Grid};
use crate::partition::PartitionCache;
use crate::stockpile::StockpileId;
use crate::team::{DesignationId, Team};
use crate::unit::{Unit, UnitId};

pub use build::Build;
pub use contribute::Contribute;
pub use drop::DropEntity;
pub use eat::Eat;
pub use go::Go;
pub use go_beside::GoBeside;
pub use go_to_spot::{GoToSpot, SpotFilter};
pub use mine::Mine;
pub use take::Take;
pub use trade::{Stow, Trade};
pub use wait::Wait;

/// Everything a task may touch while it is enacted.
pub struct TaskContext<'a> {
    pub grid: &'a mut Grid,
    pub team: Option<&'a mut Team>,
    pub partitions: &'a PartitionCache,
    pub rules: &'a SimulationRules,
    pub rng: &'a mut dyn RngCore,
    /// Positions of the other units.
    pub occupied: &'a [Position],
}

impl TaskContext<'_> {
    pub fn team(&self) -> Option<&Team> {
        self.team.as_deref()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskFailure {
    /// The way or the destination is obstructed.
    Blocked,
    /// The item the task works on was not where it should be.
    NotFound,
    /// The work was cut short, e.g. the food walked off.
    Interrupted,
    /// Nothing in the world satisfies the task.
    Impossible,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Running,
    Finished,
    Failed(TaskFailure),
}

#[derive(Debug, Error)]
pub enum TaskError {
    #[error("task enacted after it had already settled")]
    AlreadyFinished,
    #[error("{unit} cannot reach ({}, {})", .target.x, .target.y)]
    Unreachable { unit: UnitId, target: Position },
    #[error("{unit} is too far from ({}, {})", .target.x, .target.y)]
    OutOfRange { unit: UnitId, target: Position },
    #[error("{unit} does not hold {entity}")]
    NotHolding { unit: UnitId, entity: EntityId },
    #[error("{unit} already holds {held}")]
    HandsFull { unit: UnitId, held: EntityId },
    #[error("{entity} is not under {unit}")]
    Misplaced { unit: UnitId, entity: EntityId },
    #[error("{unit} belongs to no team")]
    NoTeam { unit: UnitId },
    #[error(transparent)]
    Grid(#[from] GridError),
}

/// Where a movement step is headed. Entity targets are resolved to the
/// entity's position when the step starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Tile(Position),
    Entity(EntityId),
}

/// Description of a task to instantiate once its turn in a job comes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Go { target: Target, delay: u32 },
    GoBeside { target: Position, delay: u32 },
    GoToSpot { filter: SpotFilter, delay: u32 },
    Mine(Position),
    Take(EntityId),
    Drop(EntityId),
    Trade {
        entity: EntityId,
        occupier: EntityId,
    },
    Stow {
        entity: EntityId,
        slot: Position,
        stockpile: StockpileId,
    },
    Eat(EntityId),
    Wait(u32),
    Contribute {
        entity: EntityId,
        supply: DesignationId,
    },
    Build(Position),
}

/// Result of instantiating an action.
pub enum Started {
    Ready(Task),
    /// The task had nothing left to do.
    Done,
    Failed(TaskFailure),
}

enum TaskKind {
    Go(Go),
    GoBeside(GoBeside),
    GoToSpot(GoToSpot),
    Mine(Mine),
    Take(Take),
    Drop(DropEntity),
    Trade(Trade),
    Stow(Stow),
    Eat(Eat),
    Wait(Wait),
    Contribute(Contribute),
    Build(Build),
}

pub struct Task {
    kind: TaskKind,
    settled: bool,
}

impl Task {
    fn new(kind: TaskKind) -> Self {
        Self {
            kind,
            settled: false,
        }
    }

    pub fn name(&self) -> &'static str {
        match self.kind {
            TaskKind::Go(_) => "go",
            TaskKind::GoBeside(_) => "go_beside",
            TaskKind::GoToSpot(_) => "go_to_spot",
            TaskKind::Mine(_) => "mine",
            TaskKind::Take(_) => "take",
            TaskKind::Drop(_) => "drop",
            TaskKind::Trade(_) => "trade",
            TaskKind::Stow(_) => "stow",
            TaskKind::Eat(_) => "eat",
            TaskKind::Wait(_) => "wait",
            TaskKind::Contribute(_) => "contribute",
            TaskKind::Build(_) => "build",
        }
    }

    pub fn is_settled(&self) -> bool {
        self.settled
    }

    pub fn enact(&mut self, unit: &mut Unit, ctx: &mut TaskContext<'_>) -> Result<TaskStatus, TaskError> {
        if self.settled {
            return Err(TaskError::AlreadyFinished);
        }
        let status = match &mut self.kind {
            TaskKind::Go(task) => task.enact(unit, ctx)?,
            TaskKind::GoBeside(task) => task.enact(unit, ctx)?,
            TaskKind::GoToSpot(task) => task.enact(unit, ctx)?,
            TaskKind::Mine(task) => task.enact(unit, ctx)?,
            TaskKind::Take(task) => task.enact(unit, ctx)?,
            TaskKind::Drop(task) => task.enact(unit, ctx)?,
            TaskKind::Trade(task) => task.enact(unit, ctx)?,
            TaskKind::Stow(task) => task.enact(unit, ctx)?,
            TaskKind::Eat(task) => task.enact(unit, ctx)?,
            TaskKind::Wait(task) => task.enact(),
            TaskKind::Contribute(task) => task.enact(unit, ctx)?,
            TaskKind::Build(task) => task.enact(unit, ctx)?,
        };
        if status != TaskStatus::Running {
            self.settled = true;
        }
        Ok(status)
    }
}

impl Action {
    /// Instantiate the task for this action from the unit's current state.
    pub fn start(&self, unit: &Unit, ctx: &mut TaskContext<'_>) -> Result<Started, TaskError> {
        let kind = match *self {
            Action::Go { target, delay } => {
                let destination = match target {
                    Target::Tile(pos) => pos,
                    Target::Entity(id) => {
                        match ctx.grid.entity(id).and_then(|entity| entity.location) {
                            Some(pos) => pos,
                            None => return Ok(Started::Failed(TaskFailure::NotFound)),
                        }
                    }
                };
                if !ctx.partitions.is_reachable(unit, destination) {
                    return Ok(Started::Failed(TaskFailure::Blocked));
                }
                let go = Go::new(unit, destination, delay, ctx)?;
                if go.arrived(unit, ctx.grid) {
                    return Ok(Started::Done);
                }
                TaskKind::Go(go)
            }
            Action::GoBeside { target, delay } => {
                if !ctx.partitions.is_reachable(unit, target) {
                    return Ok(Started::Failed(TaskFailure::Blocked));
                }
                let go = GoBeside::new(unit, target, delay, ctx)?;
                if go.arrived(unit) {
                    return Ok(Started::Done);
                }
                TaskKind::GoBeside(go)
            }
            Action::GoToSpot { filter, delay } => match GoToSpot::search(unit, filter, delay, ctx) {
                Some(go) if go.arrived(unit) => return Ok(Started::Done),
                Some(go) => TaskKind::GoToSpot(go),
                None => return Ok(Started::Failed(TaskFailure::Impossible)),
            },
            Action::Mine(target) => TaskKind::Mine(Mine::new(unit, target, ctx.rules.work_ticks)?),
            Action::Take(entity) => TaskKind::Take(Take::new(entity)),
            Action::Drop(entity) => TaskKind::Drop(DropEntity::new(entity)),
            Action::Trade { entity, occupier } => TaskKind::Trade(Trade::new(entity, occupier)),
            Action::Stow {
                entity,
                slot,
                stockpile,
            } => TaskKind::Stow(Stow::new(entity, slot, stockpile)),
            Action::Eat(entity) => TaskKind::Eat(Eat::new(entity, ctx.rules.work_ticks)),
            Action::Wait(duration) => TaskKind::Wait(Wait::new(duration)),
            Action::Contribute { entity, supply } => {
                TaskKind::Contribute(Contribute::new(entity, supply))
            }
            Action::Build(target) => {
                TaskKind::Build(Build::new(unit, target, ctx.rules.work_ticks)?)
            }
        };
        Ok(Started::Ready(Task::new(kind)))
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Fixture for driving tasks by hand.

    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;
    use crate::team::TeamId;
    use crate::tiles;
    use crate::unit::Archetype;

    pub struct Bench {
        pub grid: Grid,
        pub team: Team,
        pub partitions: PartitionCache,
        pub rules: SimulationRules,
        pub rng: ChaCha8Rng,
        pub units: Vec<Unit>,
    }

    impl Bench {
        pub fn new(grid: Grid) -> Self {
            Self {
                grid,
                team: Team::new(TeamId(0), "test"),
                partitions: PartitionCache::new(),
                rules: SimulationRules::default(),
                rng: ChaCha8Rng::seed_from_u64(1),
                units: Vec::new(),
            }
        }

        pub fn floor(width: i32, height: i32) -> Self {
            Self::new(Grid::filled(width, height, tiles::FLOOR))
        }

        pub fn add_unit(&mut self, x: i32, y: i32) -> usize {
            let id = UnitId(self.units.len() as u32);
            self.units.push(Unit::new(
                id,
                Archetype::Penguin,
                Position::new(x, y),
                Some(self.team.id),
            ));
            self.refresh();
            self.units.len() - 1
        }

        pub fn refresh(&mut self) {
            self.grid.take_tile_changes();
            self.partitions.refresh_all(&self.grid, &mut self.units);
        }

        /// Start `action` for unit `index`, expecting a ready task.
        pub fn start(&mut self, index: usize, action: Action) -> Task {
            match self.try_start(index, action) {
                Ok(Started::Ready(task)) => task,
                Ok(Started::Done) => panic!("{action:?} finished on start"),
                Ok(Started::Failed(failure)) => panic!("{action:?} failed on start: {failure:?}"),
                Err(err) => panic!("{action:?} could not start: {err}"),
            }
        }

        pub fn try_start(&mut self, index: usize, action: Action) -> Result<Started, TaskError> {
            let occupied: Vec<Position> = Vec::new();
            let mut ctx = TaskContext {
                grid: &mut self.grid,
                team: Some(&mut self.team),
                partitions: &self.partitions,
                rules: &self.rules,
                rng: &mut self.rng,
                occupied: &occupied,
            };
            action.start(&self.units[index], &mut ctx)
        }

        pub fn enact(&mut self, index: usize, task: &mut Task) -> Result<TaskStatus, TaskError> {
            self.enact_among(index, task, &[])
        }

        pub fn enact_among(
            &mut self,
            index: usize,
            task: &mut Task,
            occupied: &[Position],
        ) -> Result<TaskStatus, TaskError> {
            let mut ctx = TaskContext {
                grid: &mut self.grid,
                team: Some(&mut self.team),
                partitions: &self.partitions,
                rules: &self.rules,
                rng: &mut self.rng,
                occupied,
            };
            task.enact(&mut self.units[index], &mut ctx)
        }

        /// Enact until the task settles, returning the final status and the
        /// number of enacts it took.
        pub fn run(&mut self, index: usize, task: &mut Task, limit: usize) -> (TaskStatus, usize) {
            for turn in 1..=limit {
                let status = self.enact(index, task).expect("task enact");
                if status != TaskStatus::Running {
                    return (status, turn);
                }
            }
            panic!("task still running after {limit} enacts");
        }
    }
}
