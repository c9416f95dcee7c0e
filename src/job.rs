//! Jobs: ordered queues of task steps with per-step failure recovery

use std::collections::VecDeque;
use std::fmt;

use serde::Serialize;

use crate::task::{Action, Started, Task, TaskContext, TaskError, TaskFailure, TaskStatus};
use crate::team::{DesignationId, LedgerError, Reservation, ReservationLedger, Team};
use crate::unit::Unit;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    Eat,
    Mine,
    Supply,
    Build,
    Haul,
    Clean,
    Dump,
    Wander,
    Brood,
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JobKind::Eat => "eat",
            JobKind::Mine => "mine",
            JobKind::Supply => "supply",
            JobKind::Build => "build",
            JobKind::Haul => "haul",
            JobKind::Clean => "clean",
            JobKind::Dump => "dump",
            JobKind::Wander => "wander",
            JobKind::Brood => "brood",
        };
        f.write_str(name)
    }
}

/// What to do when a step fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Recovery {
    /// Release the job's reservations and forget the job.
    Abort,
    /// Release the job's reservations and carry the held item to a dump site.
    Dump,
    /// Release the job's reservations and keep holding the item.
    Hold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    pub action: Action,
    pub on_failure: Recovery,
}

struct ActiveStep {
    task: Task,
    on_failure: Recovery,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobProgress {
    Running,
    Completed,
    Failed {
        failure: TaskFailure,
        recovery: Recovery,
    },
}

pub struct Job {
    kind: JobKind,
    steps: VecDeque<Step>,
    current: Option<ActiveStep>,
    reservations: Vec<Reservation>,
    designation: Option<DesignationId>,
}

impl Job {
    pub fn new(kind: JobKind) -> Self {
        Self {
            kind,
            steps: VecDeque::new(),
            current: None,
            reservations: Vec::new(),
            designation: None,
        }
    }

    pub fn then(mut self, action: Action, on_failure: Recovery) -> Self {
        self.steps.push_back(Step { action, on_failure });
        self
    }

    /// Reserve `reservation` in `ledger` on behalf of this job.
    pub fn claim(
        mut self,
        ledger: &mut ReservationLedger,
        reservation: Reservation,
    ) -> Result<Self, LedgerError> {
        ledger.reserve(reservation)?;
        self.reservations.push(reservation);
        Ok(self)
    }

    /// Designation marked done when the job completes.
    pub fn fulfilling(mut self, designation: DesignationId) -> Self {
        self.designation = Some(designation);
        self
    }

    pub fn kind(&self) -> JobKind {
        self.kind
    }

    pub fn reservations(&self) -> &[Reservation] {
        &self.reservations
    }

    pub fn designation(&self) -> Option<DesignationId> {
        self.designation
    }

    pub fn pending_steps(&self) -> usize {
        self.steps.len()
    }

    pub fn current_task(&self) -> Option<&'static str> {
        self.current.as_ref().map(|step| step.task.name())
    }

    /// Start the first step. Steps with nothing to do are skipped through.
    pub fn begin(&mut self, unit: &mut Unit, ctx: &mut TaskContext<'_>) -> Result<JobProgress, TaskError> {
        self.advance(unit, ctx)
    }

    /// Enact the current step once. A finished step hands over to the next,
    /// which is started now but enacted only on the following turn.
    pub fn turn(&mut self, unit: &mut Unit, ctx: &mut TaskContext<'_>) -> Result<JobProgress, TaskError> {
        let Some(step) = self.current.as_mut() else {
            return self.advance(unit, ctx);
        };
        match step.task.enact(unit, ctx)? {
            TaskStatus::Running => Ok(JobProgress::Running),
            TaskStatus::Finished => {
                self.current = None;
                self.advance(unit, ctx)
            }
            TaskStatus::Failed(failure) => {
                let recovery = step.on_failure;
                self.current = None;
                self.steps.clear();
                Ok(JobProgress::Failed { failure, recovery })
            }
        }
    }

    fn advance(&mut self, unit: &mut Unit, ctx: &mut TaskContext<'_>) -> Result<JobProgress, TaskError> {
        while let Some(step) = self.steps.pop_front() {
            match step.action.start(unit, ctx)? {
                Started::Ready(task) => {
                    self.current = Some(ActiveStep {
                        task,
                        on_failure: step.on_failure,
                    });
                    return Ok(JobProgress::Running);
                }
                Started::Done => continue,
                Started::Failed(failure) => {
                    self.steps.clear();
                    return Ok(JobProgress::Failed {
                        failure,
                        recovery: step.on_failure,
                    });
                }
            }
        }
        Ok(JobProgress::Completed)
    }

    /// Give back every reservation; on completion also mark the job's
    /// designation done.
    pub fn release(&mut self, team: Option<&mut Team>, completed: bool) -> Result<(), LedgerError> {
        let Some(team) = team else {
            self.reservations.clear();
            return Ok(());
        };
        for reservation in self.reservations.drain(..) {
            team.ledger_mut().relinquish(reservation)?;
        }
        if completed {
            if let Some(designation) = self.designation {
                team.mark_done(designation);
            }
        }
        Ok(())
    }
}
