use super::TaskStatus;

/// Idle in place for a number of turns.
#[derive(Debug)]
pub struct Wait {
    duration: u32,
    elapsed: u32,
}

impl Wait {
    pub fn new(duration: u32) -> Self {
        Self {
            duration,
            elapsed: 0,
        }
    }

    pub(super) fn enact(&mut self) -> TaskStatus {
        self.elapsed += 1;
        if self.elapsed >= self.duration {
            TaskStatus::Finished
        } else {
            TaskStatus::Running
        }
    }
}
