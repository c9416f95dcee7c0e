mod dispatch;
mod housekeeping;
pub mod job_search;

pub use dispatch::{DispatchError, DispatchSystem};
pub use housekeeping::HousekeepingSystem;
