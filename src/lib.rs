pub mod config;
pub mod engine;
pub mod geometry;
pub mod grid;
pub mod job;
pub mod logging;
pub mod partition;
pub mod pathfinding;
pub mod rng;
pub mod scenario;
pub mod snapshot;
pub mod stockpile;
pub mod systems;
pub mod task;
pub mod team;
pub mod tiles;
pub mod unit;
pub mod world;

pub use engine::{Engine, EngineBuilder, EngineSettings};
pub use scenario::{Scenario, ScenarioLoader};
pub use world::{World, WorldSnapshot};
