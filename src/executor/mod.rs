//! Scenario execution engine
//!
//! Scenarios run sequentially; see [`ScenarioRunner`].

mod runner;

pub use runner::ScenarioRunner;
