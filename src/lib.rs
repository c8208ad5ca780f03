//! Boid flocking core: rule-driven steering, locomotion modes and a
//! deterministic stepper for several interacting boid systems.

pub mod agent;
pub mod brain;
pub mod collider;
pub mod combat;
pub mod config;
pub mod effector;
pub mod error;
pub mod frand;
pub mod locomotion;
pub mod math;
pub mod physics;
pub mod reporting;
pub mod rules;
pub mod save_load;
pub mod scenario;
pub mod scene;
pub mod settings;
pub mod simulation;
pub mod spatial;

#[cfg(test)]
mod testing;

pub use agent::{Agent, AgentState, LocomotionMode};
pub use error::{ConfigError, PersistError};
pub use reporting::StepSummary;
pub use scenario::Scenario;
pub use scene::Scene;
pub use settings::BoidSettings;
pub use simulation::{BoidSystem, BoidWorld, SystemId};
