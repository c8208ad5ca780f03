use std::f32::consts::PI;

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::math::{normalize_or, orientation_from_axes};
use crate::scene::ObjectId;
use crate::settings::BoidSettings;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocomotionMode {
    OnLand,
    #[default]
    InAir,
    Falling,
    Climbing,
    Liftoff,
}

impl LocomotionMode {
    pub const ALL: [LocomotionMode; 5] = [
        LocomotionMode::OnLand,
        LocomotionMode::InAir,
        LocomotionMode::Falling,
        LocomotionMode::Climbing,
        LocomotionMode::Liftoff,
    ];

    pub fn is_grounded(self) -> bool {
        matches!(self, LocomotionMode::OnLand | LocomotionMode::Climbing)
    }

    /// Allowed mode changes. Climbing only ever returns to land.
    pub fn can_transition_to(self, next: LocomotionMode) -> bool {
        use LocomotionMode::*;
        self == next
            || matches!(
                (self, next),
                (OnLand, Liftoff | Falling | Climbing)
                    | (Liftoff, InAir)
                    | (InAir, OnLand | Climbing | Falling)
                    | (Falling, OnLand | Climbing | InAir)
                    | (Climbing, OnLand)
            )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AgentState {
    pub position: Vec3,
    pub velocity: Vec3,
    pub orientation: Quat,
    /// Unit heading.
    pub forward_axis: Vec3,
}

impl Default for AgentState {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            velocity: Vec3::ZERO,
            orientation: Quat::IDENTITY,
            forward_axis: Vec3::X,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    /// Written by the current step.
    pub state: AgentState,
    /// Frozen copy of the last step; every rule reads this.
    pub previous: AgentState,
    pub size: f32,
    pub mass: f32,
    pub health: f32,
    pub mode: LocomotionMode,
    /// Object currently stood on or climbed.
    pub ground: Option<ObjectId>,
    /// Unit "down" as felt by the agent.
    pub apparent_gravity: Vec3,
    pub smoothed_acceleration: Vec3,
    /// Unit wander memory in the agent frame.
    pub wander: Vec3,
    pub alive: bool,
    pub death_time: Option<u32>,
    pub state_index: usize,
}

impl Agent {
    pub fn new(position: Vec3, velocity: Vec3, size: f32, settings: &BoidSettings) -> Self {
        let forward = normalize_or(velocity, Vec3::X);
        let state = AgentState {
            position,
            velocity,
            orientation: orientation_from_axes(forward, Vec3::Z, true),
            forward_axis: forward,
        };
        Self {
            state,
            previous: state,
            size,
            mass: settings.mass_for(size),
            health: settings.health,
            mode: LocomotionMode::InAir,
            ground: None,
            apparent_gravity: -Vec3::Z,
            smoothed_acceleration: Vec3::ZERO,
            wander: forward,
            alive: true,
            death_time: None,
            state_index: 0,
        }
    }

    /// Change locomotion mode along an allowed edge.
    pub fn set_mode(&mut self, next: LocomotionMode) {
        if self.mode == next {
            return;
        }
        debug_assert!(
            self.mode.can_transition_to(next),
            "illegal locomotion transition {:?} -> {:?}",
            self.mode,
            next
        );
        trace!(from = ?self.mode, to = ?next, "mode transition");
        self.mode = next;
    }

    /// Flag as dying; a dead agent is never evaluated again.
    pub fn kill(&mut self, frame: u32) {
        if self.alive {
            self.alive = false;
            self.death_time = Some(frame);
        }
    }
}

/// Kinematic limits for one agent in one step, scaled by relative health.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoidLimits {
    pub max_speed: f32,
    pub max_acceleration: f32,
    /// Radians per step.
    pub max_angular_velocity: f32,
    pub min_speed: f32,
    pub personal_space: f32,
    pub jump_speed: f32,
}

impl BoidLimits {
    pub fn for_agent(settings: &BoidSettings, agent: &Agent) -> Self {
        let h = if settings.health > 0.0 {
            (agent.health / settings.health).max(0.0)
        } else {
            0.0
        };
        if agent.mode.is_grounded() {
            let max_speed = settings.land_max_speed * h;
            Self {
                max_speed,
                max_acceleration: settings.land_max_acc * max_speed,
                max_angular_velocity: settings.land_max_ave * PI * h,
                min_speed: 0.0,
                personal_space: settings.land_personal_space,
                jump_speed: settings.land_jump_speed * h,
            }
        } else {
            let max_speed = settings.air_max_speed * h;
            Self {
                max_speed,
                max_acceleration: settings.air_max_acc * max_speed,
                max_angular_velocity: settings.air_max_ave * PI * h,
                min_speed: settings.air_min_speed * settings.air_max_speed,
                personal_space: settings.air_personal_space,
                jump_speed: 0.0,
            }
        }
    }
}
