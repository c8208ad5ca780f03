//! Scenario files: a scene plus boid systems to spawn into it.

use std::path::Path;

use glam::Vec3;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::agent::Agent;
use crate::collider::{Collider, Surface};
use crate::config;
use crate::effector::{Effector, Falloff, FieldKind};
use crate::error::{ConfigError, PersistError};
use crate::scene::{Scene, SceneObject};
use crate::settings::{
    AverageSpeed, AvoidCollision, BoidRule, BoidSettings, BoidState, Fight, GoalAvoid,
    ParticleTarget, RuleKind, RulesetPolicy, TargetMode,
};
use crate::simulation::{BoidSystem, BoidWorld};

/// Box the agents of a system are scattered in.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpawnRegion {
    pub center: Vec3,
    /// Half size along each axis.
    #[serde(default)]
    pub extent: Vec3,
    #[serde(default)]
    pub velocity: Vec3,
    /// Random speed added to `velocity` along each axis.
    #[serde(default)]
    pub jitter: f32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SystemSpec {
    pub name: String,
    pub count: usize,
    /// Derived from the scenario seed when absent.
    #[serde(default)]
    pub seed: Option<u32>,
    #[serde(default = "default_size")]
    pub size: f32,
    pub spawn: SpawnRegion,
    #[serde(default)]
    pub settings: BoidSettings,
}

fn default_size() -> f32 {
    1.0
}

fn default_dt() -> f32 {
    config::FIXED_DT
}

fn default_frames() -> u32 {
    config::DEFAULT_FRAMES
}

fn default_parallel() -> bool {
    true
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub seed: u64,
    #[serde(default = "default_dt")]
    pub dt: f32,
    #[serde(default = "default_frames")]
    pub frames: u32,
    #[serde(default = "default_parallel")]
    pub parallel: bool,
    #[serde(default)]
    pub scene: Scene,
    pub systems: Vec<SystemSpec>,
}

impl Scenario {
    pub fn from_json_str(text: &str) -> Result<Self, PersistError> {
        let scenario: Scenario = serde_json::from_str(text)?;
        scenario.validate()?;
        Ok(scenario)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, PersistError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| PersistError::io(path, e))?;
        let scenario = Self::from_json_str(&text)?;
        info!(
            path = %path.display(),
            systems = scenario.systems.len(),
            "scenario loaded"
        );
        Ok(scenario)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.dt > 0.0 && self.dt.is_finite()) {
            return Err(ConfigError::OutOfRange {
                field: "dt",
                expected: "finite and > 0",
                value: self.dt,
            });
        }
        self.scene.validate()?;
        for spec in &self.systems {
            spec.settings.validate()?;
            if !(spec.size > 0.0 && spec.size.is_finite()) {
                return Err(ConfigError::OutOfRange {
                    field: "size",
                    expected: "finite and > 0",
                    value: spec.size,
                });
            }
            for target in &spec.settings.targets {
                if target.system >= self.systems.len() {
                    return Err(ConfigError::UnknownTarget {
                        system: spec.name.clone(),
                        target: target.system,
                    });
                }
            }
            for (rule, object) in spec.settings.referenced_objects() {
                if self.scene.object(object).is_none() {
                    return Err(ConfigError::UnknownObject {
                        rule: rule.to_string(),
                        object: object.0,
                    });
                }
            }
        }
        Ok(())
    }

    /// Spawn every system. The same scenario always builds the same world.
    pub fn build(&self) -> BoidWorld {
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let systems = self
            .systems
            .iter()
            .map(|spec| {
                let seed = spec.seed.unwrap_or_else(|| rng.gen());
                let spawn = &spec.spawn;
                let agents = (0..spec.count)
                    .map(|_| {
                        let offset = Vec3::new(
                            rng.gen_range(-1.0..=1.0),
                            rng.gen_range(-1.0..=1.0),
                            rng.gen_range(-1.0..=1.0),
                        );
                        let jitter = Vec3::new(
                            rng.gen_range(-1.0..=1.0),
                            rng.gen_range(-1.0..=1.0),
                            rng.gen_range(-1.0..=1.0),
                        );
                        Agent::new(
                            spawn.center + spawn.extent * offset,
                            spawn.velocity + jitter * spawn.jitter,
                            spec.size,
                            &spec.settings,
                        )
                    })
                    .collect();
                BoidSystem::new(spec.name.clone(), seed, spec.settings.clone(), agents)
            })
            .collect();
        let mut scene = self.scene.clone();
        scene.reset_motion();
        BoidWorld {
            systems,
            scene,
            parallel: self.parallel,
        }
    }

    /// A starling flock circling a drifting beacon over flat ground, hunted
    /// by a few hawks.
    pub fn demo() -> Self {
        let mut scene = Scene::default();
        let ground = scene.add_object(SceneObject::new("ground", Vec3::ZERO));
        scene.colliders.push(Collider {
            object: ground,
            surface: Surface::Plane {
                offset: Vec3::ZERO,
                normal: Vec3::Z,
            },
        });
        let beacon = scene.add_object(
            SceneObject::new("beacon", Vec3::new(0.0, 0.0, 15.0)).moving(Vec3::new(1.5, 0.5, 0.0)),
        );
        scene
            .effectors
            .push(Effector::new(beacon, FieldKind::Boid, -0.6));
        scene.effectors.push(
            Effector::new(beacon, FieldKind::Turbulence { size: 8.0, seed: 3 }, 0.5).with_falloff(
                Falloff {
                    power: 1.0,
                    min_distance: Some(5.0),
                    max_distance: Some(60.0),
                },
            ),
        );

        let starlings = BoidSettings {
            allow_land: true,
            health: 1.0,
            strength: 0.05,
            aggression: 0.5,
            states: vec![BoidState::with_rules(
                "murmur",
                RulesetPolicy::Fuzzy,
                vec![
                    BoidRule::new(RuleKind::AvoidCollision(AvoidCollision {
                        with_deflectors: true,
                        ..AvoidCollision::default()
                    })),
                    BoidRule::new(RuleKind::Fight(Fight {
                        distance: 8.0,
                        flee_distance: 1.0,
                    })),
                    BoidRule::new(RuleKind::Separate),
                    BoidRule::new(RuleKind::Goal(GoalAvoid::default())),
                    BoidRule::new(RuleKind::Flock),
                    BoidRule::new(RuleKind::AverageSpeed(AverageSpeed {
                        level: 0.3,
                        ..AverageSpeed::default()
                    })),
                ],
            )],
            targets: vec![ParticleTarget {
                system: 1,
                mode: TargetMode::Enemy,
            }],
            ..BoidSettings::default()
        };

        let hawks = BoidSettings {
            air_max_speed: 14.0,
            health: 3.0,
            strength: 2.0,
            aggression: 5.0,
            accuracy: 0.7,
            range: 1.5,
            states: vec![BoidState::with_rules(
                "hunt",
                RulesetPolicy::Fuzzy,
                vec![
                    BoidRule::new(RuleKind::Fight(Fight {
                        distance: 25.0,
                        flee_distance: 0.2,
                    })),
                    BoidRule::new(RuleKind::Separate),
                    BoidRule::new(RuleKind::AverageSpeed(AverageSpeed {
                        wander: 0.3,
                        level: 0.5,
                        speed: 0.6,
                    })),
                ],
            )],
            targets: vec![ParticleTarget {
                system: 0,
                mode: TargetMode::Enemy,
            }],
            ..BoidSettings::default()
        };

        Self {
            seed: 7,
            dt: config::FIXED_DT,
            frames: config::DEFAULT_FRAMES,
            parallel: true,
            scene,
            systems: vec![
                SystemSpec {
                    name: "starlings".to_string(),
                    count: 120,
                    seed: None,
                    size: 0.3,
                    spawn: SpawnRegion {
                        center: Vec3::new(0.0, 0.0, 12.0),
                        extent: Vec3::new(10.0, 10.0, 4.0),
                        velocity: Vec3::new(3.0, 0.0, 0.0),
                        jitter: 1.0,
                    },
                    settings: starlings,
                },
                SystemSpec {
                    name: "hawks".to_string(),
                    count: 3,
                    seed: None,
                    size: 0.8,
                    spawn: SpawnRegion {
                        center: Vec3::new(-30.0, 0.0, 20.0),
                        extent: Vec3::new(5.0, 5.0, 2.0),
                        velocity: Vec3::new(6.0, 0.0, 0.0),
                        jitter: 0.5,
                    },
                    settings: hawks,
                },
            ],
        }
    }
}
