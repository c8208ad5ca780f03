//! Step driver: freezes every agent, runs the brain pass, applies combat
//! damage, then runs the body pass. Both passes read only frozen data, so
//! they run in parallel with rayon and give bit-identical results either way.

use glam::Vec3;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::agent::Agent;
use crate::brain::{self, Thought};
use crate::combat::{self, DamageIntent};
use crate::config;
use crate::physics;
use crate::reporting::StepSummary;
use crate::scene::{Scene, SceneQuery};
use crate::settings::{BoidSettings, TargetMode};
use crate::spatial::{SpatialHash, SpatialIndex};

/// Index into `BoidWorld::systems`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SystemId(pub usize);

/// What other agents may read about an agent during a step.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrozenAgent {
    pub position: Vec3,
    pub velocity: Vec3,
    pub forward_axis: Vec3,
    pub size: f32,
    pub health: f32,
    pub alive: bool,
}

/// Immutable copy of one system with a spatial index over its living agents.
#[derive(Clone, Debug)]
pub struct SystemSnapshot {
    pub agents: Vec<FrozenAgent>,
    index: SpatialHash,
    /// Per-agent fight strength of the system.
    pub strength: f32,
}

impl SystemSnapshot {
    pub fn capture(agents: &[Agent], strength: f32) -> Self {
        let frozen: Vec<FrozenAgent> = agents
            .iter()
            .map(|a| FrozenAgent {
                position: a.state.position,
                velocity: a.state.velocity,
                forward_axis: a.state.forward_axis,
                size: a.size,
                health: a.health,
                alive: a.alive,
            })
            .collect();
        let mut index = SpatialHash::new(config::SPATIAL_CELL_SIZE);
        index.rebuild(
            frozen
                .iter()
                .enumerate()
                .filter(|(_, a)| a.alive)
                .map(|(i, a)| (i, a.position)),
        );
        Self {
            agents: frozen,
            index,
            strength,
        }
    }

    pub fn get(&self, index: usize) -> Option<&FrozenAgent> {
        self.agents.get(index)
    }

    pub fn index(&self) -> &dyn SpatialIndex {
        &self.index
    }
}

/// Frozen view of a system named in `BoidSettings::targets`.
#[derive(Clone, Debug)]
pub struct TargetSnapshot {
    pub system: SystemId,
    pub mode: TargetMode,
    pub snapshot: SystemSnapshot,
}

/// Read-only inputs shared by every agent of one system step.
#[derive(Clone, Copy)]
pub struct StepContext<'a> {
    pub settings: &'a BoidSettings,
    pub scene: &'a dyn SceneQuery,
    pub own: &'a SystemSnapshot,
    pub targets: &'a [TargetSnapshot],
    pub system: SystemId,
    pub seed: u32,
    pub dt: f32,
    pub frame: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoidSystem {
    pub name: String,
    pub seed: u32,
    pub settings: BoidSettings,
    pub agents: Vec<Agent>,
}

impl BoidSystem {
    pub fn new(name: impl Into<String>, seed: u32, settings: BoidSettings, agents: Vec<Agent>) -> Self {
        Self {
            name: name.into(),
            seed,
            settings,
            agents,
        }
    }

    pub fn alive(&self) -> usize {
        self.agents.iter().filter(|a| a.alive).count()
    }
}

fn default_parallel() -> bool {
    true
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoidWorld {
    pub systems: Vec<BoidSystem>,
    pub scene: Scene,
    #[serde(default = "default_parallel")]
    pub parallel: bool,
}

fn think_one(ctx: &StepContext<'_>, index: usize, agent: &mut Agent) -> Option<Thought> {
    if !agent.alive {
        return None;
    }
    if agent.health <= 0.0 {
        agent.kill(ctx.frame);
        return None;
    }
    Some(brain::think(ctx, index, agent))
}

fn move_one(ctx: &StepContext<'_>, agent: &mut Agent, thought: Option<Thought>) {
    if let Some(thought) = thought {
        if agent.alive {
            physics::advance(ctx, agent, thought);
        }
    }
}

impl BoidWorld {
    pub fn new(scene: Scene, systems: Vec<BoidSystem>) -> Self {
        Self {
            systems,
            scene,
            parallel: true,
        }
    }

    pub fn system(&self, id: SystemId) -> Option<&BoidSystem> {
        self.systems.get(id.0)
    }

    /// Advance scene objects, then step every system in order.
    pub fn step(&mut self, dt: f32, frame: u32) -> Vec<StepSummary> {
        self.scene.advance(dt);
        let mut summaries: Vec<StepSummary> = (0..self.systems.len())
            .map(|i| self.step_all_agents(SystemId(i), dt, frame))
            .collect();
        // systems that step later can still kill agents of earlier ones
        for (summary, system) in summaries.iter_mut().zip(&self.systems) {
            summary.recount(&system.agents);
        }
        summaries
    }

    fn target_snapshots(&self, system: &BoidSystem, id: SystemId) -> Vec<TargetSnapshot> {
        system
            .settings
            .targets
            .iter()
            .filter_map(|target| match self.systems.get(target.system) {
                Some(other) => Some(TargetSnapshot {
                    system: SystemId(target.system),
                    mode: target.mode,
                    snapshot: SystemSnapshot::capture(&other.agents, other.settings.strength),
                }),
                None => {
                    warn!(
                        system = id.0,
                        target = target.system,
                        "ignoring target that names an unknown system"
                    );
                    None
                }
            })
            .collect()
    }

    /// One step of one system. Other systems are read as they currently are
    /// and only change through combat damage.
    pub fn step_all_agents(&mut self, id: SystemId, dt: f32, frame: u32) -> StepSummary {
        let Some(system) = self.systems.get(id.0) else {
            warn!(system = id.0, "step requested for unknown boid system");
            return StepSummary::empty(id, frame);
        };
        let targets = self.target_snapshots(system, id);

        let system = &mut self.systems[id.0];
        for agent in &mut system.agents {
            agent.previous = agent.state;
        }
        let own = SystemSnapshot::capture(&system.agents, system.settings.strength);

        let mut thoughts: Vec<Option<Thought>> = {
            let BoidWorld {
                systems,
                scene,
                parallel,
            } = self;
            let BoidSystem {
                settings,
                agents,
                seed,
                ..
            } = &mut systems[id.0];
            let ctx = StepContext {
                settings,
                scene: &*scene,
                own: &own,
                targets: &targets,
                system: id,
                seed: *seed,
                dt,
                frame,
            };
            if *parallel {
                agents
                    .par_iter_mut()
                    .enumerate()
                    .map(|(i, agent)| think_one(&ctx, i, agent))
                    .collect()
            } else {
                agents
                    .iter_mut()
                    .enumerate()
                    .map(|(i, agent)| think_one(&ctx, i, agent))
                    .collect()
            }
        };

        let damage: Vec<DamageIntent> = thoughts
            .iter_mut()
            .flatten()
            .flat_map(|t| std::mem::take(&mut t.damage))
            .collect();
        let report = combat::apply_damage(&mut self.systems, &damage, frame);
        if report.hits > 0 {
            trace!(system = id.0, hits = report.hits, killed = report.killed, "combat resolved");
        }

        {
            let BoidWorld {
                systems,
                scene,
                parallel,
            } = self;
            let BoidSystem {
                settings,
                agents,
                seed,
                ..
            } = &mut systems[id.0];
            let ctx = StepContext {
                settings,
                scene: &*scene,
                own: &own,
                targets: &targets,
                system: id,
                seed: *seed,
                dt,
                frame,
            };
            if *parallel {
                agents
                    .par_iter_mut()
                    .zip(thoughts.into_par_iter())
                    .for_each(|(agent, thought)| move_one(&ctx, agent, thought));
            } else {
                agents
                    .iter_mut()
                    .zip(thoughts)
                    .for_each(|(agent, thought)| move_one(&ctx, agent, thought));
            }
        }

        let system = &self.systems[id.0];
        let summary = StepSummary::collect(id, &system.name, frame, &system.agents, &report);
        debug!(
            system = %system.name,
            frame,
            alive = summary.alive,
            dying = summary.newly_dying,
            hits = summary.hits,
            "system stepped"
        );
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::LocomotionMode;
    use crate::brain::think;
    use crate::scenario::Scenario;
    use crate::settings::{
        AverageSpeed, AvoidCollision, BoidRule, BoidState, Fight, GoalAvoid, ParticleTarget,
        RuleKind, RulesetPolicy,
    };
    use crate::testing::{agent_at, ground_scene, Fixture, DT};

    fn run(mut world: BoidWorld, frames: u32) -> BoidWorld {
        for frame in 0..frames {
            world.step(DT, frame);
        }
        world
    }

    #[test]
    fn parallel_and_sequential_steps_are_bit_identical() {
        let mut parallel = Scenario::demo().build();
        parallel.parallel = true;
        let mut sequential = parallel.clone();
        sequential.parallel = false;
        let a = run(parallel, 40);
        let b = run(sequential, 40);
        assert_eq!(a.systems, b.systems);
    }

    #[test]
    fn reruns_are_identical() {
        let world = Scenario::demo().build();
        assert_eq!(run(world.clone(), 25).systems, run(world, 25).systems);
    }

    #[test]
    fn thinking_order_does_not_matter() {
        let world = run(Scenario::demo().build(), 5);
        let system = &world.systems[0];
        let mut agents = system.agents.clone();
        for agent in &mut agents {
            agent.previous = agent.state;
        }
        let fixture = Fixture::new(system.settings.clone(), &agents).with_scene(world.scene.clone());
        let ctx = fixture.ctx(5);

        let mut forward = agents.clone();
        let ahead: Vec<_> = forward
            .iter_mut()
            .enumerate()
            .map(|(i, a)| think(&ctx, i, a).intent)
            .collect();
        let mut backward = agents.clone();
        let mut behind: Vec<_> = backward
            .iter_mut()
            .enumerate()
            .rev()
            .map(|(i, a)| think(&ctx, i, a).intent)
            .collect();
        behind.reverse();
        assert_eq!(ahead, behind);
        assert_eq!(forward, backward);
    }

    #[test]
    fn agent_without_health_dies_in_place() {
        let settings = BoidSettings::default();
        let mut agents = vec![
            agent_at(Vec3::new(0.0, 0.0, 10.0), Vec3::X),
            agent_at(Vec3::new(3.0, 0.0, 10.0), Vec3::X),
        ];
        agents[0].health = 0.0;
        let mut world = BoidWorld::new(Scene::default(), vec![BoidSystem::new("flock", 3, settings, agents)]);
        let summaries = world.step(DT, 4);
        let dead = &world.systems[0].agents[0];
        assert!(!dead.alive);
        assert_eq!(dead.death_time, Some(4));
        assert_eq!(dead.state.position, Vec3::new(0.0, 0.0, 10.0));
        assert_eq!(summaries[0].newly_dying, 1);
        assert_eq!(summaries[0].alive, 1);

        // never evaluated again
        world.step(DT, 5);
        assert_eq!(world.systems[0].agents[0].state.position, Vec3::new(0.0, 0.0, 10.0));
        assert_eq!(world.systems[0].agents[0].death_time, Some(4));
    }

    #[test]
    fn kill_by_a_later_system_is_reported_for_the_victim() {
        let sparrow = BoidSettings {
            health: 0.05,
            ..BoidSettings::default()
        };
        let hawk = BoidSettings {
            strength: 2.0,
            aggression: 100.0,
            accuracy: 1.0,
            states: vec![BoidState::with_rules(
                "hunt",
                RulesetPolicy::Fuzzy,
                vec![BoidRule::new(RuleKind::Fight(Fight::default()))],
            )],
            targets: vec![ParticleTarget {
                system: 0,
                mode: TargetMode::Enemy,
            }],
            ..BoidSettings::default()
        };
        let sparrows = vec![Agent::new(Vec3::new(1.0, 0.0, 20.0), Vec3::X, 1.0, &sparrow)];
        let hawks = vec![Agent::new(Vec3::new(0.0, 0.0, 20.0), Vec3::X, 1.0, &hawk)];
        let mut world = BoidWorld::new(
            Scene::default(),
            vec![
                BoidSystem::new("sparrow", 4, sparrow, sparrows),
                BoidSystem::new("hawk", 3, hawk, hawks),
            ],
        );

        let summaries = world.step(DT, 0);
        assert_eq!(world.systems[0].agents[0].death_time, Some(0));
        assert_eq!(summaries[0].alive, 0);
        assert_eq!(summaries[0].newly_dying, 1);
        assert_eq!(summaries[0].modes.total(), 0);
        assert_eq!(summaries[1].hits, 1);
        assert_eq!(summaries[1].kills, 1);
        assert_eq!(summaries[1].newly_dying, 0);
    }

    #[test]
    fn dead_agents_are_not_indexed() {
        let mut agents = vec![agent_at(Vec3::ZERO, Vec3::X), agent_at(Vec3::X, Vec3::X)];
        agents[1].kill(0);
        let snapshot = SystemSnapshot::capture(&agents, 0.1);
        let found = snapshot.index().range_search(Vec3::ZERO, 5.0, None);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].index, 0);
        assert_eq!(snapshot.agents.len(), 2);
    }

    #[test]
    fn unknown_system_is_a_no_op() {
        let mut world = Scenario::demo().build();
        let before = world.clone();
        let summary = world.step_all_agents(SystemId(99), DT, 0);
        assert_eq!(summary.alive, 0);
        assert_eq!(world, before);
    }

    fn mixed_settings(variant: usize, system: usize, rock: crate::scene::ObjectId) -> BoidSettings {
        let rules = vec![
            BoidRule::new(RuleKind::Goal(GoalAvoid {
                object: Some(rock),
                ..GoalAvoid::default()
            })),
            BoidRule::new(RuleKind::AvoidCollision(AvoidCollision {
                with_deflectors: true,
                ..AvoidCollision::default()
            })),
            BoidRule::new(RuleKind::Fight(Fight::default())),
            BoidRule::new(RuleKind::Separate),
            BoidRule::new(RuleKind::Flock),
            BoidRule::new(RuleKind::AverageSpeed(AverageSpeed {
                level: 0.5,
                ..AverageSpeed::default()
            })),
        ];
        let policy = [RulesetPolicy::Fuzzy, RulesetPolicy::Random, RulesetPolicy::Averaged][variant % 3];
        BoidSettings {
            allow_flight: variant % 2 == 0,
            allow_land: variant % 4 < 2 || variant % 2 == 1,
            allow_climb: variant % 3 != 1,
            land_jump_speed: if variant % 5 == 0 { 6.0 } else { 0.0 },
            damping: 0.3,
            states: vec![BoidState::with_rules("mixed", policy, rules)],
            targets: vec![ParticleTarget {
                system: 1 - system,
                mode: TargetMode::Enemy,
            }],
            ..BoidSettings::default()
        }
    }

    #[test]
    fn mixed_options_only_take_legal_mode_edges() {
        for variant in 0..6 {
            let mut scene = ground_scene();
            let rock = scene.add_object(crate::scene::SceneObject::new("rock", Vec3::new(0.0, 0.0, 3.0)));
            scene.colliders.push(crate::collider::Collider {
                object: rock,
                surface: crate::collider::Surface::Sphere {
                    offset: Vec3::ZERO,
                    radius: 2.0,
                },
            });
            scene.effectors.push(
                crate::effector::Effector::new(rock, crate::effector::FieldKind::Boid, -1.0)
                    .with_shape(crate::effector::EffectorShape::Surface),
            );
            let systems = (0..2)
                .map(|s| {
                    let agents = (0..12)
                        .map(|i| {
                            let angle = i as f32 * 0.5 + s as f32;
                            agent_at(
                                Vec3::new(6.0 * angle.cos(), 6.0 * angle.sin(), 1.0 + (i % 4) as f32),
                                Vec3::new(-angle.sin(), angle.cos(), 0.0) * 2.0,
                            )
                        })
                        .collect();
                    BoidSystem::new(format!("s{s}"), 11 + s as u32, mixed_settings(variant + s, s, rock), agents)
                })
                .collect();
            let mut world = BoidWorld::new(scene, systems);
            for frame in 0..60 {
                world.step(DT, frame);
                for agent in world.systems.iter().flat_map(|s| &s.agents) {
                    assert!(agent.state.position.is_finite());
                    assert!((agent.state.forward_axis.length() - 1.0).abs() < 1e-3);
                    assert!((agent.apparent_gravity.length() - 1.0).abs() < 1e-3);
                    if agent.alive {
                        assert_ne!(agent.mode, LocomotionMode::Liftoff);
                    }
                }
            }
        }
    }
}
