//! Steering rules. Each reads only frozen state and returns a wanted
//! velocity, or `None` when it has nothing to say.

use glam::Vec3;

use crate::agent::LocomotionMode;
use crate::brain::{Brain, GoalTarget, SteeringIntent};
use crate::collider::Ray;
use crate::combat;
use crate::config::{
    COLLISION_TIME_HORIZON, EPSILON, FLOCK_NEIGHBORS, HEAD_ON_DOT, LEADER_BLOCK_HORIZON,
    LEADER_STILL_SPEED_SQ, WANDER_HEADING_WEIGHT,
};
use crate::effector::{EffectorData, EffectorShape};
use crate::math::{normalize_len, normalize_or, project};
use crate::scene::{ObjectId, SceneQuery};
use crate::settings::{AverageSpeed, AvoidCollision, BoidRule, FollowLeader, GoalAvoid, RuleKind};
use crate::simulation::SystemSnapshot;

pub fn evaluate(rule: &BoidRule, brain: &mut Brain<'_, '_>) -> Option<SteeringIntent> {
    match &rule.kind {
        RuleKind::None => None,
        RuleKind::Goal(params) => goal_avoid(params, false, brain),
        RuleKind::Avoid(params) => goal_avoid(params, true, brain),
        RuleKind::AvoidCollision(params) => avoid_collision(params, brain),
        RuleKind::Separate => separate(brain),
        RuleKind::Flock => flock(brain),
        RuleKind::FollowLeader(params) => follow_leader(params, brain),
        RuleKind::AverageSpeed(params) => average_speed(params, brain),
        RuleKind::Fight(params) => combat::evaluate_fight(params, brain),
    }
}

fn intent_along(direction: Vec3) -> SteeringIntent {
    SteeringIntent {
        direction,
        speed: direction.length(),
    }
}

struct Candidate {
    object: ObjectId,
    data: EffectorData,
    priority: f32,
    surface: bool,
}

fn named_target(scene: &dyn SceneQuery, object: ObjectId, point: Vec3, mul: f32) -> Option<Candidate> {
    match scene.effectors().iter().find(|e| e.object == object) {
        Some(effector) => {
            let data = scene.effector_data(effector, point)?;
            let priority = if effector.is_boid_field() {
                mul * effector.strength * effector.falloff.at(data.distance)
            } else {
                1.0
            };
            Some(Candidate {
                object,
                data,
                priority,
                surface: effector.shape == EffectorShape::Surface,
            })
        }
        None => Some(Candidate {
            object,
            data: scene.object_data(object, point)?,
            priority: 1.0,
            surface: false,
        }),
    }
}

fn strongest_field(
    scene: &dyn SceneQuery,
    point: Vec3,
    mul: f32,
    skip: Option<ObjectId>,
) -> Option<Candidate> {
    let mut best: Option<Candidate> = None;
    for effector in scene.effectors().iter().filter(|e| e.is_boid_field()) {
        if Some(effector.object) == skip {
            continue;
        }
        let Some(data) = scene.effector_data(effector, point) else {
            continue;
        };
        let priority = mul * effector.strength * effector.falloff.at(data.distance);
        let better = match &best {
            None => priority > 0.0,
            Some(b) => {
                priority > b.priority || (priority == b.priority && data.distance < b.data.distance)
            }
        };
        if better {
            best = Some(Candidate {
                object: effector.object,
                data,
                priority,
                surface: effector.shape == EffectorShape::Surface,
            });
        }
    }
    best
}

fn goal_avoid(params: &GoalAvoid, avoid: bool, brain: &mut Brain<'_, '_>) -> Option<SteeringIntent> {
    let ctx = brain.ctx;
    let settings = ctx.settings;
    let prev = brain.agent.previous;
    let ground = brain.agent.ground;
    let mul = if avoid { 1.0 } else { -1.0 };

    // A goal naming the object we stand on falls back to the open search.
    let named = params.object.filter(|&o| avoid || Some(o) != ground);
    let candidate = match named {
        Some(object) => named_target(ctx.scene, object, prev.position, mul),
        None => strongest_field(ctx.scene, prev.position, mul, if avoid { None } else { ground }),
    }?;

    let threshold = if avoid { params.fear_factor } else { 0.0 };
    if candidate.priority <= threshold {
        return None;
    }

    let mut data = candidate.data;
    if params.predict {
        let displacement = ctx
            .scene
            .object_motion(candidate.object)
            .map(|m| m.location - m.previous_location)
            .unwrap_or(data.velocity * ctx.dt);
        let reach = brain.limits.max_speed * ctx.dt;
        if reach > EPSILON {
            let location = data.location + displacement * (data.distance / reach);
            data = EffectorData::new(location, data.normal, data.velocity, prev.position);
        }
    }

    let mut vec_to_point = data.vec_to_point;
    if !avoid && settings.allow_climb && candidate.surface {
        if brain.goal.map_or(true, |g| g.priority < candidate.priority) {
            brain.goal = Some(GoalTarget {
                object: candidate.object,
                location: data.location,
                normal: data.normal,
                priority: candidate.priority,
            });
        }
    } else if avoid
        && brain.agent.mode == LocomotionMode::Climbing
        && candidate.priority > 2.0 * params.fear_factor
    {
        // detach and get away from the surface
        vec_to_point = -brain.agent.apparent_gravity;
    }

    let mut speed = brain.limits.max_speed * candidate.priority;
    if !avoid && settings.landing_smoothness > 0.0 {
        let braking = 2.0 * prev.velocity.length();
        let clearance = if candidate.surface {
            brain.agent.size * settings.height
        } else {
            0.0
        };
        let remaining = data.distance - clearance;
        if braking > 0.0 && remaining < braking {
            speed *= (remaining / braking).max(0.0).powf(settings.landing_smoothness);
        }
    }

    Some(SteeringIntent {
        direction: vec_to_point * mul,
        speed,
    })
}

fn avoid_collision(params: &AvoidCollision, brain: &mut Brain<'_, '_>) -> Option<SteeringIntent> {
    let prev = brain.agent.previous;
    let speed = prev.velocity.length();
    if speed <= EPSILON {
        return None;
    }
    let limits = brain.limits;
    let radius = limits.personal_space * brain.agent.size;

    if params.with_deflectors {
        let ray = Ray::between(
            prev.position,
            prev.position + prev.velocity * params.look_ahead,
            radius,
            brain.agent.ground,
        );
        if ray.max_distance > 0.0 {
            if let Some(hit) = brain.ctx.scene.raycast(&ray) {
                let t = hit.distance / ray.max_distance;
                let away = if hit.normal.dot(prev.forward_axis) < HEAD_ON_DOT {
                    brain.rng.unit_vec3()
                } else {
                    hit.normal
                };
                return Some(SteeringIntent {
                    direction: away * (1.0 - t) * radius,
                    speed: (t.sqrt() * speed).max(limits.min_speed),
                });
            }
        }
    }

    if !params.with_boids {
        return None;
    }

    let reach = params.look_ahead * speed;
    let own = (brain.ctx.own, Some(brain.index));
    let targets = brain.ctx.targets.iter().map(|t| (&t.snapshot, None));
    let mut t_min = COLLISION_TIME_HORIZON;
    let mut result = None;
    for (snapshot, skip) in std::iter::once(own).chain(targets) {
        for neighbor in snapshot.index().range_search(prev.position, reach, Some(prev.forward_axis)) {
            if Some(neighbor.index) == skip {
                continue;
            }
            let Some(other) = snapshot.get(neighbor.index) else {
                continue;
            };
            let offset = prev.position - other.position;
            let closing = prev.velocity - other.velocity;
            let closing_sq = closing.length_squared();
            if closing_sq == 0.0 {
                continue;
            }
            let t = -offset.dot(closing) / closing_sq;
            if t <= 0.0 || t >= t_min {
                continue;
            }
            let ours = prev.position + prev.velocity * t;
            let theirs = other.position + other.velocity * t;
            let (toward, separation) = normalize_len(theirs - ours);
            if separation < 2.0 * radius {
                t_min = t;
                let swerve = toward * speed * (COLLISION_TIME_HORIZON - t) / COLLISION_TIME_HORIZON;
                result = Some(intent_along(prev.velocity - swerve));
            }
        }
    }
    result
}

/// Closest other agent of `snapshot` within `reach`, as (distance, position).
fn nearest_other(
    snapshot: &SystemSnapshot,
    origin: Vec3,
    reach: f32,
    skip: Option<usize>,
) -> Option<(f32, Vec3)> {
    snapshot
        .index()
        .range_search(origin, reach, None)
        .into_iter()
        .filter(|n| Some(n.index) != skip && n.distance > 0.0)
        .find_map(|n| snapshot.get(n.index).map(|a| (n.distance, a.position)))
}

fn separate(brain: &mut Brain<'_, '_>) -> Option<SteeringIntent> {
    let position = brain.agent.previous.position;
    let reach = 2.0 * brain.limits.personal_space * brain.agent.size;
    let mut closest = nearest_other(brain.ctx.own, position, reach, Some(brain.index));
    for target in brain.ctx.targets {
        if let Some(found) = nearest_other(&target.snapshot, position, reach, None) {
            if closest.map_or(true, |c| found.0 < c.0) {
                closest = Some(found);
            }
        }
    }
    let (distance, other) = closest?;
    Some(SteeringIntent {
        direction: (position - other) * (reach - distance) / distance,
        speed: brain.limits.max_speed,
    })
}

fn flock(brain: &mut Brain<'_, '_>) -> Option<SteeringIntent> {
    let prev = brain.agent.previous;
    let own = brain.ctx.own;
    let neighbors: Vec<_> = own
        .index()
        .k_nearest(prev.position, FLOCK_NEIGHBORS + 1, Some(prev.forward_axis))
        .into_iter()
        .filter(|n| n.index != brain.index)
        .take(FLOCK_NEIGHBORS)
        .filter_map(|n| own.get(n.index))
        .collect();
    if neighbors.is_empty() {
        return None;
    }
    let count = neighbors.len() as f32;
    let (location, velocity) = neighbors
        .iter()
        .fold((Vec3::ZERO, Vec3::ZERO), |(l, v), a| (l + a.position, v + a.velocity));
    let direction = (velocity / count - prev.velocity) + (location / count - prev.position);
    Some(intent_along(direction))
}

/// Index of the agent that `index` trails in a queue of `queue_size`
/// (every agent when `queue_size <= 1`). Queue heads have no leader.
pub fn queue_leader(index: usize, queue_size: usize, total: usize) -> Option<usize> {
    let n = queue_length(queue_size, total);
    let offset = index % n;
    (offset != 0).then(|| index - offset)
}

fn queue_length(queue_size: usize, total: usize) -> usize {
    if queue_size <= 1 {
        total.max(1)
    } else {
        queue_size
    }
}

struct Block {
    t: f32,
    offset: Vec3,
    lateral: Vec3,
}

/// Whether an agent at `position` sits in the leader's path within
/// `horizon` seconds. A still leader blocks at `t = 0` when too close.
fn leader_block(position: Vec3, leader: Vec3, velocity: Vec3, guard: f32, horizon: f32) -> Option<Block> {
    let offset = position - leader;
    let speed_sq = velocity.length_squared();
    if speed_sq < LEADER_STILL_SPEED_SQ {
        return (offset.length() < guard).then_some(Block {
            t: 0.0,
            offset,
            lateral: offset,
        });
    }
    let t = offset.dot(velocity) / speed_sq;
    if t <= 0.0 || t >= horizon {
        return None;
    }
    let lateral = offset - velocity * t;
    (lateral.length() < guard).then_some(Block { t, offset, lateral })
}

fn trail(leader: Vec3, velocity: Vec3, seconds_behind: f32, position: Vec3) -> SteeringIntent {
    intent_along(leader - velocity * seconds_behind - position)
}

fn evade_speed(max_speed: f32, t: f32) -> f32 {
    max_speed * (LEADER_BLOCK_HORIZON - t) / LEADER_BLOCK_HORIZON
}

fn follow_leader(params: &FollowLeader, brain: &mut Brain<'_, '_>) -> Option<SteeringIntent> {
    let ctx = brain.ctx;
    let prev = brain.agent.previous;
    let max_speed = brain.limits.max_speed;
    let guard = 2.0 * brain.limits.personal_space * brain.agent.size;
    let own = ctx.own;
    let index = brain.index;

    if let Some(object) = params.object {
        let motion = ctx.scene.object_motion(object)?;
        let velocity = if ctx.dt > 0.0 {
            (motion.location - motion.previous_location) / ctx.dt
        } else {
            Vec3::ZERO
        };
        let block = leader_block(
            prev.position,
            motion.previous_location,
            velocity,
            guard,
            LEADER_BLOCK_HORIZON,
        );
        if let Some(block) = block {
            return Some(if velocity.length_squared() < LEADER_STILL_SPEED_SQ {
                SteeringIntent {
                    direction: block.offset,
                    speed: max_speed,
                }
            } else {
                SteeringIntent {
                    direction: block.lateral,
                    speed: evade_speed(max_speed, block.t),
                }
            });
        }
        let ahead = if params.in_line && index > 0 {
            own.get(index - 1)
        } else {
            None
        };
        return Some(match ahead {
            Some(ahead) => trail(ahead.position, ahead.velocity, params.distance, prev.position),
            None => trail(motion.previous_location, velocity, params.distance, prev.position),
        });
    }

    let leader = queue_leader(index, params.queue_size, own.agents.len())?;
    let n = queue_length(params.queue_size, own.agents.len());

    let mut t_min = LEADER_BLOCK_HORIZON;
    let mut evade = None;
    for head in (0..own.agents.len()).step_by(n) {
        let Some(other) = own.get(head).filter(|a| a.alive) else {
            continue;
        };
        let Some(block) = leader_block(prev.position, other.position, other.velocity, guard, t_min) else {
            continue;
        };
        if other.velocity.length_squared() < LEADER_STILL_SPEED_SQ {
            return Some(SteeringIntent {
                direction: block.offset,
                speed: max_speed,
            });
        }
        t_min = block.t;
        evade = Some(SteeringIntent {
            direction: block.offset,
            speed: evade_speed(max_speed, block.t),
        });
    }
    if evade.is_some() {
        return evade;
    }

    let target = if params.in_line { index - 1 } else { leader };
    let ahead = own.get(target)?;
    Some(trail(ahead.position, ahead.velocity, params.distance, prev.position))
}

fn average_speed(params: &AverageSpeed, brain: &mut Brain<'_, '_>) -> Option<SteeringIntent> {
    let prev = brain.agent.previous;
    let mut direction = if params.wander > 0.0 {
        let jitter = brain.rng.signed_vec3() * params.wander;
        let wander = brain.agent.wander;
        brain.agent.wander = normalize_or(wander + jitter, wander);
        prev.forward_axis * WANDER_HEADING_WEIGHT + prev.orientation * brain.agent.wander
    } else if prev.forward_axis.truncate().length_squared() == 0.0 {
        brain.rng.signed_vec3()
    } else {
        prev.forward_axis
    };

    if params.level > 0.0 {
        if let Some(gravity) = brain.ctx.scene.gravity() {
            direction -= project(direction, gravity) * params.level;
        }
    }

    Some(SteeringIntent {
        direction,
        speed: params.speed * brain.limits.max_speed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{Agent, BoidLimits};
    use crate::effector::{Effector, FieldKind};
    use crate::frand::StepRng;
    use crate::scene::{Scene, SceneObject};
    use crate::settings::{BoidSettings, TargetMode};
    use crate::testing::{agent_at, Fixture};

    fn run(fixture: &Fixture, agents: &[Agent], index: usize, rule: RuleKind) -> Option<SteeringIntent> {
        let ctx = fixture.ctx(3);
        let mut agent = agents[index].clone();
        let mut brain = Brain {
            ctx: &ctx,
            index,
            limits: BoidLimits::for_agent(&fixture.settings, &agent),
            agent: &mut agent,
            rng: StepRng::new(ctx.seed, index, ctx.frame),
            goal: None,
            damage: Vec::new(),
        };
        evaluate(&BoidRule::new(rule), &mut brain)
    }

    #[test]
    fn separate_push_scales_with_overlap() {
        let agents = vec![
            agent_at(Vec3::ZERO, Vec3::X),
            agent_at(Vec3::new(0.0, 1.0, 0.0), Vec3::X),
        ];
        let fixture = Fixture::new(BoidSettings::default(), &agents);
        let intent = run(&fixture, &agents, 0, RuleKind::Separate).unwrap();
        // personal space 1, size 1, distance 1: push factor (2 - 1) / 1
        assert!((intent.direction - Vec3::new(0.0, -1.0, 0.0)).length() < 1e-6);
        assert_eq!(intent.speed, 10.0);
    }

    #[test]
    fn separate_prefers_closer_target_system() {
        let agents = vec![
            agent_at(Vec3::ZERO, Vec3::X),
            agent_at(Vec3::new(0.0, 1.5, 0.0), Vec3::X),
        ];
        let others = vec![agent_at(Vec3::new(0.5, 0.0, 0.0), Vec3::X)];
        let fixture = Fixture::new(BoidSettings::default(), &agents).with_target(
            TargetMode::Neutral,
            &others,
            0.1,
        );
        let intent = run(&fixture, &agents, 0, RuleKind::Separate).unwrap();
        // (p - q) * (2 - 0.5) / 0.5
        assert!((intent.direction - Vec3::new(-1.5, 0.0, 0.0)).length() < 1e-5);
    }

    #[test]
    fn stationary_agent_does_not_avoid_collisions() {
        let agents = vec![
            agent_at(Vec3::ZERO, Vec3::ZERO),
            agent_at(Vec3::new(1.0, 0.0, 0.0), -Vec3::X),
        ];
        let fixture = Fixture::new(BoidSettings::default(), &agents);
        let rule = RuleKind::AvoidCollision(AvoidCollision::default());
        assert!(run(&fixture, &agents, 0, rule).is_none());
    }

    #[test]
    fn head_on_boids_swerve() {
        let agents = vec![
            agent_at(Vec3::ZERO, Vec3::new(2.0, 0.0, 0.0)),
            agent_at(Vec3::new(3.5, 0.5, 0.0), Vec3::new(-2.0, 0.0, 0.0)),
        ];
        let fixture = Fixture::new(BoidSettings::default(), &agents);
        let rule = RuleKind::AvoidCollision(AvoidCollision::default());
        let intent = run(&fixture, &agents, 0, rule).unwrap();
        // closest approach at t = 0.875, separation 0.5: steer away from +y
        assert!(intent.direction.y < 0.0);
        assert!((intent.speed - intent.direction.length()).abs() < 1e-6);
    }

    #[test]
    fn deflector_pushes_along_surface_normal() {
        let mut scene = Scene::default();
        let wall = scene.add_object(SceneObject::new("wall", Vec3::new(5.0, 0.0, 0.0)));
        scene.colliders.push(crate::collider::Collider {
            object: wall,
            surface: crate::collider::Surface::Plane {
                offset: Vec3::ZERO,
                normal: Vec3::new(-1.0, 0.2, 0.0),
            },
        });
        let agents = vec![agent_at(Vec3::ZERO, Vec3::new(2.0, 0.0, 0.0))];
        let fixture = Fixture::new(BoidSettings::default(), &agents).with_scene(scene);
        let rule = RuleKind::AvoidCollision(AvoidCollision {
            with_boids: false,
            with_deflectors: true,
            look_ahead: 3.0,
        });
        let intent = run(&fixture, &agents, 0, rule).unwrap();
        assert!(intent.direction.x < 0.0);
        assert!(intent.speed > 0.0 && intent.speed < 2.0);
    }

    #[test]
    fn flock_steers_to_neighbour_centre_and_velocity() {
        let agents = vec![
            agent_at(Vec3::ZERO, Vec3::X),
            agent_at(Vec3::new(2.0, 2.0, 0.0), Vec3::Y),
            agent_at(Vec3::new(2.0, -2.0, 0.0), Vec3::Y),
        ];
        let fixture = Fixture::new(BoidSettings::default(), &agents);
        let intent = run(&fixture, &agents, 0, RuleKind::Flock).unwrap();
        let expected = (Vec3::Y - Vec3::X) + Vec3::new(2.0, 0.0, 0.0);
        assert!((intent.direction - expected).length() < 1e-5);
        assert!((intent.speed - expected.length()).abs() < 1e-5);
    }

    #[test]
    fn lone_agent_has_no_flock() {
        let agents = vec![agent_at(Vec3::ZERO, Vec3::X)];
        let fixture = Fixture::new(BoidSettings::default(), &agents);
        assert!(run(&fixture, &agents, 0, RuleKind::Flock).is_none());
    }

    #[test]
    fn queue_leader_resolves_to_group_head() {
        assert_eq!(queue_leader(4, 3, 10), Some(3));
        assert_eq!(queue_leader(3, 3, 10), None);
        assert_eq!(queue_leader(0, 3, 10), None);
        // one queue spanning the whole system
        assert_eq!(queue_leader(7, 1, 10), Some(0));
        assert_eq!(queue_leader(0, 0, 0), None);
    }

    #[test]
    fn queued_agent_trails_its_leader() {
        let agents: Vec<Agent> = (0..5)
            .map(|i| agent_at(Vec3::new(-3.0 * i as f32, 10.0, 0.0), Vec3::X))
            .collect();
        let fixture = Fixture::new(BoidSettings::default(), &agents);
        let params = FollowLeader {
            queue_size: 3,
            distance: 1.0,
            ..FollowLeader::default()
        };
        assert!(run(&fixture, &agents, 3, RuleKind::FollowLeader(params)).is_none());
        let intent = run(&fixture, &agents, 4, RuleKind::FollowLeader(params)).unwrap();
        // leader is agent 3 at x = -9, one second behind it is x = -10
        let expected = Vec3::new(-10.0, 10.0, 0.0) - Vec3::new(-12.0, 10.0, 0.0);
        assert!((intent.direction - expected).length() < 1e-5);
    }

    #[test]
    fn agent_in_front_of_still_leader_object_flees() {
        let mut scene = Scene::default();
        let leader = scene.add_object(SceneObject::new("leader", Vec3::ZERO));
        let agents = vec![agent_at(Vec3::new(1.0, 0.0, 0.0), Vec3::X)];
        let fixture = Fixture::new(BoidSettings::default(), &agents).with_scene(scene);
        let params = FollowLeader {
            object: Some(leader),
            ..FollowLeader::default()
        };
        let intent = run(&fixture, &agents, 0, RuleKind::FollowLeader(params)).unwrap();
        assert!((intent.direction - Vec3::X).length() < 1e-6);
        assert_eq!(intent.speed, 10.0);
    }

    #[test]
    fn goal_steers_toward_boid_field() {
        let mut scene = Scene::default();
        let target = scene.add_object(SceneObject::new("target", Vec3::new(10.0, 0.0, 0.0)));
        scene
            .effectors
            .push(Effector::new(target, FieldKind::Boid, 0.5));
        let agents = vec![agent_at(Vec3::ZERO, Vec3::ZERO)];
        let fixture = Fixture::new(BoidSettings::default(), &agents).with_scene(scene);

        // only negative strengths draw goals
        let goal = run(&fixture, &agents, 0, RuleKind::Goal(GoalAvoid::default()));
        assert!(goal.is_none());

        let avoid = run(&fixture, &agents, 0, RuleKind::Avoid(GoalAvoid {
            fear_factor: 0.2,
            ..GoalAvoid::default()
        }))
        .unwrap();
        assert!(avoid.direction.x < 0.0);
        assert!((avoid.speed - 5.0).abs() < 1e-5);
    }

    #[test]
    fn named_goal_without_effector_is_faked() {
        let mut scene = Scene::default();
        let target = scene.add_object(SceneObject::new("target", Vec3::new(0.0, 6.0, 0.0)));
        let agents = vec![agent_at(Vec3::ZERO, Vec3::ZERO)];
        let fixture = Fixture::new(BoidSettings::default(), &agents).with_scene(scene);
        let params = GoalAvoid {
            object: Some(target),
            ..GoalAvoid::default()
        };
        let intent = run(&fixture, &agents, 0, RuleKind::Goal(params)).unwrap();
        assert!((intent.direction - Vec3::new(0.0, 6.0, 0.0)).length() < 1e-5);
        assert_eq!(intent.speed, 10.0);
    }

    #[test]
    fn average_speed_keeps_wander_unit_length() {
        let agents = vec![agent_at(Vec3::ZERO, Vec3::X)];
        let fixture = Fixture::new(BoidSettings::default(), &agents);
        let ctx = fixture.ctx(0);
        let mut agent = agents[0].clone();
        for frame in 0..10 {
            let mut brain = Brain {
                ctx: &ctx,
                index: 0,
                limits: BoidLimits::for_agent(&fixture.settings, &agent),
                agent: &mut agent,
                rng: StepRng::new(ctx.seed, 0, frame),
                goal: None,
                damage: Vec::new(),
            };
            let intent = evaluate(
                &BoidRule::new(RuleKind::AverageSpeed(AverageSpeed {
                    wander: 2.0,
                    ..AverageSpeed::default()
                })),
                &mut brain,
            )
            .unwrap();
            assert_eq!(intent.speed, 5.0);
            assert!((agent.wander.length() - 1.0).abs() < 1e-5);
        }
    }
}
