use glam::Vec3;
use tracing::debug;

use crate::brain::{Brain, SteeringIntent};
use crate::config::FACING_DOT;
use crate::math::normalize_or;
use crate::settings::{Fight, TargetMode};
use crate::simulation::{BoidSystem, SystemId, SystemSnapshot};

/// Health to remove from one agent, produced by a Fight rule during the
/// read-only brain pass and applied afterwards.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DamageIntent {
    pub source_system: SystemId,
    pub source_agent: usize,
    pub target_system: SystemId,
    pub target_agent: usize,
    pub amount: f32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DamageReport {
    /// Total health removed.
    pub applied: f32,
    pub hits: usize,
    pub killed: usize,
}

struct Foe {
    system: SystemId,
    index: usize,
    position: Vec3,
    size: f32,
    distance: f32,
}

fn health_in_range(snapshot: &SystemSnapshot, origin: Vec3, distance: f32) -> (f32, Option<(usize, f32)>) {
    let found = snapshot.index().range_search(origin, distance, None);
    let health = found
        .iter()
        .filter_map(|n| snapshot.get(n.index))
        .map(|a| a.health)
        .sum();
    (health, found.first().map(|n| (n.index, n.distance)))
}

/// Weigh friendly against enemy strength nearby. Attacks when close and
/// facing the nearest enemy, flees or waits when the odds are bad, and
/// approaches otherwise. `None` when no enemy is in sight.
pub fn evaluate_fight(params: &Fight, brain: &mut Brain<'_, '_>) -> Option<SteeringIntent> {
    let ctx = brain.ctx;
    let settings = ctx.settings;
    let prev = brain.agent.previous;

    let (own_health, _) = health_in_range(ctx.own, prev.position, params.distance);
    let mut friend_strength = settings.strength * own_health;
    let mut enemy_strength = 0.0;
    let mut closest: Option<Foe> = None;
    let mut closest_distance = params.distance + 1.0;

    for target in ctx.targets {
        let (health, first) = health_in_range(&target.snapshot, prev.position, params.distance);
        match target.mode {
            TargetMode::Enemy => {
                if let Some((index, distance)) = first {
                    if distance < closest_distance {
                        if let Some(enemy) = target.snapshot.get(index) {
                            closest_distance = distance;
                            closest = Some(Foe {
                                system: target.system,
                                index,
                                position: enemy.position,
                                size: enemy.size,
                                distance,
                            });
                        }
                    }
                }
                enemy_strength += target.snapshot.strength * health;
            }
            TargetMode::Friend => friend_strength += target.snapshot.strength * health,
            TargetMode::Neutral => {}
        }
    }

    if enemy_strength <= 0.0 {
        return None;
    }
    let foe = closest?;

    let max_speed = brain.limits.max_speed;
    let mut direction = foe.position - prev.position;
    let mut speed = max_speed;

    if foe.distance <= settings.range + brain.agent.size + foe.size {
        let roll = brain.rng.unit();
        speed = 0.0;
        if prev.forward_axis.dot(normalize_or(direction, Vec3::ZERO)) > FACING_DOT {
            let accuracy = settings.accuracy;
            brain.damage.push(DamageIntent {
                source_system: ctx.system,
                source_agent: brain.index,
                target_system: foe.system,
                target_agent: foe.index,
                amount: settings.strength * ctx.dt * ((1.0 - accuracy) * roll + accuracy),
            });
        }
    }

    let morale = if settings.health > 0.0 {
        brain.agent.health / settings.health * settings.aggression
    } else {
        0.0
    };
    let odds = if friend_strength > 0.0 {
        enemy_strength / friend_strength
    } else {
        f32::INFINITY
    };
    if morale < odds {
        if foe.distance < params.flee_distance * params.distance {
            direction = -direction;
            speed = max_speed;
        } else {
            speed = 0.0;
        }
    }

    Some(SteeringIntent { direction, speed })
}

/// Apply damage in the given order. Hits on missing or already dead agents
/// are dropped; an agent whose health reaches zero dies at `frame`.
pub fn apply_damage(systems: &mut [BoidSystem], intents: &[DamageIntent], frame: u32) -> DamageReport {
    let mut report = DamageReport::default();
    for intent in intents {
        let Some(target) = systems
            .get_mut(intent.target_system.0)
            .and_then(|s| s.agents.get_mut(intent.target_agent))
        else {
            continue;
        };
        if !target.alive {
            continue;
        }
        target.health -= intent.amount;
        report.applied += intent.amount;
        report.hits += 1;
        if target.health <= 0.0 {
            target.kill(frame);
            report.killed += 1;
            debug!(
                system = intent.target_system.0,
                agent = intent.target_agent,
                by_system = intent.source_system.0,
                by_agent = intent.source_agent,
                frame,
                "agent killed in combat"
            );
        }
    }
    report
}
