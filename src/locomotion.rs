//! Locomotion modes: ground lookup, takeoff and jumps, landing, climbing.

use glam::{Vec2, Vec3};

use crate::agent::{Agent, BoidLimits, LocomotionMode};
use crate::brain::{GoalTarget, SteeringIntent};
use crate::collider::{ColliderQuery, Ray};
use crate::config::{FALL_LAND_MARGIN, GROUND_RAY_LENGTH, LAND_FALL_MARGIN, LIFTOFF_ALIGNMENT};
use crate::math::{horizontal_dir, normalize_or, project, reject, sasqrt};
use crate::scene::ObjectId;
use crate::settings::BoidSettings;
use crate::simulation::StepContext;

/// Surface under (or held by) an agent.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ground {
    /// `None` for the implicit z = 0 plane.
    pub object: Option<ObjectId>,
    pub point: Vec3,
    pub normal: Vec3,
}

/// Ground below `position`: straight down first, then the topmost surface
/// along a long vertical ray, else the plane z = 0.
pub fn cast_ground<S: ColliderQuery + ?Sized>(scene: &S, position: Vec3) -> Ground {
    let below = Ray::between(
        position,
        position - Vec3::Z * GROUND_RAY_LENGTH,
        0.0,
        None,
    );
    let topmost = Ray::between(
        position + Vec3::Z * GROUND_RAY_LENGTH,
        position - Vec3::Z * (2.0 * GROUND_RAY_LENGTH),
        0.0,
        None,
    );
    for ray in [below, topmost] {
        if let Some(hit) = scene.raycast(&ray) {
            return Ground {
                object: Some(hit.object),
                point: hit.point,
                normal: hit.normal,
            };
        }
    }
    Ground {
        object: None,
        point: Vec3::new(position.x, position.y, 0.0),
        normal: Vec3::Z,
    }
}

/// Closest point on a climbed surface, following the surface's own motion.
pub fn climb_surface<S: ColliderQuery + ?Sized>(
    scene: &S,
    object: ObjectId,
    position: Vec3,
    dt: f32,
) -> Option<Ground> {
    let near = scene.closest_point(object, position)?;
    let moved = scene.closest_point(object, near.point + near.velocity * dt)?;
    Some(Ground {
        object: Some(object),
        point: moved.point,
        normal: moved.normal,
    })
}

pub fn find_ground<S: ColliderQuery + ?Sized>(scene: &S, agent: &Agent, position: Vec3, dt: f32) -> Ground {
    if agent.mode == LocomotionMode::Climbing {
        if let Some(ground) = agent.ground.and_then(|o| climb_surface(scene, o, position, dt)) {
            return ground;
        }
    }
    cast_ground(scene, position)
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct JumpSolution {
    pub z_velocity: f32,
    pub ground_velocity: f32,
    /// Launch speed needed to peak at the wanted point.
    pub required_speed: f32,
    /// Launch velocity including the current horizontal motion.
    pub velocity: Vec3,
}

/// Ballistic jump whose apex is the wanted offset. `None` when the wanted
/// point is not above us or the jump is out of reach.
pub fn ballistic_jump(
    wanted: Vec3,
    current_velocity: Vec3,
    heading: Vec2,
    gravity_z: f32,
    jump_speed: f32,
    mul: f32,
    allow_flight: bool,
) -> Option<JumpSolution> {
    if wanted.z <= 0.0 || gravity_z >= 0.0 {
        return None;
    }
    let current = current_velocity.truncate().length();
    let z_velocity = sasqrt(-2.0 * gravity_z * wanted.z);
    let ground_velocity = wanted.truncate().length() * sasqrt(-0.5 * gravity_z / wanted.z);
    let required_speed = sasqrt((ground_velocity - current).powi(2) + z_velocity * z_velocity);
    if required_speed >= jump_speed * mul && !allow_flight {
        return None;
    }
    let launch = Vec3::new(
        heading.x * ground_velocity,
        heading.y * ground_velocity,
        z_velocity,
    );
    let speed = required_speed.min(jump_speed);
    let velocity = normalize_or(launch, Vec3::Z) * speed + current_velocity.truncate().extend(0.0);
    Some(JumpSolution {
        z_velocity,
        ground_velocity,
        required_speed,
        velocity: velocity.clamp_length_max(jump_speed),
    })
}

/// Takeoff decision for agents on land: lift off when flight is allowed and
/// the wanted velocity climbs roughly along the heading, otherwise try a
/// jump. Fuzziness loosens the alignment test.
pub fn decide_takeoff(
    agent: &mut Agent,
    limits: &BoidLimits,
    settings: &BoidSettings,
    gravity: Option<Vec3>,
    wanted: &SteeringIntent,
    fuzziness: f32,
) {
    if agent.mode != LocomotionMode::OnLand || wanted.direction.z <= 0.0 {
        return;
    }
    let mul = 1.0 + fuzziness;
    let heading = horizontal_dir(agent.previous.forward_axis);
    let aligned = heading.dot(horizontal_dir(wanted.direction)) > LIFTOFF_ALIGNMENT / mul;

    if settings.allow_flight {
        if aligned {
            agent.set_mode(LocomotionMode::Liftoff);
        }
        return;
    }
    if limits.jump_speed <= 0.0 {
        return;
    }
    let slow = agent.previous.velocity.truncate().length() <= fuzziness;
    if !(aligned || slow) {
        return;
    }
    let Some(gravity) = gravity else {
        return;
    };
    if let Some(jump) = ballistic_jump(
        wanted.direction,
        agent.previous.velocity,
        heading,
        gravity.z,
        limits.jump_speed,
        mul,
        settings.allow_flight,
    ) {
        agent.previous.velocity = jump.velocity;
        agent.set_mode(LocomotionMode::Falling);
    }
}

/// Slow the descent of a flying agent near the ground. Returns whether it
/// is landing, in which case minimum flight speed no longer applies.
pub fn approach_landing(
    agent: &mut Agent,
    ground: &Ground,
    settings: &BoidSettings,
    wanted: &mut SteeringIntent,
) -> bool {
    let prev = agent.previous;
    let size = agent.size.max(f32::EPSILON);
    // body sizes above the ground
    let level = (prev.position.z - ground.point.z) / (2.0 * size) - 0.5;
    let landing_level = -settings.landing_smoothness * prev.velocity.z * agent.mass;
    if prev.velocity.z < 0.0 {
        if level < 1.0 {
            *wanted = SteeringIntent::ZERO;
            agent.set_mode(LocomotionMode::Falling);
        } else if level < landing_level {
            let scale = (level - 1.0) / landing_level;
            wanted.speed *= scale;
            wanted.direction.z *= scale;
        }
    }
    level < landing_level
}

fn snap_to(agent: &mut Agent, ground: &Ground, hover: f32) {
    agent.state.position.z = ground.point.z + hover;
    agent.state.velocity.z = 0.0;
}

fn climb(agent: &mut Agent, ground: &Ground, hover: f32) {
    agent.apparent_gravity = normalize_or(agent.apparent_gravity - ground.normal, -ground.normal);
    agent.state.position = ground.point + ground.normal * hover;
    agent.state.velocity -= project(agent.state.velocity, ground.normal);
}

fn try_grab_goal(
    ctx: &StepContext<'_>,
    agent: &mut Agent,
    goal: Option<&GoalTarget>,
    hover: f32,
) -> bool {
    let Some(goal) = goal else {
        return false;
    };
    if (agent.state.position - goal.location).dot(goal.normal) > hover {
        return false;
    }
    let Some(surface) = climb_surface(ctx.scene, goal.object, agent.state.position, ctx.dt) else {
        return false;
    };
    agent.set_mode(LocomotionMode::Climbing);
    agent.ground = Some(goal.object);
    climb(agent, &surface, hover);
    true
}

/// Mode changes after integration, plus the apparent gravity update.
pub fn settle(
    ctx: &StepContext<'_>,
    agent: &mut Agent,
    ground: &Ground,
    goal: Option<&GoalTarget>,
    wanted: &SteeringIntent,
) {
    let settings = ctx.settings;
    let hover = agent.size * settings.height;
    let down = match ctx.scene.gravity() {
        Some(g) if g.z < 0.0 => -Vec3::Z,
        _ => Vec3::ZERO,
    };
    agent.ground = ground.object;

    match agent.mode {
        LocomotionMode::InAir => {
            let acc = agent.smoothed_acceleration;
            // sideways acceleration only, for cleaner banking
            let lateral = if acc.dot(agent.state.velocity) > 0.0 {
                reject(acc, agent.state.velocity)
            } else {
                acc
            };
            agent.apparent_gravity =
                normalize_or(down - lateral * settings.banking, agent.apparent_gravity);

            if try_grab_goal(ctx, agent, goal, hover) {
                return;
            }
            if agent.state.position.z <= ground.point.z + hover {
                if settings.allow_land {
                    snap_to(agent, ground, hover);
                    agent.set_mode(LocomotionMode::OnLand);
                } else if ground.object.is_some() {
                    snap_to(agent, ground, hover);
                }
            }
        }
        LocomotionMode::Falling => {
            agent.apparent_gravity =
                normalize_or(agent.apparent_gravity + down * ctx.dt, agent.apparent_gravity);
            if !settings.allow_land {
                agent.set_mode(LocomotionMode::InAir);
            } else if try_grab_goal(ctx, agent, goal, hover) {
                return;
            } else if agent.state.position.z <= ground.point.z + FALL_LAND_MARGIN * hover {
                snap_to(agent, ground, hover);
                agent.set_mode(LocomotionMode::OnLand);
            } else if settings.allow_flight && wanted.direction.z > 0.0 {
                agent.set_mode(LocomotionMode::InAir);
            }
        }
        LocomotionMode::Climbing => climb(agent, ground, hover),
        LocomotionMode::OnLand => {
            if try_grab_goal(ctx, agent, goal, hover) {
                return;
            }
            if agent.state.position.z - ground.point.z > LAND_FALL_MARGIN * hover {
                agent.set_mode(LocomotionMode::Falling);
            } else {
                snap_to(agent, ground, hover);
            }

            agent.apparent_gravity = if settings.banking > 0.0 {
                let acc = agent.smoothed_acceleration;
                let lateral = reject(acc, agent.state.velocity);
                normalize_or(-ground.normal - lateral * settings.banking, agent.apparent_gravity)
            } else {
                normalize_or(agent.apparent_gravity - ground.normal, agent.apparent_gravity)
            };
        }
        LocomotionMode::Liftoff => {}
    }
}
