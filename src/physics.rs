use glam::Vec3;

use crate::agent::{Agent, BoidLimits, LocomotionMode};
use crate::brain::{SteeringIntent, Thought};
use crate::config::{DAMPING_SCALE, HEAD_ON_DOT, MIN_HEADING_SPEED};
use crate::frand::StepRng;
use crate::locomotion::{self, approach_landing, cast_ground, climb_surface, find_ground};
use crate::math::{
    horizontal_dir, normalize_len, normalize_or, orientation_from_axes, rotate_towards, saacos,
    sasqrt,
};
use crate::simulation::StepContext;

/// Redistribute `velocity` so its horizontal part is at least `min_speed`
/// while keeping the total `speed` and the sign of the vertical part.
pub fn keep_flight_speed(velocity: Vec3, speed: f32, min_speed: f32) -> Vec3 {
    let horizontal_sq = velocity.truncate().length_squared().max(min_speed * min_speed);
    let root = sasqrt(speed * speed - horizontal_sq);
    let z = if velocity.z < 0.0 { -root } else { root };
    (horizontal_dir(velocity) * horizontal_sq.sqrt()).extend(z)
}

/// Turn toward the wanted direction and change speed within the limits.
/// Also stores the partially turned heading used if the agent ends up too
/// slow to derive one from its velocity.
fn steer(
    agent: &mut Agent,
    limits: &BoidLimits,
    wanted: &SteeringIntent,
    landing: bool,
    rng: &mut StepRng,
    dt: f32,
) -> Vec3 {
    let prev = agent.previous;
    let old_dir = prev.forward_axis;
    let (wanted_dir, wanted_len) = normalize_len(wanted.direction);

    let new_dir = if wanted_len == 0.0 {
        old_dir
    } else {
        // straight behind: pick a random side to turn to
        let wanted_dir = if horizontal_dir(old_dir).dot(horizontal_dir(wanted_dir)) < HEAD_ON_DOT {
            normalize_or(rng.signed_vec3(), old_dir)
        } else {
            wanted_dir
        };
        let angle = saacos(old_dir.dot(wanted_dir)).min(limits.max_angular_velocity * dt);
        let turned = rotate_towards(old_dir, wanted_dir, angle);
        agent.state.forward_axis = turned;
        turned
    };

    let old_speed = prev.velocity.length();
    let speed = if wanted.speed < old_speed {
        wanted.speed.max(old_speed - limits.max_acceleration)
    } else {
        wanted.speed.min(old_speed + limits.max_acceleration)
    };

    let mut velocity = new_dir * speed;
    if !landing {
        velocity = keep_flight_speed(velocity, speed, limits.min_speed);
    }
    let (dir, len) = normalize_len(velocity);
    dir * len.min(limits.max_speed)
}

/// Body pass for one agent: turn the brain's wanted velocity into
/// acceleration, integrate, then resolve ground contact and orientation.
pub fn advance(ctx: &StepContext<'_>, agent: &mut Agent, thought: Thought) {
    let Thought {
        intent: mut wanted,
        goal,
        mut rng,
        ..
    } = thought;
    let settings = ctx.settings;
    let dt = ctx.dt;
    let gravity = ctx.scene.gravity();
    let limits = BoidLimits::for_agent(settings, agent);
    let mass = if agent.mass > 0.0 { agent.mass } else { 1.0 };

    agent.state = agent.previous;
    let prev = agent.previous;

    if !settings.allow_flight
        && gravity.is_some()
        && !agent.mode.is_grounded()
        && agent.mode != LocomotionMode::Liftoff
    {
        agent.set_mode(LocomotionMode::Falling);
    }

    let mut acc = Vec3::ZERO;
    if agent.mode == LocomotionMode::Falling {
        acc.z = gravity.map_or(0.0, |g| g.z);
    } else {
        let mut landing = false;
        if agent.mode == LocomotionMode::Liftoff {
            agent.set_mode(LocomotionMode::InAir);
            agent.ground = cast_ground(ctx.scene, prev.position).object;
        } else if agent.mode == LocomotionMode::InAir && settings.allow_land {
            let ground = find_ground(ctx.scene, agent, prev.position, dt);
            agent.ground = ground.object;
            landing = approach_landing(agent, &ground, settings, &mut wanted);
        }
        let new_velocity = steer(agent, &limits, &wanted, landing, &mut rng, dt);
        if dt > 0.0 {
            acc = (new_velocity - prev.velocity) / dt;
        }
    }

    let mut force = ctx.scene.evaluate(agent.state.position, agent.state.velocity);
    if agent.mode.is_grounded() {
        let (dir, len) = normalize_len(force);
        force = dir * (len - settings.land_stick_force).max(0.0);
    }
    acc += force;

    agent.smoothed_acceleration = (agent.smoothed_acceleration + acc * dt) / (1.0 + dt);

    let acc = acc / mass;
    agent.state.position += prev.velocity * dt + acc * (0.5 * dt * dt);
    agent.state.velocity += acc * dt;

    let ground = if agent.mode == LocomotionMode::Climbing {
        match agent
            .ground
            .and_then(|o| climb_surface(ctx.scene, o, agent.state.position, dt))
        {
            Some(surface) => surface,
            None => {
                agent.set_mode(LocomotionMode::OnLand);
                cast_ground(ctx.scene, agent.state.position)
            }
        }
    } else {
        cast_ground(ctx.scene, agent.state.position)
    };
    locomotion::settle(ctx, agent, &ground, goal.as_ref(), &wanted);

    // falling agents cannot steer, so their heading stays put
    if agent.mode != LocomotionMode::Falling
        && agent.state.velocity.length() > MIN_HEADING_SPEED * agent.size
    {
        let mut heading = agent.state.velocity;
        heading.z *= settings.pitch;
        agent.state.forward_axis = normalize_or(heading, agent.state.forward_axis);
    }

    if agent.mode.is_grounded() {
        agent.state.velocity *= 1.0 - DAMPING_SCALE * settings.damping;
    }

    agent.state.orientation = orientation_from_axes(
        agent.state.forward_axis,
        -agent.apparent_gravity,
        agent.mode == LocomotionMode::InAir,
    );
}
