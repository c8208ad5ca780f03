use glam::{Mat3, Quat, Vec2, Vec3};

use crate::config::EPSILON;

/// Normalize `v`, returning the unit vector and the original length.
/// Degenerate input yields `(Vec3::ZERO, 0.0)`.
pub fn normalize_len(v: Vec3) -> (Vec3, f32) {
    let len = v.length();
    if len > EPSILON && len.is_finite() {
        (v / len, len)
    } else {
        (Vec3::ZERO, 0.0)
    }
}

pub fn normalize_or(v: Vec3, fallback: Vec3) -> Vec3 {
    let (unit, len) = normalize_len(v);
    if len > 0.0 {
        unit
    } else {
        fallback
    }
}

/// Horizontal (xy) direction of `v`; zero when `v` is vertical.
pub fn horizontal_dir(v: Vec3) -> Vec2 {
    let xy = v.truncate();
    let len = xy.length();
    if len > EPSILON {
        xy / len
    } else {
        Vec2::ZERO
    }
}

/// Projection of `v` onto `onto`; zero when `onto` is degenerate.
pub fn project(v: Vec3, onto: Vec3) -> Vec3 {
    let denom = onto.length_squared();
    if denom > EPSILON * EPSILON {
        onto * (v.dot(onto) / denom)
    } else {
        Vec3::ZERO
    }
}

/// Component of `v` perpendicular to `from`.
pub fn reject(v: Vec3, from: Vec3) -> Vec3 {
    v - project(v, from)
}

pub fn sasqrt(x: f32) -> f32 {
    if x > 0.0 {
        x.sqrt()
    } else {
        0.0
    }
}

pub fn saacos(x: f32) -> f32 {
    x.clamp(-1.0, 1.0).acos()
}

/// Rotate unit vector `from` toward `to` by at most `max_angle` radians.
/// Parallel and anti-parallel inputs have no turn axis and return `from`.
pub fn rotate_towards(from: Vec3, to: Vec3, max_angle: f32) -> Vec3 {
    let angle = saacos(from.dot(to)).min(max_angle.max(0.0));
    let (axis, axis_len) = normalize_len(from.cross(to));
    if axis_len == 0.0 {
        return from;
    }
    normalize_or(Quat::from_axis_angle(axis, angle) * from, from)
}

/// Right-handed orientation whose local x axis is the heading and local z the
/// up vector. `forward_primary` keeps the heading exact and bends `up`;
/// otherwise `up` is exact and the heading is flattened onto its plane.
pub fn orientation_from_axes(forward: Vec3, up: Vec3, forward_primary: bool) -> Quat {
    let (x, z) = if forward_primary {
        let x = normalize_or(forward, Vec3::X);
        let z = normalize_or(reject(up, x), x.any_orthonormal_vector());
        (x, z)
    } else {
        let z = normalize_or(up, Vec3::Z);
        let x = normalize_or(reject(forward, z), z.any_orthonormal_vector());
        (x, z)
    };
    let y = z.cross(x);
    Quat::from_mat3(&Mat3::from_cols(x, y, z)).normalize()
}
