use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::config::EPSILON;
use crate::math::{normalize_len, normalize_or};
use crate::scene::ObjectId;

/// Swept-sphere query. `radius == 0` is a plain ray.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    /// Unit direction.
    pub direction: Vec3,
    pub max_distance: f32,
    pub radius: f32,
    /// Object ignored by the query, usually the current ground.
    pub skip: Option<ObjectId>,
}

impl Ray {
    /// Ray from `start` to `end`. Degenerate segments point down.
    pub fn between(start: Vec3, end: Vec3, radius: f32, skip: Option<ObjectId>) -> Self {
        let (direction, len) = normalize_len(end - start);
        Self {
            origin: start,
            direction: if len > 0.0 { direction } else { -Vec3::Z },
            max_distance: len,
            radius,
            skip,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RayHit {
    /// Distance travelled along the ray before contact.
    pub distance: f32,
    /// Contact point on the surface.
    pub point: Vec3,
    /// Surface normal facing the ray origin.
    pub normal: Vec3,
    pub object: ObjectId,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SurfacePoint {
    pub point: Vec3,
    pub normal: Vec3,
    /// Surface velocity in units per second.
    pub velocity: Vec3,
}

/// Collision geometry provider. Mesh and BVH implementations live outside
/// this crate; `Scene` answers queries against analytic surfaces.
pub trait ColliderQuery: Sync {
    fn raycast(&self, ray: &Ray) -> Option<RayHit>;
    fn closest_point(&self, object: ObjectId, point: Vec3) -> Option<SurfacePoint>;
}

/// Analytic surface in object space; `offset` is relative to the owning
/// object's location so the surface moves with it.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Surface {
    Plane { offset: Vec3, normal: Vec3 },
    Sphere { offset: Vec3, radius: f32 },
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Collider {
    pub object: ObjectId,
    pub surface: Surface,
}

impl Surface {
    /// First contact of a swept sphere, as (distance, contact point, normal).
    pub fn cast(&self, anchor: Vec3, ray: &Ray) -> Option<(f32, Vec3, Vec3)> {
        match *self {
            Surface::Plane { offset, normal } => {
                let n = normalize_or(normal, Vec3::Z);
                let origin_height = (ray.origin - (anchor + offset)).dot(n);
                let side = if origin_height.abs() > EPSILON {
                    origin_height.signum()
                } else if ray.direction.dot(n) > 0.0 {
                    -1.0
                } else {
                    1.0
                };
                let approach = ray.direction.dot(n) * side;
                if approach >= -EPSILON {
                    return None;
                }
                let t = ((origin_height * side - ray.radius) / -approach).max(0.0);
                if t > ray.max_distance {
                    return None;
                }
                let facing = n * side;
                let point = ray.origin + ray.direction * t - facing * ray.radius;
                Some((t, point, facing))
            }
            Surface::Sphere { offset, radius } => {
                let center = anchor + offset;
                let reach = radius + ray.radius;
                let oc = ray.origin - center;
                let b = oc.dot(ray.direction);
                let c = oc.length_squared() - reach * reach;
                let disc = b * b - c;
                if disc < 0.0 {
                    return None;
                }
                let root = disc.sqrt();
                let (t, inside) = if c > 0.0 { (-b - root, false) } else { (-b + root, true) };
                if t < 0.0 || t > ray.max_distance {
                    return None;
                }
                let hit_center = ray.origin + ray.direction * t;
                let outward = normalize_or(hit_center - center, Vec3::Z);
                let point = center + outward * radius;
                let facing = if inside { -outward } else { outward };
                Some((t, point, facing))
            }
        }
    }

    /// Closest surface point and the normal on the side of `point`.
    pub fn closest(&self, anchor: Vec3, point: Vec3) -> (Vec3, Vec3) {
        match *self {
            Surface::Plane { offset, normal } => {
                let n = normalize_or(normal, Vec3::Z);
                let height = (point - (anchor + offset)).dot(n);
                let facing = if height < 0.0 { -n } else { n };
                (point - n * height, facing)
            }
            Surface::Sphere { offset, radius } => {
                let center = anchor + offset;
                let outward = normalize_or(point - center, Vec3::Z);
                (center + outward * radius, outward)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ground() -> Surface {
        Surface::Plane {
            offset: Vec3::ZERO,
            normal: Vec3::Z,
        }
    }

    #[test]
    fn plane_cast_from_above_hits_below() {
        let ray = Ray::between(Vec3::new(1.0, 2.0, 5.0), Vec3::new(1.0, 2.0, -5.0), 0.0, None);
        let (t, point, normal) = ground().cast(Vec3::ZERO, &ray).unwrap();
        assert!((t - 5.0).abs() < 1e-5);
        assert!((point - Vec3::new(1.0, 2.0, 0.0)).length() < 1e-5);
        assert_eq!(normal, Vec3::Z);
    }

    #[test]
    fn swept_plane_cast_stops_one_radius_early() {
        let ray = Ray::between(Vec3::new(0.0, 0.0, 5.0), Vec3::new(0.0, 0.0, -5.0), 1.0, None);
        let (t, point, _) = ground().cast(Vec3::ZERO, &ray).unwrap();
        assert!((t - 4.0).abs() < 1e-5);
        assert!(point.z.abs() < 1e-5);
    }

    #[test]
    fn plane_cast_moving_away_misses() {
        let ray = Ray::between(Vec3::new(0.0, 0.0, 1.0), Vec3::new(0.0, 0.0, 3.0), 0.0, None);
        assert!(ground().cast(Vec3::ZERO, &ray).is_none());
    }

    #[test]
    fn anchored_sphere_follows_its_object() {
        let sphere = Surface::Sphere {
            offset: Vec3::ZERO,
            radius: 1.0,
        };
        let anchor = Vec3::new(10.0, 0.0, 0.0);
        let ray = Ray::between(Vec3::ZERO, Vec3::new(20.0, 0.0, 0.0), 0.0, None);
        let (t, point, normal) = sphere.cast(anchor, &ray).unwrap();
        assert!((t - 9.0).abs() < 1e-4);
        assert!((point - Vec3::new(9.0, 0.0, 0.0)).length() < 1e-4);
        assert!((normal + Vec3::X).length() < 1e-5);

        let (closest, n) = sphere.closest(anchor, Vec3::new(10.0, 0.0, 4.0));
        assert!((closest - Vec3::new(10.0, 0.0, 1.0)).length() < 1e-5);
        assert!((n - Vec3::Z).length() < 1e-5);
    }

    #[test]
    fn plane_closest_point_faces_query_side() {
        let (point, normal) = ground().closest(Vec3::ZERO, Vec3::new(3.0, 4.0, -2.0));
        assert_eq!(point, Vec3::new(3.0, 4.0, 0.0));
        assert_eq!(normal, -Vec3::Z);
    }
}
