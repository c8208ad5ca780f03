use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::collider::{Collider, ColliderQuery, Ray, RayHit, SurfacePoint};
use crate::effector::{Effector, EffectorData, EffectorField, EffectorShape};
use crate::error::ConfigError;
use crate::math::normalize_or;

/// Handle into `Scene::objects`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId(pub usize);

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SceneObject {
    pub name: String,
    pub location: Vec3,
    /// Location one frame earlier. Reset to `location` on load.
    #[serde(default)]
    pub previous_location: Vec3,
    /// Units per second, applied by `Scene::advance`.
    #[serde(default)]
    pub velocity: Vec3,
}

impl SceneObject {
    pub fn new(name: impl Into<String>, location: Vec3) -> Self {
        Self {
            name: name.into(),
            location,
            previous_location: location,
            velocity: Vec3::ZERO,
        }
    }

    pub fn moving(mut self, velocity: Vec3) -> Self {
        self.velocity = velocity;
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ObjectMotion {
    pub location: Vec3,
    pub previous_location: Vec3,
}

/// Everything a boid step reads from its surroundings.
pub trait SceneQuery: ColliderQuery + EffectorField {
    fn object_motion(&self, object: ObjectId) -> Option<ObjectMotion>;
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    #[serde(default = "default_gravity")]
    pub gravity: Option<Vec3>,
    #[serde(default)]
    pub objects: Vec<SceneObject>,
    #[serde(default)]
    pub colliders: Vec<Collider>,
    #[serde(default)]
    pub effectors: Vec<Effector>,
}

fn default_gravity() -> Option<Vec3> {
    Some(Vec3::new(0.0, 0.0, -9.81))
}

impl Default for Scene {
    fn default() -> Self {
        Self {
            gravity: default_gravity(),
            objects: Vec::new(),
            colliders: Vec::new(),
            effectors: Vec::new(),
        }
    }
}

impl Scene {
    pub fn add_object(&mut self, object: SceneObject) -> ObjectId {
        self.objects.push(object);
        ObjectId(self.objects.len() - 1)
    }

    pub fn object(&self, id: ObjectId) -> Option<&SceneObject> {
        self.objects.get(id.0)
    }

    pub fn find(&self, name: &str) -> Option<ObjectId> {
        self.objects.iter().position(|o| o.name == name).map(ObjectId)
    }

    /// Move every object by one frame of its velocity.
    pub fn advance(&mut self, dt: f32) {
        for object in &mut self.objects {
            object.previous_location = object.location;
            object.location += object.velocity * dt;
        }
    }

    /// Forget stale motion, e.g. after loading a scene description.
    pub fn reset_motion(&mut self) {
        for object in &mut self.objects {
            object.previous_location = object.location;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let known = |id: ObjectId| id.0 < self.objects.len();
        for collider in &self.colliders {
            if !known(collider.object) {
                return Err(ConfigError::DanglingObject(collider.object.0));
            }
        }
        for effector in &self.effectors {
            if !known(effector.object) {
                return Err(ConfigError::DanglingObject(effector.object.0));
            }
        }
        Ok(())
    }

    fn closest_on(&self, object: ObjectId, point: Vec3) -> Option<(Vec3, Vec3)> {
        let anchor = self.object(object)?.location;
        self.colliders
            .iter()
            .filter(|c| c.object == object)
            .map(|c| c.surface.closest(anchor, point))
            .min_by(|a, b| {
                a.0.distance_squared(point)
                    .total_cmp(&b.0.distance_squared(point))
            })
    }
}

impl ColliderQuery for Scene {
    fn raycast(&self, ray: &Ray) -> Option<RayHit> {
        let mut best: Option<RayHit> = None;
        for collider in &self.colliders {
            if ray.skip == Some(collider.object) {
                continue;
            }
            let Some(object) = self.object(collider.object) else {
                continue;
            };
            if let Some((distance, point, normal)) = collider.surface.cast(object.location, ray) {
                if best.map_or(true, |b| distance < b.distance) {
                    best = Some(RayHit {
                        distance,
                        point,
                        normal,
                        object: collider.object,
                    });
                }
            }
        }
        best
    }

    fn closest_point(&self, object: ObjectId, point: Vec3) -> Option<SurfacePoint> {
        let velocity = self.object(object)?.velocity;
        let (point, normal) = self.closest_on(object, point)?;
        Some(SurfacePoint {
            point,
            normal,
            velocity,
        })
    }
}

impl EffectorField for Scene {
    fn gravity(&self) -> Option<Vec3> {
        self.gravity
    }

    fn evaluate(&self, position: Vec3, velocity: Vec3) -> Vec3 {
        self.effectors
            .iter()
            .filter(|e| !e.is_boid_field())
            .filter_map(|e| {
                let data = self.effector_data(e, position)?;
                Some(e.force(&data, position, velocity))
            })
            .sum()
    }

    fn effectors(&self) -> &[Effector] {
        &self.effectors
    }

    fn effector_data(&self, effector: &Effector, point: Vec3) -> Option<EffectorData> {
        let object = self.object(effector.object)?;
        let normal = normalize_or(effector.direction, Vec3::Z);
        let data = match effector.shape {
            EffectorShape::Point => EffectorData::new(object.location, normal, object.velocity, point),
            EffectorShape::Plane => {
                let on_plane = point - normal * (point - object.location).dot(normal);
                EffectorData::new(on_plane, normal, object.velocity, point)
            }
            EffectorShape::Surface => match self.closest_on(effector.object, point) {
                Some((surface, surface_normal)) => {
                    EffectorData::new(surface, surface_normal, object.velocity, point)
                }
                None => EffectorData::new(object.location, normal, object.velocity, point),
            },
        };
        Some(data)
    }

    fn object_data(&self, object: ObjectId, point: Vec3) -> Option<EffectorData> {
        let object = self.object(object)?;
        Some(EffectorData::new(
            object.location,
            Vec3::Z,
            object.velocity,
            point,
        ))
    }
}

impl SceneQuery for Scene {
    fn object_motion(&self, object: ObjectId) -> Option<ObjectMotion> {
        let object = self.object(object)?;
        Some(ObjectMotion {
            location: object.location,
            previous_location: object.previous_location,
        })
    }
}
