use std::fmt;
use std::sync::OnceLock;

use glam::Vec3;
use noise::{NoiseFn, Perlin};
use serde::{Deserialize, Serialize};

use crate::math::normalize_or;
use crate::scene::ObjectId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectorShape {
    Point,
    Plane,
    /// Distance is measured to the owning object's collider surface.
    Surface,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Force,
    Wind,
    Turbulence { size: f32, seed: u32 },
    Drag { linear: f32, quadratic: f32 },
    /// Steering target for Goal/Avoid rules; exerts no force.
    Boid,
}

/// `(1 + d - min)^-power`, 1 inside `min_distance`, 0 beyond `max_distance`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Falloff {
    pub power: f32,
    pub min_distance: Option<f32>,
    pub max_distance: Option<f32>,
}

impl Default for Falloff {
    fn default() -> Self {
        Self {
            power: 0.0,
            min_distance: None,
            max_distance: None,
        }
    }
}

impl Falloff {
    pub fn at(&self, distance: f32) -> f32 {
        if let Some(max) = self.max_distance {
            if distance > max {
                return 0.0;
            }
        }
        let min = self.min_distance.unwrap_or(0.0);
        if self.min_distance.is_some() && distance < min {
            return 1.0;
        }
        if self.power == 0.0 {
            return 1.0;
        }
        (1.0 + (distance - min).max(0.0)).powf(-self.power)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Effector {
    pub object: ObjectId,
    pub kind: FieldKind,
    #[serde(default = "default_shape")]
    pub shape: EffectorShape,
    pub strength: f32,
    /// Plane normal and wind direction.
    #[serde(default = "default_direction")]
    pub direction: Vec3,
    #[serde(default)]
    pub falloff: Falloff,
    #[serde(skip)]
    noise: TurbulenceNoise,
}

/// Perlin generator for a turbulence field, built once per effector.
/// Effectors loaded from a scenario fill it on first use.
#[derive(Clone, Default)]
struct TurbulenceNoise(OnceLock<(u32, Perlin)>);

impl TurbulenceNoise {
    fn seeded(seed: u32) -> Self {
        let cell = OnceLock::new();
        let _ = cell.set((seed, Perlin::new(seed)));
        Self(cell)
    }

    fn get(&self, seed: u32) -> Perlin {
        match self.0.get_or_init(|| (seed, Perlin::new(seed))) {
            (cached, noise) if *cached == seed => *noise,
            // seed edited after the first sample
            _ => Perlin::new(seed),
        }
    }
}

impl fmt::Debug for TurbulenceNoise {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TurbulenceNoise")
            .field(&self.0.get().map(|(seed, _)| *seed))
            .finish()
    }
}

/// Cached generator state never affects equality.
impl PartialEq for TurbulenceNoise {
    fn eq(&self, _: &Self) -> bool {
        true
    }
}

fn default_shape() -> EffectorShape {
    EffectorShape::Point
}

fn default_direction() -> Vec3 {
    Vec3::Z
}

/// Effector sample relative to a query point.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EffectorData {
    pub location: Vec3,
    pub normal: Vec3,
    /// Velocity of the owning object, units per second.
    pub velocity: Vec3,
    /// Query point minus `location`.
    pub vec_to_point: Vec3,
    pub distance: f32,
}

impl EffectorData {
    pub fn new(location: Vec3, normal: Vec3, velocity: Vec3, point: Vec3) -> Self {
        let vec_to_point = point - location;
        Self {
            location,
            normal,
            velocity,
            vec_to_point,
            distance: vec_to_point.length(),
        }
    }
}

/// Force field provider consulted by the integrator and the Goal/Avoid rules.
pub trait EffectorField: Sync {
    /// Global gravity, `None` when disabled.
    fn gravity(&self) -> Option<Vec3>;
    /// Summed external force at a point.
    fn evaluate(&self, position: Vec3, velocity: Vec3) -> Vec3;
    fn effectors(&self) -> &[Effector];
    fn effector_data(&self, effector: &Effector, point: Vec3) -> Option<EffectorData>;
    /// Sample for an object without an effector, treated as a point field.
    fn object_data(&self, object: ObjectId, point: Vec3) -> Option<EffectorData>;
}

impl Effector {
    /// Point effector with default direction and no falloff.
    pub fn new(object: ObjectId, kind: FieldKind, strength: f32) -> Self {
        let noise = match kind {
            FieldKind::Turbulence { seed, .. } => TurbulenceNoise::seeded(seed),
            _ => TurbulenceNoise::default(),
        };
        Self {
            object,
            kind,
            shape: default_shape(),
            strength,
            direction: default_direction(),
            falloff: Falloff::default(),
            noise,
        }
    }

    pub fn with_shape(mut self, shape: EffectorShape) -> Self {
        self.shape = shape;
        self
    }

    pub fn with_direction(mut self, direction: Vec3) -> Self {
        self.direction = direction;
        self
    }

    pub fn with_falloff(mut self, falloff: Falloff) -> Self {
        self.falloff = falloff;
        self
    }

    pub fn is_boid_field(&self) -> bool {
        matches!(self.kind, FieldKind::Boid)
    }

    /// Force contribution for a sample; zero for boid fields.
    pub fn force(&self, data: &EffectorData, position: Vec3, velocity: Vec3) -> Vec3 {
        let falloff = self.falloff.at(data.distance);
        if falloff == 0.0 {
            return Vec3::ZERO;
        }
        match self.kind {
            FieldKind::Force => {
                let away = match self.shape {
                    EffectorShape::Point => normalize_or(data.vec_to_point, Vec3::ZERO),
                    EffectorShape::Plane | EffectorShape::Surface => {
                        if data.vec_to_point.dot(data.normal) < 0.0 {
                            -data.normal
                        } else {
                            data.normal
                        }
                    }
                };
                away * self.strength * falloff
            }
            FieldKind::Wind => normalize_or(self.direction, Vec3::Z) * self.strength * falloff,
            FieldKind::Turbulence { size, seed } => {
                let noise = self.noise.get(seed);
                let scale = if size > 0.0 { 1.0 / size } else { 1.0 };
                let p = (position * scale).as_dvec3();
                let sample = |shift: f64| noise.get([p.x + shift, p.y, p.z]) as f32;
                Vec3::new(sample(0.0), sample(31.416), sample(62.832)) * self.strength * falloff
            }
            FieldKind::Drag { linear, quadratic } => {
                let speed = velocity.length();
                -velocity * (linear + quadratic * speed) * self.strength * falloff
            }
            FieldKind::Boid => Vec3::ZERO,
        }
    }
}
