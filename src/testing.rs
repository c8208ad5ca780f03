//! Hand-built fixtures shared by the unit tests.

use glam::Vec3;

use crate::agent::Agent;
use crate::collider::{Collider, Surface};
use crate::scene::{Scene, SceneObject};
use crate::settings::{BoidSettings, TargetMode};
use crate::simulation::{StepContext, SystemId, SystemSnapshot, TargetSnapshot};

pub const DT: f32 = 0.04;

/// Agent whose frozen and current states agree.
pub fn agent_at(position: Vec3, velocity: Vec3) -> Agent {
    Agent::new(position, velocity, 1.0, &BoidSettings::default())
}

pub fn ground_scene() -> Scene {
    let mut scene = Scene::default();
    let ground = scene.add_object(SceneObject::new("ground", Vec3::ZERO));
    scene.colliders.push(Collider {
        object: ground,
        surface: Surface::Plane {
            offset: Vec3::ZERO,
            normal: Vec3::Z,
        },
    });
    scene
}

pub struct Fixture {
    pub scene: Scene,
    pub settings: BoidSettings,
    pub own: SystemSnapshot,
    pub targets: Vec<TargetSnapshot>,
}

impl Fixture {
    /// Freezes `agents` as the evaluated system.
    pub fn new(settings: BoidSettings, agents: &[Agent]) -> Self {
        let own = SystemSnapshot::capture(agents, settings.strength);
        Self {
            scene: Scene::default(),
            settings,
            own,
            targets: Vec::new(),
        }
    }

    pub fn with_scene(mut self, scene: Scene) -> Self {
        self.scene = scene;
        self
    }

    pub fn with_target(mut self, mode: TargetMode, agents: &[Agent], strength: f32) -> Self {
        let system = SystemId(self.targets.len() + 1);
        self.targets.push(TargetSnapshot {
            system,
            mode,
            snapshot: SystemSnapshot::capture(agents, strength),
        });
        self
    }

    pub fn ctx(&self, frame: u32) -> StepContext<'_> {
        StepContext {
            settings: &self.settings,
            scene: &self.scene,
            own: &self.own,
            targets: &self.targets,
            system: SystemId(0),
            seed: 17,
            dt: DT,
            frame,
        }
    }
}
