//! Per-system boid behaviour: kinematic limits, options and the rule states.

use serde::{Deserialize, Serialize};

use crate::agent::LocomotionMode;
use crate::error::ConfigError;
use crate::scene::ObjectId;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RulesetPolicy {
    /// First rule whose result differs enough from the current velocity.
    #[default]
    Fuzzy,
    /// One rule per agent and frame.
    Random,
    /// Mean of every rule result.
    Averaged,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Applicability {
    pub on_land: bool,
    pub in_air: bool,
}

impl Default for Applicability {
    fn default() -> Self {
        Self {
            on_land: true,
            in_air: true,
        }
    }
}

impl Applicability {
    /// Falling and Liftoff agents consider every rule.
    pub fn allows(&self, mode: LocomotionMode) -> bool {
        match mode {
            LocomotionMode::OnLand | LocomotionMode::Climbing => self.on_land,
            LocomotionMode::InAir => self.in_air,
            LocomotionMode::Falling | LocomotionMode::Liftoff => true,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GoalAvoid {
    pub object: Option<ObjectId>,
    /// Lead moving targets by their frame displacement.
    pub predict: bool,
    pub fear_factor: f32,
}

impl Default for GoalAvoid {
    fn default() -> Self {
        Self {
            object: None,
            predict: true,
            fear_factor: 0.5,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AvoidCollision {
    pub with_boids: bool,
    pub with_deflectors: bool,
    /// Seconds of travel to look ahead.
    pub look_ahead: f32,
}

impl Default for AvoidCollision {
    fn default() -> Self {
        Self {
            with_boids: true,
            with_deflectors: false,
            look_ahead: 2.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FollowLeader {
    pub object: Option<ObjectId>,
    /// Seconds behind the leader.
    pub distance: f32,
    pub queue_size: usize,
    pub in_line: bool,
}

impl Default for FollowLeader {
    fn default() -> Self {
        Self {
            object: None,
            distance: 1.0,
            queue_size: 1,
            in_line: false,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AverageSpeed {
    pub wander: f32,
    pub level: f32,
    /// Fraction of max speed.
    pub speed: f32,
}

impl Default for AverageSpeed {
    fn default() -> Self {
        Self {
            wander: 0.5,
            level: 0.0,
            speed: 0.5,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Fight {
    pub distance: f32,
    /// Fraction of `distance` inside which a losing agent flees.
    pub flee_distance: f32,
}

impl Default for Fight {
    fn default() -> Self {
        Self {
            distance: 5.0,
            flee_distance: 0.5,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    None,
    Goal(GoalAvoid),
    Avoid(GoalAvoid),
    AvoidCollision(AvoidCollision),
    Separate,
    Flock,
    FollowLeader(FollowLeader),
    AverageSpeed(AverageSpeed),
    Fight(Fight),
}

impl RuleKind {
    pub fn label(&self) -> &'static str {
        match self {
            RuleKind::None => "None",
            RuleKind::Goal(_) => "Goal",
            RuleKind::Avoid(_) => "Avoid",
            RuleKind::AvoidCollision(_) => "Avoid Collision",
            RuleKind::Separate => "Separate",
            RuleKind::Flock => "Flock",
            RuleKind::FollowLeader(_) => "Follow Leader",
            RuleKind::AverageSpeed(_) => "Average Speed",
            RuleKind::Fight(_) => "Fight",
        }
    }

    fn referenced_object(&self) -> Option<ObjectId> {
        match self {
            RuleKind::Goal(g) | RuleKind::Avoid(g) => g.object,
            RuleKind::FollowLeader(f) => f.object,
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoidRule {
    pub name: String,
    #[serde(default)]
    pub applicability: Applicability,
    pub kind: RuleKind,
}

impl BoidRule {
    pub fn new(kind: RuleKind) -> Self {
        Self {
            name: kind.label().to_string(),
            applicability: Applicability::default(),
            kind,
        }
    }

    pub fn in_air_only(mut self) -> Self {
        self.applicability.on_land = false;
        self
    }

    pub fn on_land_only(mut self) -> Self {
        self.applicability.in_air = false;
        self
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoidState {
    pub name: String,
    pub rules: Vec<BoidRule>,
    #[serde(default)]
    pub policy: RulesetPolicy,
    #[serde(default = "default_fuzziness")]
    pub fuzziness: f32,
}

fn default_fuzziness() -> f32 {
    0.5
}

impl Default for BoidState {
    fn default() -> Self {
        Self {
            name: "State".to_string(),
            rules: vec![
                BoidRule::new(RuleKind::Separate),
                BoidRule::new(RuleKind::Flock),
            ],
            policy: RulesetPolicy::Fuzzy,
            fuzziness: default_fuzziness(),
        }
    }
}

impl BoidState {
    pub fn with_rules(name: impl Into<String>, policy: RulesetPolicy, rules: Vec<BoidRule>) -> Self {
        Self {
            name: name.into(),
            rules,
            policy,
            fuzziness: default_fuzziness(),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetMode {
    Friend,
    Enemy,
    #[default]
    Neutral,
}

/// Another boid system this one reacts to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticleTarget {
    pub system: usize,
    #[serde(default)]
    pub mode: TargetMode,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoidSettings {
    pub air_max_speed: f32,
    /// Fraction of `air_max_speed`.
    pub air_min_speed: f32,
    /// Fraction of max speed gained per step.
    pub air_max_acc: f32,
    /// Fraction of a half turn per step.
    pub air_max_ave: f32,
    pub air_personal_space: f32,

    pub land_max_speed: f32,
    pub land_max_acc: f32,
    pub land_max_ave: f32,
    pub land_personal_space: f32,
    pub land_jump_speed: f32,
    pub land_stick_force: f32,

    pub allow_flight: bool,
    pub allow_land: bool,
    pub allow_climb: bool,

    pub landing_smoothness: f32,
    pub banking: f32,
    pub pitch: f32,
    /// Body height as a fraction of size.
    pub height: f32,

    pub health: f32,
    pub strength: f32,
    pub aggression: f32,
    pub accuracy: f32,
    pub range: f32,

    pub mass: f32,
    pub mass_from_size: bool,
    pub damping: f32,

    pub states: Vec<BoidState>,
    pub targets: Vec<ParticleTarget>,
}

impl Default for BoidSettings {
    fn default() -> Self {
        Self {
            air_max_speed: 10.0,
            air_min_speed: 0.0,
            air_max_acc: 0.5,
            air_max_ave: 0.5,
            air_personal_space: 1.0,
            land_max_speed: 5.0,
            land_max_acc: 0.5,
            land_max_ave: 0.5,
            land_personal_space: 1.0,
            land_jump_speed: 0.0,
            land_stick_force: 1.0,
            allow_flight: true,
            allow_land: false,
            allow_climb: false,
            landing_smoothness: 3.0,
            banking: 1.0,
            pitch: 1.0,
            height: 1.0,
            health: 1.0,
            strength: 0.1,
            aggression: 2.0,
            accuracy: 1.0,
            range: 1.0,
            mass: 1.0,
            mass_from_size: false,
            damping: 0.0,
            states: vec![BoidState::default()],
            targets: Vec::new(),
        }
    }
}

fn check(field: &'static str, value: f32, expected: &'static str, ok: bool) -> Result<(), ConfigError> {
    if ok && value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            field,
            expected,
            value,
        })
    }
}

fn non_negative(field: &'static str, value: f32) -> Result<(), ConfigError> {
    check(field, value, "finite and >= 0", value >= 0.0)
}

fn unit_range(field: &'static str, value: f32) -> Result<(), ConfigError> {
    check(field, value, "within [0, 1]", (0.0..=1.0).contains(&value))
}

impl BoidSettings {
    /// Active state for an agent; out-of-range indices fall back to the first.
    pub fn state(&self, index: usize) -> Option<&BoidState> {
        self.states.get(index).or_else(|| self.states.first())
    }

    pub fn mass_for(&self, size: f32) -> f32 {
        if self.mass_from_size {
            self.mass * size
        } else {
            self.mass
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        non_negative("air_max_speed", self.air_max_speed)?;
        unit_range("air_min_speed", self.air_min_speed)?;
        non_negative("air_max_acc", self.air_max_acc)?;
        non_negative("air_max_ave", self.air_max_ave)?;
        non_negative("air_personal_space", self.air_personal_space)?;
        non_negative("land_max_speed", self.land_max_speed)?;
        non_negative("land_max_acc", self.land_max_acc)?;
        non_negative("land_max_ave", self.land_max_ave)?;
        non_negative("land_personal_space", self.land_personal_space)?;
        non_negative("land_jump_speed", self.land_jump_speed)?;
        non_negative("land_stick_force", self.land_stick_force)?;
        non_negative("landing_smoothness", self.landing_smoothness)?;
        non_negative("height", self.height)?;
        check("health", self.health, "> 0", self.health > 0.0)?;
        non_negative("strength", self.strength)?;
        non_negative("aggression", self.aggression)?;
        unit_range("accuracy", self.accuracy)?;
        non_negative("range", self.range)?;
        check("mass", self.mass, "> 0", self.mass > 0.0)?;
        unit_range("damping", self.damping)?;
        for v in [self.banking, self.pitch] {
            check("banking/pitch", v, "finite", true)?;
        }

        if self.states.is_empty() {
            return Err(ConfigError::NoStates);
        }
        for state in &self.states {
            if state.rules.is_empty() {
                return Err(ConfigError::EmptyState(state.name.clone()));
            }
            unit_range("fuzziness", state.fuzziness)?;
            for rule in &state.rules {
                match &rule.kind {
                    RuleKind::Goal(g) | RuleKind::Avoid(g) => {
                        non_negative("fear_factor", g.fear_factor)?
                    }
                    RuleKind::AvoidCollision(a) => non_negative("look_ahead", a.look_ahead)?,
                    RuleKind::FollowLeader(f) => non_negative("distance", f.distance)?,
                    RuleKind::AverageSpeed(a) => {
                        non_negative("wander", a.wander)?;
                        unit_range("level", a.level)?;
                        unit_range("speed", a.speed)?;
                    }
                    RuleKind::Fight(f) => {
                        non_negative("fight distance", f.distance)?;
                        unit_range("flee_distance", f.flee_distance)?;
                    }
                    RuleKind::None | RuleKind::Separate | RuleKind::Flock => {}
                }
            }
        }
        Ok(())
    }

    /// Object handles named by rules, for cross-checking against a scene.
    pub fn referenced_objects(&self) -> impl Iterator<Item = (&str, ObjectId)> + '_ {
        self.states
            .iter()
            .flat_map(|s| s.rules.iter())
            .filter_map(|r| r.kind.referenced_object().map(|o| (r.name.as_str(), o)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        let settings = BoidSettings::default();
        assert!(settings.validate().is_ok());
        let state = settings.state(0).unwrap();
        assert_eq!(state.policy, RulesetPolicy::Fuzzy);
        assert_eq!(state.rules.len(), 2);
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        let settings = BoidSettings {
            health: 0.0,
            ..BoidSettings::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(ConfigError::OutOfRange { field: "health", .. })
        ));

        let settings = BoidSettings {
            states: vec![],
            ..BoidSettings::default()
        };
        assert!(matches!(settings.validate(), Err(ConfigError::NoStates)));
    }

    #[test]
    fn state_index_falls_back_to_first() {
        let settings = BoidSettings::default();
        assert_eq!(settings.state(5).map(|s| s.name.as_str()), Some("State"));
    }

    #[test]
    fn applicability_by_mode() {
        let air = BoidRule::new(RuleKind::Flock).in_air_only().applicability;
        assert!(air.allows(LocomotionMode::InAir));
        assert!(!air.allows(LocomotionMode::OnLand));
        assert!(!air.allows(LocomotionMode::Climbing));
        assert!(air.allows(LocomotionMode::Falling));
        assert!(air.allows(LocomotionMode::Liftoff));
    }

    #[test]
    fn rules_parse_from_json_with_defaults() {
        let json = r#"{
            "name": "hunt",
            "policy": "averaged",
            "rules": [
                { "name": "chase", "kind": { "goal": { "object": 2 } } },
                { "name": "spread", "kind": "separate", "applicability": { "on_land": false } }
            ]
        }"#;
        let state: BoidState = serde_json::from_str(json).unwrap();
        assert_eq!(state.policy, RulesetPolicy::Averaged);
        assert_eq!(state.fuzziness, 0.5);
        match state.rules[0].kind {
            RuleKind::Goal(g) => {
                assert_eq!(g.object, Some(ObjectId(2)));
                assert!(g.predict);
                assert_eq!(g.fear_factor, 0.5);
            }
            other => panic!("unexpected rule {other:?}"),
        }
        assert!(!state.rules[1].applicability.on_land);
        assert!(state.rules[1].applicability.in_air);
    }
}
