use glam::Vec3;

use crate::agent::{Agent, BoidLimits};
use crate::combat::DamageIntent;
use crate::frand::{rule_selector, StepRng};
use crate::locomotion;
use crate::rules;
use crate::scene::ObjectId;
use crate::settings::{BoidRule, BoidState, RulesetPolicy};
use crate::simulation::StepContext;

/// Wanted velocity produced by a rule or a whole state.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SteeringIntent {
    /// Not normalized; its length is meaningful to some rules.
    pub direction: Vec3,
    pub speed: f32,
}

impl SteeringIntent {
    pub const ZERO: Self = Self {
        direction: Vec3::ZERO,
        speed: 0.0,
    };
}

/// Surface a Goal rule wants the agent to climb onto.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GoalTarget {
    pub object: ObjectId,
    pub location: Vec3,
    pub normal: Vec3,
    pub priority: f32,
}

/// Scratch space for one agent's decision in one step.
pub struct Brain<'c, 'a> {
    pub ctx: &'c StepContext<'a>,
    pub index: usize,
    pub agent: &'c mut Agent,
    pub limits: BoidLimits,
    pub rng: StepRng,
    pub goal: Option<GoalTarget>,
    pub damage: Vec<DamageIntent>,
}

/// Output of the brain pass, consumed by the integrator.
pub struct Thought {
    pub intent: SteeringIntent,
    pub goal: Option<GoalTarget>,
    pub damage: Vec<DamageIntent>,
    pub rng: StepRng,
}

enum Outcome {
    Skipped,
    Accepted(SteeringIntent),
    Suppressed(SteeringIntent),
}

fn apply_rule(rule: &BoidRule, brain: &mut Brain<'_, '_>, fuzziness: Option<f32>) -> Outcome {
    if !rule.applicability.allows(brain.agent.mode) {
        return Outcome::Skipped;
    }
    let Some(intent) = rules::evaluate(rule, brain) else {
        return Outcome::Skipped;
    };
    match fuzziness {
        Some(fuzziness) => {
            let velocity = brain.agent.previous.velocity;
            if (intent.direction - velocity).length() < fuzziness * velocity.length() {
                Outcome::Suppressed(intent)
            } else {
                Outcome::Accepted(intent)
            }
        }
        None => Outcome::Accepted(intent),
    }
}

/// Combine a state's rules into one wanted velocity.
pub fn combine(state: &BoidState, brain: &mut Brain<'_, '_>) -> SteeringIntent {
    match state.policy {
        RulesetPolicy::Fuzzy => {
            // A candidate close to the current velocity is "good enough" but
            // later rules still get a chance to propose a real change.
            let mut fallback = None;
            for rule in &state.rules {
                match apply_rule(rule, brain, Some(state.fuzziness)) {
                    Outcome::Accepted(intent) => return intent,
                    Outcome::Suppressed(intent) => fallback = Some(intent),
                    Outcome::Skipped => {}
                }
            }
            fallback.unwrap_or_default()
        }
        RulesetPolicy::Random => {
            if state.rules.is_empty() {
                return SteeringIntent::ZERO;
            }
            let pick = rule_selector(brain.ctx.seed, brain.index, brain.ctx.frame) as usize
                % state.rules.len();
            match apply_rule(&state.rules[pick], brain, None) {
                Outcome::Accepted(intent) => intent,
                _ => SteeringIntent::ZERO,
            }
        }
        RulesetPolicy::Averaged => {
            let mut sum = SteeringIntent::ZERO;
            let mut count = 0usize;
            for rule in &state.rules {
                if let Outcome::Accepted(intent) = apply_rule(rule, brain, None) {
                    sum.direction += intent.direction;
                    sum.speed += intent.speed;
                    count += 1;
                }
            }
            if count > 1 {
                sum.direction /= count as f32;
                sum.speed /= count as f32;
            }
            sum
        }
    }
}

/// Run the brain for one agent: combine its active state, then decide on
/// takeoff or a jump.
pub fn think(ctx: &StepContext<'_>, index: usize, agent: &mut Agent) -> Thought {
    let limits = BoidLimits::for_agent(ctx.settings, agent);
    let state = ctx.settings.state(agent.state_index);
    let mut brain = Brain {
        ctx,
        index,
        agent,
        limits,
        rng: StepRng::new(ctx.seed, index, ctx.frame),
        goal: None,
        damage: Vec::new(),
    };
    let (intent, fuzziness) = match state {
        Some(state) => (combine(state, &mut brain), state.fuzziness),
        None => (SteeringIntent::ZERO, 0.0),
    };
    locomotion::decide_takeoff(
        brain.agent,
        &brain.limits,
        ctx.settings,
        ctx.scene.gravity(),
        &intent,
        fuzziness,
    );
    Thought {
        intent,
        goal: brain.goal,
        damage: brain.damage,
        rng: brain.rng,
    }
}
