use std::io::Write;

use serde::{Deserialize, Serialize};

use crate::agent::{Agent, LocomotionMode};
use crate::combat::DamageReport;
use crate::simulation::SystemId;

/// Order statistics of one per-agent quantity across a system's living
/// agents at the end of a frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Distribution {
    pub min: f32,
    pub max: f32,
    pub mean: f32,
    pub p10: f32,
    pub median: f32,
    pub p90: f32,
}

impl Distribution {
    /// Summarise `samples` in place; all zero when empty.
    pub fn of(samples: &mut [f32]) -> Self {
        if samples.is_empty() {
            return Self::default();
        }
        samples.sort_by(f32::total_cmp);
        let sorted = &*samples;
        Self {
            min: sorted[0],
            max: sorted[sorted.len() - 1],
            mean: sorted.iter().sum::<f32>() / sorted.len() as f32,
            p10: nearest_rank(sorted, 0.10),
            median: nearest_rank(sorted, 0.50),
            p90: nearest_rank(sorted, 0.90),
        }
    }

    pub fn spread(&self) -> f32 {
        self.p90 - self.p10
    }
}

fn nearest_rank(sorted: &[f32], fraction: f32) -> f32 {
    let rank = (fraction * sorted.len() as f32).ceil() as usize;
    sorted[rank.saturating_sub(1).min(sorted.len() - 1)]
}

/// Living agents per locomotion mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModeCounts {
    pub on_land: usize,
    pub in_air: usize,
    pub falling: usize,
    pub climbing: usize,
    pub liftoff: usize,
}

impl ModeCounts {
    pub fn add(&mut self, mode: LocomotionMode) {
        match mode {
            LocomotionMode::OnLand => self.on_land += 1,
            LocomotionMode::InAir => self.in_air += 1,
            LocomotionMode::Falling => self.falling += 1,
            LocomotionMode::Climbing => self.climbing += 1,
            LocomotionMode::Liftoff => self.liftoff += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.on_land + self.in_air + self.falling + self.climbing + self.liftoff
    }
}

/// What one system step did, one JSON line per system and frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepSummary {
    pub system: usize,
    pub name: String,
    pub frame: u32,
    pub alive: usize,
    /// Agents whose death was recorded this frame, whichever system dealt it.
    pub newly_dying: usize,
    pub modes: ModeCounts,
    /// Damage this system's agents dealt.
    pub damage_applied: f32,
    pub hits: usize,
    /// Agents of any system killed by this system's damage.
    pub kills: usize,
    pub speed: Distribution,
    pub altitude: Distribution,
    pub health: Distribution,
}

impl StepSummary {
    pub fn empty(system: SystemId, frame: u32) -> Self {
        Self {
            system: system.0,
            name: String::new(),
            frame,
            alive: 0,
            newly_dying: 0,
            modes: ModeCounts::default(),
            damage_applied: 0.0,
            hits: 0,
            kills: 0,
            speed: Distribution::default(),
            altitude: Distribution::default(),
            health: Distribution::default(),
        }
    }

    pub fn collect(
        system: SystemId,
        name: &str,
        frame: u32,
        agents: &[Agent],
        damage: &DamageReport,
    ) -> Self {
        let mut summary = Self {
            name: name.to_string(),
            damage_applied: damage.applied,
            hits: damage.hits,
            kills: damage.killed,
            ..Self::empty(system, frame)
        };
        summary.recount(agents);
        summary
    }

    /// Rebuild the agent census from the current agent states, keeping the
    /// damage totals.
    pub fn recount(&mut self, agents: &[Agent]) {
        let mut modes = ModeCounts::default();
        let mut speed = Vec::with_capacity(agents.len());
        let mut altitude = Vec::with_capacity(agents.len());
        let mut health = Vec::with_capacity(agents.len());
        let mut newly_dying = 0;
        for agent in agents {
            if agent.alive {
                modes.add(agent.mode);
                speed.push(agent.state.velocity.length());
                altitude.push(agent.state.position.z);
                health.push(agent.health);
            } else if agent.death_time == Some(self.frame) {
                newly_dying += 1;
            }
        }
        self.alive = modes.total();
        self.newly_dying = newly_dying;
        self.modes = modes;
        self.speed = Distribution::of(&mut speed);
        self.altitude = Distribution::of(&mut altitude);
        self.health = Distribution::of(&mut health);
    }
}

/// Append `value` as one line of JSON.
pub fn write_json_line<W: Write, T: Serialize>(out: &mut W, value: &T) -> std::io::Result<()> {
    serde_json::to_writer(&mut *out, value)?;
    out.write_all(b"\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::agent_at;
    use glam::Vec3;

    #[test]
    fn distribution_uses_nearest_rank() {
        let mut speeds: Vec<f32> = (1..=20).rev().map(|i| i as f32 * 0.5).collect();
        let d = Distribution::of(&mut speeds);
        assert_eq!(d.min, 0.5);
        assert_eq!(d.max, 10.0);
        assert!((d.mean - 5.25).abs() < 1e-5);
        assert_eq!(d.p10, 1.0);
        assert_eq!(d.median, 5.0);
        assert_eq!(d.p90, 9.0);
        assert_eq!(d.spread(), 8.0);

        assert_eq!(Distribution::of(&mut []), Distribution::default());
        let single = Distribution::of(&mut [3.0]);
        assert_eq!((single.p10, single.median, single.p90), (3.0, 3.0, 3.0));
    }

    #[test]
    fn summary_counts_modes_and_fresh_deaths() {
        let mut agents = vec![
            agent_at(Vec3::new(0.0, 0.0, 12.0), Vec3::new(3.0, 4.0, 0.0)),
            agent_at(Vec3::ONE, Vec3::X),
            agent_at(Vec3::Y, Vec3::X),
            agent_at(Vec3::Z, Vec3::X),
        ];
        agents[1].mode = LocomotionMode::OnLand;
        agents[1].health = 0.25;
        agents[2].kill(9);
        agents[3].kill(4);
        let report = DamageReport {
            applied: 0.5,
            hits: 2,
            killed: 1,
        };
        let summary = StepSummary::collect(SystemId(2), "flock", 9, &agents, &report);
        assert_eq!(summary.alive, 2);
        assert_eq!(summary.newly_dying, 1);
        assert_eq!(summary.modes.in_air, 1);
        assert_eq!(summary.modes.on_land, 1);
        assert_eq!(summary.speed.max, 5.0);
        assert_eq!(summary.altitude.max, 12.0);
        assert_eq!(summary.altitude.min, 1.0);
        assert_eq!(summary.health.min, 0.25);
        assert_eq!(summary.hits, 2);
        assert_eq!(summary.kills, 1);
    }

    #[test]
    fn recount_sees_later_deaths_and_keeps_damage() {
        let mut agents = vec![agent_at(Vec3::ZERO, Vec3::X), agent_at(Vec3::Z, Vec3::X)];
        let report = DamageReport {
            applied: 0.3,
            hits: 1,
            killed: 0,
        };
        let mut summary = StepSummary::collect(SystemId(0), "flock", 6, &agents, &report);
        assert_eq!(summary.alive, 2);

        agents[0].kill(6);
        summary.recount(&agents);
        assert_eq!(summary.alive, 1);
        assert_eq!(summary.newly_dying, 1);
        assert_eq!(summary.modes.in_air, 1);
        assert_eq!(summary.altitude.min, 1.0);
        assert_eq!(summary.hits, 1);
        assert!((summary.damage_applied - 0.3).abs() < 1e-6);
    }

    #[test]
    fn json_lines_are_newline_terminated() {
        let mut out = Vec::new();
        write_json_line(&mut out, &StepSummary::empty(SystemId(0), 3)).unwrap();
        write_json_line(&mut out, &StepSummary::empty(SystemId(1), 3)).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        let parsed: StepSummary = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(parsed.system, 1);
        assert_eq!(parsed.frame, 3);
    }
}
