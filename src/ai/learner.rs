use serde::{Deserialize, Serialize};

use crate::game::state::{BallOutcome, Delivery, MatchPhase, DELIVERY_COUNT, PHASE_COUNT};

/// Q-value estimates per (phase, delivery), from the bowler's point of
/// view. Dense so every valid pair has exactly one entry.
pub type QTable = [[f64; DELIVERY_COUNT]; PHASE_COUNT];

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct LearnerConfig {
    /// Learning rate.
    pub alpha: f64,
    /// Discount on the best future value.
    pub gamma: f64,
    /// Cap on the magnitude of a single update step.
    pub max_step: f64,
}

impl Default for LearnerConfig {
    fn default() -> Self {
        Self {
            alpha: 0.2,
            gamma: 0.9,
            max_step: 2.5,
        }
    }
}

/// Tabular Q-learning over delivery choices. Entries start at a
/// neutral 0.0 and move by bounded steps toward observed reward plus
/// the discounted best-future estimate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeliveryLearner {
    table: QTable,
    config: LearnerConfig,
}

impl Default for DeliveryLearner {
    fn default() -> Self {
        Self::new(LearnerConfig::default())
    }
}

impl DeliveryLearner {
    pub fn new(config: LearnerConfig) -> Self {
        Self {
            table: [[0.0; DELIVERY_COUNT]; PHASE_COUNT],
            config,
        }
    }

    pub fn config(&self) -> LearnerConfig {
        self.config
    }

    pub fn table(&self) -> &QTable {
        &self.table
    }

    pub fn value(&self, phase: MatchPhase, delivery: Delivery) -> f64 {
        self.table[phase.index()][delivery.index()]
    }

    pub fn best_value(&self, phase: MatchPhase) -> f64 {
        let row = &self.table[phase.index()];
        row.iter().fold(f64::NEG_INFINITY, |acc, v| acc.max(*v))
    }

    /// Highest-valued delivery for `phase`; ties fall to the fixed
    /// priority order of `Delivery::ALL`.
    pub fn best_delivery(&self, phase: MatchPhase) -> Delivery {
        let mut best = Delivery::ALL[0];
        let mut best_value = f64::NEG_INFINITY;
        for delivery in Delivery::ALL {
            let value = self.value(phase, delivery);
            if value > best_value {
                best_value = value;
                best = delivery;
            }
        }
        best
    }

    /// One Q-learning step; returns the (bounded) delta applied.
    pub fn update(
        &mut self,
        phase: MatchPhase,
        delivery: Delivery,
        reward: f64,
        next_phase: MatchPhase,
    ) -> f64 {
        let current = self.value(phase, delivery);
        let target = reward + self.config.gamma * self.best_value(next_phase);
        let step = (self.config.alpha * (target - current))
            .clamp(-self.config.max_step, self.config.max_step);
        self.table[phase.index()][delivery.index()] = current + step;
        step
    }

    /// Convenience: update straight from a resolved ball outcome.
    pub fn observe(
        &mut self,
        phase: MatchPhase,
        delivery: Delivery,
        outcome: &BallOutcome,
        next_phase: MatchPhase,
    ) -> f64 {
        self.update(phase, delivery, outcome.bowler_reward(), next_phase)
    }
}
