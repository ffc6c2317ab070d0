use serde::{Deserialize, Serialize};

use crate::game::state::{Delivery, MatchPhase, MatchState, DELIVERY_COUNT};

/// Innings fraction below which the powerplay runs.
const POWERPLAY_FRACTION: f64 = 0.3;
/// Innings fraction from which the death overs start.
const DEATH_FRACTION: f64 = 0.75;
/// Wickets in hand at or below which the tail is batting.
const TAIL_WICKETS: u8 = 2;
/// Run rate above which the bowler treats any phase as the death.
const COLLAPSE_RUN_RATE: f64 = 9.5;

/// Phase label plus the prior the bowler applies on top of the payoff
/// table. Bias below 1.0 favours a delivery; aggression scales the
/// value the search puts on taking a wicket.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PhaseProfile {
    pub phase: MatchPhase,
    pub aggression: f64,
    pub delivery_bias: [f64; DELIVERY_COUNT],
}

/// Classifies match context into a phase. Pure: no memory beyond the
/// `MatchState` passed in.
pub struct StrategyTracker;

impl StrategyTracker {
    pub fn classify(state: &MatchState) -> MatchPhase {
        let total = state.balls_total();
        if total == 0 {
            return MatchPhase::Middle;
        }
        let fraction = f64::from(state.balls_bowled) / f64::from(total);

        if state.wickets_in_hand() <= TAIL_WICKETS || fraction >= DEATH_FRACTION {
            return MatchPhase::Death;
        }
        if fraction < POWERPLAY_FRACTION {
            return MatchPhase::Powerplay;
        }
        if state.run_rate() > COLLAPSE_RUN_RATE {
            // Scoring is running away; bowl as if at the death.
            return MatchPhase::Death;
        }
        MatchPhase::Middle
    }

    pub fn profile(state: &MatchState) -> PhaseProfile {
        Self::profile_for(Self::classify(state))
    }

    // Bias order follows `Delivery::ALL`:
    // Yorker, Bouncer, FullToss, OffSpin, LegSpin, Outswing.
    pub fn profile_for(phase: MatchPhase) -> PhaseProfile {
        match phase {
            MatchPhase::Powerplay => PhaseProfile {
                phase,
                aggression: 1.2,
                delivery_bias: [1.0, 0.9, 1.1, 1.05, 1.05, 0.85],
            },
            MatchPhase::Middle => PhaseProfile {
                phase,
                aggression: 1.0,
                delivery_bias: [1.0, 1.05, 1.1, 0.9, 0.9, 1.0],
            },
            MatchPhase::Death => PhaseProfile {
                phase,
                aggression: 0.9,
                delivery_bias: [0.8, 0.95, 1.15, 1.05, 1.0, 1.0],
            },
        }
    }
}

impl PhaseProfile {
    pub fn bias(&self, delivery: Delivery) -> f64 {
        self.delivery_bias[delivery.index()]
    }
}
