use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::str::FromStr;

use super::field::{Fielder, ZoneId};

/// Number of delivery variants; sizes the learner's Q-table rows.
pub const DELIVERY_COUNT: usize = 6;
/// Number of shot variants.
pub const SHOT_COUNT: usize = 6;
/// Number of match phases; sizes the learner's Q-table columns.
pub const PHASE_COUNT: usize = 3;

/// Learner reward (and batsman payoff penalty) for a wicket.
pub const WICKET_REWARD: f64 = 8.0;

const DEFAULT_OVERS: u8 = 20;
const DEFAULT_BALLS_PER_OVER: u8 = 6;
const DEFAULT_WICKETS: u8 = 10;
const DEFAULT_FIELDER_COUNT: u8 = 9;

/// What the bowler sends down. Closed set; `ALL` doubles as the
/// tie-break priority order for the bowler search.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Delivery {
    Yorker,
    Bouncer,
    FullToss,
    OffSpin,
    LegSpin,
    Outswing,
}

impl Delivery {
    pub const ALL: [Delivery; DELIVERY_COUNT] = [
        Delivery::Yorker,
        Delivery::Bouncer,
        Delivery::FullToss,
        Delivery::OffSpin,
        Delivery::LegSpin,
        Delivery::Outswing,
    ];

    pub fn index(self) -> usize {
        match self {
            Delivery::Yorker => 0,
            Delivery::Bouncer => 1,
            Delivery::FullToss => 2,
            Delivery::OffSpin => 3,
            Delivery::LegSpin => 4,
            Delivery::Outswing => 5,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Delivery::Yorker => "Yorker",
            Delivery::Bouncer => "Bouncer",
            Delivery::FullToss => "Full Toss",
            Delivery::OffSpin => "Off Spin",
            Delivery::LegSpin => "Leg Spin",
            Delivery::Outswing => "Outswing",
        }
    }

    /// Expected runs per ball for this delivery against `shot`,
    /// before field attenuation.
    pub fn expected_runs(self, shot: Shot) -> f64 {
        EXPECTED_RUNS[self.index()][shot.index()]
    }

    /// Probability the batsman is dismissed attempting `shot`.
    pub fn wicket_chance(self, shot: Shot) -> f64 {
        WICKET_CHANCE[self.index()][shot.index()]
    }
}

impl FromStr for Delivery {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace(['_', '-'], " ").as_str() {
            "yorker" => Ok(Delivery::Yorker),
            "bouncer" | "short ball" => Ok(Delivery::Bouncer),
            "full toss" | "fulltoss" => Ok(Delivery::FullToss),
            "off spin" | "offspin" | "off break" => Ok(Delivery::OffSpin),
            "leg spin" | "legspin" | "leg break" => Ok(Delivery::LegSpin),
            "outswing" | "outswinger" => Ok(Delivery::Outswing),
            _ => Err(()),
        }
    }
}

/// The batsman's response. Closed set.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Shot {
    Drive,
    Pull,
    Sweep,
    Cut,
    Loft,
    Block,
}

impl Shot {
    pub const ALL: [Shot; SHOT_COUNT] = [
        Shot::Drive,
        Shot::Pull,
        Shot::Sweep,
        Shot::Cut,
        Shot::Loft,
        Shot::Block,
    ];

    pub fn index(self) -> usize {
        match self {
            Shot::Drive => 0,
            Shot::Pull => 1,
            Shot::Sweep => 2,
            Shot::Cut => 3,
            Shot::Loft => 4,
            Shot::Block => 5,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Shot::Drive => "Drive",
            Shot::Pull => "Pull",
            Shot::Sweep => "Sweep",
            Shot::Cut => "Cut",
            Shot::Loft => "Loft",
            Shot::Block => "Block",
        }
    }
}

impl FromStr for Shot {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "drive" | "cover drive" => Ok(Shot::Drive),
            "pull" | "hook" => Ok(Shot::Pull),
            "sweep" => Ok(Shot::Sweep),
            "cut" => Ok(Shot::Cut),
            "loft" | "slog" => Ok(Shot::Loft),
            "block" | "defend" | "leave" => Ok(Shot::Block),
            _ => Err(()),
        }
    }
}

// Rows: deliveries in `Delivery::ALL` order.
// Columns: shots in `Shot::ALL` order (Drive, Pull, Sweep, Cut, Loft, Block).
const EXPECTED_RUNS: [[f64; SHOT_COUNT]; DELIVERY_COUNT] = [
    [0.8, 0.2, 0.4, 0.3, 0.5, 0.1], // Yorker
    [0.3, 1.9, 0.2, 1.4, 1.1, 0.2], // Bouncer
    [2.4, 1.8, 1.6, 1.5, 2.8, 0.3], // Full Toss
    [1.2, 0.8, 1.5, 0.9, 1.4, 0.2], // Off Spin
    [0.9, 1.2, 1.6, 1.0, 1.3, 0.2], // Leg Spin
    [1.1, 0.5, 0.3, 1.3, 0.8, 0.2], // Outswing
];

const WICKET_CHANCE: [[f64; SHOT_COUNT]; DELIVERY_COUNT] = [
    [0.10, 0.22, 0.16, 0.20, 0.25, 0.03], // Yorker
    [0.20, 0.08, 0.24, 0.09, 0.14, 0.05], // Bouncer
    [0.03, 0.04, 0.05, 0.05, 0.09, 0.01], // Full Toss
    [0.09, 0.12, 0.07, 0.14, 0.16, 0.02], // Off Spin
    [0.13, 0.12, 0.08, 0.10, 0.18, 0.03], // Leg Spin
    [0.12, 0.15, 0.20, 0.10, 0.17, 0.04], // Outswing
];

/// Coarse match context; the state key for the learner and the
/// strategy prior. Classified from `MatchState` at ball boundaries.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum MatchPhase {
    Powerplay,
    Middle,
    Death,
}

impl MatchPhase {
    pub const ALL: [MatchPhase; PHASE_COUNT] =
        [MatchPhase::Powerplay, MatchPhase::Middle, MatchPhase::Death];

    pub fn index(self) -> usize {
        match self {
            MatchPhase::Powerplay => 0,
            MatchPhase::Middle => 1,
            MatchPhase::Death => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum DismissalKind {
    Bowled,
    Caught,
    Lbw,
    Stumped,
}

/// Result of one resolved ball.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum BallOutcome {
    Dot,
    Runs { runs: u8 },
    Boundary { runs: u8 },
    Wicket { kind: DismissalKind },
}

impl BallOutcome {
    pub fn runs(&self) -> u8 {
        match self {
            BallOutcome::Runs { runs } | BallOutcome::Boundary { runs } => *runs,
            BallOutcome::Dot | BallOutcome::Wicket { .. } => 0,
        }
    }

    pub fn is_wicket(&self) -> bool {
        matches!(self, BallOutcome::Wicket { .. })
    }

    /// Reward from the bowler's perspective; the learner's signal.
    pub fn bowler_reward(&self) -> f64 {
        match self {
            BallOutcome::Dot => 1.0,
            BallOutcome::Runs { runs } => -f64::from(*runs),
            BallOutcome::Boundary { runs } => -f64::from(*runs),
            BallOutcome::Wicket { .. } => WICKET_REWARD,
        }
    }
}

/// Innings limits. Defaults to a T20 innings.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct MatchFormat {
    pub overs: u8,
    pub balls_per_over: u8,
    pub wickets: u8,
}

impl MatchFormat {
    pub fn new(overs: u8, balls_per_over: u8, wickets: u8) -> Self {
        Self {
            overs,
            balls_per_over,
            wickets,
        }
    }

    /// Abbreviated format used by tests and demos.
    pub fn short(overs: u8) -> Self {
        Self {
            overs,
            ..Self::default()
        }
    }

    pub fn balls_total(&self) -> u32 {
        u32::from(self.overs) * u32::from(self.balls_per_over)
    }
}

impl Default for MatchFormat {
    fn default() -> Self {
        Self {
            overs: DEFAULT_OVERS,
            balls_per_over: DEFAULT_BALLS_PER_OVER,
            wickets: DEFAULT_WICKETS,
        }
    }
}

/// Why the innings closed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum EndReason {
    OversExhausted,
    AllOut,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MatchResult {
    pub score: u32,
    pub wickets: u8,
    pub balls: u32,
    pub reason: EndReason,
}

/// Event stream mirrored into `MatchState::event_log`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum MatchEvent {
    DeliveryBowled {
        over: u8,
        ball: u8,
        delivery: Delivery,
    },
    ShotPlayed {
        shot: Shot,
        zone: ZoneId,
    },
    RunsScored {
        runs: u8,
    },
    WicketFallen {
        kind: DismissalKind,
        wickets: u8,
    },
    FieldRepositioned {
        moves: u8,
        efficiency: f64,
    },
    OverCompleted {
        over: u8,
        score: u32,
    },
    MatchEnded {
        result: MatchResult,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum IntegrityError {
    WicketsOutOfRange { value: u8, limit: u8 },
    BallsOutOfRange { value: u32, limit: u32 },
    ZoneDoubleCovered { zone: ZoneId },
    UnknownZone { zone: ZoneId },
}

/// The whole innings state. Mutated only by ball resolution; the
/// decision layers read it and pass it through.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MatchState {
    pub format: MatchFormat,
    pub score: u32,
    pub wickets: u8,
    pub balls_bowled: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fielders: Vec<Fielder>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub event_log: Vec<MatchEvent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<MatchResult>,
}

impl MatchState {
    pub fn new(format: MatchFormat) -> Self {
        Self {
            format,
            score: 0,
            wickets: 0,
            balls_bowled: 0,
            fielders: Fielder::default_ring(DEFAULT_FIELDER_COUNT),
            event_log: Vec::new(),
            outcome: None,
        }
    }

    pub fn with_fielders(mut self, fielders: Vec<Fielder>) -> Self {
        self.fielders = fielders;
        self
    }

    pub fn record_event(&mut self, event: MatchEvent) {
        self.event_log.push(event);
    }

    pub fn balls_total(&self) -> u32 {
        self.format.balls_total()
    }

    pub fn balls_remaining(&self) -> u32 {
        self.balls_total().saturating_sub(self.balls_bowled)
    }

    pub fn overs_remaining(&self) -> f64 {
        if self.format.balls_per_over == 0 {
            return 0.0;
        }
        f64::from(self.balls_remaining()) / f64::from(self.format.balls_per_over)
    }

    /// Over currently in progress, 1-based.
    pub fn over_number(&self) -> u8 {
        if self.format.balls_per_over == 0 {
            return 1;
        }
        (self.balls_bowled / u32::from(self.format.balls_per_over)) as u8 + 1
    }

    /// Ball about to be bowled within the over, 1-based.
    pub fn ball_in_over(&self) -> u8 {
        if self.format.balls_per_over == 0 {
            return 1;
        }
        (self.balls_bowled % u32::from(self.format.balls_per_over)) as u8 + 1
    }

    pub fn wickets_in_hand(&self) -> u8 {
        self.format.wickets.saturating_sub(self.wickets)
    }

    /// Runs per over so far.
    pub fn run_rate(&self) -> f64 {
        if self.balls_bowled == 0 {
            return 0.0;
        }
        f64::from(self.score) * f64::from(self.format.balls_per_over)
            / f64::from(self.balls_bowled)
    }

    pub fn is_finished(&self) -> bool {
        self.outcome.is_some()
    }

    pub fn add_runs(&mut self, runs: u8) {
        self.score += u32::from(runs);
    }

    pub fn fall_wicket(&mut self) {
        self.wickets = self.wickets.saturating_add(1).min(self.format.wickets);
    }

    /// Counts the ball just bowled; yields an `OverCompleted` event
    /// (already recorded) when the over closes.
    pub fn advance_ball(&mut self) -> Option<MatchEvent> {
        self.balls_bowled += 1;
        let per_over = u32::from(self.format.balls_per_over);
        if per_over > 0 && self.balls_bowled % per_over == 0 {
            let event = MatchEvent::OverCompleted {
                over: (self.balls_bowled / per_over) as u8,
                score: self.score,
            };
            self.record_event(event.clone());
            return Some(event);
        }
        None
    }

    pub fn evaluate_result(&mut self) -> Option<MatchResult> {
        if let Some(result) = &self.outcome {
            return Some(result.clone());
        }
        if self.wickets >= self.format.wickets {
            return Some(self.declare_result(EndReason::AllOut));
        }
        if self.balls_bowled >= self.balls_total() {
            return Some(self.declare_result(EndReason::OversExhausted));
        }
        None
    }

    pub fn declare_result(&mut self, reason: EndReason) -> MatchResult {
        let result = MatchResult {
            score: self.score,
            wickets: self.wickets,
            balls: self.balls_bowled,
            reason,
        };
        if self.outcome.is_none() {
            self.record_event(MatchEvent::MatchEnded {
                result: result.clone(),
            });
            self.outcome = Some(result.clone());
        }
        result
    }

    pub fn integrity_check(&self) -> Result<(), IntegrityError> {
        if self.wickets > self.format.wickets {
            return Err(IntegrityError::WicketsOutOfRange {
                value: self.wickets,
                limit: self.format.wickets,
            });
        }
        if self.balls_bowled > self.balls_total() {
            return Err(IntegrityError::BallsOutOfRange {
                value: self.balls_bowled,
                limit: self.balls_total(),
            });
        }

        let mut seen = HashSet::new();
        for fielder in &self.fielders {
            if !seen.insert(fielder.zone) {
                return Err(IntegrityError::ZoneDoubleCovered {
                    zone: fielder.zone,
                });
            }
        }

        Ok(())
    }

    /// Mid-innings T20 snapshot for frontend bring-up and tests.
    pub fn sample() -> Self {
        let mut state = MatchState::new(MatchFormat::default());
        state.score = 86;
        state.wickets = 3;
        state.balls_bowled = 62;
        state.record_event(MatchEvent::DeliveryBowled {
            over: 10,
            ball: 2,
            delivery: Delivery::OffSpin,
        });
        state.record_event(MatchEvent::ShotPlayed {
            shot: Shot::Sweep,
            zone: 1,
        });
        state.record_event(MatchEvent::RunsScored { runs: 2 });
        state
    }
}

impl Default for MatchState {
    fn default() -> Self {
        MatchState::new(MatchFormat::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delivery_parses_aliases_and_rejects_unknown() {
        assert_eq!("yorker".parse::<Delivery>(), Ok(Delivery::Yorker));
        assert_eq!("Full_Toss".parse::<Delivery>(), Ok(Delivery::FullToss));
        assert_eq!("off-spin".parse::<Delivery>(), Ok(Delivery::OffSpin));
        assert_eq!("outswinger".parse::<Delivery>(), Ok(Delivery::Outswing));
        assert!("doosra".parse::<Delivery>().is_err());
    }

    #[test]
    fn shot_parses_aliases_and_rejects_unknown() {
        assert_eq!("hook".parse::<Shot>(), Ok(Shot::Pull));
        assert_eq!("defend".parse::<Shot>(), Ok(Shot::Block));
        assert!("reverse scoop".parse::<Shot>().is_err());
    }

    #[test]
    fn bowler_reward_favours_wickets_and_dots() {
        let wicket = BallOutcome::Wicket {
            kind: DismissalKind::Bowled,
        };
        assert!(wicket.bowler_reward() > BallOutcome::Dot.bowler_reward());
        assert!(BallOutcome::Dot.bowler_reward() > BallOutcome::Runs { runs: 1 }.bowler_reward());
        assert!(
            BallOutcome::Runs { runs: 1 }.bowler_reward()
                > BallOutcome::Boundary { runs: 6 }.bowler_reward()
        );
    }

    #[test]
    fn advance_ball_emits_over_completed_at_over_boundary() {
        let mut state = MatchState::new(MatchFormat::default());
        for _ in 0..5 {
            assert!(state.advance_ball().is_none());
        }
        let event = state.advance_ball().expect("sixth ball closes the over");
        assert!(matches!(event, MatchEvent::OverCompleted { over: 1, .. }));
    }

    #[test]
    fn result_declared_when_overs_exhausted() {
        let mut state = MatchState::new(MatchFormat::short(1));
        for _ in 0..6 {
            state.advance_ball();
        }
        let result = state.evaluate_result().expect("innings should close");
        assert_eq!(result.reason, EndReason::OversExhausted);
        assert!(state.is_finished());
        assert!(state
            .event_log
            .iter()
            .any(|event| matches!(event, MatchEvent::MatchEnded { .. })));
    }

    #[test]
    fn result_declared_when_all_out() {
        let mut state = MatchState::new(MatchFormat::default());
        for _ in 0..10 {
            state.fall_wicket();
        }
        let result = state.evaluate_result().expect("innings should close");
        assert_eq!(result.reason, EndReason::AllOut);
    }

    #[test]
    fn integrity_check_rejects_double_covered_zone() {
        let state = MatchState::new(MatchFormat::default()).with_fielders(vec![
            Fielder { id: 0, zone: 2 },
            Fielder { id: 1, zone: 2 },
        ]);
        assert_eq!(
            state.integrity_check(),
            Err(IntegrityError::ZoneDoubleCovered { zone: 2 })
        );
    }

    #[test]
    fn sample_state_is_internally_consistent() {
        let state = MatchState::sample();
        assert!(state.integrity_check().is_ok());
        assert!(!state.is_finished());
        assert!(state.run_rate() > 0.0);
    }
}
