use std::str::FromStr;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::field::{FieldGraph, FieldPlan, FieldPlanner, ZoneId};
use super::state::{
    BallOutcome, Delivery, DismissalKind, IntegrityError, MatchEvent, MatchResult, MatchState,
    Shot,
};

/// How much a covered landing zone dampens scoring.
const COVERED_RUN_FACTOR: f64 = 0.35;
/// Extra dismissal chance when the ball goes to a manned zone.
const COVERED_WICKET_FACTOR: f64 = 1.25;

/// One ball from the boundary's point of view.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct BallAction {
    pub delivery: Delivery,
    pub shot: Shot,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum MatchError {
    MatchFinished,
    UnknownDelivery { name: String },
    UnknownShot { name: String },
    NoFielders,
    IntegrityViolation { error: IntegrityError },
}

/// Boundary validation: unknown identifiers are rejected before any
/// state is touched.
pub fn parse_delivery(name: &str) -> Result<Delivery, MatchError> {
    Delivery::from_str(name).map_err(|_| MatchError::UnknownDelivery {
        name: name.to_string(),
    })
}

pub fn parse_shot(name: &str) -> Result<Shot, MatchError> {
    Shot::from_str(name).map_err(|_| MatchError::UnknownShot {
        name: name.to_string(),
    })
}

/// Outcome of one resolved ball plus the events it produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BallReport {
    pub outcome: BallOutcome,
    pub landing_zone: ZoneId,
    pub covered: bool,
    pub events: Vec<MatchEvent>,
}

/// Snapshot handed back across the boundary after an engine call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BallResolution {
    pub state: MatchState,
    pub events: Vec<MatchEvent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<MatchResult>,
}

impl BallResolution {
    pub fn new(state: MatchState, mut events: Vec<MatchEvent>) -> Self {
        let result = state.outcome.clone();
        if let Some(ref result) = result {
            let has_event = events
                .iter()
                .any(|event| matches!(event, MatchEvent::MatchEnded { .. }));
            if !has_event {
                events.push(MatchEvent::MatchEnded {
                    result: result.clone(),
                });
            }
        }

        Self {
            state,
            events,
            result,
        }
    }
}

/// Turn-order engine for a single ball: validates, repositions the
/// field, samples the outcome, and advances the match state.
pub struct MatchRules {
    rng: SmallRng,
    planner: FieldPlanner,
}

impl Default for MatchRules {
    fn default() -> Self {
        Self::new()
    }
}

impl MatchRules {
    pub fn new() -> Self {
        Self {
            rng: SmallRng::from_entropy(),
            planner: FieldPlanner::new(FieldGraph::standard()),
        }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
            planner: FieldPlanner::new(FieldGraph::standard()),
        }
    }

    pub fn with_graph(mut self, graph: FieldGraph) -> Self {
        self.planner = FieldPlanner::new(graph);
        self
    }

    pub fn planner(&self) -> &FieldPlanner {
        &self.planner
    }

    fn ensure_active(state: &MatchState) -> Result<(), MatchError> {
        if state.is_finished() {
            return Err(MatchError::MatchFinished);
        }
        Ok(())
    }

    fn ensure_integrity(&self, state: &MatchState) -> Result<(), MatchError> {
        state
            .integrity_check()
            .map_err(|error| MatchError::IntegrityViolation { error })?;
        for fielder in &state.fielders {
            if !self.planner.graph().contains(fielder.zone) {
                return Err(MatchError::IntegrityViolation {
                    error: IntegrityError::UnknownZone {
                        zone: fielder.zone,
                    },
                });
            }
        }
        Ok(())
    }

    /// Runs the field planner for `delivery` and applies the resulting
    /// assignment to the state. No-op placements are kept as-is.
    pub fn reposition_field(
        &self,
        state: &mut MatchState,
        delivery: Delivery,
    ) -> Result<(FieldPlan, Vec<MatchEvent>), MatchError> {
        Self::ensure_active(state)?;
        self.ensure_integrity(state)?;
        if state.fielders.is_empty() {
            return Err(MatchError::NoFielders);
        }

        let plan = self.planner.plan(&state.fielders, delivery);
        let mut moves: u8 = 0;
        for fielder in &mut state.fielders {
            if let Some(zone) = plan.zone_of(fielder.id) {
                if fielder.zone != zone {
                    moves += 1;
                    fielder.zone = zone;
                }
            }
        }

        let event = MatchEvent::FieldRepositioned {
            moves,
            efficiency: plan.efficiency,
        };
        state.record_event(event.clone());
        Ok((plan, vec![event]))
    }

    /// Resolves one ball. The state only ever changes here, and only
    /// after all validation has passed.
    pub fn resolve_ball(
        &mut self,
        state: &mut MatchState,
        action: BallAction,
    ) -> Result<BallReport, MatchError> {
        Self::ensure_active(state)?;
        self.ensure_integrity(state)?;

        let mut events = Vec::new();
        let bowled = MatchEvent::DeliveryBowled {
            over: state.over_number(),
            ball: state.ball_in_over(),
            delivery: action.delivery,
        };
        state.record_event(bowled.clone());
        events.push(bowled);

        let landing_zone = self.sample_landing_zone(action.delivery);
        let covered = state
            .fielders
            .iter()
            .any(|fielder| fielder.zone == landing_zone);

        let shot_event = MatchEvent::ShotPlayed {
            shot: action.shot,
            zone: landing_zone,
        };
        state.record_event(shot_event.clone());
        events.push(shot_event);

        let outcome = self.sample_outcome(action.delivery, action.shot, covered);
        match outcome {
            BallOutcome::Dot => {}
            BallOutcome::Runs { runs } | BallOutcome::Boundary { runs } => {
                state.add_runs(runs);
                let event = MatchEvent::RunsScored { runs };
                state.record_event(event.clone());
                events.push(event);
            }
            BallOutcome::Wicket { kind } => {
                state.fall_wicket();
                let event = MatchEvent::WicketFallen {
                    kind,
                    wickets: state.wickets,
                };
                state.record_event(event.clone());
                events.push(event);
            }
        }

        if let Some(event) = state.advance_ball() {
            events.push(event);
        }

        if let Some(result) = state.evaluate_result() {
            events.push(MatchEvent::MatchEnded { result });
        }

        Ok(BallReport {
            outcome,
            landing_zone,
            covered,
            events,
        })
    }

    pub fn check_result(state: &mut MatchState) -> Option<MatchResult> {
        state.evaluate_result()
    }

    fn sample_landing_zone(&mut self, delivery: Delivery) -> ZoneId {
        let weights = self.planner.graph().landing_weights(delivery);
        let total: f64 = weights.iter().map(|(_, weight)| weight).sum();
        if total <= 0.0 || weights.is_empty() {
            return 0;
        }
        let mut roll = self.rng.gen::<f64>() * total;
        for (zone, weight) in &weights {
            roll -= weight;
            if roll <= 0.0 {
                return *zone;
            }
        }
        weights[weights.len() - 1].0
    }

    fn sample_outcome(&mut self, delivery: Delivery, shot: Shot, covered: bool) -> BallOutcome {
        let mut wicket_chance = delivery.wicket_chance(shot);
        if covered {
            wicket_chance = (wicket_chance * COVERED_WICKET_FACTOR).min(1.0);
        }
        if self.rng.gen::<f64>() < wicket_chance {
            return BallOutcome::Wicket {
                kind: dismissal_kind(delivery, shot, covered),
            };
        }

        // 0.6x..1.8x spread around the expected-run figure.
        let spread = 0.6 + 1.2 * self.rng.gen::<f64>();
        let mut runs = delivery.expected_runs(shot) * spread;
        if covered {
            runs *= COVERED_RUN_FACTOR;
        }

        if runs >= 4.5 {
            BallOutcome::Boundary { runs: 6 }
        } else if runs >= 3.0 {
            BallOutcome::Boundary { runs: 4 }
        } else {
            let rounded = runs.round() as u8;
            if rounded == 0 {
                BallOutcome::Dot
            } else {
                BallOutcome::Runs {
                    runs: rounded.min(3),
                }
            }
        }
    }
}

fn dismissal_kind(delivery: Delivery, shot: Shot, covered: bool) -> DismissalKind {
    if covered && matches!(shot, Shot::Loft | Shot::Pull | Shot::Drive) {
        return DismissalKind::Caught;
    }
    match delivery {
        Delivery::Yorker | Delivery::FullToss => DismissalKind::Bowled,
        Delivery::OffSpin | Delivery::LegSpin => {
            if shot == Shot::Block {
                DismissalKind::Lbw
            } else {
                DismissalKind::Stumped
            }
        }
        Delivery::Bouncer | Delivery::Outswing => DismissalKind::Caught,
    }
}
