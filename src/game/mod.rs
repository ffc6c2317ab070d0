//! Match core: state, ball-resolution rules, field-placement search.

pub mod field;
pub mod rules;
pub mod state;

pub use field::{
    FieldGraph,
    FieldPlan,
    FieldPlanner,
    Fielder,
    FielderId,
    FielderPlacement,
    PlannerConfig,
    Zone,
    ZoneId,
};
pub use rules::{
    parse_delivery, parse_shot, BallAction, BallReport, BallResolution, MatchError, MatchRules,
};
pub use state::{
    BallOutcome,
    Delivery,
    DismissalKind,
    EndReason,
    IntegrityError,
    MatchEvent,
    MatchFormat,
    MatchPhase,
    MatchResult,
    MatchState,
    Shot,
    DELIVERY_COUNT,
    PHASE_COUNT,
    SHOT_COUNT,
    WICKET_REWARD,
};
