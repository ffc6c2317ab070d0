//! Decision layer: bowler search, delivery learning, phase strategy.

pub mod bowler;
pub mod learner;
pub mod strategy;

pub use bowler::{AiDifficulty, BowlerAi, BowlerConfig, BowlerDecision};
pub use learner::{DeliveryLearner, LearnerConfig, QTable};
pub use strategy::{PhaseProfile, StrategyTracker};
