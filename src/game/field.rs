use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use super::state::Delivery;

/// Index into a `FieldGraph`'s zone catalogue.
pub type ZoneId = u8;
pub type FielderId = u8;

/// Zone centres sit at 65% of the boundary radius.
const ZONE_RADIUS: f64 = 0.65;
/// Weight applied to fielder movement distance in the search cost g(n).
const MOVE_COST_WEIGHT: f64 = 0.15;
/// Landing probability above which a placement counts as a key fielder.
const KEY_FIELDER_THRESHOLD: f64 = 0.4;
const DEFAULT_MAX_ITERATIONS: u32 = 500;
const IMPROVEMENT_EPS: f64 = 1e-9;

/// A discrete region of the oval: angle range in degrees around the
/// batsman (centre = (0,0), boundary radius = 1.0) plus a run-risk weight.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Zone {
    pub id: ZoneId,
    pub name: String,
    pub angle: (f64, f64),
    pub risk: f64,
}

impl Zone {
    pub fn new(id: ZoneId, name: impl Into<String>, angle: (f64, f64), risk: f64) -> Self {
        Self {
            id,
            name: name.into(),
            angle,
            risk,
        }
    }

    /// x,y of the zone centre on the oval.
    pub fn center(&self) -> (f64, f64) {
        let mid = (self.angle.0 + self.angle.1) / 2.0;
        let rad = mid.to_radians();
        (rad.cos() * ZONE_RADIUS, rad.sin() * ZONE_RADIUS)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Fielder {
    pub id: FielderId,
    pub zone: ZoneId,
}

impl Fielder {
    /// Default ring occupying the first `count` catalogue zones.
    pub fn default_ring(count: u8) -> Vec<Fielder> {
        (0..count)
            .map(|id| Fielder { id, zone: id })
            .collect()
    }
}

static STANDARD_ZONES: Lazy<Vec<Zone>> = Lazy::new(|| {
    vec![
        Zone::new(0, "Fine Leg", (150.0, 190.0), 0.6),
        Zone::new(1, "Square Leg", (100.0, 150.0), 0.8),
        Zone::new(2, "Mid Wicket", (55.0, 100.0), 0.9),
        Zone::new(3, "Mid On", (25.0, 55.0), 0.7),
        Zone::new(4, "Mid Off", (-25.0, 25.0), 0.7),
        Zone::new(5, "Cover", (-55.0, -25.0), 0.95),
        Zone::new(6, "Point", (-100.0, -55.0), 0.85),
        Zone::new(7, "Third Man", (-190.0, -150.0), 0.6),
        Zone::new(8, "Long On", (10.0, 40.0), 0.5),
        Zone::new(9, "Long Off", (-40.0, -10.0), 0.5),
        Zone::new(10, "Deep Mid Wicket", (70.0, 110.0), 0.55),
        Zone::new(11, "Slip", (-200.0, -160.0), 0.75),
    ]
});

const STANDARD_POSITION_NAMES: [&str; 13] = [
    "Wicket Keeper",
    "Slip",
    "Gully",
    "Point",
    "Cover",
    "Mid Off",
    "Mid On",
    "Mid Wicket",
    "Square Leg",
    "Fine Leg",
    "Long On",
    "Long Off",
    "Deep Mid Wicket",
];

/// Where each delivery tends to be hit: (zone name, landing probability).
fn landing_table(delivery: Delivery) -> &'static [(&'static str, f64)] {
    match delivery {
        Delivery::Yorker => &[
            ("Fine Leg", 0.4),
            ("Square Leg", 0.3),
            ("Mid Wicket", 0.2),
            ("Mid On", 0.1),
            ("Cover", 0.1),
        ],
        Delivery::Bouncer => &[
            ("Square Leg", 0.5),
            ("Point", 0.4),
            ("Fine Leg", 0.3),
            ("Third Man", 0.3),
        ],
        Delivery::FullToss => &[
            ("Mid On", 0.4),
            ("Mid Off", 0.4),
            ("Cover", 0.5),
            ("Mid Wicket", 0.3),
        ],
        Delivery::OffSpin => &[
            ("Cover", 0.6),
            ("Point", 0.5),
            ("Mid Wicket", 0.4),
            ("Mid Off", 0.3),
        ],
        Delivery::LegSpin => &[
            ("Fine Leg", 0.5),
            ("Square Leg", 0.5),
            ("Mid Wicket", 0.4),
            ("Cover", 0.3),
        ],
        Delivery::Outswing => &[
            ("Slip", 0.7),
            ("Cover", 0.5),
            ("Point", 0.4),
            ("Third Man", 0.3),
        ],
    }
}

/// Fixed zone catalogue plus derived geometry. Fielder movement cost
/// between zones is the Euclidean distance between their centres.
#[derive(Debug, Clone)]
pub struct FieldGraph {
    zones: Vec<Zone>,
}

impl FieldGraph {
    pub fn new(zones: Vec<Zone>) -> Self {
        Self { zones }
    }

    pub fn standard() -> Self {
        Self {
            zones: STANDARD_ZONES.clone(),
        }
    }

    pub fn zones(&self) -> &[Zone] {
        &self.zones
    }

    pub fn zone(&self, id: ZoneId) -> Option<&Zone> {
        self.zones.get(usize::from(id))
    }

    pub fn contains(&self, id: ZoneId) -> bool {
        usize::from(id) < self.zones.len()
    }

    pub fn distance(&self, a: ZoneId, b: ZoneId) -> f64 {
        match (self.zone(a), self.zone(b)) {
            (Some(za), Some(zb)) => {
                let (ax, ay) = za.center();
                let (bx, by) = zb.center();
                ((ax - bx).powi(2) + (ay - by).powi(2)).sqrt()
            }
            _ => 0.0,
        }
    }

    /// Landing probability per zone for `delivery`. Falls back to
    /// risk-proportional weights over the first six zones when the
    /// catalogue names do not match (custom graphs).
    pub fn landing_weights(&self, delivery: Delivery) -> Vec<(ZoneId, f64)> {
        let mut weights: Vec<(ZoneId, f64)> = landing_table(delivery)
            .iter()
            .filter_map(|(name, prob)| {
                self.zones
                    .iter()
                    .find(|zone| zone.name == *name)
                    .map(|zone| (zone.id, *prob))
            })
            .collect();
        if weights.is_empty() {
            weights = self
                .zones
                .iter()
                .take(6)
                .map(|zone| (zone.id, zone.risk))
                .collect();
        }
        weights
    }

    fn risk_of(&self, id: ZoneId) -> f64 {
        self.zone(id).map(|zone| zone.risk).unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PlannerConfig {
    pub max_iterations: u32,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }
}

/// One fielder's slot in a computed plan.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FielderPlacement {
    pub fielder: FielderId,
    pub zone: ZoneId,
    pub position: String,
    pub x: f64,
    pub y: f64,
    pub coverage: f64,
    pub is_key: bool,
}

/// Result of a planning pass, including search metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FieldPlan {
    pub placements: Vec<FielderPlacement>,
    pub uncovered_risk: f64,
    pub efficiency: f64,
    pub iterations: u32,
    pub improved: bool,
}

impl FieldPlan {
    pub fn zone_of(&self, fielder: FielderId) -> Option<ZoneId> {
        self.placements
            .iter()
            .find(|placement| placement.fielder == fielder)
            .map(|placement| placement.zone)
    }
}

struct OpenNode {
    order: u64,
    f: f64,
    g: f64,
    assigned: Vec<ZoneId>,
}

impl PartialEq for OpenNode {
    fn eq(&self, other: &Self) -> bool {
        self.order == other.order
    }
}

impl Eq for OpenNode {}

impl PartialOrd for OpenNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OpenNode {
    // Reversed so the BinaryHeap pops the lowest f first; FIFO on ties.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .f
            .partial_cmp(&self.f)
            .unwrap_or(Ordering::Equal)
            .then_with(|| other.order.cmp(&self.order))
    }
}

/// Informed search over fielder-to-zone assignments.
///
/// g(n) = accumulated (weighted) movement distance, h(n) = run
/// probability left uncovered; expansion is capped, and the current
/// assignment is kept whenever no candidate improves on it.
pub struct FieldPlanner {
    graph: FieldGraph,
    config: PlannerConfig,
}

impl FieldPlanner {
    pub fn new(graph: FieldGraph) -> Self {
        Self {
            graph,
            config: PlannerConfig::default(),
        }
    }

    pub fn with_config(mut self, config: PlannerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn graph(&self) -> &FieldGraph {
        &self.graph
    }

    /// Plans the field for `delivery`. Every returned assignment covers
    /// a zone with at most one fielder.
    pub fn plan(&self, fielders: &[Fielder], delivery: Delivery) -> FieldPlan {
        let weights = self.graph.landing_weights(delivery);
        let current_zones: Vec<ZoneId> = fielders.iter().map(|fielder| fielder.zone).collect();
        let current_uncovered = self.uncovered_risk(&current_zones, &weights);

        // More fielders than zones cannot satisfy unique coverage.
        if fielders.is_empty() || fielders.len() > self.graph.zones().len() {
            return self.build_plan(fielders, &current_zones, &weights, 0, false);
        }

        let depth = fielders.len().min(weights.len());
        let mut open = BinaryHeap::new();
        let mut visited: HashMap<Vec<ZoneId>, f64> = HashMap::new();
        let mut order: u64 = 0;
        let mut iterations: u32 = 0;
        let mut best: Option<(f64, Vec<ZoneId>)> = None;

        open.push(OpenNode {
            order,
            f: self.uncovered_risk(&[], &weights),
            g: 0.0,
            assigned: Vec::new(),
        });

        while let Some(node) = open.pop() {
            if iterations >= self.config.max_iterations {
                break;
            }
            iterations += 1;

            if node.assigned.len() >= depth {
                let better = best
                    .as_ref()
                    .map(|(best_f, _)| node.f < *best_f)
                    .unwrap_or(true);
                if better {
                    best = Some((node.f, node.assigned));
                }
                continue;
            }

            let mut key = node.assigned.clone();
            key.sort_unstable();
            match visited.get(&key) {
                Some(seen_g) if *seen_g <= node.g => continue,
                _ => {
                    visited.insert(key, node.g);
                }
            }

            let fielder = &fielders[node.assigned.len()];
            for (zone, _) in &weights {
                if node.assigned.contains(zone) {
                    continue;
                }
                let mut assigned = node.assigned.clone();
                assigned.push(*zone);
                let g = node.g + MOVE_COST_WEIGHT * self.graph.distance(fielder.zone, *zone);
                let h = self.uncovered_risk(&assigned, &weights);
                order += 1;
                open.push(OpenNode {
                    order,
                    f: g + h,
                    g,
                    assigned,
                });
            }
        }

        let Some((_, assigned)) = best else {
            return self.build_plan(fielders, &current_zones, &weights, iterations, false);
        };

        let final_zones = self.fill_remaining(fielders, assigned);
        let final_uncovered = self.uncovered_risk(&final_zones, &weights);
        if final_uncovered + IMPROVEMENT_EPS < current_uncovered {
            self.build_plan(fielders, &final_zones, &weights, iterations, true)
        } else {
            self.build_plan(fielders, &current_zones, &weights, iterations, false)
        }
    }

    /// h(n): landing probability × risk summed over uncovered zones.
    fn uncovered_risk(&self, covered: &[ZoneId], weights: &[(ZoneId, f64)]) -> f64 {
        weights
            .iter()
            .filter(|(zone, _)| !covered.contains(zone))
            .map(|(zone, prob)| prob * self.graph.risk_of(*zone))
            .sum()
    }

    /// Fielders beyond the searched depth keep their zone when free,
    /// otherwise step to the nearest unoccupied one.
    fn fill_remaining(&self, fielders: &[Fielder], mut assigned: Vec<ZoneId>) -> Vec<ZoneId> {
        let mut taken: HashSet<ZoneId> = assigned.iter().copied().collect();
        for fielder in fielders.iter().skip(assigned.len()) {
            let zone = if self.graph.contains(fielder.zone) && !taken.contains(&fielder.zone) {
                fielder.zone
            } else {
                let mut candidate = None;
                let mut best_dist = f64::INFINITY;
                for zone in self.graph.zones() {
                    if taken.contains(&zone.id) {
                        continue;
                    }
                    let dist = self.graph.distance(fielder.zone, zone.id);
                    if dist < best_dist {
                        best_dist = dist;
                        candidate = Some(zone.id);
                    }
                }
                candidate.unwrap_or(fielder.zone)
            };
            taken.insert(zone);
            assigned.push(zone);
        }
        assigned
    }

    fn build_plan(
        &self,
        fielders: &[Fielder],
        zones: &[ZoneId],
        weights: &[(ZoneId, f64)],
        iterations: u32,
        improved: bool,
    ) -> FieldPlan {
        let weight_of = |zone: ZoneId| -> f64 {
            weights
                .iter()
                .find(|(candidate, _)| *candidate == zone)
                .map(|(_, prob)| *prob)
                .unwrap_or(0.0)
        };

        let mut placements: Vec<FielderPlacement> = fielders
            .iter()
            .zip(zones.iter())
            .map(|(fielder, zone)| {
                let (x, y) = self
                    .graph
                    .zone(*zone)
                    .map(|z| z.center())
                    .unwrap_or((0.0, 0.0));
                let prob = weight_of(*zone);
                FielderPlacement {
                    fielder: fielder.id,
                    zone: *zone,
                    position: String::new(),
                    x,
                    y,
                    coverage: prob * self.graph.risk_of(*zone),
                    is_key: prob > KEY_FIELDER_THRESHOLD,
                }
            })
            .collect();

        // Marquee position names go to the highest-coverage fielders.
        placements.sort_by(|a, b| {
            b.coverage
                .partial_cmp(&a.coverage)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.fielder.cmp(&b.fielder))
        });
        for (index, placement) in placements.iter_mut().enumerate() {
            placement.position = STANDARD_POSITION_NAMES
                .get(index)
                .map(|name| (*name).to_string())
                .unwrap_or_else(|| format!("Fielder {}", index + 1));
        }

        let total_risk: f64 = weights
            .iter()
            .map(|(zone, prob)| prob * self.graph.risk_of(*zone))
            .sum();
        let covered_risk: f64 = placements.iter().map(|placement| placement.coverage).sum();
        let efficiency = (covered_risk / total_risk.max(0.01) * 100.0).min(100.0);

        FieldPlan {
            uncovered_risk: self.uncovered_risk(zones, weights),
            efficiency,
            iterations,
            improved,
            placements,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uniform_zones() -> Vec<Zone> {
        vec![
            Zone::new(0, "Z1", (0.0, 0.0), 0.1),
            Zone::new(1, "Z2", (90.0, 90.0), 0.5),
            Zone::new(2, "Z3", (180.0, 180.0), 0.9),
            Zone::new(3, "Z4", (-90.0, -90.0), 0.6),
            Zone::new(4, "Z5", (45.0, 45.0), 0.4),
        ]
    }

    #[test]
    fn plan_never_double_covers_a_zone() {
        let planner = FieldPlanner::new(FieldGraph::standard());
        let fielders = Fielder::default_ring(9);
        for delivery in Delivery::ALL {
            let plan = planner.plan(&fielders, delivery);
            let mut seen = std::collections::HashSet::new();
            for placement in &plan.placements {
                assert!(
                    seen.insert(placement.zone),
                    "zone {} covered twice for {:?}",
                    placement.zone,
                    delivery
                );
            }
            assert_eq!(plan.placements.len(), fielders.len());
        }
    }

    #[test]
    fn lone_fielder_moves_to_highest_risk_zone() {
        let planner = FieldPlanner::new(FieldGraph::new(uniform_zones()));
        let fielders = vec![Fielder { id: 0, zone: 0 }];
        // Custom graphs use risk-proportional landing weights, so the
        // delivery choice does not matter here.
        let plan = planner.plan(&fielders, Delivery::Yorker);
        assert!(plan.improved);
        assert_eq!(plan.zone_of(0), Some(2), "fielder should cover Z3");
    }

    #[test]
    fn unimprovable_assignment_is_returned_unchanged() {
        let zones = vec![
            Zone::new(0, "Hot", (0.0, 0.0), 0.9),
            Zone::new(1, "Cold", (180.0, 180.0), 0.0),
        ];
        let planner = FieldPlanner::new(FieldGraph::new(zones));
        let fielders = vec![Fielder { id: 0, zone: 0 }];
        let plan = planner.plan(&fielders, Delivery::Bouncer);
        assert!(!plan.improved);
        assert_eq!(plan.zone_of(0), Some(0));
    }

    #[test]
    fn search_respects_iteration_cap() {
        let planner = FieldPlanner::new(FieldGraph::standard())
            .with_config(PlannerConfig { max_iterations: 3 });
        let plan = planner.plan(&Fielder::default_ring(9), Delivery::OffSpin);
        assert!(plan.iterations <= 3);
        // Capped search still yields a valid, uniquely-covered field.
        let mut seen = std::collections::HashSet::new();
        assert!(plan
            .placements
            .iter()
            .all(|placement| seen.insert(placement.zone)));
    }

    #[test]
    fn zone_center_sits_on_the_ring() {
        let zone = Zone::new(0, "Square", (80.0, 100.0), 0.5);
        let (x, y) = zone.center();
        assert!(x.abs() < 1e-9, "cos(90°) should be zero, got {}", x);
        assert!((y - 0.65).abs() < 1e-9);
    }

    #[test]
    fn marquee_position_names_go_to_the_highest_coverage_fielders() {
        let planner = FieldPlanner::new(FieldGraph::standard());
        let plan = planner.plan(&Fielder::default_ring(9), Delivery::Yorker);
        for pair in plan.placements.windows(2) {
            assert!(
                pair[0].coverage >= pair[1].coverage,
                "placements must rank by coverage: {} before {}",
                pair[0].coverage,
                pair[1].coverage
            );
        }
        assert_eq!(plan.placements[0].position, "Wicket Keeper");
        assert_eq!(plan.placements[1].position, "Slip");
    }

    #[test]
    fn efficiency_is_a_percentage() {
        let planner = FieldPlanner::new(FieldGraph::standard());
        for delivery in Delivery::ALL {
            let plan = planner.plan(&Fielder::default_ring(9), delivery);
            assert!((0.0..=100.0).contains(&plan.efficiency));
        }
    }

    #[test]
    fn landing_weights_fall_back_on_custom_graphs() {
        let graph = FieldGraph::new(uniform_zones());
        let weights = graph.landing_weights(Delivery::Outswing);
        assert_eq!(weights.len(), 5);
        assert!(weights.iter().all(|(_, w)| *w > 0.0));
    }

    #[test]
    fn standard_catalogue_matches_landing_tables() {
        let graph = FieldGraph::standard();
        for delivery in Delivery::ALL {
            for (zone, _) in graph.landing_weights(delivery) {
                assert!(graph.contains(zone));
            }
        }
    }
}
