use std::collections::{BTreeMap, BTreeSet};

use crate::corrections::ResolvedCorrections;
use crate::diagnostics::{Defect, Diagnostics};
use crate::error::InputError;
use crate::identifiers::{RunId, StationId, StationPair};
use crate::kilometrage;
use crate::load_inputs::LinePoint;
use crate::normalize_runs::RunTable;
use crate::records::TopologyEdgeRow;
use crate::shortcuts::{self, Classification, RunIndex};
use crate::stations::DistanceService;
use crate::stop_graph::{round_to, StopGraph};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TopologyEdge {
    pub pair: StationPair,
    pub geodesic_km: f64,
    pub exact_km: Option<f64>,
}

#[derive(Debug, Clone, Default)]
pub struct StationGraph {
    /// Sorted by station pair.
    pub edges: Vec<TopologyEdge>,
    pub stations: BTreeSet<StationId>,
    /// Removed shortcuts with the run that gave them away.
    pub shortcuts: BTreeMap<StationPair, RunId>,
}

impl StationGraph {
    pub fn edge_rows(&self) -> Vec<TopologyEdgeRow> {
        self.edges
            .iter()
            .map(|edge| TopologyEdgeRow {
                station1: edge.pair.first.0,
                station2: edge.pair.second.0,
                geodesic_km: edge.geodesic_km,
                exact_km: edge.exact_km,
            })
            .collect()
    }
}

/// Turns the stop graph into the space-of-stations graph.
///
/// Shortcut detection only looks at one run per distinct station sequence.
/// Manual removals are applied after shortcut removal and manual additions
/// after that, so an added pair is present even if it was detected as a
/// shortcut. Exact distances come from the line kilometrage of the stop
/// graph's stations, followed by the manual overrides.
pub fn build_station_graph(
    stop_graph: &StopGraph,
    runs: &RunTable,
    line_points: &[LinePoint],
    corrections: &ResolvedCorrections,
    distances: &impl DistanceService,
    diagnostics: &mut Diagnostics,
) -> Result<StationGraph, InputError> {
    let index = RunIndex::new(runs.representatives());
    let classifications = shortcuts::detect_shortcuts(stop_graph.edges.keys(), &index, diagnostics);

    let mut shortcuts = BTreeMap::new();
    let mut pairs = BTreeSet::new();
    for (pair, classification) in classifications {
        match classification {
            Classification::Shortcut { witness } => {
                shortcuts.insert(pair, witness);
            }
            Classification::Genuine | Classification::Untestable => {
                pairs.insert(pair);
            }
        }
    }

    for (pair, note) in &corrections.topology_removals {
        if !pairs.remove(pair) {
            diagnostics.record(Defect::RemovalNotPresent {
                pair: *pair,
                note: note.clone(),
            });
        }
    }
    for (pair, note) in &corrections.topology_additions {
        if pairs.insert(*pair) {
            log::debug!("Added edge {} ({}).", pair, note);
        }
    }

    let exact = kilometrage::exact_distances(line_points, &stop_graph.stations);
    let mut edges = vec![];
    let mut without_exact = 0;
    for pair in pairs {
        let geodesic_km = distances
            .distance_km(pair.first, pair.second)
            .ok_or(InputError::NoDistance(pair))?;
        let exact_km = exact.get(&pair).map(|km| round_to(*km, 4));
        if exact_km.is_none() {
            without_exact += 1;
        }
        edges.push(TopologyEdge {
            pair,
            geodesic_km: round_to(geodesic_km, 4),
            exact_km,
        });
    }

    for (pair, exact_km) in &corrections.exact_distance_overrides {
        match edges.binary_search_by(|edge| edge.pair.cmp(pair)) {
            Ok(i) => edges[i].exact_km = Some(*exact_km),
            Err(_) => diagnostics.record(Defect::OverrideNotPresent {
                pair: *pair,
                exact_km: *exact_km,
            }),
        }
    }

    let stations = edges
        .iter()
        .flat_map(|edge| [edge.pair.first, edge.pair.second])
        .collect::<BTreeSet<_>>();
    log::info!(
        "Station graph has {} stations and {} edges, {} without exact distance.",
        stations.len(),
        edges.len(),
        without_exact
    );
    diagnostics.tally("station_graph_edges", edges.len());
    diagnostics.tally("edges_without_exact_distance", without_exact);
    Ok(StationGraph {
        edges,
        stations,
        shortcuts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize_runs::normalize;
    use crate::normalize_runs::tests::simple_run;
    use crate::stop_graph::build_stop_graph;
    use std::collections::HashMap;

    /// Stations on a straight line, one kilometre per unit of id.
    struct LineDistances;

    impl DistanceService for LineDistances {
        fn distance_km(&self, a: StationId, b: StationId) -> Option<f64> {
            if a.0 >= 100 || b.0 >= 100 {
                return None;
            }
            Some((a.0 as f64 - b.0 as f64).abs() * 1.00001)
        }
    }

    fn pair(a: u32, b: u32) -> StationPair {
        StationPair::new(StationId(a), StationId(b))
    }

    fn build(
        runs: &[(&str, &[u32])],
        line_points: &[LinePoint],
        corrections: &ResolvedCorrections,
    ) -> (StationGraph, Diagnostics) {
        let events = runs
            .iter()
            .flat_map(|(id, stations)| simple_run(id, stations))
            .collect::<Vec<_>>();
        let mut diagnostics = Diagnostics::new("test");
        let table = normalize(&events, &mut diagnostics);
        let stop_graph = build_stop_graph(&table, &[], &mut diagnostics);
        let graph = build_station_graph(
            &stop_graph,
            &table,
            line_points,
            corrections,
            &LineDistances,
            &mut diagnostics,
        )
        .unwrap();
        (graph, diagnostics)
    }

    fn point(line: u32, station: u32, km: f64) -> LinePoint {
        LinePoint {
            line,
            station: StationId(station),
            km,
        }
    }

    fn edge_pairs(graph: &StationGraph) -> Vec<StationPair> {
        graph.edges.iter().map(|edge| edge.pair).collect()
    }

    #[test]
    fn express_shortcut_is_removed() {
        let (graph, _) = build(
            &[("local", &[1, 2, 3, 4]), ("express", &[1, 4])],
            &[],
            &ResolvedCorrections::default(),
        );
        assert_eq!(edge_pairs(&graph), vec![pair(1, 2), pair(2, 3), pair(3, 4)]);
        assert_eq!(graph.shortcuts[&pair(1, 4)], RunId::new("local"));
    }

    #[test]
    fn manual_corrections_are_applied() {
        let corrections = ResolvedCorrections {
            topology_removals: vec![
                (pair(2, 3), "artifact".to_string()),
                (pair(7, 8), "absent".to_string()),
            ],
            topology_additions: vec![
                (pair(1, 3), "tunnel".to_string()),
                (pair(1, 2), "already there".to_string()),
                (pair(1, 4), "re-added shortcut".to_string()),
            ],
            ..Default::default()
        };
        let (graph, diagnostics) = build(
            &[("local", &[1, 2, 3, 4]), ("express", &[1, 4])],
            &[],
            &corrections,
        );
        assert_eq!(
            edge_pairs(&graph),
            vec![pair(1, 2), pair(1, 3), pair(1, 4), pair(3, 4)]
        );
        assert_eq!(diagnostics.count("RemovalNotPresent"), 1);
    }

    #[test]
    fn distances_are_rounded_and_exact_only_when_known() {
        let line_points = [point(1, 1, 10.0), point(1, 2, 11.123456), point(2, 3, 0.0)];
        let corrections = ResolvedCorrections {
            exact_distance_overrides: vec![(pair(2, 3), 1.0593), (pair(5, 6), 2.0)],
            ..Default::default()
        };
        let (graph, diagnostics) = build(&[("r", &[1, 2, 3])], &line_points, &corrections);

        assert_eq!(
            graph.edges,
            vec![
                TopologyEdge {
                    pair: pair(1, 2),
                    geodesic_km: 1.0,
                    exact_km: Some(1.1235),
                },
                TopologyEdge {
                    pair: pair(2, 3),
                    geodesic_km: 1.0,
                    exact_km: Some(1.0593),
                },
            ]
        );
        assert_eq!(diagnostics.count("OverrideNotPresent"), 1);
    }

    #[test]
    fn edge_without_exact_distance_keeps_it_absent() {
        let (graph, diagnostics) = build(&[("r", &[1, 2])], &[], &ResolvedCorrections::default());
        assert_eq!(graph.edges[0].exact_km, None);
        assert_eq!(diagnostics.stat("edges_without_exact_distance"), 1);
        assert_eq!(
            graph.edge_rows()[0],
            TopologyEdgeRow {
                station1: 1,
                station2: 2,
                geodesic_km: 1.0,
                exact_km: None,
            }
        );
    }

    #[test]
    fn override_wins_over_kilometrage() {
        let line_points = [point(1, 1, 0.0), point(1, 2, 5.0)];
        let corrections = ResolvedCorrections {
            exact_distance_overrides: vec![(pair(2, 1), 1.0593)],
            ..Default::default()
        };
        let (graph, _) = build(&[("r", &[1, 2])], &line_points, &corrections);
        assert_eq!(graph.edges[0].exact_km, Some(1.0593));
    }

    #[test]
    fn stations_without_edges_are_not_nodes() {
        let corrections = ResolvedCorrections {
            topology_removals: vec![(pair(3, 4), "artifact".to_string())],
            ..Default::default()
        };
        let (graph, _) = build(&[("r", &[1, 2, 3]), ("s", &[3, 4])], &[], &corrections);
        assert_eq!(
            graph.stations,
            BTreeSet::from([StationId(1), StationId(2), StationId(3)])
        );
    }

    #[test]
    fn every_station_of_every_edge_needs_a_distance() {
        let events = simple_run("r", &[1, 150]);
        let mut diagnostics = Diagnostics::new("test");
        let table = normalize(&events, &mut diagnostics);
        let stop_graph = build_stop_graph(&table, &[], &mut diagnostics);
        let result = build_station_graph(
            &stop_graph,
            &table,
            &[],
            &ResolvedCorrections::default(),
            &LineDistances,
            &mut diagnostics,
        );
        assert!(matches!(
            result,
            Err(InputError::NoDistance(p)) if p == pair(1, 150)
        ));
    }

    #[test]
    fn manual_lists_hold_for_output() {
        let removals = vec![(pair(1, 2), String::new()), (pair(5, 6), String::new())];
        let additions = vec![(pair(1, 6), String::new()), (pair(2, 5), String::new())];
        let corrections = ResolvedCorrections {
            topology_removals: removals.clone(),
            topology_additions: additions.clone(),
            ..Default::default()
        };
        let (graph, _) = build(
            &[("a", &[1, 2, 3, 4, 5, 6]), ("b", &[6, 5, 3, 2, 1])],
            &[],
            &corrections,
        );
        let mut seen: HashMap<StationPair, usize> = HashMap::new();
        for edge in &graph.edges {
            *seen.entry(edge.pair).or_default() += 1;
        }
        for (pair, _) in &removals {
            assert!(!seen.contains_key(pair));
        }
        for (pair, _) in &additions {
            assert_eq!(seen[pair], 1);
        }
    }
}
