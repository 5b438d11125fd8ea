//! Detection of edges that only exist because some run skipped a station.
//!
//! An edge (A, B) of the stop graph is a shortcut as soon as one run stops at
//! both A and B without stopping at them back to back. A single witness is
//! enough, so the search stops at the first such run.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use indicatif::ProgressIterator;

use crate::diagnostics::{Defect, Diagnostics};
use crate::identifiers::{RunId, StationId, StationPair};
use crate::normalize_runs::Run;
use crate::progress;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Genuine,
    Shortcut { witness: RunId },
    /// No run visits both stations.
    Untestable,
}

/// Station sequences of the representative runs, indexed by station.
#[derive(Debug, Default)]
pub struct RunIndex {
    runs_by_station: HashMap<StationId, BTreeSet<RunId>>,
    sequences: HashMap<RunId, Vec<StationId>>,
}

impl RunIndex {
    pub fn new<'a>(runs: impl IntoIterator<Item = &'a Run>) -> Self {
        let mut index = RunIndex::default();
        for run in runs {
            for station in run.stations() {
                index
                    .runs_by_station
                    .entry(station)
                    .or_default()
                    .insert(run.id);
            }
            index.sequences.insert(run.id, run.station_sequence());
        }
        index
    }

    /// Runs stopping at both stations, in ascending run id order.
    pub fn runs_visiting_both(&self, a: StationId, b: StationId) -> Vec<RunId> {
        match (self.runs_by_station.get(&a), self.runs_by_station.get(&b)) {
            (Some(runs_a), Some(runs_b)) => runs_a.intersection(runs_b).copied().collect(),
            _ => vec![],
        }
    }

    pub fn sequence(&self, run: RunId) -> &[StationId] {
        self.sequences.get(&run).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Whether the two stations of the pair follow each other somewhere in the
/// sequence, in either direction.
pub fn adjacent_in(sequence: &[StationId], pair: StationPair) -> bool {
    sequence
        .windows(2)
        .any(|w| StationPair::new(w[0], w[1]) == pair)
}

pub fn classify(pair: StationPair, index: &RunIndex) -> Classification {
    let candidates = index.runs_visiting_both(pair.first, pair.second);
    if candidates.is_empty() {
        return Classification::Untestable;
    }
    match candidates
        .into_iter()
        .find(|run| !adjacent_in(index.sequence(*run), pair))
    {
        Some(witness) => Classification::Shortcut { witness },
        None => Classification::Genuine,
    }
}

/// Classifies every edge. Untestable edges are reported for manual review.
pub fn detect_shortcuts<'a>(
    edges: impl ExactSizeIterator<Item = &'a StationPair>,
    index: &RunIndex,
    diagnostics: &mut Diagnostics,
) -> BTreeMap<StationPair, Classification> {
    let mut result = BTreeMap::new();
    for pair in edges
        .progress_with_style(progress::bar_style())
        .with_message("Search shortcut witnesses.")
        .with_finish(indicatif::ProgressFinish::AndLeave)
    {
        let classification = classify(*pair, index);
        match classification {
            Classification::Untestable => {
                diagnostics.record(Defect::UntestableEdge { pair: *pair })
            }
            Classification::Shortcut { witness } => {
                log::debug!("{} is a shortcut, witnessed by run {}", pair, witness)
            }
            Classification::Genuine => {}
        }
        result.insert(*pair, classification);
    }
    let shortcuts = result
        .values()
        .filter(|c| matches!(c, Classification::Shortcut { .. }))
        .count();
    log::info!("Found {} shortcuts among {} edges.", shortcuts, result.len());
    diagnostics.tally("shortcuts", shortcuts);
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize_runs::normalize;
    use crate::normalize_runs::tests::simple_run;
    use crate::normalize_runs::RunTable;

    fn pair(a: u32, b: u32) -> StationPair {
        StationPair::new(StationId(a), StationId(b))
    }

    fn ids(stations: &[u32]) -> Vec<StationId> {
        stations.iter().map(|s| StationId(*s)).collect()
    }

    fn table(runs: &[(&str, &[u32])]) -> RunTable {
        let events = runs
            .iter()
            .flat_map(|(id, stations)| simple_run(id, stations))
            .collect::<Vec<_>>();
        normalize(&events, &mut Diagnostics::new("test"))
    }

    #[test]
    fn adjacency_in_either_direction() {
        let sequence = ids(&[1, 2, 3]);
        assert!(adjacent_in(&sequence, pair(1, 2)));
        assert!(adjacent_in(&sequence, pair(3, 2)));
        assert!(!adjacent_in(&sequence, pair(1, 3)));
        assert!(!adjacent_in(&ids(&[1]), pair(1, 2)));
    }

    #[test]
    fn one_witness_is_enough() {
        // "a" skips station 2, "b" runs 1 -> 3 directly. Any witness wins.
        let runs = table(&[("a", &[1, 2, 3]), ("b", &[1, 3])]);
        let index = RunIndex::new(runs.representatives());
        assert_eq!(
            classify(pair(1, 3), &index),
            Classification::Shortcut {
                witness: RunId::new("a")
            }
        );
        assert_eq!(classify(pair(1, 2), &index), Classification::Genuine);
    }

    #[test]
    fn witness_seen_after_direct_adjacency_still_counts() {
        let runs = table(&[("a", &[1, 3]), ("b", &[1, 2, 3])]);
        let index = RunIndex::new(runs.representatives());
        assert_eq!(
            classify(pair(3, 1), &index),
            Classification::Shortcut {
                witness: RunId::new("b")
            }
        );
    }

    #[test]
    fn loop_run_revisiting_a_station_keeps_adjacency() {
        let runs = table(&[("a", &[1, 2, 3, 1])]);
        let index = RunIndex::new(runs.representatives());
        assert_eq!(classify(pair(1, 3), &index), Classification::Genuine);
    }

    #[test]
    fn unreferenced_stop_between_two_stations_is_a_witness() {
        let mut events = simple_run("a", &[1, 9, 4]);
        events[1].referenced = false;
        events.extend(simple_run("b", &[1, 4]));
        let runs = normalize(&events, &mut Diagnostics::new("test"));
        let index = RunIndex::new(runs.representatives());
        assert_eq!(
            classify(pair(1, 4), &index),
            Classification::Shortcut {
                witness: RunId::new("a")
            }
        );
    }

    #[test]
    fn no_common_run_is_untestable_and_reported() {
        let runs = table(&[("a", &[1, 2]), ("b", &[3, 4])]);
        let index = RunIndex::new(runs.representatives());
        let edges = [pair(1, 2), pair(2, 3)];
        let mut diagnostics = Diagnostics::new("test");
        let result = detect_shortcuts(edges.iter(), &index, &mut diagnostics);

        assert_eq!(result[&pair(1, 2)], Classification::Genuine);
        assert_eq!(result[&pair(2, 3)], Classification::Untestable);
        assert_eq!(
            diagnostics.defects,
            vec![Defect::UntestableEdge { pair: pair(2, 3) }]
        );
    }

    #[test]
    fn classification_is_deterministic() {
        let runs = table(&[
            ("c", &[1, 4, 2, 3]),
            ("a", &[1, 2, 3]),
            ("b", &[3, 1, 2]),
            ("d", &[1, 3]),
        ]);
        let edges = [pair(1, 2), pair(1, 3), pair(2, 3), pair(1, 4), pair(2, 4)];
        let first = detect_shortcuts(
            edges.iter(),
            &RunIndex::new(runs.representatives()),
            &mut Diagnostics::new("test"),
        );
        let second = detect_shortcuts(
            edges.iter(),
            &RunIndex::new(runs.representatives()),
            &mut Diagnostics::new("test"),
        );
        assert_eq!(first, second);
        assert_eq!(
            first[&pair(1, 2)],
            Classification::Shortcut {
                witness: RunId::new("c")
            }
        );
        assert_eq!(
            first[&pair(1, 3)],
            Classification::Shortcut {
                witness: RunId::new("a")
            }
        );
    }
}
