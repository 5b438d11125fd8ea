use std::collections::{BTreeMap, BTreeSet, HashMap};

use indicatif::ProgressIterator;

use crate::diagnostics::{Defect, Diagnostics};
use crate::identifiers::{StationId, StationPair};
use crate::normalize_runs::{Run, RunTable};
use crate::progress;
use crate::records::StopEdgeRow;

/// Travel between two consecutive stops of one run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    pub from: StationId,
    pub to: StationId,
    pub minutes: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AggregatedEdge {
    pub count: u32,
    pub mean_minutes: f64,
}

#[derive(Debug, Clone, Default)]
pub struct StopGraph {
    pub edges: BTreeMap<StationPair, AggregatedEdge>,
    pub stations: BTreeSet<StationId>,
}

impl StopGraph {
    pub fn edge_rows(&self) -> Vec<StopEdgeRow> {
        self.edges
            .iter()
            .map(|(pair, edge)| StopEdgeRow {
                station1: pair.first.0,
                station2: pair.second.0,
                connections: edge.count,
                average_duration: edge.mean_minutes,
            })
            .collect()
    }
}

pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Observations between temporally consecutive stops. Pairs with a missing
/// or negative travel time are reported and skipped. Pairs touching an
/// unreferenced stop were reported at ingestion and are skipped silently.
pub fn observations(run: &Run, diagnostics: &mut Diagnostics) -> Vec<Observation> {
    let mut result = vec![];
    for pair in run.stops.windows(2) {
        let (from, to) = (&pair[0], &pair[1]);
        if !from.referenced || !to.referenced {
            continue;
        }
        if from.station == to.station {
            diagnostics.record(Defect::SelfLoop {
                run: run.id,
                station: from.station,
            });
            continue;
        }
        let (Some(departure), Some(arrival)) = (from.departure, to.arrival) else {
            diagnostics.record(Defect::MissingArrival {
                run: run.id,
                station: to.station,
            });
            continue;
        };
        let minutes = (arrival - departure).num_seconds() as f64 / 60.0;
        if minutes < 0.0 {
            diagnostics.record(Defect::NegativeDuration {
                run: run.id,
                from: from.station,
                to: to.station,
                minutes,
            });
            continue;
        }
        result.push(Observation {
            from: from.station,
            to: to.station,
            minutes,
        });
    }
    result
}

#[derive(Debug, Clone, Copy, Default)]
struct RunningStats {
    count: u32,
    total_minutes: f64,
}

/// Sums observations per unordered station pair. Means only exist after
/// [`EdgeAggregator::finish`].
#[derive(Debug, Default)]
pub struct EdgeAggregator {
    stats: HashMap<StationPair, RunningStats>,
}

impl EdgeAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, observation: &Observation) {
        let stats = self
            .stats
            .entry(StationPair::new(observation.from, observation.to))
            .or_default();
        stats.count += 1;
        stats.total_minutes += observation.minutes;
    }

    pub fn finish(self) -> BTreeMap<StationPair, AggregatedEdge> {
        self.stats
            .into_iter()
            .map(|(pair, stats)| {
                (
                    pair,
                    AggregatedEdge {
                        count: stats.count,
                        mean_minutes: round_to(stats.total_minutes / stats.count as f64, 2),
                    },
                )
            })
            .collect()
    }
}

/// Builds the space-of-stops graph from every run, including runs that share
/// a station sequence with another run.
pub fn build_stop_graph(
    runs: &RunTable,
    exclusions: &[StationPair],
    diagnostics: &mut Diagnostics,
) -> StopGraph {
    let mut aggregator = EdgeAggregator::new();
    let mut observation_count = 0;
    for run in runs
        .iter()
        .progress_with_style(progress::bar_style())
        .with_message("Aggregate consecutive stops.")
        .with_finish(indicatif::ProgressFinish::AndLeave)
    {
        for observation in observations(run, diagnostics) {
            aggregator.add(&observation);
            observation_count += 1;
        }
    }

    let mut edges = aggregator.finish();
    for pair in exclusions {
        if edges.remove(pair).is_some() {
            log::info!("Excluded edge {} from the stop graph.", pair);
        }
    }
    let stations = edges
        .keys()
        .flat_map(|pair| [pair.first, pair.second])
        .collect::<BTreeSet<_>>();

    log::info!(
        "Stop graph has {} stations and {} edges from {} observations.",
        stations.len(),
        edges.len(),
        observation_count
    );
    diagnostics.tally("observations", observation_count);
    diagnostics.tally("stop_graph_edges", edges.len());
    StopGraph { edges, stations }
}
