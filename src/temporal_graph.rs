use std::collections::BTreeSet;

use anyhow::Result;
use chrono::NaiveDateTime;
use indicatif::ProgressIterator;

use crate::diagnostics::{Defect, Diagnostics};
use crate::identifiers::StationId;
use crate::normalize_runs::{Run, RunTable};
use crate::progress;
use crate::records::TemporalEdgeRow;

/// Travel from one stop of a run to any later stop of the same run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TemporalEdge {
    pub from: StationId,
    pub to: StationId,
    /// Departure at `from` in whole minutes after the reference midnight.
    pub start_minutes: i64,
    pub duration_minutes: i64,
}

impl TemporalEdge {
    pub fn to_row(&self) -> TemporalEdgeRow {
        TemporalEdgeRow {
            station1: self.from.0,
            station2: self.to.0,
            start: self.start_minutes,
            duration: self.duration_minutes,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TemporalSummary {
    pub stations: BTreeSet<StationId>,
    pub edges: usize,
}

/// All pairs (i, j) with i < j of one run, including a return to an earlier
/// station. Times are truncated to whole minutes. Pairs into a stop without
/// arrival or with a negative duration are skipped, as are pairs touching an
/// unreferenced stop.
pub fn expand_run(
    run: &Run,
    reference_midnight: NaiveDateTime,
    diagnostics: &mut Diagnostics,
) -> Vec<TemporalEdge> {
    for stop in run.stops.iter().skip(1) {
        if stop.referenced && stop.arrival.is_none() {
            diagnostics.record(Defect::MissingArrival {
                run: run.id,
                station: stop.station,
            });
        }
    }

    let mut edges = vec![];
    for (i, from) in run.stops.iter().enumerate() {
        let Some(departure) = from.departure.filter(|_| from.referenced) else {
            continue;
        };
        let start_minutes = (departure - reference_midnight).num_minutes();
        for to in &run.stops[i + 1..] {
            let Some(arrival) = to.arrival.filter(|_| to.referenced) else {
                continue;
            };
            let duration = arrival - departure;
            if duration < chrono::Duration::zero() {
                diagnostics.record(Defect::NegativeDuration {
                    run: run.id,
                    from: from.station,
                    to: to.station,
                    minutes: duration.num_seconds() as f64 / 60.0,
                });
                continue;
            }
            edges.push(TemporalEdge {
                from: from.station,
                to: to.station,
                start_minutes,
                duration_minutes: duration.num_minutes(),
            });
        }
    }
    edges
}

/// Expands one run per distinct station sequence and hands the edges of each
/// run to `sink` before the next run is expanded.
pub fn expand_runs(
    runs: &RunTable,
    reference_midnight: NaiveDateTime,
    diagnostics: &mut Diagnostics,
    mut sink: impl FnMut(&[TemporalEdge]) -> Result<()>,
) -> Result<TemporalSummary> {
    let representatives = runs.representatives();
    log::info!(
        "Expanding {} of {} runs with distinct station sequences.",
        representatives.len(),
        runs.len()
    );
    let mut summary = TemporalSummary::default();
    for run in representatives
        .into_iter()
        .progress_with_style(progress::bar_style())
        .with_message("Expand runs in time.")
        .with_finish(indicatif::ProgressFinish::AndLeave)
    {
        let edges = expand_run(run, reference_midnight, diagnostics);
        for edge in &edges {
            summary.stations.insert(edge.from);
            summary.stations.insert(edge.to);
        }
        summary.edges += edges.len();
        sink(&edges)?;
    }
    log::info!(
        "Temporal graph has {} stations and {} edges.",
        summary.stations.len(),
        summary.edges
    );
    diagnostics.tally("temporal_edges", summary.edges);
    Ok(summary)
}
