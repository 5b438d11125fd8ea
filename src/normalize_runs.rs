use std::collections::{BTreeMap, HashSet};

use chrono::NaiveDateTime;
use indicatif::ProgressIterator;

use crate::diagnostics::{Defect, Diagnostics};
use crate::identifiers::{RunId, StationId};
use crate::progress;

/// One cleaned row of the stop event table.
#[derive(Debug, Clone, PartialEq)]
pub struct StopEvent {
    pub run: RunId,
    pub station: StationId,
    pub arrival: Option<NaiveDateTime>,
    pub departure: Option<NaiveDateTime>,
    /// False when the station has no usable reference entry.
    pub referenced: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stop {
    pub station: StationId,
    pub arrival: Option<NaiveDateTime>,
    pub departure: Option<NaiveDateTime>,
    /// Stops at unreferenced stations keep their place in the run, but no
    /// edge is derived from them.
    pub referenced: bool,
}

/// A run with its stops in travel order. Always has at least two stops, and
/// every stop but the last has a departure time.
#[derive(Debug, Clone, PartialEq)]
pub struct Run {
    pub id: RunId,
    pub stops: Vec<Stop>,
}

impl Run {
    pub fn stations(&self) -> impl Iterator<Item = StationId> + '_ {
        self.stops.iter().map(|stop| stop.station)
    }

    pub fn station_sequence(&self) -> Vec<StationId> {
        self.stations().collect()
    }
}

#[derive(Debug, Clone, Default)]
pub struct RunTable {
    runs: BTreeMap<RunId, Run>,
}

impl RunTable {
    pub fn len(&self) -> usize {
        self.runs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    #[cfg(test)]
    pub fn get(&self, id: RunId) -> Option<&Run> {
        self.runs.get(&id)
    }

    /// Runs in ascending run id order.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = &Run> {
        self.runs.values()
    }

    /// One run per distinct station sequence. The run with the smallest id
    /// represents all runs that share its sequence.
    pub fn representatives(&self) -> Vec<&Run> {
        let mut seen = HashSet::new();
        self.iter()
            .filter(|run| seen.insert(run.station_sequence()))
            .collect()
    }
}

/// Groups stop events by run and puts every run into travel order.
///
/// Stops are sorted by departure time; the sort is stable, so stops that
/// depart at the same minute keep their input order. A stop without a
/// departure is only valid as the terminus. When a run has several of them,
/// the one with the latest arrival is kept as the terminus and the others are
/// dropped, as is any that arrives before the last departure. Runs left with fewer than two stops are discarded.
pub fn normalize(events: &[StopEvent], diagnostics: &mut Diagnostics) -> RunTable {
    let mut stops_by_run: BTreeMap<RunId, Vec<Stop>> = BTreeMap::new();
    for event in events {
        stops_by_run.entry(event.run).or_default().push(Stop {
            station: event.station,
            arrival: event.arrival,
            departure: event.departure,
            referenced: event.referenced,
        });
    }

    let mut runs = BTreeMap::new();
    let mut short_runs = 0;
    for (id, stops) in stops_by_run
        .into_iter()
        .progress_with_style(progress::bar_style())
        .with_message("Sort stops of each run.")
        .with_finish(indicatif::ProgressFinish::AndLeave)
    {
        let stops = order_stops(id, stops, diagnostics);
        if stops.len() < 2 {
            short_runs += 1;
            continue;
        }
        runs.insert(id, Run { id, stops });
    }

    log::info!(
        "Normalized {} runs, discarded {} runs with fewer than two stops.",
        runs.len(),
        short_runs
    );
    diagnostics.tally("runs", runs.len());
    diagnostics.tally("short_runs_discarded", short_runs);
    RunTable { runs }
}

fn order_stops(run: RunId, stops: Vec<Stop>, diagnostics: &mut Diagnostics) -> Vec<Stop> {
    let (mut ordered, without_departure): (Vec<Stop>, Vec<Stop>) =
        stops.into_iter().partition(|stop| stop.departure.is_some());
    ordered.sort_by_key(|stop| stop.departure);

    let last_departure = ordered.last().and_then(|stop| stop.departure);
    let mut terminus: Option<Stop> = None;
    for stop in without_departure {
        let Some(arrival) = stop.arrival else {
            diagnostics.record(Defect::MissingDeparture {
                run,
                station: stop.station,
            });
            continue;
        };
        let after_last_departure = last_departure.map_or(true, |departure| arrival >= departure);
        let later_than_terminus = terminus.map_or(true, |t| Some(arrival) > t.arrival);
        if !after_last_departure {
            diagnostics.record(Defect::ArrivalBeforeLastDeparture {
                run,
                station: stop.station,
            });
        } else if later_than_terminus {
            if let Some(previous) = terminus.replace(stop) {
                diagnostics.record(Defect::MissingDeparture {
                    run,
                    station: previous.station,
                });
            }
        } else {
            diagnostics.record(Defect::MissingDeparture {
                run,
                station: stop.station,
            });
        }
    }
    ordered.extend(terminus);
    ordered
}
