//! Structured record of everything that was dropped, flagged or patched while
//! building a graph. Written next to the graph files for manual review.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::identifiers::{RunId, StationId, StationPair};

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(tag = "kind")]
pub enum Defect {
    MalformedRecord {
        source: String,
        line: u64,
        reason: String,
    },
    MissingStationReference {
        station: StationId,
        name: Option<String>,
    },
    MissingCoordinates {
        station: StationId,
    },
    OtherServiceDay {
        run: RunId,
        day: NaiveDate,
    },
    MissingDeparture {
        run: RunId,
        station: StationId,
    },
    /// A stop without departure that arrives before the run's last
    /// departure, so it cannot be the terminus.
    ArrivalBeforeLastDeparture {
        run: RunId,
        station: StationId,
    },
    /// A run calls at a station without reference entry. The stop keeps its
    /// place in the run, edges touching it are not derived.
    UnreferencedStop {
        run: RunId,
        station: StationId,
    },
    MissingArrival {
        run: RunId,
        station: StationId,
    },
    NegativeDuration {
        run: RunId,
        from: StationId,
        to: StationId,
        minutes: f64,
    },
    /// Two consecutive stops of a run at the same station.
    SelfLoop {
        run: RunId,
        station: StationId,
    },
    /// No representative run visits both stations, so the shortcut test has
    /// no evidence either way. The edge is kept.
    UntestableEdge {
        pair: StationPair,
    },
    RemovalNotPresent {
        pair: StationPair,
        note: String,
    },
    OverrideNotPresent {
        pair: StationPair,
        exact_km: f64,
    },
}

impl Defect {
    pub fn kind(&self) -> &'static str {
        match self {
            Defect::MalformedRecord { .. } => "MalformedRecord",
            Defect::MissingStationReference { .. } => "MissingStationReference",
            Defect::MissingCoordinates { .. } => "MissingCoordinates",
            Defect::OtherServiceDay { .. } => "OtherServiceDay",
            Defect::MissingDeparture { .. } => "MissingDeparture",
            Defect::ArrivalBeforeLastDeparture { .. } => "ArrivalBeforeLastDeparture",
            Defect::UnreferencedStop { .. } => "UnreferencedStop",
            Defect::MissingArrival { .. } => "MissingArrival",
            Defect::NegativeDuration { .. } => "NegativeDuration",
            Defect::SelfLoop { .. } => "SelfLoop",
            Defect::UntestableEdge { .. } => "UntestableEdge",
            Defect::RemovalNotPresent { .. } => "RemovalNotPresent",
            Defect::OverrideNotPresent { .. } => "OverrideNotPresent",
        }
    }

    fn level(&self) -> log::Level {
        match self {
            Defect::MissingStationReference { .. } | Defect::MissingCoordinates { .. } => {
                log::Level::Error
            }
            // Whole other days are expected in some exports and would flood the log.
            Defect::OtherServiceDay { .. } => log::Level::Debug,
            _ => log::Level::Warn,
        }
    }
}

impl std::fmt::Display for Defect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Defect::MalformedRecord {
                source,
                line,
                reason,
            } => write!(f, "malformed record in {source} at line {line}: {reason}"),
            Defect::MissingStationReference { station, name } => write!(
                f,
                "station {station} ({}) has no reference entry, no edges touch its stops",
                name.as_deref().unwrap_or("unnamed")
            ),
            Defect::MissingCoordinates { station } => {
                write!(f, "service point {station} has no coordinates")
            }
            Defect::OtherServiceDay { run, day } => {
                write!(f, "run {run} operates on {day}, dropping its stop event")
            }
            Defect::MissingDeparture { run, station } => write!(
                f,
                "run {run} has no departure at {station} before its terminus, dropping the stop"
            ),
            Defect::ArrivalBeforeLastDeparture { run, station } => write!(
                f,
                "run {run} arrives at {station} before its last departure without departing again, dropping the stop"
            ),
            Defect::UnreferencedStop { run, station } => write!(
                f,
                "run {run} calls at unreferenced station {station}, no edges touch this stop"
            ),
            Defect::MissingArrival { run, station } => {
                write!(f, "run {run} has no arrival at {station}, dropping edges into it")
            }
            Defect::NegativeDuration {
                run,
                from,
                to,
                minutes,
            } => write!(
                f,
                "run {run} travels {from} -> {to} in {minutes} minutes, dropping the edge"
            ),
            Defect::SelfLoop { run, station } => {
                write!(f, "run {run} stops at {station} twice in a row")
            }
            Defect::UntestableEdge { pair } => write!(
                f,
                "no representative run visits both ends of {pair}, keeping it for manual review"
            ),
            Defect::RemovalNotPresent { pair, note } => {
                write!(f, "manual removal of {pair} ({note}) matched no edge")
            }
            Defect::OverrideNotPresent { pair, exact_km } => write!(
                f,
                "exact distance override {exact_km} km for {pair} matched no edge"
            ),
        }
    }
}

#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct Diagnostics {
    pub representation: String,
    pub stats: BTreeMap<String, usize>,
    pub defect_counts: BTreeMap<String, usize>,
    pub defects: Vec<Defect>,
}

impl Diagnostics {
    pub fn new(representation: &str) -> Self {
        Diagnostics {
            representation: representation.to_string(),
            ..Default::default()
        }
    }

    pub fn record(&mut self, defect: Defect) {
        log::log!(defect.level(), "{}", defect);
        *self
            .defect_counts
            .entry(defect.kind().to_string())
            .or_default() += 1;
        self.defects.push(defect);
    }

    pub fn tally(&mut self, stat: &str, amount: usize) {
        *self.stats.entry(stat.to_string()).or_default() += amount;
    }

    #[cfg(test)]
    pub fn count(&self, kind: &str) -> usize {
        self.defect_counts.get(kind).copied().unwrap_or(0)
    }

    #[cfg(test)]
    pub fn stat(&self, stat: &str) -> usize {
        self.stats.get(stat).copied().unwrap_or(0)
    }

    /// Starts a report for another representation that carries over the
    /// defects found while loading the shared inputs.
    pub fn derive(&self, representation: &str) -> Self {
        Diagnostics {
            representation: representation.to_string(),
            ..self.clone()
        }
    }

    pub fn log_summary(&self) {
        if self.defect_counts.is_empty() {
            log::info!("{}: no defects.", self.representation);
        }
        for (kind, count) in &self.defect_counts {
            log::info!("{}: {} x {}", self.representation, count, kind);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_follow_records() {
        let mut diagnostics = Diagnostics::new("test");
        let run = RunId::new("85:1:1");
        diagnostics.record(Defect::SelfLoop {
            run,
            station: StationId(1),
        });
        diagnostics.record(Defect::SelfLoop {
            run,
            station: StationId(2),
        });
        diagnostics.record(Defect::MissingArrival {
            run,
            station: StationId(3),
        });
        diagnostics.tally("runs", 2);
        diagnostics.tally("runs", 1);

        assert_eq!(diagnostics.count("SelfLoop"), 2);
        assert_eq!(diagnostics.count("MissingArrival"), 1);
        assert_eq!(diagnostics.count("NegativeDuration"), 0);
        assert_eq!(diagnostics.stat("runs"), 3);
        assert_eq!(diagnostics.defects.len(), 3);
    }

    #[test]
    fn derived_report_keeps_loading_defects() {
        let mut loading = Diagnostics::new("inputs");
        loading.record(Defect::MissingCoordinates {
            station: StationId(8500000),
        });
        let derived = loading.derive("SoSto");
        assert_eq!(derived.representation, "SoSto");
        assert_eq!(derived.count("MissingCoordinates"), 1);
    }

    #[test]
    fn serializes_with_kind_tag() {
        let mut diagnostics = Diagnostics::new("SoSta");
        diagnostics.record(Defect::UntestableEdge {
            pair: StationPair::new(StationId(2), StationId(1)),
        });
        let json = serde_json::to_value(&diagnostics).unwrap();
        assert_eq!(json["defects"][0]["kind"], "UntestableEdge");
        assert_eq!(json["defects"][0]["pair"]["first"], 1);
        assert_eq!(json["defect_counts"]["UntestableEdge"], 1);
    }
}
