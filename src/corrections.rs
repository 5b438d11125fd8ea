//! Manually curated corrections for the 2025-03-05 Swiss timetable extract.
//!
//! These tables are domain knowledge that the algorithms cannot derive. Pairs
//! are named by official station designation and resolved against the station
//! registry when a graph is built, so that a typo fails loudly instead of
//! silently matching nothing.

use std::path::Path;

use anyhow::{Context, Result};

use crate::error::InputError;
use crate::identifiers::{StationId, StationPair};
use crate::stations::StationRegistry;

const VERSION: &str = "2025-03-05";

const PRODUCT: &str = "Zug";

/// Car-carrying shuttle trains.
const EXCLUDED_LINE_TEXTS: &[&str] = &["ATZ"];

/// (name in stop events, merged station id, merged station name)
const STATION_ALIASES: &[(&str, u32, &str)] = &[
    ("Brig Bahnhofplatz", 8501609, "Brig"),
    ("Lugano FLP", 8505300, "Lugano"),
    ("Locarno FART", 8505400, "Locarno"),
];

const STOP_GRAPH_EXCLUSIONS: &[(&str, &str, &str)] = &[(
    "Basel Bad Bf",
    "Schaffhausen",
    "German stations in between are not part of the extract",
)];

const TOPOLOGY_REMOVALS: &[(&str, &str, &str)] = &[
    ("Bern", "Zofingen", "not adjacent on the infrastructure"),
    ("Bern Wankdorf", "Zürich HB", "not adjacent on the infrastructure"),
    ("Morges", "Yverdon-les-Bains", "not adjacent on the infrastructure"),
    ("Aarau", "Sissach", "not adjacent on the infrastructure"),
    ("Bergün/Bravuogn", "Pontresina", "not adjacent on the infrastructure"),
    ("Interlaken West", "Spiez", "not adjacent on the infrastructure"),
    ("Biel/Bienne", "Grenchen Nord", "not adjacent on the infrastructure"),
    ("Chambrelien", "Neuchâtel", "not adjacent on the infrastructure"),
    ("Concise", "Yverdon-les-Bains", "not adjacent on the infrastructure"),
    ("Etoy", "Rolle", "not adjacent on the infrastructure"),
    ("Klosters Platz", "Susch", "one edge per Vereina tunnel"),
];

const TOPOLOGY_ADDITIONS: &[(&str, &str, &str)] = &[
    ("Biasca", "Erstfeld", "Gotthard base tunnel"),
    ("Bern Wankdorf", "Rothrist", "Bahn-2000"),
    ("Chambrelien", "Corcelles-Peseux", "missing connector"),
    ("Concise", "Grandson", "missing connector"),
    ("Immensee", "Rotkreuz", "missing connector"),
    ("Olten", "Rothrist", "bypasses Aarburg-Oftringen"),
    ("Rothrist", "Solothurn", "Bahn-2000"),
    ("Aarau", "Däniken SO", "Eppenberg tunnel"),
    ("Liestal", "Muttenz", "Adler tunnel"),
    ("Thalwil", "Zürich HB", "Zimmerberg tunnel"),
    ("Zürich Altstetten", "Zürich HB", "separate infrastructure"),
];

const EXACT_DISTANCE_OVERRIDES: &[(&str, &str, f64)] = &[("Baar Lindenpark", "Zug", 1.0593)];

const ELEVATION_PATCHES: &[(&str, f64)] = &[("Tirano", 441.0)];

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct NamedPair {
    pub a: String,
    pub b: String,
    #[serde(default)]
    pub note: String,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DistanceOverride {
    pub a: String,
    pub b: String,
    pub exact_km: f64,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ElevationPatch {
    pub station: String,
    pub elevation: f64,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct StationAlias {
    pub alias: String,
    pub station: StationId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CorrectionSet {
    pub version: String,
    pub product: String,
    pub excluded_line_texts: Vec<String>,
    pub station_aliases: Vec<StationAlias>,
    pub stop_graph_exclusions: Vec<NamedPair>,
    pub topology_removals: Vec<NamedPair>,
    pub topology_additions: Vec<NamedPair>,
    pub exact_distance_overrides: Vec<DistanceOverride>,
    pub elevation_patches: Vec<ElevationPatch>,
}

/// Correction pairs translated to station ids.
#[derive(Debug, Clone, Default)]
pub struct ResolvedCorrections {
    pub stop_graph_exclusions: Vec<StationPair>,
    pub topology_removals: Vec<(StationPair, String)>,
    pub topology_additions: Vec<(StationPair, String)>,
    pub exact_distance_overrides: Vec<(StationPair, f64)>,
}

fn named_pairs(table: &[(&str, &str, &str)]) -> Vec<NamedPair> {
    table
        .iter()
        .map(|(a, b, note)| NamedPair {
            a: a.to_string(),
            b: b.to_string(),
            note: note.to_string(),
        })
        .collect()
}

impl CorrectionSet {
    pub fn builtin() -> Self {
        CorrectionSet {
            version: VERSION.to_string(),
            product: PRODUCT.to_string(),
            excluded_line_texts: EXCLUDED_LINE_TEXTS.iter().map(|s| s.to_string()).collect(),
            station_aliases: STATION_ALIASES
                .iter()
                .map(|(alias, id, name)| StationAlias {
                    alias: alias.to_string(),
                    station: StationId(*id),
                    name: name.to_string(),
                })
                .collect(),
            stop_graph_exclusions: named_pairs(STOP_GRAPH_EXCLUSIONS),
            topology_removals: named_pairs(TOPOLOGY_REMOVALS),
            topology_additions: named_pairs(TOPOLOGY_ADDITIONS),
            exact_distance_overrides: EXACT_DISTANCE_OVERRIDES
                .iter()
                .map(|(a, b, exact_km)| DistanceOverride {
                    a: a.to_string(),
                    b: b.to_string(),
                    exact_km: *exact_km,
                })
                .collect(),
            elevation_patches: ELEVATION_PATCHES
                .iter()
                .map(|(station, elevation)| ElevationPatch {
                    station: station.to_string(),
                    elevation: *elevation,
                })
                .collect(),
        }
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read corrections from {:?}", path))?;
        let corrections: CorrectionSet = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse corrections in {:?}", path))?;
        log::info!(
            "Using corrections version {} from {:?}",
            corrections.version,
            path
        );
        Ok(corrections)
    }

    pub fn alias(&self, station_name: &str) -> Option<&StationAlias> {
        self.station_aliases.iter().find(|a| a.alias == station_name)
    }

    pub fn resolve(&self, registry: &StationRegistry) -> Result<ResolvedCorrections, InputError> {
        let resolve_pair = |table: &'static str, a: &str, b: &str| {
            let lookup = |name: &str| {
                registry
                    .id_by_name(name)
                    .ok_or_else(|| InputError::UnknownCorrectionStation {
                        table,
                        name: name.to_string(),
                    })
            };
            Ok::<_, InputError>(StationPair::new(lookup(a)?, lookup(b)?))
        };

        let mut resolved = ResolvedCorrections::default();
        for pair in &self.stop_graph_exclusions {
            resolved
                .stop_graph_exclusions
                .push(resolve_pair("stop_graph_exclusions", &pair.a, &pair.b)?);
        }
        for pair in &self.topology_removals {
            resolved.topology_removals.push((
                resolve_pair("topology_removals", &pair.a, &pair.b)?,
                pair.note.clone(),
            ));
        }
        for pair in &self.topology_additions {
            resolved.topology_additions.push((
                resolve_pair("topology_additions", &pair.a, &pair.b)?,
                pair.note.clone(),
            ));
        }
        for entry in &self.exact_distance_overrides {
            resolved.exact_distance_overrides.push((
                resolve_pair("exact_distance_overrides", &entry.a, &entry.b)?,
                entry.exact_km,
            ));
        }
        Ok(resolved)
    }

    /// Fills in elevations that are missing from the service point data.
    pub fn patch_elevations(&self, registry: &mut StationRegistry) {
        for patch in &self.elevation_patches {
            let Some(id) = registry.id_by_name(&patch.station) else {
                log::debug!("No station {:?} to patch the elevation of.", patch.station);
                continue;
            };
            if let Some(station) = registry.get_mut(id) {
                if station.elevation.is_none() {
                    station.elevation = Some(patch.elevation);
                }
            }
        }
    }
}
