use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime};
use geo::Point;
use indicatif::{ProgressBar, ProgressIterator};

use crate::corrections::CorrectionSet;
use crate::diagnostics::{Defect, Diagnostics};
use crate::error::InputError;
use crate::identifiers::{RunId, StationId};
use crate::normalize_runs::StopEvent;
use crate::progress;
use crate::records::*;
use crate::stations::{Ridership, Station, StationRegistry};

const DAY_FORMAT: &str = "%d.%m.%Y";
const TIMESTAMP_FORMAT: &str = "%d.%m.%Y %H:%M";

#[derive(Debug, Clone)]
pub struct InputPaths {
    pub stop_events: PathBuf,
    pub service_points: PathBuf,
    pub ridership: PathBuf,
    pub lines: PathBuf,
}

/// Position of a station along one line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinePoint {
    pub line: u32,
    pub station: StationId,
    pub km: f64,
}

fn open_csv(path: &Path) -> Result<csv::Reader<std::fs::File>> {
    csv::ReaderBuilder::new()
        .delimiter(b';')
        .from_path(path)
        .with_context(|| format!("Failed to open {:?}", path))
}

fn source_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Deserializes all rows of a `;`-separated file together with their line
/// numbers. Rows that do not fit the record layout are reported and skipped,
/// I/O errors abort.
fn read_records<T: serde::de::DeserializeOwned>(
    path: &Path,
    diagnostics: &mut Diagnostics,
) -> Result<Vec<(u64, T)>> {
    let mut reader = open_csv(path)?;
    let headers = reader
        .headers()
        .with_context(|| format!("Failed to read header of {:?}", path))?
        .clone();
    let source = source_name(path);
    let mut records = vec![];
    for result in reader
        .records()
        .progress_with(ProgressBar::new_spinner().with_style(progress::spinner_style()))
        .with_message(format!("Read {}.", source))
        .with_finish(indicatif::ProgressFinish::AndLeave)
    {
        let parsed = result.and_then(|raw| {
            let line = raw.position().map(|p| p.line()).unwrap_or(0);
            raw.deserialize::<T>(Some(&headers)).map(|record| (line, record))
        });
        match parsed {
            Ok(record) => records.push(record),
            Err(err) if err.is_io_error() => {
                return Err(err).with_context(|| format!("Failed to read {:?}", path));
            }
            Err(err) => diagnostics.record(Defect::MalformedRecord {
                source: source.clone(),
                line: err.position().map(|p| p.line()).unwrap_or(0),
                reason: err.to_string(),
            }),
        }
    }
    Ok(records)
}

fn parse_timestamp(value: Option<&str>) -> Result<Option<NaiveDateTime>, InputError> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(text) => NaiveDateTime::parse_from_str(text, TIMESTAMP_FORMAT)
            .map(Some)
            .map_err(|_| InputError::Timestamp {
                value: text.to_string(),
                format: TIMESTAMP_FORMAT,
            }),
    }
}

fn parse_day(value: &str) -> Result<NaiveDate, InputError> {
    NaiveDate::parse_from_str(value.trim(), DAY_FORMAT).map_err(|_| InputError::Timestamp {
        value: value.to_string(),
        format: DAY_FORMAT,
    })
}

/// Ridership counts are published with `’` as thousands separator.
fn parse_count(value: &str, column: &'static str) -> Result<Option<u32>, InputError> {
    let digits: String = value
        .chars()
        .filter(|c| !matches!(c, '’' | '\'' | ' '))
        .collect();
    if digits.is_empty() {
        return Ok(None);
    }
    digits.parse().map(Some).map_err(|_| InputError::Number {
        value: value.to_string(),
        column,
    })
}

fn parse_km(value: &str) -> Result<f64, InputError> {
    value
        .trim()
        .replace(',', ".")
        .parse()
        .map_err(|_| InputError::Number {
            value: value.to_string(),
            column: "KM",
        })
}

fn is_true(value: Option<&str>) -> bool {
    value.is_some_and(|v| v.trim().eq_ignore_ascii_case("true"))
}

/// Reads the service points and joins the most recent ridership figures.
pub fn load_stations(
    service_points_path: &Path,
    ridership_path: &Path,
    corrections: &CorrectionSet,
    diagnostics: &mut Diagnostics,
) -> Result<StationRegistry> {
    log::info!("Loading service points from {:?}", service_points_path);
    let service_points: Vec<(u64, ServicePointRecord)> =
        read_records(service_points_path, diagnostics)?;

    log::info!("Loading ridership from {:?}", ridership_path);
    let ridership_records: Vec<(u64, RidershipRecord)> =
        read_records(ridership_path, diagnostics)?;
    let mut latest: HashMap<u32, &(u64, RidershipRecord)> = HashMap::new();
    for entry in &ridership_records {
        let current = latest.entry(entry.1.station_id).or_insert(entry);
        if entry.1.year > current.1.year {
            *current = entry;
        }
    }
    let mut ridership = HashMap::new();
    for (station_id, (line, record)) in latest {
        let counts = (
            parse_count(&record.daily, "DTV_TJM_TGM"),
            parse_count(&record.weekdays, "DWV_TMJO_TFM"),
            parse_count(&record.weekends, "DNWV_TMJNO_TMGNL"),
        );
        match counts {
            (Ok(Some(daily)), Ok(Some(weekdays)), Ok(Some(weekends))) => {
                ridership.insert(
                    station_id,
                    Ridership {
                        daily,
                        weekdays,
                        weekends,
                    },
                );
            }
            (Err(err), _, _) | (_, Err(err), _) | (_, _, Err(err)) => {
                diagnostics.record(Defect::MalformedRecord {
                    source: source_name(ridership_path),
                    line: *line,
                    reason: err.to_string(),
                })
            }
            _ => {}
        }
    }

    let mut stations = vec![];
    for (_, point) in service_points {
        let (Some(longitude), Some(latitude)) = (point.longitude, point.latitude) else {
            diagnostics.record(Defect::MissingCoordinates {
                station: StationId(point.number),
            });
            continue;
        };
        stations.push(Station {
            id: StationId(point.number),
            name: point.name,
            canton: point.canton,
            municipality: point.municipality,
            company: point.company,
            location: Point::new(longitude, latitude),
            elevation: point.height,
            ridership: ridership.get(&point.number).copied(),
        });
    }

    let mut registry = StationRegistry::new(stations);
    corrections.patch_elevations(&mut registry);
    log::info!("Loaded {} stations with coordinates.", registry.len());
    Ok(registry)
}

/// Reads the stop events of one operating day and applies the product,
/// cancellation and alias cleanup. Events at stations without a usable
/// reference are kept, marked as unreferenced, so that their neighbours do not
/// look consecutive.
///
/// The service day is the requested one, or the operating day of the first
/// kept event. Returns the events together with that day.
pub fn load_stop_events(
    path: &Path,
    registry: &StationRegistry,
    corrections: &CorrectionSet,
    service_day: Option<NaiveDate>,
    diagnostics: &mut Diagnostics,
) -> Result<(Vec<StopEvent>, NaiveDate)> {
    log::info!("Loading stop events from {:?}", path);
    let records: Vec<(u64, StopEventRecord)> = read_records(path, diagnostics)?;
    let total = records.len();
    let source = source_name(path);

    let mut events = vec![];
    let mut day = service_day;
    let mut first_day = None;
    let mut filtered = 0;
    let mut unknown_stations: BTreeSet<StationId> = BTreeSet::new();
    for (line, record) in records {
        let product = record.product.as_deref().unwrap_or(&corrections.product);
        let excluded_line = record
            .line_text
            .as_ref()
            .is_some_and(|text| corrections.excluded_line_texts.contains(text));
        if product != corrections.product || is_true(record.cancelled.as_deref()) || excluded_line
        {
            filtered += 1;
            continue;
        }

        let run = RunId::new(&record.run_id);
        let parsed = parse_day(&record.operating_day).and_then(|operating_day| {
            Ok((
                operating_day,
                parse_timestamp(record.arrival.as_deref())?,
                parse_timestamp(record.departure.as_deref())?,
            ))
        });
        let (operating_day, arrival, departure) = match parsed {
            Ok(parsed) => parsed,
            Err(err) => {
                diagnostics.record(Defect::MalformedRecord {
                    source: source.clone(),
                    line,
                    reason: err.to_string(),
                });
                continue;
            }
        };
        if first_day.is_none() {
            first_day = Some(operating_day);
        }
        let reference_day = *day.get_or_insert(operating_day);
        if operating_day != reference_day {
            diagnostics.record(Defect::OtherServiceDay {
                run,
                day: operating_day,
            });
            continue;
        }

        let station = match record
            .station_name
            .as_deref()
            .and_then(|name| corrections.alias(name))
        {
            Some(alias) => {
                log::debug!("Merging {:?} into {}", alias.alias, alias.name);
                alias.station
            }
            None => StationId(record.station_id),
        };
        let referenced = registry.contains(station);
        if !referenced {
            if unknown_stations.insert(station) {
                diagnostics.record(Defect::MissingStationReference {
                    station,
                    name: record.station_name.clone(),
                });
            }
            diagnostics.record(Defect::UnreferencedStop { run, station });
        }

        events.push(StopEvent {
            run,
            station,
            arrival,
            departure,
            referenced,
        });
    }

    let day = match (day, first_day) {
        (Some(requested), Some(found)) if events.is_empty() && requested != found => {
            return Err(InputError::ServiceDayMismatch { requested, found }.into());
        }
        (Some(day), _) => day,
        (None, _) => return Err(InputError::NoServiceDay(path.to_path_buf()).into()),
    };
    log::info!(
        "Kept {} of {} stop events for {} ({} filtered by product, line or cancellation).",
        events.len(),
        total,
        day,
        filtered
    );
    diagnostics.tally("stop_events", events.len());
    diagnostics.tally("stop_events_filtered", filtered);
    Ok((events, day))
}

/// Reads the kilometre positions of operating points along each line.
pub fn load_line_points(path: &Path, diagnostics: &mut Diagnostics) -> Result<Vec<LinePoint>> {
    log::info!("Loading line kilometrage from {:?}", path);
    let records: Vec<(u64, LinePointRecord)> = read_records(path, diagnostics)?;
    let mut points = vec![];
    for (line, record) in records {
        let Some(station_id) = record.station_id else {
            continue;
        };
        match parse_km(&record.km) {
            Ok(km) => points.push(LinePoint {
                line: record.line,
                station: StationId(station_id),
                km,
            }),
            Err(err) => diagnostics.record(Defect::MalformedRecord {
                source: source_name(path),
                line,
                reason: err.to_string(),
            }),
        }
    }
    log::info!("Loaded {} line points.", points.len());
    Ok(points)
}
