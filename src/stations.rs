use std::collections::{BTreeMap, BTreeSet, HashMap};

use geo::{Distance, Geodesic, Point};

use crate::error::InputError;
use crate::identifiers::StationId;
use crate::records::NodeRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ridership {
    pub daily: u32,
    pub weekdays: u32,
    pub weekends: u32,
}

#[derive(Debug, Clone)]
pub struct Station {
    pub id: StationId,
    pub name: String,
    pub canton: Option<String>,
    pub municipality: Option<String>,
    pub company: Option<String>,
    /// x is the longitude, y the latitude (WGS84).
    pub location: Point<f64>,
    pub elevation: Option<f64>,
    pub ridership: Option<Ridership>,
}

impl Station {
    pub fn to_row(&self) -> NodeRow {
        NodeRow {
            station_id: self.id.0,
            name: self.name.clone(),
            canton: self.canton.clone(),
            municipality: self.municipality.clone(),
            company: self.company.clone(),
            longitude: self.location.x(),
            latitude: self.location.y(),
            elevation: self.elevation,
            daily_traffic: self.ridership.map(|r| r.daily),
            weekday_traffic: self.ridership.map(|r| r.weekdays),
            weekend_traffic: self.ridership.map(|r| r.weekends),
        }
    }
}

/// Straight-line distance between two stations.
pub trait DistanceService {
    fn distance_km(&self, a: StationId, b: StationId) -> Option<f64>;
}

/// All stations with usable coordinates, immutable once loaded.
#[derive(Debug, Clone, Default)]
pub struct StationRegistry {
    by_id: BTreeMap<StationId, Station>,
    by_name: HashMap<String, StationId>,
}

impl StationRegistry {
    pub fn new(stations: impl IntoIterator<Item = Station>) -> Self {
        let by_id: BTreeMap<StationId, Station> =
            stations.into_iter().map(|s| (s.id, s)).collect();
        let mut by_name = HashMap::new();
        for station in by_id.values() {
            // Lowest number wins when two service points share a designation.
            by_name.entry(station.name.clone()).or_insert(station.id);
        }
        StationRegistry { by_id, by_name }
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn contains(&self, id: StationId) -> bool {
        self.by_id.contains_key(&id)
    }

    pub fn get(&self, id: StationId) -> Option<&Station> {
        self.by_id.get(&id)
    }

    pub fn get_mut(&mut self, id: StationId) -> Option<&mut Station> {
        self.by_id.get_mut(&id)
    }

    pub fn id_by_name(&self, name: &str) -> Option<StationId> {
        self.by_name.get(name).copied()
    }

    /// Node rows for the given stations, sorted by station id.
    pub fn node_rows(&self, stations: &BTreeSet<StationId>) -> Result<Vec<NodeRow>, InputError> {
        stations
            .iter()
            .map(|id| {
                self.get(*id)
                    .map(Station::to_row)
                    .ok_or(InputError::MissingStation(*id))
            })
            .collect()
    }
}

impl DistanceService for StationRegistry {
    fn distance_km(&self, a: StationId, b: StationId) -> Option<f64> {
        let a = self.get(a)?;
        let b = self.get(b)?;
        Some(Geodesic.distance(a.location, b.location) / 1000.0)
    }
}

#[cfg(test)]
pub(crate) fn test_station(id: u32, name: &str, longitude: f64, latitude: f64) -> Station {
    Station {
        id: StationId(id),
        name: name.to_string(),
        canton: None,
        municipality: None,
        company: None,
        location: Point::new(longitude, latitude),
        elevation: None,
        ridership: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn geodesic_distance_between_zurich_and_bern() {
        let registry = StationRegistry::new([
            test_station(8503000, "Zürich HB", 8.540192, 47.378177),
            test_station(8507000, "Bern", 7.439122, 46.948825),
        ]);
        let km = registry
            .distance_km(StationId(8503000), StationId(8507000))
            .unwrap();
        assert_relative_eq!(km, 96.0, epsilon = 1.0);
        assert_eq!(
            registry.distance_km(StationId(8503000), StationId(8507000)),
            registry.distance_km(StationId(8507000), StationId(8503000))
        );
        assert_eq!(registry.distance_km(StationId(8503000), StationId(1)), None);
    }

    #[test]
    fn name_lookup_prefers_lowest_id() {
        let registry = StationRegistry::new([
            test_station(20, "Twin", 8.0, 47.0),
            test_station(10, "Twin", 8.1, 47.1),
        ]);
        assert_eq!(registry.id_by_name("Twin"), Some(StationId(10)));
        assert_eq!(registry.id_by_name("Other"), None);
    }

    #[test]
    fn node_rows_are_sorted_and_require_reference() {
        let registry = StationRegistry::new([
            test_station(3, "C", 8.0, 47.0),
            test_station(1, "A", 8.1, 47.1),
        ]);
        let rows = registry
            .node_rows(&BTreeSet::from([StationId(3), StationId(1)]))
            .unwrap();
        let ids: Vec<u32> = rows.iter().map(|r| r.station_id).collect();
        assert_eq!(ids, vec![1, 3]);
        assert_eq!(rows[0].longitude, 8.1);
        assert_eq!(rows[0].latitude, 47.1);

        let missing = registry.node_rows(&BTreeSet::from([StationId(2)]));
        assert!(matches!(missing, Err(InputError::MissingStation(StationId(2)))));
    }
}
