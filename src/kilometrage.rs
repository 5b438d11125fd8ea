use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::identifiers::{StationId, StationPair};
use crate::load_inputs::LinePoint;

/// Track distances between stations that follow each other on a line.
///
/// Only points at the given stations are considered, so the distance between
/// two stations spans any non-station operating points in between. When a pair
/// occurs on several lines the line with the highest id decides.
pub fn exact_distances(
    points: &[LinePoint],
    stations: &BTreeSet<StationId>,
) -> HashMap<StationPair, f64> {
    let mut points_by_line: BTreeMap<u32, Vec<&LinePoint>> = BTreeMap::new();
    for point in points.iter().filter(|p| stations.contains(&p.station)) {
        points_by_line.entry(point.line).or_default().push(point);
    }

    let mut distances = HashMap::new();
    for (_, mut line_points) in points_by_line {
        line_points.sort_by(|a, b| a.km.total_cmp(&b.km));
        for pair in line_points.windows(2) {
            let key = StationPair::new(pair[0].station, pair[1].station);
            if key.is_loop() {
                continue;
            }
            distances.insert(key, pair[1].km - pair[0].km);
        }
    }
    distances
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn point(line: u32, station: u32, km: f64) -> LinePoint {
        LinePoint {
            line,
            station: StationId(station),
            km,
        }
    }

    #[test]
    fn consecutive_stations_by_kilometre() {
        let points = [
            point(1, 3, 12.5),
            point(1, 1, 0.0),
            point(1, 99, 4.0),
            point(1, 2, 5.25),
        ];
        let stations = BTreeSet::from([StationId(1), StationId(2), StationId(3)]);
        let distances = exact_distances(&points, &stations);

        assert_eq!(distances.len(), 2);
        assert_relative_eq!(
            distances[&StationPair::new(StationId(2), StationId(1))],
            5.25
        );
        assert_relative_eq!(
            distances[&StationPair::new(StationId(2), StationId(3))],
            7.25
        );
        assert!(!distances.contains_key(&StationPair::new(StationId(1), StationId(3))));
    }

    #[test]
    fn later_line_wins_for_shared_pair() {
        let points = [
            point(20, 1, 100.0),
            point(20, 2, 103.0),
            point(10, 2, 0.0),
            point(10, 1, 2.5),
        ];
        let stations = BTreeSet::from([StationId(1), StationId(2)]);
        let distances = exact_distances(&points, &stations);
        assert_relative_eq!(
            distances[&StationPair::new(StationId(1), StationId(2))],
            3.0
        );
    }

    #[test]
    fn repeated_station_on_a_line_is_ignored() {
        let points = [point(1, 1, 0.0), point(1, 1, 0.3), point(1, 2, 1.0)];
        let stations = BTreeSet::from([StationId(1), StationId(2)]);
        let distances = exact_distances(&points, &stations);
        assert_eq!(distances.len(), 1);
        assert_relative_eq!(
            distances[&StationPair::new(StationId(1), StationId(2))],
            0.7
        );
    }
}
