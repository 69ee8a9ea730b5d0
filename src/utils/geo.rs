use serde::{Deserialize, Serialize};

const EARTH_RADIUS_KM: f64 = 6371.0;

// GeoJSON point, coordinates ordered [longitude, latitude].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    #[serde(rename = "type")]
    pub kind: String,
    pub coordinates: [f64; 2],
}

impl GeoPoint {
    pub fn new(longitude: f64, latitude: f64) -> Self {
        Self {
            kind: "Point".to_string(),
            coordinates: [longitude, latitude],
        }
    }

    pub fn longitude(&self) -> f64 {
        self.coordinates[0]
    }

    pub fn latitude(&self) -> f64 {
        self.coordinates[1]
    }
}

impl Default for GeoPoint {
    fn default() -> Self {
        Self::new(0.0, 0.0)
    }
}

fn to_rad(value: f64) -> f64 {
    value * std::f64::consts::PI / 180.0
}

// Great-circle distance between two [lng, lat] pairs, in kilometers.
// Inputs are not validated; NaN propagates.
pub fn distance_km(point1: [f64; 2], point2: [f64; 2]) -> f64 {
    let d_lat = to_rad(point2[1] - point1[1]);
    let d_lon = to_rad(point2[0] - point1[0]);
    let lat1 = to_rad(point1[1]);
    let lat2 = to_rad(point2[1]);

    let a = (d_lat / 2.0).sin() * (d_lat / 2.0).sin()
        + (d_lon / 2.0).sin() * (d_lon / 2.0).sin() * lat1.cos() * lat2.cos();
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_KM * c
}

// Even-odd ray casting over a single polygon ring (no holes). Points
// exactly on an edge may fall on either side.
pub fn point_in_polygon(point: [f64; 2], ring: &[[f64; 2]]) -> bool {
    if ring.is_empty() {
        return false;
    }

    let (x, y) = (point[0], point[1]);
    let mut inside = false;

    let mut j = ring.len() - 1;
    for i in 0..ring.len() {
        let (xi, yi) = (ring[i][0], ring[i][1]);
        let (xj, yj) = (ring[j][0], ring[j][1]);

        let intersect =
            ((yi > y) != (yj > y)) && (x < (xj - xi) * (y - yi) / (yj - yi) + xi);
        if intersect {
            inside = !inside;
        }
        j = i;
    }

    inside
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_distance_for_identical_points() {
        assert_eq!(distance_km([0.0, 0.0], [0.0, 0.0]), 0.0);
    }

    #[test]
    fn one_degree_of_latitude() {
        let d = distance_km([0.0, 0.0], [0.0, 1.0]);
        // ~111.2 km, within 1%
        assert!((d - 111.2).abs() < 1.112, "got {}", d);
    }

    #[test]
    fn known_city_pair() {
        // Mumbai to Delhi, roughly 1150 km
        let d = distance_km([72.8777, 19.0760], [77.1025, 28.7041]);
        assert!(d > 1100.0 && d < 1200.0, "got {}", d);
    }

    #[test]
    fn point_inside_square() {
        let ring = [[0.0, 0.0], [4.0, 0.0], [4.0, 4.0], [0.0, 4.0]];
        assert!(point_in_polygon([2.0, 2.0], &ring));
    }

    #[test]
    fn point_outside_square() {
        let ring = [[0.0, 0.0], [4.0, 0.0], [4.0, 4.0], [0.0, 4.0]];
        assert!(!point_in_polygon([5.0, 2.0], &ring));
        assert!(!point_in_polygon([-1.0, -1.0], &ring));
    }

    #[test]
    fn concave_ring() {
        // L-shape; the notch is outside
        let ring = [
            [0.0, 0.0],
            [4.0, 0.0],
            [4.0, 2.0],
            [2.0, 2.0],
            [2.0, 4.0],
            [0.0, 4.0],
        ];
        assert!(point_in_polygon([1.0, 3.0], &ring));
        assert!(!point_in_polygon([3.0, 3.0], &ring));
    }

    #[test]
    fn empty_ring_contains_nothing() {
        assert!(!point_in_polygon([0.0, 0.0], &[]));
    }

    #[test]
    fn geo_point_serializes_as_geojson() {
        let point = GeoPoint::new(72.88, 19.07);
        let value = serde_json::to_value(&point).unwrap();
        assert_eq!(value["type"], "Point");
        assert_eq!(value["coordinates"][0], 72.88);
        assert_eq!(value["coordinates"][1], 19.07);
    }
}
