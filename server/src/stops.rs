//! Static catalog of bus stops.
//!
//! The catalog is reference data: loaded once at process start, shared
//! read-only by the HTTP surface and the location simulator. The reference
//! deployment ships the 15 major Punjab bus stands.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// A named geographic stop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stop {
    /// Catalog identity, stable across restarts.
    pub id: u32,

    /// Display name, e.g. "Amritsar Bus Stand".
    pub name: String,

    /// Latitude in decimal degrees.
    pub lat: f64,

    /// Longitude in decimal degrees.
    pub lng: f64,

    /// City label for grouping in clients.
    pub city: String,
}

/// Raw catalog rows: (id, name, lat, lng, city).
const PUNJAB_STOPS: &[(u32, &str, f64, f64, &str)] = &[
    (1, "Amritsar Bus Stand", 31.6340, 74.8723, "Amritsar"),
    (2, "Ludhiana Bus Terminal", 30.9010, 75.8573, "Ludhiana"),
    (3, "Jalandhar Bus Stand", 31.3260, 75.5762, "Jalandhar"),
    (4, "Patiala Bus Terminal", 30.3398, 76.3869, "Patiala"),
    (5, "Bathinda Bus Stand", 30.2115, 74.9455, "Bathinda"),
    (6, "Mohali Bus Terminal", 30.7046, 76.7179, "Mohali"),
    (7, "Firozpur Bus Stand", 30.9251, 74.6107, "Firozpur"),
    (8, "Batala Bus Terminal", 31.8188, 75.2028, "Batala"),
    (9, "Moga Bus Stand", 30.8138, 75.1688, "Moga"),
    (10, "Abohar Bus Terminal", 30.1445, 74.1995, "Abohar"),
    (11, "Malerkotla Bus Stand", 30.5309, 75.8805, "Malerkotla"),
    (12, "Khanna Bus Terminal", 30.7046, 76.2201, "Khanna"),
    (13, "Phagwara Bus Stand", 31.2240, 75.7708, "Phagwara"),
    (14, "Muktsar Bus Terminal", 30.4745, 74.5160, "Muktsar"),
    (15, "Barnala Bus Stand", 30.3745, 75.5487, "Barnala"),
];

/// Builds the stop catalog.
///
/// Called once at startup; consumers share the returned `Arc`.
#[must_use]
pub fn stop_catalog() -> Arc<Vec<Stop>> {
    Arc::new(
        PUNJAB_STOPS
            .iter()
            .map(|&(id, name, lat, lng, city)| Stop {
                id,
                name: name.to_string(),
                lat,
                lng,
                city: city.to_string(),
            })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_has_fifteen_stops() {
        assert_eq!(stop_catalog().len(), 15);
    }

    #[test]
    fn ids_are_sequential_and_unique() {
        let catalog = stop_catalog();
        for (index, stop) in catalog.iter().enumerate() {
            assert_eq!(stop.id as usize, index + 1);
        }
    }

    #[test]
    fn coordinates_are_within_punjab() {
        for stop in stop_catalog().iter() {
            assert!(stop.lat > 29.0 && stop.lat < 33.0, "{}", stop.name);
            assert!(stop.lng > 73.0 && stop.lng < 78.0, "{}", stop.name);
        }
    }

    #[test]
    fn stop_serializes_with_flat_fields() {
        let stop = stop_catalog()[0].clone();
        let json = serde_json::to_value(&stop).unwrap();

        assert_eq!(json["id"], 1);
        assert_eq!(json["name"], "Amritsar Bus Stand");
        assert_eq!(json["city"], "Amritsar");
        assert!(json["lat"].is_f64());
        assert!(json["lng"].is_f64());
    }

    #[test]
    fn stop_round_trips_through_json() {
        let stop = stop_catalog()[4].clone();
        let json = serde_json::to_string(&stop).unwrap();
        let back: Stop = serde_json::from_str(&json).unwrap();
        assert_eq!(stop, back);
    }
}
