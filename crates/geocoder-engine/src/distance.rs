//! Great-circle distance between two resolved places.

use geocoder_common::{GeoResult, GeocoderError, NormalizedQuery, Result};
use serde::{Deserialize, Serialize};

use crate::formatter::ActionResponse;
use crate::orchestrator::Resolver;

/// Mean Earth radius in kilometres.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

pub const MILES_PER_KM: f64 = 0.621371;

const STRAIGHT_LINE_NOTE: &str =
    "This is the straight-line (as the crow flies) distance, not driving distance";

const UNRESOLVED_NOTE: &str =
    "Distance not calculated because one or both places could not be geocoded";

/// 8-point compass direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CardinalDirection {
    N,
    NE,
    E,
    SE,
    S,
    SW,
    W,
    NW,
}

impl CardinalDirection {
    const CLOCKWISE: [CardinalDirection; 8] = [
        Self::N,
        Self::NE,
        Self::E,
        Self::SE,
        Self::S,
        Self::SW,
        Self::W,
        Self::NW,
    ];

    /// Nearest compass point to `bearing` degrees (clockwise from north).
    pub fn from_bearing(bearing: f64) -> Self {
        let index = (bearing.rem_euclid(360.0) / 45.0).round() as usize % 8;
        Self::CLOCKWISE[index]
    }
}

/// Distance and heading from one point to another.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Distance {
    pub distance_km: f64,
    pub distance_miles: f64,
    pub straight_line: bool,
    /// Initial bearing in [0, 360)
    pub bearing_degrees: f64,
    pub direction: CardinalDirection,
    pub note: String,
}

impl Distance {
    /// Computes the haversine distance and initial bearing from `from` to `to`.
    ///
    /// Kilometres, miles and bearing are rounded to two decimals.
    pub fn between(from: &GeoResult, to: &GeoResult) -> Self {
        let km = haversine_km(from.latitude, from.longitude, to.latitude, to.longitude);
        let bearing = initial_bearing(from.latitude, from.longitude, to.latitude, to.longitude);

        // Rounding can push 359.996 up to a full turn.
        let mut bearing_degrees = round2(bearing);
        if bearing_degrees >= 360.0 {
            bearing_degrees = 0.0;
        }

        Self {
            distance_km: round2(km),
            distance_miles: round2(km * MILES_PER_KM),
            straight_line: true,
            bearing_degrees,
            direction: CardinalDirection::from_bearing(bearing),
            note: STRAIGHT_LINE_NOTE.to_string(),
        }
    }
}

/// Human-readable endpoints of a computed distance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TravelContext {
    pub from: String,
    pub to: String,
    pub summary: String,
}

impl TravelContext {
    fn between(from: &GeoResult, to: &GeoResult) -> Self {
        let country = |r: &GeoResult| r.country.clone().unwrap_or_else(|| "Unknown".to_string());
        Self {
            from: from.matched_name.clone(),
            to: to.matched_name.clone(),
            summary: format!("From {} to {}", country(from), country(to)),
        }
    }
}

/// Both resolutions, plus the distance when both were found.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistanceResponse {
    pub source: ActionResponse,
    pub destination: ActionResponse,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance: Option<Distance>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub travel_context: Option<TravelContext>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl DistanceResponse {
    pub fn new(source: ActionResponse, destination: ActionResponse) -> Self {
        match (&source, &destination) {
            (ActionResponse::Found(from), ActionResponse::Found(to)) => Self {
                distance: Some(Distance::between(from, to)),
                travel_context: Some(TravelContext::between(from, to)),
                note: None,
                source,
                destination,
            },
            _ => Self {
                source,
                destination,
                distance: None,
                travel_context: None,
                note: Some(UNRESOLVED_NOTE.to_string()),
            },
        }
    }

    /// 400 when either side was rejected as invalid, 200 otherwise.
    pub fn http_status(&self) -> u16 {
        if self.source.http_status() == 400 || self.destination.http_status() == 400 {
            400
        } else {
            200
        }
    }
}

/// Resolves both place names and measures between them.
///
/// The sides are resolved one after the other. The second lookup may wait
/// for a rate limit slot (see [`Resolver::follow_up_mode`]), so a keyless
/// provider pinned at one request per second still answers both.
///
/// # Returns
/// - `Ok(response)` - both sides were looked up; `distance` is set only when
///   both were found
/// - `Err(GeocoderError::Validation)` - either name is empty
pub async fn resolve_distance(resolver: &Resolver, from: &str, to: &str) -> Result<DistanceResponse> {
    // Reject a bad destination before spending a lookup on the source.
    NormalizedQuery::parse(to).map_err(|e| side_error("destination", e))?;

    let source = resolver
        .resolve(from)
        .await
        .map_err(|e| side_error("source", e))?;
    let destination = resolver
        .resolve_with_mode(to, resolver.follow_up_mode())
        .await
        .map_err(|e| side_error("destination", e))?;

    Ok(DistanceResponse::new(
        ActionResponse::from_outcome(&source.outcome),
        ActionResponse::from_outcome(&destination.outcome),
    ))
}

fn side_error(side: &str, error: GeocoderError) -> GeocoderError {
    match error {
        GeocoderError::Validation(detail) => {
            GeocoderError::Validation(format!("{} place: {}", side, detail))
        }
        other => other,
    }
}

/// Great-circle distance in kilometres.
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let (lat1, lat2) = (lat1.to_radians(), lat2.to_radians());
    let dlat = lat2 - lat1;
    let dlon = (lon2 - lon1).to_radians();

    let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_KM * c
}

/// Initial bearing in degrees, normalized to [0, 360).
pub fn initial_bearing(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let (lat1, lat2) = (lat1.to_radians(), lat2.to_radians());
    let dlon = (lon2 - lon1).to_radians();

    let y = dlon.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * dlon.cos();
    y.atan2(x).to_degrees().rem_euclid(360.0)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn place(lat: f64, lon: f64, name: &str) -> GeoResult {
        GeoResult::new(lat, lon, name).unwrap()
    }

    #[test]
    fn test_london_to_paris() {
        let london = place(51.5074, -0.1278, "London");
        let paris = place(48.8566, 2.3522, "Paris");

        let distance = Distance::between(&london, &paris);
        assert!((distance.distance_km - 343.56).abs() < 1.0, "{}", distance.distance_km);
        assert!((distance.distance_miles - distance.distance_km * MILES_PER_KM).abs() < 0.01);
        assert_eq!(distance.direction, CardinalDirection::SE);
        assert!(distance.straight_line);
    }

    #[test]
    fn test_same_point_is_zero() {
        let tokyo = place(35.6762, 139.6503, "Tokyo");
        let distance = Distance::between(&tokyo, &tokyo);

        assert_eq!(distance.distance_km, 0.0);
        assert_eq!(distance.distance_miles, 0.0);
    }

    #[test]
    fn test_antipodes_are_half_circumference() {
        let km = haversine_km(0.0, 0.0, 0.0, 180.0);
        assert!((km - std::f64::consts::PI * EARTH_RADIUS_KM).abs() < 1e-6);
    }

    #[test]
    fn test_bearings_along_axes() {
        assert!((initial_bearing(0.0, 0.0, 10.0, 0.0) - 0.0).abs() < 1e-9);
        assert!((initial_bearing(0.0, 0.0, 0.0, 10.0) - 90.0).abs() < 1e-9);
        assert!((initial_bearing(10.0, 0.0, 0.0, 0.0) - 180.0).abs() < 1e-9);
        assert!((initial_bearing(0.0, 10.0, 0.0, 0.0) - 270.0).abs() < 1e-9);
    }

    #[test]
    fn test_cardinal_direction_boundaries() {
        assert_eq!(CardinalDirection::from_bearing(0.0), CardinalDirection::N);
        assert_eq!(CardinalDirection::from_bearing(22.4), CardinalDirection::N);
        assert_eq!(CardinalDirection::from_bearing(22.6), CardinalDirection::NE);
        assert_eq!(CardinalDirection::from_bearing(180.0), CardinalDirection::S);
        assert_eq!(CardinalDirection::from_bearing(300.0), CardinalDirection::NW);
        assert_eq!(CardinalDirection::from_bearing(350.0), CardinalDirection::N);
    }

    #[test]
    fn test_unresolved_side_has_note_and_no_distance() {
        let response = DistanceResponse::new(
            ActionResponse::Found(place(35.6762, 139.6503, "Tokyo")),
            ActionResponse::not_found(),
        );

        assert!(response.distance.is_none());
        assert!(response.travel_context.is_none());
        assert_eq!(response.note.as_deref(), Some(UNRESOLVED_NOTE));
        assert_eq!(response.http_status(), 200);
    }

    #[test]
    fn test_travel_context_uses_countries() {
        let from = place(35.6762, 139.6503, "Tokyo, Japan")
            .with_country(Some("Japan".into()), Some("jp".into()));
        let to = place(37.5665, 126.9780, "Seoul");

        let response = DistanceResponse::new(ActionResponse::Found(from), ActionResponse::Found(to));
        let context = response.travel_context.unwrap();
        assert_eq!(context.summary, "From Japan to Unknown");
        assert_eq!(context.from, "Tokyo, Japan");
        assert!(response.distance.is_some());
    }

    #[test]
    fn test_serialized_shape() {
        let response = DistanceResponse::new(
            ActionResponse::Found(place(0.0, 0.0, "A")),
            ActionResponse::Found(place(0.0, 1.0, "B")),
        );
        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(json["distance"]["direction"], "E");
        assert_eq!(json["distance"]["straightLine"], true);
        assert!(json["distance"]["distanceKm"].as_f64().unwrap() > 111.0);
        assert!(json.get("note").is_none());
        assert_eq!(json["source"]["matchedName"], "A");
    }
}
