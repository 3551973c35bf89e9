//! Geographic codecs: a point is `"lat lon [alt [accuracy]]"`, traces and
//! shapes are `;`-separated point lists.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::{ValueCodec, ValueType};

/// A WGS84 coordinate with optional altitude (m) and accuracy (m).
///
/// The instance format places accuracy after altitude, so a point with an
/// accuracy always carries an altitude (0 when none was measured).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "GeopointRepr")]
pub struct Geopoint {
    pub latitude: f64,
    pub longitude: f64,
    altitude: Option<f64>,
    accuracy: Option<f64>,
}

#[derive(Deserialize)]
struct GeopointRepr {
    latitude: f64,
    longitude: f64,
    #[serde(default)]
    altitude: Option<f64>,
    #[serde(default)]
    accuracy: Option<f64>,
}

impl From<GeopointRepr> for Geopoint {
    fn from(repr: GeopointRepr) -> Self {
        let mut point = Geopoint::new(repr.latitude, repr.longitude);
        if let Some(altitude) = repr.altitude {
            point = point.with_altitude(altitude);
        }
        if let Some(accuracy) = repr.accuracy {
            point = point.with_accuracy(accuracy);
        }
        point
    }
}

impl Geopoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            altitude: None,
            accuracy: None,
        }
    }

    pub fn with_altitude(mut self, altitude: f64) -> Self {
        self.altitude = Some(altitude);
        self
    }

    /// Set the accuracy. A point without an altitude gets altitude 0.
    pub fn with_accuracy(mut self, accuracy: f64) -> Self {
        self.altitude.get_or_insert(0.0);
        self.accuracy = Some(accuracy);
        self
    }

    pub fn altitude(&self) -> Option<f64> {
        self.altitude
    }

    pub fn accuracy(&self) -> Option<f64> {
        self.accuracy
    }

    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
            && self.altitude.map_or(true, f64::is_finite)
            && self.accuracy.map_or(true, |accuracy| accuracy.is_finite() && accuracy >= 0.0)
    }

    fn same_location(&self, other: &Geopoint) -> bool {
        self.latitude == other.latitude && self.longitude == other.longitude
    }
}

impl fmt::Display for Geopoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.latitude, self.longitude)?;
        if let Some(altitude) = self.altitude {
            write!(f, " {altitude}")?;
        }
        if let Some(accuracy) = self.accuracy {
            write!(f, " {accuracy}")?;
        }
        Ok(())
    }
}

fn parse_point(value: &str) -> Option<Geopoint> {
    let parts: Vec<f64> = value
        .split_whitespace()
        .map(|part| part.parse::<f64>().ok().filter(|part| part.is_finite()))
        .collect::<Option<_>>()?;

    let point = match parts.as_slice() {
        [latitude, longitude] => Geopoint::new(*latitude, *longitude),
        [latitude, longitude, altitude] => {
            Geopoint::new(*latitude, *longitude).with_altitude(*altitude)
        }
        [latitude, longitude, altitude, accuracy] => Geopoint::new(*latitude, *longitude)
            .with_altitude(*altitude)
            .with_accuracy(*accuracy),
        _ => return None,
    };
    point.is_valid().then_some(point)
}

fn parse_points(value: &str) -> Option<Vec<Geopoint>> {
    value
        .split(';')
        .map(str::trim)
        .filter(|point| !point.is_empty())
        .map(parse_point)
        .collect()
}

fn encode_points(points: &Option<Vec<Geopoint>>) -> String {
    points
        .as_ref()
        .map(|points| {
            points
                .iter()
                .map(Geopoint::to_string)
                .collect::<Vec<_>>()
                .join("; ")
        })
        .unwrap_or_default()
}

#[derive(Debug, Clone, Copy, Default)]
pub struct GeopointCodec;

impl ValueCodec for GeopointCodec {
    type Runtime = Option<Geopoint>;

    fn value_type(&self) -> ValueType {
        ValueType::Geopoint
    }

    fn encode(&self, value: &Option<Geopoint>) -> String {
        value.map(|point| point.to_string()).unwrap_or_default()
    }

    fn decode(&self, value: &str) -> Option<Geopoint> {
        parse_point(value)
    }
}

/// An open path of at least two points.
#[derive(Debug, Clone, Copy, Default)]
pub struct GeotraceCodec;

impl ValueCodec for GeotraceCodec {
    type Runtime = Option<Vec<Geopoint>>;

    fn value_type(&self) -> ValueType {
        ValueType::Geotrace
    }

    fn encode(&self, value: &Option<Vec<Geopoint>>) -> String {
        encode_points(value)
    }

    fn decode(&self, value: &str) -> Option<Vec<Geopoint>> {
        parse_points(value).filter(|points| points.len() >= 2)
    }
}

/// A closed ring: at least four points, the last repeating the first.
#[derive(Debug, Clone, Copy, Default)]
pub struct GeoshapeCodec;

impl ValueCodec for GeoshapeCodec {
    type Runtime = Option<Vec<Geopoint>>;

    fn value_type(&self) -> ValueType {
        ValueType::Geoshape
    }

    fn encode(&self, value: &Option<Vec<Geopoint>>) -> String {
        encode_points(value)
    }

    fn decode(&self, value: &str) -> Option<Vec<Geopoint>> {
        parse_points(value).filter(|points| {
            points.len() >= 4
                && points
                    .first()
                    .zip(points.last())
                    .is_some_and(|(first, last)| first.same_location(last))
        })
    }
}
