//! Coordinate text codec
//!
//! KML stores geometry as whitespace-separated tuples of comma-separated numbers
//! (`lon,lat[,alt]`). This module converts between that text and [`Coordinate`]
//! values, with a configurable number format for writing.

use crate::{KmlError, Result};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single position: longitude and latitude in decimal degrees, optional altitude
///
/// Altitude is carried through parsing and formatting but never used by the
/// geometric functions.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Coordinate {
    pub lon: f64,
    pub lat: f64,
    pub alt: Option<f64>,
}

impl Coordinate {
    /// Create a 2D coordinate
    #[inline]
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat, alt: None }
    }

    /// Create a coordinate with altitude
    #[inline]
    pub fn with_alt(lon: f64, lat: f64, alt: f64) -> Self {
        Self {
            lon,
            lat,
            alt: Some(alt),
        }
    }
}

impl From<Coordinate> for geo::Coord<f64> {
    #[inline]
    fn from(c: Coordinate) -> Self {
        geo::Coord { x: c.lon, y: c.lat }
    }
}

impl From<(f64, f64)> for Coordinate {
    #[inline]
    fn from((lon, lat): (f64, f64)) -> Self {
        Coordinate::new(lon, lat)
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.alt {
            Some(alt) => write!(f, "{},{},{}", self.lon, self.lat, alt),
            None => write!(f, "{},{}", self.lon, self.lat),
        }
    }
}

/// Number formatting policy for serialized coordinates
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum CoordinateFormat {
    /// Shortest representation that round-trips (`2.0` is written as `2`)
    #[default]
    Shortest,
    /// Rounded to six decimals (~0.1 m), trailing zeros trimmed
    Fixed6,
}

/// Parse KML coordinate text into coordinates
///
/// Empty or whitespace-only text yields an empty list. Any tuple that does not have
/// two or three numeric fields is an [`KmlError::InvalidCoordinate`].
pub fn parse_coordinates(text: &str) -> Result<Vec<Coordinate>> {
    text.split_whitespace().map(parse_tuple).collect()
}

fn parse_tuple(tuple: &str) -> Result<Coordinate> {
    let invalid = |reason: &str| KmlError::InvalidCoordinate {
        text: tuple.to_string(),
        reason: reason.to_string(),
    };

    let mut values = [0.0f64; 3];
    let mut count = 0;
    for field in tuple.split(',') {
        if count == values.len() {
            return Err(invalid("more than three values"));
        }
        values[count] = field
            .trim()
            .parse::<f64>()
            .map_err(|e| invalid(&e.to_string()))?;
        count += 1;
    }

    match count {
        2 => Ok(Coordinate::new(values[0], values[1])),
        3 => Ok(Coordinate::with_alt(values[0], values[1], values[2])),
        _ => Err(invalid("expected lon,lat[,alt]")),
    }
}

/// Format a single number according to the policy
pub fn format_number(value: f64, format: CoordinateFormat) -> String {
    match format {
        CoordinateFormat::Shortest => format!("{value}"),
        CoordinateFormat::Fixed6 => {
            let fixed = format!("{value:.6}");
            let trimmed = fixed.trim_end_matches('0').trim_end_matches('.');
            if trimmed == "-0" {
                "0".to_string()
            } else {
                trimmed.to_string()
            }
        }
    }
}

/// Format coordinates as KML coordinate text
pub fn format_coordinates(coords: &[Coordinate], format: CoordinateFormat) -> String {
    let mut out = String::with_capacity(coords.len() * 24);
    for (i, c) in coords.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        out.push_str(&format_number(c.lon, format));
        out.push(',');
        out.push_str(&format_number(c.lat, format));
        if let Some(alt) = c.alt {
            out.push(',');
            out.push_str(&format_number(alt, format));
        }
    }
    out
}

/// Round every decimal value in coordinate text to six places
///
/// Values written without a decimal point (typically altitudes like `0`) are kept
/// verbatim, so only precision that is actually present gets rewritten.
pub fn optimize_coordinate_text(text: &str) -> Result<String> {
    let mut tuples = Vec::new();
    for tuple in text.split_whitespace() {
        // Validate the tuple shape before rewriting its fields
        parse_tuple(tuple)?;
        let fields: Vec<String> = tuple
            .split(',')
            .map(|field| {
                let field = field.trim();
                if field.contains('.') {
                    // Already validated as a number above
                    field
                        .parse::<f64>()
                        .map(|v| format_number(v, CoordinateFormat::Fixed6))
                        .unwrap_or_else(|_| field.to_string())
                } else {
                    field.to_string()
                }
            })
            .collect();
        tuples.push(fields.join(","));
    }
    Ok(tuples.join(" "))
}
