// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Encoded polyline codec (Google "Polyline Algorithm Format", as used by Strava).
//!
//! Each coordinate is scaled by `10^precision`, rounded, and stored as a
//! zigzag-encoded delta from the previous point, emitted in 5-bit groups
//! (least significant first) with `0x20` as the continuation flag and `63`
//! added to land in printable ASCII.
//!
//! [`decode`] is permissive: truncated or out-of-range input never fails, it
//! just produces whatever numbers fall out of the arithmetic. Callers that
//! want validation use [`decode_strict`].

use geo::LineString;

use crate::models::Coordinate;

/// Precision used by Strava and Google Maps (5 decimal places).
pub const DEFAULT_PRECISION: u32 = 5;

const CHAR_OFFSET: i64 = 63;
const CONTINUATION: i64 = 0x20;
const CHUNK_MASK: i64 = 0x1f;

/// Errors reported by [`decode_strict`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PolylineError {
    #[error("invalid character {ch:?} at position {position}")]
    InvalidCharacter { ch: char, position: usize },

    #[error("truncated value at position {position}")]
    Truncated { position: usize },

    #[error("latitude at position {position} has no matching longitude")]
    MissingLongitude { position: usize },

    #[error("value starting at position {position} overflows 64 bits")]
    Overflow { position: usize },
}

fn factor(precision: u32) -> f64 {
    10f64.powi(precision as i32)
}

/// Decode a polyline at the default precision.
pub fn decode(encoded: &str) -> Vec<Coordinate> {
    decode_with_precision(encoded, DEFAULT_PRECISION)
}

/// Decode a polyline permissively.
///
/// Input is read as UTF-16 code units. Running off the end of the input
/// ends the current value with a zero contribution.
pub fn decode_with_precision(encoded: &str, precision: u32) -> Vec<Coordinate> {
    let units: Vec<u16> = encoded.encode_utf16().collect();
    let factor = factor(precision);
    let mut coordinates = Vec::new();
    let mut index = 0;
    let mut lat: i64 = 0;
    let mut lng: i64 = 0;

    while index < units.len() {
        lat = lat.wrapping_add(next_delta(&units, &mut index));
        lng = lng.wrapping_add(next_delta(&units, &mut index));
        coordinates.push(Coordinate::new(lat as f64 / factor, lng as f64 / factor));
    }

    coordinates
}

fn next_delta(units: &[u16], index: &mut usize) -> i64 {
    let mut result: i64 = 0;
    let mut shift: u32 = 0;

    loop {
        let Some(&unit) = units.get(*index) else {
            break;
        };
        *index += 1;

        let byte = unit as i64 - CHAR_OFFSET;
        result |= (byte & CHUNK_MASK).wrapping_shl(shift);
        shift = shift.wrapping_add(5);

        if byte < CONTINUATION {
            break;
        }
    }

    zigzag_decode(result)
}

fn zigzag_decode(value: i64) -> i64 {
    if value & 1 != 0 {
        !(value >> 1)
    } else {
        value >> 1
    }
}

/// Decode a polyline, rejecting malformed input.
pub fn decode_strict(encoded: &str, precision: u32) -> Result<Vec<Coordinate>, PolylineError> {
    let bytes = encoded.as_bytes();
    let factor = factor(precision);
    let mut coordinates = Vec::new();
    let mut index = 0;
    let mut lat: i64 = 0;
    let mut lng: i64 = 0;

    while index < bytes.len() {
        lat = lat.wrapping_add(next_delta_strict(encoded, &mut index)?);
        if index >= bytes.len() {
            return Err(PolylineError::MissingLongitude { position: index });
        }
        lng = lng.wrapping_add(next_delta_strict(encoded, &mut index)?);
        coordinates.push(Coordinate::new(lat as f64 / factor, lng as f64 / factor));
    }

    Ok(coordinates)
}

fn next_delta_strict(encoded: &str, index: &mut usize) -> Result<i64, PolylineError> {
    let bytes = encoded.as_bytes();
    let start = *index;
    let mut result: u64 = 0;
    let mut shift: u32 = 0;

    loop {
        let Some(&raw) = bytes.get(*index) else {
            return Err(PolylineError::Truncated { position: start });
        };

        if !(b'?'..=b'~').contains(&raw) {
            // Multi-byte UTF-8 must be reported as the whole character.
            let ch = encoded[*index..]
                .chars()
                .next()
                .unwrap_or(char::REPLACEMENT_CHARACTER);
            return Err(PolylineError::InvalidCharacter {
                ch,
                position: *index,
            });
        }
        *index += 1;

        let byte = u64::from(raw) - CHAR_OFFSET as u64;
        let chunk = byte & CHUNK_MASK as u64;
        if shift > 60 || (shift == 60 && chunk > 0xf) {
            return Err(PolylineError::Overflow { position: start });
        }
        result |= chunk << shift;
        shift += 5;

        if byte < CONTINUATION as u64 {
            break;
        }
    }

    Ok(((result >> 1) as i64) ^ -((result & 1) as i64))
}

/// Encode coordinates at the default precision.
pub fn encode(coordinates: &[Coordinate]) -> String {
    encode_with_precision(coordinates, DEFAULT_PRECISION)
}

/// Encode coordinates at `precision` decimal places.
///
/// Values are rounded half away from zero before delta encoding.
pub fn encode_with_precision(coordinates: &[Coordinate], precision: u32) -> String {
    let factor = factor(precision);
    let mut encoded = String::with_capacity(coordinates.len() * 8);
    let mut prev_lat: i64 = 0;
    let mut prev_lng: i64 = 0;

    for c in coordinates {
        let lat = (c.lat * factor).round() as i64;
        let lng = (c.lng * factor).round() as i64;

        encode_value(lat.wrapping_sub(prev_lat), &mut encoded);
        encode_value(lng.wrapping_sub(prev_lng), &mut encoded);

        prev_lat = lat;
        prev_lng = lng;
    }

    encoded
}

fn encode_value(value: i64, out: &mut String) {
    let mut value = if value < 0 {
        !(value << 1) as u64
    } else {
        (value << 1) as u64
    };

    while value >= CONTINUATION as u64 {
        let chunk = (CONTINUATION as u64 | (value & CHUNK_MASK as u64)) + CHAR_OFFSET as u64;
        out.push(char::from(chunk as u8));
        value >>= 5;
    }

    out.push(char::from((value + CHAR_OFFSET as u64) as u8));
}

/// Convert decoded coordinates into a `geo` line string for map consumers.
pub fn to_line_string(coordinates: &[Coordinate]) -> LineString<f64> {
    coordinates.iter().map(|&c| geo::Coord::from(c)).collect()
}
