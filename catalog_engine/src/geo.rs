//! Geohash cell decoding and great-circle distance.
//!
//! A cell is reduced to its centroid, so containment checks are only as
//! precise as the cell itself (about 4.77 m square for 9 characters).

use crate::GeoError;

const BASE32: &[u8; 32] = b"0123456789bcdefghjkmnpqrstuvwxyz";

pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, Copy)]
struct Range {
    min: f64,
    max: f64,
}

impl Range {
    fn refine(&mut self, upper: bool) {
        let mid = (self.min + self.max) / 2.0;
        if upper {
            self.min = mid;
        } else {
            self.max = mid;
        }
    }

    fn mid(&self) -> f64 {
        (self.min + self.max) / 2.0
    }
}

/// Decodes a geohash into the centroid of its bounding box.
pub fn decode(geohash: &str) -> Result<Coordinates, GeoError> {
    let mut lat = Range { min: -90.0, max: 90.0 };
    let mut lon = Range { min: -180.0, max: 180.0 };
    let mut even = true;

    for ch in geohash.chars() {
        let index = BASE32
            .iter()
            .position(|&b| ch.is_ascii() && b == ch as u8)
            .ok_or(GeoError::InvalidGeohash(ch))?;

        for shift in (0..5).rev() {
            let bit = (index >> shift) & 1 == 1;
            if even {
                lon.refine(bit);
            } else {
                lat.refine(bit);
            }
            even = !even;
        }
    }

    Ok(Coordinates {
        latitude: lat.mid(),
        longitude: lon.mid(),
    })
}

/// Haversine distance in meters on a spherical Earth.
pub fn distance_meters(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let delta_phi = (lat2 - lat1).to_radians();
    let delta_lambda = (lon2 - lon1).to_radians();

    let a = (delta_phi / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (delta_lambda / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_METERS * c
}

/// Whether the centroid of `geohash` lies within `radius_meters` of the point.
///
/// An undecodable geohash is reported as outside.
pub fn is_within_radius(geohash: &str, latitude: f64, longitude: f64, radius_meters: f64) -> bool {
    match decode(geohash) {
        Ok(center) => {
            distance_meters(latitude, longitude, center.latitude, center.longitude) <= radius_meters
        }
        Err(err) => {
            tracing::debug!("treating geohash {:?} as outside: {}", geohash, err);
            false
        }
    }
}
