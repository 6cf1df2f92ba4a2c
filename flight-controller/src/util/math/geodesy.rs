use libm::{atan2, cos, sin, sqrt};

/// Equatorial radius in kilometres.
pub const EARTH_RADIUS_KM: f64 = 6378.137;

/// GPS fix in degrees and metres as delivered by the receiver.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct GpsLocation {
    pub is_valid: bool,
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
}

impl GpsLocation {
    pub const fn invalid() -> Self {
        Self {
            is_valid: false,
            latitude: 0.0,
            longitude: 0.0,
            altitude: 0.0,
        }
    }

    pub const fn new(latitude: f64, longitude: f64, altitude: f64) -> Self {
        Self {
            is_valid: true,
            latitude,
            longitude,
            altitude,
        }
    }
}

/// Great circle distance in metres (haversine), altitude is not considered.
///
/// Reports 0 when either fix is invalid.
pub fn haversine_distance_m(base: &GpsLocation, current: &GpsLocation) -> f64 {
    if !base.is_valid || !current.is_valid {
        return 0.0;
    }

    let lat_1 = base.latitude.to_radians();
    let lat_2 = current.latitude.to_radians();
    let lat_diff = lat_2 - lat_1;
    let long_diff = (current.longitude - base.longitude).to_radians();

    let sin_lat = sin(lat_diff / 2.0);
    let sin_long = sin(long_diff / 2.0);
    let a = sin_lat * sin_lat + cos(lat_1) * cos(lat_2) * sin_long * sin_long;
    let c = 2.0 * atan2(sqrt(a), sqrt(1.0 - a));

    EARTH_RADIUS_KM * c * 1000.0
}

/// Latitude shift in degrees that moves `distance_m` due north.
pub fn latitude_offset_deg(distance_m: f64) -> f64 {
    (distance_m / (EARTH_RADIUS_KM * 1000.0)).to_degrees()
}
