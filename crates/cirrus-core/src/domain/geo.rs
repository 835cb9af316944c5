use std::f64::consts::PI;
use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use time::UtcOffset;

use crate::ValidationError;

// Lambert Conformal Conic parameters of the upstream 5 km forecast grid.
const EARTH_RADIUS_KM: f64 = 6371.00877;
const GRID_SPACING_KM: f64 = 5.0;
const STANDARD_LAT_1_DEG: f64 = 30.0;
const STANDARD_LAT_2_DEG: f64 = 60.0;
const ORIGIN_LON_DEG: f64 = 126.0;
const ORIGIN_LAT_DEG: f64 = 38.0;
const ORIGIN_X: f64 = 43.0;
const ORIGIN_Y: f64 = 136.0;

/// One cell of the upstream forecast grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridPoint {
    pub nx: i32,
    pub ny: i32,
}

impl GridPoint {
    pub const fn new(nx: i32, ny: i32) -> Self {
        Self { nx, ny }
    }

    /// Reproject a lat/lon coordinate onto the forecast grid.
    ///
    /// Both fetch forms of a provider must land on the same cell, so the
    /// lat/lon form always goes through this projection first.
    pub fn from_lat_lon(lat: f64, lon: f64) -> Result<Self, ValidationError> {
        if !(-90.0..=90.0).contains(&lat) {
            return Err(ValidationError::LatitudeOutOfRange { value: lat });
        }
        if !(-180.0..=180.0).contains(&lon) {
            return Err(ValidationError::LongitudeOutOfRange { value: lon });
        }

        let deg_to_rad = PI / 180.0;
        let re = EARTH_RADIUS_KM / GRID_SPACING_KM;
        let slat1 = STANDARD_LAT_1_DEG * deg_to_rad;
        let slat2 = STANDARD_LAT_2_DEG * deg_to_rad;
        let olon = ORIGIN_LON_DEG * deg_to_rad;
        let olat = ORIGIN_LAT_DEG * deg_to_rad;

        let sn = ((slat1.cos() / slat2.cos()).ln())
            / (((PI * 0.25 + slat2 * 0.5).tan() / (PI * 0.25 + slat1 * 0.5).tan()).ln());
        let sf = (PI * 0.25 + slat1 * 0.5).tan().powf(sn) * slat1.cos() / sn;
        let ro = re * sf / (PI * 0.25 + olat * 0.5).tan().powf(sn);

        let ra = re * sf / (PI * 0.25 + lat * deg_to_rad * 0.5).tan().powf(sn);
        let mut theta = lon * deg_to_rad - olon;
        if theta > PI {
            theta -= 2.0 * PI;
        }
        if theta < -PI {
            theta += 2.0 * PI;
        }
        theta *= sn;

        let nx = (ra * theta.sin() + ORIGIN_X + 0.5).floor() as i32;
        let ny = (ro - ra * theta.cos() + ORIGIN_Y + 0.5).floor() as i32;
        Ok(Self { nx, ny })
    }

    /// Inverse projection: the cell center's approximate lat/lon.
    ///
    /// Used by lat/lon-native upstreams to serve the grid fetch form.
    pub fn to_lat_lon(self) -> (f64, f64) {
        let deg_to_rad = PI / 180.0;
        let rad_to_deg = 180.0 / PI;
        let re = EARTH_RADIUS_KM / GRID_SPACING_KM;
        let slat1 = STANDARD_LAT_1_DEG * deg_to_rad;
        let slat2 = STANDARD_LAT_2_DEG * deg_to_rad;
        let olon = ORIGIN_LON_DEG * deg_to_rad;
        let olat = ORIGIN_LAT_DEG * deg_to_rad;

        let sn = ((slat1.cos() / slat2.cos()).ln())
            / (((PI * 0.25 + slat2 * 0.5).tan() / (PI * 0.25 + slat1 * 0.5).tan()).ln());
        let sf = (PI * 0.25 + slat1 * 0.5).tan().powf(sn) * slat1.cos() / sn;
        let ro = re * sf / (PI * 0.25 + olat * 0.5).tan().powf(sn);

        let xn = f64::from(self.nx) - ORIGIN_X;
        let yn = ro - f64::from(self.ny) + ORIGIN_Y;
        let ra = (xn * xn + yn * yn).sqrt();
        let alat = 2.0 * (re * sf / ra).powf(1.0 / sn).atan() - PI * 0.5;
        let theta = if yn.abs() <= f64::EPSILON {
            if xn < 0.0 {
                -PI * 0.5
            } else {
                PI * 0.5
            }
        } else {
            xn.atan2(yn)
        };
        let alon = theta / sn + olon;

        (alat * rad_to_deg, alon * rad_to_deg)
    }
}

impl Display for GridPoint {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "({},{})", self.nx, self.ny)
    }
}

/// A place forecasts are reconciled for.
///
/// `utc_offset` is the location's civil time zone offset; slot dates and
/// calendar-day grouping are always expressed in that zone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub id: i64,
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    pub grid: GridPoint,
    pub utc_offset: UtcOffset,
}

impl Location {
    pub fn new(
        id: i64,
        name: impl Into<String>,
        lat: f64,
        lon: f64,
        utc_offset: UtcOffset,
    ) -> Result<Self, ValidationError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ValidationError::EmptyLocationName);
        }
        let grid = GridPoint::from_lat_lon(lat, lon)?;
        Ok(Self {
            id,
            name,
            lat,
            lon,
            grid,
            utc_offset,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seoul_city_hall_lands_on_the_reference_cell() {
        let grid = GridPoint::from_lat_lon(37.5665, 126.9780).expect("valid coordinate");
        assert_eq!(grid, GridPoint::new(60, 127));
    }

    #[test]
    fn projection_round_trips_through_the_cell_center() {
        let grid = GridPoint::new(60, 127);
        let (lat, lon) = grid.to_lat_lon();
        assert_eq!(GridPoint::from_lat_lon(lat, lon).expect("in range"), grid);
    }

    #[test]
    fn out_of_range_latitude_is_rejected() {
        let error = GridPoint::from_lat_lon(91.0, 126.9780).expect_err("must reject");
        assert_eq!(error, ValidationError::LatitudeOutOfRange { value: 91.0 });
    }

    #[test]
    fn location_requires_a_name() {
        let error = Location::new(1, "  ", 37.5, 127.0, UtcOffset::UTC).expect_err("must reject");
        assert_eq!(error, ValidationError::EmptyLocationName);
    }
}
