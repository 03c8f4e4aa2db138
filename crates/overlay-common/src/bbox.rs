//! Geographic bounding box types and query-string formatting.

use serde::{Deserialize, Serialize};

/// Earth radius used by the spherical Web Mercator projection, in meters.
const WEB_MERCATOR_RADIUS: f64 = 6_378_137.0;

/// A geographic bounding box in degrees (EPSG:4326).
///
/// The overlay pipeline always publishes a single fixed extent (CONUS by
/// default); projected variants are derived on demand when a request
/// parameter set asks for them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl BoundingBox {
    /// Create a new bounding box from edge coordinates in degrees.
    pub fn new(west: f64, south: f64, east: f64, north: f64) -> Self {
        Self {
            west,
            south,
            east,
            north,
        }
    }

    /// The default CONUS extent used by the published overlay.
    pub fn conus() -> Self {
        Self::new(-130.0, 20.0, -60.0, 55.0)
    }

    /// Parse a "west,south,east,north" string.
    pub fn from_query_string(s: &str) -> Result<Self, BboxParseError> {
        let parts: Vec<&str> = s.split(',').collect();
        if parts.len() != 4 {
            return Err(BboxParseError::InvalidFormat(s.to_string()));
        }

        let mut values = [0.0_f64; 4];
        for (i, part) in parts.iter().enumerate() {
            values[i] = part
                .trim()
                .parse()
                .map_err(|_| BboxParseError::InvalidNumber(part.to_string()))?;
        }

        Ok(Self::new(values[0], values[1], values[2], values[3]))
    }

    /// Format as "west,south,east,north" (x,y axis order).
    pub fn to_query_string(&self) -> String {
        format!("{},{},{},{}", self.west, self.south, self.east, self.north)
    }

    /// Format as "south,west,north,east" (lat,lon axis order).
    ///
    /// WMS 1.3.0 with EPSG:4326 mandates latitude-first ordering.
    pub fn to_latlon_query_string(&self) -> String {
        format!("{},{},{},{}", self.south, self.west, self.north, self.east)
    }

    /// Project to spherical Web Mercator (EPSG:3857) meters,
    /// formatted "minx,miny,maxx,maxy".
    pub fn to_web_mercator_query_string(&self) -> String {
        let (min_x, min_y) = web_mercator(self.west, self.south);
        let (max_x, max_y) = web_mercator(self.east, self.north);
        format!("{:.2},{:.2},{:.2},{:.2}", min_x, min_y, max_x, max_y)
    }

    /// Width of the box in degrees.
    pub fn width(&self) -> f64 {
        self.east - self.west
    }

    /// Height of the box in degrees.
    pub fn height(&self) -> f64 {
        self.north - self.south
    }

    /// True when edges are ordered and latitudes are projectable.
    pub fn is_valid(&self) -> bool {
        self.west < self.east
            && self.south < self.north
            && self.south > -90.0
            && self.north < 90.0
    }
}

/// Project a lon/lat pair in degrees to Web Mercator meters.
fn web_mercator(lon: f64, lat: f64) -> (f64, f64) {
    let x = lon.to_radians() * WEB_MERCATOR_RADIUS;
    let y = ((lat.to_radians() / 2.0 + std::f64::consts::FRAC_PI_4).tan()).ln()
        * WEB_MERCATOR_RADIUS;
    (x, y)
}

#[derive(Debug, thiserror::Error)]
pub enum BboxParseError {
    #[error("Invalid bbox format: {0}. Expected 'west,south,east,north'")]
    InvalidFormat(String),

    #[error("Invalid number in bbox: {0}")]
    InvalidNumber(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_round_trip() {
        let bbox = BoundingBox::from_query_string("-130,20,-60,55").unwrap();
        assert_eq!(bbox.west, -130.0);
        assert_eq!(bbox.south, 20.0);
        assert_eq!(bbox.east, -60.0);
        assert_eq!(bbox.north, 55.0);
        assert_eq!(bbox.to_query_string(), "-130,20,-60,55");
    }

    #[test]
    fn test_latlon_axis_order() {
        let bbox = BoundingBox::conus();
        assert_eq!(bbox.to_latlon_query_string(), "20,-130,55,-60");
    }

    #[test]
    fn test_web_mercator_projection() {
        let bbox = BoundingBox::new(-180.0, 0.0, 0.0, 0.0);
        let s = bbox.to_web_mercator_query_string();
        let parts: Vec<f64> = s.split(',').map(|p| p.parse().unwrap()).collect();
        // -180 degrees is the negative extreme of the projection.
        assert!((parts[0] + 20_037_508.34).abs() < 1.0);
        assert!(parts[1].abs() < 0.01);
    }

    #[test]
    fn test_validity() {
        assert!(BoundingBox::conus().is_valid());
        assert!(!BoundingBox::new(-60.0, 20.0, -130.0, 55.0).is_valid());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(BoundingBox::from_query_string("1,2,3").is_err());
        assert!(BoundingBox::from_query_string("a,b,c,d").is_err());
    }
}
