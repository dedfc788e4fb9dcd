//! Geographic query construction for the RCN WFS service.

use anyhow::Result;
use reqwest::Url;

use crate::config::{Coordinates, ReferenceData};
use crate::error::QueryError;

/// Kilometres per degree of latitude (and of longitude at the equator).
const KM_PER_DEGREE: f64 = 111.0;

pub const FEATURE_TYPE: &str = "ms:lokale";
pub const OUTPUT_FORMAT: &str = "application/gml+xml; version=3.2";
pub const SORT_BY: &str = "dok_data D";
pub const CRS: &str = "EPSG:4326";

/// Search rectangle in WGS84 degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub lat_min: f64,
    pub lon_min: f64,
    pub lat_max: f64,
    pub lon_max: f64,
}

impl BoundingBox {
    /// Square-ish box of `radius_km` around `center`, with longitude span
    /// scaled by the cosine of the center latitude.
    pub fn around(center: Coordinates, radius_km: f64) -> Self {
        let dlat = radius_km / KM_PER_DEGREE;
        let dlon = radius_km / (KM_PER_DEGREE * center.lat.to_radians().cos());
        Self {
            lat_min: center.lat - dlat,
            lon_min: center.lon - dlon,
            lat_max: center.lat + dlat,
            lon_max: center.lon + dlon,
        }
    }

    /// True if `point` lies strictly inside the box.
    pub fn contains(&self, point: Coordinates) -> bool {
        point.lat > self.lat_min
            && point.lat < self.lat_max
            && point.lon > self.lon_min
            && point.lon < self.lon_max
    }

    /// `latMin,lonMin,latMax,lonMax,EPSG:4326`, the WFS 2.0 axis order for
    /// EPSG:4326.
    pub fn to_wfs_param(&self) -> String {
        format!(
            "{},{},{},{},{}",
            self.lat_min, self.lon_min, self.lat_max, self.lon_max, CRS
        )
    }
}

/// Computes the search box around a known city center.
///
/// # Errors
///
/// Returns [`QueryError::UnknownCity`] if `city` is not in `reference`.
pub fn compute_bounding_box(
    reference: &ReferenceData,
    city: &str,
    radius_km: f64,
) -> Result<BoundingBox, QueryError> {
    let center = reference
        .center(city)
        .ok_or_else(|| QueryError::UnknownCity(city.to_string()))?;
    Ok(BoundingBox::around(center, radius_km))
}

/// A single-page `GetFeature` request. Anything past `max_records` is not
/// retrievable; there is no paging.
#[derive(Debug, Clone, PartialEq)]
pub struct WfsQuery {
    pub bbox: BoundingBox,
    pub max_records: u32,
}

impl WfsQuery {
    pub fn new(bbox: BoundingBox, max_records: u32) -> Self {
        Self { bbox, max_records }
    }

    pub fn build_request_parameters(&self) -> Vec<(&'static str, String)> {
        vec![
            ("service", "WFS".to_string()),
            ("version", "2.0.0".to_string()),
            ("request", "GetFeature".to_string()),
            ("typeName", FEATURE_TYPE.to_string()),
            ("count", self.max_records.to_string()),
            ("bbox", self.bbox.to_wfs_param()),
            ("outputFormat", OUTPUT_FORMAT.to_string()),
            ("sortBy", SORT_BY.to_string()),
        ]
    }

    /// Full request URL with the parameters form-encoded onto `base`.
    pub fn url(&self, base: &str) -> Result<Url> {
        Ok(Url::parse_with_params(
            base,
            self.build_request_parameters(),
        )?)
    }
}
