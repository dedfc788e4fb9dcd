use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Built-in city table: name, center latitude, center longitude, NBP
/// primary-market and secondary-market price per m² (PLN).
static BUILTIN_CITIES: &[(&str, f64, f64, u32, u32)] = &[
    ("Gdańsk", 54.372, 18.638, 14200, 13100),
    ("Sopot", 54.441, 18.560, 18500, 16800),
    ("Gdynia", 54.519, 18.531, 13800, 12200),
    ("Warszawa", 52.230, 21.012, 16300, 16400),
    ("Kraków", 50.065, 19.945, 15100, 14600),
    ("Wrocław", 51.110, 17.038, 13900, 12800),
    ("Poznań", 52.407, 16.930, 12600, 11200),
    ("Łódź", 51.760, 19.456, 10100, 8200),
    ("Szczecin", 53.429, 14.553, 11800, 9900),
    ("Lublin", 51.246, 22.568, 10500, 9200),
];

const BUILTIN_QUARTER: &str = "Q3 2025";

/// A WGS84 point in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

/// NBP average transaction price per m² for one quarter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferencePrice {
    pub primary: u32,
    pub secondary: u32,
    pub quarter: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CityReference {
    pub name: String,
    pub center: Coordinates,
    #[serde(default)]
    pub nbp: Option<ReferencePrice>,
}

/// The set of cities a query may target.
///
/// Stored on disk as a JSON array:
/// ```json
/// [
///   { "name": "Gdańsk", "center": { "lat": 54.372, "lon": 18.638 },
///     "nbp": { "primary": 14200, "secondary": 13100, "quarter": "Q3 2025" } }
/// ]
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceData {
    cities: Vec<CityReference>,
}

impl ReferenceData {
    pub fn builtin() -> Self {
        let cities = BUILTIN_CITIES
            .iter()
            .map(|&(name, lat, lon, primary, secondary)| CityReference {
                name: name.to_string(),
                center: Coordinates { lat, lon },
                nbp: Some(ReferencePrice {
                    primary,
                    secondary,
                    quarter: BUILTIN_QUARTER.to_string(),
                }),
            })
            .collect();
        Self { cities }
    }

    /// Loads the table from a JSON file at `path`.
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read reference data from '{path}'"))?;
        Self::from_json(&content).with_context(|| format!("invalid reference data in '{path}'"))
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let cities: Vec<CityReference> = serde_json::from_str(content)?;
        if cities.is_empty() {
            anyhow::bail!("reference data contains no cities");
        }
        for city in &cities {
            validate_name(&city.name)?;
        }
        Ok(Self { cities })
    }

    /// Exact, case-sensitive lookup by city name.
    pub fn get(&self, city: &str) -> Option<&CityReference> {
        self.cities.iter().find(|c| c.name == city)
    }

    pub fn center(&self, city: &str) -> Option<Coordinates> {
        self.get(city).map(|c| c.center)
    }

    pub fn reference_price(&self, city: &str) -> Option<&ReferencePrice> {
        self.get(city).and_then(|c| c.nbp.as_ref())
    }

    pub fn contains(&self, city: &str) -> bool {
        self.get(city).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CityReference> {
        self.cities.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.cities.iter().map(|c| c.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.cities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cities.is_empty()
    }
}

impl Default for ReferenceData {
    fn default() -> Self {
        Self::builtin()
    }
}

/// City names double as report file names, so they must be a single plain
/// path component.
fn validate_name(name: &str) -> Result<()> {
    let trimmed = name.trim();
    if trimmed.is_empty()
        || trimmed == "."
        || trimmed == ".."
        || name.contains(['/', '\\', '\0'])
    {
        anyhow::bail!("invalid city name: {name:?}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_has_ten_cities() {
        let data = ReferenceData::builtin();
        assert_eq!(data.len(), 10);
        assert!(data.contains("Gdańsk"));
        assert!(data.contains("Łódź"));
        assert!(!data.contains("gdańsk"));
        assert!(!data.contains("Berlin"));
    }

    #[test]
    fn test_builtin_lookup() {
        let data = ReferenceData::builtin();
        let center = data.center("Warszawa").unwrap();
        assert_eq!(center, Coordinates { lat: 52.230, lon: 21.012 });

        let nbp = data.reference_price("Łódź").unwrap();
        assert_eq!(nbp.primary, 10100);
        assert_eq!(nbp.secondary, 8200);
        assert_eq!(nbp.quarter, "Q3 2025");
    }

    #[test]
    fn test_from_json() {
        let data = ReferenceData::from_json(
            r#"[{ "name": "Toruń", "center": { "lat": 53.01, "lon": 18.6 } }]"#,
        )
        .unwrap();
        assert_eq!(data.names().collect::<Vec<_>>(), vec!["Toruń"]);
        assert!(data.reference_price("Toruń").is_none());
    }

    #[test]
    fn test_from_json_rejects_empty_table() {
        assert!(ReferenceData::from_json("[]").is_err());
        assert!(ReferenceData::from_json("{").is_err());
    }

    #[test]
    fn test_from_json_rejects_path_like_names() {
        let table = |name: &str| {
            format!(
                r#"[{{"name": {}, "center": {{"lat": 54.0, "lon": 18.0}}}}]"#,
                serde_json::json!(name)
            )
        };

        for name in ["../../etc/cron.d/x", "a/b", r"a\b", "..", ".", "", "  ", "Gda\0ńsk"] {
            let err = ReferenceData::from_json(&table(name)).unwrap_err();
            assert!(err.to_string().contains("invalid city name"), "{name:?}: {err}");
        }

        let data = ReferenceData::from_json(&table("Bielsko-Biała")).unwrap();
        assert!(data.contains("Bielsko-Biała"));
    }

    #[test]
    fn test_load_missing_file() {
        let err = ReferenceData::load("/nonexistent/cities.json").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/cities.json"));
    }
}
