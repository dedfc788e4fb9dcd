//! Output formatting and persistence for city reports.
//!
//! Supports JSON rendering, writing a report as a (optionally gzipped) JSON
//! file, and appending a one-line summary per run to a CSV history.

use anyhow::Result;
use chrono::{DateTime, Utc};
use csv::WriterBuilder;
use flate2::Compression;
use flate2::write::GzEncoder;
use serde::Serialize;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

use crate::report::CityReport;

/// Renders a report as JSON.
pub fn to_json(report: &CityReport, pretty: bool) -> Result<String> {
    Ok(if pretty {
        serde_json::to_string_pretty(report)?
    } else {
        serde_json::to_string(report)?
    })
}

/// Writes `report` to `<dir>/<city>.json`, or `<dir>/<city>.json.gz` when
/// `gzip` is set, replacing any previous file. Returns the written path.
///
/// Fails if the city name is not a single plain file name.
pub fn write_report(dir: &Path, report: &CityReport, gzip: bool) -> Result<PathBuf> {
    let mut components = Path::new(&report.city).components();
    if !matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    ) || report.city.contains(['/', '\\'])
    {
        anyhow::bail!("city name {:?} is not usable as a file name", report.city);
    }

    std::fs::create_dir_all(dir)?;
    let body = serde_json::to_vec(report)?;

    let (path, contents) = if gzip {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&body)?;
        (dir.join(format!("{}.json.gz", report.city)), encoder.finish()?)
    } else {
        (dir.join(format!("{}.json", report.city)), body)
    };

    std::fs::write(&path, contents)?;
    debug!(path = %path.display(), gzip, "Report written");
    Ok(path)
}

/// One CSV history row per city fetch.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct SummaryRow {
    pub timestamp: DateTime<Utc>,
    pub city: String,
    pub count: usize,
    pub avg: Option<i64>,
    pub median: Option<i64>,
    pub min: Option<i64>,
    pub max: Option<i64>,
    pub error_type: Option<String>,
    pub error_message: Option<String>,
}

impl SummaryRow {
    pub fn from_report(report: &CityReport) -> Self {
        let stats = report.stats;
        SummaryRow {
            timestamp: Utc::now(),
            city: report.city.clone(),
            count: report.count,
            avg: stats.map(|s| s.avg),
            median: stats.map(|s| s.median),
            min: stats.map(|s| s.min),
            max: stats.map(|s| s.max),
            error_type: None,
            error_message: None,
        }
    }

    /// Create an error row with timestamp and error information
    pub fn from_error(city: &str, error_type: &str, error_message: &str) -> Self {
        SummaryRow {
            timestamp: Utc::now(),
            city: city.to_string(),
            error_type: Some(error_type.to_string()),
            error_message: Some(error_message.to_string()),
            ..Default::default()
        }
    }
}

/// Appends a [`SummaryRow`] to a CSV file.
///
/// Creates the file with headers if it does not already exist.
pub fn append_record(path: &str, row: &SummaryRow) -> Result<()> {
    let file_exists = Path::new(path).exists();
    debug!(path, file_exists, "Appending CSV record");

    let file = OpenOptions::new().append(true).create(true).open(path)?;

    let mut writer = WriterBuilder::new()
        .has_headers(!file_exists) // IMPORTANT when appending
        .from_writer(file);

    writer.serialize(row)?;
    writer.flush()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{DocumentDate, Market, TransactionRecord};
    use flate2::read::GzDecoder;
    use std::env;
    use std::fs;
    use std::io::Read;

    fn temp_path(name: &str) -> PathBuf {
        env::temp_dir().join(name)
    }

    fn sample_report() -> CityReport {
        CityReport::new(
            "Gdynia",
            vec![TransactionRecord {
                address: "Świętojańska 20".to_string(),
                city: "Gdynia".to_string(),
                area: 61.3,
                rooms: Some(3),
                floor: Some(-1),
                price: 750000,
                price_m2: 12235,
                date: DocumentDate::new(2024, 2, 29),
                market: Market::Secondary,
            }],
        )
    }

    #[test]
    fn test_to_json_compact_and_pretty() {
        let report = sample_report();
        let compact = to_json(&report, false).unwrap();
        let pretty = to_json(&report, true).unwrap();

        assert!(!compact.contains('\n'));
        assert!(pretty.contains('\n'));
        let a: serde_json::Value = serde_json::from_str(&compact).unwrap();
        let b: serde_json::Value = serde_json::from_str(&pretty).unwrap();
        assert_eq!(a, b);
        assert_eq!(a["transactions"][0]["date"], "29.02.2024");
    }

    #[test]
    fn test_write_report_plain() {
        let dir = temp_path("rcn_rater_test_plain");
        let _ = fs::remove_dir_all(&dir);

        let path = write_report(&dir, &sample_report(), false).unwrap();
        assert_eq!(path, dir.join("Gdynia.json"));

        let value: serde_json::Value =
            serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
        assert_eq!(value["count"], 1);
        assert_eq!(value["stats"]["median"], 12235);

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_write_report_gzip() {
        let dir = temp_path("rcn_rater_test_gzip");
        let _ = fs::remove_dir_all(&dir);

        let path = write_report(&dir, &sample_report(), true).unwrap();
        assert_eq!(path, dir.join("Gdynia.json.gz"));

        let mut decoded = String::new();
        GzDecoder::new(fs::File::open(&path).unwrap())
            .read_to_string(&mut decoded)
            .unwrap();
        assert!(decoded.contains("Świętojańska 20"));

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_write_report_stays_inside_dir() {
        let dir = temp_path("rcn_rater_test_escape");
        let _ = fs::remove_dir_all(&dir);

        for city in ["../escaped", "a/b", "..", "/tmp/abs", r"..\x", ""] {
            let report = CityReport::new(city, vec![]);
            assert!(write_report(&dir, &report, false).is_err(), "{city:?}");
        }
        assert!(!temp_path("escaped.json").exists());

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_summary_row_from_report() {
        let row = SummaryRow::from_report(&sample_report());
        assert_eq!(row.city, "Gdynia");
        assert_eq!(row.count, 1);
        assert_eq!(row.avg, Some(12235));
        assert!(row.error_type.is_none());

        let empty = SummaryRow::from_report(&CityReport::new("Sopot", vec![]));
        assert_eq!(empty.count, 0);
        assert_eq!(empty.median, None);
    }

    #[test]
    fn test_append_record_writes_header_once() {
        let path = temp_path("rcn_rater_test_header.csv");
        let path = path.to_str().unwrap();
        let _ = fs::remove_file(path);

        append_record(path, &SummaryRow::from_report(&sample_report())).unwrap();
        append_record(path, &SummaryRow::from_error("Sopot", "unknown_city", "nope")).unwrap();

        let content = fs::read_to_string(path).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("timestamp,city,count"));
        assert_eq!(lines.iter().filter(|l| l.contains("timestamp")).count(), 1);
        assert!(lines[1].contains(",Gdynia,1,12235,"));
        assert!(lines[2].ends_with(",Sopot,0,,,,,unknown_city,nope"));

        fs::remove_file(path).unwrap();
    }
}
