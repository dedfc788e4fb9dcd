//! Transaction record types produced by the extractor.

use serde::{Serialize, Serializer};
use std::fmt;

/// Transaction market as reported by `tran_rodzaj_rynku`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Market {
    /// `wtorny`, resale.
    Secondary,
    /// `pierwotny`, first sale of a new build.
    Primary,
    /// Any other upstream value, passed through unchanged.
    Other(String),
}

impl Market {
    pub fn from_raw(raw: &str) -> Self {
        match raw {
            "wtorny" => Market::Secondary,
            "pierwotny" => Market::Primary,
            other => Market::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Market::Secondary => "wtorny",
            Market::Primary => "pierwotny",
            Market::Other(raw) => raw,
        }
    }
}

impl Serialize for Market {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// One residential unit sale that passed every extraction filter.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    pub address: String,
    pub city: String,
    pub area: f64,
    pub rooms: Option<u64>,
    pub floor: Option<i64>,
    pub price: i64,
    pub price_m2: i64,
    pub date: DocumentDate,
    pub market: Market,
}

/// Document date as written in `dok_data`, kept digit for digit.
///
/// The service is not checked for calendar validity, so `2023-02-30` is a
/// legal value and renders as `30.02.2023`. Ordering is chronological.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DocumentDate {
    pub year: u16,
    pub month: u8,
    pub day: u8,
}

impl DocumentDate {
    pub const fn new(year: u16, month: u8, day: u8) -> Self {
        Self { year, month, day }
    }

    /// Reads a `YYYY-MM-DD` prefix, e.g. from `2023-05-17T00:00:00`.
    pub fn parse_prefix(raw: &str) -> Option<Self> {
        let b = raw.as_bytes().get(..10)?;
        let digits = |from: usize, to: usize| b[from..to].iter().all(u8::is_ascii_digit);
        if !(digits(0, 4) && b[4] == b'-' && digits(5, 7) && b[7] == b'-' && digits(8, 10)) {
            return None;
        }
        let number = |from: usize, to: usize| {
            b[from..to]
                .iter()
                .fold(0u16, |acc, d| acc * 10 + u16::from(d - b'0'))
        };
        Some(Self {
            year: number(0, 4),
            month: number(5, 7) as u8,
            day: number(8, 10) as u8,
        })
    }
}

/// `DD.MM.YYYY`
impl fmt::Display for DocumentDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}.{:02}.{:04}", self.day, self.month, self.year)
    }
}

impl Serialize for DocumentDate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
