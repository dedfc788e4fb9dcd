//! Caller-facing payload for one city query.

use serde::Serialize;

use crate::config::{ReferenceData, ReferencePrice};
use crate::record::TransactionRecord;
use crate::stats::StatsSummary;

pub const SOURCE_LABEL: &str = "Rejestr Cen Nieruchomosci (RCN)";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CityReport {
    pub city: String,
    pub transactions: Vec<TransactionRecord>,
    pub stats: Option<StatsSummary>,
    pub source: String,
    pub count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nbp: Option<ReferencePrice>,
}

impl CityReport {
    /// Summarises `transactions` and orders them newest first.
    pub fn new(city: &str, mut transactions: Vec<TransactionRecord>) -> Self {
        let stats = StatsSummary::from_records(&transactions);
        transactions.sort_by(|a, b| b.date.cmp(&a.date));

        CityReport {
            city: city.to_string(),
            count: transactions.len(),
            transactions,
            stats,
            source: SOURCE_LABEL.to_string(),
            nbp: None,
        }
    }

    /// Attach the NBP reference prices for this city, if known.
    pub fn with_reference_prices(mut self, reference: &ReferenceData) -> Self {
        self.nbp = reference.reference_price(&self.city).cloned();
        self
    }
}
