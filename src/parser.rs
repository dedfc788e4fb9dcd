//! GML parser for RCN `ms:lokale` features.
//!
//! Parsing is lenient per field and strict per record: a value that cannot be
//! read degrades to a default, while the domain filters below drop the whole
//! feature.

use roxmltree::{Document, ExpandedName, Node};
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::record::{DocumentDate, Market, TransactionRecord};

pub const RESIDENTIAL: &str = "mieszkalna";
pub const MIN_YEAR: u16 = 2021;
pub const MIN_PRICE_M2: i64 = 2000;
pub const MAX_PRICE_M2: i64 = 80000;

const FIELD_ADDRESS: &str = "lok_adres";
const FIELD_AREA: &str = "lok_pow_uzyt";
const FIELD_PRICE: &str = "lok_cena_brutto";
const FIELD_FUNCTION: &str = "lok_funkcja";
const FIELD_DATE: &str = "dok_data";
const FIELD_ROOMS: &str = "lok_liczba_izb";
const FIELD_FLOOR: &str = "lok_nr_kond";
const FIELD_MARKET: &str = "tran_rodzaj_rynku";

/// Prefix to namespace URI bindings used to resolve qualified names.
#[derive(Debug, Clone, Copy)]
pub struct Namespaces {
    entries: &'static [(&'static str, &'static str)],
}

impl Namespaces {
    /// WFS 2.0 responses from the MapServer-backed RCN service.
    pub const RCN: Namespaces = Namespaces {
        entries: &[
            ("wfs", "http://www.opengis.net/wfs/2.0"),
            ("ms", "http://mapserver.gis.umn.edu/mapserver"),
            ("gml", "http://www.opengis.net/gml/3.2"),
        ],
    };

    pub fn uri(&self, prefix: &str) -> Option<&'static str> {
        self.entries
            .iter()
            .find(|(p, _)| *p == prefix)
            .map(|(_, uri)| *uri)
    }

    /// Resolves `prefix:local` into an expanded name. Unknown prefixes and
    /// unprefixed names resolve to no namespace.
    pub fn name<'a>(&self, qname: &'a str) -> ExpandedName<'static, 'a> {
        match qname.split_once(':') {
            Some((prefix, local)) => match self.uri(prefix) {
                Some(uri) => (uri, local).into(),
                None => local.into(),
            },
            None => qname.into(),
        }
    }
}

/// Extracts filtered transaction records from a WFS `GetFeature` response
/// using the RCN namespace bindings.
///
/// Returns an empty list for an empty, non-UTF-8 or malformed payload.
/// Records keep feed order.
pub fn extract_records(raw: &[u8]) -> Vec<TransactionRecord> {
    extract_records_with(raw, &Namespaces::RCN)
}

pub fn extract_records_with(raw: &[u8], ns: &Namespaces) -> Vec<TransactionRecord> {
    let Ok(text) = std::str::from_utf8(raw) else {
        warn!(bytes = raw.len(), "Feed is not valid UTF-8");
        return Vec::new();
    };

    let doc = match Document::parse(text) {
        Ok(doc) => doc,
        Err(e) => {
            warn!(error = %e, bytes = raw.len(), "Malformed feed");
            return Vec::new();
        }
    };

    let member = ns.name("wfs:member");
    let lokale = ns.name("ms:lokale");

    let features: Vec<Node> = doc
        .root_element()
        .descendants()
        .skip(1)
        .filter(|n| n.has_tag_name(member))
        .filter_map(|m| m.children().find(|c| c.has_tag_name(lokale)))
        .collect();

    let records: Vec<TransactionRecord> = features
        .iter()
        .filter_map(|node| Feature { node: *node, ns }.into_record())
        .collect();

    debug!(
        features = features.len(),
        records = records.len(),
        "Extracted transaction records"
    );

    records
}

/// One `ms:lokale` element.
struct Feature<'a, 'input> {
    node: Node<'a, 'input>,
    ns: &'a Namespaces,
}

impl<'a, 'input> Feature<'a, 'input> {
    /// Trimmed text of the `ms:<field>` child, or `""` if absent.
    fn text(&self, field: &str) -> &'a str {
        let name = match self.ns.uri("ms") {
            Some(uri) => ExpandedName::from((uri, field)),
            None => ExpandedName::from(field),
        };
        self.node
            .children()
            .find(|c| c.has_tag_name(name))
            .and_then(|c| c.text())
            .map(str::trim)
            .unwrap_or("")
    }

    fn into_record(self) -> Option<TransactionRecord> {
        let address = Address::parse(self.text(FIELD_ADDRESS));

        let area = decimal_or(self.text(FIELD_AREA), 0.0);
        let price = decimal_or(self.text(FIELD_PRICE), 0.0);

        let function = self.text(FIELD_FUNCTION);
        if !function.is_empty() && function != RESIDENTIAL {
            return None;
        }

        if area <= 0.0 || price <= 0.0 {
            return None;
        }

        let date = DocumentDate::parse_prefix(self.text(FIELD_DATE))?;
        if date.year < MIN_YEAR {
            return None;
        }

        let price_m2 = (price / area).round_ties_even() as i64;
        if !(MIN_PRICE_M2..=MAX_PRICE_M2).contains(&price_m2) {
            return None;
        }

        Some(TransactionRecord {
            address: address.display(),
            city: address.city,
            area: round_to_tenth(area),
            rooms: count_or_none(self.text(FIELD_ROOMS)),
            floor: signed_or_none(self.text(FIELD_FLOOR)),
            price: price.trunc() as i64,
            price_m2,
            date,
            market: Market::from_raw(self.text(FIELD_MARKET)),
        })
    }
}

/// Decomposed `KEY:VALUE;KEY:VALUE` address.
#[derive(Debug, Default, PartialEq)]
struct Address {
    city: String,
    street: String,
    number: String,
}

impl Address {
    fn parse(raw: &str) -> Self {
        let parts: HashMap<&str, &str> = raw
            .split(';')
            .filter_map(|part| part.split_once(':'))
            .map(|(k, v)| (k.trim(), v.trim()))
            .collect();

        let get = |key: &str| parts.get(key).copied().unwrap_or("").to_string();
        Self {
            city: get("MSC"),
            street: get("UL"),
            number: get("NR_PORZ"),
        }
    }

    /// `"{street} {number}"`, or the city when the street is unknown.
    fn display(&self) -> String {
        if self.street.is_empty() {
            self.city.clone()
        } else {
            format!("{} {}", self.street, self.number).trim().to_string()
        }
    }
}

/// Parses a decimal that uses `,` as separator. Blank, unparseable and
/// non-finite input yields `default`.
fn decimal_or(raw: &str, default: f64) -> f64 {
    raw.replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .unwrap_or(default)
}

/// Rounds to one decimal place using the exact decimal value of `v`, so
/// `72.45` (stored as 72.4500000000000028...) becomes `72.5`.
fn round_to_tenth(v: f64) -> f64 {
    format!("{v:.1}").parse().unwrap_or(v)
}

/// Non-negative integer made of ASCII digits only. Values beyond `u64` are
/// treated as unreadable.
fn count_or_none(raw: &str) -> Option<u64> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse().ok()
}

/// Integer with at most one leading `-`, within `i64`.
fn signed_or_none(raw: &str) -> Option<i64> {
    let digits = raw.strip_prefix('-').unwrap_or(raw);
    count_or_none(digits)?;
    raw.parse().ok()
}
